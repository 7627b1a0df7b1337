use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::anchors::{split_sentences, TextAnchor};
use crate::candidate::{Candidate, SchemaField};
use crate::normalize::{display_date, iso_date, RE_MONTH_DATE};
use crate::vocabulary::{contains_any_cue, find_cue, heading_matches, normalize_heading, Vocabulary};

static RE_BETWEEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bbetween\s+(.+?)\s+and\s+([^.,]+)(?:[.,]|$)").unwrap());
static RE_PARTY_TAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s*,?\s*\b(?:effective\s+as\s+of|dated)\b.*$").unwrap());
static RE_PARTY_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\s*\((?:hereinafter\s+)?(?:the\s+["“]?([A-Za-z]+)["”]?|["“]([A-Za-z]+)["”])\)"#).unwrap()
});
static RE_AMOUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\d{1,3}(?:,\d{3})*(?:\.\d{2})?").unwrap());
static RE_LAWS_OF: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\blaws\s+of\s+([^.;,()]+)").unwrap());

/// Signature-block fallback window when no signatures heading exists.
const SIGNATURE_TAIL: usize = 20;
const SCOPE_PREVIEW_CHARS: usize = 200;

fn strip_label(name: &str) -> (String, Option<String>) {
    let label = RE_PARTY_LABEL
        .captures(name)
        .and_then(|c| c.get(1).or_else(|| c.get(2)))
        .map(|m| m.as_str().to_string());
    let cleaned = RE_PARTY_LABEL.replace_all(name, "");
    (cleaned.trim().to_string(), label)
}

/// Parties named in the first `between A and B` sentence. Party B runs up to
/// the next `.` or `,`, so `Contoso Ltd.` comes out as `Contoso Ltd` and
/// `Jane Doe, Esq.` as `Jane Doe`. Labelled parties
/// (`(the "Client")`) are assigned by position; unlabelled ones stay ambiguous
/// because order alone says nothing about role.
pub fn extract_parties(anchors: &[TextAnchor], _vocab: &Vocabulary) -> Vec<Candidate> {
    for anchor in anchors {
        let Some(cap) = RE_BETWEEN.captures(&anchor.text) else { continue };
        let clean = |s: &str| RE_PARTY_TAIL.replace(s, "").trim().to_string();
        let (party_a, label_a) = strip_label(&clean(&cap[1]));
        let (party_b, label_b) = strip_label(&clean(&cap[2]));
        if party_a.is_empty() || party_b.is_empty() {
            continue;
        }

        let base_hint = anchor.role_hint.as_deref().unwrap_or("Parties");
        let out = if label_a.is_some() || label_b.is_some() {
            vec![
                Candidate::assigned(party_a, SchemaField::PartyA, anchor.page, anchor.y)
                    .with_role_hint(Some(label_a.as_deref().unwrap_or(base_hint))),
                Candidate::assigned(party_b, SchemaField::PartyB, anchor.page, anchor.y)
                    .with_role_hint(Some(label_b.as_deref().unwrap_or(base_hint))),
            ]
        } else {
            let both = vec![SchemaField::PartyA, SchemaField::PartyB];
            vec![
                Candidate::ambiguous(party_a, both.clone(), anchor.page, anchor.y).with_role_hint(Some(base_hint)),
                Candidate::ambiguous(party_b, both, anchor.page, anchor.y).with_role_hint(Some(base_hint)),
            ]
        };
        debug!(party_a = %out[0].raw_value, party_b = %out[1].raw_value, labelled = !out[0].field.is_ambiguous(), "parties detected");
        return out;
    }
    Vec::new()
}

/// Fee structure terms stated inside a fee clause, one candidate per
/// canonical term per anchor (first matching synonym wins). The raw value is
/// the text as written; the canonical term goes in `normalized`.
pub fn extract_fee_structure(anchors: &[TextAnchor], vocab: &Vocabulary) -> Vec<Candidate> {
    let mut out = Vec::new();
    for anchor in anchors.iter().filter(|a| !a.was_heading) {
        let in_fee_clause = anchor.role_hint.as_deref().map(|h| heading_matches(h, &vocab.headings.fees)).unwrap_or(false);
        if !in_fee_clause {
            continue;
        }
        for term in &vocab.fee_structures {
            if let Some(hit) = term.synonyms.iter().find_map(|k| find_cue(&anchor.text, k)) {
                debug!(canonical = %term.canonical, matched = hit, page = anchor.page, "fee structure detected");
                out.push(
                    Candidate::assigned(hit, SchemaField::FeeStructure, anchor.page, anchor.y)
                        .with_normalized(Some(term.canonical.clone()))
                        .with_role_hint(anchor.role_hint.as_deref()),
                );
            }
        }
    }
    out
}

/// Fee/retainer bookkeeping carried across one amount scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AmountScan {
    pub seen_fee: bool,
    pub seen_retainer: bool,
}

impl AmountScan {
    /// Options for an amount with no decisive cue: once one kind has been
    /// assigned, the other kind is the only plausible reading.
    fn ambiguous_options(&self) -> Vec<SchemaField> {
        match (self.seen_fee, self.seen_retainer) {
            (true, false) => vec![SchemaField::RetainerAmount],
            (false, true) => vec![SchemaField::FeeAmount],
            _ => vec![SchemaField::FeeAmount, SchemaField::RetainerAmount],
        }
    }

    fn record(&mut self, field: SchemaField) {
        match field {
            SchemaField::FeeAmount => self.seen_fee = true,
            SchemaField::RetainerAmount => self.seen_retainer = true,
            _ => {}
        }
    }
}

fn amount_cues(text: &str, vocab: &Vocabulary) -> (bool, bool) {
    (contains_any_cue(text, &vocab.amounts.fee_context), contains_any_cue(text, &vocab.amounts.retainer))
}

/// Dollar amounts classified as fee or retainer. The amount's own sentence
/// decides when it carries cues; otherwise the previous/current/next window.
pub fn extract_amounts(anchors: &[TextAnchor], vocab: &Vocabulary) -> Vec<Candidate> {
    extract_amounts_with(anchors, vocab, AmountScan::default()).0
}

/// Same as [`extract_amounts`], threading an explicit scan state in and out.
pub fn extract_amounts_with(anchors: &[TextAnchor], vocab: &Vocabulary, mut state: AmountScan) -> (Vec<Candidate>, AmountScan) {
    let mut out = Vec::new();
    for (i, anchor) in anchors.iter().enumerate() {
        if !RE_AMOUNT.is_match(&anchor.text) {
            continue;
        }
        let mut cues = amount_cues(&anchor.text, vocab);
        if cues == (false, false) {
            let prev = if i > 0 { anchors[i - 1].text.as_str() } else { "" };
            let next = anchors.get(i + 1).map(|a| a.text.as_str()).unwrap_or("");
            cues = amount_cues(&format!("{} {} {}", prev, anchor.text, next), vocab);
        }

        for m in RE_AMOUNT.find_iter(&anchor.text) {
            let candidate = match cues {
                (true, false) => Candidate::assigned(m.as_str(), SchemaField::FeeAmount, anchor.page, anchor.y),
                (false, true) => Candidate::assigned(m.as_str(), SchemaField::RetainerAmount, anchor.page, anchor.y),
                _ => Candidate::ambiguous(m.as_str(), state.ambiguous_options(), anchor.page, anchor.y),
            };
            if let Some(f) = candidate.schema_field() {
                state.record(f);
            }
            debug!(raw = m.as_str(), options = ?candidate.field.options(), page = anchor.page, "amount detected");
            out.push(candidate.with_role_hint(anchor.role_hint.as_deref()));
        }
    }
    (out, state)
}

fn date_candidate(raw: &str, field: Option<SchemaField>, anchor: &TextAnchor) -> Candidate {
    let c = match field {
        Some(f) => Candidate::assigned(raw, f, anchor.page, anchor.y),
        None => Candidate::ambiguous(raw, vec![SchemaField::EffectiveDate, SchemaField::ExpirationDate], anchor.page, anchor.y),
    };
    c.with_normalized(iso_date(raw))
        .with_display_value(display_date(raw))
        .with_role_hint(anchor.role_hint.as_deref())
}

/// Month-name dates, classified by cues in their own sentence
/// (effective, then expiration, then execution), plus one execution date
/// split across a label line and a date line in the signature block.
pub fn extract_dates(anchors: &[TextAnchor], vocab: &Vocabulary) -> Vec<Candidate> {
    let cues = &vocab.dates;
    let mut out = Vec::new();
    for anchor in anchors {
        for m in RE_MONTH_DATE.find_iter(&anchor.text) {
            let field = if contains_any_cue(&anchor.text, &cues.effective) {
                Some(SchemaField::EffectiveDate)
            } else if contains_any_cue(&anchor.text, &cues.expiration) {
                Some(SchemaField::ExpirationDate)
            } else if contains_any_cue(&anchor.text, &cues.execution) {
                Some(SchemaField::ExecutionDate)
            } else {
                None
            };
            debug!(raw = m.as_str(), field = ?field, page = anchor.page, "date detected");
            out.push(date_candidate(m.as_str(), field, anchor));
        }
    }

    let sig_start = anchors
        .iter()
        .position(|a| a.was_heading && heading_matches(&a.text, &vocab.headings.signatures))
        .unwrap_or_else(|| anchors.len().saturating_sub(SIGNATURE_TAIL));
    for pair in anchors[sig_start..].windows(2) {
        let (label, value) = (&pair[0], &pair[1]);
        let is_label = contains_any_cue(&label.text, &cues.execution) || normalize_heading(&label.text) == "date";
        if !is_label || RE_MONTH_DATE.is_match(&label.text) {
            continue;
        }
        if let Some(m) = RE_MONTH_DATE.find(&value.text) {
            debug!(raw = m.as_str(), page = value.page, "execution date from signature block");
            out.push(date_candidate(m.as_str(), Some(SchemaField::ExecutionDate), value));
            break;
        }
    }
    out
}

/// Jurisdiction named after "laws of" in any sentence carrying a
/// governing-law cue.
pub fn extract_governing_law(anchors: &[TextAnchor], vocab: &Vocabulary) -> Vec<Candidate> {
    let mut out = Vec::new();
    for anchor in anchors {
        if !contains_any_cue(&anchor.text, &vocab.governing_law_cues) {
            continue;
        }
        let Some(cap) = RE_LAWS_OF.captures(&anchor.text) else { continue };
        let value = cap[1].trim();
        if value.is_empty() {
            continue;
        }
        debug!(jurisdiction = value, role_hint = ?anchor.role_hint, "governing law detected");
        out.push(
            Candidate::assigned(value, SchemaField::GoverningLaw, anchor.page, anchor.y).with_role_hint(anchor.role_hint.as_deref()),
        );
    }
    out
}

fn preview(text: &str) -> String {
    let first = split_sentences(text).into_iter().next().unwrap_or_else(|| text.to_string());
    if first.chars().count() <= SCOPE_PREVIEW_CHARS {
        return first;
    }
    let cut: String = first.chars().take(SCOPE_PREVIEW_CHARS - 1).collect();
    format!("{}\u{2026}", cut.trim_end())
}

/// Scope of representation: every body sentence carrying a scope cue or
/// sitting under a scope heading, joined in order into one value.
pub fn extract_scope(anchors: &[TextAnchor], vocab: &Vocabulary) -> Vec<Candidate> {
    let parts: Vec<&TextAnchor> = anchors
        .iter()
        .filter(|a| !a.was_heading)
        .filter(|a| {
            contains_any_cue(&a.text, &vocab.scope_cues)
                || a.role_hint.as_deref().map(|h| heading_matches(h, &vocab.headings.scope)).unwrap_or(false)
        })
        .collect();
    let Some(first) = parts.first() else { return Vec::new() };

    let full = parts.iter().map(|a| a.text.trim()).collect::<Vec<_>>().join(" ");
    let display = if full.chars().count() > SCOPE_PREVIEW_CHARS { Some(preview(&full)) } else { None };
    debug!(sentences = parts.len(), chars = full.chars().count(), "scope detected");
    vec![Candidate::assigned(full, SchemaField::Scope, first.page, first.y)
        .with_display_value(display)
        .with_role_hint(first.role_hint.as_deref())]
}

/// Run every field extractor in a fixed order.
pub fn extract_all(anchors: &[TextAnchor], vocab: &Vocabulary) -> Vec<Candidate> {
    let mut out = Vec::new();
    out.extend(extract_parties(anchors, vocab));
    out.extend(extract_fee_structure(anchors, vocab));
    out.extend(extract_amounts(anchors, vocab));
    out.extend(extract_dates(anchors, vocab));
    out.extend(extract_governing_law(anchors, vocab));
    out.extend(extract_scope(anchors, vocab));
    out
}
