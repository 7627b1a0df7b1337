use std::cmp::Ordering;
use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::candidate::{Candidate, SchemaField};
use crate::normalize::{iso_date, normalize_value};
use crate::vocabulary::{normalize_heading, Vocabulary};

static DEFAULT_PREFERRED_HEADINGS: Lazy<Vec<String>> = Lazy::new(|| Vocabulary::default().preferred_governing_law_headings);

/// `"<schemaField>::<normalized>"`, or `None` for ambiguous candidates which
/// never take part in deduplication.
pub fn dedup_key(c: &Candidate) -> Option<String> {
    let field = c.schema_field()?;
    Some(format!("{}::{}", field, normalize_value(&c.raw_value, Some(field))))
}

fn is_preferred(role_hint: Option<&str>, preferred: &[String]) -> bool {
    let Some(hint) = role_hint else { return false };
    let norm = normalize_heading(hint);
    preferred.iter().any(|p| normalize_heading(p) == norm)
}

fn backfill(kept: &mut Candidate, incoming: Candidate) {
    if kept.normalized.is_none() {
        kept.normalized = incoming.normalized;
    }
    if kept.display_value.is_none() {
        kept.display_value = incoming.display_value;
    }
    if kept.role_hint.is_none() {
        kept.role_hint = incoming.role_hint;
    }
}

/// Deduplicate with the built-in governing-law headings.
pub fn merge_candidates(candidates: Vec<Candidate>) -> Vec<Candidate> {
    merge_candidates_with(candidates, &DEFAULT_PREFERRED_HEADINGS)
}

/// Deduplicate by dedup key, keeping the first occurrence in place and only
/// filling its missing metadata from later duplicates. A governing-law value
/// found under one of `preferred_headings` replaces an earlier one that was
/// not. Ambiguous candidates pass through untouched.
///
/// Assigned candidates sharing a key carry the same single label, so their
/// label sets are already united.
pub fn merge_candidates_with(candidates: Vec<Candidate>, preferred_headings: &[String]) -> Vec<Candidate> {
    let mut out: Vec<Candidate> = Vec::with_capacity(candidates.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for mut c in candidates {
        let Some(key) = dedup_key(&c) else {
            out.push(c);
            continue;
        };
        match index.get(&key) {
            None => {
                if c.normalized.is_none() && c.schema_field().map(|f| f.is_date_like()).unwrap_or(false) {
                    c.normalized = iso_date(&c.raw_value);
                }
                index.insert(key, out.len());
                out.push(c);
            }
            Some(&i) => {
                let kept = &mut out[i];
                let replaces = c.schema_field() == Some(SchemaField::GoverningLaw)
                    && !is_preferred(kept.role_hint.as_deref(), preferred_headings)
                    && is_preferred(c.role_hint.as_deref(), preferred_headings);
                if replaces {
                    *kept = c;
                } else {
                    backfill(kept, c);
                }
            }
        }
    }
    out
}

/// Stable sort by page, then vertical position.
pub fn sort_by_document_order(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.sort_by(|a, b| match a.page_number.cmp(&b.page_number) {
        Ordering::Equal => a.y_position.total_cmp(&b.y_position),
        other => other,
    });
    candidates
}
