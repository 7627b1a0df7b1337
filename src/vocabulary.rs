use std::collections::HashMap;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Domain vocabulary for candidate extraction. Every keyword family lives here
/// so heuristics can be tuned from configuration without touching the parsers.
/// Missing sections in a YAML override fall back to the built-in tables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Vocabulary {
    pub headings: HeadingVocabulary,
    pub dates: DateCues,
    pub amounts: AmountCues,
    /// Canonical fee structure name paired with its synonyms, checked in order.
    pub fee_structures: Vec<FeeStructureTerm>,
    pub governing_law_cues: Vec<String>,
    /// Headings under which a governing-law value outranks one found inline.
    pub preferred_governing_law_headings: Vec<String>,
    pub scope_cues: Vec<String>,
    /// Words that mark a line as prose rather than a heading.
    pub sentence_verbs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct HeadingVocabulary {
    pub parties: Vec<String>,
    pub scope: Vec<String>,
    pub fees: Vec<String>,
    pub governing_law: Vec<String>,
    pub signatures: Vec<String>,
    /// Clause headings that only scope context.
    pub other: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DateCues {
    pub effective: Vec<String>,
    pub expiration: Vec<String>,
    pub execution: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct AmountCues {
    pub fee_context: Vec<String>,
    pub retainer: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeeStructureTerm {
    pub canonical: String,
    pub synonyms: Vec<String>,
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for HeadingVocabulary {
    fn default() -> Self {
        HeadingVocabulary {
            parties: words(&["parties", "the parties", "between"]),
            scope: words(&[
                "scope",
                "scope of representation",
                "scope of work",
                "scope of services",
                "description of services",
                "services",
                "engagement",
                "responsibilities",
            ]),
            fees: words(&[
                "fees",
                "fee",
                "fee structure",
                "fees & engagement terms",
                "fees and expenses",
                "retainer",
                "costs & expenses",
                "compensation",
                "payment",
                "payment terms",
                "billing",
            ]),
            governing_law: words(&["governing law", "jurisdiction"]),
            signatures: words(&["signatures", "signature", "execution"]),
            other: words(&[
                "recitals",
                "definitions",
                "term",
                "term and termination",
                "termination",
                "confidentiality",
                "nondisclosure",
                "client responsibilities",
                "entire agreement",
                "entire agreement & amendments",
                "amendments",
                "notices",
                "severability",
                "miscellaneous",
                "standard retainer agreement",
            ]),
        }
    }
}

impl Default for DateCues {
    fn default() -> Self {
        DateCues {
            effective: words(&["effective", "commence", "commences", "commencement", "start", "begin", "begins"]),
            expiration: words(&[
                "terminate",
                "terminates",
                "termination",
                "expire",
                "expires",
                "expiration",
                "end date",
                "end",
                "ends",
            ]),
            execution: words(&["executed", "signed", "dated", "as of", "date of execution"]),
        }
    }
}

impl Default for AmountCues {
    fn default() -> Self {
        AmountCues {
            fee_context: words(&[
                "fee",
                "fees",
                "hourly",
                "per hour",
                "rate",
                "billed",
                "compensation",
                "payment",
                "remuneration",
                "charges",
                "billing",
                "consideration",
                "flat",
                "contingency",
            ]),
            retainer: words(&["retainer", "deposit", "advance", "advance payment"]),
        }
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        let term = |canonical: &str, synonyms: &[&str]| FeeStructureTerm { canonical: canonical.to_string(), synonyms: words(synonyms) };
        Vocabulary {
            headings: HeadingVocabulary::default(),
            dates: DateCues::default(),
            amounts: AmountCues::default(),
            fee_structures: vec![
                term("Flat", &["flat fee", "flat"]),
                term("Hourly", &["hourly", "per hour"]),
                term("Monthly", &["monthly", "per month"]),
                term("Contingency", &["contingency", "contingent"]),
            ],
            governing_law_cues: words(&["governing law", "governed by", "laws of", "construed in accordance"]),
            preferred_governing_law_headings: words(&["governing law", "jurisdiction"]),
            scope_cues: words(&[
                "scope of representation",
                "scope of work",
                "scope of services",
                "represent",
                "representation",
                "legal services",
                "services to be provided",
            ]),
            sentence_verbs: words(&[
                "is", "are", "was", "were", "shall", "will", "include", "includes", "pertain", "pertains",
                "constitutes", "agree", "agrees", "license", "licensed", "executed",
            ]),
        }
    }
}

impl HeadingVocabulary {
    /// Every heading variant across all families.
    pub fn all(&self) -> impl Iterator<Item = &String> {
        self.parties
            .iter()
            .chain(&self.scope)
            .chain(&self.fees)
            .chain(&self.governing_law)
            .chain(&self.signatures)
            .chain(&self.other)
    }
}

/// Canonical form of heading text for keyword comparison: lower-case, single
/// spaces, leading section numbering and trailing `:`/dash removed.
pub fn normalize_heading(text: &str) -> String {
    let lower = text.replace('\u{00A0}', " ").to_lowercase();
    let collapsed = lower.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed.trim_end_matches(|c: char| c == ':' || c == '-' || c == '\u{2013}' || c == '\u{2014}' || c.is_whitespace());
    let without_number = trimmed
        .trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == ')')
        .trim_start();
    without_number.to_string()
}

/// Whether a role hint names one of the given headings (case and numbering insensitive).
pub fn heading_matches(role_hint: &str, headings: &[String]) -> bool {
    let norm = normalize_heading(role_hint);
    !norm.is_empty() && headings.iter().any(|h| normalize_heading(h) == norm)
}

static CUE_PATTERNS: Lazy<Mutex<HashMap<String, Regex>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// Compiled whole-word, case-insensitive pattern for a cue, built once per cue.
fn cue_regex(cue: &str) -> Option<Regex> {
    if cue.trim().is_empty() {
        return None;
    }
    if let Some(re) = CUE_PATTERNS.lock().ok().and_then(|cache| cache.get(cue).cloned()) {
        return Some(re);
    }
    let re = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(cue))).ok()?;
    if let Ok(mut cache) = CUE_PATTERNS.lock() {
        cache.insert(cue.to_string(), re.clone());
    }
    Some(re)
}

/// The text matched by `cue` as a whole word, case preserved.
pub fn find_cue<'h>(haystack: &'h str, cue: &str) -> Option<&'h str> {
    cue_regex(cue)?.find(haystack).map(|m| m.as_str())
}

/// Case-insensitive whole-word search: `end` does not match `recommend`.
pub fn contains_cue(haystack: &str, cue: &str) -> bool {
    find_cue(haystack, cue).is_some()
}

pub fn contains_any_cue(haystack: &str, cues: &[String]) -> bool {
    cues.iter().any(|c| contains_cue(haystack, c))
}
