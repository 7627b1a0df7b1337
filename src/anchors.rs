use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::AnalysisResult;
use crate::vocabulary::{contains_any_cue, heading_matches, normalize_heading, Vocabulary};

/// A positioned, heading-scoped fragment of document text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextAnchor {
    pub text: String,
    pub page: u32,
    pub y: f64,
    /// Text of the nearest preceding heading; a heading carries itself.
    pub role_hint: Option<String>,
    pub was_heading: bool,
}

/// Why a line counts as a heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingKind {
    Keyword,
    AllCaps,
    TitleCase,
}

static RE_CURRENCY_OR_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\s*\d|\bUSD\b|\b\d{4}\b").unwrap());
static RE_ALL_CAPS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z0-9][A-Z0-9\s&/,'().:\-\u{2013}]*$").unwrap());
static RE_TITLE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z0-9][A-Za-z0-9\s&/,'().:\-\u{2013}]*$").unwrap());
static RE_UNDERLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^_+$").unwrap());

const MAX_HEADING_WORDS: usize = 8;
const MAX_HEADING_CHARS: usize = 80;
const MINOR_WORDS: &[&str] = &["a", "an", "and", "as", "by", "for", "in", "of", "on", "or", "the", "to", "with", "&", "-", "\u{2013}"];

/// Fold non-breaking spaces and collapse whitespace runs.
pub fn normalize_text(s: &str) -> String {
    s.replace('\u{00A0}', " ").split_whitespace().collect::<Vec<_>>().join(" ")
}

fn ends_sentence(s: &str) -> bool {
    s.ends_with(|c: char| c == '.' || c == '?' || c == '!')
}

/// Classify a line as a heading. Terminal sentence punctuation always
/// disqualifies; otherwise a vocabulary match wins, then the structural
/// heuristic (short, not prose, ALL CAPS or Title Case).
pub fn classify_heading(raw: &str, vocab: &Vocabulary) -> Option<HeadingKind> {
    let norm = normalize_text(raw);
    let text = norm.trim_end_matches(|c: char| c == ':' || c == '-' || c == '\u{2013}' || c.is_whitespace());
    if text.is_empty() || ends_sentence(text) {
        return None;
    }

    let key = normalize_heading(text);
    if vocab.headings.all().any(|h| normalize_heading(h) == key) {
        return Some(HeadingKind::Keyword);
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() > MAX_HEADING_WORDS || text.chars().count() > MAX_HEADING_CHARS {
        return None;
    }
    if contains_any_cue(text, &vocab.sentence_verbs) || RE_CURRENCY_OR_YEAR.is_match(text) {
        return None;
    }

    if RE_ALL_CAPS.is_match(text) && text.chars().any(|c| c.is_ascii_uppercase()) {
        return Some(HeadingKind::AllCaps);
    }
    let title_words = words.iter().all(|w| {
        let first = w.trim_start_matches(|c: char| c == '(' || c == '\'').chars().next();
        MINOR_WORDS.contains(&w.to_lowercase().as_str()) || first.map(|c| c.is_uppercase() || c.is_ascii_digit()).unwrap_or(false)
    });
    if RE_TITLE_CHARS.is_match(text) && title_words {
        return Some(HeadingKind::TitleCase);
    }
    None
}

/// Split prose before a capital letter that follows `.`, `?` or `!`.
pub fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut out = Vec::new();
    let mut start = 0usize;
    let mut i = 0usize;
    while i < chars.len() {
        let (pos, c) = chars[i];
        if matches!(c, '.' | '?' | '!') {
            let mut j = i + 1;
            while j < chars.len() && chars[j].1.is_whitespace() {
                j += 1;
            }
            if j > i + 1 && j < chars.len() && chars[j].1.is_uppercase() {
                let end = pos + c.len_utf8();
                out.push(normalize_text(&text[start..end]));
                start = chars[j].0;
                i = j;
                continue;
            }
        }
        i += 1;
    }
    out.push(normalize_text(&text[start..]));
    out.retain(|s| !s.is_empty());
    out
}

/// Running heading context threaded through one left-to-right scan.
struct HeadingScope<'v> {
    vocab: &'v Vocabulary,
    current: Option<String>,
    anchors: Vec<TextAnchor>,
}

impl<'v> HeadingScope<'v> {
    fn new(vocab: &'v Vocabulary) -> Self {
        HeadingScope { vocab, current: None, anchors: Vec::new() }
    }

    fn in_signatures(&self) -> bool {
        self.current.as_deref().map(|h| heading_matches(h, &self.vocab.headings.signatures)).unwrap_or(false)
    }

    /// A Title Case line under a signatures heading (`Date:`, a signatory's
    /// name). It is body text but stands alone, never joined to its neighbours.
    fn is_signatory_line(&self, text: &str) -> bool {
        self.in_signatures() && classify_heading(text, self.vocab) == Some(HeadingKind::TitleCase)
    }

    /// Heading status after the signature-block exception.
    fn heading_kind(&self, text: &str) -> Option<HeadingKind> {
        if self.is_signatory_line(text) {
            return None;
        }
        classify_heading(text, self.vocab)
    }

    fn push_heading(&mut self, page: u32, y: f64, text: &str) {
        self.current = Some(text.to_string());
        self.anchors.push(TextAnchor { text: text.to_string(), page, y, role_hint: self.current.clone(), was_heading: true });
    }

    fn push_sentence(&mut self, page: u32, y: f64, text: String) {
        self.anchors.push(TextAnchor { text, page, y, role_hint: self.current.clone(), was_heading: false });
    }

    /// Emit prose split into fragments; `y_of` maps fragment index to position.
    fn push_prose(&mut self, page: u32, text: &str, y_of: impl Fn(usize) -> f64) {
        for (j, s) in split_sentences(text).into_iter().enumerate() {
            self.push_sentence(page, y_of(j), s);
        }
    }
}

/// Normalize document-analysis output into ordered, heading-tagged anchors.
/// Tries page/line, then paragraph, then flat content; anything else yields
/// no anchors.
pub fn build_anchors(result: &AnalysisResult, vocab: &Vocabulary) -> Vec<TextAnchor> {
    let anchors = if result.has_page_lines() {
        debug!(shape = "pages", "building anchors");
        anchors_from_pages(result, vocab)
    } else if result.has_paragraphs() {
        debug!(shape = "paragraphs", "building anchors");
        anchors_from_paragraphs(result, vocab)
    } else if let Some(content) = result.content.as_deref() {
        debug!(shape = "content", "building anchors");
        anchors_from_content(content, vocab)
    } else {
        Vec::new()
    };
    debug!(count = anchors.len(), "anchors built");
    anchors
}

fn anchors_from_pages(result: &AnalysisResult, vocab: &Vocabulary) -> Vec<TextAnchor> {
    let mut scope = HeadingScope::new(vocab);
    for (pi, page) in result.pages.iter().flatten().enumerate() {
        let page_no = page.page_number.unwrap_or(pi as u32 + 1);
        let lines: Vec<(usize, String, Option<f64>)> = page
            .lines
            .iter()
            .flatten()
            .enumerate()
            .filter_map(|(li, l)| {
                let text = normalize_text(l.content.as_deref().unwrap_or(""));
                if text.is_empty() { None } else { Some((li, text, l.top())) }
            })
            .collect();
        let use_geometry = !lines.is_empty() && lines.iter().all(|(_, _, top)| top.is_some());

        let mut last_y = f64::MIN;
        let mut buffer = String::new();
        let mut buffer_y = 0.0;
        for (li, text, top) in lines {
            let raw_y = if use_geometry { top.unwrap_or(li as f64) } else { li as f64 };
            let y = raw_y.max(last_y);
            last_y = y;

            if scope.heading_kind(&text).is_some() {
                if !buffer.is_empty() {
                    let pending = std::mem::take(&mut buffer);
                    scope.push_prose(page_no, &pending, |_| buffer_y);
                }
                scope.push_heading(page_no, y, &text);
                continue;
            }
            if scope.is_signatory_line(&text) {
                if !buffer.is_empty() {
                    let pending = std::mem::take(&mut buffer);
                    scope.push_prose(page_no, &pending, |_| buffer_y);
                }
                scope.push_sentence(page_no, y, text);
                continue;
            }

            if buffer.is_empty() {
                buffer_y = y;
                buffer.push_str(&text);
            } else {
                buffer.push(' ');
                buffer.push_str(&text);
            }
            if ends_sentence(&text) {
                let pending = std::mem::take(&mut buffer);
                scope.push_prose(page_no, &pending, |_| buffer_y);
            }
        }
        if !buffer.is_empty() {
            scope.push_prose(page_no, &buffer, |_| buffer_y);
        }
    }
    scope.anchors
}

fn anchors_from_paragraphs(result: &AnalysisResult, vocab: &Vocabulary) -> Vec<TextAnchor> {
    let mut scope = HeadingScope::new(vocab);
    for (idx, p) in result.paragraphs.iter().flatten().enumerate() {
        let text = normalize_text(p.content.as_deref().unwrap_or(""));
        if text.is_empty() {
            continue;
        }
        let page_no = p.page_number();
        let base = (idx * 100) as f64;
        if scope.heading_kind(&text).is_some() {
            scope.push_heading(page_no, base, &text);
        } else {
            scope.push_prose(page_no, &text, |j| base + j as f64);
        }
    }
    scope.anchors
}

fn anchors_from_content(content: &str, vocab: &Vocabulary) -> Vec<TextAnchor> {
    let mut scope = HeadingScope::new(vocab);
    for (idx, raw) in content.lines().enumerate() {
        let line = normalize_text(raw);
        if line.is_empty() {
            continue;
        }
        let base = (idx * 100) as f64;
        if scope.heading_kind(&line).is_some() {
            scope.push_heading(1, base, &line);
        } else {
            scope.push_prose(1, &line, |j| base + j as f64);
        }
    }
    scope.anchors
}

/// Body text gathered under one heading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClauseBlock {
    pub heading: String,
    pub body: String,
    pub page_number: u32,
    pub y_position: f64,
    pub spans: Vec<ClauseSpan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClauseSpan {
    pub text: String,
    pub page_number: u32,
    pub y_position: f64,
}

/// Group non-heading anchors by role hint, in order of first appearance.
/// Anchors seen before any heading and underline-only lines are left out.
pub fn group_clause_blocks(anchors: &[TextAnchor]) -> Vec<ClauseBlock> {
    let mut blocks: Vec<ClauseBlock> = Vec::new();
    for a in anchors.iter().filter(|a| !a.was_heading) {
        let Some(hint) = a.role_hint.as_deref() else { continue };
        let text = a.text.trim();
        if text.is_empty() || RE_UNDERLINE.is_match(text) {
            continue;
        }
        let span = ClauseSpan { text: text.to_string(), page_number: a.page, y_position: a.y };
        match blocks.iter_mut().find(|b| b.heading == hint) {
            Some(block) => {
                block.body.push('\n');
                block.body.push_str(text);
                block.spans.push(span);
            }
            None => blocks.push(ClauseBlock {
                heading: hint.to_string(),
                body: text.to_string(),
                page_number: a.page,
                y_position: a.y,
                spans: vec![span],
            }),
        }
    }
    blocks
}
