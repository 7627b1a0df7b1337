use std::path::{Path, PathBuf};

use globwalk::GlobWalkerBuilder;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod analysis;
pub mod anchors;
pub mod candidate;
pub mod extractors;
pub mod merge;
pub mod normalize;
pub mod vocabulary;

pub use analysis::{AnalysisResult, AnalyzedLine, AnalyzedPage, AnalyzedParagraph, BoundingRegion};
pub use anchors::{build_anchors, classify_heading, group_clause_blocks, split_sentences, ClauseBlock, ClauseSpan, HeadingKind, TextAnchor};
pub use candidate::{Candidate, CandidateRecord, FieldMatch, SchemaField};
pub use extractors::{
    extract_all, extract_amounts, extract_amounts_with, extract_dates, extract_fee_structure, extract_governing_law, extract_parties,
    extract_scope, AmountScan,
};
pub use merge::{dedup_key, merge_candidates, merge_candidates_with, sort_by_document_order};
pub use normalize::{display_date, iso_date, normalize_value, parse_date};
pub use vocabulary::Vocabulary;

/// Conditions worth surfacing to the caller; none of them stop the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Input carried text but no anchors came out of it.
    NoAnchorsFromNonEmptyInput,
    /// Anchors were built but no extractor found anything.
    NoCandidates,
    /// Body anchors that appear before any heading.
    UnassignedAnchors { count: usize },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Extraction {
    pub candidates: Vec<Candidate>,
    pub clause_blocks: Vec<ClauseBlock>,
    pub anchor_count: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl Extraction {
    pub fn ambiguous_count(&self) -> usize {
        self.candidates.iter().filter(|c| c.field.is_ambiguous()).count()
    }
}

/// Full pipeline for one document: anchors, field extractors, merge, then
/// document order. Never fails; unusable input gives an empty extraction.
pub fn derive_candidates(result: &AnalysisResult, vocab: &Vocabulary) -> Extraction {
    let anchors = build_anchors(result, vocab);
    let mut diagnostics = Vec::new();
    if anchors.is_empty() && result.has_text() {
        warn!("analysis result has text but produced no anchors");
        diagnostics.push(Diagnostic::NoAnchorsFromNonEmptyInput);
    }

    let unassigned = anchors.iter().filter(|a| !a.was_heading && a.role_hint.is_none()).count();
    if unassigned > 0 {
        debug!(count = unassigned, "anchors without a heading");
        diagnostics.push(Diagnostic::UnassignedAnchors { count: unassigned });
    }

    let raw = extract_all(&anchors, vocab);
    let raw_count = raw.len();
    let merged = merge_candidates_with(raw, &vocab.preferred_governing_law_headings);
    let candidates = sort_by_document_order(merged);
    if candidates.is_empty() && !anchors.is_empty() {
        warn!(anchors = anchors.len(), "no candidates extracted from a non-empty document");
        diagnostics.push(Diagnostic::NoCandidates);
    }

    info!(anchors = anchors.len(), raw = raw_count, merged = candidates.len(), "candidates derived");
    Extraction { clause_blocks: group_clause_blocks(&anchors), anchor_count: anchors.len(), candidates, diagnostics }
}

/// Pipeline over an untyped analysis payload.
pub fn derive_candidates_from_value(value: &serde_json::Value, vocab: &Vocabulary) -> Extraction {
    derive_candidates(&AnalysisResult::from_value(value), vocab)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidatesConfig {
    pub id: String,
    #[serde(default)]
    pub input: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub ttl_hours: Option<u64>,
    #[serde(default)]
    pub vocabulary: Option<Vocabulary>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Read(String),
    #[error("Failed to parse config: {0}")]
    Parse(String),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

const DEFAULT_TTL_HOURS: u64 = 24;

/// Load and validate `candidates.yaml`.
pub fn validate_config(path: &Path) -> Result<CandidatesConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read(e.to_string()))?;
    let cfg: CandidatesConfig = serde_yaml::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))?;

    if cfg.id.trim().is_empty() {
        return Err(ConfigError::Invalid("missing id".into()));
    }
    if cfg.ttl_hours == Some(0) {
        return Err(ConfigError::Invalid("ttl_hours must be greater than 0".into()));
    }
    if let Some(v) = &cfg.vocabulary {
        if let Some(t) = v.fee_structures.iter().find(|t| t.synonyms.is_empty()) {
            return Err(ConfigError::Invalid(format!("fee structure {} has no synonyms", t.canonical)));
        }
    }
    Ok(cfg)
}

impl CandidatesConfig {
    pub fn input_glob(&self) -> String {
        self.input.clone().unwrap_or_else(|| "./input/**/*.json".to_string())
    }
    pub fn output_dir(&self) -> String {
        self.output.clone().unwrap_or_else(|| "./output".to_string())
    }
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.ttl_hours.unwrap_or(DEFAULT_TTL_HOURS) as i64)
    }
    pub fn vocabulary(&self) -> Vocabulary {
        self.vocabulary.clone().unwrap_or_default()
    }
}

#[derive(Debug, Error)]
pub enum EnumerateError {
    #[error("NoFilesFound")]
    NoFilesFound { guidance: String },
}

/// Analysis-result files matching a glob (e.g. "./input/**/*.json"), sorted.
pub fn enumerate_inputs(glob_pattern: &str) -> Result<Vec<PathBuf>, EnumerateError> {
    let root = if Path::new(glob_pattern).is_absolute() { "/" } else { "." };
    let pat = glob_pattern.strip_prefix("./").unwrap_or(glob_pattern);
    let mut paths: Vec<PathBuf> = GlobWalkerBuilder::from_patterns(root, &[pat])
        .follow_links(false)
        .build()
        .map_err(|_| EnumerateError::NoFilesFound { guidance: input_guidance(glob_pattern) })?
        .filter_map(|e| e.ok())
        .map(|e| e.path().to_path_buf())
        .filter(|p| p.is_file())
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err(EnumerateError::NoFilesFound { guidance: input_guidance(glob_pattern) });
    }
    Ok(paths)
}

fn input_guidance(glob_pattern: &str) -> String {
    format!(
        "No analysis results match {}\nPlace one JSON file per uploaded template, e.g. ./input/retainer-2025.json,\ncontaining the document-analysis output (pages/lines, paragraphs, or content).",
        glob_pattern
    )
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("FileNotFound: {0}")]
    Read(String),
    #[error("InvalidJson: {0}")]
    Parse(String),
}

#[derive(Debug, Clone)]
pub struct AnalysisInput {
    pub result: AnalysisResult,
    pub sha256: String,
}

/// Read one analysis-result file. Only unreadable files or invalid JSON fail;
/// a JSON value of an unknown shape becomes an empty result.
pub fn read_analysis(path: &Path) -> Result<AnalysisInput, InputError> {
    let bytes = std::fs::read(path).map_err(|e| InputError::Read(format!("{}: {}", path.display(), e)))?;
    let value: serde_json::Value = serde_json::from_slice(&bytes).map_err(|e| InputError::Parse(format!("{}: {}", path.display(), e)))?;
    Ok(AnalysisInput { result: AnalysisResult::from_value(&value), sha256: sha256_hex(&bytes) })
}

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("WriteFailed: {0}")]
    WriteFailed(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmitPaths {
    pub candidates_path: String,
    pub meta_path: String,
}

/// Atomically write `<doc_id>.candidates.json` and `<doc_id>.meta.json` into outdir.
pub fn emit_files(payload: &serde_json::Value, meta: &serde_json::Value, outdir: &str, doc_id: &str, pretty: bool) -> Result<EmitPaths, EmitError> {
    let fail = |e: &dyn std::fmt::Display| EmitError::WriteFailed(e.to_string());
    std::fs::create_dir_all(outdir).map_err(|e| fail(&e))?;
    let candidates_path = Path::new(outdir).join(format!("{}.candidates.json", doc_id));
    let meta_path = Path::new(outdir).join(format!("{}.meta.json", doc_id));

    let pid = std::process::id();
    let candidates_tmp = candidates_path.with_extension(format!("json.tmp.{}", pid));
    let meta_tmp = meta_path.with_extension(format!("json.tmp.{}", pid));

    let payload_bytes = (if pretty { serde_json::to_vec_pretty(payload) } else { serde_json::to_vec(payload) }).map_err(|e| fail(&e))?;
    let meta_bytes = serde_json::to_vec_pretty(meta).map_err(|e| fail(&e))?;
    std::fs::write(&candidates_tmp, payload_bytes).map_err(|e| fail(&e))?;
    std::fs::write(&meta_tmp, meta_bytes).map_err(|e| fail(&e))?;

    std::fs::rename(&candidates_tmp, &candidates_path).map_err(|e| fail(&e))?;
    std::fs::rename(&meta_tmp, &meta_path).map_err(|e| fail(&e))?;

    Ok(EmitPaths {
        candidates_path: candidates_path.to_string_lossy().to_string(),
        meta_path: meta_path.to_string_lossy().to_string(),
    })
}

// Utility to compute sha256 hex
pub fn sha256_hex(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let out = hasher.finalize();
    out.iter().map(|b| format!("{:02x}", b)).collect()
}
