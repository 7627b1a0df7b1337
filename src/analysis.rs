use serde::{Deserialize, Serialize};
use tracing::debug;

/// Output of the document-analysis service for one upload.
/// Every field is optional so any JSON object is accepted; which branch the
/// anchor builder takes depends on what is actually populated.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub pages: Option<Vec<AnalyzedPage>>,
    #[serde(default)]
    pub paragraphs: Option<Vec<AnalyzedParagraph>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzedPage {
    #[serde(default)]
    pub page_number: Option<u32>,
    #[serde(default)]
    pub lines: Option<Vec<AnalyzedLine>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzedLine {
    #[serde(default)]
    pub content: Option<String>,
    /// Flat `[x1, y1, x2, y2, ...]` outline; older payloads call it `boundingBox`.
    #[serde(default, alias = "boundingBox")]
    pub polygon: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzedParagraph {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub bounding_regions: Option<Vec<BoundingRegion>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BoundingRegion {
    #[serde(default)]
    pub page_number: Option<u32>,
    #[serde(default)]
    pub polygon: Option<Vec<f64>>,
}

impl AnalysisResult {
    /// Lenient conversion: anything that is not a readable analysis object
    /// becomes an empty result rather than an error.
    pub fn from_value(value: &serde_json::Value) -> AnalysisResult {
        match serde_json::from_value::<AnalysisResult>(value.clone()) {
            Ok(r) => r,
            Err(e) => {
                debug!(error = %e, "unrecognized analysis shape, treating as empty");
                AnalysisResult::default()
            }
        }
    }

    /// Flat-text convenience constructor.
    pub fn from_text(text: &str) -> AnalysisResult {
        AnalysisResult { content: Some(text.to_string()), ..Default::default() }
    }

    pub fn has_page_lines(&self) -> bool {
        self.pages
            .as_ref()
            .map(|pages| pages.iter().any(|p| p.lines.as_ref().map(|l| !l.is_empty()).unwrap_or(false)))
            .unwrap_or(false)
    }

    pub fn has_paragraphs(&self) -> bool {
        self.paragraphs.as_ref().map(|p| !p.is_empty()).unwrap_or(false)
    }

    /// True when any of the three shapes carries non-blank text.
    pub fn has_text(&self) -> bool {
        let blank = |s: &Option<String>| s.as_deref().map(|t| t.trim().is_empty()).unwrap_or(true);
        let pages_text = self.pages.iter().flatten().flat_map(|p| p.lines.iter().flatten()).any(|l| !blank(&l.content));
        let para_text = self.paragraphs.iter().flatten().any(|p| !blank(&p.content));
        pages_text || para_text || !blank(&self.content)
    }
}

impl AnalyzedLine {
    /// Top edge of the line outline, if geometry is present.
    pub fn top(&self) -> Option<f64> {
        let poly = self.polygon.as_ref()?;
        poly.iter().skip(1).step_by(2).copied().filter(|v| v.is_finite()).reduce(f64::min)
    }
}

impl AnalyzedParagraph {
    pub fn page_number(&self) -> u32 {
        self.bounding_regions
            .as_ref()
            .and_then(|r| r.first())
            .and_then(|r| r.page_number)
            .unwrap_or(1)
    }
}
