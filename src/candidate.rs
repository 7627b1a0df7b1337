use std::fmt;

use serde::{Deserialize, Serialize};

/// Contract variables a candidate can populate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SchemaField {
    PartyA,
    PartyB,
    EffectiveDate,
    ExpirationDate,
    ExecutionDate,
    FeeStructure,
    FeeAmount,
    RetainerAmount,
    GoverningLaw,
    Scope,
}

impl SchemaField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaField::PartyA => "partyA",
            SchemaField::PartyB => "partyB",
            SchemaField::EffectiveDate => "effectiveDate",
            SchemaField::ExpirationDate => "expirationDate",
            SchemaField::ExecutionDate => "executionDate",
            SchemaField::FeeStructure => "feeStructure",
            SchemaField::FeeAmount => "feeAmount",
            SchemaField::RetainerAmount => "retainerAmount",
            SchemaField::GoverningLaw => "governingLaw",
            SchemaField::Scope => "scope",
        }
    }

    /// Date-like fields are keyed by calendar date rather than literal text.
    pub fn is_date_like(&self) -> bool {
        self.as_str().to_ascii_lowercase().contains("date")
    }
}

impl fmt::Display for SchemaField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of classifying a value against the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldMatch {
    Assigned(SchemaField),
    /// Plausible fields, in preference order; a human picks one.
    Ambiguous(Vec<SchemaField>),
}

impl FieldMatch {
    pub fn schema_field(&self) -> Option<SchemaField> {
        match self {
            FieldMatch::Assigned(f) => Some(*f),
            FieldMatch::Ambiguous(_) => None,
        }
    }

    /// Label set shown to the reviewer.
    pub fn options(&self) -> Vec<SchemaField> {
        match self {
            FieldMatch::Assigned(f) => vec![*f],
            FieldMatch::Ambiguous(fs) => fs.clone(),
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, FieldMatch::Ambiguous(_))
    }
}

/// A detected field occurrence, positioned at the anchor it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "CandidateRecord", try_from = "CandidateRecord")]
pub struct Candidate {
    pub raw_value: String,
    pub field: FieldMatch,
    pub normalized: Option<String>,
    pub display_value: Option<String>,
    pub role_hint: Option<String>,
    pub page_number: u32,
    pub y_position: f64,
}

impl Candidate {
    pub fn assigned(raw_value: impl Into<String>, field: SchemaField, page_number: u32, y_position: f64) -> Candidate {
        Candidate {
            raw_value: raw_value.into(),
            field: FieldMatch::Assigned(field),
            normalized: None,
            display_value: None,
            role_hint: None,
            page_number,
            y_position,
        }
    }

    pub fn ambiguous(raw_value: impl Into<String>, options: Vec<SchemaField>, page_number: u32, y_position: f64) -> Candidate {
        Candidate {
            raw_value: raw_value.into(),
            field: FieldMatch::Ambiguous(options),
            normalized: None,
            display_value: None,
            role_hint: None,
            page_number,
            y_position,
        }
    }

    pub fn with_role_hint(mut self, role_hint: Option<&str>) -> Candidate {
        self.role_hint = role_hint.map(|s| s.to_string());
        self
    }

    pub fn with_normalized(mut self, normalized: Option<String>) -> Candidate {
        self.normalized = normalized;
        self
    }

    pub fn with_display_value(mut self, display_value: Option<String>) -> Candidate {
        self.display_value = display_value;
        self
    }

    pub fn schema_field(&self) -> Option<SchemaField> {
        self.field.schema_field()
    }
}

/// Wire shape: nullable `schemaField` plus the `candidates` label set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRecord {
    pub raw_value: String,
    pub schema_field: Option<SchemaField>,
    #[serde(default)]
    pub candidates: Vec<SchemaField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalized: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_hint: Option<String>,
    #[serde(default = "first_page")]
    pub page_number: u32,
    #[serde(default)]
    pub y_position: f64,
}

fn first_page() -> u32 {
    1
}

impl From<Candidate> for CandidateRecord {
    fn from(c: Candidate) -> Self {
        CandidateRecord {
            schema_field: c.field.schema_field(),
            candidates: c.field.options(),
            raw_value: c.raw_value,
            normalized: c.normalized,
            display_value: c.display_value,
            role_hint: c.role_hint,
            page_number: c.page_number,
            y_position: c.y_position,
        }
    }
}

impl TryFrom<CandidateRecord> for Candidate {
    type Error = String;

    fn try_from(r: CandidateRecord) -> Result<Self, Self::Error> {
        let field = match r.schema_field {
            Some(f) => FieldMatch::Assigned(f),
            None if !r.candidates.is_empty() => FieldMatch::Ambiguous(r.candidates),
            None => return Err(format!("candidate {:?} has neither schemaField nor candidates", r.raw_value)),
        };
        Ok(Candidate {
            raw_value: r.raw_value,
            field,
            normalized: r.normalized,
            display_value: r.display_value,
            role_hint: r.role_hint,
            page_number: r.page_number,
            y_position: r.y_position,
        })
    }
}
