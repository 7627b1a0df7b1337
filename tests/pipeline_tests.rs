use contract_candidates::{derive_candidates, derive_candidates_from_value, AnalysisResult, Diagnostic, FieldMatch, SchemaField, Vocabulary};
use pretty_assertions::assert_eq;

const ENGAGEMENT: &str = "This Agreement is between Acme Corp (the \"Client\") and Jane Doe LLP (the \"Provider\"), effective as of August 1, 2025. Fees shall be billed hourly at $350.00/hour. An initial retainer of $1,500.00 is due. This agreement is governed by the laws of California.";

#[test]
fn engagement_letter_end_to_end() {
    let v = Vocabulary::default();
    let r = AnalysisResult::from_text(&format!("Governing Law\n{}", ENGAGEMENT));
    let ex = derive_candidates(&r, &v);

    let got: Vec<(Option<SchemaField>, &str)> = ex.candidates.iter().map(|c| (c.schema_field(), c.raw_value.as_str())).collect();
    assert_eq!(
        got,
        vec![
            (Some(SchemaField::PartyA), "Acme Corp"),
            (Some(SchemaField::PartyB), "Jane Doe LLP"),
            (Some(SchemaField::EffectiveDate), "August 1, 2025"),
            (Some(SchemaField::FeeAmount), "$350.00"),
            (Some(SchemaField::RetainerAmount), "$1,500.00"),
            (Some(SchemaField::GoverningLaw), "California"),
        ]
    );
    assert_eq!(ex.candidates[2].normalized.as_deref(), Some("2025-08-01"));
    assert_eq!(ex.ambiguous_count(), 0);
    assert!(ex.diagnostics.is_empty());
    assert_eq!(ex.clause_blocks.len(), 1);
    assert_eq!(ex.clause_blocks[0].heading, "Governing Law");
}

#[test]
fn unlabelled_amount_after_fee_narrows_to_retainer() {
    let v = Vocabulary::default();
    let r = AnalysisResult::from_text(
        "Fees are billed at $200.00 per hour. The client acknowledges these terms. A further sum of $900.00 is due upon signing.",
    );
    let ex = derive_candidates(&r, &v);
    assert_eq!(ex.candidates.len(), 2);
    assert_eq!(ex.candidates[0].schema_field(), Some(SchemaField::FeeAmount));
    assert_eq!(ex.candidates[1].raw_value, "$900.00");
    assert_eq!(ex.candidates[1].field, FieldMatch::Ambiguous(vec![SchemaField::RetainerAmount]));
    assert_eq!(ex.ambiguous_count(), 1);
}

#[test]
fn governing_law_heading_wins_over_inline_mention() {
    let v = Vocabulary::default();
    let r = AnalysisResult::from_text(
        "MISCELLANEOUS\nThis Agreement is governed by the laws of Delaware.\nGOVERNING LAW\nThe laws of Delaware shall govern.",
    );
    let ex = derive_candidates(&r, &v);
    let law: Vec<_> = ex.candidates.iter().filter(|c| c.schema_field() == Some(SchemaField::GoverningLaw)).collect();
    assert_eq!(law.len(), 1);
    assert_eq!(law[0].role_hint.as_deref(), Some("GOVERNING LAW"));
    assert_eq!(law[0].y_position, 300.0);
}

#[test]
fn fee_clause_on_a_page_yields_structure_and_amount() {
    let v = Vocabulary::default();
    let value = serde_json::json!({
        "pages": [{
            "pageNumber": 1,
            "lines": [
                {"content": "FEES", "polygon": [0.0, 10.0, 5.0, 10.0, 5.0, 12.0, 0.0, 12.0]},
                {"content": "Client shall pay a flat fee of", "polygon": [0.0, 20.0, 5.0, 20.0, 5.0, 22.0, 0.0, 22.0]},
                {"content": "$2,000.00 upon signing.", "polygon": [0.0, 30.0, 5.0, 30.0, 5.0, 32.0, 0.0, 32.0]}
            ]
        }]
    });
    let ex = derive_candidates_from_value(&value, &v);
    let got: Vec<(Option<SchemaField>, &str)> = ex.candidates.iter().map(|c| (c.schema_field(), c.raw_value.as_str())).collect();
    assert_eq!(got, vec![(Some(SchemaField::FeeStructure), "flat fee"), (Some(SchemaField::FeeAmount), "$2,000.00")]);
    assert_eq!(ex.candidates[0].normalized.as_deref(), Some("Flat"));
}

#[test]
fn fee_structure_keeps_document_wording() {
    let v = Vocabulary::default();
    let doc = "FEES\nAttorney time is charged per hour.";
    let ex = derive_candidates(&AnalysisResult::from_text(doc), &v);
    assert_eq!(ex.candidates.len(), 1);
    assert_eq!(ex.candidates[0].raw_value, "per hour");
    assert_eq!(ex.candidates[0].normalized.as_deref(), Some("Hourly"));
    assert!(doc.contains(ex.candidates[0].raw_value.as_str()));
}

#[test]
fn scanned_signature_block_yields_execution_date() {
    let v = Vocabulary::default();
    let line = |text: &str, top: f64| serde_json::json!({"content": text, "polygon": [0.0, top, 9.0, top, 9.0, top + 2.0, 0.0, top + 2.0]});
    let value = serde_json::json!({
        "pages": [{
            "pageNumber": 4,
            "lines": [line("SIGNATURES", 10.0), line("Date:", 20.0), line("August 5, 2025", 30.0), line("Jane Doe", 40.0)]
        }]
    });
    let ex = derive_candidates_from_value(&value, &v);
    let executed: Vec<_> = ex.candidates.iter().filter(|c| c.schema_field() == Some(SchemaField::ExecutionDate)).collect();
    assert_eq!(executed.len(), 1);
    assert_eq!(executed[0].raw_value, "August 5, 2025");
    assert_eq!(executed[0].normalized.as_deref(), Some("2025-08-05"));
    assert_eq!(executed[0].page_number, 4);
    assert_eq!(executed[0].y_position, 30.0);
}

#[test]
fn empty_and_malformed_inputs_give_empty_extraction() {
    let v = Vocabulary::default();
    for value in [serde_json::json!(null), serde_json::json!(42), serde_json::json!({"foo": 1}), serde_json::json!({"content": ""})] {
        let ex = derive_candidates_from_value(&value, &v);
        assert!(ex.candidates.is_empty());
        assert!(ex.diagnostics.is_empty());
        assert_eq!(ex.anchor_count, 0);
    }
}

#[test]
fn text_without_anchors_is_reported() {
    let v = Vocabulary::default();
    let value = serde_json::json!({"pages": [{"lines": [{"content": "   "}]}], "content": "Some text"});
    let ex = derive_candidates_from_value(&value, &v);
    assert_eq!(ex.diagnostics, vec![Diagnostic::NoAnchorsFromNonEmptyInput]);
}

#[test]
fn document_without_fields_is_reported() {
    let v = Vocabulary::default();
    let ex = derive_candidates(&AnalysisResult::from_text("Opening remarks\nRECITALS\nThe parties wish to cooperate."), &v);
    assert!(ex.candidates.is_empty());
    assert_eq!(ex.diagnostics, vec![Diagnostic::UnassignedAnchors { count: 1 }, Diagnostic::NoCandidates]);
    let json = serde_json::to_value(&ex.diagnostics).unwrap();
    assert_eq!(json[0]["kind"], "unassigned_anchors");
}

#[test]
fn custom_vocabulary_changes_cues() {
    let mut v = Vocabulary::default();
    v.governing_law_cues = vec!["subject to".to_string()];
    let r = AnalysisResult::from_text("This Agreement is subject to the laws of Ontario.\nIt is governed by the laws of Quebec.");
    let ex = derive_candidates(&r, &v);
    let law: Vec<&str> = ex.candidates.iter().map(|c| c.raw_value.as_str()).collect();
    assert_eq!(law, vec!["Ontario"]);
}
