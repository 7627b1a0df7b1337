use contract_candidates::{
    dedup_key, display_date, iso_date, merge_candidates, normalize_value, sort_by_document_order, Candidate, SchemaField,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

#[test]
fn dates_normalize_to_iso_and_iso_is_fixed_point() {
    let iso = normalize_value("August 21, 2025", Some(SchemaField::EffectiveDate));
    assert_eq!(iso, "2025-08-21");
    assert_eq!(normalize_value(&iso, Some(SchemaField::EffectiveDate)), iso);
    assert_eq!(iso_date("08/21/2025").as_deref(), Some("2025-08-21"));
    assert_eq!(iso_date("21 August 2025").as_deref(), Some("2025-08-21"));
    assert_eq!(iso_date("Sept. 5 2025").as_deref(), Some("2025-09-05"));
    assert_eq!(display_date("August 1, 2025").as_deref(), Some("Aug 1, 2025"));
    assert_eq!(iso_date("February 30, 2025"), None);
}

#[test]
fn non_dates_strip_one_trailing_mark_without_case_folding() {
    assert_eq!(normalize_value("  $1,500.00, ", Some(SchemaField::RetainerAmount)), "$1,500.00");
    assert_eq!(normalize_value("California.", Some(SchemaField::GoverningLaw)), "California");
    assert_eq!(normalize_value("ACME Corp", None), "ACME Corp");
    // unparseable dates fall back to text rules
    assert_eq!(normalize_value("the first Monday,", Some(SchemaField::ExecutionDate)), "the first Monday");
}

#[test]
fn trailing_punctuation_shares_dedup_key() {
    let a = Candidate::assigned("$1,500.00", SchemaField::RetainerAmount, 1, 10.0);
    let b = Candidate::assigned("$1,500.00,", SchemaField::RetainerAmount, 1, 20.0);
    assert_eq!(dedup_key(&a).as_deref(), Some("retainerAmount::$1,500.00"));
    assert_eq!(dedup_key(&a), dedup_key(&b));
    let merged = merge_candidates(vec![a.clone(), b]);
    assert_eq!(merged, vec![a]);
}

#[test]
fn governing_law_under_preferred_heading_replaces_earlier() {
    let a = Candidate::assigned("Delaware", SchemaField::GoverningLaw, 1, 10.0).with_role_hint(Some("Miscellaneous"));
    let b = Candidate::assigned("Delaware", SchemaField::GoverningLaw, 2, 5.0).with_role_hint(Some("Governing Law"));
    let merged = merge_candidates(vec![a, b.clone()]);
    assert_eq!(merged, vec![b]);
}

#[test]
fn governing_law_not_replaced_when_first_is_preferred() {
    let a = Candidate::assigned("Delaware", SchemaField::GoverningLaw, 1, 10.0).with_role_hint(Some("1. JURISDICTION:"));
    let b = Candidate::assigned("Delaware", SchemaField::GoverningLaw, 2, 5.0).with_role_hint(Some("Governing Law"));
    let merged = merge_candidates(vec![a.clone(), b]);
    assert_eq!(merged, vec![a]);
}

#[test]
fn duplicates_backfill_missing_metadata_only() {
    let a = Candidate::assigned("August 1, 2025", SchemaField::EffectiveDate, 1, 10.0);
    let b = Candidate::assigned("Aug 1, 2025", SchemaField::EffectiveDate, 1, 50.0)
        .with_display_value(Some("Aug 1, 2025".into()))
        .with_role_hint(Some("Term"));
    let merged = merge_candidates(vec![a, b]);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].raw_value, "August 1, 2025");
    assert_eq!(merged[0].normalized.as_deref(), Some("2025-08-01"));
    assert_eq!(merged[0].display_value.as_deref(), Some("Aug 1, 2025"));
    assert_eq!(merged[0].role_hint.as_deref(), Some("Term"));
    assert_eq!(merged[0].y_position, 10.0);
}

#[test]
fn ambiguous_candidates_pass_through_in_place() {
    let both = vec![SchemaField::FeeAmount, SchemaField::RetainerAmount];
    let x = Candidate::ambiguous("$10.00", both.clone(), 1, 1.0);
    let y = Candidate::assigned("$20.00", SchemaField::FeeAmount, 1, 2.0);
    let z = Candidate::ambiguous("$10.00", both, 1, 3.0);
    let merged = merge_candidates(vec![x.clone(), y.clone(), z.clone()]);
    assert_eq!(merged, vec![x, y, z]);
}

#[test]
fn ambiguous_candidate_wire_form_has_null_schema_field() {
    let c = Candidate::ambiguous("$10.00", vec![SchemaField::RetainerAmount], 2, 7.5).with_role_hint(Some("Fees"));
    let v = serde_json::to_value(&c).unwrap();
    assert_eq!(
        v,
        serde_json::json!({
            "rawValue": "$10.00",
            "schemaField": null,
            "candidates": ["retainerAmount"],
            "roleHint": "Fees",
            "pageNumber": 2,
            "yPosition": 7.5
        })
    );
    let back: Candidate = serde_json::from_value(v).unwrap();
    assert_eq!(back, c);
    assert!(serde_json::from_value::<Candidate>(serde_json::json!({"rawValue": "x", "schemaField": null})).is_err());
}

fn arb_field() -> impl Strategy<Value = SchemaField> {
    prop_oneof![
        Just(SchemaField::EffectiveDate),
        Just(SchemaField::FeeAmount),
        Just(SchemaField::RetainerAmount),
        Just(SchemaField::GoverningLaw),
    ]
}

fn arb_candidate() -> impl Strategy<Value = Candidate> {
    let raw = prop_oneof![
        Just("August 1, 2025"),
        Just("2025-08-01"),
        Just("$1,500.00"),
        Just("$1,500.00,"),
        Just("Delaware"),
        Just("Delaware."),
    ];
    let hint = prop_oneof![Just(None), Just(Some("Governing Law")), Just(Some("Miscellaneous")), Just(Some("Fees"))];
    (raw, arb_field(), hint, 1u32..4, 0u32..500, any::<bool>()).prop_map(|(raw, field, hint, page, y, ambiguous)| {
        let c = if ambiguous {
            Candidate::ambiguous(raw, vec![field, SchemaField::Scope], page, y as f64)
        } else {
            Candidate::assigned(raw, field, page, y as f64)
        };
        c.with_role_hint(hint)
    })
}

proptest! {
    #[test]
    fn merge_is_idempotent(xs in proptest::collection::vec(arb_candidate(), 0..24)) {
        let once = merge_candidates(xs);
        let twice = merge_candidates(once.clone());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn document_order_depends_only_on_position(xs in proptest::collection::vec(arb_candidate(), 0..24)) {
        let sorted = sort_by_document_order(merge_candidates(xs));
        for w in sorted.windows(2) {
            let (a, b) = (&w[0], &w[1]);
            prop_assert!(a.page_number < b.page_number || (a.page_number == b.page_number && a.y_position <= b.y_position));
        }
        let mut reversed = sorted.clone();
        reversed.reverse();
        let resorted = sort_by_document_order(reversed);
        let positions = |v: &[Candidate]| v.iter().map(|c| (c.page_number, c.y_position as u32)).collect::<Vec<_>>();
        prop_assert_eq!(positions(&resorted), positions(&sorted));
    }

    #[test]
    fn iso_dates_are_fixed_points(year in 1900i32..2100, month in 1u32..13, day in 1u32..29) {
        let iso = format!("{:04}-{:02}-{:02}", year, month, day);
        prop_assert_eq!(normalize_value(&iso, Some(SchemaField::ExpirationDate)), iso.clone());
        let spelled = chrono::NaiveDate::from_ymd_opt(year, month, day).unwrap().format("%B %-d, %Y").to_string();
        prop_assert_eq!(normalize_value(&spelled, Some(SchemaField::EffectiveDate)), iso);
    }
}
