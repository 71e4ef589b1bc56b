use pitwall_common::{
    CellValue, CellWrite, DomainValue, Keyword, coerce_payload, normalize_inbound,
    normalize_outbound,
};

fn samples() -> Vec<CellValue> {
    vec![
        CellValue::Empty,
        CellValue::text(""),
        CellValue::text("-"),
        CellValue::text(" - "),
        CellValue::text("\t"),
        CellValue::text("12,5"),
        CellValue::text("42"),
        CellValue::text("-7"),
        CellValue::text("0.0"),
        CellValue::text("Opt"),
        CellValue::text("opt"),
        CellValue::text("OPT"),
        CellValue::text(" best "),
        CellValue::text("Tyres"),
        CellValue::text("Dry"),
        CellValue::text("Monaco"),
        CellValue::text("1,2,3"),
        CellValue::Number(20.0),
        CellValue::Number(-3.75),
        CellValue::Bool(false),
    ]
}

#[test]
fn inbound_outbound_inbound_is_stable() {
    for raw in samples() {
        let first = normalize_inbound(&raw);
        let written = normalize_outbound(&first).into_cell_value();
        let second = normalize_inbound(&written);
        assert_eq!(second, first, "round-trip drifted for {raw:?}");
    }
}

#[test]
fn documented_conversions() {
    assert_eq!(normalize_inbound(&"12,5".into()), DomainValue::Real(12.5));
    assert_eq!(normalize_inbound(&"42".into()), DomainValue::Int(42));
    for spelling in ["Opt", "opt", "OPT"] {
        assert_eq!(
            normalize_inbound(&spelling.into()),
            DomainValue::Keyword(Keyword::Opt)
        );
    }
    for absent in [CellValue::text(""), CellValue::Empty, CellValue::text("-")] {
        assert!(normalize_inbound(&absent).is_absent(), "{absent:?}");
    }
}

#[test]
fn clearing_is_idempotent() {
    let mut cell = CellValue::Empty;
    for _ in 0..3 {
        let write = coerce_payload(&cell);
        assert_eq!(write, CellWrite::Clear);
        cell = write.into_cell_value();
        assert!(cell.is_empty());
    }
}

#[test]
fn payload_keywords_are_canonicalised_before_writing() {
    assert_eq!(
        coerce_payload(&"tyres".into()),
        CellWrite::Set(CellValue::text("Tyres"))
    );
    assert_eq!(
        coerce_payload(&"2,25".into()),
        CellWrite::Set(CellValue::Number(2.25))
    );
    assert_eq!(
        coerce_payload(&"Wet".into()),
        CellWrite::Set(CellValue::text("Wet"))
    );
}

#[test]
fn cell_values_decode_from_json_scalars() {
    let values: Vec<CellValue> =
        serde_json::from_str(r#"[null, true, 5, 2.5, "Dry"]"#).expect("decode scalars");
    assert_eq!(
        values,
        vec![
            CellValue::Empty,
            CellValue::Bool(true),
            CellValue::Number(5.0),
            CellValue::Number(2.5),
            CellValue::text("Dry"),
        ]
    );
    assert!(serde_json::from_str::<CellValue>("[1]").is_err());
}

#[test]
fn domain_values_serialise_as_plain_json() {
    let encoded = serde_json::to_string(&vec![
        DomainValue::Absent,
        DomainValue::Keyword(Keyword::Best),
        DomainValue::Int(20),
        DomainValue::Real(12.5),
        DomainValue::Text("Dry".into()),
    ])
    .expect("encode");
    assert_eq!(encoded, r#"[null,"Best",20,12.5,"Dry"]"#);
}
