use serde_json::json;
use sketch_fixture_bindings::{AnyLayer, BooleanOperation, BundleId, Page, Rect};
use sketch_schema::Binding;
use sketch_schema::binding::DecodeError;

fn page_json() -> serde_json::Value {
    json!({
        "_class": "page",
        "do_objectID": "8D1A5C4E-0000-4000-8000-000000000001",
        "name": "Page 1",
        "frame": {"_class": "rect", "x": 0, "y": 0, "width": 1200, "height": 800.5},
        "layers": [{
            "_class": "group",
            "do_objectID": "G1",
            "name": "Header",
            "frame": {"_class": "rect", "x": 10, "y": 20, "width": 300, "height": 40},
            "booleanOperation": -1,
            "layers": [{
                "_class": "text",
                "do_objectID": "T1",
                "name": "Title",
                "frame": {"_class": "rect", "x": 0, "y": 0, "width": 120, "height": 24},
                "attributedString": {"string": "Hello"}
            }]
        }],
        "exportOptions": {"exportFormats": []}
    })
}

#[test]
fn test_decode_page() {
    let page = Page::decode(&page_json()).expect("decode");
    assert_eq!(page.name, "Page 1");
    assert_eq!(page.layers.len(), 1);

    let AnyLayer::Group(group) = &page.layers[0] else {
        panic!("expected a group, got {:?}", page.layers[0]);
    };
    assert_eq!(group.name, "Header");
    assert_eq!(group.boolean_operation, Some(BooleanOperation::None));
    assert!(matches!(group.layers[0], AnyLayer::Text(_)));
    assert!(page.extra_data.contains_key("exportOptions"));
    assert_eq!(Page::TYPE_NAME, "Page");
}

#[test]
fn test_encode_keeps_number_representation_and_unknown_fields() {
    let input = page_json();
    let page = Page::decode(&input).expect("decode");
    let output = page.encode().expect("encode");
    assert_eq!(output, input);
    assert_eq!(output["frame"]["x"], json!(0));
    assert_eq!(serde_json::to_string(&output["frame"]["x"]).expect("json"), "0");
}

#[test]
fn test_nested_missing_field_reports_full_path() {
    let mut input = page_json();
    input["layers"][0]["layers"][0]
        .as_object_mut()
        .expect("object")
        .remove("frame");

    let err = Page::decode(&input).unwrap_err();
    assert_eq!(
        err,
        DecodeError::MissingField {
            path: "$.layers[0].layers[0].frame".into()
        }
    );

    // serde entry point reports the same location
    let err = serde_json::from_value::<Page>(input).unwrap_err();
    assert!(err.to_string().contains("$.layers[0].layers[0].frame"));
}

#[test]
fn test_literal_fields_are_enforced() {
    let err = Rect::decode(&json!({"_class": "text", "x": 0, "y": 0, "width": 1, "height": 1}))
        .unwrap_err();
    assert!(matches!(err, DecodeError::TypeMismatch { .. }));
    assert_eq!(err.path(), "$._class");

    let mut input = page_json();
    input["frame"]["_class"] = json!("oval");
    let err = Page::decode(&input).unwrap_err();
    assert_eq!(err.path(), "$.frame._class");
}

#[test]
fn test_union_and_enum_errors_carry_paths() {
    let mut input = page_json();
    input["layers"][0]["layers"][0]["_class"] = json!("oval");
    let err = Page::decode(&input).unwrap_err();
    assert!(matches!(err, DecodeError::UnknownTag { .. }));
    assert_eq!(err.path(), "$.layers[0].layers[0]");

    let mut input = page_json();
    input["layers"][0]["booleanOperation"] = json!(7);
    let err = Page::decode(&input).unwrap_err();
    assert!(matches!(err, DecodeError::UnknownEnumValue { .. }));
    assert_eq!(err.path(), "$.layers[0].booleanOperation");

    let err = BundleId::decode(&json!("com.example.other")).unwrap_err();
    assert!(matches!(err, DecodeError::UnknownEnumValue { .. }));
    assert_eq!(
        BundleId::decode(&json!("com.bohemiancoding.sketch3")).expect("decode"),
        BundleId::PublicRelease
    );
}

#[test]
fn test_type_mismatch_inside_array() {
    let mut input = page_json();
    input["layers"][0]["layers"][0]["name"] = json!(42);
    let err = Page::decode(&input).unwrap_err();
    assert_eq!(
        err,
        DecodeError::TypeMismatch {
            path: "$.layers[0].layers[0].name".into(),
            expected: "string".into(),
            found: "integer",
        }
    );
}
