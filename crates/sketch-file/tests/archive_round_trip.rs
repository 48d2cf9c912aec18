use bytes::Bytes;
use serde_json::{Value, json};
use sketch_file::archive::{EntryContent, read_entries, write_entries};
use sketch_file::{
    ArchiveCodec, ArchiveEntry, ArchiveErrorKind, ArchiveOptions, AssetCheck, DocumentGraph,
};
use sketch_schema::binding::{Data, Record};
use sketch_schema::bundle::SchemaBundle;
use sketch_schema::compiler::compile;
use sketch_schema::graph::SchemaGraph;
use sketch_schema::Bindings;
use std::collections::BTreeMap;

const PAGE_1: &str = "8D1A5C4E-0000-4000-8000-000000000001";
const PAGE_2: &str = "8D1A5C4E-0000-4000-8000-000000000002";
const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

fn codec_with(options: ArchiveOptions) -> ArchiveCodec {
    let dir = concat!(env!("CARGO_MANIFEST_DIR"), "/../sketch-schema/tests/fixtures/bundle");
    let bundle = SchemaBundle::load_from_dir(dir).expect("load bundle");
    let graph = SchemaGraph::load(&bundle).expect("load graph");
    let catalog = compile(&graph).expect("compile");
    ArchiveCodec::new(Bindings::new(catalog), options)
}

fn codec() -> ArchiveCodec {
    codec_with(ArchiveOptions::default())
}

fn page_ref(id: &str) -> Value {
    json!({
        "_class": "MSJSONFileReference",
        "_ref_class": "MSImmutablePage",
        "_ref": format!("pages/{id}")
    })
}

fn rect() -> Value {
    json!({ "_class": "rect", "constrainProportions": false, "x": 0, "y": 12.5, "width": 100, "height": 40 })
}

fn document_json() -> Value {
    json!({
        "_class": "document",
        "do_objectID": "0F4C1D9E-1111-4000-8000-00000000D0C0",
        "currentPageIndex": 0,
        "assets": { "_class": "assetCollection", "colors": [], "images": [] },
        "pages": [page_ref(PAGE_1), page_ref(PAGE_2)],
        "colorSpace": 1
    })
}

fn meta_json() -> Value {
    json!({
        "app": "com.bohemiancoding.sketch3",
        "appVersion": "99.1",
        "build": 170000,
        "version": 146,
        "compatibilityVersion": 99,
        "pagesAndArtboards": { PAGE_1: { "name": "Cover" } },
        "autosaved": 0
    })
}

fn page_1_json() -> Value {
    json!({
        "_class": "page",
        "do_objectID": PAGE_1,
        "name": "Cover",
        "frame": rect(),
        "layers": [
            {
                "_class": "bitmap",
                "do_objectID": "B1",
                "name": "Photo",
                "frame": rect(),
                "image": {
                    "_class": "MSJSONFileReference",
                    "_ref_class": "MSImageData",
                    "_ref": "images/photo"
                },
                "clippingMaskMode": 0
            },
            {
                "_class": "text",
                "do_objectID": "T1",
                "name": "Title",
                "frame": rect(),
                "attributedString": { "string": "Hello" }
            }
        ]
    })
}

fn page_2_json() -> Value {
    json!({
        "_class": "page",
        "do_objectID": PAGE_2,
        "name": "Symbols",
        "layers": [],
        "horizontalRulerData": { "_class": "rulerData", "base": 0, "guides": [] }
    })
}

fn fixture_entries() -> Vec<ArchiveEntry> {
    vec![
        ArchiveEntry::json(format!("pages/{PAGE_2}.json"), page_2_json()),
        ArchiveEntry::json("meta.json", meta_json()),
        ArchiveEntry::binary("images/photo.png", Bytes::from_static(PNG)),
        ArchiveEntry::json("document.json", document_json()),
        ArchiveEntry::json("user.json", json!({ "document": { "pageListHeight": 85 } })),
        ArchiveEntry::json(format!("pages/{PAGE_1}.json"), page_1_json()),
        ArchiveEntry::json("workspace/assistants.json", json!({ "assistants": [] })),
        ArchiveEntry::binary("previews/preview.png", Bytes::from_static(PNG)),
        ArchiveEntry::binary("text-previews/text-previews.pdf", b"%PDF-1.3".to_vec()),
    ]
}

fn fixture_archive() -> Vec<u8> {
    write_entries(&fixture_entries()).expect("write fixture")
}

fn archive_without(path: &str) -> Vec<u8> {
    let entries: Vec<_> = fixture_entries()
        .into_iter()
        .filter(|entry| entry.path != path)
        .collect();
    write_entries(&entries).expect("write fixture")
}

fn archive_replacing(path: &str, value: Value) -> Vec<u8> {
    let entries: Vec<_> = fixture_entries()
        .into_iter()
        .map(|entry| {
            if entry.path == path {
                ArchiveEntry::json(path, value.clone())
            } else {
                entry
            }
        })
        .collect();
    write_entries(&entries).expect("write fixture")
}

fn contents_by_path(bytes: &[u8]) -> BTreeMap<String, EntryContent> {
    read_entries(bytes)
        .expect("read entries")
        .into_iter()
        .map(|entry| (entry.path.to_string(), entry.content))
        .collect()
}

#[test]
fn test_open_decodes_every_entry() {
    let graph = codec().open(&fixture_archive()).expect("open");

    assert_eq!(graph.page_ids().expect("page ids"), [PAGE_1, PAGE_2]);
    assert_eq!(graph.document().type_name, "Document");
    assert_eq!(graph.meta().type_name, "Meta");
    assert!(graph.document().extra_data().contains_key("colorSpace"));

    let cover = graph.page(PAGE_1).expect("cover page");
    assert_eq!(cover.get_str("name"), Some("Cover"));
    let layers = cover.get("layers").and_then(Data::as_array).expect("layers");
    assert_eq!(layers[0].as_record().expect("bitmap").type_name, "Bitmap");

    assert!(matches!(graph.user(), Some(Data::Unknown(_))));
    assert!(graph.workspace().contains_key("assistants"));
    assert_eq!(graph.asset("images/photo.png").map(|b| b.as_ref()), Some(PNG));
    assert!(graph.asset("text-previews/text-previews.pdf").is_some());
    assert_eq!(graph.asset_refs().into_iter().collect::<Vec<_>>(), ["images/photo"]);
}

#[test]
fn test_save_preserves_every_entry() {
    let codec = codec();
    let saved = codec.save(&codec.open(&fixture_archive()).expect("open")).expect("save");

    let original = contents_by_path(&fixture_archive());
    let round_tripped = contents_by_path(&saved);
    assert_eq!(round_tripped, original);
}

#[test]
fn test_resaving_is_byte_identical() {
    let codec = codec();
    let graph = codec.open(&fixture_archive()).expect("open");
    let first = codec.save(&graph).expect("save");

    let reopened = codec.open(&first).expect("reopen");
    assert_eq!(reopened, graph);
    let second = codec.save(&reopened).expect("save again");
    assert_eq!(first, second);
}

#[test]
fn test_saved_entries_follow_stable_order() {
    let codec = codec();
    let saved = codec.save(&codec.open(&fixture_archive()).expect("open")).expect("save");
    let paths: Vec<String> = read_entries(&saved)
        .expect("read")
        .into_iter()
        .map(|entry| entry.path.to_string())
        .collect();

    assert_eq!(
        paths,
        [
            "document.json".to_string(),
            "meta.json".to_string(),
            "user.json".to_string(),
            format!("pages/{PAGE_1}.json"),
            format!("pages/{PAGE_2}.json"),
            "workspace/assistants.json".to_string(),
            "images/photo.png".to_string(),
            "previews/preview.png".to_string(),
            "text-previews/text-previews.pdf".to_string(),
        ]
    );
}

#[test]
fn test_listed_page_must_exist() {
    let path = format!("pages/{PAGE_2}.json");
    let err = codec().open(&archive_without(&path)).unwrap_err();
    assert_eq!(err.kind(), &ArchiveErrorKind::MissingPage);
    assert_eq!(err.entry(), Some(path.as_str()));
}

#[test]
fn test_asset_reference_must_resolve_on_open() {
    let err = codec().open(&archive_without("images/photo.png")).unwrap_err();
    assert_eq!(err.kind(), &ArchiveErrorKind::MissingAsset);
    assert_eq!(err.entry(), Some("images/photo"));
}

#[test]
fn test_deferred_asset_check_still_runs_on_save() {
    let codec = codec_with(ArchiveOptions::new().asset_check(AssetCheck::Deferred).build());
    let mut graph = codec.open(&archive_without("images/photo.png")).expect("deferred open");

    let err = codec.save(&graph).unwrap_err();
    assert_eq!(err.kind(), &ArchiveErrorKind::MissingAsset);

    graph.insert_asset("images/photo.jpg", Bytes::from_static(b"\xff\xd8\xff"));
    codec.save(&graph).expect("save once the asset exists");
}

#[test]
fn test_save_rejects_assets_at_json_entry_paths() {
    let codec = codec();
    let mut graph = codec.open(&fixture_archive()).expect("open");
    graph.insert_asset("pages/X.json", Bytes::from_static(PNG));

    let err = codec.save(&graph).unwrap_err();
    assert_eq!(err.kind(), &ArchiveErrorKind::InvalidDocument);
    assert_eq!(err.entry(), Some("pages/X.json"));

    graph.remove_asset("pages/X.json");
    let bytes = codec.save(&graph).expect("save");
    codec.open(&bytes).expect("reopen");
}

#[test]
fn test_required_entries_must_be_present() {
    for path in ["document.json", "meta.json"] {
        let err = codec().open(&archive_without(path)).unwrap_err();
        assert_eq!(err.kind(), &ArchiveErrorKind::MissingEntry, "{path}");
        assert_eq!(err.entry(), Some(path));
    }

    codec().open(&archive_without("user.json")).expect("user.json is optional");
}

#[test]
fn test_decode_errors_name_the_entry_and_field() {
    let path = format!("pages/{PAGE_1}.json");
    let mut page = page_1_json();
    page["layers"][1]["_class"] = json!("shapeGroup");

    let err = codec().open(&archive_replacing(&path, page)).unwrap_err();
    assert_eq!(err.kind(), &ArchiveErrorKind::Decode);
    assert_eq!(err.entry(), Some(path.as_str()));
    assert!(err.to_string().contains("$.layers[1]"), "{err}");
}

#[test]
fn test_unknown_enum_value_is_a_decode_error() {
    let mut meta = meta_json();
    meta["app"] = json!("com.example.other");
    let err = codec().open(&archive_replacing("meta.json", meta)).unwrap_err();
    assert_eq!(err.kind(), &ArchiveErrorKind::Decode);
    assert_eq!(err.entry(), Some("meta.json"));
}

#[test]
fn test_entry_of_the_wrong_class_is_invalid() {
    let path = format!("pages/{PAGE_2}.json");
    let err = codec().open(&archive_replacing(&path, document_json())).unwrap_err();
    assert_eq!(err.kind(), &ArchiveErrorKind::InvalidDocument);
    assert_eq!(err.entry(), Some(path.as_str()));
}

#[test]
fn test_corrupt_archive_is_rejected() {
    let mut bytes = fixture_archive();
    bytes.truncate(bytes.len() / 2);
    let err = codec().open(&bytes).unwrap_err();
    assert_eq!(err.kind(), &ArchiveErrorKind::Zip);
}

#[test]
fn test_unknown_fields_survive_edits() {
    let codec = codec();
    let mut graph = codec.open(&fixture_archive()).expect("open");
    graph
        .page_mut(PAGE_1)
        .expect("cover page")
        .insert("name", Data::from("Renamed"));

    let saved = codec.save(&graph).expect("save");
    let contents = contents_by_path(&saved);
    let Some(EntryContent::Json(page)) = contents.get(&format!("pages/{PAGE_1}.json")) else {
        panic!("cover page missing from saved archive");
    };
    assert_eq!(page["name"], "Renamed");
    assert_eq!(page["layers"][0]["clippingMaskMode"], 0);

    let Some(EntryContent::Json(page_2)) = contents.get(&format!("pages/{PAGE_2}.json")) else {
        panic!("second page missing from saved archive");
    };
    assert_eq!(page_2["horizontalRulerData"]["_class"], "rulerData");
}

#[test]
fn test_object_id_combines_page_ids() {
    let graph = codec().open(&fixture_archive()).expect("open");
    assert_eq!(graph.object_id().expect("object id"), "00000000000000000000000000000003");
}

#[test]
fn test_pages_can_be_added_and_removed() {
    let codec = codec();
    let mut graph = codec.open(&fixture_archive()).expect("open");

    let new_id = "8D1A5C4E-0000-4000-8000-000000000004";
    let page = Record::new("Page")
        .with("_class", Data::from("page"))
        .with("do_objectID", Data::from(new_id))
        .with("name", Data::from("Added"))
        .with("layers", Data::Array(Vec::new()));
    graph.insert_page(page).expect("insert");
    assert!(graph.remove_page(PAGE_2).is_some());

    let reopened = codec.open(&codec.save(&graph).expect("save")).expect("reopen");
    assert_eq!(reopened.page_ids().expect("page ids"), [PAGE_1, new_id]);
    assert_eq!(reopened.page(new_id).and_then(|p| p.get_str("name")), Some("Added"));
    assert!(reopened.page(PAGE_2).is_none());
    assert_eq!(reopened.object_id().expect("object id"), "00000000000000000000000000000005");
}

#[test]
fn test_new_documents_can_be_saved() {
    let codec = codec();
    let document = Record::new("Document")
        .with("_class", Data::from("document"))
        .with("do_objectID", Data::from("D0C"))
        .with("pages", Data::Array(Vec::new()));
    let meta = codec
        .bindings()
        .decode("Meta", &meta_json())
        .expect("decode meta");
    let meta = meta.as_record().cloned().expect("meta record");

    let graph = DocumentGraph::new(document, meta);
    let reopened = codec.open(&codec.save(&graph).expect("save")).expect("reopen");
    assert_eq!(reopened, graph);
    assert!(reopened.user().is_none());
}

#[test]
fn test_archives_round_trip_through_disk() {
    let codec = codec();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("design.sketch");

    std::fs::write(&path, fixture_archive()).expect("write fixture");
    let graph = codec.open_path(&path).expect("open");

    let out = dir.path().join("copy.sketch");
    codec.save_path(&graph, &out).expect("save");
    assert_eq!(codec.open_path(&out).expect("reopen"), graph);

    let err = codec.open_path(dir.path().join("missing.sketch")).unwrap_err();
    assert_eq!(err.kind(), &ArchiveErrorKind::Io);
}
