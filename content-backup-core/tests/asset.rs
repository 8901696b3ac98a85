use content_backup_core::asset::ContentAsset;
use content_backup_core::BackupError;
use serde_json::json;

#[test]
fn string_and_integer_ids_are_accepted() {
    let text = ContentAsset::try_from(json!({"id": "a1"})).unwrap();
    assert_eq!(text.id(), "a1");

    let number = ContentAsset::try_from(json!({"id": 90210, "name": "Newsletter"})).unwrap();
    assert_eq!(number.id(), "90210");
    assert_eq!(number.fields()["name"], "Newsletter");
}

#[test]
fn items_without_usable_id_are_fetch_errors() {
    let cases = vec![
        ("missing id", json!({"name": "no id"})),
        ("null id", json!({"id": null})),
        ("blank id", json!({"id": "  "})),
        ("not an object", json!(["a1"])),
    ];
    for (name, value) in cases {
        let err = ContentAsset::try_from(value).unwrap_err();
        assert!(matches!(err, BackupError::Fetch(_)), "case {name}: got {err:?}");
    }
}

#[test]
fn pretty_json_keeps_field_order() {
    let asset = ContentAsset::try_from(json!({"name": "Hero", "id": "a1", "assetType": {"id": 208}})).unwrap();
    let body = asset.to_pretty_json().unwrap();
    let name_at = body.find("\"name\"").unwrap();
    let id_at = body.find("\"id\"").unwrap();
    assert!(name_at < id_at, "field order changed: {body}");
}
