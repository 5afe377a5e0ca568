use figment::Jail;

use vmsearch_core::config::{expand_path, Config, Protocol, SortMode};
use vmsearch_core::record::{decode_line, RejectReason};
use vmsearch_core::types::Document;

const VALID: &str = r#"{"ID":1,"date":"2023-01-01","slug":"docker-basics","type":"article","title":"Docker Basics","status":"published","content":"Containers 101"}"#;

#[test]
fn decode_valid_line() {
    let doc = decode_line(VALID).expect("valid line");
    assert_eq!(
        doc,
        Document {
            id: 1,
            date: "2023-01-01".into(),
            slug: "docker-basics".into(),
            kind: "article".into(),
            title: "Docker Basics".into(),
            status: "published".into(),
            content: "Containers 101".into(),
        }
    );
}

#[test]
fn decode_ignores_extra_fields() {
    let line = VALID.replace("}", r#","author":"someone"}"#);
    assert!(decode_line(&line).is_ok());
}

#[test]
fn decode_reports_missing_fields_in_schema_order() {
    let err = decode_line(r#"{"ID":3,"title":"No body","date":"2023-02-02"}"#).unwrap_err();
    assert_eq!(
        err,
        RejectReason::MissingFields(vec!["slug".into(), "type".into(), "status".into(), "content".into()])
    );
    assert_eq!(err.to_string(), "Missing required fields: slug, type, status, content");
}

#[test]
fn decode_malformed_is_deterministic() {
    let first = decode_line("{not json").unwrap_err();
    let second = decode_line("{not json").unwrap_err();
    assert!(matches!(first, RejectReason::Malformed(_)));
    assert_eq!(first, second);
    assert!(first.to_string().starts_with("malformed record"));
}

#[test]
fn decode_rejects_wrong_field_type() {
    let line = VALID.replace(r#""ID":1"#, r#""ID":"one""#);
    assert!(matches!(decode_line(&line).unwrap_err(), RejectReason::InvalidField(_)));
}

#[test]
fn decode_rejects_id_outside_int32() {
    let line = VALID.replace(r#""ID":1"#, r#""ID":3000000000"#);
    assert_eq!(
        decode_line(&line).unwrap_err(),
        RejectReason::InvalidField("ID 3000000000 is out of int32 range".into())
    );
    let edge = VALID.replace(r#""ID":1"#, r#""ID":2147483647"#);
    assert_eq!(decode_line(&edge).unwrap().id, 2_147_483_647);
}

#[test]
fn config_defaults_apply_without_files() {
    Jail::expect_with(|_jail| {
        let settings = Config::load_for_env(Some("test")).map_err(|e| e.to_string())?.settings().map_err(|e| e.to_string())?;
        assert_eq!(settings.engine.base_url(), "http://localhost:8108");
        assert_eq!(settings.collection.name, "vm_search");
        assert_eq!(settings.query.default_per_page, 50);
        assert_eq!(settings.query.sort, SortMode::Relevance);
        assert!(settings.gateway.expose_error_details);
        Ok(())
    });
}

#[test]
fn config_layers_files_and_env() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
            [engine]
            host = "search.internal"
            protocol = "https"

            [ingest]
            concurrency = 4
            "#,
        )?;
        jail.create_file("config.prod.toml", "[collection]\nname = \"articles\"\n")?;
        jail.set_env("APP_ENGINE__PORT", "443");
        jail.set_env("TYPESENSE_API_KEY", "secret");
        jail.set_env("APP_QUERY__SORT", "title");

        let config = Config::load_for_env(Some("prod")).map_err(|e| e.to_string())?;
        let settings = config.settings().map_err(|e| e.to_string())?;
        assert_eq!(settings.engine.protocol, Protocol::Https);
        assert_eq!(settings.engine.base_url(), "https://search.internal:443");
        assert_eq!(settings.engine.api_key, "secret");
        assert_eq!(settings.ingest.concurrency, 4);
        assert_eq!(settings.collection.name, "articles");
        assert_eq!(settings.query.sort, SortMode::Title);
        assert!(!settings.gateway.expose_error_details);
        Ok(())
    });
}

#[test]
fn config_rejects_page_size_above_ceiling() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", "[query]\ndefault_per_page = 500\nmax_per_page = 250\n")?;
        assert!(Config::load_for_env(Some("test")).is_err());
        Ok(())
    });
}

#[test]
fn paths_expand_env_vars() {
    std::env::set_var("VMSEARCH_TEST_DIR", "/data");
    assert_eq!(expand_path("${VMSEARCH_TEST_DIR}/corpus.jsonl"), std::path::PathBuf::from("/data/corpus.jsonl"));
}

#[test]
fn sort_mode_parses_from_flags() {
    assert_eq!("title".parse::<SortMode>(), Ok(SortMode::Title));
    assert_eq!("relevance".parse::<SortMode>(), Ok(SortMode::Relevance));
    assert!("newest".parse::<SortMode>().unwrap_err().contains("expected relevance or title"));
}
