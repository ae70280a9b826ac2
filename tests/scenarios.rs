//! End-to-end scenarios A-F, exercised against `db::mock::ScriptedDatabase`
//! through the public `compile`/`entity`/`entities` facade rather than any
//! one module in isolation.

use branchql::analyzer::errors::AnalyzerError;
use branchql::db::mock::ScriptedDatabase;
use branchql::db::{Param, RawValue, Row};
use branchql::{analyzer, compile, entities, entity, spec, EntitiesOptions};
use futures_util::StreamExt;
use serde_json::json;

fn row(pairs: &[(&str, RawValue)]) -> Row {
    pairs.iter().cloned().map(|(k, v)| (k.to_owned(), v)).collect()
}

#[tokio::test]
async fn scenario_a_flat_table_omits_nil_field() {
    let spec = compile(r#"(Table users :fields "name" "email")"#).unwrap();
    let db = ScriptedDatabase::new(vec![vec![row(&[
        ("users_sqlfield_users_id", RawValue::Int(7)),
        ("users_sqlfield_name", RawValue::Str("Ada".into())),
        ("users_sqlfield_email", RawValue::Null),
    ])]]);
    let record = entity(&db, &spec, Param::Int(7)).await.unwrap().unwrap();
    assert_eq!(record.record, json!({ "name": "Ada" }));
}

#[tokio::test]
async fn scenario_b_nested_dotted_alias() {
    let spec = compile(r#"(Table users :fields ["full_name" :as "name.full"])"#).unwrap();
    let db = ScriptedDatabase::new(vec![vec![row(&[
        ("users_sqlfield_users_id", RawValue::Int(1)),
        ("users_sqlfield_full_name", RawValue::Str("Ada L.".into())),
    ])]]);
    let record = entity(&db, &spec, Param::Int(1)).await.unwrap().unwrap();
    assert_eq!(record.record, json!({ "name": { "full": "Ada L." } }));
}

#[tokio::test]
async fn scenario_c_flattened_single_valued_relationship() {
    let spec = compile(
        r#"(Table album :fields "title" {["artist_id" :flatten] (Table artist :fields "name")})"#,
    )
    .unwrap();
    let db = ScriptedDatabase::new(vec![vec![row(&[
        ("album_sqlfield_album_id", RawValue::Int(1)),
        ("album_sqlfield_title", RawValue::Str("Abbey Road".into())),
        ("artist_sqlfield_artist_id", RawValue::Int(9)),
        ("artist_sqlfield_name", RawValue::Str("The Beatles".into())),
    ])]]);
    let record = entity(&db, &spec, Param::Int(1)).await.unwrap().unwrap();
    assert_eq!(
        record.record,
        json!({ "title": "Abbey Road", "name": "The Beatles" })
    );
}

#[tokio::test]
async fn scenario_d_aliased_many_relationship() {
    let spec = compile(
        r#"(Table album :fields "title" {["_album_id" :as "tracks"] (Table tracks :fields "name")})"#,
    )
    .unwrap();
    let db = ScriptedDatabase::new(vec![
        vec![row(&[
            ("album_sqlfield_album_id", RawValue::Int(1)),
            ("album_sqlfield_title", RawValue::Str("Abbey Road".into())),
        ])],
        vec![
            row(&[
                ("tracks_sqlfield_tracks_id", RawValue::Int(1)),
                ("tracks_sqlfield_name", RawValue::Str("Come Together".into())),
                ("tracks_sqlfield_album_id", RawValue::Int(1)),
            ]),
            row(&[
                ("tracks_sqlfield_tracks_id", RawValue::Int(2)),
                ("tracks_sqlfield_name", RawValue::Str("Something".into())),
                ("tracks_sqlfield_album_id", RawValue::Int(1)),
            ]),
        ],
    ]);
    let record = entity(&db, &spec, Param::Int(1)).await.unwrap().unwrap();
    assert_eq!(
        record.record,
        json!({
            "title": "Abbey Road",
            "tracks": [{ "name": "Come Together" }, { "name": "Something" }],
        })
    );
}

#[tokio::test]
async fn scenario_e_promotion_nests_by_shared_path_prefix() {
    let spec = compile(
        r#"(Table a :fields {"b_id" (Table b :fields {"c_id" (Table c :fields "x")})})"#,
    )
    .unwrap();
    assert_eq!(spec.grouped.relationships.one.len(), 2);

    let db = ScriptedDatabase::new(vec![vec![row(&[
        ("a_sqlfield_a_id", RawValue::Int(1)),
        ("b_sqlfield_b_id", RawValue::Int(2)),
        ("c_sqlfield_c_id", RawValue::Int(3)),
        ("c_sqlfield_x", RawValue::Str("value".into())),
    ])]]);
    let record = entity(&db, &spec, Param::Int(1)).await.unwrap().unwrap();
    assert_eq!(
        record.record,
        json!({ "b_id": { "c_id": { "x": "value" } } })
    );
}

#[test]
fn scenario_f_repeated_join_target_rejected() {
    let parsed = spec::parse(
        r#"(Table a :fields {"b1_id" (Table b :fields "x")} {"b2_id" (Table b :fields "x")})"#,
    )
    .unwrap();
    let err = analyzer::analyze(parsed).unwrap_err();
    match err {
        AnalyzerError::RepeatedJoinTable { tables, .. } => {
            assert!(tables.iter().all(|t| t == "b"));
        }
        other => panic!("expected RepeatedJoinTable, got {other:?}"),
    }
}

#[tokio::test]
async fn entities_stream_stops_after_a_mid_stream_error() {
    let spec = compile(r#"(Table users :fields "name")"#).unwrap();
    // Second batch's query has no scripted response left, so the driver's
    // underlying query call fails — the stream must surface that error and
    // yield nothing further.
    let db = ScriptedDatabase::new(vec![vec![row(&[
        ("users_sqlfield_users_id", RawValue::Int(1)),
        ("users_sqlfield_name", RawValue::Str("Ada".into())),
    ])]]);
    let options = EntitiesOptions {
        ids: Some(vec![Param::Int(1), Param::Int(2)]),
        batch: branchql::BatchConfig::Size(1),
        ..Default::default()
    };
    let records: Vec<_> = entities(&db, &spec, options).collect().await;
    assert_eq!(records.len(), 2);
    assert!(records[0].is_ok());
    assert!(records[1].is_err());
}
