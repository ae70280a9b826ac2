//! Builds a nested output record from a flat aliased row and a group's
//! `TableSpec`.
//!
//! Walks the table tree against the flat row, writing each field into its
//! nested output path and merging single- and many-valued relationship
//! results in along the way.

pub mod errors;

use std::collections::HashMap;

use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::db::Row;
use crate::planner::alias_column;
use crate::spec::{Path, TableSpec};
use crate::transform::TransformRegistry;
use errors::AssemblerError;

/// A many-valued relationship's child rows, each carrying its own nested
/// many-valued children one level further down — what the batched driver
/// builds bottom-up as it recurses into each many-valued target. Keyed by
/// the relationship's output `Path` rather than its join column: two
/// many-valued relationships in the same group can share a join column
/// name against different target tables (e.g. two reverse references both
/// named `_post_id`), but their output paths are always distinct.
#[derive(Debug, Clone, Default)]
pub struct ManyRows(pub HashMap<Path, Vec<ChildRow>>);

#[derive(Debug, Clone)]
pub struct ChildRow {
    pub row: Row,
    pub many: ManyRows,
}

/// Assembles one record for `table`'s query group from `row`, recursing
/// into single-valued relationships against the same row and into
/// many-valued relationships against their pre-fetched `many` child rows.
pub fn assemble(
    table: &TableSpec,
    row: &Row,
    many: &ManyRows,
    transforms: &TransformRegistry,
) -> Result<JsonMap<String, JsonValue>, AssemblerError> {
    let mut output = JsonMap::new();
    assemble_leaf_fields(table, row, transforms, &mut output)?;

    for rel in &table.relationships.one {
        let child = assemble(&rel.target, row, many, transforms)?;
        merge_at(&mut output, rel.path.as_deref().unwrap_or(&[]), JsonValue::Object(child))?;
    }

    for rel in &table.relationships.many {
        let key = rel.path.as_deref().unwrap_or(&[]);
        let children = many.0.get(key);
        let mut list = Vec::with_capacity(children.map_or(0, Vec::len));
        if let Some(children) = children {
            for child in children {
                let assembled = assemble(&rel.target, &child.row, &child.many, transforms)?;
                list.push(JsonValue::Object(assembled));
            }
        }
        merge_at(
            &mut output,
            rel.path.as_deref().unwrap_or(&[]),
            JsonValue::Array(list),
        )?;
    }

    Ok(output)
}

fn assemble_leaf_fields(
    table: &TableSpec,
    row: &Row,
    transforms: &TransformRegistry,
    output: &mut JsonMap<String, JsonValue>,
) -> Result<(), AssemblerError> {
    for field in table.leaf_fields() {
        let alias = alias_column(&table.name, &field.column);
        let raw = row
            .get(&alias)
            .cloned()
            .ok_or_else(|| AssemblerError::MissingColumn { alias: alias.clone() })?;

        let value = match &field.transform {
            Some(reference) => {
                let f = transforms
                    .resolve(reference)
                    .map_err(|source| AssemblerError::Transform {
                        table: table.name.clone(),
                        field: field.column.clone(),
                        source,
                    })?;
                f(raw).map_err(|source| {
                    log::warn!(
                        "transform {} failed on {}.{}",
                        reference.name(),
                        table.name,
                        field.column
                    );
                    AssemblerError::Transform {
                        table: table.name.clone(),
                        field: field.column.clone(),
                        source,
                    }
                })?
            }
            None => TransformRegistry::apply_identity(raw),
        };

        if let Some(value) = value {
            merge_at(output, &field.output_path(), value)?;
        }
    }
    Ok(())
}

/// Writes `value` at `path` relative to `output`, creating intermediate
/// objects as needed. `path = []` merges `value`'s own keys directly into
/// `output` (the flatten case). Merging into an existing sub-object
/// preserves its other keys.
fn merge_at(
    output: &mut JsonMap<String, JsonValue>,
    path: &[String],
    value: JsonValue,
) -> Result<(), AssemblerError> {
    if path.is_empty() {
        if let JsonValue::Object(map) = value {
            output.extend(map);
        }
        return Ok(());
    }

    let mut current = output;
    for segment in &path[..path.len() - 1] {
        let entry = current
            .entry(segment.clone())
            .or_insert_with(|| JsonValue::Object(JsonMap::new()));
        current = entry
            .as_object_mut()
            .ok_or_else(|| AssemblerError::PathCollision { path: path.to_vec() })?;
    }

    let last = &path[path.len() - 1];
    match value {
        JsonValue::Object(map) => {
            let entry = current
                .entry(last.clone())
                .or_insert_with(|| JsonValue::Object(JsonMap::new()));
            let obj = entry
                .as_object_mut()
                .ok_or_else(|| AssemblerError::PathCollision { path: path.to_vec() })?;
            obj.extend(map);
        }
        other => {
            current.insert(last.clone(), other);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use crate::db::RawValue;
    use crate::spec::parse;
    use test_case::test_case;

    fn row(pairs: &[(&str, RawValue)]) -> Row {
        pairs.iter().cloned().map(|(k, v)| (k.to_owned(), v)).collect()
    }

    #[test_case(RawValue::Str("Ada".into()) => true; "present value is kept")]
    #[test_case(RawValue::Null => false; "null value is omitted")]
    fn leaf_field_presence_follows_null_omission(value: RawValue) -> bool {
        let table = analyze(parse(r#"(Table users :fields "name")"#).unwrap()).unwrap();
        let r = row(&[
            ("users_sqlfield_users_id", RawValue::Int(1)),
            ("users_sqlfield_name", value),
        ]);
        let out = assemble(&table, &r, &ManyRows::default(), &TransformRegistry::default()).unwrap();
        out.contains_key("name")
    }

    #[test]
    fn scenario_a_flat_table_omits_nil() {
        let table = analyze(parse(r#"(Table users :fields "name" "email")"#).unwrap()).unwrap();
        let r = row(&[
            ("users_sqlfield_users_id", RawValue::Int(7)),
            ("users_sqlfield_name", RawValue::Str("Ada".into())),
            ("users_sqlfield_email", RawValue::Null),
        ]);
        let out = assemble(&table, &r, &ManyRows::default(), &TransformRegistry::default()).unwrap();
        assert_eq!(out.get("name"), Some(&JsonValue::String("Ada".into())));
        assert!(!out.contains_key("email"));
    }

    #[test]
    fn scenario_b_nested_alias() {
        let table =
            analyze(parse(r#"(Table users :fields ["full_name" :as "name.full"])"#).unwrap())
                .unwrap();
        let r = row(&[
            ("users_sqlfield_users_id", RawValue::Int(1)),
            ("users_sqlfield_full_name", RawValue::Str("Ada L.".into())),
        ]);
        let out = assemble(&table, &r, &ManyRows::default(), &TransformRegistry::default()).unwrap();
        let name = out.get("name").unwrap().as_object().unwrap();
        assert_eq!(name.get("full"), Some(&JsonValue::String("Ada L.".into())));
    }

    #[test]
    fn scenario_c_flattened_single_valued() {
        let table = analyze(
            parse(
                r#"(Table album :fields "title" {["artist_id" :flatten] (Table artist :fields "name")})"#,
            )
            .unwrap(),
        )
        .unwrap();
        let r = row(&[
            ("album_sqlfield_album_id", RawValue::Int(1)),
            ("album_sqlfield_title", RawValue::Str("Abbey Road".into())),
            ("artist_sqlfield_artist_id", RawValue::Int(9)),
            ("artist_sqlfield_name", RawValue::Str("The Beatles".into())),
        ]);
        let out = assemble(&table, &r, &ManyRows::default(), &TransformRegistry::default()).unwrap();
        assert_eq!(out.get("title"), Some(&JsonValue::String("Abbey Road".into())));
        assert_eq!(out.get("name"), Some(&JsonValue::String("The Beatles".into())));
    }

    #[test]
    fn scenario_d_aliased_many() {
        let table = analyze(
            parse(
                r#"(Table album :fields "title" {["_album_id" :as "tracks"] (Table tracks :fields "name")})"#,
            )
            .unwrap(),
        )
        .unwrap();
        let r = row(&[
            ("album_sqlfield_album_id", RawValue::Int(1)),
            ("album_sqlfield_title", RawValue::Str("Abbey Road".into())),
        ]);
        let mut children = HashMap::new();
        children.insert(
            vec!["tracks".to_string()],
            vec![
                ChildRow {
                    row: row(&[
                        ("tracks_sqlfield_tracks_id", RawValue::Int(1)),
                        ("tracks_sqlfield_name", RawValue::Str("Come Together".into())),
                    ]),
                    many: ManyRows::default(),
                },
                ChildRow {
                    row: row(&[
                        ("tracks_sqlfield_tracks_id", RawValue::Int(2)),
                        ("tracks_sqlfield_name", RawValue::Str("Something".into())),
                    ]),
                    many: ManyRows::default(),
                },
            ],
        );
        let out = assemble(
            &table,
            &r,
            &ManyRows(children),
            &TransformRegistry::default(),
        )
        .unwrap();
        let tracks = out.get("tracks").unwrap().as_array().unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(
            tracks[0].as_object().unwrap().get("name"),
            Some(&JsonValue::String("Come Together".into()))
        );
    }

    #[test]
    fn scenario_e_promotion_nested_merge() {
        let table = analyze(
            parse(r#"(Table a :fields {"b_id" (Table b :fields {"c_id" (Table c :fields "x")})})"#)
                .unwrap(),
        )
        .unwrap();
        let r = row(&[
            ("a_sqlfield_a_id", RawValue::Int(1)),
            ("b_sqlfield_b_id", RawValue::Int(2)),
            ("c_sqlfield_c_id", RawValue::Int(3)),
            ("c_sqlfield_x", RawValue::Str("hi".into())),
        ]);
        let out = assemble(&table, &r, &ManyRows::default(), &TransformRegistry::default()).unwrap();
        let b = out.get("b_id").unwrap().as_object().unwrap();
        let c = b.get("c_id").unwrap().as_object().unwrap();
        assert_eq!(c.get("x"), Some(&JsonValue::String("hi".into())));
    }

    #[test]
    fn missing_column_is_an_error() {
        let table = analyze(parse(r#"(Table users :fields "name")"#).unwrap()).unwrap();
        let r = row(&[("users_sqlfield_users_id", RawValue::Int(1))]);
        let err =
            assemble(&table, &r, &ManyRows::default(), &TransformRegistry::default()).unwrap_err();
        assert!(matches!(err, AssemblerError::MissingColumn { .. }));
    }
}
