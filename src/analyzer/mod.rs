//! Splits each table's relationship children into `:one`/`:many` groups and
//! promotes nested single-valued relationships up to their group root, so
//! the planner can build one flat SELECT per group.
//!
//! A bottom-up, per-table pass that rewrites a tree in place and reports
//! structural problems through a dedicated error enum.

pub mod errors;

use crate::spec::{RelKind, RelSpec, SpecNode, TableSpec};
use errors::{AnalyzerError, Pass};

/// Analyze a parsed table tree into its grouped form. Safe to call again on
/// an already-grouped tree: relationships already classified (`kind` is
/// `Some`) are folded back in as candidates but pass through unchanged
/// rather than being reclassified, so a second call reproduces the same
/// result.
pub fn analyze(table: TableSpec) -> Result<TableSpec, AnalyzerError> {
    analyze_table(table)
}

fn analyze_table(mut table: TableSpec) -> Result<TableSpec, AnalyzerError> {
    let mut leaves = Vec::new();
    let mut own_rels: Vec<RelSpec> = Vec::new();

    for node in table.fields.drain(..) {
        match node {
            SpecNode::FieldVec(f) => leaves.push(f),
            SpecNode::RelMap(r) => own_rels.push(r),
        }
    }

    // Re-entrant: an already-grouped table's relationships are valid inputs
    // to the same promotion logic, so folding them back in as "own" rels
    // makes a second analyze() pass a no-op.
    let existing = std::mem::take(&mut table.relationships);
    own_rels.extend(existing.one);
    own_rels.extend(existing.many);

    let mut one_list: Vec<RelSpec> = Vec::new();
    let mut many_list: Vec<RelSpec> = Vec::new();

    for mut rel in own_rels {
        let analyzed_target = analyze_table(*rel.target)?;
        rel.target = Box::new(analyzed_target);

        // Already classified and (for :one) already spliced into place on a
        // prior pass — re-entering classification/promotion here would
        // recompute its path from this rel alone, losing whatever prefix
        // promotion had prepended. Carry it through unchanged instead, so a
        // second `analyze()` call is a no-op.
        if let Some(kind) = rel.kind {
            match kind {
                RelKind::One => one_list.push(rel),
                RelKind::Many => many_list.push(rel),
            }
            continue;
        }

        let kind = classify_kind(&rel)?;
        rel.kind = Some(kind);
        rel.path = Some(compute_path(&rel, kind));

        match kind {
            RelKind::One => {
                let parent_path = rel.path.clone().unwrap_or_default();

                let promoted_one = std::mem::take(&mut rel.target.relationships.one);
                let promoted_many = std::mem::take(&mut rel.target.relationships.many);

                for mut child in promoted_one {
                    child.path = Some(prepend(&parent_path, &child.path.unwrap_or_default()));
                    one_list.push(child);
                }
                for mut child in promoted_many {
                    child.path = Some(prepend(&parent_path, &child.path.unwrap_or_default()));
                    many_list.push(child);
                }

                one_list.push(rel);
            }
            RelKind::Many => {
                many_list.push(rel);
            }
        }
    }

    check_no_repeated_tables(&table.name, &one_list)?;

    table.fields = leaves.into_iter().map(SpecNode::FieldVec).collect();
    table.relationships.one = one_list;
    table.relationships.many = many_list;

    Ok(table)
}

fn prepend(prefix: &[String], suffix: &[String]) -> Vec<String> {
    prefix.iter().cloned().chain(suffix.iter().cloned()).collect()
}

fn classify_kind(rel: &RelSpec) -> Result<RelKind, AnalyzerError> {
    let kind = if rel.is_reverse() {
        RelKind::Many
    } else {
        RelKind::One
    };

    let expected_namespace = match kind {
        RelKind::One => rel.source_table.as_str(),
        RelKind::Many => rel.target.name.as_str(),
    };
    if rel.column.table != expected_namespace {
        return Err(AnalyzerError::NamespaceMismatch {
            pass: Pass::Classification,
            table: rel.column.table.clone(),
            column: rel.column.column.clone(),
            source: rel.source_table.clone(),
            target: rel.target.name.clone(),
        });
    }

    Ok(kind)
}

/// Flatten wins over alias; alias wins over the default many/one
/// column-derived path.
fn compute_path(rel: &RelSpec, kind: RelKind) -> Vec<String> {
    if rel.flatten && kind == RelKind::One {
        return vec![];
    }
    if let Some(alias) = &rel.alias {
        return alias.split('.').map(str::to_owned).collect();
    }
    match kind {
        RelKind::Many => vec![format!("_{}", rel.unprefixed_column())],
        RelKind::One => vec![rel.column.column.clone()],
    }
}

fn check_no_repeated_tables(source_table: &str, one_list: &[RelSpec]) -> Result<(), AnalyzerError> {
    let mut seen = std::collections::HashSet::new();
    let mut repeated = Vec::new();
    for rel in one_list {
        if !seen.insert(rel.target.name.clone()) && !repeated.contains(&rel.target.name) {
            repeated.push(rel.target.name.clone());
        }
    }
    if !repeated.is_empty() {
        return Err(AnalyzerError::RepeatedJoinTable {
            source_table: source_table.to_owned(),
            tables: repeated,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::parse;

    #[test]
    fn flat_table_has_no_relationships() {
        let table = analyze(parse(r#"(Table users :fields "name" "email")"#).unwrap()).unwrap();
        assert!(table.relationships.one.is_empty());
        assert!(table.relationships.many.is_empty());
        assert_eq!(table.leaf_fields().count(), 2);
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
        assert_eq!(table.relationships.one.len(), 1);
        let rel = &table.relationships.one[0];
        assert_eq!(rel.path, Some(vec![]));
        assert_eq!(rel.kind, Some(RelKind::One));
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
        assert_eq!(table.relationships.many.len(), 1);
        let rel = &table.relationships.many[0];
        assert_eq!(rel.path, Some(vec!["tracks".to_string()]));
        assert_eq!(rel.kind, Some(RelKind::Many));
    }

    #[test]
    fn scenario_e_promotion() {
        let table = analyze(
            parse(r#"(Table a :fields {"b_id" (Table b :fields {"c_id" (Table c :fields "x")})})"#)
                .unwrap(),
        )
        .unwrap();
        let mut paths: Vec<Vec<String>> = table
            .relationships
            .one
            .iter()
            .map(|r| r.path.clone().unwrap())
            .collect();
        paths.sort();
        assert_eq!(
            paths,
            vec![vec!["b_id".to_string()], vec!["b_id".to_string(), "c_id".to_string()]]
        );

        // No TableSpec reachable through :one has a non-empty :one list.
        for rel in &table.relationships.one {
            assert!(rel.target.relationships.one.is_empty());
        }
    }

    #[test]
    fn scenario_f_repeated_table_rejected() {
        let err = analyze(
            parse(
                r#"(Table a :fields {"b1_id" (Table b :fields "x")} {"b2_id" (Table b :fields "x")})"#,
            )
            .unwrap(),
        )
        .unwrap_err();
        match err {
            AnalyzerError::RepeatedJoinTable { tables, .. } => {
                assert_eq!(tables, vec!["b".to_string()])
            }
            other => panic!("expected RepeatedJoinTable, got {other:?}"),
        }
    }

    #[test]
    fn analysis_is_idempotent() {
        let src = r#"(Table a :fields "x" {"b_id" (Table b :fields {"c_id" (Table c :fields "y")})})"#;
        let once = analyze(parse(src).unwrap()).unwrap();
        let twice = analyze(once.clone()).unwrap();

        let mut once_paths: Vec<_> = once
            .relationships
            .one
            .iter()
            .map(|r| r.path.clone())
            .collect();
        let mut twice_paths: Vec<_> = twice
            .relationships
            .one
            .iter()
            .map(|r| r.path.clone())
            .collect();
        once_paths.sort();
        twice_paths.sort();
        assert_eq!(once_paths, twice_paths);
        assert_eq!(twice.relationships.many.len(), once.relationships.many.len());
    }

    #[test]
    fn id_defaults_to_table_name_plus_id() {
        let table = analyze(parse(r#"(Table widgets :fields "name")"#).unwrap()).unwrap();
        assert_eq!(table.id, "widgets_id");
        assert!(table.id_generated);
    }
}
