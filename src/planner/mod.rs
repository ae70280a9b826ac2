//! Emits SELECT/FROM/JOIN SQL for a query group.
//!
//! A query group's shape (one FROM, a chain of LEFT JOINs, a flat column
//! list) is simple enough to collapse into a handful of free functions
//! rather than a builder-per-concern split.

pub mod errors;

use std::collections::{HashMap, HashSet, VecDeque};

use crate::db::Param;
use crate::spec::{FieldSpec, QualifiedColumn, RelSpec, SpecNode, TableSpec};
use errors::PlannerError;

/// Separates table and column in an emitted alias. Chosen to be extremely
/// unlikely to collide with a user column name.
pub const ALIAS_SEPARATOR: &str = "_sqlfield_";

pub fn alias_column(table: &str, column: &str) -> String {
    format!("{table}{ALIAS_SEPARATOR}{column}")
}

/// Inverts `alias_column`: recovers `(table, column)` from an emitted alias.
pub fn parse_alias(alias: &str) -> Option<QualifiedColumn> {
    let (table, column) = alias.split_once(ALIAS_SEPARATOR)?;
    Some(QualifiedColumn {
        table: table.to_owned(),
        column: column.to_owned(),
    })
}

/// A planned SELECT: its SQL text and the map from every emitted alias back
/// to the qualified column it came from.
#[derive(Debug, Clone)]
pub struct PlannedQuery {
    pub sql: String,
    pub alias_map: HashMap<String, QualifiedColumn>,
}

/// One SELECT over `table` and every relationship in its (already-promoted)
/// `:one` list, dependency ordered. Carries no WHERE clause — callers
/// append one (an id filter for a batch, or a selection predicate's
/// fragment for ID resolution).
pub fn group_select(table: &TableSpec) -> Result<PlannedQuery, PlannerError> {
    let order = order_joins(table)?;

    let mut alias_map = HashMap::new();
    let mut select_cols = Vec::new();
    push_table_columns(table, &mut select_cols, &mut alias_map);
    for rel in &order {
        push_table_columns(&rel.target, &mut select_cols, &mut alias_map);
    }

    let mut sql = format!("SELECT {} FROM {}", select_cols.join(", "), table.name);
    for rel in &order {
        sql.push_str(&format!(
            " LEFT JOIN {target} ON {source}.{col} = {target}.{target_id}",
            target = rel.target.name,
            source = rel.source_table,
            col = rel.unprefixed_column(),
            target_id = rel.target.id,
        ));
    }

    Ok(PlannedQuery { sql, alias_map })
}

/// A `group_select` over `rel.target` with the FK column itself added as an
/// extra selected field (so the caller can re-group child rows by parent),
/// filtered to the given parent IDs. Returns `None` when `parent_ids` is
/// empty — no query to run.
pub fn many_select(
    rel: &RelSpec,
    parent_ids: &[Param],
) -> Result<Option<PlannedQuery>, PlannerError> {
    if parent_ids.is_empty() {
        return Ok(None);
    }

    let mut target = (*rel.target).clone();
    target.fields.push(SpecNode::FieldVec(FieldSpec::new(
        rel.unprefixed_column().to_owned(),
    )));

    let mut query = group_select(&target)?;
    let placeholders = std::iter::repeat("?")
        .take(parent_ids.len())
        .collect::<Vec<_>>()
        .join(", ");
    query.sql.push_str(&format!(
        " WHERE {target}.{col} IN ({placeholders})",
        target = target.name,
        col = rel.unprefixed_column(),
    ));
    Ok(Some(query))
}

/// Appends `WHERE <table>.<id_column> IN (?, ?, ...)` to an already-planned
/// group query — what the batched driver uses for each batch's root query,
/// and (with a single id) for the single-row `entity` lookup.
pub fn filter_by_ids(mut query: PlannedQuery, table: &str, id_column: &str, count: usize) -> PlannedQuery {
    let placeholders = std::iter::repeat("?").take(count).collect::<Vec<_>>().join(", ");
    query.sql.push_str(&format!(" WHERE {table}.{id_column} IN ({placeholders})"));
    query
}

fn push_table_columns(
    table: &TableSpec,
    cols: &mut Vec<String>,
    alias_map: &mut HashMap<String, QualifiedColumn>,
) {
    let mut add = |column: &str, cols: &mut Vec<String>, alias_map: &mut HashMap<String, QualifiedColumn>| {
        let alias = alias_column(&table.name, column);
        cols.push(format!("{}.{} AS {}", table.name, column, alias));
        alias_map.insert(
            alias,
            QualifiedColumn {
                table: table.name.clone(),
                column: column.to_owned(),
            },
        );
    };
    add(&table.id, cols, alias_map);
    for field in table.leaf_fields() {
        add(&field.column, cols, alias_map);
    }
}

/// Fixed-point queue scan: repeatedly pull the head of the queue; emit it
/// once its source table is available, otherwise rotate it to the tail. A
/// full lap with no progress means the single-valued graph is cyclic or
/// disconnected from the root.
/// Exposed beyond `group_select`'s internal use for the inspection CLI's
/// `--explain-joins` flag.
pub fn order_joins(table: &TableSpec) -> Result<Vec<RelSpec>, PlannerError> {
    let mut available: HashSet<String> = HashSet::new();
    available.insert(table.name.clone());

    let mut queue: VecDeque<RelSpec> = table.relationships.one.iter().cloned().collect();
    let mut ordered = Vec::with_capacity(queue.len());
    let mut stalled = 0usize;

    while let Some(rel) = queue.pop_front() {
        if available.contains(&rel.source_table) {
            available.insert(rel.target.name.clone());
            ordered.push(rel);
            stalled = 0;
        } else {
            queue.push_back(rel);
            stalled += 1;
            if stalled > queue.len() {
                let remaining: Vec<String> = queue
                    .into_iter()
                    .map(|r| format!("{}->{}", r.source_table, r.target.name))
                    .collect();
                log::error!("unorderable join chain rooted at {}: {:?}", table.name, remaining);
                return Err(PlannerError::UnorderableJoins {
                    source_table: table.name.clone(),
                    remaining,
                });
            }
        }
    }

    Ok(ordered)
}
