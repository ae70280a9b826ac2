//! Batched import driver: the public façade that sequences id resolution,
//! per-batch root and many-relationship queries, and lazy record assembly.
//!
//! Shaped like a `resolve -> plan -> execute -> shape` pipeline, with
//! `async-trait` and `futures-util` stream usage for the connector layer.

use std::collections::HashMap;

use futures_core::future::BoxFuture;
use futures_core::stream::BoxStream;
use futures_util::stream::{self, StreamExt};
use serde_json::Value as JsonValue;

use crate::analyzer;
use crate::assembler::{self, ChildRow, ManyRows};
use crate::config::BatchConfig;
use crate::db::{Database, Param, RawValue, Row};
use crate::error::ExtractError;
use crate::planner;
use crate::selection::Selection;
use crate::spec::{self, CompiledSpec, RelSpec, TableSpec};
use crate::transform::TransformRegistry;

/// A single extracted record paired with the id of the root row it came
/// from.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    pub id: Param,
    pub record: JsonValue,
}

/// Options for [`entities`]. `ids` takes precedence over `selection` when
/// both are set — matching `entity`'s use of this struct to drive a
/// single-id lookup.
#[derive(Clone, Default)]
pub struct EntitiesOptions {
    pub ids: Option<Vec<Param>>,
    pub selection: Option<Selection>,
    pub batch: BatchConfig,
    pub transforms: TransformRegistry,
}

/// Compiles a DSL source string into its parsed and analyzed forms. Pure
/// and cacheable by the caller.
pub fn compile(dsl_spec: &str) -> Result<CompiledSpec, ExtractError> {
    let parsed = spec::parse(dsl_spec)?;
    let grouped = analyzer::analyze(parsed.clone())?;
    Ok(CompiledSpec { parsed, grouped })
}

/// Single-row convenience lookup. `Ok(None)` when the root row is absent —
/// the transformer never runs on a missing root.
pub async fn entity(
    db: &dyn Database,
    spec: &CompiledSpec,
    id: Param,
) -> Result<Option<EntityRecord>, ExtractError> {
    let options = EntitiesOptions {
        ids: Some(vec![id]),
        ..Default::default()
    };
    let mut records = entities(db, spec, options);
    match records.next().await {
        Some(result) => result.map(Some),
        None => Ok(None),
    }
}

/// Eagerly resolves the id list for a selection predicate. `None` selects
/// every row in the root table.
pub async fn entity_ids(
    db: &dyn Database,
    spec: &CompiledSpec,
    selection: Option<&Selection>,
) -> Result<Vec<Param>, ExtractError> {
    let (sql, params, alias) = match selection {
        Some(selection) => {
            let (sql, params) = selection.id_select();
            (sql, params, selection.id_alias())
        }
        None => {
            let alias = planner::alias_column(&spec.grouped.name, &spec.grouped.id);
            let sql = format!(
                "SELECT {table}.{id} AS {alias} FROM {table}",
                table = spec.grouped.name,
                id = spec.grouped.id,
            );
            (sql, Vec::new(), alias)
        }
    };

    let mut rows = db.query(&sql, &params).await?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next().await {
        let row = row?;
        if let Some(raw) = row.get(&alias) {
            if let Some(id) = raw_to_param(raw)? {
                ids.push(id);
            }
        }
    }
    Ok(ids)
}

/// Streams assembled records lazily, one batch at a time. Each batch's
/// root and many-relationship queries only run once that batch is
/// reached; dropping the stream releases everything eagerly since no
/// resources are held across `.await` points once a batch completes.
pub fn entities<'a>(
    db: &'a dyn Database,
    spec: &'a CompiledSpec,
    options: EntitiesOptions,
) -> BoxStream<'a, Result<EntityRecord, ExtractError>> {
    let EntitiesOptions {
        ids,
        selection,
        batch,
        transforms,
    } = options;

    let setup = async move {
        let ids = match ids {
            Some(ids) => ids,
            None => entity_ids(db, spec, selection.as_ref()).await?,
        };
        Ok::<_, ExtractError>(batch.partition(&ids))
    };

    stream::once(setup)
        .flat_map(move |result| match result {
            Ok(batches) => batch_stream(db, &spec.grouped, transforms.clone(), batches),
            Err(e) => stream::iter(vec![Err(e)]).boxed(),
        })
        .boxed()
}

fn batch_stream<'a>(
    db: &'a dyn Database,
    grouped: &'a TableSpec,
    transforms: TransformRegistry,
    batches: Vec<Vec<Param>>,
) -> BoxStream<'a, Result<EntityRecord, ExtractError>> {
    stream::iter(batches)
        .scan(false, move |poisoned, batch_ids| {
            let already_poisoned = *poisoned;
            let transforms = transforms.clone();
            async move {
                if already_poisoned {
                    return None;
                }
                match process_batch(db, grouped, &transforms, batch_ids).await {
                    Ok(records) => Some(Ok(records)),
                    Err(e) => {
                        *poisoned = true;
                        Some(Err(e))
                    }
                }
            }
        })
        .flat_map(|result| match result {
            Ok(records) => stream::iter(records.into_iter().map(Ok)).boxed(),
            Err(e) => stream::iter(vec![Err(e)]).boxed(),
        })
        .boxed()
}

async fn process_batch(
    db: &dyn Database,
    grouped: &TableSpec,
    transforms: &TransformRegistry,
    batch_ids: Vec<Param>,
) -> Result<Vec<EntityRecord>, ExtractError> {
    if batch_ids.is_empty() {
        return Ok(Vec::new());
    }
    log::debug!("processing batch of {} id(s) for {}", batch_ids.len(), grouped.name);

    let root_query = planner::group_select(grouped)?;
    let root_query = planner::filter_by_ids(root_query, &grouped.name, &grouped.id, batch_ids.len());

    let rows = run_query(db, &root_query.sql, &batch_ids).await?;
    let nested = fetch_nested_many(db, grouped, &rows).await?;

    let mut rows_by_id: HashMap<Param, Row> = HashMap::new();
    for row in rows {
        if let Some(id) = extract_id(&row, &grouped.name, &grouped.id)? {
            rows_by_id.insert(id, row);
        }
    }

    // Emit in the order the ids were resolved/supplied, silently skipping
    // any id that turned out to have no root row. Looks up rather than
    // removes from `rows_by_id` so a repeated id in `batch_ids` (a caller
    // can supply a duplicate via `:ids`) re-emits its record once per
    // occurrence instead of only the first.
    let mut records = Vec::new();
    for id in batch_ids {
        let Some(row) = rows_by_id.get(&id) else {
            continue;
        };
        let many = nested.get(&id).cloned().unwrap_or_default();
        let record = assembler::assemble(grouped, row, &many, transforms)?;
        records.push(EntityRecord {
            id,
            record: JsonValue::Object(record),
        });
    }
    Ok(records)
}

/// For every many-valued relationship owned by `owner_group`, fetches its
/// children against `rows` and returns each row's own id mapped to its
/// aggregate [`ManyRows`].
fn fetch_nested_many<'a>(
    db: &'a dyn Database,
    owner_group: &'a TableSpec,
    rows: &'a [Row],
) -> BoxFuture<'a, Result<HashMap<Param, ManyRows>, ExtractError>> {
    Box::pin(async move {
        let mut per_id: HashMap<Param, ManyRows> = HashMap::new();
        for row in rows {
            if let Some(id) = extract_id(row, &owner_group.name, &owner_group.id)? {
                per_id.entry(id).or_default();
            }
        }

        for rel in &owner_group.relationships.many {
            let groups = fetch_children_for_rel(db, owner_group, rel, rows).await?;
            let key = rel.path.clone().unwrap_or_default();
            for (parent_id, children) in groups {
                per_id.entry(parent_id).or_default().0.insert(key.clone(), children);
            }
        }

        Ok(per_id)
    })
}

/// Runs `many_select` for one relationship against the id values already
/// present in `parent_rows` (under `rel.source_table`'s own id column),
/// grouping the resulting child rows by the foreign-key value that ties
/// each back to its parent.
fn fetch_children_for_rel<'a>(
    db: &'a dyn Database,
    owner_group: &'a TableSpec,
    rel: &'a RelSpec,
    parent_rows: &'a [Row],
) -> BoxFuture<'a, Result<HashMap<Param, Vec<ChildRow>>, ExtractError>> {
    Box::pin(async move {
        let parent_id_col = id_column_of(owner_group, &rel.source_table);
        let parent_alias = planner::alias_column(&rel.source_table, parent_id_col);

        let mut parent_ids = Vec::new();
        for row in parent_rows {
            if let Some(raw) = row.get(&parent_alias) {
                if let Some(id) = raw_to_param(raw)? {
                    parent_ids.push(id);
                }
            }
        }

        let Some(query) = planner::many_select(rel, &parent_ids)? else {
            return Ok(HashMap::new());
        };

        let rows = run_query(db, &query.sql, &parent_ids).await?;
        let nested = fetch_nested_many(db, &rel.target, &rows).await?;

        let fk_alias = planner::alias_column(&rel.target.name, rel.unprefixed_column());
        let mut groups: HashMap<Param, Vec<ChildRow>> = HashMap::new();
        for row in rows {
            let Some(fk_raw) = row.get(&fk_alias) else {
                continue;
            };
            let Some(parent_key) = raw_to_param(fk_raw)? else {
                continue;
            };

            let own_id = extract_id(&row, &rel.target.name, &rel.target.id)?;
            let many = own_id
                .and_then(|id| nested.get(&id).cloned())
                .unwrap_or_default();

            groups.entry(parent_key).or_default().push(ChildRow { row, many });
        }
        Ok(groups)
    })
}

/// The id column of `table_name` within `owner_group`'s query group: either
/// the group's own root, or one of its promoted single-valued targets.
/// Every many-valued relationship's `source_table` names one of these by
/// construction (the analyzer only ever promotes a many-rel into a group
/// that already contains its `source_table` via a single-valued join).
fn id_column_of<'a>(owner_group: &'a TableSpec, table_name: &str) -> &'a str {
    if owner_group.name == table_name {
        return &owner_group.id;
    }
    owner_group
        .relationships
        .one
        .iter()
        .find(|rel| rel.target.name == table_name)
        .map(|rel| rel.target.id.as_str())
        .expect("many relationship's source_table must be reachable within its own query group")
}

async fn run_query(db: &dyn Database, sql: &str, params: &[Param]) -> Result<Vec<Row>, ExtractError> {
    let mut stream = db.query(sql, params).await?;
    let mut rows = Vec::new();
    while let Some(row) = stream.next().await {
        rows.push(row?);
    }
    Ok(rows)
}

fn extract_id(row: &Row, table: &str, id_column: &str) -> Result<Option<Param>, ExtractError> {
    match row.get(&planner::alias_column(table, id_column)) {
        None => Ok(None),
        Some(raw) => raw_to_param(raw),
    }
}

fn raw_to_param(raw: &RawValue) -> Result<Option<Param>, ExtractError> {
    match raw {
        RawValue::Null => Ok(None),
        RawValue::Int(i) => Ok(Some(Param::Int(*i))),
        RawValue::Str(s) => Ok(Some(Param::Str(s.clone()))),
        RawValue::DateTime(dt) => Ok(Some(Param::DateTime(*dt))),
        other => Err(ExtractError::UnsupportedIdValue(format!("{other:?}"))),
    }
}
