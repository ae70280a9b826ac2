//! Interprets a [`RawValue`] tree into a [`TableSpec`], per the DSL grammar:
//!
//! ```text
//! TABLE_EXPR   := (Table NAME [:id "col"]? :fields FIELD_OR_REL*)
//! FIELD_OR_REL := "col" | ["col" OPTION*] | { JOIN_SPEC TABLE_EXPR }
//! JOIN_SPEC    := "col" | ["col" OPTION*]
//! OPTION       := :as "alias" | :flatten | SYMBOL | :keyword
//! ```
//!
//! A thin recursive interpreter over an already-tokenized value tree, with
//! every failure carrying a position back to the caller.

use std::collections::HashMap;

use super::ast::{FieldSpec, QualifiedColumn, RelSpec, SpecNode, TableSpec};
use super::errors::InvalidSpec;
use super::reader::{self, RawValue};
use crate::transform::TransformRef;

/// Parse a full DSL source string into a `TableSpec` tree (pre-analysis).
pub fn parse(src: &str) -> Result<TableSpec, InvalidSpec> {
    let raw = reader::read_one(src).map_err(|(pos, reason)| InvalidSpec::new(pos, reason))?;
    build_table(&raw)
}

fn err(reason: impl Into<String>) -> InvalidSpec {
    // The reader already reports precise byte offsets for syntax errors;
    // once we're interpreting a well-formed tree, a structural mismatch has
    // no single meaningful offset left, so we report position 0.
    InvalidSpec::new(0, reason)
}

fn build_table(value: &RawValue) -> Result<TableSpec, InvalidSpec> {
    let items = value
        .as_list()
        .ok_or_else(|| err("expected a (Table ...) form"))?;

    let mut iter = items.iter();

    let head = iter
        .next()
        .and_then(RawValue::as_symbol)
        .ok_or_else(|| err("expected \"Table\" at the start of a table expression"))?;
    if head != "Table" {
        return Err(err(format!("expected \"Table\", found \"{head}\"")));
    }

    let name = iter
        .next()
        .and_then(RawValue::as_symbol)
        .ok_or_else(|| err("expected a table name after \"Table\""))?
        .to_owned();

    let mut rest: Vec<&RawValue> = iter.collect();

    let id = if let Some(RawValue::Vector(items)) = rest.first() {
        let id = parse_id_vector(items)?;
        rest.remove(0);
        Some(id)
    } else {
        None
    };

    let fields_kw = rest
        .first()
        .and_then(|v| v.as_keyword())
        .ok_or_else(|| err("expected :fields after the table name"))?;
    if fields_kw != "fields" {
        return Err(err(format!("expected :fields, found :{fields_kw}")));
    }
    rest.remove(0);

    let fields = rest
        .into_iter()
        .map(|node| build_field_or_rel(node, &name))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TableSpec::new(name, id, fields))
}

fn parse_id_vector(items: &[RawValue]) -> Result<String, InvalidSpec> {
    let mut iter = items.iter();
    let kw = iter
        .next()
        .and_then(RawValue::as_keyword)
        .ok_or_else(|| err("expected :id in the table's option vector"))?;
    if kw != "id" {
        return Err(err(format!("expected :id, found :{kw}")));
    }
    iter.next()
        .and_then(RawValue::as_str_lit)
        .map(str::to_owned)
        .ok_or_else(|| err(":id must be followed by a column name string"))
}

fn build_field_or_rel(value: &RawValue, source_table_name: &str) -> Result<SpecNode, InvalidSpec> {
    match value {
        RawValue::Str(col) => Ok(SpecNode::FieldVec(FieldSpec::new(col.clone()))),
        RawValue::Vector(items) => {
            let opts = parse_option_vector(items)?;
            Ok(SpecNode::FieldVec(FieldSpec {
                column: opts.column,
                alias: opts.alias,
                transform: opts.transform.map(TransformRef::Named),
                extra: opts.extra,
            }))
        }
        RawValue::Map(entries) => build_rel(entries, source_table_name),
        _ => Err(err(
            "expected a field string, an option vector, or a relationship map",
        )),
    }
}

fn build_rel(
    entries: &[(RawValue, RawValue)],
    source_table_name: &str,
) -> Result<SpecNode, InvalidSpec> {
    if entries.len() != 1 {
        return Err(err(format!(
            "a relationship map must have exactly one entry, found {}",
            entries.len()
        )));
    }
    let (key, table_expr) = &entries[0];

    let opts = match key {
        RawValue::Str(col) => ParsedOptions {
            column: col.clone(),
            alias: None,
            flatten: false,
            transform: None,
            extra: HashMap::new(),
        },
        RawValue::Vector(items) => parse_option_vector(items)?,
        _ => return Err(err("relationship key must be a string or option vector")),
    };

    let target = build_table(table_expr)?;

    let table = if opts.column.starts_with('_') {
        target.name.clone()
    } else {
        source_table_name.to_owned()
    };

    let rel = RelSpec {
        source_table: source_table_name.to_owned(),
        column: QualifiedColumn {
            table,
            column: opts.column,
        },
        target: Box::new(target),
        alias: opts.alias,
        flatten: opts.flatten,
        kind: None,
        path: None,
        extra: opts.extra,
    };
    Ok(SpecNode::RelMap(rel))
}

struct ParsedOptions {
    column: String,
    alias: Option<String>,
    flatten: bool,
    transform: Option<String>,
    extra: HashMap<String, bool>,
}

/// Parses `["col" :as "alias" :flatten TRANSFORM?]`-shaped option vectors
/// shared by fields and relationship keys. `:as` consumes the following
/// string; `:flatten` is a bare flag; any other keyword is stored as a
/// boolean-true flag in `extra`; a bare trailing symbol names a transform.
fn parse_option_vector(items: &[RawValue]) -> Result<ParsedOptions, InvalidSpec> {
    let mut iter = items.iter();

    let column = iter
        .next()
        .and_then(RawValue::as_str_lit)
        .ok_or_else(|| err("an option vector must start with a column name string"))?
        .to_owned();

    let mut alias = None;
    let mut flatten = false;
    let mut transform = None;
    let mut extra = HashMap::new();

    while let Some(item) = iter.next() {
        match item {
            RawValue::Keyword(kw) if kw == "as" => {
                let value = iter
                    .next()
                    .and_then(RawValue::as_str_lit)
                    .ok_or_else(|| err(":as must be followed by an alias string"))?;
                alias = Some(value.to_owned());
            }
            RawValue::Keyword(kw) if kw == "flatten" => {
                flatten = true;
            }
            RawValue::Keyword(kw) => {
                extra.insert(kw.clone(), true);
            }
            RawValue::Symbol(name) => {
                transform = Some(name.clone());
            }
            _ => return Err(err("unexpected value in an option vector")),
        }
    }

    Ok(ParsedOptions {
        column,
        alias,
        flatten,
        transform,
        extra,
    })
}
