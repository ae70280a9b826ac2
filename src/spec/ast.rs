//! Typed representation of a compiled spec: [`TableSpec`], [`FieldSpec`], [`RelSpec`].
//!
//! Before analysis, a `TableSpec`'s `fields` vector holds both leaf fields and
//! relationship children (see [`SpecNode`]); after analysis, relationships are
//! split out into `relationships`.

use std::collections::HashMap;

use crate::transform::TransformRef;

/// A parsed field or relationship node, as it comes out of the parser before
/// the analyzer splits fields from relationships.
///
/// The DSL admits four surface shapes (bare string, options vector, relationship
/// map, nested table); a bare `"col"` string is normalized to `FieldVec` with no
/// options at parse time; `StringField` is not a variant here because nothing
/// downstream needs to distinguish the two once options default to empty.
#[derive(Debug, Clone)]
pub enum SpecNode {
    /// A `"col"` field, or a `["col" :as "alias" :flatten]` field with options.
    FieldVec(FieldSpec),
    /// A `{ JOIN_SPEC TABLE_EXPR }` relationship.
    RelMap(RelSpec),
}

/// Output path segment. A path is a non-empty sequence of these, except for
/// a flattened single-valued relationship, whose path is empty.
pub type Path = Vec<String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub column: String,
    /// Output key, possibly dotted (`"a.b"`), or `None` to use `column` as-is.
    pub alias: Option<String>,
    pub transform: Option<TransformRef>,
    /// Unrecognized keyword options from the option vector, preserved verbatim
    /// as boolean-true flags (spec §4.1). Not consulted by the analyzer,
    /// planner, or assembler — kept for forward-compatible spec authors.
    pub extra: HashMap<String, bool>,
}

impl FieldSpec {
    pub fn new(column: impl Into<String>) -> Self {
        FieldSpec {
            column: column.into(),
            alias: None,
            transform: None,
            extra: HashMap::new(),
        }
    }

    /// The output path for this field: the dotted alias split on `.`, or the
    /// bare column name if there's no alias.
    pub fn output_path(&self) -> Path {
        match &self.alias {
            Some(alias) => alias.split('.').map(str::to_owned).collect(),
            None => vec![self.column.clone()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelKind {
    One,
    Many,
}

/// A relationship, before or after analysis. Pre-analysis, `kind`/`path` are
/// `None`; the analyzer fills them in and the resulting `RelSpec`s never lose
/// them again (idempotent re-analysis).
#[derive(Debug, Clone)]
pub struct RelSpec {
    /// The table this relationship was declared on, fixed at parse time and
    /// never rewritten by promotion — distinct from `column.table`, which
    /// for a reverse reference names the *target* table instead. This is
    /// what `many_select` drives its `IN (...)` query from: the owner of the
    /// foreign key stays `source_table` however far the rel gets promoted.
    pub source_table: String,
    /// Qualified `table/col`. The DSL itself only ever writes the bare
    /// column name (e.g. `"artist_id"` or `"_album_id"`); the parser fills
    /// in `table` as `source_table`, or the target table's name when the
    /// column carries a reverse-reference underscore prefix.
    pub column: QualifiedColumn,
    pub target: Box<TableSpec>,
    pub alias: Option<String>,
    pub flatten: bool,
    pub kind: Option<RelKind>,
    pub path: Option<Path>,
    pub extra: HashMap<String, bool>,
}

impl RelSpec {
    /// The column name with any reverse-reference underscore prefix stripped.
    pub fn unprefixed_column(&self) -> &str {
        self.column.column.trim_start_matches('_')
    }

    pub fn is_reverse(&self) -> bool {
        self.column.column.starts_with('_')
    }
}

/// A `table/col`-qualified column reference from the DSL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedColumn {
    pub table: String,
    pub column: String,
}

impl QualifiedColumn {
    pub fn parse(raw: &str) -> Option<Self> {
        let (table, column) = raw.split_once('/')?;
        Some(QualifiedColumn {
            table: table.to_owned(),
            column: column.to_owned(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct Relationships {
    pub one: Vec<RelSpec>,
    pub many: Vec<RelSpec>,
}

#[derive(Debug, Clone)]
pub struct TableSpec {
    pub name: String,
    pub id: String,
    pub id_generated: bool,
    /// Pre-analysis: fields and relationship children, in source order.
    /// Post-analysis: leaf fields only.
    pub fields: Vec<SpecNode>,
    /// Populated by the analyzer; empty before analysis.
    pub relationships: Relationships,
}

impl TableSpec {
    pub fn new(name: impl Into<String>, id: Option<String>, fields: Vec<SpecNode>) -> Self {
        let name = name.into();
        let (id, id_generated) = match id {
            Some(id) => (id, false),
            None => (format!("{name}_id"), true),
        };
        TableSpec {
            name,
            id,
            id_generated,
            fields,
            relationships: Relationships::default(),
        }
    }

    /// Leaf fields only. Before analysis this filters out relationship
    /// nodes; after analysis `fields` already holds only leaves.
    pub fn leaf_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter_map(|node| match node {
            SpecNode::FieldVec(f) => Some(f),
            SpecNode::RelMap(_) => None,
        })
    }

    pub fn rel_children(&self) -> impl Iterator<Item = &RelSpec> {
        self.fields.iter().filter_map(|node| match node {
            SpecNode::RelMap(r) => Some(r),
            _ => None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CompiledSpec {
    /// Original nesting, needed for recursive multi-valued descent.
    pub parsed: TableSpec,
    /// Analyzed form: drives per-group SQL.
    pub grouped: TableSpec,
}
