//! Selection predicates: `entity_ids`/`entities`' id-resolution modes. A
//! thin, self-contained fragment generator the driver consults once per
//! call, scoped here to filtering on the driving table's own columns (a
//! `:delta` or `:expiry` column naming a different table is rejected rather
//! than silently joined in).

pub mod errors;

use chrono::NaiveDateTime;

use crate::db::Param;
use crate::planner::alias_column;
use crate::spec::QualifiedColumn;
use errors::SelectionError;

#[derive(Debug, Clone, PartialEq)]
pub enum Age {
    Days(i64),
    At(NaiveDateTime),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    UpdateTable {
        table: String,
        id: String,
        updated: Option<String>,
        date: Option<NaiveDateTime>,
    },
    Delta {
        table: String,
        id: String,
        fields: Vec<QualifiedColumn>,
        date: NaiveDateTime,
    },
    Expiry {
        table: String,
        id: String,
        field: QualifiedColumn,
        age: Age,
    },
}

impl Selection {
    pub fn update_table(
        table: impl Into<String>,
        id: impl Into<String>,
        updated: Option<String>,
        date: Option<NaiveDateTime>,
    ) -> Result<Self, SelectionError> {
        if date.is_some() && updated.is_none() {
            return Err(SelectionError::DateWithoutUpdatedColumn);
        }
        Ok(Selection::UpdateTable {
            table: table.into(),
            id: id.into(),
            updated,
            date,
        })
    }

    /// `fields` are `"table/column"` references, the same wire shape the
    /// DSL's `:delta { fields: [table/col...], date }` option uses.
    pub fn delta(
        table: impl Into<String>,
        id: impl Into<String>,
        fields: Vec<&str>,
        date: NaiveDateTime,
    ) -> Result<Self, SelectionError> {
        if fields.is_empty() {
            return Err(SelectionError::EmptyDeltaFields);
        }
        let table = table.into();
        let mut parsed = Vec::with_capacity(fields.len());
        for raw in fields {
            let field = QualifiedColumn::parse(raw)
                .ok_or_else(|| SelectionError::InvalidFieldFormat(raw.to_owned()))?;
            if field.table != table {
                return Err(SelectionError::FieldNotInTable {
                    table: field.table.clone(),
                    column: field.column.clone(),
                    driving_table: table,
                });
            }
            parsed.push(field);
        }
        Ok(Selection::Delta {
            table,
            id: id.into(),
            fields: parsed,
            date,
        })
    }

    /// `field` is a `"table/column"` reference, the same wire shape the
    /// DSL's `:expiry { field: table/col, age }` option uses.
    pub fn expiry(
        table: impl Into<String>,
        id: impl Into<String>,
        field: &str,
        age: Age,
    ) -> Result<Self, SelectionError> {
        let table = table.into();
        let field = QualifiedColumn::parse(field)
            .ok_or_else(|| SelectionError::InvalidFieldFormat(field.to_owned()))?;
        if field.table != table {
            return Err(SelectionError::FieldNotInTable {
                table: field.table.clone(),
                column: field.column.clone(),
                driving_table: table,
            });
        }
        Ok(Selection::Expiry {
            table,
            id: id.into(),
            field,
            age,
        })
    }

    fn table_and_id(&self) -> (&str, &str) {
        match self {
            Selection::UpdateTable { table, id, .. }
            | Selection::Delta { table, id, .. }
            | Selection::Expiry { table, id, .. } => (table, id),
        }
    }

    /// The alias the id column is selected under, so a caller can pull it
    /// back out of the returned row the same way the planner's own queries
    /// would.
    pub fn id_alias(&self) -> String {
        let (table, id) = self.table_and_id();
        alias_column(table, id)
    }

    /// The id-resolving SQL for this selection, plus its bound parameters.
    pub fn id_select(&self) -> (String, Vec<Param>) {
        let (table, id) = self.table_and_id();
        let select = format!("SELECT {table}.{id} AS {}", self.id_alias());

        match self {
            Selection::UpdateTable { updated, date, .. } => {
                let mut sql = format!("{select} FROM {table}");
                let mut params = Vec::new();
                if let (Some(updated), Some(date)) = (updated, date) {
                    sql.push_str(&format!(" WHERE {table}.{updated} > ?"));
                    params.push(Param::DateTime(*date));
                }
                (sql, params)
            }
            Selection::Delta { fields, date, .. } => {
                let mut sql = format!("{select} FROM {table} WHERE ");
                let conditions: Vec<String> = fields
                    .iter()
                    .map(|f| format!("{}.{} > ?", f.table, f.column))
                    .collect();
                sql.push_str(&conditions.join(" OR "));
                let params = fields.iter().map(|_| Param::DateTime(*date)).collect();
                (sql, params)
            }
            Selection::Expiry { field, age, .. } => match age {
                Age::Days(days) => (
                    format!(
                        "{select} FROM {table} WHERE {}.{} > (NOW() - INTERVAL ? DAY)",
                        field.table, field.column
                    ),
                    vec![Param::Int(*days)],
                ),
                Age::At(at) => (
                    format!(
                        "{select} FROM {table} WHERE {}.{} > ?",
                        field.table, field.column
                    ),
                    vec![Param::DateTime(*at)],
                ),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_date_without_updated() {
        let err = Selection::update_table("users", "user_id", None, Some(NaiveDateTime::default()))
            .unwrap_err();
        assert_eq!(err, SelectionError::DateWithoutUpdatedColumn);
    }

    #[test]
    fn update_table_without_date_selects_all() {
        let sel =
            Selection::update_table("users", "user_id", Some("updated_at".into()), None).unwrap();
        let (sql, params) = sel.id_select();
        assert_eq!(sql, "SELECT users.user_id AS users_sqlfield_user_id FROM users");
        assert!(params.is_empty());
    }

    #[test]
    fn update_table_with_date_filters() {
        let date = NaiveDateTime::default();
        let sel =
            Selection::update_table("users", "user_id", Some("updated_at".into()), Some(date))
                .unwrap();
        let (sql, params) = sel.id_select();
        assert_eq!(
            sql,
            "SELECT users.user_id AS users_sqlfield_user_id FROM users WHERE users.updated_at > ?"
        );
        assert_eq!(params, vec![Param::DateTime(date)]);
    }

    #[test]
    fn delta_ors_across_fields() {
        let date = NaiveDateTime::default();
        let sel = Selection::delta(
            "users",
            "user_id",
            vec!["users/created_at", "users/modified_at"],
            date,
        )
        .unwrap();
        let (sql, params) = sel.id_select();
        assert_eq!(
            sql,
            "SELECT users.user_id AS users_sqlfield_user_id FROM users WHERE users.created_at > ? OR users.modified_at > ?"
        );
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn delta_rejects_foreign_table_column() {
        let err = Selection::delta(
            "users",
            "user_id",
            vec!["accounts/created_at"],
            NaiveDateTime::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SelectionError::FieldNotInTable { .. }));
    }

    #[test]
    fn delta_rejects_malformed_field_reference() {
        let err = Selection::delta("users", "user_id", vec!["created_at"], NaiveDateTime::default())
            .unwrap_err();
        assert_eq!(err, SelectionError::InvalidFieldFormat("created_at".into()));
    }

    #[test]
    fn expiry_by_age_days_uses_now_interval() {
        let sel = Selection::expiry("sessions", "session_id", "sessions/last_seen", Age::Days(30))
            .unwrap();
        let (sql, params) = sel.id_select();
        assert!(sql.contains("NOW() - INTERVAL ? DAY"));
        assert_eq!(params, vec![Param::Int(30)]);
    }
}
