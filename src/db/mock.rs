//! An in-memory fixture [`Database`] for this crate's own tests.
//!
//! Not a general-purpose testing library for callers — just enough to drive
//! the planner/driver integration tests without a real connection.

use async_trait::async_trait;
use futures_util::stream;
use mockall::mock;
use std::sync::Mutex;

use super::{Database, DbError, Param, Row, RowStream};

mock! {
    pub Db {}

    #[async_trait]
    impl Database for Db {
        async fn query(&self, sql: &str, params: &[Param]) -> Result<RowStream, DbError>;
    }
}

/// A `Database` that replays a fixed, ordered list of row sets, one per
/// call to `query`, regardless of the SQL text or bound parameters — enough
/// to drive the sequence of group and many-relationship queries
/// [`crate::driver`] issues per batch. Use [`MockDb`] instead when a test
/// needs to assert on the SQL or parameters a call actually received.
pub struct ScriptedDatabase {
    responses: Mutex<std::collections::VecDeque<Vec<Row>>>,
}

impl ScriptedDatabase {
    pub fn new(responses: Vec<Vec<Row>>) -> Self {
        ScriptedDatabase {
            responses: Mutex::new(responses.into()),
        }
    }
}

#[async_trait]
impl Database for ScriptedDatabase {
    async fn query(&self, _sql: &str, _params: &[Param]) -> Result<RowStream, DbError> {
        let rows = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| DbError::new("scripted database ran out of responses"))?;
        Ok(Box::pin(stream::iter(rows.into_iter().map(Ok))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::RawValue;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn mock_db_asserts_on_sql_and_params() {
        let mut db = MockDb::new();
        db.expect_query()
            .withf(|sql, params| sql.contains("FROM users") && *params == [Param::Int(1)])
            .times(1)
            .returning(|_, _| {
                let rows = vec![Ok(Row::from([(
                    "users_sqlfield_users_id".to_owned(),
                    RawValue::Int(1),
                )]))];
                Ok(Box::pin(stream::iter(rows)))
            });

        let mut rows = db.query("SELECT * FROM users WHERE id = ?", &[Param::Int(1)]).await.unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get("users_sqlfield_users_id"), Some(&RawValue::Int(1)));
    }
}
