use std::marker::PhantomData;
use std::time::{Duration, Instant};

use serde_json::{Number, Value};
use sqlx::{self, postgres::PgArguments, postgres::PgRow, Executor, FromRow, Postgres, Row};

use crate::database::manager::DatabaseError;
use crate::filter::{Filter, SqlResult};

/// Runs the SQL a `Filter` renders, typed as `T`
pub struct QueryBuilder<T> {
    filter: Filter,
    _phantom: PhantomData<T>,
}

impl<T> QueryBuilder<T>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    pub fn new(filter: Filter) -> Self {
        Self { filter, _phantom: PhantomData }
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub async fn select_all<'c, E>(&self, executor: E) -> Result<Vec<T>, DatabaseError>
    where
        E: Executor<'c, Database = Postgres>,
    {
        let sql_result = self.filter.to_sql()?;
        fetch_all(&sql_result, executor).await
    }

    pub async fn select_optional<'c, E>(&self, executor: E) -> Result<Option<T>, DatabaseError>
    where
        E: Executor<'c, Database = Postgres>,
    {
        let mut filter = self.filter.clone();
        filter.first_only();
        fetch_optional(&filter.to_sql()?, executor).await
    }

    pub async fn count<'c, E>(&self, executor: E) -> Result<i64, DatabaseError>
    where
        E: Executor<'c, Database = Postgres>,
    {
        let sql_result = self.filter.to_count_sql()?;
        fetch_count(&sql_result, executor).await
    }
}

pub async fn fetch_all<'c, T, E>(sql_result: &SqlResult, executor: E) -> Result<Vec<T>, DatabaseError>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    E: Executor<'c, Database = Postgres>,
{
    let started = Instant::now();
    let mut q = sqlx::query_as::<_, T>(&sql_result.query);
    for p in sql_result.params.iter() {
        q = bind_param_query_as(q, p);
    }
    let rows = q.fetch_all(executor).await?;
    log_query(sql_result, started.elapsed());
    Ok(rows)
}

pub async fn fetch_optional<'c, T, E>(sql_result: &SqlResult, executor: E) -> Result<Option<T>, DatabaseError>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    E: Executor<'c, Database = Postgres>,
{
    let started = Instant::now();
    let mut q = sqlx::query_as::<_, T>(&sql_result.query);
    for p in sql_result.params.iter() {
        q = bind_param_query_as(q, p);
    }
    let row = q.fetch_optional(executor).await?;
    log_query(sql_result, started.elapsed());
    Ok(row)
}

pub async fn fetch_count<'c, E>(sql_result: &SqlResult, executor: E) -> Result<i64, DatabaseError>
where
    E: Executor<'c, Database = Postgres>,
{
    let started = Instant::now();
    let mut q = sqlx::query(&sql_result.query);
    for p in sql_result.params.iter() {
        q = bind_param_query(q, p);
    }
    let row = q.fetch_one(executor).await?;
    log_query(sql_result, started.elapsed());
    let count: i64 = row.try_get("count")?;
    Ok(count)
}

/// Run a statement without rows, returning the affected row count
pub async fn execute<'c, E>(sql_result: &SqlResult, executor: E) -> Result<u64, DatabaseError>
where
    E: Executor<'c, Database = Postgres>,
{
    let started = Instant::now();
    let mut q = sqlx::query(&sql_result.query);
    for p in sql_result.params.iter() {
        q = bind_param_query(q, p);
    }
    let done = q.execute(executor).await?;
    log_query(sql_result, started.elapsed());
    Ok(done.rows_affected())
}

fn log_query(sql_result: &SqlResult, elapsed: Duration) {
    let db = &crate::config::config().database;
    if db.enable_query_logging {
        tracing::debug!(
            sql = %sql_result.query,
            params = ?sql_result.params,
            elapsed_ms = elapsed.as_millis() as u64,
            "query"
        );
    }
    if db.enable_slow_query_warning && elapsed.as_millis() as u64 > db.slow_query_threshold_ms {
        tracing::warn!(
            "Slow query ({} ms > {} ms): {}",
            elapsed.as_millis(),
            db.slow_query_threshold_ms,
            sql_result.query
        );
    }
}

/// How a JSON number is bound. Postgres has no unsigned 64-bit type, so
/// integers past `i64::MAX` go as text and the placeholder cast decides.
#[derive(Debug, PartialEq)]
enum NumberParam {
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<&Number> for NumberParam {
    fn from(n: &Number) -> Self {
        if let Some(i) = n.as_i64() {
            NumberParam::Int(i)
        } else if n.is_u64() {
            NumberParam::Text(n.to_string())
        } else if let Some(f) = n.as_f64() {
            NumberParam::Float(f)
        } else {
            NumberParam::Text(n.to_string())
        }
    }
}

fn bind_param_query<'q>(
    q: sqlx::query::Query<'q, Postgres, PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => match NumberParam::from(n) {
            NumberParam::Int(i) => q.bind(i),
            NumberParam::Float(f) => q.bind(f),
            NumberParam::Text(t) => q.bind(t),
        },
        Value::String(s) => q.bind(s.as_str()),
        // IN lists are expanded by FilterWhere; anything structured left is JSON
        Value::Array(_) | Value::Object(_) => q.bind(v),
    }
}

fn bind_param_query_as<'q, O>(
    q: sqlx::query::QueryAs<'q, Postgres, O, PgArguments>,
    v: &'q Value,
) -> sqlx::query::QueryAs<'q, Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, PgRow>,
{
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => match NumberParam::from(n) {
            NumberParam::Int(i) => q.bind(i),
            NumberParam::Float(f) => q.bind(f),
            NumberParam::Text(t) => q.bind(t),
        },
        Value::String(s) => q.bind(s.as_str()),
        Value::Array(_) | Value::Object(_) => q.bind(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn param(v: Value) -> NumberParam {
        match v {
            Value::Number(n) => NumberParam::from(&n),
            other => panic!("not a number: {other}"),
        }
    }

    #[test]
    fn large_unsigned_numbers_are_not_wrapped() {
        assert_eq!(param(json!(42)), NumberParam::Int(42));
        assert_eq!(param(json!(-7)), NumberParam::Int(-7));
        assert_eq!(param(json!(i64::MAX as u64)), NumberParam::Int(i64::MAX));
        assert_eq!(param(json!(u64::MAX)), NumberParam::Text("18446744073709551615".to_string()));
        assert_eq!(param(json!(1.5)), NumberParam::Float(1.5));
    }
}
