//! INSERT/UPDATE/DELETE rendering for mapped tables.

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::database::entity::Table;
use crate::filter::{FilterError, FilterOp, FilterWhere, FilterWhereInfo, FilterWhereOptions, SqlResult};

pub struct Statement;

impl Statement {
    /// Reject keys that are not columns of `table` or that callers may not set
    pub fn validate_writable(table: Table, values: &Map<String, Value>) -> Result<(), FilterError> {
        for key in values.keys() {
            match table.column(key) {
                None => {
                    return Err(FilterError::InvalidColumn(format!(
                        "{} has no column '{}'",
                        table.name, key
                    )))
                }
                Some(column) if !column.writable => {
                    return Err(FilterError::InvalidColumn(format!(
                        "{}.{} is managed by the system",
                        table.name, key
                    )))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    pub fn insert(table: Table, values: &Map<String, Value>) -> Result<SqlResult, FilterError> {
        if values.is_empty() {
            return Ok(SqlResult {
                query: format!("INSERT INTO \"{}\" DEFAULT VALUES RETURNING *", table.name),
                params: vec![],
            });
        }

        let mut columns = Vec::with_capacity(values.len());
        let mut placeholders = Vec::with_capacity(values.len());
        let mut params = Vec::with_capacity(values.len());
        for (i, (key, value)) in values.iter().enumerate() {
            let column = Self::column(table, key)?;
            columns.push(format!("\"{}\"", column.name));
            placeholders.push(format!("${}::{}", i + 1, column.sql_type.as_str()));
            params.push(value.clone());
        }

        Ok(SqlResult {
            query: format!(
                "INSERT INTO \"{}\" ({}) VALUES ({}) RETURNING *",
                table.name,
                columns.join(", "),
                placeholders.join(", ")
            ),
            params,
        })
    }

    /// Update one record by `uu_id`, restricted to what `options` can see.
    /// `updated_at` is always refreshed.
    pub fn update(
        table: Table,
        uu_id: Uuid,
        values: &Map<String, Value>,
        options: &FilterWhereOptions,
    ) -> Result<SqlResult, FilterError> {
        let mut set_clauses = Vec::with_capacity(values.len() + 1);
        let mut params = Vec::with_capacity(values.len());
        for (i, (key, value)) in values.iter().enumerate() {
            let column = Self::column(table, key)?;
            set_clauses.push(format!("\"{}\" = ${}::{}", column.name, i + 1, column.sql_type.as_str()));
            params.push(value.clone());
        }
        set_clauses.push("\"updated_at\" = now()".to_string());

        let (where_clause, where_params) = FilterWhere::generate(table, &[Self::by_uu_id(uu_id)], params.len(), options)?;
        params.extend(where_params);

        Ok(SqlResult {
            query: format!(
                "UPDATE \"{}\" SET {} WHERE {} RETURNING *",
                table.name,
                set_clauses.join(", "),
                where_clause
            ),
            params,
        })
    }

    pub fn delete(table: Table, uu_id: Uuid) -> Result<SqlResult, FilterError> {
        let (where_clause, params) =
            FilterWhere::generate(table, &[Self::by_uu_id(uu_id)], 0, &FilterWhereOptions::system())?;
        Ok(SqlResult {
            query: format!("DELETE FROM \"{}\" WHERE {}", table.name, where_clause),
            params,
        })
    }

    fn by_uu_id(uu_id: Uuid) -> FilterWhereInfo {
        FilterWhereInfo {
            column: "uu_id".to_string(),
            operator: FilterOp::Eq,
            data: Value::String(uu_id.to_string()),
        }
    }

    fn column(table: Table, key: &str) -> Result<&'static crate::database::entity::Column, FilterError> {
        table
            .column(key)
            .ok_or_else(|| FilterError::InvalidColumn(format!("{} has no column '{}'", table.name, key)))
    }
}
