use serde_json::{Map, Value};

use super::error::FilterError;
use super::types::{split_key, FilterOp, FilterWhereInfo, FilterWhereOptions, Scope};
use crate::database::entity::{Column, Table};

pub struct FilterWhere {
    table: Table,
    param_values: Vec<Value>,
    param_index: usize,
}

impl FilterWhere {
    pub fn new(table: Table, starting_param_index: usize) -> Self {
        Self {
            table,
            param_values: vec![],
            param_index: starting_param_index,
        }
    }

    /// Turn a keyword map (`{"title__ilike": "%a%", "user_uu_id": "…"}`) into conditions.
    pub fn parse(table: Table, where_data: &Map<String, Value>) -> Result<Vec<FilterWhereInfo>, FilterError> {
        let mut conditions = Vec::with_capacity(where_data.len());
        for (key, value) in where_data {
            let (column, op) = split_key(key);
            if table.filterable_column(column).is_none() {
                return Err(FilterError::InvalidColumn(format!(
                    "{} has no filterable column '{}'",
                    table.name, column
                )));
            }
            let operator = match op {
                None => FilterOp::Eq,
                Some(op) => FilterOp::parse(op).ok_or_else(|| FilterError::UnsupportedOperator(op.to_string()))?,
            };
            conditions.push(FilterWhereInfo {
                column: column.to_string(),
                operator,
                data: value.clone(),
            });
        }
        Ok(conditions)
    }

    /// Render conditions plus the scope predicate. Returns an empty clause when nothing applies.
    pub fn generate(
        table: Table,
        conditions: &[FilterWhereInfo],
        starting_param_index: usize,
        options: &FilterWhereOptions,
    ) -> Result<(String, Vec<Value>), FilterError> {
        let mut filter_where = Self::new(table, starting_param_index);
        filter_where.build(conditions, options)
    }

    fn build(
        &mut self,
        conditions: &[FilterWhereInfo],
        options: &FilterWhereOptions,
    ) -> Result<(String, Vec<Value>), FilterError> {
        let mut sql_conditions = vec![];

        if options.scope == Scope::Live {
            let at = Value::String(options.at.to_rfc3339());
            sql_conditions.push("\"deleted\" = false".to_string());
            let starts = self.param(at.clone(), "timestamptz");
            sql_conditions.push(format!("\"expiry_starts\" <= {}", starts));
            let ends = self.param(at, "timestamptz");
            sql_conditions.push(format!("\"expiry_ends\" > {}", ends));
        }

        for condition in conditions {
            if let Some(sql) = self.build_sql_condition(condition)? {
                sql_conditions.push(sql);
            }
        }

        Ok((sql_conditions.join(" AND "), self.param_values.clone()))
    }

    fn build_sql_condition(&mut self, condition: &FilterWhereInfo) -> Result<Option<String>, FilterError> {
        let column = self.column(&condition.column)?;
        let ty = column.sql_type.as_str();
        let quoted_column = format!("\"{}\"", column.name);
        let data = &condition.data;

        let sql = match condition.operator {
            FilterOp::Eq => {
                if data.is_null() {
                    format!("{} IS NULL", quoted_column)
                } else {
                    format!("{} = {}", quoted_column, self.param(data.clone(), ty))
                }
            }
            FilterOp::Ne => {
                if data.is_null() {
                    format!("{} IS NOT NULL", quoted_column)
                } else {
                    format!("{} <> {}", quoted_column, self.param(data.clone(), ty))
                }
            }
            FilterOp::Gt => format!("{} > {}", quoted_column, self.param(data.clone(), ty)),
            FilterOp::Gte => format!("{} >= {}", quoted_column, self.param(data.clone(), ty)),
            FilterOp::Lt => format!("{} < {}", quoted_column, self.param(data.clone(), ty)),
            FilterOp::Lte => format!("{} <= {}", quoted_column, self.param(data.clone(), ty)),
            FilterOp::In => match data {
                Value::Array(values) if values.is_empty() => "1=0".to_string(),
                Value::Array(values) => {
                    let params: Vec<String> = values.iter().map(|v| self.param(v.clone(), ty)).collect();
                    format!("{} IN ({})", quoted_column, params.join(", "))
                }
                other => format!("{} = {}", quoted_column, self.param(other.clone(), ty)),
            },
            FilterOp::NotIn => match data {
                Value::Array(values) if values.is_empty() => return Ok(None),
                Value::Array(values) => {
                    let params: Vec<String> = values.iter().map(|v| self.param(v.clone(), ty)).collect();
                    format!("{} NOT IN ({})", quoted_column, params.join(", "))
                }
                other => format!("{} <> {}", quoted_column, self.param(other.clone(), ty)),
            },
            FilterOp::Between => match data {
                Value::Array(values) if values.len() == 2 => {
                    let low = self.param(values[0].clone(), ty);
                    let high = self.param(values[1].clone(), ty);
                    format!("{} BETWEEN {} AND {}", quoted_column, low, high)
                }
                _ => {
                    return Err(FilterError::InvalidOperatorData(format!(
                        "{}__between requires exactly 2 values",
                        column.name
                    )))
                }
            },
            FilterOp::IsNull => {
                if Self::truthy(data) {
                    format!("{} IS NULL", quoted_column)
                } else {
                    format!("{} IS NOT NULL", quoted_column)
                }
            }
            FilterOp::Like => format!("{}::text LIKE {}", quoted_column, self.pattern(data, "", "")?),
            FilterOp::ILike => format!("{}::text ILIKE {}", quoted_column, self.pattern(data, "", "")?),
            FilterOp::StartsWith => format!("{}::text LIKE {}", quoted_column, self.pattern(data, "", "%")?),
            FilterOp::EndsWith => format!("{}::text LIKE {}", quoted_column, self.pattern(data, "%", "")?),
            FilterOp::Contains => format!("{}::text LIKE {}", quoted_column, self.pattern(data, "%", "%")?),
            FilterOp::IContains => format!("{}::text ILIKE {}", quoted_column, self.pattern(data, "%", "%")?),
        };
        Ok(Some(sql))
    }

    fn column(&self, name: &str) -> Result<&'static Column, FilterError> {
        self.table
            .column(name)
            .ok_or_else(|| FilterError::InvalidColumn(format!("{} has no column '{}'", self.table.name, name)))
    }

    fn pattern(&mut self, data: &Value, prefix: &str, suffix: &str) -> Result<String, FilterError> {
        let text = match data {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => {
                return Err(FilterError::InvalidOperatorData(
                    "pattern operators require a string value".to_string(),
                ))
            }
        };
        Ok(self.param(Value::String(format!("{}{}{}", prefix, text, suffix)), "text"))
    }

    fn truthy(data: &Value) -> bool {
        match data {
            Value::Bool(b) => *b,
            Value::String(s) => matches!(s.to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
            Value::Number(n) => n.as_i64().map(|i| i != 0).unwrap_or(false),
            _ => false,
        }
    }

    fn param(&mut self, value: Value, sql_type: &str) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}::{}", self.param_index, sql_type)
    }
}
