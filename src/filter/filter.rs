use serde_json::{Map, Value};

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{FilterOrderInfo, FilterWhereInfo, FilterWhereOptions, Scope, SqlResult};
use crate::database::entity::Table;

/// SELECT/COUNT builder over one mapped table
#[derive(Debug, Clone)]
pub struct Filter {
    table: Table,
    select_columns: Vec<String>,
    where_data: Vec<FilterWhereInfo>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<i64>,
    offset: Option<i64>,
    options: FilterWhereOptions,
}

impl Filter {
    pub fn new(table: Table) -> Result<Self, FilterError> {
        Self::validate_table_name(table.name)?;
        Ok(Self {
            table,
            select_columns: vec![],
            where_data: vec![],
            order_data: vec![],
            limit: None,
            offset: None,
            options: FilterWhereOptions::default(),
        })
    }

    pub fn table(&self) -> Table {
        self.table
    }

    pub fn current_scope(&self) -> Scope {
        self.options.scope
    }

    /// Same table and scope without caller conditions, order or paging
    pub fn unfiltered(&self) -> Self {
        Self {
            table: self.table,
            select_columns: self.select_columns.clone(),
            where_data: vec![],
            order_data: vec![],
            limit: None,
            offset: None,
            options: self.options.clone(),
        }
    }

    pub fn select(&mut self, columns: Vec<String>) -> Result<&mut Self, FilterError> {
        for column in &columns {
            if column != "*" && !self.table.has_column(column) {
                return Err(FilterError::InvalidColumn(format!(
                    "{} has no column '{}'",
                    self.table.name, column
                )));
            }
        }
        self.select_columns = columns;
        Ok(self)
    }

    /// Add keyword conditions. Repeated calls AND together.
    pub fn where_clause(&mut self, conditions: &Map<String, Value>) -> Result<&mut Self, FilterError> {
        let parsed = FilterWhere::parse(self.table, conditions)?;
        self.where_data.extend(parsed);
        Ok(self)
    }

    pub fn order(&mut self, order: Vec<FilterOrderInfo>) -> &mut Self {
        self.order_data = order;
        self
    }

    pub fn scope(&mut self, scope: Scope) -> &mut Self {
        self.options.scope = scope;
        self
    }

    pub fn options(&mut self, options: FilterWhereOptions) -> &mut Self {
        self.options = options;
        self
    }

    pub fn limit(&mut self, limit: i64, offset: Option<i64>) -> Result<&mut Self, FilterError> {
        if limit < 0 {
            return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string()));
        }
        if let Some(off) = offset {
            if off < 0 {
                return Err(FilterError::InvalidOffset("Offset must be non-negative".to_string()));
            }
        }
        self.limit = Some(limit);
        self.offset = offset;
        Ok(self)
    }

    /// Fetch at most one row, keeping any offset
    pub fn first_only(&mut self) -> &mut Self {
        self.limit = Some(1);
        self
    }

    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        let where_result = self.to_where_sql()?;
        let query = [
            format!("SELECT {}", self.build_select_clause()),
            format!("FROM \"{}\"", self.table.name),
            if where_result.query.is_empty() {
                String::new()
            } else {
                format!("WHERE {}", where_result.query)
            },
            FilterOrder::generate(&self.order_data),
            self.build_limit_clause(),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        Ok(SqlResult { query, params: where_result.params })
    }

    pub fn to_where_sql(&self) -> Result<SqlResult, FilterError> {
        let (query, params) = FilterWhere::generate(self.table, &self.where_data, 0, &self.options)?;
        Ok(SqlResult { query, params })
    }

    pub fn to_count_sql(&self) -> Result<SqlResult, FilterError> {
        let where_result = self.to_where_sql()?;
        let query = if where_result.query.is_empty() {
            format!("SELECT COUNT(*) AS count FROM \"{}\"", self.table.name)
        } else {
            format!(
                "SELECT COUNT(*) AS count FROM \"{}\" WHERE {}",
                self.table.name, where_result.query
            )
        };
        Ok(SqlResult { query, params: where_result.params })
    }

    fn validate_table_name(name: &str) -> Result<(), FilterError> {
        let mut chars = name.chars();
        let valid_start = chars.next().map(|c| c.is_alphabetic() || c == '_').unwrap_or(false);
        if !valid_start || !chars.all(|c| c.is_alphanumeric() || c == '_') {
            return Err(FilterError::InvalidTableName(format!("Invalid table name format: '{}'", name)));
        }
        Ok(())
    }

    fn build_select_clause(&self) -> String {
        if self.select_columns.is_empty() || self.select_columns.iter().any(|c| c == "*") {
            "*".to_string()
        } else {
            self.select_columns
                .iter()
                .map(|c| format!("\"{}\"", c))
                .collect::<Vec<_>>()
                .join(", ")
        }
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::entity::{Column, SqlType};
    use serde_json::json;

    const COLUMNS: &[Column] = &[Column::new("title", SqlType::Text)];

    fn table() -> Table {
        Table { name: "notes", columns: COLUMNS }
    }

    #[test]
    fn select_with_where_order_and_page() {
        let mut filter = Filter::new(table()).unwrap();
        filter
            .scope(Scope::System)
            .where_clause(json!({ "title__icontains": "a" }).as_object().unwrap())
            .unwrap()
            .limit(10, Some(20))
            .unwrap();
        filter.order(FilterOrder::from_pairs(table(), &["id"], &["desc"]).unwrap());

        let sql = filter.to_sql().unwrap();
        assert_eq!(
            sql.query,
            "SELECT * FROM \"notes\" WHERE \"title\"::text ILIKE $1::text ORDER BY \"id\" DESC LIMIT 10 OFFSET 20"
        );
        assert_eq!(sql.params, vec![json!("%a%")]);
    }

    #[test]
    fn count_without_conditions() {
        let mut filter = Filter::new(table()).unwrap();
        filter.scope(Scope::System);
        assert_eq!(filter.to_count_sql().unwrap().query, "SELECT COUNT(*) AS count FROM \"notes\"");
    }

    #[test]
    fn live_count_carries_window_params() {
        let filter = Filter::new(table()).unwrap();
        let sql = filter.to_count_sql().unwrap();
        assert!(sql.query.contains("\"deleted\" = false"));
        assert_eq!(sql.params.len(), 2);
    }

    #[test]
    fn rejects_bad_table_and_negative_limit() {
        assert!(Filter::new(Table { name: "1notes", columns: COLUMNS }).is_err());
        assert!(Filter::new(Table { name: "notes;drop", columns: COLUMNS }).is_err());
        let mut filter = Filter::new(table()).unwrap();
        assert!(matches!(filter.limit(-1, None), Err(FilterError::InvalidLimit(_))));
        assert!(matches!(filter.select(vec!["secret".into()]), Err(FilterError::InvalidColumn(_))));
    }
}
