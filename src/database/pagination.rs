//! Page/size/order handling on top of `PostgresResponse`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::PageLimits;
use crate::database::entity::Entity;
use crate::database::manager::DatabaseError;
use crate::database::query_builder::QueryBuilder;
use crate::database::response::{PostgresResponse, ResponseData};
use crate::filter::{split_key, FilterOrder, FilterOrderInfo};

/// Raw list parameters as callers send them
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListOptions {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub order_field: Option<Vec<String>>,
    pub order_type: Option<Vec<String>>,
    pub query: Option<Map<String, Value>>,
}

/// List parameters cleaned against an entity's columns
#[derive(Debug, Clone, Serialize)]
pub struct QueryOptions {
    pub page: u32,
    pub size: Option<u32>,
    pub order_field: Vec<String>,
    pub order_type: Vec<String>,
    pub query: Map<String, Value>,
}

impl QueryOptions {
    pub fn new<T: Entity>(options: ListOptions) -> Self {
        let table = T::table();
        let mut query = Map::new();
        for (key, value) in options.query.unwrap_or_default() {
            let (column, _) = split_key(&key);
            if table.filterable_column(column).is_some() {
                query.insert(key, value);
            } else {
                tracing::debug!("Dropping query key '{}' unknown to {}", key, table.name);
            }
        }

        Self {
            page: options.page.unwrap_or(1).max(1),
            size: options.size,
            order_field: options
                .order_field
                .filter(|f| !f.is_empty())
                .unwrap_or_else(|| vec!["uu_id".to_string()]),
            order_type: options
                .order_type
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| vec!["asc".to_string()]),
            query,
        }
    }

    pub fn pagination_config(&self, limits: PageLimits) -> PaginationConfig {
        PaginationConfig {
            page: self.page,
            size: self.size.unwrap_or(limits.default_size),
            order_field: self.order_field.clone(),
            order_type: self.order_type.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationConfig {
    pub page: u32,
    pub size: u32,
    pub order_field: Vec<String>,
    pub order_type: Vec<String>,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page: 1,
            size: 10,
            order_field: vec!["uu_id".to_string()],
            order_type: vec!["asc".to_string()],
        }
    }
}

/// Pagination block returned next to page data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    pub size: u32,
    pub page: u32,
    pub all_count: i64,
    pub total_count: i64,
    pub total_pages: u32,
    pub page_count: u32,
    pub order_field: Vec<String>,
    pub order_type: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Pagination {
    limits: PageLimits,
    pub size: u32,
    pub page: u32,
    pub order_field: Vec<String>,
    pub order_type: Vec<String>,
    /// Live rows without the caller's conditions
    pub all_count: i64,
    /// Rows matching the caller's conditions
    pub total_count: i64,
    pub total_pages: u32,
    /// Rows on the current page
    pub page_count: u32,
}

impl Pagination {
    pub fn new(limits: PageLimits) -> Self {
        let defaults = PaginationConfig::default();
        Self {
            limits,
            size: limits.default_size,
            page: 1,
            order_field: defaults.order_field,
            order_type: defaults.order_type,
            all_count: 0,
            total_count: 0,
            total_pages: 0,
            page_count: 0,
        }
    }

    pub fn change(&mut self, config: PaginationConfig) {
        self.size = self.bounded_size(config.size);
        self.page = config.page;
        self.order_field = config.order_field;
        self.order_type = config.order_type;
        self.refresh();
    }

    /// Pull both counts from `response`
    pub async fn feed<T: Entity>(&mut self, response: &PostgresResponse<T>) -> Result<(), DatabaseError> {
        let all_count = response.total_count().await?;
        let total_count = response.count().await?;
        self.feed_counts(all_count, total_count);
        Ok(())
    }

    pub fn feed_counts(&mut self, all_count: i64, total_count: i64) {
        self.all_count = all_count.max(0);
        self.total_count = total_count.max(0);
        self.refresh();
    }

    pub fn refresh(&mut self) {
        self.size = self.bounded_size(self.size);
        let size = i64::from(self.size);
        self.total_pages = ((self.total_count + size - 1) / size) as u32;
        self.page = self.page.clamp(1, self.total_pages.max(1));
        self.page_count = (self.total_count - self.offset()).clamp(0, size) as u32;
    }

    /// Validate the requested order against `T` and keep only what will run,
    /// including the unique tiebreaker
    pub fn apply_order<T: Entity>(&mut self) -> Result<Vec<FilterOrderInfo>, DatabaseError> {
        let order = FilterOrder::from_pairs(T::table(), &self.order_field[..], &self.order_type[..])?;
        let order = FilterOrder::with_tiebreaker(order);
        self.order_field = order.iter().map(|o| o.column.clone()).collect();
        self.order_type = order.iter().map(|o| o.sort.as_str().to_string()).collect();
        Ok(order)
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.limits);
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.size) * i64::from(self.page.saturating_sub(1))
    }

    pub fn as_dict(&self) -> PaginationInfo {
        PaginationInfo {
            size: self.size,
            page: self.page,
            all_count: self.all_count,
            total_count: self.total_count,
            total_pages: self.total_pages,
            page_count: self.page_count,
            order_field: self.order_field.clone(),
            order_type: self.order_type.clone(),
        }
    }

    fn bounded_size(&self, size: u32) -> u32 {
        if (self.limits.min_size..=self.limits.max_size).contains(&size) {
            size
        } else {
            self.limits.default_size
        }
    }
}

/// One page of a response, ordered and sliced
pub struct PaginationResult<T> {
    response: PostgresResponse<T>,
    builder: QueryBuilder<T>,
}

impl<T: Entity> PaginationResult<T> {
    /// Orders and slices `response`. `pagination` is left reporting the applied order.
    pub fn new(response: PostgresResponse<T>, pagination: &mut Pagination) -> Result<Self, DatabaseError> {
        let order = pagination.apply_order::<T>()?;
        let mut filter = response.filter().clone();
        filter
            .order(order)
            .limit(i64::from(pagination.size), Some(pagination.offset()))?;
        Ok(Self {
            response,
            builder: QueryBuilder::new(filter),
        })
    }

    pub async fn data(&self) -> Result<ResponseData<T>, DatabaseError> {
        let pool = self.response.pool();
        if self.response.is_list() {
            Ok(ResponseData::List(self.builder.select_all(pool).await?))
        } else {
            Ok(ResponseData::Single(self.builder.select_optional(pool).await?))
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: PaginationInfo,
}
