use serde::Serialize;
use sqlx::PgPool;

use crate::database::entity::Entity;
use crate::database::manager::DatabaseError;
use crate::database::query_builder::QueryBuilder;
use crate::filter::{Filter, Scope};

/// Rows of a list response, or the first row of a single response
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ResponseData<T> {
    List(Vec<T>),
    Single(Option<T>),
}

impl<T> ResponseData<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            ResponseData::List(rows) => rows,
            ResponseData::Single(row) => row.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseInfo {
    pub table: &'static str,
    pub system: bool,
    pub is_list: bool,
    pub count: i64,
}

/// A prepared query. Nothing runs until one of the async accessors is awaited.
pub struct PostgresResponse<T> {
    pool: PgPool,
    filter: Filter,
    is_list: bool,
    builder: QueryBuilder<T>,
}

impl<T: Entity> PostgresResponse<T> {
    pub fn new(pool: PgPool, filter: Filter, is_list: bool) -> Self {
        Self {
            pool,
            builder: QueryBuilder::new(filter.clone()),
            filter,
            is_list,
        }
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn is_list(&self) -> bool {
        self.is_list
    }

    pub async fn all(&self) -> Result<Vec<T>, DatabaseError> {
        self.builder.select_all(&self.pool).await
    }

    pub async fn first(&self) -> Result<Option<T>, DatabaseError> {
        self.builder.select_optional(&self.pool).await
    }

    pub async fn data(&self) -> Result<ResponseData<T>, DatabaseError> {
        if self.is_list {
            Ok(ResponseData::List(self.all().await?))
        } else {
            Ok(ResponseData::Single(self.first().await?))
        }
    }

    /// Rows matching the caller's conditions; at most 1 for single responses
    pub async fn count(&self) -> Result<i64, DatabaseError> {
        let count = self.builder.count(&self.pool).await?;
        Ok(if self.is_list { count } else { count.min(1) })
    }

    /// Rows visible in the same scope, ignoring the caller's conditions
    pub async fn total_count(&self) -> Result<i64, DatabaseError> {
        QueryBuilder::<T>::new(self.filter.unfiltered())
            .count(&self.pool)
            .await
    }

    pub async fn as_info(&self) -> Result<ResponseInfo, DatabaseError> {
        Ok(ResponseInfo {
            table: T::TABLE,
            system: self.filter.current_scope() == Scope::System,
            is_list: self.is_list,
            count: self.count().await?,
        })
    }
}
