use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Map, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::PageLimits;
use crate::context;
use crate::database::entity::Entity;
use crate::database::manager::DatabaseError;
use crate::database::pagination::{Page, Pagination, PaginationResult, QueryOptions};
use crate::database::query_builder::{self, QueryBuilder};
use crate::database::response::PostgresResponse;
use crate::database::statement::Statement;
use crate::filter::{Filter, FilterWhere, FilterWhereInfo, FilterWhereOptions, Scope};

/// Outcome of a find-or-create
#[derive(Debug, Clone, Serialize)]
pub struct Created<T> {
    pub record: T,
    pub created: bool,
}

/// Queries and lifecycle operations for one entity
pub struct Repository<T> {
    pool: PgPool,
    limits: PageLimits,
    _phantom: std::marker::PhantomData<T>,
}

impl<T: Entity> Repository<T> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            limits: crate::config::config().pagination.limits(),
            _phantom: std::marker::PhantomData,
        }
    }

    pub fn with_limits(mut self, limits: PageLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Validate a keyword map into filter conditions
    pub fn convert(&self, smart_options: &Map<String, Value>) -> Result<Vec<FilterWhereInfo>, DatabaseError> {
        Ok(FilterWhere::parse(T::table(), smart_options)?)
    }

    pub fn filter_all(&self, conditions: &Map<String, Value>) -> Result<PostgresResponse<T>, DatabaseError> {
        self.response(conditions, Scope::Live, true)
    }

    pub fn filter_one(&self, conditions: &Map<String, Value>) -> Result<PostgresResponse<T>, DatabaseError> {
        self.response(conditions, Scope::Live, false)
    }

    pub fn filter_all_system(&self, conditions: &Map<String, Value>) -> Result<PostgresResponse<T>, DatabaseError> {
        self.response(conditions, Scope::System, true)
    }

    pub fn filter_one_system(&self, conditions: &Map<String, Value>) -> Result<PostgresResponse<T>, DatabaseError> {
        self.response(conditions, Scope::System, false)
    }

    /// Equality-only lookup of a single record
    pub fn filter_by_one(&self, kwargs: &Map<String, Value>, system: bool) -> Result<PostgresResponse<T>, DatabaseError> {
        Self::check_equality(kwargs)?;
        let scope = if system { Scope::System } else { Scope::Live };
        self.response(kwargs, scope, false)
    }

    pub fn filter_by_all_system(&self, kwargs: &Map<String, Value>) -> Result<PostgresResponse<T>, DatabaseError> {
        Self::check_equality(kwargs)?;
        self.response(kwargs, Scope::System, true)
    }

    /// Count, order and slice live rows in one go
    pub async fn paginate(&self, options: QueryOptions) -> Result<Page<T>, DatabaseError> {
        let response = self.filter_all(&options.query)?;
        let mut pagination = Pagination::new(self.limits);
        pagination.feed(&response).await?;
        pagination.change(options.pagination_config(self.limits));

        let result = PaginationResult::new(response, &mut pagination)?;
        let data = result.data().await?.into_vec();
        Ok(Page {
            data,
            pagination: pagination.as_dict(),
        })
    }

    /// Live record by `uu_id`
    pub async fn get(&self, uu_id: Uuid) -> Result<T, DatabaseError> {
        self.filter_one(&Self::uu_id_map(uu_id))?
            .first()
            .await?
            .ok_or_else(|| Self::not_found(uu_id))
    }

    pub async fn create(&self, values: &Map<String, Value>) -> Result<T, DatabaseError> {
        Statement::validate_writable(T::table(), values)?;
        let record = self.insert(&self.pool, values).await?;
        tracing::info!("Created {} record", T::TABLE);
        Ok(record)
    }

    /// Create unless a live record already matches `values`
    pub async fn create_or_abort(&self, values: &Map<String, Value>) -> Result<T, DatabaseError> {
        Statement::validate_writable(T::table(), values)?;
        let mut tx = self.pool.begin().await?;
        Self::lock_lookup(&mut tx, values).await?;

        let existing = self.live_match(values)?.select_optional(&mut *tx).await?;
        if existing.is_some() {
            tx.rollback().await?;
            return Err(DatabaseError::Conflict(format!(
                "{} record already exists",
                T::TABLE
            )));
        }

        let record = self.insert(&mut *tx, values).await?;
        tx.commit().await?;
        tracing::info!("Created {} record", T::TABLE);
        Ok(record)
    }

    pub async fn find_or_create(&self, values: &Map<String, Value>) -> Result<Created<T>, DatabaseError> {
        self.find_or_create_by(values, &Map::new()).await
    }

    /// Look up a live record by `lookup`; insert `lookup` plus `defaults` when none exists.
    /// Lookup values win over defaults for the same column.
    pub async fn find_or_create_by(
        &self,
        lookup: &Map<String, Value>,
        defaults: &Map<String, Value>,
    ) -> Result<Created<T>, DatabaseError> {
        Self::check_equality(lookup)?;
        Statement::validate_writable(T::table(), lookup)?;
        Statement::validate_writable(T::table(), defaults)?;

        let mut tx = self.pool.begin().await?;
        Self::lock_lookup(&mut tx, lookup).await?;
        if let Some(record) = self.live_match(lookup)?.select_optional(&mut *tx).await? {
            tx.commit().await?;
            return Ok(Created { record, created: false });
        }

        let mut values = defaults.clone();
        values.extend(lookup.clone());
        let record = self.insert(&mut *tx, &values).await?;
        tx.commit().await?;
        tracing::info!("Created {} record via find-or-create", T::TABLE);
        Ok(Created { record, created: true })
    }

    /// Change a live record. `updated_at` and the updater are stamped.
    pub async fn update(&self, uu_id: Uuid, values: &Map<String, Value>) -> Result<T, DatabaseError> {
        Statement::validate_writable(T::table(), values)?;
        self.apply(uu_id, values.clone(), FilterWhereOptions::default()).await
    }

    pub async fn soft_delete(&self, uu_id: Uuid) -> Result<T, DatabaseError> {
        let values = Self::object(json!({ "deleted": true, "active": false }));
        let record = self.apply(uu_id, values, FilterWhereOptions::default()).await?;
        tracing::info!("Soft-deleted {} {}", T::TABLE, uu_id);
        Ok(record)
    }

    /// Undo a soft delete. Sees every record regardless of window.
    pub async fn restore(&self, uu_id: Uuid) -> Result<T, DatabaseError> {
        let values = Self::object(json!({ "deleted": false, "active": true }));
        let record = self.apply(uu_id, values, FilterWhereOptions::system()).await?;
        tracing::info!("Restored {} {}", T::TABLE, uu_id);
        Ok(record)
    }

    /// Close the validity window of a live record now
    pub async fn expire(&self, uu_id: Uuid) -> Result<T, DatabaseError> {
        let options = FilterWhereOptions::default();
        let values = Self::object(json!({ "expiry_ends": options.at.to_rfc3339() }));
        let record = self.apply(uu_id, values, options).await?;
        tracing::info!("Expired {} {}", T::TABLE, uu_id);
        Ok(record)
    }

    /// Physically remove a record
    pub async fn destroy(&self, uu_id: Uuid) -> Result<(), DatabaseError> {
        let sql = Statement::delete(T::table(), uu_id)?;
        let affected = query_builder::execute(&sql, &self.pool).await?;
        if affected == 0 {
            return Err(Self::not_found(uu_id));
        }
        tracing::info!("Destroyed {} {}", T::TABLE, uu_id);
        Ok(())
    }

    fn response(
        &self,
        conditions: &Map<String, Value>,
        scope: Scope,
        is_list: bool,
    ) -> Result<PostgresResponse<T>, DatabaseError> {
        let mut filter = Filter::new(T::table())?;
        filter.scope(scope).where_clause(conditions)?;
        Ok(PostgresResponse::new(self.pool.clone(), filter, is_list))
    }

    /// Transaction-scoped advisory lock on (table, lookup values). Concurrent
    /// find-or-create calls for the same lookup run one after another.
    async fn lock_lookup(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        lookup: &Map<String, Value>,
    ) -> Result<(), DatabaseError> {
        // Map keys are sorted, so equal lookups render the same key
        let key = format!("{}:{}", T::TABLE, Value::Object(lookup.clone()));
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(key)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    fn live_match(&self, values: &Map<String, Value>) -> Result<QueryBuilder<T>, DatabaseError> {
        let mut filter = Filter::new(T::table())?;
        filter.where_clause(values)?;
        Ok(QueryBuilder::new(filter))
    }

    async fn insert<'c, E>(&self, executor: E, values: &Map<String, Value>) -> Result<T, DatabaseError>
    where
        E: sqlx::Executor<'c, Database = sqlx::Postgres>,
    {
        let mut values = values.clone();
        values
            .entry("expiry_starts")
            .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));
        values.extend(context::creator_fields());
        let sql = Statement::insert(T::table(), &values)?;
        query_builder::fetch_optional(&sql, executor)
            .await?
            .ok_or_else(|| DatabaseError::QueryError(format!("insert into {} returned no row", T::TABLE)))
    }

    async fn apply(
        &self,
        uu_id: Uuid,
        mut values: Map<String, Value>,
        options: FilterWhereOptions,
    ) -> Result<T, DatabaseError> {
        values.extend(context::updater_fields());
        let sql = Statement::update(T::table(), uu_id, &values, &options)?;
        query_builder::fetch_optional(&sql, &self.pool)
            .await?
            .ok_or_else(|| Self::not_found(uu_id))
    }

    fn check_equality(kwargs: &Map<String, Value>) -> Result<(), DatabaseError> {
        if let Some(key) = kwargs.keys().find(|k| k.contains("__")) {
            return Err(DatabaseError::InvalidInput(format!(
                "'{}' is not a plain column; equality lookups take column names only",
                key
            )));
        }
        Ok(())
    }

    fn uu_id_map(uu_id: Uuid) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("uu_id".to_string(), Value::String(uu_id.to_string()));
        map
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    fn not_found(uu_id: Uuid) -> DatabaseError {
        DatabaseError::NotFound(format!("{} {} not found", T::TABLE, uu_id))
    }
}
