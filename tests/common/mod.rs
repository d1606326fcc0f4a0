#![allow(dead_code)]

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};

const SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");

/// A pool whose connections all resolve tables inside a private schema.
/// Tests skip (return `None`) when `DATABASE_URL` is not set.
pub struct TestDb {
    pub pool: PgPool,
    pub schema: String,
}

impl TestDb {
    pub async fn connect() -> Result<Option<Self>> {
        dotenvy::dotenv().ok();
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set; skipping database test");
            return Ok(None);
        };

        let nanos = SystemTime::now().duration_since(UNIX_EPOCH)?.as_nanos();
        let schema = format!("notes_test_{}_{}", std::process::id(), nanos);

        let admin = PgPoolOptions::new().max_connections(1).connect(&url).await?;
        admin
            .execute(format!("CREATE SCHEMA \"{}\"", schema).as_str())
            .await
            .context("failed to create test schema")?;
        admin.close().await;

        let search_path = format!("SET search_path TO \"{}\", public", schema);
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .after_connect(move |conn, _meta| {
                let search_path = search_path.clone();
                Box::pin(async move {
                    conn.execute(search_path.as_str()).await?;
                    Ok(())
                })
            })
            .connect(&url)
            .await?;

        for statement in SCHEMA_SQL.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            pool.execute(statement)
                .await
                .with_context(|| format!("schema statement failed: {}", statement))?;
        }

        Ok(Some(Self { pool, schema }))
    }

    pub async fn teardown(self) -> Result<()> {
        self.pool
            .execute(format!("DROP SCHEMA \"{}\" CASCADE", self.schema).as_str())
            .await?;
        self.pool.close().await;
        Ok(())
    }
}

/// Build a JSON object map from `json!` literal syntax
macro_rules! map {
    ($($tt:tt)*) => {
        match serde_json::json!({ $($tt)* }) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        }
    };
}
