use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use uuid::Uuid;

/// A Postgres schema created for one test and dropped on teardown, so
/// parallel tests never see each other's rows without needing a fresh
/// database per test. Connects via `MST_DATABASE_URL` (same var production
/// uses) and points every connection's `search_path` at the scratch schema.
pub struct EphemeralSchema {
    pub pool: PgPool,
    name: String,
}

impl EphemeralSchema {
    pub async fn create() -> Result<Self> {
        let url = std::env::var(mst_db::ENV_DB_URL)
            .with_context(|| format!("missing env var {}", mst_db::ENV_DB_URL))?;
        let name = format!("test_{}", Uuid::new_v4().simple());

        let admin_pool = PgPoolOptions::new().max_connections(1).connect(&url).await?;
        admin_pool.execute(format!(r#"create schema "{name}""#).as_str()).await.context("create schema")?;

        let search_path = name.clone();
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .after_connect(move |conn, _meta| {
                let search_path = search_path.clone();
                Box::pin(async move {
                    conn.execute(format!(r#"set search_path to "{search_path}""#).as_str()).await?;
                    Ok(())
                })
            })
            .connect(&url)
            .await
            .context("connect scratch schema pool")?;

        mst_db::migrate(&pool).await.context("migrate scratch schema")?;

        Ok(Self { pool, name })
    }

    /// Drops the schema and everything in it. Tests that forget to call
    /// this leak a schema until manually cleaned up — there's no `Drop`
    /// impl because dropping a schema requires an async connection.
    pub async fn teardown(self) -> Result<()> {
        let url = std::env::var(mst_db::ENV_DB_URL)?;
        let admin_pool = PgPoolOptions::new().max_connections(1).connect(&url).await?;
        admin_pool
            .execute(format!(r#"drop schema if exists "{}" cascade"#, self.name).as_str())
            .await
            .context("drop schema")?;
        Ok(())
    }
}
