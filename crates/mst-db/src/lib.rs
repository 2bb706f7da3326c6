//! Persistence layer (C1): typed, `anyhow`/`AppError`-returning wrappers
//! around `sqlx` queries against the Postgres schema in `migrations/`.

pub mod auto_trade;
pub mod backtest;
pub mod connection;
pub mod holdings;
pub mod learning;
pub mod news;
pub mod prices;
pub mod sentiment;
pub mod trades;

pub use connection::{connect_from_env, migrate, status, testkit_db_pool, DbStatus, ENV_DB_URL};
