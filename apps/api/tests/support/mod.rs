//! Shared setup for the tests that need live Postgres or Redis.
//!
//! Each backend is opt-in through an environment variable. When it is unset
//! the test logs a `SKIP-` line and returns early, so `cargo test` stays green
//! on machines without the services.

#![allow(dead_code)]

use prepwise_api::db::{create_pool, run_migrations};
use prepwise_api::store::PgStore;
use sqlx::PgPool;
use uuid::Uuid;

pub const DATABASE_URL_VAR: &str = "TEST_DATABASE_URL";
pub const REDIS_URL_VAR: &str = "TEST_REDIS_URL";

fn env_or_skip(var: &str) -> Option<String> {
    match std::env::var(var) {
        Ok(url) if !url.is_empty() => Some(url),
        _ => {
            eprintln!("SKIP-TEST-BACKEND: {var} is not set");
            None
        }
    }
}

/// Connects to the test database and applies migrations.
pub async fn pg_store() -> Option<(PgPool, PgStore)> {
    let url = env_or_skip(DATABASE_URL_VAR)?;
    let pool = create_pool(&url, 8)
        .await
        .unwrap_or_else(|e| panic!("{DATABASE_URL_VAR} is set but unreachable: {e}"));
    run_migrations(&pool).await.expect("migrations apply");
    Some((pool.clone(), PgStore::new(pool)))
}

pub fn redis_client() -> Option<redis::Client> {
    let url = env_or_skip(REDIS_URL_VAR)?;
    Some(redis::Client::open(url).expect("valid redis url"))
}

/// Inserts a user with a unique email and returns its id.
pub async fn seed_user(pool: &PgPool) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, email) VALUES ($1, $2)")
        .bind(id)
        .bind(format!("{id}@test.prepwise.dev"))
        .execute(pool)
        .await
        .expect("seed user");
    id
}

/// Key prefix private to one test run.
pub fn unique_prefix() -> String {
    format!("test:{}", Uuid::new_v4())
}

/// Removes every key under `prefix`.
pub async fn flush_prefix(client: &redis::Client, prefix: &str) {
    let mut conn = client
        .get_multiplexed_tokio_connection()
        .await
        .expect("redis connection");
    let keys: Vec<String> = redis::cmd("KEYS")
        .arg(format!("{prefix}:*"))
        .query_async(&mut conn)
        .await
        .expect("list keys");
    if !keys.is_empty() {
        redis::cmd("DEL")
            .arg(keys)
            .query_async::<_, ()>(&mut conn)
            .await
            .expect("delete keys");
    }
}
