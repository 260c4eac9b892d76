//! Global connection pool
//!
//! The pool is initialized once at startup and shared by reference
//! afterwards; nothing reassigns it.

use once_cell::sync::OnceCell;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

static DB_POOL: OnceCell<DatabaseConnection> = OnceCell::new();

/// Connect and store the global pool. Panics on failure; there is nothing to
/// serve without a database.
pub async fn init_db(database_url: String) {
    let mut options = ConnectOptions::new(database_url.clone());

    // Every pooled connection to sqlite :memory: would be a distinct empty
    // database, so the pool must hold exactly one.
    if database_url.contains(":memory:") {
        options.max_connections(1).min_connections(1);
    }

    let pool = Database::connect(options)
        .await
        .expect("Failed to connect to database.");

    if DB_POOL.set(pool).is_err() {
        panic!("init_db called twice.");
    }
}

pub fn get_db_pool() -> &'static DatabaseConnection {
    DB_POOL.get().expect("Database pool is not initialized.")
}
