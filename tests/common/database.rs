//! Test database setup and management
#![allow(dead_code)]

use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, Statement};
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};

/// Initialize the global pool and schema.
/// Must be called from an async context.
async fn init_global_db() {
    // Use a static flag to ensure this only runs once per test binary.
    // We can't use the regular Once::call_once because it's not async-friendly
    static DB_INITIALIZED: AtomicBool = AtomicBool::new(false);

    if !DB_INITIALIZED.swap(true, Ordering::SeqCst) {
        // A file-backed database rather than `sqlite::memory:`: each test runs
        // on its own runtime, and the pool's in-memory connection does not
        // survive runtime teardown, which would hand later tests a fresh empty
        // database. The path is unique per test process so parallel test
        // binaries do not collide.
        let database_url = env::var("TEST_DATABASE_URL").unwrap_or_else(|_| {
            format!(
                "sqlite://{}/canvass_test_{}.sqlite?mode=rwc",
                env::temp_dir().display(),
                std::process::id()
            )
        });

        canvass::db::init_db(database_url).await;

        canvass::schema::install(canvass::db::get_db_pool())
            .await
            .expect("Failed to install the schema");
    }
}

/// Setup test database - initialize globals and return the shared connection
pub async fn setup_test_database() -> &'static DatabaseConnection {
    init_global_db().await;
    canvass::db::get_db_pool()
}

/// Cleanup function to remove test data
///
/// Deletes from every table, children before parents, so foreign keys never
/// get in the way. sqlite has no TRUNCATE.
pub async fn cleanup_test_data(db: &DatabaseConnection) -> Result<(), DbErr> {
    let tables = [
        "selected_options",
        "answers",
        "responses",
        "anonymous_survey_responses",
        "audit_logs",
        "question_options",
        "questions",
        "database_connections",
        "surveys",
        "users",
    ];

    for table in tables {
        db.execute(Statement::from_string(
            db.get_database_backend(),
            format!("DELETE FROM {};", table),
        ))
        .await?;
    }

    Ok(())
}
