//! Append-only audit trail
//!
//! Every state-changing operation of interest writes one row describing who
//! did what to which entity. Rows are never updated or deleted once written.
//! Deleting a user clears the user reference on their rows but keeps the
//! rows themselves.

pub mod types;

use crate::db::get_db_pool;
use crate::orm::audit_logs;
use chrono::Utc;
use sea_orm::{entity::*, query::*, DbErr};

pub use types::{AuditAction, AuditContext};

/// Write one audit row.
///
/// Returns the new row id, or None when the audit trail is disabled in
/// configuration.
pub async fn record(
    user_id: Option<i32>,
    action: AuditAction,
    entity_type: &str,
    entity_id: i32,
    details: Option<serde_json::Value>,
    ctx: &AuditContext,
) -> Result<Option<i32>, DbErr> {
    if !crate::app_config::audit().enabled {
        return Ok(None);
    }

    let db = get_db_pool();
    let now = Utc::now().naive_utc();

    let entry = audit_logs::ActiveModel {
        user_id: Set(user_id),
        action: Set(action.as_str().to_string()),
        entity_type: Set(entity_type.to_string()),
        entity_id: Set(entity_id),
        details: Set(details),
        ip_address: Set(ctx.ip_address.clone()),
        user_agent: Set(ctx.user_agent.clone()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let result = entry.insert(db).await?;

    log::debug!(
        "Audit: {} {} {} (row {})",
        action.as_str(),
        entity_type,
        entity_id,
        result.id
    );

    Ok(Some(result.id))
}

/// Fetch the most recent audit rows, newest first.
pub async fn recent(limit: Option<u64>) -> Result<Vec<audit_logs::Model>, DbErr> {
    let db = get_db_pool();
    let limit = limit.unwrap_or_else(|| crate::app_config::limits().audit_page_size as u64);

    audit_logs::Entity::find()
        .order_by_desc(audit_logs::Column::CreatedAt)
        .order_by_desc(audit_logs::Column::Id)
        .limit(limit)
        .all(db)
        .await
}

/// Fetch recent audit rows attributed to one user, newest first.
pub async fn for_user(user_id: i32, limit: Option<u64>) -> Result<Vec<audit_logs::Model>, DbErr> {
    let db = get_db_pool();
    let limit = limit.unwrap_or_else(|| crate::app_config::limits().audit_page_size as u64);

    audit_logs::Entity::find()
        .filter(audit_logs::Column::UserId.eq(user_id))
        .order_by_desc(audit_logs::Column::CreatedAt)
        .order_by_desc(audit_logs::Column::Id)
        .limit(limit)
        .all(db)
        .await
}

/// Fetch the full history of one entity, newest first.
pub async fn for_entity(
    entity_type: &str,
    entity_id: i32,
) -> Result<Vec<audit_logs::Model>, DbErr> {
    let db = get_db_pool();

    audit_logs::Entity::find()
        .filter(audit_logs::Column::EntityType.eq(entity_type))
        .filter(audit_logs::Column::EntityId.eq(entity_id))
        .order_by_desc(audit_logs::Column::CreatedAt)
        .order_by_desc(audit_logs::Column::Id)
        .all(db)
        .await
}
