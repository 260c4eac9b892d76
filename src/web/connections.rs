//! Database connection management endpoints
//!
//! Every route in this scope sits behind bearer token authentication.
//! Mutations leave an audit trail. Stored passwords never appear in any
//! response body.

use crate::audit::{self, AuditAction, AuditContext};
use crate::connections::{self, ConnectionParams};
use crate::middleware::{AuthedUser, RequireAuth};
use crate::orm::database_connections;
use actix_web::{delete, error, get, post, put, web, Error, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use validator::Validate;

const ENTITY_TYPE: &str = "database_connection";

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(
        web::scope("/database-connections")
            .wrap(RequireAuth)
            .service(create_connection)
            .service(list_connections)
            .service(get_connection)
            .service(update_connection)
            .service(delete_connection)
            .service(test_connection)
            .service(get_connection_schema),
    );
}

#[derive(Deserialize, Validate)]
pub struct ConnectionForm {
    #[validate(length(min = 1, max = 255))]
    name: String,
    driver: String,
    host: Option<String>,
    #[validate(range(min = 1, max = 65535))]
    port: Option<i32>,
    #[validate(length(min = 1, max = 1024))]
    database: String,
    username: Option<String>,
    password: Option<String>,
}

impl ConnectionForm {
    fn into_params(self) -> ConnectionParams {
        ConnectionParams {
            name: self.name,
            driver: self.driver,
            host: self.host,
            port: self.port,
            database: self.database,
            username: self.username,
            password: self.password,
        }
    }
}

/// Connection record as shown to clients. The password stays out.
#[derive(Serialize)]
struct ConnectionResponse {
    id: i32,
    name: String,
    driver: String,
    host: Option<String>,
    port: Option<i32>,
    database: String,
    username: Option<String>,
    created_by: Option<i32>,
    created_at: chrono::NaiveDateTime,
    updated_at: chrono::NaiveDateTime,
}

impl From<database_connections::Model> for ConnectionResponse {
    fn from(model: database_connections::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            driver: model.driver,
            host: model.host,
            port: model.port,
            database: model.database,
            username: model.username,
            created_by: model.created_by,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Serialize)]
struct DeleteResponse {
    success: bool,
}

#[derive(Serialize)]
struct SchemaResponse {
    tables: Vec<String>,
}

fn validate_form(form: &ConnectionForm) -> Result<(), Error> {
    form.validate().map_err(|e| {
        log::debug!("Connection form validation failed: {}", e);
        error::ErrorBadRequest("Invalid connection data")
    })?;

    if !connections::is_valid_driver(&form.driver) {
        return Err(error::ErrorBadRequest(format!(
            "Driver must be one of: {}",
            connections::VALID_DRIVERS.join(", ")
        )));
    }

    Ok(())
}

async fn record_audit(
    req: &HttpRequest,
    user_id: i32,
    action: AuditAction,
    entity_id: i32,
    details: serde_json::Value,
) {
    let ctx = AuditContext::from_request(req);
    if let Err(e) = audit::record(Some(user_id), action, ENTITY_TYPE, entity_id, Some(details), &ctx).await
    {
        log::error!("Failed to write audit row: {}", e);
    }
}

#[post("")]
async fn create_connection(
    req: HttpRequest,
    user: AuthedUser,
    form: web::Json<ConnectionForm>,
) -> Result<HttpResponse, Error> {
    let form = form.into_inner();
    validate_form(&form)?;

    let params = form.into_params();
    let conn = connections::create_connection(&params, Some(user.id())).await?;

    record_audit(
        &req,
        user.id(),
        AuditAction::Create,
        conn.id,
        serde_json::json!({ "name": conn.name, "driver": conn.driver }),
    )
    .await;

    Ok(HttpResponse::Ok().json(ConnectionResponse::from(conn)))
}

#[get("")]
async fn list_connections(_user: AuthedUser) -> Result<HttpResponse, Error> {
    let list = connections::list_connections()
        .await
        .map_err(error::ErrorInternalServerError)?;

    let response: Vec<ConnectionResponse> =
        list.into_iter().map(ConnectionResponse::from).collect();

    Ok(HttpResponse::Ok().json(response))
}

#[get("/{id}")]
async fn get_connection(_user: AuthedUser, path: web::Path<i32>) -> Result<HttpResponse, Error> {
    let conn = connections::get_connection(path.into_inner())
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Connection not found."))?;

    Ok(HttpResponse::Ok().json(ConnectionResponse::from(conn)))
}

#[put("/{id}")]
async fn update_connection(
    req: HttpRequest,
    user: AuthedUser,
    path: web::Path<i32>,
    form: web::Json<ConnectionForm>,
) -> Result<HttpResponse, Error> {
    let form = form.into_inner();
    validate_form(&form)?;

    let id = path.into_inner();
    let params = form.into_params();

    let conn = connections::update_connection(id, &params)
        .await?
        .ok_or_else(|| error::ErrorNotFound("Connection not found."))?;

    record_audit(
        &req,
        user.id(),
        AuditAction::Update,
        conn.id,
        serde_json::json!({ "name": conn.name, "driver": conn.driver }),
    )
    .await;

    Ok(HttpResponse::Ok().json(ConnectionResponse::from(conn)))
}

#[delete("/{id}")]
async fn delete_connection(
    req: HttpRequest,
    user: AuthedUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, Error> {
    let id = path.into_inner();

    let deleted = connections::delete_connection(id)
        .await
        .map_err(error::ErrorInternalServerError)?;

    if !deleted {
        return Err(error::ErrorNotFound("Connection not found."));
    }

    record_audit(
        &req,
        user.id(),
        AuditAction::Delete,
        id,
        serde_json::json!({}),
    )
    .await;

    Ok(HttpResponse::Ok().json(DeleteResponse { success: true }))
}

#[post("/{id}/test")]
async fn test_connection(
    req: HttpRequest,
    user: AuthedUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, Error> {
    let conn = connections::get_connection(path.into_inner())
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Connection not found."))?;

    let outcome = connections::test_connection(&conn).await;

    record_audit(
        &req,
        user.id(),
        AuditAction::TestConnection,
        conn.id,
        serde_json::json!({ "success": outcome.success }),
    )
    .await;

    Ok(HttpResponse::Ok().json(outcome))
}

#[get("/{id}/schema")]
async fn get_connection_schema(
    _user: AuthedUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, Error> {
    let conn = connections::get_connection(path.into_inner())
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Connection not found."))?;

    let tables = connections::get_schema(&conn).await.map_err(|e| {
        log::warn!("Schema introspection failed for connection {}: {}", conn.id, e);
        error::ErrorInternalServerError("Could not read schema from target database")
    })?;

    Ok(HttpResponse::Ok().json(SchemaResponse { tables }))
}
