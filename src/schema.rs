//! Schema installation and constraint-error classification
//!
//! Table definitions live on the entities in `crate::orm`; this module
//! composes them into creation statements at startup and installs them,
//! together with the indexes that span more than one column. The statement
//! set is derived fresh from the entity definitions on every call and is
//! never mutated at runtime.

use crate::orm::{
    answers, anonymous_survey_responses, audit_logs, database_connections, question_options,
    questions, responses, selected_options, surveys, users,
};
use actix_web::http::StatusCode;
use sea_orm::sea_query::{Index, IndexCreateStatement, TableCreateStatement};
use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, DbErr, EntityName, Schema, SqlErr};

/// Write-time data-validity errors surfaced by the storage layer.
///
/// These are recoverable caller errors, not transient failures; nothing here
/// is retried. Anything that is not a constraint violation passes through as
/// `Database`.
#[derive(Debug, derive_more::Display)]
pub enum DataError {
    #[display(fmt = "required field missing: {}", _0)]
    MissingRequiredField(String),
    #[display(fmt = "unique constraint violated: {}", _0)]
    UniquenessViolation(String),
    #[display(fmt = "foreign key references a missing parent row: {}", _0)]
    ReferentialIntegrityViolation(String),
    #[display(fmt = "database error: {}", _0)]
    Database(DbErr),
}

impl std::error::Error for DataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Database(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbErr> for DataError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(msg)) => Self::UniquenessViolation(msg),
            Some(SqlErr::ForeignKeyConstraintViolation(msg)) => {
                Self::ReferentialIntegrityViolation(msg)
            }
            _ => {
                let msg = err.to_string();
                // sqlite / postgres / mysql spellings, in that order
                if msg.contains("NOT NULL constraint failed")
                    || msg.contains("violates not-null")
                    || msg.contains("cannot be null")
                {
                    Self::MissingRequiredField(msg)
                } else if msg.contains("UNIQUE constraint failed")
                    || msg.contains("duplicate key value")
                {
                    Self::UniquenessViolation(msg)
                } else if msg.contains("FOREIGN KEY constraint failed")
                    || msg.contains("violates foreign key")
                {
                    Self::ReferentialIntegrityViolation(msg)
                } else {
                    Self::Database(err)
                }
            }
        }
    }
}

impl actix_web::ResponseError for DataError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingRequiredField(_) => StatusCode::BAD_REQUEST,
            Self::UniquenessViolation(_) => StatusCode::CONFLICT,
            Self::ReferentialIntegrityViolation(_) => StatusCode::CONFLICT,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Table creation statements for every entity, parents before children so
/// inline foreign keys resolve on backends that check at DDL time.
pub fn create_table_statements(backend: DbBackend) -> Vec<TableCreateStatement> {
    let schema = Schema::new(backend);
    let mut statements = vec![
        schema.create_table_from_entity(users::Entity),
        schema.create_table_from_entity(surveys::Entity),
        schema.create_table_from_entity(questions::Entity),
        schema.create_table_from_entity(question_options::Entity),
        schema.create_table_from_entity(responses::Entity),
        schema.create_table_from_entity(answers::Entity),
        schema.create_table_from_entity(selected_options::Entity),
        schema.create_table_from_entity(anonymous_survey_responses::Entity),
        schema.create_table_from_entity(audit_logs::Entity),
        schema.create_table_from_entity(database_connections::Entity),
    ];
    for statement in &mut statements {
        statement.if_not_exists();
    }
    statements
}

/// Indexes that cannot be expressed as single-column entity attributes.
///
/// The unique (survey_id, user_id) pair on anonymous_survey_responses is the
/// double-submission arbiter; the rest are lookup indexes for the hot read
/// paths.
pub fn create_index_statements() -> Vec<IndexCreateStatement> {
    vec![
        Index::create()
            .name("uniq-anon-survey-responses-survey-user")
            .table(anonymous_survey_responses::Entity)
            .col(anonymous_survey_responses::Column::SurveyId)
            .col(anonymous_survey_responses::Column::UserId)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx-question-options-question")
            .table(question_options::Entity)
            .col(question_options::Column::QuestionId)
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx-answers-response")
            .table(answers::Entity)
            .col(answers::Column::ResponseId)
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx-audit-logs-entity")
            .table(audit_logs::Entity)
            .col(audit_logs::Column::EntityType)
            .col(audit_logs::Column::EntityId)
            .if_not_exists()
            .to_owned(),
    ]
}

/// Table names in creation order, as persisted.
pub fn entity_table_names() -> Vec<&'static str> {
    vec![
        users::Entity.table_name(),
        surveys::Entity.table_name(),
        questions::Entity.table_name(),
        question_options::Entity.table_name(),
        responses::Entity.table_name(),
        answers::Entity.table_name(),
        selected_options::Entity.table_name(),
        anonymous_survey_responses::Entity.table_name(),
        audit_logs::Entity.table_name(),
        database_connections::Entity.table_name(),
    ]
}

/// Create all tables and indexes. Idempotent; called once at startup.
pub async fn install(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();

    for statement in create_table_statements(backend) {
        db.execute(backend.build(&statement)).await?;
    }
    for statement in create_index_statements() {
        db.execute(backend.build(&statement)).await?;
    }

    log::info!("schema installed ({} tables)", entity_table_names().len());
    Ok(())
}
