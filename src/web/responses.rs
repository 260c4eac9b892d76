//! Survey submission endpoints

use crate::audit::{self, AuditAction, AuditContext};
use crate::db::get_db_pool;
use crate::middleware::auth::{maybe_user, require_user};
use crate::orm::{question_options, questions};
use crate::{responses, surveys};
use actix_web::{error, post, web, Error, HttpRequest, HttpResponse, Responder};
use sea_orm::{entity::*, query::*};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(submit_survey).service(create_response);
}

#[derive(Serialize)]
struct SubmitReceipt {
    success: bool,
    survey_id: i32,
    submitted_at: chrono::NaiveDateTime,
}

/// Record that the caller submitted a survey.
///
/// One submission per user per survey. A repeat attempt gets a 409.
#[post("/surveys/{survey_id}/submit")]
pub async fn submit_survey(req: HttpRequest, path: web::Path<i32>) -> Result<impl Responder, Error> {
    let user = require_user(&req).await?;
    let survey_id = path.into_inner();

    let survey = surveys::get_survey(survey_id)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Survey not found."))?;

    if surveys::is_closed(&survey) {
        return Err(error::ErrorForbidden("This survey is closed."));
    }

    let submission = responses::submit_anonymous_response(survey_id, user.id).await?;

    let ctx = AuditContext::from_request(&req);
    if let Err(e) = audit::record(
        Some(user.id),
        AuditAction::Submit,
        "anonymous_survey_response",
        submission.id,
        Some(serde_json::json!({ "survey_id": survey_id })),
        &ctx,
    )
    .await
    {
        log::error!("Failed to write audit row: {}", e);
    }

    Ok(HttpResponse::Ok().json(SubmitReceipt {
        success: true,
        survey_id,
        submitted_at: submission.submitted_at,
    }))
}

#[derive(Deserialize)]
pub struct AnswerEntry {
    question_id: i32,
    value: String,
}

#[derive(Deserialize)]
pub struct ResponseForm {
    #[serde(default)]
    answers: Vec<AnswerEntry>,
    #[serde(default)]
    selected_option_ids: Vec<i32>,
}

#[derive(Serialize)]
struct ResponseCreated {
    success: bool,
    response_id: i32,
}

/// Store the content of a survey response.
///
/// Anonymous callers are welcome here; a bearer token attributes the
/// response to its owner.
#[post("/surveys/{survey_id}/responses")]
pub async fn create_response(
    req: HttpRequest,
    path: web::Path<i32>,
    form: web::Json<ResponseForm>,
) -> Result<impl Responder, Error> {
    let user = maybe_user(&req).await?;
    let survey_id = path.into_inner();
    let db = get_db_pool();

    let survey = surveys::get_survey(survey_id)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Survey not found."))?;

    if surveys::is_closed(&survey) {
        return Err(error::ErrorForbidden("This survey is closed."));
    }

    if form.answers.is_empty() && form.selected_option_ids.is_empty() {
        return Err(error::ErrorBadRequest(
            "A response needs at least one answer or selected option.",
        ));
    }

    let max_length = crate::app_config::limits().max_answer_length as usize;
    let mut seen_questions = HashSet::new();
    for entry in &form.answers {
        if entry.value.trim().is_empty() {
            return Err(error::ErrorBadRequest("Answers cannot be empty."));
        }
        if entry.value.len() > max_length {
            return Err(error::ErrorBadRequest(format!(
                "Answers are limited to {} characters.",
                max_length
            )));
        }
        if !seen_questions.insert(entry.question_id) {
            return Err(error::ErrorBadRequest(
                "Only one answer per question is allowed.",
            ));
        }
    }

    // Verify all answered questions belong to this survey
    if !form.answers.is_empty() {
        let question_ids: Vec<i32> = form.answers.iter().map(|a| a.question_id).collect();
        let valid_questions = questions::Entity::find()
            .filter(questions::Column::SurveyId.eq(survey_id))
            .filter(questions::Column::Id.is_in(question_ids.clone()))
            .all(db)
            .await
            .map_err(error::ErrorInternalServerError)?;

        if valid_questions.len() != question_ids.len() {
            return Err(error::ErrorBadRequest("Invalid question(s) answered."));
        }
    }

    // Verify all selected options belong to this survey
    if !form.selected_option_ids.is_empty() {
        let valid_options = question_options::Entity::find()
            .filter(question_options::Column::Id.is_in(form.selected_option_ids.clone()))
            .inner_join(questions::Entity)
            .filter(questions::Column::SurveyId.eq(survey_id))
            .all(db)
            .await
            .map_err(error::ErrorInternalServerError)?;

        if valid_options.len() != form.selected_option_ids.len() {
            return Err(error::ErrorBadRequest("Invalid option(s) selected."));
        }
    }

    let entries: Vec<(i32, String)> = form
        .answers
        .iter()
        .map(|a| (a.question_id, a.value.clone()))
        .collect();

    let user_id = user.as_ref().map(|u| u.id);
    let response =
        responses::submit_full_response(survey_id, user_id, &entries, &form.selected_option_ids)
            .await?;

    let ctx = AuditContext::from_request(&req);
    if let Err(e) = audit::record(
        user_id,
        AuditAction::Submit,
        "response",
        response.id,
        Some(serde_json::json!({
            "survey_id": survey_id,
            "answers": entries.len(),
            "selections": form.selected_option_ids.len(),
        })),
        &ctx,
    )
    .await
    {
        log::error!("Failed to write audit row: {}", e);
    }

    Ok(HttpResponse::Ok().json(ResponseCreated {
        success: true,
        response_id: response.id,
    }))
}
