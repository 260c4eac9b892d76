//! Survey response submission
//!
//! Two write paths with different shapes:
//!
//! * [`submit_anonymous_response`] records that a user took part in a survey.
//!   One row per (survey, user) pair, enforced by a unique index, so a second
//!   submission fails no matter how the two race.
//! * [`start_response`] and the answer functions store what was actually
//!   submitted. A response may belong to a user or be fully anonymous, and it
//!   is never linked to the participation record.
//!
//! Write paths classify constraint failures into [`DataError`]; reads return
//! plain database errors.

use crate::db::get_db_pool;
use crate::orm::{anonymous_survey_responses, answers, responses, selected_options};
use crate::schema::DataError;
use chrono::Utc;
use sea_orm::{entity::*, query::*, DbErr, TransactionTrait};

/// Record that a user submitted a survey.
///
/// Fails with [`DataError::UniquenessViolation`] if this user already
/// submitted this survey. There is deliberately no read-before-write check;
/// the unique index arbitrates concurrent submissions so exactly one wins.
pub async fn submit_anonymous_response(
    survey_id: i32,
    user_id: i32,
) -> Result<anonymous_survey_responses::Model, DataError> {
    let db = get_db_pool();
    let now = Utc::now().naive_utc();

    let submission = anonymous_survey_responses::ActiveModel {
        survey_id: Set(survey_id),
        user_id: Set(user_id),
        submitted_at: Set(now),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    submission.insert(db).await.map_err(DataError::from)
}

/// Whether a user has already submitted a survey.
pub async fn has_submitted(survey_id: i32, user_id: i32) -> Result<bool, DbErr> {
    let existing = anonymous_survey_responses::Entity::find()
        .filter(anonymous_survey_responses::Column::SurveyId.eq(survey_id))
        .filter(anonymous_survey_responses::Column::UserId.eq(user_id))
        .one(get_db_pool())
        .await?;

    Ok(existing.is_some())
}

/// Open a response to hold submitted content.
///
/// `user_id` is None for anonymous respondents.
pub async fn start_response(
    survey_id: i32,
    user_id: Option<i32>,
) -> Result<responses::Model, DataError> {
    let db = get_db_pool();
    let now = Utc::now().naive_utc();

    let response = responses::ActiveModel {
        survey_id: Set(survey_id),
        user_id: Set(user_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    response.insert(db).await.map_err(DataError::from)
}

/// Store one answer on a response.
pub async fn record_answer(
    response_id: i32,
    question_id: i32,
    value: &str,
) -> Result<answers::Model, DataError> {
    let db = get_db_pool();
    let now = Utc::now().naive_utc();

    let answer = answers::ActiveModel {
        response_id: Set(response_id),
        question_id: Set(question_id),
        value: Set(value.to_owned()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    answer.insert(db).await.map_err(DataError::from)
}

/// Store a batch of `(question_id, value)` answers atomically.
///
/// All answers land or none do.
pub async fn submit_answers(
    response_id: i32,
    entries: &[(i32, String)],
) -> Result<Vec<answers::Model>, DataError> {
    let db = get_db_pool();
    let txn = db.begin().await.map_err(DataError::from)?;
    let now = Utc::now().naive_utc();

    let mut saved = Vec::with_capacity(entries.len());
    for (question_id, value) in entries {
        let answer = answers::ActiveModel {
            response_id: Set(response_id),
            question_id: Set(*question_id),
            value: Set(value.clone()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        // Dropping the transaction on error rolls the batch back.
        saved.push(answer.insert(&txn).await.map_err(DataError::from)?);
    }

    txn.commit().await.map_err(DataError::from)?;
    Ok(saved)
}

/// Store a complete response atomically.
///
/// Opens the response and writes its answers and option selections in one
/// transaction, so a half-submitted response never becomes visible.
pub async fn submit_full_response(
    survey_id: i32,
    user_id: Option<i32>,
    entries: &[(i32, String)],
    option_ids: &[i32],
) -> Result<responses::Model, DataError> {
    let db = get_db_pool();
    let txn = db.begin().await.map_err(DataError::from)?;
    let now = Utc::now().naive_utc();

    let response = responses::ActiveModel {
        survey_id: Set(survey_id),
        user_id: Set(user_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(DataError::from)?;

    for (question_id, value) in entries {
        let answer = answers::ActiveModel {
            response_id: Set(response.id),
            question_id: Set(*question_id),
            value: Set(value.clone()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        answer.insert(&txn).await.map_err(DataError::from)?;
    }

    for option_id in option_ids {
        let selection = selected_options::ActiveModel {
            response_id: Set(response.id),
            question_option_id: Set(*option_id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        selection.insert(&txn).await.map_err(DataError::from)?;
    }

    txn.commit().await.map_err(DataError::from)?;
    Ok(response)
}

/// Mark a predefined option as selected on a response.
pub async fn select_option(
    response_id: i32,
    question_option_id: i32,
) -> Result<selected_options::Model, DataError> {
    let db = get_db_pool();
    let now = Utc::now().naive_utc();

    let selection = selected_options::ActiveModel {
        response_id: Set(response_id),
        question_option_id: Set(question_option_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    selection.insert(db).await.map_err(DataError::from)
}

/// Find the answer a response gave to one question, if any.
///
/// One answer per question on a response is a convention of the write paths,
/// not a database constraint, so this returns the first by id.
pub async fn find_answer(
    response_id: i32,
    question_id: i32,
) -> Result<Option<answers::Model>, DbErr> {
    answers::Entity::find()
        .filter(answers::Column::ResponseId.eq(response_id))
        .filter(answers::Column::QuestionId.eq(question_id))
        .order_by_asc(answers::Column::Id)
        .one(get_db_pool())
        .await
}

/// All answers on a response, in insertion order.
pub async fn answers_for_response(response_id: i32) -> Result<Vec<answers::Model>, DbErr> {
    answers::Entity::find()
        .filter(answers::Column::ResponseId.eq(response_id))
        .order_by_asc(answers::Column::Id)
        .all(get_db_pool())
        .await
}

/// All responses recorded for a survey, oldest first.
pub async fn responses_for_survey(survey_id: i32) -> Result<Vec<responses::Model>, DbErr> {
    responses::Entity::find()
        .filter(responses::Column::SurveyId.eq(survey_id))
        .order_by_asc(responses::Column::Id)
        .all(get_db_pool())
        .await
}
