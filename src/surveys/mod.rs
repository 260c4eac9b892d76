//! Survey authoring and retrieval
//!
//! A survey owns questions, and each question owns its selectable options.
//! Deleting a survey removes the whole subtree.

use crate::db::get_db_pool;
use crate::orm::{question_options, questions, surveys};
use chrono::{NaiveDateTime, Utc};
use sea_orm::{entity::*, query::*, DbErr};

/// Create a survey.
pub async fn create_survey(
    title: &str,
    description: Option<&str>,
    closes_at: Option<NaiveDateTime>,
) -> Result<surveys::Model, DbErr> {
    let db = get_db_pool();
    let now = Utc::now().naive_utc();

    let survey = surveys::ActiveModel {
        title: Set(title.to_owned()),
        description: Set(description.map(str::to_owned)),
        closes_at: Set(closes_at),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    survey.insert(db).await
}

/// Fetch a survey by id.
pub async fn get_survey(survey_id: i32) -> Result<Option<surveys::Model>, DbErr> {
    surveys::Entity::find_by_id(survey_id).one(get_db_pool()).await
}

/// Fetch a survey together with its questions.
pub async fn get_survey_with_questions(
    survey_id: i32,
) -> Result<Option<(surveys::Model, Vec<questions::Model>)>, DbErr> {
    let db = get_db_pool();

    let mut results = surveys::Entity::find_by_id(survey_id)
        .find_with_related(questions::Entity)
        .all(db)
        .await?;

    Ok(results.pop())
}

/// List surveys, newest first.
pub async fn list_surveys() -> Result<Vec<surveys::Model>, DbErr> {
    surveys::Entity::find()
        .order_by_desc(surveys::Column::CreatedAt)
        .all(get_db_pool())
        .await
}

/// Whether a survey has stopped accepting submissions.
pub fn is_closed(survey: &surveys::Model) -> bool {
    match survey.closes_at {
        Some(closes_at) => closes_at < Utc::now().naive_utc(),
        None => false,
    }
}

/// Append a question to a survey.
pub async fn add_question(survey_id: i32, prompt: &str) -> Result<questions::Model, DbErr> {
    let db = get_db_pool();
    let now = Utc::now().naive_utc();

    let question = questions::ActiveModel {
        survey_id: Set(survey_id),
        prompt: Set(prompt.to_owned()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    question.insert(db).await
}

/// Attach an option to a question.
///
/// `is_default` and `order` fall back to the column defaults (false and 0)
/// when not given.
pub async fn add_option(
    question_id: i32,
    text: &str,
    is_default: Option<bool>,
    order: Option<i32>,
) -> Result<question_options::Model, DbErr> {
    let db = get_db_pool();

    let existing = question_options::Entity::find()
        .filter(question_options::Column::QuestionId.eq(question_id))
        .count(db)
        .await?;

    let max = crate::app_config::limits().max_options_per_question as u64;
    if existing >= max {
        return Err(DbErr::Custom(format!(
            "Question {} already has the maximum of {} options",
            question_id, max
        )));
    }

    let now = Utc::now().naive_utc();
    let mut option = question_options::ActiveModel {
        question_id: Set(question_id),
        text: Set(text.to_owned()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    if let Some(is_default) = is_default {
        option.is_default = Set(is_default);
    }
    if let Some(order) = order {
        option.order = Set(order);
    }

    option.insert(db).await
}

/// Fetch a question's options in presentation order.
///
/// Sorted by the order column, with id as the tie-breaker so the sequence is
/// stable.
pub async fn options_for_question(
    question_id: i32,
) -> Result<Vec<question_options::Model>, DbErr> {
    question_options::Entity::find()
        .filter(question_options::Column::QuestionId.eq(question_id))
        .order_by_asc(question_options::Column::Order)
        .order_by_asc(question_options::Column::Id)
        .all(get_db_pool())
        .await
}

/// Delete a survey and everything under it.
pub async fn delete_survey(survey_id: i32) -> Result<(), DbErr> {
    surveys::Entity::delete_by_id(survey_id)
        .exec(get_db_pool())
        .await?;
    Ok(())
}
