//! Test fixtures for creating test data
#![allow(dead_code)]
#![allow(clippy::needless_update)]

use canvass::orm::{question_options, questions, surveys, users};
use chrono::Utc;
use sea_orm::{entity::*, ActiveValue::Set, DatabaseConnection, DbErr};

/// Test user fixture
pub struct TestUser {
    pub id: i32,
    pub username: String,
    pub token: String, // Plaintext API token for authenticating requests
}

/// Create a test user holding a fresh API token
pub async fn create_test_user(db: &DatabaseConnection, username: &str) -> Result<TestUser, DbErr> {
    let now = Utc::now().naive_utc();
    let token = canvass::user::generate_api_token();

    let user = users::ActiveModel {
        username: Set(username.to_string()),
        email: Set(Some(format!("{}@test.com", username))),
        api_token_hash: Set(Some(canvass::user::hash_api_token(&token))),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let user_model = user.insert(db).await?;

    Ok(TestUser {
        id: user_model.id,
        username: username.to_string(),
        token,
    })
}

/// Create a survey with no questions
pub async fn create_test_survey(
    db: &DatabaseConnection,
    title: &str,
) -> Result<surveys::Model, DbErr> {
    let now = Utc::now().naive_utc();

    let survey = surveys::ActiveModel {
        title: Set(title.to_string()),
        description: Set(Some("A test survey".to_string())),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    survey.insert(db).await
}

/// Create a survey with one question and its options
pub async fn create_test_survey_with_question(
    db: &DatabaseConnection,
    title: &str,
    option_texts: &[&str],
) -> Result<
    (
        surveys::Model,
        questions::Model,
        Vec<question_options::Model>,
    ),
    DbErr,
> {
    let survey = create_test_survey(db, title).await?;
    let now = Utc::now().naive_utc();

    let question = questions::ActiveModel {
        survey_id: Set(survey.id),
        prompt: Set("How did you hear about us?".to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let question_model = question.insert(db).await?;

    let mut options = Vec::with_capacity(option_texts.len());
    for (i, text) in option_texts.iter().enumerate() {
        let option = question_options::ActiveModel {
            question_id: Set(question_model.id),
            text: Set(text.to_string()),
            order: Set(i as i32),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        options.push(option.insert(db).await?);
    }

    Ok((survey, question_model, options))
}

/// Create a survey that stopped accepting submissions an hour ago
pub async fn create_closed_survey(
    db: &DatabaseConnection,
    title: &str,
) -> Result<surveys::Model, DbErr> {
    let now = Utc::now().naive_utc();

    let survey = surveys::ActiveModel {
        title: Set(title.to_string()),
        closes_at: Set(Some(now - chrono::Duration::hours(1))),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    survey.insert(db).await
}
