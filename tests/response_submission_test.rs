//! Integration tests for survey response submission

mod common;
use serial_test::serial;

use canvass::orm::{anonymous_survey_responses, answers};
use canvass::schema::DataError;
use common::{database::*, fixtures::*};
use sea_orm::{entity::*, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};

#[actix_rt::test]
#[serial]
async fn test_duplicate_submission_is_rejected() {
    let db = setup_test_database().await;
    cleanup_test_data(db).await.expect("Failed to cleanup");

    let user = create_test_user(db, "submit_user1")
        .await
        .expect("Failed to create user");
    let survey = create_test_survey(db, "Duplicate submission survey")
        .await
        .expect("Failed to create survey");

    canvass::responses::submit_anonymous_response(survey.id, user.id)
        .await
        .expect("First submission should succeed");

    let second = canvass::responses::submit_anonymous_response(survey.id, user.id).await;
    match second {
        Err(DataError::UniquenessViolation(_)) => {}
        other => panic!("Expected a uniqueness violation, got {:?}", other),
    }

    // The table still holds exactly one row for the pair
    let rows = anonymous_survey_responses::Entity::find()
        .filter(anonymous_survey_responses::Column::SurveyId.eq(survey.id))
        .filter(anonymous_survey_responses::Column::UserId.eq(user.id))
        .all(db)
        .await
        .expect("Failed to fetch submissions");
    assert_eq!(rows.len(), 1, "Should have exactly 1 submission");
}

#[actix_rt::test]
#[serial]
async fn test_distinct_pairs_can_submit() {
    let db = setup_test_database().await;
    cleanup_test_data(db).await.expect("Failed to cleanup");

    let user_a = create_test_user(db, "submit_user_a")
        .await
        .expect("Failed to create user");
    let user_b = create_test_user(db, "submit_user_b")
        .await
        .expect("Failed to create user");
    let survey_one = create_test_survey(db, "First survey")
        .await
        .expect("Failed to create survey");
    let survey_two = create_test_survey(db, "Second survey")
        .await
        .expect("Failed to create survey");

    canvass::responses::submit_anonymous_response(survey_one.id, user_a.id)
        .await
        .expect("First pair should succeed");
    canvass::responses::submit_anonymous_response(survey_one.id, user_b.id)
        .await
        .expect("Same survey, different user should succeed");
    canvass::responses::submit_anonymous_response(survey_two.id, user_a.id)
        .await
        .expect("Same user, different survey should succeed");

    assert!(canvass::responses::has_submitted(survey_one.id, user_a.id)
        .await
        .expect("Failed to check submission"));
    assert!(!canvass::responses::has_submitted(survey_two.id, user_b.id)
        .await
        .expect("Failed to check submission"));
}

#[actix_rt::test]
#[serial]
async fn test_concurrent_double_submit_has_one_winner() {
    let db = setup_test_database().await;
    cleanup_test_data(db).await.expect("Failed to cleanup");

    let user = create_test_user(db, "race_user")
        .await
        .expect("Failed to create user");
    let survey = create_test_survey(db, "Race survey")
        .await
        .expect("Failed to create survey");

    let survey_id = survey.id;
    let user_id = user.id;

    // Launch both submissions before awaiting either
    let first = actix_rt::spawn(async move {
        canvass::responses::submit_anonymous_response(survey_id, user_id).await
    });
    let second = actix_rt::spawn(async move {
        canvass::responses::submit_anonymous_response(survey_id, user_id).await
    });

    let results = [
        first.await.expect("Task panicked"),
        second.await.expect("Task panicked"),
    ];

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "Exactly one submission should win");

    let loser = results
        .iter()
        .find(|r| r.is_err())
        .expect("One submission should lose");
    assert!(
        matches!(loser, Err(DataError::UniquenessViolation(_))),
        "The losing submission should report a uniqueness violation"
    );

    let rows = anonymous_survey_responses::Entity::find()
        .filter(anonymous_survey_responses::Column::SurveyId.eq(survey_id))
        .all(db)
        .await
        .expect("Failed to fetch submissions");
    assert_eq!(rows.len(), 1, "Should have exactly 1 submission");
}

#[actix_rt::test]
#[serial]
async fn test_full_response_with_answers_and_selections() {
    let db = setup_test_database().await;
    cleanup_test_data(db).await.expect("Failed to cleanup");

    let (survey, question, options) =
        create_test_survey_with_question(db, "Content survey", &["Friends", "Search", "Ads"])
            .await
            .expect("Failed to create survey");

    let entries = vec![(question.id, "A colleague mentioned it".to_string())];
    let option_ids = vec![options[1].id];

    let response = canvass::responses::submit_full_response(survey.id, None, &entries, &option_ids)
        .await
        .expect("Submission should succeed");

    assert_eq!(response.survey_id, survey.id);
    assert_eq!(response.user_id, None, "Response should be anonymous");

    let stored = canvass::responses::answers_for_response(response.id)
        .await
        .expect("Failed to fetch answers");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].value, "A colleague mentioned it");

    let found = canvass::responses::find_answer(response.id, question.id)
        .await
        .expect("Failed to look up answer");
    assert!(found.is_some(), "The answer should be findable by question");
}

#[actix_rt::test]
#[serial]
async fn test_failed_batch_leaves_no_answers() {
    let db = setup_test_database().await;
    cleanup_test_data(db).await.expect("Failed to cleanup");

    let (survey, question, _) =
        create_test_survey_with_question(db, "Atomic survey", &["Yes", "No"])
            .await
            .expect("Failed to create survey");

    let response = canvass::responses::start_response(survey.id, None)
        .await
        .expect("Failed to open response");

    // The second entry refers to a question that does not exist, so the
    // whole batch must roll back.
    let entries = vec![
        (question.id, "Fine".to_string()),
        (999999, "Orphan".to_string()),
    ];

    let result = canvass::responses::submit_answers(response.id, &entries).await;
    assert!(
        matches!(result, Err(DataError::ReferentialIntegrityViolation(_))),
        "The batch should fail on the bad question reference"
    );

    let stored = canvass::responses::answers_for_response(response.id)
        .await
        .expect("Failed to fetch answers");
    assert!(stored.is_empty(), "No answers should survive the rollback");
}

#[actix_rt::test]
#[serial]
async fn test_answer_without_value_is_rejected() {
    let db = setup_test_database().await;
    cleanup_test_data(db).await.expect("Failed to cleanup");

    let (survey, question, _) = create_test_survey_with_question(db, "Value survey", &[])
        .await
        .expect("Failed to create survey");
    let response = canvass::responses::start_response(survey.id, None)
        .await
        .expect("Failed to open response");

    let now = chrono::Utc::now().naive_utc();
    let missing_value = answers::ActiveModel {
        response_id: Set(response.id),
        question_id: Set(question.id),
        // value deliberately left unset
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let err = missing_value
        .insert(db)
        .await
        .expect_err("Insert without a value should fail");
    assert!(
        matches!(DataError::from(err), DataError::MissingRequiredField(_)),
        "A missing value should classify as a missing required field"
    );
}

#[actix_rt::test]
#[serial]
async fn test_answer_for_missing_question_is_rejected() {
    let db = setup_test_database().await;
    cleanup_test_data(db).await.expect("Failed to cleanup");

    let survey = create_test_survey(db, "Reference survey")
        .await
        .expect("Failed to create survey");
    let response = canvass::responses::start_response(survey.id, None)
        .await
        .expect("Failed to open response");

    let result = canvass::responses::record_answer(response.id, 999999, "orphan").await;
    assert!(
        matches!(result, Err(DataError::ReferentialIntegrityViolation(_))),
        "An answer to a nonexistent question should be a referential integrity violation"
    );
}

#[actix_rt::test]
#[serial]
async fn test_response_survives_user_deletion() {
    let db = setup_test_database().await;
    cleanup_test_data(db).await.expect("Failed to cleanup");

    let user = create_test_user(db, "departing_user")
        .await
        .expect("Failed to create user");
    let survey = create_test_survey(db, "Retention survey")
        .await
        .expect("Failed to create survey");

    let response = canvass::responses::start_response(survey.id, Some(user.id))
        .await
        .expect("Failed to open response");
    assert_eq!(response.user_id, Some(user.id));

    canvass::user::delete_user(user.id)
        .await
        .expect("Failed to delete user");

    let kept = canvass::orm::responses::Entity::find_by_id(response.id)
        .one(db)
        .await
        .expect("Failed to fetch response")
        .expect("Response should survive user deletion");
    assert_eq!(kept.user_id, None, "The user reference should be cleared");
}
