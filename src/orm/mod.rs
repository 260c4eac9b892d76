pub mod answers;
pub mod anonymous_survey_responses;
pub mod audit_logs;
pub mod database_connections;
pub mod question_options;
pub mod questions;
pub mod responses;
pub mod selected_options;
pub mod surveys;
pub mod users;
