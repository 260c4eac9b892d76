pub mod app_config;
pub mod audit;
pub mod connections;
pub mod db;
pub mod middleware;
pub mod orm;
pub mod responses;
pub mod schema;
pub mod surveys;
pub mod user;
pub mod web;
