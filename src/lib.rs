pub mod admin_sync;
pub mod api;
pub mod attempt;
pub mod attempt_service;
pub mod config;
pub mod database;
pub mod errors;
pub mod logging;
pub mod models;
pub mod parser;
pub mod quiz_service;
pub mod review;
pub mod scoring;

pub use admin_sync::AdminSyncClient;
pub use attempt::{Attempt, AttemptError, AttemptPhase, QuizMode};
pub use attempt_service::{spawn_deadline_sweeper, AttemptService, AttemptView};
pub use config::Config;
pub use database::Database;
pub use errors::*;
pub use models::*;
pub use parser::parse_questions;
pub use quiz_service::QuizService;
pub use review::{build_review, practice_walkthrough, ReviewFilter};
pub use scoring::score;
