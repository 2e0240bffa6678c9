use quiz_library::Config;
use std::env;

#[test]
fn test_config_from_env_round_trip() {
    unsafe {
        env::set_var("DATABASE_URL", "sqlite::memory:");
        env::set_var("PORT", "8088");
        env::set_var("QUIZ_TIMED_SECONDS", "30");
        env::set_var("ADMIN_SYNC_URL", "http://localhost:5000/api/quizzes/admin-fetch");
        env::set_var("ADMIN_SYNC_TIMEOUT_SECS", "10");
    }

    let config = Config::from_env().unwrap();
    assert_eq!(config.database.url, "sqlite::memory:");
    assert_eq!(config.server.port, 8088);
    assert_eq!(config.quiz.timed_seconds_per_question, 30);
    assert_eq!(
        config.sync.endpoint.as_deref(),
        Some("http://localhost:5000/api/quizzes/admin-fetch")
    );
    assert_eq!(config.sync.timeout_secs, 10);
    assert!(config.validate().is_ok());

    unsafe {
        env::set_var("QUIZ_TIMED_SECONDS", "0");
    }
    let config = Config::from_env().unwrap();
    assert!(config.validate().is_err());

    unsafe {
        env::remove_var("DATABASE_URL");
        env::remove_var("PORT");
        env::remove_var("QUIZ_TIMED_SECONDS");
        env::remove_var("ADMIN_SYNC_URL");
        env::remove_var("ADMIN_SYNC_TIMEOUT_SECS");
    }
}
