use axum::http::StatusCode;
use axum_test::TestServer;
use quiz_library::{api::*, AttemptService, Database, QuizService};
use serde_json::{json, Value};

const SAMPLE_FILE: &str = "Q: 2+2=?\nA) 3\nB) 4\nC) 5\nD) 6\nANS: 1\n\
                           Q: Capital of France?\nA) Paris\nB) Rome\nC) Oslo\nD) Bern\nANS: 0\n\
                           Q: Largest planet?\nA) Mars\nB) Venus\nC) Jupiter\nD) Earth\nANS: 2\n";

async fn create_test_server_with_phrase(delete_phrase: Option<&str>) -> TestServer {
    let db = Database::new("sqlite::memory:").await.unwrap();
    let quiz_service = QuizService::new(db);
    let attempt_service = AttemptService::new(quiz_service.clone(), 15);
    let app_state = AppState {
        quiz_service,
        attempt_service,
        sync_client: None,
        delete_phrase: delete_phrase.map(str::to_string),
    };

    let app = create_router(app_state);
    TestServer::new(app).unwrap()
}

async fn create_test_server() -> TestServer {
    create_test_server_with_phrase(None).await
}

async fn create_quiz(server: &TestServer, name: &str, category: &str) -> String {
    let response = server
        .post("/api/quizzes")
        .json(&json!({
            "test_name": name,
            "category": category,
            "description": "General knowledge",
            "file_content": SAMPLE_FILE
        }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    body["data"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_api_preview_upload() {
    let server = create_test_server().await;

    let response = server
        .post("/api/quizzes/preview")
        .json(&json!({ "file_content": "Q: 2+2=?\nA) 3\nB) 4\nC) 5\nD) 6\nANS: 1\nQ: unfinished\nA) x" }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["question_count"], 2);
    assert_eq!(body["data"]["questions"][0]["question"], "2+2=?");
    assert_eq!(body["data"]["questions"][0]["answer"], "1");
    assert_eq!(body["data"]["incomplete"], json!([1]));
}

#[tokio::test]
async fn test_api_create_and_get_quiz() {
    let server = create_test_server().await;
    let id = create_quiz(&server, "Basics", "Trivia").await;

    let response = server.get(&format!("/api/quizzes/{}", id)).await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["data"]["test_name"], "Basics");
    assert_eq!(body["data"]["total_questions"], 3);
    assert!(body["data"]["latest_score"].is_null());
}

#[tokio::test]
async fn test_api_create_quiz_validation() {
    let server = create_test_server().await;

    let response = server
        .post("/api/quizzes")
        .json(&json!({
            "test_name": "Empty",
            "category": "Trivia",
            "file_content": "no questions in here"
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("no questions"));
}

#[tokio::test]
async fn test_api_list_quizzes_by_category() {
    let server = create_test_server().await;
    create_quiz(&server, "One", "Science").await;
    create_quiz(&server, "Two", "History").await;
    create_quiz(&server, "Three", "Science").await;

    let response = server.get("/api/quizzes").add_query_param("category", "Science").await;
    response.assert_status_ok();
    let body: Value = response.json();
    let names: Vec<_> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|quiz| quiz["test_name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["One", "Three"]);

    let all: Value = server.get("/api/quizzes").await.json();
    assert_eq!(all["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_api_quiz_not_found() {
    let server = create_test_server().await;
    let missing = uuid::Uuid::new_v4();

    let response = server.get(&format!("/api/quizzes/{}", missing)).await;
    response.assert_status(StatusCode::NOT_FOUND);

    let response = server.get(&format!("/api/quizzes/{}/practice", missing)).await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_api_practice_reveals_answers() {
    let server = create_test_server().await;
    let id = create_quiz(&server, "Basics", "Trivia").await;

    let response = server.get(&format!("/api/quizzes/{}/practice", id)).await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["data"][0]["correct_label"], "B");
    assert_eq!(body["data"][0]["correct_answer"], "(B) 4");
    assert_eq!(body["data"][2]["correct_answer"], "(C) Jupiter");

    // practice is never scored
    let response = server
        .post(&format!("/api/quizzes/{}/attempts", id))
        .json(&json!({ "mode": "practice" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_api_exam_attempt_and_review() {
    let server = create_test_server().await;
    let id = create_quiz(&server, "Basics", "Trivia").await;

    let response = server
        .post(&format!("/api/quizzes/{}/attempts", id))
        .json(&json!({ "mode": "exam" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    let attempt_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["phase"]["state"], "open");
    assert_eq!(body["data"]["total_questions"], 3);

    let response = server
        .post(&format!("/api/attempts/{}/answers", attempt_id))
        .json(&json!({ "question_index": 0, "option": 1 }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["outcome"]["is_correct"], true);

    let response = server
        .post(&format!("/api/attempts/{}/answers", attempt_id))
        .json(&json!({ "question_index": 1, "option": 3 }))
        .await;
    response.assert_status_ok();

    // options lock after the first selection
    let response = server
        .post(&format!("/api/attempts/{}/answers", attempt_id))
        .json(&json!({ "question_index": 1, "option": 0 }))
        .await;
    response.assert_status(StatusCode::CONFLICT);

    let response = server
        .post(&format!("/api/attempts/{}/answers", attempt_id))
        .json(&json!({ "question_index": 2, "option": 9 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server.post(&format!("/api/attempts/{}/finish", attempt_id)).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["correct"], 1);
    assert_eq!(body["data"]["wrong"], 1);
    assert_eq!(body["data"]["skipped"], 1);
    assert_eq!(body["data"]["user_answers"], json!([1, 3, null]));

    let response = server.post(&format!("/api/attempts/{}/finish", attempt_id)).await;
    response.assert_status(StatusCode::CONFLICT);

    let quiz: Value = server.get(&format!("/api/quizzes/{}", id)).await.json();
    assert_eq!(quiz["data"]["latest_score"]["correct"], 1);

    let response = server
        .get(&format!("/api/quizzes/{}/review", id))
        .add_query_param("filter", "wrong")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["percentage"], 33);
    let entries = body["data"]["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["number"], 2);
    assert_eq!(entries[0]["correct_label"], "A");
    assert_eq!(entries[0]["your_label"], "D");

    let response = server
        .get(&format!("/api/quizzes/{}/review", id))
        .add_query_param("filter", "sideways")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_api_review_empty_filter_message() {
    let server = create_test_server().await;
    let id = create_quiz(&server, "Basics", "Trivia").await;

    let body: Value = server
        .post(&format!("/api/quizzes/{}/attempts", id))
        .json(&json!({ "mode": "exam" }))
        .await
        .json();
    let attempt_id = body["data"]["id"].as_str().unwrap().to_string();
    server
        .post(&format!("/api/attempts/{}/finish", attempt_id))
        .await
        .assert_status_ok();

    let body: Value = server
        .get(&format!("/api/quizzes/{}/review", id))
        .add_query_param("filter", "correct")
        .await
        .json();
    assert_eq!(body["data"]["entries"], json!([]));
    assert_eq!(body["data"]["empty_message"], "No Correct Answers Found");
}

#[tokio::test]
async fn test_api_timed_attempt_enforces_current_question() {
    let server = create_test_server().await;
    let id = create_quiz(&server, "Basics", "Trivia").await;

    let response = server
        .post(&format!("/api/quizzes/{}/attempts", id))
        .json(&json!({ "mode": "timer" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    let attempt_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["phase"]["state"], "awaiting_answer");
    assert_eq!(body["data"]["current_question"]["question"], "2+2=?");
    assert!(body["data"]["current_question"].get("answer").is_none());

    let response = server
        .post(&format!("/api/attempts/{}/answers", attempt_id))
        .json(&json!({ "question_index": 2, "option": 2 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server
        .post(&format!("/api/attempts/{}/answers", attempt_id))
        .json(&json!({ "question_index": 0, "option": 1 }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["attempt"]["current_question"]["question_index"], 1);

    let response = server.delete(&format!("/api/attempts/{}", attempt_id)).await;
    response.assert_status_ok();
    let response = server.get(&format!("/api/attempts/{}", attempt_id)).await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_api_sections_crud_and_search() {
    let server = create_test_server().await;

    let response = server.post("/api/sections").json(&json!({ "name": " Physics " })).await;
    response.assert_status_ok();
    let body: Value = response.json();
    let physics_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["name"], "Physics");

    server
        .post("/api/sections")
        .json(&json!({ "name": "Chemistry" }))
        .await
        .assert_status_ok();

    let response = server.post("/api/sections").json(&json!({ "name": "physics" })).await;
    response.assert_status(StatusCode::CONFLICT);

    let body: Value = server.get("/api/sections").add_query_param("q", "chem").await.json();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["name"], "Chemistry");

    let response = server
        .put(&format!("/api/sections/{}", physics_id))
        .json(&json!({ "name": "Astrophysics" }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["name"], "Astrophysics");

    let response = server.delete(&format!("/api/sections/{}", physics_id)).await;
    response.assert_status_ok();
    let response = server.delete(&format!("/api/sections/{}", physics_id)).await;
    response.assert_status(StatusCode::NOT_FOUND);

    let response = server
        .put("/api/sections")
        .json(&json!({ "names": ["Zoology", "", "Algebra"] }))
        .await;
    response.assert_status_ok();
    let body: Value = server.get("/api/sections").await.json();
    let names: Vec<_> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|section| section["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Zoology", "Algebra"]);
}

#[tokio::test]
async fn test_api_delete_requires_confirmation_phrase() {
    let server = create_test_server_with_phrase(Some("Quiz Master")).await;
    let id = create_quiz(&server, "Basics", "Trivia").await;

    let response = server.delete(&format!("/api/quizzes/{}", id)).await;
    response.assert_status(StatusCode::FORBIDDEN);

    let response = server
        .delete(&format!("/api/quizzes/{}", id))
        .add_query_param("confirm", "someone else")
        .await;
    response.assert_status(StatusCode::FORBIDDEN);

    let response = server
        .delete(&format!("/api/quizzes/{}", id))
        .add_query_param("confirm", "quiz master")
        .await;
    response.assert_status_ok();

    let response = server.get(&format!("/api/quizzes/{}", id)).await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_api_section_delete_requires_confirmation_phrase() {
    let server = create_test_server_with_phrase(Some("Quiz Master")).await;
    let body: Value = server
        .post("/api/sections")
        .json(&json!({ "name": "Physics" }))
        .await
        .json();
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let response = server.delete(&format!("/api/sections/{}", id)).await;
    response.assert_status(StatusCode::FORBIDDEN);
    let body: Value = server.get("/api/sections").await.json();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let response = server
        .delete(&format!("/api/sections/{}", id))
        .add_query_param("confirm", "QUIZ master")
        .await;
    response.assert_status_ok();

    let body: Value = server.get("/api/sections").await.json();
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_api_sync_disabled_without_endpoint() {
    let server = create_test_server().await;

    let response = server
        .post("/api/admin/sync")
        .json(&json!({ "email": "admin@example.com", "password": "secret" }))
        .await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json();
    assert_eq!(body["error"], "Admin sync is not configured");
}
