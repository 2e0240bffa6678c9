use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::time::Instant;
use uuid::Uuid;

use crate::log_db_operation;
use crate::models::*;

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // Every connection to an in-memory database is its own database, so keep exactly
        // one connection alive for the lifetime of the pool.
        let pool_options = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
        };

        let pool = pool_options.connect_with(options).await?;
        let db = Database { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tests (
                id TEXT PRIMARY KEY,
                remote_id TEXT UNIQUE,
                test_name TEXT NOT NULL,
                category TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                questions TEXT NOT NULL,
                total_questions INTEGER NOT NULL,
                latest_score TEXT,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_tests_category ON tests (category)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sections (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        log_db_operation!(info, "migrate", "tests and sections collections ready");
        Ok(())
    }

    // Quiz operations
    pub async fn create_quiz(&self, new_quiz: NewQuiz) -> Result<QuizDefinition> {
        let quiz = QuizDefinition {
            id: Uuid::new_v4(),
            remote_id: new_quiz.remote_id,
            test_name: new_quiz.test_name,
            category: new_quiz.category,
            description: new_quiz.description,
            total_questions: new_quiz.questions.len(),
            questions: new_quiz.questions,
            latest_score: None,
            created_at: new_quiz.created_at.unwrap_or_else(Utc::now),
        };

        sqlx::query(
            r#"
            INSERT INTO tests (id, remote_id, test_name, category, description,
                               questions, total_questions, latest_score, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(quiz.id.to_string())
        .bind(&quiz.remote_id)
        .bind(&quiz.test_name)
        .bind(&quiz.category)
        .bind(&quiz.description)
        .bind(serde_json::to_string(&quiz.questions)?)
        .bind(quiz.total_questions as i64)
        .bind(Option::<String>::None)
        .bind(quiz.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(quiz)
    }

    /// Insert or overwrite the quiz carrying `remote_id`. An overwrite replaces
    /// every field, including any stored score.
    pub async fn upsert_remote_quiz(&self, new_quiz: NewQuiz) -> Result<QuizDefinition> {
        let Some(remote_id) = new_quiz.remote_id.clone() else {
            return self.create_quiz(new_quiz).await;
        };

        let existing = sqlx::query("SELECT id FROM tests WHERE remote_id = ?1")
            .bind(&remote_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = existing else {
            return self.create_quiz(new_quiz).await;
        };

        let id = Uuid::parse_str(&row.get::<String, _>("id"))?;
        let quiz = QuizDefinition {
            id,
            remote_id: Some(remote_id),
            test_name: new_quiz.test_name,
            category: new_quiz.category,
            description: new_quiz.description,
            total_questions: new_quiz.questions.len(),
            questions: new_quiz.questions,
            latest_score: None,
            created_at: new_quiz.created_at.unwrap_or_else(Utc::now),
        };

        sqlx::query(
            r#"
            UPDATE tests
            SET test_name = ?1, category = ?2, description = ?3, questions = ?4,
                total_questions = ?5, latest_score = NULL, created_at = ?6
            WHERE id = ?7
            "#,
        )
        .bind(&quiz.test_name)
        .bind(&quiz.category)
        .bind(&quiz.description)
        .bind(serde_json::to_string(&quiz.questions)?)
        .bind(quiz.total_questions as i64)
        .bind(quiz.created_at.to_rfc3339())
        .bind(quiz.id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(quiz)
    }

    pub async fn get_quiz(&self, id: Uuid) -> Result<Option<QuizDefinition>> {
        let start = Instant::now();
        let row = sqlx::query("SELECT * FROM tests WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        log_db_operation!(
            debug,
            "get_quiz",
            quiz_id = id,
            duration_ms = start.elapsed().as_millis() as u64
        );

        row.map(|row| self.row_to_quiz(&row)).transpose()
    }

    pub async fn get_all_quizzes(&self) -> Result<Vec<QuizDefinition>> {
        let rows = sqlx::query("SELECT * FROM tests ORDER BY created_at ASC, rowid ASC")
            .fetch_all(&self.pool)
            .await?;

        self.rows_to_quizzes(rows)
    }

    pub async fn get_quizzes_by_category(&self, category: &str) -> Result<Vec<QuizDefinition>> {
        let start = Instant::now();
        let rows = sqlx::query(
            "SELECT * FROM tests WHERE category = ?1 ORDER BY created_at ASC, rowid ASC",
        )
        .bind(category)
        .fetch_all(&self.pool)
        .await?;

        log_db_operation!(
            debug,
            "get_quizzes_by_category",
            count = rows.len(),
            duration_ms = start.elapsed().as_millis() as u64
        );

        self.rows_to_quizzes(rows)
    }

    fn rows_to_quizzes(&self, rows: Vec<SqliteRow>) -> Result<Vec<QuizDefinition>> {
        rows.iter().map(|row| self.row_to_quiz(row)).collect()
    }

    fn row_to_quiz(&self, row: &SqliteRow) -> Result<QuizDefinition> {
        let latest_score = row
            .get::<Option<String>, _>("latest_score")
            .map(|json| serde_json::from_str::<ScoreReport>(&json))
            .transpose()?;

        Ok(QuizDefinition {
            id: Uuid::parse_str(&row.get::<String, _>("id"))?,
            remote_id: row.get("remote_id"),
            test_name: row.get("test_name"),
            category: row.get("category"),
            description: row.get("description"),
            questions: serde_json::from_str(&row.get::<String, _>("questions"))?,
            total_questions: row.get::<i64, _>("total_questions") as usize,
            latest_score,
            created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
        })
    }

    /// Replace the stored score. Returns `false` when the quiz no longer exists.
    pub async fn update_latest_score(&self, id: Uuid, report: &ScoreReport) -> Result<bool> {
        let result = sqlx::query("UPDATE tests SET latest_score = ?1 WHERE id = ?2")
            .bind(serde_json::to_string(report)?)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_quiz(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tests WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // Section operations
    pub async fn create_section(&self, name: String) -> Result<Section> {
        let section = Section {
            id: Uuid::new_v4(),
            name,
            created_at: Utc::now(),
        };

        sqlx::query("INSERT INTO sections (id, name, created_at) VALUES (?1, ?2, ?3)")
            .bind(section.id.to_string())
            .bind(&section.name)
            .bind(section.created_at.to_rfc3339())
            .execute(&self.pool)
            .await?;

        Ok(section)
    }

    /// Sections in insertion order
    pub async fn get_all_sections(&self) -> Result<Vec<Section>> {
        let rows = sqlx::query("SELECT * FROM sections ORDER BY rowid ASC")
            .fetch_all(&self.pool)
            .await?;

        let mut sections = Vec::new();
        for row in rows {
            sections.push(Section {
                id: Uuid::parse_str(&row.get::<String, _>("id"))?,
                name: row.get("name"),
                created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
            });
        }

        Ok(sections)
    }

    /// Clear the collection, then insert `names` in order, in one transaction.
    pub async fn replace_all_sections(&self, names: Vec<String>) -> Result<Vec<Section>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM sections").execute(&mut *tx).await?;

        let now = Utc::now();
        let mut sections = Vec::with_capacity(names.len());
        for name in names {
            let section = Section {
                id: Uuid::new_v4(),
                name,
                created_at: now,
            };
            sqlx::query("INSERT INTO sections (id, name, created_at) VALUES (?1, ?2, ?3)")
                .bind(section.id.to_string())
                .bind(&section.name)
                .bind(section.created_at.to_rfc3339())
                .execute(&mut *tx)
                .await?;
            sections.push(section);
        }

        tx.commit().await?;
        log_db_operation!(info, "replace_all_sections", format!("{} sections stored", sections.len()));
        Ok(sections)
    }

    pub async fn rename_section(&self, id: Uuid, name: String) -> Result<Option<Section>> {
        let result = sqlx::query("UPDATE sections SET name = ?1 WHERE id = ?2")
            .bind(&name)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        let row = sqlx::query("SELECT * FROM sections WHERE id = ?1")
            .bind(id.to_string())
            .fetch_one(&self.pool)
            .await?;

        Ok(Some(Section {
            id,
            name: row.get("name"),
            created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
        }))
    }

    pub async fn delete_section(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sections WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}
