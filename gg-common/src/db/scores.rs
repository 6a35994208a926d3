//! Game scores and per-game reporting queries

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use crate::pagination::{Page, Pagination};
use crate::time::{http_date_format, now};
use crate::validate::{self, lenient_bool, lenient_i64};
use crate::{Error, Result};

const SCORE_COLUMNS: &str =
    "id, user_id, game, state, score, max_score, is_exam, duration, created";

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Score {
    pub id: i64,
    pub user_id: Option<i64>,
    pub game: Option<String>,
    pub state: Option<String>,
    pub score: Option<i64>,
    pub max_score: Option<i64>,
    pub is_exam: bool,
    pub duration: Option<i64>,
    #[serde(with = "http_date_format")]
    pub created: NaiveDateTime,
}

/// Score body accepted by the API; numbers may arrive as strings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoreInput {
    #[serde(default)]
    pub game: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub score: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub max_score: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub duration: Option<i64>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_exam: Option<bool>,
}

impl ScoreInput {
    /// Reject scores without a game or state
    pub fn validate(&self) -> Result<()> {
        validate::required(self.game.as_deref(), "score does not have a game")?;
        validate::required(self.state.as_deref(), "score does not have a state")?;
        Ok(())
    }
}

/// Insert a score owned by `user_id`
pub async fn create(pool: &SqlitePool, user_id: i64, input: &ScoreInput) -> Result<Score> {
    input.validate()?;
    let result = sqlx::query(
        r#"
        INSERT INTO scores (user_id, game, state, score, max_score, is_exam, duration, created)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(&input.game)
    .bind(&input.state)
    .bind(input.score)
    .bind(input.max_score)
    .bind(input.is_exam.unwrap_or(false))
    .bind(input.duration)
    .bind(now())
    .execute(pool)
    .await?;
    get_required(pool, result.last_insert_rowid()).await
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<Option<Score>> {
    let sql = format!("SELECT {} FROM scores WHERE id = ?", SCORE_COLUMNS);
    let score = sqlx::query_as::<_, Score>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(score)
}

pub async fn get_required(pool: &SqlitePool, id: i64) -> Result<Score> {
    get(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Score {}", id)))
}

/// Every score, newest first
pub async fn list(pool: &SqlitePool, page: i64, per_page: i64) -> Result<Page<Score>> {
    let page_sql = format!(
        "SELECT {} FROM scores ORDER BY created DESC, id DESC LIMIT ? OFFSET ?",
        SCORE_COLUMNS
    );
    crate::db::paginate(pool, "SELECT COUNT(*) FROM scores", &page_sql, None, page, per_page).await
}

/// Highest score a user reached in a game, None without attempts
pub async fn max_score_by_user_and_game(pool: &SqlitePool, user_id: i64, game: &str) -> Result<Option<i64>> {
    let max: Option<i64> =
        sqlx::query_scalar("SELECT MAX(score) FROM scores WHERE user_id = ? AND game = ?")
            .bind(user_id)
            .bind(game)
            .fetch_one(pool)
            .await?;
    Ok(max)
}

/// A user's attempts at one game, oldest first
pub async fn scores_by_user_and_game(
    pool: &SqlitePool,
    user_id: i64,
    game: &str,
    page: i64,
    per_page: i64,
) -> Result<Page<Score>> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scores WHERE user_id = ? AND game = ?")
        .bind(user_id)
        .bind(game)
        .fetch_one(pool)
        .await?;
    let pagination = Pagination::new(total, page, per_page);

    let sql = format!(
        "SELECT {} FROM scores WHERE user_id = ? AND game = ? ORDER BY created, id LIMIT ? OFFSET ?",
        SCORE_COLUMNS
    );
    let items = sqlx::query_as::<_, Score>(&sql)
        .bind(user_id)
        .bind(game)
        .bind(pagination.per_page)
        .bind(pagination.offset)
        .fetch_all(pool)
        .await?;
    Ok(Page { items, pagination })
}

/// Highest-scoring attempt per game
///
/// Joins each game's rows against the game's MAX(score); when several
/// attempts share the maximum, the newest row wins.
pub async fn best_scores(pool: &SqlitePool, user_id: i64) -> Result<Vec<Score>> {
    let scores = sqlx::query_as::<_, Score>(
        r#"
        SELECT s.id, s.user_id, s.game, s.state, s.score, s.max_score, s.is_exam, s.duration, s.created
        FROM scores s
        JOIN (
            SELECT game, MAX(score) AS best
            FROM scores
            WHERE user_id = ?
            GROUP BY game
        ) m ON m.game = s.game AND m.best = s.score
        WHERE s.user_id = ?
          AND s.id = (
            SELECT MAX(t.id) FROM scores t
            WHERE t.user_id = s.user_id AND t.game = s.game AND t.score = s.score
          )
        ORDER BY s.game
        "#,
    )
    .bind(user_id)
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(scores)
}

/// Most recent attempt per game
///
/// Joins each game's rows against the game's MAX(created); ties on the
/// timestamp resolve to the newest row.
pub async fn last_scores(pool: &SqlitePool, user_id: i64) -> Result<Vec<Score>> {
    let scores = sqlx::query_as::<_, Score>(
        r#"
        SELECT s.id, s.user_id, s.game, s.state, s.score, s.max_score, s.is_exam, s.duration, s.created
        FROM scores s
        JOIN (
            SELECT game, MAX(created) AS latest
            FROM scores
            WHERE user_id = ?
            GROUP BY game
        ) m ON m.game = s.game AND m.latest = s.created
        WHERE s.user_id = ?
          AND s.id = (
            SELECT MAX(t.id) FROM scores t
            WHERE t.user_id = s.user_id AND t.game = s.game AND t.created = s.created
          )
        ORDER BY s.game
        "#,
    )
    .bind(user_id)
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_memory_database, roles, users};

    async fn setup() -> (SqlitePool, i64) {
        let pool = init_memory_database().await.unwrap();
        roles::insert_roles(&pool).await.unwrap();
        let u = users::create(
            &pool,
            users::NewUser {
                username: Some("john".into()),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();
        (pool, u.id)
    }

    async fn insert(pool: &SqlitePool, user_id: i64, game: &str, score: i64, created: &str) -> i64 {
        sqlx::query("INSERT INTO scores (user_id, game, state, score, created) VALUES (?, ?, 'done', ?, ?)")
            .bind(user_id)
            .bind(game)
            .bind(score)
            .bind(created)
            .execute(pool)
            .await
            .unwrap()
            .last_insert_rowid()
    }

    #[test]
    fn test_input_requires_game_and_state() {
        let input: ScoreInput = serde_json::from_str(r#"{"state": "won"}"#).unwrap();
        assert_eq!(input.validate().unwrap_err().to_string(), "score does not have a game");
        let input: ScoreInput = serde_json::from_str(r#"{"game": "g", "state": ""}"#).unwrap();
        assert_eq!(input.validate().unwrap_err().to_string(), "score does not have a state");
    }

    #[tokio::test]
    async fn test_create_accepts_numeric_strings() {
        let (pool, uid) = setup().await;
        let input: ScoreInput = serde_json::from_str(
            r#"{"game": "game_danger", "state": "won", "score": "17", "max_score": 20, "duration": "33", "is_exam": true}"#,
        )
        .unwrap();
        let s = create(&pool, uid, &input).await.unwrap();
        assert_eq!(s.score, Some(17));
        assert_eq!(s.max_score, Some(20));
        assert_eq!(s.duration, Some(33));
        assert!(s.is_exam);
        assert_eq!(s.user_id, Some(uid));
    }

    #[tokio::test]
    async fn test_max_score() {
        let (pool, uid) = setup().await;
        assert_eq!(max_score_by_user_and_game(&pool, uid, "g").await.unwrap(), None);
        insert(&pool, uid, "g", 5, "2017-01-01 00:00:00").await;
        insert(&pool, uid, "g", 0, "2017-01-02 00:00:00").await;
        insert(&pool, uid, "other", 50, "2017-01-02 00:00:00").await;
        assert_eq!(max_score_by_user_and_game(&pool, uid, "g").await.unwrap(), Some(5));
    }

    #[tokio::test]
    async fn test_scores_by_game_are_oldest_first() {
        let (pool, uid) = setup().await;
        insert(&pool, uid, "g", 2, "2017-01-02 00:00:00").await;
        insert(&pool, uid, "g", 1, "2017-01-01 00:00:00").await;
        insert(&pool, uid, "h", 9, "2017-01-01 00:00:00").await;
        let page = scores_by_user_and_game(&pool, uid, "g", 1, 10).await.unwrap();
        let values: Vec<_> = page.items.iter().map(|s| s.score.unwrap()).collect();
        assert_eq!(values, vec![1, 2]);
        assert_eq!(page.pagination.total, 2);

        let past_end = scores_by_user_and_game(&pool, uid, "g", 3, 10).await.unwrap();
        assert!(past_end.items.is_empty());
    }

    #[tokio::test]
    async fn test_best_and_last_scores() {
        let (pool, uid) = setup().await;
        insert(&pool, uid, "g1", 3, "2017-01-01 00:00:00").await;
        let best_g1 = insert(&pool, uid, "g1", 9, "2017-01-02 00:00:00").await;
        let last_g1 = insert(&pool, uid, "g1", 4, "2017-01-03 00:00:00").await;
        insert(&pool, uid, "g2", 7, "2017-01-01 00:00:00").await;
        // Tie on both score and timestamp: newest row wins
        let tie = insert(&pool, uid, "g2", 7, "2017-01-01 00:00:00").await;

        let best = best_scores(&pool, uid).await.unwrap();
        let best_ids: Vec<_> = best.iter().map(|s| s.id).collect();
        assert_eq!(best_ids, vec![best_g1, tie]);

        let last = last_scores(&pool, uid).await.unwrap();
        let last_ids: Vec<_> = last.iter().map(|s| s.id).collect();
        assert_eq!(last_ids, vec![last_g1, tie]);
    }

    #[tokio::test]
    async fn test_to_json_shape() {
        let (pool, uid) = setup().await;
        let id = insert(&pool, uid, "g", 3, "2017-01-03 00:00:00").await;
        let s = get_required(&pool, id).await.unwrap();
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["created"], "Tue, 03 Jan 2017 00:00:00 GMT");
        assert_eq!(json["is_exam"], false);
        assert_eq!(json["user_id"], uid);
    }
}
