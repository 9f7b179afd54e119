//! Database repository for document operations.
//!
//! Uses prepared statements, and transactions wherever a write depends on a read.

use chrono::{SecondsFormat, Utc};
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{
    Badge, Comment, CreateCommentRequest, CreatePostRequest, Extra, Payment, Post,
    RecordPaymentRequest, RegisterUserRequest, Role, UpdateResult, User, VoteDirection,
};

/// Post columns plus the voter list folded into a JSON array.
const POST_COLUMNS: &str = r#"p.id, p.email, p.tag, p.content, p.created_at, p.up_vote, p.down_vote, p.extra,
    (SELECT json_group_array(v.email ORDER BY v.seq) FROM post_votes v WHERE v.post_id = p.id) AS voted_by"#;

/// Newest first; rowid breaks ties between posts created in the same millisecond.
const NEWEST_FIRST: &str = "ORDER BY p.created_at DESC, p.rowid DESC";

/// Result of attempting to record a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    Recorded,
    AlreadyVoted,
    PostNotFound,
}

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Close the pool, waiting for checked-out connections to be returned.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ==================== POST OPERATIONS ====================

    /// List posts newest first, one page at a time.
    pub async fn list_posts(&self, page: i64, size: i64) -> Result<Vec<Post>, AppError> {
        let sql = format!(
            "SELECT {} FROM posts p {} LIMIT ? OFFSET ?",
            POST_COLUMNS, NEWEST_FIRST
        );
        let rows = sqlx::query(&sql)
            .bind(size)
            .bind(page.saturating_mul(size))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(post_from_row).collect())
    }

    /// List every post carrying exactly this tag.
    pub async fn list_posts_by_tag(&self, tag: &str) -> Result<Vec<Post>, AppError> {
        let sql = format!(
            "SELECT {} FROM posts p WHERE p.tag = ? {}",
            POST_COLUMNS, NEWEST_FIRST
        );
        let rows = sqlx::query(&sql).bind(tag).fetch_all(&self.pool).await?;

        Ok(rows.iter().map(post_from_row).collect())
    }

    /// List an author's posts newest first, optionally capped.
    pub async fn list_posts_by_email(
        &self,
        email: &str,
        limit: Option<i64>,
    ) -> Result<Vec<Post>, AppError> {
        // SQLite treats a negative LIMIT as "no limit"
        let sql = format!(
            "SELECT {} FROM posts p WHERE p.email = ? {} LIMIT ?",
            POST_COLUMNS, NEWEST_FIRST
        );
        let rows = sqlx::query(&sql)
            .bind(email)
            .bind(limit.unwrap_or(-1))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(post_from_row).collect())
    }

    /// Get a post by ID.
    pub async fn get_post(&self, id: &str) -> Result<Option<Post>, AppError> {
        let sql = format!("SELECT {} FROM posts p WHERE p.id = ?", POST_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(post_from_row))
    }

    /// Total number of posts.
    pub async fn count_posts(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM posts")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("count"))
    }

    /// Number of posts written by one author.
    pub async fn count_posts_by_email(&self, email: &str) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM posts WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("count"))
    }

    /// Create a new post with zeroed vote counters.
    pub async fn create_post(&self, request: &CreatePostRequest) -> Result<Post, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = timestamp();
        let extra = request.sanitized_extra();
        let extra_json = serde_json::to_string(&extra)?;

        sqlx::query(
            "INSERT INTO posts (id, email, tag, content, created_at, up_vote, down_vote, extra) VALUES (?, ?, ?, ?, ?, 0, 0, ?)"
        )
        .bind(&id)
        .bind(&request.email)
        .bind(&request.tag)
        .bind(&request.content)
        .bind(&now)
        .bind(&extra_json)
        .execute(&self.pool)
        .await?;

        Ok(Post {
            id,
            email: request.email.clone(),
            tag: request.tag.clone(),
            content: request.content.clone(),
            created_at: now,
            up_vote: 0,
            down_vote: 0,
            voted_by: Vec::new(),
            popularity: None,
            extra,
        })
    }

    /// Delete a post and its votes. Returns the number of posts removed.
    pub async fn delete_post(&self, id: &str) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM post_votes WHERE post_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }

    /// All posts ranked by upVote - downVote, highest first.
    pub async fn popular_posts(&self) -> Result<Vec<Post>, AppError> {
        let sql = format!(
            "SELECT {}, (p.up_vote - p.down_vote) AS popularity FROM posts p ORDER BY popularity DESC, p.created_at DESC, p.rowid DESC",
            POST_COLUMNS
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        Ok(rows
            .iter()
            .map(|row| {
                let mut post = post_from_row(row);
                post.popularity = Some(row.get("popularity"));
                post
            })
            .collect())
    }

    /// Record one vote per (post, voter).
    ///
    /// The voter row and the counter increment commit together. The unique
    /// `(post_id, email)` key rejects a second vote even when two requests race,
    /// and writing first keeps the transaction from reading a stale snapshot.
    pub async fn record_vote(
        &self,
        post_id: &str,
        voter: &str,
        direction: VoteDirection,
    ) -> Result<VoteOutcome, AppError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO post_votes (post_id, email, direction, voted_at) SELECT ?, ?, ?, ? WHERE EXISTS (SELECT 1 FROM posts WHERE id = ?)",
        )
        .bind(post_id)
        .bind(voter)
        .bind(direction.as_str())
        .bind(timestamp())
        .bind(post_id)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            let exists = sqlx::query("SELECT 1 FROM posts WHERE id = ?")
                .bind(post_id)
                .fetch_optional(&mut *tx)
                .await?;
            return Ok(match exists {
                Some(_) => VoteOutcome::AlreadyVoted,
                None => VoteOutcome::PostNotFound,
            });
        }

        let column = direction.counter_column();
        let sql = format!("UPDATE posts SET {column} = {column} + 1 WHERE id = ?");
        sqlx::query(&sql).bind(post_id).execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(VoteOutcome::Recorded)
    }

    // ==================== COMMENT OPERATIONS ====================

    /// Create a comment.
    pub async fn create_comment(
        &self,
        request: &CreateCommentRequest,
    ) -> Result<Comment, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let extra = request.sanitized_extra();
        let extra_json = serde_json::to_string(&extra)?;

        sqlx::query("INSERT INTO comments (id, post_id, content, extra) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(&request.post_id)
            .bind(&request.content)
            .bind(&extra_json)
            .execute(&self.pool)
            .await?;

        Ok(Comment {
            id,
            post_id: request.post_id.clone(),
            content: request.content.clone(),
            extra,
        })
    }

    /// List all comments in insertion order.
    pub async fn list_comments(&self) -> Result<Vec<Comment>, AppError> {
        let rows = sqlx::query("SELECT id, post_id, content, extra FROM comments ORDER BY rowid")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(comment_from_row).collect())
    }

    /// Number of comments attached to a post.
    pub async fn count_comments_for_post(&self, post_id: &str) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM comments WHERE post_id = ?")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("count"))
    }

    // ==================== USER OPERATIONS ====================

    /// List all users in registration order.
    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let rows = sqlx::query("SELECT id, email, role, user_badge, extra FROM users ORDER BY rowid")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(user_from_row).collect())
    }

    /// Find a user by email.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query("SELECT id, email, role, user_badge, extra FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Register a user unless the email is already taken.
    ///
    /// Returns `None` when a user with this email exists; nothing is written then.
    pub async fn create_user_if_absent(
        &self,
        request: &RegisterUserRequest,
    ) -> Result<Option<User>, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let extra = request.sanitized_extra();
        let extra_json = serde_json::to_string(&extra)?;

        let result = sqlx::query(
            "INSERT INTO users (id, email, role, user_badge, extra) VALUES (?, ?, NULL, NULL, ?) ON CONFLICT(email) DO NOTHING",
        )
        .bind(&id)
        .bind(&request.email)
        .bind(&extra_json)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        Ok(Some(User {
            id,
            email: request.email.clone(),
            role: None,
            user_badge: None,
            extra,
        }))
    }

    /// Assign a role to the user with this ID.
    ///
    /// Returns `None` when no user matched.
    pub async fn set_role(&self, id: &str, role: Role) -> Result<Option<UpdateResult>, AppError> {
        let updated = sqlx::query("UPDATE users SET role = ? WHERE id = ? AND role IS NOT ?")
            .bind(role.as_str())
            .bind(id)
            .bind(role.as_str())
            .execute(&self.pool)
            .await?;

        if updated.rows_affected() > 0 {
            return Ok(Some(UpdateResult::matched(1)));
        }

        let exists = sqlx::query("SELECT 1 FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(exists.map(|_| UpdateResult::matched(0)))
    }

    /// Set a user's badge, creating a bare user document when none exists.
    ///
    /// One upsert statement: the returned id tells an insert (our fresh id) from
    /// an update, and no row back means the badge was already set.
    pub async fn grant_badge(&self, email: &str, badge: Badge) -> Result<UpdateResult, AppError> {
        let id = uuid::Uuid::new_v4().to_string();

        let row = sqlx::query(
            r#"INSERT INTO users (id, email, role, user_badge, extra) VALUES (?, ?, NULL, ?, '{}')
            ON CONFLICT(email) DO UPDATE SET user_badge = excluded.user_badge
            WHERE users.user_badge IS NOT excluded.user_badge
            RETURNING id"#,
        )
        .bind(&id)
        .bind(email)
        .bind(badge.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(match row {
            Some(row) if row.get::<String, _>("id") == id => UpdateResult::upserted(id),
            Some(_) => UpdateResult::matched(1),
            None => UpdateResult::matched(0),
        })
    }

    // ==================== PAYMENT OPERATIONS ====================

    /// Store a client-reported payment.
    pub async fn record_payment(&self, request: &RecordPaymentRequest) -> Result<Payment, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let extra = request.sanitized_extra();
        let extra_json = serde_json::to_string(&extra)?;

        sqlx::query("INSERT INTO payments (id, email, extra) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(&request.email)
            .bind(&extra_json)
            .execute(&self.pool)
            .await?;

        Ok(Payment {
            id,
            email: request.email.clone(),
            extra,
        })
    }

    /// List a user's payments in the order they were recorded.
    pub async fn list_payments_by_email(&self, email: &str) -> Result<Vec<Payment>, AppError> {
        let rows = sqlx::query("SELECT id, email, extra FROM payments WHERE email = ? ORDER BY rowid")
            .bind(email)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(payment_from_row).collect())
    }
}

// Helper functions for row conversion

fn post_from_row(row: &sqlx::sqlite::SqliteRow) -> Post {
    let voted_by: Option<String> = row.get("voted_by");
    let extra: String = row.get("extra");
    Post {
        id: row.get("id"),
        email: row.get("email"),
        tag: row.get("tag"),
        content: row.get("content"),
        created_at: row.get("created_at"),
        up_vote: row.get("up_vote"),
        down_vote: row.get("down_vote"),
        voted_by: voted_by.map(|s| parse_json_array(&s)).unwrap_or_default(),
        popularity: None,
        extra: parse_extra(&extra),
    }
}

fn comment_from_row(row: &sqlx::sqlite::SqliteRow) -> Comment {
    let extra: String = row.get("extra");
    Comment {
        id: row.get("id"),
        post_id: row.get("post_id"),
        content: row.get("content"),
        extra: parse_extra(&extra),
    }
}

fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> User {
    let role: Option<String> = row.get("role");
    let user_badge: Option<String> = row.get("user_badge");
    let extra: String = row.get("extra");
    User {
        id: row.get("id"),
        email: row.get("email"),
        role: role.as_deref().and_then(Role::parse),
        user_badge: user_badge.as_deref().and_then(Badge::parse),
        extra: parse_extra(&extra),
    }
}

fn payment_from_row(row: &sqlx::sqlite::SqliteRow) -> Payment {
    let extra: String = row.get("extra");
    Payment {
        id: row.get("id"),
        email: row.get("email"),
        extra: parse_extra(&extra),
    }
}

fn parse_json_array(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_default()
}

fn parse_extra(s: &str) -> Extra {
    serde_json::from_str(s).unwrap_or_default()
}

/// Fixed-width UTC timestamp so lexical order matches chronological order.
fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use serde_json::json;
    use tempfile::TempDir;

    async fn test_repo() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let pool = init_database(&temp_dir.path().join("test.sqlite"))
            .await
            .expect("Failed to init DB");
        (Repository::new(pool), temp_dir)
    }

    fn post_request(email: &str, tag: &str) -> CreatePostRequest {
        serde_json::from_value(json!({
            "email": email,
            "tag": tag,
            "content": "body",
            "title": "A title"
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_post_starts_unvoted() {
        let (repo, _dir) = test_repo().await;
        let created = repo.create_post(&post_request("a@b.com", "rust")).await.unwrap();

        let post = repo.get_post(&created.id).await.unwrap().unwrap();
        assert_eq!(post.up_vote, 0);
        assert_eq!(post.down_vote, 0);
        assert!(post.voted_by.is_empty());
        assert_eq!(post.extra.get("title"), Some(&json!("A title")));
    }

    #[tokio::test]
    async fn test_vote_once_per_voter() {
        let (repo, _dir) = test_repo().await;
        let post = repo.create_post(&post_request("a@b.com", "rust")).await.unwrap();

        let first = repo
            .record_vote(&post.id, "v@b.com", VoteDirection::Up)
            .await
            .unwrap();
        let second = repo
            .record_vote(&post.id, "v@b.com", VoteDirection::Down)
            .await
            .unwrap();
        assert_eq!(first, VoteOutcome::Recorded);
        assert_eq!(second, VoteOutcome::AlreadyVoted);

        let post = repo.get_post(&post.id).await.unwrap().unwrap();
        assert_eq!(post.up_vote, 1);
        assert_eq!(post.down_vote, 0);
        assert_eq!(post.voted_by, vec!["v@b.com".to_string()]);
    }

    #[tokio::test]
    async fn test_concurrent_votes_count_once() {
        let (repo, _dir) = test_repo().await;
        let post = repo.create_post(&post_request("a@b.com", "rust")).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let repo = repo.clone();
                let id = post.id.clone();
                tokio::spawn(async move { repo.record_vote(&id, "v@b.com", VoteDirection::Up).await })
            })
            .collect();

        let mut recorded = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() == VoteOutcome::Recorded {
                recorded += 1;
            }
        }
        assert_eq!(recorded, 1);

        let post = repo.get_post(&post.id).await.unwrap().unwrap();
        assert_eq!(post.up_vote, 1);
        assert_eq!(post.voted_by.len(), 1);
    }

    #[tokio::test]
    async fn test_vote_on_missing_post() {
        let (repo, _dir) = test_repo().await;
        let outcome = repo
            .record_vote("missing", "v@b.com", VoteDirection::Up)
            .await
            .unwrap();
        assert_eq!(outcome, VoteOutcome::PostNotFound);
    }

    #[tokio::test]
    async fn test_delete_post_removes_votes() {
        let (repo, _dir) = test_repo().await;
        let post = repo.create_post(&post_request("a@b.com", "rust")).await.unwrap();
        repo.record_vote(&post.id, "v@b.com", VoteDirection::Up)
            .await
            .unwrap();

        assert_eq!(repo.delete_post(&post.id).await.unwrap(), 1);
        assert_eq!(repo.delete_post(&post.id).await.unwrap(), 0);
        assert!(repo.get_post(&post.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_posts_by_email_limit() {
        let (repo, _dir) = test_repo().await;
        for _ in 0..5 {
            repo.create_post(&post_request("a@b.com", "rust")).await.unwrap();
        }
        repo.create_post(&post_request("other@b.com", "rust")).await.unwrap();

        assert_eq!(repo.list_posts_by_email("a@b.com", Some(3)).await.unwrap().len(), 3);
        assert_eq!(repo.list_posts_by_email("a@b.com", None).await.unwrap().len(), 5);
        assert_eq!(repo.count_posts_by_email("a@b.com").await.unwrap(), 5);
        assert_eq!(repo.count_posts().await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_register_is_idempotent() {
        let (repo, _dir) = test_repo().await;
        let request: RegisterUserRequest =
            serde_json::from_value(json!({ "email": "a@b.com", "name": "Ann" })).unwrap();

        assert!(repo.create_user_if_absent(&request).await.unwrap().is_some());
        assert!(repo.create_user_if_absent(&request).await.unwrap().is_none());
        assert_eq!(repo.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_set_role() {
        let (repo, _dir) = test_repo().await;
        let request: RegisterUserRequest =
            serde_json::from_value(json!({ "email": "a@b.com" })).unwrap();
        let user = repo.create_user_if_absent(&request).await.unwrap().unwrap();

        assert_eq!(
            repo.set_role(&user.id, Role::Admin).await.unwrap(),
            Some(UpdateResult::matched(1))
        );
        assert_eq!(
            repo.set_role(&user.id, Role::Admin).await.unwrap(),
            Some(UpdateResult::matched(0))
        );
        assert_eq!(repo.set_role("missing", Role::Admin).await.unwrap(), None);

        let user = repo.find_user_by_email("a@b.com").await.unwrap().unwrap();
        assert!(user.has_role(Role::Admin));
    }

    #[tokio::test]
    async fn test_grant_badge_upserts() {
        let (repo, _dir) = test_repo().await;

        let first = repo.grant_badge("new@b.com", Badge::Gold).await.unwrap();
        assert!(first.upserted_id.is_some());

        let second = repo.grant_badge("new@b.com", Badge::Gold).await.unwrap();
        assert_eq!(second, UpdateResult::matched(0));

        let user = repo.find_user_by_email("new@b.com").await.unwrap().unwrap();
        assert_eq!(user.user_badge, Some(Badge::Gold));
        assert_eq!(user.role, None);
    }
}
