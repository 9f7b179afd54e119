//! Post and vote API endpoints.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    Json,
};

use super::{success, ApiResult};
use crate::db::VoteOutcome;
use crate::errors::AppError;
use crate::models::{
    CountResponse, CreatePostRequest, DeleteResult, InsertResult, PageQuery, Post, UpdateResult,
    VoteDirection, VoteRequest,
};
use crate::AppState;

/// Number of posts returned by the recent-posts view.
const RECENT_POST_LIMIT: i64 = 3;

/// GET /post?page=&size= - List posts newest first.
pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Vec<Post>> {
    success(state.repo.list_posts(query.page(), query.size()).await?)
}

/// GET /post/:tag - List posts with a tag.
pub async fn list_posts_by_tag(
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> ApiResult<Vec<Post>> {
    success(state.repo.list_posts_by_tag(&tag).await?)
}

/// POST /post - Create a post.
pub async fn create_post(
    State(state): State<AppState>,
    Json(request): Json<CreatePostRequest>,
) -> ApiResult<InsertResult> {
    if request.email.trim().is_empty() {
        return Err(AppError::Validation("Author email is required".to_string()));
    }

    let post = state.repo.create_post(&request).await?;
    tracing::info!("Post {} created by {}", post.id, post.email);
    success(InsertResult::inserted(post.id))
}

/// DELETE /post/:id - Delete a post.
pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<DeleteResult> {
    let deleted_count = state.repo.delete_post(&id).await?;
    if deleted_count == 0 {
        return Err(AppError::NotFound(format!("Post {} not found", id)));
    }

    tracing::info!("Post {} deleted", id);
    success(DeleteResult {
        acknowledged: true,
        deleted_count,
    })
}

/// GET /postsCount - Total number of posts.
pub async fn count_posts(State(state): State<AppState>) -> ApiResult<CountResponse> {
    let count = state.repo.count_posts().await?;
    success(CountResponse { count })
}

/// GET /recentPost/:email - An author's newest posts.
pub async fn recent_posts_by_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<Vec<Post>> {
    success(
        state
            .repo
            .list_posts_by_email(&email, Some(RECENT_POST_LIMIT))
            .await?,
    )
}

/// GET /posts/user/:email - All of an author's posts.
pub async fn posts_by_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<Vec<Post>> {
    success(state.repo.list_posts_by_email(&email, None).await?)
}

/// GET /post/user/count/:email - Number of posts by an author.
pub async fn count_posts_by_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<CountResponse> {
    let count = state.repo.count_posts_by_email(&email).await?;
    success(CountResponse { count })
}

/// GET /popular-post - All posts ranked by popularity.
pub async fn popular_posts(State(state): State<AppState>) -> ApiResult<Vec<Post>> {
    success(state.repo.popular_posts().await?)
}

/// PATCH /post/:id/upvote - Upvote a post.
pub async fn upvote_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<UpdateResult> {
    vote(&state, &id, &VoteRequest::from_body(&body), VoteDirection::Up).await
}

/// PATCH /post/:id/downvote - Downvote a post.
pub async fn downvote_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<UpdateResult> {
    vote(&state, &id, &VoteRequest::from_body(&body), VoteDirection::Down).await
}

async fn vote(
    state: &AppState,
    id: &str,
    request: &VoteRequest,
    direction: VoteDirection,
) -> ApiResult<UpdateResult> {
    let voter = request
        .voter()
        .ok_or_else(|| AppError::BadRequest("User email is required to vote".to_string()))?;

    match state.repo.record_vote(id, voter, direction).await? {
        VoteOutcome::Recorded => {
            tracing::debug!("{} voted {} on post {}", voter, direction.as_str(), id);
            success(UpdateResult::matched(1))
        }
        VoteOutcome::AlreadyVoted => Err(AppError::Forbidden(
            "You have already voted on this post".to_string(),
        )),
        VoteOutcome::PostNotFound => Err(AppError::NotFound("Post not found".to_string())),
    }
}
