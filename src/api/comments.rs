//! Comment API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{success, ApiResult};
use crate::models::{Comment, CommentCountResponse, CreateCommentRequest, InsertResult};
use crate::AppState;

/// POST /comments - Create a comment.
pub async fn create_comment(
    State(state): State<AppState>,
    Json(request): Json<CreateCommentRequest>,
) -> ApiResult<InsertResult> {
    let comment = state.repo.create_comment(&request).await?;
    tracing::debug!("Comment {} added to post {}", comment.id, comment.post_id);
    success(InsertResult::inserted(comment.id))
}

/// GET /comments - List all comments.
pub async fn list_comments(State(state): State<AppState>) -> ApiResult<Vec<Comment>> {
    success(state.repo.list_comments().await?)
}

/// GET /comments/count/:postId - Count the comments on a post.
pub async fn count_comments(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> ApiResult<CommentCountResponse> {
    let comment_count = state.repo.count_comments_for_post(&post_id).await?;
    success(CommentCountResponse { comment_count })
}
