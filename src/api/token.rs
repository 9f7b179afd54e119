//! Token issuing endpoint.

use axum::{extract::State, Json};

use super::{success, ApiResult};
use crate::auth::TokenResponse;
use crate::models::Extra;
use crate::AppState;

/// POST /jwt - Sign the posted claims into a bearer token.
pub async fn issue_token(
    State(state): State<AppState>,
    Json(claims): Json<Extra>,
) -> ApiResult<TokenResponse> {
    let token = state.tokens.issue(claims)?;
    success(TokenResponse { token })
}
