//! REST API module.
//!
//! Handlers answer with the bare JSON document or write result; failures go out
//! through [`AppError`]'s error envelope.

mod comments;
mod payments;
mod posts;
mod token;
mod users;

pub use comments::*;
pub use payments::*;
pub use posts::*;
pub use token::*;
pub use users::*;

use axum::Json;

use crate::errors::AppError;

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<Json<T>, AppError>;

/// Create a successful API response.
pub fn success<T>(data: T) -> ApiResult<T> {
    Ok(Json(data))
}
