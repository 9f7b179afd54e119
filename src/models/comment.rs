//! Comment model.

use serde::{Deserialize, Serialize};

use super::{strip_reserved, Extra};

/// A comment attached to a post. Author info travels in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: String,
    pub post_id: String,
    pub content: String,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Request body for creating a comment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub post_id: String,
    pub content: String,
    #[serde(flatten)]
    pub extra: Extra,
}

impl CreateCommentRequest {
    pub fn sanitized_extra(&self) -> Extra {
        let mut extra = self.extra.clone();
        strip_reserved(&mut extra, &["_id"]);
        extra
    }
}
