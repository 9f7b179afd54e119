//! Write results and small response bodies.
//!
//! The write results keep the shape of the document-store driver results that
//! existing clients read (`insertedId`, `matchedCount`, ...).

use serde::Serialize;

/// Outcome of inserting a document.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InsertResult {
    pub acknowledged: bool,
    pub inserted_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl InsertResult {
    pub fn inserted(id: String) -> Self {
        Self {
            acknowledged: true,
            inserted_id: Some(id),
            message: None,
        }
    }

    /// Marker returned when registration finds an existing user.
    pub fn already_exists() -> Self {
        Self {
            acknowledged: false,
            inserted_id: None,
            message: Some("user already exists".to_string()),
        }
    }
}

/// Outcome of an update (or upsert).
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_id: Option<String>,
}

impl UpdateResult {
    pub fn matched(modified_count: u64) -> Self {
        Self {
            acknowledged: true,
            matched_count: 1,
            modified_count,
            upserted_id: None,
        }
    }

    pub fn upserted(id: String) -> Self {
        Self {
            acknowledged: true,
            matched_count: 0,
            modified_count: 0,
            upserted_id: Some(id),
        }
    }
}

/// Outcome of a delete.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

/// Document count.
#[derive(Debug, Clone, Serialize)]
pub struct CountResponse {
    pub count: i64,
}

/// Comment count for one post.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentCountResponse {
    pub comment_count: i64,
}

/// Whether the caller holds the admin role.
#[derive(Debug, Clone, Serialize)]
pub struct AdminStatus {
    pub admin: bool,
}
