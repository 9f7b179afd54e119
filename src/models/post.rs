//! Post model and the requests that create and vote on posts.

use serde::{Deserialize, Serialize};

use super::{strip_reserved, Extra};

/// Keys owned by the server; ignored when a client sends them on create.
const RESERVED_KEYS: &[&str] = &[
    "_id",
    "createdAt",
    "upVote",
    "downVote",
    "votedBy",
    "popularity",
];

/// A user's post with its vote tallies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: String,
    /// Author email
    pub email: String,
    pub tag: String,
    pub content: String,
    pub created_at: String,
    pub up_vote: i64,
    pub down_vote: i64,
    /// Emails of everyone who voted, in vote order
    #[serde(default)]
    pub voted_by: Vec<String>,
    /// upVote - downVote, only present on the popularity ranking
    #[serde(skip_serializing_if = "Option::is_none")]
    pub popularity: Option<i64>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Request body for creating a new post.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub email: String,
    pub tag: String,
    pub content: String,
    #[serde(flatten)]
    pub extra: Extra,
}

impl CreatePostRequest {
    /// Client fields to persist, without the ones the server stamps itself.
    pub fn sanitized_extra(&self) -> Extra {
        let mut extra = self.extra.clone();
        strip_reserved(&mut extra, RESERVED_KEYS);
        extra
    }
}

/// Direction of a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteDirection::Up => "up",
            VoteDirection::Down => "down",
        }
    }

    /// Counter column this direction increments.
    pub fn counter_column(&self) -> &'static str {
        match self {
            VoteDirection::Up => "up_vote",
            VoteDirection::Down => "down_vote",
        }
    }
}

/// Request body for up/down voting.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VoteRequest {
    #[serde(default)]
    pub email: Option<String>,
}

impl VoteRequest {
    /// Parse a vote body. A missing or malformed body reads as an empty
    /// request, which then fails the voter check.
    pub fn from_body(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    /// The voter email, if one was supplied and is not blank.
    pub fn voter(&self) -> Option<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }
}

/// Pagination parameters for the post listing.
///
/// Values are kept as raw strings so that garbage falls back to the defaults
/// instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
}

impl PageQuery {
    pub const DEFAULT_PAGE: i64 = 0;
    pub const DEFAULT_SIZE: i64 = 5;

    pub fn page(&self) -> i64 {
        parse_positive(self.page.as_deref()).unwrap_or(Self::DEFAULT_PAGE)
    }

    pub fn size(&self) -> i64 {
        parse_positive(self.size.as_deref()).unwrap_or(Self::DEFAULT_SIZE)
    }
}

fn parse_positive(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|n| *n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_query_defaults() {
        let query = PageQuery::default();
        assert_eq!(query.page(), 0);
        assert_eq!(query.size(), 5);
    }

    #[test]
    fn test_page_query_garbage_falls_back() {
        let query = PageQuery {
            page: Some("abc".to_string()),
            size: Some("0".to_string()),
        };
        assert_eq!(query.page(), 0);
        assert_eq!(query.size(), 5);

        let query = PageQuery {
            page: Some("-2".to_string()),
            size: Some("-1".to_string()),
        };
        assert_eq!(query.page(), 0);
        assert_eq!(query.size(), 5);
    }

    #[test]
    fn test_page_query_explicit() {
        let query = PageQuery {
            page: Some("2".to_string()),
            size: Some("10".to_string()),
        };
        assert_eq!(query.page(), 2);
        assert_eq!(query.size(), 10);
    }

    #[test]
    fn test_create_request_strips_reserved_keys() {
        let request: CreatePostRequest = serde_json::from_value(json!({
            "email": "a@b.com",
            "tag": "rust",
            "content": "hello",
            "title": "Hi",
            "upVote": 99,
            "votedBy": ["x@y.com"],
            "_id": "forged"
        }))
        .unwrap();

        let extra = request.sanitized_extra();
        assert_eq!(extra.get("title"), Some(&json!("Hi")));
        assert!(!extra.contains_key("upVote"));
        assert!(!extra.contains_key("votedBy"));
        assert!(!extra.contains_key("_id"));
    }

    #[test]
    fn test_blank_voter_is_missing() {
        let request = VoteRequest {
            email: Some("   ".to_string()),
        };
        assert_eq!(request.voter(), None);
        assert_eq!(VoteRequest::default().voter(), None);
    }

    #[test]
    fn test_vote_request_from_loose_body() {
        assert_eq!(VoteRequest::from_body(b"").voter(), None);
        assert_eq!(VoteRequest::from_body(b"not json").voter(), None);
        assert_eq!(
            VoteRequest::from_body(br#"{"email":"bob@example.com"}"#).voter(),
            Some("bob@example.com")
        );
    }
}
