//! Data models for the TagTalk platform.
//!
//! Documents keep the fields the service queries on as typed members and carry every
//! other client-supplied field verbatim in a flattened `extra` map.

mod comment;
mod payment;
mod post;
mod results;
mod user;

pub use comment::*;
pub use payment::*;
pub use post::*;
pub use results::*;
pub use user::*;

use serde_json::{Map, Value};

/// Free-form document fields stored and returned untouched.
pub type Extra = Map<String, Value>;

/// Drop server-owned keys a client tried to smuggle in through the extra fields.
pub(crate) fn strip_reserved(extra: &mut Extra, reserved: &[&str]) {
    for key in reserved {
        extra.remove(*key);
    }
}
