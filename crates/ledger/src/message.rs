use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use guestbook_core::AccountId;

use crate::error::PostError;

/// Upper bound on message length, in characters.
pub const MAX_LENGTH: usize = 100;

/// One accepted guestbook entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub author: AccountId,
    pub text: String,
    pub posted_at: DateTime<Utc>,
}

/// Check message text against the posting rules, in order.
///
/// No trimming: only the zero-length string counts as empty. Length is
/// measured in Unicode scalar values so non-ASCII text gets the same budget.
pub fn validate_text(text: &str) -> Result<(), PostError> {
    if text.is_empty() {
        return Err(PostError::EmptyMessage);
    }

    let len = text.chars().count();
    if len > MAX_LENGTH {
        return Err(PostError::MessageTooLong {
            len,
            max: MAX_LENGTH,
        });
    }

    Ok(())
}
