//! Tag model

use serde::{Deserialize, Serialize};

use super::TagId;

/// A tag for organizing entries, check-ins, and conversations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Unique identifier
    pub id: TagId,
    /// Owning user identifier
    pub user_id: String,
    /// Tag name (stored in lowercase)
    pub name: String,
    /// How many records currently reference this tag
    pub usage_count: i64,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// True when created by the user, false for built-in suggestions
    pub is_user_created: bool,
    /// Optional display color (hex string)
    pub color: Option<String>,
    /// Optional description
    pub description: Option<String>,
}

impl Tag {
    /// Create a new user tag with the given name
    ///
    /// The name is automatically converted to lowercase.
    #[must_use]
    pub fn new(user_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: TagId::new(),
            user_id: user_id.into(),
            name: name.into().to_lowercase(),
            usage_count: 0,
            created_at: chrono::Utc::now().timestamp_millis(),
            is_user_created: true,
            color: None,
            description: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_new_lowercase() {
        let tag = Tag::new("user-1", "Gratitude");
        assert_eq!(tag.name, "gratitude");
        assert!(tag.is_user_created);
        assert_eq!(tag.usage_count, 0);
    }
}
