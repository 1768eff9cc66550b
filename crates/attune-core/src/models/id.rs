//! Entity identifier newtypes

/// Defines a UUID v7 (time-sortable) identifier newtype with the common
/// string conversions used across the data model.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            serde::Serialize,
            serde::Deserialize,
        )]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Create a new unique identifier using UUID v7
            #[must_use]
            pub fn new() -> Self {
                Self(uuid::Uuid::now_v7())
            }

            /// Get the string representation of this ID
            #[must_use]
            pub fn as_str(&self) -> String {
                self.0.to_string()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(uuid::Uuid::parse_str(s)?))
            }
        }
    };
}

define_id! {
    /// A unique identifier for a mood check-in
    CheckInId
}

define_id! {
    /// A unique identifier for a journal entry
    EntryId
}

define_id! {
    /// A unique identifier for a chat conversation
    ConversationId
}

define_id! {
    /// A unique identifier for a chat message
    MessageId
}

define_id! {
    /// A unique identifier for a tag
    TagId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_unique() {
        assert_ne!(CheckInId::new(), CheckInId::new());
        assert_ne!(EntryId::new(), EntryId::new());
    }

    #[test]
    fn test_id_roundtrip() {
        let id = ConversationId::new();
        let parsed: ConversationId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_id_serializes_as_string() {
        let id = TagId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
    }
}
