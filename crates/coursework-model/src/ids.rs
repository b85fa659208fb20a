//! Identifiers for assignment entities
//!
//! Every entity is keyed by a ULID assigned by the backend. The newtypes keep
//! parts, text boxes and upload slots from being confused with one another.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Ulid);

        impl $name {
            /// Generate a fresh identifier
            #[inline]
            #[must_use]
            pub fn new() -> Self {
                Self(Ulid::new())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ulid::DecodeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ulid::from_string(s).map(Self)
            }
        }
    };
}

entity_id!(
    /// Assignment identifier
    AssignmentId
);
entity_id!(
    /// Part identifier
    PartId
);
entity_id!(
    /// Text box identifier
    TextBoxId
);
entity_id!(
    /// Upload slot identifier
    UploadSlotId
);

/// Any independently savable field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum LeafId {
    /// A free-text answer
    TextBox(TextBoxId),
    /// A file upload slot
    UploadSlot(UploadSlotId),
}

impl From<TextBoxId> for LeafId {
    fn from(id: TextBoxId) -> Self {
        Self::TextBox(id)
    }
}

impl From<UploadSlotId> for LeafId {
    fn from(id: UploadSlotId) -> Self {
        Self::UploadSlot(id)
    }
}

impl fmt::Display for LeafId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TextBox(id) => write!(f, "text:{id}"),
            Self::UploadSlot(id) => write!(f, "upload:{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_roundtrip_through_strings() {
        let id = PartId::new();
        let parsed: PartId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn leaf_display_names_kind() {
        let text = TextBoxId::new();
        let leaf = LeafId::from(text);
        assert_eq!(leaf.to_string(), format!("text:{text}"));
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = UploadSlotId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
    }
}
