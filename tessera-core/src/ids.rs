//! Stable string identifiers
//!
//! Every persistable entity carries an id that is unique within its owning
//! table. Fresh ids are random v4 UUIDs; ids read from a document are kept
//! verbatim so cross references survive a save/load cycle.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Allocate a fresh random id
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Wrap an existing id string
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

define_id!(
    /// Identifier of a tree node
    NodeId
);
define_id!(
    /// Identifier of a presentation channel
    ChannelId
);
define_id!(
    /// Identifier of a media data descriptor
    MediaDataId
);
define_id!(
    /// Identifier of a data provider
    DataProviderId
);
define_id!(
    /// Identifier of a metadata entry
    MetadataId
);
define_id!(
    /// Identifier of a presentation within a project
    PresentationId
);
