// Tessera Core Library
// Content model for structured multi-modal documents

pub mod error;
pub mod ids;
pub mod notification;
pub mod progress;
pub mod file_types;
pub mod factory;
pub mod data_provider;
pub mod media_data;
pub mod media;
pub mod channel;
pub mod property;
pub mod channels_property;
pub mod tree;
pub mod metadata;
pub mod command;
pub mod commands;
pub mod presentation;
pub mod project;
pub mod serialization;
pub mod capture;

pub use channel::{Channel, ChannelKind};
pub use command::{Command, CompositeCommand, UndoRedoManager};
pub use error::{Error, Result};
pub use factory::{FactoryRegistry, QualifiedName};
pub use ids::{ChannelId, DataProviderId, MediaDataId, MetadataId, NodeId, PresentationId};
pub use media::Media;
pub use media_data::{MediaData, MediaDataKind, MediaDataRef, PcmFormat};
pub use metadata::MetadataEntry;
pub use notification::{Change, Notification, NotificationBus};
pub use presentation::Presentation;
pub use progress::ProgressNotifier;
pub use project::Project;
pub use serialization::{LoadOptions, LoadedProject, SaveSettings};
