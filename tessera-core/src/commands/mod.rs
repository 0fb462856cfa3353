//! Command implementations for presentation editing
//!
//! This module contains the concrete commands that can be executed through
//! [`Presentation::execute`](crate::presentation::Presentation::execute).
//! Compose several of them with [`CompositeCommand`](crate::command::CompositeCommand).

pub mod channels;
pub mod import_media;
pub mod insert_node;
pub mod metadata;
pub mod move_node;
pub mod properties;
pub mod remove_node;
pub mod set_media;

pub use channels::{AddChannelCommand, RemoveChannelCommand, RenameChannelCommand};
pub use import_media::{ImportMediaCommand, ImportSource};
pub use insert_node::InsertNodeCommand;
pub use metadata::SetMetadataCommand;
pub use move_node::MoveNodeCommand;
pub use properties::{RemovePropertyCommand, SetPropertyCommand};
pub use remove_node::RemoveNodeCommand;
pub use set_media::SetMediaCommand;
