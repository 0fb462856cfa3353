//! Metadata command
//!
//! One command type covers the three metadata edits: adding an entry,
//! removing one, and changing an entry's content.

use crate::command::Command;
use crate::error::{Error, Result};
use crate::ids::MetadataId;
use crate::metadata::MetadataEntry;
use crate::presentation::Presentation;

enum Edit {
    Add { entry: MetadataEntry },
    Remove { id: MetadataId, removed: Option<(usize, MetadataEntry)> },
    Content { id: MetadataId, content: String, previous: Option<String> },
}

pub struct SetMetadataCommand {
    edit: Edit,
}

impl SetMetadataCommand {
    /// Append a new entry
    pub fn add(entry: MetadataEntry) -> Self {
        Self {
            edit: Edit::Add { entry },
        }
    }

    pub fn remove(id: MetadataId) -> Self {
        Self {
            edit: Edit::Remove { id, removed: None },
        }
    }

    /// Replace the content of an existing entry
    pub fn set_content(id: MetadataId, content: impl Into<String>) -> Self {
        Self {
            edit: Edit::Content {
                id,
                content: content.into(),
                previous: None,
            },
        }
    }
}

impl Command for SetMetadataCommand {
    fn apply(&mut self, presentation: &mut Presentation) -> Result<()> {
        match &mut self.edit {
            Edit::Add { entry } => {
                presentation.add_metadata(entry.clone())?;
            }
            Edit::Remove { id, removed } => {
                *removed = Some(presentation.remove_metadata(id)?);
            }
            Edit::Content { id, content, previous } => {
                *previous = Some(presentation.set_metadata_content(id, content)?);
            }
        }
        Ok(())
    }

    fn invert(&mut self, presentation: &mut Presentation) -> Result<()> {
        match &mut self.edit {
            Edit::Add { entry } => {
                presentation.remove_metadata(entry.id())?;
            }
            Edit::Remove { removed, .. } => {
                let (index, entry) = removed
                    .clone()
                    .ok_or_else(|| Error::structural("metadata removal was never applied"))?;
                presentation.insert_metadata(index, entry)?;
                *removed = None;
            }
            Edit::Content { id, previous, .. } => {
                let content = previous
                    .clone()
                    .ok_or_else(|| Error::structural("metadata change was never applied"))?;
                presentation.set_metadata_content(id, &content)?;
                *previous = None;
            }
        }
        Ok(())
    }

    fn description(&self) -> String {
        match &self.edit {
            Edit::Add { entry } => format!("Add {} metadata", entry.name),
            Edit::Remove { .. } => "Remove metadata".to_string(),
            Edit::Content { .. } => "Change metadata".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_edits_undo() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = Presentation::new("Test", dir.path().join("data"));
        let title = MetadataEntry::new("dc:title", "Draft");
        let title_id = title.id().clone();
        let creator = MetadataEntry::new("dc:creator", "Someone");
        let creator_id = creator.id().clone();

        p.execute(Box::new(SetMetadataCommand::add(title))).unwrap();
        p.execute(Box::new(SetMetadataCommand::add(creator))).unwrap();
        p.execute(Box::new(SetMetadataCommand::set_content(title_id.clone(), "Final")))
            .unwrap();
        assert_eq!(p.metadata().get(&title_id).unwrap().content, "Final");

        p.execute(Box::new(SetMetadataCommand::remove(title_id.clone()))).unwrap();
        assert_eq!(p.metadata().len(), 1);

        p.undo().unwrap();
        // Back in its original slot
        assert_eq!(p.metadata().iter().next().unwrap().id(), &title_id);
        p.undo().unwrap();
        assert_eq!(p.metadata().get(&title_id).unwrap().content, "Draft");
        p.undo().unwrap();
        assert!(p.metadata().get(&creator_id).is_none());
    }
}
