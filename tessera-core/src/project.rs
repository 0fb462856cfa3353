//! Project: a collection of presentations
//!
//! The project owns its presentations and a bus of its own. Notifications
//! of every presentation bubble to the project bus once the presentation's
//! local listeners ran.

use crate::error::{Error, Result};
use crate::factory::FactoryRegistry;
use crate::ids::PresentationId;
use crate::notification::{Change, NotificationBus};
use crate::presentation::Presentation;
use crate::progress::ProgressNotifier;
use crate::serialization::{self, LoadOptions, LoadedProject, SaveSettings};
use std::path::Path;

#[derive(Debug, Default)]
pub struct Project {
    presentations: Vec<Presentation>,
    bus: NotificationBus,
}

impl Project {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a presentation; its id must be new to the project
    pub fn add_presentation(&mut self, presentation: Presentation) -> Result<PresentationId> {
        let id = presentation.id().clone();
        if self.get(&id).is_some() {
            return Err(Error::structural(format!("duplicate presentation id {}", id)));
        }
        presentation.bus().set_parent(Some(self.bus.clone()));
        self.presentations.push(presentation);
        self.bus.emit(Change::PresentationAdded { id: id.clone() });
        Ok(id)
    }

    /// Release a presentation; it stops bubbling to the project bus
    pub fn remove_presentation(&mut self, id: &PresentationId) -> Result<Presentation> {
        let index = self
            .presentations
            .iter()
            .position(|p| p.id() == id)
            .ok_or_else(|| Error::not_found(format!("presentation {}", id)))?;
        let presentation = self.presentations.remove(index);
        presentation.bus().set_parent(None);
        self.bus.emit(Change::PresentationRemoved { id: id.clone() });
        Ok(presentation)
    }

    pub fn get(&self, id: &PresentationId) -> Option<&Presentation> {
        self.presentations.iter().find(|p| p.id() == id)
    }

    pub fn get_mut(&mut self, id: &PresentationId) -> Option<&mut Presentation> {
        self.presentations.iter_mut().find(|p| p.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Presentation> {
        self.presentations.iter()
    }

    pub fn len(&self) -> usize {
        self.presentations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presentations.is_empty()
    }

    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }

    /// Whether any presentation has unsaved changes
    pub fn is_dirty(&self) -> bool {
        self.presentations.iter().any(Presentation::is_dirty)
    }

    /// Write the project to `path`, then mark every presentation clean
    pub fn save(&self, path: &Path, settings: &SaveSettings) -> Result<()> {
        serialization::save_project(self, path, settings)
    }

    /// Read a project written by [`save`](Self::save)
    pub fn load(
        path: &Path,
        options: &LoadOptions,
        registry: &FactoryRegistry,
        progress: &mut ProgressNotifier,
    ) -> Result<LoadedProject> {
        serialization::load_project(path, options, registry, progress)
    }
}

impl PartialEq for Project {
    fn eq(&self, other: &Self) -> bool {
        self.presentations == other.presentations
    }
}
