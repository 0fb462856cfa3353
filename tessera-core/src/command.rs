//! Command system for undo/redo
//!
//! Every undoable edit is a [`Command`]: it knows how to apply itself to a
//! [`Presentation`] and how to invert that again. The presentation owns an
//! [`UndoRedoManager`] holding the two history stacks; commands enter it
//! through [`Presentation::execute`] and move between the stacks through
//! [`Presentation::undo`] and [`Presentation::redo`].
//!
//! ## Failure model
//!
//! A command whose `apply` or `invert` fails must leave the presentation as
//! it found it. The presentation then leaves both stacks exactly as they
//! were before the call. [`CompositeCommand`] upholds this for sequences by
//! unwinding the part that already ran.
//!
//! ## Reentrancy
//!
//! Only one command is in flight per manager. A command that tries to
//! execute, undo or redo another command on the same presentation while it
//! runs is rejected.

use crate::error::{Error, Result};
use crate::presentation::Presentation;

/// A reversible edit
pub trait Command: Send {
    /// Apply the edit
    fn apply(&mut self, presentation: &mut Presentation) -> Result<()>;

    /// Revert a previous `apply`
    fn invert(&mut self, presentation: &mut Presentation) -> Result<()>;

    /// Human-readable description (for UI display)
    fn description(&self) -> String;
}

/// Ordered sequence of commands applied and reverted as one
///
/// Applying runs the sub-commands in list order; inverting runs their
/// inverses in reverse list order.
pub struct CompositeCommand {
    description: String,
    commands: Vec<Box<dyn Command>>,
}

impl CompositeCommand {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            commands: Vec::new(),
        }
    }

    pub fn with_commands(description: impl Into<String>, commands: Vec<Box<dyn Command>>) -> Self {
        Self {
            description: description.into(),
            commands,
        }
    }

    pub fn push(&mut self, command: Box<dyn Command>) {
        self.commands.push(command);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Command for CompositeCommand {
    fn apply(&mut self, presentation: &mut Presentation) -> Result<()> {
        for index in 0..self.commands.len() {
            if let Err(e) = self.commands[index].apply(presentation) {
                for applied in self.commands[..index].iter_mut().rev() {
                    if let Err(unwind) = applied.invert(presentation) {
                        log::warn!(
                            "Unwinding {:?} after a failed step also failed: {}",
                            applied.description(),
                            unwind
                        );
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }

    fn invert(&mut self, presentation: &mut Presentation) -> Result<()> {
        for index in (0..self.commands.len()).rev() {
            if let Err(e) = self.commands[index].invert(presentation) {
                for inverted in self.commands[index + 1..].iter_mut() {
                    if let Err(unwind) = inverted.apply(presentation) {
                        log::warn!(
                            "Re-applying {:?} after a failed inversion also failed: {}",
                            inverted.description(),
                            unwind
                        );
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }

    fn description(&self) -> String {
        self.description.clone()
    }
}

/// Undo and redo stacks of one presentation
#[derive(Default)]
pub struct UndoRedoManager {
    /// Executed commands (for undo)
    undo_stack: Vec<Box<dyn Command>>,

    /// Undone commands (for redo)
    redo_stack: Vec<Box<dyn Command>>,

    /// Oldest entries are dropped beyond this depth; `None` keeps everything
    max_depth: Option<usize>,

    /// Set while a command is applying or inverting
    in_flight: bool,
}

impl UndoRedoManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Description of the next command to undo
    pub fn undo_description(&self) -> Option<String> {
        self.undo_stack.last().map(|c| c.description())
    }

    /// Description of the next command to redo
    pub fn redo_description(&self) -> Option<String> {
        self.redo_stack.last().map(|c| c.description())
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Limit the undo history; trims the oldest entries right away
    pub fn set_max_depth(&mut self, depth: Option<usize>) {
        self.max_depth = depth;
        self.trim();
    }

    /// Drop all history
    pub fn clear_history(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    fn trim(&mut self) {
        if let Some(depth) = self.max_depth {
            if self.undo_stack.len() > depth {
                let remove_count = self.undo_stack.len() - depth;
                self.undo_stack.drain(0..remove_count);
            }
        }
    }

    pub(crate) fn begin(&mut self) -> Result<()> {
        if self.in_flight {
            log::warn!("Rejected a command issued while another command is in flight");
            return Err(Error::structural("another command is already in flight"));
        }
        self.in_flight = true;
        Ok(())
    }

    pub(crate) fn end(&mut self) {
        self.in_flight = false;
    }

    /// Record a newly executed command; starts a new redo branch
    pub(crate) fn push_executed(&mut self, command: Box<dyn Command>) {
        self.redo_stack.clear();
        self.undo_stack.push(command);
        self.trim();
    }

    pub(crate) fn pop_undo(&mut self) -> Result<Box<dyn Command>> {
        self.undo_stack
            .pop()
            .ok_or_else(|| Error::not_found("nothing to undo"))
    }

    pub(crate) fn pop_redo(&mut self) -> Result<Box<dyn Command>> {
        self.redo_stack
            .pop()
            .ok_or_else(|| Error::not_found("nothing to redo"))
    }

    pub(crate) fn push_undo(&mut self, command: Box<dyn Command>) {
        self.undo_stack.push(command);
        self.trim();
    }

    pub(crate) fn push_redo(&mut self, command: Box<dyn Command>) {
        self.redo_stack.push(command);
    }
}

impl std::fmt::Debug for UndoRedoManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UndoRedoManager")
            .field("undo", &self.undo_stack.iter().map(|c| c.description()).collect::<Vec<_>>())
            .field("redo", &self.redo_stack.iter().map(|c| c.description()).collect::<Vec<_>>())
            .field("max_depth", &self.max_depth)
            .field("in_flight", &self.in_flight)
            .finish()
    }
}
