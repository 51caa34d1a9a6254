//! Persisted resources backing the semantic and notation models.
//!
//! A [`Resource`] receives the serialized model on every save and is only
//! held for the duration of that call. The CLI writes files; embedding
//! callers and tests use [`MemoryResource`].

use std::{cell::RefCell, io, rc::Rc};

use thiserror::Error;

/// Failure to persist a model.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to serialize model: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Destination of a persisted model.
pub trait Resource {
    /// Human-readable name used in logs and errors.
    fn name(&self) -> &str;

    /// Replaces the stored contents.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the contents could not be stored.
    fn save(&mut self, contents: &str) -> io::Result<()>;
}

#[derive(Debug, Default)]
struct MemoryState {
    contents: Option<String>,
    saves: usize,
    fail: bool,
}

/// In-memory resource.
///
/// Clones share the same storage, so a clone kept by the caller observes
/// every save made through the one handed to a manager.
///
/// # Examples
///
/// ```
/// use lockstep::resource::{MemoryResource, Resource};
///
/// let resource = MemoryResource::new("model");
/// let mut handle = resource.clone();
/// handle.save("name = \"demo\"").unwrap();
///
/// assert_eq!(resource.saves(), 1);
/// assert_eq!(resource.contents().as_deref(), Some("name = \"demo\""));
/// ```
#[derive(Debug, Clone)]
pub struct MemoryResource {
    name: String,
    state: Rc<RefCell<MemoryState>>,
}

impl MemoryResource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Rc::default(),
        }
    }

    /// Makes every following save fail (or succeed again).
    pub fn set_failing(&self, fail: bool) {
        self.state.borrow_mut().fail = fail;
    }

    /// Last saved contents.
    pub fn contents(&self) -> Option<String> {
        self.state.borrow().contents.clone()
    }

    /// Number of successful saves.
    pub fn saves(&self) -> usize {
        self.state.borrow().saves
    }
}

impl Resource for MemoryResource {
    fn name(&self) -> &str {
        &self.name
    }

    fn save(&mut self, contents: &str) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        if state.fail {
            return Err(io::Error::other(format!("resource `{}` rejected the save", self.name)));
        }
        state.contents = Some(contents.to_string());
        state.saves += 1;
        Ok(())
    }
}
