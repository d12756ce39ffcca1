use std::fmt;
use std::sync;

use futures::future::BoxFuture;

use crate::model::shell;

#[derive(Debug)]
pub enum SaveError {
    Disposed,
    Io(std::io::Error),
    Other(String),
}

impl fmt::Display for SaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveError::Disposed => write!(f, "document context was disposed"),
            SaveError::Io(e) => write!(f, "i/o error: {}", e),
            SaveError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for SaveError {}

/// Persistable-resource handle bound to a document-backed panel. Lifecycle
/// is controlled by the external document manager; the handle may become
/// disposed at any suspension point.
pub trait Context: Send + Sync {
    fn path(&self) -> String;
    fn is_disposed(&self) -> bool;
    fn save(&self) -> BoxFuture<'static, Result<(), SaveError>>;
}

pub trait DocumentManager: Send + Sync {
    /// A panel qualifies as a document panel iff this returns Some.
    fn context_for(&self, panel: &dyn shell::Panel) -> Option<sync::Arc<dyn Context>>;
}
