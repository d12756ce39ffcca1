use std::collections::HashMap;
use std::sync;
use std::sync::atomic::Ordering;

use futures::future::BoxFuture;

use crate::model::document;
use crate::model::shell;

struct ContextState {
    path: String,
    disposed: sync::atomic::AtomicBool,
    failing: sync::atomic::AtomicBool,
    saves: sync::atomic::AtomicUsize,
}

/// Scriptable document context: saves count up, can be told to fail, and
/// can be disposed out from under an in-flight save.
#[derive(Clone)]
pub struct SimContext {
    state: sync::Arc<ContextState>,
}

impl SimContext {
    fn new(path: &str) -> SimContext {
        SimContext {
            state: sync::Arc::new(ContextState {
                path: path.to_string(),
                disposed: sync::atomic::AtomicBool::new(false),
                failing: sync::atomic::AtomicBool::new(false),
                saves: sync::atomic::AtomicUsize::new(0),
            }),
        }
    }

    pub fn save_count(&self) -> usize {
        self.state.saves.load(Ordering::Relaxed)
    }

    pub fn dispose(&self) {
        self.state.disposed.store(true, Ordering::Relaxed);
    }

    pub fn fail_saves(&self, failing: bool) {
        self.state.failing.store(failing, Ordering::Relaxed);
    }
}

impl document::Context for SimContext {
    fn path(&self) -> String {
        self.state.path.clone()
    }

    fn is_disposed(&self) -> bool {
        self.state.disposed.load(Ordering::Relaxed)
    }

    fn save(&self) -> BoxFuture<'static, Result<(), document::SaveError>> {
        let state = self.state.clone();

        Box::pin(async move {
            /* model the write suspension point */
            tokio::task::yield_now().await;

            if state.disposed.load(Ordering::Relaxed) {
                return Err(document::SaveError::Disposed);
            }
            if state.failing.load(Ordering::Relaxed) {
                return Err(document::SaveError::Other(
                    "simulated save failure".to_string(),
                ));
            }

            state.saves.fetch_add(1, Ordering::Relaxed);
            Ok(())
        })
    }
}

pub struct SimDocumentManager {
    contexts: parking_lot::Mutex<HashMap<shell::NodeId, SimContext>>,
}

impl SimDocumentManager {
    pub fn new() -> sync::Arc<SimDocumentManager> {
        sync::Arc::new(SimDocumentManager {
            contexts: parking_lot::Mutex::new(HashMap::new()),
        })
    }

    /// Associates a context with a panel root node, making that panel a
    /// document panel.
    pub fn bind(&self, node: shell::NodeId, path: &str) -> SimContext {
        let context = SimContext::new(path);
        self.contexts.lock().insert(node, context.clone());
        context
    }

    pub fn unbind(&self, node: shell::NodeId) {
        self.contexts.lock().remove(&node);
    }
}

impl document::DocumentManager for SimDocumentManager {
    fn context_for(&self, panel: &dyn shell::Panel) -> Option<sync::Arc<dyn document::Context>> {
        self.contexts
            .lock()
            .get(&panel.node())
            .map(|context| sync::Arc::new(context.clone()) as sync::Arc<dyn document::Context>)
    }
}
