use std::sync;
use std::vec;

use futures::future::BoxFuture;

use crate::util;

static NEXT_NODE_ID: sync::atomic::AtomicU64 = sync::atomic::AtomicU64::new(1);

/// Identity token for a node in the shell's UI tree. Stable for as long as
/// the owning surface stays open; used as the instrumentation key.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct NodeId(u64);

impl NodeId {
    pub fn allocate() -> NodeId {
        NodeId(NEXT_NODE_ID.fetch_add(1, sync::atomic::Ordering::Relaxed))
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Region {
    Main,
    Side,
    Bottom,
}

/// The shell announces new panels from independent sources; the tracker
/// subscribes to both.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PanelSource {
    Notebook,
    Editor,
}

/// A node stopped holding input focus. `related_target` is the node gaining
/// focus next, when the shell knows it; `None` means focus left the window
/// or landed somewhere unfocusable.
#[derive(Clone, Copy, Debug)]
pub struct FocusLossEvent {
    pub current_target: NodeId,
    pub related_target: Option<NodeId>,
}

/// An open surface in the shell. Owned by the shell; the tracker only holds
/// non-owning references while the panel stays open.
pub trait Panel: Send + Sync {
    fn node(&self) -> NodeId;
    fn title(&self) -> String;

    /// Emitted when the panel's root node loses input focus.
    fn focus_lost(&self) -> &util::Signal<FocusLossEvent>;
}

pub trait Shell: Send + Sync {
    fn panels(&self, region: Region) -> vec::Vec<sync::Arc<dyn Panel>>;

    fn panel_added(&self, source: PanelSource) -> &util::Signal<sync::Arc<dyn Panel>>;

    /// Fires when a panel closes, carrying its root node. Listeners must
    /// tolerate nodes they never instrumented.
    fn panel_removed(&self) -> &util::Signal<NodeId>;

    /// Structural containment in the UI tree. A node contains itself.
    fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool;

    /// Resolves once the shell has finished restoring its layout.
    fn restored(&self) -> BoxFuture<'static, ()>;
}
