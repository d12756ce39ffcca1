use std::collections::HashMap;
use std::sync;
use std::vec;

use futures::future::BoxFuture;

use crate::model::shell;
use crate::util;

pub struct SimPanel {
    node: shell::NodeId,
    title: String,
    focus_lost: util::Signal<shell::FocusLossEvent>,
}

impl SimPanel {
    /// Scripts a focus-loss event on the panel's root node.
    pub fn blur(&self, related_target: Option<shell::NodeId>) {
        self.focus_lost.emit(&shell::FocusLossEvent {
            current_target: self.node,
            related_target,
        });
    }
}

impl shell::Panel for SimPanel {
    fn node(&self) -> shell::NodeId {
        self.node
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn focus_lost(&self) -> &util::Signal<shell::FocusLossEvent> {
        &self.focus_lost
    }
}

/// Shell with a flat main area and an explicit parent-link node tree.
pub struct SimShell {
    parents: parking_lot::Mutex<HashMap<shell::NodeId, Option<shell::NodeId>>>,
    panels: parking_lot::Mutex<vec::Vec<sync::Arc<SimPanel>>>,

    notebook_added: util::Signal<sync::Arc<dyn shell::Panel>>,
    editor_added: util::Signal<sync::Arc<dyn shell::Panel>>,
    panel_removed: util::Signal<shell::NodeId>,
}

impl SimShell {
    pub fn new() -> sync::Arc<SimShell> {
        sync::Arc::new(SimShell {
            parents: parking_lot::Mutex::new(HashMap::new()),
            panels: parking_lot::Mutex::new(vec::Vec::new()),

            notebook_added: util::Signal::new(),
            editor_added: util::Signal::new(),
            panel_removed: util::Signal::new(),
        })
    }

    pub fn create_node(&self, parent: Option<shell::NodeId>) -> shell::NodeId {
        let node = shell::NodeId::allocate();
        self.parents.lock().insert(node, parent);
        node
    }

    pub fn open_panel(&self, source: shell::PanelSource, title: &str) -> sync::Arc<SimPanel> {
        let node = self.create_node(None);
        self.open_panel_at(source, title, node)
    }

    /// Opens a panel rooted at an existing node and announces it on the
    /// given source. The announcement runs after the panel is listed, so
    /// handlers re-entering `panels` observe it.
    pub fn open_panel_at(
        &self,
        source: shell::PanelSource,
        title: &str,
        node: shell::NodeId,
    ) -> sync::Arc<SimPanel> {
        let panel = sync::Arc::new(SimPanel {
            node,
            title: title.to_string(),
            focus_lost: util::Signal::new(),
        });

        self.panels.lock().push(panel.clone());

        let as_panel: sync::Arc<dyn shell::Panel> = panel.clone();
        match source {
            shell::PanelSource::Notebook => self.notebook_added.emit(&as_panel),
            shell::PanelSource::Editor => self.editor_added.emit(&as_panel),
        }

        panel
    }

    pub fn close_panel(&self, panel: &SimPanel) {
        self.panels.lock().retain(|open| open.node != panel.node);
        self.panel_removed.emit(&panel.node);
    }
}

impl shell::Shell for SimShell {
    fn panels(&self, region: shell::Region) -> vec::Vec<sync::Arc<dyn shell::Panel>> {
        match region {
            shell::Region::Main => self
                .panels
                .lock()
                .iter()
                .map(|panel| panel.clone() as sync::Arc<dyn shell::Panel>)
                .collect(),
            _ => vec::Vec::new(),
        }
    }

    fn panel_added(
        &self,
        source: shell::PanelSource,
    ) -> &util::Signal<sync::Arc<dyn shell::Panel>> {
        match source {
            shell::PanelSource::Notebook => &self.notebook_added,
            shell::PanelSource::Editor => &self.editor_added,
        }
    }

    fn panel_removed(&self) -> &util::Signal<shell::NodeId> {
        &self.panel_removed
    }

    fn is_ancestor(&self, ancestor: shell::NodeId, node: shell::NodeId) -> bool {
        let parents = self.parents.lock();

        let mut current = Some(node);
        while let Some(candidate) = current {
            if candidate == ancestor {
                return true;
            }
            current = parents.get(&candidate).copied().flatten();
        }

        false
    }

    fn restored(&self) -> BoxFuture<'static, ()> {
        Box::pin(futures::future::ready(()))
    }
}
