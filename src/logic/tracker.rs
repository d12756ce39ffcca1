use std::collections::HashMap;
use std::sync;
use std::sync::atomic::Ordering;
use std::vec;

use tracing::{event, Level};

use crate::logic::exclude;
use crate::model::document;
use crate::model::settings;
use crate::model::shell;
use crate::util;

struct Tracked {
    panel: sync::Arc<dyn shell::Panel>,
    focus_subscription: util::SubscriptionId,
}

struct Subscriptions {
    notebook_added: util::SubscriptionId,
    editor_added: util::SubscriptionId,
    panel_removed: util::SubscriptionId,
}

/// Reacts to focus changes of all open document panels and saves the panel
/// that lost focus, subject to the exclusion list and the intra-panel focus
/// policy. Instrumentation follows the shell's panel lifecycle and the live
/// settings.
pub struct FocusSaveTracker {
    shell: sync::Arc<dyn shell::Shell>,
    documents: sync::Arc<dyn document::DocumentManager>,
    rt: tokio::runtime::Handle,

    /* for handing listener closures a handle back to the tracker */
    self_weak: sync::Weak<FocusSaveTracker>,

    tracked: parking_lot::Mutex<HashMap<shell::NodeId, Tracked>>,
    exclude: arc_swap::ArcSwap<exclude::ExcludeMatcher>,
    subscriptions: parking_lot::Mutex<Option<Subscriptions>>,

    /* mirror the last applied snapshot; not independently mutable */
    save_on_cell_focus_change: sync::atomic::AtomicBool,
    save_on_window_blur: sync::atomic::AtomicBool,
    active: sync::atomic::AtomicBool,
}

impl FocusSaveTracker {
    pub fn new(
        shell: sync::Arc<dyn shell::Shell>,
        documents: sync::Arc<dyn document::DocumentManager>,
        rt: tokio::runtime::Handle,
    ) -> sync::Arc<FocusSaveTracker> {
        sync::Arc::new_cyclic(|self_weak| FocusSaveTracker {
            shell,
            documents,
            rt,

            self_weak: self_weak.clone(),

            tracked: parking_lot::Mutex::new(HashMap::new()),
            exclude: arc_swap::ArcSwap::from_pointee(exclude::ExcludeMatcher::empty()),
            subscriptions: parking_lot::Mutex::new(None),

            save_on_cell_focus_change: sync::atomic::AtomicBool::new(false),
            save_on_window_blur: sync::atomic::AtomicBool::new(true),
            active: sync::atomic::AtomicBool::new(false),
        })
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked.lock().len()
    }

    /// All open document panels in the shell's main area. A panel qualifies
    /// iff the document manager resolves a context for it. With
    /// `include_already_tracked` false, panels already in the tracking set
    /// are skipped so instrumentation is never doubled.
    pub fn document_panels(
        &self,
        include_already_tracked: bool,
    ) -> vec::Vec<sync::Arc<dyn shell::Panel>> {
        let mut panels = vec::Vec::new();

        for panel in self.shell.panels(shell::Region::Main) {
            if !include_already_tracked && self.tracked.lock().contains_key(&panel.node()) {
                continue;
            }
            if self.documents.context_for(&*panel).is_none() {
                continue;
            }
            panels.push(panel);
        }

        panels
    }

    /// Instruments every untracked document panel. Idempotent: the
    /// enumeration already excludes tracked panels.
    pub fn track_all(&self) {
        for panel in self.document_panels(false) {
            let node = panel.node();

            let weak = self.self_weak.clone();
            let focus_subscription = panel.focus_lost().connect(move |focus_event| {
                if let Some(tracker) = weak.upgrade() {
                    tracker.handle_focus_loss(focus_event);
                }
            });

            self.tracked.lock().insert(
                node,
                Tracked {
                    panel,
                    focus_subscription,
                },
            );
        }

        event!(
            Level::DEBUG,
            "tracking {} document panels",
            self.tracked.lock().len()
        );
    }

    /// Detaches every focus-loss listener and empties the tracking set.
    /// Safe to call when nothing is tracked.
    pub fn untrack_all(&self) {
        for panel in self.document_panels(true) {
            if let Some(entry) = self.tracked.lock().remove(&panel.node()) {
                entry.panel.focus_lost().disconnect(entry.focus_subscription);
            }
        }

        /* Entries for panels that already closed are no longer enumerable
         * above; the set empties wholesale either way. */
        self.tracked.lock().clear();

        event!(Level::DEBUG, "untracked all document panels");
    }

    /// Removal hook for a single closing panel, so the tracking set never
    /// outlives the panels it refers to.
    pub fn untrack_panel(&self, node: shell::NodeId) {
        if let Some(entry) = self.tracked.lock().remove(&node) {
            entry.panel.focus_lost().disconnect(entry.focus_subscription);
        }
    }

    /// Maps a focus-loss event to the tracked panel that should be saved,
    /// or None when the event is intra-panel noise (focus moved to a
    /// descendant, e.g. another notebook cell) or a window blur the
    /// configuration ignores.
    pub fn resolve_panel(
        &self,
        focus_event: &shell::FocusLossEvent,
    ) -> Option<sync::Arc<dyn shell::Panel>> {
        match focus_event.related_target {
            Some(related) => {
                if !self.save_on_cell_focus_change.load(Ordering::Relaxed)
                    && self.shell.is_ancestor(focus_event.current_target, related)
                {
                    return None;
                }
            }
            None => {
                if !self.save_on_window_blur.load(Ordering::Relaxed) {
                    return None;
                }
            }
        }

        self.tracked
            .lock()
            .get(&focus_event.current_target)
            .map(|entry| entry.panel.clone())
    }

    fn handle_focus_loss(&self, focus_event: &shell::FocusLossEvent) {
        if let Some(panel) = self.resolve_panel(focus_event) {
            self.save_if_eligible(&*panel);
        }
    }

    /// Dispatches an asynchronous save for the panel's context unless the
    /// context is missing, disposed, or excluded. Failures are logged and
    /// never propagate.
    pub fn save_if_eligible(&self, panel: &dyn shell::Panel) {
        let Some(context) = self.documents.context_for(panel) else {
            return;
        };
        if context.is_disposed() {
            return;
        }

        let path = context.path();
        if self.exclude.load().matches(&path) {
            event!(Level::DEBUG, "{} is excluded from autosave", path);
            return;
        }

        self.rt.spawn(async move {
            /* the context may have been torn down between dispatch and here */
            if context.is_disposed() {
                return;
            }

            match context.save().await {
                Ok(()) => event!(Level::DEBUG, "saved {}", path),
                Err(e) => event!(Level::DEBUG, "failed to save {}: {:?}", path, e),
            }
        });
    }

    /// Saves every open document panel. Saves are independent; one panel's
    /// failure never blocks another's.
    pub fn save_all_open_documents(&self) {
        for panel in self.document_panels(true) {
            self.save_if_eligible(&*panel);
        }
    }

    /// Applies a settings snapshot: rebuilds the exclusion matcher, flushes
    /// a save of everything open under the new settings, then brings the
    /// instrumentation in line with the active flag. On a pattern error the
    /// previous matcher and instrumentation stay in force.
    pub fn reconfigure(&self, snapshot: &settings::Snapshot) -> Result<(), exclude::PatternError> {
        let matcher = exclude::ExcludeMatcher::build(&snapshot.exclude)?;
        event!(Level::DEBUG, "exclusion pattern: {}", matcher.pattern());

        self.exclude.store(sync::Arc::new(matcher));
        self.save_on_cell_focus_change
            .store(snapshot.save_on_cell_focus_change, Ordering::Relaxed);
        self.save_on_window_blur
            .store(snapshot.save_on_window_blur, Ordering::Relaxed);

        /* flush before any instrumentation change, so these saves observe
         * exactly the settings that triggered them */
        self.save_all_open_documents();

        if snapshot.active {
            self.track_all();
            self.subscribe_panel_events();
        } else {
            self.untrack_all();
            self.unsubscribe_panel_events();
        }
        self.active.store(snapshot.active, Ordering::Relaxed);

        Ok(())
    }

    fn subscribe_panel_events(&self) {
        let mut subscriptions = self.subscriptions.lock();
        if subscriptions.is_some() {
            /* already subscribed; re-subscribing would double-track */
            return;
        }

        let notebook_added = {
            let weak = self.self_weak.clone();
            self.shell
                .panel_added(shell::PanelSource::Notebook)
                .connect(move |_panel| {
                    if let Some(tracker) = weak.upgrade() {
                        tracker.track_all();
                    }
                })
        };

        let editor_added = {
            let weak = self.self_weak.clone();
            self.shell
                .panel_added(shell::PanelSource::Editor)
                .connect(move |_panel| {
                    if let Some(tracker) = weak.upgrade() {
                        tracker.track_all();
                    }
                })
        };

        let panel_removed = {
            let weak = self.self_weak.clone();
            self.shell.panel_removed().connect(move |node| {
                if let Some(tracker) = weak.upgrade() {
                    tracker.untrack_panel(*node);
                }
            })
        };

        *subscriptions = Some(Subscriptions {
            notebook_added,
            editor_added,
            panel_removed,
        });
    }

    fn unsubscribe_panel_events(&self) {
        if let Some(subscriptions) = self.subscriptions.lock().take() {
            self.shell
                .panel_added(shell::PanelSource::Notebook)
                .disconnect(subscriptions.notebook_added);
            self.shell
                .panel_added(shell::PanelSource::Editor)
                .disconnect(subscriptions.editor_added);
            self.shell
                .panel_removed()
                .disconnect(subscriptions.panel_removed);
        }
    }
}
