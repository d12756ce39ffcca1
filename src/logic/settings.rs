use std::sync;

use tracing::{event, Level};

use crate::logic::tracker;
use crate::model::commands;
use crate::model::settings;
use crate::model::shell;
use crate::util;

pub const PLUGIN_ID: &str = "blotter:autosave";
pub const TOGGLE_ACTIVE_COMMAND_ID: &str = "blotter:toggle-active";

/* slot in the settings menu, right before the interval-autosave group */
const SETTINGS_MENU_POSITION: u32 = 4;

/// Feeds the tracker from the settings store: performs the initial load
/// once the shell has restored, reapplies on every change notification, and
/// exposes a menu command for toggling the active flag.
pub struct SettingsAdapter {
    shell: sync::Arc<dyn shell::Shell>,
    store: sync::Arc<dyn settings::SettingsStore>,
    commands: sync::Arc<dyn commands::CommandRegistry>,
    tracker: sync::Arc<tracker::FocusSaveTracker>,
    rt: tokio::runtime::Handle,

    self_weak: sync::Weak<SettingsAdapter>,

    handle: parking_lot::Mutex<Option<sync::Arc<dyn settings::SettingsHandle>>>,
    changed_subscription: parking_lot::Mutex<Option<util::SubscriptionId>>,
}

impl SettingsAdapter {
    pub fn new(
        shell: sync::Arc<dyn shell::Shell>,
        store: sync::Arc<dyn settings::SettingsStore>,
        commands: sync::Arc<dyn commands::CommandRegistry>,
        tracker: sync::Arc<tracker::FocusSaveTracker>,
        rt: tokio::runtime::Handle,
    ) -> sync::Arc<SettingsAdapter> {
        sync::Arc::new_cyclic(|self_weak| SettingsAdapter {
            shell,
            store,
            commands,
            tracker,
            rt,

            self_weak: self_weak.clone(),

            handle: parking_lot::Mutex::new(None),
            changed_subscription: parking_lot::Mutex::new(None),
        })
    }

    /// Reads the composite settings into a snapshot, falling back to the
    /// built-in defaults for missing or mistyped values.
    pub fn parse(handle: &dyn settings::SettingsHandle) -> settings::Snapshot {
        let defaults = settings::Snapshot::default();

        settings::Snapshot {
            active: composite_bool(handle, "active", defaults.active),
            exclude: composite_string_list(handle, "exclude", defaults.exclude),
            save_on_cell_focus_change: composite_bool(
                handle,
                "save_on_cell_focus_change",
                defaults.save_on_cell_focus_change,
            ),
            save_on_window_blur: composite_bool(
                handle,
                "save_on_window_blur",
                defaults.save_on_window_blur,
            ),
        }
    }

    fn apply(&self, handle: &dyn settings::SettingsHandle) {
        let snapshot = Self::parse(handle);
        event!(Level::DEBUG, "applying settings: {:?}", snapshot);

        if let Err(e) = self.tracker.reconfigure(&snapshot) {
            event!(
                Level::ERROR,
                "keeping previous autosave configuration: {:?}",
                e
            );
        }
    }

    /// Loads the settings once the shell has restored, applies them, and
    /// keeps following change notifications. This call starts the whole
    /// component; a load failure is logged and leaves the tracker in its
    /// prior state.
    pub async fn track_setting_changes(self: sync::Arc<Self>) {
        let restored = self.shell.restored();
        let loaded = self.store.load(PLUGIN_ID);

        let ((), loaded) = futures::future::join(restored, loaded).await;
        let handle = match loaded {
            Ok(handle) => handle,
            Err(e) => {
                event!(
                    Level::ERROR,
                    "something went wrong when reading the settings: {:?}",
                    e
                );
                return;
            }
        };

        self.apply(&*handle);
        *self.handle.lock() = Some(handle.clone());

        let subscription = {
            let weak = self.self_weak.clone();
            handle.changed().connect(move |()| {
                if let Some(adapter) = weak.upgrade() {
                    let handle = adapter.handle.lock().clone();
                    if let Some(handle) = handle {
                        adapter.apply(&*handle);
                    }
                }
            })
        };
        *self.changed_subscription.lock() = Some(subscription);

        self.add_toggle_command();
    }

    fn add_toggle_command(&self) {
        let is_toggled = {
            let tracker = self.tracker.clone();
            Box::new(move || tracker.is_active())
        };

        let execute = {
            let weak = self.self_weak.clone();
            Box::new(move || {
                if let Some(adapter) = weak.upgrade() {
                    adapter.toggle_active();
                }
            })
        };

        self.commands.add_command(
            TOGGLE_ACTIVE_COMMAND_ID,
            commands::CommandSpec {
                label: "Autosave Documents on Focus Change".to_string(),
                is_toggled,
                execute,
            },
        );
        self.commands
            .add_settings_menu_group(&[TOGGLE_ACTIVE_COMMAND_ID], SETTINGS_MENU_POSITION);
    }

    /// Writes the flipped active flag back through the store; the change
    /// notification then reconfigures the tracker.
    pub fn toggle_active(&self) {
        let Some(handle) = self.handle.lock().clone() else {
            return;
        };

        let write = handle.set("active", toml::Value::Boolean(!self.tracker.is_active()));
        self.rt.spawn(async move {
            if let Err(e) = write.await {
                event!(
                    Level::ERROR,
                    "something went wrong when changing the settings: {:?}",
                    e
                );
            }
        });
    }
}

impl Drop for SettingsAdapter {
    fn drop(&mut self) {
        let handle = self.handle.lock().clone();
        let subscription = self.changed_subscription.lock().take();

        if let (Some(handle), Some(subscription)) = (handle, subscription) {
            handle.changed().disconnect(subscription);
        }
    }
}

fn composite_bool(handle: &dyn settings::SettingsHandle, key: &str, fallback: bool) -> bool {
    match handle.composite(key) {
        Some(toml::Value::Boolean(value)) => value,
        Some(other) => {
            event!(
                Level::ERROR,
                "setting {} has unexpected type (got {:?})",
                key,
                other
            );
            fallback
        }
        None => fallback,
    }
}

fn composite_string_list(
    handle: &dyn settings::SettingsHandle,
    key: &str,
    fallback: Vec<String>,
) -> Vec<String> {
    match handle.composite(key) {
        Some(toml::Value::Array(values)) => values
            .into_iter()
            .filter_map(|value| match value {
                toml::Value::String(entry) => Some(entry),
                other => {
                    event!(
                        Level::ERROR,
                        "ignoring non-string entry in setting {} (got {:?})",
                        key,
                        other
                    );
                    None
                }
            })
            .collect(),
        Some(other) => {
            event!(
                Level::ERROR,
                "setting {} has unexpected type (got {:?})",
                key,
                other
            );
            fallback
        }
        None => fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    use crate::logic::tracker::FocusSaveTracker;
    use crate::model::settings::SettingsHandle;
    use crate::model::shell::PanelSource;
    use crate::sim;

    struct Fixture {
        shell: sync::Arc<sim::SimShell>,
        documents: sync::Arc<sim::SimDocumentManager>,
        store: sim::SimSettings,
        commands: sync::Arc<sim::SimCommands>,
        tracker: sync::Arc<tracker::FocusSaveTracker>,
        adapter: sync::Arc<SettingsAdapter>,
    }

    fn fixture() -> Fixture {
        let shell = sim::SimShell::new();
        let documents = sim::SimDocumentManager::new();
        let store = sim::SimSettings::new();
        let commands = sim::SimCommands::new();
        let rt = tokio::runtime::Handle::current();

        let tracker = FocusSaveTracker::new(shell.clone(), documents.clone(), rt.clone());
        let adapter = SettingsAdapter::new(
            shell.clone(),
            sync::Arc::new(store.clone()),
            commands.clone(),
            tracker.clone(),
            rt,
        );

        Fixture {
            shell,
            documents,
            store,
            commands,
            tracker,
            adapter,
        }
    }

    impl Fixture {
        fn open_document(
            &self,
            source: PanelSource,
            title: &str,
            path: &str,
        ) -> (sync::Arc<sim::SimPanel>, sim::SimContext) {
            let node = self.shell.create_node(None);
            let context = self.documents.bind(node, path);
            let panel = self.shell.open_panel_at(source, title, node);
            (panel, context)
        }
    }

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn parse_overlays_store_values_on_defaults() {
        let f = fixture();
        f.store.seed("active", toml::Value::Boolean(false));
        f.store.seed(
            "exclude",
            toml::Value::Array(vec![toml::Value::String("*.tmp".to_string())]),
        );

        let handle = f.store.load_now();
        let snapshot = SettingsAdapter::parse(&*handle);

        assert_eq!(
            snapshot,
            settings::Snapshot {
                active: false,
                exclude: vec!["*.tmp".to_string()],
                save_on_cell_focus_change: false,
                save_on_window_blur: true,
            }
        );
    }

    #[tokio::test]
    async fn mistyped_values_fall_back_to_defaults() {
        let f = fixture();
        f.store
            .seed("active", toml::Value::String("yes".to_string()));
        f.store.seed("exclude", toml::Value::Boolean(true));

        let handle = f.store.load_now();
        let snapshot = SettingsAdapter::parse(&*handle);

        assert_eq!(snapshot, settings::Snapshot::default());
    }

    #[tokio::test]
    async fn startup_applies_settings_and_registers_the_toggle() {
        let f = fixture();
        f.store.seed(
            "exclude",
            toml::Value::Array(vec![toml::Value::String("*.scratch".to_string())]),
        );
        let (_panel, _ctx) = f.open_document(PanelSource::Notebook, "a", "a.ipynb");

        f.adapter.clone().track_setting_changes().await;

        assert!(f.tracker.is_active());
        assert_eq!(f.tracker.tracked_count(), 1);
        assert_eq!(f.commands.is_toggled(TOGGLE_ACTIVE_COMMAND_ID), Some(true));
        assert_eq!(
            f.commands.menu_groups(),
            vec![(vec![TOGGLE_ACTIVE_COMMAND_ID.to_string()], 4)]
        );
    }

    #[tokio::test]
    async fn settings_changes_reconfigure_the_tracker() {
        let f = fixture();
        let (_panel, _ctx) = f.open_document(PanelSource::Notebook, "a", "a.ipynb");

        f.adapter.clone().track_setting_changes().await;
        assert_eq!(f.tracker.tracked_count(), 1);

        f.store.write("active", toml::Value::Boolean(false));
        settle().await;

        assert!(!f.tracker.is_active());
        assert_eq!(f.tracker.tracked_count(), 0);
    }

    #[tokio::test]
    async fn toggle_command_flips_and_persists_the_active_flag() {
        let f = fixture();
        let (_panel, _ctx) = f.open_document(PanelSource::Notebook, "a", "a.ipynb");

        f.adapter.clone().track_setting_changes().await;
        assert!(f.tracker.is_active());

        assert!(f.commands.execute(TOGGLE_ACTIVE_COMMAND_ID));
        settle().await;

        assert!(!f.tracker.is_active());
        assert_eq!(f.tracker.tracked_count(), 0);
        assert_eq!(f.commands.is_toggled(TOGGLE_ACTIVE_COMMAND_ID), Some(false));
        assert_eq!(
            f.store.load_now().composite("active"),
            Some(toml::Value::Boolean(false))
        );

        assert!(f.commands.execute(TOGGLE_ACTIVE_COMMAND_ID));
        settle().await;

        assert!(f.tracker.is_active());
        assert_eq!(f.tracker.tracked_count(), 1);
    }

    #[tokio::test]
    async fn load_failure_leaves_the_tracker_in_its_prior_state() {
        let f = fixture();
        f.store.fail_load(true);
        let (_panel, _ctx) = f.open_document(PanelSource::Notebook, "a", "a.ipynb");

        f.adapter.clone().track_setting_changes().await;

        assert!(!f.tracker.is_active());
        assert_eq!(f.tracker.tracked_count(), 0);
        assert!(f.commands.is_toggled(TOGGLE_ACTIVE_COMMAND_ID).is_none());
    }
}
