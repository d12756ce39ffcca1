use std::sync;
use std::sync::atomic::Ordering;

use futures::future::BoxFuture;

use crate::model::settings;
use crate::util;

struct SettingsState {
    values: parking_lot::Mutex<toml::value::Table>,
    changed: util::Signal<()>,
    fail_load: sync::atomic::AtomicBool,
}

/// Settings store whose loaded handle is the store itself: user values
/// overlay the built-in defaults, and every write emits the changed signal.
#[derive(Clone)]
pub struct SimSettings {
    state: sync::Arc<SettingsState>,
}

impl SimSettings {
    pub fn new() -> SimSettings {
        SimSettings {
            state: sync::Arc::new(SettingsState {
                values: parking_lot::Mutex::new(toml::value::Table::new()),
                changed: util::Signal::new(),
                fail_load: sync::atomic::AtomicBool::new(false),
            }),
        }
    }

    /// Pre-populates a user value without notifying anyone.
    pub fn seed(&self, key: &str, value: toml::Value) {
        self.state.values.lock().insert(key.to_string(), value);
    }

    /// Stores a user value and fires the changed signal.
    pub fn write(&self, key: &str, value: toml::Value) {
        self.state.values.lock().insert(key.to_string(), value);
        self.state.changed.emit(&());
    }

    pub fn fail_load(&self, fail: bool) {
        self.state.fail_load.store(fail, Ordering::Relaxed);
    }

    /// The handle `load` would produce, without the asynchronous hop.
    pub fn load_now(&self) -> sync::Arc<dyn settings::SettingsHandle> {
        sync::Arc::new(self.clone())
    }
}

impl settings::SettingsStore for SimSettings {
    fn load(
        &self,
        _plugin_id: &str,
    ) -> BoxFuture<'static, Result<sync::Arc<dyn settings::SettingsHandle>, settings::SettingsError>>
    {
        let store = self.clone();

        Box::pin(async move {
            tokio::task::yield_now().await;

            if store.state.fail_load.load(Ordering::Relaxed) {
                return Err(settings::SettingsError::Load(
                    "simulated load failure".to_string(),
                ));
            }

            Ok(store.load_now())
        })
    }
}

impl settings::SettingsHandle for SimSettings {
    fn composite(&self, key: &str) -> Option<toml::Value> {
        self.state
            .values
            .lock()
            .get(key)
            .cloned()
            .or_else(|| settings::DEFAULTS.get(key).cloned())
    }

    fn set(
        &self,
        key: &str,
        value: toml::Value,
    ) -> BoxFuture<'static, Result<(), settings::SettingsError>> {
        let store = self.clone();
        let key = key.to_string();

        Box::pin(async move {
            store.write(&key, value);
            Ok(())
        })
    }

    fn changed(&self) -> &util::Signal<()> {
        &self.state.changed
    }
}
