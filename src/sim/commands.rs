use std::collections::HashMap;
use std::sync;
use std::vec;

use crate::model::commands;

/// Records registered commands and menu groups, and can activate a command
/// the way a menu item would.
pub struct SimCommands {
    commands: parking_lot::Mutex<HashMap<String, commands::CommandSpec>>,
    menu_groups: parking_lot::Mutex<vec::Vec<(vec::Vec<String>, u32)>>,
}

impl SimCommands {
    pub fn new() -> sync::Arc<SimCommands> {
        sync::Arc::new(SimCommands {
            commands: parking_lot::Mutex::new(HashMap::new()),
            menu_groups: parking_lot::Mutex::new(vec::Vec::new()),
        })
    }

    /// Runs the command's execute callback. Returns false for unknown ids.
    /// The spec is taken out of the registry while it runs so the callback
    /// may register commands itself.
    pub fn execute(&self, id: &str) -> bool {
        let Some(spec) = self.commands.lock().remove(id) else {
            return false;
        };

        (spec.execute)();

        self.commands.lock().entry(id.to_string()).or_insert(spec);
        true
    }

    pub fn is_toggled(&self, id: &str) -> Option<bool> {
        self.commands.lock().get(id).map(|spec| (spec.is_toggled)())
    }

    pub fn label(&self, id: &str) -> Option<String> {
        self.commands.lock().get(id).map(|spec| spec.label.clone())
    }

    pub fn menu_groups(&self) -> vec::Vec<(vec::Vec<String>, u32)> {
        self.menu_groups.lock().clone()
    }
}

impl commands::CommandRegistry for SimCommands {
    fn add_command(&self, id: &str, spec: commands::CommandSpec) {
        self.commands.lock().insert(id.to_string(), spec);
    }

    fn add_settings_menu_group(&self, command_ids: &[&str], position: u32) {
        self.menu_groups.lock().push((
            command_ids.iter().map(|id| id.to_string()).collect(),
            position,
        ));
    }
}
