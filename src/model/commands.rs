/// Callbacks backing one registered command. `is_toggled` feeds the menu
/// checkmark; `execute` runs on activation.
pub struct CommandSpec {
    pub label: String,
    pub is_toggled: Box<dyn Fn() -> bool + Send + Sync>,
    pub execute: Box<dyn Fn() + Send + Sync>,
}

pub trait CommandRegistry: Send + Sync {
    fn add_command(&self, id: &str, spec: CommandSpec);

    /// Inserts a group of already-registered commands into the settings
    /// menu at the given position.
    fn add_settings_menu_group(&self, command_ids: &[&str], position: u32);
}
