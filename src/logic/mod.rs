pub mod exclude;
pub mod tracker;
pub mod settings;
