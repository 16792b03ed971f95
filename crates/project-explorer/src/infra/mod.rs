//! Infrastructure adapters for settings files, the clipboard, and launching processes.

pub mod clipboard;
pub mod launcher;
pub mod settings;
