//! Application layer: rule compilation, menu evaluation, and file-browser operations.

pub mod fileops;
pub mod filter;
pub mod menu;
pub mod open_with;
pub mod paths;
pub mod project;
pub mod reload;
pub mod snapshot;
pub mod template;
