//! TUI module for terminal user interfaces

mod dashboard;

pub use dashboard::run_with_dashboard;
