#![deny(unsafe_code)]

/// Composition root wiring the repository, directory and presenters together.
pub mod app;
pub mod events;
/// Screen-level presenters over the messaging core.
pub mod presenter;
pub mod seed;
/// Settings persistence.
pub mod settings;
pub mod users;
