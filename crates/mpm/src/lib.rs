//! MPM TUI - Library modules
//!
//! This library provides the terminal front end for managing live MySQL
//! sessions through the process-manager backend.
//!
//! # Architecture
//!
//! The TUI uses an event-driven architecture:
//!
//! 1. **Keyboard Task**: Polls for keyboard input and sends events to the main loop
//! 2. **Poll Timer Task**: Emits a tick every poll interval while polling is live
//! 3. **Request Tasks**: One per backend call, reporting results as events
//! 4. **Main Event Loop**: Applies events through the [`Controller`] and renders the UI
//!
//! All tasks respect a shared `CancellationToken` for graceful shutdown.

pub mod app;
pub mod client;
pub mod config;
pub mod controller;
pub mod dispatch;
pub mod error;
pub mod input;
pub mod poll;
pub mod ui;

// Re-export commonly used types
pub use app::App;
pub use client::{Backend, BackendClient};
pub use config::{Config, ConfigOverrides, Credentials};
pub use controller::{Controller, Flow};
pub use dispatch::Dispatcher;
pub use error::{Result, TuiError};
pub use input::Event;
