//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Apply → Start health engine → Start watcher
//!
//! Shutdown (shutdown.rs):
//!     Ctrl+C received → Broadcast → Background tasks exit
//! ```

pub mod shutdown;

pub use shutdown::{wait_for_signal, Shutdown};
