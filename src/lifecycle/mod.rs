//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     trigger → broadcast → server stops accepting → in-flight calls drain
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//! ```
//!
//! # Design Decisions
//! - One broadcast channel; every long-running task subscribes
//! - Routers are stopped after the server has drained

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
