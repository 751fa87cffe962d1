//! HTTP connector subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace, timeout)
//!     → request.rs (absolute URI, entity, headers → Request)
//!     → routing core on a blocking thread (server Router → hosts → routes)
//!     → response.rs (Response → status, headers, body)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::HttpServer;
