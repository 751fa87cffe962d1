//! Request/response data model seen by the routing core.
//!
//! # Data Flow
//! ```text
//! HTTP connector
//!     → Request (resource reference split into base + remaining part)
//!     → routers consume matched prefixes, moving them into the base
//!     → target handler fills the Response (status, headers, entity)
//!     → HTTP connector converts the Response back
//! ```
//!
//! # Design Decisions
//! - The remaining part is derived from the base on demand, never stored
//! - Attributes are plain strings (template captures and extracted values)
//! - Statuses and headers reuse the `http` types re-exported by axum

pub mod reference;
pub mod request;
pub mod response;

pub use reference::Reference;
pub use request::Request;
pub use response::{Entity, Response};
