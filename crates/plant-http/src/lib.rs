//! HTTP surface of the plant catalog backend.
//!
//! ```text
//!   request ─▶ trace ─▶ cors ─▶ catch-panic ─▶ router
//!                                              ├─ GET  /
//!                                              ├─ GET  /test-db          (non-production)
//!                                              ├─ /api/v1/plant          JSON CRUD
//!                                              └─ /api/v1/upload         multipart → temp dir → media host
//! ```

pub mod error;
pub mod extract;
pub mod response;
pub mod routes;
pub mod server;
pub mod state;
pub mod upload;

pub use error::{ApiError, ApiResult};
pub use server::{shutdown_signal, HttpServer};
pub use state::AppState;
