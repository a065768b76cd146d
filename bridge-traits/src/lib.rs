//! # Host Bridge Traits
//!
//! Platform abstraction traits that each host must implement before the
//! offline cache can run.
//!
//! ## Overview
//!
//! The offline cache never talks to the network or the filesystem directly.
//! It asks for a capability through one of the traits below, and the host
//! hands in a concrete adapter (desktop adapters live in `bridge-desktop`).
//!
//! ## Traits
//!
//! ### Networking & I/O
//! - [`HttpClient`](http::HttpClient) - Async HTTP GET of raw audio/image bytes
//! - [`FileSystemAccess`](storage::FileSystemAccess) - App directories and file writes used by export
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source so download timestamps are testable
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Adapters should
//! convert platform errors into it and keep the offending URL or path in the
//! message.
//!
//! ## Thread Safety
//!
//! Every trait requires `Send + Sync` so adapters can be shared behind `Arc`
//! across tokio tasks.
//!
//! ## Example
//!
//! ```ignore
//! use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
//! use bridge_traits::error::Result;
//! use async_trait::async_trait;
//!
//! pub struct MyHttpClient {
//!     client: reqwest::Client,
//! }
//!
//! #[async_trait]
//! impl HttpClient for MyHttpClient {
//!     async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
//!         todo!()
//!     }
//! }
//! ```

pub mod error;
pub mod http;
pub mod storage;
pub mod time;

pub use error::BridgeError;

pub use http::{HttpClient, HttpRequest, HttpResponse};
pub use storage::FileSystemAccess;
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, SystemClock};
