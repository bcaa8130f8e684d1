//! Blocking client for the Workfront (AtTask) REST API.
//!
//! # Overview
//! The API is session-based REST: every call is a path plus a query string
//! carrying the session id, the method, and the call's parameters, and every
//! response is a JSON envelope holding either `data` or `error`.
//!
//! # Design
//! - `Client` owns the session id and the batch queue; all operations take
//!   `&mut self` and run synchronously.
//! - URI preparation (`uri`) and envelope handling (`envelope`) are pure
//!   functions, so the whole request path is testable without a network.
//! - The network is reached only through the `Transport` trait;
//!   `UreqTransport` is the default.
//! - Calls made between `batch_start` and `batch_end` return
//!   `Outcome::Queued` and travel to the server as one batch request.

pub mod batch;
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod http;
pub mod outcome;
pub mod uri;

pub use batch::BatchQueue;
pub use client::Client;
pub use config::ClientConfig;
pub use error::{Result, WorkfrontError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use outcome::Outcome;
pub use uri::{prepare, ParamValue, Params};
