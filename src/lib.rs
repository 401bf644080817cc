//! The HTTP request-handling core of the Waarp Gateway: a per-connection
//! protocol engine that turns parsed HTTP messages into dispatched
//! application actions (the page engine and the REST engine) and turns
//! their results back into HTTP responses with correct keep-alive,
//! cookie, and session-continuity semantics.
//!
//! See [`engine::ProtocolEngine`] for the per-connection state machine,
//! [`page`] and [`rest`] for the two dispatch engines, and [`multipart`]
//! for the streaming body decoder.

// ----------

pub use wgk_core::{body, http, request, response};
pub(crate) use wgk_core::{BoxedError, BoxedFuture, StdError};
pub(crate) use thiserror::Error as ImplError;

// --------------------------------------------------------------------------------

pub mod config;
pub mod cookie;
pub mod engine;
pub mod error;
pub mod multipart;
pub mod page;
pub mod rest;
pub mod server;
pub mod session;
pub mod static_files;

mod response_builder;
pub use response_builder::ResponseBuilder;

// --------------------------------------------------------------------------------
