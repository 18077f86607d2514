//! Laminate remote transformation client.
//!
//! Implements [`pipeline::LayerTransformer`] over a JSON-over-HTTP protocol:
//! one `POST {base_url}/transform` per layer, carrying the layer id, the
//! code, and the run options, answered with the transformed code and a list
//! of improvement messages.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Request framing, timeouts, and status mapping live
//! here. The orchestrator sees only [`pipeline::LayerTransformer`]; pairing
//! this client with the local handlers is done with
//! [`pipeline::FallbackTransformer`] at the composition root.

pub mod client;
pub mod error;

pub use client::{RemoteConfig, RemoteTransformer, DEFAULT_TIMEOUT};
pub use error::RemoteError;
