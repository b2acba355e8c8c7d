//! Upstream document API
//!
//! The gateway talks to the document API through the [`DocumentSource`]
//! trait. [`HttpDocumentClient`] is the production implementation; tests and
//! embedders can supply their own.
//!
//! Every transport failure is translated into an [`UpstreamError`] at this
//! boundary, so callers never see `reqwest` types. A missing document is not
//! an error: `fetch_content` returns `Ok(None)`.
//!
//! [`UpstreamError`]: crate::error::UpstreamError

mod client;
mod source;

pub use client::HttpDocumentClient;
pub use source::{DocumentSource, missing_part_numbers};
