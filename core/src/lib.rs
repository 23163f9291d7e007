//! Odoo XML-RPC client core.
//!
//! # Overview
//! Talks to an Odoo ERP over its `/xmlrpc/2/*` API: encodes values into
//! `methodCall` documents, decodes `methodResponse` trees back into
//! [`Value`]s, and wraps the three calls the dashboard and storefront need
//! (`authenticate`, `search_read`, `create`) on top of a generic RPC call.
//!
//! # Design
//! - [`OdooClient`] is immutable connection context; each operation is split
//!   into `build_*` (produces an [`HttpRequest`]) and `parse_*` (consumes an
//!   [`HttpResponse`]) so the wire format is testable without a network.
//! - A [`Transport`] runs the round-trip. [`UreqTransport`] (feature `ureq`)
//!   is the blocking default; callers with their own HTTP stack implement
//!   the trait or drive `build_*`/`parse_*` themselves.
//! - Every failure surfaces as an [`RpcError`]; nothing is retried.
//! - [`session::login`] and [`batch::read_in_chunks`] are the calling-layer
//!   workflows built on the client.

pub mod batch;
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod http;
pub mod query;
pub mod session;
#[cfg(feature = "ureq")]
pub mod transport;
pub mod value;
pub mod xml;

pub use client::OdooClient;
pub use error::RpcError;
pub use http::{decode_body, HttpRequest, HttpResponse, Transport};
pub use query::{Domain, SearchOptions};
pub use session::Session;
#[cfg(feature = "ureq")]
pub use transport::{TransportConfig, UreqTransport};
pub use value::{Struct, Value};
