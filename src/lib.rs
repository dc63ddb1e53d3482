//! acmezone
//!
//! A minimal authoritative DNS responder for automating [ACME][RFC-8555] domain validation.
//!
//! acmezone publishes `A` records for [HTTP-01] challenges or `TXT` records for [DNS-01]
//! challenges, for whatever set of domains the ACME automation hands it. The published record
//! set can be replaced at any time through the [HTTP API][crate::api] or
//! [`Controller::update_zone`] while the [DNS listener][crate::dns] keeps answering: a query
//! is always answered entirely from the zone as it was before an update, or entirely from the
//! zone after it.
//!
//! [RFC-8555]: https://www.rfc-editor.org/rfc/rfc8555
//! [HTTP-01]: https://www.rfc-editor.org/rfc/rfc8555#section-8.3
//! [DNS-01]: https://www.rfc-editor.org/rfc/rfc8555#section-8.4
//!
#![warn(clippy::pedantic)]

pub mod api;
pub mod config;
pub mod controller;
pub mod dns;
pub mod error;
pub mod zone;

pub use api::new as new_http;
pub use config::{Config, SharedConfig};
pub use controller::Controller;
pub use zone::{build_dns_challenge_zone, build_http_challenge_zone, Snapshot, ZoneStore};
