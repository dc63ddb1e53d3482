//! HTTP API for replacing the served zone.
//!
//! # API Endpoints
//!
//! ## `/healthcheck` (GET)
//!
//!   Returns HTTP 200 (OK) and the JSON body `{"ok":"healthy"}` when the service is operational.
//!
//! ## `/zone` (GET)
//!
//!   Returns the active zone:
//!
//!   ```json
//!   {
//!     "generation": 3,
//!     "installed_at": "2023-05-01T12:00:00Z",
//!     "records": [ { "name": "abc.com.", "ttl": 60, "type": "A", "value": "1.2.3.4" } ],
//!     "zone": "abc.com. 60 A 1.2.3.4"
//!   }
//!   ```
//!
//! ## `/zone` (PUT)
//!
//!   Replaces the zone with the zone text in the request body, one record per line:
//!
//!   ```bash
//!   ❯ curl -X PUT --data-binary $'abc.com. 60 A 1.2.3.4\ntest.com. 60 A 1.2.3.4' \
//!      http://localhost:3000/zone
//!   {"generation":2,"records":2}
//!   ```
//!
//! ## `/challenge/http01` (POST)
//!
//!   Replaces the zone with one `A` record per domain, all pointing at `ip`:
//!
//!   ```json
//!   { "domains": ["abc.com", "test.com"], "ip": "1.2.3.4" }
//!   ```
//!
//! ## `/challenge/dns01` (POST)
//!
//!   Replaces the zone with one `TXT` record per entry at `_acme-challenge.<domain>`:
//!
//!   ```json
//!   { "entries": [ { "domain": "abc.com", "token": "LPsIwTo7o8BoG0-vjCyGQGBWSVIPxI-i_X336eUOQZo" } ] }
//!   ```
//!
//!   With [`Config::strict_dns01`][crate::config::Config::strict_dns01] set, each `token` must
//!   be a valid [RFC-8555][RFC-8555] [DNS-01] challenge response.
//!
//! The zone-changing endpoints only accept requests from source addresses inside a
//! [`Config::api_acl`][crate::config::Config::api_acl] network, answer HTTP 403 (Forbidden)
//! otherwise, and HTTP 400 (Bad Request) for invalid zones. Each update replaces the whole zone
//! and returns the new generation. Invalid updates change nothing.
//!
//! [RFC-8555]: https://www.rfc-editor.org/rfc/rfc8555
//! [DNS-01]: https://www.rfc-editor.org/rfc/rfc8555#section-8.4

mod api_error;
mod model;
mod routes;
pub mod server;

pub use server::new;
