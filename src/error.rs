//! Error types.

use axum::extract::rejection::JsonRejection;
use std::net::{IpAddr, SocketAddr};
use trust_dns_proto::error::ProtoError;

/// Error enumerates the possible acmezone error states.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Returned by the [zone builder][crate::zone::builder] and the zone text parser when a
    /// domain is empty or is not a valid DNS name.
    #[error("invalid domain \"{0}\"")]
    InvalidDomain(String),

    /// Returned when an HTTP-01 challenge address, or the value of an `A` record in zone text,
    /// is not a valid IPv4 literal.
    #[error("invalid IPv4 address \"{0}\"")]
    InvalidIp(String),

    /// Returned when a DNS-01 token can't be carried inside a quoted TXT value: it contains a
    /// quote, a backslash, a control or non-ASCII character, or is longer than 255 bytes.
    #[error("invalid TXT token for \"{domain}\": {reason}")]
    InvalidToken { domain: String, reason: &'static str },

    /// Returned by the [`/challenge/dns01` API endpoint][crate::api#challengedns01-post] when
    /// [`Config::strict_dns01`][crate::config::Config::strict_dns01] is set and a token isn't a
    /// valid [RFC-8555][RFC-8555] [DNS-01] challenge response value.
    ///
    /// These values MUST be a BASE64 encoded 32 byte SHA256 digest.
    ///
    /// [RFC-8555]: https://www.rfc-editor.org/rfc/rfc8555
    /// [DNS-01]: https://www.rfc-editor.org/rfc/rfc8555#section-8.4
    #[error("TXT value for \"{0}\" is not a valid DNS-01 challenge response")]
    InvalidDNS01(String),

    /// Returned when zone text can't be parsed. `line` is 1-based.
    #[error("zone text line {line}: {reason}")]
    ZoneParse { line: usize, reason: String },

    /// Returned when zone text names a record type other than `A` or `TXT`.
    #[error("zone text line {line}: unsupported record type \"{rtype}\"")]
    UnsupportedRecordType { line: usize, rtype: String },

    /// Returned by [`Listener::start`][crate::dns::server::Listener::start] when the UDP socket
    /// can't be bound, e.g. because the port is already in use. Never retried.
    #[error("failed to bind DNS socket on {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Returned when [`Listener::start`][crate::dns::server::Listener::start] is called while
    /// the listener is already running or draining.
    #[error("DNS listener is already running")]
    AlreadyRunning,

    /// Returned when clients call a zone-mutating API endpoint from a source IP address that
    /// isn't in a [`Config::api_acl`][crate::config::Config::api_acl] network.
    #[error("IP {0} is not authorized to update the zone")]
    AuthForbidden(IpAddr),

    /// Returned when clients `POST` invalid JSON.
    #[error(transparent)]
    JsonExtractorRejection(#[from] JsonRejection),

    /// Returned when the [`Config::api_bind_addr`][crate::config::Config::api_bind_addr] is
    /// not a loopback address, or an address within a private network space. The
    /// [HTTP API][crate::api] can replace every record served, so it must only be reachable
    /// from private networks.
    #[error("API bind address ({0}) must be a loopback or private IP")]
    InsecureAPIBind(IpAddr),

    /// Returned when a generic IO error occurs.
    #[error("an IO error occurred")]
    IO(#[from] std::io::Error),

    /// Returned when processing JSON from disk (e.g.
    /// [trying to load a `Config`][crate::config::Config::try_from_file]) fails due to invalid
    /// JSON content.
    #[error("invalid JSON")]
    InvalidJSON(#[from] serde_json::Error),

    /// Returned when the DNS codec fails to encode a response.
    #[error("DNS error")]
    DNSError(#[from] ProtoError),
}

impl Error {
    /// True for errors caused by caller-supplied zone content, as opposed to server faults.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InvalidDomain(_)
                | Error::InvalidIp(_)
                | Error::InvalidToken { .. }
                | Error::InvalidDNS01(_)
                | Error::ZoneParse { .. }
                | Error::UnsupportedRecordType { .. }
        )
    }
}
