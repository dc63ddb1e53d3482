//! Zone text for ACME challenges.
//!
//! [HTTP-01] validation only needs the challenged domains to resolve to the host answering the
//! challenge, so each domain gets an `A` record pointing at one shared address. [DNS-01]
//! validation looks up a `TXT` record at `_acme-challenge.<domain>` holding the key
//! authorization digest.
//!
//! [HTTP-01]: https://www.rfc-editor.org/rfc/rfc8555#section-8.3
//! [DNS-01]: https://www.rfc-editor.org/rfc/rfc8555#section-8.4

use crate::error::Error;
use crate::zone::normalize_name;
use crate::zone::record::check_txt_text;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// TTL of DNS-01 `TXT` records.
pub const DNS01_TTL: u32 = 300;

/// TTL of HTTP-01 `A` records.
pub const HTTP01_TTL: u32 = 60;

/// Label prepended to a domain to form its DNS-01 record name.
pub const DNS01_LABEL: &str = "_acme-challenge";

/// One DNS-01 challenge: the domain being validated and its key authorization token.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Dns01Entry {
    pub domain: String,
    pub token: String,
}

/// A set of ACME challenges answered by one zone.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Challenge {
    Http01 { domains: Vec<String>, ip: String },
    Dns01 { entries: Vec<Dns01Entry> },
}

impl Challenge {
    /// Build the zone text answering this challenge set.
    ///
    /// # Errors
    ///
    /// See [`build_http_challenge_zone`] and [`build_dns_challenge_zone`].
    pub fn zone_text(&self) -> Result<String, Error> {
        match self {
            Challenge::Http01 { domains, ip } => build_http_challenge_zone(domains.as_slice(), ip),
            Challenge::Dns01 { entries } => build_dns_challenge_zone(
                &entries
                    .iter()
                    .map(|e| (e.domain.as_str(), e.token.as_str()))
                    .collect::<Vec<_>>(),
            ),
        }
    }
}

/// Build zone text with one `TXT` record per `(domain, token)` entry, at
/// `_acme-challenge.<domain>.` with a TTL of 300 seconds and the token as a quoted value.
///
/// # Errors
///
/// Returns [`Error::InvalidDomain`] if a domain is empty or not a valid DNS name, or is too
/// long to carry the challenge label, and [`Error::InvalidToken`] if a token can't be carried
/// in a quoted TXT value.
pub fn build_dns_challenge_zone<D, T>(entries: &[(D, T)]) -> Result<String, Error>
where
    D: AsRef<str>,
    T: AsRef<str>,
{
    let lines = entries
        .iter()
        .map(|(domain, token)| {
            let domain = zone_domain(domain.as_ref())?;
            normalize_name(&format!("{DNS01_LABEL}.{domain}"))?;
            let token = token.as_ref();
            check_txt_text(token).map_err(|reason| Error::InvalidToken {
                domain: domain.to_string(),
                reason,
            })?;
            Ok(format!(
                "{DNS01_LABEL}.{domain}. {DNS01_TTL} TXT \"{token}\""
            ))
        })
        .collect::<Result<Vec<_>, Error>>()?;
    Ok(lines.join("\n"))
}

/// Build zone text with one `A` record per domain, each pointing at `ip` with a TTL of 60
/// seconds.
///
/// # Errors
///
/// Returns [`Error::InvalidIp`] if `ip` isn't an IPv4 literal and [`Error::InvalidDomain`] if a
/// domain is empty or not a valid DNS name.
pub fn build_http_challenge_zone<D>(domains: &[D], ip: &str) -> Result<String, Error>
where
    D: AsRef<str>,
{
    let ip: Ipv4Addr = ip.parse().map_err(|_| Error::InvalidIp(ip.to_string()))?;
    let lines = domains
        .iter()
        .map(|domain| {
            let domain = zone_domain(domain.as_ref())?;
            Ok(format!("{domain}. {HTTP01_TTL} A {ip}"))
        })
        .collect::<Result<Vec<_>, Error>>()?;
    Ok(lines.join("\n"))
}

// Validate a caller's domain and return it without its trailing dot, ready to be written
// as an absolute name.
fn zone_domain(domain: &str) -> Result<&str, Error> {
    normalize_name(domain)?;
    Ok(domain.strip_suffix('.').unwrap_or(domain))
}
