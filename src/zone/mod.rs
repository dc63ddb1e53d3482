//! Zone data: records, immutable snapshots, and the store that publishes them.
//!
//! acmezone serves exactly one flat record set at a time. A record set is written as zone text,
//! one record per line:
//!
//! ```text
//! abc.com. 60 A 1.2.3.4
//! _acme-challenge.abc.com. 300 TXT "LPsIwTo7o8BoG0-vjCyGQGBWSVIPxI-i_X336eUOQZo"
//! ```
//!
//! Zone text is parsed into a [`Snapshot`], which is never modified once it has been handed to
//! the [`ZoneStore`]. Replacing the zone means publishing a new snapshot; queries that already
//! hold the old one finish against it.
//!
//! The [`builder`] module produces zone text for ACME HTTP-01 and DNS-01 challenges.

pub mod builder;
mod record;
mod snapshot;
pub mod store;

pub use builder::{build_dns_challenge_zone, build_http_challenge_zone, Challenge, Dns01Entry};
pub use record::{RecordValue, ZoneRecord};
pub use snapshot::{parse_zone, Snapshot};
pub use store::ZoneStore;

use crate::error::Error;
use trust_dns_client::rr::LowerName;
use trust_dns_proto::rr::Name;

/// Normalize a textual domain into the key used for storage and comparison: lower-cased and
/// fully qualified, so `abc.com`, `ABC.com.` and `abc.com.` all name the same record.
///
/// # Errors
///
/// Returns [`Error::InvalidDomain`] if `domain` is empty, contains whitespace, or isn't a
/// valid DNS name.
pub fn normalize_name(domain: &str) -> Result<LowerName, Error> {
    let trimmed = domain.strip_suffix('.').unwrap_or(domain);
    if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
        return Err(Error::InvalidDomain(domain.to_string()));
    }
    let mut name =
        Name::from_ascii(trimmed).map_err(|_| Error::InvalidDomain(domain.to_string()))?;
    name.set_fqdn(true);
    Ok(LowerName::from(name))
}

/// Normalize a name decoded from a query. Wire names are already absolute, but the lookup
/// key must not depend on that.
pub(crate) fn normalize_query_name(name: &Name) -> LowerName {
    let mut name = name.clone();
    name.set_fqdn(true);
    LowerName::from(name)
}
