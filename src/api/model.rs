use crate::zone::{Dns01Entry, Snapshot};
use base64::engine::general_purpose;
use base64::{alphabet, engine, DecodeError, Engine};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub(super) struct Http01Request {
    pub domains: Vec<String>,
    pub ip: String,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub(super) struct Dns01Request {
    pub entries: Vec<Dns01Entry>,
}

#[derive(thiserror::Error, Debug)]
pub enum TxtValidationError {
    #[error("invalid encoding: {0}")]
    InvalidEncoding(DecodeError),
    #[error("invalid decoded length: found {actual} bytes, expected {expected}")]
    InvalidDecodedLength { actual: usize, expected: usize },
}

const DNS01_DECODED_LEN_BYTES: usize = 32;

lazy_static! {
    static ref BASE64_ENGINE: engine::GeneralPurpose =
        engine::GeneralPurpose::new(&alphabet::URL_SAFE, general_purpose::NO_PAD);
}

/// Check that `token` is a DNS-01 challenge response: a base64url (unpadded) SHA256 digest.
pub(super) fn valid_dns01(token: &str) -> Result<(), TxtValidationError> {
    match BASE64_ENGINE.decode(token) {
        Ok(raw) => match raw.len() {
            DNS01_DECODED_LEN_BYTES => Ok(()),
            _ => Err(TxtValidationError::InvalidDecodedLength {
                actual: raw.len(),
                expected: DNS01_DECODED_LEN_BYTES,
            }),
        },
        Err(err) => Err(TxtValidationError::InvalidEncoding(err)),
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub(super) struct RecordView {
    pub name: String,
    pub ttl: u32,
    #[serde(rename = "type")]
    pub rtype: String,
    pub value: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub(super) struct ZoneView {
    pub generation: u64,
    pub installed_at: Option<String>,
    pub records: Vec<RecordView>,
    pub zone: String,
}

impl From<&Snapshot> for ZoneView {
    fn from(snapshot: &Snapshot) -> Self {
        ZoneView {
            generation: snapshot.generation(),
            installed_at: snapshot
                .installed_at()
                .and_then(|at| at.format(&Rfc3339).ok()),
            records: snapshot
                .records()
                .iter()
                .map(|record| RecordView {
                    name: record.name().to_string(),
                    ttl: record.ttl(),
                    rtype: record.record_type().to_string(),
                    value: record.value().to_string(),
                })
                .collect(),
            zone: snapshot.to_string(),
        }
    }
}

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub(super) struct ZoneUpdateResult {
    pub generation: u64,
    pub records: usize,
}

impl From<&Snapshot> for ZoneUpdateResult {
    fn from(snapshot: &Snapshot) -> Self {
        ZoneUpdateResult {
            generation: snapshot.generation(),
            records: snapshot.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zone::parse_zone;

    #[test]
    fn dns01_digest_validation() {
        assert!(valid_dns01("LPsIwTo7o8BoG0-vjCyGQGBWSVIPxI-i_X336eUOQZo").is_ok());
        assert!(matches!(
            valid_dns01("TEST_TOKEN1"),
            Err(TxtValidationError::InvalidEncoding(_) | TxtValidationError::InvalidDecodedLength { .. })
        ));
        assert!(matches!(
            valid_dns01("AAAA"),
            Err(TxtValidationError::InvalidDecodedLength {
                actual: 3,
                expected: 32
            })
        ));
        assert!(matches!(
            valid_dns01("not base64!"),
            Err(TxtValidationError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn zone_view_lists_records_in_order() {
        let snapshot = parse_zone(
            "abc.com. 60 A 1.2.3.4\n_acme-challenge.abc.com. 300 TXT \"t\"",
        )
        .unwrap();
        let view = ZoneView::from(&snapshot);
        assert_eq!(view.generation, 0);
        assert_eq!(view.installed_at, None);
        assert_eq!(
            view.records[1],
            RecordView {
                name: "_acme-challenge.abc.com.".to_string(),
                ttl: 300,
                rtype: "TXT".to_string(),
                value: "\"t\"".to_string(),
            }
        );
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["records"][0]["type"], "A");
        assert_eq!(json["zone"], snapshot.to_string());
    }

    #[test]
    fn requests_deserialize() {
        let http: Http01Request =
            serde_json::from_str(r#"{"domains":["abc.com"],"ip":"1.2.3.4"}"#).unwrap();
        assert_eq!(http.domains, ["abc.com"]);
        let dns: Dns01Request =
            serde_json::from_str(r#"{"entries":[{"domain":"abc.com","token":"T"}]}"#).unwrap();
        assert_eq!(dns.entries[0].token, "T");
    }
}
