use crate::error::Error;
use crate::zone::normalize_name;
use std::fmt;
use std::net::Ipv4Addr;
use trust_dns_proto::rr::rdata::TXT;
use trust_dns_client::rr::LowerName;
use trust_dns_proto::rr::{Name, RData, Record, RecordType};

/// Longest text a single TXT character-string can carry.
pub(crate) const MAX_TXT_LEN: usize = 255;

/// The data of a served record. Only `A` and `TXT` records exist in an acmezone zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordValue {
    A(Ipv4Addr),
    /// TXT text, stored without the surrounding quotes.
    Txt(String),
}

impl RecordValue {
    #[must_use]
    pub fn record_type(&self) -> RecordType {
        match self {
            RecordValue::A(_) => RecordType::A,
            RecordValue::Txt(_) => RecordType::TXT,
        }
    }

    #[must_use]
    pub fn to_rdata(&self) -> RData {
        match self {
            RecordValue::A(ip) => RData::A(*ip),
            RecordValue::Txt(text) => RData::TXT(TXT::new(vec![text.clone()])),
        }
    }
}

impl fmt::Display for RecordValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordValue::A(ip) => write!(f, "{ip}"),
            RecordValue::Txt(text) => write!(f, "\"{text}\""),
        }
    }
}

/// One record of a zone. Names are stored normalized (see [`normalize_name`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneRecord {
    name: LowerName,
    ttl: u32,
    value: RecordValue,
}

impl ZoneRecord {
    /// # Errors
    ///
    /// Returns [`Error::InvalidDomain`] if `name` isn't a valid DNS name.
    pub fn a(name: &str, ttl: u32, ip: Ipv4Addr) -> Result<Self, Error> {
        Ok(Self {
            name: normalize_name(name)?,
            ttl,
            value: RecordValue::A(ip),
        })
    }

    /// # Errors
    ///
    /// Returns [`Error::InvalidDomain`] if `name` isn't a valid DNS name, or
    /// [`Error::InvalidToken`] if `text` can't be served as a quoted TXT value.
    pub fn txt(name: &str, ttl: u32, text: impl Into<String>) -> Result<Self, Error> {
        let text = text.into();
        check_txt_text(&text).map_err(|reason| Error::InvalidToken {
            domain: name.to_string(),
            reason,
        })?;
        Ok(Self {
            name: normalize_name(name)?,
            ttl,
            value: RecordValue::Txt(text),
        })
    }

    #[must_use]
    pub fn name(&self) -> &LowerName {
        &self.name
    }

    #[must_use]
    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    #[must_use]
    pub fn value(&self) -> &RecordValue {
        &self.value
    }

    #[must_use]
    pub fn record_type(&self) -> RecordType {
        self.value.record_type()
    }

    /// Build the wire record, owned by `owner` (the name exactly as the client asked for it).
    #[must_use]
    pub fn to_record(&self, owner: &Name) -> Record {
        Record::from_rdata(owner.clone(), self.ttl, self.value.to_rdata())
    }
}

impl fmt::Display for ZoneRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.name,
            self.ttl,
            self.record_type(),
            self.value
        )
    }
}

/// Check that `text` can sit between double quotes in zone text and fit one TXT string.
pub(crate) fn check_txt_text(text: &str) -> Result<(), &'static str> {
    if text.len() > MAX_TXT_LEN {
        return Err("longer than 255 bytes");
    }
    match text
        .chars()
        .find(|c| !c.is_ascii() || c.is_ascii_control() || *c == '"' || *c == '\\')
    {
        None => Ok(()),
        Some('"') => Err("contains a double quote"),
        Some('\\') => Err("contains a backslash"),
        Some(c) if c.is_ascii_control() => Err("contains a control character"),
        Some(_) => Err("contains a non-ASCII character"),
    }
}
