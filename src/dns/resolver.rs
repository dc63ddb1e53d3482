//! Lookups against a single zone snapshot.

use crate::zone::{normalize_query_name, RecordValue, Snapshot, ZoneRecord};
use trust_dns_proto::rr::{Name, RecordType};

/// One answer: the data of a matching record and its TTL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub value: RecordValue,
    pub ttl: u32,
}

impl From<&ZoneRecord> for Answer {
    fn from(record: &ZoneRecord) -> Self {
        Answer {
            value: record.value().clone(),
            ttl: record.ttl(),
        }
    }
}

/// The outcome of a lookup. Only `Answers` carries data; the other two are ordinary misses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Every record matching name and type, in zone order. Never empty.
    Answers(Vec<Answer>),
    /// The name exists, but has no record of the requested type.
    NoData,
    /// Nothing is published at the name.
    NxDomain,
}

impl Resolution {
    #[must_use]
    pub fn answers(&self) -> &[Answer] {
        match self {
            Resolution::Answers(answers) => answers,
            Resolution::NoData | Resolution::NxDomain => &[],
        }
    }
}

/// Resolve `name`/`qtype` against `snapshot`.
///
/// Names match case-insensitively with or without a trailing dot. Nothing but `snapshot` is
/// consulted, so a query resolves consistently even while the zone is being replaced.
#[must_use]
pub fn resolve(snapshot: &Snapshot, name: &Name, qtype: RecordType) -> Resolution {
    let key = normalize_query_name(name);
    let answers: Vec<Answer> = snapshot.lookup(&key, qtype).map(Answer::from).collect();
    if !answers.is_empty() {
        Resolution::Answers(answers)
    } else if snapshot.contains_name(&key) {
        Resolution::NoData
    } else {
        Resolution::NxDomain
    }
}
