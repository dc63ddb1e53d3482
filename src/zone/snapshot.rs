use crate::error::Error;
use crate::zone::record::ZoneRecord;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use time::OffsetDateTime;
use trust_dns_client::rr::LowerName;
use trust_dns_proto::rr::RecordType;

/// An immutable, ordered zone record set.
///
/// A snapshot is built from zone text (see [`parse_zone`]) or a list of [`ZoneRecord`]s, and is
/// given its generation number and install time by the [`ZoneStore`][super::ZoneStore] when it
/// is published. Once published it is only ever shared behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    records: Vec<ZoneRecord>,
    // Positions in `records` per name, in zone order.
    by_name: HashMap<LowerName, Vec<usize>>,
    // Every owner name and all of its ancestors below the root.
    existing: HashSet<LowerName>,
    generation: u64,
    installed_at: Option<OffsetDateTime>,
}

impl Snapshot {
    #[must_use]
    pub fn new(records: Vec<ZoneRecord>) -> Self {
        let mut by_name: HashMap<LowerName, Vec<usize>> = HashMap::default();
        let mut existing = HashSet::new();
        for (idx, record) in records.iter().enumerate() {
            by_name.entry(record.name().clone()).or_default().push(idx);
            let mut name = record.name().clone();
            while !name.is_root() && existing.insert(name.clone()) {
                name = name.base_name();
            }
        }
        Snapshot {
            records,
            by_name,
            existing,
            generation: 0,
            installed_at: None,
        }
    }

    /// Stamp the snapshot just before it is published.
    pub(crate) fn install(mut self, generation: u64, at: OffsetDateTime) -> Self {
        self.generation = generation;
        self.installed_at = Some(at);
        self
    }

    #[must_use]
    pub fn records(&self) -> &[ZoneRecord] {
        &self.records
    }

    /// The store-assigned generation, or `0` for a snapshot that was never published.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn installed_at(&self) -> Option<OffsetDateTime> {
        self.installed_at
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether `name` exists in the zone: some record, of any type, is published at `name` or
    /// below it. `abc.com` exists once `_acme-challenge.abc.com` does, even with no records of
    /// its own.
    #[must_use]
    pub fn contains_name(&self, name: &LowerName) -> bool {
        self.existing.contains(name)
    }

    /// Records at `name` of type `rtype`, in zone order.
    pub fn lookup<'a>(
        &'a self,
        name: &LowerName,
        rtype: RecordType,
    ) -> impl Iterator<Item = &'a ZoneRecord> + 'a {
        self.by_name
            .get(name)
            .map_or(&[][..], Vec::as_slice)
            .iter()
            .map(|idx| &self.records[*idx])
            .filter(move |record| record.record_type() == rtype)
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, record) in self.records.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{record}")?;
        }
        Ok(())
    }
}

impl FromStr for Snapshot {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_zone(s)
    }
}

/// Parse zone text into an unpublished [`Snapshot`].
///
/// Each non-blank line is `<name> <ttl> [IN] <type> <value>`. `A` values are IPv4 literals and
/// `TXT` values are a single string, normally quoted. Leading indentation is ignored, and `;`
/// starts a comment outside of quotes. The whole text is rejected if any line is invalid.
///
/// # Errors
///
/// Returns [`Error::ZoneParse`] for malformed lines, [`Error::UnsupportedRecordType`] for
/// record types other than `A` and `TXT`, and the record errors of [`ZoneRecord::a`] and
/// [`ZoneRecord::txt`] for invalid names and values.
pub fn parse_zone(text: &str) -> Result<Snapshot, Error> {
    let mut records = Vec::new();
    for (idx, raw_line) in text.lines().enumerate() {
        let line = strip_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }
        records.push(parse_line(idx + 1, line)?);
    }
    Ok(Snapshot::new(records))
}

fn parse_line(line_no: usize, line: &str) -> Result<ZoneRecord, Error> {
    let parse_err = |reason: &str| Error::ZoneParse {
        line: line_no,
        reason: reason.to_string(),
    };

    let (name, rest) = next_field(line).ok_or_else(|| parse_err("missing name"))?;
    let (ttl, rest) = next_field(rest).ok_or_else(|| parse_err("missing TTL"))?;
    let ttl: u32 = ttl
        .parse()
        .map_err(|_| parse_err(&format!("invalid TTL \"{ttl}\"")))?;
    let (mut rtype, mut rest) = next_field(rest).ok_or_else(|| parse_err("missing type"))?;
    if rtype.eq_ignore_ascii_case("IN") {
        (rtype, rest) = next_field(rest).ok_or_else(|| parse_err("missing type"))?;
    }
    let value = rest.trim();
    if value.is_empty() {
        return Err(parse_err("missing value"));
    }

    if rtype.eq_ignore_ascii_case("A") {
        let ip: Ipv4Addr = value
            .parse()
            .map_err(|_| Error::InvalidIp(value.to_string()))?;
        ZoneRecord::a(name, ttl, ip)
    } else if rtype.eq_ignore_ascii_case("TXT") {
        let text = unquote(value).map_err(parse_err)?;
        ZoneRecord::txt(name, ttl, text)
    } else {
        Err(Error::UnsupportedRecordType {
            line: line_no,
            rtype: rtype.to_string(),
        })
    }
}

fn next_field(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }
    match s.find(char::is_whitespace) {
        Some(end) => Some((&s[..end], &s[end..])),
        None => Some((s, "")),
    }
}

fn unquote(value: &str) -> Result<&str, &'static str> {
    match value.strip_prefix('"') {
        Some(quoted) => {
            let inner = quoted
                .strip_suffix('"')
                .ok_or("unterminated quoted TXT value")?;
            if inner.contains('"') {
                return Err("TXT value must be a single quoted string");
            }
            Ok(inner)
        }
        None if value.contains(|c: char| c.is_whitespace() || c == '"') => {
            Err("unquoted TXT value must be a single word")
        }
        None => Ok(value),
    }
}

fn strip_comment(line: &str) -> &str {
    let mut quoted = false;
    for (idx, c) in line.char_indices() {
        match c {
            '"' => quoted = !quoted,
            ';' if !quoted => return &line[..idx],
            _ => {}
        }
    }
    line
}
