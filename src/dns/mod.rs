//! Authoritative UDP DNS responder for ACME challenges.
//!
//! # Served Records
//!
//! acmezone answers `A` and `TXT` queries from the active zone [`Snapshot`][crate::zone::Snapshot].
//! Every response is authoritative. A name can carry several records of one type (e.g. the two
//! DNS-01 tokens requested when a certificate covers both `example.com` and `*.example.com`),
//! and all of them are returned in zone order.
//!
//! E.g. with the HTTP-01 zone built for `abc.com` and `test.com`:
//!
//! ```text
//! abc.com. 60 A 1.2.3.4
//! test.com. 60 A 1.2.3.4
//! ```
//!
//! An `A` query for `abc.com` would return:
//!
//! ```bash
//! ❯ dig @127.0.0.1 -p 10053 +short abc.com A
//! 1.2.3.4
//! ```
//!
//! And after the zone is replaced with the DNS-01 zone for `("abc.com", "TEST_TOKEN1")`:
//!
//! ```bash
//! ❯ dig @127.0.0.1 -p 10053 +short _acme-challenge.abc.com TXT
//! "TEST_TOKEN1"
//! ❯ dig @127.0.0.1 -p 10053 abc.com A | grep status
//! ;; ->>HEADER<<- opcode: QUERY, status: NOERROR, id: 31337
//! ❯ dig @127.0.0.1 -p 10053 test.com A | grep status
//! ;; ->>HEADER<<- opcode: QUERY, status: NXDOMAIN, id: 4242
//! ```
//!
//! # Misses
//!
//! A name exists when records are published at it or at any name below it, so `abc.com` exists
//! while `_acme-challenge.abc.com` is served. A query for a name that doesn't exist gets
//! `NXDOMAIN`. A query for a name that exists, but not with the requested type (including any
//! type other than `A` and `TXT`), gets an empty `NOERROR` answer. Neither is treated as an
//! error.
//!
//! # Malformed Queries
//!
//! Queries that fail to decode get `FORMERR` when their header could be read, and are dropped
//! otherwise. Opcodes other than `QUERY` get `NOTIMP`.
//!
//! # Zone Updates
//!
//! The [`Listener`][server::Listener] never restarts for a zone update. Each query takes the
//! active snapshot once, before it resolves, so it is answered entirely from the old zone or
//! entirely from the new one.

mod handlers;
pub mod resolver;
pub mod server;

pub use resolver::{resolve, Answer, Resolution};
pub use server::{Listener, Phase};
