//! Shared helpers for the DNS contract tests.

#![allow(dead_code)]

use acmezone::zone::parse_zone;
use acmezone::{Config, Controller};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tokio::net::UdpSocket;
use trust_dns_proto::op::{Message, MessageType, OpCode, Query};
use trust_dns_proto::rr::{Name, RData, RecordType};

pub const QUERY_TIMEOUT: Duration = Duration::from_secs(2);

pub fn loopback_config() -> Config {
    Config {
        dns_udp_bind_addr: "127.0.0.1:0".parse().unwrap(),
        drain_grace_period: Duration::from_secs(1),
        ..Config::default()
    }
}

/// Start a controller on an ephemeral loopback port serving `zone_text`.
pub async fn start_server(zone_text: &str) -> (Controller, SocketAddr) {
    start_server_with(loopback_config(), zone_text).await
}

pub async fn start_server_with(config: Config, zone_text: &str) -> (Controller, SocketAddr) {
    let controller = Controller::new(
        &config,
        parse_zone(zone_text).expect("valid test zone"),
        tracing::Span::none(),
    );
    let addr = controller.start().await.expect("listener starts");
    (controller, addr)
}

pub fn query_message(id: u16, name: &str, qtype: RecordType) -> Message {
    let mut message = Message::new();
    message
        .set_id(id)
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true);
    message.add_query(Query::query(Name::from_str(name).unwrap(), qtype));
    message
}

/// Send raw bytes and wait for the reply carrying `id`, or `None` on timeout.
pub async fn exchange_raw(
    socket: &UdpSocket,
    server: SocketAddr,
    id: u16,
    bytes: &[u8],
) -> Option<Message> {
    socket.send_to(bytes, server).await.unwrap();
    let mut buf = [0u8; 4096];
    let deadline = tokio::time::Instant::now() + QUERY_TIMEOUT;
    loop {
        let received = tokio::time::timeout_at(deadline, socket.recv_from(&mut buf)).await;
        let (len, _) = received.ok()?.unwrap();
        let message = Message::from_vec(&buf[..len]).unwrap();
        if message.id() == id {
            return Some(message);
        }
    }
}

pub async fn exchange(
    socket: &UdpSocket,
    server: SocketAddr,
    id: u16,
    name: &str,
    qtype: RecordType,
) -> Option<Message> {
    let bytes = query_message(id, name, qtype).to_vec().unwrap();
    exchange_raw(socket, server, id, &bytes).await
}

/// One query from a fresh client socket; panics if unanswered.
pub async fn query(server: SocketAddr, name: &str, qtype: RecordType) -> Message {
    let socket = client_socket().await;
    exchange(&socket, server, 1, name, qtype)
        .await
        .expect("query answered")
}

pub async fn client_socket() -> UdpSocket {
    UdpSocket::bind("127.0.0.1:0").await.unwrap()
}

/// Answer data rendered as zone text values (`1.2.3.4`, `"TOKEN"`).
pub fn answer_values(response: &Message) -> Vec<String> {
    response
        .answers()
        .iter()
        .map(|record| match record.data() {
            Some(RData::A(ip)) => ip.to_string(),
            Some(RData::TXT(txt)) => txt
                .txt_data()
                .iter()
                .map(|part| format!("\"{}\"", String::from_utf8_lossy(part)))
                .collect::<Vec<_>>()
                .join(" "),
            other => panic!("unexpected answer data {other:?}"),
        })
        .collect()
}
