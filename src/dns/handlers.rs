use crate::dns::resolver::{resolve, Resolution};
use crate::zone::Snapshot;
use tracing::{debug, trace};
use trust_dns_proto::op::{Edns, Header, Message, MessageType, OpCode, ResponseCode};
use trust_dns_proto::rr::Record;
use trust_dns_proto::serialize::binary::{BinDecodable, BinDecoder};

/// Largest response sent to clients that didn't advertise an EDNS payload size.
pub(crate) const MAX_UDP_RESPONSE_NO_EDNS: usize = 512;

/// Payload size advertised in EDNS responses, and the most sent to any EDNS client.
pub(crate) const EDNS_MAX_PAYLOAD: u16 = 1232;

/// Turn one received datagram into the response to send back, if any.
///
/// `snapshot` is the zone as it was when this query began; it is the only zone state consulted.
/// Datagrams too short to carry a DNS header, and datagrams that are themselves responses, are
/// dropped.
pub(crate) fn handle_datagram(datagram: &[u8], snapshot: &Snapshot) -> Option<Vec<u8>> {
    let (response, limit) = match Message::from_vec(datagram) {
        Ok(request) => (
            dispatch_request(&request, snapshot)?,
            response_size_limit(&request),
        ),
        Err(err) => {
            debug!(error = %err, "undecodable query");
            (format_error(datagram)?, MAX_UDP_RESPONSE_NO_EDNS)
        }
    };
    match encode(&response, limit) {
        Ok(bytes) => Some(bytes),
        Err(err) => {
            debug!(error = %err, "failed to encode response");
            Message::error_msg(response.id(), response.op_code(), ResponseCode::ServFail)
                .to_vec()
                .ok()
        }
    }
}

fn dispatch_request(request: &Message, snapshot: &Snapshot) -> Option<Message> {
    if request.message_type() != MessageType::Query {
        trace!(id = request.id(), "ignoring response message");
        return None;
    }

    // If it isn't a query, return NOTIMPL.
    if request.op_code() != OpCode::Query {
        return Some(handle_notimpl(request));
    }

    // Exactly one question per query.
    let [query] = request.queries() else {
        return Some(error_response(request, ResponseCode::FormErr));
    };

    let resolution = resolve(snapshot, query.name(), query.query_type());
    trace!(
        id = request.id(),
        name = %query.name(),
        qtype = %query.query_type(),
        generation = snapshot.generation(),
        ?resolution,
        "resolved"
    );
    let mut response = auth_response(request, ResponseCode::NoError);
    match resolution {
        Resolution::Answers(answers) => {
            let owner = query.name();
            response.add_answers(answers.iter().map(|answer| {
                Record::from_rdata(owner.clone(), answer.ttl, answer.value.to_rdata())
            }));
        }
        Resolution::NoData => {}
        Resolution::NxDomain => {
            response.set_response_code(ResponseCode::NXDomain);
        }
    }
    Some(response)
}

fn handle_notimpl(request: &Message) -> Message {
    error_response(request, ResponseCode::NotImp)
}

// Recover the header of a message that failed to decode, so the client gets a FORMERR rather
// than a timeout.
fn format_error(datagram: &[u8]) -> Option<Message> {
    let header = Header::read(&mut BinDecoder::new(datagram)).ok()?;
    if header.message_type() != MessageType::Query {
        return None;
    }
    Some(Message::error_msg(
        header.id(),
        header.op_code(),
        ResponseCode::FormErr,
    ))
}

fn error_response(request: &Message, code: ResponseCode) -> Message {
    let mut response = Message::error_msg(request.id(), request.op_code(), code);
    response.add_queries(request.queries().iter().cloned());
    response
}

fn auth_response(request: &Message, code: ResponseCode) -> Message {
    let mut response = Message::new();
    response
        .set_id(request.id())
        .set_message_type(MessageType::Response)
        .set_op_code(request.op_code())
        .set_authoritative(true)
        .set_recursion_desired(request.recursion_desired())
        .set_recursion_available(false)
        .set_response_code(code);
    response.add_queries(request.queries().iter().cloned());
    if request.extensions().is_some() {
        let mut edns = Edns::new();
        edns.set_max_payload(EDNS_MAX_PAYLOAD);
        response.set_edns(edns);
    }
    response
}

// The payload size the client advertised, never below 512 bytes nor above our own EDNS size.
fn response_size_limit(request: &Message) -> usize {
    match request.extensions() {
        Some(_) => usize::from(request.max_payload().min(EDNS_MAX_PAYLOAD)),
        None => MAX_UDP_RESPONSE_NO_EDNS,
    }
}

// Encode, falling back to an empty truncated response when the answers don't fit in `limit`.
fn encode(response: &Message, limit: usize) -> Result<Vec<u8>, trust_dns_proto::error::ProtoError> {
    let bytes = response.to_vec()?;
    if bytes.len() <= limit {
        return Ok(bytes);
    }
    let mut truncated = response.clone();
    truncated.take_answers();
    truncated.set_truncated(true);
    truncated.to_vec()
}
