use log::{debug, error, trace, warn};
use std::cmp;
use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use tokio::{net::UdpSocket, sync::mpsc};

use crate::config::{DEFAULT_MAX_UDP_SIZE, MIN_UDP_SIZE};
use crate::dns_parser::{Class, Opcode, OptRecord, ResponseCode, Type};
use crate::message::{peek_id, Message};
use crate::record::ResourceRecord;
use crate::resolver::Resolver;

/// Largest message a 2-byte TCP length prefix can frame
const MAX_TCP_SIZE: usize = 65535;

#[derive(Clone, Debug)]
pub enum Command {
    Shutdown,
}

/// How a query reached the server, which bounds the response size
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transport {
    /// `max_payload` caps the EDNS0 size a client may ask for
    Udp { max_payload: u16 },
    Tcp,
}

impl Transport {
    fn max_size(self, edns: Option<&OptRecord>) -> usize {
        match self {
            Transport::Udp { max_payload } => match edns {
                Some(opt) => cmp::max(cmp::min(opt.udp, max_payload), MIN_UDP_SIZE) as usize,
                None => MIN_UDP_SIZE as usize,
            },
            Transport::Tcp => MAX_TCP_SIZE,
        }
    }

    fn advertised_payload(self) -> u16 {
        match self {
            Transport::Udp { max_payload } => max_payload,
            Transport::Tcp => DEFAULT_MAX_UDP_SIZE,
        }
    }
}

/// Wire response to one wire query, or `None` when nothing must be sent
///
/// Undecodable queries get FORMERR with the id taken from the raw bytes,
/// never a partial answer.
pub fn handle_query(resolver: &dyn Resolver, packet: &[u8], transport: Transport) -> Option<Vec<u8>> {
    let query = match Message::decode(packet) {
        Ok(query) => query,
        Err(err) => {
            // QR set: someone else's response, answering could loop
            if packet.len() > 2 && packet[2] & 0x80 != 0 {
                trace!("dropping undecodable response: {}", err);
                return None;
            }
            warn!("couldn't parse query: {}", err);
            return error_reply(peek_id(packet), Opcode::StandardQuery, ResponseCode::FormatError);
        }
    };
    let id = query.header.id;

    if !query.header.query {
        trace!("ignoring response packet {}", id);
        return None;
    }

    if query.header.opcode != Opcode::StandardQuery {
        debug!("query {} has unsupported opcode {:?}", id, query.header.opcode);
        return error_reply(id, query.header.opcode, ResponseCode::NotImplemented);
    }

    if query
        .questions
        .iter()
        .any(|q| q.rtype() == Type::AXFR || q.rtype() == Type::IXFR)
    {
        debug!("query {} asks for a zone transfer", id);
        return error_reply(id, query.header.opcode, ResponseCode::NotImplemented);
    }

    if query.questions.is_empty() {
        debug!("query {} has no question", id);
        return error_reply(id, query.header.opcode, ResponseCode::FormatError);
    }

    for question in &query.questions {
        debug!("received question: {}", question);
    }

    let mut response = answer(resolver, &query);
    if query.edns.is_some() {
        response.edns = Some(OptRecord {
            udp: transport.advertised_payload(),
            extrcode: 0,
            version: 0,
            flags: 0,
        });
    }

    match response.encode(Some(transport.max_size(query.edns.as_ref()))) {
        Ok(bytes) => Some(bytes),
        Err(err) => {
            error!("couldn't encode response to {}: {}", id, err);
            error_reply(id, query.header.opcode, ResponseCode::ServerFailure)
        }
    }
}

fn error_reply(id: u16, opcode: Opcode, rcode: ResponseCode) -> Option<Vec<u8>> {
    match Message::error_response(id, opcode, rcode).encode(None) {
        Ok(bytes) => Some(bytes),
        Err(err) => {
            error!("couldn't encode {:?} reply: {}", rcode, err);
            None
        }
    }
}

fn answer(resolver: &dyn Resolver, query: &Message) -> Message {
    let mut response = Message::response_to(query);
    response.header.recursion_available = resolver.allows_recursion();
    response.header.authoritative = query
        .questions
        .iter()
        .all(|q| resolver.is_authority(q.name()));

    response.answers = resolver.get_answer(&query.questions);
    if response.answers.is_empty() {
        // NODATA when the name exists with other types only
        if !query.questions.iter().any(|q| resolver.has_name(q.name())) {
            response.header.response_code = ResponseCode::NameError;
        }
        if response.header.authoritative {
            response.authority.extend(
                query
                    .questions
                    .first()
                    .and_then(|q| resolver.soa(q.name())),
            );
        }
    } else {
        response.additional = additional_records(resolver, &response.answers);
    }
    response
}

/// Addresses of the hosts NS, MX and SRV answers point at
fn additional_records(resolver: &dyn Resolver, answers: &[ResourceRecord]) -> Vec<ResourceRecord> {
    let mut questions = Vec::new();
    for target in answers.iter().filter_map(|rr| rr.rdata()?.target()) {
        for &rtype in &[Type::A, Type::AAAA] {
            let question = ResourceRecord::question(target.clone(), rtype, Class::IN);
            if !questions.contains(&question) {
                questions.push(question);
            }
        }
    }
    if questions.is_empty() {
        return Vec::new();
    }
    resolver
        .get_answer(&questions)
        .into_iter()
        .filter(|rr| !answers.contains(rr))
        .collect()
}

/// The UDP side of the server: answers every datagram on its own
pub struct FSM {
    socket: UdpSocket,
    resolver: Arc<dyn Resolver>,
    commands: mpsc::UnboundedReceiver<Command>,
    outgoing: VecDeque<(Vec<u8>, SocketAddr)>,
    transport: Transport,
}

impl FSM {
    // Will panic if called from outside the context of a runtime
    pub fn new(
        socket: std::net::UdpSocket,
        resolver: Arc<dyn Resolver>,
        max_payload: u16,
    ) -> io::Result<(FSM, mpsc::UnboundedSender<Command>)> {
        let socket = UdpSocket::from_std(socket)?;

        let (tx, rx) = mpsc::unbounded_channel();

        let fsm = FSM {
            socket,
            resolver,
            commands: rx,
            outgoing: VecDeque::new(),
            transport: Transport::Udp { max_payload },
        };

        Ok((fsm, tx))
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    fn recv_packets(&mut self, cx: &mut Context) -> io::Result<()> {
        let mut recv_buf = [0u8; 65536];
        loop {
            let mut buf = tokio::io::ReadBuf::new(&mut recv_buf);
            let addr = match self.socket.poll_recv_from(cx, &mut buf) {
                Poll::Ready(Ok(addr)) => addr,
                Poll::Ready(Err(err)) => return Err(err),
                Poll::Pending => break,
            };
            self.handle_packet(buf.filled(), addr);
        }

        Ok(())
    }

    fn handle_packet(&mut self, buffer: &[u8], addr: SocketAddr) {
        trace!("received packet from {:?}", addr);

        if let Some(response) = handle_query(&*self.resolver, buffer, self.transport) {
            self.outgoing.push_back((response, addr));
        }
    }
}

impl Future for FSM {
    type Output = ();
    fn poll(self: Pin<&mut Self>, cx: &mut Context) -> Poll<()> {
        let pinned = Pin::get_mut(self);
        while let Poll::Ready(cmd) = Pin::new(&mut pinned.commands).poll_recv(cx) {
            match cmd {
                Some(Command::Shutdown) => return Poll::Ready(()),
                None => {
                    warn!("responder disconnected without shutdown");
                    return Poll::Ready(());
                }
            }
        }

        if let Err(e) = pinned.recv_packets(cx) {
            error!("couldn't receive packet: {:?}", e);
            // the socket registered no wakeup for this error
            cx.waker().wake_by_ref();
        }

        while let Some((response, addr)) = pinned.outgoing.pop_front() {
            trace!("sending packet to {:?}", addr);

            match pinned.socket.poll_send_to(cx, &response, addr) {
                Poll::Ready(Ok(bytes_sent)) if bytes_sent == response.len() => (),
                Poll::Ready(Ok(_)) => warn!("failed to send entire packet"),
                Poll::Ready(Err(err)) => warn!("error sending packet {:?}", err),
                Poll::Pending => {
                    pinned.outgoing.push_front((response, addr));
                    break;
                }
            }
        }

        Poll::Pending
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dns_parser::{DomainName, Header, RRData, Soa};
    use crate::resolver::ZoneResolver;
    use std::net::{Ipv4Addr, Ipv6Addr};

    const UDP: Transport = Transport::Udp {
        max_payload: DEFAULT_MAX_UDP_SIZE,
    };

    fn name(s: &str) -> DomainName {
        DomainName::parse(s).unwrap()
    }

    fn resolver() -> ZoneResolver {
        ZoneResolver::new(vec![
            ResourceRecord::answer(
                name("example.com."),
                Class::IN,
                10800,
                RRData::SOA(Soa {
                    mname: name("example.com."),
                    rname: name("postmaster.example.com."),
                    serial: 2,
                    refresh: 3600,
                    retry: 7200,
                    expire: 10800,
                    minimum: 3600,
                }),
            ),
            ResourceRecord::answer(
                name("example.com."),
                Class::IN,
                3600,
                RRData::MX {
                    preference: 10,
                    exchange: name("mail.example.com."),
                },
            ),
            ResourceRecord::answer(
                name("mail.example.com."),
                Class::IN,
                3600,
                RRData::A(Ipv4Addr::new(192, 0, 2, 25)),
            ),
            ResourceRecord::answer(
                name("mail.example.com."),
                Class::IN,
                3600,
                RRData::AAAA(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 25)),
            ),
            ResourceRecord::answer(
                name("test2.com."),
                Class::IN,
                300,
                RRData::A(Ipv4Addr::new(111, 111, 111, 111)),
            ),
            ResourceRecord::answer(name("big.test2.com."), Class::IN, -1, RRData::A(Ipv4Addr::LOCALHOST)),
        ])
        .unwrap()
    }

    fn query(owner: &str, rtype: Type) -> Message {
        Message::query(0x0625, ResourceRecord::question(name(owner), rtype, Class::IN))
    }

    fn ask(message: &Message, transport: Transport) -> Message {
        let wire = message.encode(None).unwrap();
        let response = handle_query(&resolver(), &wire, transport).unwrap();
        Message::decode(&response).unwrap()
    }

    #[test]
    fn authoritative_answer_with_glue() {
        let response = ask(&query("example.com.", Type::MX), UDP);
        assert_eq!(response.header.id, 0x0625);
        assert!(!response.header.query);
        assert!(response.header.authoritative);
        assert!(!response.header.recursion_available);
        assert!(response.header.recursion_desired);
        assert_eq!(response.header.response_code, ResponseCode::NoError);
        assert_eq!(response.questions.len(), 1);
        assert_eq!(response.answers.len(), 1);
        let glue: Vec<_> = response.additional.iter().map(|rr| rr.rtype()).collect();
        assert_eq!(glue, [Type::A, Type::AAAA]);
        assert!(response.edns.is_none());
    }

    #[test]
    fn non_authoritative_answer() {
        let response = ask(&query("test2.com.", Type::A), UDP);
        assert!(!response.header.authoritative);
        assert_eq!(response.answers.len(), 1);
        assert!(response.additional.is_empty());
    }

    #[test]
    fn nxdomain_carries_soa() {
        let response = ask(&query("nothing.example.com.", Type::A), UDP);
        assert_eq!(response.header.response_code, ResponseCode::NameError);
        assert!(response.answers.is_empty());
        assert_eq!(response.authority.len(), 1);
        assert_eq!(response.authority[0].rtype(), Type::SOA);

        let response = ask(&query("nonexistent.tld.", Type::A), UDP);
        assert_eq!(response.header.response_code, ResponseCode::NameError);
        assert!(response.authority.is_empty());
    }

    #[test]
    fn nodata_for_missing_type() {
        let response = ask(&query("mail.example.com.", Type::TXT), UDP);
        assert_eq!(response.header.response_code, ResponseCode::NoError);
        assert!(response.header.authoritative);
        assert!(response.answers.is_empty());
        assert_eq!(response.authority[0].rtype(), Type::SOA);

        let response = ask(&query("test2.com.", Type::AAAA), UDP);
        assert_eq!(response.header.response_code, ResponseCode::NoError);
        assert!(response.answers.is_empty());
        assert!(response.authority.is_empty());
    }

    #[test]
    fn unknown_question_type() {
        // HTTPS (65) has no zone data here
        let response = ask(&query("example.com.", Type::Unknown(65)), UDP);
        assert_eq!(response.header.response_code, ResponseCode::NoError);
        assert!(response.answers.is_empty());
        assert_eq!(response.questions[0].rtype(), Type::Unknown(65));

        let response = ask(&query("nothing.example.com.", Type::Unknown(65)), UDP);
        assert_eq!(response.header.response_code, ResponseCode::NameError);
    }

    #[test]
    fn undecodable_query() {
        let packet = b"\xbe\xef\x01\x00\x00\x01\x00\x00\x00\x00\x00\x00\xc0\x0c\x00\x01\x00\x01";
        let response = handle_query(&resolver(), packet, UDP).unwrap();
        assert_eq!(&response[..], b"\xbe\xef\x80\x01\x00\x00\x00\x00\x00\x00\x00\x00");

        let response = handle_query(&resolver(), b"\x07", UDP).unwrap();
        assert_eq!(&response[..4], b"\x00\x00\x80\x01");
    }

    #[test]
    fn responses_are_ignored() {
        let mut message = query("test2.com.", Type::A);
        message.header.query = false;
        let wire = message.encode(None).unwrap();
        assert!(handle_query(&resolver(), &wire, UDP).is_none());
        assert!(handle_query(&resolver(), b"\x00\x01\x80\x00\x00\x01", UDP).is_none());
    }

    #[test]
    fn unsupported_requests() {
        let mut message = query("test2.com.", Type::A);
        message.header.opcode = Opcode::Notify;
        let response = ask(&message, UDP);
        assert_eq!(response.header.response_code, ResponseCode::NotImplemented);
        assert_eq!(response.header.opcode, Opcode::Notify);

        let response = ask(&query("example.com.", Type::AXFR), UDP);
        assert_eq!(response.header.response_code, ResponseCode::NotImplemented);
        assert!(response.answers.is_empty());
    }

    #[test]
    fn no_question() {
        let message = Message {
            header: Header::new(9, true, Opcode::StandardQuery),
            questions: Vec::new(),
            answers: Vec::new(),
            authority: Vec::new(),
            additional: Vec::new(),
            edns: None,
        };
        let response = ask(&message, UDP);
        assert_eq!(response.header.id, 9);
        assert_eq!(response.header.response_code, ResponseCode::FormatError);
    }

    #[test]
    fn encode_failure_is_servfail() {
        let response = ask(&query("big.test2.com.", Type::A), UDP);
        assert_eq!(response.header.response_code, ResponseCode::ServerFailure);
        assert!(response.answers.is_empty());
    }

    #[test]
    fn edns_echo_and_size() {
        let mut message = query("example.com.", Type::MX);
        message.edns = Some(OptRecord {
            udp: 4096,
            extrcode: 0,
            version: 0,
            flags: 0,
        });
        let response = ask(&message, UDP);
        assert_eq!(response.edns.map(|opt| opt.udp), Some(DEFAULT_MAX_UDP_SIZE));

        let edns = message.edns;
        assert_eq!(UDP.max_size(edns.as_ref()), 1232);
        assert_eq!(UDP.max_size(None), 512);
        let tiny = OptRecord { udp: 100, ..edns.unwrap() };
        assert_eq!(UDP.max_size(Some(&tiny)), 512);
        assert_eq!(Transport::Tcp.max_size(None), 65535);
    }

    #[test]
    fn truncation_over_udp() {
        let records = (0..40)
            .map(|i| {
                ResourceRecord::answer(
                    name("many.example.org."),
                    Class::IN,
                    60,
                    RRData::A(Ipv4Addr::new(10, 0, 0, i)),
                )
            })
            .collect::<Vec<_>>();
        let resolver = ZoneResolver::new(records).unwrap();
        let wire = query("many.example.org.", Type::A).encode(None).unwrap();

        let response = handle_query(&resolver, &wire, UDP).unwrap();
        let response = Message::decode(&response).unwrap();
        assert!(response.header.truncated);
        assert!(response.answers.is_empty());
        assert_eq!(response.questions.len(), 1);

        let response = handle_query(&resolver, &wire, Transport::Tcp).unwrap();
        let response = Message::decode(&response).unwrap();
        assert!(!response.header.truncated);
        assert_eq!(response.answers.len(), 40);

        let mut message = query("many.example.org.", Type::A);
        message.edns = Some(OptRecord {
            udp: 512,
            extrcode: 0,
            version: 0,
            flags: 0,
        });
        let wire = message.encode(None).unwrap();
        let response = handle_query(&resolver, &wire, UDP).unwrap();
        let response = Message::decode(&response).unwrap();
        assert!(response.header.truncated);
        assert!(response.answers.is_empty());
        assert_eq!(response.edns.map(|opt| opt.udp), Some(DEFAULT_MAX_UDP_SIZE));
    }
}
