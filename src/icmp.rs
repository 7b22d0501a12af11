//! Raw socket tracer: ICMP echo requests with increasing TTL.
//!
//! Needs privileges to open a layer 3 channel (root or `CAP_NET_RAW`).

use std::net::{IpAddr, Ipv4Addr};
use std::time::Instant;

use pnet::packet::icmp::echo_reply::EchoReplyPacket;
use pnet::packet::icmp::echo_request::{EchoRequestPacket, MutableEchoRequestPacket};
use pnet::packet::icmp::{IcmpPacket, IcmpType, IcmpTypes};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::MutableIpv4Packet;
use pnet::packet::util::checksum;
use pnet::packet::{MutablePacket, Packet};
use pnet::transport::TransportChannelType::Layer3;
use pnet::transport::{icmp_packet_iter, transport_channel, TransportSender};

use crate::config::ProbeConfig;
use crate::dns::resolve_ipv4;
use crate::error::{Error, Result};
use crate::hops::{Hop, HopSource};

const IPV4_HEADER_LEN: usize = 20;
const ICMP_HEADER_LEN: usize = 8;
const ICMP_PAYLOAD_LEN: usize = 32;

#[derive(Clone, Debug)]
struct ProbeReply {
    hop_addr: IpAddr,
    reply_type: IcmpType,
    sequence_number: u16,
}

pub struct IcmpTracer {
    config: ProbeConfig,
}

impl IcmpTracer {
    pub fn new(config: ProbeConfig) -> Self {
        IcmpTracer { config }
    }
}

impl HopSource for IcmpTracer {
    fn collect_hops(&self, target: &str) -> Result<Vec<Hop>> {
        let destination = resolve_ipv4(target)?;
        let config = &self.config;

        let (mut tx, mut rx) =
            transport_channel(1024, Layer3(IpNextHeaderProtocols::Icmp)).map_err(Error::Socket)?;
        let mut rx = icmp_packet_iter(&mut rx);

        let mut buf_ip = [0u8; IPV4_HEADER_LEN + ICMP_HEADER_LEN + ICMP_PAYLOAD_LEN];
        let mut buf_icmp = [0u8; ICMP_HEADER_LEN + ICMP_PAYLOAD_LEN];
        let timeout = config.timeout;
        let mut hops = Vec::new();

        for ttl in 1..=config.max_hops {
            let started = Instant::now();
            send_requests(config, destination, &mut tx, ttl, &mut buf_ip, &mut buf_icmp)?;

            let mut replies = Vec::with_capacity(usize::from(config.tries_per_hop));
            while started.elapsed() < timeout {
                match rx.next_with_timeout(timeout) {
                    Ok(Some((packet, host))) => {
                        // Layer 3 channels hand back the whole datagram, IPv4 header included.
                        let icmp = packet
                            .packet()
                            .get(IPV4_HEADER_LEN..)
                            .and_then(IcmpPacket::new);
                        let Some(icmp) = icmp else { continue };
                        if let Some(reply) = process_reply(&icmp, host) {
                            replies.push(reply);
                        }
                    }
                    Ok(None) => break,
                    Err(e) => return Err(Error::Socket(e)),
                }
            }

            let window = sequence_window(config, ttl);
            let replies: Vec<_> = replies
                .into_iter()
                .filter(|r| window.contains(&r.sequence_number))
                .collect();

            let Some(first) = replies.first() else {
                log::debug!("ttl {ttl}: no reply");
                continue;
            };
            hops.push(Hop { ip: first.hop_addr });

            if replies.iter().any(|r| r.reply_type == IcmpTypes::EchoReply) {
                return Ok(hops);
            }
        }

        log::warn!("{target} not reached within {} hops", config.max_hops);
        Ok(hops)
    }
}

/// Sequence numbers carried by the probes sent with `ttl`.
fn sequence_window(config: &ProbeConfig, ttl: u8) -> std::ops::Range<u16> {
    let tries = u16::from(config.tries_per_hop);
    let ttl = u16::from(ttl);
    (ttl - 1) * tries..ttl * tries
}

fn create_icmp_packet<'a>(
    buf_ip: &'a mut [u8],
    buf_icmp: &'a mut [u8],
    dest: Ipv4Addr,
    ttl: u8,
    sequence_number: u16,
) -> Option<MutableIpv4Packet<'a>> {
    let mut ipv4_packet = MutableIpv4Packet::new(buf_ip)?;

    ipv4_packet.set_version(4);
    ipv4_packet.set_header_length((IPV4_HEADER_LEN / 4) as u8);
    ipv4_packet.set_total_length((IPV4_HEADER_LEN + ICMP_HEADER_LEN + ICMP_PAYLOAD_LEN) as u16);
    ipv4_packet.set_ttl(ttl);
    ipv4_packet.set_next_level_protocol(IpNextHeaderProtocols::Icmp);
    ipv4_packet.set_destination(dest);

    let mut icmp_packet = MutableEchoRequestPacket::new(buf_icmp)?;

    icmp_packet.set_icmp_type(IcmpTypes::EchoRequest);
    icmp_packet.set_sequence_number(sequence_number);
    icmp_packet.set_checksum(0);

    let checksum = checksum(icmp_packet.packet_mut(), 1);

    icmp_packet.set_checksum(checksum);
    ipv4_packet.set_payload(icmp_packet.packet_mut());

    Some(ipv4_packet)
}

fn send_requests(
    config: &ProbeConfig,
    destination: Ipv4Addr,
    tx: &mut TransportSender,
    ttl: u8,
    buf_ip: &mut [u8],
    buf_icmp: &mut [u8],
) -> Result<()> {
    for sequence_number in sequence_window(config, ttl) {
        let packet = create_icmp_packet(buf_ip, buf_icmp, destination, ttl, sequence_number)
            .ok_or_else(|| Error::Socket(std::io::Error::other("probe buffer too small")))?;

        tx.send_to(packet, IpAddr::V4(destination))
            .map_err(Error::Socket)?;
    }
    Ok(())
}

fn process_reply(reply: &IcmpPacket, host: IpAddr) -> Option<ProbeReply> {
    match reply.get_icmp_type() {
        // The payload quotes our IPv4 header and the echo request that expired.
        IcmpTypes::TimeExceeded => {
            let quoted = reply.packet().get(ICMP_HEADER_LEN + IPV4_HEADER_LEN..)?;
            let request = EchoRequestPacket::new(quoted)?;
            Some(ProbeReply {
                hop_addr: host,
                reply_type: IcmpTypes::TimeExceeded,
                sequence_number: request.get_sequence_number(),
            })
        }
        IcmpTypes::EchoReply => {
            let reply = EchoReplyPacket::new(reply.packet())?;
            Some(ProbeReply {
                hop_addr: host,
                reply_type: IcmpTypes::EchoReply,
                sequence_number: reply.get_sequence_number(),
            })
        }
        _ => None,
    }
}
