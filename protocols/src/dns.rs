use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use anyhow::Context;
use pnet::packet::dns::{
    DnsClass, DnsPacket, DnsQuery, DnsType, DnsTypes, MutableDnsPacket, Opcode, Retcode,
};

pub const DNS_HDR_LEN: usize = 12;

const POINTER_MASK: u8 = 0xC0;
const MAX_POINTER_JUMPS: usize = 16;

/// Answers extracted from one reply.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DnsAnswers {
    pub id: u16,
    pub addresses: Vec<IpAddr>,
    pub hostnames: Vec<String>,
}

pub fn create_a_packet(name: &str, id: u16) -> anyhow::Result<Vec<u8>> {
    create_query_packet(name, DnsTypes::A, id)
}

pub fn create_ptr_packet(ip_addr: &IpAddr, id: u16) -> anyhow::Result<Vec<u8>> {
    let ptr_string: String = reverse_address_to_ptr(ip_addr);
    create_query_packet(&ptr_string, DnsTypes::PTR, id)
}

pub fn create_query_packet(name: &str, qtype: DnsType, id: u16) -> anyhow::Result<Vec<u8>> {
    let query: DnsQuery = DnsQuery {
        qname: encode_dns_name(name),
        qtype,
        qclass: DnsClass(1),
        payload: Vec::new(),
    };
    let q_fixed_len: usize = 4;
    let qlen: usize = query.qname.len() + q_fixed_len;
    let total: usize = DNS_HDR_LEN + qlen;
    let mut buffer: Vec<u8> = vec![0u8; total];

    {
        let mut dns: MutableDnsPacket =
            MutableDnsPacket::new(&mut buffer).context("creating dns header")?;
        dns.set_id(id);
        dns.set_is_response(0);
        dns.set_opcode(Opcode::StandardQuery);
        dns.set_is_authoriative(0);
        dns.set_is_truncated(0);
        dns.set_is_recursion_desirable(1);
        dns.set_is_recursion_available(0);
        dns.set_zero_reserved(0);
        dns.set_is_non_authenticated_data(0);
        dns.set_rcode(Retcode::NoError);
        dns.set_query_count(1);
        dns.set_response_count(0);
        dns.set_authority_rr_count(0);
        dns.set_additional_rr_count(0);
    }

    let mut cursor: usize = DNS_HDR_LEN;

    buffer[cursor..cursor + query.qname.len()].copy_from_slice(&query.qname);
    cursor += query.qname.len();

    let type_bytes: [u8; 2] = query.qtype.0.to_be_bytes();
    buffer[cursor..cursor + 2].copy_from_slice(&type_bytes);
    cursor += 2;

    let class_bytes: [u8; 2] = query.qclass.0.to_be_bytes();
    buffer[cursor..cursor + 2].copy_from_slice(&class_bytes);

    Ok(buffer)
}

/// Reads A, AAAA and PTR answers out of a reply.
pub fn parse_answers(payload: &[u8]) -> anyhow::Result<DnsAnswers> {
    let dns = DnsPacket::new(payload).context("Failed to parse DNS packet")?;
    let mut answers = DnsAnswers {
        id: dns.get_id(),
        ..DnsAnswers::default()
    };

    for response in dns.get_responses() {
        match response.rtype {
            DnsTypes::A if response.data.len() == 4 => {
                let octets: [u8; 4] = [response.data[0], response.data[1], response.data[2], response.data[3]];
                answers.addresses.push(IpAddr::V4(Ipv4Addr::from(octets)));
            }
            DnsTypes::AAAA if response.data.len() == 16 => {
                let mut octets: [u8; 16] = [0u8; 16];
                octets.copy_from_slice(&response.data);
                answers.addresses.push(IpAddr::V6(Ipv6Addr::from(octets)));
            }
            DnsTypes::PTR => {
                if let Some(hostname) = decode_dns_name(payload, &response.data) {
                    answers.hostnames.push(hostname);
                }
            }
            _ => {}
        }
    }

    Ok(answers)
}

/// `10.0.0.5` becomes `5.0.0.10.in-addr.arpa`; IPv6 uses nibble form under `ip6.arpa`.
pub fn reverse_address_to_ptr(ip_addr: &IpAddr) -> String {
    match ip_addr {
        IpAddr::V4(ipv4_addr) => {
            let o: [u8; 4] = ipv4_addr.octets();
            format!("{}.{}.{}.{}.in-addr.arpa", o[3], o[2], o[1], o[0])
        }
        IpAddr::V6(ipv6_addr) => {
            let nibbles: Vec<String> = ipv6_addr
                .octets()
                .iter()
                .rev()
                .flat_map(|byte| [byte & 0x0F, byte >> 4])
                .map(|nibble| format!("{nibble:x}"))
                .collect();
            format!("{}.ip6.arpa", nibbles.join("."))
        }
    }
}

fn encode_dns_name(name: &str) -> Vec<u8> {
    let mut encoded: Vec<u8> = Vec::new();
    for label in name.split('.') {
        if label.is_empty() {
            continue;
        }
        encoded.push(label.len() as u8);
        encoded.extend_from_slice(label.as_bytes());
    }
    encoded.push(0);
    encoded
}

/// Decodes a name from record data, following compression pointers into `message`.
fn decode_dns_name(message: &[u8], data: &[u8]) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();
    let mut source: &[u8] = data;
    let mut cursor: usize = 0;
    let mut jumps: usize = 0;

    while cursor < source.len() {
        let len_byte: u8 = source[cursor];
        if len_byte == 0 {
            break;
        }

        if len_byte & POINTER_MASK == POINTER_MASK {
            let low: u8 = *source.get(cursor + 1)?;
            let offset: usize = (((len_byte & !POINTER_MASK) as usize) << 8) | low as usize;
            jumps += 1;
            if jumps > MAX_POINTER_JUMPS || offset >= message.len() {
                return None;
            }
            source = message;
            cursor = offset;
            continue;
        }

        let len: usize = len_byte as usize;
        cursor += 1;
        if cursor + len > source.len() {
            return None;
        }
        let label: &str = std::str::from_utf8(&source[cursor..cursor + len]).ok()?;
        parts.push(label.to_string());
        cursor += len;
    }

    if parts.is_empty() {
        return None;
    }
    Some(parts.join("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ptr_names() {
        let v4: IpAddr = "10.0.0.5".parse().unwrap();
        assert_eq!(reverse_address_to_ptr(&v4), "5.0.0.10.in-addr.arpa");

        let v6: IpAddr = "2001:db8::1".parse().unwrap();
        let ptr = reverse_address_to_ptr(&v6);
        assert!(ptr.starts_with("1.0.0.0."));
        assert!(ptr.ends_with(".8.b.d.0.1.0.0.2.ip6.arpa"));
    }

    #[test]
    fn a_query_layout() {
        let packet = create_a_packet("www.example.com", 0xBEEF).unwrap();
        assert_eq!(&packet[0..2], &[0xBE, 0xEF]);
        // qdcount
        assert_eq!(&packet[4..6], &[0, 1]);
        assert_eq!(&packet[DNS_HDR_LEN..DNS_HDR_LEN + 4], &[3, b'w', b'w', b'w']);
        // qtype A, qclass IN
        assert_eq!(&packet[packet.len() - 4..], &[0, 1, 0, 1]);
    }

    #[test]
    fn decode_follows_pointers() {
        // "example.com" at offset 12 of a fake message, then "www" + pointer to it.
        let mut message = vec![0u8; DNS_HDR_LEN];
        message.extend_from_slice(&[7, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 3, b'c', b'o', b'm', 0]);
        let data = [3, b'w', b'w', b'w', 0xC0, 12];

        assert_eq!(decode_dns_name(&message, &data), Some("www.example.com".to_string()));
    }

    #[test]
    fn decode_rejects_pointer_loops() {
        let mut message = vec![0u8; DNS_HDR_LEN];
        message.extend_from_slice(&[0xC0, 12]);
        let data = [0xC0, 12];
        assert_eq!(decode_dns_name(&message, &data), None);
    }
}
