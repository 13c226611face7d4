//! A minimal stub resolver.
//!
//! Sends one query at a time to a single recursive nameserver over UDP and
//! waits for the reply carrying the matching transaction id.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tracing::debug;

use scopr_common::error::ResolveError;
use scopr_common::ports::Resolver;

use crate::dns::{self, DnsAnswers};

const QUERY_TIMEOUT: Duration = Duration::from_secs(3);
const MAX_ATTEMPTS: usize = 2;
const MAX_REPLY_LEN: usize = 4096;

#[derive(Debug, Clone)]
pub struct DnsResolver {
    nameserver: SocketAddr,
    timeout: Duration,
}

impl DnsResolver {
    pub fn new(nameserver: SocketAddr) -> Self {
        Self {
            nameserver,
            timeout: QUERY_TIMEOUT,
        }
    }

    /// Hostnames published as PTR records for `ip`.
    pub async fn reverse(&self, ip: &IpAddr) -> Result<Vec<String>, ResolveError> {
        let id: u16 = rand::random();
        let packet: Vec<u8> =
            dns::create_ptr_packet(ip, id).map_err(|e| ResolveError::Malformed(e.to_string()))?;
        let answers: DnsAnswers = self.exchange(&packet, id).await?;
        Ok(answers.hostnames)
    }

    async fn exchange(&self, packet: &[u8], id: u16) -> Result<DnsAnswers, ResolveError> {
        let bind_addr: SocketAddr = match self.nameserver {
            SocketAddr::V4(_) => SocketAddr::from(([0, 0, 0, 0], 0)),
            SocketAddr::V6(_) => SocketAddr::from(([0u16; 8], 0)),
        };
        let socket: UdpSocket = UdpSocket::bind(bind_addr).await?;
        socket.connect(self.nameserver).await?;

        for attempt in 1..=MAX_ATTEMPTS {
            socket.send(packet).await?;
            match tokio::time::timeout(self.timeout, recv_matching(&socket, id)).await {
                Ok(result) => return result,
                Err(_) => debug!("dns query {id} timed out (attempt {attempt}/{MAX_ATTEMPTS})"),
            }
        }
        Err(ResolveError::Timeout)
    }
}

async fn recv_matching(socket: &UdpSocket, id: u16) -> Result<DnsAnswers, ResolveError> {
    let mut buffer: Vec<u8> = vec![0u8; MAX_REPLY_LEN];
    loop {
        let len: usize = socket.recv(&mut buffer).await?;
        let answers: DnsAnswers = match dns::parse_answers(&buffer[..len]) {
            Ok(answers) => answers,
            Err(e) => return Err(ResolveError::Malformed(e.to_string())),
        };
        if answers.id == id {
            return Ok(answers);
        }
    }
}

#[async_trait]
impl Resolver for DnsResolver {
    async fn resolve(&self, name: &str) -> Result<Option<IpAddr>, ResolveError> {
        let id: u16 = rand::random();
        let packet: Vec<u8> =
            dns::create_a_packet(name, id).map_err(|e| ResolveError::Malformed(e.to_string()))?;
        let answers: DnsAnswers = self.exchange(&packet, id).await?;
        Ok(answers.addresses.into_iter().next())
    }
}
