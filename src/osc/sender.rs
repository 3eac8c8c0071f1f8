//! # OSC Sender
//!
//! Fire-and-forget UDP sender bound to one target endpoint.

use async_trait::async_trait;
use rosc::{OscMessage, OscPacket, OscType};
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{debug, info};

use super::MessageSink;
use crate::error::{BridgeError, Result};

/// Sends OSC messages to a fixed target.
#[derive(Debug)]
pub struct OscSender {
    socket: UdpSocket,
    target: SocketAddr,
}

impl OscSender {
    /// Bind an ephemeral local socket for sending to `target`.
    ///
    /// # Errors
    ///
    /// Returns `Io` if no local UDP socket can be bound.
    pub async fn connect(target: SocketAddr) -> Result<Self> {
        let bind_addr: SocketAddr = if target.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(bind_addr).await?;
        info!("OSC target is {}", target);
        Ok(Self { socket, target })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

/// Encode a single message as an OSC packet.
///
/// # Errors
///
/// Returns `Osc` if `rosc` cannot encode the message.
pub fn encode_message(addr: &str, args: Vec<OscType>) -> Result<Vec<u8>> {
    let packet = OscPacket::Message(OscMessage {
        addr: addr.to_string(),
        args,
    });
    rosc::encoder::encode(&packet)
        .map_err(|e| BridgeError::Osc(format!("Failed to encode {}: {:?}", addr, e)))
}

#[async_trait]
impl MessageSink for OscSender {
    async fn send_message(&self, addr: &str, args: Vec<OscType>) -> Result<()> {
        let bytes = encode_message(addr, args)?;
        self.socket
            .send_to(&bytes, self.target)
            .await
            .map_err(|e| BridgeError::Osc(format!("Failed to send {}: {}", addr, e)))?;

        debug!("Sent OSC {} ({} bytes) to {}", addr, bytes.len(), self.target);
        Ok(())
    }
}
