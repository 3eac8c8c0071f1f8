//! # OSC Listener
//!
//! Receives datagrams from the RNBO runner and hands decoded packets to the
//! [`Router`].

use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::{debug, error, info};

use crate::error::{BridgeError, Result};
use crate::router::Router;

/// Largest datagram we accept.
const MAX_DATAGRAM: usize = 65_536;

/// Pause after a failed receive so a broken socket cannot spin the task.
const RECV_ERROR_BACKOFF: Duration = Duration::from_millis(10);

/// Run of consecutive receive failures.
#[derive(Debug, Default)]
struct ErrorStreak {
    count: u64,
}

impl ErrorStreak {
    /// Count a failure; `true` if it starts a new streak.
    fn fail(&mut self) -> bool {
        self.count += 1;
        self.count == 1
    }

    /// End the streak, returning its length if there was one.
    fn recover(&mut self) -> Option<u64> {
        let ended = (self.count > 0).then_some(self.count);
        self.count = 0;
        ended
    }
}

/// Bound UDP listener for inbound OSC.
#[derive(Debug)]
pub struct OscListener {
    socket: UdpSocket,
}

impl OscListener {
    /// Bind the listener on all interfaces at `port`.
    ///
    /// # Errors
    ///
    /// Returns `Osc` if the port cannot be bound.
    pub async fn bind_port(port: u16) -> Result<Self> {
        Self::bind(([0, 0, 0, 0], port).into()).await
    }

    /// Bind the listener at `addr`.
    ///
    /// # Errors
    ///
    /// Returns `Osc` if the address cannot be bound.
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|e| BridgeError::Osc(format!("Could not start OSC server on {}: {}", addr, e)))?;

        info!(
            "OSC server listening on {}",
            socket.local_addr().unwrap_or(addr)
        );
        Ok(Self { socket })
    }

    /// Local address actually bound (useful with port 0).
    ///
    /// # Errors
    ///
    /// Returns `Io` if the socket cannot report its address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Receive and route datagrams until the task is dropped.
    ///
    /// Undecodable datagrams are skipped. Receive errors are logged once per
    /// streak and followed by a short pause.
    pub async fn run(self, router: Router) {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let mut errors = ErrorStreak::default();

        loop {
            let received = self.socket.recv_from(&mut buf).await;
            if received.is_ok() {
                if let Some(count) = errors.recover() {
                    info!("OSC receive recovered after {} errors", count);
                }
            }

            match received {
                Ok((len, from)) => match rosc::decoder::decode_udp(&buf[..len]) {
                    Ok((_, packet)) => {
                        let applied = router.dispatch_packet(&packet);
                        debug!("OSC {} bytes from {} -> {} slot(s)", len, from, applied);
                    }
                    Err(e) => {
                        debug!("OSC decode error from {}: {:?}", from, e);
                    }
                },
                Err(e) => {
                    if errors.fail() {
                        error!("OSC receive error: {}", e);
                    } else {
                        debug!("OSC receive error: {}", e);
                    }
                    tokio::time::sleep(RECV_ERROR_BACKOFF).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_streak_reports_first_failure_only() {
        let mut streak = ErrorStreak::default();
        assert_eq!(streak.recover(), None);

        assert!(streak.fail());
        assert!(!streak.fail());
        assert!(!streak.fail());
        assert_eq!(streak.recover(), Some(3));

        // a new streak is reported again
        assert!(streak.fail());
        assert_eq!(streak.recover(), Some(1));
    }

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let listener = OscListener::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn test_bind_taken_port_fails() {
        let first = OscListener::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let taken = first.local_addr().unwrap();

        match OscListener::bind(taken).await {
            Err(BridgeError::Osc(msg)) => assert!(msg.contains("Could not start OSC server")),
            other => panic!("Expected Osc error, got: {:?}", other),
        }
    }
}
