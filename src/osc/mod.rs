//! # OSC Module
//!
//! UDP transport for the RNBO runner's OSC interface.
//!
//! This module handles:
//! - Sending single messages to the runner (gamepad parameters, handshakes)
//! - Listening for messages the runner emits (LED parameters)
//! - The `/rnbo/listeners/add` registration handshake

pub mod listener;
pub mod sender;

use async_trait::async_trait;
use rosc::OscType;
use tracing::info;

use crate::error::Result;

pub use listener::OscListener;
pub use sender::OscSender;

/// Address used to register an OSC listener with the RNBO runner.
pub const LISTENERS_ADD: &str = "/rnbo/listeners/add";

/// Address that starts the runner's JACK transport.
pub const TRANSPORT_ROLLING: &str = "/rnbo/jack/transport/rolling";

/// Destination for outbound OSC messages.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Send one message carrying `args` to `addr`.
    async fn send_message(&self, addr: &str, args: Vec<OscType>) -> Result<()>;
}

/// Ask the runner to forward its outbound messages to `listener` (`host:port`).
///
/// # Examples
///
/// ```no_run
/// use rnbo_bridge::osc::{register_listener, OscSender};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let sender = OscSender::connect("127.0.0.1:1234".parse()?).await?;
///     register_listener(&sender, "127.0.0.1:4321").await?;
///     Ok(())
/// }
/// ```
pub async fn register_listener<S: MessageSink + ?Sized>(sink: &S, listener: &str) -> Result<()> {
    sink.send_message(LISTENERS_ADD, vec![OscType::String(listener.to_string())])
        .await?;
    info!("Registered OSC listener {} with RNBO", listener);
    Ok(())
}

/// Start the runner's transport.
pub async fn start_transport<S: MessageSink + ?Sized>(sink: &S) -> Result<()> {
    sink.send_message(TRANSPORT_ROLLING, vec![OscType::Int(1)])
        .await?;
    info!("Requested RNBO transport start");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_listener_message() {
        let mut sink = MockMessageSink::new();
        sink.expect_send_message()
            .withf(|addr, args| {
                addr == "/rnbo/listeners/add"
                    && args == &vec![OscType::String("127.0.0.1:4321".to_string())]
            })
            .times(1)
            .returning(|_, _| Ok(()));

        tokio_test::assert_ok!(register_listener(&sink, "127.0.0.1:4321").await);
    }

    #[tokio::test]
    async fn test_start_transport_message() {
        let mut sink = MockMessageSink::new();
        sink.expect_send_message()
            .withf(|addr, args| {
                addr == "/rnbo/jack/transport/rolling" && args == &vec![OscType::Int(1)]
            })
            .times(1)
            .returning(|_, _| Ok(()));

        tokio_test::assert_ok!(start_transport(&sink).await);
    }

    #[tokio::test]
    async fn test_register_listener_propagates_failure() {
        let mut sink = MockMessageSink::new();
        sink.expect_send_message()
            .returning(|_, _| Err(crate::error::BridgeError::Osc("down".to_string())));

        tokio_test::assert_err!(register_listener(&sink, "127.0.0.1:4321").await);
    }
}
