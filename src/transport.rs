//! Register transport seam between the poller and the controller.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use tokio_modbus::client::{Context, Reader};
use tokio_modbus::prelude::*;

use crate::config::ControllerConfig;
use crate::error::{ReadError, TransportError};

/// Capability to open connections to a register-oriented controller.
///
/// The poller is the only owner of a transport; no other component may
/// issue register reads.
pub trait RegisterTransport: Send {
    type Conn: RegisterConnection;

    /// Open a fresh connection to the controller.
    fn connect(&self) -> impl Future<Output = Result<Self::Conn, TransportError>> + Send;
}

/// One open request/response channel to the controller.
pub trait RegisterConnection: Send {
    /// Read `count` consecutive registers starting at `address`.
    fn read_registers(
        &mut self,
        address: u16,
        count: u16,
    ) -> impl Future<Output = Result<Vec<u16>, ReadError>> + Send;

    /// Close the channel, releasing the socket.
    fn close(self) -> impl Future<Output = ()> + Send;
}

/// Modbus/TCP implementation of the transport seam.
#[derive(Debug)]
pub struct ModbusTransport {
    addr: SocketAddr,
    unit_id: u8,
    timeout: Duration,
}

impl ModbusTransport {
    pub fn new(config: &ControllerConfig) -> Result<Self, TransportError> {
        let addr: SocketAddr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|e| TransportError(format!("invalid controller address: {}", e)))?;

        Ok(Self {
            addr,
            unit_id: config.unit_id,
            timeout: Duration::from_millis(config.timeout_ms),
        })
    }
}

impl RegisterTransport for ModbusTransport {
    type Conn = ModbusConnection;

    async fn connect(&self) -> Result<ModbusConnection, TransportError> {
        let ctx = tokio::time::timeout(
            self.timeout,
            tcp::connect_slave(self.addr, Slave(self.unit_id)),
        )
        .await
        .map_err(|_| TransportError("connection timeout".to_string()))?
        .map_err(|e| TransportError(e.to_string()))?;

        Ok(ModbusConnection {
            ctx,
            timeout: self.timeout,
        })
    }
}

/// An established Modbus/TCP session.
pub struct ModbusConnection {
    ctx: Context,
    timeout: Duration,
}

impl RegisterConnection for ModbusConnection {
    async fn read_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>, ReadError> {
        tokio::time::timeout(self.timeout, self.ctx.read_holding_registers(address, count))
            .await
            .map_err(|_| ReadError::Transport("read timeout".to_string()))?
            .map_err(|e| ReadError::Transport(e.to_string()))?
            .map_err(|e| ReadError::Protocol(format!("{:?}", e)))
    }

    async fn close(mut self) {
        let _ = self.ctx.disconnect().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(host: &str) -> ControllerConfig {
        ControllerConfig {
            host: host.to_string(),
            port: 5020,
            unit_id: 1,
            timeout_ms: 100,
            word_order: Default::default(),
            poll_interval_secs: 10,
        }
    }

    #[test]
    fn test_hostname_is_rejected() {
        let err = ModbusTransport::new(&controller("controller.local")).unwrap_err();
        assert!(err.to_string().contains("invalid controller address"));
    }

    #[tokio::test]
    async fn test_connect_refused_is_transport_error() {
        // Nothing listens on this loopback port in the test environment.
        let transport = ModbusTransport::new(&controller("127.0.0.1")).unwrap();
        assert!(transport.connect().await.is_err());
    }
}
