//! # Register Transports
//!
//! The read engine talks to meters through [`RegisterTransport`]: one call per
//! Modbus transaction, addressed to a unit id on a shared bus. Transports are
//! owned by the polling loop and lent to meters per call.
//!
//! - [`RtuTransport`] drives a serial RS-485 line (requires the `rtu` feature)
//! - [`Interruptible`] wraps any transport and refuses new transactions once
//!   shutdown was requested

use std::future::Future;

use crate::error::{MeterError, MeterResult};
use crate::register::RegisterKind;
use crate::shutdown::Shutdown;

/// Transport statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportStats {
    pub requests_sent: u64,
    pub responses_received: u64,
    pub errors: u64,
    pub timeouts: u64,
}

impl TransportStats {
    /// Account for the outcome of one transaction.
    pub fn record<T>(&mut self, result: &MeterResult<T>) {
        self.requests_sent += 1;
        match result {
            Ok(_) => self.responses_received += 1,
            Err(MeterError::Timeout { .. }) => self.timeouts += 1,
            Err(_) => self.errors += 1,
        }
    }
}

/// One Modbus transaction per call, addressed by unit id.
pub trait RegisterTransport: Send {
    /// Open the underlying link.
    fn connect(&mut self) -> impl Future<Output = MeterResult<()>> + Send;

    /// Read input registers (function code 0x04).
    fn read_input_registers(
        &mut self,
        unit: u8,
        address: u16,
        count: u16,
    ) -> impl Future<Output = MeterResult<Vec<u16>>> + Send;

    /// Read holding registers (function code 0x03).
    fn read_holding_registers(
        &mut self,
        unit: u8,
        address: u16,
        count: u16,
    ) -> impl Future<Output = MeterResult<Vec<u16>>> + Send;

    /// Write holding registers (function code 0x10).
    fn write_holding_registers(
        &mut self,
        unit: u8,
        address: u16,
        values: &[u16],
    ) -> impl Future<Output = MeterResult<()>> + Send;

    /// Close the link. Must be safe to call after a failed transaction.
    fn disconnect(&mut self) -> impl Future<Output = MeterResult<()>> + Send;

    fn is_connected(&self) -> bool;

    fn get_stats(&self) -> TransportStats;

    /// Read registers of either kind.
    fn read_registers(
        &mut self,
        kind: RegisterKind,
        unit: u8,
        address: u16,
        count: u16,
    ) -> impl Future<Output = MeterResult<Vec<u16>>> + Send {
        async move {
            match kind {
                RegisterKind::Input => self.read_input_registers(unit, address, count).await,
                RegisterKind::Holding => self.read_holding_registers(unit, address, count).await,
            }
        }
    }
}

// ============================================================================
// Interruptible
// ============================================================================

/// Transport wrapper that fails new transactions with
/// [`MeterError::Interrupted`] once shutdown was requested.
///
/// Disconnecting is always allowed.
#[derive(Debug)]
pub struct Interruptible<T> {
    inner: T,
    shutdown: Shutdown,
}

impl<T: RegisterTransport> Interruptible<T> {
    pub fn new(inner: T, shutdown: Shutdown) -> Self {
        Self { inner, shutdown }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    fn check(&self) -> MeterResult<()> {
        if self.shutdown.is_triggered() {
            Err(MeterError::Interrupted)
        } else {
            Ok(())
        }
    }
}

impl<T: RegisterTransport> RegisterTransport for Interruptible<T> {
    async fn connect(&mut self) -> MeterResult<()> {
        self.check()?;
        self.inner.connect().await
    }

    async fn read_input_registers(&mut self, unit: u8, address: u16, count: u16) -> MeterResult<Vec<u16>> {
        self.check()?;
        self.inner.read_input_registers(unit, address, count).await
    }

    async fn read_holding_registers(&mut self, unit: u8, address: u16, count: u16) -> MeterResult<Vec<u16>> {
        self.check()?;
        self.inner.read_holding_registers(unit, address, count).await
    }

    async fn write_holding_registers(&mut self, unit: u8, address: u16, values: &[u16]) -> MeterResult<()> {
        self.check()?;
        self.inner.write_holding_registers(unit, address, values).await
    }

    async fn disconnect(&mut self) -> MeterResult<()> {
        self.inner.disconnect().await
    }

    fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    fn get_stats(&self) -> TransportStats {
        self.inner.get_stats()
    }
}

// ============================================================================
// RTU
// ============================================================================

#[cfg(feature = "rtu")]
pub use rtu::{RtuConfig, RtuTransport};

#[cfg(feature = "rtu")]
mod rtu {
    use std::time::Duration;

    use tokio_modbus::client::{rtu, Client as _, Context, Reader as _, Writer as _};
    use tokio_modbus::slave::{Slave, SlaveContext as _};
    use tokio_serial::{DataBits, Parity, SerialStream, StopBits};
    use tracing::{debug, trace};

    use super::{RegisterTransport, TransportStats};
    use crate::constants::{BROADCAST_UNIT, DEFAULT_BAUD_RATE, DEFAULT_RESPONSE_TIMEOUT_MS};
    use crate::error::{MeterError, MeterResult};

    /// Serial line settings. SDM meters use 8N1.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct RtuConfig {
        pub port: String,
        pub baud_rate: u32,
        pub timeout: Duration,
    }

    impl RtuConfig {
        pub fn new(port: impl Into<String>) -> Self {
            Self {
                port: port.into(),
                baud_rate: DEFAULT_BAUD_RATE,
                timeout: Duration::from_millis(DEFAULT_RESPONSE_TIMEOUT_MS),
            }
        }

        pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
            self.baud_rate = baud_rate;
            self
        }

        pub fn with_timeout(mut self, timeout: Duration) -> Self {
            self.timeout = timeout;
            self
        }
    }

    /// Modbus RTU master on a serial port.
    #[derive(Debug)]
    pub struct RtuTransport {
        config: RtuConfig,
        context: Option<Context>,
        stats: TransportStats,
    }

    impl RtuTransport {
        pub fn new(config: RtuConfig) -> Self {
            Self {
                config,
                context: None,
                stats: TransportStats::default(),
            }
        }

        pub fn config(&self) -> &RtuConfig {
            &self.config
        }

        fn timeout_ms(&self) -> u64 {
            u64::try_from(self.config.timeout.as_millis()).unwrap_or(u64::MAX)
        }

        async fn read(&mut self, holding: bool, unit: u8, address: u16, count: u16) -> MeterResult<Vec<u16>> {
            let timeout = self.config.timeout;
            let timeout_ms = self.timeout_ms();
            let context = self
                .context
                .as_mut()
                .ok_or_else(|| MeterError::connection("serial port not open"))?;
            context.set_slave(Slave(unit));

            trace!(unit, address, count, holding, "Read registers");
            let response = if holding {
                tokio::time::timeout(timeout, context.read_holding_registers(address, count)).await
            } else {
                tokio::time::timeout(timeout, context.read_input_registers(address, count)).await
            };

            let result = match response {
                Err(_) => Err(MeterError::timeout(
                    format!("unit {} did not answer read at 0x{:04X}", unit, address),
                    timeout_ms,
                )),
                Ok(Err(e)) => Err(MeterError::transport(e.to_string())),
                Ok(Ok(Err(code))) => Err(MeterError::Exception {
                    unit,
                    code: format!("{:?}", code),
                }),
                Ok(Ok(Ok(words))) => Ok(words),
            };
            self.stats.record(&result);
            result
        }
    }

    impl RegisterTransport for RtuTransport {
        async fn connect(&mut self) -> MeterResult<()> {
            let builder = tokio_serial::new(&self.config.port, self.config.baud_rate)
                .parity(Parity::None)
                .data_bits(DataBits::Eight)
                .stop_bits(StopBits::One)
                .timeout(self.config.timeout);
            let stream = SerialStream::open(&builder)
                .map_err(|e| MeterError::connection(format!("{}: {}", self.config.port, e)))?;

            self.context = Some(rtu::attach_slave(stream, Slave(BROADCAST_UNIT)));
            debug!(port = %self.config.port, baud = self.config.baud_rate, "Serial port open");
            Ok(())
        }

        async fn read_input_registers(&mut self, unit: u8, address: u16, count: u16) -> MeterResult<Vec<u16>> {
            self.read(false, unit, address, count).await
        }

        async fn read_holding_registers(&mut self, unit: u8, address: u16, count: u16) -> MeterResult<Vec<u16>> {
            self.read(true, unit, address, count).await
        }

        async fn write_holding_registers(&mut self, unit: u8, address: u16, values: &[u16]) -> MeterResult<()> {
            let timeout = self.config.timeout;
            let timeout_ms = self.timeout_ms();
            let context = self
                .context
                .as_mut()
                .ok_or_else(|| MeterError::connection("serial port not open"))?;
            context.set_slave(Slave(unit));

            trace!(unit, address, count = values.len(), "Write registers");
            let result = match tokio::time::timeout(timeout, context.write_multiple_registers(address, values)).await {
                Err(_) => Err(MeterError::timeout(
                    format!("unit {} did not answer write at 0x{:04X}", unit, address),
                    timeout_ms,
                )),
                Ok(Err(e)) => Err(MeterError::transport(e.to_string())),
                Ok(Ok(Err(code))) => Err(MeterError::Exception {
                    unit,
                    code: format!("{:?}", code),
                }),
                Ok(Ok(Ok(()))) => Ok(()),
            };
            self.stats.record(&result);
            result
        }

        async fn disconnect(&mut self) -> MeterResult<()> {
            if let Some(mut context) = self.context.take() {
                context.disconnect().await?;
                debug!(port = %self.config.port, "Serial port closed");
            }
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.context.is_some()
        }

        fn get_stats(&self) -> TransportStats {
            self.stats
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_config_defaults() {
            let config = RtuConfig::new("/dev/ttyUSB0");
            assert_eq!(config.baud_rate, 9600);
            assert_eq!(config.timeout, Duration::from_millis(1000));

            let config = config
                .with_baud_rate(19200)
                .with_timeout(Duration::from_millis(250));
            assert_eq!(config.baud_rate, 19200);
            assert_eq!(config.timeout, Duration::from_millis(250));
        }

        #[tokio::test]
        async fn test_read_before_connect_fails() {
            let mut transport = RtuTransport::new(RtuConfig::new("/dev/null"));
            assert!(!transport.is_connected());
            let err = transport.read_input_registers(1, 0, 2).await.unwrap_err();
            assert!(matches!(err, MeterError::Connection { .. }));
            transport.disconnect().await.unwrap();
        }

        #[tokio::test]
        async fn test_connect_to_missing_port() {
            let mut transport = RtuTransport::new(RtuConfig::new("/dev/does-not-exist-meter"));
            let err = transport.connect().await.unwrap_err();
            assert!(matches!(err, MeterError::Connection { .. }));
        }
    }
}

// ============================================================================
// Test transport
// ============================================================================

#[cfg(test)]
pub(crate) mod mock {
    use std::collections::VecDeque;

    use super::{RegisterTransport, TransportStats};
    use crate::error::{MeterError, MeterResult};
    use crate::register::RegisterKind;

    /// A recorded transaction.
    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum Request {
        Read {
            kind: RegisterKind,
            unit: u8,
            address: u16,
            count: u16,
        },
        Write {
            unit: u8,
            address: u16,
            values: Vec<u16>,
        },
    }

    /// Replays queued responses in order and records every request.
    #[derive(Debug, Default)]
    pub(crate) struct MockTransport {
        pub(crate) requests: Vec<Request>,
        pub(crate) responses: VecDeque<MeterResult<Vec<u16>>>,
        pub(crate) connected: bool,
        pub(crate) fail_connect: bool,
        pub(crate) stats: TransportStats,
    }

    impl MockTransport {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn respond(mut self, response: MeterResult<Vec<u16>>) -> Self {
            self.responses.push_back(response);
            self
        }

        fn next(&mut self) -> MeterResult<Vec<u16>> {
            let result = self
                .responses
                .pop_front()
                .unwrap_or_else(|| Err(MeterError::transport("no response prepared in mock")));
            self.stats.record(&result);
            result
        }

        fn read(&mut self, kind: RegisterKind, unit: u8, address: u16, count: u16) -> MeterResult<Vec<u16>> {
            self.requests.push(Request::Read {
                kind,
                unit,
                address,
                count,
            });
            self.next()
        }
    }

    impl RegisterTransport for MockTransport {
        async fn connect(&mut self) -> MeterResult<()> {
            if self.fail_connect {
                return Err(MeterError::connection("mock refuses"));
            }
            self.connected = true;
            Ok(())
        }

        async fn read_input_registers(&mut self, unit: u8, address: u16, count: u16) -> MeterResult<Vec<u16>> {
            self.read(RegisterKind::Input, unit, address, count)
        }

        async fn read_holding_registers(&mut self, unit: u8, address: u16, count: u16) -> MeterResult<Vec<u16>> {
            self.read(RegisterKind::Holding, unit, address, count)
        }

        async fn write_holding_registers(&mut self, unit: u8, address: u16, values: &[u16]) -> MeterResult<()> {
            self.requests.push(Request::Write {
                unit,
                address,
                values: values.to_vec(),
            });
            self.next().map(|_| ())
        }

        async fn disconnect(&mut self) -> MeterResult<()> {
            self.connected = false;
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        fn get_stats(&self) -> TransportStats {
            self.stats
        }
    }
}
