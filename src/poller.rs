//! # Polling Loop
//!
//! Connects the bus, prints an identity banner per meter, then reads every
//! meter once per cycle and writes one status line per cycle until shutdown:
//!
//! ```text
//! 16.10.2026 12:00:00.123456	front_flat 230.0 V,  1.50 A,  345.0 W, +0.980, 50.00 Hz,   1234.567 kWh	rear_flat ...
//! ```
//!
//! A meter that fails is reported in its column and polled again next cycle.
//! The transport is disconnected on every exit path after a successful
//! connect.

use std::io::Write;
use std::time::Duration;

use chrono::Local;
use tracing::{debug, error, info, warn};

use crate::error::{MeterError, MeterResult};
use crate::meter::{Meter, Readings};
use crate::present::present;
use crate::shutdown::Shutdown;
use crate::transport::{Interruptible, RegisterTransport, TransportStats};
use crate::value::RegisterValue;

/// Timestamp prefix of every status line.
pub const TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M:%S%.6f";

/// Lifecycle of the polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Connecting,
    Connected,
    Disconnecting,
    Closed,
}

/// Polls a fixed set of meters over one transport.
#[derive(Debug)]
pub struct Poller {
    meters: Vec<Meter>,
    interval: Duration,
    max_cycles: Option<u64>,
    shutdown: Shutdown,
    state: PollState,
}

impl Poller {
    pub fn new(meters: Vec<Meter>, shutdown: Shutdown) -> Self {
        Self {
            meters,
            interval: Duration::ZERO,
            max_cycles: None,
            shutdown,
            state: PollState::Idle,
        }
    }

    /// Pause between cycles.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Stop after `cycles` status lines.
    pub fn with_max_cycles(mut self, cycles: u64) -> Self {
        self.max_cycles = Some(cycles);
        self
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn meters(&self) -> &[Meter] {
        &self.meters
    }

    fn set_state(&mut self, state: PollState) {
        debug!(from = ?self.state, to = ?state, "Poller state");
        self.state = state;
    }

    /// Run until shutdown or the cycle limit.
    ///
    /// Returns the transport statistics. Only a failed connect or a failing
    /// output writer end the loop with an error; shutdown is a normal exit.
    pub async fn run<T, W>(&mut self, transport: T, out: &mut W) -> MeterResult<TransportStats>
    where
        T: RegisterTransport,
        W: Write,
    {
        self.set_state(PollState::Connecting);
        let mut bus = Interruptible::new(transport, self.shutdown.clone());
        match bus.connect().await {
            Ok(()) => {}
            Err(MeterError::Interrupted) => {
                self.set_state(PollState::Closed);
                return Ok(bus.get_stats());
            }
            Err(e) => {
                error!(error = %e, "Unable to connect");
                self.set_state(PollState::Closed);
                return Err(e);
            }
        }

        self.set_state(PollState::Connected);
        let result = self.poll(&mut bus, out).await;

        self.set_state(PollState::Disconnecting);
        if let Err(e) = bus.disconnect().await {
            warn!(error = %e, "Disconnect failed");
        }
        let stats = bus.get_stats();
        self.set_state(PollState::Closed);
        info!(
            requests = stats.requests_sent,
            responses = stats.responses_received,
            errors = stats.errors,
            timeouts = stats.timeouts,
            "Polling stopped"
        );

        match result {
            Ok(()) | Err(MeterError::Interrupted) => Ok(stats),
            Err(e) => Err(e),
        }
    }

    async fn poll<T, W>(&self, bus: &mut T, out: &mut W) -> MeterResult<()>
    where
        T: RegisterTransport,
        W: Write,
    {
        for meter in &self.meters {
            match banner(meter, bus).await {
                Ok(Some(line)) => writeln!(out, "{}", line)?,
                Ok(None) => {}
                Err(MeterError::Interrupted) => return Err(MeterError::Interrupted),
                Err(e) => warn!(meter = meter.name(), error = %e, "Unable to identify meter"),
            }
        }
        out.flush()?;

        let mut cycles = 0u64;
        loop {
            let line = self.cycle(bus).await?;
            writeln!(out, "{}", line)?;
            out.flush()?;

            cycles += 1;
            if self.max_cycles.is_some_and(|max| cycles >= max) {
                return Ok(());
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = self.shutdown.triggered() => return Err(MeterError::Interrupted),
            }
        }
    }

    /// Read every meter once and render the status line.
    async fn cycle<T: RegisterTransport>(&self, bus: &mut T) -> MeterResult<String> {
        let mut line = Local::now().format(TIMESTAMP_FORMAT).to_string();

        for (index, meter) in self.meters.iter().enumerate() {
            if self.shutdown.is_triggered() {
                return Err(MeterError::Interrupted);
            }
            let delay = meter.limits().inter_request_delay_ms;
            if index > 0 && delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            line.push('\t');
            match meter.read_cycle(bus).await {
                Ok(readings) => line.push_str(&render(meter, &readings)),
                Err(MeterError::Interrupted) => return Err(MeterError::Interrupted),
                Err(e) => {
                    error!(meter = meter.name(), error = %e, "Communication failed");
                    line.push_str(&failure(meter, &e));
                }
            }
        }

        Ok(line)
    }
}

/// `Meter <name>: <serial> sw v<version> @ <unit>`, or `None` for models
/// without identity registers.
pub async fn banner<T: RegisterTransport>(meter: &Meter, bus: &mut T) -> MeterResult<Option<String>> {
    const IDENTITY: [&str; 2] = ["serial_number", "software_version"];
    if !IDENTITY.iter().all(|name| meter.table().contains(name)) {
        debug!(meter = meter.name(), "Model has no identity registers");
        return Ok(None);
    }

    let readings = meter.read(bus, &IDENTITY, true).await?;
    let serial = readings.get("serial_number").copied().unwrap_or(RegisterValue::Unavailable);
    let version = readings.get("software_version").copied().unwrap_or(RegisterValue::Unavailable);
    if !serial.is_available() {
        warn!(meter = meter.name(), "Identity registers unavailable");
    }

    Ok(Some(format!(
        "Meter {}: {} sw v{} @ {}",
        meter.name(),
        serial,
        version,
        meter.unit_label()
    )))
}

/// `<name> <value>, <value>, ...` over the meter's display list.
pub fn render(meter: &Meter, readings: &Readings) -> String {
    let values: Vec<String> = meter
        .display()
        .iter()
        .filter_map(|name| meter.table().lookup(name).ok())
        .map(|entry| {
            let value = readings.get(entry.name).copied().unwrap_or(RegisterValue::Unavailable);
            present(entry, &value)
        })
        .collect();
    format!("{} {}", meter.name(), values.join(", "))
}

/// Status column of a meter whose cycle failed.
pub fn failure(meter: &Meter, error: &MeterError) -> String {
    format!("Communication with meter {} failed due to {}.", meter.name(), error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MeterModel;
    use crate::transport::mock::MockTransport;

    fn floats(values: &[f32]) -> Vec<u16> {
        values
            .iter()
            .flat_map(|v| {
                let bits = v.to_bits();
                [(bits >> 16) as u16, bits as u16]
            })
            .collect()
    }

    fn meter() -> Meter {
        Meter::new("front_flat", MeterModel::Sdm120, 1).unwrap()
    }

    #[test]
    fn test_render() {
        let meter = meter();
        let readings: Readings = [
            ("voltage", RegisterValue::F32(230.0)),
            ("current", RegisterValue::F32(1.5)),
            ("power_active", RegisterValue::F32(345.0)),
            ("power_factor", RegisterValue::F32(0.98)),
            ("frequency", RegisterValue::F32(50.0)),
            ("total_energy_active", RegisterValue::F32(1234.567)),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            render(&meter, &readings),
            "front_flat 230.0 V,  1.50 A,  345.0 W, +0.980, 50.00 Hz,   1234.567 kWh"
        );
    }

    #[test]
    fn test_render_missing_is_nan() {
        let meter = meter();
        let line = render(&meter, &Readings::new());
        assert!(line.starts_with("front_flat   NaN V,"));
    }

    #[test]
    fn test_failure_text() {
        let line = failure(&meter(), &MeterError::timeout("no answer", 1000));
        assert_eq!(
            line,
            "Communication with meter front_flat failed due to Timeout after 1000ms: no answer."
        );
    }

    #[tokio::test]
    async fn test_banner() {
        let mut bus = MockTransport::new().respond(Ok(vec![0x0001, 0xE240, 0x0104]));
        let line = banner(&meter(), &mut bus).await.unwrap();
        assert_eq!(line.as_deref(), Some("Meter front_flat: 123456 sw v260 @ 1"));
    }

    #[tokio::test]
    async fn test_connect_failure_is_returned() {
        let mut poller = Poller::new(vec![meter()], Shutdown::new());
        let bus = MockTransport {
            fail_connect: true,
            ..MockTransport::new()
        };
        let mut out = Vec::new();
        let err = poller.run(bus, &mut out).await.unwrap_err();
        assert!(matches!(err, MeterError::Connection { .. }));
        assert_eq!(poller.state(), PollState::Closed);
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_one_cycle_with_failed_meter() {
        let mut poller = Poller::new(vec![meter()], Shutdown::new()).with_max_cycles(1);
        // banner fails, every batch of the cycle fails
        let mut out = Vec::new();
        let stats = poller.run(MockTransport::new(), &mut out).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "Meter front_flat: n/a sw vn/a @ 1");
        let (_, column) = lines[1].split_once('\t').unwrap();
        assert!(column.starts_with("Communication with meter front_flat failed due to Transport error"));
        assert_eq!(stats.requests_sent, 6);
        assert_eq!(poller.state(), PollState::Closed);
    }

    #[tokio::test]
    async fn test_shutdown_before_connect() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        let mut poller = Poller::new(vec![meter()], shutdown);
        let mut out = Vec::new();
        let stats = poller.run(MockTransport::new(), &mut out).await.unwrap();
        assert_eq!(stats.requests_sent, 0);
    }

    #[tokio::test]
    async fn test_timestamp_prefix() {
        let mut poller = Poller::new(vec![meter()], Shutdown::new()).with_max_cycles(1);
        let mut bus = MockTransport::new().respond(Ok(vec![0x0001, 0xE240, 0x0104]));
        for words in [
            floats(&[230.0; 19]),
            floats(&[50.0; 13]),
            floats(&[1.0; 4]),
            floats(&[1234.5; 2]),
            floats(&[60.0; 14]),
        ] {
            bus = bus.respond(Ok(words));
        }
        let mut out = Vec::new();
        poller.run(bus, &mut out).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        let status = text.lines().nth(1).unwrap();
        let (stamp, column) = status.split_once('\t').unwrap();
        chrono::NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).unwrap();
        assert!(column.starts_with("front_flat 230.0 V,"), "{}", column);
        assert!(column.ends_with("  1234.500 kWh"), "{}", column);
    }
}
