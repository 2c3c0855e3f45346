//! # Meters
//!
//! A [`Meter`] is one physical device on the bus: a user-facing name, a unit
//! id and its own corrected copy of the model's register table. Reads go
//! through the batched read engine: requested entries are partitioned by
//! `(kind, batch)`, each partition is fetched with a single transaction and
//! sliced back into values.
//!
//! A partition that fails (timeout, CRC error, exception, short answer) only
//! marks its own measurements [`RegisterValue::Unavailable`]; the remaining
//! partitions are still read.
//!
//! ```rust,no_run
//! use meter_reader::{Meter, MeterModel, RegisterKind, RtuConfig, RtuTransport, RegisterTransport};
//!
//! # async fn example() -> meter_reader::MeterResult<()> {
//! let meter = Meter::new("front_flat", MeterModel::Sdm120, 1)?;
//! let mut bus = RtuTransport::new(RtuConfig::new("/dev/ttyUSB0"));
//! bus.connect().await?;
//!
//! let readings = meter.read_all(&mut bus, RegisterKind::Input).await?;
//! println!("{} V", readings["voltage"]);
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, warn};

use crate::banks::apply_corrections;
use crate::batcher::plan_reads;
use crate::bytes::ByteOrder;
use crate::codec::encode;
use crate::constants::{BROADCAST_UNIT, MAX_UNIT_ID};
use crate::device_limits::DeviceLimits;
use crate::error::{MeterError, MeterResult};
use crate::models::MeterModel;
use crate::register::{RegisterEntry, RegisterKind, RegisterTable};
use crate::transport::RegisterTransport;
use crate::value::RegisterValue;

/// Measurement values by name.
pub type Readings = HashMap<&'static str, RegisterValue>;

/// Result of reading a set of partitions.
struct Sweep {
    readings: Readings,
    batches: usize,
    failed: usize,
    last_error: Option<MeterError>,
}

/// One meter on the bus.
#[derive(Debug, Clone)]
pub struct Meter {
    name: String,
    unit: u8,
    table: RegisterTable,
    limits: DeviceLimits,
    word_order: ByteOrder,
    interesting_holdings: Vec<&'static str>,
    display: Vec<&'static str>,
}

impl Meter {
    /// Build a meter of a known model: copy the model's table, apply its bank
    /// rules and validate the result against the model's limits.
    pub fn new(name: impl Into<String>, model: MeterModel, unit: u8) -> MeterResult<Self> {
        let mut table = RegisterTable::build(model);
        apply_corrections(&mut table, model.bank_rules())?;

        Self::from_table(name, unit, table, model.limits(), model.word_order())?
            .with_interesting_holdings(model.interesting_holdings())?
            .with_display(model.display())
    }

    /// Build a meter from an already corrected table.
    pub fn from_table(
        name: impl Into<String>,
        unit: u8,
        table: RegisterTable,
        limits: DeviceLimits,
        word_order: ByteOrder,
    ) -> MeterResult<Self> {
        let name = name.into();
        if unit > MAX_UNIT_ID {
            return Err(MeterError::config(format!(
                "meter {}: unit id {} out of range 0..={}",
                name, unit, MAX_UNIT_ID
            )));
        }
        table.validate(&limits)?;
        debug!(meter = %name, model = table.model(), unit, entries = table.len(), "Register table ready");

        Ok(Self {
            name,
            unit,
            table,
            limits,
            word_order,
            interesting_holdings: Vec::new(),
            display: Vec::new(),
        })
    }

    /// Holding registers read along with the input registers each cycle.
    pub fn with_interesting_holdings(mut self, names: &[&'static str]) -> MeterResult<Self> {
        for name in names {
            let entry = self.table.lookup(name)?;
            if entry.kind != RegisterKind::Holding {
                return Err(MeterError::table_defect(
                    self.table.model(),
                    format!("`{}` is not a holding register", name),
                ));
            }
        }
        self.interesting_holdings = names.to_vec();
        Ok(self)
    }

    /// Override the model's word order for two-register values.
    pub fn with_word_order(mut self, word_order: ByteOrder) -> Self {
        self.word_order = word_order;
        self
    }

    /// Measurements shown on the status line.
    pub fn with_display(mut self, names: &[&'static str]) -> MeterResult<Self> {
        for name in names {
            self.table.lookup(name)?;
        }
        self.display = names.to_vec();
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &str {
        self.table.model()
    }

    pub fn unit(&self) -> u8 {
        self.unit
    }

    /// Unit id, or "broadcast" for unit 0.
    pub fn unit_label(&self) -> String {
        if self.unit == BROADCAST_UNIT {
            "broadcast".to_string()
        } else {
            self.unit.to_string()
        }
    }

    pub fn table(&self) -> &RegisterTable {
        &self.table
    }

    pub fn limits(&self) -> &DeviceLimits {
        &self.limits
    }

    pub fn word_order(&self) -> ByteOrder {
        self.word_order
    }

    pub fn interesting_holdings(&self) -> &[&'static str] {
        &self.interesting_holdings
    }

    pub fn display(&self) -> &[&'static str] {
        &self.display
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Read every register of one kind, scaled.
    pub async fn read_all<T: RegisterTransport>(
        &self,
        transport: &mut T,
        kind: RegisterKind,
    ) -> MeterResult<Readings> {
        let entries: Vec<RegisterEntry> = self.table.entries_of(kind).copied().collect();
        Ok(self.sweep(transport, &entries, true).await?.readings)
    }

    /// Read the named measurements. `scaling = false` returns raw decodes.
    ///
    /// Unknown names fail before any transaction is issued.
    pub async fn read<T: RegisterTransport>(
        &self,
        transport: &mut T,
        names: &[&str],
        scaling: bool,
    ) -> MeterResult<Readings> {
        let entries = self.resolve(names)?;
        Ok(self.sweep(transport, &entries, scaling).await?.readings)
    }

    /// Read a single scaled measurement.
    pub async fn read_value<T: RegisterTransport>(
        &self,
        transport: &mut T,
        name: &str,
    ) -> MeterResult<RegisterValue> {
        let readings = self.read(transport, &[name], true).await?;
        Ok(readings
            .get(self.table.lookup(name)?.name)
            .copied()
            .unwrap_or(RegisterValue::Unavailable))
    }

    /// One polling cycle: all input registers plus the interesting holdings.
    ///
    /// Fails with the last transport error when no partition answered at all,
    /// so a silent meter is reported instead of a line of unavailable values.
    pub async fn read_cycle<T: RegisterTransport>(&self, transport: &mut T) -> MeterResult<Readings> {
        let mut entries: Vec<RegisterEntry> =
            self.table.entries_of(RegisterKind::Input).copied().collect();
        entries.extend(self.resolve(&self.interesting_holdings)?);

        let sweep = self.sweep(transport, &entries, true).await?;
        match sweep.last_error {
            Some(error) if sweep.failed == sweep.batches => Err(error),
            _ => Ok(sweep.readings),
        }
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Encode and write one holding register.
    pub async fn write<T: RegisterTransport>(
        &self,
        transport: &mut T,
        name: &str,
        value: f64,
    ) -> MeterResult<()> {
        let entry = self.table.lookup(name)?;
        if entry.kind != RegisterKind::Holding {
            return Err(MeterError::config(format!(
                "`{}` is an input register and cannot be written",
                name
            )));
        }
        if !self.limits.is_write_within_limits(entry.word_count) {
            return Err(MeterError::config(format!(
                "`{}` needs {} registers, device accepts {} per write",
                name, entry.word_count, self.limits.max_write_registers
            )));
        }

        let raw = if entry.scale == 1.0 {
            value
        } else {
            value / entry.scale
        };
        let words = encode(raw, entry.data_type, self.word_order)?;
        debug!(meter = %self.name, name, value, address = entry.address, "Write register");
        transport
            .write_holding_registers(self.unit, entry.address, &words)
            .await
    }

    // ========================================================================
    // Engine
    // ========================================================================

    fn resolve(&self, names: &[&str]) -> MeterResult<Vec<RegisterEntry>> {
        names
            .iter()
            .map(|name| self.table.lookup(name).copied())
            .collect()
    }

    async fn sweep<T: RegisterTransport>(
        &self,
        transport: &mut T,
        entries: &[RegisterEntry],
        scaling: bool,
    ) -> MeterResult<Sweep> {
        let plan = plan_reads(entries);
        let mut sweep = Sweep {
            readings: Readings::with_capacity(entries.len()),
            batches: plan.len(),
            failed: 0,
            last_error: None,
        };

        for (index, batch) in plan.iter().enumerate() {
            if index > 0 && self.limits.inter_request_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.limits.inter_request_delay_ms)).await;
            }

            let result = transport
                .read_registers(batch.kind, self.unit, batch.start, batch.count)
                .await
                .and_then(|words| batch.decode(&words, self.word_order, scaling));

            match result {
                Ok(values) => sweep.readings.extend(values),
                Err(e) if e.is_recoverable() => {
                    warn!(
                        meter = %self.name,
                        kind = %batch.kind,
                        batch = batch.batch,
                        start = batch.start,
                        count = batch.count,
                        error = %e,
                        "Batch read failed"
                    );
                    sweep.readings.extend(batch.unavailable());
                    sweep.failed += 1;
                    sweep.last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(sweep)
    }
}

// ============================================================================
// Tests
// ============================================================================
