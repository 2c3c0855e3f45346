//! # Register Tables
//!
//! A [`RegisterTable`] maps measurement names of one meter model to their
//! physical location, data type, scale, unit and read batch.
//!
//! Tables are compiled-in per model (see [`crate::models`]). Each meter gets
//! its own deep copy via [`RegisterTable::build`], which the model's bank rules
//! then correct in place before [`RegisterTable::validate`] checks it against
//! the device limits. After that the table is only read.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::batcher::ReadBatch;
use crate::device_limits::DeviceLimits;
use crate::error::{MeterError, MeterResult};
use crate::models::MeterModel;
use crate::present::{format_of, FormatSpec};

/// Which read function a register is served by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RegisterKind {
    /// Read-only measurements (FC04).
    Input,
    /// Configuration and identity (FC03 / FC16).
    Holding,
}

impl fmt::Display for RegisterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterKind::Input => f.write_str("input"),
            RegisterKind::Holding => f.write_str("holding"),
        }
    }
}

/// How the words of a register are decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
}

impl DataType {
    /// Number of 16-bit words the type occupies.
    #[inline]
    pub const fn word_count(&self) -> u16 {
        match self {
            DataType::Int16 | DataType::Uint16 => 1,
            DataType::Int32 | DataType::Uint32 | DataType::Float32 => 2,
        }
    }

    /// Representable range as f64.
    pub fn range(&self) -> (f64, f64) {
        match self {
            DataType::Int16 => (f64::from(i16::MIN), f64::from(i16::MAX)),
            DataType::Uint16 => (0.0, f64::from(u16::MAX)),
            DataType::Int32 => (f64::from(i32::MIN), f64::from(i32::MAX)),
            DataType::Uint32 => (0.0, f64::from(u32::MAX)),
            DataType::Float32 => (f64::from(f32::MIN), f64::from(f32::MAX)),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Int16 => "int16",
            DataType::Uint16 => "uint16",
            DataType::Int32 => "int32",
            DataType::Uint32 => "uint32",
            DataType::Float32 => "float32",
        };
        f.write_str(name)
    }
}

/// One logical measurement of a meter model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegisterEntry {
    /// Unique key within the model's table.
    pub name: &'static str,
    /// Register offset.
    pub address: u16,
    /// Width in 16-bit words.
    pub word_count: u16,
    pub kind: RegisterKind,
    pub data_type: DataType,
    /// Applied after decoding unless raw values are requested.
    pub scale: f64,
    /// Display unit, may be empty.
    pub unit: &'static str,
    /// Human readable description.
    pub label: &'static str,
    /// Entries sharing (kind, batch) are read in one transaction.
    pub batch: u16,
    /// Display format, derived from the name when the table is built.
    pub format: FormatSpec,
}

impl RegisterEntry {
    /// Input register entry with a word count matching its data type.
    pub const fn input(
        name: &'static str,
        address: u16,
        data_type: DataType,
        label: &'static str,
        unit: &'static str,
        batch: u16,
    ) -> Self {
        Self::new(name, address, RegisterKind::Input, data_type, label, unit, batch)
    }

    /// Holding register entry with a word count matching its data type.
    pub const fn holding(
        name: &'static str,
        address: u16,
        data_type: DataType,
        label: &'static str,
        unit: &'static str,
        batch: u16,
    ) -> Self {
        Self::new(name, address, RegisterKind::Holding, data_type, label, unit, batch)
    }

    const fn new(
        name: &'static str,
        address: u16,
        kind: RegisterKind,
        data_type: DataType,
        label: &'static str,
        unit: &'static str,
        batch: u16,
    ) -> Self {
        Self {
            name,
            address,
            word_count: data_type.word_count(),
            kind,
            data_type,
            scale: 1.0,
            unit,
            label,
            batch,
            format: FormatSpec::PLAIN,
        }
    }

    /// Override the scale factor.
    pub const fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// First address past the entry.
    #[inline]
    pub fn end(&self) -> u32 {
        u32::from(self.address) + u32::from(self.word_count)
    }
}

/// Per-meter register table.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterTable {
    model: String,
    entries: Vec<RegisterEntry>,
    corrected: bool,
}

impl RegisterTable {
    /// Fresh copy of a model's default table.
    pub fn build(model: MeterModel) -> Self {
        Self::from_entries(model.name(), model.default_registers())
    }

    /// Table from an arbitrary entry list, in declaration order.
    ///
    /// Formats are derived from the entry names; an entry without a unit takes
    /// the unit of its display category.
    pub fn from_entries(model: impl Into<String>, entries: &[RegisterEntry]) -> Self {
        let entries = entries
            .iter()
            .map(|entry| {
                let (format, category_unit) = format_of(entry.name);
                RegisterEntry {
                    format,
                    unit: if entry.unit.is_empty() {
                        category_unit
                    } else {
                        entry.unit
                    },
                    ..*entry
                }
            })
            .collect();

        Self {
            model: model.into(),
            entries,
            corrected: false,
        }
    }

    /// Model name the table was built for.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &RegisterEntry> {
        self.entries.iter()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Look up a measurement by name.
    pub fn lookup(&self, name: &str) -> MeterResult<&RegisterEntry> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .ok_or_else(|| MeterError::unknown_measurement(name))
    }

    /// Declaration index of a measurement.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.name == name)
    }

    /// All entries of one kind, in declaration order.
    pub fn entries_of(&self, kind: RegisterKind) -> impl Iterator<Item = &RegisterEntry> {
        self.entries.iter().filter(move |entry| entry.kind == kind)
    }

    /// Entries of one batch, ordered by ascending address.
    ///
    /// Aliases at the same address keep their declaration order.
    pub fn entries_for(&self, kind: RegisterKind, batch: u16) -> Vec<&RegisterEntry> {
        let mut entries: Vec<&RegisterEntry> = self
            .entries_of(kind)
            .filter(|entry| entry.batch == batch)
            .collect();
        entries.sort_by_key(|entry| entry.address);
        entries
    }

    /// Distinct batch ids of one kind, ascending.
    pub fn batches(&self, kind: RegisterKind) -> Vec<u16> {
        let mut batches: Vec<u16> = self.entries_of(kind).map(|entry| entry.batch).collect();
        batches.sort_unstable();
        batches.dedup();
        batches
    }

    /// Whether bank corrections were already applied to this copy.
    pub fn is_corrected(&self) -> bool {
        self.corrected
    }

    pub(crate) fn mark_corrected(&mut self) {
        self.corrected = true;
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [RegisterEntry] {
        &mut self.entries
    }

    /// Check the table invariants against the device limits.
    ///
    /// Rejects duplicate names, word counts that disagree with the data type,
    /// overlapping registers that are not aliases of the same address, and
    /// batches the device cannot answer in one transaction.
    pub fn validate(&self, limits: &DeviceLimits) -> MeterResult<()> {
        let defect = |message: String| MeterError::table_defect(self.model.clone(), message);

        let mut names = HashSet::with_capacity(self.entries.len());
        for entry in &self.entries {
            if !names.insert(entry.name) {
                return Err(defect(format!("duplicate measurement `{}`", entry.name)));
            }
            if entry.word_count != entry.data_type.word_count() {
                return Err(defect(format!(
                    "`{}` is {} but spans {} word(s)",
                    entry.name, entry.data_type, entry.word_count
                )));
            }
        }

        for kind in [RegisterKind::Input, RegisterKind::Holding] {
            let mut sorted: Vec<&RegisterEntry> = self.entries_of(kind).collect();
            sorted.sort_by_key(|entry| entry.address);

            let mut previous: Option<&RegisterEntry> = None;
            let mut covered_until = 0u32;
            for entry in sorted {
                if let Some(prev) = previous {
                    let alias = prev.address == entry.address;
                    if !alias && u32::from(entry.address) < covered_until {
                        return Err(defect(format!(
                            "{} register `{}` at 0x{:04X} overlaps `{}` at 0x{:04X}",
                            kind, entry.name, entry.address, prev.name, prev.address
                        )));
                    }
                }
                covered_until = covered_until.max(entry.end());
                previous = Some(entry);
            }

            let mut grouped: BTreeMap<u16, Vec<RegisterEntry>> = BTreeMap::new();
            for entry in self.entries_of(kind) {
                grouped.entry(entry.batch).or_default().push(*entry);
            }
            for (batch, entries) in grouped {
                let read = ReadBatch::new(kind, batch, entries);
                if !limits.is_read_within_limits(read.count) {
                    return Err(defect(format!(
                        "{} batch {} spans {} registers from 0x{:04X}, device limit is {}",
                        kind, batch, read.count, read.start, limits.max_read_registers
                    )));
                }
                let gap = read.largest_gap();
                if !limits.is_gap_tolerated(gap) {
                    return Err(defect(format!(
                        "{} batch {} is not contiguous: hole of {} registers (tolerated {})",
                        kind, batch, gap, limits.max_gap
                    )));
                }
            }
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
