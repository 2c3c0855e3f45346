//! # Read Batching
//!
//! Groups the entries a caller asked for into one read per `(kind, batch)`
//! partition. Each partition becomes a [`ReadBatch`] covering the smallest
//! address span that contains all of its entries; the response is sliced back
//! into per-entry words by offset.
//!
//! ## Example
//!
//! ```rust
//! use meter_reader::{plan_reads, DataType, RegisterEntry, RegisterKind};
//!
//! let entries = [
//!     RegisterEntry::input("voltage", 0x0000, DataType::Float32, "Voltage", "V", 1),
//!     RegisterEntry::input("current", 0x0006, DataType::Float32, "Current", "A", 1),
//!     RegisterEntry::input("frequency", 0x0046, DataType::Float32, "Frequency", "Hz", 2),
//! ];
//!
//! let plan = plan_reads(&entries);
//! assert_eq!(plan.len(), 2);
//! assert_eq!((plan[0].kind, plan[0].start, plan[0].count), (RegisterKind::Input, 0x0000, 8));
//! assert_eq!((plan[1].start, plan[1].count), (0x0046, 2));
//! ```

use std::collections::BTreeMap;

use crate::bytes::ByteOrder;
use crate::codec::{decode, scale};
use crate::error::{MeterError, MeterResult};
use crate::register::{RegisterEntry, RegisterKind};
use crate::value::RegisterValue;

/// One read transaction and the entries it serves.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadBatch {
    pub kind: RegisterKind,
    pub batch: u16,
    /// First register address of the span.
    pub start: u16,
    /// Registers in the span, saturated at `u16::MAX`.
    pub count: u16,
    /// Served entries, address ascending.
    pub entries: Vec<RegisterEntry>,
}

impl ReadBatch {
    /// Compute the span of a non-empty partition.
    pub fn new(kind: RegisterKind, batch: u16, mut entries: Vec<RegisterEntry>) -> Self {
        entries.sort_by_key(|entry| entry.address);

        let start = entries.first().map_or(0, |entry| entry.address);
        let end = entries
            .iter()
            .map(RegisterEntry::end)
            .max()
            .unwrap_or(u32::from(start));
        let count = u16::try_from(end - u32::from(start)).unwrap_or(u16::MAX);

        Self {
            kind,
            batch,
            start,
            count,
            entries,
        }
    }

    /// Check whether the entries tile the span without holes.
    pub fn is_strictly_consecutive(&self) -> bool {
        self.largest_gap() == 0
    }

    /// Longest run of registers inside the span that no entry covers.
    pub fn largest_gap(&self) -> u16 {
        let mut covered_until = u32::from(self.start);
        let mut largest = 0u32;
        for entry in &self.entries {
            let address = u32::from(entry.address);
            if address > covered_until {
                largest = largest.max(address - covered_until);
            }
            covered_until = covered_until.max(entry.end());
        }
        u16::try_from(largest).unwrap_or(u16::MAX)
    }

    /// Words of one entry within a response for this batch.
    pub fn slice<'a>(&self, words: &'a [u16], entry: &RegisterEntry) -> Option<&'a [u16]> {
        let offset = usize::from(entry.address.checked_sub(self.start)?);
        words.get(offset..offset + usize::from(entry.word_count))
    }

    /// Decode every entry of the batch from one response.
    ///
    /// Either all entries decode or none are returned, so a batch is applied
    /// to a reading atomically.
    pub fn decode(
        &self,
        words: &[u16],
        order: ByteOrder,
        scaling: bool,
    ) -> MeterResult<Vec<(&'static str, RegisterValue)>> {
        if words.len() != usize::from(self.count) {
            return Err(MeterError::invalid_data(format!(
                "{} batch {} answered {} register(s), expected {}",
                self.kind,
                self.batch,
                words.len(),
                self.count
            )));
        }

        self.entries
            .iter()
            .map(|entry| -> MeterResult<(&'static str, RegisterValue)> {
                let span = self.slice(words, entry).ok_or_else(|| {
                    MeterError::invalid_data(format!("`{}` outside of response", entry.name))
                })?;
                let value = decode(span, entry.data_type, order)?;
                let value = if scaling {
                    scale(value, entry.scale)
                } else {
                    value
                };
                Ok((entry.name, value))
            })
            .collect()
    }

    /// Unavailable values for every entry of the batch.
    pub fn unavailable(&self) -> impl Iterator<Item = (&'static str, RegisterValue)> + '_ {
        self.entries
            .iter()
            .map(|entry| (entry.name, RegisterValue::Unavailable))
    }
}

/// Partition entries by `(kind, batch)` into read transactions.
///
/// Input batches come before holding batches, each in ascending batch id.
/// Entries requested twice are read once.
pub fn plan_reads(entries: &[RegisterEntry]) -> Vec<ReadBatch> {
    let mut partitions: BTreeMap<(RegisterKind, u16), Vec<RegisterEntry>> = BTreeMap::new();
    for entry in entries {
        let partition = partitions.entry((entry.kind, entry.batch)).or_default();
        if !partition.iter().any(|known| known.name == entry.name) {
            partition.push(*entry);
        }
    }

    partitions
        .into_iter()
        .map(|((kind, batch), entries)| ReadBatch::new(kind, batch, entries))
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
