//! # Device Limits Configuration
//!
//! Per-model limits on what a meter firmware can answer in one transaction.
//!
//! ## Modbus Specification Limits
//!
//! - **Read Holding/Input Registers (FC03/04)**: Max 125 registers per request
//! - **Write Multiple Registers (FC16)**: Max 123 registers per request
//!
//! Meter firmwares are often stricter. A batch whose span exceeds
//! `max_read_registers` is rejected when the register table is validated, which
//! is what the bank reassignment rules of a model exist to prevent.

use crate::constants::{MAX_READ_REGISTERS, MAX_WRITE_REGISTERS};

/// Default maximum registers per read operation (Modbus specification).
pub const DEFAULT_MAX_READ_REGISTERS: u16 = MAX_READ_REGISTERS;

/// Default maximum registers per write operation (Modbus specification).
pub const DEFAULT_MAX_WRITE_REGISTERS: u16 = MAX_WRITE_REGISTERS;

/// Default tolerated hole between two entries of one batch (strictly contiguous).
pub const DEFAULT_MAX_GAP: u16 = 0;

/// Default inter-request delay in milliseconds.
pub const DEFAULT_INTER_REQUEST_DELAY_MS: u64 = 0;

/// Device-specific request limits.
///
/// # Example
///
/// ```rust
/// use meter_reader::DeviceLimits;
///
/// // A firmware that answers at most 40 registers and needs a short pause
/// let limits = DeviceLimits::new()
///     .with_max_read_registers(40)
///     .with_inter_request_delay_ms(10);
///
/// assert_eq!(limits.max_read_registers, 40);
/// assert!(!limits.is_read_within_limits(41));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceLimits {
    /// Maximum registers per read request.
    pub max_read_registers: u16,
    /// Maximum registers per write request.
    pub max_write_registers: u16,
    /// Largest run of unmapped words the firmware answers inside one read.
    pub max_gap: u16,
    /// Minimum delay between requests (milliseconds).
    pub inter_request_delay_ms: u64,
}

impl DeviceLimits {
    /// Create new device limits with default (Modbus spec) values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum read registers.
    pub fn with_max_read_registers(mut self, count: u16) -> Self {
        self.max_read_registers = count;
        self
    }

    /// Set maximum write registers.
    pub fn with_max_write_registers(mut self, count: u16) -> Self {
        self.max_write_registers = count;
        self
    }

    /// Set the tolerated hole between entries of one batch.
    pub fn with_max_gap(mut self, words: u16) -> Self {
        self.max_gap = words;
        self
    }

    /// Set inter-request delay in milliseconds.
    pub fn with_inter_request_delay_ms(mut self, delay_ms: u64) -> Self {
        self.inter_request_delay_ms = delay_ms;
        self
    }

    /// Check if a read request is within limits.
    pub fn is_read_within_limits(&self, register_count: u16) -> bool {
        register_count > 0 && register_count <= self.max_read_registers
    }

    /// Check if a write request is within limits.
    pub fn is_write_within_limits(&self, register_count: u16) -> bool {
        register_count > 0 && register_count <= self.max_write_registers
    }

    /// Check if a hole of `words` unmapped registers may be read through.
    pub fn is_gap_tolerated(&self, words: u16) -> bool {
        words <= self.max_gap
    }
}

impl Default for DeviceLimits {
    fn default() -> Self {
        Self {
            max_read_registers: DEFAULT_MAX_READ_REGISTERS,
            max_write_registers: DEFAULT_MAX_WRITE_REGISTERS,
            max_gap: DEFAULT_MAX_GAP,
            inter_request_delay_ms: DEFAULT_INTER_REQUEST_DELAY_MS,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
