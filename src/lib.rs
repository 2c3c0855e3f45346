//! # Meter Reader - Batched Modbus Polling of Eastron SDM Meters
//!
//! **Version:** 0.3.0
//! **License:** MIT
//!
//! Reads Eastron SDM120 / SDM72 electricity meters over Modbus RTU with as few
//! transactions as the firmware allows, decodes the IEEE-754 registers and
//! renders them for a status line.
//!
//! ## Features
//!
//! - **Per-model register tables**: name, address, type, scale, unit, batch
//! - **Bank reassignment**: per-model rules fix batch ids the firmware cannot
//!   answer in one read, applied once per meter on its own table copy
//! - **Batched reads**: one transaction per `(kind, batch)` partition; a failed
//!   partition only marks its own values unavailable
//! - **Configurable word order** for 32-bit quantities
//! - **Cooperative shutdown** on Ctrl+C / SIGTERM
//!
//! ## Register Kinds
//!
//! | Code | Function | Used for |
//! |------|----------|----------|
//! | 0x03 | Read Holding Registers | identity and configuration |
//! | 0x04 | Read Input Registers | measurements |
//! | 0x10 | Write Multiple Registers | configuration |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use meter_reader::{Meter, MeterModel, MeterResult, RegisterTransport, RtuConfig, RtuTransport};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> MeterResult<()> {
//!     let meter = Meter::new("front_flat", MeterModel::Sdm120, 1)?;
//!
//!     let mut bus = RtuTransport::new(RtuConfig::new("/dev/ttyUSB0").with_baud_rate(9600));
//!     bus.connect().await?;
//!
//!     let readings = meter.read(&mut bus, &["voltage", "frequency"], true).await?;
//!     println!("{} V at {} Hz", readings["voltage"], readings["frequency"]);
//!
//!     bus.disconnect().await?;
//!     Ok(())
//! }
//! ```

// ============================================================================
// Core modules
// ============================================================================

/// Core error types and result handling
pub mod error;

/// Modbus and bus constants
pub mod constants;

/// Register transports (RTU, interruptible wrapper)
pub mod transport;

/// Shutdown flag and signal handling
pub mod shutdown;

// ============================================================================
// Register tables
// ============================================================================

/// Register entries and per-meter tables
pub mod register;

/// Bank reassignment rules
pub mod banks;

/// Compiled-in meter models
pub mod models;

/// Device-specific protocol limits configuration
pub mod device_limits;

// ============================================================================
// Decoding
// ============================================================================

/// Decoded value types
pub mod value;

/// Word order handling for two-register quantities
pub mod bytes;

/// Decoding, scaling and encoding of register spans
pub mod codec;

/// Display formats and units
pub mod present;

// ============================================================================
// Reading
// ============================================================================

/// Read planning by batch
pub mod batcher;

/// Meters and the batched read engine
pub mod meter;

/// Meter configuration
pub mod config;

/// Polling loop
pub mod poller;

// ============================================================================
// Re-exports for convenience
// ============================================================================

// === Async runtime ===
pub use tokio;

// === Error handling ===
pub use error::{MeterError, MeterResult};

// === Meters ===
pub use config::{build_meters, MeterSpec, DEFAULT_METERS};
pub use meter::{Meter, Readings};
pub use models::MeterModel;
pub use poller::{PollState, Poller};
pub use shutdown::Shutdown;

// === Register tables ===
pub use banks::{apply_corrections, BankRule};
pub use batcher::{plan_reads, ReadBatch};
pub use device_limits::DeviceLimits;
pub use register::{DataType, RegisterEntry, RegisterKind, RegisterTable};

// === Values ===
pub use bytes::{words_to_bytes, ByteOrder};
pub use codec::{decode, encode, scale};
pub use present::{format_of, present, FormatSpec};
pub use value::RegisterValue;

// === Transport ===
pub use transport::{Interruptible, RegisterTransport, TransportStats};
#[cfg(feature = "rtu")]
pub use transport::{RtuConfig, RtuTransport};

// === Protocol limits ===
pub use constants::{BROADCAST_UNIT, MAX_READ_REGISTERS, MAX_UNIT_ID, MAX_WRITE_REGISTERS};
