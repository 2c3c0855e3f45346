//! Protocol limits and serial bus defaults
//!
//! The register limits come from the Modbus specification:
//! - Maximum PDU size: 253 bytes (RS485 ADU of 256 bytes minus address and CRC)
//! - Register limits are calculated to fit within the PDU size constraint
//!
//! Individual meter firmwares may answer less; see [`crate::DeviceLimits`].

// ============================================================================
// Frame Size Constants
// ============================================================================

/// Maximum PDU (Protocol Data Unit) size per Modbus specification
/// RS485 ADU (256 bytes) - Slave Address (1 byte) - CRC (2 bytes) = 253 bytes
pub const MAX_PDU_SIZE: usize = 253;

// ============================================================================
// Register Operation Limits
// ============================================================================

/// Maximum number of registers for FC03/FC04 (Read Holding/Input Registers)
///
/// Response PDU: Function Code (1) + Byte Count (1) + N × 2 ≤ 253
/// Therefore: N ≤ (253 - 2) / 2 = 125.5 → 125 registers
pub const MAX_READ_REGISTERS: u16 = 125;

/// Maximum number of registers for FC16 (Write Multiple Registers)
///
/// Request PDU: Function Code (1) + Address (2) + Quantity (2) + Byte Count (1) + N × 2 ≤ 253
/// Therefore: N ≤ (253 - 6) / 2 = 123.5 → 123 registers
pub const MAX_WRITE_REGISTERS: u16 = 123;

// ============================================================================
// Addressing
// ============================================================================

/// Unit id 0 addresses every device on the bus; no device answers it.
pub const BROADCAST_UNIT: u8 = 0;

/// Highest unit id a device can be configured with.
pub const MAX_UNIT_ID: u8 = 247;

// ============================================================================
// Serial Bus Defaults
// ============================================================================

/// Baud rate the meters on the bus are configured for.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default response timeout in milliseconds.
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 1000;

/// Default pause between polling cycles in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
