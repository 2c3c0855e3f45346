//! # Word Order for 32-bit Quantities
//!
//! Meters transmit 32-bit integers and floats as two 16-bit registers. The
//! order of those registers, and of the bytes inside them, is a property of the
//! device model, not of the protocol. It has to be verified against a register
//! whose value is known (the serial number printed on the meter housing works
//! well) rather than assumed.
//!
//! Uses ABCD notation where A is the most significant byte. For `0x12345678`:
//! - `BigEndian (ABCD)`: words `[0x1234, 0x5678]` (high word first, Eastron SDM)
//! - `LittleEndian (DCBA)`: words `[0x7856, 0x3412]`
//! - `BigEndianSwap (CDAB)`: words `[0x5678, 0x1234]` (low word first)
//! - `LittleEndianSwap (BADC)`: words `[0x3412, 0x7856]`

use std::fmt;
use std::str::FromStr;

use crate::error::MeterError;

/// Register/byte order of a two-word value on the wire.
///
/// # Example
///
/// ```rust
/// use meter_reader::ByteOrder;
///
/// let order: ByteOrder = "CDAB".parse().unwrap();
/// assert_eq!(order, ByteOrder::BigEndianSwap);
/// assert_eq!(order.to_string(), "CDAB");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ByteOrder {
    /// ABCD: high word first, bytes big-endian inside each word.
    #[default]
    BigEndian,
    /// DCBA: fully reversed.
    LittleEndian,
    /// CDAB: low word first, bytes big-endian inside each word.
    BigEndianSwap,
    /// BADC: high word first, bytes swapped inside each word.
    LittleEndianSwap,
}

impl ByteOrder {
    /// Short notation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BigEndian => "ABCD",
            Self::LittleEndian => "DCBA",
            Self::BigEndianSwap => "CDAB",
            Self::LittleEndianSwap => "BADC",
        }
    }
}

impl FromStr for ByteOrder {
    type Err = MeterError;

    /// Parse the usual notations ("ABCD", "cd-ab", "BE", "LE", ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_uppercase())
            .collect();
        match normalized.as_str() {
            "ABCD" | "BE" | "BIGENDIAN" => Ok(Self::BigEndian),
            "DCBA" | "LE" | "LITTLEENDIAN" => Ok(Self::LittleEndian),
            "CDAB" | "BIGENDIANSWAP" => Ok(Self::BigEndianSwap),
            "BADC" | "LITTLEENDIANSWAP" => Ok(Self::LittleEndianSwap),
            _ => Err(MeterError::config(format!("unknown word order `{}`", s))),
        }
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Register <-> 32-bit conversions
// ============================================================================

/// Arrange two wire registers into the four bytes of a big-endian 32-bit value.
///
/// # Example
///
/// ```rust
/// use meter_reader::{ByteOrder, words_to_bytes};
///
/// let words = [0x1234, 0x5678];
/// assert_eq!(words_to_bytes(&words, ByteOrder::BigEndian), [0x12, 0x34, 0x56, 0x78]);
/// assert_eq!(words_to_bytes(&words, ByteOrder::BigEndianSwap), [0x56, 0x78, 0x12, 0x34]);
/// ```
#[inline]
pub fn words_to_bytes(words: &[u16; 2], order: ByteOrder) -> [u8; 4] {
    let [w0, w1] = [words[0].to_be_bytes(), words[1].to_be_bytes()];

    match order {
        ByteOrder::BigEndian => [w0[0], w0[1], w1[0], w1[1]],
        ByteOrder::LittleEndian => [w1[1], w1[0], w0[1], w0[0]],
        ByteOrder::BigEndianSwap => [w1[0], w1[1], w0[0], w0[1]],
        ByteOrder::LittleEndianSwap => [w0[1], w0[0], w1[1], w1[0]],
    }
}

/// Inverse of [`words_to_bytes`]: split a big-endian 32-bit value into wire registers.
#[inline]
pub fn bytes_to_words(bytes: &[u8; 4], order: ByteOrder) -> [u16; 2] {
    match order {
        ByteOrder::BigEndian => [
            u16::from_be_bytes([bytes[0], bytes[1]]),
            u16::from_be_bytes([bytes[2], bytes[3]]),
        ],
        ByteOrder::LittleEndian => [
            u16::from_be_bytes([bytes[3], bytes[2]]),
            u16::from_be_bytes([bytes[1], bytes[0]]),
        ],
        ByteOrder::BigEndianSwap => [
            u16::from_be_bytes([bytes[2], bytes[3]]),
            u16::from_be_bytes([bytes[0], bytes[1]]),
        ],
        ByteOrder::LittleEndianSwap => [
            u16::from_be_bytes([bytes[1], bytes[0]]),
            u16::from_be_bytes([bytes[3], bytes[2]]),
        ],
    }
}

/// Compose the 32 raw bits carried by two registers.
#[inline]
pub fn words_to_bits(words: &[u16; 2], order: ByteOrder) -> u32 {
    u32::from_be_bytes(words_to_bytes(words, order))
}

/// Split 32 raw bits into two registers.
#[inline]
pub fn bits_to_words(bits: u32, order: ByteOrder) -> [u16; 2] {
    bytes_to_words(&bits.to_be_bytes(), order)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_ORDERS: [ByteOrder; 4] = [
        ByteOrder::BigEndian,
        ByteOrder::LittleEndian,
        ByteOrder::BigEndianSwap,
        ByteOrder::LittleEndianSwap,
    ];

    #[test]
    fn test_from_str_valid() {
        assert_eq!("ABCD".parse::<ByteOrder>().unwrap(), ByteOrder::BigEndian);
        assert_eq!("ab-cd".parse::<ByteOrder>().unwrap(), ByteOrder::BigEndian);
        assert_eq!("be".parse::<ByteOrder>().unwrap(), ByteOrder::BigEndian);
        assert_eq!("DCBA".parse::<ByteOrder>().unwrap(), ByteOrder::LittleEndian);
        assert_eq!("CD_AB".parse::<ByteOrder>().unwrap(), ByteOrder::BigEndianSwap);
        assert_eq!("BADC".parse::<ByteOrder>().unwrap(), ByteOrder::LittleEndianSwap);
    }

    #[test]
    fn test_from_str_invalid() {
        for bad in ["AB", ""] {
            assert!(matches!(bad.parse::<ByteOrder>(), Err(MeterError::Config { .. })));
        }
    }

    #[test]
    fn test_display_parses_back() {
        for order in ALL_ORDERS {
            assert_eq!(order.to_string().parse::<ByteOrder>().unwrap(), order);
        }
    }

    #[test]
    fn test_default_is_high_word_first() {
        assert_eq!(ByteOrder::default(), ByteOrder::BigEndian);
    }

    #[test]
    fn test_words_to_bytes_all_orders() {
        let words = [0x1234, 0x5678];

        assert_eq!(
            words_to_bytes(&words, ByteOrder::BigEndian),
            [0x12, 0x34, 0x56, 0x78]
        );
        assert_eq!(
            words_to_bytes(&words, ByteOrder::LittleEndian),
            [0x78, 0x56, 0x34, 0x12]
        );
        assert_eq!(
            words_to_bytes(&words, ByteOrder::BigEndianSwap),
            [0x56, 0x78, 0x12, 0x34]
        );
        assert_eq!(
            words_to_bytes(&words, ByteOrder::LittleEndianSwap),
            [0x34, 0x12, 0x78, 0x56]
        );
    }

    #[test]
    fn test_float_bits_high_word_first() {
        // 230.0 = 0x43660000
        let bits = words_to_bits(&[0x4366, 0x0000], ByteOrder::BigEndian);
        assert_eq!(f32::from_bits(bits), 230.0);

        let bits = words_to_bits(&[0x0000, 0x4366], ByteOrder::BigEndianSwap);
        assert_eq!(f32::from_bits(bits), 230.0);
    }

    #[test]
    fn test_bits_to_words_inverse() {
        for order in ALL_ORDERS {
            let words = bits_to_words(0xDEADBEEF, order);
            assert_eq!(
                words_to_bits(&words, order),
                0xDEADBEEF,
                "Roundtrip failed for {:?}",
                order
            );
        }
    }
}
