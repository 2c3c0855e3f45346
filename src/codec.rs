//! # Register Codec
//!
//! Decoding of raw register spans into typed values, scaling, and the
//! inverse encoding used by the write path.
//!
//! | Type | Registers | Decoding |
//! |------|-----------|----------|
//! | int16 | 1 | word reinterpreted as `i16` |
//! | uint16 | 1 | word as-is |
//! | int32 | 2 | words composed in the model's word order, as `i32` |
//! | uint32 | 2 | same composition, as `u32` |
//! | float32 | 2 | same composition, bits reinterpreted as IEEE-754 `f32` |

use crate::bytes::{bits_to_words, words_to_bits, ByteOrder};
use crate::error::{MeterError, MeterResult};
use crate::register::DataType;
use crate::value::RegisterValue;

// ============================================================================
// Decoding
// ============================================================================

/// Decode a register span according to its data type.
///
/// A span whose length does not match the data type is a table defect: the
/// read engine only ever hands out spans sized by the entry's word count, and
/// table validation rejects entries whose word count disagrees with their type.
///
/// # Example
///
/// ```rust
/// use meter_reader::{decode, ByteOrder, DataType, RegisterValue};
///
/// let value = decode(&[0x4366, 0x0000], DataType::Float32, ByteOrder::BigEndian).unwrap();
/// assert_eq!(value, RegisterValue::F32(230.0));
/// ```
pub fn decode(words: &[u16], data_type: DataType, order: ByteOrder) -> MeterResult<RegisterValue> {
    if words.len() != data_type.word_count() as usize {
        return Err(MeterError::table_defect(
            "codec",
            format!(
                "{} needs {} word(s), got {}",
                data_type,
                data_type.word_count(),
                words.len()
            ),
        ));
    }

    let value = match data_type {
        DataType::Int16 => RegisterValue::I16(words[0] as i16),
        DataType::Uint16 => RegisterValue::U16(words[0]),
        DataType::Int32 => RegisterValue::I32(words_to_bits(&[words[0], words[1]], order) as i32),
        DataType::Uint32 => RegisterValue::U32(words_to_bits(&[words[0], words[1]], order)),
        DataType::Float32 => {
            RegisterValue::F32(f32::from_bits(words_to_bits(&[words[0], words[1]], order)))
        }
    };
    Ok(value)
}

/// Apply a multiplicative scale factor.
///
/// A factor of exactly 1 keeps the decoded type so integer registers such as
/// serial numbers stay integers.
pub fn scale(value: RegisterValue, factor: f64) -> RegisterValue {
    if !value.is_available() || factor == 1.0 {
        return value;
    }
    RegisterValue::F64(value.as_f64() * factor)
}

// ============================================================================
// Encoding
// ============================================================================

/// Encode a numeric value as the registers of the given data type.
///
/// Integers are rounded to the nearest whole number first; a result outside
/// the type's range is rejected rather than truncated.
pub fn encode(value: f64, data_type: DataType, order: ByteOrder) -> MeterResult<Vec<u16>> {
    if !value.is_finite() {
        return Err(MeterError::invalid_data(format!(
            "cannot encode {} as {}",
            value, data_type
        )));
    }

    let value = match data_type {
        DataType::Float32 => value,
        _ => value.round(),
    };
    let (min, max) = data_type.range();
    if value < min || value > max {
        return Err(MeterError::invalid_data(format!(
            "{} out of range for {}",
            value, data_type
        )));
    }

    let words = match data_type {
        DataType::Int16 => vec![(value as i16) as u16],
        DataType::Uint16 => vec![value as u16],
        DataType::Int32 => bits_to_words(value as i32 as u32, order).to_vec(),
        DataType::Uint32 => bits_to_words(value as u32, order).to_vec(),
        DataType::Float32 => bits_to_words((value as f32).to_bits(), order).to_vec(),
    };
    Ok(words)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ORDERS: [ByteOrder; 4] = [
        ByteOrder::BigEndian,
        ByteOrder::LittleEndian,
        ByteOrder::BigEndianSwap,
        ByteOrder::LittleEndianSwap,
    ];

    #[test]
    fn test_decode_16bit() {
        let order = ByteOrder::BigEndian;
        assert_eq!(
            decode(&[0xFFFF], DataType::Int16, order).unwrap(),
            RegisterValue::I16(-1)
        );
        assert_eq!(
            decode(&[0xFFFF], DataType::Uint16, order).unwrap(),
            RegisterValue::U16(65535)
        );
    }

    #[test]
    fn test_decode_32bit_word_order() {
        let words = [0x0001, 0x0002];
        assert_eq!(
            decode(&words, DataType::Uint32, ByteOrder::BigEndian).unwrap(),
            RegisterValue::U32(0x0001_0002)
        );
        assert_eq!(
            decode(&words, DataType::Uint32, ByteOrder::BigEndianSwap).unwrap(),
            RegisterValue::U32(0x0002_0001)
        );
        assert_eq!(
            decode(&[0xFFFF, 0xFFFE], DataType::Int32, ByteOrder::BigEndian).unwrap(),
            RegisterValue::I32(-2)
        );
    }

    #[test]
    fn test_decode_float_is_bit_reinterpretation() {
        // 0x3F800000 is 1.0, not 1065353216.0
        let value = decode(&[0x3F80, 0x0000], DataType::Float32, ByteOrder::BigEndian).unwrap();
        assert_eq!(value, RegisterValue::F32(1.0));
    }

    #[test]
    fn test_decode_wrong_word_count_is_table_defect() {
        let err = decode(&[0x0001], DataType::Float32, ByteOrder::BigEndian).unwrap_err();
        assert!(matches!(err, MeterError::TableDefect { .. }));

        let err = decode(&[0x0001, 0x0002], DataType::Uint16, ByteOrder::BigEndian).unwrap_err();
        assert!(matches!(err, MeterError::TableDefect { .. }));
    }

    #[test]
    fn test_scale() {
        assert_eq!(scale(RegisterValue::U16(1234), 1.0), RegisterValue::U16(1234));
        assert_eq!(scale(RegisterValue::U16(1234), 0.1), RegisterValue::F64(1234.0 * 0.1));
        assert_eq!(scale(RegisterValue::Unavailable, 10.0), RegisterValue::Unavailable);
    }

    #[test]
    fn test_encode_rejects_out_of_range() {
        assert!(encode(70000.0, DataType::Uint16, ByteOrder::BigEndian).is_err());
        assert!(encode(-1.0, DataType::Uint32, ByteOrder::BigEndian).is_err());
        assert!(encode(f64::NAN, DataType::Float32, ByteOrder::BigEndian).is_err());
    }

    #[test]
    fn test_encode_rounds_before_range_check() {
        let order = ByteOrder::BigEndian;
        assert!(encode(32767.6, DataType::Int16, order).is_err());
        assert!(encode(-32768.6, DataType::Int16, order).is_err());
        assert!(encode(65535.5, DataType::Uint16, order).is_err());
        assert!(encode(4294967295.5, DataType::Uint32, order).is_err());
        assert_eq!(encode(32766.6, DataType::Int16, order).unwrap(), vec![0x7FFF]);
        assert_eq!(encode(-0.4, DataType::Uint16, order).unwrap(), vec![0x0000]);
    }

    #[test]
    fn test_encode_float_high_word_first() {
        assert_eq!(
            encode(230.0, DataType::Float32, ByteOrder::BigEndian).unwrap(),
            vec![0x4366, 0x0000]
        );
    }

    proptest! {
        #[test]
        fn prop_int16_roundtrip(v: i16) {
            let words = encode(f64::from(v), DataType::Int16, ByteOrder::BigEndian).unwrap();
            prop_assert_eq!(decode(&words, DataType::Int16, ByteOrder::BigEndian).unwrap(), RegisterValue::I16(v));
        }

        #[test]
        fn prop_uint16_roundtrip(v: u16) {
            let words = encode(f64::from(v), DataType::Uint16, ByteOrder::BigEndian).unwrap();
            prop_assert_eq!(decode(&words, DataType::Uint16, ByteOrder::BigEndian).unwrap(), RegisterValue::U16(v));
        }

        #[test]
        fn prop_int32_roundtrip(v: i32, idx in 0usize..4) {
            let order = ORDERS[idx];
            let words = encode(f64::from(v), DataType::Int32, order).unwrap();
            prop_assert_eq!(decode(&words, DataType::Int32, order).unwrap(), RegisterValue::I32(v));
        }

        #[test]
        fn prop_uint32_roundtrip(v: u32, idx in 0usize..4) {
            let order = ORDERS[idx];
            let words = encode(f64::from(v), DataType::Uint32, order).unwrap();
            prop_assert_eq!(decode(&words, DataType::Uint32, order).unwrap(), RegisterValue::U32(v));
        }

        #[test]
        fn prop_float32_bit_pattern_roundtrip(v in proptest::num::f32::NORMAL | proptest::num::f32::ZERO, idx in 0usize..4) {
            let order = ORDERS[idx];
            let words = encode(f64::from(v), DataType::Float32, order).unwrap();
            match decode(&words, DataType::Float32, order).unwrap() {
                RegisterValue::F32(decoded) => prop_assert_eq!(decoded.to_bits(), v.to_bits()),
                other => prop_assert!(false, "unexpected {:?}", other),
            }
        }
    }
}
