//! # Register Value Types
//!
//! Typed result of decoding a register span.

use std::fmt;

/// A decoded measurement value.
///
/// Raw decodes keep the register's own type. Applying a scale factor other
/// than 1 yields [`RegisterValue::F64`]. A measurement whose batch could not
/// be read is [`RegisterValue::Unavailable`], which reads as NaN.
///
/// | Type | Registers |
/// |------|-----------|
/// | U16/I16 | 1 |
/// | U32/I32/F32 | 2 |
///
/// # Example
///
/// ```rust
/// use meter_reader::RegisterValue;
///
/// let voltage = RegisterValue::F32(230.5);
/// assert!((voltage.as_f64() - 230.5).abs() < 0.001);
/// assert!(RegisterValue::Unavailable.as_f64().is_nan());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegisterValue {
    /// Unsigned 16-bit integer
    U16(u16),
    /// Signed 16-bit integer
    I16(i16),
    /// Unsigned 32-bit integer
    U32(u32),
    /// Signed 32-bit integer
    I32(i32),
    /// IEEE-754 single precision float
    F32(f32),
    /// Scaled value
    F64(f64),
    /// The batch holding this measurement failed
    Unavailable,
}

impl RegisterValue {
    /// Convert the value to f64 for uniform numeric handling.
    #[inline]
    pub fn as_f64(&self) -> f64 {
        match self {
            RegisterValue::U16(v) => f64::from(*v),
            RegisterValue::I16(v) => f64::from(*v),
            RegisterValue::U32(v) => f64::from(*v),
            RegisterValue::I32(v) => f64::from(*v),
            RegisterValue::F32(v) => f64::from(*v),
            RegisterValue::F64(v) => *v,
            RegisterValue::Unavailable => f64::NAN,
        }
    }

    /// Check whether the value was actually read.
    #[inline]
    pub fn is_available(&self) -> bool {
        !matches!(self, RegisterValue::Unavailable)
    }
}

impl fmt::Display for RegisterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterValue::U16(v) => write!(f, "{}", v),
            RegisterValue::I16(v) => write!(f, "{}", v),
            RegisterValue::U32(v) => write!(f, "{}", v),
            RegisterValue::I32(v) => write!(f, "{}", v),
            RegisterValue::F32(v) => write!(f, "{}", v),
            RegisterValue::F64(v) => write!(f, "{}", v),
            RegisterValue::Unavailable => f.write_str("n/a"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_f64() {
        assert_eq!(RegisterValue::U16(100).as_f64(), 100.0);
        assert_eq!(RegisterValue::I16(-50).as_f64(), -50.0);
        assert_eq!(RegisterValue::U32(100000).as_f64(), 100000.0);
        assert_eq!(RegisterValue::I32(-100000).as_f64(), -100000.0);
        assert_eq!(RegisterValue::F32(49.5).as_f64(), 49.5);
        assert_eq!(RegisterValue::F64(0.125).as_f64(), 0.125);
        assert!(RegisterValue::Unavailable.as_f64().is_nan());
    }

    #[test]
    fn test_availability() {
        assert!(RegisterValue::U16(0).is_available());
        assert!(!RegisterValue::Unavailable.is_available());
    }

    #[test]
    fn test_display() {
        assert_eq!(RegisterValue::U32(12345678).to_string(), "12345678");
        assert_eq!(RegisterValue::I16(-1234).to_string(), "-1234");
        assert_eq!(RegisterValue::Unavailable.to_string(), "n/a");
    }
}
