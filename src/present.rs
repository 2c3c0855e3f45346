//! # Presentation
//!
//! Display formats are derived from measurement names: a name containing one
//! of the category patterns gets that category's width, precision, sign and
//! unit. `factor` is checked first, since names like `power_factor` also
//! contain `power`. Other categories are scanned in table order.

use crate::register::RegisterEntry;
use crate::value::RegisterValue;

/// Width, precision and sign of a rendered number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatSpec {
    pub width: usize,
    /// `None` renders the value as decoded.
    pub precision: Option<usize>,
    /// Always print the sign.
    pub signed: bool,
}

impl FormatSpec {
    /// Unformatted default for names matching no category.
    pub const PLAIN: FormatSpec = FormatSpec {
        width: 0,
        precision: None,
        signed: false,
    };

    pub const fn fixed(width: usize, precision: usize) -> Self {
        Self {
            width,
            precision: Some(precision),
            signed: false,
        }
    }

    pub const fn signed(width: usize, precision: usize) -> Self {
        Self {
            width,
            precision: Some(precision),
            signed: true,
        }
    }

    /// Render a value, without unit.
    pub fn render(&self, value: &RegisterValue) -> String {
        let Some(precision) = self.precision else {
            return value.to_string();
        };
        let number = value.as_f64();
        let width = self.width;
        if self.signed {
            format!("{:+width$.precision$}", number)
        } else {
            format!("{:width$.precision$}", number)
        }
    }
}

struct Category {
    pattern: &'static str,
    format: FormatSpec,
    unit: &'static str,
}

const FACTOR: Category = Category {
    pattern: "factor",
    format: FormatSpec::signed(5, 3),
    unit: "",
};

const CATEGORIES: [Category; 6] = [
    Category {
        pattern: "voltage",
        format: FormatSpec::fixed(5, 1),
        unit: "V",
    },
    Category {
        pattern: "current",
        format: FormatSpec::fixed(5, 2),
        unit: "A",
    },
    Category {
        pattern: "energy",
        format: FormatSpec::fixed(10, 3),
        unit: "kWh",
    },
    Category {
        pattern: "power",
        format: FormatSpec::fixed(6, 1),
        unit: "W",
    },
    Category {
        pattern: "phase",
        format: FormatSpec::signed(5, 3),
        unit: "°",
    },
    Category {
        pattern: "frequency",
        format: FormatSpec::fixed(5, 2),
        unit: "Hz",
    },
];

/// Display format and default unit for a measurement name.
pub fn format_of(name: &str) -> (FormatSpec, &'static str) {
    if name.contains(FACTOR.pattern) {
        return (FACTOR.format, FACTOR.unit);
    }
    CATEGORIES
        .iter()
        .find(|category| name.contains(category.pattern))
        .map_or((FormatSpec::PLAIN, ""), |category| {
            (category.format, category.unit)
        })
}

/// Render a value with the entry's format and unit.
///
/// # Example
///
/// ```rust
/// use meter_reader::{present, DataType, RegisterEntry, RegisterTable, RegisterValue};
///
/// let table = RegisterTable::from_entries(
///     "demo",
///     &[RegisterEntry::input("voltage", 0x0000, DataType::Float32, "Voltage", "V", 1)],
/// );
/// let voltage = table.lookup("voltage").unwrap();
/// assert_eq!(present(voltage, &RegisterValue::F32(230.0)), "230.0 V");
/// ```
pub fn present(entry: &RegisterEntry, value: &RegisterValue) -> String {
    let number = entry.format.render(value);
    if entry.unit.is_empty() {
        number
    } else {
        format!("{} {}", number, entry.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::register::{DataType, RegisterTable};

    fn entry(name: &'static str, unit: &'static str) -> RegisterEntry {
        let table = RegisterTable::from_entries(
            "test",
            &[RegisterEntry::input(name, 0x0000, DataType::Float32, "", unit, 1)],
        );
        *table.lookup(name).unwrap()
    }

    #[test]
    fn test_factor_wins_over_power() {
        assert_eq!(format_of("power_factor"), (FormatSpec::signed(5, 3), ""));
        assert_eq!(format_of("total_power_factor").0, FormatSpec::signed(5, 3));
    }

    #[test]
    fn test_categories_in_order() {
        assert_eq!(format_of("l1_voltage"), (FormatSpec::fixed(5, 1), "V"));
        assert_eq!(format_of("neutral_current"), (FormatSpec::fixed(5, 2), "A"));
        assert_eq!(format_of("total_energy_active"), (FormatSpec::fixed(10, 3), "kWh"));
        assert_eq!(format_of("power_active"), (FormatSpec::fixed(6, 1), "W"));
        assert_eq!(format_of("phase_angle"), (FormatSpec::signed(5, 3), "°"));
        assert_eq!(format_of("frequency"), (FormatSpec::fixed(5, 2), "Hz"));
        // "voltage" is scanned before "energy"
        assert_eq!(format_of("voltage_energy").1, "V");
    }

    #[test]
    fn test_unmatched_is_plain() {
        assert_eq!(format_of("serial_number"), (FormatSpec::PLAIN, ""));
        assert_eq!(format_of("baud"), (FormatSpec::PLAIN, ""));
    }

    #[test]
    fn test_present_voltage() {
        assert_eq!(present(&entry("voltage", "V"), &RegisterValue::F32(230.0)), "230.0 V");
    }

    #[test]
    fn test_present_pads_to_width() {
        assert_eq!(present(&entry("current", "A"), &RegisterValue::F32(1.5)), " 1.50 A");
        assert_eq!(
            present(&entry("import_energy_active", "kWh"), &RegisterValue::F32(12.5)),
            "    12.500 kWh"
        );
    }

    #[test]
    fn test_present_signed() {
        assert_eq!(present(&entry("power_factor", ""), &RegisterValue::F32(0.5)), "+0.500");
        assert_eq!(present(&entry("power_factor", ""), &RegisterValue::F32(-0.5)), "-0.500");
    }

    #[test]
    fn test_present_uses_entry_unit() {
        assert_eq!(
            present(&entry("power_apparent", "VA"), &RegisterValue::F32(100.0)),
            " 100.0 VA"
        );
        // no unit in the table: the category unit fills in
        assert_eq!(present(&entry("frequency", ""), &RegisterValue::F32(50.0)), "50.00 Hz");
    }

    #[test]
    fn test_present_plain_and_unavailable() {
        let serial = RegisterEntry::holding("serial_number", 0xFC00, DataType::Uint32, "", "", 1);
        assert_eq!(present(&serial, &RegisterValue::U32(123456)), "123456");
        assert_eq!(present(&serial, &RegisterValue::Unavailable), "n/a");
        assert_eq!(
            present(&entry("voltage", "V"), &RegisterValue::Unavailable),
            "  NaN V"
        );
    }
}
