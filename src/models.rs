//! # Meter Models
//!
//! Compiled-in register maps of the supported Eastron meters, together with
//! the per-model constants the read engine needs: bank rules, device limits,
//! word order, the holding registers polled each cycle and the measurements
//! shown on the status line.
//!
//! All SDM quantities are IEEE-754 floats transmitted high word first, except
//! the identity block at 0xFC00 (serial number, meter code / firmware version).

use std::fmt;
use std::str::FromStr;

use crate::banks::BankRule;
use crate::bytes::ByteOrder;
use crate::device_limits::DeviceLimits;
use crate::error::MeterError;
use crate::register::DataType::{Float32, Int16, Uint16, Uint32};
use crate::register::RegisterEntry;

/// Supported meter models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeterModel {
    /// Single phase DIN rail meter.
    Sdm120,
    /// Three phase DIN rail meter.
    Sdm72,
}

impl MeterModel {
    pub const ALL: [MeterModel; 2] = [MeterModel::Sdm120, MeterModel::Sdm72];

    pub fn name(&self) -> &'static str {
        match self {
            MeterModel::Sdm120 => "SDM120",
            MeterModel::Sdm72 => "SDM72",
        }
    }

    /// Default register map in declaration order.
    pub fn default_registers(&self) -> &'static [RegisterEntry] {
        match self {
            MeterModel::Sdm120 => SDM120_REGISTERS,
            MeterModel::Sdm72 => SDM72_REGISTERS,
        }
    }

    /// Corrections applied to every fresh copy of the table.
    pub fn bank_rules(&self) -> &'static [BankRule] {
        match self {
            MeterModel::Sdm120 => SDM120_RULES,
            MeterModel::Sdm72 => SDM72_RULES,
        }
    }

    pub fn limits(&self) -> DeviceLimits {
        match self {
            MeterModel::Sdm120 => DeviceLimits::new()
                .with_max_read_registers(80)
                .with_max_write_registers(2)
                .with_max_gap(16)
                .with_inter_request_delay_ms(10),
            MeterModel::Sdm72 => DeviceLimits::new()
                .with_max_read_registers(60)
                .with_max_write_registers(2)
                .with_max_gap(16)
                .with_inter_request_delay_ms(10),
        }
    }

    /// Word order of two-register quantities.
    pub fn word_order(&self) -> ByteOrder {
        ByteOrder::BigEndian
    }

    /// Holding registers read in addition to all input registers each cycle.
    pub fn interesting_holdings(&self) -> &'static [&'static str] {
        match self {
            MeterModel::Sdm120 => &["demand_period", "meter_id", "baud"],
            MeterModel::Sdm72 => &["meter_id", "baud"],
        }
    }

    /// Measurements shown on the status line, in order.
    pub fn display(&self) -> &'static [&'static str] {
        match self {
            MeterModel::Sdm120 => &[
                "voltage",
                "current",
                "power_active",
                "power_factor",
                "frequency",
                "total_energy_active",
            ],
            MeterModel::Sdm72 => &[
                "voltage_ln",
                "total_line_current",
                "total_power_active",
                "total_power_factor",
                "frequency",
                "total_energy_active",
            ],
        }
    }
}

impl fmt::Display for MeterModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MeterModel {
    type Err = MeterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MeterModel::ALL
            .into_iter()
            .find(|model| model.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| MeterError::config(format!("unsupported meter model `{}`", s)))
    }
}

// ============================================================================
// SDM120
// ============================================================================

const SDM120_REGISTERS: &[RegisterEntry] = &[
    RegisterEntry::input("voltage", 0x0000, Float32, "Voltage", "V", 1),
    RegisterEntry::input("current", 0x0006, Float32, "Current", "A", 1),
    RegisterEntry::input("power_active", 0x000C, Float32, "Power (Active)", "W", 1),
    RegisterEntry::input("power_apparent", 0x0012, Float32, "Power (Apparent)", "VA", 1),
    RegisterEntry::input("power_reactive", 0x0018, Float32, "Power (Reactive)", "VAr", 1),
    RegisterEntry::input("power_factor", 0x001E, Float32, "Power Factor", "", 1),
    RegisterEntry::input("phase_angle", 0x0024, Float32, "Phase Angle", "°", 1),
    RegisterEntry::input("frequency", 0x0046, Float32, "Frequency", "Hz", 1),
    RegisterEntry::input("import_energy_active", 0x0048, Float32, "Imported Energy (Active)", "kWh", 1),
    RegisterEntry::input("export_energy_active", 0x004A, Float32, "Exported Energy (Active)", "kWh", 1),
    RegisterEntry::input("import_energy_reactive", 0x004C, Float32, "Imported Energy (Reactive)", "kVArh", 1),
    RegisterEntry::input("export_energy_reactive", 0x004E, Float32, "Exported Energy (Reactive)", "kVArh", 1),
    RegisterEntry::input("total_demand_power_active", 0x0054, Float32, "Total Demand Power (Active)", "W", 2),
    RegisterEntry::input("maximum_total_demand_power_active", 0x0056, Float32, "Maximum Total Demand Power (Active)", "W", 2),
    RegisterEntry::input("import_demand_power_active", 0x0058, Float32, "Import Demand Power (Active)", "W", 2),
    RegisterEntry::input("maximum_import_demand_power_active", 0x005A, Float32, "Maximum Import Demand Power (Active)", "W", 2),
    RegisterEntry::input("export_demand_power_active", 0x005C, Float32, "Export Demand Power (Active)", "W", 2),
    RegisterEntry::input("maximum_export_demand_power_active", 0x005E, Float32, "Maximum Export Demand Power (Active)", "W", 2),
    RegisterEntry::input("total_demand_current", 0x0102, Float32, "Total Demand Current", "A", 3),
    RegisterEntry::input("maximum_total_demand_current", 0x0108, Float32, "Maximum Total Demand Current", "A", 3),
    RegisterEntry::input("total_energy_active", 0x0156, Float32, "Total Energy (Active)", "kWh", 4),
    RegisterEntry::input("total_energy_reactive", 0x0158, Float32, "Total Energy (Reactive)", "kVArh", 4),
    RegisterEntry::holding("demand_time", 0x0000, Float32, "Demand Time", "s", 1),
    RegisterEntry::holding("demand_period", 0x0002, Float32, "Demand Period", "s", 1),
    RegisterEntry::holding("relay_pulse_width", 0x000C, Float32, "Relay Pulse Width", "ms", 1),
    RegisterEntry::holding("network_parity_stop", 0x0012, Float32, "Network Parity Stop", "", 1),
    RegisterEntry::holding("meter_id", 0x0014, Float32, "Meter ID", "", 1),
    RegisterEntry::holding("baud", 0x001C, Float32, "Baud Rate", "", 1),
    RegisterEntry::holding("p1_output_mode", 0x0056, Float32, "P1 Output Mode", "", 2),
    RegisterEntry::holding("display_scroll_timing", 0xF900, Float32, "Display Scroll Timing", "s", 3),
    RegisterEntry::holding("p1_divisor", 0xF910, Float32, "P1 Divisor", "", 3),
    RegisterEntry::holding("measurement_mode", 0xF920, Float32, "Measurement Mode", "", 3),
    RegisterEntry::holding("indicator_mode", 0xF930, Float32, "Pulse/LED Indicator Mode", "", 3),
    RegisterEntry::holding("serial_number", 0xFC00, Uint32, "Serial Number", "", 1),
    RegisterEntry::holding("meter_code", 0xFC02, Uint16, "Meter Code", "", 1),
    RegisterEntry::holding("software_version", 0xFC02, Int16, "Software Version", "", 1),
];

const SDM120_RULES: &[BankRule] = &[
    // firmware does not read across 0x0026..0x0045
    BankRule::Shift {
        after: "phase_angle",
        until: "total_demand_power_active",
    },
    BankRule::Assign {
        batch: 4,
        names: &["serial_number", "meter_code", "software_version"],
    },
];

// ============================================================================
// SDM72
// ============================================================================

const SDM72_REGISTERS: &[RegisterEntry] = &[
    RegisterEntry::input("l1_voltage", 0x0000, Float32, "L1 Voltage", "V", 1),
    RegisterEntry::input("l2_voltage", 0x0002, Float32, "L2 Voltage", "V", 1),
    RegisterEntry::input("l3_voltage", 0x0004, Float32, "L3 Voltage", "V", 1),
    RegisterEntry::input("l1_current", 0x0006, Float32, "L1 Current", "A", 1),
    RegisterEntry::input("l2_current", 0x0008, Float32, "L2 Current", "A", 1),
    RegisterEntry::input("l3_current", 0x000A, Float32, "L3 Current", "A", 1),
    RegisterEntry::input("l1_power_active", 0x000C, Float32, "L1 Power (Active)", "W", 1),
    RegisterEntry::input("l2_power_active", 0x000E, Float32, "L2 Power (Active)", "W", 1),
    RegisterEntry::input("l3_power_active", 0x0010, Float32, "L3 Power (Active)", "W", 1),
    RegisterEntry::input("l1_power_apparent", 0x0012, Float32, "L1 Power (Apparent)", "VA", 1),
    RegisterEntry::input("l2_power_apparent", 0x0014, Float32, "L2 Power (Apparent)", "VA", 1),
    RegisterEntry::input("l3_power_apparent", 0x0016, Float32, "L3 Power (Apparent)", "VA", 1),
    RegisterEntry::input("l1_power_reactive", 0x0018, Float32, "L1 Power (Reactive)", "VAr", 1),
    RegisterEntry::input("l2_power_reactive", 0x001A, Float32, "L2 Power (Reactive)", "VAr", 1),
    RegisterEntry::input("l3_power_reactive", 0x001C, Float32, "L3 Power (Reactive)", "VAr", 1),
    RegisterEntry::input("l1_power_factor", 0x001E, Float32, "L1 Power Factor", "", 1),
    RegisterEntry::input("l2_power_factor", 0x0020, Float32, "L2 Power Factor", "", 1),
    RegisterEntry::input("l3_power_factor", 0x0022, Float32, "L3 Power Factor", "", 1),
    RegisterEntry::input("voltage_ln", 0x002A, Float32, "L-N Voltage", "V", 1),
    RegisterEntry::input("current_ln", 0x002E, Float32, "L-N Current", "A", 1),
    RegisterEntry::input("total_line_current", 0x0030, Float32, "Total Line Current", "A", 1),
    RegisterEntry::input("total_power_active", 0x0034, Float32, "Total Power (Active)", "W", 1),
    RegisterEntry::input("total_power_apparent", 0x0038, Float32, "Total Power (Apparent)", "VA", 1),
    RegisterEntry::input("total_power_reactive", 0x003C, Float32, "Total Power (Reactive)", "VAr", 1),
    RegisterEntry::input("total_power_factor", 0x003E, Float32, "Total Power Factor", "", 1),
    RegisterEntry::input("frequency", 0x0046, Float32, "Frequency", "Hz", 1),
    RegisterEntry::input("import_energy_active", 0x0048, Float32, "Imported Energy (Active)", "kWh", 1),
    RegisterEntry::input("export_energy_active", 0x004A, Float32, "Exported Energy (Active)", "kWh", 1),
    RegisterEntry::input("l12_voltage", 0x00C8, Float32, "L1-L2 Voltage", "V", 2),
    RegisterEntry::input("l23_voltage", 0x00CA, Float32, "L2-L3 Voltage", "V", 2),
    RegisterEntry::input("l31_voltage", 0x00CC, Float32, "L3-L1 Voltage", "V", 2),
    RegisterEntry::input("voltage_ll", 0x00CE, Float32, "L-L Voltage", "V", 2),
    RegisterEntry::input("neutral_current", 0x00E0, Float32, "Neutral Current", "A", 2),
    RegisterEntry::input("total_energy_active", 0x0156, Float32, "Total Energy (Active)", "kWh", 3),
    RegisterEntry::input("total_energy_reactive", 0x0158, Float32, "Total Energy (Reactive)", "kVArh", 3),
    RegisterEntry::input("resettable_total_energy_active", 0x0180, Float32, "Resettable Total Energy (Active)", "kWh", 4),
    RegisterEntry::input("resettable_total_energy_reactive", 0x0182, Float32, "Resettable Total Energy (Reactive)", "kVArh", 4),
    RegisterEntry::input("resettable_import_energy_active", 0x0184, Float32, "Resettable Imported Energy (Active)", "kWh", 4),
    RegisterEntry::input("resettable_export_energy_active", 0x0186, Float32, "Resettable Exported Energy (Active)", "kWh", 4),
    RegisterEntry::input("net_energy_active", 0x018C, Float32, "Net Energy (Active)", "kWh", 4),
    RegisterEntry::input("import_total_power_active", 0x0500, Float32, "Total Import Power (Active)", "W", 5),
    RegisterEntry::input("export_total_power_active", 0x0502, Float32, "Total Export Power (Active)", "W", 5),
    RegisterEntry::holding("network_parity_stop", 0x0012, Float32, "Network Parity Stop", "", 1),
    RegisterEntry::holding("meter_id", 0x0014, Float32, "Meter ID", "", 1),
    RegisterEntry::holding("password", 0x0018, Float32, "Password", "", 1),
    RegisterEntry::holding("baud", 0x001C, Float32, "Baud Rate", "", 1),
    RegisterEntry::holding("auto_scroll_time", 0xF900, Uint16, "Automatic Scroll Time", "s", 2),
    RegisterEntry::holding("backlight_time", 0xF902, Uint16, "Backlight Time", "min", 2),
    RegisterEntry::holding("serial_number", 0xFC00, Uint32, "Serial Number", "", 1),
    RegisterEntry::holding("meter_code", 0xFC02, Uint16, "Meter Code", "", 1),
    RegisterEntry::holding("software_version", 0xFC02, Int16, "Software Version", "", 1),
];

const SDM72_RULES: &[BankRule] = &[
    // firmware answers at most 30 floats, split the phase block from the totals
    BankRule::Shift {
        after: "l3_power_factor",
        until: "network_parity_stop",
    },
    BankRule::Assign {
        batch: 3,
        names: &["serial_number", "meter_code", "software_version"],
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::banks::apply_corrections;
    use crate::register::{RegisterKind, RegisterTable};
    use std::collections::HashMap;

    fn corrected(model: MeterModel) -> RegisterTable {
        let mut table = RegisterTable::build(model);
        apply_corrections(&mut table, model.bank_rules()).unwrap();
        table
    }

    #[test]
    fn test_from_str() {
        assert_eq!("SDM120".parse::<MeterModel>().unwrap(), MeterModel::Sdm120);
        assert_eq!("sdm72".parse::<MeterModel>().unwrap(), MeterModel::Sdm72);
        assert!(matches!(
            "SDM630".parse::<MeterModel>(),
            Err(MeterError::Config { .. })
        ));
    }

    #[test]
    fn test_addresses_unique_except_aliases() {
        for model in MeterModel::ALL {
            let mut seen: HashMap<(RegisterKind, u16), Vec<&str>> = HashMap::new();
            for entry in model.default_registers() {
                seen.entry((entry.kind, entry.address))
                    .or_default()
                    .push(entry.name);
            }
            for ((kind, address), names) in seen {
                if names.len() > 1 {
                    assert_eq!(
                        (kind, address),
                        (RegisterKind::Holding, 0xFC02),
                        "{}: unexpected alias {:?}",
                        model,
                        names
                    );
                }
            }
        }
    }

    #[test]
    fn test_word_counts_match_types() {
        for model in MeterModel::ALL {
            for entry in model.default_registers() {
                assert_eq!(entry.word_count, entry.data_type.word_count(), "{}", entry.name);
            }
        }
    }

    #[test]
    fn test_default_tables_need_correction() {
        for model in MeterModel::ALL {
            let table = RegisterTable::build(model);
            assert!(
                table.validate(&model.limits()).is_err(),
                "{} validates without bank rules",
                model
            );
        }
    }

    #[test]
    fn test_corrected_tables_validate() {
        for model in MeterModel::ALL {
            corrected(model).validate(&model.limits()).unwrap();
        }
    }

    #[test]
    fn test_sdm120_banks() {
        let table = corrected(MeterModel::Sdm120);
        let names = |batch| -> Vec<&str> {
            table
                .entries_for(RegisterKind::Input, batch)
                .iter()
                .map(|entry| entry.name)
                .collect()
        };
        assert_eq!(names(1).first(), Some(&"voltage"));
        assert!(names(1).contains(&"current"));
        assert!(!names(1).contains(&"frequency"));
        assert_eq!(names(2).first(), Some(&"frequency"));
        assert!(names(2).contains(&"import_energy_active"));
        assert_eq!(table.lookup("serial_number").unwrap().batch, 4);
    }

    #[test]
    fn test_sdm72_shift_moves_every_later_input_batch() {
        let table = corrected(MeterModel::Sdm72);
        assert_eq!(table.lookup("l3_power_factor").unwrap().batch, 1);
        assert_eq!(table.lookup("voltage_ln").unwrap().batch, 2);
        assert_eq!(table.lookup("neutral_current").unwrap().batch, 3);
        assert_eq!(table.lookup("export_total_power_active").unwrap().batch, 6);
        assert_eq!(table.lookup("network_parity_stop").unwrap().batch, 1);
    }

    #[test]
    fn test_display_and_holdings_exist() {
        for model in MeterModel::ALL {
            let table = RegisterTable::build(model);
            for name in model.display() {
                table.lookup(name).unwrap();
            }
            for name in model.interesting_holdings() {
                assert_eq!(table.lookup(name).unwrap().kind, RegisterKind::Holding);
            }
        }
    }
}
