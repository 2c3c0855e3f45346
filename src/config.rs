//! Meter configuration from the command line.
//!
//! Each meter on the bus is described as `NAME=MODEL@UNIT[/ORDER]`, for
//! example `front_flat=SDM120@1`. The optional word order (`ABCD`, `CDAB`,
//! ...) overrides the model's own for meters with non-standard firmware.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::bytes::ByteOrder;
use crate::error::{MeterError, MeterResult};
use crate::meter::Meter;
use crate::models::MeterModel;

/// Meters polled when none are configured.
pub const DEFAULT_METERS: [&str; 2] = ["front_flat=SDM120@1", "rear_flat=SDM120@2"];

/// One configured meter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeterSpec {
    pub name: String,
    pub model: MeterModel,
    pub unit: u8,
    pub word_order: Option<ByteOrder>,
}

impl MeterSpec {
    pub fn new(name: impl Into<String>, model: MeterModel, unit: u8) -> Self {
        Self {
            name: name.into(),
            model,
            unit,
            word_order: None,
        }
    }

    pub fn with_word_order(mut self, word_order: ByteOrder) -> Self {
        self.word_order = Some(word_order);
        self
    }

    pub fn build(&self) -> MeterResult<Meter> {
        let meter = Meter::new(self.name.clone(), self.model, self.unit)?;
        Ok(match self.word_order {
            Some(order) => meter.with_word_order(order),
            None => meter,
        })
    }
}

impl FromStr for MeterSpec {
    type Err = MeterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || MeterError::config(format!("expected NAME=MODEL@UNIT[/ORDER], got `{}`", s));

        let (name, rest) = s.split_once('=').ok_or_else(invalid)?;
        let (model, rest) = rest.split_once('@').ok_or_else(invalid)?;
        let (unit, order) = match rest.split_once('/') {
            Some((unit, order)) => (unit, Some(order.trim().parse::<ByteOrder>()?)),
            None => (rest, None),
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(invalid());
        }

        let unit = unit
            .trim()
            .parse::<u8>()
            .map_err(|e| MeterError::config(format!("meter {}: bad unit id `{}`: {}", name, unit, e)))?;

        let spec = Self::new(name, model.trim().parse()?, unit);
        Ok(match order {
            Some(order) => spec.with_word_order(order),
            None => spec,
        })
    }
}

impl fmt::Display for MeterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}@{}", self.name, self.model, self.unit)?;
        if let Some(order) = self.word_order {
            write!(f, "/{}", order)?;
        }
        Ok(())
    }
}

/// Build all meters, rejecting duplicate names and unit ids.
pub fn build_meters(specs: &[MeterSpec]) -> MeterResult<Vec<Meter>> {
    if specs.is_empty() {
        return Err(MeterError::config("no meters configured"));
    }

    let mut names = HashSet::new();
    let mut units = HashSet::new();
    for spec in specs {
        if !names.insert(spec.name.as_str()) {
            return Err(MeterError::config(format!("duplicate meter name `{}`", spec.name)));
        }
        if !units.insert(spec.unit) {
            return Err(MeterError::config(format!(
                "meter {}: unit id {} already in use",
                spec.name, spec.unit
            )));
        }
    }

    specs.iter().map(MeterSpec::build).collect()
}
