//! # Bank Reassignment
//!
//! Model tables group registers into batches that suit the register map, not
//! necessarily the firmware. Bank rules move entries to other batches so that
//! every batch fits the device limits. They run once per meter, on the
//! meter's own copy of the table, before validation.

use tracing::debug;

use crate::error::{MeterError, MeterResult};
use crate::register::RegisterTable;

/// A correction to the batch assignment of a register table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BankRule {
    /// Put the named entries into `batch`.
    Assign {
        batch: u16,
        names: &'static [&'static str],
    },
    /// Increment the batch of every entry declared strictly between the
    /// `after` and `until` markers.
    Shift {
        after: &'static str,
        until: &'static str,
    },
}

/// Apply bank rules in order to a freshly built table.
///
/// A marker or name that is missing from the table is a table defect, as is a
/// shift whose `until` marker is declared before its `after` marker. A table
/// that was already corrected is left unchanged.
pub fn apply_corrections(table: &mut RegisterTable, rules: &[BankRule]) -> MeterResult<()> {
    if table.is_corrected() {
        debug!(model = table.model(), "Bank corrections already applied");
        return Ok(());
    }

    for rule in rules {
        match *rule {
            BankRule::Assign { batch, names } => {
                for name in names {
                    let index = marker(table, name)?;
                    table.entries_mut()[index].batch = batch;
                }
                debug!(model = table.model(), batch, count = names.len(), "Reassigned entries");
            }
            BankRule::Shift { after, until } => {
                let first = marker(table, after)?;
                let last = marker(table, until)?;
                if last <= first {
                    return Err(MeterError::table_defect(
                        table.model(),
                        format!("shift marker `{}` is not declared after `{}`", until, after),
                    ));
                }
                for entry in &mut table.entries_mut()[first + 1..last] {
                    entry.batch += 1;
                }
                debug!(model = table.model(), after, until, count = last - first - 1, "Shifted entries");
            }
        }
    }

    table.mark_corrected();
    Ok(())
}

fn marker(table: &RegisterTable, name: &str) -> MeterResult<usize> {
    table.position(name).ok_or_else(|| {
        MeterError::table_defect(
            table.model(),
            format!("bank rule refers to missing measurement `{}`", name),
        )
    })
}
