//! SDM Meter Reading Example
//!
//! Reads the status-line measurements of one Eastron SDM120 over Modbus RTU,
//! first in a single batched call, then the identity registers.
//!
//! The register table already knows where every measurement lives, so the
//! caller only names what it wants:
//!
//! | Name | Register | Batch |
//! |------|----------|-------|
//! | voltage | 0x0000 | 1 |
//! | current | 0x0006 | 1 |
//! | power_active | 0x000C | 1 |
//! | frequency | 0x0046 | 2 |
//! | total_energy_active | 0x0156 | 4 |
//!
//! # Running this example
//!
//! ```bash
//! cargo run --example read_meter -- /dev/ttyUSB0 1
//! ```

use std::time::Duration;

use meter_reader::{
    present, Meter, MeterModel, MeterResult, RegisterKind, RegisterTransport, RtuConfig, RtuTransport,
};

const MEASUREMENTS: [&str; 5] = [
    "voltage",
    "current",
    "power_active",
    "frequency",
    "total_energy_active",
];

#[tokio::main(flavor = "current_thread")]
async fn main() -> MeterResult<()> {
    let mut args = std::env::args().skip(1);
    let port = args.next().unwrap_or_else(|| "/dev/ttyUSB0".to_string());
    let unit = args.next().and_then(|unit| unit.parse().ok()).unwrap_or(1);

    let meter = Meter::new("demo", MeterModel::Sdm120, unit)?;

    println!("Connecting to {} (unit {})...", port, meter.unit_label());
    let config = RtuConfig::new(&port)
        .with_baud_rate(9600)
        .with_timeout(Duration::from_secs(1));
    let mut bus = RtuTransport::new(config);
    bus.connect().await?;
    println!("Connected!\n");

    // One transaction per batch, not per measurement
    println!("=== Measurements ===\n");
    let readings = meter.read(&mut bus, &MEASUREMENTS, true).await?;
    for name in MEASUREMENTS {
        let entry = meter.table().lookup(name)?;
        println!("  {:<14} {}", entry.label, present(entry, &readings[name]));
    }

    println!("\n=== Identity ===\n");
    let identity = meter
        .read(&mut bus, &["serial_number", "meter_code", "software_version"], true)
        .await?;
    println!("  Serial number:    {}", identity["serial_number"]);
    println!("  Meter code:       {}", identity["meter_code"]);
    println!("  Software version: {}", identity["software_version"]);

    let batches = meter.table().batches(RegisterKind::Input).len();
    let stats = bus.get_stats();
    println!(
        "\nCommunication stats: {} requests, {} responses ({} input batches in the table)",
        stats.requests_sent, stats.responses_received, batches
    );

    bus.disconnect().await?;
    Ok(())
}
