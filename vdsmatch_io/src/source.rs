//! The network source seam.

use crate::error::IoError;
use crate::types::{LinkRecord, SensorRecord};
use vdsmatch_core::{Network, NetworkBuilder};

/// Supplies the link and sensor records a network is built from.
///
/// # Implementations
///
/// - **Files**: `CsvFiles` - parses the two CSV inputs
/// - **Memory**: `InMemorySource` - hands out owned vectors
pub trait NetworkSource {
    /// Link records in file order.
    fn load_links(&self) -> Result<Vec<LinkRecord>, IoError>;

    /// Sensor records in file order.
    fn load_sensors(&self) -> Result<Vec<SensorRecord>, IoError>;
}

/// Loads all records from `source` and builds the network.
///
/// Duplicate IDs keep their first record, so file order matters.
pub fn load_network<S: NetworkSource + ?Sized>(source: &S) -> Result<Network, IoError> {
    let links = source.load_links()?;
    let sensors = source.load_sensors()?;

    let mut builder = NetworkBuilder::new();
    let mut duplicate_links = 0usize;
    for rec in &links {
        if !builder.add_link_with_nodes(
            rec.link,
            (rec.start_node, rec.start),
            (rec.end_node, rec.end),
        ) {
            duplicate_links += 1;
        }
    }

    let mut duplicate_sensors = 0usize;
    for rec in &sensors {
        if !builder.add_sensor(rec.sensor, rec.position) {
            duplicate_sensors += 1;
        }
    }

    if duplicate_links > 0 || duplicate_sensors > 0 {
        tracing::warn!(duplicate_links, duplicate_sensors, "Ignored duplicate records");
    }
    tracing::info!(links = links.len(), sensors = sensors.len(), "Loaded records");

    Ok(builder.build()?)
}
