//! VDSMatch I/O Layer
//!
//! This crate keeps file formats out of the matching core. The core only
//! sees a built [`Network`](vdsmatch_core::Network); how link and sensor
//! records get there is the job of a [`NetworkSource`]:
//! - **Production**: [`CsvFiles`] reads the network and sensor CSV files
//! - **Tests**: [`InMemorySource`] serves records from vectors
//!
//! Results leave through the writers in [`sink`].
//!
//! # Example
//!
//! ```ignore
//! use vdsmatch_io::{load_network, CsvFiles};
//!
//! let source = CsvFiles::new("network.csv", "vds.csv");
//! let network = load_network(&source)?;
//! ```

mod csv_impl;
mod error;
mod memory;
pub mod sink;
mod source;
mod types;

pub use csv_impl::{parse_links, parse_sensors, CsvFiles};
pub use error::IoError;
pub use memory::InMemorySource;
pub use sink::{write_adjacency, write_assignments};
pub use source::{load_network, NetworkSource};
pub use types::{LinkRecord, SensorRecord};
