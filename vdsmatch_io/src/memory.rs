//! In-memory network source.

use crate::error::IoError;
use crate::source::NetworkSource;
use crate::types::{LinkRecord, SensorRecord};

/// A [`NetworkSource`] backed by owned record vectors.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    pub links: Vec<LinkRecord>,
    pub sensors: Vec<SensorRecord>,
}

impl InMemorySource {
    pub fn new(links: Vec<LinkRecord>, sensors: Vec<SensorRecord>) -> Self {
        Self { links, sensors }
    }
}

impl NetworkSource for InMemorySource {
    fn load_links(&self) -> Result<Vec<LinkRecord>, IoError> {
        Ok(self.links.clone())
    }

    fn load_sensors(&self) -> Result<Vec<SensorRecord>, IoError> {
        Ok(self.sensors.clone())
    }
}
