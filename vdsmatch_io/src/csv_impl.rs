//! CSV file source.
//!
//! Both inputs are comma-separated with a single header row:
//! - network: `linkID,startNodeID,startLon,startLat,endNodeID,endLon,endLat`
//! - sensors: `sensorID,lat,lon`
//!
//! Note the column order flips between the two files (lon/lat vs lat/lon).
//! Blank lines are skipped; extra trailing columns are ignored.

use crate::error::IoError;
use crate::source::NetworkSource;
use crate::types::{LinkRecord, SensorRecord};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use vdsmatch_core::{GeoPosition, LinkId, NodeId, SensorId};

/// Network and sensor CSV files on disk.
#[derive(Debug, Clone)]
pub struct CsvFiles {
    pub network_path: PathBuf,
    pub sensors_path: PathBuf,
}

impl CsvFiles {
    pub fn new(network_path: impl Into<PathBuf>, sensors_path: impl Into<PathBuf>) -> Self {
        Self {
            network_path: network_path.into(),
            sensors_path: sensors_path.into(),
        }
    }

    fn open(path: &Path) -> Result<BufReader<File>, IoError> {
        File::open(path)
            .map(BufReader::new)
            .map_err(|e| IoError::open(path, e))
    }
}

impl NetworkSource for CsvFiles {
    fn load_links(&self) -> Result<Vec<LinkRecord>, IoError> {
        let links = parse_links(Self::open(&self.network_path)?)?;
        tracing::debug!(path = %self.network_path.display(), rows = links.len(), "Read network file");
        Ok(links)
    }

    fn load_sensors(&self) -> Result<Vec<SensorRecord>, IoError> {
        let sensors = parse_sensors(Self::open(&self.sensors_path)?)?;
        tracing::debug!(path = %self.sensors_path.display(), rows = sensors.len(), "Read sensor file");
        Ok(sensors)
    }
}

/// Parses network rows from any buffered reader.
pub fn parse_links<R: BufRead>(reader: R) -> Result<Vec<LinkRecord>, IoError> {
    parse_rows(reader, 7, |f| {
        Ok(LinkRecord {
            link: LinkId(f.field(0)?),
            start_node: NodeId(f.field(1)?),
            start: GeoPosition::new(f.coord(3)?, f.coord(2)?),
            end_node: NodeId(f.field(4)?),
            end: GeoPosition::new(f.coord(6)?, f.coord(5)?),
        })
    })
}

/// Parses sensor rows from any buffered reader.
pub fn parse_sensors<R: BufRead>(reader: R) -> Result<Vec<SensorRecord>, IoError> {
    parse_rows(reader, 3, |f| {
        Ok(SensorRecord {
            sensor: SensorId(f.field(0)?),
            position: GeoPosition::new(f.coord(1)?, f.coord(2)?),
        })
    })
}

/// Split fields of one data row.
struct Fields<'a> {
    line: usize,
    items: Vec<&'a str>,
}

impl Fields<'_> {
    fn field<T: FromStr>(&self, idx: usize) -> Result<T, IoError>
    where
        T::Err: std::fmt::Display,
    {
        let raw = self.items[idx];
        raw.parse::<T>()
            .map_err(|e| IoError::malformed(self.line, format!("column {}: {:?}: {}", idx + 1, raw, e)))
    }

    /// A coordinate column; `NaN` and infinities parse as `f64` but are rejected.
    fn coord(&self, idx: usize) -> Result<f64, IoError> {
        let value: f64 = self.field(idx)?;
        if !value.is_finite() {
            return Err(IoError::malformed(
                self.line,
                format!("column {}: non-finite coordinate {:?}", idx + 1, self.items[idx]),
            ));
        }
        Ok(value)
    }
}

fn parse_rows<R, T, F>(reader: R, columns: usize, mut parse: F) -> Result<Vec<T>, IoError>
where
    R: BufRead,
    F: FnMut(&Fields<'_>) -> Result<T, IoError>,
{
    let mut out = Vec::new();

    // Line 1 is the header
    for (idx, line) in reader.lines().enumerate().skip(1) {
        let line = line.map_err(IoError::Read)?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let items: Vec<&str> = trimmed.split(',').map(str::trim).collect();
        let line_no = idx + 1;
        if items.len() < columns {
            return Err(IoError::malformed(
                line_no,
                format!("expected {} columns, found {}", columns, items.len()),
            ));
        }

        out.push(parse(&Fields { line: line_no, items })?);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Cursor;

    const NETWORK: &str = "\
linkID,startNodeID,startLon,startLat,endNodeID,endLon,endLat
1,10,23.70,37.90,11,23.71,37.91
2,11,23.71,37.91,12,23.72,37.91

3, 12 , 23.72 ,37.91,10,23.70,37.90,extra
";

    #[test]
    fn test_parse_links() {
        let links = parse_links(Cursor::new(NETWORK)).unwrap();
        assert_eq!(links.len(), 3);

        let first = &links[0];
        assert_eq!(first.link, LinkId(1));
        assert_eq!(first.start_node, NodeId(10));
        // Network file stores lon before lat
        assert_relative_eq!(first.start.lon, 23.70);
        assert_relative_eq!(first.start.lat, 37.90);
        assert_relative_eq!(first.end.lat, 37.91);

        assert_eq!(links[2].start_node, NodeId(12));
    }

    #[test]
    fn test_parse_sensors() {
        let sensors = parse_sensors(Cursor::new("id,lat,lon\n5,37.9,23.7\n6,38.0,23.8\n")).unwrap();
        assert_eq!(sensors.len(), 2);
        assert_eq!(sensors[1].sensor, SensorId(6));
        assert_relative_eq!(sensors[1].position.lat, 38.0);
        assert_relative_eq!(sensors[1].position.lon, 23.8);
    }

    #[test]
    fn test_header_only() {
        assert!(parse_sensors(Cursor::new("id,lat,lon\n")).unwrap().is_empty());
        assert!(parse_links(Cursor::new("")).unwrap().is_empty());
    }

    #[test]
    fn test_short_row_reports_line() {
        let err = parse_sensors(Cursor::new("id,lat,lon\n1,2,3\n4,5\n")).unwrap_err();
        match err {
            IoError::Malformed { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bad_number() {
        let err = parse_sensors(Cursor::new("id,lat,lon\nx,2,3\n")).unwrap_err();
        assert!(matches!(err, IoError::Malformed { line: 2, .. }));
    }

    #[test]
    fn test_non_finite_coordinate_rejected() {
        let err = parse_sensors(Cursor::new("id,lat,lon\n1,0.5,0.5\n7,NaN,inf\n")).unwrap_err();
        assert!(matches!(err, IoError::Malformed { line: 3, .. }));

        let err = parse_links(Cursor::new(
            "id,from,fromLon,fromLat,to,toLon,toLat\n1,1,0,0,2,inf,1\n",
        ))
        .unwrap_err();
        assert!(matches!(err, IoError::Malformed { line: 2, .. }));
    }

    #[test]
    fn test_missing_file() {
        let files = CsvFiles::new("/nonexistent/network.csv", "/nonexistent/vds.csv");
        assert!(matches!(files.load_links(), Err(IoError::Open { .. })));
    }
}
