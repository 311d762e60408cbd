//! The "SPACE" index - a uniform grid of cells over the network.
//!
//! The grid tiles the network's bounding box (padded by [`BBOX_PADDING`]
//! degrees on every side) with square cells of edge `dimension`, stored
//! row-major. Every link is rasterized into the cells its geometry is deemed
//! to intersect, so a sensor only needs to scan the links of its own cell.
//!
//! Cell lookup is a pure floor-division transform. Shared cell edges follow a
//! half-open convention: a coordinate exactly on a boundary belongs to the
//! cell with the larger index.

use crate::error::GridError;
use crate::geo::GeoPosition;
use crate::network::{LinkIndex, LinkSegment};
use serde::{Deserialize, Serialize};

/// Margin added around the node bounding box, in degrees.
pub const BBOX_PADDING: f64 = 0.001;

/// Column/row index of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellCoord {
    /// Column (longitude axis)
    pub x: usize,
    /// Row (latitude axis)
    pub y: usize,
}

impl CellCoord {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// A rectangular region of the grid and the links assigned to it.
#[derive(Debug, Clone)]
pub struct Cell {
    /// Row-major identifier: `y * num_cells_x + x`
    pub id: usize,

    pub coord: CellCoord,

    /// South-west corner
    pub down_left: GeoPosition,

    /// North-east corner
    pub up_right: GeoPosition,

    /// Links whose geometry reaches this cell, in assignment order
    links: Vec<LinkIndex>,
}

impl Cell {
    fn new(id: usize, coord: CellCoord, down_left: GeoPosition, up_right: GeoPosition) -> Self {
        Self {
            id,
            coord,
            down_left,
            up_right,
            links: Vec::new(),
        }
    }

    /// Links assigned to this cell.
    pub fn links(&self) -> &[LinkIndex] {
        &self.links
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Appends a link unless it is already the last entry.
    ///
    /// A single rasterization visits each cell at most once, and links are
    /// rasterized one at a time, so a repeat can only come from the same
    /// segment being passed again right after itself.
    fn add_link(&mut self, link: LinkIndex) -> bool {
        if self.links.last() == Some(&link) {
            return false;
        }
        self.links.push(link);
        true
    }
}

/// Summary of one link-assignment pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentStats {
    /// Links rasterized into at least one cell
    pub links_assigned: usize,
    /// Links with an endpoint outside the grid
    pub links_skipped: usize,
    /// Total (cell, link) entries written
    pub cell_entries: usize,
    /// Links handled by the diagonal line-intersection rule
    pub diagonal_links: usize,
}

/// Uniform grid of cells over the padded bounding box of the network.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    /// Cell edge length in degrees
    dimension: f64,

    min_lat: f64,
    max_lat: f64,
    min_lon: f64,
    max_lon: f64,

    num_cells_x: usize,
    num_cells_y: usize,

    /// Row-major storage: index = y * num_cells_x + x
    cells: Vec<Cell>,
}

impl SpatialGrid {
    /// Builds an empty grid over the given node positions.
    ///
    /// # Errors
    /// - [`GridError::EmptyNetwork`] when `positions` is empty
    /// - [`GridError::InvalidDimension`] when `dimension` is not positive and finite
    pub fn build<I>(positions: I, dimension: f64) -> Result<Self, GridError>
    where
        I: IntoIterator<Item = GeoPosition>,
    {
        if !(dimension.is_finite() && dimension > 0.0) {
            return Err(GridError::InvalidDimension(dimension));
        }

        let mut iter = positions.into_iter();
        let first = iter.next().ok_or(GridError::EmptyNetwork)?;
        let (mut min_lat, mut max_lat) = (first.lat, first.lat);
        let (mut min_lon, mut max_lon) = (first.lon, first.lon);

        for pos in std::iter::once(first).chain(iter) {
            if !pos.is_finite() {
                return Err(GridError::NonFinitePosition { lat: pos.lat, lon: pos.lon });
            }
            min_lat = min_lat.min(pos.lat);
            max_lat = max_lat.max(pos.lat);
            min_lon = min_lon.min(pos.lon);
            max_lon = max_lon.max(pos.lon);
        }

        min_lat -= BBOX_PADDING;
        max_lat += BBOX_PADDING;
        min_lon -= BBOX_PADDING;
        max_lon += BBOX_PADDING;

        let num_cells_x = cell_count(max_lon - min_lon, dimension);
        let num_cells_y = cell_count(max_lat - min_lat, dimension);
        let total = num_cells_x
            .zip(num_cells_y)
            .and_then(|(x, y)| x.checked_mul(y).map(|total| (x, y, total)))
            .filter(|&(_, _, total)| total <= MAX_CELLS);
        let Some((num_cells_x, num_cells_y, total)) = total else {
            return Err(GridError::TooManyCells {
                lon_range: max_lon - min_lon,
                lat_range: max_lat - min_lat,
                dimension,
            });
        };

        let mut cells = Vec::with_capacity(total);
        for y in 0..num_cells_y {
            for x in 0..num_cells_x {
                let lat = min_lat + y as f64 * dimension;
                let lon = min_lon + x as f64 * dimension;
                cells.push(Cell::new(
                    y * num_cells_x + x,
                    CellCoord::new(x, y),
                    GeoPosition::new(lat, lon),
                    GeoPosition::new(lat + dimension, lon + dimension),
                ));
            }
        }

        tracing::info!(
            num_cells_x,
            num_cells_y,
            total = cells.len(),
            dimension,
            "Built spatial grid"
        );

        Ok(Self {
            dimension,
            min_lat,
            max_lat,
            min_lon,
            max_lon,
            num_cells_x,
            num_cells_y,
            cells,
        })
    }

    pub fn dimension(&self) -> f64 {
        self.dimension
    }

    pub fn num_cells_x(&self) -> usize {
        self.num_cells_x
    }

    pub fn num_cells_y(&self) -> usize {
        self.num_cells_y
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Padded bounding box as (south-west, north-east) corners.
    pub fn bounds(&self) -> (GeoPosition, GeoPosition) {
        (
            GeoPosition::new(self.min_lat, self.min_lon),
            GeoPosition::new(self.max_lat, self.max_lon),
        )
    }

    /// Cell at column `x`, row `y`; `None` outside the grid.
    pub fn get_cell(&self, x: usize, y: usize) -> Option<&Cell> {
        if x < self.num_cells_x && y < self.num_cells_y {
            Some(&self.cells[y * self.num_cells_x + x])
        } else {
            None
        }
    }

    /// Cell index of a position, or `None` if it lies outside the padded box.
    pub fn locate_coord(&self, pos: GeoPosition) -> Option<CellCoord> {
        if !pos.is_finite() {
            return None;
        }
        if pos.lat < self.min_lat
            || pos.lat >= self.max_lat
            || pos.lon < self.min_lon
            || pos.lon >= self.max_lon
        {
            return None;
        }

        let x = ((pos.lon - self.min_lon) / self.dimension).floor() as usize;
        let y = ((pos.lat - self.min_lat) / self.dimension).floor() as usize;

        // Rounding right below max can still land one past the last cell.
        (x < self.num_cells_x && y < self.num_cells_y).then_some(CellCoord::new(x, y))
    }

    /// Cell containing a position, or `None` if it lies outside the padded box.
    pub fn locate(&self, pos: GeoPosition) -> Option<&Cell> {
        self.locate_coord(pos).and_then(|c| self.get_cell(c.x, c.y))
    }

    /// Rasterizes links into the cells they reach.
    ///
    /// - Both endpoints in one cell: that cell only.
    /// - Endpoint cells share a column (row): every cell of that column (row)
    ///   between them.
    /// - Otherwise the two endpoint cells, plus every other cell of their
    ///   index bounding rectangle whose left, right, bottom or top side
    ///   (tested in that order) is crossed by the link's line.
    ///
    /// The diagonal rule tests the infinite line through the endpoints, not
    /// the finite segment, so it may assign a link to a cell its segment does
    /// not actually cross. Recall of the grid strategy depends on this
    /// over-approximation.
    pub fn assign_links<I>(&mut self, segments: I) -> AssignmentStats
    where
        I: IntoIterator<Item = LinkSegment>,
    {
        let mut stats = AssignmentStats::default();

        for seg in segments {
            let (Some(s), Some(e)) = (self.locate_coord(seg.start), self.locate_coord(seg.end))
            else {
                tracing::warn!(link = seg.index, "Link endpoint outside grid, skipping");
                stats.links_skipped += 1;
                continue;
            };
            stats.links_assigned += 1;

            if s == e {
                stats.cell_entries += self.add_to(s.x, s.y, seg.index);
                continue;
            }

            let (min_x, max_x) = (s.x.min(e.x), s.x.max(e.x));
            let (min_y, max_y) = (s.y.min(e.y), s.y.max(e.y));

            if s.x == e.x {
                for y in min_y..=max_y {
                    stats.cell_entries += self.add_to(s.x, y, seg.index);
                }
            } else if s.y == e.y {
                for x in min_x..=max_x {
                    stats.cell_entries += self.add_to(x, s.y, seg.index);
                }
            } else {
                stats.diagonal_links += 1;
                stats.cell_entries += self.add_to(s.x, s.y, seg.index);
                stats.cell_entries += self.add_to(e.x, e.y, seg.index);

                // lat = slope * lon + intercept; endpoints differ in both
                // row and column, so slope is finite and non-zero.
                let slope = (seg.end.lat - seg.start.lat) / (seg.end.lon - seg.start.lon);
                let intercept = seg.start.lat - slope * seg.start.lon;

                for x in min_x..=max_x {
                    for y in min_y..=max_y {
                        let coord = CellCoord::new(x, y);
                        if coord == s || coord == e {
                            continue;
                        }
                        let cell = &self.cells[y * self.num_cells_x + x];
                        if line_crosses_cell(slope, intercept, cell) {
                            stats.cell_entries += self.add_to(x, y, seg.index);
                        }
                    }
                }
            }
        }

        tracing::debug!(
            assigned = stats.links_assigned,
            skipped = stats.links_skipped,
            entries = stats.cell_entries,
            diagonal = stats.diagonal_links,
            "Assigned links to grid"
        );

        stats
    }

    fn add_to(&mut self, x: usize, y: usize, link: LinkIndex) -> usize {
        let idx = y * self.num_cells_x + x;
        usize::from(self.cells[idx].add_link(link))
    }
}

/// Largest cell vector that can be allocated without a capacity overflow.
const MAX_CELLS: usize = isize::MAX as usize / std::mem::size_of::<Cell>();

/// Cells needed to cover `range` with edge length `dimension`, or `None`
/// when the count does not fit in a `usize`.
fn cell_count(range: f64, dimension: f64) -> Option<usize> {
    let n = (range / dimension).ceil();
    (n.is_finite() && n < usize::MAX as f64).then_some(n as usize)
}

/// Tests the sides of a cell against the line `lat = slope * lon + intercept`
/// in the order left, right, bottom, top; the first hit wins.
fn line_crosses_cell(slope: f64, intercept: f64, cell: &Cell) -> bool {
    let (min_lon, max_lon) = (cell.down_left.lon, cell.up_right.lon);
    let (min_lat, max_lat) = (cell.down_left.lat, cell.up_right.lat);
    let in_lat = |lat: f64| lat >= min_lat && lat <= max_lat;
    let in_lon = |lon: f64| lon >= min_lon && lon <= max_lon;

    in_lat(slope * min_lon + intercept)
        || in_lat(slope * max_lon + intercept)
        || in_lon((min_lat - intercept) / slope)
        || in_lon((max_lat - intercept) / slope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn pos(lat: f64, lon: f64) -> GeoPosition {
        GeoPosition::new(lat, lon)
    }

    fn seg(index: LinkIndex, start: GeoPosition, end: GeoPosition) -> LinkSegment {
        LinkSegment { index, start, end }
    }

    /// 0..10 x 0..10 box with unit cells (11 x 11 after padding).
    fn ten_by_ten() -> SpatialGrid {
        SpatialGrid::build([pos(0.0, 0.0), pos(10.0, 10.0)], 1.0).unwrap()
    }

    fn cells_with(grid: &SpatialGrid, link: LinkIndex) -> Vec<CellCoord> {
        grid.cells()
            .iter()
            .filter(|c| c.links().contains(&link))
            .map(|c| c.coord)
            .collect()
    }

    #[test]
    fn test_empty_network_rejected() {
        let err = SpatialGrid::build(std::iter::empty(), 1.0).unwrap_err();
        assert_eq!(err, GridError::EmptyNetwork);
    }

    #[test]
    fn test_invalid_dimension_rejected() {
        for d in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                SpatialGrid::build([pos(0.0, 0.0)], d),
                Err(GridError::InvalidDimension(_))
            ));
        }
    }

    #[test]
    fn test_tiny_dimension_rejected() {
        // 1e10 x 1e10 cells overflows the cell count
        let err = SpatialGrid::build([pos(0.0, 0.0), pos(10.0, 10.0)], 1e-9).unwrap_err();
        assert!(matches!(err, GridError::TooManyCells { .. }));

        let err = SpatialGrid::build([pos(0.0, 0.0), pos(10.0, 10.0)], f64::MIN_POSITIVE).unwrap_err();
        assert!(matches!(err, GridError::TooManyCells { .. }));

        // 1e9 x 1e9 fits in a usize but not in an allocation
        let err = SpatialGrid::build([pos(0.0, 0.0), pos(1.0, 1.0)], 1e-9).unwrap_err();
        assert!(matches!(err, GridError::TooManyCells { .. }));
    }

    #[test]
    fn test_padding_and_cell_counts() {
        let grid = ten_by_ten();
        let (sw, ne) = grid.bounds();
        assert_relative_eq!(sw.lat, -0.001, epsilon = 1e-12);
        assert_relative_eq!(ne.lon, 10.001, epsilon = 1e-12);
        // ceil(10.002 / 1.0)
        assert_eq!(grid.num_cells_x(), 11);
        assert_eq!(grid.num_cells_y(), 11);
        assert_eq!(grid.cells().len(), 121);
    }

    #[test]
    fn test_single_node_grid() {
        let grid = SpatialGrid::build([pos(5.0, 5.0)], 1.0).unwrap();
        assert_eq!(grid.num_cells_x(), 1);
        assert_eq!(grid.num_cells_y(), 1);
        assert!(grid.locate(pos(5.0, 5.0)).is_some());
    }

    #[test]
    fn test_row_major_ids() {
        let grid = ten_by_ten();
        let cell = grid.get_cell(3, 2).unwrap();
        assert_eq!(cell.id, 2 * 11 + 3);
        assert_eq!(cell.coord, CellCoord::new(3, 2));
        assert!(grid.get_cell(11, 0).is_none());
        assert!(grid.get_cell(0, 11).is_none());
    }

    #[test]
    fn test_locate_outside_box() {
        let grid = ten_by_ten();
        assert!(grid.locate(pos(-1.0, 5.0)).is_none());
        assert!(grid.locate(pos(5.0, 10.5)).is_none());
        assert!(grid.locate(pos(f64::NAN, 5.0)).is_none());
    }

    #[test]
    fn test_locate_half_open_boundary() {
        // Padding puts the origin exactly at (0, 0)
        let grid = SpatialGrid::build([pos(0.001, 0.001), pos(4.0, 4.0)], 1.0).unwrap();
        assert_eq!(grid.bounds().0, pos(0.0, 0.0));

        // Exactly on the edge between column 0 and 1 belongs to column 1
        assert_eq!(grid.locate_coord(pos(0.5, 1.0)).unwrap(), CellCoord::new(1, 0));
        assert_eq!(grid.locate_coord(pos(2.0, 0.5)).unwrap(), CellCoord::new(0, 2));
    }

    #[test]
    fn test_same_cell_link() {
        let mut grid = ten_by_ten();
        let stats = grid.assign_links([seg(0, pos(2.2, 3.3), pos(2.7, 3.9))]);
        assert_eq!(cells_with(&grid, 0), vec![CellCoord::new(3, 2)]);
        assert_eq!(stats.cell_entries, 1);
    }

    #[test]
    fn test_column_link() {
        let mut grid = ten_by_ten();
        grid.assign_links([seg(0, pos(1.5, 4.5), pos(4.5, 4.5))]);
        assert_eq!(
            cells_with(&grid, 0),
            (1..=4).map(|y| CellCoord::new(4, y)).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_row_link() {
        let mut grid = ten_by_ten();
        grid.assign_links([seg(0, pos(6.5, 7.5), pos(6.5, 2.5))]);
        assert_eq!(
            cells_with(&grid, 0),
            (2..=7).map(|x| CellCoord::new(x, 6)).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_diagonal_link_follows_line() {
        let mut grid = ten_by_ten();
        // From cell (1, 1) to cell (3, 3) along lat = lon
        let stats = grid.assign_links([seg(0, pos(1.5, 1.5), pos(3.5, 3.5))]);
        let cells = cells_with(&grid, 0);

        assert_eq!(stats.diagonal_links, 1);
        assert!(cells.contains(&CellCoord::new(1, 1)));
        assert!(cells.contains(&CellCoord::new(2, 2)));
        assert!(cells.contains(&CellCoord::new(3, 3)));
        // Far corner of the bounding rectangle is never crossed
        assert!(!cells.contains(&CellCoord::new(3, 1)));
        assert!(!cells.contains(&CellCoord::new(1, 3)));
    }

    #[test]
    fn test_repeated_segment_not_duplicated() {
        let mut grid = ten_by_ten();
        let column = seg(0, pos(1.5, 4.5), pos(4.5, 4.5));
        let diagonal = seg(1, pos(1.5, 1.5), pos(3.5, 3.5));
        let stats = grid.assign_links([column, column, diagonal, diagonal]);

        assert_eq!(stats.links_assigned, 4);
        for cell in grid.cells() {
            for link in [0, 1] {
                assert!(cell.links().iter().filter(|&&l| l == link).count() <= 1);
            }
        }
        // Column link: 4 cells; second pass of each segment adds nothing
        assert_eq!(cells_with(&grid, 0).len(), 4);
        assert_eq!(
            stats.cell_entries,
            cells_with(&grid, 0).len() + cells_with(&grid, 1).len()
        );
    }

    #[test]
    fn test_link_outside_grid_skipped() {
        let mut grid = ten_by_ten();
        let stats = grid.assign_links([seg(0, pos(1.0, 1.0), pos(50.0, 50.0))]);
        assert_eq!(stats.links_skipped, 1);
        assert!(grid.cells().iter().all(|c| c.is_empty()));
    }

    #[test]
    fn test_reassignment_is_deterministic() {
        let segments = vec![
            seg(0, pos(0.2, 0.3), pos(7.9, 3.1)),
            seg(1, pos(9.5, 0.5), pos(0.5, 9.5)),
            seg(2, pos(4.4, 4.4), pos(4.6, 4.6)),
            seg(3, pos(2.0, 8.0), pos(2.0, 1.0)),
        ];
        let mut a = ten_by_ten();
        let mut b = ten_by_ten();
        a.assign_links(segments.clone());
        b.assign_links(segments);

        for (ca, cb) in a.cells().iter().zip(b.cells()) {
            assert_eq!(ca.links(), cb.links());
        }
    }

    fn position() -> impl Strategy<Value = GeoPosition> {
        (0.0f64..10.0, 0.0f64..10.0).prop_map(|(lat, lon)| GeoPosition::new(lat, lon))
    }

    proptest! {
        #[test]
        fn prop_cells_tile_without_gaps(dim in 0.3f64..3.0) {
            let grid = SpatialGrid::build([pos(0.0, 0.0), pos(10.0, 10.0)], dim).unwrap();
            for y in 0..grid.num_cells_y() {
                for x in 0..grid.num_cells_x() {
                    let cell = grid.get_cell(x, y).unwrap();
                    if let Some(right) = grid.get_cell(x + 1, y) {
                        prop_assert!((cell.up_right.lon - right.down_left.lon).abs() < 1e-9);
                        prop_assert_eq!(cell.down_left.lat, right.down_left.lat);
                    }
                    if let Some(up) = grid.get_cell(x, y + 1) {
                        prop_assert!((cell.up_right.lat - up.down_left.lat).abs() < 1e-9);
                        prop_assert_eq!(cell.down_left.lon, up.down_left.lon);
                    }
                }
            }
        }

        #[test]
        fn prop_assignment_stays_in_bounding_rectangle(a in position(), b in position()) {
            let mut grid = ten_by_ten();
            grid.assign_links([seg(0, a, b)]);
            let s = grid.locate_coord(a).unwrap();
            let e = grid.locate_coord(b).unwrap();

            let cells = cells_with(&grid, 0);
            prop_assert!(cells.contains(&s));
            prop_assert!(cells.contains(&e));
            for c in &cells {
                prop_assert!(c.x >= s.x.min(e.x) && c.x <= s.x.max(e.x));
                prop_assert!(c.y >= s.y.min(e.y) && c.y <= s.y.max(e.y));
            }
            if s == e {
                prop_assert_eq!(cells.len(), 1);
            }
        }
    }
}
