//! The road network arena.
//!
//! Nodes, links, roads and sensors live in flat vectors owned by
//! [`Network`] and refer to each other by index, never by pointer. The
//! spatial grid stores [`LinkIndex`] handles into this arena.
//!
//! Construction goes through [`NetworkBuilder`], which deduplicates records
//! by ID, wires up node adjacency and merges chains of links through
//! pass-through nodes into [`Road`]s.

use crate::error::NetworkError;
use crate::geo::GeoPosition;
use crate::geometry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// External identifier of a network node.
    NodeId
);
id_type!(
    /// External identifier of a directed link.
    LinkId
);
id_type!(
    /// Identifier of a road (assigned sequentially during road construction).
    RoadId
);
id_type!(
    /// External identifier of a vehicle detection station.
    SensorId
);

/// Arena index of a node.
pub type NodeIndex = usize;
/// Arena index of a link.
pub type LinkIndex = usize;
/// Arena index of a road.
pub type RoadIndex = usize;

/// A network node.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub position: GeoPosition,
    /// Links ending at this node, ascending link ID
    pub incoming: Vec<LinkIndex>,
    /// Links starting at this node, ascending link ID
    pub outgoing: Vec<LinkIndex>,
}

/// A directed edge between two nodes.
#[derive(Debug, Clone)]
pub struct Link {
    pub id: LinkId,
    pub start: NodeIndex,
    pub end: NodeIndex,
    /// Planar length in degrees
    pub length: f64,
    /// Owning road, if the link was merged into one
    pub road: Option<RoadIndex>,
}

/// A maximal chain of links merged through pass-through nodes.
#[derive(Debug, Clone)]
pub struct Road {
    pub id: RoadId,
    pub start: NodeIndex,
    pub end: NodeIndex,
    /// Links in travel order
    pub links: Vec<LinkIndex>,
    pub length: f64,
}

/// A vehicle detection station.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vds {
    pub id: SensorId,
    pub position: GeoPosition,
}

/// Geometry of one link as handed to the spatial grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkSegment {
    pub index: LinkIndex,
    pub start: GeoPosition,
    pub end: GeoPosition,
}

/// Neighbouring links of a link, split by the shared node and direction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkAdjacency {
    pub link: LinkId,
    /// Incoming links of the start node
    pub before_in: Vec<LinkId>,
    /// Outgoing links of the start node
    pub before_out: Vec<LinkId>,
    /// Incoming links of the end node
    pub after_in: Vec<LinkId>,
    /// Outgoing links of the end node
    pub after_out: Vec<LinkId>,
}

impl LinkAdjacency {
    pub fn before_count(&self) -> usize {
        self.before_in.len() + self.before_out.len()
    }

    pub fn after_count(&self) -> usize {
        self.after_in.len() + self.after_out.len()
    }
}

/// Accumulates node, link and sensor records before building a [`Network`].
///
/// Every record type is keyed by ID; the first record for an ID wins and
/// later duplicates are ignored.
#[derive(Debug, Default)]
pub struct NetworkBuilder {
    nodes: BTreeMap<NodeId, GeoPosition>,
    links: BTreeMap<LinkId, (NodeId, NodeId)>,
    sensors: BTreeMap<SensorId, GeoPosition>,
}

impl NetworkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a node. Returns false if the ID was already known.
    pub fn add_node(&mut self, id: NodeId, position: GeoPosition) -> bool {
        if self.nodes.contains_key(&id) {
            return false;
        }
        self.nodes.insert(id, position);
        true
    }

    /// Registers a link between two already-known (or later-added) nodes.
    pub fn add_link(&mut self, id: LinkId, start: NodeId, end: NodeId) -> bool {
        if self.links.contains_key(&id) {
            return false;
        }
        self.links.insert(id, (start, end));
        true
    }

    /// Registers a link together with its endpoint nodes, the shape of one
    /// row of a network file.
    pub fn add_link_with_nodes(
        &mut self,
        id: LinkId,
        start: (NodeId, GeoPosition),
        end: (NodeId, GeoPosition),
    ) -> bool {
        self.add_node(start.0, start.1);
        self.add_node(end.0, end.1);
        self.add_link(id, start.0, end.0)
    }

    /// Registers a sensor. Returns false if the ID was already known.
    pub fn add_sensor(&mut self, id: SensorId, position: GeoPosition) -> bool {
        if self.sensors.contains_key(&id) {
            return false;
        }
        self.sensors.insert(id, position);
        true
    }

    /// Builds the arena, node adjacency and roads.
    pub fn build(self) -> Result<Network, NetworkError> {
        let mut node_index: BTreeMap<NodeId, NodeIndex> = BTreeMap::new();
        let mut nodes = Vec::with_capacity(self.nodes.len());
        for (id, position) in self.nodes {
            node_index.insert(id, nodes.len());
            nodes.push(Node {
                id,
                position,
                incoming: Vec::new(),
                outgoing: Vec::new(),
            });
        }

        let mut links = Vec::with_capacity(self.links.len());
        for (id, (start_id, end_id)) in self.links {
            let resolve = |node: NodeId| {
                node_index
                    .get(&node)
                    .copied()
                    .ok_or(NetworkError::UnknownNode { link: id.0, node: node.0 })
            };
            let start = resolve(start_id)?;
            let end = resolve(end_id)?;

            let index = links.len();
            nodes[start].outgoing.push(index);
            nodes[end].incoming.push(index);
            links.push(Link {
                id,
                start,
                end,
                length: geometry::distance(nodes[start].position, nodes[end].position),
                road: None,
            });
        }

        let sensors = self
            .sensors
            .into_iter()
            .map(|(id, position)| Vds { id, position })
            .collect();

        let mut network = Network {
            nodes,
            links,
            roads: Vec::new(),
            sensors,
        };
        network.build_roads();

        tracing::debug!(
            nodes = network.nodes.len(),
            links = network.links.len(),
            roads = network.roads.len(),
            sensors = network.sensors.len(),
            "Network built"
        );

        Ok(network)
    }
}

/// The road network: node, link, road and sensor arenas.
#[derive(Debug, Clone, Default)]
pub struct Network {
    nodes: Vec<Node>,
    links: Vec<Link>,
    roads: Vec<Road>,
    sensors: Vec<Vds>,
}

impl Network {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn roads(&self) -> &[Road] {
        &self.roads
    }

    pub fn sensors(&self) -> &[Vds] {
        &self.sensors
    }

    pub fn node(&self, index: NodeIndex) -> &Node {
        &self.nodes[index]
    }

    pub fn link(&self, index: LinkIndex) -> &Link {
        &self.links[index]
    }

    pub fn road(&self, index: RoadIndex) -> &Road {
        &self.roads[index]
    }

    /// Looks a link up by its external ID.
    pub fn link_index(&self, id: LinkId) -> Option<LinkIndex> {
        self.links.binary_search_by_key(&id, |l| l.id).ok()
    }

    /// Looks a node up by its external ID.
    pub fn node_index(&self, id: NodeId) -> Option<NodeIndex> {
        self.nodes.binary_search_by_key(&id, |n| n.id).ok()
    }

    /// Start and end positions of a link.
    #[inline]
    pub fn link_endpoints(&self, index: LinkIndex) -> (GeoPosition, GeoPosition) {
        let link = &self.links[index];
        (self.nodes[link.start].position, self.nodes[link.end].position)
    }

    /// Road that owns the link, if any.
    #[inline]
    pub fn road_of_link(&self, index: LinkIndex) -> Option<&Road> {
        self.links[index].road.map(|r| &self.roads[r])
    }

    /// Positions of every node, in arena order.
    pub fn node_positions(&self) -> impl Iterator<Item = GeoPosition> + '_ {
        self.nodes.iter().map(|n| n.position)
    }

    /// Geometry of every link, in arena (ascending ID) order.
    pub fn segments(&self) -> impl Iterator<Item = LinkSegment> + '_ {
        (0..self.links.len()).map(move |index| {
            let (start, end) = self.link_endpoints(index);
            LinkSegment { index, start, end }
        })
    }

    /// True if the two links connect the same nodes in opposite directions.
    pub fn are_opposite(&self, a: LinkIndex, b: LinkIndex) -> bool {
        let (la, lb) = (&self.links[a], &self.links[b]);
        la.start == lb.end && la.end == lb.start
    }

    /// True if the node is a pass-through point of a single road: one link
    /// in and one (non-reversing) link out, or two opposite pairs.
    pub fn is_intermediate(&self, node: NodeIndex) -> bool {
        let n = &self.nodes[node];
        match (n.incoming.as_slice(), n.outgoing.as_slice()) {
            ([inc], [out]) => !self.are_opposite(*out, *inc),
            ([i1, i2], [o1, o2]) => {
                (self.are_opposite(*o1, *i1) && self.are_opposite(*o2, *i2))
                    || (self.are_opposite(*o1, *i2) && self.are_opposite(*o2, *i1))
            }
            _ => false,
        }
    }

    /// Link to continue on when arriving at `node` via `arriving`, if the
    /// node is a pass-through point.
    pub fn departure_link(&self, node: NodeIndex, arriving: LinkIndex) -> Option<LinkIndex> {
        if !self.is_intermediate(node) {
            return None;
        }
        let n = &self.nodes[node];
        match n.outgoing.as_slice() {
            [out] => Some(*out),
            outs => outs.iter().copied().find(|&out| !self.are_opposite(out, arriving)),
        }
    }

    /// Before/after neighbours of a link.
    pub fn adjacency(&self, index: LinkIndex) -> LinkAdjacency {
        let link = &self.links[index];
        let ids = |list: &[LinkIndex]| -> Vec<LinkId> {
            list.iter()
                .filter(|&&l| l != index)
                .map(|&l| self.links[l].id)
                .collect()
        };
        let start = &self.nodes[link.start];
        let end = &self.nodes[link.end];

        LinkAdjacency {
            link: link.id,
            before_in: ids(&start.incoming),
            before_out: ids(&start.outgoing),
            after_in: ids(&end.incoming),
            after_out: ids(&end.outgoing),
        }
    }

    /// Longest link length, the basis of the default cell sizing.
    pub fn max_link_length(&self) -> Result<f64, NetworkError> {
        self.links
            .iter()
            .map(|l| l.length)
            .reduce(f64::max)
            .ok_or(NetworkError::Empty("links"))
    }

    /// Merges links into roads.
    ///
    /// Starting from every non-intermediate node (ascending ID) and each of
    /// its outgoing links not yet on a road, a road follows departure links
    /// until it reaches a non-intermediate node or a link already taken.
    /// Links on closed loops of intermediate nodes are never reached and
    /// stay unowned.
    fn build_roads(&mut self) {
        for node in 0..self.nodes.len() {
            if self.is_intermediate(node) {
                continue;
            }
            for first in self.nodes[node].outgoing.clone() {
                if self.links[first].road.is_some() {
                    continue;
                }

                let road_index = self.roads.len();
                let mut chain = vec![first];
                self.links[first].road = Some(road_index);

                let mut arriving = first;
                let mut end = self.links[first].end;
                while let Some(next) = self.departure_link(end, arriving) {
                    if self.links[next].road.is_some() {
                        break;
                    }
                    self.links[next].road = Some(road_index);
                    chain.push(next);
                    arriving = next;
                    end = self.links[next].end;
                }

                let length = chain.iter().map(|&l| self.links[l].length).sum();
                self.roads.push(Road {
                    id: RoadId(road_index as u64),
                    start: node,
                    end,
                    links: chain,
                    length,
                });
            }
        }
    }
}
