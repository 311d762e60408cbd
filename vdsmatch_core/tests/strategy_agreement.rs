//! Exhaustive and grid strategies on the same networks.

use proptest::prelude::*;
use vdsmatch_core::{
    ExhaustiveMatcher, GeoPosition, GridMatcher, LinkId, MatchConfig, Matcher, Network,
    NetworkBuilder, NodeId, SensorId, Strategy as MatchStrategy,
};

fn build(links: &[((f64, f64), (f64, f64))], sensors: &[(f64, f64)]) -> Network {
    let mut b = NetworkBuilder::new();
    for (i, &(s, e)) in links.iter().enumerate() {
        let i = i as u64;
        b.add_link_with_nodes(
            LinkId(i + 1),
            (NodeId(2 * i + 1), GeoPosition::new(s.0, s.1)),
            (NodeId(2 * i + 2), GeoPosition::new(e.0, e.1)),
        );
    }
    for (i, &(lat, lon)) in sensors.iter().enumerate() {
        b.add_sensor(SensorId(i as u64 + 1), GeoPosition::new(lat, lon));
    }
    b.build().unwrap()
}

#[test]
fn test_single_cell_grid_equals_exhaustive() {
    // A cell larger than the whole network holds every link, so the grid
    // scan degenerates to the exhaustive one.
    let net = build(
        &[
            ((0.0, 0.0), (0.3, 0.4)),
            ((0.5, 0.1), (0.5, 0.9)),
            ((0.9, 0.0), (0.2, 0.7)),
            ((0.1, 0.6), (0.4, 0.6)),
        ],
        &[(0.2, 0.2), (0.45, 0.5), (0.8, 0.8), (0.0, 0.9), (0.6, 0.05)],
    );

    let exhaustive = ExhaustiveMatcher.match_sensors(&net).unwrap();
    let grid = GridMatcher::new(10.0, 3).unwrap().match_sensors(&net).unwrap();

    assert_eq!(exhaustive.outcomes, grid.outcomes);
}

#[test]
fn test_config_selects_strategy() {
    let net = build(&[((0.0, 0.0), (0.0, 1.0))], &[(0.1, 0.5)]);
    let config = MatchConfig {
        strategy: MatchStrategy::Exhaustive,
        ..Default::default()
    };
    let result = vdsmatch_core::matcher_for(&config, &net)
        .unwrap()
        .match_sensors(&net)
        .unwrap();
    assert_eq!(result.strategy, MatchStrategy::Exhaustive);
    assert_eq!(result.matched_count(), 1);
}

fn coord() -> impl Strategy<Value = (f64, f64)> {
    (0.0f64..1.0, 0.0f64..1.0)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_grid_never_beats_exhaustive(
        links in prop::collection::vec((coord(), coord()), 1..25),
        sensors in prop::collection::vec(coord(), 1..40),
        dimension in 0.02f64..0.5,
        workers in 1usize..4,
    ) {
        let net = build(&links, &sensors);
        let matcher = GridMatcher::new(dimension, workers).unwrap();
        let (grid, _) = matcher.build_grid(&net).unwrap();

        let exhaustive = ExhaustiveMatcher.match_sensors(&net).unwrap();
        let gridded = matcher.match_with_grid(&grid, &net).unwrap();
        prop_assert_eq!(gridded.outcomes.len(), net.sensors().len());

        for vds in net.sensors() {
            let ex = exhaustive.outcome(vds.id).unwrap();
            let gr = gridded.outcome(vds.id).unwrap();
            let (best_link, best) = ex.nearest_link().unwrap();

            if let Some((_, d)) = gr.nearest_link() {
                prop_assert!(d >= best);
            }

            let best_idx = net.link_index(best_link).unwrap();
            if grid.locate(vds.position).is_some_and(|c| c.links().contains(&best_idx)) {
                prop_assert_eq!(ex, gr);
            }
        }
    }
}
