use std::collections::HashSet;

use crate::error::Error;
use crate::net::{NetworkTopology, NodeKind, TopologyConfig, TopologyStrategy};

fn config(counts: [usize; 6], strategy: TopologyStrategy) -> TopologyConfig {
    TopologyConfig {
        host_count: counts[0],
        slb_count: counts[1],
        gs_count: counts[2],
        mds_count: counts[3],
        ccs_count: counts[4],
        bss_count: counts[5],
        strategy,
    }
}

#[test]
fn grouped_by_kind_packs_kinds_contiguously() {
    let topology = NetworkTopology::new(&config(
        [2, 1, 1, 1, 2, 3],
        TopologyStrategy::GroupedByKind,
    ))
    .expect("topology");

    assert_eq!(topology.total_ranks(), 10);
    assert_eq!(topology.rank_of(NodeKind::Host, 0).expect("rank").0, 0);
    assert_eq!(topology.rank_of(NodeKind::Host, 1).expect("rank").0, 1);
    assert_eq!(topology.rank_of(NodeKind::Slb, 0).expect("rank").0, 2);
    assert_eq!(topology.rank_of(NodeKind::Gs, 0).expect("rank").0, 3);
    assert_eq!(topology.rank_of(NodeKind::Mds, 0).expect("rank").0, 4);
    assert_eq!(topology.rank_of(NodeKind::Ccs, 0).expect("rank").0, 5);
    assert_eq!(topology.rank_of(NodeKind::Ccs, 1).expect("rank").0, 6);
    assert_eq!(topology.rank_of(NodeKind::Bss, 0).expect("rank").0, 7);
    assert_eq!(topology.rank_of(NodeKind::Bss, 2).expect("rank").0, 9);
}

#[test]
fn fat_tree_placement_is_a_bijection() {
    let topology =
        NetworkTopology::new(&config([3, 2, 2, 2, 2, 3], TopologyStrategy::FatTree))
            .expect("topology");

    assert_eq!(topology.total_ranks(), 14);
    let mut seen = HashSet::new();
    for kind in NodeKind::ALL {
        for index in 0..topology.count(kind) {
            let rank = topology.rank_of(kind, index).expect("rank");
            assert!(rank.0 < 14, "rank {rank} out of bounds");
            assert!(seen.insert(rank.0), "rank {rank} assigned twice");
        }
    }
    assert_eq!(seen.len(), 14);
}

#[test]
fn fat_tree_spreads_instead_of_packing() {
    let topology =
        NetworkTopology::new(&config([4, 1, 1, 1, 4, 4], TopologyStrategy::FatTree))
            .expect("topology");

    // hosts target round((i+1) * 15 / 5): 3, 6, 9, 12
    assert_eq!(topology.rank_of(NodeKind::Host, 0).expect("rank").0, 3);
    assert_eq!(topology.rank_of(NodeKind::Host, 1).expect("rank").0, 6);
    assert_eq!(topology.rank_of(NodeKind::Host, 2).expect("rank").0, 9);
    assert_eq!(topology.rank_of(NodeKind::Host, 3).expect("rank").0, 12);
}

#[test]
fn lookups_past_the_count_are_rejected() {
    let topology = NetworkTopology::new(&TopologyConfig::default()).expect("topology");
    match topology.rank_of(NodeKind::Ccs, 1) {
        Err(Error::OutOfRange { kind, index, count }) => {
            assert_eq!(kind, NodeKind::Ccs);
            assert_eq!(index, 1);
            assert_eq!(count, 1);
        }
        other => panic!("expected OutOfRange, got {other:?}"),
    }
}

#[test]
fn zero_counts_are_rejected() {
    let result = NetworkTopology::new(&config([1, 1, 0, 1, 1, 1], TopologyStrategy::GroupedByKind));
    assert!(matches!(result, Err(Error::ConfigInvalid(_))));
}

#[test]
fn strategy_names_parse_and_reject() {
    assert_eq!(
        "grouped-by-kind".parse::<TopologyStrategy>().expect("parse"),
        TopologyStrategy::GroupedByKind
    );
    assert_eq!(
        "fat-tree".parse::<TopologyStrategy>().expect("parse"),
        TopologyStrategy::FatTree
    );
    assert!("ring".parse::<TopologyStrategy>().is_err());
}

#[test]
fn name_map_labels_every_rank() {
    let topology =
        NetworkTopology::new(&config([2, 1, 1, 1, 1, 2], TopologyStrategy::GroupedByKind))
            .expect("topology");
    let names = topology.name_map();

    assert_eq!(names.len(), topology.total_ranks());
    assert_eq!(names[&0], "Host 0");
    assert_eq!(names[&1], "Host 1");
    assert_eq!(names[&2], "SLB 0");
    assert_eq!(names[&6], "BSS 0");
    assert_eq!(names[&7], "BSS 1");
}

#[test]
fn fat_tree_name_map_still_covers_every_rank() {
    let topology =
        NetworkTopology::new(&config([3, 2, 2, 2, 2, 3], TopologyStrategy::FatTree))
            .expect("topology");
    let names = topology.name_map();
    assert_eq!(names.len(), 14);
    assert!((0..14).all(|rank| names.contains_key(&rank)));
}
