use crate::net::{IdAllocator, NextStrategy, StrategySet};

fn allocator(seed: u64) -> IdAllocator {
    IdAllocator::new(StrategySet::default(), seed)
}

#[test]
fn labels_share_one_monotone_counter() {
    let mut alloc = allocator(0);
    assert_eq!(alloc.next_label('s').as_str(), "s0");
    assert_eq!(alloc.next_label('r').as_str(), "r1");
    assert_eq!(alloc.next_label('c').as_str(), "c2");
    assert_eq!(alloc.next_label('s').as_str(), "s3");
}

#[test]
fn tags_count_up_from_zero() {
    let mut alloc = allocator(0);
    assert_eq!(alloc.next_tag().0, 0);
    assert_eq!(alloc.next_tag().0, 1);
    assert_eq!(alloc.next_tag().0, 2);
}

#[test]
fn round_robin_wraps_at_the_count() {
    let mut alloc = allocator(0);
    let picks: Vec<usize> = (0..5).map(|_| alloc.next_ccs(3)).collect();
    assert_eq!(picks, vec![0, 1, 2, 0, 1]);
}

#[test]
fn first_strategy_always_picks_zero() {
    let mut alloc = allocator(0);
    assert_eq!(alloc.next_slb(5), 0);
    assert_eq!(alloc.next_slb(5), 0);
    assert_eq!(alloc.next_slb(5), 0);
}

#[test]
fn random_strategy_stays_in_bounds() {
    let strategies = StrategySet {
        gs: NextStrategy::Random,
        ..StrategySet::default()
    };
    let mut alloc = IdAllocator::new(strategies, 7);
    for _ in 0..1000 {
        assert!(alloc.next_gs(3) < 3);
    }
}

#[test]
fn random_strategy_is_reproducible_per_seed() {
    let strategies = StrategySet {
        slb: NextStrategy::Random,
        ..StrategySet::default()
    };
    let draw = |seed| {
        let mut alloc = IdAllocator::new(strategies, seed);
        (0..32).map(|_| alloc.next_slb(17)).collect::<Vec<_>>()
    };
    assert_eq!(draw(123), draw(123));
}

#[test]
fn bss_counters_rotate_per_slice() {
    let mut alloc = allocator(0);
    assert_eq!(alloc.next_bss(0, 4), 0);
    assert_eq!(alloc.next_bss(0, 4), 1);
    // a different slice starts its own rotation
    assert_eq!(alloc.next_bss(1, 4), 0);
    assert_eq!(alloc.next_bss(0, 4), 2);
    assert_eq!(alloc.next_bss(1, 4), 1);
}

#[test]
fn next_strategy_names_parse_and_reject() {
    assert_eq!(
        "round-robin".parse::<NextStrategy>().expect("parse"),
        NextStrategy::RoundRobin
    );
    assert_eq!(
        "random".parse::<NextStrategy>().expect("parse"),
        NextStrategy::Random
    );
    assert_eq!(
        "first".parse::<NextStrategy>().expect("parse"),
        NextStrategy::First
    );
    assert!("last".parse::<NextStrategy>().is_err());
}
