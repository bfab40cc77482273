//! 标识符与策略分配器
//!
//! 标签和 tag 计数器全局单调；下一节点的选择由每类服务的
//! 策略决定。固定种子下整个 goal 图逐字节可复现。

use std::collections::HashMap;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Error, Result};
use crate::goal::{Label, Tag};

use super::slice_map::SliceId;

/// 下一节点选择策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStrategy {
    /// 计数器对节点数取模
    RoundRobin,
    /// `[0, count)` 上均匀随机
    Random,
    /// 永远选 0 号
    First,
}

impl FromStr for NextStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "round-robin" => Ok(NextStrategy::RoundRobin),
            "random" => Ok(NextStrategy::Random),
            "first" => Ok(NextStrategy::First),
            other => Err(Error::ConfigInvalid(format!(
                "unknown next-node strategy {other:?} (expected round-robin, random or first)"
            ))),
        }
    }
}

/// 每类服务各自的选择策略
#[derive(Debug, Clone, Copy)]
pub struct StrategySet {
    pub slb: NextStrategy,
    pub gs: NextStrategy,
    pub mds: NextStrategy,
    pub ccs: NextStrategy,
    pub bss: NextStrategy,
}

impl Default for StrategySet {
    fn default() -> Self {
        Self {
            slb: NextStrategy::First,
            gs: NextStrategy::First,
            mds: NextStrategy::First,
            ccs: NextStrategy::RoundRobin,
            bss: NextStrategy::RoundRobin,
        }
    }
}

/// 全部 rank 构建器共享的分配器
pub struct IdAllocator {
    strategies: StrategySet,
    next_label: u64,
    next_tag: u64,
    slb_counter: u64,
    gs_counter: u64,
    mds_counter: u64,
    ccs_counter: u64,
    /// BSS 按 slice 单独计数，各 slice 的副本轮转互不干扰
    bss_counters: HashMap<SliceId, u64>,
    rng: StdRng,
}

impl IdAllocator {
    pub fn new(strategies: StrategySet, seed: u64) -> Self {
        Self {
            strategies,
            next_label: 0,
            next_tag: 0,
            slb_counter: 0,
            gs_counter: 0,
            mds_counter: 0,
            ccs_counter: 0,
            bss_counters: HashMap::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// 下一个标签：前缀加全局单调序号。
    pub fn next_label(&mut self, prefix: char) -> Label {
        let n = self.next_label;
        self.next_label += 1;
        Label::new(format!("{prefix}{n}"))
    }

    /// 下一个 tag，全局单调。
    pub fn next_tag(&mut self) -> Tag {
        let t = self.next_tag;
        self.next_tag += 1;
        Tag(t)
    }

    fn pick(strategy: NextStrategy, counter: &mut u64, rng: &mut StdRng, count: usize) -> usize {
        match strategy {
            NextStrategy::RoundRobin => {
                let next = *counter;
                *counter = (next + 1) % count as u64;
                next as usize
            }
            NextStrategy::Random => rng.gen_range(0..count),
            NextStrategy::First => 0,
        }
    }

    pub fn next_slb(&mut self, count: usize) -> usize {
        Self::pick(self.strategies.slb, &mut self.slb_counter, &mut self.rng, count)
    }

    pub fn next_gs(&mut self, count: usize) -> usize {
        Self::pick(self.strategies.gs, &mut self.gs_counter, &mut self.rng, count)
    }

    pub fn next_mds(&mut self, count: usize) -> usize {
        Self::pick(self.strategies.mds, &mut self.mds_counter, &mut self.rng, count)
    }

    pub fn next_ccs(&mut self, count: usize) -> usize {
        Self::pick(self.strategies.ccs, &mut self.ccs_counter, &mut self.rng, count)
    }

    pub fn next_bss(&mut self, slice: SliceId, count: usize) -> usize {
        let counter = self.bss_counters.entry(slice).or_insert(0);
        Self::pick(self.strategies.bss, counter, &mut self.rng, count)
    }
}
