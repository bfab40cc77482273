//! 网络拓扑
//!
//! 把逻辑节点 (kind, index) 映射到扁平的 rank 编号。

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use tracing::info;

use crate::error::{Error, Result};
use crate::goal::RankId;

/// 网络中的节点类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Host,
    Slb,
    Gs,
    Mds,
    Ccs,
    Bss,
}

impl NodeKind {
    /// 放置顺序：host 在最前
    pub const ALL: [NodeKind; 6] = [
        NodeKind::Host,
        NodeKind::Slb,
        NodeKind::Gs,
        NodeKind::Mds,
        NodeKind::Ccs,
        NodeKind::Bss,
    ];

    pub fn label(self) -> &'static str {
        match self {
            NodeKind::Host => "Host",
            NodeKind::Slb => "SLB",
            NodeKind::Gs => "GS",
            NodeKind::Mds => "MDS",
            NodeKind::Ccs => "CCS",
            NodeKind::Bss => "BSS",
        }
    }

    fn index(self) -> usize {
        match self {
            NodeKind::Host => 0,
            NodeKind::Slb => 1,
            NodeKind::Gs => 2,
            NodeKind::Mds => 3,
            NodeKind::Ccs => 4,
            NodeKind::Bss => 5,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// rank 放置策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TopologyStrategy {
    /// 同类节点占据连续的 rank 区间
    #[default]
    GroupedByKind,
    /// 把所有节点尽量均匀地撒在整个 rank 空间上
    FatTree,
}

impl FromStr for TopologyStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "grouped-by-kind" => Ok(TopologyStrategy::GroupedByKind),
            "fat-tree" => Ok(TopologyStrategy::FatTree),
            other => Err(Error::ConfigInvalid(format!(
                "unknown topology strategy {other:?} (expected grouped-by-kind or fat-tree)"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TopologyConfig {
    pub host_count: usize,
    pub slb_count: usize,
    pub gs_count: usize,
    pub mds_count: usize,
    pub ccs_count: usize,
    pub bss_count: usize,
    pub strategy: TopologyStrategy,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            host_count: 1,
            slb_count: 1,
            gs_count: 1,
            mds_count: 1,
            ccs_count: 1,
            bss_count: 1,
            strategy: TopologyStrategy::GroupedByKind,
        }
    }
}

/// 不可变拓扑：每个 (kind, index) 对应唯一的 rank，
/// 放置是 `[0, total_ranks)` 上的全双射。
#[derive(Debug, Clone)]
pub struct NetworkTopology {
    counts: [usize; 6],
    strategy: TopologyStrategy,
    placement: [Vec<RankId>; 6],
}

impl NetworkTopology {
    pub fn new(cfg: &TopologyConfig) -> Result<Self> {
        let counts = [
            cfg.host_count,
            cfg.slb_count,
            cfg.gs_count,
            cfg.mds_count,
            cfg.ccs_count,
            cfg.bss_count,
        ];
        for (kind, &count) in NodeKind::ALL.iter().zip(counts.iter()) {
            if count < 1 {
                return Err(Error::ConfigInvalid(format!(
                    "{kind} count must be >= 1 (is {count})"
                )));
            }
        }

        let placement = match cfg.strategy {
            TopologyStrategy::GroupedByKind => Self::place_grouped(&counts),
            TopologyStrategy::FatTree => Self::place_fat_tree(&counts),
        };

        info!(
            hosts = counts[0],
            slbs = counts[1],
            gs = counts[2],
            mds = counts[3],
            ccs = counts[4],
            bss = counts[5],
            strategy = ?cfg.strategy,
            "创建网络拓扑"
        );

        Ok(Self {
            counts,
            strategy: cfg.strategy,
            placement,
        })
    }

    fn place_grouped(counts: &[usize; 6]) -> [Vec<RankId>; 6] {
        let mut placement: [Vec<RankId>; 6] = Default::default();
        let mut offset = 0;
        for (kind, &count) in counts.iter().enumerate() {
            placement[kind] = (0..count).map(|i| RankId(offset + i)).collect();
            offset += count;
        }
        placement
    }

    /// 目标位置为 `round((i+1) * total / (count+1))`；
    /// 位置冲突时向两侧就近寻找空槽，左侧优先，环回取模。
    fn place_fat_tree(counts: &[usize; 6]) -> [Vec<RankId>; 6] {
        let total: usize = counts.iter().sum();
        let mut used = vec![false; total];
        let mut placement: [Vec<RankId>; 6] = Default::default();

        for (kind, &count) in counts.iter().enumerate() {
            let fac = total as f64 / (count + 1) as f64;
            let mut ranks = Vec::with_capacity(count);
            for i in 0..count {
                let target = (((i + 1) as f64) * fac).round() as usize % total;
                let pos = if !used[target] {
                    target
                } else {
                    let mut left = (target + total - 1) % total;
                    let mut right = (target + 1) % total;
                    while used[left] && used[right] {
                        left = (left + total - 1) % total;
                        right = (right + 1) % total;
                    }
                    if !used[left] { left } else { right }
                };
                used[pos] = true;
                ranks.push(RankId(pos));
            }
            placement[kind] = ranks;
        }

        debug_assert!(used.iter().all(|&u| u), "placement must cover every rank");
        placement
    }

    /// `[0, count(kind))` 上的全函数；越界返回 `OutOfRange`。
    pub fn rank_of(&self, kind: NodeKind, index: usize) -> Result<RankId> {
        self.placement[kind.index()]
            .get(index)
            .copied()
            .ok_or(Error::OutOfRange {
                kind,
                index,
                count: self.counts[kind.index()],
            })
    }

    pub fn count(&self, kind: NodeKind) -> usize {
        self.counts[kind.index()]
    }

    pub fn total_ranks(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn strategy(&self) -> TopologyStrategy {
        self.strategy
    }

    /// rank 编号到可读名称（`Host 0`、`SLB 1`……）的映射。
    pub fn name_map(&self) -> BTreeMap<usize, String> {
        let mut map = BTreeMap::new();
        for (kind, ranks) in NodeKind::ALL.iter().zip(self.placement.iter()) {
            for (i, rank) in ranks.iter().enumerate() {
                map.insert(rank.0, format!("{} {}", kind.label(), i));
            }
        }
        map
    }

    /// 把名称映射写成 JSON side-car：`{"<rank_id>": "<name>", ...}`。
    pub fn write_name_map(&self, dest: &Path) -> Result<()> {
        let map: BTreeMap<String, String> = self
            .name_map()
            .into_iter()
            .map(|(rank, name)| (rank.to_string(), name))
            .collect();
        let mut writer = BufWriter::new(File::create(dest)?);
        serde_json::to_writer(&mut writer, &map)?;
        writer.flush()?;
        Ok(())
    }
}
