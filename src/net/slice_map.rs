//! slice 映射
//!
//! 把逻辑磁盘切成固定大小的 slice，并记录每个 slice 的
//! 负责 CCS 以及每个 CCS 的 BSS 副本组。

use crate::error::{Error, Result};

pub type SliceId = usize;

#[derive(Debug, Clone)]
pub struct SliceMap {
    /// slice 的地址区间，左闭右开
    slices: Vec<(u64, u64)>,
    /// slice 编号到负责 CCS 的映射
    owners: Vec<usize>,
    /// CCS 编号到 BSS 副本组的映射
    replica_groups: Vec<Vec<usize>>,
}

impl SliceMap {
    pub fn new(disk_size: u64, slice_size: u64, ccs_count: usize, bss_count: usize) -> Result<Self> {
        if slice_size == 0 {
            return Err(Error::ConfigInvalid("slice size must be > 0".into()));
        }
        if disk_size == 0 {
            return Err(Error::ConfigInvalid("disk size must be > 0".into()));
        }

        let no_slices = disk_size.div_ceil(slice_size) as usize;
        let slices = (0..no_slices as u64)
            .map(|id| (slice_size * id, slice_size * (id + 1)))
            .collect();
        let owners = (0..no_slices).map(|id| id % ccs_count).collect();

        // BSS 按 CCS 切成 ccs_count 个连续块，每块 ceil(bss/ccs) 个
        let bss_factor = bss_count.div_ceil(ccs_count);
        let replica_groups: Vec<Vec<usize>> = (0..ccs_count)
            .map(|ccs_id| {
                (0..bss_factor)
                    .map(|i| ccs_id * bss_factor + i)
                    .filter(|&bss_id| bss_id < bss_count)
                    .collect()
            })
            .collect();
        if let Some(ccs_id) = replica_groups.iter().position(|group| group.is_empty()) {
            return Err(Error::ConfigInvalid(format!(
                "{bss_count} BSS across {ccs_count} CCS leaves CCS {ccs_id} without replicas"
            )));
        }

        Ok(Self {
            slices,
            owners,
            replica_groups,
        })
    }

    pub fn slice_count(&self) -> usize {
        self.slices.len()
    }

    /// slice 的负责 CCS
    pub fn owner(&self, slice: SliceId) -> usize {
        self.owners[slice]
    }

    /// `ccs` 对应的 BSS 副本组（非空）
    pub fn replicas_of_ccs(&self, ccs: usize) -> &[usize] {
        &self.replica_groups[ccs]
    }

    /// slice 数据所在的 BSS 副本组
    pub fn replicas(&self, slice: SliceId) -> &[usize] {
        self.replicas_of_ccs(self.owner(slice))
    }

    /// 把地址区间 `[start, start+length)` 解析为有序的
    /// `(slice, 区间内字节数)` 列表。slice 映射有序，扫描到第一个
    /// 起点不小于区间终点的 slice 即可提前结束。
    pub fn resolve(&self, start: u64, length: u64) -> Vec<(SliceId, u64)> {
        let mut resolved = Vec::new();
        if length == 0 {
            return resolved;
        }
        let end = start.saturating_add(length);

        for (sid, &(slice_start, slice_end)) in self.slices.iter().enumerate() {
            if slice_end <= start {
                continue;
            }
            if slice_start >= end {
                break;
            }
            let bytes = slice_end.min(end) - slice_start.max(start);
            resolved.push((sid, bytes));
        }
        resolved
    }
}
