//! DirectDrive 网络编排器
//!
//! 按到达顺序消费输入记录，为每条记录调用交互展开器；
//! 维护每个 host 的因果尾依赖；最终把所有 rank 程序
//! 流式拼接成 goal 文件。

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::goal::{Label, RankBuilder, RankId};

use super::alloc::{IdAllocator, StrategySet};
use super::interaction::{self, Interaction, IoKind, RequestSizing};
use super::slice_map::SliceMap;
use super::topology::{NetworkTopology, NodeKind};

#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// 逻辑磁盘大小（字节）
    pub disk_size: u64,
    /// slice 大小（字节）
    pub slice_size: u64,
    pub strategies: StrategySet,
    pub sizing: RequestSizing,
    /// 同一 host 的后续操作是否依赖上一操作的终止
    pub op_depens: bool,
    /// 首次见到某 host 时是否先展开一次 mount
    pub mount_on_first_use: bool,
    /// 设置后各 rank 的事件逐行溢写到该目录下
    pub spill_dir: Option<PathBuf>,
    pub seed: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            disk_size: 1024 * 1024 * 1024,
            slice_size: 1024 * 1024,
            strategies: StrategySet::default(),
            sizing: RequestSizing::default(),
            op_depens: true,
            mount_on_first_use: true,
            spill_dir: None,
            seed: 42,
        }
    }
}

pub struct DirectDriveNetwork {
    topology: NetworkTopology,
    slice_map: SliceMap,
    sizing: RequestSizing,
    op_depens: bool,
    mount_on_first_use: bool,
    alloc: IdAllocator,
    builders: Vec<RankBuilder>,
    /// host 编号到其最近一次操作终止标签集合的映射
    host_tails: HashMap<usize, Vec<Label>>,
}

impl DirectDriveNetwork {
    pub fn new(topology: NetworkTopology, cfg: &NetworkConfig) -> Result<Self> {
        info!(
            disk_size = cfg.disk_size,
            slice_size = cfg.slice_size,
            "创建 DirectDrive 网络"
        );
        let slice_map = SliceMap::new(
            cfg.disk_size,
            cfg.slice_size,
            topology.count(NodeKind::Ccs),
            topology.count(NodeKind::Bss),
        )?;
        debug!(slices = slice_map.slice_count(), "slice 映射就绪");

        if let Some(dir) = &cfg.spill_dir {
            info!(dir = %dir.display(), "创建溢写目录");
            fs::create_dir_all(dir)?;
        }

        let builders = (0..topology.total_ranks())
            .map(|rank| match &cfg.spill_dir {
                Some(dir) => RankBuilder::with_spill(RankId(rank), dir),
                None => Ok(RankBuilder::in_memory(RankId(rank))),
            })
            .collect::<Result<Vec<_>>>()?;

        let mut network = Self {
            topology,
            slice_map,
            sizing: cfg.sizing,
            op_depens: cfg.op_depens,
            mount_on_first_use: cfg.mount_on_first_use,
            alloc: IdAllocator::new(cfg.strategies, cfg.seed),
            builders,
            host_tails: HashMap::new(),
        };

        // 每个 rank 开头注入一条角色注释，方便人读
        for kind in NodeKind::ALL {
            for i in 0..network.topology.count(kind) {
                let rank = network.topology.rank_of(kind, i)?;
                network.builders[rank.0].add_comment(&format!("{} #{}", kind.label(), i))?;
            }
        }

        debug!("DirectDrive 网络初始化完成");
        Ok(network)
    }

    fn expand(&mut self, interaction: Interaction, deps: &[Label]) -> Result<Vec<Label>> {
        interaction::expand(
            &self.topology,
            &self.slice_map,
            self.sizing,
            &mut self.alloc,
            &mut self.builders,
            interaction,
            deps,
        )
    }

    /// 按配置处理一条 host 操作：首次见到该 host 时（若开启）先
    /// mount；随后展开读/写，并把该 host 的尾依赖推进到新操作的
    /// 终止标签集合。
    #[tracing::instrument(skip(self))]
    pub fn add_interaction(&mut self, kind: IoKind, host: usize, addr: u64, len: u64) -> Result<()> {
        if self.mount_on_first_use && !self.host_tails.contains_key(&host) {
            let tail = self.expand(Interaction::Mount { host }, &[])?;
            self.host_tails.insert(host, tail);
        }

        let deps = if self.op_depens {
            self.host_tails.get(&host).cloned().unwrap_or_default()
        } else {
            Vec::new()
        };
        let tail = self.expand(
            Interaction::Io {
                kind,
                host,
                addr,
                len,
            },
            &deps,
        )?;
        self.host_tails.insert(host, tail);
        Ok(())
    }

    /// 为 `host` 展开一次 mount，并以其终止标签作为该 host 的尾依赖。
    pub fn add_mount(&mut self, host: usize) -> Result<Vec<Label>> {
        let tail = self.expand(Interaction::Mount { host }, &[])?;
        self.host_tails.insert(host, tail.clone());
        Ok(tail)
    }

    pub fn add_read(
        &mut self,
        host: usize,
        addr: u64,
        len: u64,
        deps: &[Label],
    ) -> Result<Vec<Label>> {
        self.expand(
            Interaction::Io {
                kind: IoKind::Read,
                host,
                addr,
                len,
            },
            deps,
        )
    }

    pub fn add_write(
        &mut self,
        host: usize,
        addr: u64,
        len: u64,
        deps: &[Label],
    ) -> Result<Vec<Label>> {
        self.expand(
            Interaction::Io {
                kind: IoKind::Write,
                host,
                addr,
                len,
            },
            deps,
        )
    }

    pub fn topology(&self) -> &NetworkTopology {
        &self.topology
    }

    pub fn slice_map(&self) -> &SliceMap {
        &self.slice_map
    }

    /// 写出整个 goal 程序：`num_ranks` 头，然后按 rank 编号升序
    /// 逐个序列化，每个 rank 块之后空一行。
    #[tracing::instrument(skip(self, sink))]
    pub fn to_goal<W: Write>(&mut self, sink: &mut W) -> Result<()> {
        info!(ranks = self.builders.len(), "▶️  开始写出 goal 程序");
        write!(sink, "num_ranks {}\n\n", self.topology.total_ranks())?;
        for builder in &mut self.builders {
            builder.serialize(sink)?;
            sink.write_all(b"\n")?;
        }
        info!("✅ goal 程序写出完成");
        Ok(())
    }

    /// 写 goal 文件；任何失败都会移除半成品输出。
    pub fn write_goal_file(&mut self, dest: &Path) -> Result<()> {
        info!(dest = %dest.display(), "创建 goal 文件");
        if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = File::create(dest).map_err(|e| Error::spill(dest, e))?;
        let mut sink = BufWriter::new(file);
        let result = self
            .to_goal(&mut sink)
            .and_then(|_| sink.flush().map_err(Error::from));
        drop(sink);

        match result {
            Ok(()) => Ok(()),
            Err(err) => {
                let _ = fs::remove_file(dest);
                Err(match err {
                    Error::Io(source) => Error::spill(dest, source),
                    other => other,
                })
            }
        }
    }
}
