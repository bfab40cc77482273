//! rank 程序构建器
//!
//! 每个 rank 一个只追加的事件日志；标签由共享分配器统一发放。
//! 事件既可以留在内存里，也可以逐行溢写到磁盘上的
//! `rank_<id>.state` 文件（该文件始终是最终 goal 输出的前缀）。

use std::fs::File;
use std::io::{self, BufReader, LineWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::net::IdAllocator;

use super::{Label, RankId, Tag};

enum RankStore {
    /// 全部行保留在内存中，序列化时一次写出
    Memory(Vec<String>),
    /// 每行立即写入磁盘文件并释放内存副本
    Spill {
        path: PathBuf,
        file: LineWriter<File>,
    },
}

pub struct RankBuilder {
    rank: RankId,
    store: RankStore,
}

impl RankBuilder {
    pub fn in_memory(rank: RankId) -> Self {
        RankBuilder {
            rank,
            store: RankStore::Memory(vec![format!("rank {} {{", rank)]),
        }
    }

    /// 在 `dir` 下创建 `rank_<id>.state` 溢写文件。
    pub fn with_spill(rank: RankId, dir: &Path) -> Result<Self> {
        let path = dir.join(format!("rank_{}.state", rank));
        let file = File::create(&path).map_err(|e| Error::spill(&path, e))?;
        let mut builder = RankBuilder {
            rank,
            store: RankStore::Spill {
                file: LineWriter::new(file),
                path,
            },
        };
        builder.push_line(&format!("rank {} {{", rank))?;
        Ok(builder)
    }

    pub fn rank(&self) -> RankId {
        self.rank
    }

    fn push_line(&mut self, line: &str) -> Result<()> {
        match &mut self.store {
            RankStore::Memory(lines) => lines.push(line.to_owned()),
            RankStore::Spill { file, path } => {
                file.write_all(line.as_bytes())
                    .and_then(|_| file.write_all(b"\n"))
                    .map_err(|e| Error::spill(path, e))?;
            }
        }
        Ok(())
    }

    /// 追加一条 send 事件，返回其新标签（前缀 `s`）。
    pub fn add_send(
        &mut self,
        alloc: &mut IdAllocator,
        size: u64,
        to: RankId,
        tag: Option<Tag>,
    ) -> Result<Label> {
        let label = alloc.next_label('s');
        let mut line = format!("{label}: send {size}b to {to}");
        if let Some(tag) = tag {
            line.push_str(&format!(" tag {tag}"));
        }
        self.push_line(&line)?;
        Ok(label)
    }

    /// 追加一条 recv 事件，返回其新标签（前缀 `r`）。
    pub fn add_recv(
        &mut self,
        alloc: &mut IdAllocator,
        size: u64,
        from: RankId,
        tag: Option<Tag>,
    ) -> Result<Label> {
        let label = alloc.next_label('r');
        let mut line = format!("{label}: recv {size}b from {from}");
        if let Some(tag) = tag {
            line.push_str(&format!(" tag {tag}"));
        }
        self.push_line(&line)?;
        Ok(label)
    }

    /// 追加一条 calc 事件，返回其新标签（前缀 `c`）。
    pub fn add_calc(&mut self, alloc: &mut IdAllocator, duration: u64) -> Result<Label> {
        let label = alloc.next_label('c');
        self.push_line(&format!("{label}: calc {duration}"))?;
        Ok(label)
    }

    /// 追加一行注释；内嵌换行同样以注释标记开头。
    pub fn add_comment(&mut self, text: &str) -> Result<()> {
        let text = text.replace('\n', "\n// ");
        self.push_line(&format!("// {text}"))
    }

    /// 追加 `a requires b` 依赖边。两个标签都必须已经在本 rank 上发出过。
    pub fn require(&mut self, a: &Label, b: &Label) -> Result<()> {
        self.push_line(&format!("{a} requires {b}"))
    }

    /// 把整个 rank 块写入 `sink`：头行、全部事件行、`}` 收尾。
    pub fn serialize<W: Write>(&mut self, sink: &mut W) -> Result<()> {
        match &mut self.store {
            RankStore::Memory(lines) => {
                for line in lines.iter() {
                    sink.write_all(line.as_bytes())?;
                    sink.write_all(b"\n")?;
                }
            }
            RankStore::Spill { file, path } => {
                file.flush().map_err(|e| Error::spill(path, e))?;
                let file = File::open(&*path).map_err(|e| Error::spill(path, e))?;
                io::copy(&mut BufReader::new(file), sink)?;
            }
        }
        sink.write_all(b"}\n")?;
        Ok(())
    }
}
