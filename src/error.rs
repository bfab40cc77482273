//! 错误类型
//!
//! 定义整个 crate 共用的错误枚举；所有错误都会中止当前运行。

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::net::NodeKind;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// 节点数量、策略名等配置不合法
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// 拓扑查询越界
    #[error("no {kind} with index {index} (only {count} configured)")]
    OutOfRange {
        kind: NodeKind,
        index: usize,
        count: usize,
    },

    /// trace 记录字段缺失或不是整数
    #[error("malformed trace record on line {line}: {reason}")]
    TraceMalformed { line: u64, reason: String },

    /// trace 记录携带未知操作码
    #[error("unknown opcode {opcode:?} on line {line} (expected 'r' or 'w')")]
    UnknownOpcode { line: u64, opcode: String },

    /// 每 rank 溢写文件或最终 goal 输出上的 I/O 失败
    #[error("spill i/o on {}: {source}", path.display())]
    SpillIo { path: PathBuf, source: io::Error },

    /// 仿真器日志格式不合法
    #[error("malformed simulator log on line {line}: {reason}")]
    SimLogMalformed { line: u64, reason: String },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn spill(path: &Path, source: io::Error) -> Self {
        Error::SpillIo {
            path: path.to_path_buf(),
            source,
        }
    }
}
