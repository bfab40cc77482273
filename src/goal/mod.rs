//! goal 文件模型
//!
//! 此模块包含 goal 文件的基本构件：rank、标签、tag 以及
//! 按 rank 追加事件的构建器。

mod id;
mod rank;

pub use id::{Label, RankId, Tag};
pub use rank::RankBuilder;
