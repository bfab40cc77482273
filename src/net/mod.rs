//! DirectDrive 网络模型
//!
//! 此模块包含 goal 图构建的核心组件：拓扑、slice 映射、
//! 标识符分配器、交互展开器以及网络编排器。

mod alloc;
mod interaction;
mod network;
mod slice_map;
mod topology;

pub use alloc::{IdAllocator, NextStrategy, StrategySet};
pub use interaction::{Interaction, IoKind, RequestSizing, io_time};
pub use network::{DirectDriveNetwork, NetworkConfig};
pub use slice_map::{SliceId, SliceMap};
pub use topology::{NetworkTopology, NodeKind, TopologyConfig, TopologyStrategy};
