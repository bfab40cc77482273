//! Simulator-log to Perfetto-trace transformer.
//!
//! Consumes the line-oriented log a LogGOPS-style simulator writes and
//! emits a Perfetto trace with send → transmit → recv flows stitched
//! across tracks.

mod builder;
mod perfetto;
mod sim_log;

pub use builder::{TraceBuilder, ViewKind, write_trace_file};
pub use perfetto::{
    DebugAnnotation, ProcessDescriptor, ThreadDescriptor, Trace, TracePacket, TrackDescriptor,
    TrackEvent, TrackEventType, instant, process_descriptor_packet, slice_begin, slice_end,
    thread_descriptor_packet,
};
pub use sim_log::{CpuEvent, CpuOp, SimLog, Transmission, parse_sim_log};
