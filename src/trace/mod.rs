//! Storage-I/O trace input.
//!
//! Reads uMass/SPC-style CSV traces: one record per line with at least
//! four leading fields `asu, lba, size, opcode`; trailing fields are
//! ignored.

mod reader;
mod record;

pub use reader::{TraceStats, for_each_record, scan};
pub use record::TraceRecord;
