use std::str::FromStr;

use crate::error::{Error, Result};
use crate::net::IoKind;

/// One parsed trace record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceRecord {
    /// Host id, 0-based
    pub asu: usize,
    /// Logical byte address
    pub lba: u64,
    /// Byte length
    pub size: u64,
    pub opcode: IoKind,
}

impl TraceRecord {
    pub fn parse(line: u64, record: &csv::StringRecord) -> Result<Self> {
        if record.len() < 4 {
            return Err(Error::TraceMalformed {
                line,
                reason: format!("expected at least 4 fields, got {}", record.len()),
            });
        }

        let asu = parse_field(line, record, 0, "asu")?;
        let lba = parse_field(line, record, 1, "lba")?;
        let size = parse_field(line, record, 2, "size")?;
        let opcode = match record.get(3).map(str::trim) {
            Some(op) if op.eq_ignore_ascii_case("r") => IoKind::Read,
            Some(op) if op.eq_ignore_ascii_case("w") => IoKind::Write,
            other => {
                return Err(Error::UnknownOpcode {
                    line,
                    opcode: other.unwrap_or_default().to_owned(),
                });
            }
        };

        Ok(Self {
            asu,
            lba,
            size,
            opcode,
        })
    }
}

fn parse_field<T: FromStr>(
    line: u64,
    record: &csv::StringRecord,
    index: usize,
    name: &str,
) -> Result<T> {
    let raw = record.get(index).unwrap_or_default().trim();
    raw.parse().map_err(|_| Error::TraceMalformed {
        line,
        reason: format!("field {name} is not an integer: {raw:?}"),
    })
}
