//! Parser for the simulator's output log.
//!
//! First line: `num_ranks N`. Every following line starts with one of
//! `osend`, `orecv`, `loclop`, `noise` (rank cpu start end) or
//! `transmission` (src dst start end size).

use std::io::BufRead;
use std::str::FromStr;

use crate::error::{Error, Result};

/// CPU-local operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuOp {
    Send,
    Recv,
    Calc,
    Noise,
}

impl CpuOp {
    /// Slice name shown in the timeline.
    pub fn slice_name(self) -> &'static str {
        match self {
            CpuOp::Send => "Send",
            CpuOp::Recv => "Recv",
            CpuOp::Calc => "Calc",
            CpuOp::Noise => "Noise",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuEvent {
    pub op: CpuOp,
    pub rank: usize,
    pub cpu: u64,
    pub start: u64,
    pub end: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transmission {
    pub src: usize,
    pub dst: usize,
    pub start: u64,
    pub end: u64,
    pub size: u64,
}

#[derive(Debug, Clone, Default)]
pub struct SimLog {
    pub num_ranks: usize,
    pub cpu_events: Vec<CpuEvent>,
    pub transmissions: Vec<Transmission>,
}

pub fn parse_sim_log<R: BufRead>(reader: R) -> Result<SimLog> {
    let mut log = SimLog::default();
    let mut seen_header = false;
    let mut line_no: u64 = 0;

    for line in reader.lines() {
        line_no += 1;
        let line = line?;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }

        if !seen_header {
            if tokens.len() != 2 || tokens[0] != "num_ranks" {
                return Err(malformed(line_no, "expected 'num_ranks <N>' header"));
            }
            log.num_ranks = parse_token(line_no, tokens[1], "num_ranks")?;
            seen_header = true;
            continue;
        }

        match tokens[0] {
            op @ ("osend" | "orecv" | "loclop" | "noise") => {
                if tokens.len() < 5 {
                    return Err(malformed(line_no, "expected '<op> rank cpu start end'"));
                }
                let rank: usize = parse_token(line_no, tokens[1], "rank")?;
                if rank >= log.num_ranks {
                    return Err(malformed(
                        line_no,
                        &format!("rank {rank} out of range (num_ranks {})", log.num_ranks),
                    ));
                }
                log.cpu_events.push(CpuEvent {
                    op: match op {
                        "osend" => CpuOp::Send,
                        "orecv" => CpuOp::Recv,
                        "loclop" => CpuOp::Calc,
                        _ => CpuOp::Noise,
                    },
                    rank,
                    cpu: parse_token(line_no, tokens[2], "cpu")?,
                    start: parse_token(line_no, tokens[3], "start")?,
                    end: parse_token(line_no, tokens[4], "end")?,
                });
            }
            "transmission" => {
                if tokens.len() < 6 {
                    return Err(malformed(
                        line_no,
                        "expected 'transmission src dst start end size'",
                    ));
                }
                let src: usize = parse_token(line_no, tokens[1], "src")?;
                let dst: usize = parse_token(line_no, tokens[2], "dst")?;
                if src >= log.num_ranks || dst >= log.num_ranks {
                    return Err(malformed(line_no, "transmission rank out of range"));
                }
                if src == dst {
                    return Err(malformed(line_no, "transmission from a rank to itself"));
                }
                log.transmissions.push(Transmission {
                    src,
                    dst,
                    start: parse_token(line_no, tokens[3], "start")?,
                    end: parse_token(line_no, tokens[4], "end")?,
                    size: parse_token(line_no, tokens[5], "size")?,
                });
            }
            other => {
                return Err(malformed(line_no, &format!("unknown operation {other:?}")));
            }
        }
    }

    if !seen_header {
        return Err(malformed(line_no, "empty log, missing 'num_ranks' header"));
    }
    Ok(log)
}

fn malformed(line: u64, reason: &str) -> Error {
    Error::SimLogMalformed {
        line,
        reason: reason.to_owned(),
    }
}

fn parse_token<T: FromStr>(line: u64, raw: &str, name: &str) -> Result<T> {
    raw.parse().map_err(|_| {
        Error::SimLogMalformed {
            line,
            reason: format!("field {name} is not an integer: {raw:?}"),
        }
    })
}
