//! Timeline assembly and flow stitching.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use prost::Message;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::perfetto::{
    Trace, process_descriptor_packet, slice_begin, slice_end, thread_descriptor_packet,
};
use super::sim_log::{CpuOp, SimLog, Transmission};

/// How much detail the generated timeline carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    /// One thread per rank
    Simple,
    /// CPU and NUC threads per rank
    Advanced,
    /// CPU thread per rank plus one channel thread per rank pair
    Expert,
}

/// JSON side-car mapping rank ids to descriptive names.
#[derive(Debug, Deserialize)]
#[serde(transparent)]
struct RankNameMap(HashMap<String, String>);

struct PendingEvent {
    name: &'static str,
    op: Option<CpuOp>,
    start: u64,
    end: u64,
    flow_ids: Vec<u64>,
    debug: Vec<(String, String)>,
}

struct Track {
    uuid: u64,
    tid: i32,
    name: String,
    events: Vec<PendingEvent>,
}

pub struct TraceBuilder {
    view: ViewKind,
    process_name: String,
    rank_names: HashMap<usize, String>,
    process_uuid: u64,
    next_uuid: u64,
    /// tid 0 is the kernel swapper, start above it
    next_tid: i32,
    next_flow: u64,
    cpu: Vec<Track>,
    nuc: Vec<Track>,
    channels: BTreeMap<(usize, usize), Track>,
}

impl TraceBuilder {
    pub fn new(view: ViewKind) -> Self {
        Self {
            view,
            process_name: "Network_Visualization".to_owned(),
            rank_names: HashMap::new(),
            process_uuid: 1,
            next_uuid: 2,
            next_tid: 1,
            next_flow: 1,
            cpu: Vec::new(),
            nuc: Vec::new(),
            channels: BTreeMap::new(),
        }
    }

    /// Loads the optional rank-name JSON map.
    pub fn load_rank_names(&mut self, path: &Path) -> Result<()> {
        let raw = fs::read_to_string(path)?;
        let RankNameMap(map) = serde_json::from_str(&raw)?;
        for (key, name) in map {
            let rank: usize = key.parse().map_err(|_| {
                Error::ConfigInvalid(format!("rank-name map key is not a rank id: {key:?}"))
            })?;
            self.rank_names.insert(rank, name);
        }
        Ok(())
    }

    fn rank_label(&self, rank: usize) -> String {
        match self.rank_names.get(&rank) {
            Some(name) => format!("Rank {rank}: {name}"),
            None => format!("Rank {rank}"),
        }
    }

    fn fresh_track(&mut self, name: String) -> Track {
        let track = Track {
            uuid: self.next_uuid,
            tid: self.next_tid,
            name,
            events: Vec::new(),
        };
        self.next_uuid += 1;
        self.next_tid += 1;
        track
    }

    fn create_tracks(&mut self, num_ranks: usize) {
        match self.view {
            ViewKind::Simple => {
                for rank in 0..num_ranks {
                    let label = self.rank_label(rank);
                    let track = self.fresh_track(label);
                    self.cpu.push(track);
                }
            }
            ViewKind::Advanced => {
                for rank in 0..num_ranks {
                    let label = self.rank_label(rank);
                    let cpu = self.fresh_track(format!("{label} (CPU)"));
                    let nuc = self.fresh_track(format!("{label} (NUC)"));
                    self.cpu.push(cpu);
                    self.nuc.push(nuc);
                }
            }
            ViewKind::Expert => {
                for rank in 0..num_ranks {
                    let label = self.rank_label(rank);
                    let cpu = self.fresh_track(format!("{label} (CPU)"));
                    self.cpu.push(cpu);
                    for other in rank + 1..num_ranks {
                        let name =
                            format!("{} <-> {} (NUC)", self.rank_label(rank), self.rank_label(other));
                        let track = self.fresh_track(name);
                        self.channels.insert((rank, other), track);
                    }
                }
            }
        }
    }

    /// Builds the Perfetto trace: CPU slices first, then every queued
    /// transmission is emitted and stitched to its send and recv.
    pub fn build(&mut self, log: &SimLog) -> Trace {
        info!(
            ranks = log.num_ranks,
            cpu_events = log.cpu_events.len(),
            transmissions = log.transmissions.len(),
            view = ?self.view,
            "building timeline"
        );
        self.create_tracks(log.num_ranks);

        for event in &log.cpu_events {
            self.cpu[event.rank].events.push(PendingEvent {
                name: event.op.slice_name(),
                op: Some(event.op),
                start: event.start,
                end: event.end,
                flow_ids: Vec::new(),
                debug: vec![
                    ("rank".to_owned(), event.rank.to_string()),
                    ("cpu".to_owned(), event.cpu.to_string()),
                ],
            });
        }

        for transmission in &log.transmissions {
            self.stitch(transmission);
        }

        self.emit()
    }

    fn stitch(&mut self, t: &Transmission) {
        let flow = self.next_flow;
        self.next_flow += 1;
        debug!(src = t.src, dst = t.dst, flow, "stitching transmission");

        let transmit = PendingEvent {
            name: "Transmit",
            op: None,
            start: t.start,
            end: t.end,
            flow_ids: vec![flow],
            debug: vec![
                ("size".to_owned(), t.size.to_string()),
                ("estart".to_owned(), t.start.to_string()),
                ("eend".to_owned(), t.end.to_string()),
            ],
        };
        match self.view {
            ViewKind::Simple => {}
            ViewKind::Advanced => self.nuc[t.src].events.push(transmit),
            ViewKind::Expert => {
                let key = (t.src.min(t.dst), t.src.max(t.dst));
                if let Some(channel) = self.channels.get_mut(&key) {
                    channel.events.push(transmit);
                }
            }
        }

        // Latest unflowed send that starts at or before the transmission
        if let Some(send) = self.cpu[t.src]
            .events
            .iter_mut()
            .filter(|e| e.op == Some(CpuOp::Send) && e.start <= t.start && e.flow_ids.is_empty())
            .max_by_key(|e| e.start)
        {
            send.flow_ids.push(flow);
        }

        // Earliest unflowed recv that ends at or after the transmission
        if let Some(recv) = self.cpu[t.dst]
            .events
            .iter_mut()
            .filter(|e| e.op == Some(CpuOp::Recv) && e.end >= t.end && e.flow_ids.is_empty())
            .min_by_key(|e| e.end)
        {
            recv.flow_ids.push(flow);
        }
    }

    fn emit(&self) -> Trace {
        let mut packets = Vec::new();
        packets.push(process_descriptor_packet(
            self.process_uuid,
            0,
            &self.process_name,
        ));

        let channel_tracks = self.channels.values();
        for track in self.cpu.iter().chain(self.nuc.iter()).chain(channel_tracks) {
            packets.push(thread_descriptor_packet(
                track.uuid,
                self.process_uuid,
                0,
                track.tid,
                &track.name,
            ));
            for event in &track.events {
                packets.push(slice_begin(
                    track.uuid,
                    event.start,
                    event.name,
                    &event.flow_ids,
                    &event.debug,
                ));
                packets.push(slice_end(track.uuid, event.end));
            }
        }

        Trace { packet: packets }
    }
}

/// Encodes the trace and writes it; a failed write is removed.
pub fn write_trace_file(trace: &Trace, dest: &Path) -> Result<()> {
    info!(dest = %dest.display(), packets = trace.packet.len(), "writing perfetto trace");
    let bytes = trace.encode_to_vec();
    if let Err(err) = fs::write(dest, bytes) {
        let _ = fs::remove_file(dest);
        return Err(Error::spill(dest, err));
    }
    Ok(())
}
