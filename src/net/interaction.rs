//! Protocol expansion of host interactions.
//!
//! Each expansion turns one high-level host operation (mount / read /
//! write) into the exact set of send/recv/calc events and intra-rank
//! `requires` edges across every participating rank, and returns the
//! labels on the host rank that represent the operation's terminal
//! acknowledgement.

use tracing::trace;

use crate::error::Result;
use crate::goal::{Label, RankBuilder, RankId};

use super::alloc::IdAllocator;
use super::slice_map::SliceMap;
use super::topology::{NetworkTopology, NodeKind};

/// Request/response sizes in bytes.
#[derive(Debug, Clone, Copy)]
pub struct RequestSizing {
    pub lookup_req: u64,
    pub lookup_resp: u64,
    pub mount_req: u64,
    pub mount_resp: u64,
}

impl Default for RequestSizing {
    fn default() -> Self {
        Self {
            lookup_req: 256 * 4,
            lookup_resp: 1024 * 4,
            mount_req: 1024 * 4,
            mount_resp: 1024 * 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoKind {
    Read,
    Write,
}

/// One high-level host operation.
#[derive(Debug, Clone, Copy)]
pub enum Interaction {
    Mount {
        host: usize,
    },
    Io {
        kind: IoKind,
        host: usize,
        addr: u64,
        len: u64,
    },
}

/// Calc duration in ns for touching `bytes` of storage.
///
/// Sequential-SSD estimate: reads 6000 MB/s (1/6 ns per byte), writes
/// 1500 MB/s (2/3 ns per byte).
pub fn io_time(bytes: u64, kind: IoKind) -> u64 {
    match kind {
        IoKind::Read => bytes.div_ceil(6),
        IoKind::Write => (2 * bytes).div_ceil(3),
    }
}

pub(crate) fn expand(
    topo: &NetworkTopology,
    slices: &SliceMap,
    sizing: RequestSizing,
    alloc: &mut IdAllocator,
    builders: &mut [RankBuilder],
    interaction: Interaction,
    deps: &[Label],
) -> Result<Vec<Label>> {
    match interaction {
        Interaction::Mount { host } => expand_mount(topo, sizing, alloc, builders, host),
        Interaction::Io {
            kind: IoKind::Read,
            host,
            addr,
            len,
        } => expand_read(topo, slices, sizing, alloc, builders, host, addr, len, deps),
        Interaction::Io {
            kind: IoKind::Write,
            host,
            addr,
            len,
        } => expand_write(topo, slices, sizing, alloc, builders, host, addr, len, deps),
    }
}

fn expand_mount(
    topo: &NetworkTopology,
    sizing: RequestSizing,
    alloc: &mut IdAllocator,
    builders: &mut [RankBuilder],
    host: usize,
) -> Result<Vec<Label>> {
    let host_rank = topo.rank_of(NodeKind::Host, host)?;
    let slb_rank = topo.rank_of(NodeKind::Slb, alloc.next_slb(topo.count(NodeKind::Slb)))?;
    let gs_rank = topo.rank_of(NodeKind::Gs, alloc.next_gs(topo.count(NodeKind::Gs)))?;
    let mds_rank = topo.rank_of(NodeKind::Mds, alloc.next_mds(topo.count(NodeKind::Mds)))?;
    trace!(host, ?slb_rank, ?gs_rank, ?mds_rank, "expanding mount");

    // Request the map of slices: Host -> SLB -> GS -> MDS
    let req_tag = Some(alloc.next_tag());
    let host_req = builders[host_rank.0].add_send(alloc, sizing.mount_req, slb_rank, req_tag)?;
    let slb_req_in = builders[slb_rank.0].add_recv(alloc, sizing.mount_req, host_rank, req_tag)?;
    let slb_req_out = builders[slb_rank.0].add_send(alloc, sizing.mount_req, gs_rank, req_tag)?;
    let gs_req_in = builders[gs_rank.0].add_recv(alloc, sizing.mount_req, slb_rank, req_tag)?;
    let gs_req_out = builders[gs_rank.0].add_send(alloc, sizing.mount_req, mds_rank, req_tag)?;
    let mds_req = builders[mds_rank.0].add_recv(alloc, sizing.mount_req, gs_rank, req_tag)?;

    // Look the slice map up on the MDS
    let mds_load = builders[mds_rank.0].add_calc(alloc, io_time(sizing.mount_resp, IoKind::Read))?;

    // Reply with the map of slices: MDS -> GS -> SLB -> Host
    let resp_tag = Some(alloc.next_tag());
    let mds_resp = builders[mds_rank.0].add_send(alloc, sizing.mount_resp, gs_rank, resp_tag)?;
    let gs_resp_in = builders[gs_rank.0].add_recv(alloc, sizing.mount_resp, mds_rank, resp_tag)?;
    let gs_resp_out = builders[gs_rank.0].add_send(alloc, sizing.mount_resp, slb_rank, resp_tag)?;
    let slb_resp_in = builders[slb_rank.0].add_recv(alloc, sizing.mount_resp, gs_rank, resp_tag)?;
    let slb_resp_out = builders[slb_rank.0].add_send(alloc, sizing.mount_resp, host_rank, resp_tag)?;
    let host_resp = builders[host_rank.0].add_recv(alloc, sizing.mount_resp, slb_rank, resp_tag)?;

    builders[host_rank.0].require(&host_resp, &host_req)?;
    builders[gs_rank.0].require(&gs_req_out, &gs_req_in)?;
    builders[gs_rank.0].require(&gs_resp_out, &gs_resp_in)?;
    builders[slb_rank.0].require(&slb_req_out, &slb_req_in)?;
    builders[slb_rank.0].require(&slb_resp_out, &slb_resp_in)?;
    builders[mds_rank.0].require(&mds_load, &mds_req)?;
    builders[mds_rank.0].require(&mds_resp, &mds_load)?;

    Ok(vec![host_resp])
}

#[allow(clippy::too_many_arguments)]
fn expand_read(
    topo: &NetworkTopology,
    slices: &SliceMap,
    sizing: RequestSizing,
    alloc: &mut IdAllocator,
    builders: &mut [RankBuilder],
    host: usize,
    addr: u64,
    len: u64,
    deps: &[Label],
) -> Result<Vec<Label>> {
    let resolved = slices.resolve(addr, len);
    let host_rank = topo.rank_of(NodeKind::Host, host)?;
    trace!(host, addr, len, slices = resolved.len(), "expanding read");

    let mut tails = Vec::with_capacity(resolved.len());
    for (slice_id, bytes) in resolved {
        let ccs_rank = topo.rank_of(NodeKind::Ccs, slices.owner(slice_id))?;

        // Request the slice's sequence number from its owning CCS
        let sqn_tag = Some(alloc.next_tag());
        let host_req_sqn =
            builders[host_rank.0].add_send(alloc, sizing.lookup_req, ccs_rank, sqn_tag)?;
        let ccs_req_sqn =
            builders[ccs_rank.0].add_recv(alloc, sizing.lookup_req, host_rank, sqn_tag)?;
        builders[ccs_rank.0].add_calc(alloc, io_time(sizing.lookup_resp, IoKind::Read))?;
        let ccs_resp_sqn =
            builders[ccs_rank.0].add_send(alloc, sizing.lookup_resp, host_rank, sqn_tag)?;
        let host_resp_sqn =
            builders[host_rank.0].add_recv(alloc, sizing.lookup_resp, ccs_rank, sqn_tag)?;
        builders[host_rank.0].require(&host_resp_sqn, &host_req_sqn)?;
        builders[ccs_rank.0].require(&ccs_resp_sqn, &ccs_req_sqn)?;

        // Fetch the slice data from one replica, chosen per slice
        let replicas = slices.replicas(slice_id);
        let pick = alloc.next_bss(slice_id, topo.count(NodeKind::Bss)) % replicas.len();
        let bss_rank = topo.rank_of(NodeKind::Bss, replicas[pick])?;

        let data_tag = Some(alloc.next_tag());
        let host_req_data =
            builders[host_rank.0].add_send(alloc, sizing.lookup_req, bss_rank, data_tag)?;
        let bss_req_data =
            builders[bss_rank.0].add_recv(alloc, sizing.lookup_req, host_rank, data_tag)?;
        builders[bss_rank.0].add_calc(alloc, io_time(bytes, IoKind::Read))?;
        let bss_resp_data = builders[bss_rank.0].add_send(alloc, bytes, host_rank, data_tag)?;
        let host_resp_data = builders[host_rank.0].add_recv(alloc, bytes, bss_rank, data_tag)?;

        // The fetch is ordered after the sequence-number lookup
        builders[host_rank.0].require(&host_req_data, &host_resp_sqn)?;
        builders[bss_rank.0].require(&bss_resp_data, &bss_req_data)?;

        for dep in deps {
            builders[host_rank.0].require(&host_req_sqn, dep)?;
        }

        tails.push(host_resp_data);
    }

    Ok(tails)
}

#[allow(clippy::too_many_arguments)]
fn expand_write(
    topo: &NetworkTopology,
    slices: &SliceMap,
    sizing: RequestSizing,
    alloc: &mut IdAllocator,
    builders: &mut [RankBuilder],
    host: usize,
    addr: u64,
    len: u64,
    deps: &[Label],
) -> Result<Vec<Label>> {
    let resolved = slices.resolve(addr, len);
    let host_rank = topo.rank_of(NodeKind::Host, host)?;
    trace!(host, addr, len, slices = resolved.len(), "expanding write");

    let mut tails = Vec::with_capacity(resolved.len());
    for (slice_id, bytes) in resolved {
        let ccs_rank = topo.rank_of(NodeKind::Ccs, slices.owner(slice_id))?;

        // Send the slice data to the owning CCS
        let data_tag = Some(alloc.next_tag());
        let host_req = builders[host_rank.0].add_send(alloc, bytes, ccs_rank, data_tag)?;
        let ccs_req = builders[ccs_rank.0].add_recv(alloc, bytes, host_rank, data_tag)?;

        // Store on the CCS
        let ccs_store = builders[ccs_rank.0].add_calc(alloc, io_time(bytes, IoKind::Write))?;
        builders[ccs_rank.0].require(&ccs_store, &ccs_req)?;

        // Replicate to every BSS of the slice's replica set
        let mut promises = Vec::new();
        for &bss_id in slices.replicas(slice_id) {
            let bss_rank = topo.rank_of(NodeKind::Bss, bss_id)?;

            let repl_tag = Some(alloc.next_tag());
            let ccs_repl = builders[ccs_rank.0].add_send(alloc, bytes, bss_rank, repl_tag)?;
            let bss_repl = builders[bss_rank.0].add_recv(alloc, bytes, ccs_rank, repl_tag)?;

            let bss_store = builders[bss_rank.0].add_calc(alloc, io_time(bytes, IoKind::Write))?;

            // The BSS acks with the slice's sequence number
            let sqn_tag = Some(alloc.next_tag());
            let bss_sqn =
                builders[bss_rank.0].add_send(alloc, sizing.lookup_req, ccs_rank, sqn_tag)?;
            let ccs_sqn =
                builders[ccs_rank.0].add_recv(alloc, sizing.lookup_req, bss_rank, sqn_tag)?;

            builders[bss_rank.0].require(&bss_sqn, &bss_store)?;
            builders[bss_rank.0].require(&bss_store, &bss_repl)?;
            builders[ccs_rank.0].require(&ccs_repl, &ccs_store)?;
            builders[ccs_rank.0].require(&ccs_sqn, &ccs_repl)?;
            promises.push(ccs_sqn);
        }

        // Ack the host once every replica has promised (N=N quorum)
        let ack_tag = Some(alloc.next_tag());
        let ccs_ack = builders[ccs_rank.0].add_send(alloc, sizing.lookup_resp, host_rank, ack_tag)?;
        let host_ack =
            builders[host_rank.0].add_recv(alloc, sizing.lookup_resp, ccs_rank, ack_tag)?;

        for promise in &promises {
            builders[ccs_rank.0].require(&ccs_ack, promise)?;
        }
        builders[host_rank.0].require(&host_ack, &host_req)?;

        for dep in deps {
            builders[host_rank.0].require(&host_req, dep)?;
        }

        tails.push(host_ack);
    }

    Ok(tails)
}
