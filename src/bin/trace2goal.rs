use clap::{Parser, Subcommand};
use indicatif::ProgressBar;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

use trace2goal_rs::Result;
use trace2goal_rs::net::{
    DirectDriveNetwork, IoKind, NetworkConfig, NetworkTopology, NextStrategy, StrategySet,
    TopologyConfig, TopologyStrategy,
};
use trace2goal_rs::trace;
use trace2goal_rs::viz::{TraceBuilder, ViewKind, parse_sim_log, write_trace_file};

#[derive(Debug, Parser)]
#[command(
    name = "trace2goal",
    about = "Create goal files for a LogGOPS-style simulator from storage-I/O traces"
)]
struct Cli {
    /// Show debug logs
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Transform a uMass trace file into a goal file; host count and
    /// minimum disk size are autodetected from the trace
    Trace(TraceArgs),
    /// Create a goal file for a simple network with random reads and
    /// writes per host
    Simple(SimpleArgs),
    /// Create a goal file with a highly congested read/write pattern:
    /// every host touches the same address range each round
    WorstCase(WorstCaseArgs),
    /// Transform a LogGOPSSim viz log into a Perfetto trace file
    Visualize(VisualizeArgs),
}

#[derive(Debug, clap::Args)]
struct TraceArgs {
    /// Input trace file (csv: asu, lba, size, opcode, ...)
    trace_path: PathBuf,
    /// Output goal file
    out_path: PathBuf,
    /// Slice size in kB
    #[arg(long, default_value_t = 1024)]
    slice_size: u64,
    /// No of Software Load Balancers in network
    #[arg(long, default_value_t = 1)]
    slb_count: usize,
    /// No of Gateway Switches in network
    #[arg(long, default_value_t = 1)]
    gs_count: usize,
    /// No of MetaData Services in network
    #[arg(long, default_value_t = 1)]
    mds_count: usize,
    /// No of Change Coordinator Services in network
    #[arg(long, default_value_t = 8)]
    ccs_count: usize,
    /// No of Block Storage Services in network
    #[arg(long, default_value_t = 64)]
    bss_count: usize,
    /// Strategy to decide on the next SLB (round-robin, random, first)
    #[arg(long, default_value = "round-robin")]
    next_slb_strategy: NextStrategy,
    /// Strategy to spread node kinds across the network
    /// (grouped-by-kind, fat-tree)
    #[arg(long, default_value = "grouped-by-kind")]
    topology_strategy: TopologyStrategy,
    /// Write a rank-id to human-name JSON map
    #[arg(long)]
    rank_names_dest: Option<PathBuf>,
    /// Do not chain successive operations of the same host
    #[arg(long)]
    no_op_depens: bool,
    /// Keep all rank programs in memory instead of spilling to disk
    #[arg(long)]
    no_dump_state: bool,
    /// Only read the first N records from the trace file
    #[arg(long)]
    max_no_instructions: Option<u64>,
    /// RNG seed for strategy draws
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[derive(Debug, clap::Args)]
struct SimpleArgs {
    /// Output goal file
    out_file: PathBuf,
    /// No. of random writes per host in network
    #[arg(long, default_value_t = 16)]
    writes: u64,
    /// No. of random reads per host in network
    #[arg(long, default_value_t = 16)]
    reads: u64,
    /// Skip the mount operation for each host
    #[arg(long)]
    no_mount: bool,
    /// Disk size in kB
    #[arg(long, default_value_t = 4096)]
    disk_size: u64,
    /// Slice size in kB
    #[arg(long, default_value_t = 1)]
    slice_size: u64,
    /// No. of hosts in network
    #[arg(long, default_value_t = 16)]
    host_count: usize,
    /// No of Software Load Balancers in network
    #[arg(long, default_value_t = 1)]
    slb_count: usize,
    /// No of Gateway Switches in network
    #[arg(long, default_value_t = 1)]
    gs_count: usize,
    /// No of MetaData Services in network
    #[arg(long, default_value_t = 1)]
    mds_count: usize,
    /// No of Change Coordinator Services in network
    #[arg(long, default_value_t = 128)]
    ccs_count: usize,
    /// No of Block Storage Services in network
    #[arg(long, default_value_t = 1280)]
    bss_count: usize,
    /// Strategy to spread node kinds across the network
    /// (grouped-by-kind, fat-tree)
    #[arg(long, default_value = "grouped-by-kind")]
    topology_strategy: TopologyStrategy,
    /// Write a rank-id to human-name JSON map
    #[arg(long)]
    rank_names_dest: Option<PathBuf>,
    /// RNG seed for strategy and address draws
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[derive(Debug, clap::Args)]
struct WorstCaseArgs {
    /// Output goal file
    out_file: PathBuf,
    /// No. of writes per host and round
    #[arg(long, default_value_t = 8)]
    writes: u64,
    /// No. of reads per host and round
    #[arg(long, default_value_t = 8)]
    reads: u64,
    /// No. of repeats of the read/write cycle
    #[arg(long, default_value_t = 2)]
    repeats: u64,
    /// Skip the mount operation for each host
    #[arg(long)]
    no_mount: bool,
    /// Disk size in kB
    #[arg(long, default_value_t = 4096)]
    disk_size: u64,
    /// Slice size in kB
    #[arg(long, default_value_t = 64)]
    slice_size: u64,
    /// No. of hosts in network
    #[arg(long, default_value_t = 4)]
    host_count: usize,
    /// No of Software Load Balancers in network
    #[arg(long, default_value_t = 1)]
    slb_count: usize,
    /// No of Gateway Switches in network
    #[arg(long, default_value_t = 1)]
    gs_count: usize,
    /// No of MetaData Services in network
    #[arg(long, default_value_t = 1)]
    mds_count: usize,
    /// No of Change Coordinator Services in network
    #[arg(long, default_value_t = 4)]
    ccs_count: usize,
    /// No of Block Storage Services in network
    #[arg(long, default_value_t = 4)]
    bss_count: usize,
    /// Strategy to spread node kinds across the network
    /// (grouped-by-kind, fat-tree)
    #[arg(long, default_value = "grouped-by-kind")]
    topology_strategy: TopologyStrategy,
    /// Write a rank-id to human-name JSON map
    #[arg(long)]
    rank_names_dest: Option<PathBuf>,
    /// Keep all rank programs in memory instead of spilling to disk
    #[arg(long)]
    no_dump_state: bool,
    /// RNG seed for strategy and address draws
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[derive(Debug, clap::Args)]
struct VisualizeArgs {
    /// Input viz log produced by the simulator
    in_file: PathBuf,
    /// Output Perfetto trace file
    out_file: PathBuf,
    /// JSON file mapping rank ids to descriptive names
    #[arg(long)]
    rank_name_map: Option<PathBuf>,
    /// One thread per rank
    #[arg(long, conflicts_with_all = ["advanced", "expert"])]
    simple: bool,
    /// CPU and NUC threads per rank
    #[arg(long, conflicts_with = "expert")]
    advanced: bool,
    /// CPU thread per rank plus one channel thread per rank pair
    #[arg(long)]
    expert: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let result = match cli.command {
        Command::Trace(args) => run_trace(args),
        Command::Simple(args) => run_simple(args),
        Command::WorstCase(args) => run_worst_case(args),
        Command::Visualize(args) => run_visualize(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(debug: bool) {
    let default_filter = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();
}

/// Per-run spill directory under the system temp dir.
fn default_dump_dir() -> PathBuf {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    std::env::temp_dir()
        .join("trace2goal")
        .join(format!("exec_{stamp}"))
}

fn run_trace(args: TraceArgs) -> Result<()> {
    info!("extracting host count and disk size from trace");
    let stats = trace::scan(&args.trace_path, args.max_no_instructions)?;

    let topology = NetworkTopology::new(&TopologyConfig {
        host_count: stats.host_count,
        slb_count: args.slb_count,
        gs_count: args.gs_count,
        mds_count: args.mds_count,
        ccs_count: args.ccs_count,
        bss_count: args.bss_count,
        strategy: args.topology_strategy,
    })?;
    if let Some(dest) = &args.rank_names_dest {
        topology.write_name_map(dest)?;
    }

    let cfg = NetworkConfig {
        disk_size: stats.disk_size,
        slice_size: args.slice_size * 1024,
        strategies: StrategySet {
            slb: args.next_slb_strategy,
            ..StrategySet::default()
        },
        op_depens: !args.no_op_depens,
        mount_on_first_use: true,
        spill_dir: (!args.no_dump_state).then(default_dump_dir),
        seed: args.seed,
        ..NetworkConfig::default()
    };
    let mut network = DirectDriveNetwork::new(topology, &cfg)?;

    info!("adding interactions");
    let progress = ProgressBar::new(stats.records);
    trace::for_each_record(&args.trace_path, args.max_no_instructions, |record| {
        network.add_interaction(record.opcode, record.asu, record.lba, record.size)?;
        progress.inc(1);
        Ok(())
    })?;
    progress.finish_and_clear();

    network.write_goal_file(&args.out_path)
}

fn run_simple(args: SimpleArgs) -> Result<()> {
    let disk_size = args.disk_size * 1024;
    let slice_size = args.slice_size * 1024;
    let mount = !args.no_mount;

    let topology = NetworkTopology::new(&TopologyConfig {
        host_count: args.host_count,
        slb_count: args.slb_count,
        gs_count: args.gs_count,
        mds_count: args.mds_count,
        ccs_count: args.ccs_count,
        bss_count: args.bss_count,
        strategy: args.topology_strategy,
    })?;
    if let Some(dest) = &args.rank_names_dest {
        topology.write_name_map(dest)?;
    }

    let cfg = NetworkConfig {
        disk_size,
        slice_size,
        op_depens: true,
        mount_on_first_use: mount,
        spill_dir: Some(default_dump_dir()),
        seed: args.seed,
        ..NetworkConfig::default()
    };
    let mut network = DirectDriveNetwork::new(topology, &cfg)?;
    let mut rng = StdRng::seed_from_u64(args.seed);

    if args.reads == 0 && args.writes == 0 && mount {
        for host in 0..args.host_count {
            network.add_mount(host)?;
        }
    }

    let progress = ProgressBar::new((args.reads + args.writes) * args.host_count as u64);
    if args.reads > 0 {
        info!("adding read interactions");
        for host in 0..args.host_count {
            for _ in 0..args.reads {
                let start = rng.gen_range(0..=disk_size / 2);
                let len = rng.gen_range(0..=disk_size - start);
                network.add_interaction(IoKind::Read, host, start, len)?;
                progress.inc(1);
            }
        }
    }
    if args.writes > 0 {
        info!("adding write interactions");
        for host in 0..args.host_count {
            for _ in 0..args.writes {
                let start = rng.gen_range(0..=disk_size / 2);
                let len = rng.gen_range(0..=disk_size - start);
                network.add_interaction(IoKind::Write, host, start, len)?;
                progress.inc(1);
            }
        }
    }
    progress.finish_and_clear();

    network.write_goal_file(&args.out_file)
}

fn run_worst_case(args: WorstCaseArgs) -> Result<()> {
    let disk_size = args.disk_size * 1024;
    let slice_size = args.slice_size * 1024;
    let mount = !args.no_mount;

    let topology = NetworkTopology::new(&TopologyConfig {
        host_count: args.host_count,
        slb_count: args.slb_count,
        gs_count: args.gs_count,
        mds_count: args.mds_count,
        ccs_count: args.ccs_count,
        bss_count: args.bss_count,
        strategy: args.topology_strategy,
    })?;
    if let Some(dest) = &args.rank_names_dest {
        topology.write_name_map(dest)?;
    }

    let cfg = NetworkConfig {
        disk_size,
        slice_size,
        op_depens: true,
        mount_on_first_use: mount,
        spill_dir: (!args.no_dump_state).then(default_dump_dir),
        seed: args.seed,
        ..NetworkConfig::default()
    };
    let mut network = DirectDriveNetwork::new(topology, &cfg)?;
    let mut rng = StdRng::seed_from_u64(args.seed);

    let hosts = args.host_count as u64;
    let progress = ProgressBar::new(
        args.repeats * (args.reads + args.writes) * hosts + if mount { hosts } else { 0 },
    );
    if mount {
        info!("adding mount interactions");
        for host in 0..args.host_count {
            network.add_mount(host)?;
            progress.inc(1);
        }
    }

    for round in 0..args.repeats {
        if args.reads > 0 {
            info!(round, "adding read interactions");
            for _ in 0..args.reads {
                let start = rng.gen_range(0..=disk_size / 2);
                let end = rng.gen_range(start..=disk_size);
                for host in 0..args.host_count {
                    network.add_interaction(IoKind::Read, host, start, end - start)?;
                    progress.inc(1);
                }
            }
        }
        if args.writes > 0 {
            info!(round, "adding write interactions");
            for _ in 0..args.writes {
                let start = rng.gen_range(0..=disk_size / 2);
                let end = rng.gen_range(start..=disk_size);
                for host in 0..args.host_count {
                    network.add_interaction(IoKind::Write, host, start, end - start)?;
                    progress.inc(1);
                }
            }
        }
    }
    progress.finish_and_clear();

    network.write_goal_file(&args.out_file)
}

fn run_visualize(args: VisualizeArgs) -> Result<()> {
    let view = if args.expert {
        ViewKind::Expert
    } else if args.advanced {
        ViewKind::Advanced
    } else {
        ViewKind::Simple
    };

    let file = File::open(&args.in_file)?;
    let log = parse_sim_log(BufReader::new(file))?;

    let mut builder = TraceBuilder::new(view);
    if let Some(map) = &args.rank_name_map {
        builder.load_rank_names(map)?;
    }
    let trace = builder.build(&log);
    write_trace_file(&trace, &args.out_file)
}
