//! Test-only goal-file parser and structural checker.
//!
//! Re-parses generated goal text into a line model, validates the
//! structural invariants of the format, and renders the model back so
//! round-trip tests can compare bytes.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::net::{
    DirectDriveNetwork, NetworkConfig, NetworkTopology, NextStrategy, StrategySet, TopologyConfig,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum GoalLine {
    Send {
        label: String,
        size: u64,
        peer: usize,
        tag: Option<u64>,
    },
    Recv {
        label: String,
        size: u64,
        peer: usize,
        tag: Option<u64>,
    },
    Calc {
        label: String,
        duration: u64,
    },
    Requires {
        a: String,
        b: String,
    },
    Comment(String),
}

impl GoalLine {
    pub(super) fn label(&self) -> Option<&str> {
        match self {
            GoalLine::Send { label, .. }
            | GoalLine::Recv { label, .. }
            | GoalLine::Calc { label, .. } => Some(label.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for GoalLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GoalLine::Send {
                label,
                size,
                peer,
                tag,
            } => {
                write!(f, "{label}: send {size}b to {peer}")?;
                if let Some(tag) = tag {
                    write!(f, " tag {tag}")?;
                }
                Ok(())
            }
            GoalLine::Recv {
                label,
                size,
                peer,
                tag,
            } => {
                write!(f, "{label}: recv {size}b from {peer}")?;
                if let Some(tag) = tag {
                    write!(f, " tag {tag}")?;
                }
                Ok(())
            }
            GoalLine::Calc { label, duration } => write!(f, "{label}: calc {duration}"),
            GoalLine::Requires { a, b } => write!(f, "{a} requires {b}"),
            GoalLine::Comment(text) => write!(f, "// {text}"),
        }
    }
}

pub(super) struct GoalFile {
    pub num_ranks: usize,
    pub ranks: Vec<(usize, Vec<GoalLine>)>,
}

impl GoalFile {
    pub(super) fn parse(text: &str) -> GoalFile {
        let mut lines = text.lines();
        let header = lines.next().expect("missing header");
        let num_ranks: usize = header
            .strip_prefix("num_ranks ")
            .expect("header must start with num_ranks")
            .parse()
            .expect("num_ranks must be an integer");

        let mut ranks = Vec::new();
        let mut current: Option<(usize, Vec<GoalLine>)> = None;
        for line in lines {
            if line.is_empty() {
                assert!(current.is_none(), "blank line inside a rank block");
                continue;
            }
            if let Some(rest) = line.strip_prefix("rank ") {
                assert!(current.is_none(), "nested rank block");
                let id: usize = rest
                    .strip_suffix(" {")
                    .expect("malformed rank header")
                    .parse()
                    .expect("rank id must be an integer");
                current = Some((id, Vec::new()));
            } else if line == "}" {
                ranks.push(current.take().expect("unmatched closing brace"));
            } else {
                let block = current.as_mut().expect("event line outside rank block");
                block.1.push(parse_line(line));
            }
        }
        assert!(current.is_none(), "unterminated rank block");

        GoalFile { num_ranks, ranks }
    }

    pub(super) fn render(&self) -> String {
        let mut out = format!("num_ranks {}\n\n", self.num_ranks);
        for (id, lines) in &self.ranks {
            out.push_str(&format!("rank {id} {{\n"));
            for line in lines {
                out.push_str(&line.to_string());
                out.push('\n');
            }
            out.push_str("}\n\n");
        }
        out
    }

    pub(super) fn rank(&self, id: usize) -> &[GoalLine] {
        &self
            .ranks
            .iter()
            .find(|(rank, _)| *rank == id)
            .expect("rank not declared")
            .1
    }

    /// Validates the structural invariants of the goal format.
    pub(super) fn check(&self) {
        assert_eq!(self.ranks.len(), self.num_ranks, "one block per rank");
        for (expected, (declared, _)) in self.ranks.iter().enumerate() {
            assert_eq!(*declared, expected, "rank blocks in ascending order");
        }

        // Label uniqueness, definition positions per rank
        let mut defined: HashMap<&str, (usize, usize)> = HashMap::new();
        for (rank, lines) in &self.ranks {
            for (pos, line) in lines.iter().enumerate() {
                if let Some(label) = line.label() {
                    let previous = defined.insert(label, (*rank, pos));
                    assert!(previous.is_none(), "duplicate label {label}");
                }
            }
        }

        // Peer bounds, tag pairing and peer symmetry per directed rank pair
        let mut sends: HashMap<(usize, usize, u64), Vec<u64>> = HashMap::new();
        let mut recvs: HashMap<(usize, usize, u64), Vec<u64>> = HashMap::new();
        for (rank, lines) in &self.ranks {
            for line in lines {
                match line {
                    GoalLine::Send {
                        size, peer, tag, ..
                    } => {
                        assert!(*peer < self.num_ranks, "send peer out of range");
                        let tag = tag.expect("generated sends are tagged");
                        sends.entry((*rank, *peer, tag)).or_default().push(*size);
                    }
                    GoalLine::Recv {
                        size, peer, tag, ..
                    } => {
                        assert!(*peer < self.num_ranks, "recv peer out of range");
                        let tag = tag.expect("generated recvs are tagged");
                        recvs.entry((*peer, *rank, tag)).or_default().push(*size);
                    }
                    GoalLine::Requires { a, b } => {
                        let (rank_a, pos_a) = defined[a.as_str()];
                        let (rank_b, pos_b) = defined[b.as_str()];
                        assert_eq!(rank_a, *rank, "requires references a foreign rank");
                        assert_eq!(rank_b, *rank, "dependency lives on a foreign rank");
                        assert!(pos_b < pos_a, "dependency must be defined before dependent");
                    }
                    _ => {}
                }
            }
        }

        let send_keys: HashSet<_> = sends.keys().copied().collect();
        let recv_keys: HashSet<_> = recvs.keys().copied().collect();
        assert_eq!(send_keys, recv_keys, "every send needs its matching recv");
        for (key, send_sizes) in &sends {
            let recv_sizes = &recvs[key];
            assert_eq!(send_sizes.len(), 1, "tag reused for two sends on {key:?}");
            assert_eq!(recv_sizes.len(), 1, "tag reused for two recvs on {key:?}");
            assert_eq!(send_sizes[0], recv_sizes[0], "send/recv size mismatch");
            assert_ne!(key.0, key.1, "send and recv must live on distinct ranks");
        }
    }
}

fn parse_line(line: &str) -> GoalLine {
    if let Some(comment) = line.strip_prefix("// ") {
        return GoalLine::Comment(comment.to_owned());
    }
    if let Some((label, rest)) = line.split_once(": ") {
        let label = label.to_owned();
        let tokens: Vec<&str> = rest.split(' ').collect();
        return match tokens.as_slice() {
            ["send", size, "to", peer] => GoalLine::Send {
                label,
                size: parse_size(size),
                peer: peer.parse().expect("peer rank"),
                tag: None,
            },
            ["send", size, "to", peer, "tag", tag] => GoalLine::Send {
                label,
                size: parse_size(size),
                peer: peer.parse().expect("peer rank"),
                tag: Some(tag.parse().expect("tag")),
            },
            ["recv", size, "from", peer] => GoalLine::Recv {
                label,
                size: parse_size(size),
                peer: peer.parse().expect("peer rank"),
                tag: None,
            },
            ["recv", size, "from", peer, "tag", tag] => GoalLine::Recv {
                label,
                size: parse_size(size),
                peer: peer.parse().expect("peer rank"),
                tag: Some(tag.parse().expect("tag")),
            },
            ["calc", duration] => GoalLine::Calc {
                label,
                duration: duration.parse().expect("duration"),
            },
            other => panic!("unparseable event line: {other:?}"),
        };
    }
    let (a, b) = line.split_once(" requires ").expect("unparseable line");
    GoalLine::Requires {
        a: a.to_owned(),
        b: b.to_owned(),
    }
}

fn parse_size(token: &str) -> u64 {
    token
        .strip_suffix('b')
        .expect("size must end in 'b'")
        .parse()
        .expect("size")
}

pub(super) fn goal_string(network: &mut DirectDriveNetwork) -> String {
    let mut buf = Vec::new();
    network.to_goal(&mut buf).expect("goal emission");
    String::from_utf8(buf).expect("goal text is utf-8")
}

fn busy_network(seed: u64) -> DirectDriveNetwork {
    let topology = NetworkTopology::new(&TopologyConfig {
        host_count: 2,
        slb_count: 1,
        gs_count: 1,
        mds_count: 2,
        ccs_count: 2,
        bss_count: 4,
        ..TopologyConfig::default()
    })
    .expect("topology");
    let mut network = DirectDriveNetwork::new(
        topology,
        &NetworkConfig {
            disk_size: 64 * 1024,
            slice_size: 4 * 1024,
            strategies: StrategySet {
                slb: NextStrategy::RoundRobin,
                mds: NextStrategy::Random,
                ..StrategySet::default()
            },
            seed,
            ..NetworkConfig::default()
        },
    )
    .expect("network");

    use crate::net::IoKind::{Read, Write};
    for (kind, host, addr, len) in [
        (Write, 0, 0, 10_000),
        (Read, 1, 2_000, 9_000),
        (Read, 0, 0, 4_096),
        (Write, 1, 60 * 1024, 8 * 1024),
        (Write, 0, 4_095, 2),
        (Read, 1, 0, 64 * 1024),
    ] {
        network
            .add_interaction(kind, host, addr, len)
            .expect("interaction");
    }
    network
}

#[test]
fn generated_goal_upholds_structural_invariants() {
    let text = goal_string(&mut busy_network(7));
    let goal = GoalFile::parse(&text);
    goal.check();
}

#[test]
fn goal_reparse_and_render_is_byte_identical() {
    let text = goal_string(&mut busy_network(7));
    let goal = GoalFile::parse(&text);
    assert_eq!(goal.render(), text);
}

#[test]
fn same_seed_reproduces_goal_byte_for_byte() {
    let first = goal_string(&mut busy_network(99));
    let second = goal_string(&mut busy_network(99));
    assert_eq!(first, second);
}
