//! Minimal subset of the Perfetto trace protos.
//!
//! Only the fields this transformer emits are declared; tags match
//! `perfetto/protos/perfetto/trace/*.proto`, so the encoded bytes are
//! what the Perfetto UI expects. The wire schema is treated as a fixed
//! external format.

/// Every packet this tool writes shares one sequence id.
pub const TRUSTED_PACKET_SEQ_ID: u32 = 1;

#[derive(Clone, PartialEq, prost::Message)]
pub struct Trace {
    #[prost(message, repeated, tag = "1")]
    pub packet: Vec<TracePacket>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct TracePacket {
    #[prost(uint64, optional, tag = "8")]
    pub timestamp: Option<u64>,
    #[prost(uint32, optional, tag = "10")]
    pub trusted_packet_sequence_id: Option<u32>,
    #[prost(message, optional, tag = "11")]
    pub track_event: Option<TrackEvent>,
    #[prost(message, optional, tag = "60")]
    pub track_descriptor: Option<TrackDescriptor>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct TrackDescriptor {
    #[prost(uint64, optional, tag = "1")]
    pub uuid: Option<u64>,
    #[prost(uint64, optional, tag = "5")]
    pub parent_uuid: Option<u64>,
    #[prost(message, optional, tag = "3")]
    pub process: Option<ProcessDescriptor>,
    #[prost(message, optional, tag = "4")]
    pub thread: Option<ThreadDescriptor>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ProcessDescriptor {
    #[prost(int32, optional, tag = "1")]
    pub pid: Option<i32>,
    #[prost(string, optional, tag = "6")]
    pub process_name: Option<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ThreadDescriptor {
    #[prost(int32, optional, tag = "1")]
    pub pid: Option<i32>,
    #[prost(int32, optional, tag = "2")]
    pub tid: Option<i32>,
    #[prost(string, optional, tag = "5")]
    pub thread_name: Option<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct TrackEvent {
    #[prost(message, repeated, tag = "4")]
    pub debug_annotations: Vec<DebugAnnotation>,
    #[prost(enumeration = "TrackEventType", optional, tag = "9")]
    pub r#type: Option<i32>,
    #[prost(uint64, optional, tag = "11")]
    pub track_uuid: Option<u64>,
    #[prost(string, optional, tag = "23")]
    pub name: Option<String>,
    #[prost(fixed64, repeated, tag = "47")]
    pub flow_ids: Vec<u64>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct DebugAnnotation {
    #[prost(string, optional, tag = "6")]
    pub string_value: Option<String>,
    #[prost(string, optional, tag = "10")]
    pub name: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum TrackEventType {
    Unspecified = 0,
    SliceBegin = 1,
    SliceEnd = 2,
    Instant = 3,
}

pub fn process_descriptor_packet(uuid: u64, pid: i32, name: &str) -> TracePacket {
    TracePacket {
        track_descriptor: Some(TrackDescriptor {
            uuid: Some(uuid),
            parent_uuid: None,
            process: Some(ProcessDescriptor {
                pid: Some(pid),
                process_name: Some(name.to_owned()),
            }),
            thread: None,
        }),
        trusted_packet_sequence_id: Some(TRUSTED_PACKET_SEQ_ID),
        ..Default::default()
    }
}

pub fn thread_descriptor_packet(
    uuid: u64,
    parent_uuid: u64,
    pid: i32,
    tid: i32,
    name: &str,
) -> TracePacket {
    TracePacket {
        track_descriptor: Some(TrackDescriptor {
            uuid: Some(uuid),
            parent_uuid: Some(parent_uuid),
            process: None,
            thread: Some(ThreadDescriptor {
                pid: Some(pid),
                tid: Some(tid),
                thread_name: Some(name.to_owned()),
            }),
        }),
        trusted_packet_sequence_id: Some(TRUSTED_PACKET_SEQ_ID),
        ..Default::default()
    }
}

pub fn slice_begin(
    track_uuid: u64,
    timestamp: u64,
    name: &str,
    flow_ids: &[u64],
    debug: &[(String, String)],
) -> TracePacket {
    TracePacket {
        timestamp: Some(timestamp),
        track_event: Some(TrackEvent {
            debug_annotations: debug
                .iter()
                .map(|(key, value)| DebugAnnotation {
                    name: Some(key.clone()),
                    string_value: Some(value.clone()),
                })
                .collect(),
            r#type: Some(TrackEventType::SliceBegin as i32),
            track_uuid: Some(track_uuid),
            name: Some(name.to_owned()),
            flow_ids: flow_ids.to_vec(),
        }),
        trusted_packet_sequence_id: Some(TRUSTED_PACKET_SEQ_ID),
        ..Default::default()
    }
}

pub fn slice_end(track_uuid: u64, timestamp: u64) -> TracePacket {
    TracePacket {
        timestamp: Some(timestamp),
        track_event: Some(TrackEvent {
            r#type: Some(TrackEventType::SliceEnd as i32),
            track_uuid: Some(track_uuid),
            ..Default::default()
        }),
        trusted_packet_sequence_id: Some(TRUSTED_PACKET_SEQ_ID),
        ..Default::default()
    }
}

pub fn instant(
    track_uuid: u64,
    timestamp: u64,
    name: &str,
    debug: &[(String, String)],
) -> TracePacket {
    TracePacket {
        timestamp: Some(timestamp),
        track_event: Some(TrackEvent {
            debug_annotations: debug
                .iter()
                .map(|(key, value)| DebugAnnotation {
                    name: Some(key.clone()),
                    string_value: Some(value.clone()),
                })
                .collect(),
            r#type: Some(TrackEventType::Instant as i32),
            track_uuid: Some(track_uuid),
            name: Some(name.to_owned()),
            ..Default::default()
        }),
        trusted_packet_sequence_id: Some(TRUSTED_PACKET_SEQ_ID),
        ..Default::default()
    }
}
