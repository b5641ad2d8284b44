//! Packet framing constants and per-packet wire structures (spec.md §4.E, §6).

use std::fmt;

use crate::errors::{Error, Result};

/// Largest number of bytes read::read_string/read_binary will allocate for
/// before bailing with a protocol error, mirroring the teacher's MAX_STRING_SIZE.
pub const MAX_STRING_SIZE: usize = 1 << 30;

/// Revision gates, spec.md §6 "Revision feature gates" table. All are
/// inclusive lower bounds compared against `ServerInfo::revision`.
pub const DBMS_MIN_REVISION_WITH_TEMPORARY_TABLES: u64 = 50264;
pub const DBMS_MIN_REVISION_WITH_TOTAL_ROWS_IN_PROGRESS: u64 = 51554;
pub const DBMS_MIN_REVISION_WITH_BLOCK_INFO: u64 = 51903;
pub const DBMS_MIN_REVISION_WITH_CLIENT_INFO: u64 = 54032;
pub const DBMS_MIN_REVISION_WITH_SERVER_TIMEZONE: u64 = 54058;
pub const DBMS_MIN_REVISION_WITH_QUOTA_KEY_IN_CLIENT_INFO: u64 = 54060;

/// Client identity constants emitted at handshake (spec.md §3 "Client profile").
pub const CLIENT_NAME: &str = "ClickHouse client";
pub const CLIENT_VERSION_MAJOR: u64 = 1;
pub const CLIENT_VERSION_MINOR: u64 = 1;
pub const CLIENT_REVISION: u64 = 54126;

/// Client → server packet codes (spec.md §4.E).
#[repr(u64)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientPacketId {
    Hello = 0,
    Query = 1,
    Data = 2,
    Ping = 4,
}

/// Server → client packet codes (spec.md §4.E).
#[repr(u64)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServerPacketId {
    Hello,
    Data,
    Exception,
    Progress,
    Pong,
    EndOfStream,
    ProfileInfo,
}

impl ServerPacketId {
    pub fn from_u64(code: u64) -> Result<Self> {
        Ok(match code {
            0 => ServerPacketId::Hello,
            1 => ServerPacketId::Data,
            2 => ServerPacketId::Exception,
            3 => ServerPacketId::Progress,
            4 => ServerPacketId::Pong,
            5 => ServerPacketId::EndOfStream,
            6 => ServerPacketId::ProfileInfo,
            other => {
                return Err(Error::protocol(format!(
                    "unexpected server packet code: {other}"
                )))
            }
        })
    }
}

/// `Stages` on the wire (spec.md GLOSSARY); this client always sends `Complete`.
#[repr(u64)]
#[derive(Clone, Copy, Debug)]
pub enum QueryStage {
    Complete = 2,
}

/// `CompressionState` on the wire; always `Disable` in this core (Non-goal: compression).
#[repr(u64)]
#[derive(Clone, Copy, Debug)]
pub enum CompressionState {
    Disable = 0,
}

/// Server profile captured during handshake (spec.md §3 "Server profile").
/// Immutable for the connection's life once set.
#[derive(Debug, Clone, Default)]
pub struct ServerInfo {
    pub name: String,
    pub major_version: u64,
    pub minor_version: u64,
    pub revision: u64,
    pub timezone: Option<String>,
}

/// A single frame of a decoded exception chain (spec.md §3 "Exception").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionFrame {
    pub code: i32,
    pub name: String,
    pub display_text: String,
    pub stack_trace: String,
}

/// The full exception chain, head (proximate cause) first.
///
/// The source links exceptions through owned next-pointers; per spec.md §9
/// design notes this is flattened into an ordered `Vec` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionChain {
    pub frames: Vec<ExceptionFrame>,
}

/// Hard cap on chain length so a misbehaving server can't force unbounded
/// allocation (spec.md §4.F "Exception decode").
pub const MAX_EXCEPTION_CHAIN_DEPTH: usize = 32;

impl ExceptionChain {
    pub fn head(&self) -> &ExceptionFrame {
        &self.frames[0]
    }
}

impl fmt::Display for ExceptionChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head = self.head();
        write!(f, "{} ({}): {}", head.name, head.code, head.display_text)?;
        for frame in &self.frames[1..] {
            write!(f, "\n  caused by {} ({}): {}", frame.name, frame.code, frame.display_text)?;
        }
        Ok(())
    }
}

/// `BlockStreamProfileInfo` (spec.md §4.F packet reception table).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileInfo {
    pub rows: u64,
    pub blocks: u64,
    pub bytes: u64,
    pub applied_limit: bool,
    pub rows_before_limit: u64,
    pub calculated_rows_before_limit: bool,
}

/// A decoded `Data` packet: the server's table-name hint (spec.md §4.F "Data
/// packet decode", gated on `DBMS_MIN_REVISION_WITH_TEMPORARY_TABLES`) plus
/// the block body.
#[derive(Debug, Clone)]
pub struct DataPacket {
    pub table_name: Option<String>,
    pub block: crate::block::Block,
}

/// Every packet the client can receive, dispatched on by
/// `Session::receive_one_packet` (spec.md §4.F "Packet reception").
#[derive(Debug, Clone)]
pub enum ServerPacket {
    Data(DataPacket),
    Exception(ExceptionChain),
    Progress(crate::progress::Progress),
    Pong,
    EndOfStream,
    ProfileInfo(ProfileInfo),
}
