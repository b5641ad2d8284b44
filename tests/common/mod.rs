//! Shared test plumbing: a write sink that stays readable after the session
//! that owns it is dropped, and the default handshake reply used by tests
//! that don't care about `ServerInfo` themselves.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use clickhouse_tcp::io::ClickhouseWrite;
use clickhouse_tcp::protocol::{
    ClientPacketId, CompressionState, QueryStage, ServerPacketId, CLIENT_NAME, CLIENT_REVISION,
    CLIENT_VERSION_MAJOR, CLIENT_VERSION_MINOR, DBMS_MIN_REVISION_WITH_CLIENT_INFO,
    DBMS_MIN_REVISION_WITH_QUOTA_KEY_IN_CLIENT_INFO, DBMS_MIN_REVISION_WITH_TEMPORARY_TABLES,
    DBMS_MIN_REVISION_WITH_TOTAL_ROWS_IN_PROGRESS,
};
use clickhouse_tcp::Block;

/// `Vec<u8>` behind shared ownership so a test can both hand a `Write` impl
/// to `Session::connect_stream` and inspect what landed in it afterward.
#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        SharedBuffer(Rc::new(RefCell::new(Vec::new())))
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.0.borrow().clone()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A server `Hello` reply advertising the current protocol revision and UTC,
/// built with the crate's own codec so the byte layout can't drift from the
/// decoder under test.
pub fn hello_reply_bytes(revision: u64, timezone: Option<&str>) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.write_var_uint(0).unwrap(); // ServerPacketId::Hello
    buf.write_string("ClickHouse server").unwrap();
    buf.write_var_uint(23).unwrap();
    buf.write_var_uint(8).unwrap();
    buf.write_var_uint(revision).unwrap();
    if let Some(tz) = timezone {
        buf.write_string(tz).unwrap();
    }
    buf
}

pub fn end_of_stream_bytes() -> Vec<u8> {
    let mut buf = Vec::new();
    buf.write_var_uint(5).unwrap(); // ServerPacketId::EndOfStream
    buf
}

/// The exact bytes a `Query` packet should occupy on the wire at `revision`,
/// reconstructed from the public protocol constants so tests don't need a
/// second, private encoder to stay in sync with.
pub fn expected_query_bytes(revision: u64, query_id: u64, query_text: &str) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.write_var_uint(ClientPacketId::Query as u64).unwrap();
    buf.write_string(&query_id.to_string()).unwrap();

    if revision >= DBMS_MIN_REVISION_WITH_CLIENT_INFO {
        buf.write_u8_wire(1).unwrap(); // query_kind: initial
        buf.write_string("").unwrap(); // initial_user
        buf.write_string("").unwrap(); // initial_query_id
        buf.write_string("[::ffff:127.0.0.1]:0").unwrap();
        buf.write_u8_wire(1).unwrap(); // iface_type: tcp
        buf.write_string("").unwrap(); // os_user
        buf.write_string("").unwrap(); // client_hostname
        buf.write_string(CLIENT_NAME).unwrap();
        buf.write_var_uint(CLIENT_VERSION_MAJOR).unwrap();
        buf.write_var_uint(CLIENT_VERSION_MINOR).unwrap();
        buf.write_var_uint(CLIENT_REVISION).unwrap();
        if revision >= DBMS_MIN_REVISION_WITH_QUOTA_KEY_IN_CLIENT_INFO {
            buf.write_string("").unwrap();
        }
    }

    buf.write_string("").unwrap(); // settings terminator
    buf.write_var_uint(QueryStage::Complete as u64).unwrap();
    buf.write_var_uint(CompressionState::Disable as u64).unwrap();
    buf.write_string(query_text).unwrap();
    buf
}

/// The exact bytes a `Data` packet carrying `block` should occupy at
/// `revision`, symmetric with `expected_query_bytes`.
pub fn expected_data_bytes(block: &Block, revision: u64) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.write_var_uint(ClientPacketId::Data as u64).unwrap();
    if revision >= DBMS_MIN_REVISION_WITH_TEMPORARY_TABLES {
        buf.write_string("").unwrap();
    }
    block.write(&mut buf, revision).unwrap();
    buf
}

/// The exact bytes a *server-sent* `Data` packet carrying `block` should
/// occupy at `revision` — the schema-probe reply to an insert, or a SELECT
/// result block. Not to be confused with [`expected_data_bytes`], which uses
/// the client's packet id for the client's own outgoing `Data` packets.
pub fn server_data_bytes(block: &Block, revision: u64) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.write_var_uint(ServerPacketId::Data as u64).unwrap();
    if revision >= DBMS_MIN_REVISION_WITH_TEMPORARY_TABLES {
        buf.write_string("").unwrap();
    }
    block.write(&mut buf, revision).unwrap();
    buf
}

/// A server `Progress` packet carrying `rows`/`bytes`, with `total_rows`
/// included only when `revision` supports it — mirrors the client's own
/// decode gate so boundary tests can drive it from both sides.
pub fn progress_bytes(revision: u64, rows: u64, bytes: u64, total_rows: u64) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.write_var_uint(3).unwrap(); // ServerPacketId::Progress
    buf.write_var_uint(rows).unwrap();
    buf.write_var_uint(bytes).unwrap();
    if revision >= DBMS_MIN_REVISION_WITH_TOTAL_ROWS_IN_PROGRESS {
        buf.write_var_uint(total_rows).unwrap();
    }
    buf
}
