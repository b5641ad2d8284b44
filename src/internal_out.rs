//! Client → server packet encoding (spec.md §4.F "Query dispatch", "Insert
//! dispatch", "Ping", "Data packet encode").

use crate::block::Block;
use crate::errors::Result;
use crate::io::ClickhouseWrite;
use crate::protocol::{
    ClientPacketId, CompressionState, QueryStage, ServerInfo, CLIENT_NAME, CLIENT_REVISION,
    CLIENT_VERSION_MAJOR, CLIENT_VERSION_MINOR, DBMS_MIN_REVISION_WITH_CLIENT_INFO,
    DBMS_MIN_REVISION_WITH_QUOTA_KEY_IN_CLIENT_INFO, DBMS_MIN_REVISION_WITH_TEMPORARY_TABLES,
};
use crate::session::ClientOptions;

/// `ClientInfo.query_kind`: this client only ever sends initial queries.
const QUERY_KIND_INITIAL: u8 = 1;
/// `ClientInfo.iface_type`: TCP.
const IFACE_TYPE_TCP: u8 = 1;
/// Literal address the source emits for `initial_address` (spec.md §4.F).
const INITIAL_ADDRESS: &str = "[::ffff:127.0.0.1]:0";

pub struct InternalOut<W> {
    writer: W,
}

impl<W: ClickhouseWrite> InternalOut<W> {
    pub fn new(writer: W) -> Self {
        InternalOut { writer }
    }

    /// Drains buffered bytes to the underlying stream (spec.md §4.A).
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn send_hello(&mut self, options: &ClientOptions) -> Result<()> {
        self.writer.write_var_uint(ClientPacketId::Hello as u64)?;
        self.writer.write_string(CLIENT_NAME)?;
        self.writer.write_var_uint(CLIENT_VERSION_MAJOR)?;
        self.writer.write_var_uint(CLIENT_VERSION_MINOR)?;
        self.writer.write_var_uint(CLIENT_REVISION)?;
        self.writer.write_string(&options.default_database)?;
        self.writer.write_string(&options.username)?;
        self.writer.write_string(&options.password)?;
        Ok(())
    }

    /// Sends the `Query` packet; does not send the trailing empty-block
    /// marker (the caller sends that as a separate `Data` packet via
    /// [`InternalOut::send_data`], per spec.md §4.F).
    pub fn send_query(&mut self, server: &ServerInfo, query_id: u64, query_text: &str) -> Result<()> {
        self.writer.write_var_uint(ClientPacketId::Query as u64)?;
        self.writer.write_string(&query_id.to_string())?;

        if server.revision >= DBMS_MIN_REVISION_WITH_CLIENT_INFO {
            self.writer.write_u8_wire(QUERY_KIND_INITIAL)?;
            self.writer.write_string("")?; // initial_user
            self.writer.write_string("")?; // initial_query_id
            self.writer.write_string(INITIAL_ADDRESS)?;
            self.writer.write_u8_wire(IFACE_TYPE_TCP)?;
            self.writer.write_string("")?; // os_user
            self.writer.write_string("")?; // client_hostname
            self.writer.write_string(CLIENT_NAME)?; // client_name
            self.writer.write_var_uint(CLIENT_VERSION_MAJOR)?;
            self.writer.write_var_uint(CLIENT_VERSION_MINOR)?;
            self.writer.write_var_uint(CLIENT_REVISION)?;
            if server.revision >= DBMS_MIN_REVISION_WITH_QUOTA_KEY_IN_CLIENT_INFO {
                self.writer.write_string("")?; // quota_key
            }
        }

        self.writer.write_string("")?; // settings: empty terminator, no per-query settings
        self.writer.write_var_uint(QueryStage::Complete as u64)?;
        self.writer.write_var_uint(CompressionState::Disable as u64)?;
        self.writer.write_string(query_text)?;
        Ok(())
    }

    /// Sends a `Data` packet carrying `block`'s body, symmetric with
    /// [`Block::read`] / the server's Data-packet decode (spec.md §4.F "Data
    /// packet encode").
    pub fn send_data(&mut self, block: &Block, server: &ServerInfo) -> Result<()> {
        self.writer.write_var_uint(ClientPacketId::Data as u64)?;
        if server.revision >= DBMS_MIN_REVISION_WITH_TEMPORARY_TABLES {
            self.writer.write_string("")?;
        }
        block.write(&mut self.writer, server.revision)?;
        Ok(())
    }

    pub fn send_ping(&mut self) -> Result<()> {
        self.writer.write_var_uint(ClientPacketId::Ping as u64)?;
        Ok(())
    }
}
