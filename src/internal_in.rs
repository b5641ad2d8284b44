//! Server → client packet decoding (spec.md §4.F "Packet reception", "Data
//! packet decode", "Exception decode").

use log::trace;

use crate::block::Block;
use crate::errors::{Error, Result};
use crate::io::ClickhouseRead;
use crate::protocol::{
    DataPacket, ExceptionChain, ExceptionFrame, ProfileInfo, ServerInfo, ServerPacket,
    ServerPacketId, DBMS_MIN_REVISION_WITH_SERVER_TIMEZONE, DBMS_MIN_REVISION_WITH_TEMPORARY_TABLES,
    DBMS_MIN_REVISION_WITH_TOTAL_ROWS_IN_PROGRESS, MAX_EXCEPTION_CHAIN_DEPTH,
};
use crate::progress::Progress;

pub struct InternalIn<R> {
    reader: R,
}

impl<R: ClickhouseRead> InternalIn<R> {
    pub fn new(reader: R) -> Self {
        InternalIn { reader }
    }

    /// Reads exactly one server packet during the handshake: either `Hello`
    /// (success) or `Exception` (connect failure), per spec.md §4.F "Connect
    /// & Handshake".
    pub fn receive_hello(&mut self) -> Result<ServerInfo> {
        let code = self.reader.read_var_uint()?;
        match ServerPacketId::from_u64(code)? {
            ServerPacketId::Hello => {
                let name = self.reader.read_string()?;
                let major_version = self.reader.read_var_uint()?;
                let minor_version = self.reader.read_var_uint()?;
                let revision = self.reader.read_var_uint()?;
                let timezone = if revision >= DBMS_MIN_REVISION_WITH_SERVER_TIMEZONE {
                    Some(self.reader.read_string()?)
                } else {
                    None
                };
                Ok(ServerInfo {
                    name,
                    major_version,
                    minor_version,
                    revision,
                    timezone,
                })
            }
            ServerPacketId::Exception => Err(Error::ServerException(self.read_exception_chain()?)),
            other => Err(Error::protocol(format!(
                "unexpected packet during handshake: {other:?}"
            ))),
        }
    }

    fn read_exception_chain(&mut self) -> Result<ExceptionChain> {
        let mut frames = Vec::new();
        loop {
            if frames.len() >= MAX_EXCEPTION_CHAIN_DEPTH {
                return Err(Error::protocol("exception chain exceeds maximum depth"));
            }
            let code = self.reader.read_i32_le()?;
            let name = self.reader.read_string()?;
            let display_text = self.reader.read_string()?;
            let stack_trace = self.reader.read_string()?;
            let has_nested = self.reader.read_bool()?;
            frames.push(ExceptionFrame {
                code,
                name,
                display_text,
                stack_trace,
            });
            if !has_nested {
                break;
            }
        }
        Ok(ExceptionChain { frames })
    }

    fn receive_data(&mut self, revision: u64) -> Result<DataPacket> {
        let table_name = if revision >= DBMS_MIN_REVISION_WITH_TEMPORARY_TABLES {
            Some(self.reader.read_string()?)
        } else {
            None
        };
        let block = Block::read(&mut self.reader, revision)?;
        Ok(DataPacket { table_name, block })
    }

    /// Reads and dispatches exactly one packet; one-shot per spec.md §4.E
    /// ("read the code, dispatch on it, consume exactly the body bytes,
    /// return to the dispatch loop").
    pub fn receive_packet(&mut self, revision: u64) -> Result<ServerPacket> {
        let code = self.reader.read_var_uint()?;
        let packet = match ServerPacketId::from_u64(code)? {
            ServerPacketId::Hello => {
                return Err(Error::protocol(
                    "unexpected retransmission of server hello",
                ))
            }
            ServerPacketId::Data => ServerPacket::Data(self.receive_data(revision)?),
            ServerPacketId::Exception => ServerPacket::Exception(self.read_exception_chain()?),
            ServerPacketId::Progress => {
                let rows = self.reader.read_var_uint()?;
                let bytes = self.reader.read_var_uint()?;
                let total_rows = if revision >= DBMS_MIN_REVISION_WITH_TOTAL_ROWS_IN_PROGRESS {
                    Some(self.reader.read_var_uint()?)
                } else {
                    None
                };
                ServerPacket::Progress(Progress {
                    rows,
                    bytes,
                    total_rows,
                })
            }
            ServerPacketId::Pong => ServerPacket::Pong,
            ServerPacketId::EndOfStream => ServerPacket::EndOfStream,
            ServerPacketId::ProfileInfo => {
                let rows = self.reader.read_var_uint()?;
                let blocks = self.reader.read_var_uint()?;
                let bytes = self.reader.read_var_uint()?;
                let applied_limit = self.reader.read_bool()?;
                let rows_before_limit = self.reader.read_var_uint()?;
                let calculated_rows_before_limit = self.reader.read_bool()?;
                ServerPacket::ProfileInfo(ProfileInfo {
                    rows,
                    blocks,
                    bytes,
                    applied_limit,
                    rows_before_limit,
                    calculated_rows_before_limit,
                })
            }
        };
        trace!("packet received: {packet:?}");
        Ok(packet)
    }
}
