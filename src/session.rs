//! The session state machine (spec.md §4.F): handshake, query dispatch,
//! insert dialog, ping, and exception propagation.

use std::io::{BufReader, BufWriter, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, error, trace};

use crate::block::Block;
use crate::errors::{Error, Result};
use crate::internal_in::InternalIn;
use crate::internal_out::InternalOut;
use crate::protocol::{ServerInfo, ServerPacket};
use crate::sink::{EventSink, NullSink};

/// Process-global, monotonically increasing query id (spec.md §3, §5). A
/// module-scoped atomic, lazily zero and never reset, per the accepted
/// alternative in spec.md §9 design notes.
static NEXT_QUERY_ID: AtomicU64 = AtomicU64::new(0);

fn next_query_id() -> u64 {
    NEXT_QUERY_ID.fetch_add(1, Ordering::Relaxed)
}

/// Connection options (spec.md §3 "Client options").
#[derive(Clone)]
pub struct ClientOptions {
    pub host: String,
    pub port: u16,
    pub default_database: String,
    pub username: String,
    pub password: String,
    pub rethrow_server_exceptions: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        ClientOptions {
            host: "127.0.0.1".to_string(),
            port: 9000,
            default_database: String::new(),
            username: "default".to_string(),
            password: String::new(),
            rethrow_server_exceptions: true,
        }
    }
}

impl std::fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientOptions")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("default_database", &self.default_database)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("rethrow_server_exceptions", &self.rethrow_server_exceptions)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Broken,
}

/// Owns exactly one socket (split into a read half `R` and a write half `W`),
/// the cached [`ServerInfo`], and drives the wire-protocol state machine.
/// Lifetime: from [`Session::connect`]/[`Session::connect_stream`] (which
/// performs the handshake) to [`Session::close`] or drop (which closes the
/// socket).
pub struct Session<R, W> {
    input: InternalIn<R>,
    output: InternalOut<W>,
    server: ServerInfo,
    options: ClientOptions,
    state: State,
}

impl Session<BufReader<TcpStream>, BufWriter<TcpStream>> {
    /// Resolves `host:port`, opens a TCP socket, and runs the handshake.
    ///
    /// The read and write halves are independent `TcpStream` handles onto the
    /// same socket (`try_clone`), each buffered, mirroring the teacher's
    /// `Client::connect` splitting an async `TcpStream` with `into_split()`.
    pub fn connect(options: ClientOptions) -> Result<Self> {
        debug!("connecting to {}:{}", options.host, options.port);
        let stream = connect_any((options.host.as_str(), options.port))?;
        let write_half = stream.try_clone()?;
        Self::connect_stream(BufReader::new(stream), BufWriter::new(write_half), options)
    }
}

fn connect_any<A: ToSocketAddrs>(addr: A) -> Result<TcpStream> {
    Ok(TcpStream::connect(addr)?)
}

impl<R: Read, W: Write> Session<R, W> {
    /// Consumes a reader and writer pair and runs the handshake over them.
    /// Exotic setups (TLS, in-memory transcripts for testing) go through
    /// this constructor directly; [`Session::connect`] is the common path.
    pub fn connect_stream(reader: R, writer: W, options: ClientOptions) -> Result<Self> {
        let mut input = InternalIn::new(reader);
        let mut output = InternalOut::new(writer);

        output.send_hello(&options)?;
        output.flush()?;

        let server = match input.receive_hello() {
            Ok(server) => server,
            Err(e) => {
                error!("handshake failed: {e}");
                return Err(e);
            }
        };
        debug!(
            "handshake complete: server={} revision={}",
            server.name, server.revision
        );

        Ok(Session {
            input,
            output,
            server,
            options,
            state: State::Idle,
        })
    }

    pub fn server_info(&self) -> &ServerInfo {
        &self.server
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// True once an `Io` or `Protocol` error has driven this session
    /// terminal (spec.md §7). `ServerException` does not do this.
    pub fn is_broken(&self) -> bool {
        self.state == State::Broken
    }

    fn ensure_usable(&self) -> Result<()> {
        if self.state == State::Broken {
            return Err(Error::usage("session is broken and cannot be reused"));
        }
        Ok(())
    }

    /// Drives the session to `Broken` for the error kinds the recovery
    /// policy in spec.md §7 says should: `Io`/`Protocol` only, never
    /// `ServerException`.
    fn fail(&mut self, err: Error) -> Error {
        if err.is_fatal_to_session() {
            error!("session transitioning to Broken: {err}");
            self.state = State::Broken;
        }
        err
    }

    /// SELECT-style query execution (spec.md §4.F "Query dispatch"). The
    /// sink is a borrowed capability set installed for the duration of this
    /// call only (spec.md §9 design notes), not process-wide state.
    pub fn execute(&mut self, query: &str, sink: &mut dyn EventSink) -> Result<()> {
        self.ensure_usable()?;
        let query_id = next_query_id();
        debug!("executing query {query_id}");

        if let Err(e) = self.dispatch_query(query_id, query) {
            return Err(self.fail(e));
        }
        match self.receive_loop(sink) {
            Ok(()) => {
                debug!("query {query_id} finished");
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn dispatch_query(&mut self, query_id: u64, query_text: &str) -> Result<()> {
        self.output.send_query(&self.server, query_id, query_text)?;
        self.output.send_data(&Block::empty(), &self.server)?;
        self.output.flush()?;
        Ok(())
    }

    /// INSERT dialog (spec.md §4.F "Insert dispatch"): query, await the
    /// server's schema reply, send the caller's block, send the end-of-data
    /// marker, then drain to a terminal packet.
    pub fn insert(&mut self, table_name: &str, block: &Block) -> Result<()> {
        self.ensure_usable()?;
        let query_id = next_query_id();
        let query_text = format!("INSERT INTO {table_name} VALUES");
        debug!("insert {query_id} into {table_name}");

        if let Err(e) = self.dispatch_query(query_id, &query_text) {
            return Err(self.fail(e));
        }
        if let Err(e) = self.await_insert_schema() {
            return Err(self.fail(e));
        }
        if let Err(e) = self.send_insert_block(block) {
            return Err(self.fail(e));
        }

        let mut sink = NullSink;
        match self.receive_loop(&mut sink) {
            Ok(()) => {
                debug!("insert {query_id} finished");
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Receives packets, ignoring `Progress`, until a `Data` packet (the
    /// server's view of the table's column schema) arrives. Its contents are
    /// consumed but not validated against the caller's block (spec.md §9
    /// open questions, second bullet).
    fn await_insert_schema(&mut self) -> Result<()> {
        loop {
            match self.input.receive_packet(self.server.revision)? {
                ServerPacket::Progress(_) => continue,
                ServerPacket::Data(_) => return Ok(()),
                ServerPacket::Exception(chain) => return Err(Error::ServerException(chain)),
                other => {
                    return Err(Error::protocol(format!(
                        "unexpected packet awaiting insert schema: {other:?}"
                    )))
                }
            }
        }
    }

    fn send_insert_block(&mut self, block: &Block) -> Result<()> {
        self.output.send_data(block, &self.server)?;
        self.output.send_data(&Block::empty(), &self.server)?;
        self.output.flush()?;
        Ok(())
    }

    /// Connection liveness check (spec.md §4.F "Ping").
    pub fn ping(&mut self) -> Result<()> {
        self.ensure_usable()?;
        trace!("ping");
        match self.do_ping() {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail(e)),
        }
    }

    fn do_ping(&mut self) -> Result<()> {
        self.output.send_ping()?;
        self.output.flush()?;
        match self.input.receive_packet(self.server.revision)? {
            ServerPacket::Pong => Ok(()),
            other => Err(Error::protocol(format!(
                "ping answered by non-Pong packet: {other:?}"
            ))),
        }
    }

    /// Repeatedly receives and dispatches packets (spec.md §4.F "Packet
    /// reception") until a terminal one arrives: `EndOfStream` or
    /// `Exception`. `Data` is explicitly non-terminal — see spec.md §9 open
    /// questions, first bullet, which this implementation follows.
    fn receive_loop(&mut self, sink: &mut dyn EventSink) -> Result<()> {
        loop {
            let packet = self.input.receive_packet(self.server.revision)?;
            match packet {
                ServerPacket::Data(data) => {
                    if data.block.rows() > 0 {
                        sink.on_data(&data.block);
                    }
                }
                ServerPacket::Progress(progress) => sink.on_progress(progress),
                ServerPacket::ProfileInfo(profile) => sink.on_profile(&profile),
                ServerPacket::Pong => {}
                ServerPacket::EndOfStream => {
                    sink.on_finish();
                    return Ok(());
                }
                ServerPacket::Exception(chain) => {
                    sink.on_server_exception(&chain);
                    if self.options.rethrow_server_exceptions {
                        return Err(Error::ServerException(chain));
                    }
                    return Ok(());
                }
            }
        }
    }

    /// Closes the session. The socket closes unconditionally on drop; any
    /// write data not yet flushed is discarded (spec.md §5 "Resource
    /// release").
    pub fn close(self) {
        debug!("closing session");
    }
}
