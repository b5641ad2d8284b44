//! End-to-end scenario 5 (spec.md §8).

mod common;

use std::io::Cursor;

use clickhouse_tcp::column::Column;
use clickhouse_tcp::io::ClickhouseWrite;
use clickhouse_tcp::{Block, ClientOptions, Session};

#[test]
fn insert_round_trip_emits_exact_outgoing_packet_sequence() {
    let revision = 54126;

    let mut server_transcript = common::hello_reply_bytes(revision, Some("UTC"));

    // Progress, then the server's (empty) schema reply.
    let mut progress = Vec::new();
    progress.write_var_uint(3).unwrap();
    progress.write_var_uint(0).unwrap();
    progress.write_var_uint(0).unwrap();
    progress.write_var_uint(0).unwrap();
    server_transcript.extend(progress);

    let mut schema = Vec::new();
    schema.write_var_uint(1).unwrap(); // ServerPacketId::Data
    schema.write_string("").unwrap();
    Block::empty().write(&mut schema, revision).unwrap();
    server_transcript.extend(schema);

    server_transcript.extend(common::end_of_stream_bytes());

    let writer = common::SharedBuffer::new();
    let mut session = Session::connect_stream(
        Cursor::new(server_transcript),
        writer.clone(),
        ClientOptions::default(),
    )
    .unwrap();

    let mut block = Block::new(2, 2);
    block
        .append_column("name", Column::String(vec![b"a".to_vec(), b"bb".to_vec()]))
        .unwrap();
    block.append_column("n", Column::UInt32(vec![1, 2])).unwrap();

    session.insert("t", &block).unwrap();
    assert!(!session.is_broken());

    let mut expected = Vec::new();
    expected.extend(common::expected_query_bytes(
        revision,
        0, // the only query in this test binary, so the first id issued
        "INSERT INTO t VALUES",
    ));
    expected.extend(common::expected_data_bytes(&Block::empty(), revision));
    expected.extend(common::expected_data_bytes(&block, revision));
    expected.extend(common::expected_data_bytes(&Block::empty(), revision));

    assert_eq!(writer.bytes(), expected);
}
