use clickhouse_tcp::{Block, Column, ClientOptions, RecordingSink, Session};

fn main() {
    env_logger::Builder::new()
        .parse_env(env_logger::Env::default().default_filter_or("info"))
        .init();

    let mut session = Session::connect(ClientOptions {
        host: "127.0.0.1".to_string(),
        port: 9000,
        username: "default".to_string(),
        password: "".to_string(),
        default_database: "default".to_string(),
        rethrow_server_exceptions: true,
    })
    .unwrap();

    let mut block = Block::new(2, 2);
    block
        .append_column("id", Column::UInt64(vec![1, 2]))
        .unwrap();
    block
        .append_column("user_data", Column::String(vec![
            b"some important stuff!".to_vec(),
            b"more stuff".to_vec(),
        ]))
        .unwrap();

    session.insert("my_user_data", &block).unwrap();

    let mut sink = RecordingSink::default();
    session
        .execute("SELECT id, user_data FROM my_user_data", &mut sink)
        .unwrap();

    for block in &sink.data_blocks {
        for (name, type_name, column) in block.iter() {
            println!("column '{name}' ({type_name}): {column:?}");
        }
    }

    session.close();
}
