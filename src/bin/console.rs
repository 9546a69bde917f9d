// Terminal front end for the dungeon: reads commands from stdin.

use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};

use dungeon_backend::config::{cli_value, load_env_file};
use dungeon_backend::console::client::DEFAULT_API_URL;
use dungeon_backend::console::{DungeonApi, HttpDungeonApi, Session};

fn prompt<W: Write>(out: &mut W) -> std::io::Result<()> {
    write!(out, "$> ")?;
    out.flush()
}

/// How much of the transcript has reached the terminal.
#[derive(Default)]
struct Printed {
    epoch: u64,
    count: usize,
}

/// Print messages appended since the last call. After `clear` or `exit`
/// the transcript is replaced, so all of it is new.
fn flush_messages<A: DungeonApi>(session: &Session<A>, printed: &mut Printed) {
    if session.log_epoch() != printed.epoch {
        printed.epoch = session.log_epoch();
        printed.count = 0;
    }
    let messages = session.messages();
    for message in messages.iter().skip(printed.count) {
        println!("{message}");
    }
    printed.count = messages.len();
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();
    load_env_file();

    let args: Vec<String> = std::env::args().collect();
    let api_url = cli_value(&args, "--api")
        .or_else(|| std::env::var("DUNGEON_API_URL").ok())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());

    let api = match HttpDungeonApi::new(&api_url) {
        Ok(api) => api,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };

    let mut session = Session::new(api);
    let mut printed = Printed::default();
    flush_messages(&session, &mut printed);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if let Err(e) = prompt(&mut std::io::stdout()) {
            tracing::debug!("stdout is gone, stopping: {e}");
            break;
        }
        match lines.next_line().await {
            Ok(Some(line)) => {
                session.dispatch(&line).await;
                flush_messages(&session, &mut printed);
            }
            Ok(None) => break,
            Err(e) => {
                tracing::error!("Failed to read input: {e}");
                break;
            }
        }
    }
}
