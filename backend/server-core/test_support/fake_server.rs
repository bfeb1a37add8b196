//! Stand-in for `redis-server` used by the lifecycle tests.
//!
//! Usage: `fake-redis-server --mode <mode> --port <port>`
//!
//! Modes:
//! - `ready`: bind the port, print the readiness line on stdout, accept forever
//! - `stderr`: like `ready`, but the readiness line goes to stderr
//! - `silent`: bind the port and never print the readiness line
//! - `exit`: print a startup error and exit with status 1

use std::env::args;
use std::io::{Write, stderr, stdout};
use std::net::TcpListener;
use std::process::ExitCode;
use std::thread::sleep;
use std::time::Duration;

const READY_LINE: &str = "The server is now ready to accept connections on port";

fn main() -> ExitCode {
    let mut mode = String::from("ready");
    let mut port: Option<u16> = None;

    let mut argv = args().skip(1);
    while let Some(arg) = argv.next() {
        match arg.as_str() {
            "--mode" => mode = argv.next().unwrap_or_default(),
            "--port" => port = argv.next().and_then(|p| p.parse().ok()),
            _ => {}
        }
    }

    let Some(port) = port else {
        eprintln!("# Fatal error: --port is required");
        return ExitCode::FAILURE;
    };

    if mode == "exit" {
        println!("[{}] # Server started, fake redis", std::process::id());
        eprintln!("# Fatal error, can't open config file");
        return ExitCode::FAILURE;
    }

    let listener = match TcpListener::bind(("127.0.0.1", port)) {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("# Creating Server TCP listening socket 127.0.0.1:{port}: bind: {e}");
            return ExitCode::FAILURE;
        }
    };

    println!("[{}] # Server started, fake redis", std::process::id());
    let _ = stdout().flush();

    match mode.as_str() {
        "ready" => {
            println!("[{}] * {READY_LINE} {port}", std::process::id());
            let _ = stdout().flush();
        }
        "stderr" => {
            eprintln!("[{}] * {READY_LINE} {port}", std::process::id());
            let _ = stderr().flush();
        }
        "silent" => loop {
            sleep(Duration::from_secs(60));
        },
        other => {
            eprintln!("# Unknown mode '{other}'");
            return ExitCode::FAILURE;
        }
    }

    for stream in listener.incoming() {
        match stream {
            Ok(mut stream) => {
                let _ = stream.write_all(b"+PONG\r\n");
            }
            Err(e) => eprintln!("# Accept failed: {e}"),
        }
    }

    ExitCode::SUCCESS
}
