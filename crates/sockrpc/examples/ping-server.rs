//! RPC server that answers `ping` and counts calls.
//!
//! Run with:
//!   cargo run -p sockrpc --example ping-server
//!
//! In another terminal:
//!   cargo run -p sockrpc --example ping-client
//! or
//!   cargo run -p sockrpc --features cli -- call 127.0.0.1:11120 ping

use sockrpc::rpc::{codes, ParamList, RpcServer};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut calls = 0i64;
    let mut server = RpcServer::with_handler(11120, move |arguments: &ParamList, answer: &mut ParamList| {
        calls += 1;
        let method = arguments.get_string("method");
        eprintln!("call #{calls}: {method}");

        let code = if method == "ping" { codes::OK } else { "unknown_method" };
        let _ = answer.set_string(codes::RESULT_CODE, code);
        let _ = answer.set_string("Answer", "pong");
        let _ = answer.set_int("calls", calls);
    })
    .on_listening(|port| eprintln!("Listening on 127.0.0.1:{port}"));

    server.up()?;
    Ok(())
}
