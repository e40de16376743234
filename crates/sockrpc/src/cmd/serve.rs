use std::time::{SystemTime, UNIX_EPOCH};

use sockrpc_params::ParamList;
use sockrpc_rpc::{codes, RpcHandler, RpcServer, ShutdownHandle};

use crate::cmd::ServeArgs;
use crate::exit::{rpc_error, CliError, CliResult, INTERNAL, SUCCESS};

/// `ping`, `echo` and `time`; anything else is `unknown_method`.
#[derive(Debug, Default)]
pub struct BuiltinHandler;

impl BuiltinHandler {
    fn dispatch(method: &str, arguments: &ParamList, answer: &mut ParamList) -> sockrpc_params::Result<()> {
        match method {
            "ping" => {
                answer.set_string(codes::RESULT_CODE, codes::OK)?;
                answer.set_string("Answer", "pong")?;
            }
            "echo" => {
                answer.set_string(codes::RESULT_CODE, codes::OK)?;
                if let Some(params) = arguments.get("params") {
                    answer.set("params", params.clone())?;
                }
            }
            "time" => {
                let now = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or_default();
                answer.set_string(codes::RESULT_CODE, codes::OK)?;
                answer.set_int("time", i64::try_from(now).unwrap_or(i64::MAX))?;
            }
            other => {
                answer.set_string(codes::RESULT_CODE, "unknown_method")?;
                answer.set_string(codes::RESULT_MESSAGE, format!("unknown method {other:?}"))?;
            }
        }
        Ok(())
    }
}

impl RpcHandler for BuiltinHandler {
    fn accept_peer(&mut self, remote: &str) -> bool {
        tracing::trace!(remote, "reading request");
        true
    }

    fn handle(&mut self, arguments: &ParamList, answer: &mut ParamList) {
        let method = match arguments.get("method") {
            Some(serde_json::Value::String(name)) => name.clone(),
            Some(serde_json::Value::Number(id)) => id.to_string(),
            _ => String::new(),
        };
        tracing::info!(method = %method, "handling call");

        if let Err(err) = Self::dispatch(&method, arguments, answer) {
            tracing::warn!(method = %method, code = err.code(), error = %err, "failed to build answer");
            answer.clear();
            let _ = answer.set_string(codes::RESULT_CODE, err.code());
        }
    }
}

pub fn run(args: ServeArgs) -> CliResult<i32> {
    let mut config = args.sock.to_config();
    config.backlog = args.backlog;
    config.listen_tick = args.listen_tick;

    let mut server = RpcServer::with_handler(args.port, BuiltinHandler)
        .with_config(config)
        .on_listening(|port| tracing::info!(port, "serving"));

    install_ctrlc_handler(server.shutdown_handle())?;

    server
        .up()
        .map_err(|err| rpc_error("serve failed", &err))?;
    Ok(SUCCESS)
}

fn install_ctrlc_handler(shutdown: ShutdownHandle) -> CliResult<()> {
    ctrlc::set_handler(move || shutdown.down())
        .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(method: &str) -> ParamList {
        let mut arguments = ParamList::new();
        arguments.set_string("method", method).unwrap();
        arguments.set_string("params.name", "ana").unwrap();
        let mut answer = ParamList::new();
        BuiltinHandler.handle(&arguments, &mut answer);
        answer
    }

    #[test]
    fn ping_answers_pong() {
        let answer = call("ping");
        assert_eq!(answer.get_string("result.code"), "ok");
        assert_eq!(answer.get_string("Answer"), "pong");
    }

    #[test]
    fn echo_returns_params() {
        let answer = call("echo");
        assert_eq!(answer.get_string("params.name"), "ana");
    }

    #[test]
    fn time_is_positive() {
        assert!(call("time").get_int("time").unwrap_or_default() > 0);
    }

    #[test]
    fn unknown_method_is_reported() {
        let answer = call("nope");
        assert_eq!(answer.get_string("result.code"), "unknown_method");
        assert!(answer.get_string("result.message").contains("nope"));
    }
}
