use std::net::SocketAddr;

use sockrpc_params::ParamList;
use sockrpc_rpc::{Method, RpcClient, RpcError};
use sockrpc_transport::{Endpoint, SocketDomain, SocketType};

use crate::cmd::CallArgs;
use crate::exit::{rpc_error, CliError, CliResult, SUCCESS};
use crate::output::{print_answer, OutputFormat};

pub fn run(args: CallArgs, format: OutputFormat) -> CliResult<i32> {
    let endpoint = parse_target(&args.target)?;
    let method = parse_method(&args.method, args.id)?;
    let request = build_request(&args.params)?;

    let identity = endpoint.identity();
    let mut client = RpcClient::new(endpoint).with_config(args.sock.to_config());
    *client.request_mut() = request;

    match client.call_method(method) {
        Ok(()) => {
            print_answer(&identity, &args.method, "ok", client.answer(), format);
            Ok(SUCCESS)
        }
        Err(err @ RpcError::Application { .. }) => {
            print_answer(&identity, &args.method, err.code(), client.answer(), format);
            Err(rpc_error("call failed", &err))
        }
        Err(err) => Err(rpc_error("call failed", &err)),
    }
}

fn parse_target(target: &str) -> CliResult<Endpoint> {
    let addr: SocketAddr = target
        .parse()
        .map_err(|_| CliError::usage(format!("target must be ip:port, got {target:?}")))?;
    let domain = match addr {
        SocketAddr::V4(_) => SocketDomain::Inet,
        SocketAddr::V6(_) => SocketDomain::Inet6,
    };
    Ok(Endpoint::new(
        domain,
        SocketType::Stream,
        addr.ip().to_string(),
        addr.port(),
    ))
}

fn parse_method(method: &str, as_id: bool) -> CliResult<Method> {
    if !as_id {
        return Ok(Method::from(method));
    }
    method
        .parse::<i64>()
        .map(Method::Id)
        .map_err(|_| CliError::usage(format!("--id needs an integer method, got {method:?}")))
}

/// Integers are sent as numbers, everything else as strings.
fn build_request(params: &[(String, String)]) -> CliResult<ParamList> {
    let mut request = ParamList::new();
    for (key, value) in params {
        let path = format!("params.{key}");
        let result = match value.parse::<i64>() {
            Ok(number) => request.set_int(&path, number),
            Err(_) => request.set_string(&path, value.as_str()),
        };
        result.map_err(|err| CliError::usage(format!("--param {key}: {err}")))?;
    }
    Ok(request)
}
