use sockrpc_frame::{DEFAULT_MAX_PAYLOAD, HEADER_SIZE, MAGIC};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("sockrpc {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: sockrpc");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("SOCKRPC_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "profile: {}",
        option_env!("SOCKRPC_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "wire: marker={} header={}B max_payload={}B",
        String::from_utf8_lossy(&MAGIC),
        HEADER_SIZE,
        DEFAULT_MAX_PAYLOAD
    );
    println!("features: rpc={}, cli=true", cfg!(feature = "rpc"));

    Ok(SUCCESS)
}
