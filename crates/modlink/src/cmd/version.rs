use std::mem;

use modlink_channel::Endpoint;
use modlink_frame::{RawFrame, COMPOSITE, PING, SHUTDOWN};
use modlink_module::HostConfig;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs, config: &HostConfig) -> CliResult<i32> {
    if !args.extended {
        println!("modlink {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: modlink");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("MODLINK_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("handshake_symbol: {}", config.handshake_symbol);
    println!(
        "frame_layout: {} bytes (code i32, size i32, content ptr)",
        mem::size_of::<RawFrame>()
    );
    println!("endpoint_layout: {} bytes", mem::size_of::<Endpoint>());
    println!("reserved_codes: shutdown={SHUTDOWN} ping={PING} composite={COMPOSITE}");

    Ok(SUCCESS)
}
