use std::time::{Duration, Instant};

use modlink_frame::BooleanMessage;
use modlink_module::HostConfig;
use serde::Serialize;
use tracing::debug;

use crate::cmd::{load_host, PingArgs};
use crate::exit::{load_error, CliError, CliResult, FAILURE, SUCCESS, USAGE};
use crate::output::{print_report, OutputFormat};

#[derive(Serialize)]
struct PingOutput {
    module: String,
    path: String,
    sent: u32,
    replies: u32,
    alive: bool,
    avg_latency_us: Option<f64>,
}

pub fn run(args: PingArgs, config: &HostConfig, format: OutputFormat) -> CliResult<i32> {
    if args.count == 0 {
        return Err(CliError::new(USAGE, "--count must be greater than zero"));
    }

    let mut host = load_host(&args.path, config)?;

    let mut replies = 0;
    let mut elapsed = Duration::ZERO;
    for _ in 0..args.count {
        let start = Instant::now();
        let response = host.ping();
        elapsed += start.elapsed();

        let alive = response
            .map(|frame| frame.decode_as::<BooleanMessage>())
            .is_some_and(|reply| reply.is_ok_and(|reply| reply.value));
        if alive {
            replies += 1;
        }
    }
    debug!(module = host.name(), replies, "ping finished");

    let out = PingOutput {
        module: host.name().to_string(),
        path: args.path.display().to_string(),
        sent: args.count,
        replies,
        alive: replies > 0,
        avg_latency_us: (replies > 0)
            .then(|| elapsed.as_secs_f64() * 1_000_000.0 / f64::from(args.count)),
    };

    host.unload()
        .map_err(|err| load_error("unload failed", err))?;

    let rows = vec![
        ("module", out.module.clone()),
        ("path", out.path.clone()),
        ("replies", format!("{}/{}", out.replies, out.sent)),
        (
            "avg latency",
            out.avg_latency_us
                .map_or_else(|| "unavailable".to_string(), |us| format!("{us:.2}us")),
        ),
    ];
    print_report(&out, rows, format);

    Ok(if out.alive { SUCCESS } else { FAILURE })
}
