use tracing::{debug, warn};
use vcclient_decode::{decode, strategy_for};
use vcclient_frame::{frame_bytes, FrameKind, COMMAND_TERMINATOR};

use crate::cmd::ExecArgs;
use crate::exit::{client_error, CliError, CliResult, FAILURE, SUCCESS, USAGE};
use crate::output::{print_ack, print_value, OutputFormat};

/// A command ready to send: its keyword and encoded body.
#[derive(Debug, PartialEq, Eq)]
struct Request {
    keyword: String,
    body: Vec<u8>,
    addressed: bool,
}

pub fn run(args: ExecArgs, format: OutputFormat) -> CliResult<i32> {
    let request = build_request(&args)?;
    let conn = args.connect.open()?;

    let ack = conn
        .execute(&request.keyword, &request.body, request.addressed)
        .map_err(|err| client_error("exec failed", err))?;

    if args.ack {
        print_ack(&request.keyword, &ack, format);
        return Ok(if ack.is_accepted() { SUCCESS } else { FAILURE });
    }

    if strategy_for(&request.keyword).is_none() {
        warn!(command = %request.keyword, "no decoder for command, printing raw reply");
        print_ack(&request.keyword, &ack, format);
        return Ok(if ack.is_accepted() { SUCCESS } else { FAILURE });
    }

    let value = decode(&request.keyword, ack, conn.output_format())
        .map_err(|err| client_error("exec failed", err.into()))?;
    print_value(&request.keyword, &value, format);
    Ok(SUCCESS)
}

fn build_request(args: &ExecArgs) -> CliResult<Request> {
    let text = args.command.join(" ");
    let keyword = text
        .split_whitespace()
        .next()
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| CliError::new(USAGE, "command must not be empty"))?;

    let mut payload = text.into_bytes();
    payload.push(COMMAND_TERMINATOR);

    let (kind, endpoint, addressed) = if args.generic {
        (FrameKind::Generic, None, false)
    } else {
        (FrameKind::Command, args.endpoint.as_deref(), true)
    };
    let body = frame_bytes(kind, endpoint, &payload)
        .map_err(|err| CliError::new(USAGE, format!("cannot encode command: {err}")))?;
    debug!(command = %keyword, addressed, len = body.len(), "encoded command");

    Ok(Request {
        keyword,
        body: body.to_vec(),
        addressed,
    })
}
