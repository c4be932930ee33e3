use std::fs;
use std::io::Read;

use vcclient_decode::{decode_payload, OutputFormat as ReplyFormat};

use crate::cmd::DecodeArgs;
use crate::exit::{decode_error, io_error, CliResult, SUCCESS};
use crate::output::{print_value, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let raw = match &args.file {
        Some(path) => fs::read_to_string(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|err| io_error("failed reading stdin", err))?;
            buf
        }
    };

    let keyword = args.command.to_ascii_lowercase();
    let reply_format = ReplyFormat::from(args.reply_format);
    let value = decode_payload(&keyword, captured_payload(&raw), reply_format)
        .map_err(|err| decode_error("decode failed", err))?;
    print_value(&keyword, &value, format);
    Ok(SUCCESS)
}

/// Strip the line ending a capture tool leaves after the payload.
fn captured_payload(raw: &str) -> &str {
    raw.trim_end_matches(['\r', '\n'])
}
