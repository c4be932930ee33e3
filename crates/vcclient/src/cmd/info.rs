use serde::Serialize;
use vcclient_session::TransportConnection;

use crate::cmd::InfoArgs;
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{print_json, OutputFormat};

#[derive(Serialize)]
struct InfoOutput {
    server: String,
    connection_id: u64,
    version: String,
    output_format: &'static str,
    event_port: u16,
    events_running: bool,
    connected: bool,
}

impl InfoOutput {
    fn from_connection(conn: &TransportConnection) -> Self {
        Self {
            server: conn.addr().to_string(),
            connection_id: conn.id(),
            version: conn.version().to_string(),
            output_format: conn.output_format().as_str(),
            event_port: conn.event_port(),
            events_running: conn.events_running(),
            connected: !conn.is_closed(),
        }
    }
}

pub fn run(args: InfoArgs, format: OutputFormat) -> CliResult<i32> {
    let conn = args.connect.open()?;
    let out = InfoOutput::from_connection(&conn);
    conn.close()
        .map_err(|err| client_error("close failed", err))?;

    print_info(&out, format);
    Ok(SUCCESS)
}

fn print_info(out: &InfoOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("Connection Info:");
            println!("  Server:           {}", out.server);
            println!("  Version:          {}", out.version);
            println!("  Reply format:     {}", out.output_format);
            println!("  Event port:       {}", out.event_port);
            println!(
                "  Event reader:     {}",
                if out.events_running { "running" } else { "stopped" }
            );
        }
        OutputFormat::Raw => {
            println!("{} {}", out.version, out.output_format);
        }
    }
}
