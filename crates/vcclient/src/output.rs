use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use vcclient_decode::DecodedValue;
use vcclient_frame::Acknowledgement;
use vcclient_session::Event;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ReplyOutput<'a> {
    command: &'a str,
    result: &'a DecodedValue,
}

#[derive(Serialize)]
struct AckOutput<'a> {
    command: &'a str,
    ack: &'a str,
    endpoint_id: &'a str,
    message: &'a str,
}

#[derive(Serialize)]
struct EventOutput<'a> {
    server: String,
    endpoint_id: &'a str,
    event_type: &'a str,
    event_subtype: Option<&'a str>,
    message: &'a str,
    timestamp: String,
}

pub fn print_value(command: &str, value: &DecodedValue, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            print_json(&ReplyOutput {
                command,
                result: value,
            });
        }
        OutputFormat::Table => {
            let (header, rows) = value_rows(value);
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(header);
            for row in rows {
                table.add_row(row);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let mut out = String::new();
            pretty(value, 0, &mut out);
            print!("{out}");
        }
        OutputFormat::Raw => match value {
            DecodedValue::Scalar(text) => println!("{text}"),
            other => print_json(other),
        },
    }
}

pub fn print_ack(command: &str, ack: &Acknowledgement, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&AckOutput {
            command,
            ack: ack.ack.as_str(),
            endpoint_id: &ack.endpoint_id,
            message: &ack.message,
        }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ACK", "ENDPOINT", "MESSAGE"])
                .add_row(vec![
                    ack.ack.to_string(),
                    ack.endpoint_id.clone(),
                    ack.message.clone(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "ack={} endpoint={} message={}",
                ack.ack, ack.endpoint_id, ack.message
            );
        }
        OutputFormat::Raw => print_raw(ack.message.as_bytes()),
    }
}

pub fn print_event(event: &Event, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&EventOutput {
            server: event.server.to_string(),
            endpoint_id: &event.endpoint_id,
            event_type: &event.event_type,
            event_subtype: event.event_subtype.as_deref(),
            message: &event.message,
            timestamp: now_unix_seconds(),
        }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ENDPOINT", "TYPE", "SUBTYPE", "MESSAGE"])
                .add_row(vec![
                    event.endpoint_id.clone(),
                    event.event_type.clone(),
                    event.event_subtype.clone().unwrap_or_default(),
                    event.message.clone(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "server={} endpoint={} type={} subtype={} message={}",
                event.server,
                event.endpoint_id,
                event.event_type,
                event.event_subtype.as_deref().unwrap_or("-"),
                event.message
            );
        }
        OutputFormat::Raw => {
            let subtype = event.event_subtype.as_deref().unwrap_or_default();
            let line = [event.event_type.as_str(), subtype, event.message.as_str()]
                .into_iter()
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            println!("{} {line}", event.endpoint_id);
        }
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.write_all(b"\n");
    let _ = out.flush();
}

/// Header and rows for a table view of a decoded value.
///
/// A list of mappings becomes one row per record with the first record's
/// keys as columns; a mapping becomes key/value rows.
pub fn value_rows(value: &DecodedValue) -> (Vec<String>, Vec<Vec<String>>) {
    match value {
        DecodedValue::Sequence(items) => {
            let columns: Vec<String> = items
                .first()
                .and_then(DecodedValue::as_mapping)
                .map(|entries| entries.iter().map(|(key, _)| key.clone()).collect())
                .unwrap_or_default();
            if columns.is_empty() {
                let rows = items.iter().map(|item| vec![cell(item)]).collect();
                return (vec!["VALUE".to_string()], rows);
            }
            let rows = items
                .iter()
                .map(|item| {
                    columns
                        .iter()
                        .map(|key| item.get(key).map(cell).unwrap_or_default())
                        .collect()
                })
                .collect();
            let header = columns.iter().map(|key| key.to_ascii_uppercase()).collect();
            (header, rows)
        }
        DecodedValue::Mapping(entries) => {
            let rows = entries
                .iter()
                .map(|(key, value)| vec![key.clone(), cell(value)])
                .collect();
            (vec!["KEY".to_string(), "VALUE".to_string()], rows)
        }
        DecodedValue::Scalar(text) => (vec!["VALUE".to_string()], vec![vec![text.clone()]]),
    }
}

fn cell(value: &DecodedValue) -> String {
    match value {
        DecodedValue::Scalar(text) => text.clone(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

fn pretty(value: &DecodedValue, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    match value {
        DecodedValue::Scalar(text) => {
            out.push_str(&format!("{indent}{text}\n"));
        }
        DecodedValue::Sequence(items) => {
            for item in items {
                match item {
                    DecodedValue::Scalar(text) => out.push_str(&format!("{indent}- {text}\n")),
                    nested => {
                        out.push_str(&format!("{indent}-\n"));
                        pretty(nested, depth + 1, out);
                    }
                }
            }
        }
        DecodedValue::Mapping(entries) => {
            for (key, entry) in entries {
                match entry {
                    DecodedValue::Scalar(text) => {
                        out.push_str(&format!("{indent}{key}: {text}\n"));
                    }
                    nested => {
                        out.push_str(&format!("{indent}{key}:\n"));
                        pretty(nested, depth + 1, out);
                    }
                }
            }
        }
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
