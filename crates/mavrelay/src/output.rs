use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
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
struct Tagged<'a, T> {
    kind: &'a str,
    #[serde(flatten)]
    body: &'a T,
}

/// Print one result object. `kind` names it in JSON output.
pub fn print_report<T: Serialize>(kind: &str, report: &T, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&Tagged { kind, body: report })
                    .unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            for (field, value) in fields(report) {
                table.add_row(vec![field, value]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let line = fields(report)
                .into_iter()
                .map(|(field, value)| format!("{field}={value}"))
                .collect::<Vec<_>>()
                .join(" ");
            println!("{kind}: {line}");
        }
    }
}

/// Flatten a serialized value into dotted `field, value` pairs.
fn fields<T: Serialize>(report: &T) -> Vec<(String, String)> {
    let mut out = Vec::new();
    match serde_json::to_value(report) {
        Ok(Value::Object(map)) => flatten("", &map, &mut out),
        Ok(other) => out.push(("value".to_string(), scalar(&other))),
        Err(err) => out.push(("error".to_string(), err.to_string())),
    }
    out
}

fn flatten(prefix: &str, map: &Map<String, Value>, out: &mut Vec<(String, String)>) {
    for (key, value) in map {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Object(inner) => flatten(&name, inner, out),
            Value::Array(items) if items.iter().all(Value::is_object) && !items.is_empty() => {
                for (i, item) in items.iter().enumerate() {
                    if let Value::Object(inner) = item {
                        flatten(&format!("{name}[{i}]"), inner, out);
                    }
                }
            }
            other => out.push((name, scalar(other))),
        }
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Inner {
        rtt_us: u64,
    }

    #[derive(Serialize)]
    struct Outer {
        sent: u32,
        start: Option<u64>,
        side: Inner,
        replies: Vec<Inner>,
    }

    #[test]
    fn flattens_nested_reports() {
        let report = Outer {
            sent: 2,
            start: None,
            side: Inner { rtt_us: 7 },
            replies: vec![Inner { rtt_us: 1 }, Inner { rtt_us: 2 }],
        };
        let pairs = fields(&report);
        assert!(pairs.contains(&("sent".to_string(), "2".to_string())));
        assert!(pairs.contains(&("start".to_string(), "-".to_string())));
        assert!(pairs.contains(&("side.rtt_us".to_string(), "7".to_string())));
        assert!(pairs.contains(&("replies[1].rtt_us".to_string(), "2".to_string())));
    }

    #[test]
    fn json_carries_kind() {
        let value = serde_json::to_value(Tagged {
            kind: "ping-report",
            body: &Inner { rtt_us: 3 },
        })
        .unwrap();
        assert_eq!(value["kind"], "ping-report");
        assert_eq!(value["rtt_us"], 3);
    }
}
