use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serde_json::Value;
use sockrpc_params::ParamList;

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
struct AnswerOutput<'a> {
    endpoint: &'a str,
    method: &'a str,
    code: &'a str,
    answer: &'a ParamList,
    timestamp: String,
}

/// Print one RPC answer to stdout.
pub fn print_answer(endpoint: &str, method: &str, code: &str, answer: &ParamList, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = AnswerOutput {
                endpoint,
                method,
                code,
                answer,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            for (path, value) in flatten(answer) {
                table.add_row(vec![path, value]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{endpoint} {method} -> {code}");
            println!(
                "{}",
                serde_json::to_string_pretty(answer).unwrap_or_else(|_| "{}".to_string())
            );
        }
    }
}

/// Leaf values keyed by dotted path, in answer order.
fn flatten(list: &ParamList) -> Vec<(String, String)> {
    let mut rows = Vec::new();
    for (key, value) in list.iter() {
        flatten_into(key.clone(), value, &mut rows);
    }
    rows
}

fn flatten_into(path: String, value: &Value, rows: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, inner) in map {
                flatten_into(format!("{path}.{key}"), inner, rows);
            }
        }
        Value::String(text) => rows.push((path, text.clone())),
        other => rows.push((path, other.to_string())),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_walks_nested_objects() {
        let answer = ParamList::try_from(serde_json::json!({
            "result": {"code": "ok"},
            "time": 17,
            "tags": ["a", "b"],
        }))
        .expect("object should convert");

        assert_eq!(
            flatten(&answer),
            vec![
                ("result.code".to_string(), "ok".to_string()),
                ("time".to_string(), "17".to_string()),
                ("tags".to_string(), r#"["a","b"]"#.to_string()),
            ]
        );
    }
}
