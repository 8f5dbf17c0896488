use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use modlink_frame::{code_name, is_reserved, CompositeMessage};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
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

/// Field/value rows shown by the table and pretty formats.
pub type Rows = Vec<(&'static str, String)>;

pub fn print_report<T: Serialize>(report: &T, rows: Rows, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(report).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            for (field, value) in rows {
                table.add_row(vec![field.to_string(), value]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for (field, value) in rows {
                println!("{field}={value}");
            }
        }
    }
}

/// `200 (COMPOSITE)` for reserved codes, the bare number otherwise.
pub fn describe_code(code: i32) -> String {
    if is_reserved(code) {
        format!("{code} ({})", code_name(code))
    } else {
        code.to_string()
    }
}

/// Best-effort rendering of a composite value whose type is unknown.
pub fn value_preview(message: &CompositeMessage, key: &str) -> String {
    let Some(bytes) = message.data().get(key) else {
        return String::new();
    };

    if let Ok(text) = message.get::<String>(key) {
        if text.len() + 8 == bytes.len() {
            return text;
        }
    }
    match bytes.len() {
        8 => message.get::<i64>(key).map(|v| v.to_string()).unwrap_or_default(),
        4 => message.get::<i32>(key).map(|v| v.to_string()).unwrap_or_default(),
        1 => message.get::<bool>(key).map(|v| v.to_string()).unwrap_or_default(),
        len => format!("<binary {len} bytes>"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_code_names_reserved_codes() {
        assert_eq!(describe_code(200), "200 (COMPOSITE)");
        assert_eq!(describe_code(-1), "-1 (SHUTDOWN)");
        assert_eq!(describe_code(42), "42");
    }

    #[test]
    fn value_preview_guesses_common_types() {
        let mut message = CompositeMessage::new(200);
        message.set("greeting", "Hello").unwrap();
        message.set("age", &45_i64).unwrap();
        message.set("flag", &true).unwrap();
        message.set("blob", &[1_u8, 2, 3]).unwrap();

        assert_eq!(value_preview(&message, "greeting"), "Hello");
        assert_eq!(value_preview(&message, "age"), "45");
        assert_eq!(value_preview(&message, "flag"), "true");
        assert_eq!(value_preview(&message, "blob"), "<binary 3 bytes>");
        assert_eq!(value_preview(&message, "missing"), "");
    }
}
