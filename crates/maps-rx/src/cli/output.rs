//! CLI output formatting utilities.
//!
//! - Replay reports as aligned, colored lines
//! - JSON with syntax highlighting

use std::fmt::Write as _;

use colored::Colorize;
use serde_json::Value;

use crate::replay::{Delivery, ReplayReport};
use crate::slots::SlotRelease;

const INDENT: &str = "  ";

/// Prints JSON with syntax highlighting.
///
/// Colors:
/// - Keys: Cyan
/// - Strings: Green
/// - Numbers: Yellow
/// - Booleans/Null: Magenta
pub fn print_highlighted_json(value: &Value) {
    let mut out = String::new();
    highlight(value, 0, &mut out);
    println!("{out}");
}

fn highlight(value: &Value, depth: usize, out: &mut String) {
    let pad = INDENT.repeat(depth);
    let inner = INDENT.repeat(depth + 1);
    match value {
        Value::Null => out.push_str(&"null".magenta().to_string()),
        Value::Bool(flag) => out.push_str(&flag.to_string().magenta().to_string()),
        Value::Number(number) => out.push_str(&number.to_string().yellow().to_string()),
        Value::String(text) => out.push_str(&quoted(text).green().to_string()),
        Value::Array(items) if items.is_empty() => out.push_str("[]"),
        Value::Array(items) => {
            out.push_str(&"[".bold().to_string());
            for (i, item) in items.iter().enumerate() {
                out.push_str(if i == 0 { "\n" } else { ",\n" });
                out.push_str(&inner);
                highlight(item, depth + 1, out);
            }
            let _ = write!(out, "\n{pad}{}", "]".bold());
        }
        Value::Object(fields) if fields.is_empty() => out.push_str("{}"),
        Value::Object(fields) => {
            out.push_str(&"{".bold().to_string());
            for (i, (key, field)) in fields.iter().enumerate() {
                out.push_str(if i == 0 { "\n" } else { ",\n" });
                let _ = write!(out, "{inner}{}: ", quoted(key).cyan());
                highlight(field, depth + 1, out);
            }
            let _ = write!(out, "\n{pad}{}", "}".bold());
        }
    }
}

fn quoted(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{text}\""))
}

/// Prints a replay report.
///
/// ```text
/// #1 map-click      {"latitude":1.5,"longitude":2.5}
///
/// Slots (release: Unconditional)
///   map-click        occupied  installs 2  clears 0
/// ```
pub fn print_report(report: &ReplayReport, release: SlotRelease) {
    if report.deliveries.is_empty() {
        println!("{}", "No events delivered.".dimmed());
    }
    for delivery in &report.deliveries {
        println!("{}", format_delivery(delivery));
    }

    if report.slots.is_empty() {
        return;
    }
    println!("\n{} (release: {release:?})", "Slots".bold());
    for slot in &report.slots {
        let state = if slot.occupied { "occupied".green() } else { "empty".dimmed() };
        println!(
            "{INDENT}{:<20} {:<9} installs {}  clears {}",
            slot.kind.as_str(),
            state,
            slot.installs,
            slot.clears
        );
    }
}

fn format_delivery(delivery: &Delivery) -> String {
    let id = format!("#{}", delivery.subscription);
    let payload = match &delivery.payload {
        Value::Null => String::new(),
        other => other.to_string(),
    };
    format!("{} {:<20} {}", id.cyan(), delivery.kind.as_str().bold(), payload)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::surface::EventKind;

    #[test]
    fn test_highlight_plain_structure() {
        colored::control::set_override(false);
        let mut out = String::new();
        highlight(&json!({ "a": [1, true], "b": null, "c": {} }), 0, &mut out);
        assert_eq!(out, "{\n  \"a\": [\n    1,\n    true\n  ],\n  \"b\": null,\n  \"c\": {}\n}");
    }

    #[test]
    fn test_highlight_escapes_strings() {
        colored::control::set_override(false);
        let mut out = String::new();
        highlight(&json!("say \"hi\""), 0, &mut out);
        assert_eq!(out, r#""say \"hi\"""#);
    }

    #[test]
    fn test_unit_payload_prints_nothing() {
        colored::control::set_override(false);
        let line = format_delivery(&Delivery {
            subscription: 3,
            kind: EventKind::CameraIdle,
            payload: Value::Null,
        });
        assert_eq!(line.trim_end(), "#3 camera-idle");
    }
}
