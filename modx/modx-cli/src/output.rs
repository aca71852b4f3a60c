//! Terminal output.
//!
//! Status messages and notifications go to stderr. Command results (`header`,
//! `kv`, tree lines, file content) go to stdout so they can be piped.

use console::style;
use modx_core::traits::{Notifier, NotifyLevel};
use modx_tree::TreeLabel;
use std::fmt::Display;
use tracing::debug;

/// Print a success message
pub fn success(msg: impl Display) {
    eprintln!("{} {}", style("✓").green().bold(), msg);
}

/// Print an error message
pub fn error(msg: impl Display) {
    eprintln!("{} {}", style("✗").red().bold(), style(msg).red());
}

/// Print a warning message
pub fn warning(msg: impl Display) {
    eprintln!("{} {}", style("⚠").yellow().bold(), style(msg).yellow());
}

/// Print an info message
pub fn info(msg: impl Display) {
    eprintln!("{} {}", style("ℹ").blue().bold(), msg);
}

/// Print a section header
pub fn header(msg: impl Display) {
    println!("\n{}", style(msg).bold().underlined());
}

/// Print a key-value pair
pub fn kv(key: impl Display, value: impl Display) {
    println!("  {}: {}", style(key).cyan(), value);
}

/// Split a label around its highlight. Out-of-range spans are clamped.
pub fn split_label(label: &TreeLabel) -> (String, String, String) {
    let chars: Vec<char> = label.text.chars().collect();
    let Some(range) = &label.highlight else {
        return (label.text.clone(), String::new(), String::new());
    };
    let start = range.start.min(chars.len());
    let end = range.end.clamp(start, chars.len());
    (
        chars[..start].iter().collect(),
        chars[start..end].iter().collect(),
        chars[end..].iter().collect(),
    )
}

/// Label text with the highlighted part in bold.
pub fn render_label(label: &TreeLabel) -> String {
    let (before, matched, after) = split_label(label);
    if matched.is_empty() {
        return label.text.clone();
    }
    format!("{}{}{}", before, style(matched).bold(), after)
}

/// Prints notifications: yellow warnings, red errors.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, level: NotifyLevel, message: &str) {
        match level {
            NotifyLevel::Info => info(message),
            NotifyLevel::Warning => warning(message),
            NotifyLevel::Error => error(message),
        }
    }

    fn set_context(&self, key: &str, value: bool) {
        debug!("context {} = {}", key, value);
    }
}
