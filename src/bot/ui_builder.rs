//! UI Builder module for formatting reply messages

use crate::history::HistoryEntry;
use crate::localization::{t_args_lang, t_lang};
use crate::report::AnalysisReport;

/// Telegram rejects messages above 4096 UTF-16 code units; keep some headroom
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4000;

pub fn welcome_message(language_code: Option<&str>) -> String {
    format!(
        "👋 {}\n\n{}\n\n{}\n{}\n{}\n{}\n{}",
        t_lang("welcome-title", language_code),
        t_lang("welcome-description", language_code),
        t_lang("welcome-commands", language_code),
        t_lang("command-start", language_code),
        t_lang("command-help", language_code),
        t_lang("command-history", language_code),
        t_lang("command-clear", language_code)
    )
}

pub fn help_message(language_code: Option<&str>) -> String {
    [
        t_lang("help-title", language_code),
        [
            t_lang("help-step1", language_code),
            t_lang("help-step2", language_code),
            t_lang("help-step3", language_code),
        ]
        .join("\n"),
        t_lang("help-note", language_code),
    ]
    .join("\n\n")
}

/// Reply for a successful analysis
pub fn format_report(report: &AnalysisReport, language_code: Option<&str>) -> String {
    format!("{}\n{}", t_lang("report-header", language_code), report.text())
}

/// Numbered history listing, one blank line between entries
pub fn format_history(entries: &[HistoryEntry], language_code: Option<&str>) -> String {
    if entries.is_empty() {
        return t_lang("history-empty", language_code);
    }

    let listing = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| format!("{}. {}", i + 1, entry.report_text))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("{}\n\n{}", t_lang("history-title", language_code), listing)
}

pub fn format_too_large(size: u64, max: u64, language_code: Option<&str>) -> String {
    let size = human_size(size);
    let max = human_size(max);
    t_args_lang(
        "error-image-too-large",
        &[("size", size.as_str()), ("max", max.as_str())],
        language_code,
    )
}

pub fn format_too_many_pixels(width: u32, height: u32, max_pixels: u64, language_code: Option<&str>) -> String {
    let width = width.to_string();
    let height = height.to_string();
    let max = format!("{:.0}", max_pixels as f64 / 1_000_000.0);
    t_args_lang(
        "error-image-dimensions",
        &[("width", width.as_str()), ("height", height.as_str()), ("max", max.as_str())],
        language_code,
    )
}

pub fn human_size(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = 1024.0 * 1024.0;

    let bytes_f = bytes as f64;
    if bytes_f >= MIB {
        format!("{:.1} MB", bytes_f / MIB)
    } else if bytes_f >= KIB {
        format!("{:.1} KB", bytes_f / KIB)
    } else {
        format!("{bytes} B")
    }
}

/// Length as Telegram counts it
fn telegram_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Split a reply into chunks Telegram will accept
///
/// `max_units` is measured in UTF-16 code units. Splits on blank lines where
/// possible, so history entries stay whole unless a single entry is longer
/// than the limit.
pub fn split_message(text: &str, max_units: usize) -> Vec<String> {
    // Room for at least one character outside the basic plane
    let max_units = max_units.max(2);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for block in text.split("\n\n") {
        for piece in hard_split(block, max_units) {
            let piece_len = telegram_len(piece);
            if current_len > 0 && current_len + 2 + piece_len > max_units {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if current_len > 0 {
                current.push_str("\n\n");
                current_len += 2;
            }
            current.push_str(piece);
            current_len += piece_len;
        }
    }

    if !current.is_empty() || chunks.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn hard_split(block: &str, max_units: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut units = 0;

    for (idx, ch) in block.char_indices() {
        let width = ch.len_utf16();
        if units + width > max_units {
            pieces.push(&block[start..idx]);
            start = idx;
            units = 0;
        }
        units += width;
    }
    pieces.push(&block[start..]);
    pieces
}
