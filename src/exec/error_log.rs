// src/exec/error_log.rs

//! Turning the runner's error log into something a user can read.

const ERROR_HEADER: &str = "ERROR log from processor";
const FRAME_PREFIX: &str = "+-";

/// Cut a runner log down to the framed error block:
///
/// ```text
/// ERROR log from processor convert_to_decimal_degrees:
/// +--------
/// | Traceback ...
/// | ValueError: bad input
/// +--------
/// ```
///
/// Purely cosmetic: if the header or either frame line is missing the log
/// is returned unchanged.
pub fn trim_error_log(log: &str) -> String {
    let lines: Vec<&str> = log.lines().collect();

    let Some(header) = lines.iter().position(|l| l.contains(ERROR_HEADER)) else {
        return log.to_string();
    };
    let Some(open) = find_frame(&lines, header + 1) else {
        return log.to_string();
    };
    let Some(close) = find_frame(&lines, open + 1) else {
        return log.to_string();
    };

    lines[header..=close].join("\n")
}

fn find_frame(lines: &[&str], from: usize) -> Option<usize> {
    lines
        .iter()
        .skip(from)
        .position(|l| l.trim_start().starts_with(FRAME_PREFIX))
        .map(|offset| from + offset)
}

/// Human-readable error text for a failed run.
pub fn render_error_text(error_log: &[String], verbose: bool) -> String {
    let joined = error_log.join("\n");
    if verbose {
        joined
    } else {
        trim_error_log(&joined)
    }
}
