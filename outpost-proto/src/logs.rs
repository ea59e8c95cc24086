//! Re-leveling of log lines captured from a driver's byte streams.
//!
//! Drivers forward whatever their process writes to stdout/stderr. Two line
//! shapes carry an explicit level: a JSON object with `level` and `message`
//! fields, and a `[LEVEL]` text prefix. Everything else keeps the stream's
//! default level.

use serde::Deserialize;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn parse(level: &str) -> Option<Self> {
        match level.to_ascii_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct LeveledLine {
    level: String,
    message: String,
}

/// Extracts the level and message from one log line, falling back to
/// `default` when the line carries no recognizable level.
pub fn parse_line(line: &str, default: LogLevel) -> (LogLevel, String) {
    if let Ok(leveled) = serde_json::from_str::<LeveledLine>(line)
        && let Some(level) = LogLevel::parse(&leveled.level)
    {
        return (level, leveled.message);
    }

    if let Some(rest) = line.strip_prefix('[')
        && let Some((level, message)) = rest.split_once(']')
        && let Some(level) = LogLevel::parse(level)
    {
        return (level, message.trim_start().to_string());
    }

    (default, line.to_string())
}

/// Re-emits a captured driver log line at its parsed level.
pub fn emit(level: LogLevel, message: &str) {
    match level {
        LogLevel::Trace => tracing::trace!(target: "outpost::driver", "{message}"),
        LogLevel::Debug => tracing::debug!(target: "outpost::driver", "{message}"),
        LogLevel::Info => tracing::info!(target: "outpost::driver", "{message}"),
        LogLevel::Warn => tracing::warn!(target: "outpost::driver", "{message}"),
        LogLevel::Error => tracing::error!(target: "outpost::driver", "{message}"),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn json_lines_are_releveled() {
        let (level, message) = parse_line(
            r#"{"level":"warn","message":"low disk space"}"#,
            LogLevel::Info,
        );
        assert_eq!(level, LogLevel::Warn);
        assert_eq!(message, "low disk space");
    }

    #[test]
    fn bracket_prefixes_are_releveled() {
        let (level, message) = parse_line("[ERROR] connection refused", LogLevel::Info);
        assert_eq!(level, LogLevel::Error);
        assert_eq!(message, "connection refused");

        let (level, _) = parse_line("[debug] noisy detail", LogLevel::Info);
        assert_eq!(level, LogLevel::Debug);
    }

    #[test]
    fn unrecognized_lines_keep_the_default() {
        let (level, message) = parse_line("plain text", LogLevel::Error);
        assert_eq!(level, LogLevel::Error);
        assert_eq!(message, "plain text");

        // JSON without a known level keeps the default too.
        let (level, _) = parse_line(r#"{"level":"verbose","message":"m"}"#, LogLevel::Info);
        assert_eq!(level, LogLevel::Info);
    }
}
