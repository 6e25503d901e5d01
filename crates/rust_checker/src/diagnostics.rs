//! Classification of rustc diagnostic output.
//!
//! Used only for logging and for picking a best-effort fallback. Whether a
//! candidate compiled is decided by the exit status alone.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagnosticSummary {
    pub errors: usize,
    pub warnings: usize,
}

impl DiagnosticSummary {
    pub fn is_clean(&self) -> bool {
        self.errors == 0 && self.warnings == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Error,
    Warning,
}

/// Level of a diagnostic header line such as `error[E0425]: ...` or
/// `warning: unused variable`. Trailing summary lines are not diagnostics.
fn header_level(line: &str) -> Option<Level> {
    let (level, rest) = if let Some(rest) = line.strip_prefix("error") {
        (Level::Error, rest)
    } else if let Some(rest) = line.strip_prefix("warning") {
        (Level::Warning, rest)
    } else {
        return None;
    };

    if !(rest.starts_with(':') || rest.starts_with('[')) {
        return None;
    }
    let message = rest.trim_start_matches(|c| c != ':').trim_start_matches(':').trim();
    if message.starts_with("aborting due to")
        || (level == Level::Warning && message.ends_with("emitted"))
    {
        return None;
    }
    Some(level)
}

pub fn summarize(stderr: &str) -> DiagnosticSummary {
    let mut summary = DiagnosticSummary::default();
    for line in stderr.lines() {
        match header_level(line) {
            Some(Level::Error) => summary.errors += 1,
            Some(Level::Warning) => summary.warnings += 1,
            None => {}
        }
    }
    summary
}

/// At least one warning and no error diagnostics.
pub fn is_warnings_only(stderr: &str) -> bool {
    let summary = summarize(stderr);
    summary.errors == 0 && summary.warnings > 0
}

/// Error headers with their location and source snippet lines, for logs.
/// Falls back to the whole output when no error header is present.
pub fn extract_key_errors(error_output: &str) -> String {
    let mut key_errors = Vec::new();
    let mut in_error = false;

    for line in error_output.lines() {
        if line.starts_with("error") {
            in_error = header_level(line) == Some(Level::Error);
            if in_error {
                key_errors.push(line);
            }
        } else if line.starts_with("warning") {
            in_error = false;
        } else if in_error {
            let trimmed = line.trim_start();
            if trimmed.starts_with("-->") || trimmed.starts_with('|') || trimmed.starts_with('=') {
                key_errors.push(line);
            } else if trimmed
                .split_once('|')
                .is_some_and(|(num, _)| num.trim().chars().all(|c| c.is_ascii_digit()))
            {
                key_errors.push(line);
            }
        }
    }

    if key_errors.is_empty() {
        error_output.to_string()
    } else {
        key_errors.join("\n")
    }
}
