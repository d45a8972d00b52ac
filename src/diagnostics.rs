use std::io::IsTerminal as _;

use crate::error::Error;

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Print a tool failure to stderr, with the `Error:` line in bold on a terminal.
pub fn print_error(message: &str) {
    let styled = std::io::stderr().is_terminal();
    for line in message.lines() {
        if styled && line.starts_with("Error:") {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render a failure in the `Error: <kind>: <detail>` boundary convention,
/// followed by a fix hint for the errors that have an obvious one.
pub fn render_error(e: &Error) -> String {
    let mut out = format!("Error: {}: {e}", e.kind());
    if let Some(hint) = hint(e) {
        out.push_str("\n\n");
        out.push_str(hint);
    }
    return out;
}

/// Next step for errors the caller can fix directly.
fn hint(e: &Error) -> Option<&'static str> {
    return match e {
        Error::DocsNotFound { .. } => {
            Some("Pass `docs_path` explicitly, or run `docmgr_bootstrap` to create a documentation directory.")
        },
        Error::InvalidCommitHash { .. } => Some("Pass a commit hash such as the output of `git rev-parse --short HEAD`."),
        Error::LockFailed { .. } => Some("Another docmgr process may be writing the same artifact. Retry when it finishes."),
        Error::TooManyPatterns { .. } => Some("Merge related patterns with `**` globs to stay within the limit."),
        Error::FileNotFound { path } if path.ends_with("repo-baseline.json") => {
            Some("Run `docmgr_initialize_memory` to record a baseline first.")
        },
        Error::FileNotFound { .. }
        | Error::GitFailed { .. }
        | Error::InvalidPath { .. }
        | Error::InvalidPattern { .. }
        | Error::InvalidRequest { .. }
        | Error::Io(_)
        | Error::Json(_)
        | Error::ParseFailed { .. }
        | Error::UnknownTool { .. }
        | Error::UnsupportedLanguage { .. }
        | Error::Yaml(_) => None,
    };
}
