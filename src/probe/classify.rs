//! Maps transport failures to canonical metric-kind labels.

use std::io;

use super::ProbeError;

/// Produce the metric kind for a failed round. An OS-level "connection
/// refused" wins over the operation label, any other OS-level cause is
/// `unknown_syscall_error`, an operation-tagged failure without an OS
/// cause is `<op>_error`, and anything else is `unknown_error`. A
/// timeout appends `_timeout` to whichever label was produced.
pub fn classify(error: &ProbeError) -> String {
    match error {
        ProbeError::Timeout { op, .. } => format!("{op}_error_timeout"),
        ProbeError::Io { op, source } => {
            let mut kind = if source.kind() == io::ErrorKind::ConnectionRefused {
                "connection_refused_error".to_string()
            } else if source.raw_os_error().is_some() {
                "unknown_syscall_error".to_string()
            } else {
                format!("{op}_error")
            };
            if is_timeout(source) {
                kind.push_str("_timeout");
            }
            kind
        }
        ProbeError::Unclassified { source } => {
            let mut kind = "unknown_error".to_string();
            if is_timeout(source) {
                kind.push_str("_timeout");
            }
            kind
        }
    }
}

fn is_timeout(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}
