//! Classification of ZFS tool diagnostics into typed failures.
//!
//! The tool's diagnostics are stable in structure but version-dependent
//! in exact wording. All pattern matching lives here so a tool-version
//! adaptation touches one place; diagnostics that match no rule become
//! [`Error::Unclassified`] rather than a guess.

use std::process::ExitStatus;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::Error;

static BAD_PROP_GET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"bad property list: invalid property '.+'$").expect("Invalid regex pattern")
});

static BAD_PROP_SET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"cannot set property for '.+': invalid property '.+'$")
        .expect("Invalid regex pattern")
});

static NEEDS_RECURSIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"cannot destroy '.+': filesystem has children$").expect("Invalid regex pattern")
});

static NOT_FOUND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"cannot open '.+': dataset does not exist$").expect("Invalid regex pattern")
});

static NOT_MOUNTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^filesystem successfully created, but not mounted").expect("Invalid regex pattern")
});

static NEEDS_ELEVATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"need sudo").expect("Invalid regex pattern"));

static ALREADY_EXISTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"fs .+ already exists$").expect("Invalid regex pattern"));

static PROMOTE_NOT_CLONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"cannot promote '.+': not a cloned filesystem$").expect("Invalid regex pattern")
});

static INVALID_DATASET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"invalid( dataset)? name$").expect("Invalid regex pattern"));

static RECEIVER_EXISTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"cannot receive new filesystem stream: destination '.+' exists$")
        .expect("Invalid regex pattern")
});

static INCREMENTAL_BASE_MISMATCH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"cannot receive incremental stream: most recent snapshot of '.+' does not")
        .expect("Invalid regex pattern")
});

static BROKEN_PIPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"broken pipe$").expect("Invalid regex pattern"));

/// Maps the exit status and captured stderr of a failed command to a
/// typed error.
///
/// The diagnostic is split into lines; a leading generic exit-status
/// marker is dropped when other lines remain, as is one trailing empty
/// line. The first line and, independently, the last line are then
/// tested against the ordered rule set; the first match wins.
pub(crate) fn classify(status: ExitStatus, stderr: &[u8]) -> Error {
    let text = if stderr.is_empty() {
        status.to_string()
    } else {
        String::from_utf8_lossy(stderr).into_owned()
    };

    let mut lines: Vec<&str> = text.split('\n').collect();

    if lines[0].contains("exit status") && lines.len() > 1 {
        lines.remove(0);
    }

    if lines.len() > 1 && lines[lines.len() - 1].is_empty() {
        lines.pop();
    }

    let first = lines[0];
    let last = lines[lines.len() - 1];

    if let Some(line) = matched(&BAD_PROP_GET, first, last) {
        return Error::BadPropertyGet(line.to_string());
    }
    if let Some(line) = matched(&BAD_PROP_SET, first, last) {
        return Error::BadPropertySet(line.to_string());
    }
    if let Some(line) = matched(&NEEDS_RECURSIVE, first, last) {
        return Error::NeedsRecursive(line.to_string());
    }
    if let Some(line) = matched(&NOT_FOUND, first, last) {
        return Error::NotFound(line.to_string());
    }
    if let Some(line) = matched(&NOT_MOUNTED, first, last) {
        return Error::NotMountedNeedsElevation(format!("{line} need sudo to mount"));
    }
    if let Some(line) = matched(&NEEDS_ELEVATION, first, last) {
        return Error::NeedsElevation(line.to_string());
    }
    if let Some(line) = matched(&ALREADY_EXISTS, first, last) {
        return Error::AlreadyExists(line.to_string());
    }
    if let Some(line) = matched(&PROMOTE_NOT_CLONE, first, last) {
        return Error::PromoteNotClone(line.to_string());
    }
    if let Some(line) = matched(&INVALID_DATASET, first, last) {
        return Error::InvalidDatasetName(line.to_string());
    }
    if let Some(line) = matched(&RECEIVER_EXISTS, first, last) {
        return Error::ReceiverAlreadyExists(line.to_string());
    }
    if matched(&INCREMENTAL_BASE_MISMATCH, first, last).is_some() {
        return Error::IncrementalBaseMismatch(lines.join(" "));
    }
    if let Some(line) = matched(&BROKEN_PIPE, first, last) {
        return Error::BrokenPipe(line.to_string());
    }

    Error::Unclassified(lines.join("; "))
}

fn matched<'a>(rule: &Regex, first: &'a str, last: &'a str) -> Option<&'a str> {
    if rule.is_match(first) {
        Some(first)
    } else if rule.is_match(last) {
        Some(last)
    } else {
        None
    }
}
