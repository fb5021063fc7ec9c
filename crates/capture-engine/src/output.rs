//! Output file naming.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use movcap_common::error::MovcapResult;

const FILE_PREFIX: &str = "Capture-";
const FILE_EXTENSION: &str = "mov";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// The movie file a capture run writes to.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTarget {
    pub path: PathBuf,
    pub created_at: DateTime<Local>,
}

impl OutputTarget {
    /// Reserve a fresh path under `dir` for a capture started at `now`.
    ///
    /// The directory is created if missing. The file itself is not created;
    /// the muxer's file sink does that once the pipeline starts.
    pub fn create(dir: &Path, now: DateTime<Local>) -> MovcapResult<Self> {
        std::fs::create_dir_all(dir)?;

        let stem = file_stem(&now);
        let mut path = dir.join(format!("{stem}.{FILE_EXTENSION}"));
        let mut suffix = 1u32;
        while path.exists() {
            path = dir.join(format!("{stem}-{suffix}.{FILE_EXTENSION}"));
            suffix += 1;
        }

        tracing::debug!(path = %path.display(), "Reserved output path");
        Ok(Self {
            path,
            created_at: now,
        })
    }

    /// Whether a file name looks like one this module generates.
    pub fn is_capture_file_name(name: &str) -> bool {
        let Some(rest) = name.strip_prefix(FILE_PREFIX) else {
            return false;
        };
        let Some(stem) = rest.strip_suffix(".mov") else {
            return false;
        };
        // 19 chars: YYYY-MM-DD-HH-MM-SS
        if stem.len() < 19 || !stem.is_char_boundary(19) {
            return false;
        }
        let (timestamp, suffix) = stem.split_at(19);
        let timestamp_ok = chrono::NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT).is_ok();
        let suffix_ok = suffix.is_empty()
            || suffix
                .strip_prefix('-')
                .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()));
        timestamp_ok && suffix_ok
    }
}

fn file_stem(now: &DateTime<Local>) -> String {
    format!("{FILE_PREFIX}{}", now.format(TIMESTAMP_FORMAT))
}
