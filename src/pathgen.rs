use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::format::StrftimeItems;
use chrono::NaiveDate;

use crate::date::MetaDateTime;
use crate::error::FormatError;

/// User-configured destination formats, validated at construction so
/// per-file formatting can never fail mid-run.
#[derive(Debug, Clone)]
pub struct DestFormat {
    sort: String,
    rename: Option<String>,
}

impl DestFormat {
    /// `sort` shapes the destination subdirectory; `rename`, when given,
    /// shapes the new filename.
    pub fn new(sort: &str, rename: Option<&str>) -> Result<Self, FormatError> {
        validate(sort)?;
        if let Some(fmt) = rename {
            validate(fmt)?;
        }
        Ok(Self {
            sort: sort.to_string(),
            rename: rename.map(str::to_string),
        })
    }

    /// Destination subdirectory relative to the destination root. Forward
    /// slashes in the formatted result separate path segments on every
    /// platform.
    pub fn dir_for(&self, dt: &MetaDateTime) -> PathBuf {
        let formatted = dt.local.format(&self.sort).to_string();
        formatted.split('/').filter(|seg| !seg.is_empty()).collect()
    }

    /// Destination filename: the original name when renaming is off,
    /// otherwise the formatted timestamp plus the lowercased original
    /// extension.
    pub fn filename_for(&self, dt: &MetaDateTime, original: &str) -> String {
        let Some(fmt) = &self.rename else {
            return original.to_string();
        };
        let ext = Path::new(original)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_lowercase()))
            .unwrap_or_default();
        format!("{}{}", dt.local.format(fmt), ext)
    }
}

/// Render a probe datetime through the format; rejects unknown
/// specifiers and specifiers naive datetimes cannot satisfy (e.g. %z).
fn validate(fmt: &str) -> Result<(), FormatError> {
    let probe = NaiveDate::from_ymd_opt(2000, 1, 1)
        .and_then(|d| d.and_hms_opt(1, 2, 3))
        .unwrap();
    let mut rendered = String::new();
    match write!(rendered, "{}", probe.format_with_items(StrftimeItems::new(fmt))) {
        Ok(()) => Ok(()),
        Err(_) => Err(FormatError {
            format: fmt.to_string(),
        }),
    }
}
