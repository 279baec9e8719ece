//! Line-oriented range import

use std::path::Path;

use tracing::{debug, info};

use crate::domain::errors::ParseError;
use crate::domain::model::TimeRange;
use crate::error::ParcaResult;
use crate::ranges::parser::parse_range;

/// A rejected line, numbered from 1 as in the source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineError {
    pub line_number: usize,
    pub error: ParseError,
}

/// Ranges in file order plus every line that failed to parse
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportResult {
    pub ranges: Vec<TimeRange>,
    pub errors: Vec<LineError>,
}

impl ImportResult {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

fn is_skipped(line: &str) -> bool {
    line.is_empty() || line.starts_with('#')
}

/// Import one range per line; blank lines and `#` comments are ignored.
///
/// A bad line never aborts the import. Ranges are neither sorted nor
/// deduplicated.
pub fn import_ranges(text: &str) -> ImportResult {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut result = ImportResult::default();

    for (offset, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if is_skipped(line) {
            continue;
        }
        let line_number = offset + 1;
        match parse_range(line) {
            Ok(range) => result.ranges.push(range),
            Err(error) => {
                debug!(line = line_number, %error, "Skipping unparsable range line");
                result.errors.push(LineError { line_number, error });
            }
        }
    }

    result
}

/// Read a range file and import it; invalid UTF-8 is replaced, not rejected
pub fn import_file(path: &Path) -> ParcaResult<ImportResult> {
    let bytes = std::fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    let result = import_ranges(&text);
    info!(
        path = %path.display(),
        ranges = result.ranges.len(),
        errors = result.errors.len(),
        "Imported range file"
    );
    Ok(result)
}
