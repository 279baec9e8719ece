//! Range text handling
//!
//! Turns free-form range expressions (`00:00-05:15`, `0:12 to 1:05`,
//! `2:00,2:45`, `10:00..12:34`) into validated `TimeRange`s, one line at a
//! time, collecting per-line errors instead of failing the whole import.

pub mod importer;
pub mod parser;

pub use importer::{import_file, import_ranges, ImportResult, LineError};
pub use parser::{parse_range, parse_timecode};
