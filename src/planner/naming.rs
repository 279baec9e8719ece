//! Output file naming

use crate::domain::model::TimeRange;

/// `{base}_parca{NN}_{hh_mm_ss}_to_{hh_mm_ss}.{ext}`
///
/// The job number is zero-padded to at least two digits. Unique job numbers
/// keep names unique within a batch even for identical ranges.
pub fn output_file_name(base_name: &str, index: usize, range: &TimeRange, extension: &str) -> String {
    let extension = extension.trim().trim_start_matches('.');
    let extension = if extension.is_empty() { "mp4" } else { extension };
    format!(
        "{}_parca{:02}_{}_to_{}.{}",
        base_name,
        index,
        range.start().file_stamp(),
        range.end().file_stamp(),
        extension
    )
}
