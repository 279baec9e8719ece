//! Timecode and range expression parsing

use crate::domain::errors::{ParseError, ParseErrorKind};
use crate::domain::model::{TimeRange, TimeSpec};

/// Range delimiters, tried in this order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delimiter {
    Dash,
    DotDot,
    Comma,
    Word,
}

const DELIMITERS: [Delimiter; 4] = [
    Delimiter::Dash,
    Delimiter::DotDot,
    Delimiter::Comma,
    Delimiter::Word,
];

impl Delimiter {
    fn label(&self) -> &'static str {
        match self {
            Delimiter::Dash => "-",
            Delimiter::DotDot => "..",
            Delimiter::Comma => ",",
            Delimiter::Word => "to",
        }
    }

    /// Split `line` around this delimiter.
    ///
    /// `Ok(None)` when the delimiter does not occur, an error when it occurs
    /// more than once.
    fn split(&self, line: &str) -> Result<Option<(String, String)>, ParseErrorKind> {
        match self {
            Delimiter::Word => split_on_word(line),
            _ => {
                let symbol = self.label();
                match line.matches(symbol).count() {
                    0 => Ok(None),
                    1 => Ok(line
                        .split_once(symbol)
                        .map(|(left, right)| (left.to_string(), right.to_string()))),
                    _ => Err(ParseErrorKind::AmbiguousDelimiter(symbol.to_string())),
                }
            }
        }
    }
}

/// `to` only counts as a delimiter when it stands alone between whitespace
fn split_on_word(line: &str) -> Result<Option<(String, String)>, ParseErrorKind> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let positions: Vec<usize> = tokens
        .iter()
        .enumerate()
        .filter(|(_, token)| token.eq_ignore_ascii_case("to"))
        .map(|(position, _)| position)
        .collect();

    match positions.as_slice() {
        [] => Ok(None),
        [position] => Ok(Some((
            tokens[..*position].join(" "),
            tokens[position + 1..].join(" "),
        ))),
        _ => Err(ParseErrorKind::AmbiguousDelimiter("to".to_string())),
    }
}

/// Parse a single timecode token (`hh:mm:ss[.ms]`, `mm:ss[.ms]` or `ss[.ms]`)
pub fn parse_timecode(token: &str) -> Result<TimeSpec, ParseError> {
    TimeSpec::parse(token).map_err(|reason| ParseError::new(token.trim(), reason))
}

/// Parse one range expression into a validated `TimeRange`
pub fn parse_range(line: &str) -> Result<TimeRange, ParseError> {
    let trimmed = line.trim();
    let fail = |reason: ParseErrorKind| ParseError::new(trimmed, reason);

    if trimmed.is_empty() {
        return Err(fail(ParseErrorKind::Empty));
    }

    let mut halves = None;
    for delimiter in DELIMITERS {
        if let Some(split) = delimiter.split(trimmed).map_err(fail)? {
            halves = Some(split);
            break;
        }
    }

    // Plain whitespace between two timecodes
    let (start, end) = match halves {
        Some(split) => split,
        None => match trimmed.split_whitespace().collect::<Vec<_>>().as_slice() {
            [start, end] => (start.to_string(), end.to_string()),
            _ => return Err(fail(ParseErrorKind::MissingDelimiter)),
        },
    };

    let start = TimeSpec::parse(&start).map_err(fail)?;
    let end = TimeSpec::parse(&end).map_err(fail)?;
    TimeRange::new(start, end).map_err(fail)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(value: u64) -> TimeSpec {
        TimeSpec::from_millis(value * 1_000)
    }

    #[test]
    fn test_parse_range_every_delimiter() {
        let cases = [
            ("00:00-05:15", 0, 315),
            ("0:12 to 1:05", 12, 65),
            ("0:12 TO 1:05", 12, 65),
            ("2:00,2:45", 120, 165),
            ("10:00..12:34", 600, 754),
            ("  3 - 7  ", 3, 7),
            ("0:12 1:05", 12, 65),
        ];
        for (line, start, end) in cases {
            let range = parse_range(line).unwrap_or_else(|e| panic!("{}: {}", line, e));
            assert_eq!(range.start(), secs(start), "{}", line);
            assert_eq!(range.end(), secs(end), "{}", line);
        }
    }

    #[test]
    fn test_parse_range_rejects_non_increasing_for_every_delimiter() {
        for line in ["5-5", "6..5", "1:00,0:30", "2 to 1", "9 3"] {
            let err = parse_range(line).unwrap_err();
            assert!(
                matches!(err.reason, ParseErrorKind::NotIncreasing { .. }),
                "{}: {:?}",
                line,
                err
            );
        }
    }

    #[test]
    fn test_parse_range_ambiguous_delimiters() {
        assert_eq!(
            parse_range("1-2-3").unwrap_err().reason,
            ParseErrorKind::AmbiguousDelimiter("-".to_string())
        );
        assert_eq!(
            parse_range("1 to 2 to 3").unwrap_err().reason,
            ParseErrorKind::AmbiguousDelimiter("to".to_string())
        );
    }

    #[test]
    fn test_parse_range_word_must_stand_alone() {
        // "tomorrow" is not a delimiter and the line has no other separator
        let err = parse_range("1tomorrow2").unwrap_err();
        assert_eq!(err.reason, ParseErrorKind::MissingDelimiter);
    }

    #[test]
    fn test_parse_range_bad_timecodes() {
        assert!(matches!(
            parse_range("aa-bb").unwrap_err().reason,
            ParseErrorKind::NonNumeric(_)
        ));
        assert_eq!(parse_range("   ").unwrap_err().reason, ParseErrorKind::Empty);
        assert_eq!(
            parse_range("1 2 3").unwrap_err().reason,
            ParseErrorKind::MissingDelimiter
        );
    }

    #[test]
    fn test_parse_range_error_keeps_line_text() {
        let err = parse_range("  1:00 - x ").unwrap_err();
        assert_eq!(err.line, "1:00 - x");
    }

    #[test]
    fn test_parse_timecode() {
        assert_eq!(parse_timecode("1:05").unwrap(), secs(65));
        assert_eq!(parse_timecode(" q ").unwrap_err().line, "q");
    }
}
