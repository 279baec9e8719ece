// Unit tests for domain models

use super::*;
use crate::domain::errors::ParseErrorKind;

#[test]
fn test_time_spec_equivalent_representations() {
    let bare = TimeSpec::parse("65").unwrap();
    let short = TimeSpec::parse("1:05").unwrap();
    let long = TimeSpec::parse("0:01:05").unwrap();
    assert_eq!(bare, TimeSpec::from_components(0, 1, 5, 0));
    assert_eq!(bare, short);
    assert_eq!(short, long);
}

#[test]
fn test_time_spec_parse_fraction() {
    assert_eq!(TimeSpec::parse("12.5").unwrap().as_millis(), 12_500);
    assert_eq!(TimeSpec::parse("01:30.25").unwrap().as_millis(), 90_250);
    assert_eq!(
        TimeSpec::parse("01:02:03.456").unwrap(),
        TimeSpec::from_components(1, 2, 3, 456)
    );
    // rounding on the fourth fractional digit
    assert_eq!(TimeSpec::parse("0.1235").unwrap().as_millis(), 124);
    assert_eq!(TimeSpec::parse("0.1234").unwrap().as_millis(), 123);
}

#[test]
fn test_time_spec_leading_component_unbounded() {
    assert_eq!(TimeSpec::parse("90:00").unwrap().as_seconds(), 5400.0);
    assert_eq!(TimeSpec::parse("125").unwrap().as_seconds(), 125.0);
}

#[test]
fn test_time_spec_parse_invalid() {
    assert_eq!(TimeSpec::parse("  "), Err(ParseErrorKind::Empty));
    assert!(matches!(
        TimeSpec::parse("abc"),
        Err(ParseErrorKind::NonNumeric(_))
    ));
    assert!(matches!(
        TimeSpec::parse("-10"),
        Err(ParseErrorKind::Negative(_))
    ));
    assert!(matches!(
        TimeSpec::parse("1:-5"),
        Err(ParseErrorKind::Negative(_))
    ));
    assert!(matches!(
        TimeSpec::parse("1:2:3:4"),
        Err(ParseErrorKind::TooManyComponents(_))
    ));
    assert!(matches!(
        TimeSpec::parse("1:60"),
        Err(ParseErrorKind::ComponentOutOfRange { unit: "seconds", .. })
    ));
    assert!(matches!(
        TimeSpec::parse("1:60:00"),
        Err(ParseErrorKind::ComponentOutOfRange { unit: "minutes", .. })
    ));
    assert!(TimeSpec::parse("1.").is_err());
    assert!(TimeSpec::parse("1:").is_err());
    assert!(TimeSpec::parse("1e3").is_err());
}

#[test]
fn test_time_spec_format_round_trip() {
    for millis in [0, 999, 65_000, 3_723_456, 36_000_001] {
        let time = TimeSpec::from_millis(millis);
        let reparsed = TimeSpec::parse(&time.format_hms()).unwrap();
        assert_eq!(reparsed, time, "round trip of {}", time);
    }
}

#[test]
fn test_time_spec_display_and_stamp() {
    let time = TimeSpec::from_components(1, 2, 3, 456);
    assert_eq!(time.to_string(), "01:02:03.456");
    assert_eq!(time.file_stamp(), "01_02_03");
    assert_eq!(TimeSpec::from_seconds(315.0).file_stamp(), "00_05_15");
}

#[test]
fn test_time_spec_from_seconds_clamps_negative() {
    assert_eq!(TimeSpec::from_seconds(-3.0), TimeSpec::ZERO);
    assert_eq!(TimeSpec::from_seconds(f64::NAN), TimeSpec::ZERO);
    assert_eq!(TimeSpec::from_seconds(1.2346).as_millis(), 1_235);
}

#[test]
fn test_time_range_requires_increasing_bounds() {
    let five = TimeSpec::from_millis(5_000);
    let ten = TimeSpec::from_millis(10_000);
    assert!(TimeRange::new(five, ten).is_ok());
    assert!(matches!(
        TimeRange::new(ten, five),
        Err(ParseErrorKind::NotIncreasing { .. })
    ));
    assert!(TimeRange::new(five, five).is_err());
}

#[test]
fn test_time_range_clamp_and_overlap() {
    let range = TimeRange::new(TimeSpec::from_millis(500), TimeSpec::from_millis(2_000)).unwrap();
    let clamped = range.clamp_to(TimeSpec::from_millis(1_000)).unwrap();
    assert_eq!(clamped.end(), TimeSpec::from_millis(1_000));
    assert_eq!(clamped.duration(), TimeSpec::from_millis(500));
    assert!(range.clamp_to(TimeSpec::from_millis(500)).is_none());

    let later = TimeRange::new(TimeSpec::from_millis(2_000), TimeSpec::from_millis(3_000)).unwrap();
    let inside = TimeRange::new(TimeSpec::from_millis(1_000), TimeSpec::from_millis(1_500)).unwrap();
    assert!(!range.overlaps(&later));
    assert!(range.overlaps(&inside));
    assert!(inside.overlaps(&range));
}

#[test]
fn test_extraction_mode_parse() {
    assert_eq!("fast".parse::<ExtractionMode>(), Ok(ExtractionMode::Fast));
    assert_eq!("Copy".parse::<ExtractionMode>(), Ok(ExtractionMode::Fast));
    assert_eq!("ACCURATE".parse::<ExtractionMode>(), Ok(ExtractionMode::Precise));
    assert!("hybrid".parse::<ExtractionMode>().is_err());
}

#[test]
fn test_source_base_name() {
    let source = SourceVideo::new("/videos/lecture.week1.mp4", TimeSpec::ZERO);
    assert_eq!(source.base_name(), "lecture.week1");
}

#[test]
fn test_job_state_transitions() {
    let range = TimeRange::new(TimeSpec::ZERO, TimeSpec::from_millis(1_000)).unwrap();
    let source = Arc::new(SourceVideo::new("in.mp4", TimeSpec::from_millis(5_000)));
    let mut job = ExtractionJob::new(
        1,
        range,
        PathBuf::from("out.mp4"),
        ExtractionMode::Fast,
        EncodingOptions::default(),
        source,
    );
    assert_eq!(job.state(), JobState::Pending);
    assert!(!job.transition(JobState::Succeeded));
    assert!(job.transition(JobState::Running));
    assert!(job.transition(JobState::Failed));
    assert!(!job.transition(JobState::Running));
    assert_eq!(job.state(), JobState::Failed);
}
