use assert_matches::assert_matches;
use regex::Regex;

use nwp_cache::error::NwpError;
use nwp_cache::index::{
    Band, ByteRange, ParseMode, parse_index, resolve_ranges, search, select_lines,
};

const FIXTURE: &str = "\
1:0:d=2024011512:REFC:entire atmosphere:6 hour fcst:
2:500:d=2024011512:RETOP:cloud top:6 hour fcst:
3:1200:d=2024011512:TMP:2 m above ground:6 hour fcst:
4:2048:d=2024011512:DPT:2 m above ground:6 hour fcst:
5:3100:d=2024011512:UGRD:10 m above ground:6 hour fcst:
";

fn band(line_number: u32, byte_offset: u64) -> Band {
    Band {
        line_number,
        byte_offset,
        timestamp: "d=2024011512".to_string(),
        variable: "TMP".to_string(),
        level: "surface".to_string(),
        forecast_type: "anl".to_string(),
    }
}

#[test]
fn parses_lines_in_order() {
    let bands = parse_index(FIXTURE, ParseMode::Lenient).unwrap();
    assert_eq!(bands.len(), 5);
    assert_eq!(
        bands.iter().map(|b| b.line_number).collect::<Vec<_>>(),
        vec![1, 2, 3, 4, 5]
    );
    assert_eq!(bands[2].byte_offset, 1200);
    assert_eq!(bands[2].timestamp, "d=2024011512");
    assert_eq!(bands[2].variable, "TMP");
    assert_eq!(bands[2].level, "2 m above ground");
    assert_eq!(bands[2].forecast_type, "6 hour fcst");
}

#[test]
fn short_trailing_line_is_dropped() {
    let text = format!("{FIXTURE}6:4000:d=2024011512\n");
    let bands = parse_index(&text, ParseMode::Lenient).unwrap();
    assert_eq!(bands.len(), 5);
}

#[test]
fn short_line_fails_in_strict_mode() {
    let text = format!("{FIXTURE}6:4000:d=2024011512\n");
    let err = parse_index(&text, ParseMode::Strict).unwrap_err();
    assert_matches!(err, NwpError::ShortIndexLine { line: 6 });
}

#[test]
fn blank_lines_are_skipped() {
    let text = format!("\n{FIXTURE}\n\n");
    let bands = parse_index(&text, ParseMode::Strict).unwrap();
    assert_eq!(bands.len(), 5);
}

#[test]
fn non_numeric_offset_is_fatal() {
    let text = "1:0:d=2024011512:REFC:entire atmosphere:6 hour fcst:\n\
                2:abc:d=2024011512:TMP:2 m above ground:6 hour fcst:\n";
    for mode in [ParseMode::Lenient, ParseMode::Strict] {
        let err = parse_index(text, mode).unwrap_err();
        assert_matches!(err, NwpError::MalformedIndexLine { line: 2, .. });
    }
}

#[test]
fn non_numeric_line_number_is_fatal() {
    let text = "x:0:d=2024011512:REFC:entire atmosphere:6 hour fcst:\n";
    let err = parse_index(text, ParseMode::Lenient).unwrap_err();
    assert_matches!(err, NwpError::MalformedIndexLine { line: 1, .. });
}

#[test]
fn two_band_selection_ranges() {
    let reference = vec![band(1, 0), band(2, 500), band(3, 1200)];
    let selected = vec![band(1, 0), band(2, 500)];
    let ranges = resolve_ranges(&selected, &reference).unwrap();
    assert_eq!(
        ranges,
        vec![
            ByteRange {
                start: 0,
                stop: Some(500)
            },
            ByteRange {
                start: 500,
                stop: Some(1200)
            },
        ]
    );
    assert_eq!(ranges[0].to_string(), "[0,499]");
    assert_eq!(ranges[1].to_string(), "[500,1199]");
    assert_eq!(ranges[1].header_value(), "bytes=500-1199");
}

#[test]
fn ranges_keep_caller_order_and_duplicates() {
    let reference = vec![band(1, 0), band(2, 500), band(3, 1200)];
    let selected = vec![band(3, 1200), band(1, 0), band(3, 1200)];
    let ranges = resolve_ranges(&selected, &reference).unwrap();
    assert_eq!(ranges.len(), 3);
    assert_eq!(ranges[0], ByteRange { start: 1200, stop: None });
    assert_eq!(ranges[1].start, 0);
    assert_eq!(ranges[2], ranges[0]);
}

#[test]
fn ranges_use_reference_offsets() {
    // The selected copy carries a stale offset; the reference list decides.
    let reference = vec![band(1, 0), band(2, 640), band(3, 1200)];
    let ranges = resolve_ranges(&[band(2, 500)], &reference).unwrap();
    assert_eq!(ranges[0], ByteRange { start: 640, stop: Some(1200) });
}

#[test]
fn decreasing_offset_is_rejected() {
    let reference = vec![band(1, 0), band(2, 900), band(3, 500)];
    let err = resolve_ranges(&[band(2, 900)], &reference).unwrap_err();
    assert_matches!(err, NwpError::MalformedIndexLine { line: 3, .. });

    // Bands before the bad line still resolve.
    let ranges = resolve_ranges(&[band(1, 0)], &reference).unwrap();
    assert_eq!(ranges[0], ByteRange { start: 0, stop: Some(900) });
}

#[test]
fn equal_offsets_give_an_empty_range() {
    let reference = vec![band(1, 0), band(2, 500), band(3, 500)];
    let ranges = resolve_ranges(&[band(2, 500)], &reference).unwrap();
    assert!(ranges[0].is_empty());
}

#[test]
fn ranges_serialize_with_inclusive_last() {
    let closed = serde_json::to_value(ByteRange { start: 0, stop: Some(500) }).unwrap();
    assert_eq!(closed, serde_json::json!({"start": 0, "last": 499}));
    let open = serde_json::to_value(ByteRange { start: 1200, stop: None }).unwrap();
    assert_eq!(open, serde_json::json!({"start": 1200, "last": null}));
}

#[test]
fn select_lines_keeps_requested_order() {
    let bands = parse_index(FIXTURE, ParseMode::Lenient).unwrap();
    let selected = select_lines(&bands, &[4, 1, 4]).unwrap();
    assert_eq!(
        selected.iter().map(|b| b.line_number).collect::<Vec<_>>(),
        vec![4, 1, 4]
    );
    assert_matches!(select_lines(&bands, &[6]), Err(NwpError::BandNotFound(6)));
    assert_matches!(select_lines(&bands, &[]), Err(NwpError::EmptySelection));
}

#[test]
fn missing_band_is_reported() {
    let reference = vec![band(1, 0), band(2, 500)];
    let err = resolve_ranges(&[band(7, 9000)], &reference).unwrap_err();
    assert_matches!(err, NwpError::BandNotFound(7));
}

#[test]
fn empty_selection_is_rejected() {
    let reference = vec![band(1, 0)];
    let err = resolve_ranges(&[], &reference).unwrap_err();
    assert_matches!(err, NwpError::EmptySelection);
}

#[test]
fn search_matches_variable_and_level() {
    let bands = parse_index(FIXTURE, ParseMode::Lenient).unwrap();
    let pattern = Regex::new(":(TMP|DPT):2 m above ground:").unwrap();
    let found = search(&bands, &pattern);
    assert_eq!(
        found.iter().map(|b| b.line_number).collect::<Vec<_>>(),
        vec![3, 4]
    );
}
