use super::*;

use crate::line::{LEGACY_LEGEND, LEGEND};
use hdrhistogram::serialization::{Serializer, V2Serializer};
use hdrhistogram::Histogram;

/// An empty 1..u64::max_value() histogram with 3 significant figures, V2 serialized.
const EMPTY_V2: &str = "HISTEwAAAAEAAAAAAAAAAwAAAAAAAAAB//////////8/8AAAAAAAAAA=";

fn reader_for(log: &str) -> HistogramLogReader<&[u8]> {
    HistogramLogReader::new(log.as_bytes())
}

fn encoded_with_value(value: u64) -> String {
    let mut h = Histogram::<u64>::new_with_bounds(1, u64::max_value(), 3).unwrap();
    h.record(value).unwrap();
    let mut buf = Vec::new();
    let _ = V2Serializer::new().serialize(&h, &mut buf).unwrap();
    base64::encode_config(&buf, base64::STANDARD)
}

#[test]
fn absolute_time_inferred_from_epoch_like_timestamp() {
    let log = format!("1000000000.0,1.0,0,{}\n", EMPTY_V2);
    let mut reader = reader_for(&log);

    let h = reader.histograms::<u64>().next().unwrap().unwrap();

    assert_eq!(0.0, reader.base_time_secs());
    assert_eq!(1_000_000_000_000, h.start_timestamp_ms());
    assert_eq!(1_000_000_001_000, h.end_timestamp_ms());
}

#[test]
fn zero_timestamp_without_directives_is_not_relative() {
    let log = format!("0.0,1.0,0,{}\n", EMPTY_V2);
    let mut reader = reader_for(&log);

    let h = reader.histograms::<u64>().next().unwrap().unwrap();

    assert_eq!(0.0, reader.start_time_secs());
    assert_eq!(0.0, reader.base_time_secs());
    assert_eq!(0, h.start_timestamp_ms());
}

#[test]
fn relative_time_inferred_from_start_time_directive() {
    let log = format!(
        "#[StartTime: 1700000000.000 (seconds since epoch)]\n0.0,1.0,0,{}\n",
        EMPTY_V2
    );
    let mut reader = reader_for(&log);

    let h = reader.histograms::<u64>().next().unwrap().unwrap();

    assert_eq!(1_700_000_000.0, reader.base_time_secs());
    assert_eq!(1_700_000_000_000, h.start_timestamp_ms());
}

#[test]
fn base_time_directive_wins_over_heuristic() {
    let log = format!(
        "#[BaseTime: 1500000000.000 (seconds since epoch)]\n1000000000.0,1.0,0,{}\n",
        EMPTY_V2
    );
    let mut reader = reader_for(&log);

    let h = reader.histograms::<u64>().next().unwrap().unwrap();

    assert_eq!(1_500_000_000.0, reader.base_time_secs());
    assert_eq!(2_500_000_000_000, h.start_timestamp_ms());
}

#[test]
fn tags() {
    let log = format!(
        "Tag=checkout,0.0,1.0,500,{p}\nTag=,0.0,1.0,500,{p}\n0.0,1.0,500,{p}\n",
        p = EMPTY_V2
    );
    let mut reader = reader_for(&log);

    let tags = reader
        .histograms::<u64>()
        .map(|r| r.unwrap().tag().map(str::to_owned))
        .collect::<Vec<Option<String>>>();

    assert_eq!(vec![Some("checkout".to_owned()), None, None], tags);
}

#[test]
fn legend_then_one_interval() {
    let log = format!("{}\n0.0,1.0,0,{}\n", LEGEND, EMPTY_V2);
    let mut reader = reader_for(&log);

    assert_eq!(
        1,
        reader.histograms::<u64>().map(|r| r.unwrap()).count()
    );
}

#[test]
fn comments_are_ignored() {
    let log = format!(
        "#I'm a comment\n#[MaxValueDivisor: 1000.000]\n0.0,1.0,0,{}\n#trailing\n",
        EMPTY_V2
    );
    let mut reader = reader_for(&log);

    assert_eq!(
        1,
        reader.histograms::<u64>().map(|r| r.unwrap()).count()
    );
}

#[test]
fn malformed_second_interval_is_fatal() {
    let log = format!(
        "0.0,1.0,0,{p}\n1.0,1.0,{p}\n2.0,1.0,0,{p}\n",
        p = EMPTY_V2
    );
    let mut reader = reader_for(&log);
    let mut iter = reader.histograms::<u64>();

    assert!(iter.next().unwrap().is_ok());
    match iter.next() {
        Some(Err(ReadError::MalformedDataLine { line_number: 2 })) => {}
        r => panic!("unexpected result {:?}", r.map(|r| r.map(|h| h.start_timestamp_ms()))),
    }
    assert!(iter.next().is_none());
    assert!(iter.next().is_none());
}

#[test]
fn malformed_directive_is_fatal() {
    let log = format!("#[StartTime: 17000 ...\n0.0,1.0,0,{}\n", EMPTY_V2);
    let mut reader = reader_for(&log);
    let mut iter = reader.histograms::<u64>();

    match iter.next() {
        Some(Err(ReadError::MalformedDirective { line_number: 1 })) => {}
        r => panic!("unexpected result {:?}", r.map(|r| r.map(|h| h.start_timestamp_ms()))),
    }
    assert!(iter.next().is_none());
}

#[test]
fn bad_payload_is_fatal() {
    let log = format!("0.0,1.0,0,{}\n1.0,1.0,0,notBase64!\n", EMPTY_V2);
    let mut reader = reader_for(&log);
    let mut iter = reader.histograms::<u64>();

    assert!(iter.next().unwrap().is_ok());
    match iter.next() {
        Some(Err(ReadError::PayloadDecode { line_number: 2, .. })) => {}
        r => panic!("unexpected result {:?}", r.map(|r| r.map(|h| h.start_timestamp_ms()))),
    }
    assert!(iter.next().is_none());
}

#[test]
fn end_minus_start() {
    let log = format!("5.0,2.5,0,{}\n", EMPTY_V2);
    let mut reader = reader_for(&log);

    let h = reader.histograms::<u64>().next().unwrap().unwrap();

    assert_eq!(2500, h.end_timestamp_ms() - h.start_timestamp_ms());
}

#[test]
fn legacy_rejects_current_legend() {
    let log = format!("{}\n0.0,1.0,0,{}\n", LEGEND, EMPTY_V2);
    let mut reader = reader_for(&log);
    let mut iter = reader.legacy_histograms::<u64>();

    match iter.next() {
        Some(Err(ReadError::MalformedDataLine { line_number: 1 })) => {}
        r => panic!("unexpected result {:?}", r.map(|r| r.map(|h| h.start_timestamp_ms()))),
    }
}

#[test]
fn current_rejects_legacy_legend() {
    let log = format!("{}\n0.0,1.0,0,{}\n", LEGACY_LEGEND, EMPTY_V2);
    let mut reader = reader_for(&log);

    assert!(reader.histograms::<u64>().next().unwrap().is_err());
}

#[test]
fn legacy_reads_legacy_log() {
    let log = format!(
        "#[StartTime: 1700000000.000 ...\n{}\n0.5,2.0,0,{p}\n2.5,2.0,0,{p}\n",
        LEGACY_LEGEND,
        p = EMPTY_V2
    );
    let mut reader = reader_for(&log);

    let ranges = reader
        .legacy_histograms::<u64>()
        .map(|r| r.unwrap())
        .map(|h| (h.start_timestamp_ms(), h.end_timestamp_ms()))
        .collect::<Vec<(i64, i64)>>();

    assert_eq!(
        vec![
            (1_700_000_000_500, 1_700_000_002_500),
            (1_700_000_002_500, 1_700_000_004_500)
        ],
        ranges
    );
}

#[test]
fn decodes_histogram_contents() {
    let log = format!("0.0,1.0,0,{}\n", encoded_with_value(12345));
    let mut reader = reader_for(&log);

    let h = reader.histograms::<u64>().next().unwrap().unwrap();

    assert_eq!(1, h.histogram().len());
    assert_eq!(1, h.histogram().count_at(12345));
}

#[test]
fn start_time_before_any_pull_is_epoch() {
    let log = format!("1000000000.0,1.0,0,{}\n", EMPTY_V2);
    let mut reader = reader_for(&log);

    {
        let iter = reader.histograms::<u64>();
        assert_eq!(time::UNIX_EPOCH, iter.start_time());
    }

    assert_eq!(time::UNIX_EPOCH, reader.start_time());
}

#[test]
fn start_time_after_pull() {
    let log = format!("1000000000.5,1.0,0,{}\n", EMPTY_V2);
    let mut reader = reader_for(&log);

    let mut iter = reader.histograms::<u64>();
    let _ = iter.next().unwrap().unwrap();
    assert_eq!(1_000_000_000.5, iter.start_time_secs());

    assert_eq!(
        time::UNIX_EPOCH + time::Duration::from_millis(1_000_000_000_500),
        reader.start_time()
    );
}

#[test]
fn start_time_of_empty_log_is_epoch() {
    let mut reader = reader_for("#nothing here\n");

    assert_eq!(0, reader.histograms::<u64>().count());
    assert_eq!(time::UNIX_EPOCH, reader.start_time());
}

#[test]
fn start_time_directive_without_intervals() {
    let mut reader = reader_for("#[StartTime: 1700000000.250 ...\n");

    assert_eq!(0, reader.histograms::<u64>().count());
    assert_eq!(1_700_000_000.25, reader.start_time_secs());
}

#[test]
fn repeated_directive_last_wins() {
    let log = format!(
        "#[StartTime: 1600000000.000 ...\n#[StartTime: 1700000000.000 ...\n0.0,1.0,0,{}\n",
        EMPTY_V2
    );
    let mut reader = reader_for(&log);

    let h = reader.histograms::<u64>().next().unwrap().unwrap();

    assert_eq!(1_700_000_000_000, h.start_timestamp_ms());
}

#[test]
fn second_session_continues_from_stream_position_with_fresh_state() {
    let log = format!(
        "#[StartTime: 1700000000.000 ...\n0.0,1.0,0,{p}\n1000000000.0,1.0,0,{p}\n",
        p = EMPTY_V2
    );
    let mut reader = reader_for(&log);

    {
        let mut first = reader.histograms::<u64>();
        let h = first.next().unwrap().unwrap();
        assert_eq!(1_700_000_000_000, h.start_timestamp_ms());
    }

    let rest = reader
        .histograms::<u64>()
        .map(|r| r.unwrap())
        .collect::<Vec<_>>();

    // the StartTime line was consumed by the first session, so this one infers absolute time
    assert_eq!(1, rest.len());
    assert_eq!(1_000_000_000_000, rest[0].start_timestamp_ms());
    assert_eq!(1_000_000_000.0, reader.start_time_secs());
}

#[test]
fn reading_is_lazy() {
    // the second payload is garbage but is never reached
    let log = format!("0.0,1.0,0,{}\n1.0,1.0,0,garbage!\n", EMPTY_V2);
    let mut reader = reader_for(&log);

    {
        let mut iter = reader.histograms::<u64>();
        assert!(iter.next().unwrap().is_ok());
    }

    let mut rest = String::new();
    let _ = io::Read::read_to_string(&mut reader.into_inner(), &mut rest).unwrap();
    assert_eq!("1.0,1.0,0,garbage!\n", rest);
}

#[test]
fn byte_order_mark_is_skipped() {
    let log = format!("\u{feff}#[StartTime: 1700000000.000 ...\n0.0,1.0,0,{}\n", EMPTY_V2);
    let mut reader = reader_for(&log);

    let h = reader.histograms::<u64>().next().unwrap().unwrap();

    assert_eq!(1_700_000_000_000, h.start_timestamp_ms());
}

#[test]
fn crlf_line_endings() {
    let log = format!(
        "#[StartTime: 1700000000.000 ...\r\n{}\r\nTag=a,0.0,1.0,0,{}\r\n",
        LEGEND, EMPTY_V2
    );
    let mut reader = reader_for(&log);

    let h = reader.histograms::<u64>().next().unwrap().unwrap();

    assert_eq!(Some("a"), h.tag());
    assert_eq!(1_700_000_000_000, h.start_timestamp_ms());
}

#[test]
fn last_line_without_newline() {
    let log = format!("0.0,1.0,0,{}", EMPTY_V2);
    let mut reader = reader_for(&log);

    assert_eq!(
        1,
        reader.histograms::<u64>().map(|r| r.unwrap()).count()
    );
}

#[test]
fn invalid_utf8_is_io_error() {
    let log: &[u8] = b"#ok\n\xff\xfe,1.0\n";
    let mut reader = HistogramLogReader::new(log);

    match reader.histograms::<u64>().next() {
        Some(Err(ReadError::Io(_))) => {}
        r => panic!("unexpected result {:?}", r.map(|r| r.map(|h| h.start_timestamp_ms()))),
    }
}

#[test]
fn window_from_options() {
    let log = format!(
        "#[StartTime: 1700000000.000 ...\n0.0,1.0,0,{p}\n1.0,1.0,0,{p}\n2.0,1.0,0,{p}\n3.0,1.0,0,garbage!\n",
        p = EMPTY_V2
    );
    let mut reader = ReaderOptions::new()
        .with_window(TimeWindow::offset_from_start(1.0, 2.0))
        .reader(log.as_bytes());

    let starts = reader
        .histograms::<u64>()
        .map(|r| r.unwrap().start_timestamp_ms())
        .collect::<Vec<i64>>();

    // the interval after the window ends the session before its payload is decoded
    assert_eq!(vec![1_700_000_001_000, 1_700_000_002_000], starts);
}

#[test]
fn window_skips_without_decoding() {
    let log = format!(
        "0.0,1.0,0,garbage!\n1000000000.0,1.0,0,{}\n",
        EMPTY_V2
    );
    let mut reader = reader_for(&log);

    let starts = reader
        .histograms::<u64>()
        .within(TimeWindow::absolute(1.0, 2_000_000_000.0))
        .map(|r| r.unwrap().start_timestamp_ms())
        .collect::<Vec<i64>>();

    assert_eq!(vec![1_000_000_000_000], starts);
}

#[test]
fn options_floor_is_applied() {
    let log = format!("0.0,1.0,0,{}\n", encoded_with_value(100));
    let mut h = Histogram::<u64>::new_with_bounds(1, 1000, 3).unwrap();
    h.record(100).unwrap();
    let mut buf = Vec::new();
    let _ = V2Serializer::new().serialize(&h, &mut buf).unwrap();
    let narrow = format!("0.0,1.0,0,{}\n", base64::encode_config(&buf, base64::STANDARD));

    let mut reader = ReaderOptions::new()
        .with_min_bar_for_highest_trackable_value(1_000_000)
        .reader(narrow.as_bytes());
    let decoded = reader.histograms::<u64>().next().unwrap().unwrap();
    assert!(decoded.histogram().high() >= 1_000_000);
    assert_eq!(1, decoded.histogram().count_at(100));

    // already wide enough
    let mut reader = ReaderOptions::new()
        .with_min_bar_for_highest_trackable_value(1_000_000)
        .reader(log.as_bytes());
    let decoded = reader.histograms::<u64>().next().unwrap().unwrap();
    assert_eq!(u64::max_value(), decoded.histogram().high());
}

#[test]
fn options_format_selects_grammar() {
    let log = format!("{}\n0.0,1.0,0,{}\n", LEGACY_LEGEND, EMPTY_V2);
    let mut reader = ReaderOptions::new()
        .with_format(LogFormat::Legacy)
        .reader(log.as_bytes());

    assert_eq!(LogFormat::Legacy, reader.options().format);
    assert_eq!(
        1,
        reader.histograms::<u64>().map(|r| r.unwrap()).count()
    );
}

#[test]
fn options_from_json() {
    let options: ReaderOptions = serde_json::from_str(
        r#"{
            "format": "legacy",
            "window": { "start_secs": 1.0, "end_secs": 2.0, "reference": "offset_from_start" }
        }"#,
    )
    .unwrap();

    assert_eq!(LogFormat::Legacy, options.format);
    assert_eq!(0, options.min_bar_for_highest_trackable_value);
    assert_eq!(Some(TimeWindow::offset_from_start(1.0, 2.0)), options.window);

    let defaults: ReaderOptions = serde_json::from_str("{}").unwrap();
    assert_eq!(ReaderOptions::default(), defaults);
}
