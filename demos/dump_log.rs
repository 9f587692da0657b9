//! Prints one line per interval of an interval log: tag, start and end (ms since the epoch),
//! total count, max and 99.9th percentile.
use std::io::{self, Write};
use std::process;

use clap::{App, Arg};

use hdrhistogram_log::{HistogramLogReader, LogFormat, ReaderOptions};

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_writer(io::stderr)
        .init();

    let matches = App::new("hdrhistogram-log dump")
        .arg(
            Arg::with_name("log")
                .help("Interval log to read")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("legacy")
                .short("l")
                .long("legacy")
                .help("Read the legacy untagged format"),
        )
        .arg(
            Arg::with_name("tag")
                .short("t")
                .long("tag")
                .takes_value(true)
                .help("Only print intervals with this tag"),
        )
        .get_matches();

    if let Err(e) = dump(
        matches.value_of("log").unwrap_or_default(),
        matches.is_present("legacy"),
        matches.value_of("tag"),
    ) {
        eprintln!("{}", e);
        process::exit(1);
    }
}

fn dump(path: &str, legacy: bool, tag: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let format = if legacy {
        LogFormat::Legacy
    } else {
        LogFormat::Current
    };
    let file = io::BufReader::new(std::fs::File::open(path)?);
    let mut reader: HistogramLogReader<_> = ReaderOptions::new().with_format(format).reader(file);

    let stdout = io::stdout();
    let mut out = stdout.lock();

    for interval in reader.histograms::<u64>() {
        let interval = interval?;
        if tag.is_some() && interval.tag() != tag {
            continue;
        }

        let h = interval.histogram();
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}",
            interval.tag().unwrap_or("-"),
            interval.start_timestamp_ms(),
            interval.end_timestamp_ms(),
            h.len(),
            h.max(),
            h.value_at_quantile(0.999)
        )?;
    }

    tracing::info!(start_time_secs = reader.start_time_secs(), "done");
    Ok(())
}
