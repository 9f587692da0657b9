#![feature(test)]

extern crate test;

use hdrhistogram::serialization::interval_log::IntervalLogWriterBuilder;
use hdrhistogram::serialization::{V2DeflateSerializer, V2Serializer};
use hdrhistogram::Histogram;
use hdrhistogram_log::{HistogramLogReader, TimeWindow};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::time;
use test::Bencher;

#[bench]
fn read_log_1k_hist_10k_value(b: &mut Bencher) {
    let log = random_log(&mut V2Serializer::new());

    b.iter(|| {
        let mut reader = HistogramLogReader::new(log.as_slice());

        assert_eq!(1000, reader.histograms::<u64>().map(|r| r.unwrap()).count());
    })
}

#[bench]
fn read_deflate_log_1k_hist_10k_value(b: &mut Bencher) {
    let log = random_log(&mut V2DeflateSerializer::new());

    b.iter(|| {
        let mut reader = HistogramLogReader::new(log.as_slice());

        assert_eq!(1000, reader.histograms::<u64>().map(|r| r.unwrap()).count());
    })
}

#[bench]
fn skip_log_1k_hist_10k_value_outside_window(b: &mut Bencher) {
    let log = random_log(&mut V2Serializer::new());

    b.iter(|| {
        let mut reader = HistogramLogReader::new(log.as_slice());

        // nothing is decoded
        assert_eq!(
            0,
            reader
                .histograms::<u64>()
                .within(TimeWindow::offset_from_start(10_000.0, 20_000.0))
                .count()
        );
    })
}

fn random_log<S: hdrhistogram::serialization::Serializer>(serializer: &mut S) -> Vec<u8> {
    let mut rng = SmallRng::seed_from_u64(1);
    let mut log = Vec::new();

    {
        let mut writer = IntervalLogWriterBuilder::new()
            .with_start_time(time::UNIX_EPOCH + time::Duration::from_secs(1_500_000_000))
            .begin_log_with(&mut log, serializer)
            .unwrap();

        for i in 0..1000 {
            let mut h = Histogram::<u64>::new_with_bounds(1, u64::max_value(), 3).unwrap();

            for _ in 0..10_000 {
                h.record(rng.gen_range(1..1_000_000_000)).unwrap();
            }

            writer
                .write_histogram(
                    &h,
                    time::Duration::from_secs(i),
                    time::Duration::from_secs(1),
                    None,
                )
                .unwrap();
        }
    }

    log
}
