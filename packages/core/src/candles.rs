//! Folds fee samples into fixed-width OHLC candles.
//!
//! Each sample contributes `base + priority` Gwei. A sample that snaps to the
//! tail candle's bucket is merged into it; any other sample opens a new
//! candle. Backdated samples are not reordered: they open their own candle
//! at the tail. History is capped at [`MAX_CANDLES`], oldest evicted first.

use std::collections::VecDeque;

use serde::Serialize;

use crate::fees::FeeSample;
use crate::time::UnixMillis;

pub const BUCKET_WIDTH_MILLIS: u64 = 15 * 60 * 1000;

/// Four days of 15-minute buckets.
pub const MAX_CANDLES: usize = 384;

pub fn snap_to_bucket(at: UnixMillis) -> UnixMillis {
    UnixMillis(at.as_u64() / BUCKET_WIDTH_MILLIS * BUCKET_WIDTH_MILLIS)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candle {
    pub bucket_start: UnixMillis,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub last_base_fee_gwei: f64,
    pub last_priority_fee_gwei: f64,
}

impl Candle {
    fn open_at(bucket_start: UnixMillis, sample: &FeeSample) -> Self {
        let value = sample.total_gwei();
        Self {
            bucket_start,
            open: value,
            high: value,
            low: value,
            close: value,
            last_base_fee_gwei: sample.base_fee_gwei,
            last_priority_fee_gwei: sample.priority_fee_gwei,
        }
    }

    fn merge(&mut self, sample: &FeeSample) {
        let value = sample.total_gwei();
        self.high = self.high.max(value);
        self.low = self.low.min(value);
        self.close = value;
        self.last_base_fee_gwei = sample.base_fee_gwei;
        self.last_priority_fee_gwei = sample.priority_fee_gwei;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Merged,
    Rolled,
}

/// Candle history for one network, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CandleSeries {
    candles: VecDeque<Candle>,
}

impl CandleSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, sample: &FeeSample) -> AppendOutcome {
        let bucket_start = snap_to_bucket(sample.observed_at);

        if let Some(tail) = self.candles.back_mut() {
            if tail.bucket_start == bucket_start {
                tail.merge(sample);
                return AppendOutcome::Merged;
            }
        }

        self.candles.push_back(Candle::open_at(bucket_start, sample));
        while self.candles.len() > MAX_CANDLES {
            self.candles.pop_front();
        }
        AppendOutcome::Rolled
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candle> + '_ {
        self.candles.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::NetworkId;

    fn sample(at: u64, base: f64, priority: f64) -> FeeSample {
        FeeSample::new(NetworkId::Ethereum, UnixMillis(at), base, priority)
    }

    fn assert_ordered(candle: &Candle) {
        assert!(candle.low <= candle.open && candle.open <= candle.high, "{candle:?}");
        assert!(candle.low <= candle.close && candle.close <= candle.high, "{candle:?}");
    }

    #[test]
    fn same_bucket_samples_merge_into_one_candle() {
        let mut series = CandleSeries::new();
        assert_eq!(series.append(&sample(0, 10.0, 1.0)), AppendOutcome::Rolled);
        assert_eq!(series.append(&sample(300_000, 12.0, 1.0)), AppendOutcome::Merged);
        assert_eq!(series.append(&sample(310_000, 8.0, 2.0)), AppendOutcome::Merged);

        assert_eq!(series.len(), 1);
        let candle = series.last().unwrap();
        assert_eq!(candle.bucket_start, UnixMillis(0));
        assert_eq!(candle.open, 11.0);
        assert_eq!(candle.high, 13.0);
        assert_eq!(candle.low, 10.0);
        assert_eq!(candle.close, 10.0);
        assert_eq!(candle.last_base_fee_gwei, 8.0);
        assert_eq!(candle.last_priority_fee_gwei, 2.0);
    }

    #[test]
    fn crossing_a_boundary_rolls_a_new_candle() {
        let mut series = CandleSeries::new();
        series.append(&sample(899_999, 5.0, 0.0));
        assert_eq!(series.append(&sample(900_000, 7.0, 0.0)), AppendOutcome::Rolled);

        let starts: Vec<_> = series.iter().map(|c| c.bucket_start).collect();
        assert_eq!(starts, vec![UnixMillis(0), UnixMillis(900_000)]);
        assert_eq!(series.last().unwrap().open, 7.0);
    }

    #[test]
    fn ordering_invariant_holds_after_every_merge() {
        let mut series = CandleSeries::new();
        let values = [20.0, 3.5, 44.0, 44.0, 0.0, 17.25, 9.0, 100.0, 1.0];
        for (i, value) in values.iter().enumerate() {
            series.append(&sample(1_000 * i as u64, *value, 0.0));
            assert_ordered(series.last().unwrap());
        }
        let candle = series.last().unwrap();
        assert_eq!((candle.open, candle.high, candle.low, candle.close), (20.0, 100.0, 0.0, 1.0));
    }

    #[test]
    fn redelivered_sample_is_idempotent() {
        let mut series = CandleSeries::new();
        series.append(&sample(60_000, 4.0, 1.0));
        series.append(&sample(120_000, 6.0, 1.0));
        let before = series.clone();
        series.append(&sample(120_000, 6.0, 1.0));
        assert_eq!(series, before);
    }

    #[test]
    fn snapping_is_idempotent_and_aligned() {
        for at in [0, 1, 899_999, 900_000, 1_700_000_123_456] {
            let snapped = snap_to_bucket(UnixMillis(at));
            assert_eq!(snapped.as_u64() % BUCKET_WIDTH_MILLIS, 0);
            assert!(snapped.as_u64() <= at);
            assert_eq!(snap_to_bucket(snapped), snapped);
        }
    }

    #[test]
    fn history_is_capped_and_evicts_oldest() {
        let mut series = CandleSeries::new();
        for i in 0..(MAX_CANDLES as u64 + 25) {
            series.append(&sample(i * BUCKET_WIDTH_MILLIS, i as f64, 0.0));
            assert!(series.len() <= MAX_CANDLES);
        }
        assert_eq!(series.len(), MAX_CANDLES);
        assert_eq!(series.iter().next().unwrap().bucket_start, UnixMillis(25 * BUCKET_WIDTH_MILLIS));
        assert_eq!(series.last().unwrap().open, (MAX_CANDLES + 24) as f64);
    }

    #[test]
    fn backdated_sample_opens_its_own_candle() {
        let mut series = CandleSeries::new();
        series.append(&sample(2 * BUCKET_WIDTH_MILLIS, 5.0, 0.0));
        assert_eq!(series.append(&sample(10, 9.0, 0.0)), AppendOutcome::Rolled);

        let starts: Vec<_> = series.iter().map(|c| c.bucket_start.as_u64()).collect();
        assert_eq!(starts, vec![2 * BUCKET_WIDTH_MILLIS, 0]);
    }

    #[test]
    fn serialises_as_a_plain_array() {
        let mut series = CandleSeries::new();
        series.append(&sample(0, 1.0, 0.5));
        let json = serde_json::to_value(&series).unwrap();
        assert_eq!(json[0]["bucket_start"], 0);
        assert_eq!(json[0]["open"], 1.5);
    }
}
