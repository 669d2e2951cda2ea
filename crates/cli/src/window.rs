//! Candidate publish buckets for the interval-generation feeds.
//!
//! Providers publish every 15 minutes (`:00/:15/:30/:45`), sometimes a
//! minute or more late, under a directory named
//! `{yyyy}_{mm}_{dd}_{hh}_{minute}_{modifier}` with modifier `00` or `30`.
//! For each offset `o` we guess the latest quarter-hour-plus-`o` bucket
//! that has already started.

use chrono::{DateTime, Datelike, Timelike, Utc};

/// Sub-minute suffixes tried for every minute bucket.
pub const MODIFIERS: [&str; 2] = ["00", "30"];

/// Minute bucket for `minute` under `offset`: the largest of
/// `{0, 15, 30, 45} + offset` not after `minute`, else `offset` itself.
pub fn minute_bucket(minute: u32, offset: u32) -> u32 {
    [45, 30, 15]
        .into_iter()
        .map(|base| base + offset)
        .find(|&bucket| minute >= bucket)
        .unwrap_or(offset)
}

/// Finite, non-restartable iterator over the candidate bucket strings for
/// one instant. Yields `(max_offset + 1) * 2` strings, offset-major.
#[derive(Debug)]
pub struct TimeWindow {
    prefix: String,
    minute: u32,
    max_offset: u32,
    offset: u32,
    modifier: usize,
}

impl TimeWindow {
    pub fn new(now: DateTime<Utc>, max_offset: u32) -> Self {
        Self {
            prefix: format!(
                "{:04}_{:02}_{:02}_{:02}",
                now.year(),
                now.month(),
                now.day(),
                now.hour()
            ),
            minute: now.minute(),
            max_offset,
            offset: 0,
            modifier: 0,
        }
    }
}

impl Iterator for TimeWindow {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.offset > self.max_offset {
            return None;
        }
        let bucket = minute_bucket(self.minute, self.offset);
        let out = format!("{}_{:02}_{}", self.prefix, bucket, MODIFIERS[self.modifier]);

        self.modifier += 1;
        if self.modifier == MODIFIERS.len() {
            self.modifier = 0;
            self.offset += 1;
        }
        Some(out)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.offset > self.max_offset {
            0
        } else {
            (self.max_offset - self.offset + 1) as usize * MODIFIERS.len() - self.modifier
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for TimeWindow {}

/// Every candidate bucket for `now`, collected.
pub fn build_time_buckets(now: DateTime<Utc>, max_offset: u32) -> Vec<String> {
    TimeWindow::new(now, max_offset).collect()
}
