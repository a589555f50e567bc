//! Epoch aggregation
//!
//! Per-second feature samples accumulate in 60-slot windows; at each
//! wall-clock minute boundary (once the warm-up period has passed) the
//! windows are averaged into one `FeatureVector`, clamped, and drained for
//! the next epoch.

use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::engine::FeatureSample;
use crate::types::FeatureVector;
use crate::window::HistoryWindow;

/// Upper bound applied to every feature before emission.
pub const FEATURE_CLAMP: f64 = 140_700_000.0;

/// Seconds of features accumulated per epoch.
pub const EPOCH_SECONDS: usize = 60;

/// Variance cycles required before the first epoch may close.
const WARMUP_CYCLES: u32 = 10;

/// Detects wall-clock minute boundaries, including hour, day, month and
/// year rollovers.
#[derive(Debug, Default)]
pub struct BoundaryClock {
    last: Option<NaiveDateTime>,
}

impl BoundaryClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when `now` falls in a later minute than the previous
    /// observation. The first observation never fires.
    pub fn observe(&mut self, now: NaiveDateTime) -> bool {
        let boundary = match self.last {
            None => false,
            Some(prev) => {
                now.year() != prev.year()
                    || now.month() != prev.month()
                    || now.day() != prev.day()
                    || now.hour() != prev.hour()
                    || now.minute() != prev.minute()
            }
        };
        self.last = Some(now);
        boundary
    }
}

/// Accumulates per-second samples and emits one averaged vector per minute.
pub struct EpochAggregator {
    windows: [HistoryWindow; 24],
    clock: BoundaryClock,
    variance_cycles: u32,
}

impl Default for EpochAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl EpochAggregator {
    pub fn new() -> Self {
        Self {
            windows: std::array::from_fn(|_| HistoryWindow::new(EPOCH_SECONDS)),
            clock: BoundaryClock::new(),
            variance_cycles: 0,
        }
    }

    pub fn is_warmed(&self) -> bool {
        self.variance_cycles >= WARMUP_CYCLES
    }

    /// Ingest one second of features; returns the closed epoch's averaged
    /// vector when `now` crosses a minute boundary after warm-up.
    pub fn push(&mut self, sample: &FeatureSample, now: NaiveDateTime) -> Option<FeatureVector> {
        let fields = [
            sample.breath,
            sample.heart,
            sample.bmi,
            sample.deep_p,
            sample.ada_br,
            sample.ada_hr,
            sample.var_rpm,
            sample.var_hpm,
            sample.rem_parameter,
            sample.mov_dens,
            sample.lf,
            sample.hf,
            sample.lfhf,
            sample.s_hf,
            sample.s_lfhf,
            sample.tf_rsa,
            sample.tm_hr,
            sample.sf_rsa,
            sample.sm_hr,
            sample.sdf_rsa,
            sample.sdm_hr,
            sample.stf_rsa,
            sample.stm_hr,
            sample.time,
        ];
        for (window, value) in self.windows.iter_mut().zip(fields) {
            if let Some(value) = value {
                window.push(value);
            }
        }

        if sample.var_rpm.is_some() && self.variance_cycles < WARMUP_CYCLES {
            self.variance_cycles += 1;
        }

        if !(self.clock.observe(now) && self.is_warmed()) {
            return None;
        }

        let mut means = [0.0; 24];
        for (mean, window) in means.iter_mut().zip(&mut self.windows) {
            *mean = window.mean().unwrap_or(0.0);
            window.reset();
        }
        let vector = FeatureVector {
            breath: means[0],
            heart: means[1],
            bmi: means[2],
            deep_p: means[3],
            ada_br: means[4],
            ada_hr: means[5],
            var_rpm: means[6],
            var_hpm: means[7],
            rem_parameter: means[8],
            mov_dens: means[9],
            lf: means[10],
            hf: means[11],
            lfhf: means[12],
            s_hf: means[13],
            s_lfhf: means[14],
            tf_rsa: means[15],
            tm_hr: means[16],
            sf_rsa: means[17],
            sm_hr: means[18],
            sdf_rsa: means[19],
            sdm_hr: means[20],
            stf_rsa: means[21],
            stm_hr: means[22],
            time: means[23],
        };
        Some(vector.clamped(FEATURE_CLAMP))
    }
}
