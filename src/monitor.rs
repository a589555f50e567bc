//! Monitoring session orchestration
//!
//! `Monitor` wires the whole pipeline together: bytes from a [`Transport`]
//! are framed and decoded, raw channels accumulate in their history
//! windows, the per-second rate estimators and the feature engine run once
//! per wall-clock second, and closed epochs are classified and handed to
//! the [`EpochSink`].
//!
//! Epochs align to wall-clock minutes: the per-second pipeline holds off
//! until the first frame observed at `:00` seconds, so the first closed
//! epoch covers a whole minute.

use chrono::{NaiveDateTime, Timelike};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::classify::{RateTrustGate, SleepStageClassifier};
use crate::engine::FeatureEngine;
use crate::epoch::EpochAggregator;
use crate::error::VitalsError;
use crate::features;
use crate::frame::{FrameDecoder, VitalFrame, FRAME_LEN, FRAME_MAGIC};
use crate::rate::{RateEstimator, SensorAverages};
use crate::recorder::EpochSink;
use crate::transport::Transport;
use crate::types::{EpochRecord, RateChannel, RateEstimate};
use crate::window::HistoryWindow;

/// Samples held per raw channel window.
pub const CHANNEL_WINDOW: usize = 800;

const READ_CHUNK: usize = 2 * FRAME_LEN;

/// Raw-channel histories feeding the rate estimators.
struct ChannelWindows {
    phase: HistoryWindow,
    heart_fft: HistoryWindow,
    heart_xcorr: HistoryWindow,
    breath_fft: HistoryWindow,
    breath_xcorr: HistoryWindow,
    breath_sensor: HistoryWindow,
    heart_sensor: HistoryWindow,
}

impl ChannelWindows {
    fn new() -> Self {
        let make = || HistoryWindow::new(CHANNEL_WINDOW);
        Self {
            phase: make(),
            heart_fft: make(),
            heart_xcorr: make(),
            breath_fft: make(),
            breath_xcorr: make(),
            breath_sensor: make(),
            heart_sensor: make(),
        }
    }

    fn push(&mut self, frame: &VitalFrame) {
        self.phase.push(frame.phase_peak());
        self.heart_fft.push(frame.heart_fft());
        self.heart_xcorr.push(frame.heart_xcorr());
        self.breath_fft.push(frame.breath_fft());
        self.breath_xcorr.push(frame.breath_xcorr());
        self.breath_sensor.push(frame.breath_sensor());
        self.heart_sensor.push(frame.heart_sensor());
    }

    fn is_ready(&self) -> bool {
        self.phase.is_ready()
    }

    fn sensor_averages(&self, channel: RateChannel) -> SensorAverages {
        let (fft, xcorr, time_domain) = match channel {
            RateChannel::Breathing => {
                (&self.breath_fft, &self.breath_xcorr, &self.breath_sensor)
            }
            RateChannel::Cardiac => (&self.heart_fft, &self.heart_xcorr, &self.heart_sensor),
        };
        SensorAverages {
            fft_rate: fft.mean().unwrap_or(0.0),
            xcorr_rate: xcorr.mean().unwrap_or(0.0),
            time_domain_rate: time_domain.mean().unwrap_or(0.0),
        }
    }
}

/// One full monitoring session over a sensor link.
pub struct Monitor<S: EpochSink> {
    session_id: Uuid,
    decoder: FrameDecoder,
    channels: ChannelWindows,
    amplitude: HistoryWindow,
    spectral: HistoryWindow,
    breathing: RateEstimator,
    cardiac: RateEstimator,
    breathing_gate: Box<dyn RateTrustGate>,
    cardiac_gate: Box<dyn RateTrustGate>,
    model: Box<dyn SleepStageClassifier>,
    engine: FeatureEngine,
    aggregator: EpochAggregator,
    sink: S,
    previous_breath: f64,
    previous_heart: f64,
    last_tick: Option<i64>,
    aligned: bool,
}

impl<S: EpochSink> Monitor<S> {
    pub fn new(
        sink: S,
        breathing_gate: Box<dyn RateTrustGate>,
        cardiac_gate: Box<dyn RateTrustGate>,
        model: Box<dyn SleepStageClassifier>,
    ) -> Self {
        let session_id = Uuid::new_v4();
        info!(%session_id, "monitoring session created");
        Self {
            session_id,
            decoder: FrameDecoder::new(),
            channels: ChannelWindows::new(),
            amplitude: HistoryWindow::new(features::AMPLITUDE_WINDOW),
            spectral: HistoryWindow::new(features::SPECTRAL_WINDOW),
            breathing: RateEstimator::new(RateChannel::Breathing),
            cardiac: RateEstimator::new(RateChannel::Cardiac),
            breathing_gate,
            cardiac_gate,
            model,
            engine: FeatureEngine::new(),
            aggregator: EpochAggregator::new(),
            sink,
            previous_breath: 0.0,
            previous_heart: 0.0,
            last_tick: None,
            aligned: false,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Last accepted breathing and cardiac rates, 0 before the first tick.
    pub fn current_rates(&self) -> (f64, f64) {
        (self.previous_breath, self.previous_heart)
    }

    /// Feed one decoded frame at the given wall-clock time.
    ///
    /// Raw windows accumulate on every frame; the rate and feature pipeline
    /// runs at most once per second, and only after minute alignment and
    /// channel warm-up. Returns the epoch closed by this frame, if any.
    pub fn ingest(
        &mut self,
        frame: &VitalFrame,
        now: NaiveDateTime,
    ) -> Result<Option<EpochRecord>, VitalsError> {
        self.channels.push(frame);
        self.amplitude.push(frame.phase_peak());
        self.spectral.push(frame.phase_peak());

        if !self.aligned {
            if now.second() == 0 {
                self.aligned = true;
                info!(%now, "aligned to minute boundary");
            } else {
                return Ok(None);
            }
        }

        let tick = now.and_utc().timestamp();
        if self.last_tick == Some(tick) {
            return Ok(None);
        }
        self.last_tick = Some(tick);

        if !self.channels.is_ready() {
            return Ok(None);
        }

        let phase = self.channels.phase.snapshot();
        let breath = self.breathing.estimate(
            &phase,
            &self.channels.sensor_averages(RateChannel::Breathing),
            self.breathing_gate.as_ref(),
            self.previous_breath,
        );
        let heart = self.cardiac.estimate(
            &phase,
            &self.channels.sensor_averages(RateChannel::Cardiac),
            self.cardiac_gate.as_ref(),
            self.previous_heart,
        );
        self.previous_breath = breath.rate;
        self.previous_heart = heart.rate;
        debug_rates(&breath, &heart);

        let amplitude = self.amplitude.is_ready().then(|| self.amplitude.snapshot());
        let spectral = self.spectral.is_ready().then(|| self.spectral.snapshot());
        let sample = self.engine.observe(
            breath.rate,
            heart.rate,
            amplitude.as_deref(),
            spectral.as_deref(),
            now,
        );

        let Some(features) = self.aggregator.push(&sample, now) else {
            return Ok(None);
        };
        let stage = self.model.classify(&features);
        let epoch = EpochRecord {
            session_id: self.session_id,
            closed_at: now,
            features,
            stage,
        };
        info!(%now, stage = stage.as_str(), "epoch closed");
        self.sink.record(&epoch)?;
        Ok(Some(epoch))
    }

    /// Drive the session from a transport until it is exhausted.
    ///
    /// `clock` supplies the wall-clock time for each decoded frame; live
    /// runs pass the system clock, replays synthesize one.
    pub fn run<T, C>(&mut self, transport: &mut T, mut clock: C) -> Result<(), VitalsError>
    where
        T: Transport,
        C: FnMut() -> NaiveDateTime,
    {
        let mut buffer: Vec<u8> = Vec::with_capacity(4 * FRAME_LEN);
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let n = transport.read_chunk(&mut chunk)?;
            if n == 0 {
                if transport.is_exhausted() {
                    info!(session_id = %self.session_id, "transport exhausted, session over");
                    return Ok(());
                }
                continue;
            }
            buffer.extend_from_slice(&chunk[..n]);

            while let Some(frame) = self.decoder.decode(&buffer) {
                self.ingest(&frame, clock())?;
                drain_one_frame(&mut buffer);
            }
            trim_unsynced(&mut buffer);
        }
    }
}

fn debug_rates(breath: &RateEstimate, heart: &RateEstimate) {
    debug!(
        breath = breath.rate,
        breath_source = ?breath.source,
        heart = heart.rate,
        heart_source = ?heart.source,
        "per-second rates"
    );
}

/// Remove everything up to and including the first full frame.
fn drain_one_frame(buffer: &mut Vec<u8>) {
    if let Some(start) = buffer
        .windows(FRAME_MAGIC.len())
        .position(|w| w == FRAME_MAGIC)
    {
        buffer.drain(..start + FRAME_LEN);
    }
}

/// Without a magic match the buffer holds noise; keep only the tail that
/// could still begin a split magic pattern.
fn trim_unsynced(buffer: &mut Vec<u8>) {
    let has_magic = buffer
        .windows(FRAME_MAGIC.len())
        .any(|w| w == FRAME_MAGIC);
    if !has_magic && buffer.len() > FRAME_MAGIC.len() {
        let keep = buffer.len() - (FRAME_MAGIC.len() - 1);
        if keep > 0 {
            buffer.drain(..keep);
            warn!("dropped unsynchronized bytes");
        }
    }
}
