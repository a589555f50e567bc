//! Digital signal processing primitives
//!
//! Everything here is stateless per call: filters start from zero initial
//! conditions every second and recompute over the full window. Downstream
//! thresholds are tuned against that behavior.

pub mod filter;
pub mod poly;
pub mod smooth;
pub mod spectrum;

pub use filter::{IirFilter, CARDIAC_BANDPASS, BREATHING_BANDPASS, HIGH_FREQ_BAND, LOW_FREQ_BAND};
pub use poly::{polyfit, polyval};
pub use smooth::{mlr_smooth, savgol_31, SAVGOL_WINDOW};
pub use spectrum::{band_energy, spectral_peak_hz};
