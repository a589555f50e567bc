//! Epoch recording
//!
//! Epochs append to a delimited text log, one row per closed minute. The
//! header row names the 26 columns; each data row carries the 24 features
//! (heart leading, then breath), the closing `HH:MM:SS` timestamp and the
//! integer sleep-stage label.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Timelike;

use crate::error::VitalsError;
use crate::types::EpochRecord;

/// Column names of the recording, in row order.
pub const COLUMNS: &str = "heart, breath, bmi, deep_p, ada_br, ada_hr, var_RPM, var_HPM, \
rem_parameter, mov_dens, LF, HF, LFHF, sHF, sLFHF, tfRSA, tmHR, sfRSA, smHR, sdfRSA, sdmHR, \
stfRSA, stmHR, time, datetime, sleep";

/// Destination for closed epochs.
pub trait EpochSink {
    fn record(&mut self, epoch: &EpochRecord) -> Result<(), VitalsError>;
}

/// Appends epochs to a CSV file, header first.
pub struct CsvRecorder {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl CsvRecorder {
    /// Create the recording file and write the header row.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, VitalsError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|e| VitalsError::RecorderOpen {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{COLUMNS}")
            .map_err(|e| VitalsError::RecorderWrite(e.to_string()))?;
        Ok(Self { path, writer })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn format_row(epoch: &EpochRecord) -> String {
        let f = &epoch.features;
        // Heart leads the row even though breath leads the feature vector.
        let mut values = f.as_array();
        values.swap(0, 1);
        let mut row = values
            .iter()
            .map(|v| format!("{v:.6}"))
            .collect::<Vec<_>>()
            .join(", ");
        let t = epoch.closed_at.time();
        row.push_str(&format!(
            ", {:02}:{:02}:{:02}, {}",
            t.hour(),
            t.minute(),
            t.second(),
            epoch.stage.as_label()
        ));
        row
    }
}

impl EpochSink for CsvRecorder {
    fn record(&mut self, epoch: &EpochRecord) -> Result<(), VitalsError> {
        writeln!(self.writer, "{}", Self::format_row(epoch))
            .map_err(|e| VitalsError::RecorderWrite(e.to_string()))?;
        self.writer
            .flush()
            .map_err(|e| VitalsError::RecorderWrite(e.to_string()))
    }
}
