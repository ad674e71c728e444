//! Transfer progress and ETA telemetry.

/// A sentinel for telemetry that cannot be derived because the transport
/// did not report a computable total size.
pub const UNKNOWN: f64 = -1.0;

/// Advisory progress telemetry for one direction of a transfer.
///
/// Derived fields are [`UNKNOWN`] when the total size is not computable.
/// These values never drive control flow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressInfo {
    /// Completion percentage in `[0, 100]`, rounded to 2 decimals.
    pub progress: f64,
    /// Estimated remaining transfer time in milliseconds.
    pub eta_time: f64,
    /// Remaining bytes.
    pub eta_size: f64,
    /// Bytes transferred so far (always known).
    pub loaded_size: f64,
    /// Total bytes, when the transport reports one.
    pub total_size: f64,
    /// Instantaneous throughput in bytes per second.
    pub eta_speed: f64,
}

impl ProgressInfo {
    /// Computes telemetry from `loaded` bytes against an optional `total`,
    /// with `elapsed_ms` measured from the transfer-start baseline.
    #[must_use]
    pub fn compute(loaded: u64, total: Option<u64>, elapsed_ms: f64) -> Self {
        let loaded_size = loaded_as_f64(loaded);
        let Some(total) = total else {
            return Self::unknown(loaded);
        };
        let total_size = loaded_as_f64(total);

        let progress = round2((loaded_size / total_size * 100.0).clamp(0.0, 100.0));
        // bytes per millisecond; elapsed 0 yields +inf and a 0 ETA, which
        // is what an instantaneous transfer looks like
        let throughput = loaded_size / elapsed_ms;
        let eta_size = total_size - loaded_size;
        let eta_time = eta_size / throughput;
        let eta_speed = throughput * 1000.0;

        Self {
            progress,
            eta_time,
            eta_size,
            loaded_size,
            total_size,
            eta_speed,
        }
    }

    /// Telemetry with every derived field set to [`UNKNOWN`].
    #[must_use]
    pub fn unknown(loaded: u64) -> Self {
        Self {
            progress: UNKNOWN,
            eta_time: UNKNOWN,
            eta_size: UNKNOWN,
            loaded_size: loaded_as_f64(loaded),
            total_size: UNKNOWN,
            eta_speed: UNKNOWN,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[allow(clippy::cast_precision_loss)]
fn loaded_as_f64(bytes: u64) -> f64 {
    bytes as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarter_transferred_after_half_second() {
        let info = ProgressInfo::compute(250, Some(1000), 500.0);

        assert!((info.progress - 25.00).abs() < f64::EPSILON);
        assert!((info.eta_size - 750.0).abs() < f64::EPSILON);
        // 0.5 B/ms -> remaining 750 B takes 1500 ms, at 500 B/s
        assert!((info.eta_time - 1500.0).abs() < f64::EPSILON);
        assert!((info.eta_speed - 500.0).abs() < f64::EPSILON);
        assert!((info.total_size - 1000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn non_computable_total_yields_sentinels() {
        let info = ProgressInfo::compute(250, None, 500.0);

        assert!((info.progress - UNKNOWN).abs() < f64::EPSILON);
        assert!((info.eta_time - UNKNOWN).abs() < f64::EPSILON);
        assert!((info.eta_size - UNKNOWN).abs() < f64::EPSILON);
        assert!((info.total_size - UNKNOWN).abs() < f64::EPSILON);
        assert!((info.eta_speed - UNKNOWN).abs() < f64::EPSILON);
        assert!((info.loaded_size - 250.0).abs() < f64::EPSILON);
    }

    #[test]
    fn progress_is_clamped_and_rounded() {
        let over = ProgressInfo::compute(1200, Some(1000), 10.0);
        assert!((over.progress - 100.0).abs() < f64::EPSILON);

        let third = ProgressInfo::compute(1, Some(3), 10.0);
        assert!((third.progress - 33.33).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_elapsed_means_instantaneous() {
        let info = ProgressInfo::compute(500, Some(1000), 0.0);
        assert!((info.eta_time - 0.0).abs() < f64::EPSILON);
        assert!(info.eta_speed.is_infinite());
    }
}
