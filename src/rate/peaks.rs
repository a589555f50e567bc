//! Peak/valley detection, proximity merging and candidate classification

/// Minimum windowed standard deviation for a merged point to count as a
/// rate candidate; rejects flat, low-variability segments.
const MIN_VARIABILITY: f64 = 0.01;

/// Indices of local maxima in `x`, plateau-aware: a maximum exists where a
/// rising edge is followed, after skipping any run of equal samples, by a
/// falling edge. The midpoint index of each plateau is recorded. The first
/// and last samples can never be maxima.
pub fn local_maxima(x: &[f64]) -> Vec<usize> {
    let mut midpoints = Vec::new();
    if x.len() < 3 {
        return midpoints;
    }
    let i_max = x.len() - 1;
    let mut i = 1;
    while i < i_max {
        if x[i - 1] < x[i] {
            let mut i_ahead = i + 1;
            while i_ahead < i_max && x[i_ahead] == x[i] {
                i_ahead += 1;
            }
            if x[i_ahead] < x[i] {
                let left = i;
                let right = i_ahead - 1;
                midpoints.push((left + right) / 2);
                i = i_ahead;
            }
        }
        i += 1;
    }
    midpoints
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FeaturePoint {
    index: usize,
    is_peak: bool,
}

/// Merge peak and valley indices spaced closer than `time_thr` samples.
///
/// Within each run of close points the boundary types decide the survivors:
/// valley-to-valley keeps the lowest point, peak-to-peak the highest, and a
/// mixed run keeps both boundary points. Isolated points pass through.
/// Returns the surviving indices in ascending order.
pub fn merge_features(
    signal: &[f64],
    peaks: &[usize],
    valleys: &[usize],
    time_thr: usize,
) -> Vec<usize> {
    let mut points: Vec<FeaturePoint> = peaks
        .iter()
        .map(|&index| FeaturePoint {
            index,
            is_peak: true,
        })
        .chain(valleys.iter().map(|&index| FeaturePoint {
            index,
            is_peak: false,
        }))
        .collect();
    points.sort_by_key(|p| p.index);

    let mut kept = Vec::new();
    let mut i = 0;
    while i < points.len() {
        let mut j = i;
        while j + 1 < points.len() && points[j + 1].index - points[j].index < time_thr {
            j += 1;
        }
        if j == i {
            kept.push(points[i].index);
        } else {
            let run = &points[i..=j];
            match (points[i].is_peak, points[j].is_peak) {
                (false, false) => kept.push(extreme(signal, run, false)),
                (true, true) => kept.push(extreme(signal, run, true)),
                _ => {
                    kept.push(points[i].index);
                    kept.push(points[j].index);
                }
            }
        }
        i = j + 1;
    }
    kept.sort_unstable();
    kept
}

fn extreme(signal: &[f64], run: &[FeaturePoint], highest: bool) -> usize {
    let mut best = run[0].index;
    for p in &run[1..] {
        let better = if highest {
            signal[p.index] > signal[best]
        } else {
            signal[p.index] < signal[best]
        };
        if better {
            best = p.index;
        }
    }
    best
}

/// Merged feature points classified against their local window statistics.
#[derive(Debug, Clone, Default)]
pub struct Candidates {
    pub tops: Vec<usize>,
    pub bottoms: Vec<usize>,
}

/// Classify each merged index as a top candidate, a bottom candidate, or
/// discard it.
///
/// The signal is padded symmetrically (edge-replicated) by `half_window`;
/// for every index the mean and standard deviation over the centered
/// `2 * half_window + 1` span are computed. A point above the mean with
/// sufficient variability is a top, below it a bottom.
pub fn classify_candidates(signal: &[f64], merged: &[usize], half_window: usize) -> Candidates {
    let mut candidates = Candidates::default();
    let (Some(&first), Some(&last)) = (signal.first(), signal.last()) else {
        return candidates;
    };

    let span = 2 * half_window + 1;
    let mut padded = Vec::with_capacity(signal.len() + 2 * half_window);
    padded.extend(std::iter::repeat(first).take(half_window));
    padded.extend_from_slice(signal);
    padded.extend(std::iter::repeat(last).take(half_window));

    for &index in merged {
        let window = &padded[index..index + span];
        let mean = window.iter().sum::<f64>() / span as f64;
        let variance = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / span as f64;
        let std_dev = variance.sqrt();

        if signal[index] > mean && std_dev > MIN_VARIABILITY {
            candidates.tops.push(index);
        } else if signal[index] < mean && std_dev > MIN_VARIABILITY {
            candidates.bottoms.push(index);
        }
    }
    candidates
}
