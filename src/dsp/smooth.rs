//! Signal smoothers
//!
//! Two smoothers live here:
//! - a multi-linear local regression (MLR) smoother used on the band-passed
//!   phase signal before peak detection, and
//! - a 31-tap Savitzky-Golay smoother used on rate histories for the sleep
//!   features, with polynomial reconstruction of the edge regions.

use crate::dsp::poly::{polyfit, polyval};

/// Window length of the Savitzky-Golay smoother.
pub const SAVGOL_WINDOW: usize = 31;

const SAVGOL_EDGE: usize = 15;

/// Precomputed 31-tap kernels for polynomial orders 2 and 3. Both orders
/// share the same symmetric shape at this window length.
const SAVGOL_KERNEL_ORDER2: [f64; SAVGOL_WINDOW] = [
    -0.041055718475071855,
    -0.026392961876831954,
    -0.012741429871574048,
    -0.00010112245929822615,
    0.011527960359995528,
    0.02214581858630722,
    0.031752452219636844,
    0.04034786125998441,
    0.0479320457073499,
    0.05450500556173333,
    0.060066740823134686,
    0.06461725149155399,
    0.06815653756699122,
    0.07068459904944638,
    0.07220143593891949,
    0.0727070482354105,
    0.07220143593891949,
    0.07068459904944638,
    0.06815653756699123,
    0.06461725149155399,
    0.06006674082313469,
    0.05450500556173333,
    0.04793204570734991,
    0.040347861259984415,
    0.03175245221963685,
    0.022145818586307226,
    0.01152796035999553,
    -0.00010112245929822268,
    -0.012741429871574055,
    -0.02639296187683194,
    -0.04105571847507189,
];

const SAVGOL_KERNEL_ORDER3: [f64; SAVGOL_WINDOW] = [
    -0.04105571847507182,
    -0.02639296187683192,
    -0.012741429871574027,
    -0.00010112245929820307,
    0.011527960359995546,
    0.022145818586307233,
    0.03175245221963686,
    0.040347861259984415,
    0.0479320457073499,
    0.054505005561733336,
    0.060066740823134686,
    0.06461725149155399,
    0.06815653756699121,
    0.07068459904944636,
    0.07220143593891948,
    0.07270704823541049,
    0.07220143593891948,
    0.07068459904944638,
    0.06815653756699121,
    0.06461725149155398,
    0.06006674082313469,
    0.05450500556173333,
    0.04793204570734991,
    0.040347861259984415,
    0.03175245221963686,
    0.022145818586307237,
    0.01152796035999555,
    -0.0001011224592981996,
    -0.012741429871574027,
    -0.026392961876831905,
    -0.041055718475071855,
];

/// Multi-linear local regression smoother.
///
/// For each interior point a linear trend is fitted over the symmetric
/// window of half-width `delta`, then the predictions of the overlapping
/// trends are averaged. Edge samples pass through unchanged.
pub fn mlr_smooth(input: &[f64], delta: usize) -> Vec<f64> {
    let len = input.len();
    if len < 2 * delta + 1 {
        return input.to_vec();
    }

    let mut slope = input.to_vec();
    let mut bias = input.to_vec();
    let norm = (delta * (2 * delta + 1) * (delta + 1)) as f64;

    for t in delta..len - delta {
        let start = t - delta;
        let end = t + delta + 1;
        let window_mean = input[start..end].iter().sum::<f64>() / (end - start) as f64;

        let mut m = 0.0;
        for i in -(delta as isize)..=(delta as isize) {
            let at = (t as isize + i) as usize;
            m += i as f64 * (input[at] - window_mean);
        }
        slope[t] = 3.0 * m / norm;
        bias[t] = window_mean - t as f64 * slope[t];
    }

    let mut output = input.to_vec();
    for t in delta..len - delta {
        let mut acc = 0.0;
        for i in t - delta..t + delta {
            acc += slope[i] * t as f64 + bias[i];
        }
        output[t] = acc / (2 * delta + 1) as f64;
    }
    output
}

/// Apply the 31-tap Savitzky-Golay smoother (polynomial order 2 or 3).
///
/// The center sample comes from the precomputed kernel; the two 15-sample
/// edge regions are reconstructed from an independent least-squares
/// polynomial fit over the full window. Returns the smoothed window and the
/// mean of its 31 values.
pub fn savgol_31(x: &[f64], polyorder: usize) -> ([f64; SAVGOL_WINDOW], f64) {
    debug_assert_eq!(x.len(), SAVGOL_WINDOW);
    debug_assert!(polyorder == 2 || polyorder == 3);

    let kernel = if polyorder == 2 {
        &SAVGOL_KERNEL_ORDER2
    } else {
        &SAVGOL_KERNEL_ORDER3
    };

    let xs: Vec<f64> = (0..SAVGOL_WINDOW).map(|i| i as f64).collect();
    let coeffs =
        polyfit(&xs, x, polyorder).unwrap_or_else(|| vec![0.0; polyorder + 1]);

    let mut smoothed = [0.0; SAVGOL_WINDOW];
    for (i, out) in smoothed.iter_mut().enumerate() {
        if i == SAVGOL_EDGE {
            // Symmetric kernel, so the "same" convolution center is a plain
            // dot product.
            *out = kernel.iter().zip(x).map(|(k, v)| k * v).sum();
        } else {
            *out = polyval(&coeffs, i as f64);
        }
    }
    let mean = smoothed.iter().sum::<f64>() / SAVGOL_WINDOW as f64;
    (smoothed, mean)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_savgol_reproduces_linear_ramp() {
        // A degree-3 fit recovers any polynomial of degree <= 3 exactly, so
        // a ramp must round-trip through the smoother.
        let ramp: Vec<f64> = (0..31).map(|i| 2.0 * i as f64 + 1.0).collect();
        let (smoothed, mean) = savgol_31(&ramp, 3);
        for (got, want) in smoothed.iter().zip(&ramp) {
            assert!((got - want).abs() < 1e-6, "got {got}, want {want}");
        }
        let expected_mean = ramp.iter().sum::<f64>() / 31.0;
        assert!((mean - expected_mean).abs() < 1e-6);
    }

    #[test]
    fn test_savgol_order2_on_quadratic() {
        let quad: Vec<f64> = (0..31).map(|i| (i as f64 - 15.0).powi(2)).collect();
        let (smoothed, _) = savgol_31(&quad, 2);
        for (got, want) in smoothed.iter().zip(&quad) {
            assert!((got - want).abs() < 1e-6);
        }
    }

    #[test]
    fn test_mlr_edges_untouched() {
        let input: Vec<f64> = (0..20).map(|i| ((i * 7) % 5) as f64).collect();
        let smoothed = mlr_smooth(&input, 2);
        assert_eq!(smoothed[0], input[0]);
        assert_eq!(smoothed[1], input[1]);
        assert_eq!(smoothed[18], input[18]);
        assert_eq!(smoothed[19], input[19]);
    }

    #[test]
    fn test_mlr_short_input_passthrough() {
        let input = [1.0, 2.0, 3.0];
        assert_eq!(mlr_smooth(&input, 2), input.to_vec());
    }

    #[test]
    fn test_mlr_flattens_impulse() {
        let mut input = vec![0.0; 21];
        input[10] = 10.0;
        let smoothed = mlr_smooth(&input, 2);
        // The impulse energy is spread over the neighboring trends.
        assert!(smoothed[10] < 10.0);
        assert!(smoothed[10] > 0.0);
    }
}
