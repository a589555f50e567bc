//! Stateless-per-call IIR filtering
//!
//! The band-pass and narrow-band filters are applied with zero initial delay
//! state on every call, recomputed over the full window. Carrying filter
//! state across seconds would shift every downstream threshold, so this must
//! stay a batch operation.

/// Direct-form transposed-II IIR filter with fixed coefficients.
///
/// `b` is the numerator, `a` the denominator; both must have equal length
/// and `a[0]` must be non-zero (coefficients are normalized by `a[0]`).
#[derive(Debug, Clone, Copy)]
pub struct IirFilter {
    pub b: &'static [f64],
    pub a: &'static [f64],
}

impl IirFilter {
    /// Filter `x` from zero initial conditions.
    pub fn apply(&self, x: &[f64]) -> Vec<f64> {
        debug_assert_eq!(self.b.len(), self.a.len());
        let n = self.b.len();
        let a0 = self.a[0];
        let b: Vec<f64> = self.b.iter().map(|&v| v / a0).collect();
        let a: Vec<f64> = self.a.iter().map(|&v| v / a0).collect();

        let mut y = vec![0.0; x.len()];
        if n == 1 {
            for (out, &xn) in y.iter_mut().zip(x) {
                *out = b[0] * xn;
            }
            return y;
        }

        let mut z = vec![0.0; n - 1];
        for (out, &xn) in y.iter_mut().zip(x) {
            let yn = z[0] + b[0] * xn;
            for i in 0..n - 2 {
                z[i] = z[i + 1] + xn * b[i + 1] - yn * a[i + 1];
            }
            z[n - 2] = xn * b[n - 1] - yn * a[n - 1];
            *out = yn;
        }
        y
    }
}

/// Order-10 band-pass for the breathing band at 20 Hz sampling.
pub const BREATHING_BANDPASS: IirFilter = IirFilter {
    b: &[
        0.000310085613932583790096353393,
        -0.002450393207452640498278384484,
        0.008191253474064732684190026646,
        -0.014462792713750451459309154245,
        0.012602969766102464777013381081,
        0.000000000000000000000000000000,
        -0.012602969766102459572842953150,
        0.014462792713750454928756106199,
        -0.008191253474064734418913502623,
        0.002450393207452640498278384484,
        -0.000310085613932583735886244769,
    ],
    a: &[
        1.0,
        -9.780812442849507348796578298789,
        43.083177194495931416895473375916,
        -112.548980608688253823856939561665,
        193.103088780432216253757360391319,
        -227.365418151163510174228576943278,
        186.055050775931675843821722082794,
        -104.483153273330174215516308322549,
        38.535884265082792410339607158676,
        -8.429195049755342949993064394221,
        0.830358509857336501980284992896,
    ],
};

/// Order-18 band-pass for the cardiac band at 20 Hz sampling.
pub const CARDIAC_BANDPASS: IirFilter = IirFilter {
    b: &[
        0.0009309221423942934,
        -0.012651127859899214,
        0.08140072903422219,
        -0.3279827818967048,
        0.9206296690623369,
        -1.8881391347626006,
        2.864155296830487,
        -3.1158825565644306,
        2.0796297285426384,
        -1.6933375125414267e-15,
        -2.0796297285426384,
        3.1158825565644315,
        -2.8641552968304875,
        1.8881391347626006,
        -0.9206296690623373,
        0.3279827818967048,
        -0.08140072903422219,
        0.012651127859899216,
        -0.0009309221423942937,
    ],
    a: &[
        1.0,
        -15.142612391789038,
        109.52867216475022,
        -502.6626423702458,
        1639.7914526180646,
        -4037.095860679349,
        7772.407643496967,
        -11963.349399532222,
        14922.878739349395,
        -15197.385490007382,
        12665.576290591296,
        -8617.837327643654,
        4751.9970631301,
        -2094.9246186588152,
        722.2258948681153,
        -187.91289244221497,
        34.75519411187606,
        -4.078772963228582,
        0.22866640874033417,
    ],
};

/// 4th-order narrow band-pass isolating the low-frequency HRV band.
pub const LOW_FREQ_BAND: IirFilter = IirFilter {
    b: &[
        0.0009995048070486716,
        -0.003994449797763787,
        0.005989890331755259,
        -0.003994449797763788,
        0.0009995048070486716,
    ],
    a: &[
        1.0,
        -3.996631500101437,
        5.9910822943901785,
        -3.9922680954261405,
        0.9978176514624266,
    ],
};

/// 4th-order narrow band-pass isolating the high-frequency HRV band.
pub const HIGH_FREQ_BAND: IirFilter = IirFilter {
    b: &[
        0.0010005991658251364,
        -0.003978263207457302,
        0.005955363064995437,
        -0.003978263207457302,
        0.0010005991658251364,
    ],
    a: &[
        1.0,
        -3.9832035773796473,
        5.961516438161199,
        -3.973322837534953,
        0.995044958484506,
    ],
};

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_pure_gain() {
        const GAIN: IirFilter = IirFilter {
            b: &[2.0],
            a: &[1.0],
        };
        assert_eq!(GAIN.apply(&[1.0, -0.5, 3.0]), vec![2.0, -1.0, 6.0]);
    }

    #[test]
    fn test_first_order_impulse_response() {
        // y[n] = x[n] + 0.5 y[n-1]
        const DECAY: IirFilter = IirFilter {
            b: &[1.0, 0.0],
            a: &[1.0, -0.5],
        };
        let y = DECAY.apply(&[1.0, 0.0, 0.0, 0.0]);
        let expected = [1.0, 0.5, 0.25, 0.125];
        for (got, want) in y.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12);
        }
    }

    #[test]
    fn test_coefficient_normalization() {
        // Same filter with all coefficients doubled must give identical output.
        const F1: IirFilter = IirFilter {
            b: &[1.0, 0.0],
            a: &[1.0, -0.5],
        };
        const F2: IirFilter = IirFilter {
            b: &[2.0, 0.0],
            a: &[2.0, -1.0],
        };
        let x = [1.0, 2.0, -1.0, 0.5];
        let y1 = F1.apply(&x);
        let y2 = F2.apply(&x);
        for (a, b) in y1.iter().zip(&y2) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_stateless_between_calls() {
        let x: Vec<f64> = (0..64).map(|i| (i as f64 * 0.7).sin()).collect();
        let first = BREATHING_BANDPASS.apply(&x);
        let second = BREATHING_BANDPASS.apply(&x);
        assert_eq!(first, second);
    }
}
