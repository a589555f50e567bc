//! Least-squares polynomial fitting

/// Fit a polynomial of the given degree to `(xs, ys)` by least squares.
///
/// Returns `degree + 1` coefficients, highest degree first, or `None` when
/// the normal equations are singular (degenerate sample placement).
pub fn polyfit(xs: &[f64], ys: &[f64], degree: usize) -> Option<Vec<f64>> {
    debug_assert_eq!(xs.len(), ys.len());
    let terms = degree + 1;
    if xs.len() < terms {
        return None;
    }

    // Normal equations: A c = r with A[i][j] = sum x^(i+j), r[i] = sum y x^i.
    let mut power_sums = vec![0.0; 2 * degree + 1];
    for &x in xs {
        let mut p = 1.0;
        for sum in power_sums.iter_mut() {
            *sum += p;
            p *= x;
        }
    }
    let mut matrix = vec![vec![0.0; terms]; terms];
    for i in 0..terms {
        for j in 0..terms {
            matrix[i][j] = power_sums[i + j];
        }
    }
    let mut rhs = vec![0.0; terms];
    for (&x, &y) in xs.iter().zip(ys) {
        let mut p = 1.0;
        for r in rhs.iter_mut() {
            *r += y * p;
            p *= x;
        }
    }

    let mut coeffs = solve(matrix, rhs)?;
    // Solved lowest-degree first; callers expect highest first.
    coeffs.reverse();
    Some(coeffs)
}

/// Evaluate a polynomial given coefficients highest degree first.
pub fn polyval(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().fold(0.0, |acc, &c| acc * x + c)
}

/// Gaussian elimination with partial pivoting.
fn solve(mut m: Vec<Vec<f64>>, mut r: Vec<f64>) -> Option<Vec<f64>> {
    let n = r.len();
    for col in 0..n {
        let mut pivot = col;
        for row in col + 1..n {
            if m[row][col].abs() > m[pivot][col].abs() {
                pivot = row;
            }
        }
        if m[pivot][col].abs() < 1e-12 {
            return None;
        }
        m.swap(col, pivot);
        r.swap(col, pivot);

        for row in col + 1..n {
            let factor = m[row][col] / m[col][col];
            for k in col..n {
                m[row][k] -= factor * m[col][k];
            }
            r[row] -= factor * r[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let mut acc = r[row];
        for k in row + 1..n {
            acc -= m[row][k] * x[k];
        }
        x[row] = acc / m[row][row];
    }
    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovers_cubic_exactly() {
        let xs: Vec<f64> = (0..31).map(|i| i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|&x| 2.0 * x * x * x - x * x + 4.0 * x - 7.0).collect();
        let coeffs = polyfit(&xs, &ys, 3).unwrap();
        let expected = [2.0, -1.0, 4.0, -7.0];
        for (got, want) in coeffs.iter().zip(expected) {
            assert!((got - want).abs() < 1e-6, "got {got}, want {want}");
        }
    }

    #[test]
    fn test_degree_less_than_data() {
        // A linear fit through a perfect line.
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys = [1.0, 3.0, 5.0, 7.0];
        let coeffs = polyfit(&xs, &ys, 1).unwrap();
        assert!((coeffs[0] - 2.0).abs() < 1e-9);
        assert!((coeffs[1] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_insufficient_points() {
        assert!(polyfit(&[1.0], &[2.0], 3).is_none());
    }

    #[test]
    fn test_polyval_horner() {
        // 3x^2 + 2x + 1 at x = 2
        assert_eq!(polyval(&[3.0, 2.0, 1.0], 2.0), 17.0);
    }
}
