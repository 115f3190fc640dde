//! Dense symmetric solve for the damped normal equations.
//!
//! Graph sizes stay in the low hundreds of variables, so an in-place
//! Cholesky factorization is both simple and fast enough; the sparse
//! structure lives in the per-edge block assembly, not the factorization.

/// Solve `A x = b` for symmetric positive-definite `A` (row-major,
/// `n x n`) in place. Returns `false` if a pivot falls below tolerance
/// (singular or indefinite system).
pub(crate) fn cholesky_solve(a: &mut [f32], b: &mut [f32], n: usize) -> bool {
    const MIN_PIVOT: f32 = 1e-9;
    debug_assert_eq!(a.len(), n * n);
    debug_assert_eq!(b.len(), n);

    // In-place lower-triangular factorization A = L L^T
    for j in 0..n {
        let mut diag = a[j * n + j];
        for k in 0..j {
            diag -= a[j * n + k] * a[j * n + k];
        }
        if diag <= MIN_PIVOT {
            return false;
        }
        let diag = diag.sqrt();
        a[j * n + j] = diag;
        for i in (j + 1)..n {
            let mut v = a[i * n + j];
            for k in 0..j {
                v -= a[i * n + k] * a[j * n + k];
            }
            a[i * n + j] = v / diag;
        }
    }

    // Forward substitution: L y = b
    for i in 0..n {
        let mut v = b[i];
        for k in 0..i {
            v -= a[i * n + k] * b[k];
        }
        b[i] = v / a[i * n + i];
    }

    // Back substitution: L^T x = y
    for i in (0..n).rev() {
        let mut v = b[i];
        for k in (i + 1)..n {
            v -= a[k * n + i] * b[k];
        }
        b[i] = v / a[i * n + i];
    }

    true
}
