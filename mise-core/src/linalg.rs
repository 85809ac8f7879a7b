//! Small dense linear-algebra helpers used by the reducer.
//!
//! The eigensolver reduces a symmetric matrix to tridiagonal form with
//! Householder reflections and then diagonalises it with the implicit QL
//! method, accumulating the transformations into the eigenvector matrix.
//! Everything runs in `f64`; callers convert from and to `f32` at the edges.

use ndarray::{Array1, Array2, ArrayView2, Axis};

/// Eigen-decomposition of a symmetric matrix.
#[derive(Debug, Clone)]
pub struct SymmetricEigen {
    /// Eigenvalues in descending order.
    pub values: Array1<f64>,
    /// Unit eigenvectors stored as columns, in the same order as `values`.
    /// Each column's largest-magnitude entry is non-negative.
    pub vectors: Array2<f64>,
}

/// Decomposes the symmetric matrix `a`. Only symmetric input is meaningful;
/// the lower triangle is what the reduction reads.
pub fn symmetric_eigen(a: ArrayView2<f64>) -> SymmetricEigen {
    let n = a.nrows();
    debug_assert_eq!(n, a.ncols());
    if n == 0 {
        return SymmetricEigen {
            values: Array1::zeros(0),
            vectors: Array2::zeros((0, 0)),
        };
    }

    let mut v = a.to_owned();
    let mut d = vec![0.0f64; n];
    let mut e = vec![0.0f64; n];

    tridiagonalize(&mut v, &mut d, &mut e);
    tql2(&mut v, &mut d, &mut e);

    // Sort descending, carrying columns along.
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| d[j].total_cmp(&d[i]).then(i.cmp(&j)));

    let values = Array1::from_iter(order.iter().map(|&i| d[i]));
    let mut vectors = Array2::zeros((n, n));
    for (dst, &src) in order.iter().enumerate() {
        vectors.column_mut(dst).assign(&v.column(src));
    }
    normalize_signs(&mut vectors);

    SymmetricEigen { values, vectors }
}

/// Flips each column so that its largest-magnitude entry is non-negative.
/// Principal directions are only defined up to sign; this makes them reproducible.
pub fn normalize_signs(columns: &mut Array2<f64>) {
    for mut col in columns.axis_iter_mut(Axis(1)) {
        let mut pivot = 0.0f64;
        for &x in col.iter() {
            if x.abs() > pivot.abs() {
                pivot = x;
            }
        }
        if pivot < 0.0 {
            col.mapv_inplace(|x| -x);
        }
    }
}

/// Per-column mean of an f32 matrix, accumulated in f64.
pub fn column_means(matrix: ArrayView2<f32>) -> Array1<f64> {
    let n = matrix.nrows();
    let mut means = Array1::<f64>::zeros(matrix.ncols());
    if n == 0 {
        return means;
    }
    for row in matrix.rows() {
        for (m, &x) in means.iter_mut().zip(row.iter()) {
            *m += x as f64;
        }
    }
    means.mapv_inplace(|s| s / n as f64);
    means
}

/// Returns `matrix - means` (row-wise) as f64.
pub fn center(matrix: ArrayView2<f32>, means: &Array1<f64>) -> Array2<f64> {
    let mut centered = matrix.mapv(|x| x as f64);
    for mut row in centered.rows_mut() {
        row -= means;
    }
    centered
}

/// Householder reduction to tridiagonal form.
/// On return `d` holds the diagonal, `e[1..]` the sub-diagonal and `v` the
/// accumulated orthogonal transformation.
fn tridiagonalize(v: &mut Array2<f64>, d: &mut [f64], e: &mut [f64]) {
    let n = d.len();
    for j in 0..n {
        d[j] = v[[n - 1, j]];
    }

    for i in (1..n).rev() {
        let mut scale = 0.0;
        let mut h = 0.0;
        for k in 0..i {
            scale += d[k].abs();
        }

        if scale == 0.0 {
            e[i] = d[i - 1];
            for j in 0..i {
                d[j] = v[[i - 1, j]];
                v[[i, j]] = 0.0;
                v[[j, i]] = 0.0;
            }
        } else {
            for k in 0..i {
                d[k] /= scale;
                h += d[k] * d[k];
            }
            let mut f = d[i - 1];
            let mut g = h.sqrt();
            if f > 0.0 {
                g = -g;
            }
            e[i] = scale * g;
            h -= f * g;
            d[i - 1] = f - g;
            for ej in e.iter_mut().take(i) {
                *ej = 0.0;
            }

            for j in 0..i {
                f = d[j];
                v[[j, i]] = f;
                g = e[j] + v[[j, j]] * f;
                for k in (j + 1)..i {
                    g += v[[k, j]] * d[k];
                    e[k] += v[[k, j]] * f;
                }
                e[j] = g;
            }

            f = 0.0;
            for j in 0..i {
                e[j] /= h;
                f += e[j] * d[j];
            }
            let hh = f / (h + h);
            for j in 0..i {
                e[j] -= hh * d[j];
            }
            for j in 0..i {
                f = d[j];
                g = e[j];
                for k in j..i {
                    v[[k, j]] -= f * e[k] + g * d[k];
                }
                d[j] = v[[i - 1, j]];
                v[[i, j]] = 0.0;
            }
        }
        d[i] = h;
    }

    // Accumulate transformations.
    for i in 0..n.saturating_sub(1) {
        v[[n - 1, i]] = v[[i, i]];
        v[[i, i]] = 1.0;
        let h = d[i + 1];
        if h != 0.0 {
            for k in 0..=i {
                d[k] = v[[k, i + 1]] / h;
            }
            for j in 0..=i {
                let mut g = 0.0;
                for k in 0..=i {
                    g += v[[k, i + 1]] * v[[k, j]];
                }
                for k in 0..=i {
                    v[[k, j]] -= g * d[k];
                }
            }
        }
        for k in 0..=i {
            v[[k, i + 1]] = 0.0;
        }
    }
    for j in 0..n {
        d[j] = v[[n - 1, j]];
        v[[n - 1, j]] = 0.0;
    }
    v[[n - 1, n - 1]] = 1.0;
    e[0] = 0.0;
}

/// Implicit QL iterations on the tridiagonal matrix (d, e).
fn tql2(v: &mut Array2<f64>, d: &mut [f64], e: &mut [f64]) {
    let n = d.len();
    for i in 1..n {
        e[i - 1] = e[i];
    }
    e[n - 1] = 0.0;

    let eps = f64::EPSILON;
    let mut f = 0.0;
    let mut tst1 = 0.0f64;

    for l in 0..n {
        tst1 = tst1.max(d[l].abs() + e[l].abs());
        let mut m = l;
        while m < n - 1 && e[m].abs() > eps * tst1 {
            m += 1;
        }

        if m > l {
            loop {
                let mut g = d[l];
                let mut p = (d[l + 1] - g) / (2.0 * e[l]);
                let mut r = p.hypot(1.0);
                if p < 0.0 {
                    r = -r;
                }
                d[l] = e[l] / (p + r);
                d[l + 1] = e[l] * (p + r);
                let dl1 = d[l + 1];
                let mut h = g - d[l];
                for di in d.iter_mut().skip(l + 2) {
                    *di -= h;
                }
                f += h;

                p = d[m];
                let mut c = 1.0;
                let mut c2 = c;
                let mut c3 = c;
                let el1 = e[l + 1];
                let mut s = 0.0;
                let mut s2 = 0.0;
                for i in (l..m).rev() {
                    c3 = c2;
                    c2 = c;
                    s2 = s;
                    g = c * e[i];
                    h = c * p;
                    r = p.hypot(e[i]);
                    e[i + 1] = s * r;
                    s = e[i] / r;
                    c = p / r;
                    p = c * d[i] - s * g;
                    d[i + 1] = h + s * (c * g + s * d[i]);

                    for k in 0..n {
                        h = v[[k, i + 1]];
                        v[[k, i + 1]] = s * v[[k, i]] + c * h;
                        v[[k, i]] = c * v[[k, i]] - s * h;
                    }
                }
                p = -s * s2 * c3 * el1 * e[l] / dl1;
                e[l] = s * p;
                d[l] = c * p;

                // Negated comparison also exits on NaN.
                if !(e[l].abs() > eps * tst1) {
                    break;
                }
            }
        }
        d[l] += f;
        e[l] = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!((a - b).abs() < tol, "{} vs {}", a, b);
    }

    #[test]
    fn test_diagonal_matrix() {
        let a = array![[1.0, 0.0, 0.0], [0.0, 3.0, 0.0], [0.0, 0.0, 2.0]];
        let eig = symmetric_eigen(a.view());
        assert_close(eig.values[0], 3.0, 1e-12);
        assert_close(eig.values[1], 2.0, 1e-12);
        assert_close(eig.values[2], 1.0, 1e-12);
        assert_close(eig.vectors[[1, 0]], 1.0, 1e-12);
    }

    #[test]
    fn test_two_by_two() {
        // Eigenvalues 3 and 1, eigenvectors (1,1)/sqrt2 and (1,-1)/sqrt2
        let a = array![[2.0, 1.0], [1.0, 2.0]];
        let eig = symmetric_eigen(a.view());
        assert_close(eig.values[0], 3.0, 1e-12);
        assert_close(eig.values[1], 1.0, 1e-12);
        let s = 1.0 / 2.0f64.sqrt();
        assert_close(eig.vectors[[0, 0]].abs(), s, 1e-12);
        assert_close(eig.vectors[[1, 0]].abs(), s, 1e-12);
    }

    #[test]
    fn test_reconstruction_and_orthonormality() {
        let a = array![
            [4.0, 1.0, -2.0, 2.0],
            [1.0, 2.0, 0.0, 1.0],
            [-2.0, 0.0, 3.0, -2.0],
            [2.0, 1.0, -2.0, -1.0]
        ];
        let eig = symmetric_eigen(a.view());
        let v = &eig.vectors;

        let vtv = v.t().dot(v);
        for i in 0..4 {
            for j in 0..4 {
                assert_close(vtv[[i, j]], if i == j { 1.0 } else { 0.0 }, 1e-10);
            }
        }

        let lambda = Array2::from_diag(&eig.values);
        let rebuilt = v.dot(&lambda).dot(&v.t());
        for i in 0..4 {
            for j in 0..4 {
                assert_close(rebuilt[[i, j]], a[[i, j]], 1e-10);
            }
        }
        assert!(eig.values.windows(2).into_iter().all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_signs_are_normalized() {
        let a = array![[2.0, -1.0], [-1.0, 2.0]];
        let eig = symmetric_eigen(a.view());
        for col in eig.vectors.columns() {
            let pivot = col.iter().cloned().fold(0.0f64, |acc, x| if x.abs() > acc.abs() { x } else { acc });
            assert!(pivot >= 0.0);
        }
    }

    #[test]
    fn test_singular_matrix() {
        let a = array![[1.0, 1.0], [1.0, 1.0]];
        let eig = symmetric_eigen(a.view());
        assert_close(eig.values[0], 2.0, 1e-12);
        assert_close(eig.values[1], 0.0, 1e-12);
    }

    #[test]
    fn test_column_means_and_center() {
        let m = array![[1.0f32, 2.0], [3.0, 6.0]];
        let means = column_means(m.view());
        assert_close(means[0], 2.0, 1e-12);
        assert_close(means[1], 4.0, 1e-12);
        let c = center(m.view(), &means);
        assert_eq!(c, array![[-1.0, -2.0], [1.0, 2.0]]);
    }
}
