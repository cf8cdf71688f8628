//! 2-D convolution
//!
//! `convolution_full` is the textbook full convolution (`conv2`), the output
//! grows by the kernel size minus one in each direction. `convolution_same`
//! is the image filter (`imconv`): the kernel is centred on every source
//! cell and the output keeps the source shape.

use super::{MissingPolicy, Value};

impl Value {
    /// Full 2-D convolution, `(m+p-1) x (n+q-1)` for an `m x n` source and a
    /// `p x q` kernel
    pub fn convolution_full(&self, kernel: &Value) -> Value {
        let rows = self.rows + kernel.rows - 1;
        let cols = self.cols + kernel.cols - 1;
        Value::from_fn(rows, cols, |i, j| {
            let mut sum = 0.0;
            // kernel offsets that keep the source index inside bounds
            let k_lo = i.saturating_sub(self.rows - 1);
            let k_hi = i.min(kernel.rows - 1);
            let l_lo = j.saturating_sub(self.cols - 1);
            let l_hi = j.min(kernel.cols - 1);
            for k in k_lo..=k_hi {
                for l in l_lo..=l_hi {
                    sum += self.at(i - k, j - l) * kernel.at(k, l);
                }
            }
            sum
        })
    }

    /// Same-size filtering with the kernel centred at `(rows/2, cols/2)`;
    /// cells outside the source are read through `missing`
    pub fn convolution_same(&self, kernel: &Value, missing: MissingPolicy) -> Value {
        let cr = (kernel.rows / 2) as i64;
        let cc = (kernel.cols / 2) as i64;
        Value::from_fn(self.rows, self.cols, |i, j| {
            let mut sum = 0.0;
            for k in 0..kernel.rows {
                for l in 0..kernel.cols {
                    let row = i as i64 + k as i64 - cr + 1;
                    let col = j as i64 + l as i64 - cc + 1;
                    sum += self.get_at(row, col, missing) * kernel.at(k, l);
                }
            }
            sum
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::mat;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_full_convolution_size() {
        for (m, n, p, q) in [(1, 1, 1, 1), (2, 3, 2, 2), (4, 1, 3, 5), (3, 3, 1, 2)] {
            let a = Value::filled(m, n, 1.0).unwrap();
            let b = Value::filled(p, q, 1.0).unwrap();
            assert_eq!(a.convolution_full(&b).shape(), (m + p - 1, n + q - 1));
        }
    }

    #[test]
    fn test_full_convolution_values() {
        let a = mat(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let b = mat(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        assert_eq!(
            a.convolution_full(&b),
            mat(3, 3, &[1.0, 3.0, 2.0, 4.0, 10.0, 6.0, 3.0, 7.0, 4.0])
        );

        let row = mat(1, 3, &[1.0, 2.0, 3.0]);
        let k = mat(1, 2, &[1.0, -1.0]);
        assert_eq!(row.convolution_full(&k), mat(1, 4, &[1.0, 1.0, 1.0, -3.0]));
    }

    #[test]
    fn test_same_convolution_identity_kernel() {
        let a = mat(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let k = mat(3, 3, &[0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
        for policy in [MissingPolicy::Zero, MissingPolicy::Wrap, MissingPolicy::Clamp] {
            assert_eq!(a.convolution_same(&k, policy), a);
        }
    }

    #[test]
    fn test_same_convolution_policies() {
        let a = mat(1, 3, &[1.0, 2.0, 3.0]);
        let k = mat(1, 3, &[1.0, 1.0, 1.0]);
        assert_eq!(a.convolution_same(&k, MissingPolicy::Zero), mat(1, 3, &[3.0, 6.0, 5.0]));
        assert_eq!(a.convolution_same(&k, MissingPolicy::Clamp), mat(1, 3, &[4.0, 6.0, 8.0]));
        assert_eq!(a.convolution_same(&k, MissingPolicy::Wrap), mat(1, 3, &[6.0, 6.0, 6.0]));
    }
}
