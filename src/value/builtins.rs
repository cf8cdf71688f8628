//! Reductions, element-wise transforms and constructors behind the MML
//! built-in functions

use super::{element_count, Value, MAX_ELEMENTS};
use crate::error::{MmlError, MmlResult};

/// Convert a size argument to a positive dimension
fn dimension(v: f64, what: &str) -> MmlResult<usize> {
    let n = v.trunc();
    if n < 1.0 {
        return Err(MmlError::invalid_argument(format!(
            "{} must be at least 1, got {}",
            what, v
        )));
    }
    Ok(n as usize)
}

impl Value {
    pub fn sum(&self) -> Value {
        Value::scalar(self.data.iter().sum())
    }

    pub fn prod(&self) -> Value {
        Value::scalar(self.data.iter().product())
    }

    /// Number of elements
    pub fn count(&self) -> Value {
        Value::scalar(self.len() as f64)
    }

    /// `[rows, cols]`
    pub fn size(&self) -> Value {
        Value::from_fn(1, 2, |_, j| if j == 0 { self.rows as f64 } else { self.cols as f64 })
    }

    /// Mean of all elements
    pub fn mean(&self) -> Value {
        Value::scalar(self.data.iter().sum::<f64>() / self.len() as f64)
    }

    pub fn max(&self) -> Value {
        Value::scalar(self.data.iter().copied().fold(f64::NEG_INFINITY, f64::max))
    }

    pub fn min(&self) -> Value {
        Value::scalar(self.data.iter().copied().fold(f64::INFINITY, f64::min))
    }

    /// Element-wise maximum with scalar broadcasting
    pub fn max_with(&self, rhs: &Value) -> MmlResult<Value> {
        self.broadcast(rhs, "max", f64::max)
    }

    /// Element-wise minimum with scalar broadcasting
    pub fn min_with(&self, rhs: &Value) -> MmlResult<Value> {
        self.broadcast(rhs, "min", f64::min)
    }

    /// Element-wise average with scalar broadcasting
    pub fn mean_with(&self, rhs: &Value) -> MmlResult<Value> {
        self.broadcast(rhs, "mean", |a, b| (a + b) / 2.0)
    }

    pub fn sqrt(&self) -> Value {
        self.map(f64::sqrt)
    }

    pub fn abs(&self) -> Value {
        self.map(f64::abs)
    }

    pub fn sin(&self) -> Value {
        self.map(f64::sin)
    }

    pub fn cos(&self) -> Value {
        self.map(f64::cos)
    }

    pub fn tan(&self) -> Value {
        self.map(f64::tan)
    }

    pub fn cot(&self) -> Value {
        self.map(|x| 1.0 / x.tan())
    }

    pub fn exp(&self) -> Value {
        self.map(f64::exp)
    }

    pub fn ceil(&self) -> Value {
        self.map(f64::ceil)
    }

    /// Concatenated rows as a single row vector
    pub fn vectorize(&self) -> Value {
        Value {
            rows: 1,
            cols: self.len(),
            data: self.data.clone(),
        }
    }

    /// Inclusive integer-step sequence from `self` towards `end` (`a : b`)
    pub fn to(&self, end: &Value) -> MmlResult<Value> {
        let from = self.as_scalar("Range start")?;
        let to = end.as_scalar("Range end")?;
        let span = (to - from).abs().floor();
        if !span.is_finite() || span >= MAX_ELEMENTS as f64 {
            return Err(MmlError::invalid_argument(format!(
                "range {} : {} has too many elements",
                from, to
            )));
        }
        let len = span as usize + 1;
        let step = if from <= to { 1.0 } else { -1.0 };
        Value::row_vector((0..len).map(|k| from + step * k as f64).collect())
    }

    /// Matrix shape from a size argument: `n` gives `1 x n`, `[r, c]` gives
    /// `r x c`
    pub fn shape_from(size: &Value) -> MmlResult<(usize, usize)> {
        if size.is_scalar() {
            return Ok((1, dimension(size.data[0], "size")?));
        }
        if size.is_vector() && size.len() == 2 {
            return Ok((
                dimension(size.data[0], "row count")?,
                dimension(size.data[1], "column count")?,
            ));
        }
        Err(MmlError::invalid_argument(format!(
            "size must be a scalar or a 2-element vector, got {}",
            size.shape_string()
        )))
    }

    /// `zeros(r, c)` / `ones(r, c)` shape
    pub fn shape_from_pair(rows: &Value, cols: &Value) -> MmlResult<(usize, usize)> {
        Ok((
            dimension(rows.as_scalar("Row count")?, "row count")?,
            dimension(cols.as_scalar("Column count")?, "column count")?,
        ))
    }

    pub fn identity(size: &Value) -> MmlResult<Value> {
        let n = dimension(size.as_scalar("Identity size")?, "identity size")?;
        element_count(n, n)?;
        Ok(Value::from_fn(n, n, |i, j| if i == j { 1.0 } else { 0.0 }))
    }

    /// Block of `height x width` cells whose top-left corner is the 1-based
    /// cell `(row, col)`
    pub fn submatrix(&self, row: i64, col: i64, height: i64, width: i64) -> MmlResult<Value> {
        if height < 1 || width < 1 {
            return Err(MmlError::invalid_argument(format!(
                "submatrix size must be positive, got {}x{}",
                height, width
            )));
        }
        // height and width are at least 1, so only the addition can overflow
        let last_row = row.checked_add(height - 1).unwrap_or(i64::MAX);
        if row < 1 || last_row > self.rows as i64 {
            return Err(MmlError::IndexOutOfBounds {
                index: if row < 1 { row } else { last_row },
                len: self.rows,
            });
        }
        let last_col = col.checked_add(width - 1).unwrap_or(i64::MAX);
        if col < 1 || last_col > self.cols as i64 {
            return Err(MmlError::IndexOutOfBounds {
                index: if col < 1 { col } else { last_col },
                len: self.cols,
            });
        }
        let (r0, c0) = (row as usize - 1, col as usize - 1);
        Ok(Value::from_fn(height as usize, width as usize, |i, j| {
            self.at(r0 + i, c0 + j)
        }))
    }

    /// `sub(m, origin, extent)`: two-element vectors select a block, scalars
    /// select whole rows
    pub fn sub(&self, origin: &Value, extent: &Value) -> MmlResult<Value> {
        if origin.is_scalar() && extent.is_scalar() {
            let row = origin.as_integer("Row")?;
            let height = extent.as_integer("Height")?;
            return self.submatrix(row, 1, height, self.cols as i64);
        }
        if origin.is_vector() && origin.len() == 2 && extent.is_vector() && extent.len() == 2 {
            return self.submatrix(
                origin.data[0].trunc() as i64,
                origin.data[1].trunc() as i64,
                extent.data[0].trunc() as i64,
                extent.data[1].trunc() as i64,
            );
        }
        Err(MmlError::invalid_argument(
            "sub expects two scalars or two 2-element vectors",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::mat;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reductions() {
        let m = mat(2, 2, &[1.0, -2.0, 3.0, 6.0]);
        assert_eq!(m.sum(), Value::scalar(8.0));
        assert_eq!(m.prod(), Value::scalar(-36.0));
        assert_eq!(m.count(), Value::scalar(4.0));
        assert_eq!(m.size(), mat(1, 2, &[2.0, 2.0]));
        assert_eq!(m.mean(), Value::scalar(2.0));
        assert_eq!(m.max(), Value::scalar(6.0));
        assert_eq!(m.min(), Value::scalar(-2.0));
    }

    #[test]
    fn test_binary_max_min_mean_broadcast() {
        let m = mat(1, 3, &[1.0, 5.0, 3.0]);
        let s = Value::scalar(2.0);
        assert_eq!(m.max_with(&s).unwrap(), mat(1, 3, &[2.0, 5.0, 3.0]));
        assert_eq!(s.min_with(&m).unwrap(), mat(1, 3, &[1.0, 2.0, 2.0]));
        assert_eq!(m.mean_with(&m).unwrap(), m);
        assert!(m.max_with(&mat(1, 2, &[1.0, 1.0])).is_err());
    }

    #[test]
    fn test_range() {
        let up = Value::scalar(1.0).to(&Value::scalar(4.0)).unwrap();
        assert_eq!(up, mat(1, 4, &[1.0, 2.0, 3.0, 4.0]));
        let down = Value::scalar(3.0).to(&Value::scalar(1.0)).unwrap();
        assert_eq!(down, mat(1, 3, &[3.0, 2.0, 1.0]));
        assert_eq!(Value::scalar(2.0).to(&Value::scalar(2.0)).unwrap(), Value::scalar(2.0));
        assert!(mat(1, 2, &[1.0, 2.0]).to(&Value::scalar(3.0)).is_err());
    }

    #[test]
    fn test_range_too_long() {
        assert!(matches!(
            Value::scalar(1.0).to(&Value::scalar(1e18)),
            Err(MmlError::InvalidArgument { .. })
        ));
        assert!(matches!(
            Value::scalar(0.0).to(&Value::scalar(f64::INFINITY)),
            Err(MmlError::InvalidArgument { .. })
        ));
        assert!(Value::scalar(f64::NAN).to(&Value::scalar(1.0)).is_err());
    }

    #[test]
    fn test_identity_too_large() {
        assert!(matches!(
            Value::identity(&Value::scalar(5_000_000_000.0)),
            Err(MmlError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_shapes_and_identity() {
        assert_eq!(Value::shape_from(&Value::scalar(3.0)).unwrap(), (1, 3));
        assert_eq!(Value::shape_from(&mat(1, 2, &[2.0, 4.0])).unwrap(), (2, 4));
        assert!(Value::shape_from(&mat(1, 3, &[1.0, 1.0, 1.0])).is_err());
        assert!(Value::shape_from(&Value::scalar(0.0)).is_err());
        assert_eq!(
            Value::identity(&Value::scalar(2.0)).unwrap(),
            mat(2, 2, &[1.0, 0.0, 0.0, 1.0])
        );
    }

    #[test]
    fn test_sub() {
        let m = mat(3, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        assert_eq!(
            m.sub(&mat(1, 2, &[2.0, 2.0]), &mat(1, 2, &[2.0, 2.0])).unwrap(),
            mat(2, 2, &[5.0, 6.0, 8.0, 9.0])
        );
        assert_eq!(
            m.sub(&Value::scalar(3.0), &Value::scalar(1.0)).unwrap(),
            mat(1, 3, &[7.0, 8.0, 9.0])
        );
        assert!(matches!(
            m.submatrix(3, 3, 2, 1),
            Err(MmlError::IndexOutOfBounds { index: 4, len: 3 })
        ));
    }

    #[test]
    fn test_sub_with_huge_extent() {
        let m = Value::filled(3, 3, 1.0).unwrap();
        let huge = Value::scalar(i64::MAX as f64);
        assert!(matches!(
            m.sub(&Value::scalar(2.0), &huge),
            Err(MmlError::IndexOutOfBounds { len: 3, .. })
        ));
        assert!(matches!(
            m.submatrix(1, 2, 1, i64::MAX),
            Err(MmlError::IndexOutOfBounds { index: i64::MAX, len: 3 })
        ));
    }

    #[test]
    fn test_vectorize_and_transforms() {
        let m = mat(2, 2, &[1.0, 4.0, 9.0, 16.0]);
        assert_eq!(m.vectorize(), mat(1, 4, &[1.0, 4.0, 9.0, 16.0]));
        assert_eq!(m.sqrt(), mat(2, 2, &[1.0, 2.0, 3.0, 4.0]));
        assert_eq!(mat(1, 2, &[-1.5, 2.0]).abs(), mat(1, 2, &[1.5, 2.0]));
        assert_eq!(mat(1, 2, &[0.2, -1.7]).ceil(), mat(1, 2, &[1.0, -1.0]));
        assert_eq!(Value::scalar(0.0).exp(), Value::scalar(1.0));
    }
}
