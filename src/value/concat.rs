//! Concatenation and self-repetition

use super::{element_count, Value};
use crate::error::{MmlError, MmlResult};

/// Direction of a concatenation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Side by side (`|`), row counts must agree
    Beside,
    /// Top to bottom (`_`), column counts must agree
    Below,
}

impl Value {
    /// Join two values. Scalars and vectors follow the same rule as
    /// matrices, so `1 | 2` is a `1x2` row and `1 _ [2; 3]` a `3x1` column.
    pub fn concat(&self, rhs: &Value, side: Side) -> MmlResult<Value> {
        let incompatible = || MmlError::IncompatibleConcat {
            lhs: self.shape_string(),
            rhs: rhs.shape_string(),
        };
        match side {
            Side::Beside => {
                if self.rows != rhs.rows {
                    return Err(incompatible());
                }
                Ok(Value::from_fn(self.rows, self.cols + rhs.cols, |i, j| {
                    if j < self.cols {
                        self.at(i, j)
                    } else {
                        rhs.at(i, j - self.cols)
                    }
                }))
            }
            Side::Below => {
                if self.cols != rhs.cols {
                    return Err(incompatible());
                }
                let mut data = Vec::with_capacity(self.len() + rhs.len());
                data.extend_from_slice(&self.data);
                data.extend_from_slice(&rhs.data);
                Ok(Value {
                    rows: self.rows + rhs.rows,
                    cols: self.cols,
                    data,
                })
            }
        }
    }

    /// Concatenate the value with itself `times` times (`*|`, `*_`)
    pub fn repeat(&self, times: &Value, side: Side) -> MmlResult<Value> {
        let n = times.as_integer("Repetition count")?;
        if n < 1 {
            return Err(MmlError::invalid_argument(format!(
                "repetition count must be at least 1, got {}",
                n
            )));
        }
        let n = n as usize;
        let too_large = || {
            MmlError::invalid_argument(format!(
                "cannot repeat a {} value {} times",
                self.shape_string(),
                n
            ))
        };
        let (rows, cols) = match side {
            Side::Beside => (self.rows, self.cols.checked_mul(n).ok_or_else(too_large)?),
            Side::Below => (self.rows.checked_mul(n).ok_or_else(too_large)?, self.cols),
        };
        element_count(rows, cols)?;
        Ok(Value::from_fn(rows, cols, |i, j| self.at(i % self.rows, j % self.cols)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::mat;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_scalar_concat() {
        let a = Value::scalar(1.0);
        let b = Value::scalar(2.0);
        assert_eq!(a.concat(&b, Side::Beside).unwrap(), mat(1, 2, &[1.0, 2.0]));
        assert_eq!(a.concat(&b, Side::Below).unwrap(), mat(2, 1, &[1.0, 2.0]));
    }

    #[test]
    fn test_scalar_prepend_to_vector() {
        let row = mat(1, 2, &[2.0, 3.0]);
        assert_eq!(
            Value::scalar(1.0).concat(&row, Side::Beside).unwrap(),
            mat(1, 3, &[1.0, 2.0, 3.0])
        );
        assert!(matches!(
            Value::scalar(1.0).concat(&row, Side::Below),
            Err(MmlError::IncompatibleConcat { .. })
        ));
    }

    #[test]
    fn test_matrix_concat() {
        let a = mat(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let col = mat(2, 1, &[9.0, 9.0]);
        assert_eq!(
            a.concat(&col, Side::Beside).unwrap(),
            mat(2, 3, &[1.0, 2.0, 9.0, 3.0, 4.0, 9.0])
        );
        assert_eq!(
            a.concat(&a, Side::Below).unwrap(),
            mat(4, 2, &[1.0, 2.0, 3.0, 4.0, 1.0, 2.0, 3.0, 4.0])
        );
        assert!(a.concat(&col, Side::Below).is_err());
    }

    #[test]
    fn test_repeat() {
        let a = mat(1, 2, &[1.0, 2.0]);
        assert_eq!(
            a.repeat(&Value::scalar(3.0), Side::Beside).unwrap(),
            mat(1, 6, &[1.0, 2.0, 1.0, 2.0, 1.0, 2.0])
        );
        assert_eq!(
            a.repeat(&Value::scalar(2.0), Side::Below).unwrap(),
            mat(2, 2, &[1.0, 2.0, 1.0, 2.0])
        );
        assert!(a.repeat(&Value::scalar(0.0), Side::Beside).is_err());
    }

    #[test]
    fn test_repeat_too_many_times() {
        let a = mat(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        assert!(matches!(
            a.repeat(&Value::scalar(5_000_000_000.0), Side::Beside),
            Err(MmlError::InvalidArgument { .. })
        ));
        assert!(matches!(
            a.repeat(&Value::scalar(i64::MAX as f64), Side::Below),
            Err(MmlError::InvalidArgument { .. })
        ));
    }
}
