//! Arithmetic with scalar broadcasting

use super::Value;
use crate::error::{MmlError, MmlResult};

/// Remainder moved into `[0, |m|)`
fn wrap_mod(a: f64, m: f64) -> f64 {
    let r = a % m;
    if r >= 0.0 {
        return r;
    }
    let r = r + m.abs();
    if r >= m.abs() {
        0.0
    } else {
        r
    }
}

impl Value {
    /// Shared broadcasting rule: a scalar operand is applied to every element
    /// of the other one, otherwise both shapes must be equal.
    pub(crate) fn broadcast(
        &self,
        rhs: &Value,
        op: &str,
        f: impl Fn(f64, f64) -> f64,
    ) -> MmlResult<Value> {
        if self.is_scalar() && !rhs.is_scalar() {
            let l = self.data[0];
            return Ok(rhs.map(|r| f(l, r)));
        }
        if rhs.is_scalar() {
            let r = rhs.data[0];
            return Ok(self.map(|l| f(l, r)));
        }
        if self.shape() != rhs.shape() {
            return Err(MmlError::shape_mismatch(op, self.shape_string(), rhs.shape_string()));
        }
        Ok(Value {
            rows: self.rows,
            cols: self.cols,
            data: self
                .data
                .iter()
                .zip(&rhs.data)
                .map(|(&l, &r)| f(l, r))
                .collect(),
        })
    }

    fn reject_zero(divisor: &Value) -> MmlResult<()> {
        if divisor.data.iter().any(|&x| x == 0.0) {
            return Err(MmlError::DivideByZero);
        }
        Ok(())
    }

    pub fn add(&self, rhs: &Value) -> MmlResult<Value> {
        self.broadcast(rhs, "addition", |a, b| a + b)
    }

    pub fn subtract(&self, rhs: &Value) -> MmlResult<Value> {
        self.broadcast(rhs, "subtraction", |a, b| a - b)
    }

    pub fn negate(&self) -> Value {
        self.map(|x| -x)
    }

    /// Scalar scaling when either side is a scalar, matrix product otherwise
    pub fn multiply(&self, rhs: &Value) -> MmlResult<Value> {
        if self.is_scalar() || rhs.is_scalar() {
            return self.broadcast(rhs, "multiplication", |a, b| a * b);
        }
        if self.cols != rhs.rows {
            return Err(MmlError::shape_mismatch(
                "matrix multiplication",
                self.shape_string(),
                rhs.shape_string(),
            ));
        }
        Ok(Value::from_fn(self.rows, rhs.cols, |i, j| {
            (0..self.cols).map(|k| self.at(i, k) * rhs.at(k, j)).sum()
        }))
    }

    pub fn elem_multiply(&self, rhs: &Value) -> MmlResult<Value> {
        self.broadcast(rhs, "element-wise multiplication", |a, b| a * b)
    }

    pub fn elem_divide(&self, rhs: &Value) -> MmlResult<Value> {
        Self::reject_zero(rhs)?;
        self.broadcast(rhs, "element-wise division", |a, b| a / b)
    }

    pub fn elem_power(&self, rhs: &Value) -> MmlResult<Value> {
        self.broadcast(rhs, "element-wise power", f64::powf)
    }

    pub fn elem_modulo(&self, rhs: &Value) -> MmlResult<Value> {
        Self::reject_zero(rhs)?;
        self.broadcast(rhs, "element-wise modulo", wrap_mod)
    }

    /// Division by a scalar
    pub fn divide(&self, rhs: &Value) -> MmlResult<Value> {
        let d = rhs.as_scalar("Divisor")?;
        if d == 0.0 {
            return Err(MmlError::DivideByZero);
        }
        Ok(self.map(|x| x / d))
    }

    /// Modulo by a scalar, every result lies in `[0, |m|)`
    pub fn modulo(&self, rhs: &Value) -> MmlResult<Value> {
        let m = rhs.as_scalar("Modulus")?;
        if m == 0.0 {
            return Err(MmlError::DivideByZero);
        }
        Ok(self.map(|x| wrap_mod(x, m)))
    }

    /// Integer power by repeated multiplication. The exponent is truncated.
    pub fn power(&self, rhs: &Value) -> MmlResult<Value> {
        let n = rhs.as_integer("Exponent")?;
        if self.is_scalar() {
            let exp = i32::try_from(n)
                .map_err(|_| MmlError::invalid_argument(format!("exponent {} is too large", n)))?;
            return Ok(Value::scalar(self.data[0].powi(exp)));
        }
        if self.rows != self.cols {
            return Err(MmlError::shape_mismatch(
                "matrix power",
                self.shape_string(),
                rhs.shape_string(),
            ));
        }
        if n < 0 {
            return Err(MmlError::invalid_argument(
                "matrix power needs a non-negative exponent",
            ));
        }
        let mut result = Value::from_fn(self.rows, self.cols, |i, j| if i == j { 1.0 } else { 0.0 });
        for _ in 0..n {
            result = self.multiply(&result)?;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::mat;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_add_broadcasts_both_ways() {
        let m = mat(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let s = Value::scalar(10.0);
        let expected = mat(2, 2, &[11.0, 12.0, 13.0, 14.0]);
        assert_eq!(m.add(&s).unwrap(), expected);
        assert_eq!(s.add(&m).unwrap(), expected);
    }

    #[test]
    fn test_add_shape_mismatch() {
        let a = Value::filled(2, 2, 1.0).unwrap();
        let b = Value::filled(3, 3, 1.0).unwrap();
        assert!(matches!(a.add(&b), Err(MmlError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_subtract_scalar_first() {
        let m = mat(1, 2, &[1.0, 2.0]);
        assert_eq!(Value::scalar(5.0).subtract(&m).unwrap(), mat(1, 2, &[4.0, 3.0]));
    }

    #[test]
    fn test_matrix_multiply() {
        let a = mat(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let b = mat(2, 2, &[5.0, 6.0, 7.0, 8.0]);
        assert_eq!(a.multiply(&b).unwrap(), mat(2, 2, &[19.0, 22.0, 43.0, 50.0]));

        let row = mat(1, 3, &[1.0, 2.0, 3.0]);
        assert_eq!(row.multiply(&row.transpose()).unwrap(), Value::scalar(14.0));
        assert!(row.multiply(&row).is_err());
    }

    #[test]
    fn test_elementwise_ops() {
        let a = mat(1, 3, &[2.0, 4.0, 6.0]);
        let b = mat(1, 3, &[1.0, 2.0, 4.0]);
        assert_eq!(a.elem_multiply(&b).unwrap(), mat(1, 3, &[2.0, 8.0, 24.0]));
        assert_eq!(a.elem_divide(&b).unwrap(), mat(1, 3, &[2.0, 2.0, 1.5]));
        assert_eq!(b.elem_power(&Value::scalar(2.0)).unwrap(), mat(1, 3, &[1.0, 4.0, 16.0]));
        assert_eq!(a.elem_modulo(&b).unwrap(), mat(1, 3, &[0.0, 0.0, 2.0]));
    }

    #[test]
    fn test_division_by_zero() {
        let a = mat(1, 2, &[1.0, 2.0]);
        assert_eq!(a.divide(&Value::scalar(0.0)), Err(MmlError::DivideByZero));
        assert_eq!(a.elem_divide(&mat(1, 2, &[1.0, 0.0])), Err(MmlError::DivideByZero));
        assert_eq!(a.modulo(&Value::scalar(0.0)), Err(MmlError::DivideByZero));
        assert!(matches!(a.divide(&a), Err(MmlError::NonScalarContext { .. })));
    }

    #[test]
    fn test_modulo_range() {
        for a in [-7.5, -3.0, -0.25, 0.0, 1.0, 5.0, 13.7] {
            for m in [-4.0, -1.5, 0.3, 2.0, 3.0] {
                let r = Value::scalar(a).modulo(&Value::scalar(m)).unwrap().data()[0];
                assert!(r >= 0.0 && r < f64::abs(m), "{} mod {} = {}", a, m, r);
            }
        }
        assert_eq!(Value::scalar(-3.0).modulo(&Value::scalar(2.0)).unwrap(), Value::scalar(1.0));
    }

    #[test]
    fn test_integer_power() {
        let a = mat(2, 2, &[1.0, 1.0, 0.0, 1.0]);
        assert_eq!(a.power(&Value::scalar(3.0)).unwrap(), mat(2, 2, &[1.0, 3.0, 0.0, 1.0]));
        assert_eq!(a.power(&Value::scalar(0.0)).unwrap(), mat(2, 2, &[1.0, 0.0, 0.0, 1.0]));
        assert_eq!(Value::scalar(2.0).power(&Value::scalar(3.9)).unwrap(), Value::scalar(8.0));
        assert_eq!(Value::scalar(2.0).power(&Value::scalar(-1.0)).unwrap(), Value::scalar(0.5));
        assert!(mat(1, 2, &[1.0, 2.0]).power(&Value::scalar(2.0)).is_err());
    }
}
