//! Runtime matrix values
//!
//! A [`Value`] is a dense row-major 2-D array of `f64` with at least one row
//! and one column. Scalars and vectors are not separate types, only shapes:
//!
//! - scalar: `1 x 1`
//! - vector: one row or one column
//! - matrix: anything that is not a scalar
//!
//! Coordinates exposed to MML programs are 1-based. Arithmetic always returns
//! a new value; only [`Value::set`], [`Value::set_block`], [`Value::increment`]
//! and [`Value::decrement`] mutate in place.

mod arithmetic;
mod builtins;
mod compare;
mod concat;
mod convolve;

pub use concat::Side;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MmlError, MmlResult};

/// Largest number of cells a single value may hold
pub const MAX_ELEMENTS: usize = 1 << 28;

/// Cell count of a `rows x cols` value; shapes whose count overflows or
/// exceeds [`MAX_ELEMENTS`] are rejected
pub(crate) fn element_count(rows: usize, cols: usize) -> MmlResult<usize> {
    rows.checked_mul(cols)
        .filter(|&n| n <= MAX_ELEMENTS)
        .ok_or_else(|| {
            MmlError::invalid_argument(format!(
                "{}x{} value exceeds the limit of {} elements",
                rows, cols, MAX_ELEMENTS
            ))
        })
}

/// Dense numeric array backing every MML variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ValueParts")]
pub struct Value {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

/// Unchecked serialized form, validated on the way in
#[derive(Deserialize)]
struct ValueParts {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl TryFrom<ValueParts> for Value {
    type Error = MmlError;

    fn try_from(parts: ValueParts) -> MmlResult<Self> {
        Value::new(parts.rows, parts.cols, parts.data)
    }
}

/// How reads outside the bounds of a value are resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingPolicy {
    /// Out-of-range cells read as `0`
    Zero,
    /// The value is treated as a torus
    Wrap,
    /// The nearest border cell is used
    #[default]
    Clamp,
}

impl MissingPolicy {
    /// Decode the numeric policy argument accepted by `imconv`
    pub fn from_code(code: i64) -> MmlResult<Self> {
        match code {
            0 => Ok(MissingPolicy::Zero),
            1 => Ok(MissingPolicy::Wrap),
            2 => Ok(MissingPolicy::Clamp),
            other => Err(MmlError::invalid_argument(format!(
                "unknown missing-value policy {}, expected 0 (zero), 1 (wrap) or 2 (clamp)",
                other
            ))),
        }
    }
}

impl Value {
    /// Build a value from row-major data
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> MmlResult<Self> {
        if rows == 0 || cols == 0 {
            return Err(MmlError::invalid_argument(format!(
                "a value needs at least one row and one column, got {}x{}",
                rows, cols
            )));
        }
        let len = element_count(rows, cols)?;
        if data.len() != len {
            return Err(MmlError::invalid_argument(format!(
                "{}x{} value needs {} elements, got {}",
                rows,
                cols,
                len,
                data.len()
            )));
        }
        Ok(Self { rows, cols, data })
    }

    pub fn scalar(value: f64) -> Self {
        Self { rows: 1, cols: 1, data: vec![value] }
    }

    /// Canonical logical value: `1.0` for true, `0.0` for false
    pub fn boolean(value: bool) -> Self {
        Self::scalar(if value { 1.0 } else { 0.0 })
    }

    /// Row vector holding `data`
    pub fn row_vector(data: Vec<f64>) -> MmlResult<Self> {
        let cols = data.len();
        Self::new(1, cols, data)
    }

    /// Value of the given shape with every cell set to `fill`
    pub fn filled(rows: usize, cols: usize, fill: f64) -> MmlResult<Self> {
        if rows == 0 || cols == 0 {
            return Self::new(rows, cols, Vec::new());
        }
        let len = element_count(rows, cols)?;
        Ok(Self { rows, cols, data: vec![fill; len] })
    }

    /// Internal constructor for shapes already known to be non-empty
    pub(crate) fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> f64) -> Self {
        debug_assert!(rows > 0 && cols > 0);
        let mut data = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                data.push(f(i, j));
            }
        }
        Self { rows, cols, data }
    }

    /// Apply `f` to every element
    pub(crate) fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|&x| f(x)).collect(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false; a value holds at least one element
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Row-major element storage
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn is_scalar(&self) -> bool {
        self.rows == 1 && self.cols == 1
    }

    pub fn is_vector(&self) -> bool {
        self.rows == 1 || self.cols == 1
    }

    pub fn is_matrix(&self) -> bool {
        !self.is_scalar()
    }

    /// A value is true only when it is `1 x 1` and non-zero
    pub fn is_truthy(&self) -> bool {
        self.is_scalar() && self.data[0] != 0.0
    }

    /// Human readable shape, e.g. `2x3`
    pub fn shape_string(&self) -> String {
        format!("{}x{}", self.rows, self.cols)
    }

    /// The element of a scalar, failing for anything larger
    pub fn as_scalar(&self, context: &str) -> MmlResult<f64> {
        if self.is_scalar() {
            Ok(self.data[0])
        } else {
            Err(MmlError::non_scalar(context, self.shape_string()))
        }
    }

    /// A scalar truncated towards zero, used for indices and counts
    pub fn as_integer(&self, context: &str) -> MmlResult<i64> {
        Ok(self.as_scalar(context)?.trunc() as i64)
    }

    /// Zero-based element access; callers guarantee bounds
    pub(crate) fn at(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    /// Element at 1-based `(row, col)`, resolving out-of-range coordinates
    /// with `policy`
    pub fn get_at(&self, row: i64, col: i64, policy: MissingPolicy) -> f64 {
        let rows = self.rows as i64;
        let cols = self.cols as i64;
        let (r, c) = match policy {
            MissingPolicy::Zero => {
                if row < 1 || col < 1 || row > rows || col > cols {
                    return 0.0;
                }
                (row - 1, col - 1)
            }
            MissingPolicy::Wrap => ((row - 1).rem_euclid(rows), (col - 1).rem_euclid(cols)),
            MissingPolicy::Clamp => (row.clamp(1, rows) - 1, col.clamp(1, cols) - 1),
        };
        self.at(r as usize, c as usize)
    }

    /// The `index`-th (1-based) element of a vector, or the `index`-th row of
    /// a matrix. A scalar returns itself.
    pub fn get(&self, index: i64) -> MmlResult<Value> {
        if self.is_scalar() {
            return Ok(self.clone());
        }
        if self.is_vector() {
            let i = self.check_index(index, self.len())?;
            return Ok(Value::scalar(self.data[i]));
        }
        let r = self.check_index(index, self.rows)?;
        let start = r * self.cols;
        Ok(Self {
            rows: 1,
            cols: self.cols,
            data: self.data[start..start + self.cols].to_vec(),
        })
    }

    fn check_index(&self, index: i64, len: usize) -> MmlResult<usize> {
        if index < 1 || index as usize > len {
            return Err(MmlError::IndexOutOfBounds { index, len });
        }
        Ok(index as usize - 1)
    }

    /// `A[x] = v`: vectors take a scalar element, matrices take a row vector
    /// (replacing row `x`) or a column vector (replacing column `x`)
    pub fn set(&mut self, index: i64, value: &Value) -> MmlResult<()> {
        if self.is_scalar() {
            self.check_index(index, 1)?;
            self.data[0] = value.as_scalar("Vector element assignment")?;
            return Ok(());
        }
        if self.is_vector() {
            let i = self.check_index(index, self.len())?;
            self.data[i] = value.as_scalar("Vector element assignment")?;
            return Ok(());
        }
        if !value.is_vector() {
            return Err(MmlError::shape_mismatch(
                "row assignment",
                self.shape_string(),
                value.shape_string(),
            ));
        }
        if value.rows == 1 && value.cols == self.cols {
            let r = self.check_index(index, self.rows)?;
            let start = r * self.cols;
            self.data[start..start + self.cols].copy_from_slice(&value.data);
            Ok(())
        } else if value.cols == 1 && value.rows == self.rows {
            let c = self.check_index(index, self.cols)?;
            for (i, &x) in value.data.iter().enumerate() {
                self.data[i * self.cols + c] = x;
            }
            Ok(())
        } else {
            Err(MmlError::shape_mismatch(
                "row assignment",
                self.shape_string(),
                value.shape_string(),
            ))
        }
    }

    /// `A[x][y] = v`: writes `v` as a block whose top-left corner is the
    /// 1-based cell `(x, y)`
    pub fn set_block(&mut self, row: i64, col: i64, value: &Value) -> MmlResult<()> {
        let r0 = self.check_index(row, self.rows)?;
        let c0 = self.check_index(col, self.cols)?;
        if r0 + value.rows > self.rows {
            return Err(MmlError::IndexOutOfBounds {
                index: (r0 + value.rows) as i64,
                len: self.rows,
            });
        }
        if c0 + value.cols > self.cols {
            return Err(MmlError::IndexOutOfBounds {
                index: (c0 + value.cols) as i64,
                len: self.cols,
            });
        }
        for i in 0..value.rows {
            for j in 0..value.cols {
                self.data[(r0 + i) * self.cols + c0 + j] = value.at(i, j);
            }
        }
        Ok(())
    }

    /// Add one to every element in place
    pub fn increment(&mut self) {
        self.data.iter_mut().for_each(|x| *x += 1.0);
    }

    /// Subtract one from every element in place
    pub fn decrement(&mut self) {
        self.data.iter_mut().for_each(|x| *x -= 1.0);
    }

    pub fn transpose(&self) -> Value {
        Self::from_fn(self.cols, self.rows, |i, j| self.at(j, i))
    }

    /// Iterate over rows as slices
    pub fn row_slices(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks(self.cols)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::scalar(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::boolean(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_scalar() {
            return write!(f, "{}", self.data[0]);
        }
        write!(f, "[")?;
        for (i, row) in self.row_slices().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            for (j, x) in row.iter().enumerate() {
                if j > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", x)?;
            }
        }
        write!(f, "]")
    }
}

#[cfg(test)]
pub(crate) fn mat(rows: usize, cols: usize, data: &[f64]) -> Value {
    Value::new(rows, cols, data.to_vec()).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_shape_classification() {
        assert!(Value::scalar(3.0).is_scalar());
        assert!(Value::scalar(3.0).is_vector());
        assert!(!Value::scalar(3.0).is_matrix());

        let row = mat(1, 3, &[1.0, 2.0, 3.0]);
        assert!(row.is_vector() && row.is_matrix());

        let m = mat(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        assert!(!m.is_vector() && m.is_matrix());
    }

    #[test]
    fn test_new_rejects_bad_shapes() {
        assert!(Value::new(0, 2, vec![]).is_err());
        assert!(Value::new(2, 2, vec![1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn test_oversized_shapes_are_rejected() {
        assert!(matches!(
            Value::filled(5_000_000_000, 5_000_000_000, 0.0),
            Err(MmlError::InvalidArgument { .. })
        ));
        assert!(matches!(
            Value::filled(usize::MAX, 2, 1.0),
            Err(MmlError::InvalidArgument { .. })
        ));
        assert!(matches!(
            Value::new(usize::MAX, 2, vec![1.0, 2.0]),
            Err(MmlError::InvalidArgument { .. })
        ));
        assert!(Value::filled(1, MAX_ELEMENTS + 1, 0.0).is_err());
        assert_eq!(element_count(4, 5).unwrap(), 20);
    }

    #[test]
    fn test_truthiness() {
        assert!(Value::boolean(true).is_truthy());
        assert!(!Value::boolean(false).is_truthy());
        assert!(Value::scalar(-0.5).is_truthy());
        assert!(!mat(1, 2, &[1.0, 1.0]).is_truthy());
    }

    #[test]
    fn test_get_row_and_element() {
        let m = mat(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(m.get(2).unwrap(), mat(1, 3, &[4.0, 5.0, 6.0]));

        let v = mat(3, 1, &[7.0, 8.0, 9.0]);
        assert_eq!(v.get(3).unwrap(), Value::scalar(9.0));
        assert!(matches!(v.get(4), Err(MmlError::IndexOutOfBounds { index: 4, len: 3 })));
    }

    #[test]
    fn test_get_at_policies() {
        let m = mat(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(m.get_at(0, 1, MissingPolicy::Zero), 0.0);
        assert_eq!(m.get_at(0, 1, MissingPolicy::Clamp), 1.0);
        assert_eq!(m.get_at(0, 1, MissingPolicy::Wrap), 3.0);
        assert_eq!(m.get_at(3, 3, MissingPolicy::Wrap), 1.0);
        assert_eq!(m.get_at(5, -4, MissingPolicy::Clamp), 3.0);
    }

    #[test]
    fn test_set_vector_and_rows() {
        let mut v = mat(1, 3, &[1.0, 2.0, 3.0]);
        v.set(2, &Value::scalar(9.0)).unwrap();
        assert_eq!(v, mat(1, 3, &[1.0, 9.0, 3.0]));

        let mut m = mat(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        m.set(1, &mat(1, 2, &[5.0, 6.0])).unwrap();
        assert_eq!(m, mat(2, 2, &[5.0, 6.0, 3.0, 4.0]));
        m.set(2, &mat(2, 1, &[7.0, 8.0])).unwrap();
        assert_eq!(m, mat(2, 2, &[5.0, 7.0, 3.0, 8.0]));
        assert!(m.set(1, &Value::scalar(1.0)).is_err());
    }

    #[test]
    fn test_set_block() {
        let mut m = Value::filled(3, 3, 0.0).unwrap();
        m.set_block(2, 2, &mat(2, 2, &[1.0, 2.0, 3.0, 4.0])).unwrap();
        assert_eq!(
            m,
            mat(3, 3, &[0.0, 0.0, 0.0, 0.0, 1.0, 2.0, 0.0, 3.0, 4.0])
        );
        m.set_block(1, 3, &Value::scalar(5.0)).unwrap();
        assert_eq!(m.get_at(1, 3, MissingPolicy::Zero), 5.0);
        assert!(m.set_block(3, 3, &mat(1, 2, &[1.0, 1.0])).is_err());
    }

    #[test]
    fn test_increment_decrement_in_place() {
        let mut v = mat(1, 2, &[1.0, 2.0]);
        v.increment();
        assert_eq!(v.data(), &[2.0, 3.0]);
        v.decrement();
        v.decrement();
        assert_eq!(v.data(), &[0.0, 1.0]);
    }

    #[test]
    fn test_transpose_twice_is_identity() {
        let m = mat(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let t = m.transpose();
        assert_eq!(t, mat(3, 2, &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]));
        assert_eq!(t.transpose(), m);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::scalar(2.5).to_string(), "2.5");
        assert_eq!(mat(2, 2, &[1.0, 2.0, 3.0, 4.0]).to_string(), "[1, 2; 3, 4]");
    }

    #[test]
    fn test_serde_validates_shape() {
        let json = serde_json::to_string(&mat(1, 2, &[1.0, 2.0])).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mat(1, 2, &[1.0, 2.0]));
        assert!(serde_json::from_str::<Value>(r#"{"rows":2,"cols":2,"data":[1.0]}"#).is_err());
    }
}
