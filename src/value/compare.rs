//! Comparison and logic operators, all producing canonical booleans

use super::Value;

impl Value {
    /// True when `rel` holds for every element pair. A scalar operand is
    /// compared against each element of the other; differently shaped
    /// non-scalars never compare true.
    fn holds_everywhere(&self, rhs: &Value, rel: impl Fn(f64, f64) -> bool) -> bool {
        if self.is_scalar() {
            let l = self.data[0];
            return rhs.data.iter().all(|&r| rel(l, r));
        }
        if rhs.is_scalar() {
            let r = rhs.data[0];
            return self.data.iter().all(|&l| rel(l, r));
        }
        self.shape() == rhs.shape() && self.data.iter().zip(&rhs.data).all(|(&l, &r)| rel(l, r))
    }

    /// Structural equality: same shape and same elements
    pub fn equal(&self, rhs: &Value) -> Value {
        Value::boolean(self.shape() == rhs.shape() && self.data == rhs.data)
    }

    pub fn not_equal(&self, rhs: &Value) -> Value {
        self.equal(rhs).not()
    }

    pub fn less(&self, rhs: &Value) -> Value {
        Value::boolean(self.holds_everywhere(rhs, |a, b| a < b))
    }

    pub fn greater(&self, rhs: &Value) -> Value {
        Value::boolean(self.holds_everywhere(rhs, |a, b| a > b))
    }

    pub fn less_equal(&self, rhs: &Value) -> Value {
        Value::boolean(self.holds_everywhere(rhs, |a, b| a <= b))
    }

    pub fn greater_equal(&self, rhs: &Value) -> Value {
        Value::boolean(self.holds_everywhere(rhs, |a, b| a >= b))
    }

    pub fn and(&self, rhs: &Value) -> Value {
        Value::boolean(self.is_truthy() && rhs.is_truthy())
    }

    pub fn or(&self, rhs: &Value) -> Value {
        Value::boolean(self.is_truthy() || rhs.is_truthy())
    }

    pub fn not(&self) -> Value {
        Value::boolean(!self.is_truthy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::mat;

    fn truth(v: Value) -> bool {
        v.is_truthy()
    }

    #[test]
    fn test_equal_on_mismatched_shapes_is_false() {
        let a = mat(1, 2, &[1.0, 1.0]);
        let b = mat(2, 1, &[1.0, 1.0]);
        assert!(!truth(a.equal(&b)));
        assert!(truth(a.not_equal(&b)));
        assert!(truth(a.equal(&a.clone())));
    }

    #[test]
    fn test_equality_does_not_broadcast() {
        let m = mat(1, 2, &[2.0, 2.0]);
        let two = Value::scalar(2.0);
        assert!(!truth(m.equal(&two)));
        assert!(truth(m.not_equal(&two)));
        assert!(truth(m.less_equal(&two)));
        assert!(truth(two.equal(&Value::scalar(2.0))));
    }

    #[test]
    fn test_scalar_relations() {
        let one = Value::scalar(1.0);
        let two = Value::scalar(2.0);
        assert!(truth(one.less(&two)));
        assert!(truth(one.less_equal(&one)));
        assert!(truth(two.greater(&one)));
        assert!(truth(two.greater_equal(&two)));
        assert!(!truth(two.less(&one)));
    }

    #[test]
    fn test_scalar_against_matrix() {
        let m = mat(1, 3, &[2.0, 3.0, 4.0]);
        assert!(truth(Value::scalar(1.0).less(&m)));
        assert!(!truth(Value::scalar(3.0).less(&m)));
        assert!(truth(m.greater_equal(&Value::scalar(2.0))));
    }

    #[test]
    fn test_logic_uses_truthiness() {
        let t = Value::boolean(true);
        let f = Value::boolean(false);
        assert!(truth(t.and(&t)));
        assert!(!truth(t.and(&f)));
        assert!(truth(f.or(&t)));
        assert!(truth(f.not()));
        assert!(truth(mat(1, 2, &[1.0, 1.0]).not()));
    }
}
