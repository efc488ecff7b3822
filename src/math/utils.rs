/// Half a millimetre in world units. Lengths and distances closer than this
/// are treated as equal.
pub const NEARLY_EQUAL_EPSILON: f32 = 0.0005;

#[inline]
pub fn nearly_equal(a: f32, b: f32) -> bool {
    (a - b).abs() < NEARLY_EQUAL_EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearly_equal_contract() {
        assert!(nearly_equal(1.0, 1.0));
        assert!(nearly_equal(1.0, 1.0004));
        assert!(nearly_equal(-2.0, -2.0003));

        assert!(!nearly_equal(1.0, 1.0006));
        assert!(!nearly_equal(0.0, 0.01));
    }
}
