//! Small numeric helpers.

/// Next power of two at or above `n`.
///
/// Powers of two are fixed points; `next_pow2(0)` is 1.
///
/// ```
/// use havkit::math::next_pow2;
///
/// assert_eq!(next_pow2(1023), 1024);
/// assert_eq!(next_pow2(1024), 1024);
/// ```
pub fn next_pow2(n: u64) -> u64 {
    n.max(1).next_power_of_two()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_pow2() {
        assert_eq!(next_pow2(0), 1);
        assert_eq!(next_pow2(1), 1);
        assert_eq!(next_pow2(2), 2);
        assert_eq!(next_pow2(3), 4);
        assert_eq!(next_pow2(1023), 1024);
        assert_eq!(next_pow2(1024), 1024);
        assert_eq!(next_pow2(1025), 2048);
    }
}
