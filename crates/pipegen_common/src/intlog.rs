//! Integer logarithms used to size counters, shift amounts and address buses.

/// Returns the number of bits needed to write `n` in binary (`0` for `0`).
///
/// This is `floor(log2(n)) + 1` for `n > 0`, so `intlog2(8) == 4`.
pub fn intlog2(n: u64) -> u32 {
    u64::BITS - n.leading_zeros()
}

/// Returns `ceil(log2(n))`, with `ceil_log2(0) == ceil_log2(1) == 0`.
///
/// This is the address width needed to index `n` entries.
pub fn ceil_log2(n: u64) -> u32 {
    if n <= 1 {
        0
    } else {
        intlog2(n - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intlog2_counts_bits() {
        assert_eq!(intlog2(0), 0);
        assert_eq!(intlog2(1), 1);
        assert_eq!(intlog2(7), 3);
        assert_eq!(intlog2(8), 4);
        assert_eq!(intlog2(u64::MAX), 64);
    }

    #[test]
    fn ceil_log2_addresses() {
        assert_eq!(ceil_log2(1), 0);
        assert_eq!(ceil_log2(2), 1);
        assert_eq!(ceil_log2(24), 5);
        assert_eq!(ceil_log2(32), 5);
        assert_eq!(ceil_log2(33), 6);
    }
}
