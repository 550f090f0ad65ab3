//! Wrap-around comparison of fixed-width sequence counters.
//!
//! A result is only meaningful while the real distance between the two counters
//! stays below half the counter's range (128 for u8, 32768 for u16).

/// Signed distance from `s2` to `s1` for 8-bit counters. Positive when `s1` is newer.
pub fn seq_diff_u8(s1: u8, s2: u8) -> i32 {
    ((i32::from(s1) << 24).wrapping_sub(i32::from(s2) << 24)) >> 24
}

/// Signed distance from `s2` to `s1` for 16-bit counters. Positive when `s1` is newer.
pub fn seq_diff_u16(s1: u16, s2: u16) -> i32 {
    ((i32::from(s1) << 16).wrapping_sub(i32::from(s2) << 16)) >> 16
}

/// A fixed-width counter compared cyclically.
pub trait WrappingSequence: Copy {
    /// Signed distance from `other` to `self`.
    fn seq_diff(self, other: Self) -> i32;

    /// Returns true if `self` comes after `other` under wrap-around.
    fn is_newer_than(self, other: Self) -> bool {
        self.seq_diff(other) > 0
    }
}

impl WrappingSequence for u8 {
    fn seq_diff(self, other: Self) -> i32 {
        seq_diff_u8(self, other)
    }
}

impl WrappingSequence for u16 {
    fn seq_diff(self, other: Self) -> i32 {
        seq_diff_u16(self, other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u8_antisymmetric_within_half_range() {
        for a in 0..=u8::MAX {
            assert_eq!(seq_diff_u8(a, a), 0);
            for b in 0..=u8::MAX {
                if a.wrapping_sub(b) == 128 {
                    // Exactly half the range is ambiguous by construction.
                    continue;
                }
                assert_eq!(seq_diff_u8(a, b), -seq_diff_u8(b, a), "a={} b={}", a, b);
            }
        }
    }

    #[test]
    fn test_u8_wrap_around() {
        assert_eq!(seq_diff_u8(0, 255), 1);
        assert_eq!(seq_diff_u8(255, 0), -1);
        assert_eq!(seq_diff_u8(5, 250), 11);
        assert!(0u8.is_newer_than(255));
        assert!(!255u8.is_newer_than(0));
    }

    #[test]
    fn test_u8_magnitude_is_true_distance() {
        assert_eq!(seq_diff_u8(13, 10), 3);
        assert_eq!(seq_diff_u8(5, 12), -7);
        assert_eq!(seq_diff_u8(127, 0), 127);
        assert_eq!(seq_diff_u8(0, 127), -127);
    }

    #[test]
    fn test_u16_wrap_around() {
        assert_eq!(seq_diff_u16(0, 65535), 1);
        assert_eq!(seq_diff_u16(65535, 0), -1);
        assert_eq!(seq_diff_u16(10, 65500), 46);
        assert_eq!(seq_diff_u16(1000, 1000), 0);
        assert!(10u16.is_newer_than(65500));
        assert!(!65002u16.is_newer_than(10));
    }

    #[test]
    fn test_u16_antisymmetric_sample() {
        for a in (0..=u16::MAX).step_by(251) {
            for b in (0..=u16::MAX).step_by(509) {
                if a.wrapping_sub(b) == 32768 {
                    continue;
                }
                assert_eq!(seq_diff_u16(a, b), -seq_diff_u16(b, a));
            }
        }
    }
}
