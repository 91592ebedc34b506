/// Floating point type used for internal plant quantities.
pub type Real = f64;

/// Encode a non-negative quantity into a register word.
///
/// Registers hold whole units: the value is floored, NaN and negatives map to 0
/// and anything above `u16::MAX` saturates.
pub fn encode_real(v: Real) -> u16 {
    if !v.is_finite() {
        return if v == Real::INFINITY { u16::MAX } else { 0 };
    }
    v.floor().clamp(0.0, u16::MAX as Real) as u16
}

/// Saturating conversion of a count into a register word.
pub fn encode_count(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}

/// Encode a flag as 0/1.
pub fn encode_flag(on: bool) -> u16 {
    u16::from(on)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_real_floors_and_saturates() {
        assert_eq!(encode_real(99.9), 99);
        assert_eq!(encode_real(100.0), 100);
        assert_eq!(encode_real(-3.0), 0);
        assert_eq!(encode_real(Real::NAN), 0);
        assert_eq!(encode_real(1.0e9), u16::MAX);
        assert_eq!(encode_real(Real::INFINITY), u16::MAX);
    }

    #[test]
    fn encode_count_saturates() {
        assert_eq!(encode_count(7), 7);
        assert_eq!(encode_count(1 << 20), u16::MAX);
    }
}
