use num_traits::{PrimInt, Zero};

pub mod position;
pub mod vector2;
pub mod vector3;

const MULTIPLY_DE_BRUIJN_BIT_POSITION: [u8; 32] = [
    0, 1, 28, 2, 29, 14, 24, 3, 30, 22, 20, 15, 25, 17, 4, 8, 31, 27, 13, 23, 21, 19, 16, 7, 26,
    12, 18, 6, 11, 5, 10, 9,
];

/// Maximum return value: 31
pub const fn ceil_log2(value: u32) -> u8 {
    let value = if value.is_power_of_two() {
        value
    } else {
        smallest_encompassing_power_of_two(value)
    };

    MULTIPLY_DE_BRUIJN_BIT_POSITION[(((value as usize) * 125613361) >> 27) & 31]
}

pub const fn smallest_encompassing_power_of_two(value: u32) -> u32 {
    let mut i = value - 1;
    i |= i >> 1;
    i |= i >> 2;
    i |= i >> 4;
    i |= i >> 8;
    i |= i >> 16;
    i + 1
}

#[inline]
pub fn floor_mod<T>(x: T, y: T) -> T
where
    T: PrimInt + Zero,
{
    let rem = x % y;
    if (x ^ y) < T::zero() && rem != T::zero() {
        rem + y
    } else {
        rem
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log2_helpers() {
        assert_eq!(ceil_log2(1), 0);
        assert_eq!(ceil_log2(32), 5);
        assert_eq!(ceil_log2(33), 6);
        assert_eq!(smallest_encompassing_power_of_two(33), 64);
    }

    #[test]
    fn floored_modulo() {
        assert_eq!(floor_mod(-1, 32), 31);
        assert_eq!(floor_mod(-64, 64), 0);
        assert_eq!(floor_mod(65, 64), 1);
    }
}
