//! Bit-level packing of small unsigned integers into 64-bit words.
//!
//! Two layouts exist on disk. [`Packing::Tight`] concatenates values least significant bit
//! first and lets a value straddle two words. [`Packing::Aligned`] stores
//! `floor(64 / bits)` values per word and leaves the remaining high bits as padding, so a
//! value never crosses a word boundary.

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PackingError {
    #[error("Bit width {0} is outside 1..=64")]
    InvalidBitWidth(u8),
    #[error("Value {value} at index {index} does not fit in {bits} bits")]
    ValueTooWide { index: usize, value: u64, bits: u8 },
    #[error("Expected at least {expected} words but got {actual}")]
    InsufficientData { expected: usize, actual: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Packing {
    /// Values are concatenated and may span two words.
    Tight,
    /// Values never span words; unused high bits of each word are zero.
    Aligned,
}

#[inline]
const fn mask(bits: u8) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

fn check_bits(bits: u8) -> Result<(), PackingError> {
    if bits == 0 || bits > 64 {
        Err(PackingError::InvalidBitWidth(bits))
    } else {
        Ok(())
    }
}

/// Number of words needed to hold `count` values of `bits` bits each.
pub fn packed_len(count: usize, bits: u8, packing: Packing) -> usize {
    if bits == 0 || count == 0 {
        return 0;
    }
    match packing {
        Packing::Tight => (count * bits as usize).div_ceil(64),
        Packing::Aligned => count.div_ceil(64 / bits as usize),
    }
}

pub fn pack(values: &[u64], bits: u8, packing: Packing) -> Result<Box<[u64]>, PackingError> {
    check_bits(bits)?;
    let value_mask = mask(bits);
    let mut words = vec![0u64; packed_len(values.len(), bits, packing)];

    match packing {
        Packing::Tight => {
            for (index, &value) in values.iter().enumerate() {
                if value & !value_mask != 0 {
                    return Err(PackingError::ValueTooWide { index, value, bits });
                }
                let bit = index * bits as usize;
                let word = bit / 64;
                let shift = bit % 64;
                words[word] |= value << shift;
                if shift + bits as usize > 64 {
                    words[word + 1] |= value >> (64 - shift);
                }
            }
        }
        Packing::Aligned => {
            let per_word = 64 / bits as usize;
            for (index, &value) in values.iter().enumerate() {
                if value & !value_mask != 0 {
                    return Err(PackingError::ValueTooWide { index, value, bits });
                }
                let shift = (index % per_word) * bits as usize;
                words[index / per_word] |= value << shift;
            }
        }
    }

    Ok(words.into_boxed_slice())
}

pub fn unpack(
    words: &[u64],
    bits: u8,
    count: usize,
    packing: Packing,
) -> Result<Box<[u64]>, PackingError> {
    check_bits(bits)?;
    let expected = packed_len(count, bits, packing);
    if words.len() < expected {
        return Err(PackingError::InsufficientData {
            expected,
            actual: words.len(),
        });
    }

    let value_mask = mask(bits);
    let values = match packing {
        Packing::Tight => (0..count)
            .map(|index| {
                let bit = index * bits as usize;
                let word = bit / 64;
                let shift = bit % 64;
                let mut value = words[word] >> shift;
                if shift + bits as usize > 64 {
                    value |= words[word + 1] << (64 - shift);
                }
                value & value_mask
            })
            .collect(),
        Packing::Aligned => {
            let per_word = 64 / bits as usize;
            (0..count)
                .map(|index| {
                    let shift = (index % per_word) * bits as usize;
                    (words[index / per_word] >> shift) & value_mask
                })
                .collect()
        }
    };

    Ok(values)
}

/// Smallest bit width able to index a palette of `palette_len` entries, never below 4.
pub fn min_bit_width(palette_len: usize) -> u8 {
    encompassing_bits(palette_len).max(4)
}

/// The minimum number of bits required to represent this number
#[inline]
pub fn encompassing_bits(count: usize) -> u8 {
    if count <= 1 {
        1
    } else {
        count.ilog2() as u8 + if count.is_power_of_two() { 0 } else { 1 }
    }
}

/// Packs 4-bit values two per byte, even indices in the low nibble.
pub fn pack_nibbles(values: &[u8]) -> Box<[u8]> {
    values
        .chunks(2)
        .map(|pair| {
            let low = pair[0] & 0x0F;
            let high = pair.get(1).map_or(0, |v| v & 0x0F);
            low | (high << 4)
        })
        .collect()
}

pub fn unpack_nibbles(bytes: &[u8]) -> Box<[u8]> {
    bytes
        .iter()
        .flat_map(|byte| [byte & 0x0F, byte >> 4])
        .collect()
}

#[inline]
pub fn get_nibble(bytes: &[u8], index: usize) -> u8 {
    let byte = bytes[index >> 1];
    if index & 1 == 0 {
        byte & 0x0F
    } else {
        byte >> 4
    }
}
