//! Arithmetic decoding of packed text.
//!
//! Every printed string is coded on its own, starting at a byte boundary, with
//! one adaptive-free model: the cumulative frequency table in the image. Entry
//! `0` is the total and symbol `s` (character `s - 1`) owns the interval
//! `[freq[s], freq[s - 1])`. Bits are taken least significant first.

use crate::acode::Aword;
use crate::error::VmError;

pub const VALUE_BITS: u32 = 16;
pub const TOP_VALUE: i64 = (1 << VALUE_BITS) - 1;
pub const ONE_QUARTER: i64 = TOP_VALUE / 4 + 1;
pub const HALF: i64 = 2 * ONE_QUARTER;
pub const THREE_QUARTERS: i64 = 3 * ONE_QUARTER;
/// Characters plus the end-of-file symbol.
pub const SYMBOLS: usize = 257;

struct BitReader<'a> {
    bytes: &'a [u8],
    at: usize,
    buffer: u8,
    bits_to_go: u32,
    garbage_bits: u32,
}

impl BitReader<'_> {
    fn bit(&mut self) -> Result<i64, VmError> {
        if self.bits_to_go == 0 {
            match self.bytes.get(self.at) {
                Some(b) => {
                    self.buffer = *b;
                    self.at += 1;
                    self.bits_to_go = 8;
                }
                None => {
                    self.garbage_bits += 1;
                    if self.garbage_bits > VALUE_BITS {
                        return Err(VmError::EncodedText);
                    }
                    return Ok(0);
                }
            }
        }
        let bit = self.buffer & 1;
        self.buffer >>= 1;
        self.bits_to_go -= 1;
        Ok(bit as i64)
    }
}

/// Decode `len` characters from `bytes`.
pub fn decode(freq: &[Aword], bytes: &[u8], len: usize) -> Result<Vec<u8>, VmError> {
    let total = match freq.first() {
        Some(&t) if t != 0 && freq.len() > SYMBOLS => t as i64,
        _ => return Err(VmError::EncodedText),
    };
    let mut input = BitReader { bytes, at: 0, buffer: 0, bits_to_go: 0, garbage_bits: 0 };
    let mut value = 0;
    for _ in 0..VALUE_BITS {
        value = 2 * value + input.bit()?;
    }
    let (mut low, mut high) = (0, TOP_VALUE);

    let mut out = Vec::with_capacity(len);
    for _ in 0..len {
        let range = high - low + 1;
        let f = ((value - low + 1) * total - 1) / range;
        let mut symbol = 1;
        while symbol <= SYMBOLS && freq[symbol] as i64 > f {
            symbol += 1;
        }
        if symbol > SYMBOLS {
            return Err(VmError::EncodedText);
        }

        high = low + range * freq[symbol - 1] as i64 / total - 1;
        low += range * freq[symbol] as i64 / total;
        loop {
            if high >= HALF {
                if low >= HALF {
                    value -= HALF;
                    low -= HALF;
                    high -= HALF;
                } else if low >= ONE_QUARTER && high < THREE_QUARTERS {
                    value -= ONE_QUARTER;
                    low -= ONE_QUARTER;
                    high -= ONE_QUARTER;
                } else {
                    break;
                }
            }
            low *= 2;
            high = 2 * high + 1;
            value = 2 * value + input.bit()?;
        }

        match u8::try_from(symbol - 1) {
            Ok(c) => out.push(c),
            Err(_) => break,
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_or_short_tables_are_rejected() {
        assert!(matches!(decode(&[], &[0xff], 1), Err(VmError::EncodedText)));
        assert!(matches!(decode(&[0; SYMBOLS + 1], &[0xff], 1), Err(VmError::EncodedText)));
    }

    #[test]
    fn a_single_symbol_model_needs_no_input() {
        // Only 'x' has any weight, so every decoded character is 'x'.
        let mut freq = vec![0; SYMBOLS + 1];
        for f in freq.iter_mut().take(b'x' as usize + 1) {
            *f = 4;
        }
        assert_eq!(decode(&freq, &[], 3).unwrap(), b"xxx");
    }
}
