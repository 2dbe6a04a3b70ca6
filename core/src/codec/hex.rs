//! Single-character scalar alphabets.

use crate::error::{SaveError, SaveResult};

/// Base-16 alphabet used by every bit-packed grid.
pub const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";

/// 64-symbol alphabet for small integers inside order lists.
pub const NUM_CHARS: &[u8; 64] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_-";

/// Written for values that do not fit the 64-symbol alphabet.
pub const NUM_OVERFLOW: char = '?';

pub fn encode_hex4(value: u8) -> char {
    HEX_CHARS[(value & 0x0f) as usize] as char
}

/// A literal space decodes as 0; old writers padded rows with blanks.
pub fn decode_hex4(ch: char) -> SaveResult<u8> {
    if ch == ' ' {
        return Ok(0);
    }
    HEX_CHARS
        .iter()
        .position(|&c| c as char == ch)
        .map(|p| p as u8)
        .ok_or(SaveError::InvalidDigit { ch, alphabet: "hex" })
}

pub fn encode_base64sym(value: usize) -> char {
    NUM_CHARS.get(value).map_or(NUM_OVERFLOW, |&c| c as char)
}

pub fn decode_base64sym(ch: char) -> SaveResult<usize> {
    NUM_CHARS
        .iter()
        .position(|&c| c as char == ch)
        .ok_or(SaveError::InvalidDigit { ch, alphabet: "base64" })
}

/// Hex digit holding bits `[4*halfbyte, 4*halfbyte+3]` of `value`.
pub fn encode_halfbyte(value: u32, halfbyte: usize) -> char {
    encode_hex4(((value >> (4 * halfbyte)) & 0x0f) as u8)
}

/// Inverse of `encode_halfbyte`: the digit shifted into place.
pub fn decode_halfbyte(ch: char, halfbyte: usize) -> SaveResult<u32> {
    Ok((decode_hex4(ch)? as u32) << (4 * halfbyte))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_alphabet_bounds() {
        assert_eq!(encode_hex4(0), '0');
        assert_eq!(encode_hex4(15), 'f');
        assert_eq!(decode_hex4('a').expect("a"), 10);
        assert_eq!(decode_hex4(' ').expect("space"), 0);
        assert!(matches!(decode_hex4('A'), Err(SaveError::InvalidDigit { ch: 'A', .. })));
        assert!(decode_hex4('g').is_err());
    }

    #[test]
    fn base64_alphabet_bounds() {
        assert_eq!(encode_base64sym(0), '0');
        assert_eq!(encode_base64sym(36), 'A');
        assert_eq!(encode_base64sym(63), '-');
        assert_eq!(encode_base64sym(64), NUM_OVERFLOW);
        assert_eq!(decode_base64sym('_').expect("underscore"), 62);
        assert!(decode_base64sym('?').is_err());
    }

    #[test]
    fn halfbytes_reassemble() {
        let turn: u32 = 0xbeef;
        let mut back = 0;
        for i in 0..4 {
            back |= decode_halfbyte(encode_halfbyte(turn, i), i).expect("digit");
        }
        assert_eq!(back, turn);
    }
}
