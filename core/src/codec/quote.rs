//! Quoting for opaque binary blocks.
//!
//! A block of `n` bytes is written as `"<n>:"` followed by `"%02x "` per
//! byte, then cut into parts of at most `PART_SIZE` characters so no
//! section-file line grows unbounded. The first part absorbs the odd
//! length of the `"<n>:"` prefix so later parts never split a triplet.

use crate::error::{SaveError, SaveResult};

pub const PART_SIZE: usize = 3 * 256;
const PART_ADJUST: usize = 3;

/// Largest client attribute block accepted on load.
pub const MAX_ATTRIBUTE_BLOCK: usize = 256 * 1024;

pub fn quote_block(data: &[u8]) -> String {
    let mut out = format!("{}:", data.len());
    out.reserve(data.len() * 3);
    for byte in data {
        out.push_str(&format!("{byte:02x} "));
    }
    out
}

pub fn unquote_block(quoted: &str) -> SaveResult<Vec<u8>> {
    let bad = |message: String| SaveError::corrupt("player", message);

    let (len_text, body) = quoted
        .split_once(':')
        .ok_or_else(|| bad("quoted block has no length prefix".to_string()))?;
    let length: usize = len_text
        .trim()
        .parse()
        .map_err(|_| bad(format!("quoted block length '{len_text}' is not a number")))?;

    if !body.is_ascii() {
        return Err(bad("quoted block holds non-ASCII characters".to_string()));
    }
    let needed = length
        .checked_mul(3)
        .filter(|&n| n <= body.len())
        .ok_or_else(|| {
            bad(format!("quoted block holds {} characters, {length} bytes declared", body.len()))
        })?;
    let body = &body[..needed];
    (0..length)
        .map(|i| {
            let triplet = &body[3 * i..3 * i + 3];
            if !triplet.ends_with(' ') {
                return Err(bad(format!("malformed byte '{triplet}' at {i}")));
            }
            u8::from_str_radix(&triplet[..2], 16)
                .map_err(|_| bad(format!("malformed byte '{triplet}' at {i}")))
        })
        .collect()
}

/// Cut a quoted block into parts for `...part<N>` keys.
pub fn split_parts(quoted: &str) -> Vec<String> {
    let at_colon = quoted.find(':').map_or(0, |p| p + 1);
    let adjust = at_colon % PART_ADJUST;
    if quoted.len() <= PART_SIZE + adjust {
        return vec![quoted.to_string()];
    }

    let first = PART_SIZE + adjust;
    let mut parts = vec![quoted[..first].to_string()];
    let mut rest = &quoted[first..];
    while !rest.is_empty() {
        let take = rest.len().min(PART_SIZE);
        parts.push(rest[..take].to_string());
        rest = &rest[take..];
    }
    parts
}
