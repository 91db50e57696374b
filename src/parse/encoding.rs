//! Encoding-detection chain (spec §4.F): try UTF-8, UTF-8 with a leading
//! BOM, GBK/GB2312, Big5, Shift-JIS, EUC-KR, then CP1252/Latin-1, re-encoding
//! whichever succeeds first to UTF-8.
//!
//! `encoding_rs` has no separate GB2312 encoding (GBK is a strict superset)
//! and no separate ISO-8859-1 (the WHATWG standard maps that label to
//! windows-1252); a final byte-for-byte Latin-1 fallback never fails, so the
//! chain always terminates.

use encoding_rs::{BIG5, EUC_KR, GBK, SHIFT_JIS, WINDOWS_1252};

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Decode `bytes` to a `String`, trying each candidate encoding in turn.
pub fn decode(bytes: &[u8]) -> String {
    let without_bom = bytes.strip_prefix(&UTF8_BOM[..]).unwrap_or(bytes);
    if let Ok(s) = std::str::from_utf8(without_bom) {
        return s.to_string();
    }

    for encoding in [GBK, BIG5, SHIFT_JIS, EUC_KR, WINDOWS_1252] {
        let (cow, _, had_errors) = encoding.decode(bytes);
        if !had_errors {
            return cow.into_owned();
        }
    }

    // Lossless Latin-1 fallback: every byte maps to the codepoint of the
    // same value, so this never fails.
    bytes.iter().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_plain_utf8() {
        assert_eq!(decode("héllo".as_bytes()), "héllo");
    }

    #[test]
    fn strips_utf8_bom() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"hello");
        assert_eq!(decode(&bytes), "hello");
    }

    #[test]
    fn falls_back_to_latin1_for_arbitrary_bytes() {
        let bytes = vec![0xFF, 0xFE, 0x41];
        // Never panics; some candidate in the chain accepts it.
        let _ = decode(&bytes);
    }
}
