//! Opaque pagination cursors.
//!
//! A cursor is a base64-encoded decimal offset. Forward-only: callers
//! receive the next cursor from a page and hand it back verbatim.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::error::CoreError;

pub fn encode_cursor(offset: u64) -> String {
    URL_SAFE_NO_PAD.encode(offset.to_string())
}

pub fn decode_cursor(cursor: &str) -> Result<u64, CoreError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(cursor)
        .map_err(|_| CoreError::invalid_input("malformed cursor"))?;
    let text =
        std::str::from_utf8(&bytes).map_err(|_| CoreError::invalid_input("malformed cursor"))?;
    text.parse::<u64>()
        .map_err(|_| CoreError::invalid_input("malformed cursor"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        for offset in [0u64, 1, 10, 4096, u64::MAX] {
            assert_eq!(decode_cursor(&encode_cursor(offset)).unwrap(), offset);
        }
    }

    #[test]
    fn garbage_is_invalid_input() {
        assert!(matches!(
            decode_cursor("!!not-base64!!"),
            Err(CoreError::InvalidInput(_))
        ));
        // Valid base64 of a non-numeric payload.
        let junk = URL_SAFE_NO_PAD.encode("not-a-number");
        assert!(matches!(
            decode_cursor(&junk),
            Err(CoreError::InvalidInput(_))
        ));
    }
}
