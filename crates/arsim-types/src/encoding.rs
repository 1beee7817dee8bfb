//! Unpadded base64url, the encoding the network uses for every binary field.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::error::{TypeError, TypeResult};

pub fn b64url_encode(bytes: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode a base64url string. Trailing `=` padding is tolerated.
pub fn b64url_decode(input: &str) -> TypeResult<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(input.trim_end_matches('='))
        .map_err(|e| TypeError::InvalidBase64(e.to_string()))
}

/// Decode a base64url string that must hold UTF-8 text.
pub fn b64url_decode_string(input: &str, field: &'static str) -> TypeResult<String> {
    let bytes = b64url_decode(input)?;
    String::from_utf8(bytes).map_err(|_| TypeError::InvalidTagEncoding { field })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_without_padding() {
        assert_eq!(b64url_encode(b"hi"), "aGk");
        assert_eq!(b64url_encode([0xfb, 0xff]), "-_8");
    }

    #[test]
    fn decode_accepts_padding() {
        assert_eq!(b64url_decode("aGk=").unwrap(), b"hi");
        assert_eq!(b64url_decode("aGk").unwrap(), b"hi");
    }

    #[test]
    fn decode_rejects_standard_alphabet() {
        assert!(b64url_decode("+/8").is_err());
    }

    #[test]
    fn decode_string_rejects_non_utf8() {
        let encoded = b64url_encode([0xff, 0xfe]);
        assert_eq!(
            b64url_decode_string(&encoded, "name"),
            Err(TypeError::InvalidTagEncoding { field: "name" })
        );
    }
}
