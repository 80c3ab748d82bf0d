//! Best-effort multi-encoding file reads
//!
//! Files are decoded by trying a fixed, ordered list of encodings
//! (commonest first) until one decodes every byte without error. A BOM, if
//! present, short-circuits the list. Strict decoding is used throughout:
//! an encoding either accepts the whole byte stream or is skipped, never
//! substituting replacement characters.
//!
//! The WHATWG single-byte indexes fill the holes of the real Windows code
//! pages with C1 controls (0x81 in windows-1252 becomes U+0081), which
//! would make those decoders accept any byte stream. A decode whose output
//! contains a C1 control is therefore rejected too: those characters never
//! occur in genuine text, only where the underlying code page had no
//! assignment.

use crate::error::Error;
use encoding_rs::{
    BIG5, EUC_JP, EUC_KR, Encoding, GBK, SHIFT_JIS, UTF_8, UTF_16BE, UTF_16LE, WINDOWS_1251,
    WINDOWS_1252,
};
use std::fs;
use std::path::Path;

/// Candidate encodings, in the order they are tried.
pub const ENCODINGS: &[&Encoding] = &[
    UTF_8,
    WINDOWS_1252,
    UTF_16LE,
    UTF_16BE,
    WINDOWS_1251,
    SHIFT_JIS,
    EUC_JP,
    GBK,
    EUC_KR,
    BIG5,
];

/// Decode raw bytes with the first encoding that accepts them in full.
pub fn decode_bytes(bytes: &[u8]) -> Option<String> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        if let Some(text) = strict_decode(encoding, &bytes[bom_len..]) {
            return Some(text);
        }
    }

    ENCODINGS
        .iter()
        .find_map(|encoding| strict_decode(encoding, bytes))
}

/// One strict decode attempt: every byte must decode, and the result must
/// contain no C1 control characters (see module docs).
fn strict_decode(encoding: &'static Encoding, bytes: &[u8]) -> Option<String> {
    let text = encoding.decode_without_bom_handling_and_without_replacement(bytes)?;
    if text.chars().any(|ch| ('\u{80}'..='\u{9f}').contains(&ch)) {
        return None;
    }
    Some(text.into_owned())
}

/// Read and decode a file, failing only once every encoding has been tried.
pub fn read_to_string(path: &Path) -> Result<String, Error> {
    let bytes = fs::read(path).map_err(|source| Error::Traversal {
        path: path.to_path_buf(),
        source,
    })?;
    decode_bytes(&bytes).ok_or_else(|| Error::Decode {
        path: path.to_path_buf(),
    })
}

/// Tolerant read for batch callers: an unreadable or undecodable file is
/// reported as a diagnostic and treated as absent.
pub fn read_tolerant(path: &Path) -> Option<String> {
    match read_to_string(path) {
        Ok(text) => Some(text),
        Err(err) => {
            tracing::warn!("skipping {}: {}", path.display(), err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Fails UTF-8, decodes to C1 controls under both Windows code pages,
    /// is odd-length (so both UTF-16 variants reject it), and ends on a
    /// dangling multi-byte lead for the East Asian encodings.
    const UNDECODABLE: &[u8] = &[0x81, 0x98, 0x81];

    #[test]
    fn test_utf8_decodes_first() {
        assert_eq!(decode_bytes("café".as_bytes()).unwrap(), "café");
    }

    #[test]
    fn test_windows_1252_fallback() {
        // 0xE9 is invalid UTF-8 but decodes as 'é' in windows-1252, the
        // second entry of the list.
        let decoded = decode_bytes(b"caf\xe9").unwrap();
        let direct = WINDOWS_1252
            .decode_without_bom_handling_and_without_replacement(b"caf\xe9")
            .unwrap();
        assert_eq!(decoded, "café");
        assert_eq!(decoded, direct);
    }

    #[test]
    fn test_utf16le_bom_short_circuits() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "hi".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(decode_bytes(&bytes).unwrap(), "hi");
    }

    #[test]
    fn test_all_encodings_exhausted() {
        assert_eq!(decode_bytes(UNDECODABLE), None);
    }

    #[test]
    fn test_read_to_string_reports_decode_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("garbled.txt");
        fs::write(&path, UNDECODABLE).unwrap();

        match read_to_string(&path) {
            Err(Error::Decode { path: p }) => assert_eq!(p, path),
            other => panic!("expected DecodeError, got {:?}", other),
        }
    }

    #[test]
    fn test_read_to_string_reports_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.txt");
        assert!(matches!(
            read_to_string(&path),
            Err(Error::Traversal { .. })
        ));
    }

    #[test]
    fn test_read_tolerant_swallows_failures() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("garbled.txt");
        fs::write(&path, UNDECODABLE).unwrap();
        assert_eq!(read_tolerant(&path), None);

        let good = dir.path().join("good.txt");
        fs::write(&good, "hello").unwrap();
        assert_eq!(read_tolerant(&good).unwrap(), "hello");
    }
}
