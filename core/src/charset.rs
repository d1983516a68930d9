//! Character-set transcoding is named in spec §1 as an external
//! collaborator: "an external collaborator converts between narrow/wide
//! strings under a named DICOM charset". This module defines the seam
//! ([`CharsetCollector`]) the unicode-string value handlers call through,
//! plus a default `ISO_IR 6` (ASCII) implementation so the crate is usable
//! standalone without pulling in a full ISO-2022 transcoder.

use std::borrow::Cow;

/// Converts between the raw bytes of a unicode-family VR (LO, LT, PN, SH,
/// ST, UC, UT) and an application-visible `String`, under a named DICOM
/// defined term from `(0008,0005)`.
///
/// Implementations backed by a real transcoding library (e.g. one built on
/// `encoding_rs`) plug in here; this crate ships only the ASCII default.
pub trait CharsetCollector: Send + Sync {
    /// Decodes `bytes` using the charsets named in `charsets_list`. An empty
    /// list means `ISO_IR 6` per spec §6.
    fn decode(&self, bytes: &[u8], charsets_list: &[String]) -> Cow<'_, str>;

    /// Encodes `text` back to bytes for the first charset named in
    /// `charsets_list` (or `ISO_IR 6` if empty).
    fn encode(&self, text: &str, charsets_list: &[String]) -> Vec<u8>;
}

/// The default, dependency-free `ISO_IR 6` (plain ASCII) charset collector.
#[derive(Debug, Default, Clone, Copy)]
pub struct IsoIr6;

impl CharsetCollector for IsoIr6 {
    fn decode(&self, bytes: &[u8], _charsets_list: &[String]) -> Cow<'_, str> {
        String::from_utf8_lossy(bytes)
    }

    fn encode(&self, text: &str, _charsets_list: &[String]) -> Vec<u8> {
        text.bytes().map(|b| if b.is_ascii() { b } else { b'?' }).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_roundtrip() {
        let c = IsoIr6;
        let encoded = c.encode("Doe^John", &[]);
        let decoded = c.decode(&encoded, &[]);
        assert_eq!(decoded, "Doe^John");
    }
}
