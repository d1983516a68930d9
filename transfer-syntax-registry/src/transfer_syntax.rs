//! The transfer syntax descriptor table (spec §4.5, §6).
//!
//! A transfer syntax UID fixes three things a stream codec needs before it
//! can read a single element: the dataset's byte order, whether VRs are
//! written explicitly or looked up in the dictionary, and which pixel-data
//! codec (if any) encapsulated frames are compressed with.

use rsdcm_core::stream::Endianness;

/// Which codec family, if any, a transfer syntax's encapsulated pixel data
/// is compressed with. `Native` means pixel data is stored uncompressed,
/// packed per [`DicomNativeImage`](https://docs.rs/rsdcm-pixeldata) rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecKind {
    Native,
    Jpeg,
    Rle,
    /// Recognized but only decodable when the `jpeg2k` feature's external
    /// collaborator is wired in by the caller (spec Non-goals).
    Jpeg2000,
}

/// One row of the transfer syntax table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferSyntax {
    pub uid: &'static str,
    pub name: &'static str,
    pub byte_order: Endianness,
    pub explicit_vr: bool,
    pub codec_kind: CodecKind,
}

/// The UIDs named in spec §6: implicit/explicit LE, explicit BE, RLE, the
/// four JPEG profiles in §4.6, and the JPEG 2000 registry stub.
pub const TABLE: &[TransferSyntax] = &[
    TransferSyntax {
        uid: "1.2.840.10008.1.2",
        name: "Implicit VR Little Endian",
        byte_order: Endianness::LE,
        explicit_vr: false,
        codec_kind: CodecKind::Native,
    },
    TransferSyntax {
        uid: "1.2.840.10008.1.2.1",
        name: "Explicit VR Little Endian",
        byte_order: Endianness::LE,
        explicit_vr: true,
        codec_kind: CodecKind::Native,
    },
    TransferSyntax {
        uid: "1.2.840.10008.1.2.2",
        name: "Explicit VR Big Endian",
        byte_order: Endianness::BE,
        explicit_vr: true,
        codec_kind: CodecKind::Native,
    },
    TransferSyntax {
        uid: "1.2.840.10008.1.2.5",
        name: "RLE Lossless",
        byte_order: Endianness::LE,
        explicit_vr: true,
        codec_kind: CodecKind::Rle,
    },
    TransferSyntax {
        uid: "1.2.840.10008.1.2.4.50",
        name: "JPEG Baseline (Process 1)",
        byte_order: Endianness::LE,
        explicit_vr: true,
        codec_kind: CodecKind::Jpeg,
    },
    TransferSyntax {
        uid: "1.2.840.10008.1.2.4.51",
        name: "JPEG Extended (Process 2 & 4)",
        byte_order: Endianness::LE,
        explicit_vr: true,
        codec_kind: CodecKind::Jpeg,
    },
    TransferSyntax {
        uid: "1.2.840.10008.1.2.4.57",
        name: "JPEG Lossless, Non-Hierarchical (Process 14)",
        byte_order: Endianness::LE,
        explicit_vr: true,
        codec_kind: CodecKind::Jpeg,
    },
    TransferSyntax {
        uid: "1.2.840.10008.1.2.4.70",
        name: "JPEG Lossless, Non-Hierarchical, First-Order Prediction (Process 14, Selection Value 1)",
        byte_order: Endianness::LE,
        explicit_vr: true,
        codec_kind: CodecKind::Jpeg,
    },
    TransferSyntax {
        uid: "1.2.840.10008.1.2.4.90",
        name: "JPEG 2000 Image Compression (Lossless Only)",
        byte_order: Endianness::LE,
        explicit_vr: true,
        codec_kind: CodecKind::Jpeg2000,
    },
    TransferSyntax {
        uid: "1.2.840.10008.1.2.4.91",
        name: "JPEG 2000 Image Compression",
        byte_order: Endianness::LE,
        explicit_vr: true,
        codec_kind: CodecKind::Jpeg2000,
    },
];

/// Trims the trailing NUL padding a `UI` value carries on the wire before
/// comparing it against the table.
fn trim_uid(uid: &str) -> &str {
    uid.trim_end_matches(['\0', ' '])
}

/// Looks up a transfer syntax by UID, tolerating the trailing NUL/space
/// padding a `(0002,0010)` value carries on disk.
pub fn for_uid(uid: &str) -> Option<&'static TransferSyntax> {
    let uid = trim_uid(uid);
    TABLE.iter().find(|ts| ts.uid == uid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_up_implicit_vr_le() {
        let ts = for_uid("1.2.840.10008.1.2").unwrap();
        assert!(!ts.explicit_vr);
        assert_eq!(ts.byte_order, Endianness::LE);
    }

    #[test]
    fn tolerates_trailing_nul_padding() {
        let ts = for_uid("1.2.840.10008.1.2.1\0").unwrap();
        assert_eq!(ts.uid, "1.2.840.10008.1.2.1");
    }

    #[test]
    fn unknown_uid_is_none() {
        assert!(for_uid("9.9.9.9").is_none());
    }

    #[test]
    fn explicit_be_is_recognized_as_read_only_deprecated() {
        let ts = for_uid("1.2.840.10008.1.2.2").unwrap();
        assert_eq!(ts.byte_order, Endianness::BE);
        assert!(ts.explicit_vr);
    }
}
