//! DICOM attribute addressing: the [`Tag`], the value representation
//! enumeration [`VR`], and the even-length [`Length`] used throughout the
//! wire format.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A DICOM attribute tag, i.e. the `(group, element)` pair that addresses
/// one entry in a [`Dataset`](https://docs.rs/rsdcm-object).
///
/// Tags order first by group, then by element, matching the canonical
/// on-disk ordering that the stream codec relies on when emitting a dataset.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct Tag(pub u16, pub u16);

impl Tag {
    /// The group part of the tag.
    #[inline]
    pub fn group(self) -> u16 {
        self.0
    }

    /// The element part of the tag.
    #[inline]
    pub fn element(self) -> u16 {
        self.1
    }

    /// Whether this tag's group is odd, marking it as a private attribute.
    #[inline]
    pub fn is_private(self) -> bool {
        self.0 % 2 == 1
    }

    /// Whether this tag's group is one of the group-length placeholders
    /// retired by the 2008 edition of the standard (element `0000`).
    #[inline]
    pub fn is_group_length(self) -> bool {
        self.1 == 0x0000
    }
}

impl PartialOrd for Tag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Tag {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.0, self.1).cmp(&(other.0, other.1))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:04X},{:04X})", self.0, self.1)
    }
}

impl From<(u16, u16)> for Tag {
    fn from((g, e): (u16, u16)) -> Self {
        Tag(g, e)
    }
}

/// Well-known item and delimiter pseudo-tags used while framing sequences
/// and encapsulated pixel data fragments (see spec §4.5).
pub mod item {
    use super::Tag;

    /// `(FFFE,E000)` — opens a sequence item or pixel-data fragment.
    pub const ITEM: Tag = Tag(0xFFFE, 0xE000);
    /// `(FFFE,E00D)` — closes an item of undefined length.
    pub const ITEM_DELIMITER: Tag = Tag(0xFFFE, 0xE00D);
    /// `(FFFE,E0DD)` — closes a sequence of undefined length.
    pub const SEQUENCE_DELIMITER: Tag = Tag(0xFFFE, 0xE0DD);
}

/// DICOM pixel data tag, `(7FE0,0010)`.
pub const PIXEL_DATA: Tag = Tag(0x7FE0, 0x0010);

/// The value representation of a data element: a two-letter code
/// identifying how its bytes are to be interpreted.
///
/// Variants correspond 1:1 to the VR families described in spec §4.3.
#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone, Ord, PartialOrd)]
#[allow(missing_docs)]
pub enum VR {
    AE,
    AS,
    AT,
    CS,
    DA,
    DS,
    DT,
    FL,
    FD,
    IS,
    LO,
    LT,
    OB,
    OD,
    OF,
    OL,
    OW,
    PN,
    SH,
    SL,
    SQ,
    SS,
    ST,
    TM,
    UC,
    UI,
    UL,
    UN,
    UR,
    US,
    UT,
}

impl VR {
    /// Parses the two-character binary representation used on the wire in
    /// explicit-VR transfer syntaxes.
    pub fn from_binary(chars: [u8; 2]) -> Option<Self> {
        std::str::from_utf8(&chars).ok().and_then(|s| VR::from_str(s).ok())
    }

    /// The two-character wire representation of this VR.
    pub fn as_str(self) -> &'static str {
        use VR::*;
        match self {
            AE => "AE",
            AS => "AS",
            AT => "AT",
            CS => "CS",
            DA => "DA",
            DS => "DS",
            DT => "DT",
            FL => "FL",
            FD => "FD",
            IS => "IS",
            LO => "LO",
            LT => "LT",
            OB => "OB",
            OD => "OD",
            OF => "OF",
            OL => "OL",
            OW => "OW",
            PN => "PN",
            SH => "SH",
            SL => "SL",
            SQ => "SQ",
            SS => "SS",
            ST => "ST",
            TM => "TM",
            UC => "UC",
            UI => "UI",
            UL => "UL",
            UN => "UN",
            UR => "UR",
            US => "US",
            UT => "UT",
        }
    }

    /// Whether this VR uses the "long" explicit-VR header form
    /// (`{vr, reserved: u16, length: u32}`) instead of the short form
    /// (`{vr, length: u16}`). See spec §4.5.
    pub fn has_explicit_long_header(self) -> bool {
        matches!(
            self,
            VR::OB | VR::OD | VR::OF | VR::OL | VR::OW | VR::SQ | VR::UC | VR::UN | VR::UR | VR::UT
        )
    }

    /// The padding byte used to round an odd-length value up to an even
    /// length on emission. `0x00` for UI and binary VRs, `0x20` otherwise.
    pub fn padding_byte(self) -> u8 {
        match self {
            VR::UI | VR::OB | VR::UN => 0x00,
            _ => 0x20,
        }
    }

    /// Whether this VR's buffer is a raw/binary region (no charset
    /// transcoding or `\`-delimited splitting ever applies).
    pub fn is_binary(self) -> bool {
        matches!(
            self,
            VR::OB
                | VR::OW
                | VR::OL
                | VR::OD
                | VR::OF
                | VR::UN
                | VR::FL
                | VR::FD
                | VR::SL
                | VR::SS
                | VR::UL
                | VR::US
                | VR::AT
        )
    }
}

impl FromStr for VR {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use VR::*;
        Ok(match s {
            "AE" => AE,
            "AS" => AS,
            "AT" => AT,
            "CS" => CS,
            "DA" => DA,
            "DS" => DS,
            "DT" => DT,
            "FL" => FL,
            "FD" => FD,
            "IS" => IS,
            "LO" => LO,
            "LT" => LT,
            "OB" => OB,
            "OD" => OD,
            "OF" => OF,
            "OL" => OL,
            "OW" => OW,
            "PN" => PN,
            "SH" => SH,
            "SL" => SL,
            "SQ" => SQ,
            "SS" => SS,
            "ST" => ST,
            "TM" => TM,
            "UC" => UC,
            "UI" => UI,
            "UL" => UL,
            "UN" => UN,
            "UR" => UR,
            "US" => US,
            "UT" => UT,
            _ => return Err(()),
        })
    }
}

impl fmt::Display for VR {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The length of a data element's value, in bytes. `0xFFFF_FFFF` denotes an
/// undefined length, legal only for `SQ` elements and encapsulated pixel
/// data (spec §4.5).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct Length(pub u32);

impl Length {
    /// The reserved value denoting an undefined length.
    pub const UNDEFINED: Length = Length(0xFFFF_FFFF);

    /// Whether this length is the undefined-length marker.
    #[inline]
    pub fn is_undefined(self) -> bool {
        self.0 == Self::UNDEFINED.0
    }

    /// The length as a `usize`, if defined.
    pub fn get(self) -> Option<usize> {
        if self.is_undefined() {
            None
        } else {
            Some(self.0 as usize)
        }
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_undefined() {
            f.write_str("undefined")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl From<u32> for Length {
    fn from(v: u32) -> Self {
        Length(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_ordering_is_group_then_element() {
        assert!(Tag(0x0008, 0x0000) < Tag(0x0008, 0x0010));
        assert!(Tag(0x0008, 0xFFFF) < Tag(0x0010, 0x0000));
    }

    #[test]
    fn vr_round_trips_through_binary_form() {
        for vr in [VR::PN, VR::SQ, VR::OB, VR::UI] {
            let bytes = vr.as_str().as_bytes();
            let chars = [bytes[0], bytes[1]];
            assert_eq!(VR::from_binary(chars), Some(vr));
        }
    }

    #[test]
    fn length_undefined_is_distinguishable() {
        assert!(Length::UNDEFINED.is_undefined());
        assert_eq!(Length(0).get(), Some(0));
        assert_eq!(Length::UNDEFINED.get(), None);
    }
}
