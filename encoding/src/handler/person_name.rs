//! PN component splitting (spec §4.3, §8 scenario E).
//!
//! A person name value decomposes around `=` into up to three
//! representations — alphabetic, ideographic, phonetic — each of which may
//! further split on `^` into name components (family^given^middle^prefix^
//! suffix). The core does not interpret the `^` split; callers that need
//! individual components do that themselves, matching Imebra's
//! `patientNameImpl`/`dataHandlerStringPNImpl`, which hands back the three
//! raw groups and leaves component parsing to the application.

use crate::error::{self, Result};
use rsdcm_core::header::{Tag, VR};

/// The three representations of one PN value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PersonNameGroups {
    pub alphabetic: String,
    pub ideographic: String,
    pub phonetic: String,
}

/// Splits one PN value (already separated from its siblings by `\`, if
/// multi-valued) into its alphabetic/ideographic/phonetic groups.
///
/// Fails with [`Error::CorruptedBuffer`](crate::error::Error::CorruptedBuffer)
/// if the value has more than three `=`-separated groups.
pub fn parse(tag: Tag, value: &str) -> Result<PersonNameGroups> {
    let mut groups = value.splitn(4, '=');
    let alphabetic = groups.next().unwrap_or_default().to_string();
    let ideographic = groups.next().unwrap_or_default().to_string();
    let phonetic = groups.next().unwrap_or_default().to_string();
    if groups.next().is_some() {
        return error::CorruptedBufferSnafu {
            tag,
            vr: VR::PN,
            reason: "more than 3 groups".to_string(),
        }
        .fail();
    }
    Ok(PersonNameGroups { alphabetic, ideographic, phonetic })
}

/// Joins the three groups back into a single PN component value, dropping
/// trailing empty groups (so a purely-alphabetic name has no dangling `=`).
pub fn join(groups: &PersonNameGroups) -> String {
    if groups.phonetic.is_empty() {
        if groups.ideographic.is_empty() {
            groups.alphabetic.clone()
        } else {
            format!("{}={}", groups.alphabetic, groups.ideographic)
        }
    } else {
        format!("{}={}={}", groups.alphabetic, groups.ideographic, groups.phonetic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_groups_parse() {
        let tag = Tag(0x0010, 0x0010);
        let g = parse(tag, "A^B=C^D=E^F").unwrap();
        assert_eq!(g.alphabetic, "A^B");
        assert_eq!(g.ideographic, "C^D");
        assert_eq!(g.phonetic, "E^F");
    }

    #[test]
    fn two_groups_leave_phonetic_empty() {
        let tag = Tag(0x0010, 0x0010);
        let g = parse(tag, "A^B=G").unwrap();
        assert_eq!(g.alphabetic, "A^B");
        assert_eq!(g.ideographic, "G");
        assert_eq!(g.phonetic, "");
    }

    #[test]
    fn four_groups_is_corrupted() {
        let tag = Tag(0x0010, 0x0010);
        assert!(parse(tag, "A=B=C=D").is_err());
    }

    #[test]
    fn join_omits_trailing_empties() {
        let g = PersonNameGroups { alphabetic: "Doe^John".into(), ..Default::default() };
        assert_eq!(join(&g), "Doe^John");
    }
}
