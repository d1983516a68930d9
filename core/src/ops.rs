//! Attribute operations: a small, data-only description of a change to
//! apply to one element of a dataset, used by codecs to report the
//! attribute updates an encode implies (spec §4.6, "Codec pipeline") --
//! for example a JPEG encoder setting `PhotometricInterpretation` or
//! `LossyImageCompressionRatio` after compressing a frame.
//!
//! This crate's [`Dataset`](crate) has no `PrimitiveValue` union type, so
//! actions are expressed directly in terms of the string/int/double setters
//! the dataset tree exposes, and selectors only ever name a direct tag (no
//! nested sequence item addressing, which no caller of this API needs).

use crate::header::{Tag, VR};

/// Identifies the attribute an [`AttributeOp`] applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeSelector(pub Tag);

impl From<Tag> for AttributeSelector {
    fn from(tag: Tag) -> Self {
        AttributeSelector(tag)
    }
}

/// The operation to apply at the selected attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeAction {
    /// Remove the attribute if it exists; do nothing otherwise.
    Remove,
    /// Provide or override the attribute's value representation hint.
    SetVr(VR),
    /// Fully reset a textual attribute, creating it if absent.
    SetStr(String),
    /// Fully reset an integer attribute, creating it if absent.
    SetInt(i64),
    /// Fully reset a floating-point attribute, creating it if absent.
    SetDouble(f64),
}

/// A single attribute change: which attribute, and what to do to it.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeOp {
    pub selector: AttributeSelector,
    pub action: AttributeAction,
}

impl AttributeOp {
    pub fn new(selector: impl Into<AttributeSelector>, action: AttributeAction) -> Self {
        AttributeOp { selector: selector.into(), action }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_converts_from_tag() {
        let op = AttributeOp::new(Tag(0x0028, 0x0004), AttributeAction::SetStr("MONOCHROME2".to_string()));
        assert_eq!(op.selector.0, Tag(0x0028, 0x0004));
    }
}
