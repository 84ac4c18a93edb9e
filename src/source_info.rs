//! Indexes produced as a by-product of interpretation.
//!
//! The source-info index records, for each interpreted option AST node,
//! the descriptor path its value landed at; the downstream source-info
//! emitter turns these into `SourceCodeInfo` locations. The reference
//! index records which descriptors the identifier nodes of each option
//! resolved to; the interpreter itself never reads it back.

use std::collections::HashMap;

use logos::Span;

use crate::{
    pool::{EnumRef, EnumValueRef, FieldRef, MessageRef, OptionTarget},
    tag,
};

/// Tag of the `options` field within each element's descriptor message.
///
/// A source-info emitter composes the absolute path of an interpreted
/// option as `element_path + [options_field_tag(target)] + entry.path`,
/// except for pseudo-options, whose paths replace the options tag with
/// the [`PSEUDO_OPTION`] marker.
pub fn options_field_tag(target: OptionTarget) -> i32 {
    match target {
        OptionTarget::File => tag::file::OPTIONS,
        OptionTarget::ExtensionRange => tag::extension_range::OPTIONS,
        OptionTarget::Message => tag::message::OPTIONS,
        OptionTarget::Field => tag::field::OPTIONS,
        OptionTarget::Oneof => tag::oneof::OPTIONS,
        OptionTarget::Enum => tag::enum_::OPTIONS,
        OptionTarget::EnumValue => tag::enum_value::OPTIONS,
        OptionTarget::Service => tag::service::OPTIONS,
        OptionTarget::Method => tag::method::OPTIONS,
    }
}

/// Identity of an AST node, derived from its span. The parser produces
/// a unique span per node, so this is a stable map key that does not
/// require the AST to outlive the indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AstId {
    pub start: usize,
    pub end: usize,
}

impl AstId {
    pub fn of(span: &Span) -> AstId {
        AstId {
            start: span.start,
            end: span.end,
        }
    }
}

impl From<&Span> for AstId {
    fn from(span: &Span) -> AstId {
        AstId::of(span)
    }
}

/// Path marker replacing the options-field tag for pseudo-options: the
/// remainder of the path belongs to the parent element itself, not to
/// its options message.
pub const PSEUDO_OPTION: i32 = -1;

/// Where one interpreted option landed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OptionSourceInfo {
    /// Descriptor field tags from the root options message down to the
    /// value. For repeated fields the trailing component is the index of
    /// the first element added by this option. A leading
    /// [`PSEUDO_OPTION`] marks a pseudo-option path.
    pub path: Vec<i32>,
    pub children: Children,
}

/// Sub-structure of an interpreted value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Children {
    #[default]
    None,
    /// One entry per array-literal element, in source order.
    Array(Vec<OptionSourceInfo>),
    /// One entry per message-literal field, keyed by the field node.
    Message(HashMap<AstId, OptionSourceInfo>),
}

impl OptionSourceInfo {
    /// Finds the entry with the longest path that is a prefix of
    /// `path`, searching this entry and its children.
    pub fn find(&self, path: &[i32]) -> Option<&OptionSourceInfo> {
        if !path.starts_with(&self.path) {
            return None;
        }

        let best = match &self.children {
            Children::None => None,
            Children::Array(entries) => entries.iter().filter_map(|e| e.find(path)).next(),
            Children::Message(entries) => {
                entries.values().filter_map(|e| e.find(path)).next()
            }
        };

        Some(best.unwrap_or(self))
    }
}

/// Descriptors resolved while interpreting, keyed by the AST node that
/// named them.
#[derive(Debug, Default)]
pub struct DescriptorReferences {
    /// Option name parts to the option field they selected.
    pub option_fields: HashMap<AstId, FieldRef>,
    /// Plain field names inside message literals.
    pub literal_fields: HashMap<AstId, FieldRef>,
    /// Extension names inside message literals.
    pub literal_extensions: HashMap<AstId, FieldRef>,
    /// Identifiers denoting enum values.
    pub enum_values: HashMap<AstId, (EnumRef, EnumValueRef)>,
    /// Type names in `Any` expansions.
    pub any_messages: HashMap<AstId, MessageRef>,
}

/// The two side indexes produced by a successful interpretation run.
#[derive(Debug, Default)]
pub struct OptionIndexes {
    /// One entry per interpreted option AST node.
    pub source_info: HashMap<AstId, OptionSourceInfo>,
    pub references: DescriptorReferences,
}
