//! Resolution and interpretation of protobuf schema options.
//!
//! A protobuf parser leaves `option` declarations uninterpreted: dotted
//! names made of plain and extension parts, and raw literal values.
//! This crate resolves those names against the reflective descriptors of
//! the standard `*Options` messages and their custom extensions,
//! type-checks the values, and writes them into the proper typed fields
//! of the descriptor proto. As a by-product it emits the indexes the
//! source-info generator needs: one mapping each option AST node to the
//! descriptor path it populated, and one mapping identifier nodes to the
//! descriptors they resolved to.
//!
//! Interpretation runs in two passes per file. Standard options are
//! settled first, so features and other options that govern extension
//! lookup are in place before any custom option name is resolved. Three
//! entry points cover the common modes: [`interpret_options`] (strict,
//! linked), [`interpret_options_lenient`] and
//! [`interpret_unlinked_options`].
#![deny(missing_debug_implementations)]
#![warn(unreachable_pub)]

pub mod ast;
pub mod options;
pub mod types;

mod error;
mod google;
mod interpret;
mod pool;
mod source_info;
mod tag;

use prost::Message;

pub use crate::error::{
    CollectDiagnostics, DiagnosticHandler, FailFast, OptionError, OptionWarning,
};
pub use crate::interpret::{
    interpret_options, interpret_options_lenient, interpret_options_with,
    interpret_unlinked_options, InterpreterOptions, ParsedFile,
};
pub use crate::pool::{
    DescriptorIndex, Edition, EnumInfo, EnumRef, EnumValueInfo, EnumValueRef, FeatureSupport,
    FieldInfo, FieldRef, MessageInfo, MessageRef, OptionTarget,
};
pub use crate::source_info::{
    options_field_tag, AstId, Children, DescriptorReferences, OptionIndexes, OptionSourceInfo,
    PSEUDO_OPTION,
};

/// Converts a descriptor with interpreted options into the generated
/// `prost_types` form by re-encoding it. Custom options survive only as
/// far as the generated types can represent them; callers that need to
/// keep extension values should hold on to the [`types`] form.
pub fn transcode_file(
    file: &types::FileDescriptorProto,
    buf: &mut Vec<u8>,
) -> prost_types::FileDescriptorProto {
    buf.clear();
    buf.reserve(file.encoded_len());
    file.encode(buf).expect("vec buffer grows on demand");
    prost_types::FileDescriptorProto::decode(buf.as_slice())
        .expect("descriptor encoding is valid")
}

fn index_to_i32(index: usize) -> i32 {
    // Parsed files are bounded to i32::MAX bytes, so indices of
    // definitions within one file always fit.
    index.try_into().expect("index too large")
}

fn make_name(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_owned()
    } else {
        format!("{}.{}", namespace, name)
    }
}

fn parse_namespace(name: &str) -> &str {
    match name.rfind('.') {
        Some(index) => &name[..index],
        None => "",
    }
}

fn strip_leading_dot(name: &str) -> &str {
    name.strip_prefix('.').unwrap_or(name)
}
