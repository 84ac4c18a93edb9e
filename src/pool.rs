//! Descriptor lookup over parsed files.
//!
//! [`DescriptorIndex`] is the interpreter's read-only view of every
//! definition it may need to resolve an option name against: messages
//! with their field sets, enums with their values, and extensions keyed
//! both by fully-qualified name and by `(extendee, number)`. Entries are
//! owned copies, so an index stays valid while the descriptor protos it
//! was built from are mutated.

use std::{collections::HashMap, fmt, sync::Arc};

use prost_types::field_descriptor_proto::{Label, Type};

use crate::{
    make_name,
    options::{OptionSet, Value},
    parse_namespace, strip_leading_dot, tag, types,
};

pub type MessageRef = Arc<MessageInfo>;
pub type FieldRef = Arc<FieldInfo>;
pub type EnumRef = Arc<EnumInfo>;

/// A compatibility profile of the schema language.
///
/// Variants are declared in the order of their descriptor.proto
/// numbering, so comparisons follow edition chronology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Edition {
    Unknown,
    Legacy,
    Proto2,
    Proto3,
    Edition2023,
    Edition2024,
}

impl Edition {
    pub fn from_number(number: i32) -> Option<Edition> {
        match number {
            0 => Some(Edition::Unknown),
            900 => Some(Edition::Legacy),
            998 => Some(Edition::Proto2),
            999 => Some(Edition::Proto3),
            1000 => Some(Edition::Edition2023),
            1001 => Some(Edition::Edition2024),
            _ => None,
        }
    }

    /// The edition a file is interpreted under, derived from its
    /// `edition` field or its `syntax` string.
    pub fn of_file(file: &types::FileDescriptorProto) -> Edition {
        if let Some(edition) = file.edition {
            return Edition::from_number(edition).unwrap_or(Edition::Unknown);
        }
        match file.syntax.as_deref() {
            None | Some("proto2") | Some("") => Edition::Proto2,
            Some("proto3") => Edition::Proto3,
            _ => Edition::Unknown,
        }
    }

    pub fn is_editions(self) -> bool {
        self >= Edition::Edition2023
    }
}

impl fmt::Display for Edition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edition::Unknown => write!(f, "unknown"),
            Edition::Legacy => write!(f, "legacy"),
            Edition::Proto2 => write!(f, "proto2"),
            Edition::Proto3 => write!(f, "proto3"),
            Edition::Edition2023 => write!(f, "2023"),
            Edition::Edition2024 => write!(f, "2024"),
        }
    }
}

/// The kind of element an option appears on, matching
/// `FieldOptions.OptionTargetType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionTarget {
    File = 1,
    ExtensionRange = 2,
    Message = 3,
    Field = 4,
    Oneof = 5,
    Enum = 6,
    EnumValue = 7,
    Service = 8,
    Method = 9,
}

impl OptionTarget {
    pub(crate) fn from_number(number: i32) -> Option<OptionTarget> {
        match number {
            1 => Some(OptionTarget::File),
            2 => Some(OptionTarget::ExtensionRange),
            3 => Some(OptionTarget::Message),
            4 => Some(OptionTarget::Field),
            5 => Some(OptionTarget::Oneof),
            6 => Some(OptionTarget::Enum),
            7 => Some(OptionTarget::EnumValue),
            8 => Some(OptionTarget::Service),
            9 => Some(OptionTarget::Method),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            OptionTarget::File => "file",
            OptionTarget::ExtensionRange => "extension range",
            OptionTarget::Message => "message",
            OptionTarget::Field => "field",
            OptionTarget::Oneof => "oneof",
            OptionTarget::Enum => "enum",
            OptionTarget::EnumValue => "enum value",
            OptionTarget::Service => "service",
            OptionTarget::Method => "method",
        }
    }
}

/// Which editions a field or enum value is available in, from the
/// `feature_support` option on its declaration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureSupport {
    pub edition_introduced: Option<Edition>,
    pub edition_deprecated: Option<Edition>,
    pub deprecation_warning: Option<String>,
    pub edition_removed: Option<Edition>,
}

impl FeatureSupport {
    fn from_options(set: &OptionSet) -> FeatureSupport {
        use crate::tag::options::feature_support::*;

        let edition = |t: i32| {
            set.get(t)
                .and_then(Value::as_int)
                .and_then(|n| Edition::from_number(n as i32))
        };

        FeatureSupport {
            edition_introduced: edition(EDITION_INTRODUCED),
            edition_deprecated: edition(EDITION_DEPRECATED),
            deprecation_warning: set
                .get(DEPRECATION_WARNING)
                .and_then(Value::as_str)
                .map(ToOwned::to_owned),
            edition_removed: edition(EDITION_REMOVED),
        }
    }
}

#[derive(Debug)]
pub struct MessageInfo {
    full_name: String,
    fields: Vec<FieldRef>,
    field_names: HashMap<String, usize>,
    field_numbers: HashMap<i32, usize>,
    map_entry: bool,
    message_set_wire_format: bool,
    defining_file: String,
}

impl MessageInfo {
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn fields(&self) -> &[FieldRef] {
        &self.fields
    }

    pub fn field_by_name(&self, name: &str) -> Option<&FieldRef> {
        self.field_names.get(name).map(|&index| &self.fields[index])
    }

    pub fn field_by_number(&self, number: i32) -> Option<&FieldRef> {
        self.field_numbers
            .get(&number)
            .map(|&index| &self.fields[index])
    }

    pub fn is_map_entry(&self) -> bool {
        self.map_entry
    }

    pub fn is_message_set(&self) -> bool {
        self.message_set_wire_format
    }

    pub fn defining_file(&self) -> &str {
        &self.defining_file
    }
}

#[derive(Debug)]
pub struct FieldInfo {
    full_name: String,
    name: String,
    number: i32,
    label: Label,
    ty: Option<Type>,
    type_name: Option<String>,
    extendee: Option<String>,
    oneof_index: Option<i32>,
    defining_file: String,
    targets: Vec<OptionTarget>,
    feature_support: Option<FeatureSupport>,
}

impl FieldInfo {
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn number(&self) -> i32 {
        self.number
    }

    pub fn is_repeated(&self) -> bool {
        self.label == Label::Repeated
    }

    pub fn is_required(&self) -> bool {
        self.label == Label::Required
    }

    /// The declared scalar type, absent when the parser recorded only a
    /// type name for the linker to resolve.
    pub fn ty(&self) -> Option<Type> {
        self.ty
    }

    pub fn is_group(&self) -> bool {
        self.ty == Some(Type::Group)
    }

    /// Fully-qualified name of the field's message or enum type, without
    /// the leading dot.
    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    pub fn extendee(&self) -> Option<&str> {
        self.extendee.as_deref()
    }

    pub fn is_extension(&self) -> bool {
        self.extendee.is_some()
    }

    pub fn oneof_index(&self) -> Option<i32> {
        self.oneof_index
    }

    pub fn defining_file(&self) -> &str {
        &self.defining_file
    }

    pub fn targets(&self) -> &[OptionTarget] {
        &self.targets
    }

    pub fn feature_support(&self) -> Option<&FeatureSupport> {
        self.feature_support.as_ref()
    }
}

#[derive(Debug)]
pub struct EnumInfo {
    full_name: String,
    values: Vec<EnumValueInfo>,
    value_names: HashMap<String, usize>,
    closed: bool,
    defining_file: String,
}

#[derive(Debug)]
pub struct EnumValueInfo {
    pub(crate) name: String,
    pub(crate) number: i32,
    pub(crate) feature_support: Option<FeatureSupport>,
}

impl EnumInfo {
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn value_by_name(&self, name: &str) -> Option<EnumValueRef> {
        self.value_names
            .get(name)
            .map(|&index| EnumValueRef { index })
    }

    pub fn value_by_number(&self, number: i32) -> Option<EnumValueRef> {
        self.values
            .iter()
            .position(|value| value.number == number)
            .map(|index| EnumValueRef { index })
    }

    pub fn value(&self, value: EnumValueRef) -> &EnumValueInfo {
        &self.values[value.index]
    }

    pub fn defining_file(&self) -> &str {
        &self.defining_file
    }
}

impl EnumValueInfo {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn number(&self) -> i32 {
        self.number
    }

    pub fn feature_support(&self) -> Option<&FeatureSupport> {
        self.feature_support.as_ref()
    }
}

/// Index of a value within its enum; resolve through
/// [`EnumInfo::value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumValueRef {
    index: usize,
}

/// All definitions visible to the interpreter from a set of files.
#[derive(Debug, Default)]
pub struct DescriptorIndex {
    messages: HashMap<String, MessageRef>,
    enums: HashMap<String, EnumRef>,
    extensions: HashMap<String, FieldRef>,
    extensions_by_number: HashMap<(String, i32), FieldRef>,
}

impl DescriptorIndex {
    pub fn new() -> Self {
        DescriptorIndex::default()
    }

    pub fn from_files<'a>(
        files: impl IntoIterator<Item = &'a types::FileDescriptorProto>,
    ) -> Self {
        let mut index = DescriptorIndex::new();
        for file in files {
            index.add_file(file);
        }
        index
    }

    /// Indexes every definition of `file`. Later additions shadow
    /// earlier ones with the same name.
    pub fn add_file(&mut self, file: &types::FileDescriptorProto) {
        let mut pass = IndexPass {
            index: self,
            scope: String::new(),
            file_name: file.name().to_owned(),
            edition: Edition::of_file(file),
            file_closed_enums: file_closed_enums(file),
        };
        pass.add_file(file);
        debug_assert!(pass.scope.is_empty());
    }

    pub fn get_message(&self, name: &str) -> Option<&MessageRef> {
        self.messages.get(strip_leading_dot(name))
    }

    pub fn get_enum(&self, name: &str) -> Option<&EnumRef> {
        self.enums.get(strip_leading_dot(name))
    }

    pub fn get_extension(&self, name: &str) -> Option<&FieldRef> {
        self.extensions.get(strip_leading_dot(name))
    }

    pub fn get_extension_by_number(&self, extendee: &str, number: i32) -> Option<&FieldRef> {
        self.extensions_by_number
            .get(&(strip_leading_dot(extendee).to_owned(), number))
    }

    /// Resolves a relative name against `context` (a dot-separated
    /// namespace), walking from the innermost namespace outwards and
    /// finally trying the root.
    pub fn resolve_extension(&self, context: &str, name: &str) -> Option<&FieldRef> {
        if let Some(absolute) = name.strip_prefix('.') {
            return self.get_extension(absolute);
        }

        let mut context = context;
        loop {
            let full_name = make_name(context, name);
            if let Some(extension) = self.get_extension(&full_name) {
                return Some(extension);
            }
            if context.is_empty() {
                return None;
            }
            context = parse_namespace(context);
        }
    }
}

/// Whether enums in this file are closed by default: proto2 always,
/// editions files when the file-level `features.enum_type` is `CLOSED`.
fn file_closed_enums(file: &types::FileDescriptorProto) -> bool {
    match Edition::of_file(file) {
        Edition::Proto2 | Edition::Legacy => true,
        Edition::Proto3 => false,
        _ => features_enum_closed(file.options.as_ref(), tag::options::features::FILE)
            .unwrap_or(false),
    }
}

fn features_enum_closed(options: Option<&OptionSet>, features_tag: i32) -> Option<bool> {
    const CLOSED: i64 = 2;
    options?
        .get(features_tag)?
        .as_message()?
        .get(tag::options::feature_set::ENUM_TYPE)?
        .as_int()
        .map(|value| value == CLOSED)
}

fn option_bool(options: Option<&OptionSet>, tag: i32) -> bool {
    options
        .and_then(|set| set.get(tag))
        .and_then(Value::as_int)
        .map(|value| value != 0)
        .unwrap_or(false)
}

struct IndexPass<'a> {
    index: &'a mut DescriptorIndex,
    scope: String,
    file_name: String,
    edition: Edition,
    file_closed_enums: bool,
}

impl<'a> IndexPass<'a> {
    fn enter(&mut self, name: &str) {
        if !self.scope.is_empty() {
            self.scope.push('.');
        }
        self.scope.push_str(name);
    }

    fn exit(&mut self) {
        debug_assert!(!self.scope.is_empty(), "imbalanced scope stack");
        let len = self.scope.rfind('.').unwrap_or(0);
        self.scope.truncate(len);
    }

    fn add_file(&mut self, file: &types::FileDescriptorProto) {
        for part in file.package().split('.').filter(|p| !p.is_empty()) {
            self.enter(part);
        }

        for message in &file.message_type {
            self.add_message(message);
        }
        for enum_ in &file.enum_type {
            self.add_enum(enum_);
        }
        for extension in &file.extension {
            self.add_extension(extension);
        }

        self.scope.clear();
    }

    fn add_message(&mut self, message: &types::DescriptorProto) {
        self.enter(message.name());

        let mut fields = Vec::with_capacity(message.field.len());
        let mut field_names = HashMap::new();
        let mut field_numbers = HashMap::new();
        for field in &message.field {
            let info = self.field_info(field);
            field_names.entry(info.name.clone()).or_insert(fields.len());
            field_numbers.entry(info.number).or_insert(fields.len());
            fields.push(Arc::new(info));
        }

        let info = MessageInfo {
            full_name: self.scope.clone(),
            fields,
            field_names,
            field_numbers,
            map_entry: option_bool(
                message.options.as_ref(),
                tag::options::message::MAP_ENTRY,
            ),
            message_set_wire_format: option_bool(
                message.options.as_ref(),
                tag::options::message::MESSAGE_SET_WIRE_FORMAT,
            ),
            defining_file: self.file_name.clone(),
        };
        self.index
            .messages
            .insert(self.scope.clone(), Arc::new(info));

        for nested in &message.nested_type {
            self.add_message(nested);
        }
        for enum_ in &message.enum_type {
            self.add_enum(enum_);
        }
        for extension in &message.extension {
            self.add_extension(extension);
        }

        self.exit();
    }

    fn add_enum(&mut self, enum_: &types::EnumDescriptorProto) {
        let full_name = make_name(&self.scope, enum_.name());

        let mut values = Vec::with_capacity(enum_.value.len());
        let mut value_names = HashMap::new();
        for value in &enum_.value {
            value_names
                .entry(value.name().to_owned())
                .or_insert(values.len());
            values.push(EnumValueInfo {
                name: value.name().to_owned(),
                number: value.number(),
                feature_support: value
                    .options
                    .as_ref()
                    .and_then(|set| set.get(tag::options::enum_value::FEATURE_SUPPORT))
                    .and_then(Value::as_message)
                    .map(FeatureSupport::from_options),
            });
        }

        let closed = match features_enum_closed(
            enum_.options.as_ref(),
            tag::options::features::ENUM,
        ) {
            Some(closed) if self.edition.is_editions() => closed,
            _ => self.file_closed_enums,
        };

        let info = EnumInfo {
            full_name: full_name.clone(),
            values,
            value_names,
            closed,
            defining_file: self.file_name.clone(),
        };
        self.index.enums.insert(full_name, Arc::new(info));
    }

    fn add_extension(&mut self, field: &types::FieldDescriptorProto) {
        let info = Arc::new(self.field_info(field));
        if let Some(extendee) = info.extendee.clone() {
            self.index
                .extensions_by_number
                .insert((extendee, info.number), info.clone());
            self.index.extensions.insert(info.full_name.clone(), info);
        }
    }

    fn field_info(&self, field: &types::FieldDescriptorProto) -> FieldInfo {
        let options = field.options.as_ref();

        let targets = options
            .and_then(|set| set.get(tag::options::field::TARGETS))
            .map(|value| {
                let items: Vec<&Value> = match value {
                    Value::List(items) => items.iter().collect(),
                    other => vec![other],
                };
                items
                    .into_iter()
                    .filter_map(Value::as_int)
                    .filter_map(|n| OptionTarget::from_number(n as i32))
                    .collect()
            })
            .unwrap_or_default();

        let feature_support = options
            .and_then(|set| set.get(tag::options::field::FEATURE_SUPPORT))
            .and_then(Value::as_message)
            .map(FeatureSupport::from_options);

        FieldInfo {
            full_name: make_name(&self.scope, field.name()),
            name: field.name().to_owned(),
            number: field.number(),
            label: field
                .label
                .and_then(Label::from_i32)
                .unwrap_or(Label::Optional),
            ty: field.r#type.and_then(Type::from_i32),
            type_name: field
                .type_name
                .as_deref()
                .map(|name| strip_leading_dot(name).to_owned()),
            extendee: field
                .extendee
                .as_deref()
                .map(|name| strip_leading_dot(name).to_owned()),
            oneof_index: field.oneof_index,
            defining_file: self.file_name.clone(),
            targets,
            feature_support,
        }
    }
}
