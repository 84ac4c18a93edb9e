//! Interpretation of uninterpreted options against resolved descriptors.
//!
//! The file tree is walked twice: the first pass settles standard
//! options (including features and everything else that governs how
//! extensions behave), the second resolves custom options. Each option
//! is resolved name part by name part against the element's options
//! message, its value coerced to the target field's type and written
//! into the element's [`OptionSet`], with a source-info entry recording
//! the descriptor path it landed at.

use std::collections::HashMap;

use logos::Span;
use prost_types::field_descriptor_proto::{Label, Type};

use crate::{
    ast,
    error::{DiagnosticHandler, OptionError},
    google, index_to_i32,
    options::{OptionSet, Value},
    pool::{DescriptorIndex, EnumRef, FieldRef, MessageRef, OptionTarget},
    source_info::{AstId, Children, OptionIndexes, OptionSourceInfo},
    tag, types,
};

mod literal;
mod pseudo;
mod validate;
mod value;

#[cfg(test)]
mod tests;

/// Interpreter configuration beyond the choice of linker.
#[derive(Debug, Default)]
pub struct InterpreterOptions {
    /// Keep unresolvable options in the uninterpreted list and continue,
    /// instead of treating them as errors.
    pub lenient: bool,
    /// Consulted for standard options message types the linker does not
    /// know, before falling back to the compiled-in descriptors.
    pub override_descriptor: Option<types::FileDescriptorProto>,
}

/// A parsed file whose options are to be interpreted: the descriptor
/// proto plus the option AST nodes the parser produced for each element,
/// keyed by the element's path in the descriptor tree.
#[derive(Debug, Default)]
pub struct ParsedFile {
    pub file: types::FileDescriptorProto,
    option_nodes: HashMap<Vec<i32>, Vec<ast::OptionNode>>,
}

impl ParsedFile {
    pub fn new(file: types::FileDescriptorProto) -> Self {
        ParsedFile {
            file,
            option_nodes: HashMap::new(),
        }
    }

    /// Records the AST nodes for the uninterpreted options of the
    /// element at `path` (empty for the file itself). The nodes must be
    /// in declaration order, matching the element's
    /// `uninterpreted_option` list.
    pub fn add_option_nodes(&mut self, path: Vec<i32>, nodes: Vec<ast::OptionNode>) {
        self.option_nodes.insert(path, nodes);
    }

    pub fn with_option_nodes(mut self, path: Vec<i32>, nodes: Vec<ast::OptionNode>) -> Self {
        self.add_option_nodes(path, nodes);
        self
    }

    /// AST nodes still associated with the element at `path`; after
    /// interpretation these are the options that were retained.
    pub fn option_nodes(&self, path: &[i32]) -> &[ast::OptionNode] {
        self.option_nodes.get(path).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Interprets every option of `parsed`, aborting on the first error the
/// handler does not swallow.
pub fn interpret_options(
    parsed: &mut ParsedFile,
    linker: &DescriptorIndex,
    handler: &mut dyn DiagnosticHandler,
) -> Result<OptionIndexes, OptionError> {
    interpret_options_with(parsed, Some(linker), handler, InterpreterOptions::default())
}

/// Interprets the options of `parsed`, keeping any option that fails to
/// resolve in the uninterpreted list.
pub fn interpret_options_lenient(
    parsed: &mut ParsedFile,
    linker: &DescriptorIndex,
    handler: &mut dyn DiagnosticHandler,
) -> Result<OptionIndexes, OptionError> {
    interpret_options_with(
        parsed,
        Some(linker),
        handler,
        InterpreterOptions {
            lenient: true,
            ..Default::default()
        },
    )
}

/// Lenient interpretation without a linker: standard options resolve
/// against the compiled-in descriptors, custom options are all retained.
pub fn interpret_unlinked_options(
    parsed: &mut ParsedFile,
    handler: &mut dyn DiagnosticHandler,
) -> Result<OptionIndexes, OptionError> {
    interpret_options_with(
        parsed,
        None,
        handler,
        InterpreterOptions {
            lenient: true,
            ..Default::default()
        },
    )
}

pub fn interpret_options_with(
    parsed: &mut ParsedFile,
    linker: Option<&DescriptorIndex>,
    handler: &mut dyn DiagnosticHandler,
    options: InterpreterOptions,
) -> Result<OptionIndexes, OptionError> {
    let mut ctx = Context {
        file_name: parsed.file.name().to_owned(),
        package: parsed.file.package().to_owned(),
        edition: crate::pool::Edition::of_file(&parsed.file),
        current: DescriptorIndex::from_files([&parsed.file]),
        linked: linker.is_some(),
        linker,
        override_index: options
            .override_descriptor
            .as_ref()
            .map(|file| DescriptorIndex::from_files([file])),
        nodes: std::mem::take(&mut parsed.option_nodes),
        anchors: HashMap::new(),
        handler,
        lenient: options.lenient,
        phase: Phase::Standard,
        element_target: OptionTarget::File,
        indexes: OptionIndexes::default(),
    };

    let result = ctx.run(&mut parsed.file);
    parsed.option_nodes = std::mem::take(&mut ctx.nodes);
    result?;
    Ok(ctx.indexes)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Phase {
    Standard,
    Custom,
}

pub(super) struct Context<'a> {
    pub(super) file_name: String,
    pub(super) package: String,
    pub(super) edition: crate::pool::Edition,
    pub(super) current: DescriptorIndex,
    pub(super) linker: Option<&'a DescriptorIndex>,
    pub(super) override_index: Option<DescriptorIndex>,
    pub(super) linked: bool,
    pub(super) nodes: HashMap<Vec<i32>, Vec<ast::OptionNode>>,
    pub(super) anchors: HashMap<Vec<i32>, Span>,
    pub(super) handler: &'a mut dyn DiagnosticHandler,
    pub(super) lenient: bool,
    pub(super) phase: Phase,
    pub(super) element_target: OptionTarget,
    pub(super) indexes: OptionIndexes,
}

/// How a field stores its values, with named types resolved.
pub(super) enum FieldKind {
    Scalar(Type),
    Enum(EnumRef),
    Message(MessageRef, bool),
}

impl<'a> Context<'a> {
    fn run(&mut self, file: &mut types::FileDescriptorProto) -> Result<(), OptionError> {
        self.phase = Phase::Standard;
        self.walk_file(file)?;

        // Standard options are settled now; rebuild the view of this
        // file so extension resolution sees them, and push map-field
        // features down into the synthesized entry fields.
        self.current = DescriptorIndex::from_files([&*file]);
        propagate_map_features(&mut file.message_type);

        self.phase = Phase::Custom;
        self.walk_file(file)
    }

    fn walk_file(&mut self, file: &mut types::FileDescriptorProto) -> Result<(), OptionError> {
        let mut path = Vec::new();

        self.handle_element(&mut file.options, OptionTarget::File, &path)?;

        for (index, message) in file.message_type.iter_mut().enumerate() {
            path.extend([tag::file::MESSAGE_TYPE, index_to_i32(index)]);
            self.walk_message(message, &mut path)?;
            path.truncate(path.len() - 2);
        }

        for (index, extension) in file.extension.iter_mut().enumerate() {
            path.extend([tag::file::EXTENSION, index_to_i32(index)]);
            self.handle_field(extension, &path)?;
            path.truncate(path.len() - 2);
        }

        for (index, enum_) in file.enum_type.iter_mut().enumerate() {
            path.extend([tag::file::ENUM_TYPE, index_to_i32(index)]);
            self.walk_enum(enum_, &mut path)?;
            path.truncate(path.len() - 2);
        }

        for (index, service) in file.service.iter_mut().enumerate() {
            path.extend([tag::file::SERVICE, index_to_i32(index)]);
            self.handle_element(&mut service.options, OptionTarget::Service, &path)?;
            for (method_index, method) in service.method.iter_mut().enumerate() {
                path.extend([tag::service::METHOD, index_to_i32(method_index)]);
                self.handle_element(&mut method.options, OptionTarget::Method, &path)?;
                path.truncate(path.len() - 2);
            }
            path.truncate(path.len() - 2);
        }

        Ok(())
    }

    fn walk_message(
        &mut self,
        message: &mut types::DescriptorProto,
        path: &mut Vec<i32>,
    ) -> Result<(), OptionError> {
        for (index, nested) in message.nested_type.iter_mut().enumerate() {
            path.extend([tag::message::NESTED_TYPE, index_to_i32(index)]);
            self.walk_message(nested, path)?;
            path.truncate(path.len() - 2);
        }

        self.handle_element(&mut message.options, OptionTarget::Message, path)?;

        for (index, field) in message.field.iter_mut().enumerate() {
            path.extend([tag::message::FIELD, index_to_i32(index)]);
            self.handle_field(field, path)?;
            path.truncate(path.len() - 2);
        }

        for (index, oneof) in message.oneof_decl.iter_mut().enumerate() {
            path.extend([tag::message::ONEOF_DECL, index_to_i32(index)]);
            self.handle_element(&mut oneof.options, OptionTarget::Oneof, path)?;
            path.truncate(path.len() - 2);
        }

        for (index, range) in message.extension_range.iter_mut().enumerate() {
            path.extend([tag::message::EXTENSION_RANGE, index_to_i32(index)]);
            self.handle_element(&mut range.options, OptionTarget::ExtensionRange, path)?;
            path.truncate(path.len() - 2);
        }

        for (index, extension) in message.extension.iter_mut().enumerate() {
            path.extend([tag::message::EXTENSION, index_to_i32(index)]);
            self.handle_field(extension, path)?;
            path.truncate(path.len() - 2);
        }

        for (index, enum_) in message.enum_type.iter_mut().enumerate() {
            path.extend([tag::message::ENUM_TYPE, index_to_i32(index)]);
            self.walk_enum(enum_, path)?;
            path.truncate(path.len() - 2);
        }

        Ok(())
    }

    fn walk_enum(
        &mut self,
        enum_: &mut types::EnumDescriptorProto,
        path: &mut Vec<i32>,
    ) -> Result<(), OptionError> {
        self.handle_element(&mut enum_.options, OptionTarget::Enum, path)?;

        for (index, value) in enum_.value.iter_mut().enumerate() {
            path.extend([tag::enum_::VALUE, index_to_i32(index)]);
            self.handle_element(&mut value.options, OptionTarget::EnumValue, path)?;
            path.truncate(path.len() - 2);
        }

        Ok(())
    }

    fn handle_field(
        &mut self,
        field: &mut types::FieldDescriptorProto,
        path: &[i32],
    ) -> Result<(), OptionError> {
        if self.phase == Phase::Standard {
            self.apply_pseudo_options(field, path)?;
        }
        self.handle_element(&mut field.options, OptionTarget::Field, path)
    }

    /// Interprets the current phase's share of one element's options and,
    /// at the end of the custom phase, validates the result.
    fn handle_element(
        &mut self,
        options: &mut Option<OptionSet>,
        target: OptionTarget,
        element_path: &[i32],
    ) -> Result<(), OptionError> {
        self.element_target = target;

        let set = match options.as_mut() {
            Some(set) => set,
            None => return Ok(()),
        };

        let uninterpreted = set.take_uninterpreted();
        let nodes = self.nodes.remove(element_path).unwrap_or_default();

        if uninterpreted.len() != nodes.len() {
            // Without matching AST the options cannot be re-resolved;
            // keep them untouched.
            set.set_uninterpreted(uninterpreted);
            if !nodes.is_empty() {
                self.nodes.insert(element_path.to_vec(), nodes);
            }
        } else {
            let mut remaining = Vec::new();
            let mut remaining_nodes = Vec::new();

            for (proto, node) in uninterpreted.into_iter().zip(nodes) {
                let phase = if node.name.first().map(|part| part.is_extension) == Some(true) {
                    Phase::Custom
                } else {
                    Phase::Standard
                };
                if phase != self.phase {
                    remaining.push(proto);
                    remaining_nodes.push(node);
                    continue;
                }
                // Custom options cannot resolve without a linker. Lenient
                // runs keep them for a later linked pass; a strict run
                // falls through so the unresolved extension is reported
                // through the handler like any other lookup failure.
                if phase == Phase::Custom && !self.linked && self.lenient {
                    remaining.push(proto);
                    remaining_nodes.push(node);
                    continue;
                }
                // A pseudo-option that the standard pass left behind has
                // already been reported; don't resolve it as a field of
                // the options message.
                if target == OptionTarget::Field && pseudo::is_pseudo(&node) {
                    remaining.push(proto);
                    remaining_nodes.push(node);
                    continue;
                }

                let snapshot = set.clone();
                match self.interpret_option(set, target, &node) {
                    Ok(info) => {
                        self.indexes
                            .source_info
                            .insert(AstId::of(&node.span), info);
                        self.anchors
                            .insert(element_path.to_vec(), node.span.clone());
                    }
                    Err(error) => {
                        *set = snapshot;
                        self.handler.error(error)?;
                        if self.lenient {
                            remaining.push(proto);
                            remaining_nodes.push(node);
                        }
                    }
                }
            }

            set.set_uninterpreted(remaining);
            if !remaining_nodes.is_empty() {
                self.nodes.insert(element_path.to_vec(), remaining_nodes);
            }
        }

        if self.phase == Phase::Custom {
            self.validate_element(set, target, element_path)?;
        }

        if set.is_empty() {
            *options = None;
        }
        Ok(())
    }

    /// Resolves one option's name path and writes its value, returning
    /// the source-info entry for the AST node.
    fn interpret_option(
        &mut self,
        set: &mut OptionSet,
        target: OptionTarget,
        node: &ast::OptionNode,
    ) -> Result<OptionSourceInfo, OptionError> {
        let options_message = google::options_message_name(target);
        let mut message = match self.find_message(options_message) {
            Some(message) => message,
            None => {
                return Err(OptionError::not_found(
                    node.name_span(),
                    format!("unknown options type '{}'", options_message),
                ))
            }
        };

        let mut cursor = set;
        let mut path = Vec::new();

        for (index, part) in node.name.iter().enumerate() {
            let field = self.resolve_name_part(&message, part, target)?;
            self.indexes
                .references
                .option_fields
                .insert(AstId::of(&part.span), field.clone());

            if index + 1 == node.name.len() {
                return self.set_field_value(
                    cursor,
                    &message,
                    &field,
                    &node.value,
                    path,
                    false,
                );
            }

            if field.is_repeated() {
                return Err(OptionError::forbidden(
                    part.span.clone(),
                    format!(
                        "option field '{}' is repeated; only the final part of an option name may name a repeated field",
                        field.full_name()
                    ),
                ));
            }
            let next = match self.field_kind(&field, &part.span)? {
                FieldKind::Message(next, _) => next,
                _ => {
                    return Err(OptionError::forbidden(
                        part.span.clone(),
                        format!("option field '{}' is not a message", field.full_name()),
                    ))
                }
            };
            self.check_oneof(cursor, &message, &field, &part.span)?;

            path.push(field.number());
            cursor = match cursor.get_or_insert_message(field.number(), field.is_group()) {
                Some(cursor) => cursor,
                None => {
                    return Err(OptionError::forbidden(
                        part.span.clone(),
                        format!("option field '{}' has already been set", field.full_name()),
                    ))
                }
            };
            message = next;
        }

        unreachable!("option names are non-empty")
    }

    /// Resolves one name part against `message` per the lookup rules:
    /// extensions by fully-qualified name with a matching extendee,
    /// plain parts by simple field name.
    pub(super) fn resolve_name_part(
        &mut self,
        message: &MessageRef,
        part: &ast::NamePart,
        target: OptionTarget,
    ) -> Result<FieldRef, OptionError> {
        let field = if part.is_extension {
            let name = part.value.strip_prefix('.').unwrap_or(&part.value);
            let extension = match self.find_extension(name) {
                Some(extension) => extension,
                None => {
                    return Err(OptionError::not_found(
                        part.span.clone(),
                        format!("unknown extension '{}'", name),
                    ))
                }
            };
            if extension.extendee() != Some(message.full_name()) {
                return Err(OptionError::forbidden(
                    part.span.clone(),
                    format!(
                        "extension '{}' extends '{}', not '{}'",
                        extension.full_name(),
                        extension.extendee().unwrap_or(""),
                        message.full_name()
                    ),
                ));
            }
            extension
        } else {
            if part.value == google::UNINTERPRETED_OPTION_FIELD {
                return Err(OptionError::forbidden(
                    part.span.clone(),
                    "option 'uninterpreted_option' may not be set",
                ));
            }
            match message.field_by_name(&part.value) {
                Some(field) => field.clone(),
                None => {
                    return Err(OptionError::not_found(
                        part.span.clone(),
                        format!(
                            "'{}' is not a field of '{}'",
                            part.value,
                            message.full_name()
                        ),
                    ))
                }
            }
        };

        self.check_field_usable(&field, message, target, &part.span)?;
        Ok(field)
    }

    /// Target-kind and message-set checks applied to every resolved
    /// option field.
    pub(super) fn check_field_usable(
        &self,
        field: &FieldRef,
        containing: &MessageRef,
        target: OptionTarget,
        span: &Span,
    ) -> Result<(), OptionError> {
        if !field.targets().is_empty() && !field.targets().contains(&target) {
            let allowed = field
                .targets()
                .iter()
                .map(|t| t.name())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(OptionError::forbidden(
                span.clone(),
                format!(
                    "option '{}' may not be used on a {} (allowed targets: {})",
                    field.full_name(),
                    target.name(),
                    allowed
                ),
            ));
        }

        if field.is_extension() && containing.is_message_set() {
            return Err(OptionError::forbidden(
                span.clone(),
                format!(
                    "'{}' uses message-set wire format, which is not supported",
                    containing.full_name()
                ),
            ));
        }

        Ok(())
    }

    /// Writes `value` into `field` of `cursor` per the cardinality
    /// rules, returning the source-info entry rooted at `path`.
    pub(super) fn set_field_value(
        &mut self,
        cursor: &mut OptionSet,
        message: &MessageRef,
        field: &FieldRef,
        value: &ast::OptionValue,
        mut path: Vec<i32>,
        in_literal: bool,
    ) -> Result<OptionSourceInfo, OptionError> {
        if let ast::OptionValue::Array(array) = value {
            if !field.is_repeated() {
                return Err(OptionError::forbidden(
                    array.span.clone(),
                    format!(
                        "array literals may only be used for repeated fields, but '{}' is not repeated",
                        field.full_name()
                    ),
                ));
            }

            let first_index = cursor.list_len(field.number());
            let mut entries = Vec::with_capacity(array.items.len());
            for item in &array.items {
                if matches!(item, ast::OptionValue::Array(_)) {
                    return Err(OptionError::type_mismatch(
                        item.span(),
                        "array literals may not be nested",
                    ));
                }
                let index = cursor.list_len(field.number());
                let item_path: Vec<i32> = path
                    .iter()
                    .copied()
                    .chain([field.number(), index_to_i32(index)])
                    .collect();
                let (coerced, children) = self.coerce(field, item, in_literal, &item_path)?;
                cursor.push_list_item(field.number(), coerced);
                entries.push(OptionSourceInfo {
                    path: item_path,
                    children,
                });
            }

            path.extend([field.number(), index_to_i32(first_index)]);
            return Ok(OptionSourceInfo {
                path,
                children: Children::Array(entries),
            });
        }

        self.check_oneof(cursor, message, field, &value.span())?;

        if field.is_repeated() {
            let index = cursor.list_len(field.number());
            path.extend([field.number(), index_to_i32(index)]);
            let (coerced, children) = self.coerce(field, value, in_literal, &path)?;
            cursor.push_list_item(field.number(), coerced);
            Ok(OptionSourceInfo { path, children })
        } else {
            if cursor.get(field.number()).is_some() {
                return Err(OptionError::forbidden(
                    value.span(),
                    format!(
                        "non-repeated option field '{}' has already been set",
                        field.full_name()
                    ),
                ));
            }
            path.push(field.number());
            let (coerced, children) = self.coerce(field, value, in_literal, &path)?;
            cursor.set(field.number(), coerced);
            Ok(OptionSourceInfo { path, children })
        }
    }

    /// Rejects setting a field whose oneof already has a different
    /// member set.
    pub(super) fn check_oneof(
        &self,
        cursor: &OptionSet,
        message: &MessageRef,
        field: &FieldRef,
        span: &Span,
    ) -> Result<(), OptionError> {
        let index = match field.oneof_index() {
            Some(index) => index,
            None => return Ok(()),
        };

        for sibling in message.fields() {
            if sibling.oneof_index() == Some(index)
                && sibling.number() != field.number()
                && cursor.get(sibling.number()).is_some()
            {
                return Err(OptionError::forbidden(
                    span.clone(),
                    format!(
                        "fields '{}' and '{}' belong to the same oneof and may not both be set",
                        sibling.name(),
                        field.name()
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Produces the typed value for a single (non-array) AST value.
    /// `value_path` is the descriptor path of the value being written,
    /// used to root the source info of nested literals.
    pub(super) fn coerce(
        &mut self,
        field: &FieldRef,
        value: &ast::OptionValue,
        in_literal: bool,
        value_path: &[i32],
    ) -> Result<(Value, Children), OptionError> {
        match self.field_kind(field, &value.span())? {
            FieldKind::Scalar(ty) => {
                let coerced = self.coerce_scalar(field.full_name(), ty, value, in_literal)?;
                Ok((coerced, Children::None))
            }
            FieldKind::Enum(enum_) => {
                let coerced = self.resolve_enum_value(&enum_, value, in_literal)?;
                Ok((coerced, Children::None))
            }
            FieldKind::Message(message, group) => match value {
                ast::OptionValue::Message(literal) => {
                    let (set, children) =
                        self.interpret_message_literal(&message, literal, value_path)?;
                    let coerced = if group {
                        Value::Group(set)
                    } else {
                        Value::Message(set)
                    };
                    Ok((coerced, children))
                }
                other => Err(OptionError::type_mismatch(
                    other.span(),
                    format!(
                        "expected a message literal for field '{}', but found {}",
                        field.full_name(),
                        other.kind_name()
                    ),
                )),
            },
        }
    }

    /// Resolves the storage kind of a field, looking up named types.
    pub(super) fn field_kind(
        &self,
        field: &FieldRef,
        span: &Span,
    ) -> Result<FieldKind, OptionError> {
        match (field.ty(), field.type_name()) {
            (Some(Type::Message), Some(name)) | (Some(Type::Group), Some(name)) => {
                match self.find_message(name) {
                    Some(message) => {
                        Ok(FieldKind::Message(message, field.ty() == Some(Type::Group)))
                    }
                    None => Err(OptionError::not_found(
                        span.clone(),
                        format!("unknown message type '{}'", name),
                    )),
                }
            }
            (Some(Type::Enum), Some(name)) => match self.find_enum(name) {
                Some(enum_) => Ok(FieldKind::Enum(enum_)),
                None => Err(OptionError::not_found(
                    span.clone(),
                    format!("unknown enum type '{}'", name),
                )),
            },
            (Some(Type::Message) | Some(Type::Group) | Some(Type::Enum), None) => {
                Err(OptionError::not_found(
                    span.clone(),
                    format!("field '{}' has no resolved type", field.full_name()),
                ))
            }
            (Some(ty), _) => Ok(FieldKind::Scalar(ty)),
            (None, Some(name)) => {
                if let Some(message) = self.find_message(name) {
                    Ok(FieldKind::Message(message, false))
                } else if let Some(enum_) = self.find_enum(name) {
                    Ok(FieldKind::Enum(enum_))
                } else {
                    Err(OptionError::not_found(
                        span.clone(),
                        format!("unknown type '{}'", name),
                    ))
                }
            }
            (None, None) => Err(OptionError::not_found(
                span.clone(),
                format!("field '{}' has no resolved type", field.full_name()),
            )),
        }
    }

    pub(super) fn find_message(&self, name: &str) -> Option<MessageRef> {
        self.current
            .get_message(name)
            .or_else(|| self.linker.and_then(|index| index.get_message(name)))
            .or_else(|| {
                self.override_index
                    .as_ref()
                    .and_then(|index| index.get_message(name))
            })
            .or_else(|| google::google_index().get_message(name))
            .cloned()
    }

    pub(super) fn find_enum(&self, name: &str) -> Option<EnumRef> {
        self.current
            .get_enum(name)
            .or_else(|| self.linker.and_then(|index| index.get_enum(name)))
            .or_else(|| {
                self.override_index
                    .as_ref()
                    .and_then(|index| index.get_enum(name))
            })
            .or_else(|| google::google_index().get_enum(name))
            .cloned()
    }

    pub(super) fn find_extension(&self, name: &str) -> Option<FieldRef> {
        if !self.linked {
            return None;
        }
        self.current
            .get_extension(name)
            .or_else(|| self.linker.and_then(|index| index.get_extension(name)))
            .cloned()
    }

    pub(super) fn find_extension_by_number(
        &self,
        extendee: &str,
        number: i32,
    ) -> Option<FieldRef> {
        if !self.linked {
            return None;
        }
        self.current
            .get_extension_by_number(extendee, number)
            .or_else(|| {
                self.linker
                    .and_then(|index| index.get_extension_by_number(extendee, number))
            })
            .cloned()
    }

    /// Resolves a relative extension name used inside a message literal,
    /// walking the file's package namespaces from innermost to
    /// outermost.
    pub(super) fn resolve_relative_extension(&self, name: &str) -> Option<FieldRef> {
        if !self.linked {
            return None;
        }
        self.current
            .resolve_extension(&self.package, name)
            .cloned()
            .or_else(|| {
                self.linker
                    .and_then(|index| index.resolve_extension(&self.package, name))
                    .cloned()
            })
    }
}

/// Copies each map field's `features` into the options of the
/// synthesized key and value fields of its entry message.
fn propagate_map_features(messages: &mut [types::DescriptorProto]) {
    for message in messages {
        for index in 0..message.field.len() {
            let field = &message.field[index];
            if field.label != Some(Label::Repeated as i32)
                || field.r#type != Some(Type::Message as i32)
            {
                continue;
            }
            let entry_name = match field.type_name.as_deref() {
                Some(name) => name.rsplit('.').next().unwrap_or(name).to_owned(),
                None => continue,
            };
            let features = match field
                .options
                .as_ref()
                .and_then(|set| set.get(tag::options::features::FIELD))
                .and_then(Value::as_message)
            {
                Some(features) => features.clone(),
                None => continue,
            };

            let entry = message.nested_type.iter_mut().find(|nested| {
                nested.name() == entry_name
                    && nested
                        .options
                        .as_ref()
                        .and_then(|set| set.get(tag::options::message::MAP_ENTRY))
                        .and_then(Value::as_int)
                        == Some(1)
            });
            if let Some(entry) = entry {
                for entry_field in &mut entry.field {
                    let options = entry_field.options.get_or_insert_with(OptionSet::new);
                    if let Some(target) =
                        options.get_or_insert_message(tag::options::features::FIELD, false)
                    {
                        target.merge_absent(&features);
                    }
                }
            }
        }

        propagate_map_features(&mut message.nested_type);
    }
}
