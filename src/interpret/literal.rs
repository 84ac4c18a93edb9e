//! Interpretation of message-literal values.

use prost::Message;
use prost_types::field_descriptor_proto::Type;

use super::Context;
use crate::{
    ast,
    error::OptionError,
    make_name,
    options::{OptionSet, Value},
    pool::MessageRef,
    source_info::{AstId, Children},
};

const ANY_TYPE_URL: i32 = 1;
const ANY_VALUE: i32 = 2;

const ANY_URL_PREFIXES: &[&str] = &["type.googleapis.com", "type.googleprod.com"];

impl<'a> Context<'a> {
    /// Builds the value of a message-typed field from a literal,
    /// returning the populated set and the per-field source info.
    /// `prefix` is the descriptor path of the value being built.
    pub(super) fn interpret_message_literal(
        &mut self,
        message: &MessageRef,
        literal: &ast::MessageLiteral,
        prefix: &[i32],
    ) -> Result<(OptionSet, Children), OptionError> {
        if let Some(any_field) = literal
            .fields
            .iter()
            .find(|field| matches!(field.name, ast::LiteralFieldName::Any { .. }))
        {
            if literal.fields.len() != 1 {
                return Err(OptionError::forbidden(
                    any_field.name.span(),
                    "a type reference must be the only field of its message literal",
                ));
            }
            let set = self.interpret_any_literal(message, any_field)?;
            return Ok((set, Children::None));
        }

        let mut set = OptionSet::new();
        let mut children = std::collections::HashMap::new();

        for field_literal in &literal.fields {
            let field = match &field_literal.name {
                ast::LiteralFieldName::Ident(ident) => {
                    let field = match message.field_by_name(&ident.value) {
                        Some(field) => field.clone(),
                        None => match self.find_group_field(message, &ident.value) {
                            Some(field) => field,
                            None => {
                                return Err(OptionError::not_found(
                                    ident.span.clone(),
                                    format!(
                                        "'{}' is not a field of '{}'",
                                        ident.value,
                                        message.full_name()
                                    ),
                                ))
                            }
                        },
                    };
                    self.indexes
                        .references
                        .literal_fields
                        .insert(AstId::of(&ident.span), field.clone());
                    field
                }
                ast::LiteralFieldName::Extension(ident) => {
                    let extension = match self.resolve_relative_extension(&ident.value) {
                        Some(extension) => extension,
                        None => {
                            return Err(OptionError::not_found(
                                ident.span.clone(),
                                format!("unknown extension '{}'", ident.value),
                            ))
                        }
                    };
                    if extension.extendee() != Some(message.full_name()) {
                        return Err(OptionError::forbidden(
                            ident.span.clone(),
                            format!(
                                "extension '{}' extends '{}', not '{}'",
                                extension.full_name(),
                                extension.extendee().unwrap_or(""),
                                message.full_name()
                            ),
                        ));
                    }
                    self.indexes
                        .references
                        .literal_extensions
                        .insert(AstId::of(&ident.span), extension.clone());
                    extension
                }
                ast::LiteralFieldName::Any { span, .. } => {
                    return Err(OptionError::forbidden(
                        span.clone(),
                        "a type reference must be the only field of its message literal",
                    ))
                }
            };

            self.check_field_usable(&field, message, self.element_target, &field_literal.name.span())?;

            if field_literal.separator.is_none()
                && !matches!(field_literal.value, ast::OptionValue::Message(_))
            {
                return Err(OptionError::value(
                    field_literal.name.span(),
                    format!(
                        "expected ':' after field name '{}'",
                        field.name()
                    ),
                ));
            }

            let entry = self.set_field_value(
                &mut set,
                message,
                &field,
                &field_literal.value,
                prefix.to_vec(),
                true,
            )?;
            children.insert(AstId::of(&field_literal.name.span()), entry);
        }

        Ok((set, Children::Message(children)))
    }

    /// `[urlPrefix/TypeName] { ... }`: serializes the named message's
    /// literal deterministically into an Any's `value` and `type_url`.
    fn interpret_any_literal(
        &mut self,
        message: &MessageRef,
        field_literal: &ast::MessageLiteralField,
    ) -> Result<OptionSet, OptionError> {
        let (url_prefix, type_name, name_span) = match &field_literal.name {
            ast::LiteralFieldName::Any {
                url_prefix,
                type_name,
                span,
            } => (url_prefix, type_name, span),
            _ => unreachable!(),
        };

        if !self.is_any_message(message) {
            return Err(OptionError::forbidden(
                name_span.clone(),
                format!(
                    "type references may only be used with 'google.protobuf.Any', not '{}'",
                    message.full_name()
                ),
            ));
        }

        if !ANY_URL_PREFIXES.contains(&url_prefix.as_str()) {
            return Err(OptionError::value(
                name_span.clone(),
                format!("'{}' is not a supported type URL prefix", url_prefix),
            ));
        }

        let named = match self.find_message(type_name) {
            Some(named) => named,
            None => {
                return Err(OptionError::not_found(
                    name_span.clone(),
                    format!("unknown message type '{}'", type_name),
                ))
            }
        };
        self.indexes
            .references
            .any_messages
            .insert(AstId::of(name_span), named.clone());

        let literal = match &field_literal.value {
            ast::OptionValue::Message(literal) => literal,
            other => {
                return Err(OptionError::type_mismatch(
                    other.span(),
                    format!(
                        "expected a message literal for '{}', but found {}",
                        named.full_name(),
                        other.kind_name()
                    ),
                ))
            }
        };

        let (value, _) = self.interpret_message_literal(&named, literal, &[])?;

        let mut set = OptionSet::new();
        set.set(
            ANY_TYPE_URL,
            Value::String(format!("{}/{}", url_prefix, type_name)),
        );
        set.set(ANY_VALUE, Value::Bytes(value.encode_to_vec().into()));
        Ok(set)
    }

    /// The target must have the shape of `google.protobuf.Any`:
    /// singular `type_url` (string, field 1) and `value` (bytes,
    /// field 2).
    fn is_any_message(&self, message: &MessageRef) -> bool {
        if message.full_name() != crate::google::ANY {
            return false;
        }
        let type_url = message.field_by_number(ANY_TYPE_URL);
        let value = message.field_by_number(ANY_VALUE);
        matches!(
            (type_url, value),
            (Some(url), Some(value))
                if url.ty() == Some(Type::String)
                    && value.ty() == Some(Type::Bytes)
                    && !url.is_repeated()
                    && !value.is_repeated()
        )
    }

    /// Group fields are written in text format with the capitalized
    /// group type name; accept it when the group is declared in this
    /// message's scope.
    fn find_group_field(
        &self,
        message: &MessageRef,
        name: &str,
    ) -> Option<crate::pool::FieldRef> {
        message
            .fields()
            .iter()
            .find(|field| {
                field.is_group()
                    && field.type_name() == Some(make_name(message.full_name(), name).as_str())
            })
            .cloned()
    }
}
