//! The `default` and `json_name` pseudo-options.
//!
//! These look like field options but write to the field descriptor
//! itself, not to its `FieldOptions` message. They are handled before
//! the field's regular options, in the standard phase only.

use prost_types::field_descriptor_proto::{Label, Type};

use super::Context;
use crate::{
    ast,
    error::OptionError,
    options::Value,
    source_info::{AstId, Children, OptionSourceInfo, PSEUDO_OPTION},
    tag, types,
};

const DEFAULT: &str = "default";
const JSON_NAME: &str = "json_name";

pub(super) fn is_pseudo(node: &ast::OptionNode) -> bool {
    matches!(
        node.name.as_slice(),
        [part] if !part.is_extension && (part.value == DEFAULT || part.value == JSON_NAME)
    )
}

impl<'a> Context<'a> {
    pub(super) fn apply_pseudo_options(
        &mut self,
        field: &mut types::FieldDescriptorProto,
        element_path: &[i32],
    ) -> Result<(), OptionError> {
        let uninterpreted = match field.options.as_mut() {
            Some(set) => set.take_uninterpreted(),
            None => return Ok(()),
        };
        let nodes = self.nodes.remove(element_path).unwrap_or_default();

        if uninterpreted.len() != nodes.len() {
            if let Some(set) = field.options.as_mut() {
                set.set_uninterpreted(uninterpreted);
            }
            if !nodes.is_empty() {
                self.nodes.insert(element_path.to_vec(), nodes);
            }
            return Ok(());
        }

        let mut remaining = Vec::new();
        let mut remaining_nodes = Vec::new();
        let mut default_value = None;
        let mut json_name = None;

        for (proto, node) in uninterpreted.into_iter().zip(nodes) {
            if !is_pseudo(&node) {
                remaining.push(proto);
                remaining_nodes.push(node);
                continue;
            }

            let is_default = node.name[0].value == DEFAULT;
            let seen = if is_default {
                &mut default_value
            } else {
                &mut json_name
            };
            let result = if seen.is_some() {
                Err(OptionError::forbidden(
                    node.name_span(),
                    format!("'{}' has already been set", node.name[0].value),
                ))
            } else if is_default {
                self.field_default_value(field, &node)
            } else {
                self.field_json_name(field, &node)
            };

            match result {
                Ok(value) => {
                    let path_tag = if is_default {
                        tag::field::DEFAULT_VALUE
                    } else {
                        tag::field::JSON_NAME
                    };
                    self.indexes.source_info.insert(
                        AstId::of(&node.span),
                        OptionSourceInfo {
                            path: vec![PSEUDO_OPTION, path_tag],
                            children: Children::None,
                        },
                    );
                    *seen = Some(value);
                }
                Err(error) => {
                    self.handler.error(error)?;
                    if self.lenient {
                        remaining.push(proto);
                        remaining_nodes.push(node);
                    }
                }
            }
        }

        if let Some(set) = field.options.as_mut() {
            set.set_uninterpreted(remaining);
        }
        if field
            .options
            .as_ref()
            .map_or(false, crate::options::OptionSet::is_empty)
        {
            field.options = None;
        }
        if !remaining_nodes.is_empty() {
            self.nodes.insert(element_path.to_vec(), remaining_nodes);
        }

        if let Some(value) = default_value {
            field.default_value = Some(value);
        }
        if let Some(value) = json_name {
            field.json_name = Some(value);
        }
        Ok(())
    }

    fn field_json_name(
        &mut self,
        field: &types::FieldDescriptorProto,
        node: &ast::OptionNode,
    ) -> Result<String, OptionError> {
        if field.extendee.is_some() {
            return Err(OptionError::forbidden(
                node.name_span(),
                "the json_name option may not be set on extension fields",
            ));
        }

        let bytes = match &node.value {
            ast::OptionValue::String(bytes) => bytes,
            other => {
                return Err(OptionError::type_mismatch(
                    other.span(),
                    format!("expected a string for json_name, but found {}", other.kind_name()),
                ))
            }
        };
        let value = String::from_utf8(bytes.value.clone()).map_err(|_| {
            OptionError::value(bytes.span.clone(), "json_name requires valid UTF-8")
        })?;

        if value.starts_with('[') && value.ends_with(']') {
            return Err(OptionError::forbidden(
                bytes.span.clone(),
                "json_name may not start with '[' and end with ']'",
            ));
        }

        Ok(value)
    }

    fn field_default_value(
        &mut self,
        field: &types::FieldDescriptorProto,
        node: &ast::OptionNode,
    ) -> Result<String, OptionError> {
        if field.label == Some(Label::Repeated as i32) {
            return Err(OptionError::forbidden(
                node.name_span(),
                "repeated fields may not have a default value",
            ));
        }

        let ty = field.r#type.and_then(Type::from_i32);
        let type_name = field.type_name.as_deref();

        if matches!(ty, Some(Type::Message) | Some(Type::Group)) {
            return Err(OptionError::forbidden(
                node.name_span(),
                "message fields may not have a default value",
            ));
        }

        let enum_ = match (ty, type_name) {
            (Some(Type::Enum), Some(name)) => self.find_enum(name),
            (None, Some(name)) => {
                if self.find_message(name).is_some() {
                    return Err(OptionError::forbidden(
                        node.name_span(),
                        "message fields may not have a default value",
                    ));
                }
                self.find_enum(name)
            }
            _ => None,
        };

        if let Some(enum_) = enum_ {
            self.resolve_enum_value(&enum_, &node.value, false)?;
            match &node.value {
                ast::OptionValue::Ident(ident) => return Ok(ident.value.clone()),
                _ => unreachable!("non-identifiers are rejected outside literals"),
            }
        }

        let ty = match ty {
            Some(Type::Enum) | Some(Type::Message) | Some(Type::Group) | None => {
                return Err(OptionError::not_found(
                    node.name_span(),
                    format!("unknown type '{}'", type_name.unwrap_or("")),
                ))
            }
            Some(ty) => ty,
        };

        let value = self.coerce_scalar(field.name(), ty, &node.value, false)?;
        Ok(default_to_string(&value))
    }
}

fn default_to_string(value: &Value) -> String {
    match value {
        Value::Bool(true) => "true".to_owned(),
        Value::Bool(false) => "false".to_owned(),
        Value::Int32(v) | Value::Sint32(v) | Value::Sfixed32(v) => v.to_string(),
        Value::Int64(v) | Value::Sint64(v) | Value::Sfixed64(v) => v.to_string(),
        Value::Uint32(v) | Value::Fixed32(v) => v.to_string(),
        Value::Uint64(v) | Value::Fixed64(v) => v.to_string(),
        Value::Float(v) => float_to_string(*v as f64),
        Value::Double(v) => float_to_string(*v),
        Value::String(v) => v.clone(),
        Value::Bytes(v) => escape_bytes(v),
        _ => unreachable!("not a scalar default"),
    }
}

fn float_to_string(value: f64) -> String {
    if value.is_nan() {
        "nan".to_owned()
    } else if value == f64::INFINITY {
        "inf".to_owned()
    } else if value == f64::NEG_INFINITY {
        "-inf".to_owned()
    } else {
        value.to_string()
    }
}

/// C-style escaping, as protoc stores bytes defaults.
fn escape_bytes(bytes: &[u8]) -> String {
    let mut result = String::with_capacity(bytes.len());
    for &byte in bytes {
        match byte {
            b'\n' => result.push_str("\\n"),
            b'\r' => result.push_str("\\r"),
            b'\t' => result.push_str("\\t"),
            b'\\' => result.push_str("\\\\"),
            b'"' => result.push_str("\\\""),
            b'\'' => result.push_str("\\'"),
            0x20..=0x7e => result.push(byte as char),
            _ => {
                result.push_str(&format!("\\{:03o}", byte));
            }
        }
    }
    result
}
