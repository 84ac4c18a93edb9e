//! Coercion of AST literals into typed scalar and enum values.

use logos::Span;
use prost_types::field_descriptor_proto::Type;

use super::Context;
use crate::{ast, error::OptionError, options::Value, pool::EnumRef, source_info::AstId};

fn int_value(int: &ast::Int) -> i128 {
    if int.negative {
        -(int.value as i128)
    } else {
        int.value as i128
    }
}

fn expected(ty: Type) -> &'static str {
    match ty {
        Type::Bool => "a boolean",
        Type::String => "a string",
        Type::Bytes => "a string",
        Type::Float | Type::Double => "a number",
        _ => "an integer",
    }
}

impl<'a> Context<'a> {
    pub(super) fn coerce_scalar(
        &mut self,
        field_name: &str,
        ty: Type,
        value: &ast::OptionValue,
        in_literal: bool,
    ) -> Result<Value, OptionError> {
        let mismatch = |value: &ast::OptionValue| {
            OptionError::type_mismatch(
                value.span(),
                format!(
                    "expected {} for field '{}', but found {}",
                    expected(ty),
                    field_name,
                    value.kind_name()
                ),
            )
        };

        match ty {
            Type::Bool => match value {
                ast::OptionValue::Ident(ident) => {
                    let truthy: &[&str] = if in_literal {
                        &["t", "true", "True"]
                    } else {
                        &["true"]
                    };
                    let falsy: &[&str] = if in_literal {
                        &["f", "false", "False"]
                    } else {
                        &["false"]
                    };
                    if truthy.contains(&ident.value.as_str()) {
                        Ok(Value::Bool(true))
                    } else if falsy.contains(&ident.value.as_str()) {
                        Ok(Value::Bool(false))
                    } else {
                        Err(mismatch(value))
                    }
                }
                other => Err(mismatch(other)),
            },
            Type::Int32 | Type::Sint32 | Type::Sfixed32 => match value {
                ast::OptionValue::Int(int) => {
                    let v = self.check_int_range(
                        int_value(int),
                        i32::MIN as i128,
                        i32::MAX as i128,
                        field_name,
                        &int.span,
                    )? as i32;
                    Ok(match ty {
                        Type::Int32 => Value::Int32(v),
                        Type::Sint32 => Value::Sint32(v),
                        _ => Value::Sfixed32(v),
                    })
                }
                other => Err(mismatch(other)),
            },
            Type::Uint32 | Type::Fixed32 => match value {
                ast::OptionValue::Int(int) => {
                    let v = self.check_int_range(
                        int_value(int),
                        0,
                        u32::MAX as i128,
                        field_name,
                        &int.span,
                    )? as u32;
                    Ok(match ty {
                        Type::Uint32 => Value::Uint32(v),
                        _ => Value::Fixed32(v),
                    })
                }
                other => Err(mismatch(other)),
            },
            Type::Int64 | Type::Sint64 | Type::Sfixed64 => match value {
                ast::OptionValue::Int(int) => {
                    let v = self.check_int_range(
                        int_value(int),
                        i64::MIN as i128,
                        i64::MAX as i128,
                        field_name,
                        &int.span,
                    )? as i64;
                    Ok(match ty {
                        Type::Int64 => Value::Int64(v),
                        Type::Sint64 => Value::Sint64(v),
                        _ => Value::Sfixed64(v),
                    })
                }
                other => Err(mismatch(other)),
            },
            Type::Uint64 | Type::Fixed64 => match value {
                ast::OptionValue::Int(int) => {
                    let v = self.check_int_range(
                        int_value(int),
                        0,
                        u64::MAX as i128,
                        field_name,
                        &int.span,
                    )? as u64;
                    Ok(match ty {
                        Type::Uint64 => Value::Uint64(v),
                        _ => Value::Fixed64(v),
                    })
                }
                other => Err(mismatch(other)),
            },
            Type::Float | Type::Double => {
                let v = match value {
                    ast::OptionValue::Int(int) => int_value(int) as f64,
                    ast::OptionValue::Float(float) => float.value,
                    ast::OptionValue::Ident(ident) => {
                        if ident.value.eq_ignore_ascii_case("inf")
                            || ident.value.eq_ignore_ascii_case("infinity")
                        {
                            f64::INFINITY
                        } else if ident.value.eq_ignore_ascii_case("nan") {
                            f64::NAN
                        } else {
                            return Err(mismatch(value));
                        }
                    }
                    other => return Err(mismatch(other)),
                };
                Ok(if ty == Type::Float {
                    Value::Float(v as f32)
                } else {
                    Value::Double(v)
                })
            }
            Type::String => match value {
                ast::OptionValue::String(bytes) => match String::from_utf8(bytes.value.clone()) {
                    Ok(string) => Ok(Value::String(string)),
                    Err(_) => Err(OptionError::value(
                        bytes.span.clone(),
                        format!("string field '{}' requires valid UTF-8", field_name),
                    )),
                },
                other => Err(mismatch(other)),
            },
            Type::Bytes => match value {
                ast::OptionValue::String(bytes) => {
                    Ok(Value::Bytes(bytes.value.clone().into()))
                }
                other => Err(mismatch(other)),
            },
            Type::Message | Type::Group | Type::Enum => {
                unreachable!("handled by field_kind")
            }
        }
    }

    fn check_int_range(
        &self,
        value: i128,
        min: i128,
        max: i128,
        field_name: &str,
        span: &Span,
    ) -> Result<i128, OptionError> {
        if value < min || value > max {
            Err(OptionError::value(
                span.clone(),
                format!("value {} is out of range for field '{}'", value, field_name),
            ))
        } else {
            Ok(value)
        }
    }

    /// Resolves an enum-typed value: identifiers by name, and inside
    /// message literals also numbers, where unknown numbers are only
    /// permitted for open enums.
    pub(super) fn resolve_enum_value(
        &mut self,
        enum_: &EnumRef,
        value: &ast::OptionValue,
        in_literal: bool,
    ) -> Result<Value, OptionError> {
        match value {
            ast::OptionValue::Ident(ident) => match enum_.value_by_name(&ident.value) {
                Some(value_ref) => {
                    self.indexes
                        .references
                        .enum_values
                        .insert(AstId::of(&ident.span), (enum_.clone(), value_ref));
                    Ok(Value::Enum(enum_.value(value_ref).number()))
                }
                None => Err(OptionError::value(
                    ident.span.clone(),
                    format!(
                        "'{}' is not a value of enum '{}'",
                        ident.value,
                        enum_.full_name()
                    ),
                )),
            },
            ast::OptionValue::Int(int) if in_literal => {
                let number = int_value(int);
                if number < i32::MIN as i128 || number > i32::MAX as i128 {
                    return Err(OptionError::value(
                        int.span.clone(),
                        format!(
                            "value {} is out of range for enum '{}'",
                            number,
                            enum_.full_name()
                        ),
                    ));
                }
                let number = number as i32;
                match enum_.value_by_number(number) {
                    Some(_) => Ok(Value::Enum(number)),
                    None if !enum_.is_closed() => Ok(Value::Enum(number)),
                    None => Err(OptionError::value(
                        int.span.clone(),
                        format!(
                            "{} is not a value of closed enum '{}'",
                            number,
                            enum_.full_name()
                        ),
                    )),
                }
            }
            other => Err(OptionError::type_mismatch(
                other.span(),
                format!(
                    "expected a value of enum '{}', but found {}",
                    enum_.full_name(),
                    other.kind_name()
                ),
            )),
        }
    }
}
