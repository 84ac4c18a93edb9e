//! The portion of the proto AST consumed by option interpretation.
//!
//! The parser keeps option declarations in uninterpreted form: a dotted
//! name made of plain and extension parts, and a single raw value which
//! may be a literal, an identifier, an array literal or a message
//! literal. Interpretation resolves these against descriptors and writes
//! the typed result into the element's options.

use logos::Span;
use prost_types::{uninterpreted_option, UninterpretedOption};

#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub value: String,
    pub span: Span,
}

impl Ident {
    pub fn new(value: impl Into<String>, span: Span) -> Self {
        Ident {
            value: value.into(),
            span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Int {
    pub negative: bool,
    pub value: u64,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Float {
    pub value: f64,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bytes {
    pub value: Vec<u8>,
    pub span: Span,
}

/// One segment of a dotted option name.
///
/// Plain parts select a field of the current options message by simple
/// name. Extension parts (written in parentheses) name an extension by
/// its fully qualified name, with the leading dot optional.
#[derive(Debug, Clone, PartialEq)]
pub struct NamePart {
    pub value: String,
    pub is_extension: bool,
    pub span: Span,
}

impl NamePart {
    pub fn ident(value: impl Into<String>, span: Span) -> Self {
        NamePart {
            value: value.into(),
            is_extension: false,
            span,
        }
    }

    pub fn extension(value: impl Into<String>, span: Span) -> Self {
        NamePart {
            value: value.into(),
            is_extension: true,
            span,
        }
    }
}

/// An uninterpreted `option` declaration, or one entry of a bracketed
/// option list.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionNode {
    pub name: Vec<NamePart>,
    pub value: OptionValue,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Ident(Ident),
    Int(Int),
    Float(Float),
    String(Bytes),
    Array(ArrayLiteral),
    Message(MessageLiteral),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayLiteral {
    pub items: Vec<OptionValue>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageLiteral {
    pub fields: Vec<MessageLiteralField>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageLiteralField {
    pub name: LiteralFieldName,
    /// Span of the `:` separator, if present. The separator is mandatory
    /// except before message-literal values.
    pub separator: Option<Span>,
    pub value: OptionValue,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralFieldName {
    Ident(Ident),
    /// `[pkg.ext_field]`
    Extension(Ident),
    /// `[prefix/full.TypeName]`
    Any {
        url_prefix: String,
        type_name: String,
        span: Span,
    },
}

impl LiteralFieldName {
    pub fn span(&self) -> Span {
        match self {
            LiteralFieldName::Ident(ident) | LiteralFieldName::Extension(ident) => {
                ident.span.clone()
            }
            LiteralFieldName::Any { span, .. } => span.clone(),
        }
    }
}

impl OptionValue {
    pub fn span(&self) -> Span {
        match self {
            OptionValue::Ident(value) => value.span.clone(),
            OptionValue::Int(value) => value.span.clone(),
            OptionValue::Float(value) => value.span.clone(),
            OptionValue::String(value) => value.span.clone(),
            OptionValue::Array(value) => value.span.clone(),
            OptionValue::Message(value) => value.span.clone(),
        }
    }

    /// Name of the value's shape, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            OptionValue::Ident(_) => "identifier",
            OptionValue::Int(_) => "integer",
            OptionValue::Float(_) => "number",
            OptionValue::String(_) => "string",
            OptionValue::Array(_) => "array",
            OptionValue::Message(_) => "message",
        }
    }
}

impl OptionNode {
    pub fn new(name: Vec<NamePart>, value: OptionValue, span: Span) -> Self {
        OptionNode { name, value, span }
    }

    pub fn name_span(&self) -> Span {
        match (self.name.first(), self.name.last()) {
            (Some(first), Some(last)) => first.span.start..last.span.end,
            _ => self.span.clone(),
        }
    }

    /// Formats the dotted name as written in source, with extension
    /// parts parenthesized.
    pub fn name_string(&self) -> String {
        let mut result = String::new();
        for (index, part) in self.name.iter().enumerate() {
            if index != 0 {
                result.push('.');
            }
            if part.is_extension {
                result.push('(');
                result.push_str(&part.value);
                result.push(')');
            } else {
                result.push_str(&part.value);
            }
        }
        result
    }

    /// Builds the wire-level form of this declaration, as stored in the
    /// `uninterpreted_option` field of the containing options message.
    pub fn to_uninterpreted(&self) -> UninterpretedOption {
        let name = self
            .name
            .iter()
            .map(|part| uninterpreted_option::NamePart {
                name_part: part.value.clone(),
                is_extension: part.is_extension,
            })
            .collect();

        let mut option = UninterpretedOption {
            name,
            ..Default::default()
        };

        match &self.value {
            OptionValue::Ident(ident) => option.identifier_value = Some(ident.value.clone()),
            OptionValue::Int(int) if int.negative => {
                option.negative_int_value = Some(int.value.wrapping_neg() as i64);
            }
            OptionValue::Int(int) => option.positive_int_value = Some(int.value),
            OptionValue::Float(float) => option.double_value = Some(float.value),
            OptionValue::String(bytes) => option.string_value = Some(bytes.value.clone()),
            OptionValue::Array(_) | OptionValue::Message(_) => {
                option.aggregate_value = Some(String::new());
            }
        }

        option
    }
}
