//! Checks applied to an element's options after the custom phase:
//! required-field presence, feature self-use, and edition gating.

use logos::Span;

use super::{Context, FieldKind};
use crate::{
    error::{OptionError, OptionWarning},
    google, make_name,
    options::{OptionSet, Value},
    pool::{FeatureSupport, FieldRef, MessageRef, OptionTarget},
};

impl<'a> Context<'a> {
    pub(super) fn validate_element(
        &mut self,
        set: &OptionSet,
        target: OptionTarget,
        element_path: &[i32],
    ) -> Result<(), OptionError> {
        // Nothing was interpreted for this element in this run, so there
        // is nothing new to check (and no position to report against).
        let anchor = match self.anchors.get(element_path) {
            Some(span) => span.clone(),
            None => return Ok(()),
        };

        let message = match self.find_message(google::options_message_name(target)) {
            Some(message) => message,
            None => return Ok(()),
        };

        if !self.lenient {
            let mut missing = Vec::new();
            self.collect_missing_required(set, &message, &mut missing);
            if !missing.is_empty() {
                let names = missing
                    .iter()
                    .map(|name| format!("'{}'", name))
                    .collect::<Vec<_>>()
                    .join(", ");
                self.handler.error(OptionError::value(
                    anchor.clone(),
                    format!("required option field(s) {} are not set", names),
                ))?;
            }
        }

        self.validate_fields(set, &message, &anchor, false)
    }

    fn collect_missing_required(
        &self,
        set: &OptionSet,
        message: &MessageRef,
        missing: &mut Vec<String>,
    ) {
        for field in message.fields() {
            if field.is_required() && set.get(field.number()).is_none() {
                missing.push(field.full_name().to_owned());
            }
        }

        for (tag, value) in set.iter() {
            let field = match self.known_field(message, tag) {
                Some(field) => field,
                None => continue,
            };
            let inner = match self.field_kind(&field, &(0..0)) {
                Ok(FieldKind::Message(inner, _)) => inner,
                _ => continue,
            };
            for item in list_items(value) {
                if let Some(value_set) = item.as_message() {
                    self.collect_missing_required(value_set, &inner, missing);
                }
            }
        }
    }

    /// Recursive walk over the populated options: edition gating on each
    /// field and the enum values it carries, and the prohibition on
    /// using a feature in the file that defines it.
    fn validate_fields(
        &mut self,
        set: &OptionSet,
        message: &MessageRef,
        anchor: &Span,
        in_features: bool,
    ) -> Result<(), OptionError> {
        for (tag, value) in set.iter() {
            let field = match self.known_field(message, tag) {
                Some(field) => field,
                None => continue,
            };

            if in_features && field.defining_file() == self.file_name {
                self.handler.error(OptionError::forbidden(
                    anchor.clone(),
                    format!(
                        "feature '{}' may not be used in the same file in which it is defined",
                        field.full_name()
                    ),
                ))?;
            }

            if let Some(support) = field.feature_support() {
                self.check_feature_support(support, field.full_name(), anchor)?;
            }

            match self.field_kind(&field, anchor) {
                Ok(FieldKind::Enum(enum_)) => {
                    for item in list_items(value) {
                        let number = match item.as_int() {
                            Some(number) => number as i32,
                            None => continue,
                        };
                        let value_ref = match enum_.value_by_number(number) {
                            Some(value_ref) => value_ref,
                            None => continue,
                        };
                        let info = enum_.value(value_ref);
                        if let Some(support) = info.feature_support() {
                            let name = make_name(enum_.full_name(), info.name());
                            self.check_feature_support(support, &name, anchor)?;
                        }
                    }
                }
                Ok(FieldKind::Message(inner, _)) => {
                    let in_features = in_features
                        || field.type_name() == Some(google::FEATURE_SET)
                        || inner.full_name() == google::FEATURE_SET;
                    for item in list_items(value) {
                        if let Some(value_set) = item.as_message() {
                            self.validate_fields(value_set, &inner, anchor, in_features)?;
                        }
                    }
                }
                _ => (),
            }
        }

        Ok(())
    }

    fn check_feature_support(
        &mut self,
        support: &FeatureSupport,
        name: &str,
        anchor: &Span,
    ) -> Result<(), OptionError> {
        if let Some(introduced) = support.edition_introduced {
            if self.edition < introduced {
                return self.handler.error(OptionError::forbidden(
                    anchor.clone(),
                    format!("'{}' was not introduced until edition {}", name, introduced),
                ));
            }
        }

        if let Some(removed) = support.edition_removed {
            if self.edition >= removed {
                return self.handler.error(OptionError::forbidden(
                    anchor.clone(),
                    format!("'{}' was removed in edition {}", name, removed),
                ));
            }
        }

        if let Some(deprecated) = support.edition_deprecated {
            if self.edition >= deprecated {
                let mut message =
                    format!("'{}' is deprecated as of edition {}", name, deprecated);
                if let Some(warning) = &support.deprecation_warning {
                    message.push_str(": ");
                    message.push_str(warning);
                }
                self.handler.warning(OptionWarning {
                    message,
                    span: anchor.clone(),
                });
            }
        }

        Ok(())
    }

    /// A set field's descriptor: a declared member of `message`, or an
    /// extension registered for it.
    fn known_field(&self, message: &MessageRef, tag: i32) -> Option<FieldRef> {
        message
            .field_by_number(tag)
            .cloned()
            .or_else(|| self.find_extension_by_number(message.full_name(), tag))
    }
}

fn list_items(value: &Value) -> impl Iterator<Item = &Value> {
    match value {
        Value::List(items) => items.iter(),
        other => std::slice::from_ref(other).iter(),
    }
}
