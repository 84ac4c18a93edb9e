//! Compiled-in definitions of `google/protobuf/descriptor.proto` and
//! `google/protobuf/any.proto`.
//!
//! Used as the last resolution layer, so standard options interpret
//! even when neither the compilation set nor the linker provides
//! descriptor.proto. Only the option-relevant subset is modelled: the
//! `*Options` messages, their nested enums, `FeatureSet` and
//! `UninterpretedOption`.

use once_cell::sync::Lazy;
use prost_types::field_descriptor_proto::{Label, Type};

use crate::{
    options::{OptionSet, Value},
    pool::{DescriptorIndex, OptionTarget},
    tag, types,
};

pub(crate) const DESCRIPTOR_FILE: &str = "google/protobuf/descriptor.proto";
pub(crate) const ANY: &str = "google.protobuf.Any";
pub(crate) const FEATURE_SET: &str = "google.protobuf.FeatureSet";
pub(crate) const UNINTERPRETED_OPTION_FIELD: &str = "uninterpreted_option";

/// Fully qualified name of the options message for each option target.
pub(crate) fn options_message_name(target: OptionTarget) -> &'static str {
    match target {
        OptionTarget::File => "google.protobuf.FileOptions",
        OptionTarget::ExtensionRange => "google.protobuf.ExtensionRangeOptions",
        OptionTarget::Message => "google.protobuf.MessageOptions",
        OptionTarget::Field => "google.protobuf.FieldOptions",
        OptionTarget::Oneof => "google.protobuf.OneofOptions",
        OptionTarget::Enum => "google.protobuf.EnumOptions",
        OptionTarget::EnumValue => "google.protobuf.EnumValueOptions",
        OptionTarget::Service => "google.protobuf.ServiceOptions",
        OptionTarget::Method => "google.protobuf.MethodOptions",
    }
}

pub(crate) fn descriptor_file() -> &'static types::FileDescriptorProto {
    static FILE: Lazy<types::FileDescriptorProto> = Lazy::new(build_descriptor_file);
    &FILE
}

pub(crate) fn any_file() -> &'static types::FileDescriptorProto {
    static FILE: Lazy<types::FileDescriptorProto> = Lazy::new(build_any_file);
    &FILE
}

/// Index over the compiled-in files, shared by every interpreter.
pub(crate) fn google_index() -> &'static DescriptorIndex {
    static INDEX: Lazy<DescriptorIndex> =
        Lazy::new(|| DescriptorIndex::from_files([descriptor_file(), any_file()]));
    &INDEX
}

fn field(name: &str, number: i32, ty: Type) -> types::FieldDescriptorProto {
    types::FieldDescriptorProto {
        name: Some(name.to_owned()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(ty as i32),
        ..Default::default()
    }
}

fn named_field(name: &str, number: i32, ty: Type, type_name: &str) -> types::FieldDescriptorProto {
    types::FieldDescriptorProto {
        type_name: Some(format!(".google.protobuf.{}", type_name)),
        ..field(name, number, ty)
    }
}

fn repeated(mut field: types::FieldDescriptorProto) -> types::FieldDescriptorProto {
    field.label = Some(Label::Repeated as i32);
    field
}

fn uninterpreted_field() -> types::FieldDescriptorProto {
    repeated(named_field(
        UNINTERPRETED_OPTION_FIELD,
        tag::options::UNINTERPRETED,
        Type::Message,
        "UninterpretedOption",
    ))
}

fn message(name: &str, fields: Vec<types::FieldDescriptorProto>) -> types::DescriptorProto {
    types::DescriptorProto {
        name: Some(name.to_owned()),
        field: fields,
        ..Default::default()
    }
}

fn enumeration(name: &str, values: &[(&str, i32)]) -> types::EnumDescriptorProto {
    types::EnumDescriptorProto {
        name: Some(name.to_owned()),
        value: values
            .iter()
            .map(|&(name, number)| types::EnumValueDescriptorProto {
                name: Some(name.to_owned()),
                number: Some(number),
                options: None,
            })
            .collect(),
        ..Default::default()
    }
}

/// Options attached to a `FeatureSet` field: the element kinds it may
/// target and the edition it was introduced in.
fn feature_field_options(targets: &[OptionTarget], introduced: i32) -> OptionSet {
    let mut options = OptionSet::new();
    options.set(
        tag::options::field::TARGETS,
        Value::List(targets.iter().map(|&t| Value::Enum(t as i32)).collect()),
    );
    let mut support = OptionSet::new();
    support.set(
        tag::options::feature_support::EDITION_INTRODUCED,
        Value::Enum(introduced),
    );
    options.set(
        tag::options::field::FEATURE_SUPPORT,
        Value::Message(support),
    );
    options
}

fn feature_field(
    name: &str,
    number: i32,
    type_name: &str,
    targets: &[OptionTarget],
    introduced: i32,
) -> types::FieldDescriptorProto {
    types::FieldDescriptorProto {
        options: Some(feature_field_options(targets, introduced)),
        ..named_field(name, number, Type::Enum, type_name)
    }
}

fn build_descriptor_file() -> types::FileDescriptorProto {
    const EDITION_2023: i32 = 1000;
    const EDITION_2024: i32 = 1001;

    let file_options = types::DescriptorProto {
        enum_type: vec![enumeration(
            "OptimizeMode",
            &[("SPEED", 1), ("CODE_SIZE", 2), ("LITE_RUNTIME", 3)],
        )],
        ..message(
            "FileOptions",
            vec![
                field("java_package", 1, Type::String),
                field("java_outer_classname", 8, Type::String),
                named_field("optimize_for", 9, Type::Enum, "FileOptions.OptimizeMode"),
                field("java_multiple_files", 10, Type::Bool),
                field("go_package", 11, Type::String),
                field("cc_generic_services", 16, Type::Bool),
                field("java_generic_services", 17, Type::Bool),
                field("py_generic_services", 18, Type::Bool),
                field("java_generate_equals_and_hash", 20, Type::Bool),
                field("deprecated", 23, Type::Bool),
                field("java_string_check_utf8", 27, Type::Bool),
                field("cc_enable_arenas", 31, Type::Bool),
                field("objc_class_prefix", 36, Type::String),
                field("csharp_namespace", 37, Type::String),
                field("swift_prefix", 39, Type::String),
                field("php_class_prefix", 40, Type::String),
                field("php_namespace", 41, Type::String),
                field("php_metadata_namespace", 44, Type::String),
                field("ruby_package", 45, Type::String),
                named_field("features", 50, Type::Message, "FeatureSet"),
                uninterpreted_field(),
            ],
        )
    };

    let message_options = message(
        "MessageOptions",
        vec![
            field("message_set_wire_format", 1, Type::Bool),
            field("no_standard_descriptor_accessor", 2, Type::Bool),
            field("deprecated", 3, Type::Bool),
            field("map_entry", 7, Type::Bool),
            field("deprecated_legacy_json_field_conflicts", 11, Type::Bool),
            named_field("features", 12, Type::Message, "FeatureSet"),
            uninterpreted_field(),
        ],
    );

    let field_options = types::DescriptorProto {
        enum_type: vec![
            enumeration("CType", &[("STRING", 0), ("CORD", 1), ("STRING_PIECE", 2)]),
            enumeration(
                "JSType",
                &[("JS_NORMAL", 0), ("JS_STRING", 1), ("JS_NUMBER", 2)],
            ),
            enumeration(
                "OptionRetention",
                &[
                    ("RETENTION_UNKNOWN", 0),
                    ("RETENTION_RUNTIME", 1),
                    ("RETENTION_SOURCE", 2),
                ],
            ),
            enumeration(
                "OptionTargetType",
                &[
                    ("TARGET_TYPE_UNKNOWN", 0),
                    ("TARGET_TYPE_FILE", 1),
                    ("TARGET_TYPE_EXTENSION_RANGE", 2),
                    ("TARGET_TYPE_MESSAGE", 3),
                    ("TARGET_TYPE_FIELD", 4),
                    ("TARGET_TYPE_ONEOF", 5),
                    ("TARGET_TYPE_ENUM", 6),
                    ("TARGET_TYPE_ENUM_ENTRY", 7),
                    ("TARGET_TYPE_SERVICE", 8),
                    ("TARGET_TYPE_METHOD", 9),
                ],
            ),
        ],
        nested_type: vec![
            message(
                "EditionDefault",
                vec![
                    named_field("edition", 3, Type::Enum, "Edition"),
                    field("value", 2, Type::String),
                ],
            ),
            message(
                "FeatureSupport",
                vec![
                    named_field("edition_introduced", 1, Type::Enum, "Edition"),
                    named_field("edition_deprecated", 2, Type::Enum, "Edition"),
                    field("deprecation_warning", 3, Type::String),
                    named_field("edition_removed", 4, Type::Enum, "Edition"),
                ],
            ),
        ],
        ..message(
            "FieldOptions",
            vec![
                named_field("ctype", 1, Type::Enum, "FieldOptions.CType"),
                field("packed", 2, Type::Bool),
                field("deprecated", 3, Type::Bool),
                field("lazy", 5, Type::Bool),
                named_field("jstype", 6, Type::Enum, "FieldOptions.JSType"),
                field("weak", 10, Type::Bool),
                field("unverified_lazy", 15, Type::Bool),
                field("debug_redact", 16, Type::Bool),
                named_field("retention", 17, Type::Enum, "FieldOptions.OptionRetention"),
                repeated(named_field(
                    "targets",
                    19,
                    Type::Enum,
                    "FieldOptions.OptionTargetType",
                )),
                repeated(named_field(
                    "edition_defaults",
                    20,
                    Type::Message,
                    "FieldOptions.EditionDefault",
                )),
                named_field("features", 21, Type::Message, "FeatureSet"),
                named_field(
                    "feature_support",
                    22,
                    Type::Message,
                    "FieldOptions.FeatureSupport",
                ),
                uninterpreted_field(),
            ],
        )
    };

    let oneof_options = message(
        "OneofOptions",
        vec![
            named_field("features", 1, Type::Message, "FeatureSet"),
            uninterpreted_field(),
        ],
    );

    let enum_options = message(
        "EnumOptions",
        vec![
            field("allow_alias", 2, Type::Bool),
            field("deprecated", 3, Type::Bool),
            field("deprecated_legacy_json_field_conflicts", 6, Type::Bool),
            named_field("features", 7, Type::Message, "FeatureSet"),
            uninterpreted_field(),
        ],
    );

    let enum_value_options = message(
        "EnumValueOptions",
        vec![
            field("deprecated", 1, Type::Bool),
            named_field("features", 2, Type::Message, "FeatureSet"),
            field("debug_redact", 3, Type::Bool),
            named_field(
                "feature_support",
                4,
                Type::Message,
                "FieldOptions.FeatureSupport",
            ),
            uninterpreted_field(),
        ],
    );

    let service_options = message(
        "ServiceOptions",
        vec![
            field("deprecated", 33, Type::Bool),
            named_field("features", 34, Type::Message, "FeatureSet"),
            uninterpreted_field(),
        ],
    );

    let method_options = types::DescriptorProto {
        enum_type: vec![enumeration(
            "IdempotencyLevel",
            &[
                ("IDEMPOTENCY_UNKNOWN", 0),
                ("NO_SIDE_EFFECTS", 1),
                ("IDEMPOTENT", 2),
            ],
        )],
        ..message(
            "MethodOptions",
            vec![
                field("deprecated", 33, Type::Bool),
                named_field(
                    "idempotency_level",
                    34,
                    Type::Enum,
                    "MethodOptions.IdempotencyLevel",
                ),
                named_field("features", 35, Type::Message, "FeatureSet"),
                uninterpreted_field(),
            ],
        )
    };

    let extension_range_options = types::DescriptorProto {
        enum_type: vec![enumeration(
            "VerificationState",
            &[("DECLARATION", 0), ("UNVERIFIED", 1)],
        )],
        nested_type: vec![message(
            "Declaration",
            vec![
                field("number", 1, Type::Int32),
                field("full_name", 2, Type::String),
                field("type", 3, Type::String),
                field("reserved", 5, Type::Bool),
                field("repeated", 6, Type::Bool),
            ],
        )],
        ..message(
            "ExtensionRangeOptions",
            vec![
                repeated(named_field(
                    "declaration",
                    2,
                    Type::Message,
                    "ExtensionRangeOptions.Declaration",
                )),
                named_field(
                    "verification",
                    3,
                    Type::Enum,
                    "ExtensionRangeOptions.VerificationState",
                ),
                named_field("features", 50, Type::Message, "FeatureSet"),
                uninterpreted_field(),
            ],
        )
    };

    use crate::pool::OptionTarget::{Enum, Field, File, Message};
    let feature_set = message(
        "FeatureSet",
        vec![
            feature_field(
                "field_presence",
                1,
                "FeatureSet.FieldPresence",
                &[Field, File],
                EDITION_2023,
            ),
            feature_field(
                "enum_type",
                2,
                "FeatureSet.EnumType",
                &[Enum, File],
                EDITION_2023,
            ),
            feature_field(
                "repeated_field_encoding",
                3,
                "FeatureSet.RepeatedFieldEncoding",
                &[Field, File],
                EDITION_2023,
            ),
            feature_field(
                "utf8_validation",
                4,
                "FeatureSet.Utf8Validation",
                &[Field, File],
                EDITION_2023,
            ),
            feature_field(
                "message_encoding",
                5,
                "FeatureSet.MessageEncoding",
                &[Field, File],
                EDITION_2023,
            ),
            feature_field(
                "json_format",
                6,
                "FeatureSet.JsonFormat",
                &[Message, Enum, File],
                EDITION_2023,
            ),
            feature_field(
                "enforce_naming_style",
                7,
                "FeatureSet.EnforceNamingStyle",
                &[File],
                EDITION_2024,
            ),
        ],
    );
    let feature_set = types::DescriptorProto {
        enum_type: vec![
            enumeration(
                "FieldPresence",
                &[
                    ("FIELD_PRESENCE_UNKNOWN", 0),
                    ("EXPLICIT", 1),
                    ("IMPLICIT", 2),
                    ("LEGACY_REQUIRED", 3),
                ],
            ),
            enumeration(
                "EnumType",
                &[("ENUM_TYPE_UNKNOWN", 0), ("OPEN", 1), ("CLOSED", 2)],
            ),
            enumeration(
                "RepeatedFieldEncoding",
                &[
                    ("REPEATED_FIELD_ENCODING_UNKNOWN", 0),
                    ("PACKED", 1),
                    ("EXPANDED", 2),
                ],
            ),
            enumeration(
                "Utf8Validation",
                &[("UTF8_VALIDATION_UNKNOWN", 0), ("VERIFY", 2), ("NONE", 3)],
            ),
            enumeration(
                "MessageEncoding",
                &[
                    ("MESSAGE_ENCODING_UNKNOWN", 0),
                    ("LENGTH_PREFIXED", 1),
                    ("DELIMITED", 2),
                ],
            ),
            enumeration(
                "JsonFormat",
                &[
                    ("JSON_FORMAT_UNKNOWN", 0),
                    ("ALLOW", 1),
                    ("LEGACY_BEST_EFFORT", 2),
                ],
            ),
            enumeration(
                "EnforceNamingStyle",
                &[
                    ("ENFORCE_NAMING_STYLE_UNKNOWN", 0),
                    ("STYLE2024", 1),
                    ("STYLE_LEGACY", 2),
                ],
            ),
        ],
        ..feature_set
    };

    let uninterpreted_option = types::DescriptorProto {
        nested_type: vec![message(
            "NamePart",
            vec![
                types::FieldDescriptorProto {
                    label: Some(Label::Required as i32),
                    ..field("name_part", 1, Type::String)
                },
                types::FieldDescriptorProto {
                    label: Some(Label::Required as i32),
                    ..field("is_extension", 2, Type::Bool)
                },
            ],
        )],
        ..message(
            "UninterpretedOption",
            vec![
                repeated(named_field(
                    "name",
                    2,
                    Type::Message,
                    "UninterpretedOption.NamePart",
                )),
                field("identifier_value", 3, Type::String),
                field("positive_int_value", 4, Type::Uint64),
                field("negative_int_value", 5, Type::Int64),
                field("double_value", 6, Type::Double),
                field("string_value", 7, Type::Bytes),
                field("aggregate_value", 8, Type::String),
            ],
        )
    };

    types::FileDescriptorProto {
        name: Some(DESCRIPTOR_FILE.to_owned()),
        package: Some("google.protobuf".to_owned()),
        message_type: vec![
            file_options,
            message_options,
            field_options,
            oneof_options,
            enum_options,
            enum_value_options,
            service_options,
            method_options,
            extension_range_options,
            feature_set,
            uninterpreted_option,
        ],
        enum_type: vec![enumeration(
            "Edition",
            &[
                ("EDITION_UNKNOWN", 0),
                ("EDITION_LEGACY", 900),
                ("EDITION_PROTO2", 998),
                ("EDITION_PROTO3", 999),
                ("EDITION_2023", 1000),
                ("EDITION_2024", 1001),
            ],
        )],
        syntax: Some("proto2".to_owned()),
        ..Default::default()
    }
}

fn build_any_file() -> types::FileDescriptorProto {
    types::FileDescriptorProto {
        name: Some("google/protobuf/any.proto".to_owned()),
        package: Some("google.protobuf".to_owned()),
        message_type: vec![message(
            "Any",
            vec![
                field("type_url", 1, Type::String),
                field("value", 2, Type::Bytes),
            ],
        )],
        syntax: Some("proto3".to_owned()),
        ..Default::default()
    }
}
