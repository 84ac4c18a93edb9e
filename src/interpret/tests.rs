use bytes::Bytes;
use logos::Span;
use prost_types::field_descriptor_proto::{Label, Type};

use super::*;
use crate::error::{CollectDiagnostics, FailFast};
use crate::source_info::PSEUDO_OPTION;

fn ident(value: &str, span: Span) -> ast::OptionValue {
    ast::OptionValue::Ident(ast::Ident::new(value, span))
}

fn int(value: u64, span: Span) -> ast::OptionValue {
    ast::OptionValue::Int(ast::Int {
        negative: false,
        value,
        span,
    })
}

fn string(value: &str, span: Span) -> ast::OptionValue {
    ast::OptionValue::String(ast::Bytes {
        value: value.as_bytes().to_vec(),
        span,
    })
}

fn array(items: Vec<ast::OptionValue>, span: Span) -> ast::OptionValue {
    ast::OptionValue::Array(ast::ArrayLiteral { items, span })
}

fn literal(fields: Vec<ast::MessageLiteralField>, span: Span) -> ast::OptionValue {
    ast::OptionValue::Message(ast::MessageLiteral { fields, span })
}

fn literal_field(name: &str, name_span: Span, value: ast::OptionValue) -> ast::MessageLiteralField {
    let span = name_span.start..value.span().end;
    ast::MessageLiteralField {
        name: ast::LiteralFieldName::Ident(ast::Ident::new(name, name_span.clone())),
        separator: Some(name_span.end..name_span.end + 1),
        value,
        span,
    }
}

fn plain(name: &str, span: Span) -> ast::NamePart {
    ast::NamePart::ident(name, span)
}

fn ext(name: &str, span: Span) -> ast::NamePart {
    ast::NamePart::extension(name, span)
}

fn option(name: Vec<ast::NamePart>, value: ast::OptionValue, span: Span) -> ast::OptionNode {
    ast::OptionNode::new(name, value, span)
}

fn options_with(nodes: &[ast::OptionNode]) -> OptionSet {
    let mut set = OptionSet::new();
    for node in nodes {
        set.push_uninterpreted(node.to_uninterpreted());
    }
    set
}

fn file_with_options(nodes: Vec<ast::OptionNode>) -> ParsedFile {
    let file = types::FileDescriptorProto {
        name: Some("test.proto".to_owned()),
        package: Some("test".to_owned()),
        syntax: Some("proto2".to_owned()),
        options: Some(options_with(&nodes)),
        ..Default::default()
    };
    ParsedFile::new(file).with_option_nodes(vec![], nodes)
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

fn extension(name: &str, number: i32, ty: Type, extendee: &str) -> types::FieldDescriptorProto {
    types::FieldDescriptorProto {
        extendee: Some(extendee.to_owned()),
        ..field(name, number, ty)
    }
}

fn message_extension(
    name: &str,
    number: i32,
    extendee: &str,
    type_name: &str,
) -> types::FieldDescriptorProto {
    types::FieldDescriptorProto {
        type_name: Some(type_name.to_owned()),
        ..extension(name, number, Type::Message, extendee)
    }
}

fn enum_value(name: &str, number: i32) -> types::EnumValueDescriptorProto {
    types::EnumValueDescriptorProto {
        name: Some(name.to_owned()),
        number: Some(number),
        options: None,
    }
}

fn dep_file(
    messages: Vec<types::DescriptorProto>,
    extensions: Vec<types::FieldDescriptorProto>,
) -> types::FileDescriptorProto {
    types::FileDescriptorProto {
        name: Some("ext.proto".to_owned()),
        package: Some("test".to_owned()),
        syntax: Some("proto2".to_owned()),
        message_type: messages,
        extension: extensions,
        ..Default::default()
    }
}

#[track_caller]
fn interpret_ok(parsed: &mut ParsedFile, linker: &DescriptorIndex) -> OptionIndexes {
    interpret_options(parsed, linker, &mut FailFast).unwrap()
}

#[track_caller]
fn interpret_err(parsed: &mut ParsedFile, linker: &DescriptorIndex) -> OptionError {
    interpret_options(parsed, linker, &mut FailFast).unwrap_err()
}

fn file_options(parsed: &ParsedFile) -> &OptionSet {
    parsed.file.options.as_ref().unwrap()
}

#[test]
fn file_option_string() {
    let mut parsed = file_with_options(vec![option(
        vec![plain("java_package", 0..12)],
        string("com.example", 15..28),
        0..29,
    )]);

    let indexes = interpret_ok(&mut parsed, &DescriptorIndex::new());

    assert_eq!(
        file_options(&parsed).get(1),
        Some(&Value::String("com.example".to_owned()))
    );
    assert!(file_options(&parsed).uninterpreted().is_empty());
    assert_eq!(indexes.source_info[&AstId::of(&(0..29))].path, vec![1]);
    assert_eq!(
        indexes.references.option_fields[&AstId::of(&(0..12))].full_name(),
        "google.protobuf.FileOptions.java_package"
    );
}

#[test]
fn file_option_enum() {
    let mut parsed = file_with_options(vec![option(
        vec![plain("optimize_for", 0..12)],
        ident("CODE_SIZE", 15..24),
        0..25,
    )]);

    interpret_ok(&mut parsed, &DescriptorIndex::new());

    assert_eq!(file_options(&parsed).get(9), Some(&Value::Enum(2)));
}

#[test]
fn scalar_out_of_range() {
    let linker = DescriptorIndex::from_files([&dep_file(
        vec![],
        vec![extension("i32", 1000, Type::Int32, ".google.protobuf.FileOptions")],
    )]);
    let mut parsed = file_with_options(vec![option(
        vec![ext("test.i32", 0..10)],
        int(2147483648, 13..23),
        0..24,
    )]);

    assert_eq!(
        interpret_err(&mut parsed, &linker),
        OptionError::Value {
            message: "value 2147483648 is out of range for field 'test.i32'".to_owned(),
            span: 13..23,
        }
    );
}

#[test]
fn bool_value_outside_literal() {
    let mut parsed = file_with_options(vec![option(
        vec![plain("cc_enable_arenas", 0..16)],
        ident("True", 19..23),
        0..24,
    )]);

    assert_eq!(
        interpret_err(&mut parsed, &DescriptorIndex::new()),
        OptionError::TypeMismatch {
            message: "expected a boolean for field \
                      'google.protobuf.FileOptions.cc_enable_arenas', but found identifier"
                .to_owned(),
            span: 19..23,
        }
    );
}

#[test]
fn bool_value_inside_literal() {
    let linker = DescriptorIndex::from_files([&dep_file(
        vec![types::DescriptorProto {
            name: Some("Flags".to_owned()),
            field: vec![field("flag", 1, Type::Bool)],
            ..Default::default()
        }],
        vec![message_extension(
            "flags",
            1000,
            ".google.protobuf.FileOptions",
            ".test.Flags",
        )],
    )]);
    let mut parsed = file_with_options(vec![option(
        vec![ext("test.flags", 0..12)],
        literal(vec![literal_field("flag", 16..20, ident("True", 22..26))], 14..28),
        0..29,
    )]);

    interpret_ok(&mut parsed, &linker);

    let flags = file_options(&parsed).get(1000).unwrap().as_message().unwrap();
    assert_eq!(flags.get(1), Some(&Value::Bool(true)));
}

#[test]
fn unknown_extension_lenient() {
    let mut parsed = file_with_options(vec![option(
        vec![ext("unknown.ext", 0..13)],
        int(1, 16..17),
        0..18,
    )]);

    let mut handler = CollectDiagnostics::default();
    interpret_options_lenient(&mut parsed, &DescriptorIndex::new(), &mut handler).unwrap();

    assert_eq!(
        handler.errors,
        vec![OptionError::NotFound {
            message: "unknown extension 'unknown.ext'".to_owned(),
            span: 0..13,
        }]
    );
    assert_eq!(file_options(&parsed).uninterpreted().len(), 1);
    assert_eq!(parsed.option_nodes(&[]).len(), 1);
}

#[test]
fn unlinked_retains_custom_options() {
    let mut parsed = file_with_options(vec![
        option(
            vec![plain("java_package", 0..12)],
            string("com.example", 15..28),
            0..29,
        ),
        option(vec![ext("test.ext", 30..40)], int(1, 43..44), 30..45),
    ]);

    let mut handler = CollectDiagnostics::default();
    interpret_unlinked_options(&mut parsed, &mut handler).unwrap();

    assert!(handler.errors.is_empty());
    assert_eq!(
        file_options(&parsed).get(1),
        Some(&Value::String("com.example".to_owned()))
    );
    assert_eq!(file_options(&parsed).uninterpreted().len(), 1);
}

#[test]
fn strict_unlinked_reports_custom_options() {
    let nodes = vec![option(vec![ext("test.ext", 0..10)], int(1, 13..14), 0..15)];

    let mut parsed = file_with_options(nodes.clone());
    let err = interpret_options_with(
        &mut parsed,
        None,
        &mut FailFast,
        InterpreterOptions::default(),
    )
    .unwrap_err();
    assert_eq!(
        err,
        OptionError::NotFound {
            message: "unknown extension 'test.ext'".to_owned(),
            span: 0..10,
        }
    );

    // A handler that swallows the error still sees it, and the option
    // does not linger in the uninterpreted list.
    let mut parsed = file_with_options(nodes);
    let mut handler = CollectDiagnostics::default();
    interpret_options_with(&mut parsed, None, &mut handler, InterpreterOptions::default())
        .unwrap();
    assert_eq!(
        handler.errors,
        vec![OptionError::NotFound {
            message: "unknown extension 'test.ext'".to_owned(),
            span: 0..10,
        }]
    );
    assert_eq!(parsed.file.options, None);
    assert!(parsed.option_nodes(&[]).is_empty());
}

#[test]
fn duplicate_option() {
    let mut parsed = file_with_options(vec![
        option(
            vec![plain("java_package", 0..12)],
            string("a", 15..18),
            0..19,
        ),
        option(
            vec![plain("java_package", 20..32)],
            string("b", 35..38),
            20..39,
        ),
    ]);

    assert_eq!(
        interpret_err(&mut parsed, &DescriptorIndex::new()),
        OptionError::Forbidden {
            message: "non-repeated option field \
                      'google.protobuf.FileOptions.java_package' has already been set"
                .to_owned(),
            span: 35..38,
        }
    );
}

#[test]
fn uninterpreted_option_is_reserved() {
    let mut parsed = file_with_options(vec![option(
        vec![plain("uninterpreted_option", 0..20)],
        int(1, 23..24),
        0..25,
    )]);

    assert_eq!(
        interpret_err(&mut parsed, &DescriptorIndex::new()),
        OptionError::Forbidden {
            message: "option 'uninterpreted_option' may not be set".to_owned(),
            span: 0..20,
        }
    );
}

#[test]
fn oneof_conflict() {
    let linker = DescriptorIndex::from_files([&dep_file(
        vec![types::DescriptorProto {
            name: Some("Choice".to_owned()),
            field: vec![
                types::FieldDescriptorProto {
                    oneof_index: Some(0),
                    ..field("a", 1, Type::Int32)
                },
                types::FieldDescriptorProto {
                    oneof_index: Some(0),
                    ..field("b", 2, Type::Int32)
                },
            ],
            oneof_decl: vec![types::OneofDescriptorProto {
                name: Some("kind".to_owned()),
                options: None,
            }],
            ..Default::default()
        }],
        vec![message_extension(
            "choice",
            1000,
            ".google.protobuf.FileOptions",
            ".test.Choice",
        )],
    )]);

    let mut parsed = file_with_options(vec![
        option(
            vec![ext("test.choice", 0..13), plain("a", 14..15)],
            int(1, 18..19),
            0..20,
        ),
        option(
            vec![ext("test.choice", 21..34), plain("b", 35..36)],
            int(2, 39..40),
            21..41,
        ),
    ]);

    assert_eq!(
        interpret_err(&mut parsed, &linker),
        OptionError::Forbidden {
            message: "fields 'a' and 'b' belong to the same oneof and may not both be set"
                .to_owned(),
            span: 39..40,
        }
    );
}

#[test]
fn array_literal_records_first_new_index() {
    let linker = DescriptorIndex::from_files([&dep_file(
        vec![],
        vec![types::FieldDescriptorProto {
            label: Some(Label::Repeated as i32),
            ..extension("list", 1000, Type::Int32, ".google.protobuf.FileOptions")
        }],
    )]);

    let mut parsed = file_with_options(vec![
        option(
            vec![ext("test.list", 0..11)],
            array(vec![int(1, 15..16), int(2, 18..19)], 14..20),
            0..21,
        ),
        option(
            vec![ext("test.list", 22..33)],
            array(vec![int(3, 37..38)], 36..39),
            22..40,
        ),
    ]);

    let indexes = interpret_ok(&mut parsed, &linker);

    assert_eq!(
        file_options(&parsed).get(1000),
        Some(&Value::List(vec![
            Value::Int32(1),
            Value::Int32(2),
            Value::Int32(3),
        ]))
    );

    let first = &indexes.source_info[&AstId::of(&(0..21))];
    assert_eq!(first.path, vec![1000, 0]);
    match &first.children {
        Children::Array(entries) => {
            assert_eq!(entries[0].path, vec![1000, 0]);
            assert_eq!(entries[1].path, vec![1000, 1]);
        }
        other => panic!("unexpected children: {:?}", other),
    }
    assert_eq!(indexes.source_info[&AstId::of(&(22..40))].path, vec![1000, 2]);
}

#[test]
fn array_literal_on_singular_field() {
    let mut parsed = file_with_options(vec![option(
        vec![plain("java_package", 0..12)],
        array(vec![string("a", 16..19)], 15..20),
        0..21,
    )]);

    assert_eq!(
        interpret_err(&mut parsed, &DescriptorIndex::new()),
        OptionError::Forbidden {
            message: "array literals may only be used for repeated fields, but \
                      'google.protobuf.FileOptions.java_package' is not repeated"
                .to_owned(),
            span: 15..20,
        }
    );
}

fn field_default_file(ty: Type, type_name: Option<&str>, value: ast::OptionValue) -> ParsedFile {
    let node = option(vec![plain("default", 0..7)], value, 0..20);
    let file = types::FileDescriptorProto {
        name: Some("test.proto".to_owned()),
        package: Some("test".to_owned()),
        syntax: Some("proto2".to_owned()),
        enum_type: vec![types::EnumDescriptorProto {
            name: Some("E".to_owned()),
            value: vec![enum_value("A", 0), enum_value("B", 1)],
            ..Default::default()
        }],
        message_type: vec![types::DescriptorProto {
            name: Some("Foo".to_owned()),
            field: vec![types::FieldDescriptorProto {
                type_name: type_name.map(ToOwned::to_owned),
                options: Some(options_with(std::slice::from_ref(&node))),
                ..field("f", 1, ty)
            }],
            ..Default::default()
        }],
        ..Default::default()
    };
    ParsedFile::new(file).with_option_nodes(vec![4, 0, 2, 0], vec![node])
}

#[test]
fn field_default_enum() {
    let mut parsed = field_default_file(Type::Enum, Some(".test.E"), ident("B", 10..11));

    let indexes = interpret_ok(&mut parsed, &DescriptorIndex::new());

    let foo = &parsed.file.message_type[0].field[0];
    assert_eq!(foo.default_value.as_deref(), Some("B"));
    assert_eq!(foo.options, None);
    assert_eq!(
        indexes.source_info[&AstId::of(&(0..20))].path,
        vec![PSEUDO_OPTION, tag::field::DEFAULT_VALUE]
    );
    assert!(indexes
        .references
        .enum_values
        .contains_key(&AstId::of(&(10..11))));
}

#[test]
fn field_default_unknown_enum_value() {
    let mut parsed = field_default_file(Type::Enum, Some(".test.E"), ident("C", 10..11));

    assert_eq!(
        interpret_err(&mut parsed, &DescriptorIndex::new()),
        OptionError::Value {
            message: "'C' is not a value of enum 'test.E'".to_owned(),
            span: 10..11,
        }
    );
}

#[test]
fn field_default_float_special() {
    let mut parsed = field_default_file(Type::Double, None, ident("inf", 10..13));

    interpret_ok(&mut parsed, &DescriptorIndex::new());

    let foo = &parsed.file.message_type[0].field[0];
    assert_eq!(foo.default_value.as_deref(), Some("inf"));
}

#[test]
fn field_default_bytes_escaped() {
    let mut parsed = field_default_file(
        Type::Bytes,
        None,
        ast::OptionValue::String(ast::Bytes {
            value: vec![b'a', 0x00, b'\n', b'"'],
            span: 10..18,
        }),
    );

    interpret_ok(&mut parsed, &DescriptorIndex::new());

    let foo = &parsed.file.message_type[0].field[0];
    assert_eq!(foo.default_value.as_deref(), Some("a\\000\\n\\\""));
}

#[test]
fn field_default_on_repeated() {
    let node = option(vec![plain("default", 0..7)], int(1, 10..11), 0..12);
    let file = types::FileDescriptorProto {
        name: Some("test.proto".to_owned()),
        syntax: Some("proto2".to_owned()),
        message_type: vec![types::DescriptorProto {
            name: Some("Foo".to_owned()),
            field: vec![types::FieldDescriptorProto {
                label: Some(Label::Repeated as i32),
                options: Some(options_with(std::slice::from_ref(&node))),
                ..field("f", 1, Type::Int32)
            }],
            ..Default::default()
        }],
        ..Default::default()
    };
    let mut parsed = ParsedFile::new(file).with_option_nodes(vec![4, 0, 2, 0], vec![node]);

    assert_eq!(
        interpret_err(&mut parsed, &DescriptorIndex::new()),
        OptionError::Forbidden {
            message: "repeated fields may not have a default value".to_owned(),
            span: 0..7,
        }
    );
}

#[test]
fn field_json_name() {
    let node = option(
        vec![plain("json_name", 0..9)],
        string("customName", 12..24),
        0..25,
    );
    let file = types::FileDescriptorProto {
        name: Some("test.proto".to_owned()),
        syntax: Some("proto2".to_owned()),
        message_type: vec![types::DescriptorProto {
            name: Some("Foo".to_owned()),
            field: vec![types::FieldDescriptorProto {
                options: Some(options_with(std::slice::from_ref(&node))),
                ..field("f", 1, Type::Int32)
            }],
            ..Default::default()
        }],
        ..Default::default()
    };
    let mut parsed = ParsedFile::new(file).with_option_nodes(vec![4, 0, 2, 0], vec![node]);

    let indexes = interpret_ok(&mut parsed, &DescriptorIndex::new());

    let foo = &parsed.file.message_type[0].field[0];
    assert_eq!(foo.json_name.as_deref(), Some("customName"));
    assert_eq!(
        indexes.source_info[&AstId::of(&(0..25))].path,
        vec![PSEUDO_OPTION, tag::field::JSON_NAME]
    );
}

#[test]
fn field_json_name_on_extension() {
    let node = option(
        vec![plain("json_name", 0..9)],
        string("customName", 12..24),
        0..25,
    );
    let file = types::FileDescriptorProto {
        name: Some("test.proto".to_owned()),
        syntax: Some("proto2".to_owned()),
        extension: vec![types::FieldDescriptorProto {
            extendee: Some(".test.Foo".to_owned()),
            options: Some(options_with(std::slice::from_ref(&node))),
            ..field("f", 100, Type::Int32)
        }],
        message_type: vec![types::DescriptorProto {
            name: Some("Foo".to_owned()),
            extension_range: vec![types::descriptor_proto::ExtensionRange {
                start: Some(100),
                end: Some(200),
                options: None,
            }],
            ..Default::default()
        }],
        ..Default::default()
    };
    let mut parsed = ParsedFile::new(file).with_option_nodes(vec![7, 0], vec![node]);

    assert_eq!(
        interpret_err(&mut parsed, &DescriptorIndex::new()),
        OptionError::Forbidden {
            message: "the json_name option may not be set on extension fields".to_owned(),
            span: 0..9,
        }
    );
}

#[test]
fn any_expansion() {
    let mut file = types::FileDescriptorProto {
        name: Some("test.proto".to_owned()),
        package: Some("pkg".to_owned()),
        syntax: Some("proto2".to_owned()),
        message_type: vec![types::DescriptorProto {
            name: Some("Bar".to_owned()),
            field: vec![field("x", 1, Type::Int32)],
            ..Default::default()
        }],
        extension: vec![message_extension(
            "foo",
            1000,
            ".google.protobuf.FileOptions",
            ".google.protobuf.Any",
        )],
        ..Default::default()
    };

    let node = option(
        vec![ext("pkg.foo", 0..9)],
        literal(
            vec![ast::MessageLiteralField {
                name: ast::LiteralFieldName::Any {
                    url_prefix: "type.googleapis.com".to_owned(),
                    type_name: "pkg.Bar".to_owned(),
                    span: 14..42,
                },
                separator: None,
                value: literal(
                    vec![literal_field("x", 45..46, int(5, 48..49))],
                    44..51,
                ),
                span: 14..51,
            }],
            12..53,
        ),
        0..54,
    );

    file.options = Some(options_with(std::slice::from_ref(&node)));
    let mut parsed = ParsedFile::new(file).with_option_nodes(vec![], vec![node]);

    let indexes = interpret_ok(&mut parsed, &DescriptorIndex::new());

    let any = file_options(&parsed).get(1000).unwrap().as_message().unwrap();
    assert_eq!(
        any.get(1),
        Some(&Value::String("type.googleapis.com/pkg.Bar".to_owned()))
    );
    assert_eq!(
        any.get(2),
        Some(&Value::Bytes(Bytes::from_static(&[0x08, 0x05])))
    );
    assert_eq!(
        indexes.references.any_messages[&AstId::of(&(14..42))].full_name(),
        "pkg.Bar"
    );
}

#[test]
fn any_expansion_bad_prefix() {
    let mut file = types::FileDescriptorProto {
        name: Some("test.proto".to_owned()),
        package: Some("pkg".to_owned()),
        syntax: Some("proto2".to_owned()),
        message_type: vec![types::DescriptorProto {
            name: Some("Bar".to_owned()),
            field: vec![field("x", 1, Type::Int32)],
            ..Default::default()
        }],
        extension: vec![message_extension(
            "foo",
            1000,
            ".google.protobuf.FileOptions",
            ".google.protobuf.Any",
        )],
        ..Default::default()
    };

    let node = option(
        vec![ext("pkg.foo", 0..9)],
        literal(
            vec![ast::MessageLiteralField {
                name: ast::LiteralFieldName::Any {
                    url_prefix: "example.com".to_owned(),
                    type_name: "pkg.Bar".to_owned(),
                    span: 14..34,
                },
                separator: None,
                value: literal(vec![], 36..38),
                span: 14..38,
            }],
            12..40,
        ),
        0..41,
    );

    file.options = Some(options_with(std::slice::from_ref(&node)));
    let mut parsed = ParsedFile::new(file).with_option_nodes(vec![], vec![node]);

    assert_eq!(
        interpret_err(&mut parsed, &DescriptorIndex::new()),
        OptionError::Value {
            message: "'example.com' is not a supported type URL prefix".to_owned(),
            span: 14..34,
        }
    );
}

#[test]
fn message_literal_missing_separator() {
    let linker = DescriptorIndex::from_files([&dep_file(
        vec![types::DescriptorProto {
            name: Some("Flags".to_owned()),
            field: vec![field("flag", 1, Type::Bool)],
            ..Default::default()
        }],
        vec![message_extension(
            "flags",
            1000,
            ".google.protobuf.FileOptions",
            ".test.Flags",
        )],
    )]);

    let mut parsed = file_with_options(vec![option(
        vec![ext("test.flags", 0..12)],
        ast::OptionValue::Message(ast::MessageLiteral {
            fields: vec![ast::MessageLiteralField {
                name: ast::LiteralFieldName::Ident(ast::Ident::new("flag", 16..20)),
                separator: None,
                value: ident("true", 21..25),
                span: 16..25,
            }],
            span: 14..27,
        }),
        0..28,
    )]);

    assert_eq!(
        interpret_err(&mut parsed, &linker),
        OptionError::Value {
            message: "expected ':' after field name 'flag'".to_owned(),
            span: 16..20,
        }
    );
}

#[test]
fn message_literal_group_name() {
    let linker = DescriptorIndex::from_files([&dep_file(
        vec![types::DescriptorProto {
            name: Some("Outer".to_owned()),
            field: vec![types::FieldDescriptorProto {
                type_name: Some(".test.Outer.MyGroup".to_owned()),
                ..field("mygroup", 1, Type::Group)
            }],
            nested_type: vec![types::DescriptorProto {
                name: Some("MyGroup".to_owned()),
                field: vec![field("x", 1, Type::Int32)],
                ..Default::default()
            }],
            ..Default::default()
        }],
        vec![message_extension(
            "outer",
            1000,
            ".google.protobuf.FileOptions",
            ".test.Outer",
        )],
    )]);

    let mut parsed = file_with_options(vec![option(
        vec![ext("test.outer", 0..12)],
        literal(
            vec![ast::MessageLiteralField {
                name: ast::LiteralFieldName::Ident(ast::Ident::new("MyGroup", 16..23)),
                separator: None,
                value: literal(vec![literal_field("x", 26..27, int(1, 29..30))], 25..32),
                span: 16..32,
            }],
            14..34,
        ),
        0..35,
    )]);

    interpret_ok(&mut parsed, &linker);

    let outer = file_options(&parsed).get(1000).unwrap().as_message().unwrap();
    match outer.get(1) {
        Some(Value::Group(group)) => assert_eq!(group.get(1), Some(&Value::Int32(1))),
        other => panic!("unexpected value: {:?}", other),
    }
}

#[test]
fn closed_enum_unknown_number() {
    // The defining file is proto2, so the enum is closed.
    let mut dep = dep_file(
        vec![types::DescriptorProto {
            name: Some("Holder".to_owned()),
            field: vec![types::FieldDescriptorProto {
                type_name: Some(".test.E".to_owned()),
                ..field("e", 1, Type::Enum)
            }],
            ..Default::default()
        }],
        vec![message_extension(
            "holder",
            1000,
            ".google.protobuf.FileOptions",
            ".test.Holder",
        )],
    );
    dep.enum_type = vec![types::EnumDescriptorProto {
        name: Some("E".to_owned()),
        value: vec![enum_value("A", 0)],
        ..Default::default()
    }];
    let linker = DescriptorIndex::from_files([&dep]);

    let mut parsed = file_with_options(vec![option(
        vec![ext("test.holder", 0..13)],
        literal(vec![literal_field("e", 17..18, int(5, 20..21))], 15..23),
        0..24,
    )]);

    assert_eq!(
        interpret_err(&mut parsed, &linker),
        OptionError::Value {
            message: "5 is not a value of closed enum 'test.E'".to_owned(),
            span: 20..21,
        }
    );
}

#[test]
fn open_enum_unknown_number() {
    let mut file = types::FileDescriptorProto {
        name: Some("dep.proto".to_owned()),
        package: Some("test".to_owned()),
        syntax: Some("proto3".to_owned()),
        ..Default::default()
    };
    file.enum_type = vec![types::EnumDescriptorProto {
        name: Some("E".to_owned()),
        value: vec![enum_value("A", 0)],
        ..Default::default()
    }];
    file.message_type = vec![types::DescriptorProto {
        name: Some("Holder".to_owned()),
        field: vec![types::FieldDescriptorProto {
            type_name: Some(".test.E".to_owned()),
            ..field("e", 1, Type::Enum)
        }],
        ..Default::default()
    }];
    file.extension = vec![message_extension(
        "holder",
        1000,
        ".google.protobuf.FileOptions",
        ".test.Holder",
    )];
    let linker = DescriptorIndex::from_files([&file]);

    let mut parsed = file_with_options(vec![option(
        vec![ext("test.holder", 0..13)],
        literal(vec![literal_field("e", 17..18, int(5, 20..21))], 15..23),
        0..24,
    )]);

    interpret_ok(&mut parsed, &linker);

    let holder = file_options(&parsed).get(1000).unwrap().as_message().unwrap();
    assert_eq!(holder.get(1), Some(&Value::Enum(5)));
}

#[test]
fn option_target_mismatch() {
    let mut targets = OptionSet::new();
    targets.set(
        tag::options::field::TARGETS,
        Value::List(vec![Value::Enum(OptionTarget::Message as i32)]),
    );
    let linker = DescriptorIndex::from_files([&dep_file(
        vec![],
        vec![types::FieldDescriptorProto {
            options: Some(targets),
            ..extension("msg_only", 1000, Type::Bool, ".google.protobuf.FileOptions")
        }],
    )]);

    let mut parsed = file_with_options(vec![option(
        vec![ext("test.msg_only", 0..15)],
        ident("true", 18..22),
        0..23,
    )]);

    assert_eq!(
        interpret_err(&mut parsed, &linker),
        OptionError::Forbidden {
            message: "option 'test.msg_only' may not be used on a file \
                      (allowed targets: message)"
                .to_owned(),
            span: 0..15,
        }
    );
}

#[test]
fn message_set_extension_rejected() {
    let mut set_options = OptionSet::new();
    set_options.set(
        tag::options::message::MESSAGE_SET_WIRE_FORMAT,
        Value::Bool(true),
    );
    let mut file = dep_file(
        vec![types::DescriptorProto {
            name: Some("Set".to_owned()),
            options: Some(set_options),
            extension_range: vec![types::descriptor_proto::ExtensionRange {
                start: Some(4),
                end: Some(2147483647),
                options: None,
            }],
            ..Default::default()
        }],
        vec![],
    );
    file.extension = vec![extension("entry", 10, Type::String, ".test.Set")];
    let linker = DescriptorIndex::from_files([&file]);

    let mut parsed = {
        let mut holder = dep_file(
            vec![],
            vec![message_extension(
                "set",
                1001,
                ".google.protobuf.FileOptions",
                ".test.Set",
            )],
        );
        holder.name = Some("test.proto".to_owned());
        let nodes = vec![option(
            vec![ext("test.set", 0..10), ext("test.entry", 11..23)],
            string("x", 26..29),
            0..30,
        )];
        holder.options = Some(options_with(&nodes));
        ParsedFile::new(holder).with_option_nodes(vec![], nodes)
    };

    assert_eq!(
        interpret_err(&mut parsed, &linker),
        OptionError::Forbidden {
            message: "'test.Set' uses message-set wire format, which is not supported"
                .to_owned(),
            span: 11..23,
        }
    );
}

#[test]
fn edition_gate() {
    let node = option(
        vec![plain("features", 0..8), plain("enforce_naming_style", 9..29)],
        ident("STYLE2024", 32..41),
        0..42,
    );
    let file = types::FileDescriptorProto {
        name: Some("test.proto".to_owned()),
        edition: Some(1000),
        options: Some(options_with(std::slice::from_ref(&node))),
        ..Default::default()
    };
    let mut parsed = ParsedFile::new(file).with_option_nodes(vec![], vec![node]);

    assert_eq!(
        interpret_err(&mut parsed, &DescriptorIndex::new()),
        OptionError::Forbidden {
            message: "'google.protobuf.FeatureSet.enforce_naming_style' was not introduced \
                      until edition 2024"
                .to_owned(),
            span: 0..42,
        }
    );
}

#[test]
fn feature_deprecation_warns() {
    let mut support = OptionSet::new();
    support.set(
        tag::options::feature_support::EDITION_INTRODUCED,
        Value::Enum(1000),
    );
    support.set(
        tag::options::feature_support::EDITION_DEPRECATED,
        Value::Enum(1000),
    );
    support.set(
        tag::options::feature_support::DEPRECATION_WARNING,
        Value::String("use something else".to_owned()),
    );
    let mut options = OptionSet::new();
    options.set(
        tag::options::field::FEATURE_SUPPORT,
        Value::Message(support),
    );

    let mut dep = dep_file(
        vec![],
        vec![types::FieldDescriptorProto {
            options: Some(options),
            ..extension("old_feat", 1000, Type::Bool, ".google.protobuf.FeatureSet")
        }],
    );
    dep.edition = Some(1000);
    dep.syntax = None;
    let linker = DescriptorIndex::from_files([&dep]);

    let node = option(
        vec![plain("features", 0..8), ext("test.old_feat", 9..24)],
        ident("true", 27..31),
        0..32,
    );
    let file = types::FileDescriptorProto {
        name: Some("test.proto".to_owned()),
        edition: Some(1000),
        options: Some(options_with(std::slice::from_ref(&node))),
        ..Default::default()
    };
    let mut parsed = ParsedFile::new(file).with_option_nodes(vec![], vec![node]);

    let mut handler = CollectDiagnostics::default();
    interpret_options(&mut parsed, &linker, &mut handler).unwrap();

    assert!(handler.errors.is_empty());
    assert_eq!(
        handler.warnings,
        vec![crate::error::OptionWarning {
            message: "'test.old_feat' is deprecated as of edition 2023: use something else"
                .to_owned(),
            span: 0..32,
        }]
    );
}

#[test]
fn feature_self_use() {
    let node = option(
        vec![plain("features", 0..8), ext("test.my_feat", 9..23)],
        ident("true", 26..30),
        0..31,
    );
    let file = types::FileDescriptorProto {
        name: Some("test.proto".to_owned()),
        package: Some("test".to_owned()),
        edition: Some(1000),
        extension: vec![extension(
            "my_feat",
            1000,
            Type::Bool,
            ".google.protobuf.FeatureSet",
        )],
        options: Some(options_with(std::slice::from_ref(&node))),
        ..Default::default()
    };
    let mut parsed = ParsedFile::new(file).with_option_nodes(vec![], vec![node]);

    assert_eq!(
        interpret_err(&mut parsed, &DescriptorIndex::new()),
        OptionError::Forbidden {
            message: "feature 'test.my_feat' may not be used in the same file in which it \
                      is defined"
                .to_owned(),
            span: 0..31,
        }
    );
}

#[test]
fn required_fields_checked() {
    let linker = DescriptorIndex::from_files([&dep_file(
        vec![types::DescriptorProto {
            name: Some("Req".to_owned()),
            field: vec![
                types::FieldDescriptorProto {
                    label: Some(Label::Required as i32),
                    ..field("mand", 1, Type::Int32)
                },
                field("opt", 2, Type::Int32),
            ],
            ..Default::default()
        }],
        vec![message_extension(
            "req",
            1000,
            ".google.protobuf.FileOptions",
            ".test.Req",
        )],
    )]);

    let mut parsed = file_with_options(vec![option(
        vec![ext("test.req", 0..10), plain("opt", 11..14)],
        int(1, 17..18),
        0..19,
    )]);

    assert_eq!(
        interpret_err(&mut parsed, &linker),
        OptionError::Value {
            message: "required option field(s) 'test.Req.mand' are not set".to_owned(),
            span: 0..19,
        }
    );
}

#[test]
fn map_field_feature_propagation() {
    let mut features = OptionSet::new();
    features.set(
        tag::options::feature_set::ENUM_TYPE,
        Value::Enum(2),
    );
    let mut field_options = OptionSet::new();
    field_options.set(
        tag::options::features::FIELD,
        Value::Message(features.clone()),
    );
    let mut entry_options = OptionSet::new();
    entry_options.set(tag::options::message::MAP_ENTRY, Value::Bool(true));

    let file = types::FileDescriptorProto {
        name: Some("test.proto".to_owned()),
        package: Some("test".to_owned()),
        edition: Some(1000),
        message_type: vec![types::DescriptorProto {
            name: Some("M".to_owned()),
            field: vec![types::FieldDescriptorProto {
                label: Some(Label::Repeated as i32),
                type_name: Some(".test.M.CountsEntry".to_owned()),
                options: Some(field_options),
                ..field("counts", 1, Type::Message)
            }],
            nested_type: vec![types::DescriptorProto {
                name: Some("CountsEntry".to_owned()),
                field: vec![field("key", 1, Type::String), field("value", 2, Type::Int32)],
                options: Some(entry_options),
                ..Default::default()
            }],
            ..Default::default()
        }],
        ..Default::default()
    };
    let mut parsed = ParsedFile::new(file);

    interpret_ok(&mut parsed, &DescriptorIndex::new());

    let entry = &parsed.file.message_type[0].nested_type[0];
    for entry_field in &entry.field {
        let merged = entry_field
            .options
            .as_ref()
            .and_then(|set| set.get(tag::options::features::FIELD))
            .and_then(Value::as_message)
            .unwrap();
        assert_eq!(merged, &features);
    }
}

#[test]
fn map_field_option_from_literal() {
    let mut entry_options = OptionSet::new();
    entry_options.set(tag::options::message::MAP_ENTRY, Value::Bool(true));
    let linker = DescriptorIndex::from_files([&dep_file(
        vec![types::DescriptorProto {
            name: Some("Holder".to_owned()),
            field: vec![types::FieldDescriptorProto {
                label: Some(Label::Repeated as i32),
                type_name: Some(".test.Holder.CountsEntry".to_owned()),
                ..field("counts", 1, Type::Message)
            }],
            nested_type: vec![types::DescriptorProto {
                name: Some("CountsEntry".to_owned()),
                field: vec![field("key", 1, Type::String), field("value", 2, Type::Int32)],
                options: Some(entry_options),
                ..Default::default()
            }],
            ..Default::default()
        }],
        vec![message_extension(
            "holder",
            1000,
            ".google.protobuf.FileOptions",
            ".test.Holder",
        )],
    )]);

    let mut parsed = file_with_options(vec![option(
        vec![ext("test.holder", 0..13)],
        literal(
            vec![ast::MessageLiteralField {
                name: ast::LiteralFieldName::Ident(ast::Ident::new("counts", 17..23)),
                separator: Some(23..24),
                value: array(
                    vec![
                        literal(
                            vec![
                                literal_field("key", 27..30, string("a", 32..35)),
                                literal_field("value", 36..41, int(1, 43..44)),
                            ],
                            26..46,
                        ),
                        literal(
                            vec![
                                literal_field("key", 48..51, string("b", 53..56)),
                                literal_field("value", 57..62, int(2, 64..65)),
                            ],
                            47..67,
                        ),
                    ],
                    25..68,
                ),
                span: 17..68,
            }],
            15..70,
        ),
        0..71,
    )]);

    let indexes = interpret_ok(&mut parsed, &linker);

    let holder = file_options(&parsed).get(1000).unwrap().as_message().unwrap();
    let entries = match holder.get(1) {
        Some(Value::List(entries)) => entries,
        other => panic!("unexpected value: {:?}", other),
    };
    assert_eq!(entries.len(), 2);
    let first = entries[0].as_message().unwrap();
    assert_eq!(first.get(1), Some(&Value::String("a".to_owned())));
    assert_eq!(first.get(2), Some(&Value::Int32(1)));
    let second = entries[1].as_message().unwrap();
    assert_eq!(second.get(1), Some(&Value::String("b".to_owned())));
    assert_eq!(second.get(2), Some(&Value::Int32(2)));

    let info = &indexes.source_info[&AstId::of(&(0..71))];
    assert_eq!(info.path, vec![1000]);
    match &info.children {
        Children::Message(fields) => {
            let counts = &fields[&AstId::of(&(17..23))];
            assert_eq!(counts.path, vec![1000, 1, 0]);
            match &counts.children {
                Children::Array(items) => {
                    assert_eq!(items[0].path, vec![1000, 1, 0]);
                    assert_eq!(items[1].path, vec![1000, 1, 1]);
                }
                other => panic!("unexpected children: {:?}", other),
            }
        }
        other => panic!("unexpected children: {:?}", other),
    }
}

#[test]
fn override_descriptor_resolves_options_type() {
    let override_file = types::FileDescriptorProto {
        name: Some("google/protobuf/descriptor.proto".to_owned()),
        package: Some("google.protobuf".to_owned()),
        syntax: Some("proto2".to_owned()),
        message_type: vec![types::DescriptorProto {
            name: Some("FileOptions".to_owned()),
            field: vec![
                field("java_package", 1, Type::String),
                field("experimental_name", 60, Type::String),
            ],
            ..Default::default()
        }],
        ..Default::default()
    };

    let nodes = vec![option(
        vec![plain("experimental_name", 0..17)],
        string("x", 20..23),
        0..24,
    )];

    // The compiled-in descriptors don't know the field.
    let mut parsed = file_with_options(nodes.clone());
    assert_eq!(
        interpret_err(&mut parsed, &DescriptorIndex::new()),
        OptionError::NotFound {
            message: "'experimental_name' is not a field of 'google.protobuf.FileOptions'"
                .to_owned(),
            span: 0..17,
        }
    );

    let linker = DescriptorIndex::new();
    let mut parsed = file_with_options(nodes);
    interpret_options_with(
        &mut parsed,
        Some(&linker),
        &mut FailFast,
        InterpreterOptions {
            override_descriptor: Some(override_file),
            ..Default::default()
        },
    )
    .unwrap();

    assert_eq!(
        file_options(&parsed).get(60),
        Some(&Value::String("x".to_owned()))
    );
    assert!(file_options(&parsed).uninterpreted().is_empty());
}

#[test]
fn interpretation_is_idempotent() {
    let mut parsed = file_with_options(vec![option(
        vec![plain("java_package", 0..12)],
        string("com.example", 15..28),
        0..29,
    )]);

    interpret_ok(&mut parsed, &DescriptorIndex::new());
    let first = parsed.file.clone();

    let indexes = interpret_ok(&mut parsed, &DescriptorIndex::new());
    assert_eq!(parsed.file, first);
    assert!(indexes.source_info.is_empty());
}
