//! Schemas shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use protodyn::wkt;
use protodyn::{DescriptorPool, FieldDef, Kind, MessageDef, MessageDescriptor, Scalar};

/// Builds the test schema:
///
/// ```proto
/// message Foo { string val = 1; }
/// message Bar { repeated Foo foos = 1; }
/// message FooMap { map<string, Foo> map = 1; }
/// message MapEntry { string key = 1; Foo value = 2; }
/// message FooMapEntries { repeated MapEntry map = 1; }
/// message Person { string name = 1; int32 age = 2; }
/// message PersonV2 { ...Person; optional string email = 3; int64 score = 4; repeated string tags = 5; }
/// message TestAllTypes { ... }
/// ```
pub fn pool() -> Arc<DescriptorPool> {
    let mut builder = DescriptorPool::builder();
    let wkt = wkt::register(&mut builder).unwrap();

    let foo = builder.declare_message("test.Foo").unwrap();
    let bar = builder.declare_message("test.Bar").unwrap();
    let foo_map = builder.declare_message("test.FooMap").unwrap();
    let map_entry = builder.declare_message("test.MapEntry").unwrap();
    let foo_map_entries = builder.declare_message("test.FooMapEntries").unwrap();
    let person = builder.declare_message("test.Person").unwrap();
    let person_v2 = builder.declare_message("test.PersonV2").unwrap();
    let all = builder.declare_message("test.TestAllTypes").unwrap();
    let legacy = builder.declare_message("test.Legacy").unwrap();
    let foreign_enum = builder
        .declare_enum(
            "test.ForeignEnum",
            [("FOREIGN_FOO", 0), ("FOREIGN_BAR", 1), ("FOREIGN_BAZ", 2)],
        )
        .unwrap();

    builder
        .define_message(foo, MessageDef::proto3().field(FieldDef::scalar("val", 1, Scalar::String)))
        .unwrap();
    builder
        .define_message(bar, MessageDef::proto3().field(FieldDef::message("foos", 1, foo).repeated()))
        .unwrap();
    builder
        .define_message(
            foo_map,
            MessageDef::proto3().field(FieldDef::map("map", 1, Scalar::String, Kind::Message(foo))),
        )
        .unwrap();
    builder
        .define_message(
            map_entry,
            MessageDef::proto3()
                .field(FieldDef::scalar("key", 1, Scalar::String))
                .field(FieldDef::message("value", 2, foo)),
        )
        .unwrap();
    builder
        .define_message(
            foo_map_entries,
            MessageDef::proto3().field(FieldDef::message("map", 1, map_entry).repeated()),
        )
        .unwrap();
    builder
        .define_message(
            person,
            MessageDef::proto3()
                .field(FieldDef::scalar("name", 1, Scalar::String))
                .field(FieldDef::scalar("age", 2, Scalar::Int32)),
        )
        .unwrap();
    builder
        .define_message(
            person_v2,
            MessageDef::proto3().fields([
                FieldDef::scalar("name", 1, Scalar::String),
                FieldDef::scalar("age", 2, Scalar::Int32),
                FieldDef::scalar("email", 3, Scalar::String).optional(),
                FieldDef::scalar("score", 4, Scalar::Int64),
                FieldDef::scalar("tags", 5, Scalar::String).repeated(),
            ]),
        )
        .unwrap();
    builder
        .define_message(
            all,
            MessageDef::proto3().fields([
                FieldDef::scalar("optional_int32", 1, Scalar::Int32),
                FieldDef::scalar("optional_int64", 2, Scalar::Int64),
                FieldDef::scalar("optional_uint32", 3, Scalar::Uint32),
                FieldDef::scalar("optional_uint64", 4, Scalar::Uint64),
                FieldDef::scalar("optional_sint32", 5, Scalar::Sint32),
                FieldDef::scalar("optional_sint64", 6, Scalar::Sint64),
                FieldDef::scalar("optional_fixed32", 7, Scalar::Fixed32),
                FieldDef::scalar("optional_fixed64", 8, Scalar::Fixed64),
                FieldDef::scalar("optional_sfixed32", 9, Scalar::Sfixed32),
                FieldDef::scalar("optional_sfixed64", 10, Scalar::Sfixed64),
                FieldDef::scalar("optional_float", 11, Scalar::Float),
                FieldDef::scalar("optional_double", 12, Scalar::Double),
                FieldDef::scalar("optional_bool", 13, Scalar::Bool),
                FieldDef::scalar("optional_string", 14, Scalar::String),
                FieldDef::scalar("optional_bytes", 15, Scalar::Bytes),
                FieldDef::message("optional_foreign_message", 19, foo),
                FieldDef::enumeration("optional_foreign_enum", 22, foreign_enum),
                FieldDef::scalar("repeated_int32", 31, Scalar::Int32).repeated(),
                FieldDef::scalar("repeated_string", 44, Scalar::String).repeated(),
                FieldDef::message("repeated_foreign_message", 49, foo).repeated(),
                FieldDef::enumeration("repeated_foreign_enum", 52, foreign_enum).repeated(),
                FieldDef::map("map_int32_int32", 56, Scalar::Int32, Kind::Scalar(Scalar::Int32)),
                FieldDef::map("map_string_string", 69, Scalar::String, Kind::Scalar(Scalar::String)),
                FieldDef::map("map_string_foreign_message", 72, Scalar::String, Kind::Message(foo)),
                FieldDef::map("map_string_foreign_enum", 74, Scalar::String, Kind::Enum(foreign_enum)),
                FieldDef::scalar("unpacked_int32", 89, Scalar::Int32).repeated().packed(false),
                FieldDef::scalar("oneof_uint32", 111, Scalar::Uint32).oneof("oneof_field"),
                FieldDef::message("oneof_foreign_message", 112, foo).oneof("oneof_field"),
                FieldDef::scalar("oneof_string", 113, Scalar::String).oneof("oneof_field"),
                FieldDef::wrapper("optional_bool_wrapper", 201, Scalar::Bool),
                FieldDef::wrapper("optional_int64_wrapper", 203, Scalar::Int64),
                FieldDef::wrapper("optional_string_wrapper", 209, Scalar::String),
                FieldDef::message("optional_duration", 301, wkt.duration),
                FieldDef::message("optional_timestamp", 302, wkt.timestamp),
                FieldDef::message("optional_field_mask", 303, wkt.field_mask),
                FieldDef::message("optional_struct", 304, wkt.struct_type),
                FieldDef::message("optional_value", 306, wkt.value),
                FieldDef::scalar("field_name1", 401, Scalar::Int32),
                FieldDef::scalar("field__name2", 402, Scalar::Int32),
            ]),
        )
        .unwrap();
    builder
        .define_message(
            legacy,
            MessageDef::proto2().fields([
                FieldDef::scalar("id", 1, Scalar::Int32).required(),
                FieldDef::scalar("label", 2, Scalar::String).default_value("none"),
                FieldDef::scalar("counts", 3, Scalar::Int32).repeated(),
            ]),
        )
        .unwrap();
    builder
        .define_extension(legacy, "test.legacy_note", FieldDef::scalar("legacy_note", 100, Scalar::String))
        .unwrap();

    builder.build().unwrap()
}

pub fn message(pool: &Arc<DescriptorPool>, name: &str) -> MessageDescriptor {
    pool.get_message_by_name(name).unwrap()
}
