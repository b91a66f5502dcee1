//! Merging messages, and the equivalence with decoding concatenated input.

mod common;

use protodyn::{MapKey, MessageBuilder, MessageValue, Value};

fn foo(pool: &std::sync::Arc<protodyn::DescriptorPool>, val: &str) -> Value {
    let foo = common::message(pool, "test.Foo");
    Value::Message(MessageValue::new(foo).with("val", val).unwrap())
}

#[test]
fn test_merge_matches_concatenation() {
    let pool = common::pool();
    let all = common::message(&pool, "test.TestAllTypes");

    let mut first = MessageBuilder::new(all.clone());
    first
        .set("optional_int32", 1)
        .unwrap()
        .set("optional_string", "first")
        .unwrap()
        .set("repeated_int32", vec![1, 2])
        .unwrap()
        .set("optional_foreign_message", foo(&pool, "a"))
        .unwrap()
        .insert("map_string_string", "shared", Value::from("first"))
        .unwrap()
        .insert("map_string_string", "mine", Value::from("first"))
        .unwrap();
    let first = first.build();

    let mut second = MessageBuilder::new(all.clone());
    second
        .set("optional_int32", 2)
        .unwrap()
        .set("repeated_int32", vec![3])
        .unwrap()
        .insert("map_string_string", "shared", Value::from("second"))
        .unwrap();
    let second = second.build();

    let merged = first.merge(&second);
    assert_eq!(merged.get("optional_int32"), Some(&Value::I32(2)));
    assert_eq!(merged.get("optional_string"), Some(&Value::from("first")));
    assert_eq!(merged.get("repeated_int32"), Some(&Value::from(vec![1, 2, 3])));
    let map = merged.get("map_string_string").and_then(Value::as_map).unwrap();
    assert_eq!(map.get(&MapKey::from("shared")), Some(Some(&Value::from("second"))));
    assert_eq!(map.get(&MapKey::from("mine")), Some(Some(&Value::from("first"))));

    let mut bytes = first.encode_to_vec();
    bytes.extend(second.encode_to_vec());
    assert_eq!(all.decode(bytes).unwrap(), merged);
}

#[test]
fn test_nested_messages_merge() {
    let pool = common::pool();
    let all = common::message(&pool, "test.TestAllTypes");

    let first = MessageValue::new(all.clone())
        .with("optional_foreign_message", foo(&pool, "a"))
        .unwrap();
    let empty_foo = Value::Message(MessageValue::new(common::message(&pool, "test.Foo")));
    let second = MessageValue::new(all.clone())
        .with("optional_foreign_message", empty_foo)
        .unwrap();

    // An empty submessage does not clear the fields already set.
    let merged = first.merge(&second);
    assert_eq!(merged, first);
}

#[test]
fn test_oneof_merge() {
    let pool = common::pool();
    let all = common::message(&pool, "test.TestAllTypes");

    let first = MessageValue::new(all.clone()).with("oneof_uint32", 5u32).unwrap();
    let second = MessageValue::new(all.clone())
        .with("oneof_foreign_message", foo(&pool, "b"))
        .unwrap();
    let third = MessageValue::new(all.clone())
        .with("oneof_foreign_message", foo(&pool, "c"))
        .unwrap();

    let merged = first.merge(&second);
    assert_eq!(merged.which_oneof("oneof_field").unwrap().name(), "oneof_foreign_message");
    assert!(!merged.has("oneof_uint32"));

    let merged = merged.merge(&third);
    assert_eq!(merged.get("oneof_foreign_message"), Some(&foo(&pool, "c")));
}

#[test]
fn test_merge_mismatched_types_is_ignored() {
    let pool = common::pool();
    let person = common::message(&pool, "test.Person");
    let foo = common::message(&pool, "test.Foo");

    let a = MessageValue::new(person).with("name", "a").unwrap();
    let b = MessageValue::new(foo).with("val", "b").unwrap();
    assert_eq!(a.merge(&b), a);
}

#[test]
fn test_proto2_defaults_survive_merge() {
    let pool = common::pool();
    let legacy = common::message(&pool, "test.Legacy");

    let a = MessageValue::new(legacy.clone()).with("id", 1).unwrap();
    let b = MessageValue::new(legacy.clone()).with("counts", vec![4]).unwrap();
    let merged = a.merge(&b);
    assert_eq!(merged.get("id"), Some(&Value::I32(1)));
    assert!(!merged.has("label"));
    assert_eq!(
        merged.get_field_or_default(legacy.field_by_name("label").unwrap()).as_ref(),
        &Value::from("none")
    );
}
