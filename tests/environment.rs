use std::fs;

use mwscript_compiler::parser::load_environment;
use mwscript_compiler::processor::Context;
use mwscript_compiler::processor::value_type::ValueType;

fn fixture() -> String {
    fs::read_to_string("tests/data/environment.json").unwrap()
}

#[test]
fn loads_environment_fixture() {
    let env = load_environment(&fixture()).expect("valid json");

    assert!(env.can_declare_locals());
    assert!(env.is_id("fargoth"));
    assert!(env.is_id("caius_cosades"));
    assert!(!env.is_id("Fargoth"));

    let test_cases = vec![
        ("gamehour", Some(ValueType::Float)),
        ("dayspassed", Some(ValueType::Long)),
        ("pcrace", Some(ValueType::Short)),
        ("GameHour", None),
        ("missing", None),
    ];
    for (name, expected) in test_cases {
        assert_eq!(env.global_type(name), expected, "{name}");
    }

    let test_cases = vec![
        ("ringstate", "fargoth", Some((ValueType::Long, true))),
        ("stage", "mainquest", Some((ValueType::Short, false))),
        ("timer", "mainquest", Some((ValueType::Float, false))),
        ("stage", "fargoth", None),
        ("ringstate", "nobody", None),
    ];
    for (member, id, expected) in test_cases {
        assert_eq!(env.member_type(member, id), expected, "{id}.{member}");
    }
}

#[test]
fn registers_extensions() {
    let env = load_environment(&fixture()).unwrap();
    let extensions = env.extensions().unwrap();

    let disposition = extensions.search_keyword("getdisposition").unwrap();
    let function = extensions.function(disposition).unwrap();
    assert_eq!(function.return_type, Some(ValueType::Long));
    assert_eq!(function.code, 0x20001a6);
    assert_eq!(function.code_explicit, Some(0x20001a7));

    let pos = extensions.search_keyword("getpos").unwrap();
    assert_eq!(extensions.function(pos).unwrap().code, 0x2000190);

    let topic = extensions.search_keyword("addtopic").unwrap();
    let instruction = extensions.instruction(topic).unwrap();
    assert_eq!(instruction.arguments, "S");
    assert!(!instruction.has_explicit());

    assert!(extensions.search_keyword("AddItem").is_none());
    assert!(extensions.search_keyword("additem").is_some());
}

#[test]
fn empty_environment_uses_defaults() {
    let env = load_environment("{}").unwrap();
    assert!(env.can_declare_locals());
    assert!(env.ids.is_empty());
    assert!(env.globals.is_empty());

    let env = load_environment(r#"{ "can_declare_locals": false }"#).unwrap();
    assert!(!env.can_declare_locals());
}

#[test]
fn rejects_bad_environments() {
    let test_cases = vec![
        // not json
        "globals: none",
        // unknown type name
        r#"{ "globals": { "x": "double" } }"#,
        // unparsable opcode
        r#"{ "instructions": [ { "keyword": "x", "opcode": "0xzz" } ] }"#,
        // segment 5 opcode out of range
        r#"{ "instructions": [ { "keyword": "x", "opcode": 5 } ] }"#,
        // short is not a valid return type
        r#"{ "functions": [ { "keyword": "x", "returns": "short", "opcode": "0x2000000" } ] }"#,
        // duplicate keyword
        r#"{ "instructions": [
            { "keyword": "x", "opcode": "0x2000000" },
            { "keyword": "X", "opcode": "0x2000001" }
        ] }"#,
    ];

    for json in test_cases {
        assert!(load_environment(json).is_err(), "{json}");
    }
}
