use metagen::extract::parse_source;
use metagen::render::{method_name, render_file};
use metagen::{MetagenError, SynthesisKind, Warning, synthesize};

const MODELS: &str = r#"
use chrono::NaiveDate;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, MetaTags)]
pub struct Person {
    #[meta("stringer;getter")]
    pub name: String,
    #[meta("stringer;new")]
    pub age: u32,
}

#[derive(Debug, Clone, Default, MetaTags)]
pub struct Foo {
    #[meta("getter;setter;new")]
    name: String,
    #[meta("getter;new;stringer")]
    Desc: String,
    #[meta("ptr;filter;find;map:i64;sort,stringer")]
    labels: Vec<String>,
    #[meta("filter,omitfield;map:NaiveDate,omitfield;equal,deepcompare")]
    dates: Vec<NaiveDate>,
    #[meta("getter;equal")]
    lookup: HashMap<String, u32>,
    #[meta("getter;fancy")]
    size: i32,
}

pub struct Bar {
    #[meta("getter")]
    name: String,
}
"#;

#[test]
fn person_gets_one_two_part_display() {
    let unit = parse_source(MODELS, "models.rs").unwrap();
    let synthesis = synthesize(&unit).unwrap();

    let person: Vec<_> = synthesis
        .registry
        .methods()
        .iter()
        .filter(|m| m.type_name == "Person")
        .collect();
    let strings: Vec<_> = person
        .iter()
        .filter_map(|m| match &m.kind {
            SynthesisKind::Stringer(parts) => Some(parts),
            _ => None,
        })
        .collect();

    assert_eq!(strings.len(), 1);
    assert_eq!(strings[0].args, vec!["name", "age"]);
    assert_eq!(strings[0].format_string(), "name: {}, age: {}");
}

#[test]
fn methods_keep_resolution_order() {
    let unit = parse_source(MODELS, "models.rs").unwrap();
    let synthesis = synthesize(&unit).unwrap();

    let foo: Vec<_> = synthesis
        .registry
        .methods()
        .iter()
        .filter(|m| m.type_name == "Foo")
        .map(|m| m.name.as_str())
        .collect();
    assert_eq!(
        foo,
        vec![
            "Name",
            "SetName",
            "NewFoo",
            "GetDesc",
            "String",
            "FilterLabels",
            "FindLabel",
            "MapLabelsToI64",
            "Len",
            "Swap",
            "Less",
            "Sort",
            "Filter",
            "MapToNaiveDate",
            "Equal",
            "Lookup",
            "Size",
        ]
    );

    let bar: Vec<_> = synthesis
        .registry
        .methods()
        .iter()
        .filter(|m| m.type_name == "Bar")
        .map(method_name)
        .collect();
    assert_eq!(bar, vec!["name"]);
}

#[test]
fn ptr_applies_to_the_rest_of_the_type_only() {
    let unit = parse_source(MODELS, "models.rs").unwrap();
    let synthesis = synthesize(&unit).unwrap();
    let receiver = |type_name: &str, method: &str| {
        synthesis
            .registry
            .methods()
            .iter()
            .find(|m| m.type_name == type_name && m.name == method)
            .map(|m| m.receiver_type.to_string())
            .unwrap()
    };

    assert_eq!(receiver("Foo", "Name"), "Foo");
    assert_eq!(receiver("Foo", "FilterLabels"), "*Foo");
    assert_eq!(receiver("Foo", "Size"), "*Foo");
    assert_eq!(receiver("Foo", "Equal"), "*Foo");
    assert_eq!(receiver("Foo", "NewFoo"), "Foo");
    assert_eq!(receiver("Bar", "Name"), "Bar");
}

#[test]
fn unknown_directive_is_reported_and_skipped() {
    let unit = parse_source(MODELS, "models.rs").unwrap();
    let synthesis = synthesize(&unit).unwrap();
    assert_eq!(
        synthesis.warnings,
        vec![Warning::UnknownDirective {
            type_name: "Foo".to_string(),
            field: "size".to_string(),
            directive: "fancy".to_string(),
        }]
    );
}

#[test]
fn constructor_and_equal_accumulate_across_fields() {
    let unit = parse_source(MODELS, "models.rs").unwrap();
    let synthesis = synthesize(&unit).unwrap();
    let kind = |name: &str| {
        synthesis
            .registry
            .methods()
            .iter()
            .find(|m| m.type_name == "Foo" && m.name == name)
            .map(|m| m.kind.clone())
            .unwrap()
    };

    match kind("NewFoo") {
        SynthesisKind::Constructor(parts) => {
            assert_eq!(parts.parameter_list(), "name: String, desc: String");
            assert!(parts.fill_default);
        }
        other => panic!("unexpected kind {other:?}"),
    }

    match kind("Equal") {
        SynthesisKind::Equal(parts) => {
            let fields: Vec<_> = parts.comparisons.iter().map(|c| (c.field.as_str(), c.deep)).collect();
            assert_eq!(fields, vec![("dates", true), ("lookup", false)]);
        }
        other => panic!("unexpected kind {other:?}"),
    }
}

#[test]
fn rendered_file_is_valid_rust_with_imports() {
    let unit = parse_source(MODELS, "models.rs").unwrap();
    let synthesis = synthesize(&unit).unwrap();
    let imports: Vec<_> = synthesis.registry.imports().collect();
    assert_eq!(
        imports,
        vec!["chrono::NaiveDate", "std::any::Any", "std::collections::HashMap", "std::fmt"]
    );

    let code = render_file(&synthesis.registry, "generated").unwrap();
    let parsed = syn::parse_file(&code).unwrap();
    assert!(parsed.items.len() > 5);
    assert!(code.contains("impl fmt::Display for Person"));
    assert!(code.contains("impl fmt::Display for Foo"));
    assert!(code.contains("pub fn map_to_naive_date("));
    assert!(code.contains("pub fn get_desc(&self) -> &String"));
    assert!(code.contains("pub fn find_label(&mut self, s: &String) -> Option<usize>"));
    assert!(code.contains("sort_by_cached_key"));
}

#[test]
fn second_sort_on_a_type_is_a_duplicate() {
    let source = r#"
        struct Twice {
            #[meta("sort")]
            a: Vec<u8>,
            #[meta("sort")]
            b: Vec<u8>,
        }
    "#;
    let unit = parse_source(source, "twice.rs").unwrap();
    let err = synthesize(&unit).unwrap_err();
    assert!(matches!(err, MetagenError::DuplicateMethod { ref method, .. } if method == "Len"));
}
