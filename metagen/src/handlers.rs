//! One handler per directive.
//!
//! Handlers read the target context and either append a new [`MethodSpec`] or
//! contribute to a shared one through [`MethodRegistry::upsert`]. Only `ptr`
//! produces a different context.
//!
//! [`MethodRegistry::upsert`]: crate::registry::MethodRegistry::upsert

use log::{debug, info};

use crate::directive::Directive;
use crate::engine::Session;
use crate::errors::{MetagenError, Result, Warning};
use crate::naming::{arg_name, lower_first, receiver_name, simple_type_name, type_title, upper_first};
use crate::registry::{
    Comparison, ComparisonParts, ConstructorParts, FormatParts, MergeKey, MethodSpec, SynthesisKind,
};
use crate::types::{FieldShape, ReceiverType, TargetContext, TypeDescriptor};

/// Run one directive against `ctx`, returning the context later directives see.
pub fn apply(directive: &Directive, ctx: TargetContext, session: &mut Session<'_>) -> Result<TargetContext> {
    match directive {
        Directive::Ptr => return Ok(ptr(ctx)),
        Directive::Getter => getter(&ctx, session)?,
        Directive::Setter => setter(&ctx, session)?,
        Directive::Find => find(&ctx, session)?,
        Directive::Filter { omit_field } => filter(&ctx, *omit_field, session)?,
        Directive::Map { target, omit_field } => map(&ctx, target, *omit_field, session)?,
        Directive::Sort { by_display } => sort(&ctx, *by_display, session)?,
        Directive::Stringer => stringer(&ctx, session)?,
        Directive::New => constructor(&ctx, session)?,
        Directive::Equal { deep } => equal(&ctx, *deep, session)?,
    }
    Ok(ctx)
}

fn ptr(ctx: TargetContext) -> TargetContext {
    let ctx = ctx.with_pointer_receiver();
    info!("Receiver of {} is now {}", ctx.type_name, ctx.receiver_type);
    ctx
}

fn incompatible(ctx: &TargetContext, field: &str, directive: &str, expected: FieldShape) -> Warning {
    Warning::IncompatibleShape {
        type_name: ctx.type_name.clone(),
        field: field.to_string(),
        directive: directive.to_string(),
        expected: expected.to_string(),
    }
}

/// Checks the shape once per field name so every name gets its own warning.
fn require_sequence(ctx: &TargetContext, field: &str, directive: &str, session: &mut Session<'_>) -> bool {
    if ctx.shape == FieldShape::Sequence {
        true
    } else {
        session.warn(incompatible(ctx, field, directive, FieldShape::Sequence));
        false
    }
}

fn getter(ctx: &TargetContext, session: &mut Session<'_>) -> Result<()> {
    session.require_type(&ctx.field_type);
    for name in &ctx.field_names {
        let upper = upper_first(name);
        let method = if &upper == name { format!("Get{upper}") } else { upper };
        session.registry.push(
            MethodSpec::new(ctx, method, SynthesisKind::Getter)
                .returning(&ctx.field_type)
                .on_field(name, &ctx.field_type),
        )?;
    }
    Ok(())
}

fn setter(ctx: &TargetContext, session: &mut Session<'_>) -> Result<()> {
    session.require_type(&ctx.field_type);
    let arg = arg_name(&ctx.receiver_name, &ctx.element_type);
    for name in &ctx.field_names {
        session.registry.push(
            MethodSpec::new(ctx, format!("Set{}", upper_first(name)), SynthesisKind::Setter)
                .with_receiver(ctx.receiver_type.ensure_pointer())
                .with_arg(&arg, &ctx.field_type)
                .on_field(name, &ctx.field_type),
        )?;
    }
    Ok(())
}

fn find(ctx: &TargetContext, session: &mut Session<'_>) -> Result<()> {
    let arg = arg_name(&ctx.receiver_name, &ctx.element_type);
    for name in &ctx.field_names {
        if !require_sequence(ctx, name, "find", session) {
            continue;
        }
        session.require_type(&ctx.element_type);
        let singular = name.strip_suffix('s').unwrap_or(name);
        session.registry.push(
            MethodSpec::new(ctx, format!("Find{}", upper_first(singular)), SynthesisKind::Find)
                .with_arg(&arg, &ctx.element_type)
                .returning("Option<usize>")
                .on_field(name, &ctx.field_type),
        )?;
    }
    Ok(())
}

fn filter(ctx: &TargetContext, omit_field: bool, session: &mut Session<'_>) -> Result<()> {
    for name in &ctx.field_names {
        if !require_sequence(ctx, name, "filter", session) {
            continue;
        }
        session.require_type(&ctx.element_type);
        let method = if omit_field {
            "Filter".to_string()
        } else {
            format!("Filter{}", upper_first(name))
        };
        session.registry.push(
            MethodSpec::new(ctx, method, SynthesisKind::Filter)
                .with_arg("predicate", &ctx.element_type)
                .returning(format!("Vec<{}>", ctx.element_type))
                .on_field(name, &ctx.field_type),
        )?;
    }
    Ok(())
}

fn map(ctx: &TargetContext, target: &str, omit_field: bool, session: &mut Session<'_>) -> Result<()> {
    let title = type_title(target);
    for name in &ctx.field_names {
        if !require_sequence(ctx, name, "map", session) {
            continue;
        }
        session.require_type(&ctx.element_type);
        session.require_type(target);
        let method = if omit_field {
            format!("MapTo{title}")
        } else {
            format!("Map{}To{title}", upper_first(name))
        };
        session.registry.push(
            MethodSpec::new(
                ctx,
                method,
                SynthesisKind::Mapper {
                    target: target.to_string(),
                },
            )
            .with_arg("convert", &ctx.element_type)
            .returning(format!("Vec<{target}>"))
            .on_field(name, &ctx.field_type),
        )?;
    }
    Ok(())
}

fn sort(ctx: &TargetContext, by_display: bool, session: &mut Session<'_>) -> Result<()> {
    let Some(name) = ctx.field_names.first() else {
        return Ok(());
    };
    if !require_sequence(ctx, name, "sort", session) {
        return Ok(());
    }
    let mutating = ctx.receiver_type.ensure_pointer();
    let spec = |method: &str, kind: SynthesisKind| {
        MethodSpec::new(ctx, method, kind).on_field(name, &ctx.field_type)
    };

    session.registry.push(spec("Len", SynthesisKind::Len).returning("usize"))?;
    session
        .registry
        .push(spec("Swap", SynthesisKind::Swap).with_receiver(mutating.clone()))?;

    if by_display {
        session.registry.push(spec("Less", SynthesisKind::Less).returning("bool"))?;
        session
            .registry
            .push(spec("Sort", SynthesisKind::Sort).with_receiver(mutating))?;
    } else {
        session.require_type(&ctx.element_type);
        session.registry.add_import("std::cmp::Ordering");
        session.registry.push(
            spec("SortBy", SynthesisKind::SortBy)
                .with_receiver(mutating)
                .with_arg("compare", &ctx.element_type),
        )?;
    }
    Ok(())
}

fn stringer(ctx: &TargetContext, session: &mut Session<'_>) -> Result<()> {
    session.registry.add_import("std::fmt");
    let key = MergeKey::new(&ctx.receiver_name, ctx.receiver_type.clone(), "String");
    let spec = session.registry.upsert(key, || {
        MethodSpec::new(ctx, "String", SynthesisKind::Stringer(FormatParts::default())).returning("String")
    })?;

    if let SynthesisKind::Stringer(parts) = &mut spec.kind {
        let placeholder = display_placeholder(ctx);
        for name in &ctx.field_names {
            parts.push(format!("{name}: {placeholder}"), name);
        }
    }
    Ok(())
}

/// Standard types that implement `Debug` but not `Display`.
const DEBUG_ONLY: &[&str] = &[
    "Option",
    "Result",
    "HashSet",
    "BTreeSet",
    "VecDeque",
    "LinkedList",
    "BinaryHeap",
    "PathBuf",
    "Path",
    "Duration",
    "Instant",
    "SystemTime",
    "Cell",
    "RefCell",
    "PhantomData",
];

/// `{}` for scalars that can be displayed, `{:?}` for containers, tuples and the
/// standard types in [`DEBUG_ONLY`]. Other named types must implement `Display`.
fn display_placeholder(ctx: &TargetContext) -> &'static str {
    if ctx.shape != FieldShape::Scalar {
        return "{:?}";
    }
    let ty = ctx.field_type.trim_start_matches('&').trim_start();
    let ty = ty.strip_prefix("mut ").unwrap_or(ty);
    let debug_only = ty.starts_with('(')
        || ty.starts_with('*')
        || ty.starts_with("fn(")
        || ty.starts_with("fn (")
        || DEBUG_ONLY.contains(&simple_type_name(ty));
    if debug_only { "{:?}" } else { "{}" }
}

fn constructor_key(type_name: &str) -> MergeKey {
    MergeKey::new(
        receiver_name(type_name),
        ReceiverType::value(type_name),
        format!("New{type_name}"),
    )
}

fn constructor(ctx: &TargetContext, session: &mut Session<'_>) -> Result<()> {
    session.require_type(&ctx.field_type);
    let value = ReceiverType::value(&ctx.type_name);
    let spec = session.registry.upsert(constructor_key(&ctx.type_name), || {
        MethodSpec::new(
            ctx,
            format!("New{}", ctx.type_name),
            SynthesisKind::Constructor(ConstructorParts::default()),
        )
        .with_receiver(value)
        .returning(&ctx.type_name)
    })?;

    if let SynthesisKind::Constructor(parts) = &mut spec.kind {
        for name in &ctx.field_names {
            let arg = lower_first(name);
            if parts.params.iter().any(|param| param.name == arg) {
                return Err(MetagenError::DuplicateParameter {
                    type_name: ctx.type_name.clone(),
                    field: name.clone(),
                    parameter: arg,
                });
            }
            parts.push(name, arg, &ctx.field_type);
        }
    }
    Ok(())
}

/// Mark the constructor of `ty`, if any, to default the fields it does not take.
pub fn finish_constructor(ty: &TypeDescriptor, session: &mut Session<'_>) {
    let Some(spec) = session.registry.merged_mut(&constructor_key(&ty.name)) else {
        return;
    };
    if let SynthesisKind::Constructor(parts) = &mut spec.kind {
        parts.fill_default = parts.initializers.len() < ty.field_count();
        if parts.fill_default {
            debug!(
                "Constructor of {} covers {} of {} fields",
                ty.name,
                parts.initializers.len(),
                ty.field_count()
            );
        }
    }
}

fn equal(ctx: &TargetContext, deep: bool, session: &mut Session<'_>) -> Result<()> {
    session.registry.add_import("std::any::Any");
    if deep {
        session.registry.add_import("std::fmt");
    }
    let key = MergeKey::new(&ctx.receiver_name, ctx.receiver_type.clone(), "Equal");
    let spec = session.registry.upsert(key, || {
        MethodSpec::new(ctx, "Equal", SynthesisKind::Equal(ComparisonParts::default()))
            .with_arg("other", "&dyn Any")
            .returning("bool")
    })?;

    if let SynthesisKind::Equal(parts) = &mut spec.kind {
        for name in &ctx.field_names {
            parts.comparisons.push(Comparison {
                field: name.clone(),
                deep,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::synthesize;
    use crate::errors::MetagenError;
    use crate::registry::MethodRegistry;
    use crate::types::{FieldDescriptor, ImportMap, SourceUnit};

    fn run(fields: Vec<FieldDescriptor>) -> MethodRegistry {
        let ty = TypeDescriptor::new("Foo", fields);
        synthesize(&SourceUnit::single(ty)).unwrap().registry
    }

    fn names(registry: &MethodRegistry) -> Vec<&str> {
        registry.methods().iter().map(|m| m.name.as_str()).collect()
    }

    #[test]
    fn test_getter_names() {
        let registry = run(vec![
            FieldDescriptor::scalar("name", "String").tagged("getter"),
            FieldDescriptor::scalar("Desc", "String").tagged("getter"),
        ]);
        assert_eq!(names(&registry), vec!["Name", "GetDesc"]);
        assert_eq!(registry.methods()[0].return_type, "String");
        assert_eq!(registry.methods()[0].receiver_type.to_string(), "Foo");
    }

    #[test]
    fn test_setter_forces_single_pointer() {
        let plain = run(vec![FieldDescriptor::scalar("name", "String").tagged("setter")]);
        let after_ptr = run(vec![FieldDescriptor::scalar("name", "String").tagged("ptr;setter")]);

        let spec = &plain.methods()[0];
        assert_eq!(spec.name, "SetName");
        assert_eq!(spec.arg_name, "s");
        assert_eq!(spec.arg_type, "String");
        assert_eq!(spec.receiver_type.to_string(), "*Foo");
        assert_eq!(after_ptr.methods()[0].receiver_type, spec.receiver_type);
    }

    #[test]
    fn test_setter_arg_name_avoids_receiver() {
        let registry = run(vec![FieldDescriptor::scalar("ratio", "f64").tagged("setter")]);
        assert_eq!(registry.methods()[0].arg_name, "ff");
    }

    #[test]
    fn test_filter_and_map_on_same_field() {
        let registry = run(vec![FieldDescriptor::sequence("labels", "String").tagged("filter;mapper:i64")]);
        assert_eq!(names(&registry), vec!["FilterLabels", "MapLabelsToI64"]);

        let filter = &registry.methods()[0];
        assert_eq!(filter.arg_type, "String");
        assert_eq!(filter.return_type, "Vec<String>");
        assert_eq!(filter.field_name, "labels");

        let mapper = &registry.methods()[1];
        assert_eq!(
            mapper.kind,
            SynthesisKind::Mapper {
                target: "i64".to_string()
            }
        );
        assert_eq!(mapper.return_type, "Vec<i64>");
        assert_eq!(mapper.field_name, "labels");
    }

    #[test]
    fn test_omitfield_names() {
        let registry = run(vec![
            FieldDescriptor::sequence("labels", "String").tagged("filter,omitfield;map:chrono::NaiveDate,omitfield"),
        ]);
        assert_eq!(names(&registry), vec!["Filter", "MapToNaiveDate"]);
    }

    #[test]
    fn test_find_trims_plural() {
        let registry = run(vec![
            FieldDescriptor::sequence("labels", "String").tagged("find"),
            FieldDescriptor::sequence("data", "u8").tagged("find"),
        ]);
        assert_eq!(names(&registry), vec!["FindLabel", "FindData"]);
        assert_eq!(registry.methods()[0].arg_name, "s");
        assert_eq!(registry.methods()[0].return_type, "Option<usize>");
    }

    #[test]
    fn test_sort_variants() {
        let by_display = run(vec![FieldDescriptor::sequence("labels", "String").tagged("sort,stringer")]);
        assert_eq!(names(&by_display), vec!["Len", "Swap", "Less", "Sort"]);
        assert!(!by_display.imports().any(|i| i == "std::cmp::Ordering"));

        let by_comparator = run(vec![FieldDescriptor::sequence("labels", "String").tagged("sort")]);
        assert_eq!(names(&by_comparator), vec!["Len", "Swap", "SortBy"]);
        assert!(by_comparator.imports().any(|i| i == "std::cmp::Ordering"));

        let receivers: Vec<String> = by_comparator
            .methods()
            .iter()
            .map(|m| m.receiver_type.to_string())
            .collect();
        assert_eq!(receivers, vec!["Foo", "*Foo", "*Foo"]);
    }

    #[test]
    fn test_shape_mismatch_warns_per_directive() {
        let ty = TypeDescriptor::new(
            "Foo",
            vec![FieldDescriptor::scalar("size", "i32").tagged("filter;map:u8;sort;find;getter")],
        );
        let synthesis = synthesize(&SourceUnit::single(ty)).unwrap();
        assert_eq!(names(&synthesis.registry), vec!["Size"]);
        assert_eq!(synthesis.warnings.len(), 4);
        assert!(
            synthesis
                .warnings
                .iter()
                .all(|w| matches!(w, Warning::IncompatibleShape { expected, .. } if expected == "sequence"))
        );
    }

    #[test]
    fn test_stringer_merges_fields() {
        let registry = run(vec![
            FieldDescriptor::scalar("name", "String").tagged("stringer"),
            FieldDescriptor::scalar("age", "u32").tagged("getter;stringer"),
            FieldDescriptor::sequence("tags", "String").tagged("stringer"),
        ]);
        let strings: Vec<_> = registry
            .methods()
            .iter()
            .filter_map(|m| match &m.kind {
                SynthesisKind::Stringer(parts) => Some(parts),
                _ => None,
            })
            .collect();

        assert_eq!(strings.len(), 1);
        assert_eq!(strings[0].args, vec!["name", "age", "tags"]);
        assert_eq!(strings[0].format_string(), "name: {}, age: {}, tags: {:?}");
        assert!(registry.imports().any(|i| i == "std::fmt"));
    }

    #[test]
    fn test_stringer_debug_formats_types_without_display() {
        let registry = run(vec![
            FieldDescriptor::scalar("name", "String").tagged("stringer"),
            FieldDescriptor::scalar("nickname", "Option<String>").tagged("stringer"),
            FieldDescriptor::scalar("origin", "(i32, i32)").tagged("stringer"),
            FieldDescriptor::scalar("home", "std::path::PathBuf").tagged("stringer"),
            FieldDescriptor::scalar("label", "&'static str").tagged("stringer"),
        ]);
        match &registry.methods()[0].kind {
            SynthesisKind::Stringer(parts) => assert_eq!(
                parts.format_string(),
                "name: {}, nickname: {:?}, origin: {:?}, home: {:?}, label: {}"
            ),
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn test_constructor_rejects_clashing_parameters() {
        let ty = TypeDescriptor::new(
            "Foo",
            vec![
                FieldDescriptor::scalar("Name", "String").tagged("new"),
                FieldDescriptor::scalar("name", "String").tagged("new"),
            ],
        );
        let result = synthesize(&SourceUnit::single(ty));
        assert!(matches!(
            result,
            Err(MetagenError::DuplicateParameter { ref field, ref parameter, .. })
                if field == "name" && parameter == "name"
        ));
    }

    #[test]
    fn test_getters_clashing_after_snake_case() {
        let ty = TypeDescriptor::new(
            "Foo",
            vec![
                FieldDescriptor::scalar("Name", "String").tagged("getter"),
                FieldDescriptor::scalar("get_name", "String").tagged("getter"),
            ],
        );
        let result = synthesize(&SourceUnit::single(ty));
        assert!(matches!(
            result,
            Err(MetagenError::DuplicateMethod { ref rendered, .. }) if rendered == "get_name"
        ));
    }

    #[test]
    fn test_stringer_after_ptr_is_a_duplicate() {
        let ty = TypeDescriptor::new(
            "Foo",
            vec![
                FieldDescriptor::scalar("name", "String").tagged("stringer;ptr"),
                FieldDescriptor::scalar("age", "u32").tagged("stringer"),
            ],
        );
        let result = synthesize(&SourceUnit::single(ty));
        assert!(matches!(result, Err(MetagenError::DuplicateMethod { ref method, .. }) if method == "String"));
    }

    #[test]
    fn test_constructor_ignores_pointer_and_tracks_coverage() {
        let ty = TypeDescriptor::new(
            "Foo",
            vec![
                FieldDescriptor::scalar("name", "String").tagged("new;ptr"),
                FieldDescriptor::scalar("Desc", "String").tagged("constructor"),
                FieldDescriptor::scalar("size", "i32"),
            ],
        );
        let registry = synthesize(&SourceUnit::single(ty)).unwrap().registry;
        assert_eq!(registry.len(), 1);

        let spec = &registry.methods()[0];
        assert_eq!(spec.name, "NewFoo");
        assert_eq!(spec.receiver_type.to_string(), "Foo");
        match &spec.kind {
            SynthesisKind::Constructor(parts) => {
                assert_eq!(parts.parameter_list(), "name: String, desc: String");
                assert_eq!(parts.initializer_list(), "name: name,\nDesc: desc");
                assert!(parts.fill_default);
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn test_constructor_covering_all_fields() {
        let registry = run(vec![
            FieldDescriptor::scalar("name", "String").tagged("new"),
            FieldDescriptor::scalar("size", "i32").tagged("new"),
        ]);
        match &registry.methods()[0].kind {
            SynthesisKind::Constructor(parts) => assert!(!parts.fill_default),
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn test_equal_accumulates_in_order() {
        let registry = run(vec![
            FieldDescriptor::scalar("a", "i32").tagged("equal"),
            FieldDescriptor::scalar("b", "i32").tagged("equal"),
            FieldDescriptor::sequence("c", "i32").tagged("equal,deepcompare"),
        ]);
        assert_eq!(registry.len(), 1);
        match &registry.methods()[0].kind {
            SynthesisKind::Equal(parts) => {
                let fields: Vec<_> = parts.comparisons.iter().map(|c| (c.field.as_str(), c.deep)).collect();
                assert_eq!(fields, vec![("a", false), ("b", false), ("c", true)]);
            }
            other => panic!("unexpected kind {other:?}"),
        }
        let imports: Vec<_> = registry.imports().collect();
        assert_eq!(imports, vec!["std::any::Any", "std::fmt"]);
    }

    #[test]
    fn test_bound_types_add_imports() {
        let mut imports = ImportMap::default();
        imports.insert("NaiveDate", "chrono::NaiveDate");
        imports.insert("Uuid", "uuid::Uuid");
        let unit = SourceUnit {
            imports,
            types: vec![TypeDescriptor::new(
                "Foo",
                vec![
                    FieldDescriptor::sequence("dates", "NaiveDate").tagged("filter"),
                    FieldDescriptor::sequence("names", "String").tagged("map:Uuid"),
                ],
            )],
            skipped: Vec::new(),
        };
        let registry = synthesize(&unit).unwrap().registry;
        let imports: Vec<_> = registry.imports().collect();
        assert_eq!(imports, vec!["chrono::NaiveDate", "uuid::Uuid"]);
    }
}
