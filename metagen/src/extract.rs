//! Rust source parser using syn to extract `#[meta]`-tagged structs.

use quote::ToTokens;
use syn::{
    Attribute, Expr, ExprLit, Fields, GenericArgument, Item, ItemUse, Lit, LitStr, Meta, PathArguments, Type,
    UseTree,
};

use crate::directive::parse_tag;
use crate::errors::{MetagenError, Result, Warning};
use crate::types::{FieldDescriptor, FieldShape, ImportMap, SourceUnit, TypeDescriptor};

/// Name of the field attribute carrying a tag.
pub const TAG_ATTRIBUTE: &str = "meta";

/// Parse a source file into the types and imports synthesis works on.
///
/// Structs that derive `Meta` are left to the derive macro.
pub fn parse_source(content: &str, path: &str) -> Result<SourceUnit> {
    let syntax = syn::parse_file(content).map_err(|source| MetagenError::Parse {
        path: path.to_string(),
        source,
    })?;

    let mut unit = SourceUnit::default();

    for item in &syntax.items {
        match item {
            Item::Use(item_use) => collect_imports(item_use, &mut unit.imports),
            Item::Struct(item_struct) => {
                if has_derive(&item_struct.attrs, "Meta") || !has_tagged_field(&item_struct.fields) {
                    continue;
                }
                let name = item_struct.ident.to_string();
                if !item_struct.generics.params.is_empty() {
                    unit.skipped.push(Warning::SkippedType {
                        type_name: name,
                        reason: "generic types are not supported".to_string(),
                    });
                    continue;
                }
                if let Some(ty) = describe_struct(&name, &item_struct.fields)? {
                    unit.types.push(ty);
                }
            }
            _ => {}
        }
    }

    Ok(unit)
}

/// Check if a struct has `#[derive(..., name, ...)]`, by last path segment.
fn has_derive(attrs: &[Attribute], name: &str) -> bool {
    for attr in attrs {
        if attr.path().is_ident("derive")
            && let Ok(nested) =
                attr.parse_args_with(syn::punctuated::Punctuated::<syn::Path, syn::Token![,]>::parse_terminated)
        {
            for path in nested {
                if path.segments.last().is_some_and(|s| s.ident == name) {
                    return true;
                }
            }
        }
    }
    false
}

fn has_tagged_field(fields: &Fields) -> bool {
    fields
        .iter()
        .any(|field| field.attrs.iter().any(|attr| attr.path().is_ident(TAG_ATTRIBUTE)))
}

/// Describe a struct's named fields, or `None` when no field carries a tag.
///
/// Tuple and unit structs are never described.
pub fn describe_struct(type_name: &str, fields: &Fields) -> Result<Option<TypeDescriptor>> {
    let Fields::Named(named) = fields else {
        return Ok(None);
    };
    if !has_tagged_field(fields) {
        return Ok(None);
    }

    let mut described = Vec::with_capacity(named.named.len());
    for field in &named.named {
        let Some(ident) = &field.ident else { continue };
        let field_name = ident.to_string();
        let tag = field_tag(type_name, &field_name, &field.attrs)?;

        if tag.is_some() {
            check_supported(type_name, &field_name, &field.ty)?;
        }

        let (shape, element) = classify(&field.ty);
        described.push(FieldDescriptor {
            names: vec![field_name],
            field_type: type_to_string(&field.ty),
            element_type: type_to_string(element),
            shape,
            directives: tag.as_deref().map(parse_tag).unwrap_or_default(),
        });
    }

    Ok(Some(TypeDescriptor::new(type_name, described)))
}

/// Concatenate every `#[meta]` on a field, in order.
fn field_tag(type_name: &str, field: &str, attrs: &[Attribute]) -> Result<Option<String>> {
    let mut parts = Vec::new();
    for attr in attrs.iter().filter(|a| a.path().is_ident(TAG_ATTRIBUTE)) {
        let malformed = |message: String| MetagenError::Attribute {
            type_name: type_name.to_string(),
            field: field.to_string(),
            message,
        };
        let tag = match &attr.meta {
            Meta::List(_) => attr
                .parse_args::<LitStr>()
                .map_err(|e| malformed(e.to_string()))?
                .value(),
            Meta::NameValue(nv) => match &nv.value {
                Expr::Lit(ExprLit { lit: Lit::Str(s), .. }) => s.value(),
                _ => return Err(malformed("expected a string literal".to_string())),
            },
            Meta::Path(_) => return Err(malformed("expected #[meta(\"...\")] or #[meta = \"...\"]".to_string())),
        };
        parts.push(tag);
    }

    Ok(if parts.is_empty() { None } else { Some(parts.join(";")) })
}

fn check_supported(type_name: &str, field: &str, ty: &Type) -> Result<()> {
    let supported = !field.starts_with("r#")
        && !matches!(
            ty,
            Type::ImplTrait(_)
                | Type::Infer(_)
                | Type::Never(_)
                | Type::Macro(_)
                | Type::Verbatim(_)
                | Type::TraitObject(_)
                | Type::Slice(_)
        );
    if supported {
        Ok(())
    } else {
        Err(MetagenError::UnsupportedField {
            type_name: type_name.to_string(),
            field: field.to_string(),
            ty: ty.to_token_stream().to_string(),
        })
    }
}

/// Container shape and element type of a field type.
fn classify(ty: &Type) -> (FieldShape, &Type) {
    match ty {
        Type::Array(array) => (FieldShape::Sequence, array.elem.as_ref()),
        Type::Path(type_path) if type_path.qself.is_none() => {
            let Some(last) = type_path.path.segments.last() else {
                return (FieldShape::Scalar, ty);
            };
            match last.ident.to_string().as_str() {
                "Vec" => match single_type_argument(&last.arguments) {
                    Some(element) => (FieldShape::Sequence, element),
                    None => (FieldShape::Scalar, ty),
                },
                "HashMap" | "BTreeMap" | "IndexMap" => (FieldShape::Mapping, ty),
                _ => (FieldShape::Scalar, ty),
            }
        }
        Type::Paren(inner) => classify(&inner.elem),
        Type::Group(inner) => classify(&inner.elem),
        _ => (FieldShape::Scalar, ty),
    }
}

fn single_type_argument(arguments: &PathArguments) -> Option<&Type> {
    let PathArguments::AngleBracketed(args) = arguments else {
        return None;
    };
    let mut types = args.args.iter().filter_map(|arg| match arg {
        GenericArgument::Type(ty) => Some(ty),
        _ => None,
    });
    let first = types.next()?;
    types.next().is_none().then_some(first)
}

/// Convert syn::Type to the string form stored in descriptors.
pub fn type_to_string(ty: &Type) -> String {
    match ty {
        Type::Path(type_path) if type_path.qself.is_none() => {
            let mut segments = Vec::with_capacity(type_path.path.segments.len());
            for seg in &type_path.path.segments {
                let ident = seg.ident.to_string();
                let rendered = match &seg.arguments {
                    PathArguments::None => ident,
                    PathArguments::AngleBracketed(args) => {
                        let mut inner = Vec::with_capacity(args.args.len());
                        for arg in &args.args {
                            match arg {
                                GenericArgument::Type(inner_ty) => inner.push(type_to_string(inner_ty)),
                                GenericArgument::Lifetime(lt) => inner.push(lt.to_string()),
                                _ => return ty.to_token_stream().to_string(),
                            }
                        }
                        format!("{}<{}>", ident, inner.join(", "))
                    }
                    PathArguments::Parenthesized(_) => return ty.to_token_stream().to_string(),
                };
                segments.push(rendered);
            }
            let leading = if type_path.path.leading_colon.is_some() { "::" } else { "" };
            format!("{leading}{}", segments.join("::"))
        }
        Type::Array(array) => format!(
            "[{}; {}]",
            type_to_string(&array.elem),
            array.len.to_token_stream()
        ),
        Type::Tuple(tuple) => {
            let elems: Vec<String> = tuple.elems.iter().map(type_to_string).collect();
            if elems.len() == 1 {
                format!("({},)", elems[0])
            } else {
                format!("({})", elems.join(", "))
            }
        }
        Type::Reference(reference) => {
            let lifetime = reference
                .lifetime
                .as_ref()
                .map(|lt| format!("{lt} "))
                .unwrap_or_default();
            let mutability = if reference.mutability.is_some() { "mut " } else { "" };
            format!("&{lifetime}{mutability}{}", type_to_string(&reference.elem))
        }
        Type::Paren(inner) => type_to_string(&inner.elem),
        Type::Group(inner) => type_to_string(&inner.elem),
        _ => ty.to_token_stream().to_string(),
    }
}

/// Record the bindings of a top-level `use`, rewritten for a child module.
fn collect_imports(item: &ItemUse, imports: &mut ImportMap) {
    let mut prefix = Vec::new();
    if item.leading_colon.is_some() {
        prefix.push(String::new());
    }
    collect_use_tree(&item.tree, &mut prefix, imports);
}

fn collect_use_tree(tree: &UseTree, prefix: &mut Vec<String>, imports: &mut ImportMap) {
    match tree {
        UseTree::Path(path) => {
            prefix.push(path.ident.to_string());
            collect_use_tree(&path.tree, prefix, imports);
            prefix.pop();
        }
        UseTree::Name(name) => {
            let ident = name.ident.to_string();
            if ident == "self" {
                if let Some(binding) = prefix.last().filter(|b| !b.is_empty()).cloned() {
                    imports.insert(binding, child_module_path(prefix));
                }
            } else {
                let mut full = prefix.clone();
                full.push(ident.clone());
                imports.insert(ident, child_module_path(&full));
            }
        }
        UseTree::Rename(rename) => {
            let binding = rename.rename.to_string();
            if binding == "_" {
                return;
            }
            let mut full = prefix.clone();
            if rename.ident != "self" {
                full.push(rename.ident.to_string());
            }
            imports.insert(binding.clone(), format!("{} as {binding}", child_module_path(&full)));
        }
        UseTree::Group(group) => {
            for item in &group.items {
                collect_use_tree(item, prefix, imports);
            }
        }
        UseTree::Glob(_) => {}
    }
}

/// Paths relative to the current module gain one `super` level inside the generated child module.
fn child_module_path(segments: &[String]) -> String {
    let mut segments = segments.to_vec();
    match segments.first().map(String::as_str) {
        Some("self") => segments[0] = "super".to_string(),
        Some("super") => segments.insert(0, "super".to_string()),
        _ => {}
    }
    segments.join("::")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"
        use chrono::NaiveDate;
        use std::collections::{BTreeMap, HashMap as Map};
        use self::ids::Id;
        use super::shared;
        use std::io::*;
        use std::fmt::Write as _;

        #[derive(Debug, Clone, Default, MetaTags)]
        pub struct Foo {
            #[meta("getter;setter")]
            pub name: String,
            #[meta = "filter,omitfield"]
            #[meta("map:i64")]
            labels: Vec<String>,
            days: [NaiveDate; 7],
            scores: BTreeMap<String, u32>,
            parent: Option<Id>,
        }

        #[derive(Meta)]
        struct Owned {
            #[meta("getter")]
            name: String,
        }

        struct Plain {
            name: String,
        }

        struct Wrapper<T> {
            #[meta("getter")]
            inner: T,
        }
    "#;

    #[test]
    fn test_parse_source_collects_tagged_structs() {
        let unit = parse_source(SOURCE, "foo.rs").unwrap();
        let names: Vec<_> = unit.types.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Foo"]);
        assert_eq!(
            unit.skipped,
            vec![Warning::SkippedType {
                type_name: "Wrapper".to_string(),
                reason: "generic types are not supported".to_string(),
            }]
        );
    }

    #[test]
    fn test_fields_shapes_and_tags() {
        let unit = parse_source(SOURCE, "foo.rs").unwrap();
        let foo = &unit.types[0];
        assert_eq!(foo.field_count(), 5);

        let name = &foo.fields[0];
        assert_eq!(name.shape, FieldShape::Scalar);
        let directives: Vec<_> = name.directives.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(directives, vec!["getter", "setter"]);

        let labels = &foo.fields[1];
        assert_eq!(labels.shape, FieldShape::Sequence);
        assert_eq!(labels.field_type, "Vec<String>");
        assert_eq!(labels.element_type, "String");
        let directives: Vec<_> = labels.directives.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(directives, vec!["filter", "map"]);

        let days = &foo.fields[2];
        assert_eq!(days.shape, FieldShape::Sequence);
        assert_eq!(days.field_type, "[NaiveDate; 7]");
        assert_eq!(days.element_type, "NaiveDate");
        assert!(days.directives.is_empty());

        assert_eq!(foo.fields[3].shape, FieldShape::Mapping);
        assert_eq!(foo.fields[4].field_type, "Option<Id>");
    }

    #[test]
    fn test_imports_rewritten_for_child_module() {
        let unit = parse_source(SOURCE, "foo.rs").unwrap();
        let imports = &unit.imports;
        assert_eq!(imports.get("NaiveDate"), Some("chrono::NaiveDate"));
        assert_eq!(imports.get("BTreeMap"), Some("std::collections::BTreeMap"));
        assert_eq!(imports.get("Map"), Some("std::collections::HashMap as Map"));
        assert_eq!(imports.get("Id"), Some("super::ids::Id"));
        assert_eq!(imports.get("shared"), Some("super::super::shared"));
        assert_eq!(imports.get("_"), None);
    }

    #[test]
    fn test_malformed_attribute_is_an_error() {
        let source = r#"
            struct Foo {
                #[meta(getter)]
                name: String,
            }
        "#;
        let err = parse_source(source, "foo.rs").unwrap_err();
        assert!(matches!(err, MetagenError::Attribute { ref field, .. } if field == "name"));
    }

    #[test]
    fn test_unsupported_tagged_type_is_an_error() {
        let source = r#"
            struct Foo {
                #[meta("getter")]
                handler: Box<dyn Fn()>,
                #[meta("getter")]
                items: [u8],
            }
        "#;
        let err = parse_source(source, "foo.rs").unwrap_err();
        assert!(matches!(err, MetagenError::UnsupportedField { ref field, .. } if field == "items"));
    }

    #[test]
    fn test_invalid_source_is_a_parse_error() {
        let err = parse_source("struct {", "broken.rs").unwrap_err();
        assert!(matches!(err, MetagenError::Parse { ref path, .. } if path == "broken.rs"));
    }

    #[test]
    fn test_type_to_string() {
        let ty: Type = syn::parse_str("String").unwrap();
        assert_eq!(type_to_string(&ty), "String");

        let ty: Type = syn::parse_str("Option<String>").unwrap();
        assert_eq!(type_to_string(&ty), "Option<String>");

        let ty: Type = syn::parse_str("chrono::DateTime<Utc>").unwrap();
        assert_eq!(type_to_string(&ty), "chrono::DateTime<Utc>");

        let ty: Type = syn::parse_str("HashMap<String, Vec<(u8, i32)>>").unwrap();
        assert_eq!(type_to_string(&ty), "HashMap<String, Vec<(u8, i32)>>");

        let ty: Type = syn::parse_str("::uuid::Uuid").unwrap();
        assert_eq!(type_to_string(&ty), "::uuid::Uuid");
    }
}
