//! Turns a finished registry into Rust items.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Ident, LitStr, Type, UseTree};

use crate::errors::{MetagenError, Result};
use crate::registry::{ComparisonParts, ConstructorParts, FormatParts, MethodRegistry, MethodSpec, SynthesisKind};

fn ident(name: &str) -> Result<Ident> {
    syn::parse_str::<Ident>(name).map_err(|source| MetagenError::Render {
        what: format!("identifier `{name}`"),
        source,
    })
}

fn parse_type(ty: &str) -> Result<Type> {
    syn::parse_str::<Type>(ty).map_err(|source| MetagenError::Render {
        what: format!("type `{ty}`"),
        source,
    })
}

/// `use` items for the registry's imports.
pub fn render_imports(registry: &MethodRegistry) -> Result<TokenStream> {
    let mut tokens = TokenStream::new();
    for path in registry.imports() {
        let tree = syn::parse_str::<UseTree>(path).map_err(|source| MetagenError::Render {
            what: format!("import `{path}`"),
            source,
        })?;
        tokens.extend(quote! { use #tree; });
    }
    Ok(tokens)
}

/// One inherent `impl` block per type, plus a `Display` impl for `String` specs.
pub fn render_items(registry: &MethodRegistry) -> Result<TokenStream> {
    let mut items = TokenStream::new();

    for type_name in registry.type_names() {
        let ty = ident(type_name)?;
        let mut methods = Vec::new();
        let mut trait_impls = Vec::new();

        for spec in registry.methods().iter().filter(|m| m.type_name == type_name) {
            match &spec.kind {
                SynthesisKind::Stringer(parts) => trait_impls.push(render_display(&ty, parts)?),
                _ => methods.push(render_method(spec)?),
            }
        }

        if !methods.is_empty() {
            items.extend(quote! {
                impl #ty {
                    #(#methods)*
                }
            });
        }
        items.extend(trait_impls);
    }

    Ok(items)
}

/// A complete output file: header comment, lint allowances and the generated items.
pub fn render_file(registry: &MethodRegistry, header: &str) -> Result<String> {
    let imports = render_imports(registry)?;
    let items = render_items(registry)?;
    let tokens = quote! {
        #![allow(unused_imports, dead_code)]

        use super::*;
        #imports
        #items
    };
    let file: syn::File = syn::parse2(tokens).map_err(|source| MetagenError::Render {
        what: "generated file".to_string(),
        source,
    })?;

    let mut out = header_comment(header);
    if !out.is_empty() {
        out.push('\n');
    }
    out.push_str(&prettyplease::unparse(&file));
    Ok(out)
}

/// `header` as `//` line comments.
pub fn header_comment(header: &str) -> String {
    let mut out = String::new();
    for line in header.lines() {
        if line.is_empty() {
            out.push_str("//\n");
        } else {
            out.push_str("// ");
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

/// Name of the generated method: snake_case, with the constructor as `new`.
pub fn method_name(spec: &MethodSpec) -> String {
    spec.method_ident()
}

fn render_method(spec: &MethodSpec) -> Result<TokenStream> {
    let name = ident(&method_name(spec))?;
    let receiver = if spec.receiver_type.is_pointer() {
        quote!(&mut self)
    } else {
        quote!(&self)
    };

    let tokens = match &spec.kind {
        SynthesisKind::Getter => {
            let field = ident(&spec.field_name)?;
            let ret = parse_type(&spec.return_type)?;
            quote! {
                pub fn #name(#receiver) -> &#ret {
                    &self.#field
                }
            }
        }
        SynthesisKind::Setter => {
            let field = ident(&spec.field_name)?;
            let arg = ident(&spec.arg_name)?;
            let arg_ty = parse_type(&spec.arg_type)?;
            quote! {
                pub fn #name(#receiver, #arg: #arg_ty) {
                    self.#field = #arg;
                }
            }
        }
        SynthesisKind::Find => {
            let field = ident(&spec.field_name)?;
            let arg = ident(&spec.arg_name)?;
            let elem = parse_type(&spec.arg_type)?;
            quote! {
                pub fn #name(#receiver, #arg: &#elem) -> Option<usize> {
                    self.#field.iter().position(|item| item == #arg)
                }
            }
        }
        SynthesisKind::Filter => {
            let field = ident(&spec.field_name)?;
            let elem = parse_type(&spec.arg_type)?;
            quote! {
                pub fn #name(#receiver, predicate: impl Fn(&#elem) -> bool, limit: isize) -> Vec<#elem> {
                    let mut found = Vec::new();
                    for item in self.#field.iter() {
                        if predicate(item) {
                            found.push(item.clone());
                            if limit > 0 && found.len() >= limit as usize {
                                break;
                            }
                        }
                    }
                    found
                }
            }
        }
        SynthesisKind::Mapper { target } => {
            let field = ident(&spec.field_name)?;
            let elem = parse_type(&spec.arg_type)?;
            let target = parse_type(target)?;
            quote! {
                pub fn #name(#receiver, convert: impl Fn(&#elem) -> #target) -> Vec<#target> {
                    self.#field.iter().map(convert).collect()
                }
            }
        }
        SynthesisKind::Len => {
            let field = ident(&spec.field_name)?;
            quote! {
                #[allow(clippy::len_without_is_empty)]
                pub fn #name(#receiver) -> usize {
                    self.#field.len()
                }
            }
        }
        SynthesisKind::Swap => {
            let field = ident(&spec.field_name)?;
            quote! {
                pub fn #name(#receiver, i: usize, j: usize) {
                    self.#field.swap(i, j);
                }
            }
        }
        SynthesisKind::Less => {
            let field = ident(&spec.field_name)?;
            quote! {
                pub fn #name(#receiver, i: usize, j: usize) -> bool {
                    self.#field[i].to_string() < self.#field[j].to_string()
                }
            }
        }
        SynthesisKind::Sort => {
            let field = ident(&spec.field_name)?;
            quote! {
                pub fn #name(#receiver) {
                    self.#field.sort_by_cached_key(|item| item.to_string());
                }
            }
        }
        SynthesisKind::SortBy => {
            let field = ident(&spec.field_name)?;
            let elem = parse_type(&spec.arg_type)?;
            quote! {
                pub fn #name(#receiver, compare: impl FnMut(&#elem, &#elem) -> Ordering) {
                    self.#field.sort_by(compare);
                }
            }
        }
        SynthesisKind::Constructor(parts) => render_constructor(&name, parts)?,
        SynthesisKind::Equal(parts) => render_equal(&name, parts)?,
        SynthesisKind::Stringer(_) => TokenStream::new(),
    };

    Ok(tokens)
}

fn render_constructor(name: &Ident, parts: &ConstructorParts) -> Result<TokenStream> {
    let mut params = Vec::with_capacity(parts.params.len());
    for param in &parts.params {
        let arg = ident(&param.name)?;
        let ty = parse_type(&param.ty)?;
        params.push(quote!(#arg: #ty));
    }

    let mut inits = Vec::with_capacity(parts.initializers.len());
    for init in &parts.initializers {
        let field = ident(&init.field)?;
        if init.field == init.arg {
            inits.push(quote!(#field));
        } else {
            let arg = ident(&init.arg)?;
            inits.push(quote!(#field: #arg));
        }
    }

    let rest = parts.fill_default.then(|| quote!(..Default::default()));
    Ok(quote! {
        pub fn #name(#(#params),*) -> Self {
            Self {
                #(#inits,)*
                #rest
            }
        }
    })
}

fn render_equal(name: &Ident, parts: &ComparisonParts) -> Result<TokenStream> {
    let mut checks = Vec::with_capacity(parts.comparisons.len());
    for comparison in &parts.comparisons {
        let field = ident(&comparison.field)?;
        checks.push(if comparison.deep {
            quote! {
                if fmt::format(format_args!("{:?}", self.#field)) != fmt::format(format_args!("{:?}", other.#field)) {
                    return false;
                }
            }
        } else {
            quote! {
                if self.#field != other.#field {
                    return false;
                }
            }
        });
    }

    Ok(quote! {
        pub fn #name(&self, other: &dyn Any) -> bool {
            let Some(other) = other.downcast_ref::<Self>() else {
                return false;
            };
            #(#checks)*
            true
        }
    })
}

fn render_display(ty: &Ident, parts: &FormatParts) -> Result<TokenStream> {
    let format = LitStr::new(&parts.format_string(), proc_macro2::Span::call_site());
    let args = parts
        .args
        .iter()
        .map(|arg| ident(arg))
        .collect::<Result<Vec<_>>>()?;

    Ok(quote! {
        impl fmt::Display for #ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, #format, #(self.#args),*)
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::synthesize;
    use crate::types::{FieldDescriptor, SourceUnit, TypeDescriptor};

    fn render(fields: Vec<FieldDescriptor>) -> String {
        let ty = TypeDescriptor::new("Person", fields);
        let registry = synthesize(&SourceUnit::single(ty)).unwrap().registry;
        render_file(&registry, "Code generated by metagen. DO NOT EDIT.").unwrap()
    }

    #[test]
    fn test_render_file_layout() {
        let out = render(vec![FieldDescriptor::scalar("name", "String").tagged("getter")]);
        assert!(out.starts_with("// Code generated by metagen. DO NOT EDIT.\n\n"));
        assert!(out.contains("#![allow(unused_imports, dead_code)]"));
        assert!(out.contains("use super::*;"));
        assert!(out.contains("impl Person {"));
        assert!(out.contains("pub fn name(&self) -> &String {"));
    }

    #[test]
    fn test_render_display() {
        let out = render(vec![
            FieldDescriptor::scalar("name", "String").tagged("stringer"),
            FieldDescriptor::scalar("age", "u32").tagged("stringer"),
        ]);
        assert!(out.contains("use std::fmt;"));
        assert!(out.contains("impl fmt::Display for Person {"));
        assert!(out.contains(r#""name: {}, age: {}""#));
        assert!(out.contains("self.age"));
        assert!(!out.contains("impl Person"));
    }

    #[test]
    fn test_render_receivers() {
        let out = render(vec![
            FieldDescriptor::sequence("labels", "String").tagged("filter;setter;ptr"),
            FieldDescriptor::scalar("age", "u32").tagged("getter"),
        ]);
        assert!(out.contains("pub fn filter_labels("));
        assert!(out.contains("predicate: impl Fn(&String) -> bool"));
        assert!(out.contains("pub fn set_labels(&mut self, s: Vec<String>)"));
        assert!(out.contains("pub fn age(&mut self) -> &u32"));
    }

    #[test]
    fn test_render_constructor() {
        let out = render(vec![
            FieldDescriptor::scalar("name", "String").tagged("new"),
            FieldDescriptor::scalar("Desc", "String").tagged("new"),
            FieldDescriptor::scalar("age", "u32"),
        ]);
        assert!(out.contains("pub fn new(name: String, desc: String) -> Self"));
        assert!(out.contains("Desc: desc"));
        assert!(out.contains("..Default::default()"));
    }

    #[test]
    fn test_render_equal() {
        let out = render(vec![
            FieldDescriptor::scalar("name", "String").tagged("equal"),
            FieldDescriptor::sequence("tags", "String").tagged("equal,reflect"),
        ]);
        assert!(out.contains("use std::any::Any;"));
        assert!(out.contains("pub fn equal(&self, other: &dyn Any) -> bool"));
        assert!(out.contains("downcast_ref::<Self>()"));
        assert!(out.contains("if self.name != other.name"));
    }

    #[test]
    fn test_render_sort_by_imports_ordering() {
        let out = render(vec![FieldDescriptor::sequence("scores", "u32").tagged("sort")]);
        assert!(out.contains("use std::cmp::Ordering;"));
        assert!(out.contains("pub fn sort_by("));
        assert!(out.contains("compare: impl FnMut(&u32, &u32) -> Ordering"));
        assert!(out.contains("pub fn len(&self) -> usize"));
    }

    #[test]
    fn test_unrenderable_type_is_an_error() {
        let ty = TypeDescriptor::new("Person", vec![FieldDescriptor::scalar("name", "not a type").tagged("getter")]);
        let registry = synthesize(&SourceUnit::single(ty)).unwrap().registry;
        assert!(matches!(render_items(&registry), Err(MetagenError::Render { .. })));
    }
}
