use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Error, Fields, Result, parse_macro_input};

use metagen::MetagenError;
use metagen::extract::describe_struct;
use metagen::render::{render_imports, render_items};
use metagen::types::SourceUnit;

/// Generate the methods requested by the struct's `#[meta("...")]` field tags.
///
/// ```text
/// #[derive(Meta)]
/// struct Person {
///     #[meta("stringer;getter")]
///     name: String,
///     #[meta("stringer")]
///     age: u32,
/// }
/// ```
///
/// Skipped directives (unknown names, wrong field shapes) produce no method and no
/// diagnostic; `metagen inspect` lists them.
#[proc_macro_derive(Meta, attributes(meta))]
pub fn derive_meta(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand_meta(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Accept `#[meta]` field tags without generating anything.
///
/// Marks a struct for the `metagen` file generator, which writes its methods to a
/// sibling `*_meta.rs` file.
#[proc_macro_derive(MetaTags, attributes(meta))]
pub fn derive_meta_tags(_input: TokenStream) -> TokenStream {
    TokenStream::new()
}

fn expand_meta(input: &DeriveInput) -> Result<TokenStream2> {
    let ident = &input.ident;
    let Data::Struct(data) = &input.data else {
        return Err(Error::new(ident.span(), "Meta can only be derived for structs"));
    };
    if !matches!(data.fields, Fields::Named(_)) {
        return Err(Error::new(ident.span(), "Meta requires a struct with named fields"));
    }
    if !input.generics.params.is_empty() {
        return Err(Error::new(ident.span(), "Meta does not support generic structs"));
    }

    let to_error = |err: MetagenError| Error::new(ident.span(), err.to_string());

    let Some(ty) = describe_struct(&ident.to_string(), &data.fields).map_err(to_error)? else {
        return Ok(TokenStream2::new());
    };
    let synthesis = metagen::synthesize(&SourceUnit::single(ty)).map_err(to_error)?;
    let imports = render_imports(&synthesis.registry).map_err(to_error)?;
    let items = render_items(&synthesis.registry).map_err(to_error)?;

    Ok(quote! {
        const _: () = {
            #imports
            #items
        };
    })
}
