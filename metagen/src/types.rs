//! Shared data model: what the extractor produces and what the handlers read.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};
use syn::{GenericArgument, PathArguments, Type};

use crate::directive::DirectiveInvocation;
use crate::naming::receiver_name;

/// Container shape of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldShape {
    Scalar,
    /// `Vec<T>` or `[T; N]`
    Sequence,
    /// `HashMap<K, V>`, `BTreeMap<K, V>`, `IndexMap<K, V>`
    Mapping,
}

impl fmt::Display for FieldShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldShape::Scalar => f.write_str("scalar"),
            FieldShape::Sequence => f.write_str("sequence"),
            FieldShape::Mapping => f.write_str("mapping"),
        }
    }
}

/// A declared field as seen by the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Names declared together; Rust structs always declare one.
    pub names: Vec<String>,
    /// Full field type, e.g. `Vec<String>`
    pub field_type: String,
    /// Element type for sequences, the field type otherwise
    pub element_type: String,
    pub shape: FieldShape,
    pub directives: Vec<DirectiveInvocation>,
}

impl FieldDescriptor {
    pub fn scalar(name: impl Into<String>, ty: impl Into<String>) -> Self {
        let ty = ty.into();
        Self {
            names: vec![name.into()],
            element_type: ty.clone(),
            field_type: ty,
            shape: FieldShape::Scalar,
            directives: Vec::new(),
        }
    }

    pub fn sequence(name: impl Into<String>, element: impl Into<String>) -> Self {
        let element = element.into();
        Self {
            names: vec![name.into()],
            field_type: format!("Vec<{element}>"),
            element_type: element,
            shape: FieldShape::Sequence,
            directives: Vec::new(),
        }
    }

    /// Attach a tag; parsed with [`crate::directive::parse_tag`].
    pub fn tagged(mut self, tag: &str) -> Self {
        self.directives = crate::directive::parse_tag(tag);
        self
    }
}

/// A record type and its fields in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Number of declared field names, tagged or not.
    pub fn field_count(&self) -> usize {
        self.fields.iter().map(|f| f.names.len()).sum()
    }
}

/// Binding name -> `use` path, collected from a file's top-level `use` items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportMap {
    bindings: BTreeMap<String, String>,
}

impl ImportMap {
    pub fn insert(&mut self, binding: impl Into<String>, path: impl Into<String>) {
        self.bindings.insert(binding.into(), path.into());
    }

    pub fn get(&self, binding: &str) -> Option<&str> {
        self.bindings.get(binding).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Import paths needed to name `ty`, one per bound leading path segment.
    pub fn resolve(&self, ty: &str) -> Vec<String> {
        if self.bindings.is_empty() {
            return Vec::new();
        }
        let Ok(parsed) = syn::parse_str::<Type>(ty) else {
            return Vec::new();
        };
        let mut leading = Vec::new();
        collect_leading_idents(&parsed, &mut leading);

        let mut paths = Vec::new();
        for ident in leading {
            if let Some(path) = self.get(&ident)
                && !paths.iter().any(|p| p == path)
            {
                paths.push(path.to_string());
            }
        }
        paths
    }
}

fn collect_leading_idents(ty: &Type, out: &mut Vec<String>) {
    match ty {
        Type::Path(type_path) => {
            if type_path.qself.is_none()
                && type_path.path.leading_colon.is_none()
                && let Some(first) = type_path.path.segments.first()
            {
                out.push(first.ident.to_string());
            }
            for segment in &type_path.path.segments {
                if let PathArguments::AngleBracketed(args) = &segment.arguments {
                    for arg in &args.args {
                        if let GenericArgument::Type(inner) = arg {
                            collect_leading_idents(inner, out);
                        }
                    }
                }
            }
        }
        Type::Reference(r) => collect_leading_idents(&r.elem, out),
        Type::Array(a) => collect_leading_idents(&a.elem, out),
        Type::Slice(s) => collect_leading_idents(&s.elem, out),
        Type::Paren(p) => collect_leading_idents(&p.elem, out),
        Type::Group(g) => collect_leading_idents(&g.elem, out),
        Type::Ptr(p) => collect_leading_idents(&p.elem, out),
        Type::Tuple(t) => {
            for elem in &t.elems {
                collect_leading_idents(elem, out);
            }
        }
        _ => {}
    }
}

/// Everything the extractor found in one source file.
#[derive(Debug, Clone, Default)]
pub struct SourceUnit {
    pub imports: ImportMap,
    pub types: Vec<TypeDescriptor>,
    /// Types the extractor passed over, reported alongside synthesis warnings.
    pub skipped: Vec<crate::errors::Warning>,
}

impl SourceUnit {
    pub fn single(ty: TypeDescriptor) -> Self {
        Self {
            types: vec![ty],
            ..Self::default()
        }
    }
}

/// Receiver type with its pointer markers, displayed as `*Foo`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReceiverType {
    name: String,
    indirection: usize,
}

impl ReceiverType {
    pub fn value(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            indirection: 0,
        }
    }

    /// One more pointer marker. Not idempotent.
    pub fn pointer(&self) -> Self {
        Self {
            name: self.name.clone(),
            indirection: self.indirection + 1,
        }
    }

    /// Pointer form, adding a marker only when there is none.
    pub fn ensure_pointer(&self) -> Self {
        if self.is_pointer() { self.clone() } else { self.pointer() }
    }

    pub fn is_pointer(&self) -> bool {
        self.indirection > 0
    }

    pub fn indirection(&self) -> usize {
        self.indirection
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ReceiverType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in 0..self.indirection {
            f.write_str("*")?;
        }
        f.write_str(&self.name)
    }
}

impl Serialize for ReceiverType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Synthesis state for the field currently being processed.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetContext {
    pub receiver_name: String,
    pub receiver_type: ReceiverType,
    pub type_name: String,
    pub field_names: Vec<String>,
    pub field_type: String,
    pub element_type: String,
    pub shape: FieldShape,
}

impl TargetContext {
    /// Context for a type before any field has been seen.
    pub fn for_type(ty: &TypeDescriptor) -> Self {
        Self {
            receiver_name: receiver_name(&ty.name),
            receiver_type: ReceiverType::value(&ty.name),
            type_name: ty.name.clone(),
            field_names: Vec::new(),
            field_type: String::new(),
            element_type: String::new(),
            shape: FieldShape::Scalar,
        }
    }

    /// Same receiver, pointed at `field`.
    pub fn for_field(&self, field: &FieldDescriptor) -> Self {
        Self {
            field_names: field.names.clone(),
            field_type: field.field_type.clone(),
            element_type: field.element_type.clone(),
            shape: field.shape,
            ..self.clone()
        }
    }

    /// The context `ptr` hands to every later directive of the type.
    pub fn with_pointer_receiver(self) -> Self {
        Self {
            receiver_type: self.receiver_type.pointer(),
            ..self
        }
    }

    /// Keep this type's receiver but take nothing else from `field_ctx`.
    pub fn carry_receiver(self, field_ctx: &TargetContext) -> Self {
        Self {
            receiver_type: field_ctx.receiver_type.clone(),
            ..self
        }
    }

    /// Field names for messages.
    pub fn field_label(&self) -> String {
        self.field_names.join(", ")
    }
}
