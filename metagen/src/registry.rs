//! Method specifications and the per-file registry they accumulate in.

use std::collections::{BTreeSet, HashMap, HashSet};

use log::debug;
use serde::Serialize;

use crate::errors::{MetagenError, Result};
use crate::naming::to_snake_case;
use crate::types::{ReceiverType, TargetContext};

/// Partial `Display` implementation: one fragment and one value per field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormatParts {
    pub fragments: Vec<String>,
    /// Field names, in the order their fragments appear.
    pub args: Vec<String>,
}

impl FormatParts {
    pub fn push(&mut self, fragment: impl Into<String>, arg: impl Into<String>) {
        self.fragments.push(fragment.into());
        self.args.push(arg.into());
    }

    pub fn format_string(&self) -> String {
        self.fragments.join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Param {
    pub name: String,
    pub ty: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Initializer {
    pub field: String,
    pub arg: String,
}

/// Partial constructor: parameters and field initializers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConstructorParts {
    pub params: Vec<Param>,
    pub initializers: Vec<Initializer>,
    /// Fields not covered by the parameters come from `Default`.
    pub fill_default: bool,
}

impl ConstructorParts {
    pub fn push(&mut self, field: impl Into<String>, arg: impl Into<String>, ty: impl Into<String>) {
        let arg = arg.into();
        self.params.push(Param {
            name: arg.clone(),
            ty: ty.into(),
        });
        self.initializers.push(Initializer {
            field: field.into(),
            arg,
        });
    }

    pub fn parameter_list(&self) -> String {
        self.params
            .iter()
            .map(|p| format!("{}: {}", p.name, p.ty))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn initializer_list(&self) -> String {
        self.initializers
            .iter()
            .map(|i| format!("{}: {}", i.field, i.arg))
            .collect::<Vec<_>>()
            .join(",\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comparison {
    pub field: String,
    /// Compare `Debug` renderings instead of using `==`.
    pub deep: bool,
}

/// Partial `Equal`: comparisons evaluated in order, first failure wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ComparisonParts {
    pub comparisons: Vec<Comparison>,
}

/// Which template renders a spec. Merge kinds carry their accumulator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SynthesisKind {
    Getter,
    Setter,
    Find,
    Filter,
    Mapper { target: String },
    Len,
    Swap,
    Less,
    Sort,
    SortBy,
    Stringer(FormatParts),
    Constructor(ConstructorParts),
    Equal(ComparisonParts),
}

impl SynthesisKind {
    pub fn is_merge(&self) -> bool {
        matches!(
            self,
            SynthesisKind::Stringer(_) | SynthesisKind::Constructor(_) | SynthesisKind::Equal(_)
        )
    }

    pub fn tag(&self) -> &'static str {
        match self {
            SynthesisKind::Getter => "getter",
            SynthesisKind::Setter => "setter",
            SynthesisKind::Find => "find",
            SynthesisKind::Filter => "filter",
            SynthesisKind::Mapper { .. } => "mapper",
            SynthesisKind::Len => "len",
            SynthesisKind::Swap => "swap",
            SynthesisKind::Less => "less",
            SynthesisKind::Sort => "sort",
            SynthesisKind::SortBy => "sort_by",
            SynthesisKind::Stringer(_) => "stringer",
            SynthesisKind::Constructor(_) => "constructor",
            SynthesisKind::Equal(_) => "equal",
        }
    }
}

/// Renderer-agnostic description of one method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodSpec {
    pub receiver_name: String,
    pub receiver_type: ReceiverType,
    pub type_name: String,
    pub name: String,
    pub arg_name: String,
    pub arg_type: String,
    pub return_type: String,
    pub field_name: String,
    pub field_type: String,
    #[serde(flatten)]
    pub kind: SynthesisKind,
}

impl MethodSpec {
    /// Spec on `ctx`'s receiver with no argument, return type or source field yet.
    pub fn new(ctx: &TargetContext, name: impl Into<String>, kind: SynthesisKind) -> Self {
        Self {
            receiver_name: ctx.receiver_name.clone(),
            receiver_type: ctx.receiver_type.clone(),
            type_name: ctx.type_name.clone(),
            name: name.into(),
            arg_name: String::new(),
            arg_type: String::new(),
            return_type: String::new(),
            field_name: String::new(),
            field_type: String::new(),
            kind,
        }
    }

    pub fn with_receiver(mut self, receiver_type: ReceiverType) -> Self {
        self.receiver_type = receiver_type;
        self
    }

    pub fn with_arg(mut self, name: impl Into<String>, ty: impl Into<String>) -> Self {
        self.arg_name = name.into();
        self.arg_type = ty.into();
        self
    }

    pub fn returning(mut self, ty: impl Into<String>) -> Self {
        self.return_type = ty.into();
        self
    }

    pub fn on_field(mut self, name: impl Into<String>, ty: impl Into<String>) -> Self {
        self.field_name = name.into();
        self.field_type = ty.into();
        self
    }

    /// Identifier the method is emitted under: snake_case, with the constructor as `new`.
    pub fn method_ident(&self) -> String {
        match self.kind {
            SynthesisKind::Constructor(_) => "new".to_string(),
            _ => to_snake_case(&self.name),
        }
    }

    /// Name this spec occupies in its type's namespace.
    ///
    /// `String` specs become a `Display` impl and never clash with inherent methods.
    fn slot(&self) -> String {
        match self.kind {
            SynthesisKind::Stringer(_) => "impl fmt::Display".to_string(),
            _ => self.method_ident(),
        }
    }
}

/// Identity of a merge-style spec.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MergeKey {
    pub receiver_name: String,
    pub receiver_type: ReceiverType,
    pub method: String,
}

impl MergeKey {
    pub fn new(receiver_name: impl Into<String>, receiver_type: ReceiverType, method: impl Into<String>) -> Self {
        Self {
            receiver_name: receiver_name.into(),
            receiver_type,
            method: method.into(),
        }
    }
}

/// Methods and imports for one output file, in resolution order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MethodRegistry {
    imports: BTreeSet<String>,
    methods: Vec<MethodSpec>,
    #[serde(skip)]
    merge_index: HashMap<MergeKey, usize>,
    #[serde(skip)]
    claimed: HashSet<(String, String)>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an import. Dropped when its binding name is already taken by another path.
    pub fn add_import(&mut self, path: impl Into<String>) -> bool {
        let path = path.into();
        if self.imports.contains(&path) {
            return false;
        }
        let binding = import_binding(&path);
        if let Some(existing) = self.imports.iter().find(|p| import_binding(p) == binding) {
            debug!("Dropping import {path}: `{binding}` already bound by {existing}");
            return false;
        }
        debug!("Adding import: {path}");
        self.imports.insert(path)
    }

    /// Append a non-merge spec.
    pub fn push(&mut self, spec: MethodSpec) -> Result<()> {
        self.claim(&spec)?;
        debug!("Adding method: {}.{}", spec.type_name, spec.name);
        self.methods.push(spec);
        Ok(())
    }

    /// Find the spec for `key`, creating it with `create` on first use.
    pub fn upsert(&mut self, key: MergeKey, create: impl FnOnce() -> MethodSpec) -> Result<&mut MethodSpec> {
        if let Some(&index) = self.merge_index.get(&key) {
            debug!("Adding to method: {}", key.method);
            return Ok(&mut self.methods[index]);
        }

        let spec = create();
        self.claim(&spec)?;
        debug!("Adding method: {}.{}", spec.type_name, spec.name);
        self.methods.push(spec);
        let index = self.methods.len() - 1;
        self.merge_index.insert(key, index);
        Ok(&mut self.methods[index])
    }

    pub fn merged_mut(&mut self, key: &MergeKey) -> Option<&mut MethodSpec> {
        let index = *self.merge_index.get(key)?;
        self.methods.get_mut(index)
    }

    /// Names are compared after snake_case conversion, as they will be emitted.
    fn claim(&mut self, spec: &MethodSpec) -> Result<()> {
        let slot = spec.slot();
        if self.claimed.insert((spec.type_name.clone(), slot.clone())) {
            Ok(())
        } else {
            Err(MetagenError::DuplicateMethod {
                type_name: spec.type_name.clone(),
                method: spec.name.clone(),
                rendered: slot,
            })
        }
    }

    pub fn methods(&self) -> &[MethodSpec] {
        &self.methods
    }

    pub fn imports(&self) -> impl Iterator<Item = &str> {
        self.imports.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Types with at least one method, in order of first appearance.
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for spec in &self.methods {
            if !names.contains(&spec.type_name.as_str()) {
                names.push(&spec.type_name);
            }
        }
        names
    }
}

/// Name an import brings into scope: `std::fmt` -> `fmt`, `a::B as C` -> `C`.
fn import_binding(path: &str) -> &str {
    match path.rsplit_once(" as ") {
        Some((_, alias)) => alias.trim(),
        None => path.rsplit("::").next().unwrap_or(path),
    }
}
