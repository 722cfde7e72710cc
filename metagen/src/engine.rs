//! Runs every tagged field of a source unit through the directive handlers.

use log::{debug, warn};
use serde::Serialize;

use crate::directive::Directive;
use crate::errors::{Result, Warning};
use crate::handlers;
use crate::registry::MethodRegistry;
use crate::types::{ImportMap, SourceUnit, TargetContext, TypeDescriptor};

/// Outcome of synthesizing one source unit.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Synthesis {
    pub registry: MethodRegistry,
    pub warnings: Vec<Warning>,
}

/// Mutable state shared by the handlers while one unit is processed.
pub struct Session<'a> {
    imports: &'a ImportMap,
    pub registry: MethodRegistry,
    pub warnings: Vec<Warning>,
}

impl<'a> Session<'a> {
    pub fn new(imports: &'a ImportMap) -> Self {
        Self {
            imports,
            registry: MethodRegistry::new(),
            warnings: Vec::new(),
        }
    }

    pub fn warn(&mut self, warning: Warning) {
        warn!("{warning}");
        self.warnings.push(warning);
    }

    /// Add the imports needed to name `ty` in generated code.
    pub fn require_type(&mut self, ty: &str) {
        for path in self.imports.resolve(ty) {
            self.registry.add_import(path);
        }
    }

    pub fn finish(self) -> Synthesis {
        Synthesis {
            registry: self.registry,
            warnings: self.warnings,
        }
    }
}

/// Resolve every directive of every type in `unit`.
///
/// Warnings skip the offending directive; errors abandon the whole unit.
pub fn synthesize(unit: &SourceUnit) -> Result<Synthesis> {
    let mut session = Session::new(&unit.imports);
    for skipped in &unit.skipped {
        session.warn(skipped.clone());
    }

    for ty in &unit.types {
        synthesize_type(ty, &mut session)?;
    }

    debug!(
        "Synthesized {} methods for {} types",
        session.registry.len(),
        unit.types.len()
    );
    Ok(session.finish())
}

fn synthesize_type(ty: &TypeDescriptor, session: &mut Session<'_>) -> Result<()> {
    let mut ctx = TargetContext::for_type(ty);

    for field in &ty.fields {
        let mut field_ctx = ctx.for_field(field);
        for invocation in &field.directives {
            match Directive::resolve(invocation, &field_ctx) {
                Ok(directive) => {
                    for warning in directive.unknown_flags(invocation, &field_ctx) {
                        session.warn(warning);
                    }
                    debug!("{}.{}: {}", ty.name, field_ctx.field_label(), directive.name());
                    field_ctx = handlers::apply(&directive, field_ctx, session)?;
                }
                Err(warning) => session.warn(warning),
            }
        }
        ctx = ctx.carry_receiver(&field_ctx);
    }

    handlers::finish_constructor(ty, session);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SynthesisKind;
    use crate::types::FieldDescriptor;

    #[test]
    fn test_ptr_carries_to_later_fields() {
        let ty = TypeDescriptor::new(
            "Foo",
            vec![
                FieldDescriptor::scalar("name", "String").tagged("getter;ptr"),
                FieldDescriptor::scalar("size", "i32").tagged("getter"),
            ],
        );
        let synthesis = synthesize(&SourceUnit::single(ty)).unwrap();
        let methods = synthesis.registry.methods();

        assert_eq!(methods[0].receiver_type.to_string(), "Foo");
        assert_eq!(methods[1].receiver_type.to_string(), "*Foo");
    }

    #[test]
    fn test_ptr_does_not_leak_across_types() {
        let unit = SourceUnit {
            types: vec![
                TypeDescriptor::new("Foo", vec![FieldDescriptor::scalar("name", "String").tagged("ptr;getter")]),
                TypeDescriptor::new("Bar", vec![FieldDescriptor::scalar("name", "String").tagged("getter")]),
            ],
            ..SourceUnit::default()
        };
        let synthesis = synthesize(&unit).unwrap();
        let methods = synthesis.registry.methods();

        assert_eq!(methods[0].receiver_type.to_string(), "*Foo");
        assert_eq!(methods[1].receiver_type.to_string(), "Bar");
    }

    #[test]
    fn test_warnings_do_not_stop_later_directives() {
        let ty = TypeDescriptor::new(
            "Foo",
            vec![FieldDescriptor::scalar("name", "String").tagged("bogus;filter;map;getter")],
        );
        let synthesis = synthesize(&SourceUnit::single(ty)).unwrap();

        assert_eq!(synthesis.registry.len(), 1);
        assert_eq!(synthesis.registry.methods()[0].kind, SynthesisKind::Getter);
        assert_eq!(synthesis.warnings.len(), 3);
        assert!(matches!(synthesis.warnings[0], Warning::UnknownDirective { .. }));
        assert!(matches!(synthesis.warnings[1], Warning::IncompatibleShape { .. }));
        assert!(matches!(synthesis.warnings[2], Warning::MissingOption { .. }));
    }

    #[test]
    fn test_unknown_flag_is_recorded_and_directive_still_runs() {
        let ty = TypeDescriptor::new(
            "Foo",
            vec![FieldDescriptor::sequence("tags", "String").tagged("equal,deepcomapre")],
        );
        let synthesis = synthesize(&SourceUnit::single(ty)).unwrap();

        assert_eq!(synthesis.registry.len(), 1);
        match &synthesis.registry.methods()[0].kind {
            SynthesisKind::Equal(parts) => assert!(!parts.comparisons[0].deep),
            other => panic!("unexpected kind {other:?}"),
        }
        assert!(matches!(
            synthesis.warnings.as_slice(),
            [Warning::UnknownFlag { flag, .. }] if flag == "deepcomapre"
        ));
    }

    #[test]
    fn test_skipped_types_are_reported() {
        let unit = SourceUnit {
            skipped: vec![Warning::SkippedType {
                type_name: "Wrapper".to_string(),
                reason: "generic types are not supported".to_string(),
            }],
            ..SourceUnit::default()
        };
        let synthesis = synthesize(&unit).unwrap();
        assert!(synthesis.registry.is_empty());
        assert_eq!(synthesis.warnings.len(), 1);
    }
}
