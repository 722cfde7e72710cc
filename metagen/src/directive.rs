//! Tag parsing and the closed set of directives.
//!
//! A tag is a `;`-separated list of tokens of the form `name[:primary][,flag...]`:
//!
//! ```text
//! getter;setter;map:chrono::NaiveDate,omitfield;equal,deepcompare
//! ```

use serde::Serialize;

use crate::errors::Warning;
use crate::types::TargetContext;

/// One token of a tag, before it is checked against the directive set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectiveInvocation {
    pub name: String,
    pub primary: Option<String>,
    pub flags: Vec<String>,
}

impl DirectiveInvocation {
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }
}

/// Split a raw tag into invocations, in source order.
pub fn parse_tag(tag: &str) -> Vec<DirectiveInvocation> {
    tag.split(';')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(parse_token)
        .collect()
}

fn parse_token(token: &str) -> DirectiveInvocation {
    let split_list = |s: &str| -> Vec<String> {
        s.split(',')
            .map(str::trim)
            .filter(|piece| !piece.is_empty())
            .map(str::to_string)
            .collect()
    };

    match token.split_once(':') {
        Some((name, rest)) => {
            let mut options = split_list(rest).into_iter();
            DirectiveInvocation {
                name: name.trim().to_string(),
                primary: options.next(),
                flags: options.collect(),
            }
        }
        None => {
            let mut pieces = split_list(token).into_iter();
            DirectiveInvocation {
                name: pieces.next().unwrap_or_default(),
                primary: None,
                flags: pieces.collect(),
            }
        }
    }
}

const NO_FLAGS: &[&str] = &[];
const OMIT_FIELD: &[&str] = &["omitfield"];
const BY_DISPLAY: &[&str] = &["stringer"];
const DEEP_COMPARE: &[&str] = &["deepcompare", "reflect"];

/// Resolved directive with its own option schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Switch the receiver to pointer form for the rest of the type.
    Ptr,
    Getter,
    Setter,
    Find,
    Filter { omit_field: bool },
    Map { target: String, omit_field: bool },
    Sort { by_display: bool },
    Stringer,
    New,
    Equal { deep: bool },
}

impl Directive {
    /// Check an invocation against the directive set.
    ///
    /// Flags are not checked here; see [`Directive::unknown_flags`].
    pub fn resolve(invocation: &DirectiveInvocation, ctx: &TargetContext) -> Result<Self, Warning> {
        let name = invocation.name.as_str();
        let directive = match name {
            "ptr" => Directive::Ptr,
            "getter" => Directive::Getter,
            "setter" => Directive::Setter,
            "find" => Directive::Find,
            "filter" => Directive::Filter {
                omit_field: invocation.has_flag("omitfield"),
            },
            "map" | "mapper" => {
                let Some(target) = invocation.primary.clone() else {
                    return Err(Warning::MissingOption {
                        type_name: ctx.type_name.clone(),
                        field: ctx.field_label(),
                        directive: name.to_string(),
                        option: "target type".to_string(),
                    });
                };
                Directive::Map {
                    target,
                    omit_field: invocation.has_flag("omitfield"),
                }
            }
            "sort" => Directive::Sort {
                by_display: invocation.has_flag("stringer"),
            },
            "stringer" => Directive::Stringer,
            "new" | "constructor" => Directive::New,
            "equal" => Directive::Equal {
                deep: DEEP_COMPARE.iter().any(|flag| invocation.has_flag(flag)),
            },
            _ => {
                return Err(Warning::UnknownDirective {
                    type_name: ctx.type_name.clone(),
                    field: ctx.field_label(),
                    directive: name.to_string(),
                });
            }
        };
        Ok(directive)
    }

    fn known_flags(&self) -> &'static [&'static str] {
        match self {
            Directive::Filter { .. } | Directive::Map { .. } => OMIT_FIELD,
            Directive::Sort { .. } => BY_DISPLAY,
            Directive::Equal { .. } => DEEP_COMPARE,
            _ => NO_FLAGS,
        }
    }

    /// One warning per flag of `invocation` this directive does not understand.
    ///
    /// Unknown flags never stop the directive from running.
    pub fn unknown_flags(&self, invocation: &DirectiveInvocation, ctx: &TargetContext) -> Vec<Warning> {
        let known = self.known_flags();
        invocation
            .flags
            .iter()
            .filter(|flag| !known.contains(&flag.as_str()))
            .map(|flag| Warning::UnknownFlag {
                type_name: ctx.type_name.clone(),
                field: ctx.field_label(),
                directive: invocation.name.clone(),
                flag: flag.clone(),
            })
            .collect()
    }

    /// Name used in logs and warnings.
    pub fn name(&self) -> &'static str {
        match self {
            Directive::Ptr => "ptr",
            Directive::Getter => "getter",
            Directive::Setter => "setter",
            Directive::Find => "find",
            Directive::Filter { .. } => "filter",
            Directive::Map { .. } => "map",
            Directive::Sort { .. } => "sort",
            Directive::Stringer => "stringer",
            Directive::New => "new",
            Directive::Equal { .. } => "equal",
        }
    }
}
