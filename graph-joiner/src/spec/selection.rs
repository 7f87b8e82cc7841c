use apollo_compiler::ast;
use indexmap::IndexMap;
use indexmap::map::Entry;

use super::Fragments;
use super::SpecError;
use super::to_json;
use crate::json_ext::ByteString;
use crate::json_ext::Object;
use crate::request::Request;

pub(super) struct Parameters<'a> {
    pub(super) variables: &'a Object,
    pub(super) fragments: &'a Fragments<'a>,
    pub(super) max_depth: usize,
}

/// Adds the selections of `selection_set` to `children`, flattening
/// fragments and merging selections that share a response key.
pub(super) fn collect(
    selection_set: &[ast::Selection],
    children: &mut IndexMap<ByteString, Request>,
    parameters: &Parameters<'_>,
    depth: usize,
) -> Result<(), SpecError> {
    if depth >= parameters.max_depth {
        tracing::error!(
            "selection processing recursion limit({}) exceeded",
            parameters.max_depth
        );
        return Err(SpecError::RecursionLimitExceeded);
    }
    for selection in selection_set {
        match selection {
            ast::Selection::Field(field) => {
                if IncludeSkip::parse(&field.directives).should_skip(parameters.variables) {
                    continue;
                }
                let key = field.alias.as_ref().unwrap_or(&field.name).as_str();
                let args: Object = field
                    .arguments
                    .iter()
                    .map(|argument| {
                        (
                            ByteString::from(argument.name.as_str()),
                            to_json(&argument.value, parameters.variables),
                        )
                    })
                    .collect();
                let mut request = Request::new(field.name.as_str()).with_args(args);
                if !field.selection_set.is_empty() {
                    collect(
                        &field.selection_set,
                        &mut request.children,
                        parameters,
                        depth + 1,
                    )?;
                }
                merge(children, ByteString::from(key), request)?;
            }
            ast::Selection::InlineFragment(fragment) => {
                if IncludeSkip::parse(&fragment.directives).should_skip(parameters.variables) {
                    continue;
                }
                collect(&fragment.selection_set, children, parameters, depth + 1)?;
            }
            ast::Selection::FragmentSpread(spread) => {
                if IncludeSkip::parse(&spread.directives).should_skip(parameters.variables) {
                    continue;
                }
                let name = spread.fragment_name.as_str();
                let fragment = parameters
                    .fragments
                    .get(name)
                    .ok_or_else(|| SpecError::UnknownFragment(name.to_string()))?;
                collect(&fragment.selection_set, children, parameters, depth + 1)?;
            }
        }
    }
    Ok(())
}

/// Two selections under one response key must select the same field with
/// the same arguments; their sub-selections are unioned.
fn merge(
    children: &mut IndexMap<ByteString, Request>,
    key: ByteString,
    request: Request,
) -> Result<(), SpecError> {
    match children.entry(key) {
        Entry::Vacant(entry) => {
            entry.insert(request);
        }
        Entry::Occupied(mut entry) => {
            if entry.get().field_name != request.field_name {
                return Err(SpecError::FieldConflict {
                    key: entry.key().as_str().to_string(),
                    first: entry.get().field_name().to_string(),
                    second: request.field_name().to_string(),
                });
            }
            if entry.get().args != request.args {
                return Err(SpecError::ArgumentConflict {
                    key: entry.key().as_str().to_string(),
                    field: request.field_name().to_string(),
                });
            }
            let existing = entry.get_mut();
            for (key, child) in request.children {
                merge(&mut existing.children, key, child)?;
            }
        }
    }
    Ok(())
}

/// The `@include` and `@skip` conditions of one selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IncludeSkip {
    include: Condition,
    skip: Condition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Condition {
    Yes,
    No,
    Variable(String),
}

impl IncludeSkip {
    pub(crate) fn parse(directives: &ast::DirectiveList) -> Self {
        let mut include = None;
        let mut skip = None;
        for directive in &directives.0 {
            if include.is_none() && directive.name == "include" {
                include = Condition::parse(directive)
            }
            if skip.is_none() && directive.name == "skip" {
                skip = Condition::parse(directive)
            }
        }
        Self {
            include: include.unwrap_or(Condition::Yes),
            skip: skip.unwrap_or(Condition::No),
        }
    }

    pub(crate) fn should_skip(&self, variables: &Object) -> bool {
        // A missing or non boolean variable neither skips nor excludes
        self.skip.eval(variables).unwrap_or(false) || !self.include.eval(variables).unwrap_or(true)
    }
}

impl Condition {
    pub(crate) fn parse(directive: &ast::Directive) -> Option<Self> {
        let argument = directive
            .arguments
            .iter()
            .find(|argument| argument.name == "if")?;
        match &*argument.value {
            ast::Value::Boolean(true) => Some(Condition::Yes),
            ast::Value::Boolean(false) => Some(Condition::No),
            ast::Value::Variable(variable) => {
                Some(Condition::Variable(variable.as_str().to_owned()))
            }
            _ => None,
        }
    }

    pub(crate) fn eval(&self, variables: &Object) -> Option<bool> {
        match self {
            Condition::Yes => Some(true),
            Condition::No => Some(false),
            Condition::Variable(variable_name) => variables
                .get(variable_name.as_str())
                .and_then(|v| v.as_bool()),
        }
    }
}
