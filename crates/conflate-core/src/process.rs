//! Interpolation engine
//!
//! [`post_process`] walks a parsed tree, resolves every directive embedded in
//! its string scalars through a [`Registry`], and produces a new tree with the
//! substituted values re-typed through the loader's own scalar grammar.
//!
//! Resolution of a single string runs as a fixpoint loop: one leftmost
//! directive per pass, repeated until no directive remains or the value stops
//! being a string. An unrecognized type tag, or a missing value with no
//! default, aborts the whole call; callers never see a partially resolved
//! tree.

use indexmap::IndexMap;

use crate::directive::{contains_directive, Directive};
use crate::error::{Error, Result};
use crate::interpolate::Registry;
use crate::loader::Loader;
use crate::value::Value;

/// Bound on resolution passes per string scalar. Directives whose resolved
/// text keeps producing new directives (a self-referential default, say)
/// would otherwise loop forever.
const MAX_PASSES: usize = 64;

/// Resolve every directive in `value`, returning the substituted tree.
///
/// Mappings and sequences are rebuilt with their order preserved; non-string
/// scalars pass through unchanged. Errors abort the entire call.
pub fn post_process(loader: &dyn Loader, value: &Value, registry: &Registry) -> Result<Value> {
    post_process_at(loader, value, registry, "")
}

fn post_process_at(
    loader: &dyn Loader,
    value: &Value,
    registry: &Registry,
    path: &str,
) -> Result<Value> {
    match value {
        Value::Mapping(map) => {
            let mut result = IndexMap::with_capacity(map.len());
            for (key, item) in map {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                result.insert(
                    key.clone(),
                    post_process_at(loader, item, registry, &child_path)?,
                );
            }
            Ok(Value::Mapping(result))
        }
        Value::Sequence(seq) => {
            let mut result = Vec::with_capacity(seq.len());
            for (i, item) in seq.iter().enumerate() {
                let child_path = format!("{}[{}]", path, i);
                result.push(post_process_at(loader, item, registry, &child_path)?);
            }
            Ok(Value::Sequence(result))
        }
        Value::String(s) => interpolate_scalar(loader, s, registry, path),
        other => Ok(other.clone()),
    }
}

/// Run the directive resolution loop on a single string scalar.
fn interpolate_scalar(
    loader: &dyn Loader,
    scalar: &str,
    registry: &Registry,
    path: &str,
) -> Result<Value> {
    // Fast path: most scalars in a typical document carry no directive
    if !contains_directive(scalar) {
        return Ok(Value::String(scalar.to_string()));
    }

    let mut current = Value::String(scalar.to_string());

    for _ in 0..MAX_PASSES {
        let text = match &current {
            Value::String(s) => s,
            // A previous pass re-typed the scalar; nothing left to match
            _ => return Ok(current),
        };

        let Some(directive) = Directive::find(text) else {
            return Ok(current);
        };

        log::trace!(
            "resolving <% {}[{}] %> at '{}'",
            directive.tag,
            directive.name,
            path
        );

        let interpolator = registry
            .get(directive.tag)
            .ok_or_else(|| Error::unknown_interpolator(directive.tag).with_path(path))?;

        let resolved = match directive.default {
            Some(default) => interpolator
                .lookup_or(directive.name, default)
                .map_err(|e| e.with_path(path))?,
            None => interpolator
                .lookup(directive.name)
                .map_err(|e| e.with_path(path))?,
        };

        let mut candidate = format!("{}{}{}", directive.prefix, resolved, directive.suffix);

        // A leading non-alphanumeric character would be taken as structural
        // syntax by the re-typing parse; quote the candidate unless it is
        // already correctly delimited.
        if candidate
            .chars()
            .next()
            .is_some_and(|c| !c.is_alphanumeric())
        {
            candidate = quote_string(&candidate);
        }

        current = if interpolator.parse_safe() {
            loader.reparse_scalar(&candidate)
        } else {
            Value::String(candidate)
        };
    }

    Err(Error::no_fixpoint(MAX_PASSES).with_path(path))
}

/// Add syntactically-correct quotation characters to a string value.
///
/// A value already wrapped in a single matching pair of `"` or `'` is left
/// alone (the caller is trusted to have quoted correctly). A value that parses
/// as JSON on its own is left alone: it is already valid structured syntax.
/// Anything else is JSON-escaped into a quoted string literal.
fn quote_string(value: &str) -> String {
    let wrapped_double = value.len() >= 2 && value.starts_with('"') && value.ends_with('"');
    let wrapped_single = value.len() >= 2 && value.starts_with('\'') && value.ends_with('\'');
    if wrapped_double || wrapped_single {
        return value.to_string();
    }

    if serde_json::from_str::<serde_json::Value>(value).is_ok() {
        return value.to_string();
    }

    serde_json::to_string(value).expect("strings always serialize")
}
