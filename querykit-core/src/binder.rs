//! Parameter binding.
//!
//! A [`ParameterSet`] is applied to a statement (whose table tokens are
//! already rewritten) in one of two modes:
//!
//! * [`BindingMode::Prepared`] keeps the placeholders in the SQL and returns
//!   typed [`Binding`]s for the backend's native parameter mechanism.
//! * [`BindingMode::Inline`] substitutes escaped literals into the SQL.
//!
//! In both modes a Null parameter compared with `=` or `!=` is rewritten to
//! `IS NULL` / `NOT IS NULL` first, because `col = NULL` never matches. A
//! rewritten key no longer appears in the SQL, so in prepared mode it is
//! simply not bound.
//!
//! Placeholders are matched outside quoted literals, quoted identifiers and
//! comments only, which keeps already-rendered table names and string values
//! untouched.

use std::fmt;
use std::ops::Range;

use serde::Deserialize;
use strum::{Display, EnumString};

use crate::scan::{find_key, key_at, splice, unquoted_ranges};
use crate::value::{Param, ParamType, ParameterSet, Scalar, Value};

/// How parameter values reach the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BindingMode {
    /// Backend-native typed parameters.
    Prepared,
    /// Escaped literals substituted into the statement text.
    Inline,
}

/// A value bound to one named parameter of a prepared statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Placeholder key as it appears in the SQL.
    pub key: String,
    /// The value to bind.
    pub value: Scalar,
    /// The type to bind it as.
    pub param_type: ParamType,
}

/// A statement ready for the backend.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BoundStatement {
    /// Final SQL text.
    pub sql: String,
    /// Values for the native parameter mechanism. Empty in inline mode.
    pub bindings: Vec<Binding>,
}

impl fmt::Display for BoundStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SQL: {}", self.sql)?;
        writeln!(f, "Params: {}", self.bindings.len())?;
        for binding in &self.bindings {
            writeln!(
                f,
                "Key: {} type={} value={:?}",
                binding.key, binding.param_type, binding.value
            )?;
        }
        Ok(())
    }
}

/// Binds `params` to `statement` in the given mode.
///
/// `escape` is the backend's string-escaping capability; it returns the
/// escaped contents of a literal without the surrounding quotes.
pub fn bind(
    statement: &str,
    params: &ParameterSet,
    mode: BindingMode,
    escape: impl Fn(&str) -> String,
) -> BoundStatement {
    match mode {
        BindingMode::Prepared => bind_prepared(statement, params),
        BindingMode::Inline => BoundStatement {
            sql: render_inline(statement, params, escape),
            bindings: Vec::new(),
        },
    }
}

/// Rewrites `!= key` to `NOT IS NULL` and then `= key` to `IS NULL`.
///
/// Whitespace between the operator and the key is consumed. `<=` and `>=`
/// are not equality tests and are left alone.
pub fn rewrite_null_operators(statement: &str, key: &str) -> String {
    let sql = rewrite_operator(statement, key, "!=", "NOT IS NULL");
    rewrite_operator(&sql, key, "=", "IS NULL")
}

fn rewrite_operator(text: &str, key: &str, op: &str, replacement: &str) -> String {
    let bytes = text.as_bytes();
    let mut edits: Vec<(Range<usize>, String)> = Vec::new();
    for range in unquoted_ranges(text) {
        let mut pos = range.start;
        while pos + op.len() <= range.end {
            let is_op = bytes[pos..].starts_with(op.as_bytes())
                && !(op == "=" && pos > 0 && matches!(bytes[pos - 1], b'<' | b'>' | b'!'));
            if !is_op {
                pos += 1;
                continue;
            }
            let mut key_pos = pos + op.len();
            while key_pos < range.end && bytes[key_pos].is_ascii_whitespace() {
                key_pos += 1;
            }
            if key_pos + key.len() > range.end || !key_at(text, key_pos, key) {
                pos += 1;
                continue;
            }
            let glued = pos > 0 && !bytes[pos - 1].is_ascii_whitespace();
            let rewritten = if glued {
                format!(" {replacement}")
            } else {
                replacement.to_owned()
            };
            edits.push((pos..key_pos + key.len(), rewritten));
            pos = key_pos + key.len();
        }
    }
    splice(text, edits)
}

fn rewrite_null_keys(statement: &str, params: &ParameterSet) -> String {
    params
        .iter()
        .filter(|(key, param)| !key.is_empty() && param.value.is_null())
        .fold(statement.to_owned(), |sql, (key, _)| {
            rewrite_null_operators(&sql, key)
        })
}

fn bind_prepared(statement: &str, params: &ParameterSet) -> BoundStatement {
    let mut sql = rewrite_null_keys(statement, params);
    let mut bindings = Vec::new();
    for (key, param) in params.iter() {
        let sites = find_key(&sql, key);
        if sites.is_empty() {
            log::trace!("parameter {key} not used by statement, skipped");
            continue;
        }
        match &param.value {
            Value::List(items) => {
                let (expanded, list_bindings) = expand_list(key, items, param);
                sql = splice(
                    &sql,
                    sites.into_iter().map(|site| (site, expanded.clone())).collect(),
                );
                bindings.extend(list_bindings);
            }
            value => {
                if let Some(scalar) = value.clone().into_scalar() {
                    bindings.push(Binding {
                        key: key.to_owned(),
                        value: scalar,
                        param_type: param.resolved_type(),
                    });
                }
            }
        }
    }
    BoundStatement { sql, bindings }
}

// `:ids` with three members becomes `:ids__0, :ids__1, :ids__2`, each bound
// with its own type unless the caller tagged the whole list.
fn expand_list(key: &str, items: &[Scalar], param: &Param) -> (String, Vec<Binding>) {
    let explicit = param.explicit_type();
    let bindings: Vec<Binding> = items
        .iter()
        .enumerate()
        .map(|(idx, item)| Binding {
            key: format!("{key}__{idx}"),
            value: item.clone(),
            param_type: explicit.unwrap_or_else(|| item.infer_type()),
        })
        .collect();
    let placeholders = bindings
        .iter()
        .map(|binding| binding.key.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    (placeholders, bindings)
}

/// Renders `params` into `statement` as escaped literals.
///
/// Keys are substituted in a single left-to-right scan, longest key first at
/// each position; substituted text is never rescanned. Null values that
/// survive the operator rewrite render as `NULL`.
pub fn render_inline(
    statement: &str,
    params: &ParameterSet,
    escape: impl Fn(&str) -> String,
) -> String {
    let sql = rewrite_null_keys(statement, params);
    let mut keys: Vec<(&str, &Param)> = params.iter().filter(|(key, _)| !key.is_empty()).collect();
    keys.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    let mut edits = Vec::new();
    for range in unquoted_ranges(&sql) {
        let mut pos = range.start;
        while pos < range.end {
            let hit = keys
                .iter()
                .find(|(key, _)| pos + key.len() <= range.end && key_at(&sql, pos, key));
            match hit {
                Some((key, param)) => {
                    edits.push((pos..pos + key.len(), inline_literal(&param.value, &escape)));
                    pos += key.len();
                }
                None => pos += 1,
            }
        }
    }
    splice(&sql, edits)
}

/// The inline literal for `value`.
///
/// Integers are bare, Null is `NULL`, everything else is escaped and
/// single-quoted. A list renders as its members joined with `", "`, each
/// member judged on its own.
pub fn inline_literal(value: &Value, escape: impl Fn(&str) -> String) -> String {
    match value {
        Value::Null => scalar_literal(&Scalar::Null, &escape),
        Value::Integer(v) => scalar_literal(&Scalar::Integer(*v), &escape),
        Value::Boolean(v) => scalar_literal(&Scalar::Boolean(*v), &escape),
        Value::Text(v) => quoted(v, &escape),
        Value::List(items) => items
            .iter()
            .map(|item| scalar_literal(item, &escape))
            .collect::<Vec<_>>()
            .join(", "),
    }
}

fn scalar_literal(value: &Scalar, escape: &impl Fn(&str) -> String) -> String {
    match value {
        Scalar::Null => "NULL".to_owned(),
        Scalar::Integer(v) => v.to_string(),
        Scalar::Boolean(v) => quoted(if *v { "1" } else { "0" }, escape),
        Scalar::Text(v) => quoted(v, escape),
    }
}

fn quoted(raw: &str, escape: &impl Fn(&str) -> String) -> String {
    format!("'{}'", escape(raw))
}
