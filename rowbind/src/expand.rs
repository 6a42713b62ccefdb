//! `IN (?)` expansion of list arguments

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::bind::QuoteState;
use crate::error::{Error, Result};
use crate::value::Value;

/// What to do with a list argument that has no elements.
///
/// `IN ()` is not valid SQL, so an empty list either fails or, when opted
/// into, renders as `NULL` (which matches no row) without an argument.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyListPolicy {
    /// Fail with [`Error::InvalidArgument`]
    #[default]
    Reject,
    /// Render the placeholder as `NULL`
    Null,
}

/// Expand every [`Value::List`] argument into one `?` per element, rejecting
/// empty lists.
///
/// ```
/// use rowbind::{expand_in, Value};
///
/// let (sql, args) = expand_in(
///     "SELECT * FROM users WHERE id IN (?) AND active = ?",
///     vec![Value::list([1i64, 2, 3]), Value::Bool(true)],
/// )
/// .unwrap();
/// assert_eq!(sql, "SELECT * FROM users WHERE id IN (?, ?, ?) AND active = ?");
/// assert_eq!(args.len(), 4);
/// ```
pub fn expand_in(query: &str, args: Vec<Value>) -> Result<(String, Vec<Value>)> {
    expand_in_with(query, args, EmptyListPolicy::Reject)
}

/// [`expand_in`] with an explicit policy for empty lists.
///
/// Arguments are paired with the `?` placeholders outside quoted literals,
/// in order; the two counts must match. `Value::Bytes` is a single value,
/// never a list. The rewritten query always has exactly as many
/// placeholders as there are returned arguments.
pub fn expand_in_with(
    query: &str,
    args: Vec<Value>,
    empty_lists: EmptyListPolicy,
) -> Result<(String, Vec<Value>)> {
    let placeholders = count_placeholders(query);
    if placeholders != args.len() {
        return Err(Error::InvalidArgument(format!(
            "number of bindVars ({}) doesn't match number of arguments ({})",
            placeholders,
            args.len()
        )));
    }
    if !args.iter().any(Value::is_list) {
        return Ok((query.to_string(), args));
    }

    let mut out = String::with_capacity(query.len() + 2 * args.len());
    let mut expanded = Vec::with_capacity(args.len());
    let mut args = args.into_iter();
    let mut quotes = QuoteState::default();

    for c in query.chars() {
        let outside = quotes.outside(c);
        if c != '?' || !outside {
            out.push(c);
            continue;
        }
        // counts were checked above
        let Some(arg) = args.next() else {
            break;
        };
        match arg {
            Value::List(items) if items.is_empty() => match empty_lists {
                EmptyListPolicy::Reject => {
                    return Err(Error::InvalidArgument(format!(
                        "empty list passed as argument {}",
                        expanded.len() + 1
                    )))
                }
                EmptyListPolicy::Null => out.push_str("NULL"),
            },
            Value::List(items) => {
                for (i, item) in items.into_iter().enumerate() {
                    if item.is_list() {
                        return Err(Error::InvalidArgument(
                            "nested lists cannot be expanded".to_string(),
                        ));
                    }
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push('?');
                    expanded.push(item);
                }
            }
            value => {
                out.push('?');
                expanded.push(value);
            }
        }
    }

    trace!("Expanded IN query: {} ({} args)", out, expanded.len());
    Ok((out, expanded))
}

/// Number of `?` placeholders outside quoted literals and comments.
pub(crate) fn count_placeholders(query: &str) -> usize {
    let mut quotes = QuoteState::default();
    query
        .chars()
        .filter(|&c| {
            let outside = quotes.outside(c);
            c == '?' && outside
        })
        .count()
}
