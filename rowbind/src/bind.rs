//! Placeholder dialects, rebinding and named-parameter binding

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::hash::{BuildHasher, Hash};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{Error, Result};
use crate::expand::EmptyListPolicy;
use crate::reflect::{default_mapper, Mapper};
use crate::traits::{Record, ToValue};
use crate::value::Value;

/// Positional placeholder syntax of a SQL dialect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindType {
    /// `?`
    #[default]
    Question,
    /// `$1`, `$2`, ...
    Dollar,
    /// `:name`
    Named,
    /// `@p1`, `@p2`, ...
    At,
}

impl BindType {
    /// Render the placeholder for the `position`-th (1-based) argument.
    fn placeholder(self, out: &mut String, position: usize, name: &str) {
        match self {
            BindType::Question => out.push('?'),
            BindType::Dollar => {
                let _ = write!(out, "${}", position);
            }
            BindType::At => {
                let _ = write!(out, "@p{}", position);
            }
            BindType::Named => {
                out.push(':');
                out.push_str(name);
            }
        }
    }
}

/// The placeholder dialect of a driver. Unknown drivers use `?`.
pub fn bind_type(driver: &str) -> BindType {
    match driver {
        "postgres" | "pgx" | "pq-timeouts" | "cloudsqlpostgres" | "ql" | "nrpostgres"
        | "cockroach" => BindType::Dollar,
        "mysql" | "sqlite3" | "nrmysql" | "nrsqlite3" => BindType::Question,
        "oci8" | "ora" | "goracle" | "godror" => BindType::Named,
        "sqlserver" | "azuresql" => BindType::At,
        _ => BindType::Question,
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum Lexical {
    #[default]
    Code,
    Literal { quote: char, escaped: bool },
    LineComment,
    BlockComment,
}

/// Tracks whether a scan position is in plain SQL or inside a quoted
/// literal or a comment.
///
/// A backslash inside a literal escapes the next character (`'it\'s'`).
/// `--` comments run to the end of the line and `/* */` comments do not nest.
#[derive(Default)]
pub(crate) struct QuoteState {
    state: Lexical,
    prev: Option<char>,
}

impl QuoteState {
    /// Feed one character; returns true when it is plain SQL. Quote
    /// characters and comment delimiters count as inside.
    pub(crate) fn outside(&mut self, c: char) -> bool {
        let prev = self.prev.replace(c);
        match self.state {
            Lexical::Literal { quote, escaped } => {
                self.state = if escaped {
                    Lexical::Literal {
                        quote,
                        escaped: false,
                    }
                } else if c == '\\' {
                    Lexical::Literal {
                        quote,
                        escaped: true,
                    }
                } else if c == quote {
                    Lexical::Code
                } else {
                    self.state
                };
                false
            }
            Lexical::LineComment => {
                if c == '\n' {
                    self.state = Lexical::Code;
                }
                false
            }
            Lexical::BlockComment => {
                if c == '/' && prev == Some('*') {
                    self.state = Lexical::Code;
                    self.prev = None;
                }
                false
            }
            Lexical::Code => match c {
                '\'' | '"' => {
                    self.state = Lexical::Literal {
                        quote: c,
                        escaped: false,
                    };
                    false
                }
                '-' if prev == Some('-') => {
                    self.state = Lexical::LineComment;
                    false
                }
                // `/*/` must not close the comment it opens
                '*' if prev == Some('/') => {
                    self.state = Lexical::BlockComment;
                    self.prev = None;
                    false
                }
                _ => true,
            },
        }
    }
}

/// Rewrite `?` placeholders into the dialect of `bind_type`.
///
/// Only `?` outside quoted literals and comments is rewritten, so
/// rebinding an already rebound query leaves it unchanged. `Question` and
/// `Named` return the query as is.
pub fn rebind(bind_type: BindType, query: &str) -> String {
    if matches!(bind_type, BindType::Question | BindType::Named) {
        return query.to_string();
    }

    let mut out = String::with_capacity(query.len() + 10);
    let mut quotes = QuoteState::default();
    let mut position = 0;
    for c in query.chars() {
        let outside = quotes.outside(c);
        if c == '?' && outside {
            position += 1;
            bind_type.placeholder(&mut out, position, "");
        } else {
            out.push(c);
        }
    }
    trace!("Rebound query: {}", out);
    out
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Param(String),
}

/// A query split into literal text and `:name` markers.
///
/// Markers are `:` followed by `[A-Za-z0-9_.]+`. Markers inside quoted
/// literals and comments are left alone and `::` is copied through untouched, so
/// PostgreSQL casts survive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedQuery {
    segments: Vec<Segment>,
}

impl NamedQuery {
    pub fn parse(query: &str) -> Self {
        let mut segments = Vec::new();
        let mut text = String::new();
        let mut quotes = QuoteState::default();
        let mut chars = query.chars().peekable();

        while let Some(c) = chars.next() {
            let outside = quotes.outside(c);
            if c != ':' || !outside {
                text.push(c);
                continue;
            }
            match chars.peek() {
                Some(':') => {
                    text.push_str("::");
                    chars.next();
                }
                Some(&next) if is_name_char(next) => {
                    let mut name = String::new();
                    while let Some(&next) = chars.peek() {
                        if !is_name_char(next) {
                            break;
                        }
                        quotes.outside(next);
                        name.push(next);
                        chars.next();
                    }
                    if !text.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut text)));
                    }
                    segments.push(Segment::Param(name));
                }
                _ => text.push(c),
            }
        }
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }
        Self { segments }
    }

    /// Marker names in textual order, repeats included.
    pub fn names(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Param(name) => Some(name.as_str()),
                Segment::Text(_) => None,
            })
            .collect()
    }

    /// Render with one placeholder per marker.
    pub fn render(&self, bind_type: BindType) -> String {
        let mut out = String::new();
        let mut position = 0;
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Param(name) => {
                    position += 1;
                    bind_type.placeholder(&mut out, position, name);
                }
            }
        }
        out
    }

    /// Render and collect arguments from `args`, expanding list values in
    /// place.
    pub fn bind<A: NamedArgs + ?Sized>(
        &self,
        bind_type: BindType,
        args: &A,
        mapper: &Mapper,
        empty_lists: EmptyListPolicy,
    ) -> Result<(String, Vec<Value>)> {
        let mut out = String::new();
        let mut values = Vec::new();

        for segment in &self.segments {
            let name = match segment {
                Segment::Text(text) => {
                    out.push_str(text);
                    continue;
                }
                Segment::Param(name) => name,
            };

            let value = args
                .named_value(name, mapper)?
                .ok_or_else(|| Error::UnknownParameter(name.clone()))?;

            match value {
                Value::List(items) if items.is_empty() => match empty_lists {
                    EmptyListPolicy::Reject => {
                        return Err(Error::InvalidArgument(format!(
                            "empty list bound to :{}",
                            name
                        )))
                    }
                    EmptyListPolicy::Null => out.push_str("NULL"),
                },
                Value::List(items) => {
                    for (i, item) in items.into_iter().enumerate() {
                        if item.is_list() {
                            return Err(Error::InvalidArgument(format!(
                                "nested list bound to :{}",
                                name
                            )));
                        }
                        if i > 0 {
                            out.push_str(", ");
                        }
                        values.push(item);
                        let element = format!("{}_{}", name, i + 1);
                        bind_type.placeholder(&mut out, values.len(), &element);
                    }
                }
                value => {
                    values.push(value);
                    bind_type.placeholder(&mut out, values.len(), name);
                }
            }
        }

        trace!("Bound named query: {} ({} args)", out, values.len());
        Ok((out, values))
    }
}

/// Split a named query into the dialect's SQL and the marker names, in the
/// order their arguments must be supplied.
pub fn compile_named_query(bind_type: BindType, query: &str) -> (String, Vec<String>) {
    let parsed = NamedQuery::parse(query);
    let names = parsed.names().into_iter().map(str::to_string).collect();
    (parsed.render(bind_type), names)
}

/// Bind `:name` markers from `args` using the default mapper and rejecting
/// empty lists.
pub fn bind_named<A: NamedArgs + ?Sized>(
    bind_type: BindType,
    query: &str,
    args: &A,
) -> Result<(String, Vec<Value>)> {
    bind_named_with(
        bind_type,
        query,
        args,
        &default_mapper(),
        EmptyListPolicy::default(),
    )
}

/// Bind `:name` markers from `args` with an explicit mapper and empty-list
/// policy.
pub fn bind_named_with<A: NamedArgs + ?Sized>(
    bind_type: BindType,
    query: &str,
    args: &A,
    mapper: &Mapper,
    empty_lists: EmptyListPolicy,
) -> Result<(String, Vec<Value>)> {
    NamedQuery::parse(query).bind(bind_type, args, mapper, empty_lists)
}

/// A source of values for `:name` markers.
///
/// Maps are looked up by exact key. Derived records resolve names the same
/// way result columns do, through the mapper, so nested fields answer to
/// `prefix.field`.
pub trait NamedArgs {
    /// The value for `name`, or `None` when the source has no such name.
    fn named_value(&self, name: &str, mapper: &Mapper) -> Result<Option<Value>>;
}

/// [`NamedArgs::named_value`] for a record, used by `#[derive(Record)]`.
pub fn record_args<R: Record>(record: &R, name: &str, mapper: &Mapper) -> Result<Option<Value>> {
    let map = mapper.type_map(R::record_ref())?;
    match map.get(name) {
        Some(path) => record.field_value(path.as_slice()).map(Some),
        None => Ok(None),
    }
}

impl<T: NamedArgs + ?Sized> NamedArgs for &T {
    fn named_value(&self, name: &str, mapper: &Mapper) -> Result<Option<Value>> {
        (**self).named_value(name, mapper)
    }
}

impl<K, V, S> NamedArgs for HashMap<K, V, S>
where
    K: Borrow<str> + Eq + Hash,
    V: ToValue,
    S: BuildHasher,
{
    fn named_value(&self, name: &str, _: &Mapper) -> Result<Option<Value>> {
        Ok(self.get(name).map(ToValue::to_value))
    }
}

impl<K, V> NamedArgs for BTreeMap<K, V>
where
    K: Borrow<str> + Ord,
    V: ToValue,
{
    fn named_value(&self, name: &str, _: &Mapper) -> Result<Option<Value>> {
        Ok(self.get(name).map(ToValue::to_value))
    }
}

impl<K: AsRef<str>, V: ToValue> NamedArgs for [(K, V)] {
    fn named_value(&self, name: &str, _: &Mapper) -> Result<Option<Value>> {
        Ok(self
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.to_value()))
    }
}

impl<K: AsRef<str>, V: ToValue, const N: usize> NamedArgs for [(K, V); N] {
    fn named_value(&self, name: &str, mapper: &Mapper) -> Result<Option<Value>> {
        self.as_slice().named_value(name, mapper)
    }
}

impl<K: AsRef<str>, V: ToValue> NamedArgs for Vec<(K, V)> {
    fn named_value(&self, name: &str, mapper: &Mapper) -> Result<Option<Value>> {
        self.as_slice().named_value(name, mapper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Record;

    #[test]
    fn test_bind_type_table() {
        for driver in ["postgres", "pgx", "pq-timeouts", "cloudsqlpostgres", "ql", "nrpostgres", "cockroach"] {
            assert_eq!(bind_type(driver), BindType::Dollar, "{}", driver);
        }
        for driver in ["mysql", "sqlite3", "nrmysql", "nrsqlite3", "whatever"] {
            assert_eq!(bind_type(driver), BindType::Question, "{}", driver);
        }
        for driver in ["oci8", "ora", "goracle", "godror"] {
            assert_eq!(bind_type(driver), BindType::Named, "{}", driver);
        }
        assert_eq!(bind_type("sqlserver"), BindType::At);
        assert_eq!(bind_type("azuresql"), BindType::At);
    }

    #[test]
    fn test_rebind_dollar_and_at() {
        let q = "SELECT * FROM t WHERE a = ? AND b = ?";
        assert_eq!(
            rebind(BindType::Dollar, q),
            "SELECT * FROM t WHERE a = $1 AND b = $2"
        );
        assert_eq!(
            rebind(BindType::At, q),
            "SELECT * FROM t WHERE a = @p1 AND b = @p2"
        );
        assert_eq!(rebind(BindType::Question, q), q);
        assert_eq!(rebind(BindType::Named, q), q);
    }

    #[test]
    fn test_rebind_skips_quoted_literals() {
        let q = r#"SELECT '?', "a?b" FROM t WHERE x = ? AND y = 'it''s ?'"#;
        assert_eq!(
            rebind(BindType::Dollar, q),
            r#"SELECT '?', "a?b" FROM t WHERE x = $1 AND y = 'it''s ?'"#
        );
    }

    #[test]
    fn test_rebind_backslash_escapes() {
        let q = r"SELECT * FROM t WHERE a = 'it\'s ?' AND b = ? AND c = 'x\\' AND d = ?";
        assert_eq!(
            rebind(BindType::Dollar, q),
            r"SELECT * FROM t WHERE a = 'it\'s ?' AND b = $1 AND c = 'x\\' AND d = $2"
        );
    }

    #[test]
    fn test_rebind_skips_comments() {
        let q = "SELECT a -- what's this?\nFROM t /* don't ? */ WHERE id = ? /*/ ? */";
        assert_eq!(
            rebind(BindType::At, q),
            "SELECT a -- what's this?\nFROM t /* don't ? */ WHERE id = @p1 /*/ ? */"
        );
        assert_eq!(rebind(BindType::Dollar, "a - ? - ?"), "a - $1 - $2");
    }

    #[test]
    fn test_rebind_is_stable() {
        let once = rebind(BindType::Dollar, "a = ? AND b IN (?, ?)");
        assert_eq!(once, "a = $1 AND b IN ($2, $3)");
        assert_eq!(rebind(BindType::Dollar, &once), once);
        let once = rebind(BindType::At, "a = ?");
        assert_eq!(rebind(BindType::At, &once), once);
    }

    #[test]
    fn test_named_map_dollar() {
        let mut args = HashMap::new();
        args.insert("y", Value::from("z"));
        args.insert("x", Value::I64(5));
        let (sql, values) = bind_named(
            BindType::Dollar,
            "SELECT * FROM t WHERE a = :x AND b = :y",
            &args,
        )
        .unwrap();
        assert_eq!(sql, "SELECT * FROM t WHERE a = $1 AND b = $2");
        assert_eq!(values, vec![Value::I64(5), Value::from("z")]);

        let mut reordered = BTreeMap::new();
        reordered.insert("y".to_string(), Value::from("z"));
        reordered.insert("x".to_string(), Value::I64(5));
        let (sql2, values2) = bind_named(
            BindType::Dollar,
            "SELECT * FROM t WHERE a = :x AND b = :y",
            &reordered,
        )
        .unwrap();
        assert_eq!(sql2, sql);
        assert_eq!(values2, values);
    }

    #[test]
    fn test_named_dialects() {
        let args = vec![("a", 1i64), ("b", 2i64)];
        let q = "a = :a OR b = :b OR c = :a";
        let (sql, values) = bind_named(BindType::Question, q, &args).unwrap();
        assert_eq!(sql, "a = ? OR b = ? OR c = ?");
        assert_eq!(values, vec![Value::I64(1), Value::I64(2), Value::I64(1)]);
        let (sql, _) = bind_named(BindType::At, q, &args).unwrap();
        assert_eq!(sql, "a = @p1 OR b = @p2 OR c = @p3");
        let (sql, _) = bind_named(BindType::Named, q, &args).unwrap();
        assert_eq!(sql, q);
    }

    #[test]
    fn test_named_skips_casts_and_literals() {
        let args = vec![("id", 7i64)];
        let (sql, values) = bind_named(
            BindType::Dollar,
            "SELECT ':id', created::date FROM t WHERE id = :id",
            &args,
        )
        .unwrap();
        assert_eq!(sql, "SELECT ':id', created::date FROM t WHERE id = $1");
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn test_named_skips_comments_and_escapes() {
        let q = NamedQuery::parse(
            "SELECT 'o\\':clock' -- isn't :gone\nFROM t /* :also */ WHERE id = :id",
        );
        assert_eq!(q.names(), vec!["id"]);
        assert_eq!(
            q.render(BindType::Dollar),
            "SELECT 'o\\':clock' -- isn't :gone\nFROM t /* :also */ WHERE id = $1"
        );
    }

    #[test]
    fn test_named_unknown_parameter() {
        let args: Vec<(&str, i64)> = vec![("a", 1)];
        let err = bind_named(BindType::Question, "x = :missing", &args).unwrap_err();
        assert!(matches!(err, Error::UnknownParameter(name) if name == "missing"));
    }

    #[test]
    fn test_named_list_expansion() {
        let args = vec![("ids", Value::list([1i64, 2, 3])), ("n", Value::from("x"))];
        let (sql, values) = bind_named(
            BindType::Dollar,
            "SELECT * FROM t WHERE id IN (:ids) AND n = :n",
            &args,
        )
        .unwrap();
        assert_eq!(sql, "SELECT * FROM t WHERE id IN ($1, $2, $3) AND n = $4");
        assert_eq!(values.len(), 4);

        let (sql, _) = bind_named(BindType::Named, "id IN (:ids)", &args).unwrap();
        assert_eq!(sql, "id IN (:ids_1, :ids_2, :ids_3)");
    }

    #[test]
    fn test_named_empty_list_policy() {
        let args = vec![("ids", Value::List(Vec::new()))];
        let err = bind_named(BindType::Question, "id IN (:ids)", &args).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        let (sql, values) = bind_named_with(
            BindType::Question,
            "id IN (:ids)",
            &args,
            &Mapper::default(),
            EmptyListPolicy::Null,
        )
        .unwrap();
        assert_eq!(sql, "id IN (NULL)");
        assert!(values.is_empty());
    }

    #[derive(Record, Default)]
    struct Place {
        city: String,
    }

    #[derive(Record, Default)]
    struct Filter {
        #[rowbind(rename = "user_id")]
        user: i64,
        #[rowbind(nested)]
        place: Place,
        tags: Vec<String>,
    }

    #[test]
    fn test_named_from_record() {
        let filter = Filter {
            user: 9,
            place: Place {
                city: "Oslo".to_string(),
            },
            tags: vec!["a".to_string(), "b".to_string()],
        };
        let (sql, values) = bind_named_with(
            BindType::Dollar,
            "SELECT * FROM t WHERE u = :user_id AND c = :place.city AND tag IN (:tags)",
            &filter,
            &Mapper::default(),
            EmptyListPolicy::Reject,
        )
        .unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM t WHERE u = $1 AND c = $2 AND tag IN ($3, $4)"
        );
        assert_eq!(
            values,
            vec![
                Value::I64(9),
                Value::from("Oslo"),
                Value::from("a"),
                Value::from("b")
            ]
        );
    }

    #[test]
    fn test_compile_named_query() {
        let (sql, names) = compile_named_query(BindType::Dollar, "a = :a AND b = :b.c");
        assert_eq!(sql, "a = $1 AND b = $2");
        assert_eq!(names, vec!["a".to_string(), "b.c".to_string()]);
    }
}
