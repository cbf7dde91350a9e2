// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Storage key construction.

use std::{fmt, sync::Arc};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::Error;

const PREFIX: &str = "cache:";

/// Returns the storage key of a directly addressed item.
pub(crate) fn item_key(key: &str) -> String {
    format!("{PREFIX}{key}")
}

/// Returns the storage key of one memoized call.
pub(crate) fn function_key(name: &str, suffix: &str) -> String {
    format!("{PREFIX}{name}:{suffix}")
}

/// Derives the default key suffix for an argument list.
///
/// The arguments are first turned into an ordered list: a tuple or sequence is the list
/// itself and any other value, `None` and `()` included, is a list of one. When every argument
/// is a string the suffix is the arguments joined with `,`. Otherwise it is the JSON encoding
/// of the whole list with object keys in sorted order, so two maps with the same entries always
/// produce the same suffix.
///
/// Joining is only used while it cannot be confused with another list: the list must not be
/// empty, no argument may contain `,` and the first one may not start with `[`. Other string
/// lists fall back to JSON, which keeps suffixes distinct for distinct argument lists.
///
/// # Errors
///
/// Returns an [`Argument`](crate::ErrorKind::Argument) error if the arguments cannot be
/// represented as JSON.
///
/// # Examples
///
/// ```
/// use keepsake::derive_args_key;
///
/// assert_eq!(derive_args_key(&("x", "y"))?, "x,y");
/// assert_eq!(derive_args_key(&("x", 1))?, r#"["x",1]"#);
/// assert_eq!(derive_args_key(&"solo")?, "solo");
/// assert_eq!(derive_args_key(&("a,b",))?, r#"["a,b"]"#);
/// assert_eq!(derive_args_key(&None::<String>)?, "[null]");
/// # Ok::<(), keepsake::Error>(())
/// ```
pub fn derive_args_key<A>(args: &A) -> Result<String, Error>
where
    A: Serialize + ?Sized,
{
    let list = match serde_json::to_value(args).map_err(Error::argument)? {
        Value::Array(list) => list,
        other => vec![other],
    };
    encode_args(&list)
}

/// Encodes an already ordered argument list.
pub(crate) fn encode_args(args: &[Value]) -> Result<String, Error> {
    let strings: Option<Vec<&str>> = args.iter().map(Value::as_str).collect();
    if let Some(strings) = strings.filter(|s| joinable(s)) {
        return Ok(strings.join(","));
    }

    let canonical = Value::Array(args.iter().map(canonicalize).collect());
    serde_json::to_string(&canonical).map_err(Error::argument)
}

/// Whether joining `strings` with `,` yields a suffix no other list can produce.
///
/// Joined suffixes split back into their arguments and never start with `[`, which every JSON
/// suffix does.
fn joinable(strings: &[&str]) -> bool {
    strings.first().is_some_and(|first| !first.starts_with('[')) && strings.iter().all(|s| !s.contains(','))
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        Value::Object(entries) => {
            let mut sorted: Vec<(&String, &Value)> = entries.iter().collect();
            sorted.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));
            Value::Object(sorted.into_iter().map(|(k, v)| (k.clone(), canonicalize(v))).collect::<Map<_, _>>())
        }
        other => other.clone(),
    }
}

/// How a memoized function turns its arguments into a key suffix.
pub enum KeyStrategy<A> {
    /// Derive the suffix from the serialized arguments, see [`derive_args_key`].
    Derived(fn(&A) -> Result<String, Error>),
    /// Use a caller-provided function. Two calls meant to share an entry must produce
    /// byte-identical strings.
    Custom(Arc<dyn Fn(&A) -> String + Send + Sync>),
}

impl<A> KeyStrategy<A> {
    /// The default strategy, [`derive_args_key`].
    #[must_use]
    pub fn derived() -> Self
    where
        A: Serialize,
    {
        Self::Derived(derive_args_key::<A>)
    }

    /// Wraps a custom key function.
    ///
    /// The arguments do not need to be serializable when a custom function is used.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&A) -> String + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    /// Computes the suffix for `args`.
    ///
    /// # Errors
    ///
    /// Returns an [`Argument`](crate::ErrorKind::Argument) error if the derived strategy is in
    /// use and the arguments cannot be represented as JSON.
    pub fn suffix(&self, args: &A) -> Result<String, Error> {
        match self {
            Self::Derived(derive) => derive(args),
            Self::Custom(f) => Ok(f(args)),
        }
    }
}

impl<A> Clone for KeyStrategy<A> {
    fn clone(&self) -> Self {
        match self {
            Self::Derived(derive) => Self::Derived(*derive),
            Self::Custom(f) => Self::Custom(Arc::clone(f)),
        }
    }
}

impl<A> Default for KeyStrategy<A>
where
    A: Serialize,
{
    fn default() -> Self {
        Self::derived()
    }
}

impl<A> fmt::Debug for KeyStrategy<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Derived(_) => f.write_str("Derived"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use super::*;
    use crate::ErrorKind;

    #[test]
    fn prefixes() {
        assert_eq!(item_key("user"), "cache:user");
        assert_eq!(function_key("lookup", "x,y"), "cache:lookup:x,y");
    }

    #[test]
    fn strings_are_joined() {
        assert_eq!(derive_args_key(&("x", "y")).unwrap(), "x,y");
        assert_eq!(derive_args_key(&vec!["a", "b", "c"]).unwrap(), "a,b,c");
        assert_eq!(derive_args_key(&("only",)).unwrap(), "only");
    }

    #[test]
    fn mixed_arguments_use_json() {
        assert_eq!(derive_args_key(&("x", 1)).unwrap(), r#"["x",1]"#);
        assert_eq!(derive_args_key(&42).unwrap(), "[42]");
        assert_eq!(derive_args_key(&(Option::<u8>::None, true)).unwrap(), "[null,true]");
    }

    #[test]
    fn unit_and_none_are_a_single_null() {
        assert_eq!(derive_args_key(&()).unwrap(), "[null]");
        assert_eq!(derive_args_key(&None::<String>).unwrap(), "[null]");
    }

    #[test]
    fn empty_lists_are_json() {
        assert_eq!(derive_args_key(&Vec::<String>::new()).unwrap(), "[]");
        assert_eq!(derive_args_key(&vec![""]).unwrap(), "");
    }

    #[test]
    fn ambiguous_strings_are_json() {
        assert_eq!(derive_args_key(&("a,b",)).unwrap(), r#"["a,b"]"#);
        assert_eq!(derive_args_key(&("a", "b")).unwrap(), "a,b");
        assert_eq!(derive_args_key(&"[null]").unwrap(), r#"["[null]"]"#);
        assert_eq!(derive_args_key(&("x", "[y")).unwrap(), "x,[y");
    }

    #[test]
    fn option_values_get_distinct_keys() {
        let keys = [
            derive_args_key(&None::<String>).unwrap(),
            derive_args_key(&Some(String::new())).unwrap(),
            derive_args_key(&Some("[null]".to_string())).unwrap(),
            derive_args_key(&Some("null".to_string())).unwrap(),
        ];
        assert_distinct(&keys);

        let keys = [
            derive_args_key(&None::<Vec<String>>).unwrap(),
            derive_args_key(&Some(Vec::<String>::new())).unwrap(),
            derive_args_key(&Some(vec![String::new()])).unwrap(),
            derive_args_key(&Some(vec![String::new(), String::new()])).unwrap(),
            derive_args_key(&Some(vec![",".to_string()])).unwrap(),
            derive_args_key(&Some(vec!["[]".to_string()])).unwrap(),
        ];
        assert_distinct(&keys);
    }

    #[test]
    fn string_lists_get_distinct_keys() {
        let lists: [&[&str]; 7] = [&[], &[""], &["", ""], &[","], &["a", "b"], &["a,b"], &["[\"a\",\"b\"]"]];
        let keys: Vec<String> = lists.iter().map(|list| derive_args_key(list).unwrap()).collect();
        assert_distinct(&keys);
    }

    fn assert_distinct(keys: &[String]) {
        for (i, a) in keys.iter().enumerate() {
            for b in &keys[i + 1..] {
                assert_ne!(a, b, "two argument lists share a key");
            }
        }
    }

    #[test]
    fn object_keys_are_sorted() {
        #[derive(Serialize)]
        struct Query {
            zeta: u8,
            alpha: &'static str,
        }

        let key = derive_args_key(&(Query { zeta: 1, alpha: "a" }, 2)).unwrap();
        assert_eq!(key, r#"[{"alpha":"a","zeta":1},2]"#);
    }

    #[test]
    fn nested_objects_are_canonical() {
        let a = encode_args(&[json!({"b": {"y": 1, "x": 2}, "a": [ {"d": 0, "c": 0} ]})]).unwrap();
        assert_eq!(a, r#"[{"a":[{"c":0,"d":0}],"b":{"x":2,"y":1}}]"#);
    }

    #[test]
    fn non_string_map_keys_are_rejected() {
        let mut map = BTreeMap::new();
        map.insert((1, 2), "tuple keys");
        let error = derive_args_key(&map).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Argument);
    }

    #[test]
    fn custom_strategy_replaces_default() {
        let strategy = KeyStrategy::custom(|args: &(String, u32)| format!("{}#{}", args.0, args.1));
        assert_eq!(strategy.suffix(&("id".to_string(), 7)).unwrap(), "id#7");
        assert_eq!(format!("{strategy:?}"), "Custom(..)");

        let derived = KeyStrategy::<(String, u32)>::default();
        assert_eq!(derived.suffix(&("id".to_string(), 7)).unwrap(), r#"["id",7]"#);
        assert_eq!(format!("{derived:?}"), "Derived");
    }

    #[test]
    fn custom_strategy_needs_no_serialization() {
        struct Handle(u64);

        let strategy = KeyStrategy::custom(|handle: &Handle| handle.0.to_string());
        assert_eq!(strategy.suffix(&Handle(9)).unwrap(), "9");
    }
}
