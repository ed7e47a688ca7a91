//! The builtin dispatch table.
//!
//! Each entry adapts one utility function to the uniform
//! `(held, args) -> Result<Value>` shape. The held value is the collection,
//! object or string the utility operates on.

use crate::Result;
use crate::core::callable::{Arg, Callable, Iteratee};
use crate::core::registry::{Arity, Registry};
use crate::error::ChainError;
use crate::template::{self, RenderOptions};
use crate::utils::types::{self, kind_name};
use crate::utils::{array, compress, misc, object, string};
use serde_json::{Value, json};

fn invalid(function: &str, position: usize, message: impl Into<String>) -> crate::error::AppError {
    ChainError::InvalidArgument {
        function: function.to_string(),
        position,
        message: message.into(),
    }
    .into()
}

fn value_arg<'a>(function: &str, args: &'a [Arg], position: usize) -> Result<&'a Value> {
    match args.get(position) {
        Some(Arg::Value(value)) => Ok(value),
        Some(other) => Err(invalid(function, position, format!("expected a value, got {}", other.kind()))),
        None => Err(invalid(function, position, "missing argument")),
    }
}

fn optional_value(function: &str, args: &[Arg], position: usize) -> Result<Option<Value>> {
    match args.get(position) {
        None => Ok(None),
        Some(_) => value_arg(function, args, position).map(|v| Some(v.clone())),
    }
}

fn usize_arg(function: &str, args: &[Arg], position: usize, default: usize) -> Result<usize> {
    match args.get(position) {
        None => Ok(default),
        Some(_) => {
            let value = value_arg(function, args, position)?;
            value
                .as_u64()
                .map(|n| n as usize)
                .ok_or_else(|| invalid(function, position, format!("expected a non-negative integer, got {}", value)))
        }
    }
}

fn i64_arg(function: &str, args: &[Arg], position: usize) -> Result<i64> {
    let value = value_arg(function, args, position)?;
    value
        .as_i64()
        .ok_or_else(|| invalid(function, position, format!("expected an integer, got {}", value)))
}

fn str_arg<'a>(function: &str, args: &'a [Arg], position: usize) -> Result<&'a str> {
    let value = value_arg(function, args, position)?;
    value
        .as_str()
        .ok_or_else(|| invalid(function, position, format!("expected a string, got {}", kind_name(value))))
}

fn callable_arg<'a>(function: &str, args: &'a [Arg], position: usize) -> Result<&'a Callable> {
    match args.get(position) {
        Some(Arg::Callable(callable)) => Ok(callable),
        Some(other) => Err(invalid(function, position, format!("expected a function, got {}", other.kind()))),
        None => Err(invalid(function, position, "missing function argument")),
    }
}

fn iteratee_arg(function: &str, args: &[Arg], position: usize) -> Result<Iteratee> {
    Iteratee::from_arg(function, position, args.get(position))
}

/// Every argument from `start` on, as plain values
fn values_from(function: &str, args: &[Arg], start: usize) -> Result<Vec<Value>> {
    (start..args.len())
        .map(|i| value_arg(function, args, i).cloned())
        .collect()
}

/// Keys given either as separate string arguments or as one array of strings
fn key_list(function: &str, args: &[Arg]) -> Result<Vec<String>> {
    let values = match args {
        [Arg::Value(Value::Array(items))] => items.clone(),
        _ => values_from(function, args, 0)?,
    };
    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            v.as_str()
                .map(str::to_string)
                .ok_or_else(|| invalid(function, i, format!("expected a key string, got {}", kind_name(v))))
        })
        .collect()
}

fn held_str<'a>(function: &str, held: &'a Value) -> Result<&'a str> {
    held.as_str().ok_or_else(|| {
        crate::error::UtilsError::TypeMismatch {
            function: function.to_string(),
            expected: "string".to_string(),
            actual: kind_name(held).to_string(),
        }
        .into()
    })
}

pub(crate) fn install(registry: &mut Registry) {
    install_collections(registry);
    install_objects(registry);
    install_strings(registry);
    install_types(registry);
    install_misc(registry);
}

fn install_collections(r: &mut Registry) {
    r.register("map", Arity::Exact(1), "Transform each element", |held, args| {
        array::map(held, &iteratee_arg("map", args, 0)?)
    });
    r.register("filter", Arity::Exact(1), "Keep elements passing the predicate", |held, args| {
        array::filter(held, &iteratee_arg("filter", args, 0)?)
    });
    r.register("reject", Arity::Exact(1), "Drop elements passing the predicate", |held, args| {
        array::reject(held, &iteratee_arg("reject", args, 0)?)
    });
    r.register("reduce", Arity::Range(1, 2), "Left fold with optional initial value", |held, args| {
        array::reduce(held, callable_arg("reduce", args, 0)?, optional_value("reduce", args, 1)?)
    });
    r.register("reduce_right", Arity::Range(1, 2), "Right fold with optional initial value", |held, args| {
        array::reduce_right(
            held,
            callable_arg("reduce_right", args, 0)?,
            optional_value("reduce_right", args, 1)?,
        )
    });
    r.register("find", Arity::Exact(1), "First element passing the predicate", |held, args| {
        array::find(held, &iteratee_arg("find", args, 0)?)
    });
    r.register("find_last", Arity::Exact(1), "Last element passing the predicate", |held, args| {
        array::find_last(held, &iteratee_arg("find_last", args, 0)?)
    });
    r.register("find_index", Arity::Exact(1), "Index of the first match, or -1", |held, args| {
        array::find_index(held, &iteratee_arg("find_index", args, 0)?)
    });
    r.register("some", Arity::Range(0, 1), "Any element passes", |held, args| {
        array::some(held, &iteratee_arg("some", args, 0)?)
    });
    r.register("every", Arity::Range(0, 1), "All elements pass", |held, args| {
        array::every(held, &iteratee_arg("every", args, 0)?)
    });
    r.register("contains", Arity::Exact(1), "Membership by deep equality", |held, args| {
        array::contains(held, value_arg("contains", args, 0)?)
    });
    r.register("uniq", Arity::Exact(0), "Drop duplicates, keeping first occurrences", |held, _| {
        array::uniq(held)
    });
    r.register("first", Arity::Range(0, 1), "First element, or the first n", |held, args| {
        array::first(held, usize_arg("first", args, 0, 1)?)
    });
    r.register("last", Arity::Range(0, 1), "Last element, or the last n", |held, args| {
        array::last(held, usize_arg("last", args, 0, 1)?)
    });
    r.register("initial", Arity::Range(0, 1), "All but the last n", |held, args| {
        array::initial(held, usize_arg("initial", args, 0, 1)?)
    });
    r.register("rest", Arity::Range(0, 1), "All but the first n", |held, args| {
        array::rest(held, usize_arg("rest", args, 0, 1)?)
    });
    r.register("compact", Arity::Exact(0), "Drop falsy elements", |held, _| array::compact(held));
    r.register("without", Arity::AtLeast(0), "Drop the given values", |held, args| {
        array::without(held, &values_from("without", args, 0)?)
    });
    r.register("pluck", Arity::Exact(1), "Extract one property from each element", |held, args| {
        array::pluck(held, str_arg("pluck", args, 0)?)
    });
    r.register("flatten", Arity::Range(0, 1), "Flatten nested arrays, fully or to a depth", |held, args| {
        let depth = match args.first() {
            None => None,
            Some(_) => Some(usize_arg("flatten", args, 0, 0)?),
        };
        array::flatten(held, depth)
    });
    r.register("chunk", Arity::Exact(1), "Split into groups of a size", |held, args| {
        array::chunk(held, usize_arg("chunk", args, 0, 1)?)
    });
    r.register("partition", Arity::Exact(1), "Split into [passing, failing]", |held, args| {
        array::partition(held, &iteratee_arg("partition", args, 0)?)
    });
    r.register("group_by", Arity::Range(0, 1), "Group elements by key", |held, args| {
        array::group_by(held, &iteratee_arg("group_by", args, 0)?)
    });
    r.register("count_by", Arity::Range(0, 1), "Count elements per key", |held, args| {
        array::count_by(held, &iteratee_arg("count_by", args, 0)?)
    });
    r.register("index_by", Arity::Exact(1), "Index elements by key, last wins", |held, args| {
        array::index_by(held, &iteratee_arg("index_by", args, 0)?)
    });
    r.register("sort_by", Arity::Range(0, 1), "Stable sort by key", |held, args| {
        array::sort_by(held, &iteratee_arg("sort_by", args, 0)?)
    });
    r.register("zip", Arity::AtLeast(0), "Pair elements with those of other arrays", |held, args| {
        let mut arrays = vec![held.clone()];
        arrays.extend(values_from("zip", args, 0)?);
        array::zip(&arrays)
    });
    r.register("unzip", Arity::Exact(0), "Inverse of zip", |held, _| array::unzip(held));
    r.register("difference", Arity::AtLeast(0), "Elements absent from every other array", |held, args| {
        array::difference(held, &values_from("difference", args, 0)?)
    });
    r.register("union", Arity::AtLeast(0), "Unique elements of all arrays", |held, args| {
        let mut arrays = vec![held.clone()];
        arrays.extend(values_from("union", args, 0)?);
        array::union(&arrays)
    });
    r.register("intersection", Arity::AtLeast(0), "Elements present in every array", |held, args| {
        let mut arrays = vec![held.clone()];
        arrays.extend(values_from("intersection", args, 0)?);
        array::intersection(&arrays)
    });
    r.register("last_index_of", Arity::Exact(1), "Index of the last equal element, or -1", |held, args| {
        array::last_index_of(held, value_arg("last_index_of", args, 0)?)
    });
    r.register("range", Arity::Range(0, 2), "Integers from the held start (or 0..held)", |held, args| {
        let held_int = held.as_i64().ok_or_else(|| {
            crate::error::UtilsError::TypeMismatch {
                function: "range".to_string(),
                expected: "integer".to_string(),
                actual: kind_name(held).to_string(),
            }
        })?;
        let numbers = match args.len() {
            0 => array::range(held_int, None, 1)?,
            1 => array::range(held_int, Some(i64_arg("range", args, 0)?), 1)?,
            _ => array::range(held_int, Some(i64_arg("range", args, 0)?), i64_arg("range", args, 1)?)?,
        };
        Ok(json!(numbers))
    });
    r.register("max", Arity::Range(0, 1), "Largest element by key", |held, args| {
        array::max_value(held, &iteratee_arg("max", args, 0)?)
    });
    r.register("min", Arity::Range(0, 1), "Smallest element by key", |held, args| {
        array::min_value(held, &iteratee_arg("min", args, 0)?)
    });
    r.register("size", Arity::Exact(0), "Element, key or character count", |held, _| {
        Ok(json!(array::size(held)))
    });
    r.register("shuffle", Arity::Exact(0), "Random permutation", |held, _| array::shuffle(held));
    r.register("sample", Arity::Range(0, 1), "Random element, or n distinct elements", |held, args| {
        array::sample(held, usize_arg("sample", args, 0, 1)?)
    });
    r.register("median", Arity::Exact(1), "Median of two sorted number arrays", |held, args| {
        let left = array::as_f64_vec("median", held)?;
        let right = array::as_f64_vec("median", value_arg("median", args, 0)?)?;
        Ok(array::find_median_sorted_arrays(&left, &right).map_or(Value::Null, |m| json!(m)))
    });
}

fn install_objects(r: &mut Registry) {
    r.register("keys", Arity::Exact(0), "Object keys", |held, _| object::keys(held));
    r.register("values", Arity::Exact(0), "Object values", |held, _| object::values(held));
    r.register("pairs", Arity::Exact(0), "[key, value] pairs", |held, _| object::pairs(held));
    r.register("invert", Arity::Exact(0), "Swap keys and values", |held, _| object::invert(held));
    r.register("pick", Arity::AtLeast(1), "Keep only the given keys", |held, args| {
        object::pick(held, &key_list("pick", args)?)
    });
    r.register("omit", Arity::AtLeast(1), "Drop the given keys", |held, args| {
        object::omit(held, &key_list("omit", args)?)
    });
    r.register("get", Arity::Range(1, 2), "Value at a dotted path, or a default", |held, args| {
        let default = optional_value("get", args, 1)?.unwrap_or(Value::Null);
        Ok(object::get(held, str_arg("get", args, 0)?, default))
    });
    r.register("has", Arity::Exact(1), "Whether a dotted path resolves", |held, args| {
        Ok(json!(object::has(held, str_arg("has", args, 0)?)))
    });
    r.register("defaults", Arity::AtLeast(1), "Fill missing keys from sources", |held, args| {
        object::defaults(held, &values_from("defaults", args, 0)?)
    });
    r.register("extend", Arity::AtLeast(1), "Shallow-assign keys from sources", |held, args| {
        object::extend(held, &values_from("extend", args, 0)?)
    });
    r.register("merge", Arity::AtLeast(1), "Deep-merge sources", |held, args| {
        object::merge(held, &values_from("merge", args, 0)?)
    });
    r.register("deep_copy", Arity::Exact(0), "Independent copy", |held, _| Ok(object::deep_copy(held)));
    r.register("is_match", Arity::Exact(1), "Whether all given attributes match", |held, args| {
        let attrs = value_arg("is_match", args, 0)?
            .as_object()
            .ok_or_else(|| invalid("is_match", 0, "expected an object of attributes"))?;
        Ok(json!(object::is_match(held, attrs)))
    });
    r.register("map_values", Arity::Exact(1), "Transform each value, keeping keys", |held, args| {
        object::map_values(held, &iteratee_arg("map_values", args, 0)?)
    });
}

fn install_strings(r: &mut Registry) {
    type StrFn = fn(&str) -> String;
    let unary: [(&'static str, &'static str, StrFn); 12] = [
        ("capitalize", "Upper-case the first character", string::capitalize),
        ("camel_case", "camelCase conversion", string::camel_case),
        ("snake_case", "snake_case conversion", string::snake_case),
        ("kebab_case", "kebab-case conversion", string::kebab_case),
        ("title_case", "Capitalize every word", string::title_case),
        ("swap_case", "Invert letter case", string::swap_case),
        ("slugify", "URL slug", string::slugify),
        ("escape", "HTML-escape", string::escape),
        ("unescape", "Reverse of escape", string::unescape),
        ("upper", "Upper-case", str::to_uppercase),
        ("lower", "Lower-case", str::to_lowercase),
        ("compress", "Run-length encode", compress::compress),
    ];
    for (name, summary, func) in unary {
        r.register(name, Arity::Exact(0), summary, move |held, _| {
            Ok(Value::String(func(held_str(name, held)?)))
        });
    }

    r.register("reverse", Arity::Exact(0), "Reverse a string or an array", |held, _| match held {
        Value::Array(items) => Ok(Value::Array(items.iter().rev().cloned().collect())),
        other => Ok(Value::String(string::reverse(held_str("reverse", other)?))),
    });
    r.register("decompress", Arity::Exact(0), "Run-length decode", |held, _| {
        Ok(Value::String(compress::decompress(held_str("decompress", held)?)?))
    });
    r.register("words", Arity::Exact(0), "Split into words", |held, _| {
        Ok(json!(string::words(held_str("words", held)?)))
    });
    r.register("repeat", Arity::Exact(1), "Repeat n times", |held, args| {
        Ok(Value::String(string::repeat(held_str("repeat", held)?, usize_arg("repeat", args, 0, 1)?)?))
    });
    r.register("truncate", Arity::Range(1, 2), "Shorten to a width with an omission", |held, args| {
        let omission = match args.get(1) {
            None => "...",
            Some(_) => str_arg("truncate", args, 1)?,
        };
        Ok(Value::String(string::truncate(
            held_str("truncate", held)?,
            usize_arg("truncate", args, 0, 0)?,
            omission,
        )))
    });
    r.register("pad", Arity::Exact(1), "Center within a width", |held, args| {
        Ok(Value::String(string::pad(held_str("pad", held)?, usize_arg("pad", args, 0, 0)?)))
    });
    r.register("pad_start", Arity::Exact(1), "Left-pad to a width", |held, args| {
        Ok(Value::String(string::pad_start(held_str("pad_start", held)?, usize_arg("pad_start", args, 0, 0)?)))
    });
    r.register("pad_end", Arity::Exact(1), "Right-pad to a width", |held, args| {
        Ok(Value::String(string::pad_end(held_str("pad_end", held)?, usize_arg("pad_end", args, 0, 0)?)))
    });
    r.register("template", Arity::Exact(1), "Render the held template with a context", |held, args| {
        let source = held_str("template", held)?;
        let context = value_arg("template", args, 0)?;
        Ok(Value::String(template::render(source, context, &RenderOptions::default())?))
    });
}

fn install_types(r: &mut Registry) {
    type Predicate = fn(&Value) -> bool;
    let predicates: [(&'static str, Predicate); 10] = [
        ("is_string", types::is_string),
        ("is_number", types::is_number),
        ("is_array", types::is_array),
        ("is_object", types::is_object),
        ("is_boolean", types::is_boolean),
        ("is_null", types::is_null),
        ("is_finite", types::is_finite),
        ("is_nan", types::is_nan),
        ("is_empty", types::is_empty),
        ("is_truthy", types::is_truthy),
    ];
    for (name, predicate) in predicates {
        r.register(name, Arity::Exact(0), "Type predicate", move |held, _| {
            Ok(Value::Bool(predicate(held)))
        });
    }
    r.register("is_equal", Arity::Exact(1), "Deep equality", |held, args| {
        Ok(json!(types::is_equal(held, value_arg("is_equal", args, 0)?)))
    });
    r.register("kind", Arity::Exact(0), "Name of the held value's type", |held, _| {
        Ok(json!(kind_name(held)))
    });
}

fn install_misc(r: &mut Registry) {
    r.register("identity", Arity::Exact(0), "The held value", |held, _| Ok(misc::identity(held)));
    r.register("tap", Arity::Exact(1), "Call a function with the held value, keep the value", |held, args| {
        callable_arg("tap", args, 0)?.call1(held)?;
        Ok(held.clone())
    });
    r.register("thru", Arity::Exact(1), "Replace the held value with a function's result", |held, args| {
        callable_arg("thru", args, 0)?.call1(held)
    });
    r.register("times", Arity::Exact(1), "Call a function with each index below the held count", |held, args| {
        let n = held.as_u64().ok_or_else(|| invalid("times", 0, "held value must be a non-negative integer"))?;
        misc::times(n as usize, callable_arg("times", args, 0)?)
    });
    r.register("now", Arity::Exact(0), "Current Unix time in milliseconds", |_, _| Ok(json!(misc::now())));
    r.register("random", Arity::Exact(1), "Uniform integer between the held minimum and a maximum", |held, args| {
        let min = held.as_i64().ok_or_else(|| invalid("random", 0, "held value must be an integer"))?;
        Ok(json!(misc::random(min, i64_arg("random", args, 0)?)?))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    fn call(name: &str, held: Value, args: Vec<Arg>) -> Result<Value> {
        Registry::builtin().call(name, &held, &args)
    }

    #[test]
    fn test_collection_entries() {
        assert_eq!(call("first", json!([1, 2, 3]), vec![]).unwrap(), json!(1));
        assert_eq!(call("first", json!([1, 2, 3]), vec![json!(2).into()]).unwrap(), json!([1, 2]));
        assert_eq!(
            call("pluck", json!([{"n": "a"}, {"n": "b"}]), vec![json!("n").into()]).unwrap(),
            json!(["a", "b"])
        );
        assert_eq!(call("range", json!(3), vec![]).unwrap(), json!([0, 1, 2]));
        assert_eq!(call("range", json!(1), vec![json!(7).into(), json!(3).into()]).unwrap(), json!([1, 4]));
        assert_eq!(call("median", json!([1, 3]), vec![json!([2]).into()]).unwrap(), json!(2.0));
        assert_eq!(
            call("zip", json!(["a", "b"]), vec![json!([1, 2]).into()]).unwrap(),
            json!([["a", 1], ["b", 2]])
        );
    }

    #[test]
    fn test_callable_arguments() {
        let add: Arg = Callable::binary(|a, b| Ok(json!(a.as_i64().unwrap() + b.as_i64().unwrap()))).into();
        assert_eq!(call("reduce", json!([1, 2, 3]), vec![add.clone(), json!(10).into()]).unwrap(), json!(16));
        assert!(matches!(
            call("reduce", json!([1]), vec![json!(1).into()]).unwrap_err(),
            AppError::Chain(ChainError::InvalidArgument { position: 0, .. })
        ));
    }

    #[test]
    fn test_object_and_string_entries() {
        let user = json!({"name": "moe", "age": 50, "id": 1});
        assert_eq!(call("pick", user.clone(), vec![json!("name").into()]).unwrap(), json!({"name": "moe"}));
        assert_eq!(call("omit", user.clone(), vec![json!(["id", "age"]).into()]).unwrap(), json!({"name": "moe"}));
        assert_eq!(call("get", user, vec![json!("missing").into(), json!(0).into()]).unwrap(), json!(0));

        assert_eq!(call("snake_case", json!("fooBar"), vec![]).unwrap(), json!("foo_bar"));
        assert_eq!(call("reverse", json!([1, 2]), vec![]).unwrap(), json!([2, 1]));
        assert_eq!(call("compress", json!("aaabbc"), vec![]).unwrap(), json!("3a2b1c"));
        assert!(call("upper", json!(5), vec![]).is_err());
    }

    #[test]
    fn test_template_entry() {
        assert_eq!(
            call("template", json!("Hello, <%= name %>!"), vec![json!({"name": "Alice"}).into()]).unwrap(),
            json!("Hello, Alice!")
        );
    }

    #[test]
    fn test_type_and_misc_entries() {
        assert_eq!(call("is_empty", json!({}), vec![]).unwrap(), json!(true));
        assert_eq!(call("is_equal", json!([1, {"a": 2}]), vec![json!([1, {"a": 2}]).into()]).unwrap(), json!(true));
        assert_eq!(call("kind", json!("x"), vec![]).unwrap(), json!("string"));

        let index: Arg = Callable::unary(|v| Ok(v.clone())).into();
        assert_eq!(call("times", json!(3), vec![index]).unwrap(), json!([0, 1, 2]));
        let r = call("random", json!(2), vec![json!(2).into()]).unwrap();
        assert_eq!(r, json!(2));
    }
}
