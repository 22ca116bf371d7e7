//! List Package
//!
//! Sequence operations. Every function accepts lists and ranges; ranges stay
//! lazy where the result is itself a contiguous range (`Take`, `Skip`) or
//! has a closed form (`Sum`, `Contains`, `Len`, `First`, `Last`).
//!
//! Scans (`First`, `Last`, `Any`, `All`, `Reduce`) walk a range without
//! building it. Functions that return a new list refuse to build one longer
//! than [`MAX_LIST_LEN`].
//!
//! Callbacks receive `(item, index)` but may declare only `(item)`.

use core::cmp::Ordering;

use num_bigint::BigInt;

use crate::{
    evaluator::{EvalError, Evaluator, ResourceExceeded, RuntimeError, compare},
    stdlib::{arg, expect_int, invalid, type_error},
    values::{NativeFunction, RangeValue, Sequence, Value},
};

/// Longest list a built-in will build.
pub const MAX_LIST_LEN: u64 = 10_000_000;

pub(super) const FUNCTIONS: &[NativeFunction] = &[
    NativeFunction::new("Range", Some(2), list_range),
    NativeFunction::new("Len", Some(1), list_len),
    NativeFunction::new("First", Some(2), list_first),
    NativeFunction::new("Last", Some(2), list_last),
    NativeFunction::new("Sum", Some(1), list_sum),
    NativeFunction::new("SumApprox", Some(1), list_sum_approx),
    NativeFunction::new("Take", Some(2), list_take),
    NativeFunction::new("Skip", Some(2), list_skip),
    NativeFunction::new("Reverse", Some(1), list_reverse),
    NativeFunction::new("Distinct", Some(1), list_distinct),
    NativeFunction::new("Contains", Some(2), list_contains),
    NativeFunction::new("Map", Some(2), list_map),
    NativeFunction::new("Filter", Some(2), list_filter),
    NativeFunction::new("Reduce", Some(3), list_reduce),
    NativeFunction::new("Any", Some(2), list_any),
    NativeFunction::new("All", Some(2), list_all),
    NativeFunction::new("Sort", Some(2), list_sort),
];

/// Elements of a list or range, streamed; `None` for nil.
fn elements<'a>(function: &str, value: &'a Value) -> Result<Option<Sequence<'a>>, EvalError> {
    match value {
        Value::Nil => Ok(None),
        other => match other.sequence() {
            Some(seq) => Ok(Some(seq)),
            None => Err(type_error(function, "a List", other)),
        },
    }
}

fn check_len(function: &str, len: u64) -> Result<(), EvalError> {
    if len > MAX_LIST_LEN {
        return Err(EvalError::from(ResourceExceeded::ListTooLong {
            function: function.to_string(),
            len,
            max_len: MAX_LIST_LEN,
        }));
    }
    Ok(())
}

/// Elements of a list or range collected into a new vector, within
/// [`MAX_LIST_LEN`]; `None` for nil.
fn items(function: &str, value: &Value) -> Result<Option<Vec<Value>>, EvalError> {
    let Some(seq) = elements(function, value)? else {
        return Ok(None);
    };
    check_len(function, value.sequence_len().unwrap_or(0))?;
    Ok(Some(seq.collect()))
}

/// Predicate results must be Boolean; nil counts as false.
fn truthy(function: &str, value: Value) -> Result<bool, EvalError> {
    match value {
        Value::Bool(b) => Ok(b),
        Value::Nil => Ok(false),
        other => Err(type_error(function, "a Boolean from the predicate", &other)),
    }
}

fn index_value(i: u64) -> Value {
    Value::Int(i64::try_from(i).unwrap_or(i64::MAX))
}

fn list_range(_ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let start = expect_int("Range", &arg(args, 0))?;
    let count = expect_int("Range", &arg(args, 1))?;
    if count < 0 {
        return Err(invalid("Range", "count must be >= 0"));
    }
    Ok(Value::Range(RangeValue {
        start,
        count: count.unsigned_abs(),
    }))
}

fn list_len(_ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let len = match arg(args, 0) {
        Value::Nil => 0,
        Value::List(items) => items.len() as u64,
        Value::Range(range) => range.count,
        Value::String(s) => s.chars().count() as u64,
        Value::Bytes(b) => b.len() as u64,
        Value::Kvc(kvc) => kvc.len() as u64,
        other => return Err(type_error("Len", "a List, String or collection", &other)),
    };
    Ok(Value::integer(BigInt::from(len)))
}

fn find_first(
    ev: &mut Evaluator<'_>,
    function: &str,
    items: impl Iterator<Item = (u64, Value)>,
    predicate: &Value,
) -> Result<Value, EvalError> {
    for (i, item) in items {
        if predicate.is_nil() || truthy(function, ev.call_fitted(predicate, &[item.clone(), index_value(i)])?)? {
            return Ok(item);
        }
    }
    Ok(Value::Nil)
}

/// `First(list)` or `First(list, predicate)`. Strings yield their first character.
fn list_first(ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let target = arg(args, 0);
    if let Value::String(s) = &target {
        return Ok(s.chars().next().map_or(Value::Nil, |c| Value::string(c.to_string())));
    }
    let Some(seq) = elements("First", &target)? else {
        return Ok(Value::Nil);
    };
    find_first(ev, "First", (0..).zip(seq), &arg(args, 1))
}

fn list_last(ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let target = arg(args, 0);
    if let Value::String(s) = &target {
        return Ok(s.chars().last().map_or(Value::Nil, |c| Value::string(c.to_string())));
    }
    let Some(seq) = elements("Last", &target)? else {
        return Ok(Value::Nil);
    };
    let len = seq.remaining();
    let indexed = seq.rev().zip((0..len).rev()).map(|(item, i)| (i, item));
    find_first(ev, "Last", indexed, &arg(args, 1))
}

/// Exact sum: integers never lose precision, a float element switches the
/// whole sum to floating point. Ranges use `count * start + count * (count - 1) / 2`.
fn list_sum(_ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    match arg(args, 0) {
        Value::Nil => Ok(Value::Nil),
        Value::Range(range) => {
            let count = BigInt::from(range.count);
            let start = BigInt::from(range.start);
            let total = &count * start + (&count * (&count - 1)) / 2;
            Ok(Value::integer(total))
        }
        Value::List(items) => {
            let mut exact = BigInt::from(0);
            let mut float: Option<f64> = None;
            for item in items.iter() {
                match item {
                    Value::Nil => {}
                    Value::Int(i) => exact += *i,
                    Value::BigInt(b) => exact += &**b,
                    Value::Number(x) => *float.get_or_insert(0.0) += x,
                    other => return Err(type_error("Sum", "numeric elements", other)),
                }
            }
            match float {
                Some(x) => Ok(Value::Number(x + Value::integer(exact).as_f64().unwrap_or(f64::NAN))),
                None => Ok(Value::integer(exact)),
            }
        }
        other => Err(type_error("Sum", "a List", &other)),
    }
}

fn list_sum_approx(_ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    match arg(args, 0) {
        Value::Nil => Ok(Value::Nil),
        Value::Range(range) => {
            let count = range.count as f64;
            Ok(Value::Number(count * range.start as f64 + count * (count - 1.0) / 2.0))
        }
        Value::List(items) => {
            let mut total = 0.0;
            for item in items.iter() {
                match item {
                    Value::Nil => {}
                    value => total += value.as_f64().ok_or_else(|| type_error("SumApprox", "numeric elements", value))?,
                }
            }
            Ok(Value::Number(total))
        }
        other => Err(type_error("SumApprox", "a List", &other)),
    }
}

fn count_arg(function: &str, value: &Value) -> Result<u64, EvalError> {
    Ok(expect_int(function, value)?.max(0).unsigned_abs())
}

fn list_take(_ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let n = count_arg("Take", &arg(args, 1))?;
    match arg(args, 0) {
        Value::Nil => Ok(Value::Nil),
        Value::Range(range) => Ok(Value::Range(RangeValue {
            start: range.start,
            count: range.count.min(n),
        })),
        Value::List(items) => {
            let n = usize::try_from(n).unwrap_or(usize::MAX).min(items.len());
            Ok(Value::list(&items[..n]))
        }
        other => Err(type_error("Take", "a List", &other)),
    }
}

fn list_skip(_ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let n = count_arg("Skip", &arg(args, 1))?;
    match arg(args, 0) {
        Value::Nil => Ok(Value::Nil),
        Value::Range(range) => {
            let skipped = range.count.min(n);
            let start = i64::try_from(skipped)
                .ok()
                .and_then(|s| range.start.checked_add(s))
                .ok_or_else(|| invalid("Skip", "range start overflows"))?;
            Ok(Value::Range(RangeValue {
                start,
                count: range.count - skipped,
            }))
        }
        Value::List(items) => {
            let n = usize::try_from(n).unwrap_or(usize::MAX).min(items.len());
            Ok(Value::list(&items[n..]))
        }
        other => Err(type_error("Skip", "a List", &other)),
    }
}

fn list_reverse(_ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let target = arg(args, 0);
    if let Value::String(s) = &target {
        return Ok(Value::string(s.chars().rev().collect::<String>()));
    }
    match items("Reverse", &target)? {
        Some(mut items) => {
            items.reverse();
            Ok(Value::list(items))
        }
        None => Ok(Value::Nil),
    }
}

/// First occurrence of each element, in order. Nil is kept once.
fn list_distinct(_ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let Some(items) = items("Distinct", &arg(args, 0))? else {
        return Ok(Value::Nil);
    };
    let mut seen: Vec<Value> = Vec::new();
    for item in items {
        if !seen.contains(&item) {
            seen.push(item);
        }
    }
    Ok(Value::list(seen))
}

fn list_contains(_ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let needle = arg(args, 1);
    match (arg(args, 0), &needle) {
        (Value::Nil, _) => Ok(Value::Bool(false)),
        (Value::String(s), Value::String(sub)) => Ok(Value::Bool(s.contains(&**sub))),
        (Value::String(_), Value::Nil) => Ok(Value::Bool(false)),
        (Value::Range(range), Value::Int(i)) => {
            let offset = i128::from(*i) - i128::from(range.start);
            Ok(Value::Bool(offset >= 0 && offset < i128::from(range.count)))
        }
        (Value::Range(_), _) => Ok(Value::Bool(false)),
        (Value::List(items), needle) => Ok(Value::Bool(items.iter().any(|item| item == needle))),
        (other, _) => Err(type_error("Contains", "a List or String", &other)),
    }
}

fn list_map(ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let target = arg(args, 0);
    let Some(seq) = elements("Map", &target)? else {
        return Ok(Value::Nil);
    };
    check_len("Map", seq.remaining())?;
    let f = arg(args, 1);
    let mut out = Vec::new();
    for (i, item) in (0..).zip(seq) {
        out.push(ev.call_fitted(&f, &[item, index_value(i)])?);
    }
    Ok(Value::list(out))
}

fn list_filter(ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let target = arg(args, 0);
    let Some(seq) = elements("Filter", &target)? else {
        return Ok(Value::Nil);
    };
    let f = arg(args, 1);
    let mut out = Vec::new();
    for (i, item) in (0..).zip(seq) {
        if truthy("Filter", ev.call_fitted(&f, &[item.clone(), index_value(i)])?)? {
            check_len("Filter", out.len() as u64 + 1)?;
            out.push(item);
        }
    }
    Ok(Value::list(out))
}

/// `Reduce(list, (acc, item) => ..., initial)`. Without an initial value the
/// first element seeds the accumulator.
fn list_reduce(ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let target = arg(args, 0);
    let Some(seq) = elements("Reduce", &target)? else {
        return Ok(Value::Nil);
    };
    let f = arg(args, 1);
    let mut iter = (0..).zip(seq);
    let mut acc = match args.get(2) {
        Some(initial) => initial.clone(),
        None => match iter.next() {
            Some((_, first)) => first,
            None => return Ok(Value::Nil),
        },
    };
    for (i, item) in iter {
        acc = ev.call_fitted(&f, &[acc, item, index_value(i)])?;
    }
    Ok(acc)
}

fn list_any(ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let target = arg(args, 0);
    let Some(seq) = elements("Any", &target)? else {
        return Ok(Value::Bool(false));
    };
    let f = arg(args, 1);
    for (i, item) in (0..).zip(seq) {
        if truthy("Any", ev.call_fitted(&f, &[item, index_value(i)])?)? {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

fn list_all(ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let target = arg(args, 0);
    let Some(seq) = elements("All", &target)? else {
        return Ok(Value::Bool(true));
    };
    let f = arg(args, 1);
    for (i, item) in (0..).zip(seq) {
        if !truthy("All", ev.call_fitted(&f, &[item, index_value(i)])?)? {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

/// `Sort(list)` orders naturally; `Sort(list, (a, b) => ...)` orders by the
/// sign of the comparator's numeric result. The sort is stable.
fn list_sort(ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let Some(mut items) = items("Sort", &arg(args, 0))? else {
        return Ok(Value::Nil);
    };
    let comparator = arg(args, 1);
    let mut failure: Option<EvalError> = None;

    items.sort_by(|a, b| {
        if failure.is_some() {
            return Ordering::Equal;
        }
        let ordering = if comparator.is_nil() {
            compare(a, b).ok_or_else(|| {
                EvalError::from(RuntimeError::type_mismatch(format!(
                    "Sort: cannot compare {} with {}",
                    a.type_name(),
                    b.type_name()
                )))
            })
        } else {
            ev.call(&comparator, &[a.clone(), b.clone()]).and_then(|result| {
                result
                    .as_f64()
                    .and_then(|x| x.partial_cmp(&0.0))
                    .ok_or_else(|| type_error("Sort", "a number from the comparator", &result))
            })
        };
        ordering.unwrap_or_else(|e| {
            failure = Some(e);
            Ordering::Equal
        })
    });

    match failure {
        Some(e) => Err(e),
        None => Ok(Value::list(items)),
    }
}
