//! File system built-ins, served by the host.

use crate::{
    evaluator::{EvalError, Evaluator},
    stdlib::{arg, expect_str},
    values::{NativeFunction, Value},
};

pub(super) const FUNCTIONS: &[NativeFunction] = &[
    NativeFunction::new("file", Some(1), os_file),
    NativeFunction::new("fileexists", Some(1), os_file_exists),
    NativeFunction::new("isfile", Some(1), os_is_file),
    NativeFunction::new("dirlist", Some(1), os_dir_list),
];

fn os_file(ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let path = arg(args, 0);
    if path.is_nil() {
        return Ok(Value::Nil);
    }
    let text = ev.host().file_read_text(expect_str("file", &path)?)?;
    Ok(Value::string(text))
}

fn os_file_exists(ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let path = arg(args, 0);
    if path.is_nil() {
        return Ok(Value::Bool(false));
    }
    Ok(Value::Bool(ev.host().file_exists(expect_str("fileexists", &path)?)?))
}

fn os_is_file(ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let path = arg(args, 0);
    if path.is_nil() {
        return Ok(Value::Bool(false));
    }
    Ok(Value::Bool(ev.host().is_file(expect_str("isfile", &path)?)?))
}

fn os_dir_list(ev: &mut Evaluator<'_>, args: &[Value]) -> Result<Value, EvalError> {
    let path = arg(args, 0);
    if path.is_nil() {
        return Ok(Value::Nil);
    }
    let entries = ev.host().dir_list(expect_str("dirlist", &path)?)?;
    Ok(Value::list(
        entries.into_iter().map(Value::string).collect::<Vec<_>>(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{NoHost, StdHost};
    use crate::{evaluator, parser};
    use pretty_assertions::assert_eq;

    fn eval_with(host: &dyn crate::host::Host, source: &str) -> Result<Value, EvalError> {
        let expr = parser::parse(source).unwrap();
        evaluator::eval(&expr, host, Default::default())
    }

    #[test]
    fn test_os_functions_through_std_host() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, "hello").unwrap();
        let sub = dir.path().join("d");
        std::fs::create_dir(&sub).unwrap();

        let host = StdHost::default();
        let base = dir.path().to_string_lossy().into_owned();
        let file = file.to_string_lossy().into_owned();
        let sub = sub.to_string_lossy().into_owned();

        let eval = |source: String| eval_with(&host, &source).unwrap();
        assert_eq!(eval(format!("file('{file}')")), Value::string("hello"));
        assert_eq!(eval(format!("fileexists('{file}')")), Value::Bool(true));
        assert_eq!(eval(format!("isfile('{file}')")), Value::Bool(true));
        assert_eq!(eval(format!("isfile('{sub}')")), Value::Bool(false));
        assert_eq!(eval(format!("Len(dirlist('{base}'))")), Value::Int(2));
        assert_eq!(eval(format!("Contains(dirlist('{base}'), '{sub}')")), Value::Bool(true));
    }

    #[test]
    fn test_missing_host_is_a_callback_error() {
        let err = eval_with(&NoHost, "file('x.txt')").unwrap_err();
        assert_eq!(err.code(), evaluator::codes::HOST_FILE);
        assert_eq!(err.to_string(), "host callback not registered");
    }

    #[test]
    fn test_chain_operator_skips_host_call_on_nil() {
        assert_eq!(
            eval_with(&NoHost, "nil ?! file('definitely-does-not-exist')").unwrap(),
            Value::Nil
        );
    }
}
