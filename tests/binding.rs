use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use funcscript::{
    Arg, Error, HostServices, Literal, ServiceError, StdFsServices, Value, Vm, VmOptions,
};
use indoc::indoc;
use pretty_assertions::assert_eq;

#[derive(Default)]
struct MemoryServices {
    files: HashMap<String, String>,
    lines: Rc<RefCell<Vec<String>>>,
}

impl HostServices for MemoryServices {
    fn file_read_text(&self, path: &str) -> Result<String, ServiceError> {
        match path {
            "/secret" => Err(ServiceError::with_code(4242, "denied")),
            _ => self
                .files
                .get(path)
                .cloned()
                .ok_or_else(|| ServiceError::new(format!("missing: {path}"))),
        }
    }

    fn file_exists(&self, path: &str) -> Result<bool, ServiceError> {
        Ok(self.files.contains_key(path))
    }

    fn is_file(&self, path: &str) -> Result<bool, ServiceError> {
        Ok(self.files.contains_key(path))
    }

    fn dir_list(&self, _path: &str) -> Result<Vec<String>, ServiceError> {
        let mut names: Vec<String> = self.files.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn log_line(&self, text: &str) {
        self.lines.borrow_mut().push(text.to_string());
    }
}

fn memory_vm() -> (Vm, Rc<RefCell<Vec<String>>>) {
    let mut services = MemoryServices::default();
    services
        .files
        .insert("/notes/a.txt".to_string(), "first".to_string());
    services
        .files
        .insert("/notes/b.txt".to_string(), "second".to_string());
    let lines = services.lines.clone();
    let vm = Vm::with_services(services, VmOptions::default()).unwrap();
    (vm, lines)
}

#[test]
fn test_scalars_are_copied_out() {
    let vm = Vm::new().unwrap();
    assert_eq!(vm.eval("1 + 2").unwrap(), Value::Int(3));
    assert_eq!(vm.eval("1.5 * 2").unwrap(), Value::Number(3.0));
    assert_eq!(vm.eval("'a' + 'b'").unwrap(), Value::String("ab".to_string()));
    assert_eq!(vm.eval("nil").unwrap(), Value::Nil);
    assert_eq!(vm.eval("1 < 2").unwrap(), Value::Bool(true));
    assert_eq!(
        vm.eval("ChangeType(\"AQID\", \"ByteArray\")").unwrap(),
        Value::Bytes(vec![1, 2, 3])
    );
    assert_eq!(
        vm.eval("Range(2, 3)").unwrap(),
        Value::Range { start: 2, count: 3 }
    );
}

#[test]
fn test_list_proxy() {
    let vm = Vm::new().unwrap();
    let value = vm.eval("[10, 20, 30, [1]]").unwrap();
    let list = value.as_list().unwrap();

    assert_eq!(list.len().unwrap(), 4);
    assert_eq!(list.get(0).unwrap(), Value::Int(10));
    assert_eq!(list.get(-2).unwrap(), Value::Int(30));
    assert!(matches!(list.get(-1).unwrap(), Value::List(_)));
    assert!(matches!(list.get(4), Err(Error::IndexOutOfRange { .. })));

    let middle: Vec<_> = list.slice(1..3).unwrap();
    assert_eq!(middle, [Value::Int(20), Value::Int(30)]);
    assert_eq!(list.slice(3..100).unwrap().len(), 1);

    let firsts: Vec<i64> = list
        .iter()
        .unwrap()
        .take(3)
        .map(|item| item.unwrap().as_i64().unwrap())
        .collect();
    assert_eq!(firsts, [10, 20, 30]);
    assert_eq!(list.to_vec().unwrap().len(), 4);
}

#[test]
fn test_collection_proxy() {
    let vm = Vm::new().unwrap();
    let value = vm.eval("{Name: 'Ada', born: 1815, tags: ['math']}").unwrap();
    let person = value.as_collection().unwrap();

    assert_eq!(person.keys().unwrap(), ["Name", "born", "tags"]);
    assert_eq!(person.get("name").unwrap().as_str(), Some("Ada"));
    assert!(person.contains_key("BORN").unwrap());
    assert!(!person.contains_key("died").unwrap());
    assert!(matches!(person.get("died"), Err(Error::KeyNotFound { .. })));
    assert_eq!(person.get_or("died", Value::Nil).unwrap(), Value::Nil);

    let map = person.to_map().unwrap();
    assert_eq!(map["born"], Value::Int(1815));
    assert_eq!(map["tags"].as_list().unwrap().len().unwrap(), 1);
}

#[test]
fn test_closed_proxies_reject_use() {
    let vm = Vm::new().unwrap();
    let value = vm.eval("[1, 2]").unwrap();
    let list = value.as_list().unwrap();
    list.close();
    list.close();
    assert!(list.is_closed());
    assert!(matches!(list.len(), Err(Error::InvalidHandle { .. })));
}

#[test]
fn test_calls() {
    let vm = Vm::new().unwrap();
    assert_eq!(
        vm.call("(a, b) => a * b", &[6i64.into(), 7i64.into()]).unwrap(),
        Value::Int(42)
    );

    let items = vm.eval("[1, 2, 3]").unwrap();
    let count = vm.call("(xs) => Len(xs)", &[Arg::from(&items)]).unwrap();
    assert_eq!(count, Value::Int(3));
    // The argument is still usable after the call.
    assert_eq!(items.as_list().unwrap().len().unwrap(), 3);

    let greet = vm.eval("(who) => 'hi ' + who").unwrap();
    let greet = greet.as_function().unwrap();
    assert_eq!(
        greet.call(&["Bob".into()]).unwrap(),
        Value::String("hi Bob".to_string())
    );
    assert!(matches!(greet.call(&[]), Err(Error::ArityMismatch { .. })));

    let literal: Literal = vec![1, 2].into();
    assert_eq!(
        vm.call("(xs) => Sum(xs)", &[literal.into()]).unwrap(),
        Value::Int(3)
    );
}

#[test]
fn test_call_errors() {
    let vm = Vm::new().unwrap();
    let err = vm.call("[1]", &[]).unwrap_err();
    assert_eq!(err.code(), 2007);

    let err = vm.call("(x) => x", &[f64::NAN.into()]).unwrap_err();
    assert!(matches!(err, Error::InvalidLiteral(_)));
}

#[test]
fn test_errors() {
    let vm = Vm::new().unwrap();
    let err = vm.eval("If(true, 1, )").unwrap_err();
    assert!(matches!(err, Error::Compile { .. }));
    assert_eq!(err.code(), 1000);
    assert_eq!(err.location().map(|(line, _)| line), Some(1));

    let err = vm.eval("1 / 0").unwrap_err();
    assert_eq!(err.code(), 2005);

    let err = vm.eval("nosuchthing").unwrap_err();
    assert!(matches!(err, Error::Runtime { code: 1, .. }));
}

#[test]
fn test_to_literal_snapshots_proxies() {
    let vm = Vm::new().unwrap();
    let value = vm.eval("{xs: [1, 2.5], f: (x) => x}").unwrap();
    let Literal::Map(map) = value.to_literal().unwrap() else {
        panic!("expected a map");
    };
    assert_eq!(map["xs"], Literal::List(vec![Literal::Int(1), Literal::Number(2.5)]));
    assert_eq!(
        map["f"],
        Literal::Function {
            name: "lambda".to_string(),
            arity: Some(1)
        }
    );

    let f = vm.eval("(x) => x").unwrap();
    assert_eq!(f.to_literal().unwrap_err().code(), 2007);
}

#[test]
fn test_host_services() {
    let (vm, lines) = memory_vm();
    let source = indoc! {r#"
        {
            text: file("/notes/a.txt");
            eval log(text + "!", "note");
        }
    "#};
    assert_eq!(vm.eval(source).unwrap(), Value::String("first!".to_string()));
    assert_eq!(lines.borrow().as_slice(), ["note: first!"]);

    assert_eq!(vm.eval("fileexists(\"/notes/b.txt\")").unwrap(), Value::Bool(true));
    assert_eq!(vm.eval("isfile(\"/nope\")").unwrap(), Value::Bool(false));
    assert_eq!(
        vm.eval_json("dirlist(\"/notes\")").unwrap(),
        serde_json::json!(["/notes/a.txt", "/notes/b.txt"])
    );

    let err = vm.eval("file(\"/missing\")").unwrap_err();
    assert_eq!(err.code(), 2601);
    assert_eq!(err.to_string(), "missing: /missing");

    let err = vm.eval("file(\"/secret\")").unwrap_err();
    assert!(matches!(err, Error::Callback { code: 4242, .. }));
    assert_eq!(err.to_string(), "denied");
}

#[test]
fn test_std_fs_services() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.txt");
    std::fs::write(&path, "12345").unwrap();
    let path = path.to_str().unwrap().replace('\\', "/");

    let vm = Vm::new().unwrap();
    let source = format!("file(\"{path}\")");
    assert_eq!(vm.eval(&source).unwrap(), Value::String("12345".to_string()));

    let small = Vm::with_services(StdFsServices::new(4), VmOptions::default()).unwrap();
    assert_eq!(small.eval(&source).unwrap_err().code(), 2601);
}

#[test]
fn test_depth_limit() {
    let vm = Vm::with_options(VmOptions {
        max_depth: 50,
        ..VmOptions::default()
    })
    .unwrap();
    let err = vm
        .eval("{f: (n) => if n = 0 then 0 else f(n - 1); eval f(500)}")
        .unwrap_err();
    assert!(matches!(err, Error::ResourceExceeded { .. }));
}

#[test]
fn test_default_depth_limit() {
    let vm = Vm::new().unwrap();
    let err = vm
        .eval("{f: (n) => if n = 0 then 0 else f(n - 1); eval f(100000)}")
        .unwrap_err();
    assert!(matches!(err, Error::ResourceExceeded { .. }));
    assert_eq!(err.code(), 2015);
    assert_eq!(vm.eval("Len(Range(1, 3))").unwrap(), Value::Int(3));
}

#[test]
fn test_eval_json() {
    let vm = Vm::new().unwrap();
    assert_eq!(
        vm.eval_json("{a: 1, b: [true, nil]}").unwrap(),
        serde_json::json!({"a": 1, "b": [true, null]})
    );
}

#[test]
fn test_default_vm() {
    assert_eq!(funcscript::eval("2 * 21").unwrap(), Literal::Int(42));
    assert_eq!(
        funcscript::eval("[1, 'x']").unwrap(),
        Literal::List(vec![Literal::Int(1), Literal::from("x")])
    );
    assert_eq!(
        funcscript::call("(a, b) => a - b", &[Literal::Int(5), Literal::Int(2)]).unwrap(),
        Literal::Int(3)
    );
    assert_eq!(funcscript::eval_json("'ok'").unwrap(), serde_json::json!("ok"));
}

#[test]
fn test_literals_round_trip_through_calls() {
    let vm = Vm::new().unwrap();
    let mut map = indexmap::IndexMap::new();
    map.insert("if".to_string(), Literal::from("kw"));
    map.insert("two words".to_string(), Literal::Bool(true));
    let echoed = funcscript::call("(x) => x", &[Literal::Map(map.clone())]).unwrap();
    assert_eq!(echoed, Literal::Map(map));

    let text = Literal::from("quote \" and \\ and\nnewline");
    let echoed = vm.call("(x) => x", &[text.clone().into()]).unwrap();
    assert_eq!(echoed.to_literal().unwrap(), text);
}
