//! Evaluation contexts.
//!
//! A `Context` owns the host services, the handle table and the limits for a
//! series of evaluations. Its lifecycle is:
//!
//! ```text
//! Created --register_host--> CallbacksRegistered --eval--> Ready --close--> Closed
//!    \________________________eval_________________________/
//! ```
//!
//! Host services can be replaced until the first evaluation. Every evaluation
//! starts from a fresh scope that only knows the built-ins; values from
//! earlier evaluations are reachable only through their handles.

use crate::api::{ContextOptions, Error};
use crate::bridge::{Handle, HandleTable, Kind, Marshaller, snapshot};
use crate::evaluator::Evaluator;
use crate::host::{Host, NoHost};
use crate::parser;
use crate::values::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Created,
    CallbacksRegistered,
    Ready,
    Closed,
}

pub struct Context {
    options: ContextOptions,
    state: State,
    host: Box<dyn Host>,
    table: HandleTable,
}

impl Context {
    /// Fails with `ResourceExceeded` when too many contexts are alive.
    pub fn new(options: ContextOptions) -> Result<Self, Error> {
        let table = HandleTable::new()?;
        tracing::debug!(tag = table.tag(), max_depth = options.max_depth, "context created");
        Ok(Self {
            options,
            state: State::Created,
            host: Box::new(NoHost),
            table,
        })
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn options(&self) -> &ContextOptions {
        &self.options
    }

    /// Install the services reachable from `file`, `dirlist`, `log` and
    /// friends. Only allowed before the first evaluation.
    pub fn register_host(&mut self, host: Box<dyn Host>) -> Result<(), Error> {
        match self.state {
            State::Created | State::CallbacksRegistered => {
                self.host = host;
                self.state = State::CallbacksRegistered;
                Ok(())
            }
            State::Ready => Err(Error::InvalidState(
                "host callbacks must be registered before the first evaluation".to_string(),
            )),
            State::Closed => Err(closed()),
        }
    }

    /// Parse and evaluate `source`.
    pub fn eval(&mut self, source: &str) -> Result<Value, Error> {
        if self.state == State::Closed {
            return Err(closed());
        }
        self.state = State::Ready;
        tracing::debug!(len = source.len(), "evaluating");
        let expr = parser::parse(source)?;
        let mut evaluator = Evaluator::new(self.options.evaluator(), &*self.host);
        Ok(evaluator.eval(&expr)?)
    }

    /// Evaluate `source` and keep the result behind a new handle.
    pub fn eval_to_handle(&mut self, source: &str) -> Result<Handle, Error> {
        let value = self.eval(source)?;
        self.table.allocate(value)
    }

    /// Evaluate `source` and return a JSON snapshot of the result.
    pub fn eval_json(&mut self, source: &str) -> Result<String, Error> {
        let value = self.eval(source)?;
        let mut evaluator = Evaluator::new(self.options.evaluator(), &*self.host);
        snapshot::to_json_string(&mut evaluator, &value)
    }

    /// Evaluate `callee` to a function and call it with `args`.
    pub fn call(&mut self, callee: &str, args: &[Handle]) -> Result<Handle, Error> {
        let function = self.eval(callee)?;
        if !matches!(function, Value::Function(_)) {
            return Err(Error::TypeMismatch(format!(
                "'{callee}' evaluated to {}, not a Function",
                Kind::of(&function)
            )));
        }
        let handle = self.table.allocate(function)?;
        let result = self.marshaller().call(handle, args);
        self.table.free(handle);
        result
    }

    /// Terminal. Drops every live value; later operations fail.
    pub fn close(&mut self) {
        if self.state != State::Closed {
            tracing::debug!(tag = self.table.tag(), live = self.table.live(), "context closed");
        }
        self.state = State::Closed;
        self.table.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.state == State::Closed
    }

    /// Release a handle. Unknown, zero and already freed handles are ignored.
    pub fn free(&mut self, handle: Handle) -> bool {
        self.table.free(handle)
    }

    /// Number of live handles.
    pub fn live(&self) -> usize {
        self.table.live()
    }

    /// Value behind a handle, shared with the table.
    pub fn resolve(&self, handle: Handle) -> Result<&Value, Error> {
        self.table.get(handle)
    }

    fn marshaller(&mut self) -> Marshaller<'_, '_> {
        Marshaller::new(
            &mut self.table,
            Evaluator::new(self.options.evaluator(), &*self.host),
        )
    }

    pub fn type_of(&mut self, handle: Handle) -> Result<Kind, Error> {
        self.marshaller().type_of(handle)
    }

    pub fn to_snapshot(&mut self, handle: Handle) -> Result<String, Error> {
        self.marshaller().to_snapshot(handle)
    }

    pub fn len(&mut self, handle: Handle) -> Result<u64, Error> {
        self.marshaller().len(handle)
    }

    pub fn index(&mut self, handle: Handle, index: i64) -> Result<Handle, Error> {
        self.marshaller().index(handle, index)
    }

    pub fn get_key(&mut self, handle: Handle, key: &str) -> Result<Handle, Error> {
        self.marshaller().get_key(handle, key)
    }

    pub fn keys(&mut self, handle: Handle) -> Result<String, Error> {
        self.marshaller().keys(handle)
    }

    pub fn range_info(&mut self, handle: Handle) -> Result<(i64, u64), Error> {
        self.marshaller().range_info(handle)
    }

    pub fn call_handle(&mut self, handle: Handle, args: &[Handle]) -> Result<Handle, Error> {
        self.marshaller().call(handle, args)
    }
}

fn closed() -> Error {
    Error::InvalidState("context is closed".to_string())
}
