//! Command registry consumed by restorable trackers to re-create widgets.

use std::{cell::RefCell, collections::BTreeMap, future::Future, rc::Rc};

use futures::{future::LocalBoxFuture, FutureExt};
use serde_json::Value;
use thiserror::Error;

/// Boxed future returned by command execution.
pub type CommandFuture = LocalBoxFuture<'static, Result<Value, CommandError>>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Command registration and execution failures.
pub enum CommandError {
    /// No command is registered under the id.
    #[error("command `{0}` is not registered")]
    NotFound(String),
    /// A command is already registered under the id.
    #[error("command `{0}` is already registered")]
    Duplicate(String),
    /// The command ran and reported a failure.
    #[error("command `{command}` failed: {message}")]
    Failed {
        /// Command id.
        command: String,
        /// Failure description reported by the handler.
        message: String,
    },
}

/// Executes named commands with JSON arguments.
pub trait CommandRegistry {
    /// Returns `true` when `id` is registered.
    fn has_command(&self, id: &str) -> bool;

    /// Executes `id` with `args`.
    fn execute(&self, id: &str, args: Value) -> CommandFuture;
}

type Handler = Rc<dyn Fn(Value) -> CommandFuture>;

#[derive(Clone, Default)]
/// In-process command registry backed by async closures. Clones share registrations.
pub struct Commands {
    handlers: Rc<RefCell<BTreeMap<String, Handler>>>,
}

impl Commands {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Duplicate`] when `id` is already registered.
    pub fn add_command<F, Fut>(&self, id: impl Into<String>, handler: F) -> Result<(), CommandError>
    where
        F: Fn(Value) -> Fut + 'static,
        Fut: Future<Output = Result<Value, CommandError>> + 'static,
    {
        let id = id.into();
        let mut handlers = self.handlers.borrow_mut();
        if handlers.contains_key(&id) {
            return Err(CommandError::Duplicate(id));
        }
        handlers.insert(id, Rc::new(move |args| handler(args).boxed_local()));
        Ok(())
    }

    /// Removes a command. Returns `false` when it was not registered.
    pub fn remove_command(&self, id: &str) -> bool {
        self.handlers.borrow_mut().remove(id).is_some()
    }

    /// Registered command ids in ascending order.
    pub fn list_commands(&self) -> Vec<String> {
        self.handlers.borrow().keys().cloned().collect()
    }
}

impl CommandRegistry for Commands {
    fn has_command(&self, id: &str) -> bool {
        self.handlers.borrow().contains_key(id)
    }

    fn execute(&self, id: &str, args: Value) -> CommandFuture {
        let handler = self.handlers.borrow().get(id).cloned();
        match handler {
            Some(handler) => handler(args),
            None => {
                let id = id.to_string();
                async move { Err(CommandError::NotFound(id)) }.boxed_local()
            }
        }
    }
}

impl std::fmt::Debug for Commands {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Commands")
            .field("commands", &self.list_commands())
            .finish()
    }
}
