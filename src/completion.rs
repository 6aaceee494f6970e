//! Completion records
//!
//! Every fallible abstract operation returns `Completion<T>`: either a plain
//! value or an abrupt completion. Abrupt completions propagate unchanged
//! through `?`, which is the "abrupt short-circuits" rule of the runtime.

use crate::value::{JsString, JsValue};

/// The non-normal completion kinds. Break/Continue/Return are non-local
/// control transfer; Throw is the sole error channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbruptKind {
    Break,
    Continue,
    Return,
    Throw,
}

/// An abrupt completion: kind, carried value, optional target label.
#[derive(Debug, Clone, PartialEq)]
pub struct AbruptCompletion {
    pub kind: AbruptKind,
    pub value: JsValue,
    pub target: Option<JsString>,
}

impl AbruptCompletion {
    pub fn throw(value: JsValue) -> Self {
        AbruptCompletion {
            kind: AbruptKind::Throw,
            value,
            target: None,
        }
    }

    pub fn return_value(value: JsValue) -> Self {
        AbruptCompletion {
            kind: AbruptKind::Return,
            value,
            target: None,
        }
    }

    pub fn break_loop(target: Option<JsString>) -> Self {
        AbruptCompletion {
            kind: AbruptKind::Break,
            value: JsValue::Undefined,
            target,
        }
    }

    pub fn continue_loop(target: Option<JsString>) -> Self {
        AbruptCompletion {
            kind: AbruptKind::Continue,
            value: JsValue::Undefined,
            target,
        }
    }

    pub fn is_throw(&self) -> bool {
        self.kind == AbruptKind::Throw
    }
}

/// Result of evaluating a construct: a value or an abrupt completion.
pub type Completion<T = JsValue> = Result<T, AbruptCompletion>;
