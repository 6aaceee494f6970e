//! A bytecode runtime for a prototype-based dynamic language
//!
//! The crate executes compiled [`bytecode::CodeUnit`]s against a realm: a
//! global object, its intrinsic prototype graph, and an explicit
//! execution-context stack. The semantic core is completion records
//! ([`completion`]), assignable references ([`reference`]), the property
//! descriptor model ([`descriptor`], [`object`]), and environment records
//! ([`environment`]); a stack machine ([`interpreter::vm`]) drives them.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use protovm::bytecode::{Assembler, BinaryOp, CodeKind, Instruction, Literal};
//! use protovm::{Engine, JsValue};
//!
//! let mut asm = Assembler::new(CodeKind::Global);
//! asm.emit(Instruction::Literal { value: Literal::Number(1.0) });
//! asm.emit(Instruction::Literal { value: Literal::Number(2.0) });
//! asm.emit(Instruction::Binary { op: BinaryOp::Add });
//! asm.emit(Instruction::PopEval);
//! let code = Rc::new(asm.finish());
//!
//! let mut engine = Engine::new();
//! assert_eq!(engine.run(&code).unwrap(), JsValue::Number(3.0));
//! ```

pub mod bytecode;
pub mod completion;
pub mod context;
pub mod descriptor;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod object;
pub mod reference;
pub mod value;

pub use completion::{AbruptCompletion, AbruptKind, Completion};
pub use descriptor::PropertyDescriptor;
pub use error::EngineError;
pub use interpreter::{ErrorKind, Interpreter};
pub use object::{JsObject, JsObjectRef, NativeFn};
pub use reference::Reference;
pub use value::{CheapClone, JsString, JsValue, PropertyKey};

use std::rc::Rc;

use bytecode::CodeUnit;

/// The host entry point: one realm plus an advisory pause gate. Pausing
/// never interrupts running code; it only rejects new top-level runs.
pub struct Engine {
    interpreter: Interpreter,
    paused: bool,
}

impl Engine {
    pub fn new() -> Self {
        Engine {
            interpreter: Interpreter::new(),
            paused: false,
        }
    }

    /// Run a global or eval code unit to completion.
    pub fn run(&mut self, code: &Rc<CodeUnit>) -> Result<JsValue, EngineError> {
        if self.paused {
            return Err(EngineError::Paused);
        }
        match self.interpreter.run_code(code) {
            Ok(value) => Ok(value),
            Err(abrupt) => match abrupt.kind {
                AbruptKind::Throw => Err(EngineError::Uncaught {
                    value: abrupt.value,
                }),
                AbruptKind::Return => Err(EngineError::MalformedCode {
                    reason: "return completion escaped a top-level unit".to_string(),
                }),
                AbruptKind::Break | AbruptKind::Continue => Err(EngineError::MalformedCode {
                    reason: abrupt.value.to_js_string_primitive().to_string(),
                }),
            },
        }
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_max_stack_depth(&mut self, depth: usize) {
        self.interpreter.set_max_stack_depth(depth);
    }

    /// The realm's global object, for hosts installing bindings.
    pub fn global(&self) -> JsObjectRef {
        self.interpreter.realm.global.cheap_clone()
    }

    /// Direct interpreter access for native functions and tests.
    pub fn interpreter(&mut self) -> &mut Interpreter {
        &mut self.interpreter
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
