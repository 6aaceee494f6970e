//! Integration tests for the runtime, organized by feature
//!
//! Programs are assembled by hand through the public bytecode contract and
//! executed through `Engine`, the same path a compiler front end would use.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod arrays;
mod basics;
mod errors;
mod functions;
mod objects;

use std::rc::Rc;

use protovm::bytecode::{Assembler, CodeUnit, Instruction, Literal};
use protovm::error::describe_thrown;
use protovm::{Engine, EngineError, JsValue};

pub fn unit(asm: Assembler) -> Rc<CodeUnit> {
    Rc::new(asm.finish())
}

pub fn run(asm: Assembler) -> Result<JsValue, EngineError> {
    Engine::new().run(&unit(asm))
}

pub fn run_ok(asm: Assembler) -> JsValue {
    run(asm).expect("program should complete")
}

/// Unwrap an uncaught exception into its rendered message.
pub fn uncaught_message(result: Result<JsValue, EngineError>) -> String {
    match result {
        Err(EngineError::Uncaught { value }) => describe_thrown(&value),
        other => panic!("expected an uncaught exception, got {:?}", other),
    }
}

pub fn push_number(asm: &mut Assembler, n: f64) {
    asm.emit(Instruction::Literal {
        value: Literal::Number(n),
    });
}

pub fn push_string(asm: &mut Assembler, s: &str) {
    asm.emit(Instruction::Literal {
        value: Literal::String(s.into()),
    });
}

/// Resolve an identifier and dereference it.
pub fn load(asm: &mut Assembler, name: &str) {
    asm.emit(Instruction::Resolve { name: name.into() });
    asm.emit(Instruction::GetValue);
}
