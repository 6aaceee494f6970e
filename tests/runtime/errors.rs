//! Host-boundary behavior: uncaught exceptions, pause gate, malformed code

use std::rc::Rc;

use super::{push_number, push_string, uncaught_message, unit};
use protovm::bytecode::{Assembler, CodeKind, Instruction};
use protovm::{Engine, EngineError, JsValue};

#[test]
fn test_uncaught_reference_error_renders_name_and_message() {
    let mut asm = Assembler::new(CodeKind::Global);
    super::load(&mut asm, "no_such_name");
    let err = Engine::new().run(&unit(asm)).unwrap_err();
    assert_eq!(
        err.to_string(),
        "uncaught exception: ReferenceError: no_such_name is not defined"
    );
}

#[test]
fn test_thrown_primitives_pass_through() {
    let mut asm = Assembler::new(CodeKind::Global);
    push_string(&mut asm, "raw");
    asm.emit(Instruction::Throw);
    match Engine::new().run(&unit(asm)) {
        Err(EngineError::Uncaught { value }) => assert_eq!(value, JsValue::from("raw")),
        other => panic!("expected an uncaught exception, got {:?}", other),
    }
}

#[test]
fn test_calling_a_non_function_throws() {
    let mut asm = Assembler::new(CodeKind::Global);
    push_number(&mut asm, 5.0);
    asm.emit(Instruction::Call { argc: 0 });
    let message = uncaught_message(super::run(asm));
    assert!(message.contains("is not a function"), "{}", message);
}

#[test]
fn test_runaway_recursion_hits_the_stack_limit() {
    // function f() { return f(); } f()
    let mut body = Assembler::new(CodeKind::Function);
    body.emit(Instruction::Resolve { name: "f".into() });
    body.emit(Instruction::Call { argc: 0 });
    body.emit(Instruction::Return);

    let mut asm = Assembler::new(CodeKind::Global);
    asm.declare_function("f", Rc::new(body.finish()));
    asm.emit(Instruction::Resolve { name: "f".into() });
    asm.emit(Instruction::Call { argc: 0 });
    asm.emit(Instruction::PopEval);

    let mut engine = Engine::new();
    engine.set_max_stack_depth(64);
    match engine.run(&unit(asm)) {
        Err(EngineError::Uncaught { value }) => {
            let message = protovm::error::describe_thrown(&value);
            assert_eq!(message, "RangeError: Maximum call stack size exceeded");
        }
        other => panic!("expected an uncaught exception, got {:?}", other),
    }
}

#[test]
fn test_paused_engine_rejects_runs() {
    let mut asm = Assembler::new(CodeKind::Global);
    push_number(&mut asm, 1.0);
    asm.emit(Instruction::PopEval);
    let code = unit(asm);

    let mut engine = Engine::new();
    engine.pause();
    assert!(engine.is_paused());
    assert!(matches!(engine.run(&code), Err(EngineError::Paused)));

    engine.resume();
    assert_eq!(engine.run(&code).unwrap(), JsValue::Number(1.0));
}

#[test]
fn test_stack_underflow_reports_malformed_code() {
    let mut asm = Assembler::new(CodeKind::Global);
    asm.emit(Instruction::Pop);
    match Engine::new().run(&unit(asm)) {
        Err(EngineError::MalformedCode { reason }) => {
            assert_eq!(reason, "operand stack underflow");
        }
        other => panic!("expected malformed code, got {:?}", other),
    }
}

#[test]
fn test_missing_completion_marker_is_malformed() {
    let mut asm = Assembler::new(CodeKind::Global);
    push_number(&mut asm, 1.0);
    asm.emit(Instruction::EndFinally);
    assert!(matches!(
        Engine::new().run(&unit(asm)),
        Err(EngineError::MalformedCode { .. })
    ));
}
