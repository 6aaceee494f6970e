//! Functions: declarations, closures, this binding, arguments objects

use std::rc::Rc;

use super::{load, push_number, run_ok, uncaught_message, unit};
use protovm::bytecode::{Assembler, BinaryOp, CodeKind, Instruction, UnaryOp};
use protovm::object;
use protovm::{CheapClone, Engine, JsValue, PropertyKey};

#[test]
fn test_var_declaration_end_to_end() {
    // var z = 20; z
    let mut asm = Assembler::new(CodeKind::Global);
    asm.declare_var("z");
    push_number(&mut asm, 20.0);
    asm.emit(Instruction::Var { name: "z".into() });
    load(&mut asm, "z");
    asm.emit(Instruction::PopEval);

    let mut engine = Engine::new();
    assert_eq!(engine.run(&unit(asm)).unwrap(), JsValue::Number(20.0));

    // the var landed on the global object
    let desc = object::get_own_property(&engine.global(), &PropertyKey::from("z")).unwrap();
    assert_eq!(desc.value, Some(JsValue::Number(20.0)));
    assert_eq!(desc.configurable, Some(false));
}

#[test]
fn test_eval_vars_are_deletable() {
    // in eval text: var tmp = 1; delete tmp
    let mut asm = Assembler::new(CodeKind::Eval);
    asm.declare_var("tmp");
    push_number(&mut asm, 1.0);
    asm.emit(Instruction::Var { name: "tmp".into() });
    asm.emit(Instruction::Resolve { name: "tmp".into() });
    asm.emit(Instruction::Unary {
        op: UnaryOp::Delete,
    });
    asm.emit(Instruction::PopEval);
    assert_eq!(run_ok(asm), JsValue::Boolean(true));
}

#[test]
fn test_global_vars_are_not_deletable() {
    let mut asm = Assembler::new(CodeKind::Global);
    asm.declare_var("tmp");
    push_number(&mut asm, 1.0);
    asm.emit(Instruction::Var { name: "tmp".into() });
    asm.emit(Instruction::Resolve { name: "tmp".into() });
    asm.emit(Instruction::Unary {
        op: UnaryOp::Delete,
    });
    asm.emit(Instruction::Pop);
    load(&mut asm, "tmp");
    asm.emit(Instruction::PopEval);
    // the delete fails and the binding survives
    assert_eq!(run_ok(asm), JsValue::Number(1.0));
}

#[test]
fn test_lexical_read_before_initialization() {
    let mut asm = Assembler::new(CodeKind::Global);
    asm.declare_lexical("x", false);
    load(&mut asm, "x");
    asm.emit(Instruction::PopEval);
    let message = uncaught_message(super::run(asm));
    assert_eq!(
        message,
        "ReferenceError: Cannot access 'x' before initialization"
    );
}

#[test]
fn test_const_reads_after_initialization() {
    let mut asm = Assembler::new(CodeKind::Global);
    asm.declare_lexical("c", true);
    push_number(&mut asm, 7.0);
    asm.emit(Instruction::Const { name: "c".into() });
    load(&mut asm, "c");
    asm.emit(Instruction::PopEval);
    assert_eq!(run_ok(asm), JsValue::Number(7.0));
}

#[test]
fn test_const_assignment_rejected() {
    let mut asm = Assembler::new(CodeKind::Global);
    asm.set_strict(true);
    asm.declare_lexical("c", true);
    push_number(&mut asm, 1.0);
    asm.emit(Instruction::Const { name: "c".into() });
    asm.emit(Instruction::Resolve { name: "c".into() });
    push_number(&mut asm, 2.0);
    asm.emit(Instruction::PutValue);
    let message = uncaught_message(super::run(asm));
    assert_eq!(message, "TypeError: Assignment to constant variable.");
}

#[test]
fn test_hoisted_function_declaration() {
    // function twice(x) { return x * 2; } twice(21)
    let mut body = Assembler::new(CodeKind::Function);
    body.set_name("twice");
    body.add_param("x");
    load(&mut body, "x");
    push_number(&mut body, 2.0);
    body.emit(Instruction::Binary { op: BinaryOp::Mul });
    body.emit(Instruction::Return);

    let mut asm = Assembler::new(CodeKind::Global);
    asm.declare_function("twice", Rc::new(body.finish()));
    asm.emit(Instruction::Resolve {
        name: "twice".into(),
    });
    push_number(&mut asm, 21.0);
    asm.emit(Instruction::Call { argc: 1 });
    asm.emit(Instruction::PopEval);
    assert_eq!(run_ok(asm), JsValue::Number(42.0));
}

#[test]
fn test_missing_arguments_are_undefined() {
    let mut body = Assembler::new(CodeKind::Function);
    body.add_param("a");
    body.add_param("b");
    load(&mut body, "b");
    body.emit(Instruction::Unary { op: UnaryOp::Typeof });
    body.emit(Instruction::Return);

    let mut asm = Assembler::new(CodeKind::Global);
    asm.emit(Instruction::Function {
        code: Rc::new(body.finish()),
    });
    push_number(&mut asm, 1.0);
    asm.emit(Instruction::Call { argc: 1 });
    asm.emit(Instruction::PopEval);
    assert_eq!(run_ok(asm), JsValue::from("undefined"));
}

// f(a) { arguments[0] = 99; return a; } as a strict or non-strict body
fn write_through_arguments(strict: bool) -> JsValue {
    let mut body = Assembler::new(CodeKind::Function);
    body.set_strict(strict);
    body.add_param("a");
    load(&mut body, "arguments");
    push_number(&mut body, 0.0);
    body.emit(Instruction::Element);
    push_number(&mut body, 99.0);
    body.emit(Instruction::PutValue);
    body.emit(Instruction::Pop);
    load(&mut body, "a");
    body.emit(Instruction::Return);

    let mut asm = Assembler::new(CodeKind::Global);
    asm.emit(Instruction::Function {
        code: Rc::new(body.finish()),
    });
    push_number(&mut asm, 5.0);
    asm.emit(Instruction::Call { argc: 1 });
    asm.emit(Instruction::PopEval);
    run_ok(asm)
}

#[test]
fn test_mapped_arguments_alias_parameters() {
    assert_eq!(write_through_arguments(false), JsValue::Number(99.0));
}

#[test]
fn test_strict_arguments_are_a_snapshot() {
    assert_eq!(write_through_arguments(true), JsValue::Number(5.0));
}

#[test]
fn test_parameter_write_reflects_into_mapped_arguments() {
    // f(a) { a = 42; return arguments[0]; }
    let mut body = Assembler::new(CodeKind::Function);
    body.add_param("a");
    body.emit(Instruction::Resolve { name: "a".into() });
    push_number(&mut body, 42.0);
    body.emit(Instruction::PutValue);
    body.emit(Instruction::Pop);
    load(&mut body, "arguments");
    push_number(&mut body, 0.0);
    body.emit(Instruction::Element);
    body.emit(Instruction::GetValue);
    body.emit(Instruction::Return);

    let mut asm = Assembler::new(CodeKind::Global);
    asm.emit(Instruction::Function {
        code: Rc::new(body.finish()),
    });
    push_number(&mut asm, 5.0);
    asm.emit(Instruction::Call { argc: 1 });
    asm.emit(Instruction::PopEval);
    assert_eq!(run_ok(asm), JsValue::Number(42.0));
}

#[test]
fn test_arguments_callee_in_sloppy_functions() {
    let mut body = Assembler::new(CodeKind::Function);
    load(&mut body, "arguments");
    body.emit(Instruction::Property {
        name: "callee".into(),
    });
    body.emit(Instruction::Unary { op: UnaryOp::Typeof });
    body.emit(Instruction::Return);

    let mut asm = Assembler::new(CodeKind::Global);
    asm.emit(Instruction::Function {
        code: Rc::new(body.finish()),
    });
    asm.emit(Instruction::Call { argc: 0 });
    asm.emit(Instruction::PopEval);
    assert_eq!(run_ok(asm), JsValue::from("function"));
}

#[test]
fn test_named_function_expression_self_reference() {
    let mut body = Assembler::new(CodeKind::Function);
    body.set_name("again");
    body.emit(Instruction::Resolve {
        name: "again".into(),
    });
    body.emit(Instruction::Unary { op: UnaryOp::Typeof });
    body.emit(Instruction::Return);

    let mut asm = Assembler::new(CodeKind::Global);
    asm.emit(Instruction::Function {
        code: Rc::new(body.finish()),
    });
    asm.emit(Instruction::Call { argc: 0 });
    asm.emit(Instruction::PopEval);
    assert_eq!(run_ok(asm), JsValue::from("function"));
}

#[test]
fn test_closure_captures_outer_var() {
    // function make() { var n = 0; return function () { return n = n + 1; }; }
    let mut inner = Assembler::new(CodeKind::Function);
    inner.emit(Instruction::Resolve { name: "n".into() });
    load(&mut inner, "n");
    push_number(&mut inner, 1.0);
    inner.emit(Instruction::Binary { op: BinaryOp::Add });
    inner.emit(Instruction::PutValue);
    inner.emit(Instruction::Return);

    let mut outer = Assembler::new(CodeKind::Function);
    outer.declare_var("n");
    push_number(&mut outer, 0.0);
    outer.emit(Instruction::Var { name: "n".into() });
    outer.emit(Instruction::Function {
        code: Rc::new(inner.finish()),
    });
    outer.emit(Instruction::Return);

    // var inc = make(); inc(); inc()
    let mut asm = Assembler::new(CodeKind::Global);
    asm.declare_var("inc");
    asm.emit(Instruction::Function {
        code: Rc::new(outer.finish()),
    });
    asm.emit(Instruction::Call { argc: 0 });
    asm.emit(Instruction::Var { name: "inc".into() });
    asm.emit(Instruction::Resolve { name: "inc".into() });
    asm.emit(Instruction::Call { argc: 0 });
    asm.emit(Instruction::Pop);
    asm.emit(Instruction::Resolve { name: "inc".into() });
    asm.emit(Instruction::Call { argc: 0 });
    asm.emit(Instruction::PopEval);
    assert_eq!(run_ok(asm), JsValue::Number(2.0));
}

#[test]
fn test_construct_allocates_from_prototype() {
    // function Point() { this.v = 1; } p = new Point(); p.v, p instanceof Point
    let mut ctor = Assembler::new(CodeKind::Function);
    ctor.emit(Instruction::This);
    ctor.emit(Instruction::Property { name: "v".into() });
    push_number(&mut ctor, 1.0);
    ctor.emit(Instruction::PutValue);
    ctor.emit(Instruction::Pop);
    let ctor = Rc::new(ctor.finish());

    let mut asm = Assembler::new(CodeKind::Global);
    asm.emit(Instruction::Function {
        code: ctor.cheap_clone(),
    });
    asm.emit(Instruction::Construct { argc: 0 });
    asm.emit(Instruction::Property { name: "v".into() });
    asm.emit(Instruction::GetValue);
    asm.emit(Instruction::PopEval);
    assert_eq!(run_ok(asm), JsValue::Number(1.0));

    let mut asm = Assembler::new(CodeKind::Global);
    asm.emit(Instruction::Function {
        code: ctor.cheap_clone(),
    });
    asm.emit(Instruction::Dup);
    asm.emit(Instruction::Construct { argc: 0 });
    asm.emit(Instruction::Rotate { count: 2 });
    asm.emit(Instruction::Binary {
        op: BinaryOp::Instanceof,
    });
    asm.emit(Instruction::PopEval);
    assert_eq!(run_ok(asm), JsValue::Boolean(true));
}
