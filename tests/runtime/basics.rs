//! Expression-level behavior: operators, coercions, typeof, conditionals

use super::{push_number, push_string, run_ok};
use protovm::bytecode::{Assembler, BinaryOp, CodeKind, Instruction, Literal, UnaryOp};
use protovm::JsValue;

fn binary(op: BinaryOp, build: impl Fn(&mut Assembler)) -> JsValue {
    let mut asm = Assembler::new(CodeKind::Global);
    build(&mut asm);
    asm.emit(Instruction::Binary { op });
    asm.emit(Instruction::PopEval);
    run_ok(asm)
}

#[test]
fn test_arithmetic() {
    let result = binary(BinaryOp::Sub, |asm| {
        push_number(asm, 10.0);
        push_number(asm, 4.0);
    });
    assert_eq!(result, JsValue::Number(6.0));

    let result = binary(BinaryOp::Mod, |asm| {
        push_number(asm, 7.0);
        push_number(asm, 4.0);
    });
    assert_eq!(result, JsValue::Number(3.0));
}

#[test]
fn test_string_concatenation() {
    let result = binary(BinaryOp::Add, |asm| {
        push_string(asm, "n = ");
        push_number(asm, 4.0);
    });
    assert_eq!(result, JsValue::from("n = 4"));
}

#[test]
fn test_comparison_and_equality() {
    let result = binary(BinaryOp::Lt, |asm| {
        push_number(asm, 1.0);
        push_number(asm, 2.0);
    });
    assert_eq!(result, JsValue::Boolean(true));

    // loose equality coerces across types
    let result = binary(BinaryOp::Eq, |asm| {
        push_number(asm, 1.0);
        push_string(asm, "1");
    });
    assert_eq!(result, JsValue::Boolean(true));

    let result = binary(BinaryOp::StrictEq, |asm| {
        push_number(asm, 1.0);
        push_string(asm, "1");
    });
    assert_eq!(result, JsValue::Boolean(false));
}

#[test]
fn test_bitwise_wraps_to_int32() {
    let result = binary(BinaryOp::UShr, |asm| {
        push_number(asm, -1.0);
        push_number(asm, 0.0);
    });
    assert_eq!(result, JsValue::Number(4294967295.0));
}

#[test]
fn test_typeof_unresolvable_identifier() {
    let mut asm = Assembler::new(CodeKind::Global);
    asm.emit(Instruction::Resolve {
        name: "no_such_name".into(),
    });
    asm.emit(Instruction::Unary { op: UnaryOp::Typeof });
    asm.emit(Instruction::PopEval);
    assert_eq!(run_ok(asm), JsValue::from("undefined"));
}

#[test]
fn test_top_level_this_is_the_global_object() {
    let mut asm = Assembler::new(CodeKind::Global);
    asm.emit(Instruction::This);
    asm.emit(Instruction::Unary { op: UnaryOp::Typeof });
    asm.emit(Instruction::PopEval);
    assert_eq!(run_ok(asm), JsValue::from("object"));
}

#[test]
fn test_conditional_branches() {
    // 0 ? "then" : "else"
    let mut asm = Assembler::new(CodeKind::Global);
    let alt = asm.new_label();
    let done = asm.new_label();
    push_number(&mut asm, 0.0);
    asm.emit_jump_false(alt);
    push_string(&mut asm, "then");
    asm.emit_jump(done);
    asm.bind(alt);
    push_string(&mut asm, "else");
    asm.bind(done);
    asm.emit(Instruction::PopEval);
    assert_eq!(run_ok(asm), JsValue::from("else"));
}

#[test]
fn test_void_and_null_literals() {
    let mut asm = Assembler::new(CodeKind::Global);
    asm.emit(Instruction::Literal {
        value: Literal::Null,
    });
    asm.emit(Instruction::Unary { op: UnaryOp::Void });
    asm.emit(Instruction::PopEval);
    assert_eq!(run_ok(asm), JsValue::Undefined);
}
