//! Array literals and the length invariant

use super::{push_number, push_string, uncaught_message, unit};
use protovm::bytecode::{Assembler, CodeKind, Instruction};
use protovm::object;
use protovm::{Engine, JsValue, PropertyKey};

fn array_from_global(engine: &Engine, name: &str) -> protovm::JsObjectRef {
    let desc = object::get_own_property(&engine.global(), &PropertyKey::from(name))
        .expect("binding should exist");
    match desc.value {
        Some(JsValue::Object(obj)) => obj,
        other => panic!("expected an array object, got {:?}", other),
    }
}

#[test]
fn test_literal_with_elision() {
    // var a = ["x", , "y"]
    let mut asm = Assembler::new(CodeKind::Global);
    asm.declare_var("a");
    asm.emit(Instruction::Array);
    push_string(&mut asm, "x");
    asm.emit(Instruction::Index { empty: false });
    asm.emit(Instruction::Index { empty: true });
    push_string(&mut asm, "y");
    asm.emit(Instruction::Index { empty: false });
    asm.emit(Instruction::ArrayDone);
    asm.emit(Instruction::Var { name: "a".into() });

    let mut engine = Engine::new();
    engine.run(&unit(asm)).unwrap();
    let arr = array_from_global(&engine, "a");

    let length = object::get_own_property(&arr, &PropertyKey::from("length")).unwrap();
    assert_eq!(length.value, Some(JsValue::Number(3.0)));
    assert!(object::get_own_property(&arr, &PropertyKey::Index(1)).is_none());
    let last = object::get_own_property(&arr, &PropertyKey::Index(2)).unwrap();
    assert_eq!(last.value, Some(JsValue::from("y")));
}

#[test]
fn test_shrinking_length_deletes_elements() {
    // var a = ["x", "y"]; a.length = 1
    let mut asm = Assembler::new(CodeKind::Global);
    asm.declare_var("a");
    asm.emit(Instruction::Array);
    push_string(&mut asm, "x");
    asm.emit(Instruction::Index { empty: false });
    push_string(&mut asm, "y");
    asm.emit(Instruction::Index { empty: false });
    asm.emit(Instruction::ArrayDone);
    asm.emit(Instruction::Var { name: "a".into() });
    super::load(&mut asm, "a");
    asm.emit(Instruction::Property {
        name: "length".into(),
    });
    push_number(&mut asm, 1.0);
    asm.emit(Instruction::PutValue);
    asm.emit(Instruction::Pop);

    let mut engine = Engine::new();
    engine.run(&unit(asm)).unwrap();
    let arr = array_from_global(&engine, "a");

    let length = object::get_own_property(&arr, &PropertyKey::from("length")).unwrap();
    assert_eq!(length.value, Some(JsValue::Number(1.0)));
    assert!(object::get_own_property(&arr, &PropertyKey::Index(0)).is_some());
    assert!(object::get_own_property(&arr, &PropertyKey::Index(1)).is_none());
}

#[test]
fn test_index_write_past_length_grows_it() {
    // var a = []; a[4] = "far"
    let mut asm = Assembler::new(CodeKind::Global);
    asm.declare_var("a");
    asm.emit(Instruction::Array);
    asm.emit(Instruction::ArrayDone);
    asm.emit(Instruction::Var { name: "a".into() });
    super::load(&mut asm, "a");
    push_number(&mut asm, 4.0);
    asm.emit(Instruction::Element);
    push_string(&mut asm, "far");
    asm.emit(Instruction::PutValue);
    asm.emit(Instruction::Pop);

    let mut engine = Engine::new();
    engine.run(&unit(asm)).unwrap();
    let arr = array_from_global(&engine, "a");
    let length = object::get_own_property(&arr, &PropertyKey::from("length")).unwrap();
    assert_eq!(length.value, Some(JsValue::Number(5.0)));
}

#[test]
fn test_invalid_length_write_throws() {
    // [].length = -1
    let mut asm = Assembler::new(CodeKind::Global);
    asm.emit(Instruction::Array);
    asm.emit(Instruction::Pop);
    asm.emit(Instruction::Property {
        name: "length".into(),
    });
    push_number(&mut asm, -1.0);
    asm.emit(Instruction::PutValue);
    let message = uncaught_message(super::run(asm));
    assert_eq!(message, "RangeError: Invalid array length");
}
