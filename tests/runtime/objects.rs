//! Object literals, accessors, prototype writes, super lookup

use std::rc::Rc;

use super::{push_number, run_ok, uncaught_message};
use protovm::bytecode::{Assembler, CodeKind, Instruction, UnaryOp};
use protovm::descriptor::PropertyDescriptor;
use protovm::object::{self, JsObject};
use protovm::{CheapClone, Engine, JsValue, PropertyKey};

#[test]
fn test_method_call_binds_this_to_the_base() {
    // ({ x: 7, m() { return this.x; } }).m()
    let mut method = Assembler::new(CodeKind::Function);
    method.emit(Instruction::This);
    method.emit(Instruction::Property { name: "x".into() });
    method.emit(Instruction::GetValue);
    method.emit(Instruction::Return);

    let mut asm = Assembler::new(CodeKind::Global);
    asm.emit(Instruction::Object);
    push_number(&mut asm, 7.0);
    asm.emit(Instruction::DefineMember { name: "x".into() });
    asm.emit(Instruction::DefineMethod {
        name: "m".into(),
        code: Rc::new(method.finish()),
    });
    asm.emit(Instruction::Property { name: "m".into() });
    asm.emit(Instruction::Call { argc: 0 });
    asm.emit(Instruction::PopEval);
    assert_eq!(run_ok(asm), JsValue::Number(7.0));
}

#[test]
fn test_getter_runs_against_the_receiver() {
    // ({ hidden: 41, get g() { return this.hidden; } }).g
    let mut getter = Assembler::new(CodeKind::Function);
    getter.emit(Instruction::This);
    getter.emit(Instruction::Property {
        name: "hidden".into(),
    });
    getter.emit(Instruction::GetValue);
    getter.emit(Instruction::Return);

    let mut asm = Assembler::new(CodeKind::Global);
    asm.emit(Instruction::Object);
    push_number(&mut asm, 41.0);
    asm.emit(Instruction::DefineMember {
        name: "hidden".into(),
    });
    asm.emit(Instruction::DefineGetter {
        name: "g".into(),
        code: Rc::new(getter.finish()),
    });
    asm.emit(Instruction::Property { name: "g".into() });
    asm.emit(Instruction::GetValue);
    asm.emit(Instruction::PopEval);
    assert_eq!(run_ok(asm), JsValue::Number(41.0));
}

#[test]
fn test_setter_receives_the_assigned_value() {
    // obj = { set s(v) { this.stored = v; } }; obj.s = 9; obj.stored
    let mut setter = Assembler::new(CodeKind::Function);
    setter.add_param("v");
    setter.emit(Instruction::This);
    setter.emit(Instruction::Property {
        name: "stored".into(),
    });
    super::load(&mut setter, "v");
    setter.emit(Instruction::PutValue);
    setter.emit(Instruction::Pop);

    let mut asm = Assembler::new(CodeKind::Global);
    asm.emit(Instruction::Object);
    asm.emit(Instruction::DefineSetter {
        name: "s".into(),
        code: Rc::new(setter.finish()),
    });
    asm.emit(Instruction::Dup);
    asm.emit(Instruction::Property { name: "s".into() });
    push_number(&mut asm, 9.0);
    asm.emit(Instruction::PutValue);
    asm.emit(Instruction::Pop);
    asm.emit(Instruction::Property {
        name: "stored".into(),
    });
    asm.emit(Instruction::GetValue);
    asm.emit(Instruction::PopEval);
    assert_eq!(run_ok(asm), JsValue::Number(9.0));
}

#[test]
fn test_delete_removes_configurable_properties() {
    let mut asm = Assembler::new(CodeKind::Global);
    asm.emit(Instruction::Object);
    push_number(&mut asm, 1.0);
    asm.emit(Instruction::DefineMember { name: "x".into() });
    asm.emit(Instruction::Dup);
    asm.emit(Instruction::Property { name: "x".into() });
    asm.emit(Instruction::Unary {
        op: UnaryOp::Delete,
    });
    asm.emit(Instruction::Pop);
    asm.emit(Instruction::Property { name: "x".into() });
    asm.emit(Instruction::Unary {
        op: UnaryOp::Typeof,
    });
    asm.emit(Instruction::PopEval);
    assert_eq!(run_ok(asm), JsValue::from("undefined"));
}

#[test]
fn test_strict_write_to_frozen_global_atom() {
    // "use strict"; undefined = 1
    let mut asm = Assembler::new(CodeKind::Global);
    asm.set_strict(true);
    asm.emit(Instruction::Resolve {
        name: "undefined".into(),
    });
    push_number(&mut asm, 1.0);
    asm.emit(Instruction::PutValue);
    let message = uncaught_message(super::run(asm));
    assert_eq!(
        message,
        "TypeError: Cannot assign to read only property 'undefined'"
    );
}

#[test]
fn test_write_through_prototype_copies_down() {
    let mut engine = Engine::new();
    let interp = engine.interpreter();
    let object_proto = interp.realm.intrinsics.object_proto.cheap_clone();

    let proto = JsObject::ordinary(Some(object_proto));
    object::define_own_property(
        &proto,
        PropertyKey::from("x"),
        PropertyDescriptor::data(JsValue::Number(1.0), true, false, false),
    )
    .unwrap();
    let child = JsObject::ordinary(Some(proto.cheap_clone()));

    object::put(interp, &child, PropertyKey::from("x"), JsValue::Number(2.0), true).unwrap();

    // the prototype keeps its value; the child grows a fresh own property
    let on_proto = object::get_own_property(&proto, &PropertyKey::from("x")).unwrap();
    assert_eq!(on_proto.value, Some(JsValue::Number(1.0)));
    let on_child = object::get_own_property(&child, &PropertyKey::from("x")).unwrap();
    assert_eq!(on_child.value, Some(JsValue::Number(2.0)));
    assert_eq!(on_child.enumerable, Some(true));
    assert_eq!(on_child.configurable, Some(true));
}

#[test]
fn test_super_member_reads_the_home_prototype() {
    let mut engine = Engine::new();
    let interp = engine.interpreter();
    let object_proto = interp.realm.intrinsics.object_proto.cheap_clone();

    let parent = JsObject::ordinary(Some(object_proto));
    object::define_own_property(
        &parent,
        PropertyKey::from("greeting"),
        PropertyDescriptor::data_default(JsValue::from("hi")),
    )
    .unwrap();
    let home = JsObject::ordinary(Some(parent));
    object::define_own_property(
        &home,
        PropertyKey::from("greeting"),
        PropertyDescriptor::data_default(JsValue::from("shadowed")),
    )
    .unwrap();

    let mut method = Assembler::new(CodeKind::Function);
    method.emit(Instruction::SuperMember {
        name: "greeting".into(),
    });
    method.emit(Instruction::GetValue);
    method.emit(Instruction::Return);

    let scope = interp.realm.global_env.cheap_clone();
    let func = interp.make_function(Rc::new(method.finish()), scope, Some(home.cheap_clone()));
    let result = interp
        .call(
            &JsValue::Object(func),
            JsValue::Object(home.cheap_clone()),
            &[],
        )
        .unwrap();
    // super skips the home object's own shadowing property
    assert_eq!(result, JsValue::from("hi"));
}

#[test]
fn test_regexp_literal_builds_a_branded_object() {
    // /a+/g
    let mut asm = Assembler::new(CodeKind::Global);
    asm.emit(Instruction::RegExp {
        pattern: "a+".into(),
        flags: "g".into(),
    });
    asm.emit(Instruction::PopEval);

    let mut engine = Engine::new();
    let value = engine.run(&super::unit(asm)).unwrap();
    assert_eq!(format!("{:?}", value), "/a+/g");

    let obj = value.as_object().unwrap().cheap_clone();
    assert!(Rc::ptr_eq(
        obj.borrow().prototype.as_ref().unwrap(),
        &engine.interpreter().realm.intrinsics.regexp_proto
    ));
}

#[test]
fn test_super_outside_a_method_is_an_error() {
    let mut body = Assembler::new(CodeKind::Function);
    body.emit(Instruction::SuperGuard);

    let mut asm = Assembler::new(CodeKind::Global);
    asm.emit(Instruction::Function {
        code: Rc::new(body.finish()),
    });
    asm.emit(Instruction::Call { argc: 0 });
    let message = uncaught_message(super::run(asm));
    assert_eq!(
        message,
        "ReferenceError: 'super' keyword is only valid inside a method"
    );
}
