//! The bytecode stack machine
//!
//! One `BytecodeVm` runs one code unit against the interpreter. The operand
//! stack holds plain values, unresolved references, and saved completion
//! markers for finally bodies. Abrupt completions raised by an instruction
//! go through the fault scan: every handler range covering the faulting
//! instruction gets a say, innermost first.

use std::rc::Rc;

use crate::bytecode::{CodeUnit, HandlerKind, Instruction, UnaryOp};
use crate::completion::{AbruptCompletion, AbruptKind, Completion};
use crate::descriptor::PropertyDescriptor;
use crate::environment::EnvironmentRecord;
use crate::interpreter::Interpreter;
use crate::object::{self, JsObject, JsObjectRef};
use crate::reference::{Base, Reference};
use crate::value::{CheapClone, JsValue, PropertyKey};

/// One operand-stack slot.
#[derive(Debug, Clone)]
pub enum StackEntry {
    Value(JsValue),
    Reference(Reference),
    /// Saved completion for a finally body; `None` marks normal entry.
    Completion(Option<AbruptCompletion>),
}

/// Ill-formed bytecode is reported as a Break completion, a kind no
/// well-formed unit can leak: the compiler lowers break/continue to jumps.
/// The engine surface turns it into a malformed-code error.
fn malformed(reason: &str) -> AbruptCompletion {
    AbruptCompletion {
        kind: AbruptKind::Break,
        value: JsValue::from(reason),
        target: None,
    }
}

pub struct BytecodeVm {
    code: Rc<CodeUnit>,
    ip: usize,
    stack: Vec<StackEntry>,
    completion: JsValue,
}

impl BytecodeVm {
    pub fn new(code: Rc<CodeUnit>) -> Self {
        BytecodeVm {
            code,
            ip: 0,
            stack: Vec::new(),
            completion: JsValue::Undefined,
        }
    }

    /// Run to the end of the unit. The normal result is the statement
    /// completion value; Return and Throw leave as abrupt completions.
    pub fn run(&mut self, interp: &mut Interpreter) -> Completion<JsValue> {
        loop {
            if self.ip >= self.code.instructions.len() {
                return Ok(self.completion.clone());
            }
            let instruction = self.code.instructions[self.ip].clone();
            self.ip += 1;
            if let Err(abrupt) = self.step(interp, instruction) {
                if let Some(abrupt) = self.fault(interp, abrupt) {
                    return Err(abrupt);
                }
            }
        }
    }

    /// Scan the handler table for ranges covering the faulting instruction.
    /// Scope-exit ranges unwind one lexical level and keep scanning; catch
    /// ranges consume thrown completions; finally ranges consume anything.
    /// Returns the completion when nothing recovered.
    fn fault(
        &mut self,
        interp: &mut Interpreter,
        abrupt: AbruptCompletion,
    ) -> Option<AbruptCompletion> {
        // Break/Continue only arise from the malformed-code path.
        if matches!(abrupt.kind, AbruptKind::Break | AbruptKind::Continue) {
            return Some(abrupt);
        }
        let fault_ip = (self.ip - 1) as u32;
        let code = self.code.cheap_clone();
        for handler in &code.handlers {
            if fault_ip < handler.begin || fault_ip >= handler.end {
                continue;
            }
            match handler.kind {
                HandlerKind::ScopeExit => {
                    interp.pop_lexical_env();
                }
                HandlerKind::Catch => {
                    if abrupt.kind != AbruptKind::Throw {
                        continue;
                    }
                    self.stack.truncate(handler.depth as usize);
                    self.stack.push(StackEntry::Value(abrupt.value));
                    self.ip = handler.target as usize;
                    return None;
                }
                HandlerKind::Finally => {
                    self.stack.truncate(handler.depth as usize);
                    self.stack.push(StackEntry::Completion(Some(abrupt)));
                    self.ip = handler.target as usize;
                    return None;
                }
            }
        }
        Some(abrupt)
    }

    fn pop_entry(&mut self) -> Completion<StackEntry> {
        self.stack.pop().ok_or_else(|| malformed("operand stack underflow"))
    }

    /// Pop an entry and dereference it when it is a reference.
    fn pop_value(&mut self, interp: &mut Interpreter) -> Completion<JsValue> {
        match self.pop_entry()? {
            StackEntry::Value(v) => Ok(v),
            StackEntry::Reference(r) => interp.get_value(&r),
            StackEntry::Completion(_) => Err(malformed("completion marker where a value was expected")),
        }
    }

    fn push_value(&mut self, value: JsValue) {
        self.stack.push(StackEntry::Value(value));
    }

    /// The object under construction for literal-building instructions.
    fn peek_object(&self) -> Completion<JsObjectRef> {
        match self.stack.last() {
            Some(StackEntry::Value(JsValue::Object(obj))) => Ok(obj.cheap_clone()),
            _ => Err(malformed("object literal base missing from the stack")),
        }
    }

    fn pop_arguments(&mut self, interp: &mut Interpreter, argc: u16) -> Completion<Vec<JsValue>> {
        let mut args = Vec::with_capacity(argc as usize);
        for _ in 0..argc {
            args.push(self.pop_value(interp)?);
        }
        args.reverse();
        Ok(args)
    }

    fn step(&mut self, interp: &mut Interpreter, instruction: Instruction) -> Completion<()> {
        let strict = self.code.strict;
        match instruction {
            // ═══════════════════════════════════════════════════════════
            // Values & references
            // ═══════════════════════════════════════════════════════════
            Instruction::Literal { value } => self.push_value(value.to_value()),
            Instruction::This => {
                let this = interp.this_resolution()?;
                self.push_value(this);
            }
            Instruction::Resolve { name } => {
                let reference = interp.resolve_identifier(&name);
                self.stack.push(StackEntry::Reference(reference));
            }
            Instruction::GetValue => {
                let value = self.pop_value(interp)?;
                self.push_value(value);
            }
            Instruction::PutValue => {
                let value = self.pop_value(interp)?;
                let StackEntry::Reference(reference) = self.pop_entry()? else {
                    return Err(malformed("assignment target is not a reference"));
                };
                interp.put_value(&reference, value.clone())?;
                self.push_value(value);
            }
            Instruction::Property { name } => {
                let base = self.pop_value(interp)?;
                interp.check_object_coercible(&base)?;
                self.stack.push(StackEntry::Reference(Reference::property(
                    base,
                    PropertyKey::from(name),
                    strict,
                )));
            }
            Instruction::Element => {
                let key = self.pop_value(interp)?;
                let base = self.pop_value(interp)?;
                interp.check_object_coercible(&base)?;
                let key = interp.to_property_key(&key)?;
                self.stack
                    .push(StackEntry::Reference(Reference::property(base, key, strict)));
            }
            Instruction::SuperMember { name } => {
                let reference = interp.make_super_reference(PropertyKey::from(name))?;
                self.stack.push(StackEntry::Reference(reference));
            }
            Instruction::SuperElement => {
                let key = self.pop_value(interp)?;
                let key = interp.to_property_key(&key)?;
                let reference = interp.make_super_reference(key)?;
                self.stack.push(StackEntry::Reference(reference));
            }
            Instruction::SuperGuard => interp.super_guard()?,

            // ═══════════════════════════════════════════════════════════
            // Stack shuffling
            // ═══════════════════════════════════════════════════════════
            Instruction::Dup => {
                let top = self
                    .stack
                    .last()
                    .cloned()
                    .ok_or_else(|| malformed("operand stack underflow"))?;
                self.stack.push(top);
            }
            Instruction::Pop => {
                self.pop_entry()?;
            }
            Instruction::PopN { count } => {
                let count = count as usize;
                if self.stack.len() < count {
                    return Err(malformed("operand stack underflow"));
                }
                self.stack.truncate(self.stack.len() - count);
            }
            Instruction::Rotate { count } => {
                let count = count as usize;
                if count == 0 || self.stack.len() < count {
                    return Err(malformed("rotate beyond the operand stack"));
                }
                let top = self.pop_entry()?;
                self.stack.insert(self.stack.len() + 1 - count, top);
            }

            // ═══════════════════════════════════════════════════════════
            // Control flow
            // ═══════════════════════════════════════════════════════════
            Instruction::Jump { target } => self.ip = target as usize,
            Instruction::JumpTrue { target } => {
                if self.pop_value(interp)?.to_boolean() {
                    self.ip = target as usize;
                }
            }
            Instruction::JumpFalse { target } => {
                if !self.pop_value(interp)?.to_boolean() {
                    self.ip = target as usize;
                }
            }
            Instruction::Case { target } => {
                let case_value = self.pop_value(interp)?;
                let matched = match self.stack.last() {
                    Some(StackEntry::Value(discriminant)) => {
                        case_value.strict_equals(discriminant)
                    }
                    _ => return Err(malformed("switch discriminant missing from the stack")),
                };
                if matched {
                    self.stack.pop();
                    self.ip = target as usize;
                }
            }
            Instruction::Default { target } => {
                self.pop_entry()?;
                self.ip = target as usize;
            }

            // ═══════════════════════════════════════════════════════════
            // Operators
            // ═══════════════════════════════════════════════════════════
            Instruction::Unary { op } => match op {
                UnaryOp::Typeof => {
                    let result = match self.pop_entry()? {
                        StackEntry::Reference(r) if r.is_unresolvable() => {
                            JsValue::from("undefined")
                        }
                        StackEntry::Reference(r) => {
                            JsValue::from(interp.get_value(&r)?.type_of())
                        }
                        StackEntry::Value(v) => JsValue::from(v.type_of()),
                        StackEntry::Completion(_) => {
                            return Err(malformed("completion marker where a value was expected"))
                        }
                    };
                    self.push_value(result);
                }
                UnaryOp::Delete => {
                    let result = self.delete_entry(interp)?;
                    self.push_value(JsValue::Boolean(result));
                }
                _ => {
                    let operand = self.pop_value(interp)?;
                    let result = interp.unary_op(op, operand)?;
                    self.push_value(result);
                }
            },
            Instruction::Binary { op } => {
                let right = self.pop_value(interp)?;
                let left = self.pop_value(interp)?;
                let result = interp.binary_op(op, left, right)?;
                self.push_value(result);
            }

            // ═══════════════════════════════════════════════════════════
            // Object, array, and function literals
            // ═══════════════════════════════════════════════════════════
            Instruction::Object => {
                let proto = interp.realm.intrinsics.object_proto.cheap_clone();
                self.push_value(JsValue::Object(JsObject::ordinary(Some(proto))));
            }
            Instruction::DefineMember { name } => {
                let value = self.pop_value(interp)?;
                let obj = self.peek_object()?;
                interp.define_property_or_throw(
                    &obj,
                    PropertyKey::from(name),
                    PropertyDescriptor::data_default(value),
                )?;
            }
            Instruction::DefineMethod { name, code } => {
                let obj = self.peek_object()?;
                let func =
                    interp.make_function(code, interp.lexical_env(), Some(obj.cheap_clone()));
                interp.define_property_or_throw(
                    &obj,
                    PropertyKey::from(name),
                    PropertyDescriptor::data_default(JsValue::Object(func)),
                )?;
            }
            Instruction::DefineGetter { name, code } => {
                let obj = self.peek_object()?;
                let func =
                    interp.make_function(code, interp.lexical_env(), Some(obj.cheap_clone()));
                interp.define_property_or_throw(
                    &obj,
                    PropertyKey::from(name),
                    PropertyDescriptor {
                        get: Some(JsValue::Object(func)),
                        enumerable: Some(true),
                        configurable: Some(true),
                        ..Default::default()
                    },
                )?;
            }
            Instruction::DefineSetter { name, code } => {
                let obj = self.peek_object()?;
                let func =
                    interp.make_function(code, interp.lexical_env(), Some(obj.cheap_clone()));
                interp.define_property_or_throw(
                    &obj,
                    PropertyKey::from(name),
                    PropertyDescriptor {
                        set: Some(JsValue::Object(func)),
                        enumerable: Some(true),
                        configurable: Some(true),
                        ..Default::default()
                    },
                )?;
            }
            Instruction::Array => {
                let proto = interp.realm.intrinsics.array_proto.cheap_clone();
                self.push_value(JsValue::Object(JsObject::array(Some(proto))));
                self.push_value(JsValue::Number(0.0));
            }
            Instruction::Index { empty } => {
                if empty {
                    let counter = self.pop_value(interp)?.to_number_primitive();
                    self.push_value(JsValue::Number(counter + 1.0));
                } else {
                    let value = self.pop_value(interp)?;
                    let counter = self.pop_value(interp)?.to_number_primitive();
                    let obj = self.peek_object()?;
                    interp.define_property_or_throw(
                        &obj,
                        PropertyKey::Index(counter as u32),
                        PropertyDescriptor::data_default(value),
                    )?;
                    self.push_value(JsValue::Number(counter + 1.0));
                }
            }
            Instruction::ArrayDone => {
                let counter = self.pop_value(interp)?;
                let obj = self.peek_object()?;
                interp.define_property_or_throw(
                    &obj,
                    PropertyKey::from("length"),
                    PropertyDescriptor::with_value(counter),
                )?;
            }
            Instruction::Function { code } => {
                let func = self.instantiate_function(interp, code);
                self.push_value(JsValue::Object(func));
            }
            Instruction::RegExp { pattern, flags } => {
                let proto = interp.realm.intrinsics.regexp_proto.cheap_clone();
                self.push_value(JsValue::Object(JsObject::regexp(pattern, flags, Some(proto))));
            }

            // ═══════════════════════════════════════════════════════════
            // Calls
            // ═══════════════════════════════════════════════════════════
            Instruction::Call { argc } => {
                let args = self.pop_arguments(interp, argc)?;
                let (callee, this) = match self.pop_entry()? {
                    StackEntry::Value(v) => (v, JsValue::Undefined),
                    StackEntry::Reference(r) => {
                        let callee = interp.get_value(&r)?;
                        let this = if r.is_property_reference() {
                            interp.get_this_value(&r)
                        } else if let Base::Env(env) = &r.base {
                            match env.borrow().with_base_object() {
                                Some(obj) => JsValue::Object(obj),
                                None => JsValue::Undefined,
                            }
                        } else {
                            JsValue::Undefined
                        };
                        (callee, this)
                    }
                    StackEntry::Completion(_) => {
                        return Err(malformed("completion marker where a callee was expected"))
                    }
                };
                let result = interp.call(&callee, this, &args)?;
                self.push_value(result);
            }
            Instruction::Construct { argc } => {
                let args = self.pop_arguments(interp, argc)?;
                let callee = self.pop_value(interp)?;
                let result = interp.construct(&callee, &args)?;
                self.push_value(result);
            }

            // ═══════════════════════════════════════════════════════════
            // Bindings & scopes
            // ═══════════════════════════════════════════════════════════
            Instruction::Var { name } => {
                let value = self.pop_value(interp)?;
                let reference = interp.resolve_identifier(&name);
                interp.put_value(&reference, value)?;
            }
            Instruction::Let { name } | Instruction::Const { name } => {
                let value = self.pop_value(interp)?;
                interp.lexical_env().borrow_mut().initialize_binding(&name, value);
            }
            Instruction::Block { lexicals } => {
                let env = EnvironmentRecord::new_declarative(Some(interp.lexical_env()));
                Interpreter::block_declaration_instantiation(&env, &lexicals);
                interp.set_lexical_env(env);
            }
            Instruction::BlockExit => interp.pop_lexical_env(),
            Instruction::With => {
                let value = self.pop_value(interp)?;
                let object = interp.to_object(&value)?;
                let env =
                    EnvironmentRecord::new_object(object, true, Some(interp.lexical_env()));
                interp.set_lexical_env(env);
            }

            // ═══════════════════════════════════════════════════════════
            // Completions
            // ═══════════════════════════════════════════════════════════
            Instruction::Throw => {
                let value = self.pop_value(interp)?;
                return Err(AbruptCompletion::throw(value));
            }
            Instruction::Return => {
                let value = self.pop_value(interp)?;
                return Err(AbruptCompletion::return_value(value));
            }
            Instruction::PopEval => {
                self.completion = self.pop_value(interp)?;
            }
            Instruction::PushNormal => self.stack.push(StackEntry::Completion(None)),
            Instruction::EndFinally => match self.pop_entry()? {
                StackEntry::Completion(None) => {}
                StackEntry::Completion(Some(abrupt)) => return Err(abrupt),
                _ => return Err(malformed("finally exit without a completion marker")),
            },
            Instruction::Nop => {}
        }
        Ok(())
    }

    /// Delete on a reference operand; a plain value deletes vacuously.
    fn delete_entry(&mut self, interp: &mut Interpreter) -> Completion<bool> {
        match self.pop_entry()? {
            StackEntry::Value(_) => Ok(true),
            StackEntry::Reference(r) => match &r.base {
                Base::Unresolvable => Ok(true),
                Base::Env(env) => {
                    let name = r.name.to_js_string();
                    Ok(env.borrow_mut().delete_binding(&name))
                }
                Base::Value(base) => {
                    let base = base.clone();
                    let obj = interp.to_object(&base)?;
                    let deleted = object::delete(&obj, &r.name);
                    if !deleted && r.strict {
                        return Err(interp.type_error(format!(
                            "Cannot delete property '{}'",
                            r.name
                        )));
                    }
                    Ok(deleted)
                }
            },
            StackEntry::Completion(_) => {
                Err(malformed("completion marker where a value was expected"))
            }
        }
    }

    /// Named function expressions close over a fresh scope holding their own
    /// immutable self-binding.
    fn instantiate_function(
        &mut self,
        interp: &mut Interpreter,
        code: Rc<CodeUnit>,
    ) -> JsObjectRef {
        let arrow = code.arrow;
        let func = match code.name.clone() {
            Some(name) => {
                let scope = EnvironmentRecord::new_declarative(Some(interp.lexical_env()));
                scope
                    .borrow_mut()
                    .create_immutable_binding(name.cheap_clone());
                let func = interp.make_function(code, scope.cheap_clone(), None);
                scope
                    .borrow_mut()
                    .initialize_binding(&name, JsValue::Object(func.cheap_clone()));
                func
            }
            None => interp.make_function(code, interp.lexical_env(), None),
        };
        if !arrow {
            interp.make_constructor(&func);
        }
        func
    }
}
