//! Engine state and abstract operations
//!
//! The `Interpreter` owns the realm and the execution-context stack and
//! carries every operation that needs ambient state: reference
//! dereferencing, coercions, calls, and the error factory. The bytecode
//! machine in [`vm`] drives these.

pub mod vm;

use std::rc::Rc;

use crate::bytecode::{BinaryOp, CodeKind, CodeUnit, LexicalDecl, UnaryOp};
use crate::completion::{AbruptCompletion, AbruptKind, Completion};
use crate::context::{ExecutionContext, Realm};
use crate::descriptor::PropertyDescriptor;
use crate::environment::{self, EnvRef, EnvironmentRecord};
use crate::object::{
    self, DefineError, FunctionData, JsObject, JsObjectRef, ObjectKind, ParameterMap,
    PrimitiveHint, ThisMode,
};
use crate::reference::{Base, Reference};
use crate::value::{self, CheapClone, JsString, JsValue, PropertyKey};

use rustc_hash::FxHashMap;

use self::vm::BytecodeVm;

const DEFAULT_MAX_STACK_DEPTH: usize = 1024;

/// Symbolic error kind for the central error factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Type,
    Reference,
    Range,
    Syntax,
}

/// The engine state: one realm plus the execution-context stack.
pub struct Interpreter {
    pub realm: Realm,
    contexts: Vec<ExecutionContext>,
    max_stack_depth: usize,
}

impl Interpreter {
    pub fn new() -> Self {
        Interpreter {
            realm: Realm::new(),
            contexts: Vec::new(),
            max_stack_depth: DEFAULT_MAX_STACK_DEPTH,
        }
    }

    pub fn set_max_stack_depth(&mut self, depth: usize) {
        self.max_stack_depth = depth;
    }

    // ═══════════════════════════════════════════════════════════════════
    // Execution-context stack
    // ═══════════════════════════════════════════════════════════════════

    fn push_context(&mut self, context: ExecutionContext) -> Completion<()> {
        if self.contexts.len() >= self.max_stack_depth {
            return Err(self.range_error("Maximum call stack size exceeded"));
        }
        self.contexts.push(context);
        Ok(())
    }

    fn pop_context(&mut self) {
        self.contexts.pop();
    }

    /// The active lexical environment; the global record when no frame is
    /// running.
    pub fn lexical_env(&self) -> EnvRef {
        match self.contexts.last() {
            Some(ctx) => ctx.lexical_env.cheap_clone(),
            None => self.realm.global_env.cheap_clone(),
        }
    }

    pub fn set_lexical_env(&mut self, env: EnvRef) {
        if let Some(ctx) = self.contexts.last_mut() {
            ctx.lexical_env = env;
        }
    }

    /// Leave the innermost lexical scope of the running frame.
    pub fn pop_lexical_env(&mut self) {
        let outer = self.lexical_env().borrow().outer.clone();
        if let (Some(ctx), Some(outer)) = (self.contexts.last_mut(), outer) {
            ctx.lexical_env = outer;
        }
    }

    pub fn strict(&self) -> bool {
        self.contexts.last().map(|ctx| ctx.strict).unwrap_or(false)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Error factory
    // ═══════════════════════════════════════════════════════════════════

    /// Build an error object of the given kind and wrap it in a Throw
    /// completion. The `name` property comes from the intrinsic prototype.
    pub fn throw_error(&self, kind: ErrorKind, message: impl Into<String>) -> AbruptCompletion {
        let proto = match kind {
            ErrorKind::Type => &self.realm.intrinsics.type_error_proto,
            ErrorKind::Reference => &self.realm.intrinsics.reference_error_proto,
            ErrorKind::Range => &self.realm.intrinsics.range_error_proto,
            ErrorKind::Syntax => &self.realm.intrinsics.syntax_error_proto,
        };
        let error = JsObject::ordinary(Some(proto.cheap_clone()));
        let message = PropertyDescriptor::data(
            JsValue::String(JsString::from(message.into())),
            true,
            false,
            true,
        );
        let _ = object::define_own_property(&error, PropertyKey::from("message"), message);
        AbruptCompletion::throw(JsValue::Object(error))
    }

    pub fn type_error(&self, message: impl Into<String>) -> AbruptCompletion {
        self.throw_error(ErrorKind::Type, message)
    }

    pub fn reference_error(&self, message: impl Into<String>) -> AbruptCompletion {
        self.throw_error(ErrorKind::Reference, message)
    }

    pub fn range_error(&self, message: impl Into<String>) -> AbruptCompletion {
        self.throw_error(ErrorKind::Range, message)
    }

    pub fn syntax_error(&self, message: impl Into<String>) -> AbruptCompletion {
        self.throw_error(ErrorKind::Syntax, message)
    }

    // ═══════════════════════════════════════════════════════════════════
    // References
    // ═══════════════════════════════════════════════════════════════════

    /// Walk outer links from the active lexical environment to the first
    /// record with a matching binding.
    pub fn resolve_identifier(&self, name: &JsString) -> Reference {
        let strict = self.strict();
        let mut current = Some(self.lexical_env());
        while let Some(env) = current {
            if env.borrow().has_binding(name) {
                return Reference::env(
                    env.cheap_clone(),
                    PropertyKey::String(name.cheap_clone()),
                    strict,
                );
            }
            current = env.borrow().outer.clone();
        }
        Reference::unresolvable(PropertyKey::String(name.cheap_clone()), strict)
    }

    /// The innermost environment with a `this` binding.
    fn this_environment(&self) -> Option<EnvRef> {
        let mut current = Some(self.lexical_env());
        while let Some(env) = current {
            if env.borrow().has_this_binding() {
                return Some(env);
            }
            current = env.borrow().outer.clone();
        }
        None
    }

    pub fn this_resolution(&mut self) -> Completion<JsValue> {
        match self.this_environment() {
            Some(env) => {
                let this = env.borrow().get_this_binding();
                Ok(this.unwrap_or(JsValue::Undefined))
            }
            None => Ok(JsValue::Object(self.realm.global.cheap_clone())),
        }
    }

    pub fn super_guard(&mut self) -> Completion<()> {
        let has_super = self
            .this_environment()
            .map(|env| env.borrow().has_super_binding())
            .unwrap_or(false);
        if has_super {
            Ok(())
        } else {
            Err(self.reference_error("'super' keyword is only valid inside a method"))
        }
    }

    pub fn make_super_reference(&mut self, key: PropertyKey) -> Completion<Reference> {
        let Some(env) = self.this_environment() else {
            return Err(self.reference_error("'super' keyword is only valid inside a method"));
        };
        if !env.borrow().has_super_binding() {
            return Err(self.reference_error("'super' keyword is only valid inside a method"));
        }
        let base = env.borrow().get_super_base();
        let this_value = env.borrow().get_this_binding().unwrap_or(JsValue::Undefined);
        Ok(Reference::super_property(base, key, self.strict(), this_value))
    }

    /// GetValue: dereference. Unresolvable reads fail; primitive bases are
    /// promoted to wrappers for the access; super references read through
    /// the attached receiver.
    pub fn get_value(&mut self, reference: &Reference) -> Completion<JsValue> {
        match &reference.base {
            Base::Unresolvable => {
                Err(self.reference_error(format!("{} is not defined", reference.name)))
            }
            Base::Env(env) => {
                let env = env.cheap_clone();
                let name = reference.name.to_js_string();
                environment::get_binding_value(self, &env, &name, reference.strict)
            }
            Base::Value(base) => {
                let receiver = match &reference.this_value {
                    Some(this) => (**this).clone(),
                    None => base.clone(),
                };
                let base = base.clone();
                let obj = self.to_object(&base)?;
                object::get_with_receiver(self, &obj, &reference.name, &receiver)
            }
        }
    }

    /// PutValue: write through a reference. Unresolvable strict writes
    /// fail; non-strict ones create a global property.
    pub fn put_value(&mut self, reference: &Reference, value: JsValue) -> Completion<()> {
        match &reference.base {
            Base::Unresolvable => {
                if reference.strict {
                    return Err(
                        self.reference_error(format!("{} is not defined", reference.name))
                    );
                }
                let global = self.realm.global.cheap_clone();
                object::put(self, &global, reference.name.clone(), value, false)
            }
            Base::Env(env) => {
                let env = env.cheap_clone();
                let name = reference.name.to_js_string();
                environment::set_mutable_binding(self, &env, &name, value, reference.strict)
            }
            Base::Value(base) => {
                let receiver = match &reference.this_value {
                    Some(this) => (**this).clone(),
                    None => base.clone(),
                };
                let base = base.clone();
                let obj = self.to_object(&base)?;
                let ok = object::set_with_receiver(self, &obj, &reference.name, value, &receiver)?;
                if !ok && reference.strict {
                    return Err(self.type_error(format!(
                        "Cannot assign to read only property '{}'",
                        reference.name
                    )));
                }
                Ok(())
            }
        }
    }

    /// The `this` a call through this reference receives: the attached
    /// super receiver, or the base value.
    pub fn get_this_value(&self, reference: &Reference) -> JsValue {
        if let Some(this) = &reference.this_value {
            return (**this).clone();
        }
        match &reference.base {
            Base::Value(v) => v.clone(),
            _ => JsValue::Undefined,
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Coercions
    // ═══════════════════════════════════════════════════════════════════

    pub fn check_object_coercible(&mut self, value: &JsValue) -> Completion<()> {
        if value.is_null_or_undefined() {
            return Err(self.type_error("Cannot convert undefined or null to object"));
        }
        Ok(())
    }

    pub fn to_object(&mut self, value: &JsValue) -> Completion<JsObjectRef> {
        let intrinsics = &self.realm.intrinsics;
        match value {
            JsValue::Object(obj) => Ok(obj.cheap_clone()),
            JsValue::String(s) => Ok(JsObject::string_wrapper(
                s.cheap_clone(),
                Some(intrinsics.string_proto.cheap_clone()),
            )),
            JsValue::Number(n) => Ok(JsObject::number_wrapper(
                *n,
                Some(intrinsics.number_proto.cheap_clone()),
            )),
            JsValue::Boolean(b) => Ok(JsObject::boolean_wrapper(
                *b,
                Some(intrinsics.boolean_proto.cheap_clone()),
            )),
            JsValue::Undefined | JsValue::Null => {
                Err(self.type_error("Cannot convert undefined or null to object"))
            }
        }
    }

    pub fn to_primitive(&mut self, value: &JsValue, hint: PrimitiveHint) -> Completion<JsValue> {
        match value {
            JsValue::Object(obj) => {
                let obj = obj.cheap_clone();
                object::default_value(self, &obj, hint)
            }
            _ => Ok(value.clone()),
        }
    }

    pub fn to_number(&mut self, value: &JsValue) -> Completion<f64> {
        let prim = self.to_primitive(value, PrimitiveHint::Number)?;
        Ok(prim.to_number_primitive())
    }

    pub fn to_js_string(&mut self, value: &JsValue) -> Completion<JsString> {
        let prim = self.to_primitive(value, PrimitiveHint::String)?;
        Ok(prim.to_js_string_primitive())
    }

    pub fn to_property_key(&mut self, value: &JsValue) -> Completion<PropertyKey> {
        let prim = self.to_primitive(value, PrimitiveHint::String)?;
        Ok(PropertyKey::from_primitive(&prim))
    }

    pub fn to_int32(&mut self, value: &JsValue) -> Completion<i32> {
        Ok(value::to_int32(self.to_number(value)?))
    }

    pub fn to_uint32(&mut self, value: &JsValue) -> Completion<u32> {
        Ok(value::to_uint32(self.to_number(value)?))
    }

    // ═══════════════════════════════════════════════════════════════════
    // Descriptor conversion
    // ═══════════════════════════════════════════════════════════════════

    /// ToPropertyDescriptor: read the six recognized fields off an object,
    /// propagating abrupt completions from getters. Mixed data/accessor
    /// input and non-callable get/set are rejected.
    pub fn to_property_descriptor(&mut self, value: &JsValue) -> Completion<PropertyDescriptor> {
        let Some(obj) = value.as_object() else {
            return Err(self.type_error("Property description must be an object"));
        };
        let obj = obj.cheap_clone();
        let mut desc = PropertyDescriptor::default();

        if object::has_property(&obj, &PropertyKey::from("enumerable")) {
            let v = object::get(self, &obj, &PropertyKey::from("enumerable"))?;
            desc.enumerable = Some(v.to_boolean());
        }
        if object::has_property(&obj, &PropertyKey::from("configurable")) {
            let v = object::get(self, &obj, &PropertyKey::from("configurable"))?;
            desc.configurable = Some(v.to_boolean());
        }
        if object::has_property(&obj, &PropertyKey::from("value")) {
            desc.value = Some(object::get(self, &obj, &PropertyKey::from("value"))?);
        }
        if object::has_property(&obj, &PropertyKey::from("writable")) {
            let v = object::get(self, &obj, &PropertyKey::from("writable"))?;
            desc.writable = Some(v.to_boolean());
        }
        if object::has_property(&obj, &PropertyKey::from("get")) {
            let v = object::get(self, &obj, &PropertyKey::from("get"))?;
            if !v.is_callable() && !v.is_undefined() {
                return Err(self.type_error("Getter must be a function"));
            }
            desc.get = Some(v);
        }
        if object::has_property(&obj, &PropertyKey::from("set")) {
            let v = object::get(self, &obj, &PropertyKey::from("set"))?;
            if !v.is_callable() && !v.is_undefined() {
                return Err(self.type_error("Setter must be a function"));
            }
            desc.set = Some(v);
        }
        if desc.is_accessor_descriptor() && (desc.value.is_some() || desc.writable.is_some()) {
            return Err(self.type_error(
                "Invalid property descriptor. Cannot both specify accessors and a value or writable attribute",
            ));
        }
        Ok(desc)
    }

    /// FromPropertyDescriptor: build the plain-object form.
    pub fn from_property_descriptor(&mut self, desc: &PropertyDescriptor) -> JsObjectRef {
        let obj = JsObject::ordinary(Some(self.realm.intrinsics.object_proto.cheap_clone()));
        let mut field = |name: &str, value: JsValue| {
            let _ = object::define_own_property(
                &obj,
                PropertyKey::from(name),
                PropertyDescriptor::data_default(value),
            );
        };
        if desc.is_accessor_descriptor() {
            field("get", desc.get.clone().unwrap_or(JsValue::Undefined));
            field("set", desc.set.clone().unwrap_or(JsValue::Undefined));
        } else {
            field("value", desc.value.clone().unwrap_or(JsValue::Undefined));
            field(
                "writable",
                JsValue::Boolean(desc.writable.unwrap_or(false)),
            );
        }
        field(
            "enumerable",
            JsValue::Boolean(desc.enumerable.unwrap_or(false)),
        );
        field(
            "configurable",
            JsValue::Boolean(desc.configurable.unwrap_or(false)),
        );
        obj
    }

    /// DefinePropertyOrThrow: surface a rejected definition as a thrown
    /// error.
    pub fn define_property_or_throw(
        &mut self,
        obj: &JsObjectRef,
        key: PropertyKey,
        desc: PropertyDescriptor,
    ) -> Completion<()> {
        match object::define_own_property(obj, key.clone(), desc) {
            Ok(()) => Ok(()),
            Err(DefineError::InvalidArrayLength) => Err(self.range_error("Invalid array length")),
            Err(err) => Err(self.type_error(err.message(&key))),
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Equality & operators
    // ═══════════════════════════════════════════════════════════════════

    pub fn loose_equals(&mut self, a: &JsValue, b: &JsValue) -> Completion<bool> {
        use JsValue::*;
        match (a, b) {
            (Undefined | Null, Undefined | Null) => Ok(true),
            (Number(_), Number(_))
            | (String(_), String(_))
            | (Boolean(_), Boolean(_))
            | (Object(_), Object(_)) => Ok(a.strict_equals(b)),
            (Number(x), String(s)) => Ok(!x.is_nan() && *x == JsValue::String(s.cheap_clone()).to_number_primitive()),
            (String(_), Number(_)) => self.loose_equals(b, a),
            (Boolean(x), _) => {
                let n = JsValue::Number(if *x { 1.0 } else { 0.0 });
                self.loose_equals(&n, b)
            }
            (_, Boolean(_)) => self.loose_equals(b, a),
            (Object(_), Number(_) | String(_)) => {
                let prim = self.to_primitive(a, PrimitiveHint::Number)?;
                self.loose_equals(&prim, b)
            }
            (Number(_) | String(_), Object(_)) => self.loose_equals(b, a),
            _ => Ok(false),
        }
    }

    // Abstract relational comparison; `None` means an undefined result
    // (a NaN operand). `left_first` orders the ToPrimitive side effects:
    // the source-order left operand converts first even when the
    // comparison itself runs with swapped operands.
    fn less_than(
        &mut self,
        a: &JsValue,
        b: &JsValue,
        left_first: bool,
    ) -> Completion<Option<bool>> {
        let (pa, pb) = if left_first {
            let pa = self.to_primitive(a, PrimitiveHint::Number)?;
            (pa, self.to_primitive(b, PrimitiveHint::Number)?)
        } else {
            let pb = self.to_primitive(b, PrimitiveHint::Number)?;
            (self.to_primitive(a, PrimitiveHint::Number)?, pb)
        };
        if let (JsValue::String(x), JsValue::String(y)) = (&pa, &pb) {
            return Ok(Some(x.as_str() < y.as_str()));
        }
        let na = pa.to_number_primitive();
        let nb = pb.to_number_primitive();
        if na.is_nan() || nb.is_nan() {
            return Ok(None);
        }
        Ok(Some(na < nb))
    }

    pub fn binary_op(&mut self, op: BinaryOp, left: JsValue, right: JsValue) -> Completion<JsValue> {
        match op {
            BinaryOp::Add => {
                let lp = self.to_primitive(&left, PrimitiveHint::Number)?;
                let rp = self.to_primitive(&right, PrimitiveHint::Number)?;
                if matches!(lp, JsValue::String(_)) || matches!(rp, JsValue::String(_)) {
                    let ls = lp.to_js_string_primitive();
                    let rs = rp.to_js_string_primitive();
                    let mut out = std::string::String::with_capacity(ls.len() + rs.len());
                    out.push_str(ls.as_str());
                    out.push_str(rs.as_str());
                    Ok(JsValue::String(JsString::from(out)))
                } else {
                    Ok(JsValue::Number(
                        lp.to_number_primitive() + rp.to_number_primitive(),
                    ))
                }
            }
            BinaryOp::Sub => Ok(JsValue::Number(
                self.to_number(&left)? - self.to_number(&right)?,
            )),
            BinaryOp::Mul => Ok(JsValue::Number(
                self.to_number(&left)? * self.to_number(&right)?,
            )),
            BinaryOp::Div => Ok(JsValue::Number(
                self.to_number(&left)? / self.to_number(&right)?,
            )),
            BinaryOp::Mod => Ok(JsValue::Number(
                self.to_number(&left)? % self.to_number(&right)?,
            )),
            BinaryOp::Shl => {
                let l = self.to_int32(&left)?;
                let r = self.to_uint32(&right)? & 31;
                Ok(JsValue::Number((l << r) as f64))
            }
            BinaryOp::Shr => {
                let l = self.to_int32(&left)?;
                let r = self.to_uint32(&right)? & 31;
                Ok(JsValue::Number((l >> r) as f64))
            }
            BinaryOp::UShr => {
                let l = self.to_uint32(&left)?;
                let r = self.to_uint32(&right)? & 31;
                Ok(JsValue::Number((l >> r) as f64))
            }
            BinaryOp::BitAnd => Ok(JsValue::Number(
                (self.to_int32(&left)? & self.to_int32(&right)?) as f64,
            )),
            BinaryOp::BitOr => Ok(JsValue::Number(
                (self.to_int32(&left)? | self.to_int32(&right)?) as f64,
            )),
            BinaryOp::BitXor => Ok(JsValue::Number(
                (self.to_int32(&left)? ^ self.to_int32(&right)?) as f64,
            )),
            BinaryOp::Lt => Ok(JsValue::Boolean(
                self.less_than(&left, &right, true)?.unwrap_or(false),
            )),
            BinaryOp::Gt => Ok(JsValue::Boolean(
                self.less_than(&right, &left, false)?.unwrap_or(false),
            )),
            BinaryOp::LtEq => Ok(JsValue::Boolean(
                self.less_than(&right, &left, false)? == Some(false),
            )),
            BinaryOp::GtEq => Ok(JsValue::Boolean(
                self.less_than(&left, &right, true)? == Some(false),
            )),
            BinaryOp::Eq => Ok(JsValue::Boolean(self.loose_equals(&left, &right)?)),
            BinaryOp::NotEq => Ok(JsValue::Boolean(!self.loose_equals(&left, &right)?)),
            BinaryOp::StrictEq => Ok(JsValue::Boolean(left.strict_equals(&right))),
            BinaryOp::StrictNotEq => Ok(JsValue::Boolean(!left.strict_equals(&right))),
            BinaryOp::In => {
                let Some(obj) = right.as_object() else {
                    return Err(self.type_error(
                        "Cannot use 'in' operator to search for a property in a non-object",
                    ));
                };
                let obj = obj.cheap_clone();
                let key = self.to_property_key(&left)?;
                Ok(JsValue::Boolean(object::has_property(&obj, &key)))
            }
            BinaryOp::Instanceof => Ok(JsValue::Boolean(self.has_instance(&right, &left)?)),
        }
    }

    /// Unary operators over plain values. Typeof and delete on references
    /// are resolved by the machine before reaching here.
    pub fn unary_op(&mut self, op: UnaryOp, operand: JsValue) -> Completion<JsValue> {
        match op {
            UnaryOp::Neg => Ok(JsValue::Number(-self.to_number(&operand)?)),
            UnaryOp::Pos => Ok(JsValue::Number(self.to_number(&operand)?)),
            UnaryOp::Not => Ok(JsValue::Boolean(!operand.to_boolean())),
            UnaryOp::BitNot => Ok(JsValue::Number(!self.to_int32(&operand)? as f64)),
            UnaryOp::Void => Ok(JsValue::Undefined),
            UnaryOp::Typeof => Ok(JsValue::from(operand.type_of())),
            UnaryOp::Delete => Ok(JsValue::Boolean(true)),
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Calls
    // ═══════════════════════════════════════════════════════════════════

    /// Call a function value. For bytecode functions this binds `this`
    /// per the function's this-mode, runs declaration instantiation, and
    /// executes the body in a fresh context.
    pub fn call(
        &mut self,
        callee: &JsValue,
        this_value: JsValue,
        args: &[JsValue],
    ) -> Completion<JsValue> {
        let Some(obj) = callee.as_object() else {
            return Err(self.type_error(format!("{:?} is not a function", callee)));
        };
        let obj = obj.cheap_clone();

        enum Target {
            Native(object::NativeFn),
            Code(FunctionData),
        }
        let target = match &obj.borrow().kind {
            ObjectKind::Native(native) => Target::Native(native.func),
            ObjectKind::Function(data) => Target::Code(data.clone()),
            _ => return Err(self.type_error(format!("{:?} is not a function", callee))),
        };

        match target {
            Target::Native(func) => func(self, &this_value, args),
            Target::Code(data) => {
                let scope = data.scope.cheap_clone();
                let env = match data.this_mode() {
                    ThisMode::Lexical => EnvironmentRecord::new_declarative(Some(scope)),
                    mode => {
                        let this = match mode {
                            ThisMode::Strict => this_value,
                            _ => {
                                if this_value.is_null_or_undefined() {
                                    JsValue::Object(self.realm.global.cheap_clone())
                                } else if this_value.is_primitive_base() {
                                    JsValue::Object(self.to_object(&this_value)?)
                                } else {
                                    this_value
                                }
                            }
                        };
                        EnvironmentRecord::new_function(
                            this,
                            data.home_object.clone(),
                            Some(scope),
                        )
                    }
                };

                let context = ExecutionContext::new(
                    env.cheap_clone(),
                    env.cheap_clone(),
                    data.code.strict,
                    Some(data.code.cheap_clone()),
                );
                self.push_context(context)?;
                let instantiated =
                    self.function_declaration_instantiation(&obj, &data, args, &env);
                let result = match instantiated {
                    Ok(()) => BytecodeVm::new(data.code.cheap_clone()).run(self),
                    Err(abrupt) => Err(abrupt),
                };
                self.pop_context();

                match result {
                    // falling off the end of a function yields undefined
                    Ok(_) => Ok(JsValue::Undefined),
                    Err(abrupt) if abrupt.kind == AbruptKind::Return => Ok(abrupt.value),
                    Err(abrupt) => Err(abrupt),
                }
            }
        }
    }

    /// Construct: allocate from the callee's `prototype` property, call
    /// with the fresh object as receiver, and keep an object result over
    /// the allocation.
    pub fn construct(&mut self, callee: &JsValue, args: &[JsValue]) -> Completion<JsValue> {
        if !callee.is_callable() {
            return Err(self.type_error(format!("{:?} is not a constructor", callee)));
        }
        let Some(func) = callee.as_object() else {
            return Err(self.type_error(format!("{:?} is not a constructor", callee)));
        };
        let func = func.cheap_clone();
        let prototype = match object::get(self, &func, &PropertyKey::from("prototype"))? {
            JsValue::Object(proto) => proto,
            _ => self.realm.intrinsics.object_proto.cheap_clone(),
        };
        let this = JsObject::ordinary(Some(prototype));
        let result = self.call(callee, JsValue::Object(this.cheap_clone()), args)?;
        if result.is_object() {
            Ok(result)
        } else {
            Ok(JsValue::Object(this))
        }
    }

    /// HasInstance: walk the value's prototype chain against the
    /// function's `prototype` property.
    pub fn has_instance(&mut self, func: &JsValue, value: &JsValue) -> Completion<bool> {
        if !func.is_callable() {
            return Err(self.type_error("Right-hand side of 'instanceof' is not callable"));
        }
        let Some(func_obj) = func.as_object() else {
            return Err(self.type_error("Right-hand side of 'instanceof' is not callable"));
        };
        let func_obj = func_obj.cheap_clone();
        let JsValue::Object(proto) = object::get(self, &func_obj, &PropertyKey::from("prototype"))?
        else {
            return Err(
                self.type_error("Function has non-object prototype in instanceof check")
            );
        };
        let Some(target) = value.as_object() else {
            return Ok(false);
        };
        let mut current = target.borrow().prototype.clone();
        while let Some(link) = current {
            if Rc::ptr_eq(&link, &proto) {
                return Ok(true);
            }
            current = link.borrow().prototype.clone();
        }
        Ok(false)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Function objects
    // ═══════════════════════════════════════════════════════════════════

    /// Instantiate a closure. Strict normal functions get poisoned
    /// caller/arguments accessors.
    pub fn make_function(
        &mut self,
        code: Rc<CodeUnit>,
        scope: EnvRef,
        home_object: Option<JsObjectRef>,
    ) -> JsObjectRef {
        let name = code.name.clone();
        let strict = code.strict;
        let arrow = code.arrow;
        let param_count = code.params.len() as u32;
        let func = JsObject::function(
            name.clone(),
            code,
            scope,
            home_object,
            Some(self.realm.intrinsics.function_proto.cheap_clone()),
        );
        let _ = object::define_own_property(
            &func,
            PropertyKey::from("length"),
            PropertyDescriptor::data(JsValue::from(param_count), false, false, false),
        );
        if let Some(name) = name {
            let _ = object::define_own_property(
                &func,
                PropertyKey::from("name"),
                PropertyDescriptor::data(JsValue::String(name), false, false, false),
            );
        }
        if strict && !arrow {
            let poison = JsValue::Object(self.realm.intrinsics.throw_type_error.cheap_clone());
            for key in ["caller", "arguments"] {
                let _ = object::define_own_property(
                    &func,
                    PropertyKey::from(key),
                    PropertyDescriptor::accessor(poison.clone(), poison.clone(), false, false),
                );
            }
        }
        func
    }

    /// MakeConstructor: install the `prototype`/`constructor` pair.
    pub fn make_constructor(&mut self, func: &JsObjectRef) {
        let prototype = JsObject::ordinary(Some(self.realm.intrinsics.object_proto.cheap_clone()));
        let _ = object::define_own_property(
            &prototype,
            PropertyKey::from("constructor"),
            PropertyDescriptor::data(JsValue::Object(func.cheap_clone()), true, false, true),
        );
        let _ = object::define_own_property(
            func,
            PropertyKey::from("prototype"),
            PropertyDescriptor::data(JsValue::Object(prototype), true, false, false),
        );
    }

    // ═══════════════════════════════════════════════════════════════════
    // Declaration instantiation
    // ═══════════════════════════════════════════════════════════════════

    /// Binding order at function entry: parameters (positional), the
    /// arguments object (strict: unmapped snapshot + immutable binding;
    /// non-strict: mapped + mutable), lexicals hoisted uninitialized,
    /// `var` names initialized to undefined, nested function declarations
    /// last with later same-named declarations winning.
    fn function_declaration_instantiation(
        &mut self,
        callee: &JsObjectRef,
        data: &FunctionData,
        args: &[JsValue],
        env: &EnvRef,
    ) -> Completion<()> {
        let code = &data.code;

        for name in code.params.iter() {
            let mut record = env.borrow_mut();
            if !record.has_binding(name) {
                record.create_mutable_binding(name.cheap_clone(), false);
            }
        }
        for (i, name) in code.params.iter().enumerate() {
            let value = args.get(i).cloned().unwrap_or(JsValue::Undefined);
            env.borrow_mut().initialize_binding(name, value);
        }

        let arguments_name = JsString::from("arguments");
        if !code.arrow && !env.borrow().has_binding(&arguments_name) {
            let ao = if code.strict {
                self.create_strict_arguments(args)
            } else {
                self.create_mapped_arguments(callee, &code.params, env, args)
            };
            let mut record = env.borrow_mut();
            if code.strict {
                record.create_immutable_binding(arguments_name.cheap_clone());
            } else {
                record.create_mutable_binding(arguments_name.cheap_clone(), false);
            }
            record.initialize_binding(&arguments_name, JsValue::Object(ao));
        }

        for decl in &code.lexicals {
            let mut record = env.borrow_mut();
            if !record.has_binding(&decl.name) {
                if decl.constant {
                    record.create_immutable_binding(decl.name.cheap_clone());
                } else {
                    record.create_mutable_binding(decl.name.cheap_clone(), false);
                }
            }
        }

        for name in &code.var_declared {
            let mut record = env.borrow_mut();
            if !record.has_binding(name) {
                record.create_mutable_binding(name.cheap_clone(), false);
                record.initialize_binding(name, JsValue::Undefined);
            }
        }

        for decl in &code.functions {
            {
                let mut record = env.borrow_mut();
                if !record.has_binding(&decl.name) {
                    record.create_mutable_binding(decl.name.cheap_clone(), false);
                }
            }
            let func = self.make_function(decl.code.cheap_clone(), env.cheap_clone(), None);
            self.make_constructor(&func);
            env.borrow_mut()
                .initialize_binding(&decl.name, JsValue::Object(func));
        }

        Ok(())
    }

    fn create_strict_arguments(&mut self, args: &[JsValue]) -> JsObjectRef {
        let ao = JsObject::arguments(
            args.len() as u32,
            None,
            Some(self.realm.intrinsics.object_proto.cheap_clone()),
        );
        for (i, value) in args.iter().enumerate() {
            let _ = object::define_own_property(
                &ao,
                PropertyKey::Index(i as u32),
                PropertyDescriptor::data_default(value.clone()),
            );
        }
        let poison = JsValue::Object(self.realm.intrinsics.throw_type_error.cheap_clone());
        for key in ["caller", "callee"] {
            let _ = object::define_own_property(
                &ao,
                PropertyKey::from(key),
                PropertyDescriptor::accessor(poison.clone(), poison.clone(), false, false),
            );
        }
        ao
    }

    fn create_mapped_arguments(
        &mut self,
        callee: &JsObjectRef,
        params: &[JsString],
        env: &EnvRef,
        args: &[JsValue],
    ) -> JsObjectRef {
        let mut names: FxHashMap<u32, JsString> = FxHashMap::default();
        let mut mapped: Vec<&JsString> = Vec::new();
        for (i, _) in args.iter().enumerate() {
            if let Some(name) = params.get(i) {
                if !mapped.contains(&name) {
                    mapped.push(name);
                    names.insert(i as u32, name.cheap_clone());
                }
            }
        }
        let map = if names.is_empty() {
            None
        } else {
            Some(ParameterMap {
                env: env.cheap_clone(),
                names,
            })
        };
        let ao = JsObject::arguments(
            args.len() as u32,
            map,
            Some(self.realm.intrinsics.object_proto.cheap_clone()),
        );
        for (i, value) in args.iter().enumerate() {
            let _ = object::define_own_property(
                &ao,
                PropertyKey::Index(i as u32),
                PropertyDescriptor::data_default(value.clone()),
            );
        }
        let _ = object::define_own_property(
            &ao,
            PropertyKey::from("callee"),
            PropertyDescriptor::data(JsValue::Object(callee.cheap_clone()), true, false, true),
        );
        ao
    }

    /// Hoist a block's lexical declarations, uninitialized.
    pub fn block_declaration_instantiation(env: &EnvRef, lexicals: &[LexicalDecl]) {
        let mut record = env.borrow_mut();
        for decl in lexicals {
            if record.has_binding(&decl.name) {
                continue;
            }
            if decl.constant {
                record.create_immutable_binding(decl.name.cheap_clone());
            } else {
                record.create_mutable_binding(decl.name.cheap_clone(), false);
            }
        }
    }

    // Top-level hoisting: vars and function declarations onto the global
    // record, lexicals into the script's declarative scope. Eval units
    // create their var/function bindings deletable.
    fn global_declaration_instantiation(
        &mut self,
        code: &Rc<CodeUnit>,
        script_env: &EnvRef,
    ) -> Completion<()> {
        let global_env = self.realm.global_env.cheap_clone();
        let deletable = code.kind == CodeKind::Eval;
        for name in &code.var_declared {
            let mut record = global_env.borrow_mut();
            if !record.has_binding(name) {
                record.create_mutable_binding(name.cheap_clone(), deletable);
                record.initialize_binding(name, JsValue::Undefined);
            }
        }
        Self::block_declaration_instantiation(script_env, &code.lexicals);
        for decl in &code.functions {
            let func = self.make_function(decl.code.cheap_clone(), script_env.cheap_clone(), None);
            self.make_constructor(&func);
            let mut record = global_env.borrow_mut();
            if !record.has_binding(&decl.name) {
                record.create_mutable_binding(decl.name.cheap_clone(), deletable);
            }
            record.initialize_binding(&decl.name, JsValue::Object(func));
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════
    // Entry
    // ═══════════════════════════════════════════════════════════════════

    /// Execute a global or eval code unit against this realm. The result
    /// is the final statement completion value.
    pub fn run_code(&mut self, code: &Rc<CodeUnit>) -> Completion<JsValue> {
        let script_env =
            EnvironmentRecord::new_declarative(Some(self.realm.global_env.cheap_clone()));
        let context = ExecutionContext::new(
            script_env.cheap_clone(),
            self.realm.global_env.cheap_clone(),
            code.strict,
            Some(code.cheap_clone()),
        );
        self.push_context(context)?;
        let result = self
            .global_declaration_instantiation(code, &script_env)
            .and_then(|()| BytecodeVm::new(code.cheap_clone()).run(self));
        self.pop_context();
        result
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}
