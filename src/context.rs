//! Execution contexts and realms
//!
//! A realm is an isolated global scope: the intrinsic prototype graph, the
//! global object, and the global environment record wrapping it. Execution
//! contexts are explicit call-stack frames owned by the interpreter in a
//! `Vec`; pushing and popping is strict stack discipline, and only the top
//! frame's environments are mutated by running code.

use std::rc::Rc;

use crate::bytecode::CodeUnit;
use crate::completion::Completion;
use crate::descriptor::PropertyDescriptor;
use crate::environment::{EnvRef, EnvironmentRecord};
use crate::interpreter::Interpreter;
use crate::object::{self, JsObject, JsObjectRef};
use crate::value::{CheapClone, JsValue, PropertyKey};

/// One call-stack frame.
#[derive(Debug)]
pub struct ExecutionContext {
    pub lexical_env: EnvRef,
    pub variable_env: EnvRef,
    pub strict: bool,
    pub code: Option<Rc<CodeUnit>>,
}

impl ExecutionContext {
    pub fn new(
        lexical_env: EnvRef,
        variable_env: EnvRef,
        strict: bool,
        code: Option<Rc<CodeUnit>>,
    ) -> Self {
        ExecutionContext {
            lexical_env,
            variable_env,
            strict,
            code,
        }
    }
}

/// The per-realm intrinsic objects. Every prototype chains to
/// `object_proto`; the error prototypes additionally chain through
/// `error_proto`.
#[derive(Debug)]
pub struct Intrinsics {
    pub object_proto: JsObjectRef,
    pub function_proto: JsObjectRef,
    pub array_proto: JsObjectRef,
    pub string_proto: JsObjectRef,
    pub number_proto: JsObjectRef,
    pub boolean_proto: JsObjectRef,
    pub date_proto: JsObjectRef,
    pub regexp_proto: JsObjectRef,
    pub map_proto: JsObjectRef,
    pub set_proto: JsObjectRef,
    pub weakmap_proto: JsObjectRef,
    pub error_proto: JsObjectRef,
    pub type_error_proto: JsObjectRef,
    pub reference_error_proto: JsObjectRef,
    pub range_error_proto: JsObjectRef,
    pub syntax_error_proto: JsObjectRef,
    /// Poison accessor installed on strict functions' caller/arguments.
    pub throw_type_error: JsObjectRef,
}

#[derive(Debug)]
pub struct Realm {
    pub intrinsics: Intrinsics,
    pub global: JsObjectRef,
    pub global_env: EnvRef,
}

fn define(obj: &JsObjectRef, name: &str, desc: PropertyDescriptor) {
    // Fresh extensible objects: definition cannot fail here.
    let _ = object::define_own_property(obj, PropertyKey::from(name), desc);
}

fn named_error_proto(parent: &JsObjectRef, name: &str) -> JsObjectRef {
    let proto = JsObject::ordinary(Some(parent.cheap_clone()));
    define(
        &proto,
        "name",
        PropertyDescriptor::data(JsValue::from(name), true, false, true),
    );
    define(
        &proto,
        "message",
        PropertyDescriptor::data(JsValue::from(""), true, false, true),
    );
    proto
}

fn throw_type_error_native(
    interp: &mut Interpreter,
    _this: &JsValue,
    _args: &[JsValue],
) -> Completion<JsValue> {
    Err(interp.type_error("'caller' and 'arguments' are restricted function properties"))
}

impl Realm {
    /// Build the intrinsic graph: the object prototype first (null
    /// prototype), everything else chained to it, then the global object
    /// with its non-writable atoms.
    pub fn new() -> Self {
        let object_proto = JsObject::ordinary(None);
        let chained = || JsObject::ordinary(Some(object_proto.cheap_clone()));

        let function_proto = chained();
        let array_proto = chained();
        define(
            &array_proto,
            "length",
            PropertyDescriptor::data(JsValue::from(0u32), true, false, false),
        );

        let error_proto = named_error_proto(&object_proto, "Error");
        let type_error_proto = named_error_proto(&error_proto, "TypeError");
        let reference_error_proto = named_error_proto(&error_proto, "ReferenceError");
        let range_error_proto = named_error_proto(&error_proto, "RangeError");
        let syntax_error_proto = named_error_proto(&error_proto, "SyntaxError");

        let throw_type_error = JsObject::native(
            "ThrowTypeError",
            throw_type_error_native,
            Some(function_proto.cheap_clone()),
        );
        throw_type_error.borrow_mut().extensible = false;

        let intrinsics = Intrinsics {
            function_proto,
            array_proto,
            string_proto: chained(),
            number_proto: chained(),
            boolean_proto: chained(),
            date_proto: chained(),
            regexp_proto: chained(),
            map_proto: chained(),
            set_proto: chained(),
            weakmap_proto: chained(),
            error_proto,
            type_error_proto,
            reference_error_proto,
            range_error_proto,
            syntax_error_proto,
            throw_type_error,
            object_proto: object_proto.cheap_clone(),
        };

        let global = JsObject::ordinary(Some(object_proto));
        define(
            &global,
            "NaN",
            PropertyDescriptor::data(JsValue::Number(f64::NAN), false, false, false),
        );
        define(
            &global,
            "Infinity",
            PropertyDescriptor::data(JsValue::Number(f64::INFINITY), false, false, false),
        );
        define(
            &global,
            "undefined",
            PropertyDescriptor::data(JsValue::Undefined, false, false, false),
        );

        let global_env = EnvironmentRecord::new_global(global.cheap_clone());

        Realm {
            intrinsics,
            global,
            global_env,
        }
    }
}

impl Default for Realm {
    fn default() -> Self {
        Self::new()
    }
}
