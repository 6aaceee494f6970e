//! Environment records
//!
//! The scope chain: declarative records hold bindings in a hash map,
//! object records alias an object's properties (`with` and the global
//! scope), and function records add a `this` binding and an optional
//! home object for `super` access.
//!
//! Reading or writing through an object record can run accessors, so
//! `get_binding_value` and `set_mutable_binding` are free functions that
//! take the interpreter; every other operation is a plain method.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::completion::Completion;
use crate::interpreter::Interpreter;
use crate::object::{self, JsObjectRef};
use crate::value::{CheapClone, JsString, JsValue, PropertyKey};

pub type EnvRef = Rc<RefCell<EnvironmentRecord>>;

/// A single binding in a declarative record. `value: None` means the
/// binding exists but is not yet initialized (the temporal dead zone).
#[derive(Debug, Clone)]
pub struct Binding {
    pub value: Option<JsValue>,
    pub mutable: bool,
    pub deletable: bool,
}

#[derive(Debug)]
pub enum EnvKind {
    Declarative {
        bindings: FxHashMap<JsString, Binding>,
    },
    /// Binds names to the properties of an object. `with_environment` marks
    /// records created by `with`, whose base object becomes the implicit
    /// receiver of calls resolved through it.
    Object {
        object: JsObjectRef,
        with_environment: bool,
    },
    /// A function's top scope: declarative bindings plus a `this` value and,
    /// for methods, the home object that `super` resolves against.
    Function {
        bindings: FxHashMap<JsString, Binding>,
        this_value: JsValue,
        home_object: Option<JsObjectRef>,
    },
    Global {
        object: JsObjectRef,
    },
}

#[derive(Debug)]
pub struct EnvironmentRecord {
    pub outer: Option<EnvRef>,
    pub kind: EnvKind,
}

impl EnvironmentRecord {
    pub fn new_declarative(outer: Option<EnvRef>) -> EnvRef {
        Rc::new(RefCell::new(EnvironmentRecord {
            outer,
            kind: EnvKind::Declarative {
                bindings: FxHashMap::default(),
            },
        }))
    }

    pub fn new_object(object: JsObjectRef, with_environment: bool, outer: Option<EnvRef>) -> EnvRef {
        Rc::new(RefCell::new(EnvironmentRecord {
            outer,
            kind: EnvKind::Object {
                object,
                with_environment,
            },
        }))
    }

    pub fn new_function(
        this_value: JsValue,
        home_object: Option<JsObjectRef>,
        outer: Option<EnvRef>,
    ) -> EnvRef {
        Rc::new(RefCell::new(EnvironmentRecord {
            outer,
            kind: EnvKind::Function {
                bindings: FxHashMap::default(),
                this_value,
                home_object,
            },
        }))
    }

    pub fn new_global(object: JsObjectRef) -> EnvRef {
        Rc::new(RefCell::new(EnvironmentRecord {
            outer: None,
            kind: EnvKind::Global { object },
        }))
    }

    pub fn has_binding(&self, name: &JsString) -> bool {
        match &self.kind {
            EnvKind::Declarative { bindings } | EnvKind::Function { bindings, .. } => {
                bindings.contains_key(name)
            }
            EnvKind::Object { object, .. } | EnvKind::Global { object } => {
                object::has_property(object, &PropertyKey::from(name.cheap_clone()))
            }
        }
    }

    /// Create an uninitialized mutable binding. For object records the
    /// binding is a writable, enumerable property created immediately with
    /// the value `undefined`.
    pub fn create_mutable_binding(&mut self, name: JsString, deletable: bool) {
        match &mut self.kind {
            EnvKind::Declarative { bindings } | EnvKind::Function { bindings, .. } => {
                bindings.insert(
                    name,
                    Binding {
                        value: None,
                        mutable: true,
                        deletable,
                    },
                );
            }
            EnvKind::Object { object, .. } | EnvKind::Global { object } => {
                let desc = crate::descriptor::PropertyDescriptor::data(
                    JsValue::Undefined,
                    true,
                    true,
                    deletable,
                );
                // Only fails when the object is non-extensible; a later write
                // through the record reports that failure properly.
                let _ = object::define_own_property(object, PropertyKey::from(name), desc);
            }
        }
    }

    pub fn create_immutable_binding(&mut self, name: JsString) {
        match &mut self.kind {
            EnvKind::Declarative { bindings } | EnvKind::Function { bindings, .. } => {
                bindings.insert(
                    name,
                    Binding {
                        value: None,
                        mutable: false,
                        deletable: false,
                    },
                );
            }
            EnvKind::Object { object, .. } | EnvKind::Global { object } => {
                let desc =
                    crate::descriptor::PropertyDescriptor::data(JsValue::Undefined, false, true, false);
                let _ = object::define_own_property(object, PropertyKey::from(name), desc);
            }
        }
    }

    /// Give an existing binding its first value, ending its dead zone.
    pub fn initialize_binding(&mut self, name: &JsString, value: JsValue) {
        match &mut self.kind {
            EnvKind::Declarative { bindings } | EnvKind::Function { bindings, .. } => {
                if let Some(binding) = bindings.get_mut(name) {
                    binding.value = Some(value);
                } else {
                    bindings.insert(
                        name.cheap_clone(),
                        Binding {
                            value: Some(value),
                            mutable: true,
                            deletable: false,
                        },
                    );
                }
            }
            EnvKind::Object { object, .. } | EnvKind::Global { object } => {
                let desc = crate::descriptor::PropertyDescriptor::with_value(value);
                let _ = object::define_own_property(object, PropertyKey::from(name.cheap_clone()), desc);
            }
        }
    }

    pub fn delete_binding(&mut self, name: &JsString) -> bool {
        match &mut self.kind {
            EnvKind::Declarative { bindings } | EnvKind::Function { bindings, .. } => {
                match bindings.get(name) {
                    Some(binding) if binding.deletable => {
                        bindings.remove(name);
                        true
                    }
                    Some(_) => false,
                    None => true,
                }
            }
            EnvKind::Object { object, .. } | EnvKind::Global { object } => {
                object::delete(object, &PropertyKey::from(name.cheap_clone()))
            }
        }
    }

    pub fn has_this_binding(&self) -> bool {
        matches!(self.kind, EnvKind::Function { .. } | EnvKind::Global { .. })
    }

    pub fn get_this_binding(&self) -> Option<JsValue> {
        match &self.kind {
            EnvKind::Function { this_value, .. } => Some(this_value.clone()),
            EnvKind::Global { object } => Some(JsValue::Object(object.cheap_clone())),
            _ => None,
        }
    }

    pub fn has_super_binding(&self) -> bool {
        matches!(
            self.kind,
            EnvKind::Function {
                home_object: Some(_),
                ..
            }
        )
    }

    /// The prototype of the home object, the place `super.x` looks up `x`.
    pub fn get_super_base(&self) -> JsValue {
        match &self.kind {
            EnvKind::Function {
                home_object: Some(home),
                ..
            } => match &home.borrow().prototype {
                Some(proto) => JsValue::Object(proto.cheap_clone()),
                None => JsValue::Null,
            },
            _ => JsValue::Undefined,
        }
    }

    /// Current value of a local declarative binding, `None` when absent or
    /// uninitialized. Parameter-map aliasing reads through this.
    pub fn binding_value(&self, name: &JsString) -> Option<JsValue> {
        match &self.kind {
            EnvKind::Declarative { bindings } | EnvKind::Function { bindings, .. } => {
                bindings.get(name).and_then(|b| b.value.clone())
            }
            _ => None,
        }
    }

    /// Overwrite a local declarative binding in place. Parameter-map
    /// aliasing writes through this; missing bindings are ignored.
    pub fn set_binding_value(&mut self, name: &JsString, value: JsValue) {
        if let EnvKind::Declarative { bindings } | EnvKind::Function { bindings, .. } =
            &mut self.kind
        {
            if let Some(binding) = bindings.get_mut(name) {
                binding.value = Some(value);
            }
        }
    }

    /// The implicit receiver when a call resolves through this record:
    /// the base object of a `with` record, nothing otherwise.
    pub fn with_base_object(&self) -> Option<JsObjectRef> {
        match &self.kind {
            EnvKind::Object {
                object,
                with_environment: true,
            } => Some(object.cheap_clone()),
            _ => None,
        }
    }
}

/// Read a binding's value. Uninitialized declarative bindings and missing
/// names produce reference errors; a missing name on an object record reads
/// as `undefined` outside strict code.
pub fn get_binding_value(
    interp: &mut Interpreter,
    env: &EnvRef,
    name: &JsString,
    strict: bool,
) -> Completion<JsValue> {
    let object = {
        let record = env.borrow();
        match &record.kind {
            EnvKind::Declarative { bindings } | EnvKind::Function { bindings, .. } => {
                return match bindings.get(name) {
                    Some(Binding { value: Some(v), .. }) => Ok(v.clone()),
                    Some(Binding { value: None, .. }) => Err(interp.reference_error(format!(
                        "Cannot access '{}' before initialization",
                        name
                    ))),
                    None => Err(interp.reference_error(format!("{} is not defined", name))),
                };
            }
            EnvKind::Object { object, .. } | EnvKind::Global { object } => object.cheap_clone(),
        }
    };
    let key = PropertyKey::from(name.cheap_clone());
    if !object::has_property(&object, &key) {
        if strict {
            return Err(interp.reference_error(format!("{} is not defined", name)));
        }
        return Ok(JsValue::Undefined);
    }
    let receiver = JsValue::Object(object.cheap_clone());
    object::get_with_receiver(interp, &object, &key, &receiver)
}

/// Write a binding. Writes to immutable or uninitialized bindings fail; in
/// strict code the failure is a thrown error, otherwise it is ignored.
pub fn set_mutable_binding(
    interp: &mut Interpreter,
    env: &EnvRef,
    name: &JsString,
    value: JsValue,
    strict: bool,
) -> Completion<()> {
    let object = {
        let mut record = env.borrow_mut();
        match &mut record.kind {
            EnvKind::Declarative { bindings } | EnvKind::Function { bindings, .. } => {
                return match bindings.get_mut(name) {
                    Some(binding) if binding.value.is_none() => Err(interp.reference_error(
                        format!("Cannot access '{}' before initialization", name),
                    )),
                    Some(binding) if binding.mutable => {
                        binding.value = Some(value);
                        Ok(())
                    }
                    Some(_) => {
                        if strict {
                            Err(interp.type_error("Assignment to constant variable."))
                        } else {
                            Ok(())
                        }
                    }
                    None => {
                        if strict {
                            Err(interp.reference_error(format!("{} is not defined", name)))
                        } else {
                            bindings.insert(
                                name.cheap_clone(),
                                Binding {
                                    value: Some(value),
                                    mutable: true,
                                    deletable: true,
                                },
                            );
                            Ok(())
                        }
                    }
                };
            }
            EnvKind::Object { object, .. } | EnvKind::Global { object } => object.cheap_clone(),
        }
    };
    let key = PropertyKey::from(name.cheap_clone());
    object::put(interp, &object, key, value, strict)
}
