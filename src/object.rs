//! The object model
//!
//! Ordinary objects are insertion-ordered property bags with a prototype
//! link and an extensible flag. Specialized kinds (function, array,
//! primitive wrappers, arguments) share the ordinary implementation and
//! override only the operations that differ: the array keeps its `length`
//! invariant in `DefineOwnProperty`, the string wrapper synthesizes indexed
//! descriptors, the arguments object routes mapped indices through the
//! owning environment record.
//!
//! Operations that can run script (getters, setters, `valueOf`) take the
//! interpreter; everything else is pure and reports failure through
//! [`DefineError`], which callers convert to thrown errors when strict.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::bytecode::CodeUnit;
use crate::completion::Completion;
use crate::descriptor::PropertyDescriptor;
use crate::environment::EnvRef;
use crate::interpreter::Interpreter;
use crate::value::{to_uint32, CheapClone, JsString, JsValue, PropertyKey};

pub type JsObjectRef = Rc<RefCell<JsObject>>;

/// Value payload of a property slot.
#[derive(Debug, Clone)]
pub enum SlotData {
    Data { value: JsValue, writable: bool },
    Accessor { get: JsValue, set: JsValue },
}

/// One stored property: exactly one attribute record per key.
#[derive(Debug, Clone)]
pub struct PropertySlot {
    pub data: SlotData,
    pub enumerable: bool,
    pub configurable: bool,
}

impl PropertySlot {
    pub fn to_descriptor(&self) -> PropertyDescriptor {
        match &self.data {
            SlotData::Data { value, writable } => PropertyDescriptor::data(
                value.clone(),
                *writable,
                self.enumerable,
                self.configurable,
            ),
            SlotData::Accessor { get, set } => PropertyDescriptor::accessor(
                get.clone(),
                set.clone(),
                self.enumerable,
                self.configurable,
            ),
        }
    }

    pub fn from_descriptor(desc: &PropertyDescriptor) -> PropertySlot {
        let data = if desc.is_accessor_descriptor() {
            SlotData::Accessor {
                get: desc.get.clone().unwrap_or(JsValue::Undefined),
                set: desc.set.clone().unwrap_or(JsValue::Undefined),
            }
        } else {
            SlotData::Data {
                value: desc.value.clone().unwrap_or(JsValue::Undefined),
                writable: desc.writable.unwrap_or(false),
            }
        };
        PropertySlot {
            data,
            enumerable: desc.enumerable.unwrap_or(false),
            configurable: desc.configurable.unwrap_or(false),
        }
    }

    /// Merge the present fields of a validated descriptor into this slot,
    /// switching between data and accessor shape when the descriptor does.
    fn apply(&mut self, desc: &PropertyDescriptor) {
        if let Some(e) = desc.enumerable {
            self.enumerable = e;
        }
        if let Some(c) = desc.configurable {
            self.configurable = c;
        }
        if desc.is_accessor_descriptor() {
            match &mut self.data {
                SlotData::Accessor { get, set } => {
                    if let Some(g) = &desc.get {
                        *get = g.clone();
                    }
                    if let Some(s) = &desc.set {
                        *set = s.clone();
                    }
                }
                SlotData::Data { .. } => {
                    self.data = SlotData::Accessor {
                        get: desc.get.clone().unwrap_or(JsValue::Undefined),
                        set: desc.set.clone().unwrap_or(JsValue::Undefined),
                    };
                }
            }
        } else if desc.is_data_descriptor() {
            match &mut self.data {
                SlotData::Data { value, writable } => {
                    if let Some(v) = &desc.value {
                        *value = v.clone();
                    }
                    if let Some(w) = desc.writable {
                        *writable = w;
                    }
                }
                SlotData::Accessor { .. } => {
                    self.data = SlotData::Data {
                        value: desc.value.clone().unwrap_or(JsValue::Undefined),
                        writable: desc.writable.unwrap_or(false),
                    };
                }
            }
        }
    }
}

/// How `this` binds on entry to a function body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThisMode {
    /// Arrow-like: `this` resolves lexically through the scope chain.
    Lexical,
    /// Strict: the receiver is used as-is, even when undefined or primitive.
    Strict,
    /// Non-strict: null/undefined receivers become the global object and
    /// primitives are promoted to wrappers.
    Global,
}

/// Closure state of a bytecode-backed function object.
#[derive(Debug, Clone)]
pub struct FunctionData {
    pub name: Option<JsString>,
    pub code: Rc<CodeUnit>,
    pub scope: EnvRef,
    pub home_object: Option<JsObjectRef>,
}

impl FunctionData {
    pub fn this_mode(&self) -> ThisMode {
        if self.code.arrow {
            ThisMode::Lexical
        } else if self.code.strict {
            ThisMode::Strict
        } else {
            ThisMode::Global
        }
    }
}

pub type NativeFn = fn(&mut Interpreter, &JsValue, &[JsValue]) -> Completion<JsValue>;

/// A built-in function backed by a Rust fn pointer.
#[derive(Debug, Clone)]
pub struct NativeFunction {
    pub name: JsString,
    pub func: NativeFn,
}

/// Live-aliasing side table of a non-strict arguments object: argument
/// index to parameter binding name, read and written through the owning
/// declarative environment record.
#[derive(Debug)]
pub struct ParameterMap {
    pub env: EnvRef,
    pub names: FxHashMap<u32, JsString>,
}

/// Closed set of object kinds. The collection/regexp/date brands carry
/// payloads only and behave as ordinary objects; their built-in methods
/// live outside the runtime core.
#[derive(Debug)]
pub enum ObjectKind {
    Ordinary,
    Array,
    Function(FunctionData),
    Native(NativeFunction),
    Arguments(Option<ParameterMap>),
    StringWrapper(JsString),
    NumberWrapper(f64),
    BooleanWrapper(bool),
    Map { entries: Vec<(JsValue, JsValue)> },
    Set { entries: Vec<JsValue> },
    WeakMap { entries: Vec<(JsObjectRef, JsValue)> },
    RegExp { pattern: JsString, flags: JsString },
    Date { timestamp: f64 },
    PrivateName,
}

pub struct JsObject {
    pub prototype: Option<JsObjectRef>,
    pub extensible: bool,
    pub properties: IndexMap<PropertyKey, PropertySlot>,
    pub kind: ObjectKind,
}

impl fmt::Debug for JsObject {
    // Shallow on purpose: objects form cycles through scopes and prototypes.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[object {}]", self.brand())
    }
}

impl JsObject {
    pub fn with_kind(prototype: Option<JsObjectRef>, kind: ObjectKind) -> JsObjectRef {
        Rc::new(RefCell::new(JsObject {
            prototype,
            extensible: true,
            properties: IndexMap::new(),
            kind,
        }))
    }

    pub fn ordinary(prototype: Option<JsObjectRef>) -> JsObjectRef {
        Self::with_kind(prototype, ObjectKind::Ordinary)
    }

    pub fn array(prototype: Option<JsObjectRef>) -> JsObjectRef {
        let obj = Self::with_kind(prototype, ObjectKind::Array);
        let desc = PropertyDescriptor::data(JsValue::from(0u32), true, false, false);
        let _ = ordinary_define(&obj, PropertyKey::from("length"), &desc);
        obj
    }

    pub fn function(
        name: Option<JsString>,
        code: Rc<CodeUnit>,
        scope: EnvRef,
        home_object: Option<JsObjectRef>,
        prototype: Option<JsObjectRef>,
    ) -> JsObjectRef {
        Self::with_kind(
            prototype,
            ObjectKind::Function(FunctionData {
                name,
                code,
                scope,
                home_object,
            }),
        )
    }

    pub fn native(name: &str, func: NativeFn, prototype: Option<JsObjectRef>) -> JsObjectRef {
        Self::with_kind(
            prototype,
            ObjectKind::Native(NativeFunction {
                name: JsString::from(name),
                func,
            }),
        )
    }

    pub fn arguments(
        length: u32,
        map: Option<ParameterMap>,
        prototype: Option<JsObjectRef>,
    ) -> JsObjectRef {
        let obj = Self::with_kind(prototype, ObjectKind::Arguments(map));
        let desc = PropertyDescriptor::data(JsValue::from(length), true, false, true);
        let _ = ordinary_define(&obj, PropertyKey::from("length"), &desc);
        obj
    }

    pub fn string_wrapper(value: JsString, prototype: Option<JsObjectRef>) -> JsObjectRef {
        let len = value.as_str().chars().count() as u32;
        let obj = Self::with_kind(prototype, ObjectKind::StringWrapper(value));
        let desc = PropertyDescriptor::data(JsValue::from(len), false, false, false);
        let _ = ordinary_define(&obj, PropertyKey::from("length"), &desc);
        obj
    }

    pub fn number_wrapper(value: f64, prototype: Option<JsObjectRef>) -> JsObjectRef {
        Self::with_kind(prototype, ObjectKind::NumberWrapper(value))
    }

    pub fn boolean_wrapper(value: bool, prototype: Option<JsObjectRef>) -> JsObjectRef {
        Self::with_kind(prototype, ObjectKind::BooleanWrapper(value))
    }

    pub fn map(prototype: Option<JsObjectRef>) -> JsObjectRef {
        Self::with_kind(prototype, ObjectKind::Map { entries: Vec::new() })
    }

    pub fn set(prototype: Option<JsObjectRef>) -> JsObjectRef {
        Self::with_kind(prototype, ObjectKind::Set { entries: Vec::new() })
    }

    pub fn weakmap(prototype: Option<JsObjectRef>) -> JsObjectRef {
        Self::with_kind(prototype, ObjectKind::WeakMap { entries: Vec::new() })
    }

    pub fn regexp(pattern: JsString, flags: JsString, prototype: Option<JsObjectRef>) -> JsObjectRef {
        Self::with_kind(prototype, ObjectKind::RegExp { pattern, flags })
    }

    pub fn date(timestamp: f64, prototype: Option<JsObjectRef>) -> JsObjectRef {
        Self::with_kind(prototype, ObjectKind::Date { timestamp })
    }

    pub fn private_name(prototype: Option<JsObjectRef>) -> JsObjectRef {
        Self::with_kind(prototype, ObjectKind::PrivateName)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self.kind, ObjectKind::Function(_) | ObjectKind::Native(_))
    }

    pub fn function_data(&self) -> Option<&FunctionData> {
        match &self.kind {
            ObjectKind::Function(data) => Some(data),
            _ => None,
        }
    }

    pub fn brand(&self) -> &'static str {
        match &self.kind {
            ObjectKind::Ordinary => "Object",
            ObjectKind::Array => "Array",
            ObjectKind::Function(_) | ObjectKind::Native(_) => "Function",
            ObjectKind::Arguments(_) => "Arguments",
            ObjectKind::StringWrapper(_) => "String",
            ObjectKind::NumberWrapper(_) => "Number",
            ObjectKind::BooleanWrapper(_) => "Boolean",
            ObjectKind::Map { .. } => "Map",
            ObjectKind::Set { .. } => "Set",
            ObjectKind::WeakMap { .. } => "WeakMap",
            ObjectKind::RegExp { .. } => "RegExp",
            ObjectKind::Date { .. } => "Date",
            ObjectKind::PrivateName => "PrivateName",
        }
    }

    /// Own descriptor without parameter-map liveness: stored slots plus the
    /// string wrapper's synthesized indexed characters.
    fn own_descriptor(&self, key: &PropertyKey) -> Option<PropertyDescriptor> {
        if let Some(slot) = self.properties.get(key) {
            return Some(slot.to_descriptor());
        }
        if let (ObjectKind::StringWrapper(s), PropertyKey::Index(i)) = (&self.kind, key) {
            if let Some(ch) = s.as_str().chars().nth(*i as usize) {
                let value = JsValue::String(JsString::from(ch.to_string()));
                return Some(PropertyDescriptor::data(value, false, true, false));
            }
        }
        None
    }
}

/// Reason a pure property mutation was rejected. Strict-mode callers turn
/// these into thrown errors; non-strict writes swallow all but
/// `InvalidArrayLength`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefineError {
    NotExtensible,
    NotConfigurable,
    NotWritable,
    InvalidArrayLength,
    TruncationBlocked,
}

impl DefineError {
    pub fn message(&self, key: &PropertyKey) -> String {
        match self {
            DefineError::NotExtensible => {
                format!("Cannot define property {}, object is not extensible", key)
            }
            DefineError::NotConfigurable | DefineError::TruncationBlocked => {
                format!("Cannot redefine property: {}", key)
            }
            DefineError::NotWritable => {
                format!("Cannot assign to read only property '{}'", key)
            }
            DefineError::InvalidArrayLength => "Invalid array length".to_owned(),
        }
    }
}

/// GetOwnProperty: stored slot, synthesized string index, or the live
/// parameter-map value for a mapped arguments index.
pub fn get_own_property(obj: &JsObjectRef, key: &PropertyKey) -> Option<PropertyDescriptor> {
    let o = obj.borrow();
    let mut desc = o.own_descriptor(key)?;
    if let (ObjectKind::Arguments(Some(map)), PropertyKey::Index(i)) = (&o.kind, key) {
        if o.properties.contains_key(key) {
            if let Some(name) = map.names.get(i) {
                if let Some(live) = map.env.borrow().binding_value(name) {
                    desc.value = Some(live);
                }
            }
        }
    }
    Some(desc)
}

pub fn has_own_property(obj: &JsObjectRef, key: &PropertyKey) -> bool {
    obj.borrow().own_descriptor(key).is_some()
}

pub fn has_property(obj: &JsObjectRef, key: &PropertyKey) -> bool {
    let mut current = obj.cheap_clone();
    loop {
        if has_own_property(&current, key) {
            return true;
        }
        let proto = current.borrow().prototype.clone();
        match proto {
            Some(p) => current = p,
            None => return false,
        }
    }
}

/// GetP: prototype-chain read, invoking getters bound to `receiver`.
pub fn get_with_receiver(
    interp: &mut Interpreter,
    obj: &JsObjectRef,
    key: &PropertyKey,
    receiver: &JsValue,
) -> Completion<JsValue> {
    let mut current = obj.cheap_clone();
    loop {
        if let Some(desc) = get_own_property(&current, key) {
            if desc.is_accessor_descriptor() {
                let getter = desc.get.unwrap_or(JsValue::Undefined);
                if !getter.is_callable() {
                    return Ok(JsValue::Undefined);
                }
                return interp.call(&getter, receiver.clone(), &[]);
            }
            return Ok(desc.value.unwrap_or(JsValue::Undefined));
        }
        let proto = current.borrow().prototype.clone();
        match proto {
            Some(p) => current = p,
            None => return Ok(JsValue::Undefined),
        }
    }
}

pub fn get(interp: &mut Interpreter, obj: &JsObjectRef, key: &PropertyKey) -> Completion<JsValue> {
    let receiver = JsValue::Object(obj.cheap_clone());
    get_with_receiver(interp, obj, key, &receiver)
}

/// SetP: prototype-chain write. An accessor runs its setter against
/// `receiver`; a writable data property found up the chain is copied down
/// onto the receiver; an absent property is created on the receiver when it
/// is extensible. Returns whether the write took effect.
pub fn set_with_receiver(
    interp: &mut Interpreter,
    obj: &JsObjectRef,
    key: &PropertyKey,
    value: JsValue,
    receiver: &JsValue,
) -> Completion<bool> {
    let mut current = obj.cheap_clone();
    loop {
        if let Some(desc) = get_own_property(&current, key) {
            if desc.is_accessor_descriptor() {
                let setter = desc.set.unwrap_or(JsValue::Undefined);
                if !setter.is_callable() {
                    return Ok(false);
                }
                interp.call(&setter, receiver.clone(), &[value])?;
                return Ok(true);
            }
            if desc.writable != Some(true) {
                return Ok(false);
            }
            let Some(robj) = receiver.as_object() else {
                return Ok(false);
            };
            let result = if Rc::ptr_eq(robj, &current) {
                define_own_property(robj, key.clone(), PropertyDescriptor::with_value(value))
            } else if !robj.borrow().extensible {
                return Ok(false);
            } else {
                define_own_property(robj, key.clone(), PropertyDescriptor::data_default(value))
            };
            return convert_define_result(interp, result);
        }
        let proto = current.borrow().prototype.clone();
        match proto {
            Some(p) => current = p,
            None => {
                let Some(robj) = receiver.as_object() else {
                    return Ok(false);
                };
                if !robj.borrow().extensible {
                    return Ok(false);
                }
                let result =
                    define_own_property(robj, key.clone(), PropertyDescriptor::data_default(value));
                return convert_define_result(interp, result);
            }
        }
    }
}

// A rejected array-length write is a thrown range error even outside strict
// mode; every other rejection is a soft failure here.
fn convert_define_result(
    interp: &mut Interpreter,
    result: Result<(), DefineError>,
) -> Completion<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(DefineError::InvalidArrayLength) => Err(interp.range_error("Invalid array length")),
        Err(_) => Ok(false),
    }
}

/// Put: write with the object itself as receiver, throwing in strict mode
/// when the write is rejected.
pub fn put(
    interp: &mut Interpreter,
    obj: &JsObjectRef,
    key: PropertyKey,
    value: JsValue,
    strict: bool,
) -> Completion<()> {
    let receiver = JsValue::Object(obj.cheap_clone());
    let ok = set_with_receiver(interp, obj, &key, value, &receiver)?;
    if !ok && strict {
        return Err(interp.type_error(format!("Cannot assign to read only property '{}'", key)));
    }
    Ok(())
}

/// DefineOwnProperty with the array `length` invariant and parameter-map
/// maintenance layered over the ordinary validation policy.
pub fn define_own_property(
    obj: &JsObjectRef,
    key: PropertyKey,
    desc: PropertyDescriptor,
) -> Result<(), DefineError> {
    let is_array = matches!(obj.borrow().kind, ObjectKind::Array);
    if is_array {
        if key == PropertyKey::from("length") {
            return array_set_length(obj, desc);
        }
        if let PropertyKey::Index(index) = key {
            return array_define_index(obj, index, desc);
        }
    }
    ordinary_define(obj, key.clone(), &desc)?;
    update_parameter_map(obj, &key, &desc);
    Ok(())
}

/// Validation policy over the current own property:
/// absent → create when extensible; empty or equivalent → no-op success;
/// non-configurable → reject configurability/enumerability flips, shape
/// switches, value changes behind non-writable (SameValue), and get/set
/// changes; otherwise merge, filling omitted fields from the current slot.
fn ordinary_define(
    obj: &JsObjectRef,
    key: PropertyKey,
    desc: &PropertyDescriptor,
) -> Result<(), DefineError> {
    let mut o = obj.borrow_mut();
    let Some(current) = o.own_descriptor(&key) else {
        if !o.extensible {
            return Err(DefineError::NotExtensible);
        }
        o.properties.insert(key, PropertySlot::from_descriptor(desc));
        return Ok(());
    };
    if desc.is_empty() || desc.is_equivalent_to(&current) {
        return Ok(());
    }
    if current.configurable != Some(true) {
        if desc.configurable == Some(true) {
            return Err(DefineError::NotConfigurable);
        }
        if let Some(e) = desc.enumerable {
            if Some(e) != current.enumerable {
                return Err(DefineError::NotConfigurable);
            }
        }
        if !desc.is_generic_descriptor() {
            if desc.is_accessor_descriptor() != current.is_accessor_descriptor() {
                return Err(DefineError::NotConfigurable);
            }
            if current.is_accessor_descriptor() {
                let cur_get = current.get.clone().unwrap_or(JsValue::Undefined);
                let cur_set = current.set.clone().unwrap_or(JsValue::Undefined);
                if let Some(g) = &desc.get {
                    if !g.same_value(&cur_get) {
                        return Err(DefineError::NotConfigurable);
                    }
                }
                if let Some(s) = &desc.set {
                    if !s.same_value(&cur_set) {
                        return Err(DefineError::NotConfigurable);
                    }
                }
            } else if current.writable != Some(true) {
                if desc.writable == Some(true) {
                    return Err(DefineError::NotWritable);
                }
                if let Some(v) = &desc.value {
                    let cur = current.value.clone().unwrap_or(JsValue::Undefined);
                    if !v.same_value(&cur) {
                        return Err(DefineError::NotWritable);
                    }
                }
            }
        }
    }
    let slot = o
        .properties
        .entry(key)
        .or_insert_with(|| PropertySlot::from_descriptor(&current));
    slot.apply(desc);
    Ok(())
}

// After a successful redefinition of a mapped index: an accessor shape or
// writable:false unmaps it; a new value writes through to the binding.
fn update_parameter_map(obj: &JsObjectRef, key: &PropertyKey, desc: &PropertyDescriptor) {
    let PropertyKey::Index(index) = key else {
        return;
    };
    let mut o = obj.borrow_mut();
    let ObjectKind::Arguments(Some(map)) = &mut o.kind else {
        return;
    };
    let Some(name) = map.names.get(index) else {
        return;
    };
    if desc.is_accessor_descriptor() {
        map.names.remove(index);
        return;
    }
    if let Some(value) = &desc.value {
        map.env
            .borrow_mut()
            .set_binding_value(name, value.clone());
    }
    if desc.writable == Some(false) {
        map.names.remove(index);
    }
}

fn array_length_info(o: &JsObject) -> (u32, bool) {
    match o.properties.get(&PropertyKey::from("length")) {
        Some(PropertySlot {
            data: SlotData::Data {
                value: JsValue::Number(n),
                writable,
            },
            ..
        }) => (*n as u32, *writable),
        _ => (0, true),
    }
}

fn store_array_length(o: &mut JsObject, len: u32) {
    if let Some(PropertySlot {
        data: SlotData::Data { value, .. },
        ..
    }) = o.properties.get_mut(&PropertyKey::from("length"))
    {
        *value = JsValue::from(len);
    }
}

/// Writing `length`: the value must round-trip through ToUint32. Truncation
/// deletes indices high to low; a non-configurable index stops it, leaving
/// length = blocked index + 1 and reporting failure. A requested
/// writable:false lands only after all deletions succeed.
fn array_set_length(obj: &JsObjectRef, desc: PropertyDescriptor) -> Result<(), DefineError> {
    let length_key = PropertyKey::from("length");
    let Some(value) = desc.value.clone() else {
        return ordinary_define(obj, length_key, &desc);
    };
    if value.is_object() {
        return Err(DefineError::InvalidArrayLength);
    }
    let n = value.to_number_primitive();
    let new_len = to_uint32(n);
    if new_len as f64 != n {
        return Err(DefineError::InvalidArrayLength);
    }
    let (old_len, len_writable) = array_length_info(&obj.borrow());
    if new_len >= old_len {
        let mut d = desc;
        d.value = Some(JsValue::from(new_len));
        return ordinary_define(obj, length_key, &d);
    }
    if !len_writable {
        return Err(DefineError::NotWritable);
    }
    let defer_non_writable = desc.writable == Some(false);
    let mut d = desc;
    d.value = Some(JsValue::from(new_len));
    d.writable = Some(true);
    ordinary_define(obj, length_key.clone(), &d)?;
    let mut index = old_len;
    while index > new_len {
        index -= 1;
        if !delete(obj, &PropertyKey::Index(index)) {
            store_array_length(&mut obj.borrow_mut(), index + 1);
            return Err(DefineError::TruncationBlocked);
        }
    }
    if defer_non_writable {
        let freeze = PropertyDescriptor {
            writable: Some(false),
            ..Default::default()
        };
        ordinary_define(obj, length_key, &freeze)?;
    }
    Ok(())
}

// Index writes at or past the current length grow it, and are rejected
// outright when length is non-writable.
fn array_define_index(
    obj: &JsObjectRef,
    index: u32,
    desc: PropertyDescriptor,
) -> Result<(), DefineError> {
    let (old_len, len_writable) = array_length_info(&obj.borrow());
    if index >= old_len && !len_writable {
        return Err(DefineError::NotWritable);
    }
    ordinary_define(obj, PropertyKey::Index(index), &desc)?;
    if index >= old_len {
        store_array_length(&mut obj.borrow_mut(), index + 1);
    }
    Ok(())
}

/// Delete: absent reports success, configurable slots are removed (and
/// unmapped on an arguments object), the rest report failure.
pub fn delete(obj: &JsObjectRef, key: &PropertyKey) -> bool {
    let mut o = obj.borrow_mut();
    match o.properties.get(key) {
        None => o.own_descriptor(key).is_none(),
        Some(slot) if slot.configurable => {
            o.properties.shift_remove(key);
            if let (ObjectKind::Arguments(Some(map)), PropertyKey::Index(i)) = (&mut o.kind, key) {
                map.names.remove(i);
            }
            true
        }
        Some(_) => false,
    }
}

/// Enumerate: own enumerable keys in insertion order, then each prototype
/// level's, first occurrence winning.
pub fn enumerate(obj: &JsObjectRef) -> Vec<PropertyKey> {
    collect_keys(obj, true)
}

pub fn own_property_names(obj: &JsObjectRef) -> Vec<PropertyKey> {
    let o = obj.borrow();
    let mut keys = Vec::new();
    synthesized_keys(&o, &mut |key| {
        if !o.properties.contains_key(&key) {
            keys.push(key);
        }
    });
    keys.extend(o.properties.keys().cloned());
    keys
}

pub fn property_names(obj: &JsObjectRef) -> Vec<PropertyKey> {
    collect_keys(obj, false)
}

fn collect_keys(obj: &JsObjectRef, enumerable_only: bool) -> Vec<PropertyKey> {
    let mut seen: FxHashSet<PropertyKey> = FxHashSet::default();
    let mut out = Vec::new();
    let mut current = Some(obj.cheap_clone());
    while let Some(cur) = current {
        {
            let o = cur.borrow();
            synthesized_keys(&o, &mut |key| {
                if !o.properties.contains_key(&key) && seen.insert(key.clone()) {
                    out.push(key);
                }
            });
            for (key, slot) in &o.properties {
                if (!enumerable_only || slot.enumerable) && seen.insert(key.clone()) {
                    out.push(key.clone());
                }
            }
        }
        current = cur.borrow().prototype.clone();
    }
    out
}

// Enumerable synthesized indices of a string wrapper.
fn synthesized_keys(o: &JsObject, visit: &mut dyn FnMut(PropertyKey)) {
    if let ObjectKind::StringWrapper(s) = &o.kind {
        for i in 0..s.as_str().chars().count() {
            visit(PropertyKey::Index(i as u32));
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveHint {
    Number,
    String,
}

/// DefaultValue: try `valueOf`/`toString` in hint order, returning the
/// first primitive result.
pub fn default_value(
    interp: &mut Interpreter,
    obj: &JsObjectRef,
    hint: PrimitiveHint,
) -> Completion<JsValue> {
    let order = match hint {
        PrimitiveHint::String => ["toString", "valueOf"],
        PrimitiveHint::Number => ["valueOf", "toString"],
    };
    for name in order {
        let method = get(interp, obj, &PropertyKey::from(name))?;
        if method.is_callable() {
            let result = interp.call(&method, JsValue::Object(obj.cheap_clone()), &[])?;
            if !result.is_object() {
                return Ok(result);
            }
        }
    }
    Err(interp.type_error("Cannot convert object to primitive value"))
}
