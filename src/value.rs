//! Language value representation
//!
//! The core `JsValue` type plus the string and property-key types shared by
//! every other module.

use std::fmt;
use std::rc::Rc;

use crate::object::{JsObjectRef, ObjectKind};

/// Trait for types that have cheap (O(1), reference-counted) clones.
///
/// Makes it explicit when a clone is just a reference-count increment rather
/// than a data copy. `JsString`, `JsObjectRef`, and `EnvRef` all qualify.
pub trait CheapClone: Clone {
    /// Create a cheap (reference-counted) clone of this value.
    fn cheap_clone(&self) -> Self {
        self.clone()
    }
}

impl<T: ?Sized> CheapClone for Rc<T> {}

/// A language value
#[derive(Clone, Default)]
pub enum JsValue {
    #[default]
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(JsString),
    Object(JsObjectRef),
}

impl JsValue {
    /// Check if this value is null or undefined
    pub fn is_null_or_undefined(&self) -> bool {
        matches!(self, JsValue::Null | JsValue::Undefined)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, JsValue::Undefined)
    }

    pub fn is_object(&self) -> bool {
        matches!(self, JsValue::Object(_))
    }

    /// Check if this value is a primitive string/number/boolean, the cases a
    /// property reference promotes to a wrapper object on dereference.
    pub fn is_primitive_base(&self) -> bool {
        matches!(
            self,
            JsValue::String(_) | JsValue::Number(_) | JsValue::Boolean(_)
        )
    }

    /// Check if this value is callable (a function object)
    pub fn is_callable(&self) -> bool {
        match self {
            JsValue::Object(obj) => obj.borrow().is_callable(),
            _ => false,
        }
    }

    pub fn as_object(&self) -> Option<&JsObjectRef> {
        match self {
            JsValue::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// The `typeof` result for this value
    pub fn type_of(&self) -> &'static str {
        match self {
            JsValue::Undefined => "undefined",
            JsValue::Null => "object", // Historical quirk
            JsValue::Boolean(_) => "boolean",
            JsValue::Number(_) => "number",
            JsValue::String(_) => "string",
            JsValue::Object(obj) => {
                if obj.borrow().is_callable() {
                    "function"
                } else {
                    "object"
                }
            }
        }
    }

    /// Convert to boolean (ToBoolean); never fails
    pub fn to_boolean(&self) -> bool {
        match self {
            JsValue::Undefined | JsValue::Null => false,
            JsValue::Boolean(b) => *b,
            JsValue::Number(n) => *n != 0.0 && !n.is_nan(),
            JsValue::String(s) => !s.is_empty(),
            JsValue::Object(_) => true,
        }
    }

    /// ToNumber for primitives. Objects need ToPrimitive first and go through
    /// the interpreter.
    pub fn to_number_primitive(&self) -> f64 {
        match self {
            JsValue::Undefined => f64::NAN,
            JsValue::Null => 0.0,
            JsValue::Boolean(true) => 1.0,
            JsValue::Boolean(false) => 0.0,
            JsValue::Number(n) => *n,
            JsValue::String(s) => parse_number(s.as_str()),
            JsValue::Object(_) => f64::NAN,
        }
    }

    /// ToString for primitives (not bit-exact for exotic doubles)
    pub fn to_js_string_primitive(&self) -> JsString {
        match self {
            JsValue::Undefined => JsString::from("undefined"),
            JsValue::Null => JsString::from("null"),
            JsValue::Boolean(true) => JsString::from("true"),
            JsValue::Boolean(false) => JsString::from("false"),
            JsValue::Number(n) => JsString::from(format_number(*n)),
            JsValue::String(s) => s.cheap_clone(),
            JsValue::Object(_) => JsString::from("[object Object]"),
        }
    }

    /// Strict equality (===)
    pub fn strict_equals(&self, other: &JsValue) -> bool {
        match (self, other) {
            (JsValue::Undefined, JsValue::Undefined) => true,
            (JsValue::Null, JsValue::Null) => true,
            (JsValue::Boolean(a), JsValue::Boolean(b)) => a == b,
            (JsValue::Number(a), JsValue::Number(b)) => {
                // NaN !== NaN
                if a.is_nan() || b.is_nan() { false } else { a == b }
            }
            (JsValue::String(a), JsValue::String(b)) => a == b,
            (JsValue::Object(a), JsValue::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// SameValue: like `===` except NaN equals NaN and +0 differs from -0
    pub fn same_value(&self, other: &JsValue) -> bool {
        match (self, other) {
            (JsValue::Number(a), JsValue::Number(b)) => {
                if a.is_nan() && b.is_nan() {
                    true
                } else {
                    *a == *b && a.is_sign_positive() == b.is_sign_positive()
                }
            }
            _ => self.strict_equals(other),
        }
    }
}

impl fmt::Debug for JsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Undefined => write!(f, "undefined"),
            JsValue::Null => write!(f, "null"),
            JsValue::Boolean(b) => write!(f, "{}", b),
            JsValue::Number(n) => write!(f, "{}", n),
            JsValue::String(s) => write!(f, "\"{}\"", s.as_str()),
            JsValue::Object(obj) => match &obj.borrow().kind {
                ObjectKind::Ordinary => write!(f, "{{...}}"),
                ObjectKind::Array => write!(f, "[...]"),
                ObjectKind::Function(data) => {
                    let name = data.name.as_ref().map(|s| s.as_str()).unwrap_or("anonymous");
                    write!(f, "[Function: {}]", name)
                }
                ObjectKind::Native(native) => write!(f, "[Function: {}]", native.name),
                ObjectKind::Arguments(_) => write!(f, "[object Arguments]"),
                ObjectKind::StringWrapper(s) => write!(f, "[String: \"{}\"]", s),
                ObjectKind::NumberWrapper(n) => write!(f, "[Number: {}]", n),
                ObjectKind::BooleanWrapper(b) => write!(f, "[Boolean: {}]", b),
                ObjectKind::Map { entries } => write!(f, "Map({})", entries.len()),
                ObjectKind::Set { entries } => write!(f, "Set({})", entries.len()),
                ObjectKind::WeakMap { entries } => write!(f, "WeakMap({})", entries.len()),
                ObjectKind::RegExp { pattern, flags } => write!(f, "/{}/{}", pattern, flags),
                ObjectKind::Date { timestamp } => write!(f, "Date({})", timestamp),
                ObjectKind::PrivateName => write!(f, "[object PrivateName]"),
            },
        }
    }
}

impl PartialEq for JsValue {
    fn eq(&self, other: &Self) -> bool {
        self.strict_equals(other)
    }
}

impl From<bool> for JsValue {
    fn from(b: bool) -> Self {
        JsValue::Boolean(b)
    }
}

impl From<f64> for JsValue {
    fn from(n: f64) -> Self {
        JsValue::Number(n)
    }
}

impl From<u32> for JsValue {
    fn from(n: u32) -> Self {
        JsValue::Number(n as f64)
    }
}

impl From<&str> for JsValue {
    fn from(s: &str) -> Self {
        JsValue::String(JsString::from(s))
    }
}

impl From<JsString> for JsValue {
    fn from(s: JsString) -> Self {
        JsValue::String(s)
    }
}

impl From<JsObjectRef> for JsValue {
    fn from(obj: JsObjectRef) -> Self {
        JsValue::Object(obj)
    }
}

/// ToNumber on string input: trimmed, empty is zero, hex literals recognized
fn parse_number(s: &str) -> f64 {
    let t = s.trim();
    if t.is_empty() {
        return 0.0;
    }
    if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        return match u64::from_str_radix(hex, 16) {
            Ok(n) => n as f64,
            Err(_) => f64::NAN,
        };
    }
    match t {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ => t.parse::<f64>().unwrap_or(f64::NAN),
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".into()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity".into() } else { "-Infinity".into() }
    } else if n == 0.0 {
        "0".into()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// ToUint32: truncate and wrap into the unsigned 32-bit range
pub fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() || n == 0.0 {
        return 0;
    }
    n.trunc().rem_euclid(4294967296.0) as u32
}

/// ToInt32: like ToUint32 but reinterpreted as signed
pub fn to_int32(n: f64) -> i32 {
    to_uint32(n) as i32
}

/// Reference-counted immutable string
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct JsString(Rc<str>);

impl CheapClone for JsString {}

impl JsString {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl AsRef<str> for JsString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for JsString {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for JsString {
    fn eq(&self, other: &str) -> bool {
        self.0.as_ref() == other
    }
}

impl PartialEq<&str> for JsString {
    fn eq(&self, other: &&str) -> bool {
        self.0.as_ref() == *other
    }
}

impl From<&str> for JsString {
    fn from(s: &str) -> Self {
        JsString(s.into())
    }
}

impl From<String> for JsString {
    fn from(s: String) -> Self {
        JsString(s.into())
    }
}

impl fmt::Debug for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0)
    }
}

impl fmt::Display for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Property key (string or canonical array index)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    String(JsString),
    Index(u32),
}

impl PropertyKey {
    /// Convert an already-primitive value into a key. Object keys go through
    /// the interpreter's ToPropertyKey, which runs ToPrimitive first.
    pub fn from_primitive(value: &JsValue) -> Self {
        match value {
            JsValue::Number(n) => {
                let idx = *n as u32;
                if idx as f64 == *n && *n >= 0.0 && idx != u32::MAX {
                    PropertyKey::Index(idx)
                } else {
                    PropertyKey::String(value.to_js_string_primitive())
                }
            }
            JsValue::String(s) => PropertyKey::from(s.cheap_clone()),
            _ => PropertyKey::String(value.to_js_string_primitive()),
        }
    }

    pub fn as_index(&self) -> Option<u32> {
        match self {
            PropertyKey::Index(i) => Some(*i),
            PropertyKey::String(_) => None,
        }
    }

    pub fn to_js_string(&self) -> JsString {
        match self {
            PropertyKey::String(s) => s.cheap_clone(),
            PropertyKey::Index(i) => JsString::from(i.to_string()),
        }
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        // Canonical array index: digits only, no leading zeros except "0"
        if let Some(first) = s.bytes().next() {
            if first.is_ascii_digit() {
                if let Ok(idx) = s.parse::<u32>() {
                    if idx.to_string() == s && idx != u32::MAX {
                        return PropertyKey::Index(idx);
                    }
                }
            }
        }
        PropertyKey::String(JsString::from(s))
    }
}

impl From<JsString> for PropertyKey {
    fn from(s: JsString) -> Self {
        if let Some(first) = s.as_str().bytes().next() {
            if first.is_ascii_digit() {
                if let Ok(idx) = s.as_str().parse::<u32>() {
                    if idx.to_string() == s.as_str() && idx != u32::MAX {
                        return PropertyKey::Index(idx);
                    }
                }
            }
        }
        PropertyKey::String(s)
    }
}

impl From<u32> for PropertyKey {
    fn from(idx: u32) -> Self {
        PropertyKey::Index(idx)
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::String(s) => write!(f, "{}", s),
            PropertyKey::Index(i) => write!(f, "{}", i),
        }
    }
}
