//! Property descriptors
//!
//! The normalized description of a property: an optional value/writable pair
//! or get/set pair plus the enumerable/configurable bits. Fields are `Option`
//! so a descriptor can be partial; `DefineOwnProperty` fills omitted fields
//! from the current property and `complete()` fills spec defaults.

use crate::value::JsValue;

/// A (possibly partial) property descriptor.
#[derive(Debug, Clone, Default)]
pub struct PropertyDescriptor {
    pub value: Option<JsValue>,
    pub writable: Option<bool>,
    pub get: Option<JsValue>,
    pub set: Option<JsValue>,
    pub enumerable: Option<bool>,
    pub configurable: Option<bool>,
}

impl PropertyDescriptor {
    /// A fully-specified data descriptor.
    pub fn data(value: JsValue, writable: bool, enumerable: bool, configurable: bool) -> Self {
        PropertyDescriptor {
            value: Some(value),
            writable: Some(writable),
            get: None,
            set: None,
            enumerable: Some(enumerable),
            configurable: Some(configurable),
        }
    }

    /// Writable, enumerable, configurable data descriptor.
    pub fn data_default(value: JsValue) -> Self {
        Self::data(value, true, true, true)
    }

    /// A fully-specified accessor descriptor. Absent getters/setters are
    /// `JsValue::Undefined`.
    pub fn accessor(get: JsValue, set: JsValue, enumerable: bool, configurable: bool) -> Self {
        PropertyDescriptor {
            value: None,
            writable: None,
            get: Some(get),
            set: Some(set),
            enumerable: Some(enumerable),
            configurable: Some(configurable),
        }
    }

    /// A partial descriptor carrying only a value.
    pub fn with_value(value: JsValue) -> Self {
        PropertyDescriptor {
            value: Some(value),
            ..Default::default()
        }
    }

    pub fn is_data_descriptor(&self) -> bool {
        self.value.is_some() || self.writable.is_some()
    }

    pub fn is_accessor_descriptor(&self) -> bool {
        self.get.is_some() || self.set.is_some()
    }

    pub fn is_generic_descriptor(&self) -> bool {
        !self.is_data_descriptor() && !self.is_accessor_descriptor()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_none()
            && self.writable.is_none()
            && self.get.is_none()
            && self.set.is_none()
            && self.enumerable.is_none()
            && self.configurable.is_none()
    }

    /// Field-wise equivalence under SameValue; an absent field compares as
    /// undefined, the way the original stores descriptors.
    pub fn is_equivalent_to(&self, other: &PropertyDescriptor) -> bool {
        fn same(a: &Option<JsValue>, b: &Option<JsValue>) -> bool {
            let a = a.clone().unwrap_or(JsValue::Undefined);
            let b = b.clone().unwrap_or(JsValue::Undefined);
            a.same_value(&b)
        }
        fn same_flag(a: Option<bool>, b: Option<bool>) -> bool {
            let a = a.map(JsValue::Boolean).unwrap_or(JsValue::Undefined);
            let b = b.map(JsValue::Boolean).unwrap_or(JsValue::Undefined);
            a.same_value(&b)
        }
        same(&self.value, &other.value)
            && same(&self.get, &other.get)
            && same(&self.set, &other.set)
            && same_flag(self.writable, other.writable)
            && same_flag(self.enumerable, other.enumerable)
            && same_flag(self.configurable, other.configurable)
    }

    /// Fill omitted fields with spec defaults (ToCompletePropertyDescriptor).
    pub fn complete(mut self) -> Self {
        if self.is_generic_descriptor() || self.is_data_descriptor() {
            self.value.get_or_insert(JsValue::Undefined);
            self.writable.get_or_insert(false);
        } else {
            self.get.get_or_insert(JsValue::Undefined);
            self.set.get_or_insert(JsValue::Undefined);
        }
        self.enumerable.get_or_insert(false);
        self.configurable.get_or_insert(false);
        self
    }
}
