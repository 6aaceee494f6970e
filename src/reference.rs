//! References
//!
//! A `Reference` is an unresolved assignable location: a base, a property
//! name, a strict flag, and (for super accesses) an explicit this-value.
//! `GetValue`/`PutValue` on the interpreter dereference them.

use crate::environment::EnvRef;
use crate::value::{JsValue, PropertyKey};

/// The base of a reference.
#[derive(Debug, Clone)]
pub enum Base {
    /// No binding or object was found; reading or writing is an error
    /// (non-strict writes fall back to creating a global binding).
    Unresolvable,
    /// A property reference: an object, or a primitive that promotes to a
    /// wrapper object on dereference.
    Value(JsValue),
    /// An environment-record reference from identifier resolution.
    Env(EnvRef),
}

/// An unresolved assignable location.
#[derive(Debug, Clone)]
pub struct Reference {
    pub base: Base,
    pub name: PropertyKey,
    pub strict: bool,
    /// Present for super references: the receiver the access binds to.
    pub this_value: Option<Box<JsValue>>,
}

impl Reference {
    pub fn unresolvable(name: PropertyKey, strict: bool) -> Self {
        Reference {
            base: Base::Unresolvable,
            name,
            strict,
            this_value: None,
        }
    }

    pub fn property(base: JsValue, name: PropertyKey, strict: bool) -> Self {
        Reference {
            base: Base::Value(base),
            name,
            strict,
            this_value: None,
        }
    }

    pub fn env(env: EnvRef, name: PropertyKey, strict: bool) -> Self {
        Reference {
            base: Base::Env(env),
            name,
            strict,
            this_value: None,
        }
    }

    pub fn super_property(
        base: JsValue,
        name: PropertyKey,
        strict: bool,
        this_value: JsValue,
    ) -> Self {
        Reference {
            base: Base::Value(base),
            name,
            strict,
            this_value: Some(Box::new(this_value)),
        }
    }

    pub fn is_unresolvable(&self) -> bool {
        matches!(self.base, Base::Unresolvable)
    }

    /// Property references have an object base or a primitive base.
    pub fn is_property_reference(&self) -> bool {
        match &self.base {
            Base::Value(v) => v.is_object() || v.is_primitive_base(),
            _ => false,
        }
    }

    pub fn is_super_reference(&self) -> bool {
        self.this_value.is_some()
    }
}
