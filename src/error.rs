//! Host-boundary errors
//!
//! Inside the runtime everything abrupt travels as a completion record; this
//! module is the translation to a host-facing error once a run finishes.
//! Rendering a thrown value reads `name`/`message` as plain data properties
//! so that a hostile getter cannot run during error formatting.

use thiserror::Error;

use crate::object::{self, JsObjectRef};
use crate::value::{JsValue, PropertyKey};

#[derive(Debug, Error)]
pub enum EngineError {
    /// A Throw completion escaped the outermost code unit.
    #[error("uncaught exception: {}", describe_thrown(.value))]
    Uncaught { value: JsValue },

    /// The machine hit ill-formed bytecode: stack underflow, a marker in a
    /// value position, or a Break/Continue completion escaping the unit.
    #[error("malformed code unit: {reason}")]
    MalformedCode { reason: String },

    /// `Engine::run` was called while the engine is paused.
    #[error("engine is paused")]
    Paused,
}

/// Render a thrown value for display. Error-shaped objects become
/// `Name: message` from data properties only; getters are never invoked.
pub fn describe_thrown(value: &JsValue) -> String {
    let Some(obj) = value.as_object() else {
        return value.to_js_string_primitive().to_string();
    };
    let name = data_property_string(obj, &PropertyKey::from("name"));
    let message = data_property_string(obj, &PropertyKey::from("message"));
    match (name, message) {
        (Some(name), Some(message)) if !message.is_empty() => {
            format!("{}: {}", name, message)
        }
        (Some(name), _) => name,
        (None, Some(message)) => message,
        (None, None) => value.to_js_string_primitive().to_string(),
    }
}

// Prototype-chain lookup restricted to primitive-valued data properties.
fn data_property_string(obj: &JsObjectRef, key: &PropertyKey) -> Option<String> {
    let mut current = obj.clone();
    loop {
        if let Some(desc) = object::get_own_property(&current, key) {
            return match desc.value {
                Some(JsValue::Object(_)) | None => None,
                Some(value) => Some(value.to_js_string_primitive().to_string()),
            };
        }
        let proto = current.borrow().prototype.clone();
        match proto {
            Some(p) => current = p,
            None => return None,
        }
    }
}
