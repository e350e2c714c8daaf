//! Scoped blackboard accessor.

use crate::{AccessError, KeyError};

use super::{Access, BlackboardHandle, ClientId, SEPARATOR, Value};

/// A scoped view of the [`Blackboard`](super::Blackboard), bound to a
/// namespace prefix.
///
/// Relative key names are transparently qualified against the namespace, so
/// independent subsystems can share the store without key collisions as long
/// as their prefixes differ. Dotted suffixes (`battery.percentage`) address
/// nested attributes of the stored value, not deeper keys.
#[derive(Debug)]
pub struct Client {
    handle: BlackboardHandle,
    id: ClientId,
    name: String,
    namespace: String,
}

impl Client {
    /// A client rooted at the top-level namespace.
    pub fn new(handle: &BlackboardHandle, name: impl Into<String>) -> Self {
        Self::with_namespace(handle, name, "")
    }

    /// A client whose relative keys are qualified under `namespace`.
    pub fn with_namespace(
        handle: &BlackboardHandle,
        name: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let id = handle.borrow_mut().register_client(&name);
        Self {
            handle: handle.clone(),
            id,
            name,
            namespace: normalize_namespace(namespace.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Declare intent for a key before using it.
    pub fn register_key(&self, variable: &str, access: Access) -> Result<(), AccessError> {
        let (key, _) = self.qualify(variable);
        self.handle.borrow_mut().register_key(self.id, &key, access)
    }

    /// Read a variable, resolving any dotted attribute suffix.
    pub fn get(&self, variable: &str) -> Result<Value, KeyError> {
        let (key, attribute) = self.qualify(variable);
        self.handle
            .borrow_mut()
            .get(self.id, &key, attribute.as_deref())
    }

    /// Store a value, overwriting any existing one.
    pub fn set(&self, variable: &str, value: impl Into<Value>) -> Result<(), AccessError> {
        let (key, attribute) = self.qualify(variable);
        self.handle
            .borrow_mut()
            .set(self.id, &key, attribute.as_deref(), value.into(), true)
            .map(|_| ())
    }

    /// Store a value only if the slot is empty.
    ///
    /// Returns `Ok(false)` when an existing value was left untouched.
    pub fn set_if_absent(
        &self,
        variable: &str,
        value: impl Into<Value>,
    ) -> Result<bool, AccessError> {
        let (key, attribute) = self.qualify(variable);
        self.handle
            .borrow_mut()
            .set(self.id, &key, attribute.as_deref(), value.into(), false)
    }

    /// Remove a key. Returns whether it was present.
    pub fn unset(&self, variable: &str) -> Result<bool, AccessError> {
        let (key, _) = self.qualify(variable);
        self.handle.borrow_mut().unset(self.id, &key)
    }

    /// Split a variable name into its fully-qualified key and an optional
    /// nested attribute path.
    fn qualify(&self, variable: &str) -> (String, Option<String>) {
        let (key_part, attribute) = match variable.split_once('.') {
            Some((key, attrs)) => (key, Some(attrs.to_string())),
            None => (variable, None),
        };
        let key = if key_part.starts_with(SEPARATOR) {
            key_part.to_string()
        } else {
            format!("{}{}{}", self.namespace, SEPARATOR, key_part)
        };
        (key, attribute)
    }
}

fn normalize_namespace(namespace: String) -> String {
    let trimmed = namespace.trim_matches(SEPARATOR);
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{SEPARATOR}{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blackboard::Blackboard;

    #[test]
    fn relative_keys_are_qualified_against_the_namespace() {
        let bb = Blackboard::new_shared();
        let navigation = Client::with_namespace(&bb, "navigation", "nav");
        let manipulation = Client::with_namespace(&bb, "manipulation", "arm");

        navigation.register_key("goal", Access::Write).unwrap();
        manipulation.register_key("goal", Access::Write).unwrap();

        navigation.set("goal", 3i64).unwrap();
        manipulation.set("goal", 7i64).unwrap();

        assert_eq!(navigation.get("goal"), Ok(Value::Int(3)));
        assert_eq!(manipulation.get("goal"), Ok(Value::Int(7)));
        assert!(bb.borrow().contains("/nav/goal"));
        assert!(bb.borrow().contains("/arm/goal"));
    }

    #[test]
    fn absolute_keys_bypass_the_namespace() {
        let bb = Blackboard::new_shared();
        let client = Client::with_namespace(&bb, "c", "/deep/prefix");
        client.register_key("/global", Access::Write).unwrap();
        client.set("/global", true).unwrap();
        assert!(bb.borrow().contains("/global"));
    }

    #[test]
    fn dotted_suffix_addresses_nested_attributes() {
        let bb = Blackboard::new_shared();
        let client = Client::new(&bb, "c");
        client.register_key("battery", Access::Write).unwrap();

        client.set("battery.percentage", 87i64).unwrap();
        assert_eq!(client.get("battery.percentage"), Ok(Value::Int(87)));
        assert!(matches!(
            client.get("battery.voltage"),
            Err(KeyError::AttributeNotFound { .. })
        ));
    }

    #[test]
    fn set_if_absent_signals_existing_value() {
        let bb = Blackboard::new_shared();
        let client = Client::new(&bb, "c");
        client.register_key("done", Access::Write).unwrap();

        assert_eq!(client.set_if_absent("done", true), Ok(true));
        assert_eq!(client.set_if_absent("done", false), Ok(false));
        assert_eq!(client.get("done"), Ok(Value::Bool(true)));
    }
}
