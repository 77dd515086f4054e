//! Key-value bag of JSON values.
//!
//! Used for node outputs, global variables and the execution context itself.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vars {
    inner: Map<String, Value>,
}

impl Vars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any previous one under the same key.
    pub fn set<T: Into<Value>>(
        &mut self,
        key: &str,
        value: T,
    ) {
        self.inner.insert(key.to_string(), value.into());
    }

    /// Builder form of [`Vars::set`].
    pub fn with<T: Into<Value>>(
        mut self,
        key: &str,
        value: T,
    ) -> Self {
        self.set(key, value);
        self
    }

    /// Get a value through `key` and deserialize it into `T`.
    pub fn get<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Option<T> {
        self.inner.get(key).and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Borrow the raw JSON value stored under `key`.
    pub fn get_value(
        &self,
        key: &str,
    ) -> Option<&Value> {
        self.inner.get(key)
    }

    pub fn contains_key(
        &self,
        key: &str,
    ) -> bool {
        self.inner.contains_key(key)
    }

    /// Copy every entry of `other` into `self`.
    pub fn extend(
        &mut self,
        other: Vars,
    ) {
        self.inner.extend(other.inner);
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.inner.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.inner.iter()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.inner
    }
}

impl From<Value> for Vars {
    /// Objects are taken as-is; any other value is stored under `value`.
    fn from(value: Value) -> Self {
        match value {
            Value::Object(inner) => Self {
                inner,
            },
            Value::Null => Self::new(),
            other => Self::new().with("value", other),
        }
    }
}

impl From<Map<String, Value>> for Vars {
    fn from(inner: Map<String, Value>) -> Self {
        Self {
            inner,
        }
    }
}

impl From<Vars> for Value {
    fn from(vars: Vars) -> Self {
        Value::Object(vars.inner)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_with_and_get() {
        let vars = Vars::new().with("name", "Alice").with("age", 30);
        assert_eq!(vars.get::<String>("name"), Some("Alice".to_string()));
        assert_eq!(vars.get::<i64>("age"), Some(30));
        assert_eq!(vars.get::<i64>("name"), None);
    }

    #[test]
    fn test_from_non_object_value() {
        let vars = Vars::from(json!("hello"));
        assert_eq!(vars.get::<String>("value"), Some("hello".to_string()));
        assert!(Vars::from(Value::Null).is_empty());
    }

    #[test]
    fn test_extend_overwrites() {
        let mut a = Vars::new().with("x", 1).with("y", 2);
        a.extend(Vars::new().with("y", 3));
        assert_eq!(Value::from(a), json!({"x": 1, "y": 3}));
    }
}
