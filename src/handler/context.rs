//! Explicit handling context.

use std::collections::HashMap;

/// Configuration scoped to the component that owns it, handed by reference
/// into every handling call.
#[derive(Debug, Clone, Default)]
pub struct Context {
    name: String,
    parameters: HashMap<String, String>,
}

impl Context {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: HashMap::new(),
        }
    }

    /// Component path used in log events, e.g. `server/example.com`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    /// A context for a nested component, inheriting the parameters.
    pub fn child(&self, name: &str) -> Self {
        Self {
            name: format!("{}/{}", self.name, name),
            parameters: self.parameters.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_inherits_parameters() {
        let parent = Context::new("server").with_parameter("env", "prod");
        let child = parent.child("api");
        assert_eq!(child.name(), "server/api");
        assert_eq!(child.parameter("env"), Some("prod"));
        assert_eq!(parent.parameter("missing"), None);
    }
}
