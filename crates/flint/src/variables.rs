//! `@name` session locals, `@@name` globals, and positional `?` parameters
//! (§3, §4.8). All three resolve through the same
//! [`flint_core::Catalog::session_variable`] hook once bound — see
//! [`crate::catalog::SessionCatalog`] — because `ast::Expr::SessionVariable`
//! lowers `@name`/`@@name` to the same `source_column` regardless of how
//! many `@`s the user wrote, and `?` placeholders lower to an identifier
//! named `$<n>` with no source at all.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use flint_types::ScalarValue;

/// `@@name` globals, shared by every [`crate::Session`] spawned from the
/// same [`crate::Connection`].
#[derive(Debug, Default)]
pub struct GlobalVariables(RwLock<HashMap<String, ScalarValue>>);

impl GlobalVariables {
    pub fn new() -> Arc<Self> {
        Arc::new(GlobalVariables::default())
    }

    pub fn get(&self, name: &str) -> Option<ScalarValue> {
        self.0.read().get(name).cloned()
    }

    pub fn set(&self, name: impl Into<String>, value: ScalarValue) {
        self.0.write().insert(name.into(), value);
    }

    pub fn names(&self) -> Vec<String> {
        self.0.read().keys().cloned().collect()
    }
}

/// `@name` locals and bound statement parameters, scoped to one `Session`.
#[derive(Debug, Default)]
pub struct SessionVariables {
    locals: HashMap<String, ScalarValue>,
    params: HashMap<String, ScalarValue>,
}

impl SessionVariables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_local(&mut self, name: impl Into<String>, value: ScalarValue) {
        self.locals.insert(name.into(), value);
    }

    pub fn get_local(&self, name: &str) -> Option<ScalarValue> {
        self.locals.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.locals.keys().cloned().collect()
    }

    /// Stage `params[i]` under the key `$<i+1>`, replacing whatever a
    /// previous call staged. Called once per `Session::execute`.
    pub fn bind_params(&mut self, params: &[ScalarValue]) {
        self.params.clear();
        for (i, value) in params.iter().enumerate() {
            self.params.insert(format!("${}", i + 1), value.clone());
        }
    }

    pub fn get_param(&self, key: &str) -> Option<ScalarValue> {
        self.params.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_params_keys_are_one_indexed() {
        let mut vars = SessionVariables::new();
        vars.bind_params(&[ScalarValue::Int64(7), ScalarValue::Utf8("x".to_string())]);
        assert_eq!(vars.get_param("$1"), Some(ScalarValue::Int64(7)));
        assert_eq!(vars.get_param("$2"), Some(ScalarValue::Utf8("x".to_string())));
        assert_eq!(vars.get_param("$3"), None);
    }

    #[test]
    fn globals_are_visible_across_handles() {
        let globals = GlobalVariables::new();
        globals.set("region", ScalarValue::Utf8("eu".to_string()));
        assert_eq!(globals.get("region"), Some(ScalarValue::Utf8("eu".to_string())));
    }
}
