//! [`SessionCatalog`]: the `flint_core::Catalog` a [`crate::Session`] plans
//! against. Delegates dataset resolution to `flint_connector::RegistryCatalog`
//! and answers `session_variable` out of this session's own locals/params,
//! falling back to the connection-wide globals (§4.8).

use std::sync::Arc;

use flint_connector::RegistryCatalog;
use flint_core::catalog::{Catalog, DatasetDescriptor};
use flint_error::Result;
use flint_types::ScalarValue;

use crate::variables::{GlobalVariables, SessionVariables};

pub struct SessionCatalog<'a> {
    registry_catalog: RegistryCatalog,
    locals: &'a SessionVariables,
    globals: Arc<GlobalVariables>,
}

impl<'a> SessionCatalog<'a> {
    pub fn new(registry_catalog: RegistryCatalog, locals: &'a SessionVariables, globals: Arc<GlobalVariables>) -> Self {
        SessionCatalog { registry_catalog, locals, globals }
    }
}

impl Catalog for SessionCatalog<'_> {
    fn resolve_dataset(&self, relation: &str) -> Result<DatasetDescriptor> {
        self.registry_catalog.resolve_dataset(relation)
    }

    /// A bound `?` parameter (`$1`, `$2`, ...) always wins, since that
    /// namespace can't collide with a user-chosen variable name; otherwise
    /// a session local shadows a same-named global.
    fn session_variable(&self, name: &str) -> Option<ScalarValue> {
        self.locals.get_param(name).or_else(|| self.locals.get_local(name)).or_else(|| self.globals.get(name))
    }

    fn known_relations(&self) -> Vec<String> {
        self.registry_catalog.known_relations()
    }
}
