use std::sync::Arc;

use crate::ids::IdentityProvider;
use crate::store::RecordStore;

/// Collaborators shared by every handler, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<dyn IdentityProvider>,
    pub store: Arc<dyn RecordStore>,
}

impl AppState {
    pub fn new(identity: Arc<dyn IdentityProvider>, store: Arc<dyn RecordStore>) -> Self {
        Self { identity, store }
    }
}
