//! Common types and URL/tenant resolution shared by the arkdash console

pub mod auth;
pub mod endpoint;
pub mod raw;
pub mod session;
pub mod tenant;
pub mod view;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use endpoint::{EndpointManager, PathParams, ResourceEndpoint, ResourceKind, Utility};
pub use raw::{RawKind, RawResource};
pub use session::{Session, SessionKey, UserType};
pub use tenant::{TenantPrecedence, TenantService};
pub use view::ViewContext;

/// Name of the distinguished cluster-wide tenant
pub const SYSTEM_TENANT: &str = "system";

/// Namespace used when the session does not name one
pub const DEFAULT_NAMESPACE: &str = "default";

/// Kind descriptor of an object as returned by the backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TypeMeta {
    pub kind: String,
}

impl TypeMeta {
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into() }
    }
}

/// Identity of one object instance
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<DateTime<Utc>>,
}

impl ObjectMeta {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }
}

/// A concrete object: its kind plus its identity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReference {
    pub type_meta: TypeMeta,
    pub object_meta: ObjectMeta,
}

impl ObjectReference {
    pub fn new(kind: impl Into<String>, object_meta: ObjectMeta) -> Self {
        Self {
            type_meta: TypeMeta::new(kind),
            object_meta,
        }
    }
}

/// Library error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Operation on the signed-in user '{0}' is not permitted")]
    SelfOperation(String),

    #[error("Object '{name}' has no {field}")]
    MissingField { name: String, field: &'static str },

    #[error("Invalid tenant name: {0}")]
    InvalidTenant(String),

    #[error("Unknown resource kind: {0}")]
    UnknownKind(String),

    #[error("Unresolved placeholder {placeholder} in {template}")]
    UnresolvedPlaceholder {
        placeholder: &'static str,
        template: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
