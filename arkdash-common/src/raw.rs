///! Canonical object URLs for raw get/put/delete
///!
///! Most kinds are addressed through `_raw`; tenants, roles and users have
///! their own routes. The kind is classified once and each variant builds
///! its own path.

use crate::endpoint::BASE_HREF;
use crate::session::Session;
use crate::{Error, ObjectMeta, ObjectReference, Result, TypeMeta};

/// Addressing scheme of a kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawKind<'a> {
    /// Tenants are addressed by name at the top level
    Tenant,
    /// Roles live in a namespaced collection; holds the kind as given
    Role(&'a str),
    /// Users are addressed by name and id, never the signed-in user
    User,
    /// Everything else goes through `_raw`; holds the kind as given
    Generic(&'a str),
}

impl<'a> RawKind<'a> {
    pub fn classify(kind: &'a str) -> Self {
        match kind.to_ascii_lowercase().as_str() {
            "tenant" => RawKind::Tenant,
            "role" | "roles" => RawKind::Role(kind),
            "user" | "users" => RawKind::User,
            _ => RawKind::Generic(kind),
        }
    }

    /// Build the URL of `meta` in `tenant`.
    ///
    /// `signed_in_user` is the username of the current session; a user
    /// object with that name is refused with [`Error::SelfOperation`].
    pub fn url(&self, tenant: &str, meta: &ObjectMeta, signed_in_user: Option<&str>) -> Result<String> {
        match self {
            RawKind::Tenant => Ok(format!("{}/tenants/{}", BASE_HREF, meta.name)),
            RawKind::Role(kind) => {
                let namespace = required(meta, meta.namespace.as_deref(), "namespace")?;
                Ok(format!(
                    "{}/tenants/{}/namespaces/{}/{}/{}",
                    BASE_HREF, tenant, namespace, kind, meta.name
                ))
            }
            RawKind::User => {
                if signed_in_user == Some(meta.name.as_str()) {
                    return Err(Error::SelfOperation(meta.name.clone()));
                }
                let id = meta.id.ok_or_else(|| Error::MissingField {
                    name: meta.name.clone(),
                    field: "id",
                })?;
                Ok(format!("{}/tenants/{}/users/{}/{}", BASE_HREF, tenant, meta.name, id))
            }
            RawKind::Generic(kind) => {
                let mut url = String::from(BASE_HREF);
                if !tenant.is_empty() {
                    url.push_str("/tenants/");
                    url.push_str(tenant);
                }
                url.push_str("/_raw/");
                url.push_str(kind);
                if let Some(namespace) = meta.namespace.as_deref() {
                    url.push_str("/namespace/");
                    url.push_str(namespace);
                }
                url.push_str("/name/");
                url.push_str(&meta.name);
                Ok(url)
            }
        }
    }
}

fn required<'m>(meta: &ObjectMeta, value: Option<&'m str>, field: &'static str) -> Result<&'m str> {
    value.filter(|v| !v.is_empty()).ok_or_else(|| Error::MissingField {
        name: meta.name.clone(),
        field,
    })
}

/// Raw URL of one object
pub fn raw_url(
    tenant: &str,
    type_meta: &TypeMeta,
    object_meta: &ObjectMeta,
    signed_in_user: Option<&str>,
) -> Result<String> {
    RawKind::classify(&type_meta.kind).url(tenant, object_meta, signed_in_user)
}

/// Raw URL resolver bound to a session, which supplies the signed-in user
#[derive(Debug, Clone)]
pub struct RawResource {
    session: Session,
}

impl RawResource {
    /// Bind to `session`; later changes to the session are seen
    pub fn new(session: &Session) -> Self {
        Self {
            session: session.clone(),
        }
    }

    pub fn url(&self, tenant: &str, type_meta: &TypeMeta, object_meta: &ObjectMeta) -> Result<String> {
        let username = self.session.username();
        let url = raw_url(tenant, type_meta, object_meta, username.as_deref());
        if let Err(ref e) = url {
            tracing::debug!(kind = %type_meta.kind, name = %object_meta.name, "raw url refused: {}", e);
        }
        url
    }

    pub fn url_of(&self, tenant: &str, object: &ObjectReference) -> Result<String> {
        self.url(tenant, &object.type_meta, &object.object_meta)
    }
}
