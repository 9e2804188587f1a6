///! Authentication types exchanged with the backend

use crate::endpoint::BASE_HREF;
use crate::session::UserType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Header carrying the session token
pub const AUTH_TOKEN_HEADER: &str = "jweToken";

/// Header carrying the per-action CSRF token
pub const CSRF_HEADER: &str = "X-CSRF-TOKEN";

/// Login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginSpec {
    pub username: String,
    pub password: String,
    pub tenant: String,
    pub namespace: String,
}

/// Login response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub jwe_token: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub errors: Vec<serde_json::Value>,
}

/// Token returned by `tenants/{tenant}/csrftoken/{action}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsrfToken {
    pub token: String,
}

/// Console account as stored by the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleUser {
    #[serde(default)]
    pub id: i64,
    #[serde(rename = "name")]
    pub username: String,
    #[serde(rename = "type")]
    pub user_type: UserType,
    #[serde(default)]
    pub tenant: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub creation_timestamp: Option<DateTime<Utc>>,
}

/// Response of `user/{username}`: the account wrapped as an object
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleUserDetail {
    pub object_meta: ConsoleUser,
    #[serde(default)]
    pub phase: String,
}

/// Path of one account's record
pub fn user_detail_path(username: &str) -> String {
    format!("{}/user/{}", BASE_HREF, username)
}

impl ConsoleUser {
    /// Tenant the account resolves to; cluster admins work in the system tenant
    pub fn home_tenant<'a>(&'a self, system_tenant: &'a str) -> &'a str {
        if self.user_type.is_cluster_admin() {
            system_tenant
        } else {
            &self.tenant
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_response_from_backend() {
        let json = r#"{"jweToken": "abc.def", "errors": []}"#;
        let response: AuthResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.jwe_token, "abc.def");
        assert!(response.namespace.is_none());
        assert!(response.errors.is_empty());
    }

    #[test]
    fn test_console_user_fields() {
        let json = r#"{
            "id": 4,
            "name": "alice",
            "password": "",
            "token": "",
            "type": "tenant-admin",
            "tenant": "acme",
            "role": "admin-role",
            "namespace": "default",
            "creationTimestamp": "2020-09-01T00:00:00Z"
        }"#;
        let user: ConsoleUser = serde_json::from_str(json).unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.user_type, UserType::TenantAdmin);
        assert_eq!(user.home_tenant("system"), "acme");
    }

    #[test]
    fn test_user_detail_wraps_account() {
        let json = r#"{
            "objectMeta": {
                "id": 1,
                "name": "root",
                "password": "***********",
                "type": "cluster-admin",
                "tenant": "system",
                "creationTimestamp": "0001-01-01T00:00:00Z"
            },
            "typeMeta": {"kind": "user"},
            "phase": "Active"
        }"#;
        let detail: ConsoleUserDetail = serde_json::from_str(json).unwrap();
        assert!(detail.object_meta.user_type.is_cluster_admin());
        assert_eq!(user_detail_path("root"), "api/v1/user/root");
    }

    #[test]
    fn test_cluster_admin_home_tenant() {
        let json = r#"{"name": "root", "type": "cluster-admin", "tenant": "acme"}"#;
        let user: ConsoleUser = serde_json::from_str(json).unwrap();
        assert_eq!(user.home_tenant("system"), "system");
    }

    #[test]
    fn test_login_spec_serialization() {
        let spec = LoginSpec {
            username: "alice".to_string(),
            password: "secret".to_string(),
            tenant: "acme".to_string(),
            namespace: "default".to_string(),
        };
        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value["tenant"], "acme");
        assert_eq!(value["namespace"], "default");
    }
}
