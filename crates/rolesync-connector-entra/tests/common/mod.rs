//! Common test utilities for rolesync-connector-entra integration tests.

use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rolesync_connector_entra::{EntraConfig, EntraCredentials, EntraDirectory};

pub const TENANT: &str = "test-tenant";
pub const APP_ID: &str = "app-0001";
pub const SP_OBJECT_ID: &str = "sp-obj-0001";

/// Test data factory for an appRoleAssignedTo entry.
pub fn create_assignment(id: &str, principal_id: &str, principal_type: &str, role_id: &str) -> Value {
    json!({
        "id": id,
        "principalId": principal_id,
        "principalDisplayName": format!("Principal {}", principal_id),
        "principalType": principal_type,
        "appRoleId": role_id
    })
}

/// Test data factory for a group member entry.
pub fn create_member(id: &str, upn: &str) -> Value {
    json!({
        "id": id,
        "displayName": format!("Member {}", id),
        "userPrincipalName": upn,
        "accountEnabled": true
    })
}

/// Wraps items in an OData response format.
pub fn create_odata_response(items: Vec<Value>, next_link: Option<&str>) -> Value {
    let mut response = json!({ "value": items });
    if let Some(link) = next_link {
        response["@odata.nextLink"] = json!(link);
    }
    response
}

/// Creates an OData error response body.
pub fn create_odata_error(code: &str, message: &str) -> Value {
    json!({
        "error": {
            "code": code,
            "message": message
        }
    })
}

/// Creates a mock OAuth token response.
pub fn create_token_response(access_token: &str, expires_in: u64) -> Value {
    json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "expires_in": expires_in
    })
}

/// Mock Graph server wrapper with common setup helpers.
pub struct MockGraphServer {
    pub server: MockServer,
}

impl MockGraphServer {
    /// Creates a new mock Graph API server.
    pub async fn new() -> Self {
        let server = MockServer::start().await;
        Self { server }
    }

    /// Returns the mock server's base URL.
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Builds a directory provider pointed at this mock server.
    pub fn directory(&self) -> EntraDirectory {
        let config = EntraConfig::builder()
            .tenant_id(TENANT)
            .app_id(APP_ID)
            .login_endpoint(self.url())
            .graph_endpoint(self.url())
            .page_size(10)
            .request_timeout(Duration::from_secs(5))
            .build()
            .unwrap();

        let credentials = EntraCredentials::new("client-1", "secret-1");

        EntraDirectory::new(config, credentials).unwrap()
    }

    /// Sets up the OAuth token endpoint.
    pub async fn mock_token_endpoint(&self) {
        Mock::given(method("POST"))
            .and(path(format!("/{TENANT}/oauth2/v2.0/token")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(create_token_response("mock-access-token", 3600)),
            )
            .mount(&self.server)
            .await;
    }

    /// Sets up the service principal resolution endpoint.
    pub async fn mock_service_principal(&self) {
        let response = create_odata_response(
            vec![json!({
                "id": SP_OBJECT_ID,
                "appId": APP_ID,
                "displayName": "Test Application"
            })],
            None,
        );

        Mock::given(method("GET"))
            .and(path("/v1.0/servicePrincipals"))
            .respond_with(ResponseTemplate::new(200).set_body_json(response))
            .mount(&self.server)
            .await;
    }

    /// Sets up the assignment listing endpoint with a single page.
    pub async fn mock_assignments(&self, assignments: Vec<Value>) {
        let response = create_odata_response(assignments, None);
        Mock::given(method("GET"))
            .and(path(format!(
                "/v1.0/servicePrincipals/{SP_OBJECT_ID}/appRoleAssignedTo"
            )))
            .respond_with(ResponseTemplate::new(200).set_body_json(response))
            .mount(&self.server)
            .await;
    }

    /// Sets up the grant endpoint returning the created assignment.
    pub async fn mock_grant(&self, created_id: &str) {
        Mock::given(method("POST"))
            .and(path(format!(
                "/v1.0/servicePrincipals/{SP_OBJECT_ID}/appRoleAssignedTo"
            )))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": created_id,
                "principalDisplayName": "Granted Principal"
            })))
            .mount(&self.server)
            .await;
    }

    /// Sets up the revoke endpoint for a specific assignment object id.
    pub async fn mock_revoke(&self, assignment_id: &str, status: u16) {
        let template = if status == 204 {
            ResponseTemplate::new(204)
        } else {
            ResponseTemplate::new(status).set_body_json(create_odata_error(
                "Request_ResourceNotFound",
                "Resource does not exist",
            ))
        };

        Mock::given(method("DELETE"))
            .and(path(format!(
                "/v1.0/servicePrincipals/{SP_OBJECT_ID}/appRoleAssignedTo/{assignment_id}"
            )))
            .respond_with(template)
            .mount(&self.server)
            .await;
    }

    /// Sets up group members endpoint.
    pub async fn mock_group_members(&self, group_id: &str, members: Vec<Value>) {
        let response = create_odata_response(members, None);
        Mock::given(method("GET"))
            .and(path(format!("/v1.0/groups/{group_id}/members")))
            .respond_with(ResponseTemplate::new(200).set_body_json(response))
            .mount(&self.server)
            .await;
    }
}
