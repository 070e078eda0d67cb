//! REST implementation of the cloud provider.
//!
//! Speaks Keystone v3 password authentication plus the Nova flavor and
//! Keystone user/domain APIs. A handle authenticates once and resolves
//! the compute and identity endpoints from the service catalog; retry
//! and re-authentication policy beyond the per-request timeout are left
//! to the caller rerunning the invocation.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use cirrus_core::Filters;

use crate::config::CloudConfig;
use crate::error::{CloudError, Result};
use crate::filter;
use crate::provider::Cloud;
use crate::types::{Domain, Flavor, FlavorCreate, User};

const SUBJECT_TOKEN: &str = "x-subject-token";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// An authenticated OpenStack API client.
#[derive(Debug)]
pub struct OpenStackCloud {
    client: Client,
    token: HeaderValue,
    compute_url: String,
    identity_url: String,
}

impl OpenStackCloud {
    /// Authenticate against Keystone and resolve service endpoints.
    ///
    /// # Errors
    ///
    /// Returns `CloudError::Auth` when authentication is rejected or the
    /// service catalog lacks a public compute or identity endpoint, and
    /// `CloudError::Http` on transport failures.
    pub async fn connect(config: &CloudConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CloudError::Config(format!("failed to create HTTP client: {e}")))?;

        let auth_url = config.auth_url.trim_end_matches('/');
        let body = json!({
            "auth": {
                "identity": {
                    "methods": ["password"],
                    "password": {
                        "user": {
                            "name": config.username,
                            "domain": {"name": config.user_domain_name},
                            "password": config.password,
                        }
                    }
                },
                "scope": {
                    "project": {
                        "name": config.project_name,
                        "domain": {"name": config.project_domain_name},
                    }
                }
            }
        });

        let response = client
            .post(format!("{auth_url}/auth/tokens"))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let err = api_error(response).await;
            return Err(CloudError::Auth(format!("authentication failed: {err}")));
        }

        let token = response
            .headers()
            .get(SUBJECT_TOKEN)
            .cloned()
            .ok_or_else(|| CloudError::Auth("no subject token in response".to_string()))?;

        let auth: AuthResponse = response.json().await?;
        let region = config.region_name.as_deref();
        let compute_url = public_endpoint(&auth.token.catalog, "compute", region)?;
        let identity_url = public_endpoint(&auth.token.catalog, "identity", region)?;

        info!(compute_url = %compute_url, identity_url = %identity_url, "authenticated to cloud");

        Ok(Self {
            client,
            token,
            compute_url,
            identity_url,
        })
    }

    fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static("x-auth-token"), self.token.clone());
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .headers(self.auth_headers())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl Cloud for OpenStackCloud {
    async fn find_flavor(&self, name: &str, with_extra_specs: bool) -> Result<Option<Flavor>> {
        // Nova has no name filter on the listing; private flavors only
        // show up with is_public=None.
        let url = format!("{}/flavors/detail?is_public=None", self.compute_url);
        let body: FlavorListResponse = self.get_json(&url).await?;

        let Some(mut flavor) = body.flavors.into_iter().find(|f| f.name == name) else {
            debug!(name, "flavor not found");
            return Ok(None);
        };

        if with_extra_specs {
            flavor.extra_specs = self.fetch_flavor_extra_specs(&flavor.id).await?;
        }
        debug!(name, id = %flavor.id, "found flavor");
        Ok(Some(flavor))
    }

    async fn create_flavor(&self, create: &FlavorCreate) -> Result<Flavor> {
        let url = format!("{}/flavors", self.compute_url);
        let body = json!({
            "flavor": {
                "name": create.name,
                "ram": create.ram,
                "vcpus": create.vcpus,
                "disk": create.disk,
                // null lets the cloud assign a UUID
                "id": create.id,
                "OS-FLV-EXT-DATA:ephemeral": create.ephemeral,
                "swap": create.swap,
                "rxtx_factor": create.rxtx_factor,
                "os-flavor-access:is_public": create.is_public,
            }
        });

        let response = self
            .client
            .post(&url)
            .headers(self.auth_headers())
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let created: FlavorResponse = response.json().await?;
        info!(name = %create.name, id = %created.flavor.id, "created flavor");
        Ok(created.flavor)
    }

    async fn delete_flavor(&self, id: &str) -> Result<()> {
        let url = format!("{}/flavors/{id}", self.compute_url);
        let response = self
            .client
            .delete(&url)
            .headers(self.auth_headers())
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            warn!(id, "flavor already absent");
            return Ok(());
        }
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        info!(id, "deleted flavor");
        Ok(())
    }

    async fn set_flavor_extra_specs(
        &self,
        id: &str,
        specs: &BTreeMap<String, String>,
    ) -> Result<()> {
        let url = format!("{}/flavors/{id}/os-extra_specs", self.compute_url);
        let response = self
            .client
            .post(&url)
            .headers(self.auth_headers())
            .json(&json!({ "extra_specs": specs }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        info!(id, keys = specs.len(), "set flavor extra specs");
        Ok(())
    }

    async fn unset_flavor_extra_specs(&self, id: &str, keys: &BTreeSet<String>) -> Result<()> {
        for key in keys {
            let url = format!("{}/flavors/{id}/os-extra_specs/{key}", self.compute_url);
            let response = self
                .client
                .delete(&url)
                .headers(self.auth_headers())
                .send()
                .await?;

            if response.status() == StatusCode::NOT_FOUND {
                warn!(id, key = %key, "extra spec already absent");
                continue;
            }
            if !response.status().is_success() {
                return Err(api_error(response).await);
            }
        }
        info!(id, keys = keys.len(), "unset flavor extra specs");
        Ok(())
    }

    async fn fetch_flavor_extra_specs(&self, id: &str) -> Result<BTreeMap<String, String>> {
        let url = format!("{}/flavors/{id}/os-extra_specs", self.compute_url);
        let body: ExtraSpecsResponse = self.get_json(&url).await?;
        Ok(body.extra_specs)
    }

    async fn find_domain(&self, name_or_id: &str) -> Result<Option<Domain>> {
        // Try as an ID first, then fall back to a name lookup.
        let url = format!("{}/domains/{name_or_id}", self.identity_url);
        let response = self
            .client
            .get(&url)
            .headers(self.auth_headers())
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let body: DomainResponse = response.json().await?;
                return Ok(Some(body.domain));
            }
            StatusCode::NOT_FOUND | StatusCode::FORBIDDEN => {}
            _ => return Err(api_error(response).await),
        }

        let url = format!("{}/domains", self.identity_url);
        let response = self
            .client
            .get(&url)
            .headers(self.auth_headers())
            .query(&[("name", name_or_id)])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        let body: DomainListResponse = response.json().await?;
        Ok(body.domains.into_iter().next())
    }

    async fn search_users(
        &self,
        name_or_id: Option<&str>,
        filters: &Filters,
        domain_id: Option<&str>,
    ) -> Result<Vec<User>> {
        let url = format!("{}/users", self.identity_url);
        let mut request = self.client.get(&url).headers(self.auth_headers());
        if let Some(domain_id) = domain_id {
            request = request.query(&[("domain_id", domain_id)]);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        let body: UserListResponse = response.json().await?;

        let users: Vec<User> = body
            .users
            .into_iter()
            .filter(|u| {
                name_or_id.map_or(true, |key| filter::name_or_id_matches(&u.id, &u.name, key))
            })
            .filter(|u| filter::matches(u, filters))
            .collect();
        debug!(count = users.len(), "user search complete");
        Ok(users)
    }
}

async fn api_error(response: reqwest::Response) -> CloudError {
    let status = response.status().as_u16();
    let message = match response.json::<Value>().await {
        Ok(body) => fault_message(&body).unwrap_or_else(|| "unknown error".to_string()),
        Err(_) => "unknown error".to_string(),
    };
    CloudError::Api { status, message }
}

/// Extract the human-readable message from an OpenStack fault body.
///
/// Faults nest the message under a service-specific key, e.g.
/// `{"badRequest": {"message": "...", "code": 400}}`.
fn fault_message(body: &Value) -> Option<String> {
    let obj = body.as_object()?;
    obj.values()
        .find_map(|v| v.get("message").and_then(Value::as_str))
        .map(str::to_string)
}

fn public_endpoint(
    catalog: &[CatalogEntry],
    service_type: &str,
    region: Option<&str>,
) -> Result<String> {
    catalog
        .iter()
        .filter(|entry| entry.service_type == service_type)
        .flat_map(|entry| &entry.endpoints)
        .filter(|endpoint| endpoint.interface == "public")
        .find(|endpoint| region.map_or(true, |r| endpoint.region.as_deref() == Some(r)))
        .map(|endpoint| endpoint.url.trim_end_matches('/').to_string())
        .ok_or_else(|| {
            CloudError::Auth(format!(
                "no public {service_type} endpoint in service catalog"
            ))
        })
}

#[derive(Deserialize)]
struct AuthResponse {
    token: TokenBody,
}

#[derive(Deserialize)]
struct TokenBody {
    #[serde(default)]
    catalog: Vec<CatalogEntry>,
}

#[derive(Deserialize)]
struct CatalogEntry {
    #[serde(rename = "type")]
    service_type: String,
    #[serde(default)]
    endpoints: Vec<CatalogEndpoint>,
}

#[derive(Deserialize)]
struct CatalogEndpoint {
    interface: String,
    #[serde(default)]
    region: Option<String>,
    url: String,
}

#[derive(Deserialize)]
struct FlavorListResponse {
    flavors: Vec<Flavor>,
}

#[derive(Deserialize)]
struct FlavorResponse {
    flavor: Flavor,
}

#[derive(Deserialize)]
struct ExtraSpecsResponse {
    extra_specs: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct DomainResponse {
    domain: Domain,
}

#[derive(Deserialize)]
struct DomainListResponse {
    domains: Vec<Domain>,
}

#[derive(Deserialize)]
struct UserListResponse {
    users: Vec<User>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server: &MockServer) -> CloudConfig {
        CloudConfig {
            auth_url: format!("{}/v3", server.uri()),
            username: "admin".to_string(),
            password: "secret".to_string(),
            user_domain_name: "Default".to_string(),
            project_name: "admin".to_string(),
            project_domain_name: "Default".to_string(),
            region_name: None,
        }
    }

    async fn mount_keystone(server: &MockServer) {
        let catalog = json!({
            "token": {
                "catalog": [
                    {
                        "type": "compute",
                        "endpoints": [
                            {"interface": "public", "region": "RegionOne",
                             "url": format!("{}/compute/v2.1", server.uri())}
                        ]
                    },
                    {
                        "type": "identity",
                        "endpoints": [
                            {"interface": "public", "region": "RegionOne",
                             "url": format!("{}/identity/v3", server.uri())}
                        ]
                    }
                ]
            }
        });
        Mock::given(method("POST"))
            .and(path("/v3/auth/tokens"))
            .respond_with(
                ResponseTemplate::new(201)
                    .insert_header("X-Subject-Token", "test-token")
                    .set_body_json(catalog),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn connect_resolves_catalog_endpoints() {
        let server = MockServer::start().await;
        mount_keystone(&server).await;

        let cloud = OpenStackCloud::connect(&test_config(&server)).await.unwrap();
        assert_eq!(cloud.compute_url, format!("{}/compute/v2.1", server.uri()));
        assert_eq!(cloud.identity_url, format!("{}/identity/v3", server.uri()));
    }

    #[tokio::test]
    async fn connect_rejects_bad_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/auth/tokens"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"message": "The request you have made requires authentication.", "code": 401}
            })))
            .mount(&server)
            .await;

        let err = OpenStackCloud::connect(&test_config(&server))
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::Auth(_)));
    }

    #[tokio::test]
    async fn find_flavor_matches_by_name_and_fetches_specs() {
        let server = MockServer::start().await;
        mount_keystone(&server).await;

        Mock::given(method("GET"))
            .and(path("/compute/v2.1/flavors/detail"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "flavors": [
                    {"id": "f1", "name": "tiny", "ram": 1024, "vcpus": 1, "disk": 10,
                     "swap": "", "OS-FLV-EXT-DATA:ephemeral": 0,
                     "os-flavor-access:is_public": true},
                    {"id": "f2", "name": "small", "ram": 2048, "vcpus": 2, "disk": 20}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/compute/v2.1/flavors/f1/os-extra_specs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "extra_specs": {"quota:disk_read_iops_sec": "5000"}
            })))
            .mount(&server)
            .await;

        let cloud = OpenStackCloud::connect(&test_config(&server)).await.unwrap();
        let flavor = cloud.find_flavor("tiny", true).await.unwrap().unwrap();
        assert_eq!(flavor.id, "f1");
        assert_eq!(flavor.swap, 0);
        assert_eq!(
            flavor.extra_specs.get("quota:disk_read_iops_sec").map(String::as_str),
            Some("5000")
        );

        assert!(cloud.find_flavor("huge", true).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_flavor_tolerates_absent() {
        let server = MockServer::start().await;
        mount_keystone(&server).await;

        Mock::given(method("DELETE"))
            .and(path("/compute/v2.1/flavors/gone"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "itemNotFound": {"message": "Flavor gone could not be found.", "code": 404}
            })))
            .mount(&server)
            .await;

        let cloud = OpenStackCloud::connect(&test_config(&server)).await.unwrap();
        cloud.delete_flavor("gone").await.unwrap();
    }

    #[tokio::test]
    async fn create_flavor_surfaces_fault_message() {
        let server = MockServer::start().await;
        mount_keystone(&server).await;

        Mock::given(method("POST"))
            .and(path("/compute/v2.1/flavors"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "conflictingRequest": {"message": "Flavor with name tiny already exists.", "code": 409}
            })))
            .mount(&server)
            .await;

        let cloud = OpenStackCloud::connect(&test_config(&server)).await.unwrap();
        let create = FlavorCreate {
            name: "tiny".to_string(),
            ram: 1024,
            vcpus: 1,
            disk: 10,
            id: None,
            ephemeral: 0,
            swap: 0,
            rxtx_factor: 1.0,
            is_public: true,
        };
        let err = cloud.create_flavor(&create).await.unwrap_err();
        match err {
            CloudError::Api { status, message } => {
                assert_eq!(status, 409);
                assert!(message.contains("already exists"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn find_domain_falls_back_to_name_lookup() {
        let server = MockServer::start().await;
        mount_keystone(&server).await;

        Mock::given(method("GET"))
            .and(path("/identity/v3/domains/admindomain"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {"message": "Could not find domain: admindomain.", "code": 404}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/identity/v3/domains"))
            .and(query_param("name", "admindomain"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "domains": [{"id": "d1", "name": "admindomain", "enabled": true}]
            })))
            .mount(&server)
            .await;

        let cloud = OpenStackCloud::connect(&test_config(&server)).await.unwrap();
        let domain = cloud.find_domain("admindomain").await.unwrap().unwrap();
        assert_eq!(domain.id, "d1");
    }

    #[tokio::test]
    async fn search_users_filters_client_side() {
        let server = MockServer::start().await;
        mount_keystone(&server).await;

        Mock::given(method("GET"))
            .and(path("/identity/v3/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "users": [
                    {"id": "u1", "name": "alice", "enabled": true},
                    {"id": "u2", "name": "bob", "enabled": false}
                ]
            })))
            .mount(&server)
            .await;

        let cloud = OpenStackCloud::connect(&test_config(&server)).await.unwrap();

        let all = cloud
            .search_users(None, &Filters::new(), None)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let filters: Filters = serde_json::from_str(r#"{"is_enabled": false}"#).unwrap();
        let disabled = cloud.search_users(None, &filters, None).await.unwrap();
        assert_eq!(disabled.len(), 1);
        assert_eq!(disabled[0].name, "bob");

        let named = cloud
            .search_users(Some("alice"), &Filters::new(), None)
            .await
            .unwrap();
        assert_eq!(named.len(), 1);
        assert_eq!(named[0].id, "u1");
    }
}
