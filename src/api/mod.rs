//! REST client for the analytics backend
//!
//! Thin wrapper over `reqwest`: every call returns JSON or an [`ApiError`]
//! carrying the backend's `detail`/`message`. Analysis endpoints return the
//! raw JSON body so the caller can run it through
//! [`reconcile`](crate::reconcile::reconcile).

pub mod error;
pub mod models;

pub use error::{ApiError, ApiResult};
pub use models::*;

use crate::config::Config;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Cloneable handle; clones share the connection pool.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("orgpulse/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base: normalize_base(base_url)?,
            token,
        })
    }

    /// Build a client from the loaded configuration and stored credentials.
    pub fn from_config(config: &Config) -> ApiResult<Self> {
        let base_url = config
            .api_base_url()
            .ok_or_else(|| ApiError::NotConfigured("API URL (set ORGPULSE_API_URL)".to_string()))?;
        Self::new(&base_url, config.api_token(), config.request_timeout())
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn endpoint(&self, path: &str) -> ApiResult<Url> {
        Ok(self.base.join(path.trim_start_matches('/'))?)
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> ApiResult<Value> {
        let url = self.endpoint(path)?;
        tracing::debug!(%method, %url, "api request");

        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .header("Accept", "application/json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let err = ApiError::from_response(status.as_u16(), &text);
            tracing::warn!(%method, %url, "api request rejected: {}", err);
            return Err(err);
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    pub async fn get(&self, path: &str) -> ApiResult<Value> {
        self.send::<Value>(Method::GET, path, None).await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> ApiResult<Value> {
        self.send(Method::POST, path, Some(body)).await
    }

    pub async fn patch<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> ApiResult<Value> {
        self.send(Method::PATCH, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> ApiResult<Value> {
        self.send::<Value>(Method::DELETE, path, None).await
    }

    async fn get_typed<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        Ok(serde_json::from_value(self.get(path).await?)?)
    }

    // ═══════════════════════════════════════════════════════════════════════
    //  ORGANIZATIONS
    // ═══════════════════════════════════════════════════════════════════════

    pub async fn list_organizations(&self) -> ApiResult<Vec<Organization>> {
        list_items(self.get("organizations").await?)
    }

    pub async fn get_organization(&self, org_id: &str) -> ApiResult<Organization> {
        self.get_typed(&format!("organizations/{}", segment(org_id)))
            .await
    }

    pub async fn create_organization(&self, draft: &OrganizationDraft) -> ApiResult<Organization> {
        Ok(serde_json::from_value(self.post("organizations", draft).await?)?)
    }

    pub async fn update_organization(
        &self,
        org_id: &str,
        patch: &OrganizationPatch,
    ) -> ApiResult<Organization> {
        let path = format!("organizations/{}", segment(org_id));
        Ok(serde_json::from_value(self.patch(&path, patch).await?)?)
    }

    pub async fn delete_organization(&self, org_id: &str) -> ApiResult<()> {
        self.delete(&format!("organizations/{}", segment(org_id)))
            .await
            .map(|_| ())
    }

    // ═══════════════════════════════════════════════════════════════════════
    //  PROJECTS
    // ═══════════════════════════════════════════════════════════════════════

    pub async fn list_projects(&self, org_id: &str) -> ApiResult<Vec<Project>> {
        list_items(
            self.get(&format!("organizations/{}/projects", segment(org_id)))
                .await?,
        )
    }

    pub async fn create_project(&self, org_id: &str, draft: &ProjectDraft) -> ApiResult<Project> {
        let path = format!("organizations/{}/projects", segment(org_id));
        Ok(serde_json::from_value(self.post(&path, draft).await?)?)
    }

    pub async fn delete_project(&self, project_id: &str) -> ApiResult<()> {
        self.delete(&format!("projects/{}", segment(project_id)))
            .await
            .map(|_| ())
    }

    // ═══════════════════════════════════════════════════════════════════════
    //  MEMBERS & USAGE
    // ═══════════════════════════════════════════════════════════════════════

    pub async fn list_members(&self, org_id: &str) -> ApiResult<Vec<Member>> {
        list_items(
            self.get(&format!("organizations/{}/members", segment(org_id)))
                .await?,
        )
    }

    pub async fn invite_member(&self, org_id: &str, invitation: &Invitation) -> ApiResult<Value> {
        let path = format!("organizations/{}/invitations", segment(org_id));
        self.post(&path, invitation).await
    }

    pub async fn remove_member(&self, org_id: &str, member_id: &str) -> ApiResult<()> {
        let path = format!(
            "organizations/{}/members/{}",
            segment(org_id),
            segment(member_id)
        );
        self.delete(&path).await.map(|_| ())
    }

    pub async fn usage(&self, org_id: &str) -> ApiResult<UsageStats> {
        self.get_typed(&format!("organizations/{}/usage", segment(org_id)))
            .await
    }

    // ═══════════════════════════════════════════════════════════════════════
    //  ANALYSES
    // ═══════════════════════════════════════════════════════════════════════

    /// Run an analyzer. The body is returned untouched for reconciliation.
    pub async fn analyze(&self, kind: AnalysisKind, request: &AnalysisRequest) -> ApiResult<Value> {
        self.post(analysis_path(kind), request).await
    }
}

fn analysis_path(kind: AnalysisKind) -> &'static str {
    match kind {
        AnalysisKind::Instagram => "interfaces/instagram/analyze",
        AnalysisKind::MobileApp => "interfaces/mobile/analyze",
        AnalysisKind::X => "interfaces/x/analyze",
        AnalysisKind::Strategy => "interfaces/strategy/generate",
    }
}

/// Base URLs are joined against, so they need a trailing slash.
fn normalize_base(raw: &str) -> ApiResult<Url> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    };
    Ok(Url::parse(&with_slash)?)
}

/// Percent-encode an id used as a single path segment.
fn segment(id: &str) -> String {
    url::form_urlencoded::byte_serialize(id.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// List endpoints answer either `[...]` or `{"items": [...]}`.
fn list_items<T: DeserializeOwned>(value: Value) -> ApiResult<Vec<T>> {
    let items = match value {
        Value::Object(mut obj) => ["items", "results", "data"]
            .iter()
            .find_map(|key| obj.remove(*key))
            .unwrap_or(Value::Array(Vec::new())),
        Value::Null => Value::Array(Vec::new()),
        other => other,
    };
    Ok(serde_json::from_value(items)?)
}
