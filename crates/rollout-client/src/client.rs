use reqwest::{header, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::types::ErrorBody;
use crate::{ClientError, Result};

const USER_AGENT: &str = concat!("rollout/", env!("CARGO_PKG_VERSION"));

// ─── ClientConfig ─────────────────────────────────────────────────────────

/// Connection settings for one run. Built once at startup and handed to
/// [`Client::new`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Service base URL, e.g. `https://bytebase.example.com`.
    pub base_url: String,
    /// Bearer credential sent with every request.
    pub token: String,
    /// Project id (`hr`) or resource name (`projects/hr`).
    pub project: String,
}

// ─── Client ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    token: String,
    project: String,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ClientError::Config("base URL is empty".into()));
        }
        if config.token.trim().is_empty() {
            return Err(ClientError::Config("token is empty".into()));
        }
        let project = project_name(&config.project)?;

        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http,
            base_url,
            token: config.token,
            project,
        })
    }

    /// Project resource name (`projects/<id>`).
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Browser URL of a resource returned by the service.
    pub fn resource_url(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name.trim_start_matches('/'))
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub(crate) async fn post<B, R>(&self, call: &'static str, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.endpoint(path);
        tracing::debug!(call, %url, "POST");
        let resp = self
            .http
            .post(&url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
            .json(body)
            .send()
            .await?;
        decode(call, resp).await
    }

    pub(crate) async fn get<R>(&self, call: &'static str, path: &str) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let url = self.endpoint(path);
        tracing::debug!(call, %url, "GET");
        let resp = self
            .http
            .get(&url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
            .send()
            .await?;
        decode(call, resp).await
    }
}

fn project_name(project: &str) -> Result<String> {
    let project = project.trim().trim_matches('/');
    let id = project.strip_prefix("projects/").unwrap_or(project);
    if id.is_empty() || id.contains('/') {
        return Err(ClientError::Config(format!(
            "invalid project '{project}'; expected <id> or projects/<id>"
        )));
    }
    Ok(format!("projects/{id}"))
}

async fn decode<R: DeserializeOwned>(call: &'static str, resp: Response) -> Result<R> {
    let status = resp.status();
    let text = resp.text().await?;
    if !status.is_success() {
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|b| b.message)
            .unwrap_or(text);
        return Err(ClientError::RemoteCall {
            call,
            status: status.as_u16(),
            message,
        });
    }
    serde_json::from_str(&text).map_err(|source| ClientError::Decode { call, source })
}

// ─── Tests ────────────────────────────────────────────────────────────────
