//! Azure AI Foundry agent service over its REST API.
//!
//! Agents are looked up by name and created or updated with the current
//! instructions when the capability is constructed. Each run gets a fresh
//! thread holding a single user message.
//!
//! Failed requests are classified by what a retry could achieve: network
//! errors and 5xx/408/429 answers are transient, 401/403 mean the credentials
//! are no longer accepted, and any other 4xx is a rejection.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use super::instructions::{all_profiles, AgentProfile};
use super::{
    CapabilityFactory, ClientCredentialsToken, GenerationCapability, GenerationError, RunHandle,
    RunState, RunStatus, StaticToken, TokenSource,
};
use crate::config::AgentsConfig;

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    last_id: Option<String>,
}

impl<T> ListResponse<T> {
    /// Cursor for the following page, if there is one.
    fn next_cursor(&self) -> Option<&str> {
        if self.has_more {
            self.last_id.as_deref()
        } else {
            None
        }
    }
}

#[derive(Debug, Deserialize)]
struct AgentObject {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdObject {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RunObject {
    status: String,
    #[serde(default)]
    last_error: Option<RunError>,
}

#[derive(Debug, Deserialize)]
struct RunError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessageObject {
    pub(crate) role: String,
    #[serde(default)]
    pub(crate) content: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContentPart {
    #[serde(rename = "type")]
    pub(crate) kind: String,
    #[serde(default)]
    pub(crate) text: Option<TextPart>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TextPart {
    pub(crate) value: String,
}

/// Newline-joined assistant text segments, in the order given.
pub(crate) fn collect_assistant_text(messages: &[MessageObject]) -> String {
    messages
        .iter()
        .filter(|m| m.role == "assistant")
        .flat_map(|m| m.content.iter())
        .filter(|part| part.kind == "text")
        .filter_map(|part| part.text.as_ref().map(|t| t.value.as_str()))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Error for a non-success answer, classified by status.
fn classify_status(
    status: StatusCode,
    message: String,
    transient: fn(String) -> GenerationError,
) -> GenerationError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GenerationError::Unauthorized(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => transient(message),
        s if s.is_server_error() => transient(message),
        _ => GenerationError::Rejected(message),
    }
}

const PAGE_SIZE: &str = "100";

pub struct AzureAgentsClient {
    http: Client,
    config: AgentsConfig,
    tokens: Arc<dyn TokenSource>,
    /// Agent name to service-side id.
    agent_ids: Mutex<HashMap<String, String>>,
}

impl AzureAgentsClient {
    pub fn new(config: AgentsConfig, tokens: Arc<dyn TokenSource>, http: Client) -> Self {
        Self {
            http,
            config,
            tokens,
            agent_ids: Mutex::new(HashMap::new()),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/{}", self.config.endpoint, path))
            .query(&[("api-version", self.config.api_version.as_str())])
    }

    /// Send with the current token. A 401 is retried once with a freshly
    /// acquired token; `transient` wraps failures worth retrying later.
    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        what: &str,
        transient: fn(String) -> GenerationError,
    ) -> Result<T, GenerationError> {
        let replay = builder.try_clone();
        let token = self.tokens.token().await?;
        let mut response = builder
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| transient(format!("{} request failed: {}", what, e)))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            if let Some(replay) = replay {
                log::warn!("{} was refused with 401; retrying with a new token", what);
                self.tokens.invalidate();
                let token = self.tokens.token().await?;
                response = replay
                    .bearer_auth(token)
                    .send()
                    .await
                    .map_err(|e| transient(format!("{} request failed: {}", what, e)))?;
            }
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = format!("{} returned {}: {}", what, status, body);
            return Err(classify_status(status, message, transient));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| GenerationError::Rejected(format!("{} returned an unreadable body: {}", what, e)))
    }

    /// Every agent in the project, following the list cursor page by page.
    async fn list_agents(&self) -> Result<Vec<AgentObject>, GenerationError> {
        let mut agents = Vec::new();
        let mut after: Option<String> = None;
        loop {
            let mut request = self
                .request(Method::GET, "assistants")
                .query(&[("limit", PAGE_SIZE)]);
            if let Some(cursor) = &after {
                request = request.query(&[("after", cursor.as_str())]);
            }
            let mut page: ListResponse<AgentObject> = self
                .send(request, "list agents", GenerationError::Unavailable)
                .await?;
            let next = page.next_cursor().map(str::to_string);
            agents.append(&mut page.data);
            match next {
                Some(cursor) => after = Some(cursor),
                None => break,
            }
        }
        log::debug!("Agent service lists {} agent(s)", agents.len());
        Ok(agents)
    }

    /// Create missing agents and refresh the instructions of existing ones.
    pub async fn ensure_agents(&self, profiles: &[&AgentProfile]) -> Result<(), GenerationError> {
        let existing = self.list_agents().await?;

        for profile in profiles {
            let body = json!({
                "model": self.config.model_deployment,
                "name": profile.name,
                "instructions": profile.instructions,
            });
            let found = existing
                .iter()
                .find(|agent| agent.name.as_deref() == Some(profile.name));

            let agent: IdObject = match found {
                Some(agent) => {
                    log::info!("Updating agent '{}' ({})", profile.name, agent.id);
                    self.send(
                        self.request(Method::POST, &format!("assistants/{}", agent.id))
                            .json(&body),
                        "update agent",
                        GenerationError::Unavailable,
                    )
                    .await?
                }
                None => {
                    log::info!("Creating agent '{}'", profile.name);
                    self.send(
                        self.request(Method::POST, "assistants").json(&body),
                        "create agent",
                        GenerationError::Unavailable,
                    )
                    .await?
                }
            };

            self.agent_ids
                .lock()
                .insert(profile.name.to_string(), agent.id);
        }
        Ok(())
    }

    fn agent_id(&self, name: &str) -> Result<String, GenerationError> {
        self.agent_ids
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| GenerationError::Unavailable(format!("agent '{}' is not provisioned", name)))
    }
}

#[async_trait]
impl GenerationCapability for AzureAgentsClient {
    async fn create_thread(&self, message: &str) -> Result<String, GenerationError> {
        let thread: IdObject = self
            .send(
                self.request(Method::POST, "threads").json(&json!({
                    "messages": [{ "role": "user", "content": message }]
                })),
                "create thread",
                GenerationError::Submit,
            )
            .await?;
        Ok(thread.id)
    }

    async fn start_run(&self, profile: &AgentProfile, thread_id: &str) -> Result<RunHandle, GenerationError> {
        let agent_id = self.agent_id(profile.name)?;
        let run: IdObject = self
            .send(
                self.request(Method::POST, &format!("threads/{}/runs", thread_id))
                    .json(&json!({ "assistant_id": agent_id })),
                "create run",
                GenerationError::Submit,
            )
            .await?;

        Ok(RunHandle {
            thread_id: thread_id.to_string(),
            run_id: run.id,
        })
    }

    async fn find_run(&self, thread_id: &str) -> Result<Option<RunHandle>, GenerationError> {
        let runs: ListResponse<IdObject> = self
            .send(
                self.request(Method::GET, &format!("threads/{}/runs", thread_id))
                    .query(&[("order", "desc"), ("limit", "1")]),
                "list runs",
                GenerationError::Submit,
            )
            .await?;

        Ok(runs.data.into_iter().next().map(|run| RunHandle {
            thread_id: thread_id.to_string(),
            run_id: run.id,
        }))
    }

    async fn poll_status(&self, run: &RunHandle) -> Result<RunState, GenerationError> {
        let object: RunObject = self
            .send(
                self.request(
                    Method::GET,
                    &format!("threads/{}/runs/{}", run.thread_id, run.run_id),
                ),
                "get run",
                GenerationError::Poll,
            )
            .await?;

        let last_error = object.last_error.map(|e| match (e.code, e.message) {
            (Some(code), Some(message)) => format!("{}: {}", code, message),
            (code, message) => message.or(code).unwrap_or_default(),
        });
        Ok(RunState {
            status: RunStatus::parse(&object.status),
            last_error,
        })
    }

    async fn fetch_result(&self, run: &RunHandle) -> Result<String, GenerationError> {
        let messages: ListResponse<MessageObject> = self
            .send(
                self.request(Method::GET, &format!("threads/{}/messages", run.thread_id))
                    .query(&[("order", "asc"), ("limit", PAGE_SIZE)]),
                "list messages",
                GenerationError::Fetch,
            )
            .await?;

        Ok(collect_assistant_text(&messages.data))
    }
}

/// Connects to the agent service configured in [`AgentsConfig`].
pub struct AzureAgentsFactory {
    config: AgentsConfig,
    http: Client,
}

impl AzureAgentsFactory {
    pub fn new(config: AgentsConfig, http: Client) -> Self {
        Self { config, http }
    }

    /// Service principal credentials win over a fixed token.
    fn token_source(&self) -> Result<Arc<dyn TokenSource>, GenerationError> {
        if let Some(credentials) = &self.config.credentials {
            return Ok(Arc::new(ClientCredentialsToken::new(
                credentials.clone(),
                self.http.clone(),
            )));
        }
        match &self.config.api_token {
            Some(token) => Ok(Arc::new(StaticToken::new(token.clone()))),
            None => Err(GenerationError::Unavailable(
                "neither AZURE_CLIENT_ID/AZURE_CLIENT_SECRET nor PROJECT_API_TOKEN is set; \
                 cannot authenticate to the agent service"
                    .to_string(),
            )),
        }
    }
}

#[async_trait]
impl CapabilityFactory for AzureAgentsFactory {
    async fn connect(&self) -> Result<Arc<dyn GenerationCapability>, GenerationError> {
        let tokens = self.token_source()?;

        log::info!(
            "Connecting to agent service at {} (model {})",
            self.config.endpoint,
            self.config.model_deployment
        );
        let client = AzureAgentsClient::new(self.config.clone(), tokens, self.http.clone());
        client.ensure_agents(&all_profiles()).await?;
        Ok(Arc::new(client))
    }
}
