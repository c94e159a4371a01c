//! Workflows: ordered chains of published agents.
//!
//! The agent chain is replaced wholesale by `save`, which checks every
//! referenced agent exists and is published before touching the stored
//! list. `execute` feeds each step's output into the next step.

use std::future::Future;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use tracing::{debug, info};
use utoipa::ToSchema;
use validator::Validate;

use crate::chat::{DEFAULT_MAX_TOKENS, synthesize_reply};
use crate::entities::{Agent, AgentStatus, Deleted, non_blank, not_blank, now_millis};
use crate::error::{CoreError, CoreResult};
use crate::ids::{RESOURCE_ID_LEN, SESSION_ID_LEN};
use crate::pagination::{Listable, Page, PageQuery, paginate};
use crate::store::{Collections, MemoryStore};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WorkflowStatus {
    #[default]
    Draft,
    Active,
    Disabled,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TriggerType {
    #[default]
    Manual,
    Schedule,
    Webhook,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub id: String,
    pub name: String,
    pub intro: String,
    pub status: WorkflowStatus,
    pub trigger_type: TriggerType,
    pub tags: Vec<String>,
    /// Execution order of the chain.
    pub agent_ids: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Listable for Workflow {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.name.as_str(), self.intro.as_str()];
        fields.extend(self.tags.iter().map(String::as_str));
        fields
    }

    fn status_str(&self) -> Option<&str> {
        Some(self.status.as_ref())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkflowRequest {
    #[validate(required(message = "is required"), custom(function = "not_blank"))]
    pub name: Option<String>,
    pub intro: Option<String>,
    pub status: Option<WorkflowStatus>,
    pub trigger_type: Option<TriggerType>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWorkflowRequest {
    #[validate(custom(function = "not_blank"))]
    pub name: Option<String>,
    pub intro: Option<String>,
    pub status: Option<WorkflowStatus>,
    pub trigger_type: Option<TriggerType>,
    pub tags: Option<Vec<String>>,
}

/// Body of `save`. `agentIds` is kept as raw JSON so that a non-array value
/// is reported as a validation failure rather than a malformed body.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveWorkflowRequest {
    #[schema(value_type = Option<Vec<String>>)]
    pub agent_ids: Option<serde_json::Value>,
}

impl SaveWorkflowRequest {
    pub fn new(agent_ids: &[&str]) -> Self {
        Self {
            agent_ids: Some(serde_json::Value::from(agent_ids.to_vec())),
        }
    }

    /// Parse `agentIds` into trimmed, non-blank strings.
    pub fn agent_ids(&self) -> CoreResult<Vec<String>> {
        let Some(value) = &self.agent_ids else {
            return Err(CoreError::Validation("agentIds is required".to_owned()));
        };
        let Some(items) = value.as_array() else {
            return Err(CoreError::Validation("agentIds must be an array".to_owned()));
        };
        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                item.as_str()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned)
                    .ok_or_else(|| {
                        CoreError::Validation(format!("agentIds[{i}] must be a non-empty string"))
                    })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteWorkflowRequest {
    #[serde(default)]
    pub input: String,
    /// Extra per-step input, indexed by step; step 0 ignores it.
    pub node_inputs: Option<Vec<Option<String>>>,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NodeResult {
    pub agent_id: String,
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowExecution {
    pub workflow_id: String,
    pub session_id: String,
    pub node_results: Vec<NodeResult>,
    /// Output of the last step.
    pub output: String,
}

pub trait WorkflowStore: Send + Sync + 'static {
    fn list_workflows(&self, query: &PageQuery) -> impl Future<Output = CoreResult<Page<Workflow>>> + Send;
    fn create_workflow(
        &self,
        req: CreateWorkflowRequest,
    ) -> impl Future<Output = CoreResult<Workflow>> + Send;
    fn get_workflow(&self, id: &str) -> impl Future<Output = CoreResult<Workflow>> + Send;
    fn update_workflow(
        &self,
        id: &str,
        req: UpdateWorkflowRequest,
    ) -> impl Future<Output = CoreResult<Workflow>> + Send;
    fn delete_workflow(&self, id: &str) -> impl Future<Output = CoreResult<Deleted>> + Send;
    /// Replace the agent chain. On failure the stored chain is unchanged.
    fn save_workflow(
        &self,
        id: &str,
        req: SaveWorkflowRequest,
    ) -> impl Future<Output = CoreResult<Workflow>> + Send;
    fn execute_workflow(
        &self,
        id: &str,
        req: ExecuteWorkflowRequest,
    ) -> impl Future<Output = CoreResult<WorkflowExecution>> + Send;
}

/// Trim tags, drop blanks and duplicates, keep first-seen order.
fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_owned());
        }
    }
    out
}

/// Input for a non-first step: previous output and the step's own input,
/// separated by a blank line when both are present.
fn step_message(previous: &str, extra: Option<&str>) -> String {
    let previous = previous.trim();
    let extra = extra.map(str::trim).unwrap_or_default();
    match (previous.is_empty(), extra.is_empty()) {
        (true, true) => String::new(),
        (true, false) => extra.to_owned(),
        (false, true) => previous.to_owned(),
        (false, false) => format!("{previous}\n\n{extra}"),
    }
}

fn published_agent<'a>(data: &'a Collections, agent_id: &str) -> CoreResult<&'a Agent> {
    let agent = data
        .agents
        .iter()
        .find(|a| a.id == agent_id)
        .ok_or_else(|| CoreError::Validation(format!("agent {agent_id} does not exist")))?;
    if agent.status != AgentStatus::Published {
        return Err(CoreError::Validation(format!("agent {agent_id} is not published")));
    }
    Ok(agent)
}

impl WorkflowStore for MemoryStore {
    async fn list_workflows(&self, query: &PageQuery) -> CoreResult<Page<Workflow>> {
        let data = self.lock().await;
        paginate(&data.workflows, query)
    }

    async fn create_workflow(&self, req: CreateWorkflowRequest) -> CoreResult<Workflow> {
        req.validate()?;
        let mut data = self.lock().await;
        let now = now_millis();
        let workflow = Workflow {
            id: data.workflow_ids.issue(RESOURCE_ID_LEN),
            name: req.name.unwrap_or_default().trim().to_owned(),
            intro: req.intro.unwrap_or_default(),
            status: req.status.unwrap_or_default(),
            trigger_type: req.trigger_type.unwrap_or_default(),
            tags: normalize_tags(req.tags.unwrap_or_default()),
            agent_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        data.workflows.insert(0, workflow.clone());
        info!(workflow_id = %workflow.id, name = %workflow.name, "workflow created");
        Ok(workflow)
    }

    async fn get_workflow(&self, id: &str) -> CoreResult<Workflow> {
        let data = self.lock().await;
        data.workflows
            .iter()
            .find(|w| w.id == id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("workflow", id))
    }

    async fn update_workflow(&self, id: &str, req: UpdateWorkflowRequest) -> CoreResult<Workflow> {
        req.validate()?;
        let mut data = self.lock().await;
        let workflow = data
            .workflows
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or_else(|| CoreError::not_found("workflow", id))?;
        if let Some(name) = req.name {
            workflow.name = name.trim().to_owned();
        }
        if let Some(intro) = req.intro {
            workflow.intro = intro;
        }
        if let Some(status) = req.status {
            workflow.status = status;
        }
        if let Some(trigger_type) = req.trigger_type {
            workflow.trigger_type = trigger_type;
        }
        if let Some(tags) = req.tags {
            workflow.tags = normalize_tags(tags);
        }
        workflow.updated_at = now_millis();
        Ok(workflow.clone())
    }

    async fn delete_workflow(&self, id: &str) -> CoreResult<Deleted> {
        let mut data = self.lock().await;
        let pos = data
            .workflows
            .iter()
            .position(|w| w.id == id)
            .ok_or_else(|| CoreError::not_found("workflow", id))?;
        let removed = data.workflows.remove(pos);
        info!(workflow_id = %id, "workflow deleted");
        Ok(Deleted { id: removed.id })
    }

    async fn save_workflow(&self, id: &str, req: SaveWorkflowRequest) -> CoreResult<Workflow> {
        let mut guard = self.lock().await;
        let data = &mut *guard;
        if !data.workflows.iter().any(|w| w.id == id) {
            return Err(CoreError::not_found("workflow", id));
        }
        let agent_ids = req.agent_ids()?;
        for agent_id in &agent_ids {
            published_agent(data, agent_id)?;
        }

        let workflow = data
            .workflows
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or_else(|| CoreError::not_found("workflow", id))?;
        workflow.agent_ids = agent_ids;
        workflow.updated_at = now_millis();
        debug!(workflow_id = %id, steps = workflow.agent_ids.len(), "workflow chain saved");
        Ok(workflow.clone())
    }

    async fn execute_workflow(&self, id: &str, req: ExecuteWorkflowRequest) -> CoreResult<WorkflowExecution> {
        let mut guard = self.lock().await;
        let data = &mut *guard;
        let workflow = data
            .workflows
            .iter()
            .find(|w| w.id == id)
            .ok_or_else(|| CoreError::not_found("workflow", id))?;
        if workflow.agent_ids.is_empty() {
            return Err(CoreError::Validation(format!("workflow {id} has no agents")));
        }
        let input = req.input.trim();
        if input.is_empty() {
            return Err(CoreError::Validation("input must not be empty".to_owned()));
        }
        let node_inputs = req.node_inputs.unwrap_or_default();

        let mut node_results = Vec::with_capacity(workflow.agent_ids.len());
        let mut previous = String::new();
        for (i, agent_id) in workflow.agent_ids.iter().enumerate() {
            let agent = published_agent(data, agent_id)?;
            let message = if i == 0 {
                input.to_owned()
            } else {
                step_message(&previous, node_inputs.get(i).and_then(|s| s.as_deref()))
            };
            let output = synthesize_reply(
                agent.profile_md.as_deref(),
                &agent.model,
                &message,
                DEFAULT_MAX_TOKENS,
            );
            node_results.push(NodeResult { agent_id: agent_id.clone(), output: output.clone() });
            previous = output;
        }

        let session_id = match non_blank(req.session_id) {
            Some(s) => s,
            None => data.handles.issue(SESSION_ID_LEN),
        };
        info!(workflow_id = %id, steps = node_results.len(), "workflow executed");
        Ok(WorkflowExecution {
            workflow_id: id.to_owned(),
            session_id,
            node_results,
            output: previous,
        })
    }
}
