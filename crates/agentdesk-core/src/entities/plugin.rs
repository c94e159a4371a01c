use std::future::Future;

use rand::Rng;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use tracing::{debug, info};
use utoipa::ToSchema;
use validator::Validate;

use crate::entities::{Deleted, non_blank, not_blank, now_millis};
use crate::error::{CoreError, CoreResult};
use crate::ids::RESOURCE_ID_LEN;
use crate::pagination::{Listable, Page, PageQuery, paginate};
use crate::store::MemoryStore;

pub const DEFAULT_PLUGIN_TYPE: &str = "api";
pub const DEFAULT_VERSION: &str = "1.0.0";
pub const DEFAULT_AUTH_TYPE: &str = "none";

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PluginStatus {
    Enabled,
    #[default]
    Disabled,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PublishStatus {
    #[default]
    Unpublished,
    Published,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TestStatus {
    #[default]
    Untested,
    Passed,
    Failed,
}

/// One callable operation exposed by a plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PluginTool {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Plugin {
    pub id: String,
    pub name: String,
    pub intro: String,
    pub description: String,
    pub plugin_type: String,
    pub plugin_url: String,
    pub version: String,
    pub auth_type: String,
    pub tools: Vec<PluginTool>,
    pub enabled: bool,
    pub status: PluginStatus,
    pub publish_status: PublishStatus,
    pub test_status: TestStatus,
    pub last_test_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Listable for Plugin {
    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.name.as_str(),
            self.intro.as_str(),
            self.description.as_str(),
        ]
    }

    fn status_str(&self) -> Option<&str> {
        Some(self.status.as_ref())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePluginRequest {
    #[validate(required(message = "is required"), custom(function = "not_blank"))]
    pub name: Option<String>,
    pub intro: Option<String>,
    pub description: Option<String>,
    pub plugin_type: Option<String>,
    pub plugin_url: Option<String>,
    pub version: Option<String>,
    pub auth_type: Option<String>,
    pub tools: Option<Vec<PluginTool>>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePluginRequest {
    #[validate(custom(function = "not_blank"))]
    pub name: Option<String>,
    pub intro: Option<String>,
    pub description: Option<String>,
    pub plugin_type: Option<String>,
    pub plugin_url: Option<String>,
    pub version: Option<String>,
    pub auth_type: Option<String>,
    pub tools: Option<Vec<PluginTool>>,
}

/// Plugin fields recovered from an uploaded template, ready to be posted
/// back as a [`CreatePluginRequest`]. Importing does not create a plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PluginTemplate {
    pub name: String,
    #[serde(default)]
    pub intro: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub plugin_url: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub tools: Vec<PluginTool>,
}

const HTTP_METHODS: [&str; 8] = ["get", "put", "post", "delete", "options", "head", "patch", "trace"];

impl PluginTemplate {
    /// Parse a template document.
    ///
    /// Accepts an OpenAPI document (`info`, `servers`, `paths`) or a plain
    /// `{name, version, tools}` object.
    pub fn parse(raw: &[u8]) -> CoreResult<Self> {
        let root: serde_json::Value = serde_json::from_slice(raw)
            .map_err(|e| CoreError::Validation(format!("invalid plugin template: {e}")))?;
        let obj = root
            .as_object()
            .ok_or_else(|| CoreError::Validation("invalid plugin template: expected a JSON object".to_owned()))?;

        let mut template = if obj.contains_key("openapi") || obj.contains_key("info") || obj.contains_key("paths") {
            Self::from_openapi(&root)
        } else {
            serde_json::from_value::<PluginTemplate>(root.clone())
                .map_err(|e| CoreError::Validation(format!("invalid plugin template: {e}")))?
        };

        template.name = template.name.trim().to_owned();
        if template.name.is_empty() {
            return Err(CoreError::Validation("invalid plugin template: name is required".to_owned()));
        }
        if template.version.trim().is_empty() {
            template.version = DEFAULT_VERSION.to_owned();
        }
        Ok(template)
    }

    fn from_openapi(root: &serde_json::Value) -> Self {
        let text = |v: &serde_json::Value| v.as_str().unwrap_or_default().to_owned();
        let info = &root["info"];
        let description = text(&info["description"]);

        let mut tools = Vec::new();
        if let Some(paths) = root["paths"].as_object() {
            for (path, ops) in paths {
                let Some(ops) = ops.as_object() else { continue };
                for (method, op) in ops {
                    if !HTTP_METHODS.contains(&method.to_ascii_lowercase().as_str()) {
                        continue;
                    }
                    let method = method.to_ascii_uppercase();
                    let name = op["operationId"]
                        .as_str()
                        .filter(|s| !s.trim().is_empty())
                        .map(str::to_owned)
                        .unwrap_or_else(|| format!("{method} {path}"));
                    let description = op["description"]
                        .as_str()
                        .or_else(|| op["summary"].as_str())
                        .unwrap_or_default()
                        .to_owned();
                    tools.push(PluginTool { name, description, method, path: path.clone() });
                }
            }
        }

        Self {
            name: text(&info["title"]),
            intro: description.clone(),
            description,
            plugin_url: text(&root["servers"][0]["url"]),
            version: text(&info["version"]),
            tools,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PluginTestRequest {
    #[serde(default)]
    pub plugin_id: String,
    /// Tool to exercise; when absent the plugin as a whole is tested.
    pub tool_name: Option<String>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub inputs: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PluginTestResult {
    pub plugin_id: String,
    pub success: bool,
    #[schema(value_type = Object)]
    pub output: serde_json::Value,
    pub duration_ms: u64,
}

pub trait PluginStore: Send + Sync + 'static {
    fn list_plugins(&self, query: &PageQuery) -> impl Future<Output = CoreResult<Page<Plugin>>> + Send;
    fn create_plugin(&self, req: CreatePluginRequest) -> impl Future<Output = CoreResult<Plugin>> + Send;
    fn get_plugin(&self, id: &str) -> impl Future<Output = CoreResult<Plugin>> + Send;
    fn update_plugin(
        &self,
        id: &str,
        req: UpdatePluginRequest,
    ) -> impl Future<Output = CoreResult<Plugin>> + Send;
    fn delete_plugin(&self, id: &str) -> impl Future<Output = CoreResult<Deleted>> + Send;
    /// Enabling requires a passed test run.
    fn toggle_plugin(&self, id: &str, enable: bool) -> impl Future<Output = CoreResult<Plugin>> + Send;
    /// Publishing requires the plugin to be enabled.
    fn publish_plugin(&self, id: &str) -> impl Future<Output = CoreResult<Plugin>> + Send;
    fn test_plugin(
        &self,
        req: PluginTestRequest,
    ) -> impl Future<Output = CoreResult<PluginTestResult>> + Send;
    /// Parse an uploaded template without storing anything.
    fn import_template(&self, raw: &[u8]) -> impl Future<Output = CoreResult<PluginTemplate>> + Send;
    /// Names of published plugins, newest first.
    fn list_published_names(&self) -> impl Future<Output = CoreResult<Vec<String>>> + Send;
}

impl MemoryStore {
    async fn with_plugin<R>(
        &self,
        id: &str,
        f: impl FnOnce(&mut Plugin) -> CoreResult<R> + Send,
    ) -> CoreResult<R> {
        let mut data = self.lock().await;
        let plugin = data
            .plugins
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| CoreError::not_found("plugin", id))?;
        f(plugin)
    }
}

impl PluginStore for MemoryStore {
    async fn list_plugins(&self, query: &PageQuery) -> CoreResult<Page<Plugin>> {
        let data = self.lock().await;
        paginate(&data.plugins, query)
    }

    async fn create_plugin(&self, req: CreatePluginRequest) -> CoreResult<Plugin> {
        req.validate()?;
        let mut data = self.lock().await;
        let now = now_millis();
        let plugin = Plugin {
            id: data.plugin_ids.issue(RESOURCE_ID_LEN),
            name: req.name.unwrap_or_default().trim().to_owned(),
            intro: req.intro.unwrap_or_default(),
            description: req.description.unwrap_or_default(),
            plugin_type: non_blank(req.plugin_type).unwrap_or_else(|| DEFAULT_PLUGIN_TYPE.to_owned()),
            plugin_url: req.plugin_url.unwrap_or_default(),
            version: non_blank(req.version).unwrap_or_else(|| DEFAULT_VERSION.to_owned()),
            auth_type: non_blank(req.auth_type).unwrap_or_else(|| DEFAULT_AUTH_TYPE.to_owned()),
            tools: req.tools.unwrap_or_default(),
            enabled: false,
            status: PluginStatus::Disabled,
            publish_status: PublishStatus::Unpublished,
            test_status: TestStatus::Untested,
            last_test_at: None,
            created_at: now,
            updated_at: now,
        };
        data.plugins.insert(0, plugin.clone());
        info!(plugin_id = %plugin.id, name = %plugin.name, "plugin created");
        Ok(plugin)
    }

    async fn get_plugin(&self, id: &str) -> CoreResult<Plugin> {
        self.with_plugin(id, |p| Ok(p.clone())).await
    }

    async fn update_plugin(&self, id: &str, req: UpdatePluginRequest) -> CoreResult<Plugin> {
        req.validate()?;
        self.with_plugin(id, move |p| {
            if let Some(name) = req.name {
                p.name = name.trim().to_owned();
            }
            if let Some(intro) = req.intro {
                p.intro = intro;
            }
            if let Some(description) = req.description {
                p.description = description;
            }
            if let Some(plugin_type) = non_blank(req.plugin_type) {
                p.plugin_type = plugin_type;
            }
            if let Some(plugin_url) = req.plugin_url {
                p.plugin_url = plugin_url;
            }
            if let Some(version) = non_blank(req.version) {
                p.version = version;
            }
            if let Some(auth_type) = non_blank(req.auth_type) {
                p.auth_type = auth_type;
            }
            if let Some(tools) = req.tools {
                p.tools = tools;
            }
            p.updated_at = now_millis();
            Ok(p.clone())
        })
        .await
    }

    async fn delete_plugin(&self, id: &str) -> CoreResult<Deleted> {
        let mut data = self.lock().await;
        let pos = data
            .plugins
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| CoreError::not_found("plugin", id))?;
        let removed = data.plugins.remove(pos);
        info!(plugin_id = %id, "plugin deleted");
        Ok(Deleted { id: removed.id })
    }

    async fn toggle_plugin(&self, id: &str, enable: bool) -> CoreResult<Plugin> {
        self.with_plugin(id, |p| {
            if enable && p.test_status != TestStatus::Passed {
                return Err(CoreError::Validation(format!(
                    "plugin {} must pass a test run before it can be enabled",
                    p.id
                )));
            }
            p.enabled = enable;
            p.status = if enable { PluginStatus::Enabled } else { PluginStatus::Disabled };
            p.updated_at = now_millis();
            Ok(p.clone())
        })
        .await
    }

    async fn publish_plugin(&self, id: &str) -> CoreResult<Plugin> {
        self.with_plugin(id, |p| {
            if !p.enabled {
                return Err(CoreError::Validation(format!(
                    "plugin {} must be enabled before it can be published",
                    p.id
                )));
            }
            p.publish_status = PublishStatus::Published;
            p.updated_at = now_millis();
            Ok(p.clone())
        })
        .await
    }

    async fn test_plugin(&self, req: PluginTestRequest) -> CoreResult<PluginTestResult> {
        let plugin_id = req.plugin_id.trim().to_owned();
        if plugin_id.is_empty() {
            return Err(CoreError::Validation("pluginId is required".to_owned()));
        }
        let duration_ms = rand::thread_rng().gen_range(20..200);
        let tool_name = non_blank(req.tool_name);
        let inputs = req.inputs;
        self.with_plugin(&plugin_id, move |p| {
            let missing = tool_name
                .as_deref()
                .filter(|name| !p.tools.iter().any(|t| t.name == *name));
            let (success, output) = match missing {
                Some(name) => (false, serde_json::json!({ "error": format!("tool {name} not found") })),
                None => (true, serde_json::json!({ "tool": tool_name, "inputs": inputs })),
            };
            p.test_status = if success { TestStatus::Passed } else { TestStatus::Failed };
            let now = now_millis();
            p.last_test_at = Some(now);
            p.updated_at = now;
            debug!(plugin_id = %p.id, success, "plugin test run");
            Ok(PluginTestResult { plugin_id: p.id.clone(), success, output, duration_ms })
        })
        .await
    }

    async fn import_template(&self, raw: &[u8]) -> CoreResult<PluginTemplate> {
        let template = PluginTemplate::parse(raw)?;
        debug!(name = %template.name, tools = template.tools.len(), "plugin template parsed");
        Ok(template)
    }

    async fn list_published_names(&self) -> CoreResult<Vec<String>> {
        let data = self.lock().await;
        Ok(data
            .plugins
            .iter()
            .filter(|p| p.publish_status == PublishStatus::Published)
            .map(|p| p.name.clone())
            .collect())
    }
}
