//! Tool dispatcher.
//!
//! A call is validated against its catalog entry, turned into a [`Plan`]
//! (pure, no I/O), and then executed against an [`InventoryBackend`].

use log::{debug, info, warn};
use serde_json::{json, Map, Value};

use crate::catalog::ToolKind;
use crate::client::{BackendRequest, InventoryBackend};
use crate::discovery::{self, DiscoveryParams};
use crate::error::{ToolError, ValidationError};

/// Message returned when a deletion is attempted without `confirm: true`.
pub const CONFIRMATION_REQUIRED: &str = "Deletion requires confirm=true";

/// A validated invocation with defaults filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub kind: ToolKind,
    pub args: Map<String, Value>,
}

impl ToolCall {
    /// Resolve `name` and validate `args`. Non-object arguments count as `{}`.
    pub fn parse(name: &str, args: Value) -> Result<Self, ValidationError> {
        let kind =
            ToolKind::from_name(name).ok_or_else(|| ValidationError::UnknownTool(name.to_string()))?;
        let args = match args {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let args = kind.spec().validate(args)?;
        Ok(Self { kind, args })
    }

    fn arg(&self, param: &'static str) -> Result<&Value, ValidationError> {
        self.args
            .get(param)
            .ok_or(ValidationError::MissingArgument {
                tool: self.kind.name(),
                param,
            })
    }

    fn str_arg(&self, param: &'static str) -> Result<&str, ValidationError> {
        self.arg(param)?
            .as_str()
            .ok_or(ValidationError::InvalidType {
                tool: self.kind.name(),
                param,
                expected: "string",
            })
    }

    fn bool_arg(&self, param: &'static str) -> bool {
        self.args.get(param).and_then(Value::as_bool).unwrap_or(false)
    }

    /// `/api/{type}` or `/api/{type}/{id}`.
    fn entity_path(&self, with_id: bool) -> Result<String, ValidationError> {
        let entity_type = self.str_arg("type")?;
        if with_id {
            Ok(format!("/api/{}/{}", entity_type, path_segment(self.arg("id")?)))
        } else {
            Ok(format!("/api/{}", entity_type))
        }
    }
}

/// Render a JSON scalar as a URL path segment; integral floats drop the `.0`.
fn path_segment(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => i.to_string(),
            (_, Some(u), _) => u.to_string(),
            (_, _, Some(f)) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                (f as i64).to_string()
            }
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

/// What a validated call will do.
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    /// One backend call whose payload is the result.
    Request(BackendRequest),
    /// Answer locally without touching the backend.
    Respond(Value),
    /// Scan, then maybe import.
    Discover(DiscoveryParams),
}

/// Map a validated call onto backend operations.
pub fn plan(call: &ToolCall) -> Result<Plan, ValidationError> {
    let request = match call.kind {
        ToolKind::InventoryList => BackendRequest::get(call.entity_path(false)?),
        ToolKind::InventorySearch => BackendRequest::get("/api/search")
            .with_query("q", call.str_arg("q")?)
            .with_query("limit", path_segment(call.arg("limit")?)),
        ToolKind::InventoryCreate => {
            BackendRequest::post(call.entity_path(false)?, Some(call.arg("data")?.clone()))
        }
        ToolKind::InventoryUpdate => {
            BackendRequest::put(call.entity_path(true)?, call.arg("data")?.clone())
        }
        ToolKind::InventoryDelete => {
            if !call.bool_arg("confirm") {
                return Ok(Plan::Respond(json!({ "error": CONFIRMATION_REQUIRED })));
            }
            BackendRequest::delete(call.entity_path(true)?)
        }
        ToolKind::HealthCheck => {
            let hosts = call.arg("hosts")?;
            BackendRequest::post("/api/health-check", Some(json!({ "hosts": hosts })))
        }
        ToolKind::SearchIndex => BackendRequest::post("/api/search/index", None),
        ToolKind::MapGraph => BackendRequest::get("/api/map/graph"),
        ToolKind::AppStatus => BackendRequest::get("/api/health"),
        ToolKind::InventoryAll => BackendRequest::get("/api/inventory"),
        ToolKind::DiscoverSubnet => {
            return Ok(Plan::Discover(DiscoveryParams {
                cidr: call.str_arg("cidr")?.to_string(),
                concurrency: call.arg("concurrency")?.clone(),
                timeout: call.arg("timeout")?.clone(),
                import_alive: call.bool_arg("import_alive"),
            }))
        }
    };
    Ok(Plan::Request(request))
}

/// Validate and run one tool call.
///
/// Validation failures return before any backend call. Backend failures come
/// back as [`ToolError::Execution`].
pub async fn execute<B: InventoryBackend>(
    backend: &B,
    name: &str,
    args: Value,
) -> Result<Value, ToolError> {
    let call = ToolCall::parse(name, args)?;
    info!("Tool called: {}", call.kind);

    let result = match plan(&call)? {
        Plan::Respond(value) => {
            debug!("{} answered locally", call.kind);
            Ok(value)
        }
        Plan::Request(request) => {
            debug!("{} -> {:?} {}", call.kind, request.method, request.path);
            backend.send(request).await
        }
        Plan::Discover(params) => discovery::run(backend, &params).await,
    };

    result.map_err(|e| {
        warn!("{} failed: {}", call.kind, e);
        ToolError::Execution(e)
    })
}
