//! Static tool catalog.
//!
//! Every tool is a variant of [`ToolKind`]; its [`ToolSpec`] declares the
//! parameters structurally (type, required flag, allowed values, default) so
//! that [`ToolSpec::validate`] can check any call without per-tool code. The
//! same specs are rendered as JSON Schema for `tools/list`.

use std::fmt;
use std::sync::Arc;

use rmcp::model::{JsonObject, Tool};
use serde_json::{json, Map, Value};

use crate::error::ValidationError;

/// Entity collections exposed by the inventory backend.
pub const ENTITY_TYPES: &[&str] = &[
    "hardware", "vms", "apps", "storage", "networks", "misc", "shares", "documents",
];

// ── Tool identity ─────────────────────────────────────────────────

/// Identifier of every tool the gateway exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    InventoryList,
    InventorySearch,
    InventoryCreate,
    InventoryUpdate,
    InventoryDelete,
    HealthCheck,
    SearchIndex,
    MapGraph,
    AppStatus,
    InventoryAll,
    DiscoverSubnet,
}

impl ToolKind {
    /// All tools, in the order they are listed to clients.
    pub const ALL: [ToolKind; 11] = [
        ToolKind::InventoryList,
        ToolKind::InventorySearch,
        ToolKind::InventoryCreate,
        ToolKind::InventoryUpdate,
        ToolKind::InventoryDelete,
        ToolKind::HealthCheck,
        ToolKind::SearchIndex,
        ToolKind::MapGraph,
        ToolKind::AppStatus,
        ToolKind::InventoryAll,
        ToolKind::DiscoverSubnet,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::InventoryList => "inventory_list",
            ToolKind::InventorySearch => "inventory_search",
            ToolKind::InventoryCreate => "inventory_create",
            ToolKind::InventoryUpdate => "inventory_update",
            ToolKind::InventoryDelete => "inventory_delete",
            ToolKind::HealthCheck => "health_check",
            ToolKind::SearchIndex => "search_index",
            ToolKind::MapGraph => "map_graph",
            ToolKind::AppStatus => "app_status",
            ToolKind::InventoryAll => "inventory_all",
            ToolKind::DiscoverSubnet => "discover_subnet",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn spec(self) -> &'static ToolSpec {
        match self {
            ToolKind::InventoryList => &INVENTORY_LIST,
            ToolKind::InventorySearch => &INVENTORY_SEARCH,
            ToolKind::InventoryCreate => &INVENTORY_CREATE,
            ToolKind::InventoryUpdate => &INVENTORY_UPDATE,
            ToolKind::InventoryDelete => &INVENTORY_DELETE,
            ToolKind::HealthCheck => &HEALTH_CHECK,
            ToolKind::SearchIndex => &SEARCH_INDEX,
            ToolKind::MapGraph => &MAP_GRAPH,
            ToolKind::AppStatus => &APP_STATUS,
            ToolKind::InventoryAll => &INVENTORY_ALL,
            ToolKind::DiscoverSubnet => &DISCOVER_SUBNET,
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Parameter schema ──────────────────────────────────────────────

/// JSON type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    pub fn as_str(self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
            ParamType::Object => "object",
        }
    }

    pub fn matches(self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Number => value.is_number(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Array => value.is_array(),
            ParamType::Object => value.is_object(),
        }
    }

    fn array_of(self) -> &'static str {
        match self {
            ParamType::String => "array of string",
            ParamType::Number => "array of number",
            ParamType::Boolean => "array of boolean",
            ParamType::Array => "array of array",
            ParamType::Object => "array of object",
        }
    }
}

/// Default substituted when an optional parameter is absent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamDefault {
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl ParamDefault {
    pub fn to_value(self) -> Value {
        match self {
            ParamDefault::Integer(v) => json!(v),
            ParamDefault::Float(v) => json!(v),
            ParamDefault::Bool(v) => json!(v),
        }
    }
}

/// One declared parameter of a tool.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub param_type: ParamType,
    pub description: Option<&'static str>,
    pub required: bool,
    pub allowed: Option<&'static [&'static str]>,
    pub default: Option<ParamDefault>,
    /// Element type for array parameters.
    pub items: Option<ParamType>,
}

impl ParamSpec {
    pub const fn new(name: &'static str, param_type: ParamType) -> Self {
        Self {
            name,
            param_type,
            description: None,
            required: false,
            allowed: None,
            default: None,
            items: None,
        }
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn describe(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }

    pub const fn one_of(mut self, allowed: &'static [&'static str]) -> Self {
        self.allowed = Some(allowed);
        self
    }

    pub const fn default_to(mut self, default: ParamDefault) -> Self {
        self.default = Some(default);
        self
    }

    pub const fn items(mut self, items: ParamType) -> Self {
        self.items = Some(items);
        self
    }

    fn check(&self, tool: &'static str, value: &Value) -> Result<(), ValidationError> {
        if !self.param_type.matches(value) {
            return Err(ValidationError::InvalidType {
                tool,
                param: self.name,
                expected: self.param_type.as_str(),
            });
        }
        if let (Some(items), Some(elements)) = (self.items, value.as_array()) {
            if !elements.iter().all(|e| items.matches(e)) {
                return Err(ValidationError::InvalidType {
                    tool,
                    param: self.name,
                    expected: items.array_of(),
                });
            }
        }
        if let Some(allowed) = self.allowed {
            let ok = value.as_str().is_some_and(|s| allowed.contains(&s));
            if !ok {
                return Err(ValidationError::NotAllowed {
                    tool,
                    param: self.name,
                    allowed: allowed.join(", "),
                });
            }
        }
        Ok(())
    }

    fn schema(&self) -> Value {
        let mut prop = Map::new();
        prop.insert("type".to_string(), json!(self.param_type.as_str()));
        if let Some(items) = self.items {
            prop.insert("items".to_string(), json!({ "type": items.as_str() }));
        }
        if let Some(allowed) = self.allowed {
            prop.insert("enum".to_string(), json!(allowed));
        }
        if let Some(description) = self.description {
            prop.insert("description".to_string(), json!(description));
        }
        if let Some(default) = self.default {
            prop.insert("default".to_string(), default.to_value());
        }
        Value::Object(prop)
    }
}

// ── Tool spec ─────────────────────────────────────────────────────

/// Name, description and declared parameters of one tool.
#[derive(Debug, PartialEq)]
pub struct ToolSpec {
    pub kind: ToolKind,
    pub description: &'static str,
    pub params: &'static [ParamSpec],
}

impl ToolSpec {
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn param(&self, name: &str) -> Option<&'static ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Check `args` against the declared parameters and fill in defaults.
    ///
    /// `null` counts as absent. Keys the schema does not declare are left
    /// untouched.
    pub fn validate(&self, mut args: Map<String, Value>) -> Result<Map<String, Value>, ValidationError> {
        for param in self.params {
            match args.get(param.name) {
                None | Some(Value::Null) => {
                    if param.required {
                        return Err(ValidationError::MissingArgument {
                            tool: self.name(),
                            param: param.name,
                        });
                    }
                    match param.default {
                        Some(default) => {
                            args.insert(param.name.to_string(), default.to_value());
                        }
                        None => {
                            args.remove(param.name);
                        }
                    }
                }
                Some(value) => param.check(self.name(), value)?,
            }
        }
        Ok(args)
    }

    /// JSON Schema for the tool's `inputSchema`.
    pub fn input_schema(&self) -> JsonObject {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|p| (p.name.to_string(), p.schema()))
            .collect();
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();

        let mut schema = Map::new();
        schema.insert("type".to_string(), json!("object"));
        schema.insert("properties".to_string(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".to_string(), json!(required));
        }
        schema
    }

    /// The tool as advertised by `tools/list`.
    pub fn definition(&self) -> Tool {
        Tool::new(self.name(), self.description, Arc::new(self.input_schema()))
    }
}

/// All tool definitions, in catalog order.
pub fn tool_definitions() -> Vec<Tool> {
    ToolKind::ALL.iter().map(|kind| kind.spec().definition()).collect()
}

// ── Catalog entries ───────────────────────────────────────────────

const ENTITY_TYPE: ParamSpec = ParamSpec::new("type", ParamType::String)
    .required()
    .one_of(ENTITY_TYPES);

const ENTITY_ID: ParamSpec = ParamSpec::new("id", ParamType::Number)
    .required()
    .describe("Entity ID");

static INVENTORY_LIST: ToolSpec = ToolSpec {
    kind: ToolKind::InventoryList,
    description: "List all entities of a given type (hardware, vms, apps, storage, networks, misc, shares, documents).",
    params: &[ENTITY_TYPE.describe("Entity type to list")],
};

static INVENTORY_SEARCH: ToolSpec = ToolSpec {
    kind: ToolKind::InventorySearch,
    description: "Semantic search across all inventory entities.",
    params: &[
        ParamSpec::new("q", ParamType::String)
            .required()
            .describe("Search query"),
        ParamSpec::new("limit", ParamType::Number)
            .describe("Max results (default 20)")
            .default_to(ParamDefault::Integer(20)),
    ],
};

static INVENTORY_CREATE: ToolSpec = ToolSpec {
    kind: ToolKind::InventoryCreate,
    description: "Create a new inventory entity.",
    params: &[
        ENTITY_TYPE,
        ParamSpec::new("data", ParamType::Object)
            .required()
            .describe("Entity fields"),
    ],
};

static INVENTORY_UPDATE: ToolSpec = ToolSpec {
    kind: ToolKind::InventoryUpdate,
    description: "Update an existing inventory entity by ID.",
    params: &[
        ENTITY_TYPE,
        ENTITY_ID,
        ParamSpec::new("data", ParamType::Object)
            .required()
            .describe("Fields to update"),
    ],
};

static INVENTORY_DELETE: ToolSpec = ToolSpec {
    kind: ToolKind::InventoryDelete,
    description: "Delete an inventory entity by ID. Requires confirm=true to proceed.",
    params: &[
        ENTITY_TYPE,
        ENTITY_ID,
        ParamSpec::new("confirm", ParamType::Boolean)
            .required()
            .describe("Must be true to confirm deletion"),
    ],
};

static HEALTH_CHECK: ToolSpec = ToolSpec {
    kind: ToolKind::HealthCheck,
    description: "Ping one or more hosts and return alive/latency status.",
    params: &[ParamSpec::new("hosts", ParamType::Array)
        .required()
        .items(ParamType::String)
        .describe("IP addresses or hostnames to ping")],
};

static SEARCH_INDEX: ToolSpec = ToolSpec {
    kind: ToolKind::SearchIndex,
    description: "Trigger a full search-index backfill of all existing inventory entities (idempotent).",
    params: &[],
};

static MAP_GRAPH: ToolSpec = ToolSpec {
    kind: ToolKind::MapGraph,
    description: "Retrieve the network/infrastructure map graph (nodes + edges).",
    params: &[],
};

static APP_STATUS: ToolSpec = ToolSpec {
    kind: ToolKind::AppStatus,
    description: "Check if the homelab-hub backend is healthy.",
    params: &[],
};

static INVENTORY_ALL: ToolSpec = ToolSpec {
    kind: ToolKind::InventoryAll,
    description: "Retrieve all inventory items across all entity types in one call.",
    params: &[],
};

static DISCOVER_SUBNET: ToolSpec = ToolSpec {
    kind: ToolKind::DiscoverSubnet,
    description: "Scan a subnet CIDR for live hosts with port fingerprinting and banner grabbing. \
                  Optionally auto-import all alive hosts into inventory.",
    params: &[
        ParamSpec::new("cidr", ParamType::String)
            .required()
            .describe("CIDR block to scan, e.g. \"192.168.1.0/24\". Prefix length must be /16 or smaller."),
        ParamSpec::new("concurrency", ParamType::Number)
            .describe("Number of parallel probe threads (default 50)")
            .default_to(ParamDefault::Integer(50)),
        ParamSpec::new("timeout", ParamType::Number)
            .describe("Per-probe timeout in seconds (default 1.0)")
            .default_to(ParamDefault::Float(1.0)),
        ParamSpec::new("import_alive", ParamType::Boolean)
            .describe("If true, automatically import all alive hosts into inventory after scanning")
            .default_to(ParamDefault::Bool(false)),
    ],
};
