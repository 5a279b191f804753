//! Tool registry
//!
//! The set of tools the gateway accepts is fixed at compile time. Each
//! [`ToolDescriptor`] carries everything needed to serve a call:
//!
//! - the declared arguments (required ones are enforced, all are listed in the manifest)
//! - an optional extra validation step for field-specific rules
//! - the Memory API [`Route`] the call is forwarded to
//! - an optional display hint builder for successful results
//!
//! Adding a tool means adding one entry to [`TOOLS`].
//!
//! # Tools
//!
//! - `create_memory` - Create a new memory
//! - `set_core` - Set (or lift) the core narrative of a memory
//! - `lock_core` - Make the current core immutable
//! - `append_layer` - Add a layer to a memory
//! - `search_associative` - Search memories
//! - `weave` - Connect two memories
//! - `set_permissions` - Change memory visibility
//! - `invite` - Invite a collaborator

use serde::Serialize;
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::backend::{BackendCall, Verb};
use crate::display;

/// Arguments of a tool call
pub type Arguments = Map<String, Value>;

/// JSON type of a declared argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    String,
    Integer,
    Boolean,
    Array,
    Object,
}

impl ArgKind {
    fn schema_type(&self) -> &'static str {
        match self {
            ArgKind::String => "string",
            ArgKind::Integer => "integer",
            ArgKind::Boolean => "boolean",
            ArgKind::Array => "array",
            ArgKind::Object => "object",
        }
    }
}

/// A declared tool argument
#[derive(Debug, Clone, Copy)]
pub struct ArgSpec {
    pub name: &'static str,
    pub kind: ArgKind,
    pub required: bool,
    pub description: &'static str,
    /// Accepted values, listed in the manifest only
    pub values: &'static [&'static str],
}

impl ArgSpec {
    const fn required(name: &'static str, kind: ArgKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            description,
            values: &[],
        }
    }

    const fn optional(name: &'static str, kind: ArgKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: false,
            description,
            values: &[],
        }
    }

    const fn one_of(mut self, values: &'static [&'static str]) -> Self {
        self.values = values;
        self
    }
}

/// Where a validated call is sent on the Memory API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// POST the arguments to a fixed collection path.
    Collection { segments: &'static [&'static str] },
    /// A sub-resource of the memory named by `memory_id`:
    /// `/v1/memories/{memory_id}/{resource}`.
    Memory {
        verb: Verb,
        resource: &'static str,
        with_body: bool,
    },
    /// GET `/v1/search/associative` with `q` and optional `limit` query parameters.
    Search,
}

impl Route {
    /// Build the outbound call for already validated arguments.
    pub fn build(&self, arguments: &Arguments) -> Result<BackendCall, ArgError> {
        match *self {
            Route::Collection { segments } => Ok(BackendCall::new(Verb::Post, segments.iter().copied())
                .with_body(Value::Object(arguments.clone()))),
            Route::Memory {
                verb,
                resource,
                with_body,
            } => {
                let memory_id = url_argument(arguments, "memory_id")?;
                let call = BackendCall::new(verb, ["v1", "memories", memory_id, resource]);
                Ok(if with_body {
                    call.with_body(Value::Object(arguments.clone()))
                } else {
                    call
                })
            }
            Route::Search => {
                let query = url_argument(arguments, "query")?;
                let mut call = BackendCall::new(Verb::Get, ["v1", "search", "associative"])
                    .with_query("q", query);
                if let Some(limit) = arguments.get("limit").filter(|v| is_present(v)) {
                    let limit = match limit {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    call = call.with_query("limit", limit);
                }
                Ok(call)
            }
        }
    }

    /// Arguments the route copies into the URL, which must be strings.
    fn url_fields(&self) -> &'static [&'static str] {
        match self {
            Route::Collection { .. } => &[],
            Route::Memory { .. } => &["memory_id"],
            Route::Search => &["query"],
        }
    }
}

/// Argument validation failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgError {
    #[error("arguments object is required")]
    ArgumentsRequired,

    #[error("{field} is required")]
    Missing { field: &'static str },

    #[error("{field} is required for {kind} layers")]
    MissingForKind {
        field: &'static str,
        kind: &'static str,
    },

    #[error("{field} must be a string")]
    NotAString { field: &'static str },

    #[error("{field} must be {expected}")]
    NotAllowed {
        field: &'static str,
        expected: &'static str,
    },
}

/// Static description of one tool
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub args: &'static [ArgSpec],
    pub route: Route,
    /// Field-specific rules run after the required-argument check
    pub check: Option<fn(&Arguments) -> Result<(), ArgError>>,
    /// Builds the `_display` hint for a successful result
    pub display: Option<fn(&Map<String, Value>) -> Value>,
}

impl ToolDescriptor {
    /// Names of the required arguments, in declaration order.
    pub fn required_args(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.args.iter().filter(|a| a.required).map(|a| a.name)
    }

    /// Validate call arguments.
    ///
    /// Reports the first violation: missing required arguments in declaration
    /// order, then non-string values for arguments copied into the URL, then
    /// the tool's own check.
    pub fn validate(&self, arguments: &Arguments) -> Result<(), ArgError> {
        for spec in self.args.iter().filter(|a| a.required) {
            if !arguments.get(spec.name).is_some_and(is_present) {
                return Err(ArgError::Missing { field: spec.name });
            }
        }

        for &field in self.route.url_fields() {
            url_argument(arguments, field)?;
        }

        match self.check {
            Some(check) => check(arguments),
            None => Ok(()),
        }
    }

    /// JSON schema for the manifest.
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for spec in self.args {
            let mut property = json!({
                "type": spec.kind.schema_type(),
                "description": spec.description,
            });
            if !spec.values.is_empty() {
                property["enum"] = json!(spec.values);
            }
            properties.insert(spec.name.to_string(), property);
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": self.required_args().collect::<Vec<_>>(),
        })
    }

    pub fn manifest_entry(&self) -> ManifestEntry {
        ManifestEntry {
            name: self.name,
            description: self.description,
            input_schema: self.input_schema(),
        }
    }
}

/// One tool as listed by `GET /mcp/manifest`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

/// A value counts as present unless it is null or an empty string.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn url_argument<'a>(arguments: &'a Arguments, field: &'static str) -> Result<&'a str, ArgError> {
    match arguments.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s),
        Some(v) if is_present(v) => Err(ArgError::NotAString { field }),
        _ => Err(ArgError::Missing { field }),
    }
}

const VISIBILITIES: &[&str] = &["PRIVATE", "SHARED", "PUBLIC"];
const LAYER_KINDS: &[&str] = &["TEXT", "IMAGE", "VIDEO", "AUDIO", "REFLECTION", "LINK"];
const RELATIONS: &[&str] = &["SAME_PERSON", "SAME_EVENT", "THEME", "EMOTION", "TIME_NEAR"];
const ROLES: &[&str] = &["CONTRIBUTOR", "VIEWER"];

fn check_append_layer(arguments: &Arguments) -> Result<(), ArgError> {
    let present = |field: &str| arguments.get(field).is_some_and(is_present);

    match arguments.get("kind").and_then(Value::as_str) {
        Some("TEXT") if !present("text_content") => Err(ArgError::MissingForKind {
            field: "text_content",
            kind: "TEXT",
        }),
        Some("IMAGE") if !present("artifact_id") => Err(ArgError::MissingForKind {
            field: "artifact_id",
            kind: "IMAGE",
        }),
        _ => Ok(()),
    }
}

fn check_set_permissions(arguments: &Arguments) -> Result<(), ArgError> {
    match arguments.get("visibility").and_then(Value::as_str) {
        Some(v) if VISIBILITIES.contains(&v) => Ok(()),
        _ => Err(ArgError::NotAllowed {
            field: "visibility",
            expected: "PRIVATE, SHARED, or PUBLIC",
        }),
    }
}

/// The tool registry.
pub static TOOLS: &[ToolDescriptor] = &[
    ToolDescriptor {
        name: "create_memory",
        description: "Create a new memory",
        args: &[
            ArgSpec::required("title", ArgKind::String, "Memory title"),
            ArgSpec::optional("seed_text", ArgKind::String, "Initial free text for the memory"),
            ArgSpec::optional("visibility", ArgKind::String, "Initial visibility").one_of(VISIBILITIES),
        ],
        route: Route::Collection {
            segments: &["v1", "memories"],
        },
        check: None,
        display: Some(display::create_memory),
    },
    ToolDescriptor {
        name: "set_core",
        description: "Set the core narrative of a memory; pass lift=true to start a new draft of a locked core",
        args: &[
            ArgSpec::required("memory_id", ArgKind::String, "Memory identifier"),
            ArgSpec::required("narrative", ArgKind::String, "Core narrative text"),
            ArgSpec::optional("anchors", ArgKind::Array, "Anchor phrases"),
            ArgSpec::optional("people", ArgKind::Array, "People involved"),
            ArgSpec::optional("when_start", ArgKind::String, "Start time (ISO 8601)"),
            ArgSpec::optional("when_end", ArgKind::String, "End time (ISO 8601)"),
            ArgSpec::optional("where", ArgKind::String, "Place"),
            ArgSpec::optional("lift", ArgKind::Boolean, "Start a new draft version when the core is locked"),
        ],
        route: Route::Memory {
            verb: Verb::Put,
            resource: "core",
            with_body: true,
        },
        check: None,
        display: Some(display::set_core),
    },
    ToolDescriptor {
        name: "lock_core",
        description: "Make the current core of a memory immutable",
        args: &[ArgSpec::required("memory_id", ArgKind::String, "Memory identifier")],
        route: Route::Memory {
            verb: Verb::Post,
            resource: "lock",
            with_body: false,
        },
        check: None,
        display: Some(display::lock_core),
    },
    ToolDescriptor {
        name: "append_layer",
        description: "Add a layer (text, media, reflection or link) to a memory",
        args: &[
            ArgSpec::required("memory_id", ArgKind::String, "Memory identifier"),
            ArgSpec::required("kind", ArgKind::String, "Layer kind").one_of(LAYER_KINDS),
            ArgSpec::optional("text_content", ArgKind::String, "Text of TEXT and REFLECTION layers"),
            ArgSpec::optional("artifact_id", ArgKind::String, "Uploaded artifact for media layers"),
            ArgSpec::optional("meta", ArgKind::Object, "Extra layer metadata, e.g. url for LINK layers"),
        ],
        route: Route::Memory {
            verb: Verb::Post,
            resource: "layers",
            with_body: true,
        },
        check: Some(check_append_layer),
        display: Some(display::append_layer),
    },
    ToolDescriptor {
        name: "search_associative",
        description: "Search memories by semantic, lexical and graph similarity",
        args: &[
            ArgSpec::required("query", ArgKind::String, "Search text"),
            ArgSpec::optional("limit", ArgKind::Integer, "Maximum number of results"),
        ],
        route: Route::Search,
        check: None,
        display: Some(display::search_associative),
    },
    ToolDescriptor {
        name: "weave",
        description: "Create a connection between two memories",
        args: &[
            ArgSpec::required("from_memory_id", ArgKind::String, "Source memory"),
            ArgSpec::required("to_memory_id", ArgKind::String, "Target memory"),
            ArgSpec::optional("relation_type", ArgKind::String, "Kind of connection").one_of(RELATIONS),
            ArgSpec::optional("note", ArgKind::String, "Free text note"),
        ],
        route: Route::Collection {
            segments: &["v1", "weaves"],
        },
        check: None,
        display: Some(display::weave),
    },
    ToolDescriptor {
        name: "set_permissions",
        description: "Update memory visibility and participants",
        args: &[
            ArgSpec::required("memory_id", ArgKind::String, "Memory identifier"),
            ArgSpec::required("visibility", ArgKind::String, "New visibility").one_of(VISIBILITIES),
            ArgSpec::optional("allowed_users", ArgKind::Array, "Users granted access"),
        ],
        route: Route::Memory {
            verb: Verb::Post,
            resource: "permissions",
            with_body: true,
        },
        check: Some(check_set_permissions),
        display: Some(display::set_permissions),
    },
    ToolDescriptor {
        name: "invite",
        description: "Invite someone to contribute to or view a memory",
        args: &[
            ArgSpec::required("email", ArgKind::String, "Invitee email address"),
            ArgSpec::required("role", ArgKind::String, "Granted role").one_of(ROLES),
            ArgSpec::optional("memory_id", ArgKind::String, "Memory to share"),
        ],
        route: Route::Collection {
            segments: &["v1", "invites"],
        },
        check: None,
        display: Some(display::invite),
    },
];

/// Look up a tool by exact name.
pub fn lookup(name: &str) -> Option<&'static ToolDescriptor> {
    TOOLS.iter().find(|tool| tool.name == name)
}

/// Manifest entries for every registered tool.
pub fn manifest() -> Vec<ManifestEntry> {
    TOOLS.iter().map(ToolDescriptor::manifest_entry).collect()
}
