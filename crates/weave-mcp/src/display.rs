//! Presentation hints for the calling agent
//!
//! Successful results are returned as the backend sent them, with an added
//! `_display` object of tool-specific advisory text. Failed calls get short
//! guidance appended to the error message for the common cases (missing
//! memory, missing permission, locked core).

use serde_json::{Map, Value, json};

use crate::tools::ToolDescriptor;

/// Key under which display hints are added to object results.
pub const DISPLAY_KEY: &str = "_display";

/// Add the tool's display hint to a backend result.
///
/// Only object results are decorated, and a `_display` key already sent by
/// the backend is left as is. No backend field is changed.
pub fn decorate(tool: &ToolDescriptor, result: Value) -> Value {
    match (result, tool.display) {
        (Value::Object(mut map), Some(build)) if !map.contains_key(DISPLAY_KEY) => {
            let hint = build(&map);
            map.insert(DISPLAY_KEY.to_string(), hint);
            Value::Object(map)
        }
        (result, _) => result,
    }
}

pub fn create_memory(result: &Map<String, Value>) -> Value {
    let title = result.get("title").and_then(Value::as_str).unwrap_or("Untitled");
    json!({
        "message": format!("Memory created: \"{title}\""),
        "nextSteps": [
            "Set the core narrative with set_core",
            "Lock the core to make it immutable",
            "Add layers over time with append_layer",
        ],
    })
}

pub fn set_core(result: &Map<String, Value>) -> Value {
    let narrative = result
        .get("core")
        .and_then(|core| core.get("narrative"))
        .or_else(|| result.get("narrative"))
        .and_then(Value::as_str);

    let message = match narrative {
        Some(text) => format!("Core narrative set ({} characters)", text.chars().count()),
        None => "Core narrative updated".to_string(),
    };

    json!({
        "message": message,
        "tip": "Use lock_core to make this narrative immutable",
    })
}

pub fn lock_core(result: &Map<String, Value>) -> Value {
    let message = match result.get("version").and_then(Value::as_i64) {
        Some(version) => format!("Core locked successfully (version {version})"),
        None => "Core locked successfully".to_string(),
    };

    json!({
        "message": message,
        "locked": true,
        "tip": "To update, use set_core with lift:true to create a new draft",
    })
}

pub fn append_layer(result: &Map<String, Value>) -> Value {
    let kind = result.get("kind").and_then(Value::as_str);
    json!({
        "message": match kind {
            Some(kind) => format!("{kind} layer added to memory"),
            None => "Layer added to memory".to_string(),
        },
    })
}

pub fn search_associative(result: &Map<String, Value>) -> Value {
    let count = result
        .get("results")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);

    json!({
        "message": format!("Found {count} memories"),
        "count": count,
        "tip": if count > 0 {
            "Use memory_id from results to view details or create weaves"
        } else {
            "Try a different search query"
        },
    })
}

pub fn weave(result: &Map<String, Value>) -> Value {
    let relation = result
        .get("relation_type")
        .or_else(|| result.get("relation"))
        .and_then(Value::as_str)
        .unwrap_or("relates_to");

    json!({
        "message": "Created connection between memories",
        "relation": relation,
    })
}

pub fn set_permissions(result: &Map<String, Value>) -> Value {
    let message = match result.get("visibility").and_then(Value::as_str) {
        Some(visibility) => format!("Visibility set to {visibility}"),
        None => "Permissions updated".to_string(),
    };
    json!({ "message": message })
}

pub fn invite(result: &Map<String, Value>) -> Value {
    json!({
        "message": "Invite created",
        "tip": if result.contains_key("token") {
            "Share the invite token with the invitee"
        } else {
            "The invitee will be able to join once they accept"
        },
    })
}

/// Append next-step guidance to a Memory API error message.
///
/// Classification uses the status code and the message text, so a 409 whose
/// detail mentions a locked core is recognised as well as a plain 404.
pub fn annotate_error(status: u16, message: &str) -> String {
    let lower = message.to_lowercase();
    let base = message.trim_end().trim_end_matches('.');

    if status == 404 || lower.contains("404") || lower.contains("not found") {
        return format!(
            "{base}. The memory may not exist or you may not have access. \
             Use search_associative to find memories."
        );
    }

    if status == 403 || lower.contains("403") || lower.contains("forbidden") {
        return format!(
            "{base}. You don't have permission to perform this action. \
             Check memory permissions with the owner."
        );
    }

    if lower.contains("locked") {
        return format!(
            "{base}. This memory's core is locked. \
             Use set_core with lift:true to create a new draft version."
        );
    }

    message.to_string()
}
