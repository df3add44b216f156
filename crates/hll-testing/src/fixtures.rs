use hll_engine::CommandSet;
use serde_json::{Value, json};

/// The command schema the stub server offers, shaped like the real
/// server's `get_commands` reply.
pub fn commands_value() -> Value {
    json!({
        "LIST": {
            "name": "LIST",
            "description": "List files",
            "parameters": {
                "type": "object",
                "properties": {
                    "module": { "type": "string" }
                },
                "required": []
            }
        },
        "READ": {
            "name": "READ",
            "description": "Read file",
            "parameters": {
                "type": "object",
                "properties": {
                    "module": { "type": "string" },
                    "path": { "type": "string" }
                },
                "required": ["path"]
            }
        },
        "WRITE": {
            "name": "WRITE",
            "description": "Write file",
            "parameters": {
                "type": "object",
                "properties": {
                    "module": { "type": "string" },
                    "path": { "type": "string" },
                    "content": { "type": "string" }
                },
                "required": ["path", "content"]
            }
        },
        "LIST_MODULES": {
            "name": "LIST_MODULES",
            "description": "List all existing modules",
            "parameters": {
                "type": "object",
                "properties": {},
                "required": []
            }
        },
        "CREATE_MODULE": {
            "name": "CREATE_MODULE",
            "description": "Create a new module",
            "parameters": {
                "type": "object",
                "properties": {
                    "module_name": { "type": "string" },
                    "dependencies": { "type": "array", "items": { "type": "string" } }
                },
                "required": ["module_name", "dependencies"]
            }
        },
        "answer": {
            "name": "answer",
            "description": "Answer either YES or NO",
            "parameters": {
                "type": "object",
                "properties": {
                    "answer": { "type": "string", "enum": ["YES", "NO"] }
                },
                "required": ["answer"]
            }
        }
    })
}

/// The same schema as a ready-to-use [`CommandSet`].
pub fn commands() -> CommandSet {
    match commands_value() {
        Value::Object(map) => CommandSet::new(map),
        _ => unreachable!("commands_value is an object"),
    }
}
