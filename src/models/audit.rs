// src/models/audit.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "audit_action", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    #[allow(dead_code)]
    Read,
}

// Quem fez a alteração (vem do request)
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub tenant_id: Uuid,
    pub user_id: Uuid,
}

/// `{ "before": ..., "after": ... }` com os lados que existirem.
pub fn changes<B: Serialize, A: Serialize>(before: Option<&B>, after: Option<&A>) -> Value {
    let mut map = serde_json::Map::new();
    if let Some(b) = before {
        map.insert("before".into(), serde_json::to_value(b).unwrap_or(Value::Null));
    }
    if let Some(a) = after {
        map.insert("after".into(), serde_json::to_value(a).unwrap_or(Value::Null));
    }
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn changes_keep_only_present_sides() {
        let after = json!({ "title": "New" });
        let v = changes::<Value, Value>(None, Some(&after));
        assert_eq!(v, json!({ "after": { "title": "New" } }));
    }
}
