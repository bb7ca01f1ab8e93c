use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Ticket fields accepted by `create_ticket`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketData {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl TicketData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            status: None,
            priority: None,
            kind: None,
        }
    }

    /// Arguments for the `create_ticket` tool. Unset optional fields are left out.
    pub fn into_arguments(
        self,
        integration_id: &str,
        organization_id: &str,
        collection_id: &str,
    ) -> Value {
        let mut args = Map::new();
        args.insert("ticket_name".into(), json!(self.name));
        let optional = [
            ("ticket_description", self.description),
            ("ticket_status", self.status),
            ("ticket_priority", self.priority),
            ("ticket_type", self.kind),
        ];
        for (key, value) in optional {
            if let Some(v) = value {
                args.insert(key.into(), json!(v));
            }
        }
        args.insert("integration_id".into(), json!(integration_id));
        args.insert("organization_id".into(), json!(organization_id));
        args.insert("collection_id".into(), json!(collection_id));
        Value::Object(args)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Integration {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Compact ticket listing entry returned by `list_tickets`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketSummary {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
}
