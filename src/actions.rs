use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Remote procedures exposed by the ticketing server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ListServices,
    ListIntegrations,
    ListOrganizations,
    ListCollections,
    ConfirmTicketCreation,
    CreateTicket,
    ListTickets,
    HealthCheck,
}

impl Action {
    pub const ALL: [Action; 8] = [
        Action::ListServices,
        Action::ListIntegrations,
        Action::ListOrganizations,
        Action::ListCollections,
        Action::ConfirmTicketCreation,
        Action::CreateTicket,
        Action::ListTickets,
        Action::HealthCheck,
    ];

    /// Tool name on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::ListServices => "list_services",
            Action::ListIntegrations => "list_integrations",
            Action::ListOrganizations => "list_organizations",
            Action::ListCollections => "list_collections",
            Action::ConfirmTicketCreation => "confirm_ticket_creation",
            Action::CreateTicket => "create_ticket",
            Action::ListTickets => "list_tickets",
            Action::HealthCheck => "health_check",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown action: {0}")]
pub struct UnknownAction(pub String);

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Action::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == lower)
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPECTED: [&str; 8] = [
        "list_services",
        "list_integrations",
        "list_organizations",
        "list_collections",
        "confirm_ticket_creation",
        "create_ticket",
        "list_tickets",
        "health_check",
    ];

    #[test]
    fn wire_names() {
        let names: Vec<&str> = Action::ALL.iter().map(|a| a.as_str()).collect();
        assert_eq!(names, EXPECTED);
    }

    #[test]
    fn parse_accepts_upper_case() {
        assert_eq!("CREATE_TICKET".parse::<Action>().unwrap(), Action::CreateTicket);
        assert_eq!("health_check".parse::<Action>().unwrap(), Action::HealthCheck);
    }

    #[test]
    fn parse_rejects_unknown() {
        let err = "delete_everything".parse::<Action>().unwrap_err();
        assert_eq!(err.to_string(), "unknown action: delete_everything");
    }

    #[test]
    fn serializes_as_wire_name() {
        let json = serde_json::to_string(&Action::ConfirmTicketCreation).unwrap();
        assert_eq!(json, "\"confirm_ticket_creation\"");
        let back: Action = serde_json::from_str("\"list_tickets\"").unwrap();
        assert_eq!(back, Action::ListTickets);
    }
}
