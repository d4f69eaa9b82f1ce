//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::LearningResource;
use crate::session::{NavTarget, SessionSnapshot};

/// Presentation layer → controller. Sent as a WS frame or an HTTP action body.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientAction {
    Ping,
    Login,
    Logout,
    SelectRole {
        #[serde(rename = "roleId")]
        role_id: String,
    },
    StartChallenge {
        prompt: String,
    },
    BeginSimulation,
    Back,
    SubmitSimulation {
        text: String,
    },
    Retry,
    SaveResource {
        resource: LearningResource,
    },
    Navigate {
        view: NavTarget,
    },
    ResetToDashboard,
    DismissError,
}

impl ClientAction {
    pub fn name(&self) -> &'static str {
        match self {
            ClientAction::Ping => "ping",
            ClientAction::Login => "login",
            ClientAction::Logout => "logout",
            ClientAction::SelectRole { .. } => "select_role",
            ClientAction::StartChallenge { .. } => "start_challenge",
            ClientAction::BeginSimulation => "begin_simulation",
            ClientAction::Back => "back",
            ClientAction::SubmitSimulation { .. } => "submit_simulation",
            ClientAction::Retry => "retry",
            ClientAction::SaveResource { .. } => "save_resource",
            ClientAction::Navigate { .. } => "navigate",
            ClientAction::ResetToDashboard => "reset_to_dashboard",
            ClientAction::DismissError => "dismiss_error",
        }
    }
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Session {
        session: SessionSnapshot,
    },
    Error {
        message: String,
    },
}

//
// HTTP request/response DTOs
//

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCreatedOut {
    pub session_id: String,
    pub session: SessionSnapshot,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub generation: &'static str,
}
