//! Session state controller.
//!
//! Owns everything one user sees between login and logout: the current view
//! (a closed set of variants, each carrying only the data valid there), the
//! loading/error status, the challenge history and the saved resources.
//!
//! Generation calls are split in two so the owner never has to hold the
//! controller across an await: `begin_*` asserts loading and hands back a
//! `PendingCall`, `complete` applies the result. A completion is applied only
//! if its ticket is still the one in flight; logout, navigation and resets
//! abandon the ticket, so a late reply is dropped.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use crate::catalog::Catalog;
use crate::domain::{ChallengeHistoryItem, Feedback, LearningResource, Role, SavedResources, Scenario};
use crate::error::GenerationError;
use crate::generation::GenerationClient;

pub const LOADING_SCENARIO: &str = "Generating a custom scenario for you...";
pub const LOADING_FEEDBACK: &str = "Our experts are reviewing your submission...";
pub const SCENARIO_FAILED: &str = "Failed to generate a scenario. Please try again.";
pub const FEEDBACK_FAILED: &str = "Failed to generate feedback. Please try again.";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "name", rename_all = "camelCase")]
pub enum View {
  Dashboard,
  RoleDetail { role: Arc<Role> },
  Briefing { role: Arc<Role>, scenario: Arc<Scenario> },
  Simulation { role: Arc<Role>, scenario: Arc<Scenario> },
  Debrief { role: Arc<Role>, scenario: Arc<Scenario>, feedback: Feedback },
  Profile,
}

impl View {
  pub fn name(&self) -> &'static str {
    match self {
      View::Dashboard => "dashboard",
      View::RoleDetail { .. } => "roleDetail",
      View::Briefing { .. } => "briefing",
      View::Simulation { .. } => "simulation",
      View::Debrief { .. } => "debrief",
      View::Profile => "profile",
    }
  }

  pub fn role(&self) -> Option<&Arc<Role>> {
    match self {
      View::RoleDetail { role }
      | View::Briefing { role, .. }
      | View::Simulation { role, .. }
      | View::Debrief { role, .. } => Some(role),
      View::Dashboard | View::Profile => None,
    }
  }
}

/// Identifies one outstanding generation call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ticket(u64);

/// Loading and error share one slot, so they can never be set together.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Status {
  Ready,
  Loading { message: &'static str, ticket: Ticket },
  Failed { message: &'static str },
}

/// Header navigation targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NavTarget {
  Dashboard,
  Profile,
}

/// A generation request handed out by `begin_*`; run it, then feed the
/// `Completion` back to the controller that issued it.
#[derive(Clone, Debug)]
pub enum PendingCall {
  Scenario { ticket: Ticket, role: Arc<Role>, prompt: String },
  Feedback { ticket: Ticket, role: Arc<Role>, scenario: Arc<Scenario>, submission: String },
}

#[derive(Debug)]
pub enum Completion {
  Scenario { ticket: Ticket, result: Result<Scenario, GenerationError> },
  Feedback { ticket: Ticket, result: Result<Feedback, GenerationError> },
}

impl PendingCall {
  pub fn ticket(&self) -> Ticket {
    match self {
      PendingCall::Scenario { ticket, .. } | PendingCall::Feedback { ticket, .. } => *ticket,
    }
  }

  pub async fn run(self, client: &GenerationClient) -> Completion {
    match self {
      PendingCall::Scenario { ticket, role, prompt } => Completion::Scenario {
        ticket,
        result: client.generate_scenario(&role, &prompt).await,
      },
      PendingCall::Feedback { ticket, role, scenario, submission } => Completion::Feedback {
        ticket,
        result: client.generate_feedback(&role, &scenario, &submission).await,
      },
    }
  }
}

/// One skill assessment from history, tagged with the role it was earned in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SkillRecord {
  pub role: String,
  pub skill: String,
  pub rating: u8,
  pub feedback: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
  pub completed_challenges: usize,
  pub skill_log: Vec<SkillRecord>,
}

/// Read-only view of a session for the presentation layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
  pub authenticated: bool,
  pub view: View,
  pub loading: Option<String>,
  pub error: Option<String>,
  pub challenge_history: Vec<ChallengeHistoryItem>,
  pub saved_resources: SavedResources,
  pub profile: ProfileSummary,
}

pub struct SessionController {
  catalog: Arc<Catalog>,
  authenticated: bool,
  view: View,
  status: Status,
  history: Vec<ChallengeHistoryItem>,
  saved: SavedResources,
  next_ticket: u64,
}

impl SessionController {
  pub fn new(catalog: Arc<Catalog>) -> Self {
    Self {
      catalog,
      authenticated: false,
      view: View::Dashboard,
      status: Status::Ready,
      history: Vec::new(),
      saved: SavedResources::default(),
      next_ticket: 0,
    }
  }

  pub fn is_authenticated(&self) -> bool { self.authenticated }
  pub fn view(&self) -> &View { &self.view }
  pub fn status(&self) -> &Status { &self.status }
  pub fn history(&self) -> &[ChallengeHistoryItem] { &self.history }
  pub fn saved_resources(&self) -> &SavedResources { &self.saved }
  pub fn is_loading(&self) -> bool { matches!(self.status, Status::Loading { .. }) }

  pub fn error(&self) -> Option<&'static str> {
    match self.status {
      Status::Failed { message } => Some(message),
      _ => None,
    }
  }

  /// Authenticated and not waiting on a generation call.
  fn idle(&self, op: &'static str) -> bool {
    if !self.authenticated {
      debug!(target: "session", op, "Ignored: not authenticated");
      return false;
    }
    if self.is_loading() {
      debug!(target: "session", op, "Ignored: generation in flight");
      return false;
    }
    true
  }

  fn ignored(&self, op: &'static str) {
    debug!(target: "session", op, view = self.view.name(), "Ignored: not valid in current view");
  }

  fn issue_ticket(&mut self) -> Ticket {
    self.next_ticket += 1;
    Ticket(self.next_ticket)
  }

  pub fn login(&mut self) {
    if self.authenticated {
      return;
    }
    self.authenticated = true;
    self.view = View::Dashboard;
    self.status = Status::Ready;
    info!(target: "session", "Logged in");
  }

  /// Full reset. The ticket counter survives so any call still in flight can never match.
  pub fn logout(&mut self) {
    let next_ticket = self.next_ticket;
    let catalog = self.catalog.clone();
    *self = Self { next_ticket, ..Self::new(catalog) };
    info!(target: "session", "Logged out; session state cleared");
  }

  #[instrument(level = "debug", target = "session", skip(self))]
  pub fn select_role(&mut self, role_id: &str) {
    if !self.idle("select_role") {
      return;
    }
    if !matches!(self.view, View::Dashboard) {
      return self.ignored("select_role");
    }
    match self.catalog.get(role_id) {
      Some(role) => {
        info!(target: "session", role = %role.id, "Role selected");
        self.status = Status::Ready;
        self.view = View::RoleDetail { role };
      }
      None => warn!(target: "session", %role_id, "Unknown role id"),
    }
  }

  /// RoleDetail → loading. Returns the scenario request to run, or None if
  /// the call must not happen (wrong view, blank prompt, already loading).
  #[instrument(level = "debug", target = "session", skip(self, prompt), fields(prompt_len = prompt.len()))]
  pub fn begin_challenge(&mut self, prompt: &str) -> Option<PendingCall> {
    if !self.idle("start_challenge") {
      return None;
    }
    let View::RoleDetail { role } = &self.view else {
      self.ignored("start_challenge");
      return None;
    };
    if prompt.trim().is_empty() {
      debug!(target: "session", "Ignored: blank challenge prompt");
      return None;
    }
    let role = role.clone();
    let ticket = self.issue_ticket();
    self.status = Status::Loading { message: LOADING_SCENARIO, ticket };
    info!(target: "session", role = %role.id, ticket = ticket.0, "Scenario generation started");
    Some(PendingCall::Scenario { ticket, role, prompt: prompt.to_string() })
  }

  pub fn begin_simulation(&mut self) {
    if !self.idle("begin_simulation") {
      return;
    }
    match &self.view {
      View::Briefing { role, scenario } => {
        self.view = View::Simulation { role: role.clone(), scenario: scenario.clone() };
        self.status = Status::Ready;
      }
      _ => self.ignored("begin_simulation"),
    }
  }

  /// Briefing → RoleDetail.
  pub fn back(&mut self) {
    if !self.idle("back") {
      return;
    }
    match &self.view {
      View::Briefing { role, .. } => {
        self.view = View::RoleDetail { role: role.clone() };
        self.status = Status::Ready;
      }
      _ => self.ignored("back"),
    }
  }

  /// Simulation → loading. A blank submission never reaches the generation client.
  #[instrument(level = "debug", target = "session", skip(self, text), fields(text_len = text.len()))]
  pub fn begin_submission(&mut self, text: &str) -> Option<PendingCall> {
    if !self.idle("submit_simulation") {
      return None;
    }
    let View::Simulation { role, scenario } = &self.view else {
      self.ignored("submit_simulation");
      return None;
    };
    if text.trim().is_empty() {
      debug!(target: "session", "Ignored: blank submission");
      return None;
    }
    let (role, scenario) = (role.clone(), scenario.clone());
    let ticket = self.issue_ticket();
    self.status = Status::Loading { message: LOADING_FEEDBACK, ticket };
    info!(target: "session", role = %role.id, ticket = ticket.0, "Feedback generation started");
    Some(PendingCall::Feedback { ticket, role, scenario, submission: text.to_string() })
  }

  /// Apply a finished generation call. Returns false if it was stale and discarded.
  pub fn complete(&mut self, done: Completion) -> bool {
    let ticket = match &done {
      Completion::Scenario { ticket, .. } | Completion::Feedback { ticket, .. } => *ticket,
    };
    if !matches!(self.status, Status::Loading { ticket: current, .. } if current == ticket) {
      debug!(target: "session", ticket = ticket.0, "Discarding stale generation result");
      return false;
    }

    let view = std::mem::replace(&mut self.view, View::Dashboard);
    let (view, applied) = match (done, view) {
      (Completion::Scenario { result, .. }, View::RoleDetail { role }) => match result {
        Ok(scenario) => {
          info!(target: "session", role = %role.id, company = %scenario.company_name, "Briefing ready");
          self.status = Status::Ready;
          (View::Briefing { role, scenario: Arc::new(scenario) }, true)
        }
        Err(e) => {
          error!(target: "session", role = %role.id, error = %e, "Scenario generation failed");
          self.status = Status::Failed { message: SCENARIO_FAILED };
          (View::RoleDetail { role }, true)
        }
      },
      (Completion::Feedback { result, .. }, View::Simulation { role, scenario }) => match result {
        Ok(feedback) => {
          self.history.push(ChallengeHistoryItem { role: role.clone(), feedback: feedback.clone() });
          info!(target: "session", role = %role.id, history_len = self.history.len(), "Debrief ready");
          self.status = Status::Ready;
          (View::Debrief { role, scenario, feedback }, true)
        }
        Err(e) => {
          error!(target: "session", role = %role.id, error = %e, "Feedback generation failed");
          self.status = Status::Failed { message: FEEDBACK_FAILED };
          (View::Simulation { role, scenario }, true)
        }
      },
      // Loading gates every view change except the ones that abandon the ticket.
      (_, view) => {
        warn!(target: "session", view = view.name(), "Generation result does not fit current view; discarded");
        self.status = Status::Ready;
        (view, false)
      }
    };
    self.view = view;
    applied
  }

  /// Run a challenge start end to end. For owners that can hold `&mut self` across the await.
  pub async fn start_challenge(&mut self, client: &GenerationClient, prompt: &str) -> bool {
    let Some(call) = self.begin_challenge(prompt) else { return false };
    let done = call.run(client).await;
    self.complete(done)
  }

  pub async fn submit_simulation(&mut self, client: &GenerationClient, text: &str) -> bool {
    let Some(call) = self.begin_submission(text) else { return false };
    let done = call.run(client).await;
    self.complete(done)
  }

  /// Debrief → RoleDetail for the same role.
  pub fn retry(&mut self) {
    if !self.idle("retry") {
      return;
    }
    match &self.view {
      View::Debrief { role, .. } => {
        self.view = View::RoleDetail { role: role.clone() };
        self.status = Status::Ready;
      }
      _ => self.ignored("retry"),
    }
  }

  /// Toggle a resource's URL in the saved set (Debrief only).
  pub fn save_resource(&mut self, resource: LearningResource) {
    if !self.idle("save_resource") {
      return;
    }
    if !matches!(self.view, View::Debrief { .. }) {
      return self.ignored("save_resource");
    }
    let url = resource.url.clone();
    let saved = self.saved.toggle(resource);
    debug!(target: "session", %url, saved, total = self.saved.len(), "Saved resources toggled");
  }

  /// Header navigation. Clears the error and abandons any call in flight.
  pub fn navigate(&mut self, target: NavTarget) {
    if !self.authenticated {
      return;
    }
    self.abandon("navigate");
    self.view = match target {
      NavTarget::Dashboard => View::Dashboard,
      NavTarget::Profile => View::Profile,
    };
  }

  /// The error screen's "Back to Dashboard": drops role, scenario, feedback and error.
  /// History and saved resources are kept.
  pub fn reset_to_dashboard(&mut self) {
    if !self.authenticated {
      return;
    }
    self.abandon("reset_to_dashboard");
    self.view = View::Dashboard;
  }

  /// Clear a visible error and stay on the restored view (RoleDetail or Simulation).
  pub fn dismiss_error(&mut self) {
    if matches!(self.status, Status::Failed { .. }) {
      self.status = Status::Ready;
    }
  }

  fn abandon(&mut self, op: &'static str) {
    if let Status::Loading { ticket, .. } = self.status {
      info!(target: "session", op, ticket = ticket.0, "Abandoning in-flight generation");
    }
    self.status = Status::Ready;
  }

  pub fn profile(&self) -> ProfileSummary {
    let skill_log = self
      .history
      .iter()
      .flat_map(|item| {
        item.feedback.skill_breakdown.iter().map(|s| SkillRecord {
          role: item.role.title.clone(),
          skill: s.skill.clone(),
          rating: s.rating,
          feedback: s.feedback.clone(),
        })
      })
      .collect();
    ProfileSummary { completed_challenges: self.history.len(), skill_log }
  }

  pub fn snapshot(&self) -> SessionSnapshot {
    let (loading, error) = match &self.status {
      Status::Ready => (None, None),
      Status::Loading { message, .. } => (Some(message.to_string()), None),
      Status::Failed { message } => (None, Some(message.to_string())),
    };
    SessionSnapshot {
      authenticated: self.authenticated,
      view: self.view.clone(),
      loading,
      error,
      challenge_history: self.history.clone(),
      saved_resources: self.saved.clone(),
      profile: self.profile(),
    }
  }
}
