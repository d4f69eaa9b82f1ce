//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! An action is applied in two steps: `apply` runs the synchronous part of the
//! transition under the session lock and, for generation actions, hands back
//! the pending call; `finish` runs that call with the lock released and then
//! applies the result. WebSocket clients get a snapshot between the two.

use tracing::{debug, info, instrument};

use crate::protocol::ClientAction;
use crate::session::{PendingCall, SessionSnapshot};
use crate::state::{AppState, SessionHandle};

pub enum Step {
  Done(SessionSnapshot),
  /// Loading is asserted in the snapshot; `finish` the call to resolve it.
  Pending(PendingCall, SessionSnapshot),
}

#[instrument(level = "info", skip(session, action), fields(action = action.name()))]
pub async fn apply(session: &SessionHandle, action: ClientAction) -> Step {
  let mut s = session.lock().await;
  let pending = match action {
    ClientAction::Ping => None,
    ClientAction::Login => { s.login(); None }
    ClientAction::Logout => { s.logout(); None }
    ClientAction::SelectRole { role_id } => { s.select_role(&role_id); None }
    ClientAction::StartChallenge { prompt } => s.begin_challenge(&prompt),
    ClientAction::BeginSimulation => { s.begin_simulation(); None }
    ClientAction::Back => { s.back(); None }
    ClientAction::SubmitSimulation { text } => s.begin_submission(&text),
    ClientAction::Retry => { s.retry(); None }
    ClientAction::SaveResource { resource } => { s.save_resource(resource); None }
    ClientAction::Navigate { view } => { s.navigate(view); None }
    ClientAction::ResetToDashboard => { s.reset_to_dashboard(); None }
    ClientAction::DismissError => { s.dismiss_error(); None }
  };
  let snapshot = s.snapshot();
  match pending {
    Some(call) => Step::Pending(call, snapshot),
    None => Step::Done(snapshot),
  }
}

/// Run a pending generation call without holding the session, then apply it.
#[instrument(level = "info", skip(state, session, call), fields(ticket = ?call.ticket()))]
pub async fn finish(state: &AppState, session: &SessionHandle, call: PendingCall) -> SessionSnapshot {
  let done = call.run(&state.generator).await;
  let mut s = session.lock().await;
  if s.complete(done) {
    info!(target: "session", view = s.view().name(), error = ?s.error(), "Generation result applied");
  } else {
    debug!(target: "session", "Generation result discarded");
  }
  s.snapshot()
}

/// `apply` then `finish`: the snapshot after the action has fully resolved.
pub async fn dispatch(state: &AppState, session: &SessionHandle, action: ClientAction) -> SessionSnapshot {
  match apply(session, action).await {
    Step::Done(snapshot) => snapshot,
    Step::Pending(call, _) => finish(state, session, call).await,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::catalog::Catalog;
  use crate::generation::testing::{client, scenario_json, ScriptedBackend};
  use crate::session::LOADING_SCENARIO;
  use crate::state::SessionScope;

  fn state_with(backend: std::sync::Arc<ScriptedBackend>) -> AppState {
    AppState::with_parts(Catalog::default(), client(backend))
  }

  #[tokio::test]
  async fn snapshot_is_readable_while_a_call_is_pending() {
    let backend = ScriptedBackend::new(vec![Ok(scenario_json())]);
    let state = state_with(backend);
    let (_, session) = state.create_session(SessionScope::Http).await.unwrap();
    dispatch(&state, &session, ClientAction::Login).await;
    dispatch(&state, &session, ClientAction::SelectRole { role_id: "frontend-developer".into() }).await;

    let Step::Pending(call, interim) = apply(&session, ClientAction::StartChallenge { prompt: "Build a star rating".into() }).await
    else { panic!("expected a pending call") };
    assert_eq!(interim.loading.as_deref(), Some(LOADING_SCENARIO));
    assert_eq!(session.lock().await.snapshot().loading.as_deref(), Some(LOADING_SCENARIO));

    let done = finish(&state, &session, call).await;
    assert!(done.loading.is_none());
    assert_eq!(done.view.name(), "briefing");
  }

  #[tokio::test]
  async fn removed_session_discards_the_late_reply() {
    let backend = ScriptedBackend::new(vec![Ok(scenario_json())]);
    let state = state_with(backend);
    let (id, session) = state.create_session(SessionScope::Http).await.unwrap();
    dispatch(&state, &session, ClientAction::Login).await;
    dispatch(&state, &session, ClientAction::SelectRole { role_id: "frontend-developer".into() }).await;

    let Step::Pending(call, _) = apply(&session, ClientAction::StartChallenge { prompt: "p".into() }).await
    else { panic!("expected a pending call") };
    assert!(state.remove_session(&id).await);

    let after = finish(&state, &session, call).await;
    assert!(!after.authenticated);
    assert_eq!(after.view.name(), "dashboard");
    assert!(state.get_session(&id).await.is_none());
  }
}
