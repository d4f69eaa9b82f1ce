//! Generation client: turns domain requests into schema-constrained calls
//! against a generation backend and turns the replies back into validated
//! `Scenario` / `Feedback` values.
//!
//! Every failure (transport, empty output, unparseable JSON, schema drift,
//! content contract) is a `GenerationError`; nothing is defaulted or coerced.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{error, info, instrument};

use crate::config::Prompts;
use crate::domain::{Feedback, Role, Scenario};
use crate::error::GenerationError;
use crate::openai::OpenAI;
use crate::schema::{feedback_schema, scenario_schema, CompiledSchema, SchemaError};
use crate::util::{fill_template, strip_code_fence};

/// Accepted number of mock assets in a scenario.
pub const MOCK_ASSETS: std::ops::RangeInclusive<usize> = 2..=3;
/// Accepted number of skill entries in feedback.
pub const SKILL_ENTRIES: std::ops::RangeInclusive<usize> = 3..=4;
/// Accepted skill rating.
pub const RATING: std::ops::RangeInclusive<u8> = 1..=5;

/// One structured-generation call: instruction plus required output schema.
#[derive(Debug, Clone)]
pub struct StructuredRequest<'a> {
  pub model: &'a str,
  pub system: &'a str,
  pub instruction: &'a str,
  pub schema: &'a CompiledSchema,
}

/// Anything that, given an instruction and an output schema, returns the raw
/// text of a conforming reply or fails.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
  async fn generate(&self, req: &StructuredRequest<'_>) -> Result<String, GenerationError>;

  fn name(&self) -> &'static str;
}

/// Stand-in used when no API key is configured. Every call fails.
pub struct DisabledBackend;

#[async_trait]
impl GenerationBackend for DisabledBackend {
  async fn generate(&self, _req: &StructuredRequest<'_>) -> Result<String, GenerationError> {
    Err(GenerationError::Disabled)
  }

  fn name(&self) -> &'static str { "disabled" }
}

#[derive(Clone)]
pub struct GenerationClient {
  backend: Arc<dyn GenerationBackend>,
  prompts: Prompts,
  /// Used for scenarios.
  pub fast_model: String,
  /// Used for feedback.
  pub strong_model: String,
  scenario_schema: CompiledSchema,
  feedback_schema: CompiledSchema,
}

impl GenerationClient {
  pub fn new(
    backend: Arc<dyn GenerationBackend>,
    prompts: Prompts,
    fast_model: impl Into<String>,
    strong_model: impl Into<String>,
  ) -> Result<Self, SchemaError> {
    Ok(Self {
      backend,
      prompts,
      fast_model: fast_model.into(),
      strong_model: strong_model.into(),
      scenario_schema: CompiledSchema::compile(&scenario_schema())?,
      feedback_schema: CompiledSchema::compile(&feedback_schema())?,
    })
  }

  /// OpenAI-backed client if OPENAI_API_KEY is set, otherwise a disabled one.
  pub fn from_env(prompts: Prompts) -> Result<Self, SchemaError> {
    match OpenAI::from_env() {
      Some(oa) => {
        info!(target: "careersim_backend", base_url = %oa.base_url, fast_model = %oa.fast_model, strong_model = %oa.strong_model, "OpenAI enabled.");
        let (fast, strong) = (oa.fast_model.clone(), oa.strong_model.clone());
        Self::new(Arc::new(oa), prompts, fast, strong)
      }
      None => {
        info!(target: "careersim_backend", "OpenAI disabled (no OPENAI_API_KEY). Generation calls will fail.");
        Self::new(Arc::new(DisabledBackend), prompts, "disabled", "disabled")
      }
    }
  }

  pub fn backend_name(&self) -> &'static str { self.backend.name() }

  pub fn scenario_instruction(&self, role: &Role, challenge_prompt: &str) -> String {
    fill_template(
      &self.prompts.scenario_user_template,
      &[("role_title", &role.title), ("challenge_prompt", challenge_prompt)],
    )
  }

  pub fn feedback_instruction(&self, role: &Role, scenario: &Scenario, submission: &str) -> String {
    fill_template(
      &self.prompts.feedback_user_template,
      &[
        ("role_title", &role.title),
        ("company_name", &scenario.company_name),
        ("scenario", &scenario.scenario),
        ("task", &scenario.task),
        ("submission", submission),
      ],
    )
  }

  /// Generate a project brief for `role` seeded by `challenge_prompt`.
  #[instrument(level = "info", target = "generation", skip(self, role, challenge_prompt),
               fields(role = %role.id, prompt_len = challenge_prompt.len(), model = %self.fast_model))]
  pub async fn generate_scenario(&self, role: &Role, challenge_prompt: &str) -> Result<Scenario, GenerationError> {
    let instruction = self.scenario_instruction(role, challenge_prompt);
    let req = StructuredRequest {
      model: &self.fast_model,
      system: &self.prompts.scenario_system,
      instruction: &instruction,
      schema: &self.scenario_schema,
    };
    let scenario: Scenario = self.call(&req).await?;
    check_scenario(&scenario).inspect_err(|e| {
      error!(target: "generation", error = %e, "Scenario rejected by content contract");
    })?;

    info!(
      target: "generation",
      company = %scenario.company_name,
      deliverables = scenario.deliverables.len(),
      assets = scenario.mock_assets.len(),
      "Scenario generated"
    );
    Ok(scenario)
  }

  /// Assess `submission` against `scenario`.
  #[instrument(level = "info", target = "generation", skip(self, role, scenario, submission),
               fields(role = %role.id, submission_len = submission.len(), model = %self.strong_model))]
  pub async fn generate_feedback(
    &self,
    role: &Role,
    scenario: &Scenario,
    submission: &str,
  ) -> Result<Feedback, GenerationError> {
    let instruction = self.feedback_instruction(role, scenario, submission);
    let req = StructuredRequest {
      model: &self.strong_model,
      system: &self.prompts.feedback_system,
      instruction: &instruction,
      schema: &self.feedback_schema,
    };
    let feedback: Feedback = self.call(&req).await?;
    check_feedback(&feedback).inspect_err(|e| {
      error!(target: "generation", error = %e, "Feedback rejected by content contract");
    })?;

    info!(
      target: "generation",
      skills = feedback.skill_breakdown.len(),
      resources = feedback.learning_kit.len(),
      "Feedback generated"
    );
    Ok(feedback)
  }

  async fn call<T: DeserializeOwned>(&self, req: &StructuredRequest<'_>) -> Result<T, GenerationError> {
    let start = Instant::now();
    let result = self.backend.generate(req).await;
    let elapsed = start.elapsed();
    match result {
      Ok(text) => {
        info!(target: "generation", ?elapsed, schema = %req.schema.wire_name, bytes = text.len(), "Model response received");
        decode(&text, req.schema).inspect_err(|e| {
          error!(target: "generation", schema = %req.schema.wire_name, error = %e, "Model response failed validation");
        })
      }
      Err(e) => {
        error!(target: "generation", ?elapsed, schema = %req.schema.wire_name, error = %e, "Model call failed");
        Err(e)
      }
    }
  }
}

/// Parse raw model text, validate it against `schema`, then deserialize.
pub fn decode<T: DeserializeOwned>(text: &str, schema: &CompiledSchema) -> Result<T, GenerationError> {
  let body = strip_code_fence(text);
  if body.is_empty() {
    return Err(GenerationError::Empty);
  }
  let value: serde_json::Value = serde_json::from_str(body)?;
  schema.validate(&value)?;
  Ok(serde_json::from_value(value)?)
}

fn blank(s: &str) -> bool { s.trim().is_empty() }

/// Content checks the schema cannot express.
pub fn check_scenario(s: &Scenario) -> Result<(), GenerationError> {
  let contract = |msg: &str| Err(GenerationError::Contract(msg.to_string()));
  if blank(&s.company_name) { return contract("companyName is blank"); }
  if blank(&s.scenario) { return contract("scenario is blank"); }
  if blank(&s.task) { return contract("task is blank"); }
  if s.deliverables.is_empty() { return contract("no deliverables"); }
  if blank(&s.mock_email.subject) { return contract("mockEmail.subject is blank"); }
  if !MOCK_ASSETS.contains(&s.mock_assets.len()) {
    return Err(GenerationError::Contract(format!(
      "expected {}-{} mock assets, got {}",
      MOCK_ASSETS.start(), MOCK_ASSETS.end(), s.mock_assets.len()
    )));
  }
  Ok(())
}

pub fn check_feedback(f: &Feedback) -> Result<(), GenerationError> {
  if blank(&f.performance_review) {
    return Err(GenerationError::Contract("performanceReview is blank".into()));
  }
  if !SKILL_ENTRIES.contains(&f.skill_breakdown.len()) {
    return Err(GenerationError::Contract(format!(
      "expected {}-{} skill entries, got {}",
      SKILL_ENTRIES.start(), SKILL_ENTRIES.end(), f.skill_breakdown.len()
    )));
  }
  if let Some(s) = f.skill_breakdown.iter().find(|s| !RATING.contains(&s.rating)) {
    return Err(GenerationError::Contract(format!("rating {} for '{}' outside 1-5", s.rating, s.skill)));
  }
  if f.learning_kit.is_empty() {
    return Err(GenerationError::Contract("empty learning kit".into()));
  }
  if f.learning_kit.iter().any(|r| blank(&r.url)) {
    return Err(GenerationError::Contract("learning resource without url".into()));
  }
  Ok(())
}


#[cfg(test)]
mod tests {
  use super::testing::*;
  use super::*;
  use crate::catalog::Catalog;
  use crate::domain::ResourceKind;

  fn frontend() -> Arc<Role> {
    Catalog::default().get("frontend-developer").expect("frontend role")
  }

  #[tokio::test]
  async fn scenario_for_interactive_component_challenge() {
    let backend = ScriptedBackend::new(vec![Ok(scenario_json())]);
    let client = client(backend.clone());
    let role = frontend();
    let prompt = &role.challenges[0].prompt;

    let s = client.generate_scenario(&role, prompt).await.expect("scenario");
    assert!(!s.mock_email.subject.is_empty());
    assert!(MOCK_ASSETS.contains(&s.mock_assets.len()));

    let call = backend.last_call().expect("one call");
    assert_eq!(call.schema, "scenario");
    assert_eq!(call.model, "fast-test");
    assert!(call.instruction.contains("Frontend Developer"));
    assert!(call.instruction.contains("Star Rating"));
  }

  #[tokio::test]
  async fn feedback_embeds_scenario_and_verbatim_submission() {
    let backend = ScriptedBackend::new(vec![Ok(feedback_json())]);
    let client = client(backend.clone());
    let role = frontend();
    let scenario: Scenario = serde_json::from_str(&scenario_json()).unwrap();
    let submission = "const Star = () => {/* {task} stays literal */}";

    let f = client.generate_feedback(&role, &scenario, submission).await.expect("feedback");
    assert_eq!(f.skill_breakdown.len(), 3);
    assert_eq!(f.learning_kit[2].kind, ResourceKind::Video);

    let call = backend.last_call().expect("one call");
    assert_eq!(call.schema, "feedback");
    assert_eq!(call.model, "strong-test");
    assert!(call.instruction.contains("- Company: Starboard Labs"));
    assert!(call.instruction.contains("- Task: Build a reusable star rating component."));
    assert!(call.instruction.contains(submission));
  }

  #[tokio::test]
  async fn transport_failure_propagates() {
    let backend = ScriptedBackend::new(vec![Err(GenerationError::Api { status: 500, message: "boom".into() })]);
    let err = client(backend).generate_scenario(&frontend(), "x").await.unwrap_err();
    assert_eq!(err, GenerationError::Api { status: 500, message: "boom".into() });
  }

  #[tokio::test]
  async fn disabled_backend_always_fails() {
    let client = GenerationClient::new(Arc::new(DisabledBackend), Prompts::default(), "a", "b").unwrap();
    let err = client.generate_scenario(&frontend(), "x").await.unwrap_err();
    assert_eq!(err, GenerationError::Disabled);
  }

  #[test]
  fn empty_and_unparseable_output() {
    let schema = compiled(scenario_schema());
    assert_eq!(decode::<Scenario>("   ", &schema).unwrap_err(), GenerationError::Empty);
    assert!(matches!(decode::<Scenario>("not json", &schema), Err(GenerationError::Parse(_))));
  }

  #[test]
  fn fenced_output_is_accepted() {
    let fenced = format!("```json\n{}\n```", scenario_json());
    let s: Scenario = decode(&fenced, &compiled(scenario_schema())).expect("fenced scenario");
    assert_eq!(s.company_name, "Starboard Labs");
  }

  #[test]
  fn schema_drift_is_an_error_not_a_default() {
    let mut v: serde_json::Value = serde_json::from_str(&scenario_json()).unwrap();
    v.as_object_mut().unwrap().remove("mockEmail");
    let err = decode::<Scenario>(&v.to_string(), &compiled(scenario_schema())).unwrap_err();
    match err {
      GenerationError::Schema(violation) => assert_eq!(violation.path, "$.mockEmail"),
      other => panic!("expected schema error, got {other:?}"),
    }
  }

  #[test]
  fn negative_rating_fails_to_decode() {
    let mut v: serde_json::Value = serde_json::from_str(&feedback_json()).unwrap();
    v["skillBreakdown"][0]["rating"] = serde_json::json!(-1);
    assert!(matches!(decode::<Feedback>(&v.to_string(), &compiled(feedback_schema())), Err(GenerationError::Parse(_))));
  }

  #[test]
  fn scenario_content_contract() {
    let good: Scenario = serde_json::from_str(&scenario_json()).unwrap();
    assert!(check_scenario(&good).is_ok());

    let mut s = good.clone();
    s.mock_assets.truncate(1);
    assert!(matches!(check_scenario(&s), Err(GenerationError::Contract(_))));

    let mut s = good.clone();
    s.deliverables.clear();
    assert!(check_scenario(&s).is_err());

    let mut s = good;
    s.company_name = "  ".into();
    assert!(check_scenario(&s).is_err());
  }

  #[test]
  fn feedback_content_contract() {
    let good: Feedback = serde_json::from_str(&feedback_json()).unwrap();
    assert!(check_feedback(&good).is_ok());

    let mut f = good.clone();
    f.skill_breakdown[1].rating = 0;
    assert!(matches!(check_feedback(&f), Err(GenerationError::Contract(m)) if m.contains("Accessibility")));

    let mut f = good.clone();
    f.skill_breakdown.truncate(2);
    assert!(check_feedback(&f).is_err());

    let mut f = good;
    f.learning_kit.clear();
    assert!(check_feedback(&f).is_err());
  }
}
