//! Loading agent configuration (prompts + optional role catalog) from TOML.
//!
//! See `AgentConfig` and `Prompts` for expected schema.

use serde::Deserialize;
use tracing::{info, error};

use crate::domain::Role;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AgentConfig {
  #[serde(default)]
  pub prompts: Prompts,
  /// Replaces built-in roles with the same id; other entries are appended.
  #[serde(default)]
  pub roles: Vec<Role>,
}

/// Prompts used by the generation client. Templates take `{key}` placeholders:
/// scenario: `{role_title}`, `{challenge_prompt}`;
/// feedback: `{role_title}`, `{company_name}`, `{scenario}`, `{task}`, `{submission}`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub scenario_system: String,
  pub scenario_user_template: String,
  pub feedback_system: String,
  pub feedback_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      scenario_system: "You write project briefs for a career simulation. Respond ONLY with JSON matching the given schema.".into(),
      scenario_user_template: "Generate a realistic, entry-level project brief for a {role_title} in a career simulation. The scenario should be based on this specific challenge: \"{challenge_prompt}\". The scenario should be concise but detailed enough for a user to act on. Include a mock company name, a core scenario, a specific task, expected deliverables, a mock email with a sender, subject, and a detailed body explaining the task, and 2-3 mock project assets. Each asset must have a 'name' (like a filename) and detailed 'content' (like user personas, design specifications, or brand guidelines).".into(),
      feedback_system: "You review work submitted in a career simulation. Respond ONLY with JSON matching the given schema.".into(),
      feedback_user_template: "You are an expert {role_title} manager providing feedback in a career simulation.\n\nThe user was given this scenario:\n- Company: {company_name}\n- Situation: {scenario}\n- Task: {task}\n\nTheir submission is:\n---\n{submission}\n---\n\nAssess their work based on industry standards for a junior professional. Provide a detailed but encouraging performance review, a breakdown of 3-4 key skills demonstrated (and areas for improvement) with a 1-5 star rating, and a curated 'Free Learning Kit' of 3 high-quality online resources (articles or videos) to help them improve.".into(),
    }
  }
}

/// Attempt to load `AgentConfig` from AGENT_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_agent_config_from_env() -> Option<AgentConfig> {
  let path = std::env::var("AGENT_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_agent_config(&s) {
      Ok(cfg) => {
        info!(target: "careersim_backend", %path, roles = cfg.roles.len(), "Loaded agent config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "careersim_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "careersim_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

pub fn parse_agent_config(s: &str) -> Result<AgentConfig, toml::de::Error> {
  toml::from_str::<AgentConfig>(s)
}
