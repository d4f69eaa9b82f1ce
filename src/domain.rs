//! Domain models: catalog roles, generated scenarios and feedback, and the
//! records a session accumulates (history entries, saved resources).

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Kind of a learning resource. Only these two values are accepted from the model.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
  Article,
  Video,
}

/// A link to learning material. Two resources are the same iff their URLs match.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LearningResource {
  pub title: String,
  pub url: String,
  #[serde(rename = "type")]
  pub kind: ResourceKind,
}

impl PartialEq for LearningResource {
  fn eq(&self, other: &Self) -> bool { self.url == other.url }
}
impl Eq for LearningResource {}

/// A named prompt that seeds scenario generation for a role.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Challenge {
  pub title: String,
  pub prompt: String,
}

/// A simulated career track. Loaded once at startup and never mutated.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Role {
  pub id: String,
  pub title: String,
  pub description: String,
  pub long_description: String,
  #[serde(default)] pub skills: Vec<String>,
  #[serde(default)] pub resources: Vec<LearningResource>,
  #[serde(default)] pub challenges: Vec<Challenge>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MockEmail {
  pub from: String,
  pub subject: String,
  pub body: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MockAsset {
  pub name: String,
  pub content: String,
}

/// AI-generated project brief for one challenge attempt.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
  pub company_name: String,
  pub scenario: String,
  pub task: String,
  pub deliverables: Vec<String>,
  pub mock_email: MockEmail,
  pub mock_assets: Vec<MockAsset>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkillAssessment {
  pub skill: String,
  /// 1..=5 inclusive.
  pub rating: u8,
  pub feedback: String,
}

/// AI-generated assessment of a submission.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
  pub performance_review: String,
  pub skill_breakdown: Vec<SkillAssessment>,
  pub learning_kit: Vec<LearningResource>,
}

/// One completed challenge. Appended once per successful feedback, never mutated.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ChallengeHistoryItem {
  pub role: Arc<Role>,
  pub feedback: Feedback,
}

/// Saved learning resources keyed by URL, insertion-ordered.
#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct SavedResources(Vec<LearningResource>);

impl SavedResources {
  /// Flip membership of `resource` by URL. Returns true if it is now saved.
  pub fn toggle(&mut self, resource: LearningResource) -> bool {
    if let Some(pos) = self.0.iter().position(|r| r.url == resource.url) {
      self.0.remove(pos);
      false
    } else {
      self.0.push(resource);
      true
    }
  }

  pub fn contains(&self, url: &str) -> bool {
    self.0.iter().any(|r| r.url == url)
  }

  pub fn len(&self) -> usize { self.0.len() }
}
