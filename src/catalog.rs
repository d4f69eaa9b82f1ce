//! Content catalog: the built-in role definitions, plus optional overrides
//! from the TOML agent config. Read-only once the process has started.

use std::sync::Arc;

use tracing::info;

use crate::domain::{Challenge, LearningResource, ResourceKind, Role};

#[derive(Clone, Debug)]
pub struct Catalog {
  roles: Vec<Arc<Role>>,
}

impl Catalog {
  pub fn new(roles: Vec<Role>) -> Self {
    Self { roles: roles.into_iter().map(Arc::new).collect() }
  }

  /// Built-in roles with `overrides` applied: same id replaces in place,
  /// new ids are appended in the order given.
  pub fn builtin_with(overrides: Vec<Role>) -> Self {
    let mut roles = builtin_roles();
    for role in overrides {
      match roles.iter_mut().find(|r| r.id == role.id) {
        Some(slot) => {
          info!(target: "careersim_backend", id = %role.id, "Catalog role replaced from config");
          *slot = role;
        }
        None => {
          info!(target: "careersim_backend", id = %role.id, "Catalog role added from config");
          roles.push(role);
        }
      }
    }
    Self::new(roles)
  }

  pub fn get(&self, id: &str) -> Option<Arc<Role>> {
    self.roles.iter().find(|r| r.id == id).cloned()
  }

  pub fn roles(&self) -> &[Arc<Role>] { &self.roles }
}

impl Default for Catalog {
  fn default() -> Self { Self::new(builtin_roles()) }
}

fn article(title: &str, url: &str) -> LearningResource {
  LearningResource { title: title.into(), url: url.into(), kind: ResourceKind::Article }
}

fn video(title: &str, url: &str) -> LearningResource {
  LearningResource { title: title.into(), url: url.into(), kind: ResourceKind::Video }
}

fn challenge(title: &str, prompt: &str) -> Challenge {
  Challenge { title: title.into(), prompt: prompt.into() }
}

fn skills(names: &[&str]) -> Vec<String> {
  names.iter().map(|s| s.to_string()).collect()
}

/// The six built-in career tracks, in display order.
pub fn builtin_roles() -> Vec<Role> {
  vec![
    Role {
      id: "ux-designer".into(),
      title: "UX Designer".into(),
      description: "Shape user experiences by designing intuitive, accessible, and delightful digital products.".into(),
      long_description: "As a UX Designer, you are the advocate for the user. You'll use research and empathy to understand user needs, then create wireframes, prototypes, and high-fidelity mockups to design solutions that are not only beautiful but also easy and enjoyable to use. You bridge the gap between user needs and business goals.".into(),
      skills: skills(&["User Research", "Wireframing", "Prototyping", "Usability Testing", "Figma/Sketch", "Information Architecture"]),
      resources: vec![
        article("Nielsen Norman Group Articles", "https://www.nngroup.com/articles/"),
        video("Figma Learn", "https://www.figma.com/learn/"),
        article("Laws of UX", "https://lawsofux.com/"),
      ],
      challenges: vec![
        challenge("New Feature Onboarding", "Design a user-friendly onboarding flow for a new \"Advanced Analytics\" feature in a project management app."),
        challenge("E-commerce Checkout Redesign", "Redesign the checkout process for a mobile e-commerce site to reduce cart abandonment."),
        challenge("Accessibility Audit", "Conduct an accessibility audit for a popular news website and propose three key improvements."),
        challenge("Mobile App Wireframe", "Create low-fidelity wireframes for a new language-learning mobile application."),
        challenge("User Research Plan", "Develop a user research plan to investigate why users are not using the \"collaboration\" feature of a productivity tool."),
      ],
    },
    Role {
      id: "frontend-developer".into(),
      title: "Frontend Developer".into(),
      description: "Build and implement the user-facing side of web applications using modern frameworks.".into(),
      long_description: "As a Frontend Developer, you bring designs to life. You write clean, efficient, and maintainable code using HTML, CSS, and JavaScript to create interactive and responsive user interfaces. You work closely with designers and backend developers to build seamless web experiences.".into(),
      skills: skills(&["HTML & CSS", "JavaScript", "React/Vue/Angular", "Responsive Design", "API Integration", "Version Control (Git)"]),
      resources: vec![
        article("MDN Web Docs", "https://developer.mozilla.org/en-US/"),
        article("freeCodeCamp", "https://www.freecodecamp.org/learn/javascript-algorithms-and-data-structures/"),
        article("React Official Tutorial", "https://react.dev/learn"),
      ],
      challenges: vec![
        challenge("Build an Interactive Component", "Build a reusable \"Star Rating\" component in React that allows users to select a rating and outputs the value."),
        challenge("Fix a Performance Bottleneck", "A web page is loading slowly due to large images. Optimize the image loading strategy to improve performance."),
        challenge("Implement a Responsive Layout", "Implement a complex, responsive pricing page layout based on a provided design mockup."),
        challenge("Connect to an API", "Fetch user data from a public API and display it in a clean, user-friendly list format."),
        challenge("Refactor Legacy Code", "Refactor a class-based React component to use modern functional components and Hooks for better readability."),
      ],
    },
    Role {
      id: "product-manager".into(),
      title: "Product Manager".into(),
      description: "Define product vision, strategy, and roadmap. Bridge users, business, and development.".into(),
      long_description: "As a Product Manager, you are the CEO of the product. You are responsible for defining the \"what\" and \"why\" of what gets built. You'll conduct market research, define features, prioritize backlogs, and work with cross-functional teams to guide products from conception to launch.".into(),
      skills: skills(&["Product Strategy", "Roadmapping", "User Story Writing", "Prioritization", "Data Analysis", "Stakeholder Management"]),
      resources: vec![
        article("Mind the Product", "https://www.mindtheproduct.com/"),
        article("Lenny's Newsletter", "https://www.lennysnewsletter.com/"),
        video("Product School Videos", "https://www.youtube.com/c/ProductSchool"),
      ],
      challenges: vec![
        challenge("Prioritize a Feature Backlog", "Given a backlog of 10 feature requests for a SaaS product, prioritize them for the next quarter and justify your decisions."),
        challenge("Write a PRD", "Write a Product Requirements Document (PRD) for a new \"team chat\" feature within an existing project management tool."),
        challenge("Define Success Metrics", "Define the key success metrics (KPIs) for the launch of a new online marketplace."),
        challenge("Conduct a Competitive Analysis", "Perform a competitive analysis of three major players in the food delivery market and identify a key opportunity."),
        challenge("Develop a Product Roadmap", "Create a high-level, 6-month product roadmap for a new fitness tracking application."),
      ],
    },
    Role {
      id: "backend-developer".into(),
      title: "Backend Developer".into(),
      description: "Power the server-side of applications, working with databases, APIs, and application logic.".into(),
      long_description: "As a Backend Developer, you are the architect of the server-side. You build and maintain the core logic, databases, and APIs that power an application. Your work ensures data is processed, stored, and delivered efficiently and securely, making the frontend experience possible.".into(),
      skills: skills(&["Node.js/Python/Java", "REST APIs", "SQL/NoSQL Databases", "Authentication", "System Architecture", "Testing"]),
      resources: vec![
        article("Node.js Official Guides", "https://nodejs.org/en/docs/guides/"),
        article("The Flask Mega-Tutorial", "https://blog.miguelgrinberg.com/post/the-flask-mega-tutorial-part-i-hello-world"),
        article("PostgreSQL Tutorial", "https://www.postgresqltutorial.com/"),
      ],
      challenges: vec![
        challenge("Design a REST API Endpoint", "Design the API endpoints (GET, POST, PUT, DELETE) for managing \"user profiles\" in a social media application."),
        challenge("Write a Database Schema", "Create a SQL database schema for a simple blog application with users, posts, and comments."),
        challenge("Implement User Authentication", "Outline the steps and logic for implementing a secure JWT-based authentication system for a web app."),
        challenge("Troubleshoot a Slow Query", "A database query to fetch user activity is running slow. Analyze the query and propose a solution, like adding an index."),
        challenge("Build a Simple Microservice", "Conceptually design a microservice that handles email notifications for an e-commerce platform."),
      ],
    },
    Role {
      id: "data-scientist".into(),
      title: "Data Scientist".into(),
      description: "Uncover insights from complex data using analysis, machine learning, and visualization.".into(),
      long_description: "As a Data Scientist, you turn raw data into meaningful insights. You use statistical methods, machine learning algorithms, and data visualization techniques to solve complex problems and drive business strategy. Your work helps organizations make smarter, data-driven decisions.".into(),
      skills: skills(&["Python (Pandas, NumPy)", "SQL", "Machine Learning", "Statistical Analysis", "Data Visualization", "Problem Solving"]),
      resources: vec![
        article("Kaggle Courses", "https://www.kaggle.com/learn"),
        article("Towards Data Science", "https://towardsdatascience.com/"),
        video("StatQuest with Josh Starmer", "https://www.youtube.com/c/statquest"),
      ],
      challenges: vec![
        challenge("Analyze Customer Churn", "Given a dataset of customer data, propose an approach to analyze and predict customer churn."),
        challenge("Design a Product Recommendation System", "Outline the design for a machine learning model that provides personalized product recommendations on an e-commerce site."),
        challenge("Clean and Explore a Dataset", "You are given a messy dataset of sales data. Describe the steps you would take to clean, explore, and find initial insights."),
        challenge("Interpret a Model's Results", "A classification model has an accuracy of 95%. Explain why this might be a misleading metric and what other metrics you would use."),
        challenge("A/B Test Analysis", "Design an A/B test to determine if changing a button color on a website increases user sign-ups, and how you would analyze the results."),
      ],
    },
    Role {
      id: "cybersecurity-analyst".into(),
      title: "Cybersecurity Analyst".into(),
      description: "Protect digital assets by monitoring networks, identifying vulnerabilities, and responding to threats.".into(),
      long_description: "As a Cybersecurity Analyst, you are the first line of defense against digital threats. You monitor networks for suspicious activity, identify and patch vulnerabilities, investigate security breaches, and implement policies to protect an organization's data and infrastructure.".into(),
      skills: skills(&["Network Security", "Vulnerability Assessment", "Incident Response", "SIEM Tools", "Cryptography", "Threat Intelligence"]),
      resources: vec![
        article("OWASP Top Ten", "https://owasp.org/www-project-top-ten/"),
        article("Cybrary", "https://www.cybrary.it/"),
        video("Professor Messer CompTIA Security+", "https://www.professormesser.com/security-plus/sy0-601/sy0-601-video/sy0-601-comptia-security-plus-course/"),
      ],
      challenges: vec![
        challenge("Analyze Suspicious Network Logs", "You are given network logs showing unusual traffic to a specific server. Analyze the logs and determine if it is a potential threat."),
        challenge("Respond to a Phishing Attack", "An employee has reported a suspected phishing email. Outline the steps you would take to investigate and respond to the incident."),
        challenge("Conduct a Vulnerability Scan Review", "A vulnerability scanner has identified a \"critical\" SQL injection vulnerability. Explain the risk and recommend a mitigation strategy."),
        challenge("Develop a Security Policy", "Write a basic \"Acceptable Use Policy\" for employees at a small company to reduce security risks."),
        challenge("Incident Triage", "You receive three security alerts at once: a server is down, an employee lost their laptop, and a malware detection. Prioritize them and explain your reasoning."),
      ],
    },
  ]
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashSet;

  #[test]
  fn builtin_catalog_is_well_formed() {
    let catalog = Catalog::default();
    assert_eq!(catalog.roles().len(), 6);
    let ids: HashSet<_> = catalog.roles().iter().map(|r| r.id.clone()).collect();
    assert_eq!(ids.len(), catalog.roles().len(), "role ids must be unique");
    for role in catalog.roles() {
      assert!(!role.title.trim().is_empty());
      assert!(!role.challenges.is_empty(), "{} has no challenges", role.id);
      assert!(role.challenges.iter().all(|c| !c.prompt.trim().is_empty()));
    }
  }

  #[test]
  fn lookup_by_id() {
    let catalog = Catalog::default();
    let fe = catalog.get("frontend-developer").expect("frontend role");
    assert_eq!(fe.title, "Frontend Developer");
    assert_eq!(fe.challenges[0].title, "Build an Interactive Component");
    assert!(catalog.get("astronaut").is_none());
  }

  #[test]
  fn overrides_replace_in_place_and_append_new_ids() {
    let mut ux = builtin_roles().remove(0);
    ux.title = "Product Designer".into();
    let extra = Role {
      id: "sre".into(),
      title: "Site Reliability Engineer".into(),
      description: "Keep systems up.".into(),
      long_description: String::new(),
      skills: vec![],
      resources: vec![],
      challenges: vec![challenge("Postmortem", "Write a postmortem for a 2h outage.")],
    };

    let catalog = Catalog::builtin_with(vec![extra, ux]);
    assert_eq!(catalog.roles().len(), 7);
    assert_eq!(catalog.roles()[0].title, "Product Designer");
    assert_eq!(catalog.roles()[6].id, "sre");
  }
}
