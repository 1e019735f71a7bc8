//! Prompt synthesis from grounding content and the user's query.

use std::fmt;

use sitechat_shared::{ContentBundle, PersonaConfig};

/// Fixed opening line of every grounded prompt.
const PREAMBLE: &str = "Here is some content from our website (structured in JSON format):";

/// A finished prompt. Opaque once built; engines accept only the string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt(String);

impl Prompt {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for Prompt {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Renders a [`ContentBundle`] and query into an instruction-style prompt.
#[derive(Debug, Clone)]
pub struct PromptComposer {
    role: String,
    organization: String,
}

impl PromptComposer {
    pub fn new(role: impl Into<String>, organization: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            organization: organization.into(),
        }
    }

    /// Compose the prompt. Total; length is not bounded here.
    pub fn build(&self, query: &str, bundle: &ContentBundle) -> Prompt {
        Prompt(format!(
            "{PREAMBLE}\n{content}\n\nUser query: {query}\n\n\
             Please respond as {role} for {organization}, based on the above content.",
            content = bundle.to_json(),
            role = self.role,
            organization = self.organization,
        ))
    }
}

impl From<&PersonaConfig> for PromptComposer {
    fn from(persona: &PersonaConfig) -> Self {
        Self::new(&persona.role, &persona.organization)
    }
}
