//! Read-only pipeline input context.
//!
//! The context is assembled by the chat-generation collaborator and passed
//! into the pipeline by reference. It is never mutated during a run; every
//! stage reads the same snapshot.

use serde::{Deserialize, Serialize};

/// A single prior turn in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// The role (e.g., "user", "assistant").
    pub role: String,
    /// The turn content.
    pub content: String,
}

impl Turn {
    /// Creates a new turn.
    #[must_use]
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    /// Creates a user turn.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    /// Creates an assistant turn.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

/// The read-only input snapshot for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PipelineContext {
    /// Ordered compliance rules the generated text must respect.
    #[serde(default)]
    pub rules: Vec<String>,
    /// Free-text factual grounding (may be empty).
    #[serde(default)]
    pub knowledge_context: String,
    /// Prior conversation turns, oldest first.
    #[serde(default)]
    pub history: Vec<Turn>,
    /// Persona display name.
    #[serde(default)]
    pub persona_name: String,
    /// Persona tone description.
    #[serde(default)]
    pub persona_tone: String,
    /// Optional structural guidance for the reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_guide: Option<String>,
}

impl PipelineContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the compliance rules.
    #[must_use]
    pub fn with_rules(mut self, rules: Vec<String>) -> Self {
        self.rules = rules;
        self
    }

    /// Sets the knowledge context.
    #[must_use]
    pub fn with_knowledge(mut self, knowledge: impl Into<String>) -> Self {
        self.knowledge_context = knowledge.into();
        self
    }

    /// Sets the conversation history.
    #[must_use]
    pub fn with_history(mut self, history: Vec<Turn>) -> Self {
        self.history = history;
        self
    }

    /// Appends a turn to the history.
    #[must_use]
    pub fn add_turn(mut self, turn: Turn) -> Self {
        self.history.push(turn);
        self
    }

    /// Sets the persona name and tone.
    #[must_use]
    pub fn with_persona(
        mut self,
        name: impl Into<String>,
        tone: impl Into<String>,
    ) -> Self {
        self.persona_name = name.into();
        self.persona_tone = tone.into();
        self
    }

    /// Sets the flow guide.
    #[must_use]
    pub fn with_flow_guide(mut self, guide: impl Into<String>) -> Self {
        self.flow_guide = Some(guide.into());
        self
    }

    /// Returns the last user turn content, if any.
    #[must_use]
    pub fn last_user_turn(&self) -> Option<&str> {
        self.history
            .iter()
            .rev()
            .find(|t| t.role == "user")
            .map(|t| t.content.as_str())
    }
}
