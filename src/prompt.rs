//! Prompt assembly for the deck assistant
//!
//! Pure string building: the same transcript, context and vocabulary
//! always produce the same prompt.

use serde::Serialize;

use crate::directive::DirectiveVocabulary;
use crate::environment::EnvironmentSnapshot;

/// Everything the model is told about the room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptContext {
    /// Current time, e.g. "3:07:09 PM"
    pub time_label: String,
    /// Latest weather (and optionally battery) reading
    pub snapshot: EnvironmentSnapshot,
}

/// A role-tagged chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

/// An assembled prompt, built fresh for each session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    instruction: String,
    transcript: String,
}

impl Prompt {
    /// System instruction with context and hardware codes
    #[must_use]
    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    /// What the user said
    #[must_use]
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    /// Single-string form for plain completion endpoints
    #[must_use]
    pub fn text(&self) -> String {
        format!("{}\nUser: {}", self.instruction, self.transcript)
    }

    /// System/user pair for chat-completion engines
    #[must_use]
    pub fn messages(&self) -> [ChatMessage; 2] {
        [
            ChatMessage {
                role: "system",
                content: self.instruction.clone(),
            },
            ChatMessage {
                role: "user",
                content: self.transcript.clone(),
            },
        ]
    }
}

/// Builds prompts from a transcript and the latest readings
#[derive(Debug, Default, Clone, Copy)]
pub struct PromptAssembler;

impl PromptAssembler {
    /// Compose the prompt for one utterance
    #[must_use]
    pub fn assemble(
        self,
        transcript: &str,
        context: &PromptContext,
        vocabulary: &DirectiveVocabulary,
    ) -> Prompt {
        let snapshot = &context.snapshot;

        let mut environment = format!(
            "Time: {}, Weather: {}, {}",
            context.time_label, snapshot.temperature_label, snapshot.condition_label
        );
        if let Some(level) = snapshot.battery_level {
            environment.push_str(&format!(", Battery: {level}%"));
        }

        let instruction = format!(
            "You are a deck assistant. Be concise (1 sentence). Context: {environment}. Hardware codes: {vocabulary}."
        );

        Prompt {
            instruction,
            transcript: transcript.trim().to_string(),
        }
    }
}
