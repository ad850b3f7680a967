//! Hardware directives embedded in model replies
//!
//! The model is told which bracketed codes it may emit. Replies are
//! scanned for those literals, each hit becomes a [`HardwareCommand`],
//! and the literal is stripped before the reply is spoken.

use std::fmt;
use std::str::FromStr;

use crate::hardware::{HardwareBridge, HardwareCommand};

/// A bracketed marker the model may emit to trigger a side effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveToken {
    /// `[[SCREEN_OFF]]`
    ScreenOff,
    /// `[[BRIGHT_MAX]]`
    BrightMax,
    /// `[[BRIGHT_LOW]]`
    BrightLow,
    /// `[[RELOAD]]`
    Reload,
}

impl DirectiveToken {
    /// Every known token, in prompt order
    pub const ALL: [Self; 4] = [Self::ScreenOff, Self::BrightMax, Self::BrightLow, Self::Reload];

    /// Bare token name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ScreenOff => "SCREEN_OFF",
            Self::BrightMax => "BRIGHT_MAX",
            Self::BrightLow => "BRIGHT_LOW",
            Self::Reload => "RELOAD",
        }
    }

    /// Exact literal matched in model output
    #[must_use]
    pub const fn literal(self) -> &'static str {
        match self {
            Self::ScreenOff => "[[SCREEN_OFF]]",
            Self::BrightMax => "[[BRIGHT_MAX]]",
            Self::BrightLow => "[[BRIGHT_LOW]]",
            Self::Reload => "[[RELOAD]]",
        }
    }

    /// Side effect this token stands for
    #[must_use]
    pub const fn command(self) -> HardwareCommand {
        match self {
            Self::ScreenOff => HardwareCommand::ScreenOff,
            Self::BrightMax => HardwareCommand::SetBrightness(255),
            Self::BrightLow => HardwareCommand::SetBrightness(10),
            Self::Reload => HardwareCommand::Reload,
        }
    }
}

impl fmt::Display for DirectiveToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.literal())
    }
}

impl FromStr for DirectiveToken {
    type Err = String;

    /// Accepts `SCREEN_OFF`, `screen_off` or `[[SCREEN_OFF]]`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bare = s
            .trim()
            .trim_start_matches("[[")
            .trim_end_matches("]]")
            .to_ascii_uppercase();

        Self::ALL
            .into_iter()
            .find(|t| t.name() == bare)
            .ok_or_else(|| format!("unknown directive token: {s}"))
    }
}

/// The closed set of tokens the active backend is told about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveVocabulary {
    tokens: Vec<DirectiveToken>,
}

impl DirectiveVocabulary {
    /// Build a vocabulary, dropping duplicates but keeping order
    #[must_use]
    pub fn new(tokens: impl IntoIterator<Item = DirectiveToken>) -> Self {
        let mut unique = Vec::new();
        for token in tokens {
            if !unique.contains(&token) {
                unique.push(token);
            }
        }
        Self { tokens: unique }
    }

    /// Codes offered to the cloud model
    #[must_use]
    pub fn cloud() -> Self {
        Self::new([DirectiveToken::ScreenOff, DirectiveToken::BrightMax])
    }

    /// Codes offered to the local model
    #[must_use]
    pub fn local() -> Self {
        Self::new(DirectiveToken::ALL)
    }

    /// Tokens in prompt order
    #[must_use]
    pub fn tokens(&self) -> &[DirectiveToken] {
        &self.tokens
    }

    #[must_use]
    pub fn contains(&self, token: DirectiveToken) -> bool {
        self.tokens.contains(&token)
    }
}

impl fmt::Display for DirectiveVocabulary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(token.literal())?;
        }
        Ok(())
    }
}

/// Result of scanning one model reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    /// Reply with directive literals removed
    pub spoken_text: String,
    /// Side effects requested by the reply, in vocabulary order
    pub commands: Vec<HardwareCommand>,
}

/// Turns model replies into side effects plus speakable text
#[derive(Debug, Clone)]
pub struct DirectiveExecutor {
    vocabulary: DirectiveVocabulary,
}

impl DirectiveExecutor {
    #[must_use]
    pub const fn new(vocabulary: DirectiveVocabulary) -> Self {
        Self { vocabulary }
    }

    #[must_use]
    pub const fn vocabulary(&self) -> &DirectiveVocabulary {
        &self.vocabulary
    }

    /// Scan a reply for directive literals
    ///
    /// Only the first occurrence of each token is removed. A reply with no
    /// tokens comes back byte-for-byte unchanged.
    #[must_use]
    pub fn execute(&self, reply: &str) -> Execution {
        let mut text = reply.to_string();
        let mut commands = Vec::new();

        for token in self.vocabulary.tokens() {
            if reply.contains(token.literal()) {
                commands.push(token.command());
                text = text.replacen(token.literal(), "", 1);
            }
        }

        if !commands.is_empty() {
            text = text.trim().to_string();
        }

        tracing::debug!(commands = ?commands, "directives scanned");

        Execution {
            spoken_text: text,
            commands,
        }
    }

    /// Send commands to the kiosk, skipping anything that fails
    ///
    /// With no bridge configured every command is dropped silently.
    pub async fn dispatch(commands: &[HardwareCommand], bridge: Option<&dyn HardwareBridge>) {
        let Some(bridge) = bridge else {
            if !commands.is_empty() {
                tracing::debug!(count = commands.len(), "no hardware bridge, skipping commands");
            }
            return;
        };

        for command in commands {
            match bridge.apply(*command).await {
                Ok(()) => tracing::info!(?command, "hardware command applied"),
                Err(e) => tracing::warn!(?command, error = %e, "hardware command skipped"),
            }
        }
    }
}
