//! Known voice commands and their canned responses.

use std::collections::HashMap;

use serde::Serialize;

/// Response for any utterance that is not in the table.
pub const FALLBACK_RESPONSE: &str = "I'm analyzing your surroundings. Please wait a moment.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceCommand {
    pub command: &'static str,
    pub description: &'static str,
    pub response: &'static str,
}

pub static COMMANDS: [VoiceCommand; 6] = [
    VoiceCommand {
        command: "What's in front of me?",
        description: "Describes objects directly ahead",
        response: "There's a person about 2.5 meters ahead on your left, and a door 1.8 meters to your front-right.",
    },
    VoiceCommand {
        command: "Where is the door?",
        description: "Locates nearest doorway",
        response: "I detect a door 1.8 meters to your front-right. Walk forward and turn slightly right.",
    },
    VoiceCommand {
        command: "Are there any obstacles?",
        description: "Identifies potential hazards",
        response: "Clear path ahead. There are stairs 4.2 meters directly in front of you.",
    },
    VoiceCommand {
        command: "How far is the nearest person?",
        description: "Distance to closest person",
        response: "The nearest person is 2.5 meters away, slightly to your left.",
    },
    VoiceCommand {
        command: "Find the stairs",
        description: "Locates stairways up or down",
        response: "Stairs detected 4.2 meters directly ahead. Approach carefully.",
    },
    VoiceCommand {
        command: "What's on my left?",
        description: "Describes objects to the left",
        response: "A person is standing 2.5 meters to your front-left.",
    },
];

/// Utterance → response lookup with a fixed fallback.
///
/// Keys match after trimming and ASCII case folding, since recognisers
/// disagree on capitalisation.
#[derive(Debug, Clone)]
pub struct CommandTable {
    responses: HashMap<String, String>,
    fallback: String,
}

impl Default for CommandTable {
    fn default() -> Self {
        let mut table = Self::empty();
        for entry in &COMMANDS {
            table.insert(entry.command, entry.response);
        }
        table
    }
}

impl CommandTable {
    pub fn empty() -> Self {
        Self {
            responses: HashMap::new(),
            fallback: FALLBACK_RESPONSE.to_string(),
        }
    }

    pub fn insert(&mut self, command: impl AsRef<str>, response: impl Into<String>) {
        self.responses
            .insert(normalize(command.as_ref()), response.into());
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = fallback.into();
        self
    }

    /// The configured response, if `utterance` is a known command.
    pub fn lookup(&self, utterance: &str) -> Option<&str> {
        self.responses.get(&normalize(utterance)).map(String::as_str)
    }

    /// The configured response, or the fallback on a miss.
    pub fn respond(&self, utterance: &str) -> &str {
        self.lookup(utterance).unwrap_or(&self.fallback)
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}

fn normalize(utterance: &str) -> String {
    utterance.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_answers_every_catalog_command() {
        let table = CommandTable::default();
        assert_eq!(table.len(), COMMANDS.len());
        for entry in &COMMANDS {
            assert_eq!(table.respond(entry.command), entry.response);
        }
    }

    #[test]
    fn lookup_ignores_case_and_padding() {
        let table = CommandTable::default();
        assert_eq!(
            table.lookup("  where is the DOOR? "),
            Some(COMMANDS[1].response)
        );
    }

    #[test]
    fn miss_returns_fallback() {
        let table = CommandTable::default();
        assert_eq!(table.lookup("gibberish"), None);
        assert_eq!(table.respond("gibberish"), FALLBACK_RESPONSE);

        let custom = CommandTable::empty().with_fallback("Say again?");
        assert!(custom.is_empty());
        assert_eq!(custom.respond("anything"), "Say again?");
    }
}
