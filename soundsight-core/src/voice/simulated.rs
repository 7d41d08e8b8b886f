//! `SimulatedRecognizer`: picks one of a few stock questions.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::Recognizer;

const HEARD: [&str; 3] = [
    "What's in front of me?",
    "Where is the door?",
    "Are there any obstacles?",
];

pub struct SimulatedRecognizer {
    rng: StdRng,
}

impl SimulatedRecognizer {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for SimulatedRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Recognizer for SimulatedRecognizer {
    fn recognize_utterance(&mut self) -> Option<String> {
        HEARD.choose(&mut self.rng).map(|s| (*s).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::CommandTable;

    #[test]
    fn every_simulated_utterance_is_a_known_command() {
        let table = CommandTable::default();
        let mut recognizer = SimulatedRecognizer::with_seed(3);
        for _ in 0..50 {
            let heard = recognizer.recognize_utterance().expect("utterance");
            assert!(table.lookup(&heard).is_some(), "unknown: {heard}");
        }
    }
}
