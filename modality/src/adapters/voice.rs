//! Voice command recognition.
//!
//! Transcripts are matched against a table of command patterns. A pattern
//! scores 1.0 on an exact match, 0.8 when the transcript contains it, and
//! otherwise the fraction of its words present in the transcript scaled by
//! 0.6. When no command clears the threshold a keyword fallback picks a
//! coarse intent.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::VoiceConfig;
use crate::types::{InputType, ModalityError, Params, Result, VoiceInput};

const EXACT_SCORE: f64 = 1.0;
const CONTAINS_SCORE: f64 = 0.8;
const OVERLAP_WEIGHT: f64 = 0.6;

/// Keyword groups for the fallback, checked in order.
const FALLBACK_KEYWORDS: &[(&str, &[&str])] = &[
    ("create", &["create", "make", "build", "generate"]),
    ("open", &["open", "start", "launch", "begin"]),
    ("close", &["close", "stop", "end", "exit"]),
    ("save", &["save", "store", "keep"]),
    ("delete", &["delete", "remove", "clear"]),
    ("show", &["show", "display", "view"]),
    ("help", &["help", "assist", "support"]),
];

fn number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("valid number regex"))
}

fn name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[A-Z][a-z]+\b").expect("valid name regex"))
}

/// Extracts command-specific parameters from a matched transcript.
pub type ParamExtractor = Arc<dyn Fn(&str, &Entities) -> Params + Send + Sync>;

/// A registered voice command.
#[derive(Clone)]
pub struct VoiceCommand {
    /// Phrases that trigger the command
    pub patterns: Vec<String>,
    pub extractor: Option<ParamExtractor>,
}

impl VoiceCommand {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
            extractor: None,
        }
    }

    pub fn with_extractor(
        mut self,
        extractor: impl Fn(&str, &Entities) -> Params + Send + Sync + 'static,
    ) -> Self {
        self.extractor = Some(Arc::new(extractor));
        self
    }
}

/// Entities found in a transcript.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entities {
    pub numbers: Vec<i64>,
    /// Capitalized words
    pub names: Vec<String>,
}

/// Best command match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandMatch {
    pub name: String,
    pub confidence: f64,
    pub pattern: Option<String>,
}

impl CommandMatch {
    fn unknown() -> Self {
        Self {
            name: "unknown".to_string(),
            confidence: 0.0,
            pattern: None,
        }
    }

    pub fn is_known(&self) -> bool {
        self.pattern.is_some()
    }
}

/// Output of the voice adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceReading {
    #[serde(rename = "type")]
    pub input_type: InputType,
    pub transcript: String,
    pub confidence: f64,
    pub language: String,
    pub command: String,
    pub command_confidence: f64,
    pub entities: Entities,
    pub intent: String,
    pub parameters: Params,
    pub timestamp: DateTime<Utc>,
}

/// Voice adapter statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceStats {
    pub registered_commands: usize,
    pub listening: bool,
    pub language: String,
    pub nlu_enabled: bool,
}

/// Voice input adapter.
pub struct VoiceAdapter {
    config: VoiceConfig,
    commands: Arc<RwLock<BTreeMap<String, VoiceCommand>>>,
    listening: Arc<RwLock<bool>>,
}

impl VoiceAdapter {
    /// Create with the default command table.
    pub fn new(config: VoiceConfig) -> Self {
        Self {
            config,
            commands: Arc::new(RwLock::new(Self::default_commands())),
            listening: Arc::new(RwLock::new(false)),
        }
    }

    fn default_commands() -> BTreeMap<String, VoiceCommand> {
        let mut commands = BTreeMap::new();
        commands.insert(
            "create-asset".to_string(),
            VoiceCommand::new(["create asset", "make asset", "generate asset", "new asset"])
                .with_extractor(|transcript, _| {
                    let mut params = Params::new();
                    params.insert("assetType".to_string(), json!(asset_type(transcript)));
                    params
                }),
        );
        commands.insert(
            "open-dashboard".to_string(),
            VoiceCommand::new(["open dashboard", "show dashboard", "display dashboard"]),
        );
        commands.insert(
            "start-stream".to_string(),
            VoiceCommand::new(["start stream", "begin streaming", "go live"]),
        );
        commands.insert(
            "save-work".to_string(),
            VoiceCommand::new(["save", "save work", "save progress"]),
        );
        commands
    }

    /// Register or replace a command.
    pub async fn register_command(&self, name: &str, command: VoiceCommand) {
        let mut commands = self.commands.write().await;
        commands.insert(name.to_string(), command);
        debug!(command = %name, "Registered voice command");
    }

    /// Process a voice input.
    pub async fn process(&self, input: &VoiceInput) -> Result<VoiceReading> {
        let transcript = input
            .transcript()
            .ok_or_else(|| ModalityError::InvalidInput("voice input missing transcript".to_string()))?
            .to_string();
        let confidence = input.confidence.unwrap_or(1.0);

        if confidence < self.config.confidence_threshold {
            warn!(confidence, threshold = self.config.confidence_threshold, "Low voice recognition confidence");
        }

        let entities = if self.config.enable_nlu {
            extract_entities(&transcript)
        } else {
            Entities::default()
        };

        let (command, extra) = {
            let commands = self.commands.read().await;
            let command = best_match(&commands, &transcript, self.config.command_threshold);
            let extra = commands
                .get(&command.name)
                .filter(|_| command.is_known())
                .and_then(|c| c.extractor.as_ref())
                .map(|extract| extract(&transcript, &entities))
                .unwrap_or_default();
            (command, extra)
        };

        let intent = if command.is_known() {
            command.name.clone()
        } else {
            fallback_intent(&transcript).to_string()
        };

        let mut parameters = Params::new();
        parameters.insert("raw".to_string(), Value::String(transcript.clone()));
        parameters.insert("entities".to_string(), serde_json::to_value(&entities).unwrap_or_default());
        parameters.extend(extra);

        debug!(command = %command.name, score = command.confidence, intent = %intent, "Processed voice input");

        Ok(VoiceReading {
            input_type: InputType::Voice,
            transcript,
            confidence,
            language: input
                .language
                .clone()
                .unwrap_or_else(|| self.config.language.clone()),
            command: command.name,
            command_confidence: command.confidence,
            entities,
            intent,
            parameters,
            timestamp: Utc::now(),
        })
    }

    /// Enter continuous listening mode.
    pub async fn start_listening(&self) {
        *self.listening.write().await = true;
        info!("Voice listening started");
    }

    pub async fn stop_listening(&self) {
        *self.listening.write().await = false;
        info!("Voice listening stopped");
    }

    pub async fn is_listening(&self) -> bool {
        *self.listening.read().await
    }

    pub async fn stats(&self) -> VoiceStats {
        VoiceStats {
            registered_commands: self.commands.read().await.len(),
            listening: *self.listening.read().await,
            language: self.config.language.clone(),
            nlu_enabled: self.config.enable_nlu,
        }
    }
}

impl Default for VoiceAdapter {
    fn default() -> Self {
        Self::new(VoiceConfig::default())
    }
}

/// Score a transcript against one pattern.
pub fn match_score(transcript: &str, pattern: &str) -> f64 {
    let transcript = transcript.trim().to_lowercase();
    let pattern = pattern.trim().to_lowercase();

    if transcript == pattern {
        return EXACT_SCORE;
    }
    if transcript.contains(&pattern) {
        return CONTAINS_SCORE;
    }

    let words: Vec<&str> = transcript.split_whitespace().collect();
    let pattern_words: Vec<&str> = pattern.split_whitespace().collect();
    if pattern_words.is_empty() {
        return 0.0;
    }

    let matched = pattern_words.iter().filter(|w| words.contains(w)).count();
    matched as f64 / pattern_words.len() as f64 * OVERLAP_WEIGHT
}

/// Highest-scoring command at or above `threshold`. Ties keep the first
/// command in name order.
fn best_match(commands: &BTreeMap<String, VoiceCommand>, transcript: &str, threshold: f64) -> CommandMatch {
    let mut best = CommandMatch::unknown();

    for (name, command) in commands {
        for pattern in &command.patterns {
            let score = match_score(transcript, pattern);
            if score > best.confidence && score >= threshold {
                best = CommandMatch {
                    name: name.clone(),
                    confidence: score,
                    pattern: Some(pattern.clone()),
                };
            }
        }
    }

    best
}

/// Coarse intent from keywords.
pub fn fallback_intent(transcript: &str) -> &'static str {
    let lower = transcript.to_lowercase();
    FALLBACK_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(intent, _)| *intent)
        .unwrap_or("unknown")
}

/// Numbers and capitalized words.
pub fn extract_entities(transcript: &str) -> Entities {
    Entities {
        numbers: number_regex()
            .find_iter(transcript)
            .filter_map(|m| m.as_str().parse().ok())
            .collect(),
        names: name_regex()
            .find_iter(transcript)
            .map(|m| m.as_str().to_string())
            .collect(),
    }
}

fn asset_type(transcript: &str) -> &'static str {
    let lower = transcript.to_lowercase();
    if lower.contains("music") {
        "music"
    } else if lower.contains("video") {
        "video"
    } else if lower.contains("image") {
        "image"
    } else if lower.contains("3d") || lower.contains("model") {
        "3d-model"
    } else {
        "generic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_tiers() {
        assert_eq!(match_score("Go Live", "go live"), 1.0);
        assert_eq!(match_score("please create asset now", "create asset"), 0.8);
        assert!((match_score("asset please create", "create asset") - 0.6).abs() < 1e-9);
        assert!((match_score("begin now", "begin streaming") - 0.3).abs() < 1e-9);
        assert_eq!(match_score("hello", "go live"), 0.0);
    }

    #[tokio::test]
    async fn test_create_asset_scenario() {
        let voice = VoiceAdapter::default();
        let reading = voice
            .process(&VoiceInput::new("please create asset now", 0.95))
            .await
            .unwrap();

        assert_eq!(reading.intent, "create-asset");
        assert_eq!(reading.command, "create-asset");
        assert!(reading.command_confidence >= 0.8);
        assert_eq!(reading.parameters["assetType"], "generic");
        assert_eq!(reading.language, "en-US");
    }

    #[tokio::test]
    async fn test_asset_type_extraction() {
        let voice = VoiceAdapter::default();
        let reading = voice
            .process(&VoiceInput::new("make asset with music", 1.0))
            .await
            .unwrap();
        assert_eq!(reading.parameters["assetType"], "music");
    }

    #[tokio::test]
    async fn test_keyword_fallback() {
        let voice = VoiceAdapter::default();

        let reading = voice.process(&VoiceInput::new("please remove that", 0.9)).await.unwrap();
        assert_eq!(reading.command, "unknown");
        assert_eq!(reading.intent, "delete");

        let reading = voice.process(&VoiceInput::new("hmm", 0.4)).await.unwrap();
        assert_eq!(reading.intent, "unknown");
    }

    #[tokio::test]
    async fn test_missing_transcript_is_invalid() {
        let voice = VoiceAdapter::default();
        let result = voice.process(&VoiceInput::default()).await;
        assert!(matches!(result, Err(ModalityError::InvalidInput(_))));

        let result = voice.process(&VoiceInput::new("   ", 1.0)).await;
        assert!(matches!(result, Err(ModalityError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_custom_command_and_listening() {
        let voice = VoiceAdapter::default();
        voice
            .register_command("mute", VoiceCommand::new(["mute audio", "silence"]))
            .await;

        let reading = voice.process(&VoiceInput::new("silence", 1.0)).await.unwrap();
        assert_eq!(reading.intent, "mute");

        voice.start_listening().await;
        let stats = voice.stats().await;
        assert!(stats.listening);
        assert_eq!(stats.registered_commands, 5);
        voice.stop_listening().await;
        assert!(!voice.is_listening().await);
    }

    #[test]
    fn test_entities() {
        let entities = extract_entities("Send 3 tracks to Maria and Leo by 12");
        assert_eq!(entities.numbers, vec![3, 12]);
        assert_eq!(entities.names, vec!["Send", "Maria", "Leo"]);
    }
}
