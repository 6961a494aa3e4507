use crate::ai::{CompletionProvider, GenerationParams};
use crate::choices::{Choice, ChoiceExtractor, Extraction};
use crate::error::TurnError;
use crate::game_state::{
    DEFAULT_SANITY_DRIFT, RandomDrift, SanityDrift, StoryState, StoryStateMachine,
};
use crate::history::{ConversationHistory, DEFAULT_HISTORY_CAP};
use crate::message::{Role, Turn};
use crate::prompts::{OPENING_PROMPT, SYSTEM_PROMPT, choice_prompt, state_context};
use crate::settings::Settings;
use crate::speech::SpeechSynthesizer;
use std::ops::RangeInclusive;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::sync::{Mutex, OwnedMutexGuard};

pub const DEFAULT_TTS_MAX_CHARS: usize = 500;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub instructions: String,
    pub history_cap: usize,
    pub sanity_drift: RangeInclusive<i32>,
    pub params: GenerationParams,
    pub tts_max_chars: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            instructions: SYSTEM_PROMPT.to_string(),
            history_cap: DEFAULT_HISTORY_CAP,
            sanity_drift: DEFAULT_SANITY_DRIFT,
            params: GenerationParams::default(),
            tts_max_chars: DEFAULT_TTS_MAX_CHARS,
        }
    }
}

impl From<&Settings> for OrchestratorConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            history_cap: settings.history_cap,
            sanity_drift: settings.sanity_drift_range(),
            params: GenerationParams {
                max_tokens: settings.max_tokens,
                temperature: settings.temperature,
            },
            tts_max_chars: settings.tts_max_chars,
            ..Self::default()
        }
    }
}

/// Everything the display needs after a completed turn.
#[derive(Debug, Clone)]
pub struct TurnResult {
    pub narrative: String,
    pub extraction: Extraction,
    pub state: StoryState,
    pub history_len: usize,
}

pub struct TurnOrchestrator {
    history: ConversationHistory,
    story: StoryStateMachine,
    provider: Arc<dyn CompletionProvider>,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    voice_output: Arc<AtomicBool>,
    params: GenerationParams,
    tts_max_chars: usize,
    current: Option<Extraction>,
}

impl TurnOrchestrator {
    pub fn new(
        config: OrchestratorConfig,
        provider: Arc<dyn CompletionProvider>,
        drift: Box<dyn SanityDrift>,
    ) -> Self {
        Self {
            history: ConversationHistory::new(config.instructions, config.history_cap),
            story: StoryStateMachine::new(config.sanity_drift, drift),
            provider,
            synthesizer: None,
            voice_output: Arc::new(AtomicBool::new(true)),
            params: config.params,
            tts_max_chars: config.tts_max_chars,
            current: None,
        }
    }

    pub fn with_random_drift(
        config: OrchestratorConfig,
        provider: Arc<dyn CompletionProvider>,
    ) -> Self {
        Self::new(config, provider, Box::new(RandomDrift::from_os()))
    }

    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    pub fn voice_output_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.voice_output)
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn state(&self) -> &StoryState {
        self.story.state()
    }

    pub fn current_choices(&self) -> Option<&Extraction> {
        self.current.as_ref()
    }

    pub async fn begin(&mut self) -> Result<TurnResult, TurnError> {
        self.submit(OPENING_PROMPT).await
    }

    pub async fn submit(&mut self, input: impl Into<String>) -> Result<TurnResult, TurnError> {
        let previous = self.current.take();

        self.history.append(Role::User, input);
        self.history.append_context(state_context(self.story.state()));

        let turns: Vec<Turn> = self.history.as_sequence();
        let provider = Arc::clone(&self.provider);
        let params = self.params;
        let narrative = match provider.complete(&turns, &params).await {
            Ok(narrative) => narrative,
            Err(e) => {
                log::error!("Story model call failed: {e}");
                self.current = previous;
                return Err(TurnError::Provider(e));
            }
        };
        self.history.append(Role::Assistant, narrative.as_str());

        let extraction = ChoiceExtractor::extract(&narrative);
        if extraction.is_fallback() {
            log::warn!("No choices found in the model output, offering the default pair");
        } else {
            log::debug!("Choices extracted with the {} heuristic", extraction.tier);
        }
        self.current = Some(extraction.clone());

        self.speak_narrative(&narrative);

        Ok(TurnResult {
            narrative,
            extraction,
            state: self.story.state().clone(),
            history_len: self.history.len(),
        })
    }

    /// Commits one of the two offered choices and plays the next turn.
    pub async fn commit_choice(&mut self, index: usize) -> Result<TurnResult, TurnError> {
        let choice: Choice = self
            .current
            .as_ref()
            .and_then(|extraction| extraction.get(index))
            .cloned()
            .ok_or(TurnError::NoSuchChoice(index))?;

        let checkpoint = self.story.state().clone();
        self.story.advance(choice.as_str());
        let result = self.submit(choice_prompt(choice.as_str())).await;
        if result.is_err() {
            self.story.restore(checkpoint);
        }
        result
    }

    fn speak_narrative(&self, text: &str) {
        let Some(synthesizer) = &self.synthesizer else {
            return;
        };
        if !self.voice_output.load(Ordering::Relaxed) {
            return;
        }
        let spoken = truncate_chars(narrative_portion(text), self.tts_max_chars);
        if spoken.trim().is_empty() {
            return;
        }
        synthesizer.speak(spoken.to_string());
    }
}

/// The prose before the first choice marker, or the whole text.
pub fn narrative_portion(text: &str) -> &str {
    match ChoiceExtractor::first_marker(text) {
        Some(offset) => {
            text[..offset].trim_end_matches(|c: char| c.is_whitespace() || c == '*')
        }
        None => text,
    }
}

pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((offset, _)) => &text[..offset],
        None => text,
    }
}

/// Shared handle to the orchestrator. Only one turn may run at a time; a
/// request made while another is in flight is refused with `TurnError::Busy`.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Mutex<TurnOrchestrator>>,
    voice_output: Arc<AtomicBool>,
}

impl Session {
    pub fn new(orchestrator: TurnOrchestrator) -> Self {
        let voice_output = orchestrator.voice_output_flag();
        Self {
            inner: Arc::new(Mutex::new(orchestrator)),
            voice_output,
        }
    }

    pub async fn begin(&self) -> Result<TurnResult, TurnError> {
        self.acquire()?.begin().await
    }

    pub async fn submit(&self, input: impl Into<String>) -> Result<TurnResult, TurnError> {
        self.acquire()?.submit(input).await
    }

    pub async fn choose(&self, index: usize) -> Result<TurnResult, TurnError> {
        self.acquire()?.commit_choice(index).await
    }

    pub fn is_busy(&self) -> bool {
        self.inner.try_lock().is_err()
    }

    pub fn voice_output(&self) -> bool {
        self.voice_output.load(Ordering::Relaxed)
    }

    pub fn set_voice_output(&self, enabled: bool) {
        self.voice_output.store(enabled, Ordering::Relaxed);
    }

    fn acquire(&self) -> Result<OwnedMutexGuard<TurnOrchestrator>, TurnError> {
        Arc::clone(&self.inner)
            .try_lock_owned()
            .map_err(|_| TurnError::Busy)
    }
}
