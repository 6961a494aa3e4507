use async_trait::async_trait;
use parallel_paths::orchestrator::narrative_portion;
use parallel_paths::prompts::{OPENING_PROMPT, SYSTEM_PROMPT};
use parallel_paths::speech::SpeechSynthesizer;
use parallel_paths::*;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

const TAGGED_REPLY: &str = "It is 1984. You sit at your desk, the cursor blinking.\n\n\
                            CHOICE A: Accept the job at Tuckersoft\n\
                            CHOICE B: Refuse and work from home";

#[derive(Default)]
struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String, AIError>>>,
    calls: Mutex<Vec<Vec<Turn>>>,
}

impl ScriptedProvider {
    fn new(replies: impl IntoIterator<Item = Result<String, AIError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: Mutex::default(),
        })
    }

    fn calls(&self) -> Vec<Vec<Turn>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(
        &self,
        turns: &[Turn],
        params: &GenerationParams,
    ) -> Result<String, AIError> {
        assert_eq!(params.max_tokens, 800);
        self.calls.lock().unwrap().push(turns.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AIError::Other("script exhausted".to_string())))
    }
}

// Holds every call open until the test releases it.
#[derive(Default)]
struct GatedProvider {
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl CompletionProvider for GatedProvider {
    async fn complete(
        &self,
        _turns: &[Turn],
        _params: &GenerationParams,
    ) -> Result<String, AIError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(TAGGED_REPLY.to_string())
    }
}

#[derive(Default)]
struct RecordingVoice {
    spoken: Mutex<Vec<String>>,
}

impl SpeechSynthesizer for RecordingVoice {
    fn speak(&self, text: String) {
        self.spoken.lock().unwrap().push(text);
    }
}

fn orchestrator(provider: Arc<dyn CompletionProvider>) -> TurnOrchestrator {
    TurnOrchestrator::new(
        OrchestratorConfig::default(),
        provider,
        Box::new(FixedDrift(-5)),
    )
}

#[tokio::test]
async fn opening_turn_builds_history_and_choices() {
    let provider = ScriptedProvider::new([Ok(TAGGED_REPLY.to_string())]);
    let mut game = orchestrator(provider.clone());

    let result = game.begin().await.unwrap();

    assert_eq!(result.narrative, TAGGED_REPLY);
    assert_eq!(result.extraction.tier, ExtractionTier::Tagged);
    assert_eq!(
        result.extraction.pair(),
        ("Accept the job at Tuckersoft", "Refuse and work from home")
    );
    assert_eq!(result.history_len, 4);

    let turns = game.history().as_sequence();
    assert_eq!(turns[0], Turn::system(SYSTEM_PROMPT));
    assert_eq!(turns[1], Turn::user(OPENING_PROMPT));
    assert!(turns[2].is_system());
    assert!(turns[2].content().contains("Scene: intro"));
    assert_eq!(turns[3], Turn::assistant(TAGGED_REPLY));

    // The provider saw everything but its own reply.
    let calls = provider.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0], turns[..3].to_vec());
}

#[tokio::test]
async fn only_latest_state_context_is_sent() {
    let provider = ScriptedProvider::new([
        Ok(TAGGED_REPLY.to_string()),
        Ok("The room goes quiet.\n- Look at the clock\n- Call your father".to_string()),
    ]);
    let mut game = orchestrator(provider.clone());

    game.begin().await.unwrap();
    let second = game.submit("I look around").await.unwrap();

    assert_eq!(second.extraction.tier, ExtractionTier::Bulleted);
    let calls = provider.calls();
    let system_turns = calls[1].iter().filter(|turn| turn.is_system()).count();
    assert_eq!(system_turns, 2);
    assert_eq!(calls[1][0].content(), SYSTEM_PROMPT);
}

#[tokio::test]
async fn provider_failure_keeps_history_and_choices() {
    let provider = ScriptedProvider::new([
        Ok(TAGGED_REPLY.to_string()),
        Err(AIError::Timeout),
    ]);
    let mut game = orchestrator(provider);

    game.begin().await.unwrap();
    let before = game.history().len();

    let err = game.submit("Hello?").await.unwrap_err();
    assert!(matches!(err, TurnError::Provider(AIError::Timeout)));
    assert!(err.to_string().contains("story model"));

    // User turn and a refreshed state context stay; no assistant reply.
    let turns = game.history().as_sequence();
    assert_eq!(game.history().len(), before + 1);
    assert_eq!(turns.last().map(Turn::role), Some(Role::System));
    assert!(turns.contains(&Turn::user("Hello?")));

    let choices = game.current_choices().expect("previous choices restored");
    assert_eq!(choices.choices[0], "Accept the job at Tuckersoft");
}

#[tokio::test]
async fn committing_a_choice_advances_the_story() {
    let provider = ScriptedProvider::new([
        Ok(TAGGED_REPLY.to_string()),
        Ok("Colin smiles.\nCHOICE A: Take the pill\nCHOICE B: Flush it".to_string()),
    ]);
    let mut game = orchestrator(provider.clone());

    game.begin().await.unwrap();
    let result = game.commit_choice(1).await.unwrap();

    assert_eq!(result.state.sanity, 95);
    assert_eq!(result.state.current_scene, "scene_1");
    assert_eq!(
        result.state.choices_made.get("intro").map(String::as_str),
        Some("Refuse and work from home")
    );

    let calls = provider.calls();
    let sent = &calls[1];
    assert!(sent.contains(&Turn::user("I choose: Refuse and work from home")));
    assert!(
        sent.last()
            .map(|turn| turn.content().contains("Scene: scene_1"))
            .unwrap_or(false)
    );
    assert_eq!(result.extraction.pair(), ("Take the pill", "Flush it"));
}

#[tokio::test]
async fn failed_choice_can_be_retried_without_double_counting() {
    let provider = ScriptedProvider::new([
        Ok(TAGGED_REPLY.to_string()),
        Err(AIError::Timeout),
        Ok("Colin smiles.\nCHOICE A: Take the pill\nCHOICE B: Flush it".to_string()),
    ]);
    let mut game = orchestrator(provider);

    game.begin().await.unwrap();
    assert!(matches!(
        game.commit_choice(0).await,
        Err(TurnError::Provider(AIError::Timeout))
    ));
    assert_eq!(game.state(), &StoryState::default());

    let result = game.commit_choice(0).await.unwrap();
    assert_eq!(result.state.current_scene, "scene_1");
    assert_eq!(result.state.sanity, 95);
    assert_eq!(result.state.choice_count(), 1);
    assert_eq!(
        result.state.choices_made.get("intro").map(String::as_str),
        Some("Accept the job at Tuckersoft")
    );
}

#[tokio::test]
async fn unknown_choice_is_rejected() {
    let provider = ScriptedProvider::new([Ok(TAGGED_REPLY.to_string())]);
    let mut game = orchestrator(provider.clone());

    assert!(matches!(
        game.commit_choice(0).await,
        Err(TurnError::NoSuchChoice(0))
    ));

    game.begin().await.unwrap();
    assert!(matches!(
        game.commit_choice(2).await,
        Err(TurnError::NoSuchChoice(2))
    ));
    assert_eq!(game.state().choice_count(), 0);
    assert_eq!(provider.calls().len(), 1);
}

#[tokio::test]
async fn narrator_speaks_the_prose_only() {
    let provider = ScriptedProvider::new([Ok(TAGGED_REPLY.to_string())]);
    let voice = Arc::new(RecordingVoice::default());
    let mut game = orchestrator(provider).with_synthesizer(voice.clone());

    game.begin().await.unwrap();

    let spoken = voice.spoken.lock().unwrap().clone();
    assert_eq!(spoken, vec![narrative_portion(TAGGED_REPLY).to_string()]);
    assert!(!spoken[0].contains("CHOICE"));
}

#[tokio::test]
async fn narration_is_truncated_and_can_be_muted() {
    let long = "Static. ".repeat(40);
    let provider = ScriptedProvider::new([Ok(long.clone()), Ok(long)]);
    let voice = Arc::new(RecordingVoice::default());
    let config = OrchestratorConfig {
        tts_max_chars: 30,
        ..OrchestratorConfig::default()
    };
    let game = TurnOrchestrator::new(config, provider, Box::new(FixedDrift(0)))
        .with_synthesizer(voice.clone());
    let session = Session::new(game);

    session.begin().await.unwrap();
    session.set_voice_output(false);
    session.submit("Stop talking").await.unwrap();

    let spoken = voice.spoken.lock().unwrap().clone();
    assert_eq!(spoken.len(), 1);
    assert_eq!(spoken[0].chars().count(), 30);
}

#[tokio::test]
async fn session_rejects_a_second_turn_in_flight() {
    let provider = Arc::new(GatedProvider::default());
    let session = Session::new(orchestrator(provider.clone()));

    let first = tokio::spawn({
        let session = session.clone();
        async move { session.submit("Look at the screen").await }
    });

    provider.entered.notified().await;
    assert!(session.is_busy());
    assert!(matches!(
        session.submit("Look again").await,
        Err(TurnError::Busy)
    ));
    assert!(matches!(session.choose(0).await, Err(TurnError::Busy)));

    provider.release.notify_one();
    let result = first.await.unwrap().unwrap();
    assert_eq!(result.extraction.tier, ExtractionTier::Tagged);
    assert!(!session.is_busy());
}
