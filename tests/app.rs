use async_trait::async_trait;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use parallel_paths::app::{Action, App};
use parallel_paths::orchestrator::narrative_portion;
use parallel_paths::*;
use std::sync::Arc;
use std::time::Duration;

const REPLY: &str = "The screen goes dark. CHOICE A: Reboot\nCHOICE B: Walk away";

struct FixedReply;

#[async_trait]
impl CompletionProvider for FixedReply {
    async fn complete(
        &self,
        _turns: &[Turn],
        _params: &GenerationParams,
    ) -> Result<String, AIError> {
        Ok(REPLY.to_string())
    }
}

fn app() -> App {
    let game = TurnOrchestrator::new(
        OrchestratorConfig::default(),
        Arc::new(FixedReply),
        Box::new(FixedDrift(0)),
    );
    App::new(Session::new(game))
}

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn finished_turn() -> Action {
    Action::TurnFinished(Box::new(Ok(TurnResult {
        narrative: REPLY.to_string(),
        extraction: ChoiceExtractor::extract(REPLY),
        state: StoryState::default(),
        history_len: 4,
    })))
}

async fn wait_for_reveal(app: &mut App) {
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(1)).await;
        app.sync_reveal();
        if !app.view().revealing {
            return;
        }
    }
    panic!("reveal never finished");
}

#[tokio::test]
async fn escape_quits_when_idle() {
    let mut app = app();
    assert!(matches!(app.on_key(key(KeyCode::Esc)), Some(Action::Quit)));
}

#[tokio::test]
async fn escape_closes_overlays_before_quitting() {
    let mut app = app();
    assert!(app.on_key(key(KeyCode::Char('h'))).is_none());
    assert!(app.view().show_help);
    assert!(app.on_key(key(KeyCode::Esc)).is_none());
    assert!(!app.view().show_help);
    assert!(matches!(app.on_key(key(KeyCode::Esc)), Some(Action::Quit)));
}

#[tokio::test(start_paused = true)]
async fn escape_skips_the_reveal_instead_of_quitting() {
    let mut app = app();
    app.handle_action(finished_turn());
    assert!(app.view().revealing);
    assert!(!app.view().choices_visible());

    assert!(app.on_key(key(KeyCode::Esc)).is_none());
    wait_for_reveal(&mut app).await;

    assert_eq!(app.view().story, narrative_portion(REPLY));
    assert_eq!(app.view().story, "The screen goes dark.");
    assert!(app.view().choices_visible());
    assert!(matches!(app.on_key(key(KeyCode::Esc)), Some(Action::Quit)));
}

#[tokio::test(start_paused = true)]
async fn enter_picks_the_highlighted_choice() {
    let mut app = app();
    assert!(app.on_key(key(KeyCode::Enter)).is_none());

    app.handle_action(finished_turn());
    app.on_key(key(KeyCode::Esc));
    wait_for_reveal(&mut app).await;

    assert!(app.on_key(key(KeyCode::Right)).is_none());
    assert_eq!(app.view().hovered, Some(1));
    assert!(matches!(
        app.on_key(key(KeyCode::Enter)),
        Some(Action::Choose(1))
    ));

    app.on_key(key(KeyCode::Left));
    assert!(matches!(
        app.on_key(key(KeyCode::Enter)),
        Some(Action::Choose(0))
    ));
}

#[tokio::test]
async fn second_submission_while_processing_shows_busy() {
    let mut app = app();
    app.handle_action(Action::Submit("Look at the screen".to_string()));
    assert!(app.view().processing);
    assert!(app.view().status.is_none());

    app.handle_action(Action::Submit("Look again".to_string()));
    assert_eq!(
        app.view().status.as_deref(),
        Some("Still working on the last turn...")
    );
    assert!(app.view().processing);
}

#[tokio::test]
async fn typed_input_is_submitted_on_enter() {
    let mut app = app();
    assert!(app.on_key(key(KeyCode::Char('i'))).is_none());
    for c in "run!".chars() {
        assert!(app.on_key(key(KeyCode::Char(c))).is_none());
    }
    app.on_key(key(KeyCode::Backspace));

    match app.on_key(key(KeyCode::Enter)) {
        Some(Action::Submit(text)) => assert_eq!(text, "run"),
        _ => panic!("expected the typed text to be submitted"),
    }
    assert!(!app.view().input_active);
    // Esc is a command again once typing ends.
    assert!(matches!(app.on_key(key(KeyCode::Esc)), Some(Action::Quit)));
}
