// /app.rs
use crate::error::TurnError;
use crate::orchestrator::{Session, TurnResult, narrative_portion};
use crate::reveal::{Reveal, RevealPacing};
use crate::speech::{DEFAULT_LISTEN_TIMEOUT, Heard, SpeechRecognizer, listen};
use crate::tui::{Tui, TuiEvent};
use crate::ui::{self, GameLayout, GameView};

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Position;
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;

const BUSY_MESSAGE: &str = "Still working on the last turn...";

pub enum Action {
    Quit,
    Submit(String),
    Choose(usize),
    Listen,
    Heard(Heard),
    TurnFinished(Box<Result<TurnResult, TurnError>>),
}

enum TurnRequest {
    Begin,
    Submit(String),
    Choose(usize),
}

pub struct App {
    running: bool,
    session: Session,
    recognizer: Option<Arc<dyn SpeechRecognizer>>,
    listen_timeout: Duration,
    pacing: RevealPacing,

    view: GameView,
    reveal: Option<Reveal>,
    layout: Option<GameLayout>,

    action_sender: mpsc::UnboundedSender<Action>,
    action_receiver: mpsc::UnboundedReceiver<Action>,
}

impl App {
    pub fn new(session: Session) -> Self {
        let (action_sender, action_receiver) = mpsc::unbounded_channel();
        let view = GameView {
            voice_output: session.voice_output(),
            ..GameView::default()
        };
        Self {
            running: true,
            session,
            recognizer: None,
            listen_timeout: DEFAULT_LISTEN_TIMEOUT,
            pacing: RevealPacing::default(),
            view,
            reveal: None,
            layout: None,
            action_sender,
            action_receiver,
        }
    }

    pub fn with_recognizer(mut self, recognizer: Arc<dyn SpeechRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self.view.voice_input_available = true;
        self
    }

    pub fn with_voice_output_available(mut self, available: bool) -> Self {
        self.view.voice_available = available;
        self
    }

    pub fn listen_timeout(mut self, limit: Duration) -> Self {
        self.listen_timeout = limit;
        self
    }

    pub fn pacing(mut self, pacing: RevealPacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn view(&self) -> &GameView {
        &self.view
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut tui = Tui::new()?
            .tick_rate(10.0) // spinner speed
            .frame_rate(30.0);

        tui.enter()?;
        log::info!("Parallel Paths start: {}", chrono::Local::now());
        self.start_turn(TurnRequest::Begin);

        while self.running {
            tokio::select! {
                event = tui.next() => match event {
                    Some(event) => self.handle_tui_event(&mut tui, event)?,
                    None => break,
                },
                Some(action) = self.action_receiver.recv() => self.handle_action(action),
            }
        }

        tui.exit()?;
        Ok(())
    }

    fn handle_tui_event(&mut self, tui: &mut Tui, event: TuiEvent) -> Result<()> {
        match event {
            TuiEvent::Key(key_event) => {
                if let Some(action) = self.on_key(key_event) {
                    self.handle_action(action);
                }
            }
            TuiEvent::Mouse(mouse_event) => {
                if let Some(action) = self.on_mouse(mouse_event) {
                    self.handle_action(action);
                }
            }
            TuiEvent::Tick => {
                if self.view.processing {
                    self.view.spinner.next_frame();
                }
            }
            TuiEvent::Render => {
                self.sync_reveal();
                tui.draw(|frame| {
                    self.layout = ui::draw(frame, &self.view);
                })?;
            }
            TuiEvent::Resize(_, _) => self.layout = None,
            TuiEvent::Init => {}
            TuiEvent::Error => log::warn!("Terminal event stream reported an error"),
        }
        Ok(())
    }

    pub fn on_key(&mut self, key_event: KeyEvent) -> Option<Action> {
        if key_event.modifiers.contains(KeyModifiers::CONTROL)
            && key_event.code == KeyCode::Char('c')
        {
            return Some(Action::Quit);
        }

        if self.view.input_active {
            return self.on_input_key(key_event);
        }

        match key_event.code {
            KeyCode::Esc => {
                if let Some(reveal) = &self.reveal {
                    reveal.skip();
                    None
                } else if self.view.show_help || self.view.show_debug {
                    self.view.show_help = false;
                    self.view.show_debug = false;
                    None
                } else {
                    Some(Action::Quit)
                }
            }
            KeyCode::Char('h') => {
                self.view.show_help = !self.view.show_help;
                None
            }
            KeyCode::Char('d') => {
                self.view.show_debug = !self.view.show_debug;
                None
            }
            KeyCode::Char('m') => {
                self.toggle_voice_output();
                None
            }
            KeyCode::Char('v') => Some(Action::Listen),
            KeyCode::Char('i') => {
                self.view.input_active = true;
                None
            }
            KeyCode::Left | KeyCode::Right if self.view.choices_visible() => {
                self.view.hovered = Some(usize::from(key_event.code == KeyCode::Right));
                None
            }
            KeyCode::Enter => self.view.hovered.map(Action::Choose),
            KeyCode::Char('1') => Some(Action::Choose(0)),
            KeyCode::Char('2') => Some(Action::Choose(1)),
            _ => None,
        }
    }

    fn on_input_key(&mut self, key_event: KeyEvent) -> Option<Action> {
        match key_event.code {
            KeyCode::Enter => {
                self.view.input_active = false;
                self.view.take_input().map(Action::Submit)
            }
            KeyCode::Esc => {
                self.view.input_active = false;
                None
            }
            KeyCode::Backspace => {
                self.view.pop_char();
                None
            }
            KeyCode::Char(c) => {
                self.view.push_char(c);
                None
            }
            _ => None,
        }
    }

    pub fn on_mouse(&mut self, mouse_event: MouseEvent) -> Option<Action> {
        let layout = self.layout?;
        let position = Position::new(mouse_event.column, mouse_event.row);
        match mouse_event.kind {
            MouseEventKind::Moved => {
                self.view.hovered = if self.view.choices_visible() {
                    layout.choice_at(position)
                } else {
                    None
                };
                None
            }
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(index) = layout.choice_at(position) {
                    return Some(Action::Choose(index));
                }
                if layout.input_contains(position) {
                    self.view.input_active = true;
                }
                None
            }
            _ => None,
        }
    }

    pub fn handle_action(&mut self, action: Action) {
        match action {
            Action::Quit => self.running = false,
            Action::Submit(text) => self.start_turn(TurnRequest::Submit(text)),
            Action::Choose(index) => {
                if self.view.choices_visible() {
                    self.start_turn(TurnRequest::Choose(index));
                }
            }
            Action::Listen => self.start_listening(),
            Action::Heard(heard) => {
                self.view.listening = false;
                match heard {
                    Heard::Speech(text) => {
                        log::debug!("Heard: {text}");
                        self.start_turn(TurnRequest::Submit(text));
                    }
                    other => self.view.status = Some(other.message()),
                }
            }
            Action::TurnFinished(result) => self.finish_turn(*result),
        }
    }

    fn start_turn(&mut self, request: TurnRequest) {
        if self.view.processing {
            self.view.status = Some(BUSY_MESSAGE.to_string());
            return;
        }
        if let Some(reveal) = self.reveal.take() {
            reveal.skip();
        }
        self.view.revealing = false;
        self.view.processing = true;
        self.view.hovered = None;
        self.view.status = None;

        let session = self.session.clone();
        let sender = self.action_sender.clone();
        tokio::spawn(async move {
            let result = match request {
                TurnRequest::Begin => session.begin().await,
                TurnRequest::Submit(text) => session.submit(text).await,
                TurnRequest::Choose(index) => session.choose(index).await,
            };
            let _ = sender.send(Action::TurnFinished(Box::new(result)));
        });
    }

    fn finish_turn(&mut self, result: Result<TurnResult, TurnError>) {
        match result {
            Ok(turn) => {
                self.view.processing = false;
                self.view.choices = Some(turn.extraction.choices.clone());
                self.view.tier = Some(turn.extraction.tier);
                self.view.state = turn.state;
                self.view.history_len = turn.history_len;
                self.view.story.clear();
                self.view.revealing = true;
                self.reveal = Some(Reveal::start(
                    narrative_portion(&turn.narrative).to_string(),
                    self.pacing,
                ));
            }
            // Another turn owns the session, its own result will clear the flag.
            Err(TurnError::Busy) => {
                log::warn!("Turn refused, another turn is in flight");
                self.view.status = Some(BUSY_MESSAGE.to_string());
            }
            Err(e) => {
                self.view.processing = false;
                self.view.story = format!("Error: {e}");
            }
        }
    }

    /// Copies the latest reveal frame into the view; called before each draw.
    pub fn sync_reveal(&mut self) {
        let Some(reveal) = &self.reveal else {
            return;
        };
        let frame = reveal.frame();
        self.view.story = frame.text;
        if frame.done {
            self.view.revealing = false;
            self.reveal = None;
        }
    }

    fn start_listening(&mut self) {
        let Some(recognizer) = self.recognizer.clone() else {
            self.view.status = Some("Voice input is not configured".to_string());
            return;
        };
        if self.view.listening || self.view.processing {
            return;
        }
        self.view.listening = true;
        self.view.status = None;

        let limit = self.listen_timeout;
        let sender = self.action_sender.clone();
        tokio::spawn(async move {
            let heard = listen(recognizer.as_ref(), limit).await;
            let _ = sender.send(Action::Heard(heard));
        });
    }

    fn toggle_voice_output(&mut self) {
        if !self.view.voice_available {
            self.view.status = Some("Voice output is not configured".to_string());
            return;
        }
        let enabled = !self.session.voice_output();
        self.session.set_voice_output(enabled);
        self.view.voice_output = enabled;
        self.view.status = Some(format!(
            "Narrator voice {}",
            if enabled { "on" } else { "off" }
        ));
    }
}
