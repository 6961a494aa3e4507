use crate::choices::{Choice, ExtractionTier};
use crate::game_state::StoryState;
use crate::prompts::GAME_TITLE;
use crate::ui::spinner::{Spinner, spinner_frame};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Flex, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

pub const INPUT_MAX_CHARS: usize = 50;
const CHOICE_LABEL_CHARS: usize = 60;

/// What the screen shows. The app mutates it, the draw functions only read it.
#[derive(Debug, Clone, Default)]
pub struct GameView {
    pub story: String,
    pub revealing: bool,
    pub choices: Option<[Choice; 2]>,
    pub tier: Option<ExtractionTier>,
    pub state: StoryState,
    pub history_len: usize,
    pub input: String,
    pub input_active: bool,
    pub listening: bool,
    pub processing: bool,
    pub show_help: bool,
    pub show_debug: bool,
    pub voice_output: bool,
    pub voice_available: bool,
    pub voice_input_available: bool,
    pub status: Option<String>,
    pub hovered: Option<usize>,
    pub spinner: Spinner,
}

impl GameView {
    pub fn choices_visible(&self) -> bool {
        !self.processing && !self.revealing && self.choices.is_some()
    }

    /// Adds a character to the input line unless it is already full.
    pub fn push_char(&mut self, c: char) -> bool {
        if self.input.chars().count() >= INPUT_MAX_CHARS {
            return false;
        }
        self.input.push(c);
        true
    }

    pub fn pop_char(&mut self) {
        self.input.pop();
    }

    /// Empties the input line and returns its trimmed text, if any.
    pub fn take_input(&mut self) -> Option<String> {
        let text = std::mem::take(&mut self.input);
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameLayout {
    pub status: Rect,
    pub story: Rect,
    pub choices: [Rect; 2],
    pub input: Rect,
}

impl GameLayout {
    pub fn new(area: Rect) -> Self {
        let [status, story, choice_row, input] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(5),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .areas(area);
        let choices =
            Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
                .areas(choice_row);
        Self {
            status,
            story,
            choices,
            input,
        }
    }

    pub fn choice_at(&self, position: Position) -> Option<usize> {
        self.choices.iter().position(|area| area.contains(position))
    }

    pub fn input_contains(&self, position: Position) -> bool {
        self.input.contains(position)
    }
}

pub fn draw_game(f: &mut Frame, view: &GameView, layout: &GameLayout) {
    draw_status(f, view, layout.status);
    draw_story(f, view, layout.story);
    if view.choices_visible() {
        draw_choices(f, view, &layout.choices);
    }
    draw_user_input(f, view, layout.input);

    if view.show_debug {
        draw_debug(f, view);
    }
    if view.show_help {
        draw_help(f);
    }
}

fn draw_status(f: &mut Frame, view: &GameView, area: Rect) {
    let [left, right] =
        Layout::horizontal([Constraint::Fill(1), Constraint::Length(32)]).areas(area);

    let mut spans = vec![Span::styled(
        format!(" {GAME_TITLE} "),
        Style::default()
            .fg(Color::Magenta)
            .add_modifier(Modifier::BOLD),
    )];
    match &view.status {
        Some(status) => spans.push(Span::styled(
            format!(" {status}"),
            Style::default().fg(Color::Yellow),
        )),
        None => spans.push(Span::styled(
            " Press 'h' for help",
            Style::default().fg(Color::DarkGray),
        )),
    }
    f.render_widget(Paragraph::new(Line::from(spans)), left);

    let indicator = if view.listening {
        Span::styled(
            " Listening... ",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )
    } else if view.processing {
        Span::styled(spinner_frame(&view.spinner), Style::default().fg(Color::Green))
    } else {
        Span::raw("")
    };
    f.render_widget(
        Paragraph::new(Line::from(indicator)).alignment(Alignment::Right),
        right,
    );
}

/// Wraps the story to the panel width and keeps the newest lines in view.
pub fn visible_story_lines(text: &str, width: usize, height: usize) -> Vec<String> {
    let lines: Vec<String> = textwrap::wrap(text, width.max(1))
        .into_iter()
        .map(|line| line.into_owned())
        .collect();
    let skip = lines.len().saturating_sub(height);
    lines.into_iter().skip(skip).collect()
}

fn draw_story(f: &mut Frame, view: &GameView, area: Rect) {
    let block = Block::default()
        .title(" Story ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let lines: Vec<Line> = visible_story_lines(
        &view.story,
        inner.width.saturating_sub(1) as usize,
        inner.height as usize,
    )
    .into_iter()
    .map(Line::from)
    .collect();

    f.render_widget(Paragraph::new(lines), inner);
}

fn draw_choices(f: &mut Frame, view: &GameView, areas: &[Rect; 2]) {
    let Some(choices) = &view.choices else {
        return;
    };
    for (index, (choice, area)) in choices.iter().zip(areas).enumerate() {
        let hovered = view.hovered == Some(index);
        let style = if hovered {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Yellow)
        };
        let button = Paragraph::new(format!("{}. {}", index + 1, choice.label(CHOICE_LABEL_CHARS)))
            .style(style)
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(if hovered {
                        Color::Yellow
                    } else {
                        Color::DarkGray
                    })),
            );
        f.render_widget(button, *area);
    }
}

fn draw_user_input(f: &mut Frame, view: &GameView, area: Rect) {
    let title = if view.input_active {
        " Typing... Enter to send, Esc to cancel "
    } else if view.voice_input_available {
        " Press 'i' or click here to type, 'v' to speak "
    } else {
        " Press 'i' or click here to type "
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if view.input_active {
            Color::White
        } else {
            Color::DarkGray
        }));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let input = Paragraph::new(view.input.as_str()).style(Style::default().fg(
        if view.input_active {
            Color::Yellow
        } else {
            Color::DarkGray
        },
    ));
    f.render_widget(input, inner);

    if view.input_active {
        let offset = view.input.chars().count() as u16;
        f.set_cursor_position(Position::new(
            (inner.x + offset).min(inner.right().saturating_sub(1)),
            inner.y,
        ));
    }
}

fn draw_help(f: &mut Frame) {
    let area = centered_rect(60, 60, f.area());
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));
    let lines = vec![
        Line::from(vec![key("1 / 2     "), Span::raw("pick a choice (or click it)")]),
        Line::from(vec![key("← / →     "), Span::raw("highlight a choice, Enter picks it")]),
        Line::from(vec![key("i         "), Span::raw("type your own action (or click the input)")]),
        Line::from(vec![key("Enter     "), Span::raw("send what you typed")]),
        Line::from(vec![key("v         "), Span::raw("speak your action")]),
        Line::from(vec![key("m         "), Span::raw("toggle the narrator voice")]),
        Line::from(vec![key("d         "), Span::raw("show story details")]),
        Line::from(vec![key("h         "), Span::raw("toggle this help")]),
        Line::from(vec![key("Esc       "), Span::raw("skip the text effect, or quit")]),
    ];
    let help = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title(" Help ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        );
    f.render_widget(Clear, area);
    f.render_widget(help, area);
}

fn draw_debug(f: &mut Frame, view: &GameView) {
    let area = centered_rect(50, 50, f.area());
    let state = &view.state;
    let mut lines = vec![
        Line::from(format!("Scene: {}", state.current_scene)),
        Line::from(format!("Path: {}", state.story_path)),
        Line::from(format!("Sanity: {}%", state.sanity)),
        Line::from(format!("Choices made: {}", state.choice_count())),
        Line::from(format!("Messages: {}", view.history_len)),
        Line::from(format!(
            "Voice output: {}",
            if view.voice_output { "on" } else { "off" }
        )),
    ];
    if let Some(tier) = view.tier {
        lines.push(Line::from(format!("Choice source: {tier}")));
    }
    for (scene, choice) in &state.choices_made {
        lines.push(Line::from(Span::styled(
            format!("  {scene}: {choice}"),
            Style::default().fg(Color::DarkGray),
        )));
    }
    let debug = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
        Block::default()
            .title(" Story details ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)),
    );
    f.render_widget(Clear, area);
    f.render_widget(debug, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let [area] = Layout::vertical([Constraint::Percentage(percent_y)])
        .flex(Flex::Center)
        .areas(area);
    let [area] = Layout::horizontal([Constraint::Percentage(percent_x)])
        .flex(Flex::Center)
        .areas(area);
    area
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_stops_at_limit() {
        let mut view = GameView::default();
        for _ in 0..INPUT_MAX_CHARS {
            assert!(view.push_char('é'));
        }
        assert!(!view.push_char('x'));
        assert_eq!(view.input.chars().count(), INPUT_MAX_CHARS);
    }

    #[test]
    fn blank_input_is_not_taken() {
        let mut view = GameView {
            input: "   ".to_string(),
            ..GameView::default()
        };
        assert_eq!(view.take_input(), None);
        view.input = "  open the door ".to_string();
        assert_eq!(view.take_input().as_deref(), Some("open the door"));
        assert!(view.input.is_empty());
    }

    #[test]
    fn story_keeps_latest_lines() {
        let lines = visible_story_lines("one two three four five six", 9, 2);
        assert_eq!(lines, vec!["four five", "six"]);
    }
}
