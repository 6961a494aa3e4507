// ui/mod.rs

pub mod game;
pub mod spinner;

use ratatui::{
    Frame,
    layout::Alignment,
    style::{Color, Style},
    widgets::Paragraph,
};

pub use game::{GameLayout, GameView};

pub const MIN_WIDTH: u16 = 60;
pub const MIN_HEIGHT: u16 = 20;

/// Draws the whole screen and returns the layout used, for mouse hit-testing.
/// Returns `None` when the terminal is too small to lay the game out.
pub fn draw(f: &mut Frame, view: &GameView) -> Option<GameLayout> {
    let size = f.area();
    if size.width < MIN_WIDTH || size.height < MIN_HEIGHT {
        let warning = Paragraph::new("Terminal too small. Please resize.")
            .style(Style::default().fg(Color::Red))
            .alignment(Alignment::Center);
        f.render_widget(warning, size);
        return None;
    }

    let layout = GameLayout::new(size);
    game::draw_game(f, view, &layout);
    Some(layout)
}
