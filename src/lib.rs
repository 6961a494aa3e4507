pub mod ai;
pub mod app;
pub mod audio;
pub mod choices;
pub mod cleanup;
pub mod error;
pub mod game_state;
pub mod history;
pub mod logging;
pub mod message;
pub mod orchestrator;
pub mod prompts;
pub mod reveal;
pub mod settings;
pub mod speech;
pub mod tui;
pub mod ui;

// Re-export commonly used items for easier access
pub use ai::{CompletionProvider, GameAI, GenerationParams};
pub use choices::{Choice, ChoiceExtractor, Extraction, ExtractionTier};
pub use error::{AIError, AppError, AudioError, TurnError};
pub use game_state::{FixedDrift, RandomDrift, SanityDrift, StoryState, StoryStateMachine};
pub use history::ConversationHistory;
pub use message::{Role, Turn};
pub use orchestrator::{OrchestratorConfig, Session, TurnOrchestrator, TurnResult};
pub use settings::Settings;
