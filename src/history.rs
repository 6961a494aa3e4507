use crate::message::{Role, Turn};

pub const DEFAULT_HISTORY_CAP: usize = 20;

#[derive(Debug, Clone)]
struct Entry {
    turn: Turn,
    // Marks the per-turn game state summary; only the latest one is kept.
    state_context: bool,
}

/// Rolling conversation sent to the model provider.
///
/// Holds at most `cap` turns. When the cap is exceeded the oldest non-system
/// turns are evicted first; system turns are never evicted, so a history made
/// only of system turns may grow past the cap. Relative order is preserved,
/// which keeps the opening instruction at position 0.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    entries: Vec<Entry>,
    cap: usize,
}

impl ConversationHistory {
    pub fn new(instructions: impl Into<String>, cap: usize) -> Self {
        let mut history = Self {
            entries: Vec::new(),
            cap,
        };
        history.append(Role::System, instructions);
        history
    }

    pub fn with_default_cap(instructions: impl Into<String>) -> Self {
        Self::new(instructions, DEFAULT_HISTORY_CAP)
    }

    pub fn append(&mut self, role: Role, content: impl Into<String>) {
        self.push(Turn::new(role, content), false);
    }

    /// Appends a system turn describing the current game state and retires the
    /// previous one, so state summaries do not pile up in the system slots.
    pub fn append_context(&mut self, content: impl Into<String>) {
        self.entries.retain(|entry| !entry.state_context);
        self.push(Turn::system(content), true);
    }

    pub fn as_sequence(&self) -> Vec<Turn> {
        self.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Turn> {
        self.entries.iter().map(|entry| &entry.turn)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    fn push(&mut self, turn: Turn, state_context: bool) {
        self.entries.push(Entry {
            turn,
            state_context,
        });
        self.trim();
    }

    fn trim(&mut self) {
        while self.entries.len() > self.cap {
            match self.entries.iter().position(|entry| !entry.turn.is_system()) {
                Some(oldest) => {
                    self.entries.remove(oldest);
                }
                None => break,
            }
        }
    }
}
