use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

pub const INITIAL_SCENE: &str = "intro";
pub const INITIAL_PATH: &str = "main";
pub const MAX_SANITY: u8 = 100;
pub const DEFAULT_SANITY_DRIFT: RangeInclusive<i32> = -5..=5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryState {
    pub current_scene: String,
    pub sanity: u8,
    pub choices_made: BTreeMap<String, String>,
    pub story_path: String,
}

impl Default for StoryState {
    fn default() -> Self {
        Self {
            current_scene: INITIAL_SCENE.to_string(),
            sanity: MAX_SANITY,
            choices_made: BTreeMap::new(),
            story_path: INITIAL_PATH.to_string(),
        }
    }
}

impl StoryState {
    pub fn choice_count(&self) -> usize {
        self.choices_made.len()
    }
}

pub fn scene_id(choice_count: usize) -> String {
    format!("scene_{choice_count}")
}

// Source of the per-choice sanity perturbation.
pub trait SanityDrift: Send {
    fn drift(&mut self, range: RangeInclusive<i32>) -> i32;
}

pub struct RandomDrift<R: Rng + Send = StdRng> {
    rng: R,
}

impl RandomDrift<StdRng> {
    pub fn from_os() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng + Send> RandomDrift<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng + Send> SanityDrift for RandomDrift<R> {
    fn drift(&mut self, range: RangeInclusive<i32>) -> i32 {
        if range.is_empty() {
            return 0;
        }
        self.rng.random_range(range)
    }
}

/// Always yields the same perturbation, whatever the configured range.
#[derive(Debug, Clone, Copy)]
pub struct FixedDrift(pub i32);

impl SanityDrift for FixedDrift {
    fn drift(&mut self, _range: RangeInclusive<i32>) -> i32 {
        self.0
    }
}

pub struct StoryStateMachine {
    state: StoryState,
    drift_range: RangeInclusive<i32>,
    drift: Box<dyn SanityDrift>,
}

impl StoryStateMachine {
    pub fn new(drift_range: RangeInclusive<i32>, drift: Box<dyn SanityDrift>) -> Self {
        Self {
            state: StoryState::default(),
            drift_range,
            drift,
        }
    }

    pub fn state(&self) -> &StoryState {
        &self.state
    }

    // Rolls back to a snapshot taken before a choice whose turn failed.
    pub fn restore(&mut self, state: StoryState) {
        self.state = state;
    }

    /// Commits `chosen` for the current scene, perturbs sanity and moves on to
    /// the scene generated from the new choice count.
    pub fn advance(&mut self, chosen: impl Into<String>) {
        let scene = std::mem::take(&mut self.state.current_scene);
        self.state.choices_made.insert(scene, chosen.into());

        let delta = self.drift.drift(self.drift_range.clone());
        let sanity = (self.state.sanity as i32).saturating_add(delta);
        self.state.sanity = sanity.clamp(0, MAX_SANITY as i32) as u8;

        self.state.current_scene = scene_id(self.state.choice_count());
        log::debug!(
            "Advanced to {} (sanity {}, drift {delta})",
            self.state.current_scene,
            self.state.sanity
        );
    }
}
