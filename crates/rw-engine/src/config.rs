//! Configuration for a game.

use chrono::NaiveDateTime;

/// Configuration for a game session.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base RNG seed; every action derives its own rng from it.
    pub seed: u64,
    /// Game minutes that pass per non-system action.
    pub turn_minutes: u64,
    /// In-game start time; overrides the module's.
    pub start_time: Option<NaiveDateTime>,
    /// Minimum Jaro-Winkler similarity for fuzzy name matches.
    pub fuzzy_threshold: f64,
    /// Let the engine play the monsters' side.
    pub auto_monsters: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            turn_minutes: 10,
            start_time: None,
            fuzzy_threshold: 0.8,
            auto_monsters: false,
        }
    }
}

impl EngineConfig {
    /// Set the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the game minutes per action.
    pub fn with_turn_minutes(mut self, minutes: u64) -> Self {
        self.turn_minutes = minutes;
        self
    }

    /// Set the in-game start time.
    pub fn with_start_time(mut self, start: NaiveDateTime) -> Self {
        self.start_time = Some(start);
        self
    }

    /// Set the fuzzy-match threshold (clamped to 0.0-1.0).
    pub fn with_fuzzy_threshold(mut self, threshold: f64) -> Self {
        self.fuzzy_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Let the engine play monster turns.
    pub fn with_auto_monsters(mut self, auto: bool) -> Self {
        self.auto_monsters = auto;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.seed, 42);
        assert_eq!(cfg.turn_minutes, 10);
        assert!(cfg.start_time.is_none());
        assert!((cfg.fuzzy_threshold - 0.8).abs() < f64::EPSILON);
        assert!(!cfg.auto_monsters);
    }

    #[test]
    fn builder_methods() {
        let cfg = EngineConfig::default()
            .with_seed(123)
            .with_turn_minutes(5)
            .with_auto_monsters(true);
        assert_eq!(cfg.seed, 123);
        assert_eq!(cfg.turn_minutes, 5);
        assert!(cfg.auto_monsters);
    }

    #[test]
    fn threshold_clamped() {
        let cfg = EngineConfig::default().with_fuzzy_threshold(1.5);
        assert!((cfg.fuzzy_threshold - 1.0).abs() < f64::EPSILON);
    }
}
