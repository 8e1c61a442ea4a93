//! Rate-limited "not ready" cue
//!
//! Mashing an ability on cooldown should not spam audio: the cue plays at most
//! once per interval per player, across all of that player's abilities.

use std::collections::HashMap;

use super::host::PlayerId;

#[derive(Debug, Default, Clone)]
pub struct CueThrottle {
    last_played: HashMap<PlayerId, f64>,
}

impl CueThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true (and records `now`) if the player's cue may play.
    pub fn try_fire(&mut self, player: PlayerId, now: f64, interval: f64) -> bool {
        match self.last_played.get(&player) {
            Some(last) if now - last < interval => false,
            _ => {
                self.last_played.insert(player, now);
                true
            }
        }
    }

    /// Forget a player (session ended)
    pub fn forget(&mut self, player: PlayerId) {
        self.last_played.remove(&player);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_once_per_interval() {
        let mut throttle = CueThrottle::new();
        assert!(throttle.try_fire(0, 10.0, 1.0));
        assert!(!throttle.try_fire(0, 10.5, 1.0));
        assert!(!throttle.try_fire(0, 10.99, 1.0));
        assert!(throttle.try_fire(0, 11.0, 1.0));
    }

    #[test]
    fn test_players_are_tracked_separately() {
        let mut throttle = CueThrottle::new();
        assert!(throttle.try_fire(0, 5.0, 1.0));
        assert!(throttle.try_fire(1, 5.1, 1.0));
        assert!(!throttle.try_fire(0, 5.2, 1.0));
    }

    #[test]
    fn test_forget_resets_player() {
        let mut throttle = CueThrottle::new();
        throttle.try_fire(3, 1.0, 1.0);
        throttle.forget(3);
        assert!(throttle.try_fire(3, 1.2, 1.0));
    }
}
