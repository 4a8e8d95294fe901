//! Playback state machine.

/// Playback state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlaybackState {
    /// Stopped - not playing; the clock rewinds here after finishing
    #[default]
    Stopped,
    /// Playing - elapsed time advances on every tick
    Playing,
    /// Paused - elapsed time frozen
    Paused,
}

impl PlaybackState {
    /// Check if currently playing
    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackState::Playing)
    }

    /// Check if paused
    pub fn is_paused(&self) -> bool {
        matches!(self, PlaybackState::Paused)
    }

    /// Check if stopped
    pub fn is_stopped(&self) -> bool {
        matches!(self, PlaybackState::Stopped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicates() {
        assert!(PlaybackState::default().is_stopped());
        assert!(PlaybackState::Playing.is_playing());
        assert!(PlaybackState::Paused.is_paused());
        assert!(!PlaybackState::Paused.is_playing());
    }
}
