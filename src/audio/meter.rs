//! Level metering for narration and music output.

/// Lowest level reported, used for digital silence.
pub const DBFS_FLOOR: f32 = -100.0;

/// Root mean square of a block of samples; 0 for an empty block.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}

/// Combined level of two uncorrelated sources.
pub fn combined_rms(a: f32, b: f32) -> f32 {
    (a * a + b * b).sqrt()
}

pub fn to_dbfs(level: f32) -> f32 {
    if level <= 0.0 || !level.is_finite() {
        return DBFS_FLOOR;
    }
    (20.0 * level.log10()).max(DBFS_FLOOR)
}

/// Coarse zone for a level meter display. Each threshold is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelZone {
    Quiet,
    Normal,
    Hot,
    Clipping,
}

impl LevelZone {
    pub fn from_dbfs(db: f32) -> Self {
        if db > 0.0 {
            LevelZone::Clipping
        } else if db > -6.0 {
            LevelZone::Hot
        } else if db > -20.0 {
            LevelZone::Normal
        } else {
            LevelZone::Quiet
        }
    }
}

/// Per-source levels of one mixed block, measured after gain and before
/// the final limiter.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MixLevels {
    pub narration: f32,
    pub music: f32,
}

impl MixLevels {
    pub fn combined(&self) -> f32 {
        combined_rms(self.narration, self.music)
    }

    pub fn dbfs(&self) -> f32 {
        to_dbfs(self.combined())
    }

    pub fn zone(&self) -> LevelZone {
        LevelZone::from_dbfs(self.dbfs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rms() {
        assert_eq!(rms(&[]), 0.0);
        assert!((rms(&[0.5, -0.5, 0.5, -0.5]) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_combined() {
        assert!((combined_rms(0.3, 0.4) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_dbfs() {
        assert_eq!(to_dbfs(0.0), DBFS_FLOOR);
        assert_eq!(to_dbfs(1e-9), DBFS_FLOOR);
        assert!((to_dbfs(1.0)).abs() < 1e-6);
        assert!((to_dbfs(0.5) + 6.0206).abs() < 1e-3);
    }

    #[test]
    fn test_zones() {
        assert_eq!(LevelZone::from_dbfs(-40.0), LevelZone::Quiet);
        assert_eq!(LevelZone::from_dbfs(-20.0), LevelZone::Quiet);
        assert_eq!(LevelZone::from_dbfs(-12.0), LevelZone::Normal);
        assert_eq!(LevelZone::from_dbfs(-3.0), LevelZone::Hot);
        assert_eq!(LevelZone::from_dbfs(0.0), LevelZone::Hot);
        assert_eq!(LevelZone::from_dbfs(0.5), LevelZone::Clipping);
    }

    #[test]
    fn test_mix_levels_zone() {
        let quiet = MixLevels::default();
        assert_eq!(quiet.dbfs(), DBFS_FLOOR);
        assert_eq!(quiet.zone(), LevelZone::Quiet);

        let hot = MixLevels {
            narration: 0.6,
            music: 0.0,
        };
        assert_eq!(hot.zone(), LevelZone::Hot);

        // 0.8 and 0.8 combine to about 1.13, over full scale
        let clipping = MixLevels {
            narration: 0.8,
            music: 0.8,
        };
        assert_eq!(clipping.zone(), LevelZone::Clipping);
    }
}
