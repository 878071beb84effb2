//! Process settings: ladder, regiments and limits from a TOML file.
//!
//! Credentials stay in the environment (`.env`); this file only carries
//! the guild-specific tables that shape rank computation.

use meritum_core::{AwardLimits, RankTier, Regiment};
use serde::Deserialize;

/// Deserialized settings file
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Rank tiers, ascending by threshold
    pub ladder: Vec<RankTier>,
    /// Regiment placements, in precedence order
    pub regiments: Vec<Regiment>,
    /// Advisory award limits
    #[serde(default)]
    pub limits: AwardLimits,
}

impl Settings {
    /// Load from a config file (TOML), e.g. `config/default`
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?
            .try_deserialize::<Settings>()?;
        Ok(settings)
    }
}
