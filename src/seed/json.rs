use super::*;
use anyhow::Context;
use std::path::PathBuf;
use tracing::info;

#[derive(Clone, Debug)]
pub struct JsonSeedSource {
    path: PathBuf,
}

impl JsonSeedSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn parse(content: &str) -> Result<Seed> {
        let seed: Seed = serde_json::from_str(content)?;
        seed.validate()?;
        Ok(seed)
    }
}

impl SeedSource for JsonSeedSource {
    fn load(&self) -> Result<Seed> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read seed {}", self.path.display()))?;
        let seed = Self::parse(&content)
            .with_context(|| format!("invalid seed {}", self.path.display()))?;
        info!(
            path = %self.path.display(),
            lots = seed.lots.len(),
            bidders = seed.bidders.len(),
            "seed loaded"
        );
        Ok(seed)
    }
}
