//! Backend configuration and session identities.

use colony_wars_core::PlayerId;
use colony_wars_simulation::SimulationConfig;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Storage key of the shared world blob.
pub const DEFAULT_STORAGE_KEY: &str = "insectColonyWarsState";
/// Storage key remembering the session identity.
pub const IDENTITY_KEY: &str = "mockIdentity";

const IDENTITY_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const IDENTITY_SUFFIX_LEN: usize = 9;

/// Configuration of a [`crate::MockBackend`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Key of the world blob in storage.
    pub storage_key: String,
    /// Fixed session identity. A remembered or generated one is used when absent.
    pub identity: Option<String>,
    /// Tick engine settings.
    pub simulation: SimulationConfig,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_owned(),
            identity: None,
            simulation: SimulationConfig::default(),
        }
    }
}

/// Generates a `player_` identity with a random lowercase alphanumeric suffix.
pub fn generate_identity(rng: &mut impl Rng) -> PlayerId {
    let suffix: String = (0..IDENTITY_SUFFIX_LEN)
        .map(|_| {
            let index = rng.gen_range(0..IDENTITY_ALPHABET.len());
            char::from(IDENTITY_ALPHABET[index])
        })
        .collect();
    PlayerId::new(format!("player_{suffix}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use colony_wars_world::seeded_rng;

    #[test]
    fn identities_have_the_session_shape() {
        let identity = generate_identity(&mut seeded_rng(5));
        let suffix = identity
            .as_str()
            .strip_prefix("player_")
            .expect("prefix");
        assert_eq!(suffix.len(), 9);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn nested_simulation_settings_load_from_toml() {
        let config: BackendConfig = toml::from_str(
            "identity = \"player_fixed0001\"\n[simulation]\nrng_seed = 3\n",
        )
        .expect("config");
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
        assert_eq!(config.identity.as_deref(), Some("player_fixed0001"));
        assert_eq!(config.simulation.rng_seed, 3);
        assert_eq!(config.simulation.tick_interval_ms, 100);
    }
}
