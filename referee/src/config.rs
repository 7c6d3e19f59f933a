use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use abn::{Allocation, TeamId, ALL_CARD_TYPES};
use serde::{Deserialize, Serialize};

/// How to start a player, and which team it plays for.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    pub nick: String,
    pub team_id: TeamId,
    /// The executable.
    pub cmd: String,
    /// Extra arguments, before the session arguments the referee adds.
    #[serde(default)]
    pub args: Vec<String>,
}

impl PlayerConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

/// What every match of a run is played with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchConfig {
    #[serde(default)]
    pub post_id: Option<u32>,
    /// Dealt to both sides.
    #[serde(default = "default_hand")]
    pub hand: Allocation,
}

fn default_hand() -> Allocation {
    ALL_CARD_TYPES
        .iter()
        .fold(Allocation::new(), |hand, &card_type| hand.with(card_type, 2))
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            post_id: None,
            hand: default_hand(),
        }
    }
}

impl MatchConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let config: MatchConfig = serde_json::from_reader(reader)?;
        if config.hand.is_empty() {
            anyhow::bail!("The hand in '{}' has no known card types", path.display());
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use abn::CardType;

    use super::*;

    #[test]
    fn load_configs() {
        let dir = tempfile::tempdir().unwrap();
        let player_path = dir.path().join("random.json");
        let mut file = File::create(&player_path).unwrap();
        write!(
            file,
            r#"{{"nick": "Random", "team_id": 4, "cmd": "target/release/random_bot"}}"#
        )
        .unwrap();
        let player = PlayerConfig::load(&player_path).unwrap();
        assert_eq!(player.team_id, TeamId::Number(4));
        assert!(player.args.is_empty());

        let match_path = dir.path().join("match.json");
        let mut file = File::create(&match_path).unwrap();
        write!(file, r#"{{"post_id": 2, "hand": {{"asam_kuat": 3, "netral": 1, "garam": 9}}}}"#)
            .unwrap();
        let config = MatchConfig::load(&match_path).unwrap();
        assert_eq!(config.post_id, Some(2));
        assert_eq!(config.hand.total(), 4);
        assert_eq!(config.hand.quantity(CardType::StrongAcid), 3);

        let mut file = File::create(&match_path).unwrap();
        write!(file, r#"{{"hand": {{"garam": 9}}}}"#).unwrap();
        assert!(MatchConfig::load(&match_path).is_err());
    }

    #[test]
    fn default_match() {
        let config = MatchConfig::default();
        assert_eq!(config.hand.total(), 10);
        assert_eq!(serde_json::from_str::<MatchConfig>("{}").unwrap(), config);
    }
}
