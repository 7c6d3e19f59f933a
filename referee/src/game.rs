use std::cmp::Ordering;
use std::sync::Mutex;
use std::time::Duration;

use abn::{Side, TeamId};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::json;
use tracing::{debug, info};

use crate::{MatchConfig, MatchTable, Player, PlayerConfig, Recorder};

pub enum MatchResult {
    WonByPlayer { player_idx: usize },
    Tie,
}

/// How a match went, per player (not per side).
pub struct MatchOutcome {
    pub result: MatchResult,
    pub scores: [u32; 2],
    pub rounds: usize,
    pub session_id: String,
}

/// The arguments a player process gets to find its session.
///
/// The team id is passed the way the surrounding application stores a user.
pub fn session_args(session_id: &str, team_id: &TeamId, post_id: Option<u32>) -> Vec<String> {
    let mut args = vec![
        String::from("--session-id"),
        String::from(session_id),
        String::from("--user"),
        json!({ "id_tim": team_id }).to_string(),
    ];
    if let Some(post_id) = post_id {
        args.push(String::from("--post-id"));
        args.push(post_id.to_string());
    }
    args
}

/// Plays one match between two player processes.
///
/// Returns an error only on communication failure or timeout.
pub async fn play_match(
    rng: &mut StdRng,
    players: [&PlayerConfig; 2],
    match_config: &MatchConfig,
    table: &Mutex<MatchTable>,
    recorder: &mut Option<Recorder>,
    timeout: Duration,
) -> anyhow::Result<MatchOutcome> {
    // Assign the players to the sides randomly
    let player_for_side = {
        let mut arr = [0, 1];
        arr.shuffle(rng);
        arr
    };
    let teams = [
        players[player_for_side[0]].team_id.clone(),
        players[player_for_side[1]].team_id.clone(),
    ];
    let session_id = format!("match-{:016x}", rng.gen::<u64>());
    debug!(
        session_id,
        tim1 = players[player_for_side[0]].nick,
        tim2 = players[player_for_side[1]].nick,
        "Assigned sides"
    );

    table
        .lock()
        .map_err(|_| anyhow::anyhow!("The match table lock is poisoned"))?
        .open_session(
            &session_id,
            match_config.post_id,
            teams,
            [&match_config.hand, &match_config.hand],
        )?;

    let mut spawned = Vec::with_capacity(2);
    for config in players {
        let args = session_args(&session_id, &config.team_id, match_config.post_id);
        spawned.push(Player::spawn(config, &args)?);
    }
    let [mut player_1, mut player_2]: [Player; 2] = spawned
        .try_into()
        .map_err(|_| anyhow::anyhow!("Expected exactly two players"))?;

    let served = {
        let recorder = recorder.as_ref();
        tokio::time::timeout(timeout, async {
            tokio::try_join!(
                player_1.serve(table, recorder),
                player_2.serve(table, recorder)
            )
        })
        .await
    };
    let standings = table
        .lock()
        .map_err(|_| anyhow::anyhow!("The match table lock is poisoned"))?
        .close_session(&session_id)
        .ok_or_else(|| anyhow::anyhow!("Session '{}' disappeared", session_id))?;
    let (requests_1, requests_2) = match served {
        Ok(result) => result?,
        Err(_) => anyhow::bail!("Match {} timed out after {:?}", session_id, timeout),
    };
    debug!(session_id, requests_1, requests_2, "Players are done");

    if let Some(rec) = recorder {
        let path = rec.write_match_recording()?;
        debug!(path = %path.display(), "Recorded match");
    }

    // Report who won
    let side_of_player = |player_idx: usize| {
        if player_for_side[0] == player_idx {
            Side::A
        } else {
            Side::B
        }
    };
    let scores = [
        standings.scores[side_of_player(0).index()],
        standings.scores[side_of_player(1).index()],
    ];
    let result = match scores[0].cmp(&scores[1]) {
        Ordering::Less => MatchResult::WonByPlayer { player_idx: 1 },
        Ordering::Equal => MatchResult::Tie,
        Ordering::Greater => MatchResult::WonByPlayer { player_idx: 0 },
    };
    info!(
        session_id,
        post_id = ?standings.post_id,
        score_1 = scores[0],
        score_2 = scores[1],
        rounds = standings.rounds_resolved,
        "Match over"
    );
    Ok(MatchOutcome {
        result,
        scores,
        rounds: standings.rounds_resolved,
        session_id,
    })
}
