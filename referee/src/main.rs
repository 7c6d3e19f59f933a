use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use referee::{play_match, MatchConfig, MatchResult, MatchTable, PlayerConfig, Recorder};
use tracing::{debug, info, warn};
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
struct Args {
    /// Path to the config JSON files of the two players
    #[clap(num_args(2), value_delimiter = ' ')]
    player_configs: Vec<PathBuf>,

    /// How many matches to play
    #[arg(short, long, default_value_t = 10)]
    num_matches: usize,

    /// RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Path to a JSON file with the post id and the hand dealt to each side
    #[arg(short, long)]
    match_config: Option<PathBuf>,

    /// Record the matches' requests as JSON files into this directory
    #[arg(short, long)]
    record_games_to_directory: Option<PathBuf>,

    /// Give up on a match after this many seconds
    #[arg(short, long, default_value_t = 300)]
    timeout_secs: u64,

    /// A log level among "off", "error", "warn", "info", "debug", "trace"
    #[arg(short, long, default_value = "info")]
    log_level: LevelFilter,
}

#[derive(Default)]
struct SeriesScore {
    wins: [usize; 2],
    rounds_won: [u32; 2],
    ties: usize,
    failed: usize,
}

async fn play_series(
    players: [&PlayerConfig; 2],
    match_config: &MatchConfig,
    num_matches: usize,
    rng: &mut StdRng,
    recorder: &mut Option<Recorder>,
    timeout: Duration,
) -> anyhow::Result<SeriesScore> {
    let table = Mutex::new(MatchTable::new());
    let mut series_score = SeriesScore::default();

    for match_idx in 0..num_matches {
        let outcome =
            match play_match(rng, players, match_config, &table, recorder, timeout).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(match_idx, "Match could not be completed");
                    for cause in err.chain() {
                        warn!("{}", cause);
                    }
                    series_score.failed += 1;
                    continue;
                }
            };
        series_score.rounds_won[0] += outcome.scores[0];
        series_score.rounds_won[1] += outcome.scores[1];
        match outcome.result {
            MatchResult::WonByPlayer { player_idx } => {
                debug!(winner = players[player_idx].nick, match_idx);
                series_score.wins[player_idx] += 1;
            }
            MatchResult::Tie => {
                debug!(match_idx, "Tie");
                series_score.ties += 1;
            }
        }
    }

    Ok(series_score)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    initialize_logging(args.log_level);

    // Get a random seed
    let seed = args.seed.unwrap_or_else(rand::random);
    info!(seed);
    let mut rng = StdRng::seed_from_u64(seed);

    let mut recorder = if let Some(dir_path) = args.record_games_to_directory {
        Some(Recorder::new(dir_path)?)
    } else {
        None
    };

    let match_config = match &args.match_config {
        Some(path) => MatchConfig::load(path)?,
        None => MatchConfig::default(),
    };

    let player_configs = args
        .player_configs
        .iter()
        .map(|path| PlayerConfig::load(path))
        .collect::<Result<Vec<PlayerConfig>, anyhow::Error>>()?;
    let [player_1, player_2] = player_configs.as_slice() else {
        anyhow::bail!("Expected exactly two player configs");
    };
    if player_1.team_id == player_2.team_id {
        anyhow::bail!("Both players are configured with team id {}", player_1.team_id);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let score = runtime.block_on(play_series(
        [player_1, player_2],
        &match_config,
        args.num_matches,
        &mut rng,
        &mut recorder,
        Duration::from_secs(args.timeout_secs),
    ))?;

    let failed = if score.failed > 0 {
        format!("\n- {} matches could not be completed", score.failed)
    } else {
        String::new()
    };
    eprintln!(
        "End result:\n- {} wins by {} ({} rounds won)\n- {} wins by {} ({} rounds won)\n- {} ties{}",
        score.wins[0],
        player_1.nick,
        score.rounds_won[0],
        score.wins[1],
        player_2.nick,
        score.rounds_won[1],
        score.ties,
        failed
    );

    Ok(())
}

fn initialize_logging(level: LevelFilter) {
    let format = tracing_subscriber::fmt::format()
        .with_target(false)
        .compact();

    let filter = Targets::new().with_default(level);

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().event_format(format))
        .with(filter)
        .init();
}
