use std::path::PathBuf;
use std::time::Duration;

use abn::{InstanceId, Side};
use tracing::{info, warn};
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::{
    Health, JsonFileStore, LineService, MatchService, MemoryStore, Phase, PlayError, PollConfig,
    RoundReport, Score, SessionContext, SessionController, SessionStore, TableView,
};

/// A trait to simplify writing bots.
///
/// The bot only picks cards; [`drive`] takes care of the rest of a match.
pub trait Bot {
    fn new_match(&mut self, _side: Side) {}

    /// Picks the next card to commit, one of `view.hand`.
    ///
    /// Only called with a non-empty hand. Returning `None` aborts the match.
    fn choose_card(&mut self, view: &TableView<'_>) -> Option<InstanceId>;

    fn round_finished(&mut self, _report: &RoundReport) {}

    fn run(&mut self, args: &PlayerArgs) -> anyhow::Result<()>
    where
        Self: Sized,
    {
        let context = args.session_context()?;
        // Communication happens through stdin/stdout.
        // Stderr can be used for logging.
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let summary = runtime.block_on(play_over_stdio(self, args, context))?;
        info!(
            side = ?summary.side,
            won = summary.score.local,
            lost = summary.score.opponent,
            rounds = summary.rounds_played,
            "Match over"
        );
        Ok(())
    }
}

async fn play_over_stdio<B: Bot>(
    bot: &mut B,
    args: &PlayerArgs,
    context: SessionContext,
) -> anyhow::Result<MatchSummary> {
    play_against(bot, args, context, LineService::stdio()).await
}

/// Drives a match with the session store picked by `--state-dir`.
async fn play_against<B: Bot, S: MatchService>(
    bot: &mut B,
    args: &PlayerArgs,
    context: SessionContext,
    service: S,
) -> anyhow::Result<MatchSummary> {
    let poll = args.poll_config();
    match &args.state_dir {
        Some(dir) => {
            let store = JsonFileStore::new(dir)?;
            drive(bot, &mut SessionController::new(service, store, context, poll)).await
        }
        None => {
            let store = MemoryStore::default();
            drive(bot, &mut SessionController::new(service, store, context, poll)).await
        }
    }
}

/// How a match ended for the local side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatchSummary {
    pub side: Option<Side>,
    pub score: Score,
    pub health: Health,
    pub rounds_played: u32,
}

/// Plays a session until it ends.
///
/// Service failures are retried after the poll interval. Anything else is a
/// bug in the bot or the service and stops the match.
pub async fn drive<B, S, K>(
    bot: &mut B,
    controller: &mut SessionController<S, K>,
) -> anyhow::Result<MatchSummary>
where
    B: Bot,
    S: MatchService,
    K: SessionStore,
{
    let retry_delay = controller.poll_config().interval;
    loop {
        let result = match controller.phase() {
            Phase::Loading => controller.load().await.map(|_| {
                if let Some(side) = controller.side() {
                    bot.new_match(side);
                }
            }),
            Phase::Play if controller.hand().is_empty() => {
                match controller.refresh().await {
                    Ok(Phase::Play) => {
                        // The service still says we have cards. Give it some time.
                        tokio::time::sleep(retry_delay).await;
                    }
                    Ok(_) => {}
                    Err(err) => return Err(err.into()),
                }
                Ok(())
            }
            Phase::Play => {
                let choice = bot
                    .choose_card(&controller.table_view())
                    .ok_or_else(|| anyhow::anyhow!("The bot did not choose a card"))?;
                controller.select(choice)?;
                controller.confirm().await.map(|_| ())
            }
            Phase::Waiting => controller
                .await_round()
                .await
                .map(|report| bot.round_finished(&report)),
            Phase::Resolved => controller.continue_round().await.map(|_| ()),
            Phase::Ended => break,
        };
        retry_later(result, retry_delay).await?;
    }
    Ok(MatchSummary {
        side: controller.side(),
        score: controller.score(),
        health: controller.health(),
        rounds_played: controller.rounds_played(),
    })
}

async fn retry_later(result: Result<(), PlayError>, delay: Duration) -> Result<(), PlayError> {
    match result {
        Err(err) if err.is_retryable() => {
            warn!(%err, "Retrying in {:?}", delay);
            tokio::time::sleep(delay).await;
            Ok(())
        }
        other => other,
    }
}

/// The command line shared by all player processes.
#[derive(clap::Args, Clone, Debug)]
pub struct PlayerArgs {
    /// The game session to play in
    #[arg(long)]
    pub session_id: Option<String>,

    /// The stored game session, as JSON or a plain string
    #[arg(long)]
    pub session_payload: Option<String>,

    /// The stored user, as JSON
    #[arg(long)]
    pub user: Option<String>,

    /// The post the match is played at
    #[arg(long)]
    pub post_id: Option<u32>,

    /// Milliseconds between two polls for the opponent's card
    #[arg(long, default_value_t = 2000)]
    pub poll_interval_ms: u64,

    /// Milliseconds to wait before the first poll of a round
    #[arg(long, default_value_t = 1000)]
    pub first_poll_delay_ms: u64,

    /// Keep the session state as JSON files in this directory
    #[arg(long)]
    pub state_dir: Option<PathBuf>,

    /// RNG seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// A log level among "off", "error", "warn", "info", "debug", "trace"
    #[arg(long, default_value = "info")]
    pub log_level: LevelFilter,
}

impl PlayerArgs {
    /// An explicit `--session-id` wins over the one in the stored payload.
    pub fn session_context(&self) -> Result<SessionContext, PlayError> {
        let stored = self
            .session_payload
            .as_deref()
            .or(self.session_id.as_deref());
        let mut context = SessionContext::from_stored(stored, self.user.as_deref(), self.post_id)?;
        if let Some(session_id) = &self.session_id {
            context.session_id = session_id.clone();
        }
        Ok(context)
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(self.poll_interval_ms),
            first_poll_delay: Duration::from_millis(self.first_poll_delay_ms),
        }
    }
}

/// Logs to stderr, since stdout belongs to the match service.
pub fn init_logging(level: LevelFilter) {
    let format = tracing_subscriber::fmt::format()
        .with_target(false)
        .compact();

    let filter = Targets::new().with_default(level);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .event_format(format)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}
