use abn::InstanceId;
use abn_client::{init_logging, Bot, PlayerArgs, TableView};
use clap::Parser;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

#[derive(Parser)]
struct Args {
    #[command(flatten)]
    player: PlayerArgs,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.player.log_level);
    let seed = args.player.seed.unwrap_or_else(rand::random);
    let rng = StdRng::seed_from_u64(seed);

    RandomBot { rng }.run(&args.player)
}

struct RandomBot {
    rng: StdRng,
}

impl Bot for RandomBot {
    fn choose_card(&mut self, view: &TableView<'_>) -> Option<InstanceId> {
        let ids: Vec<InstanceId> = view.hand.iter().map(|card| card.id).collect();
        ids.choose(&mut self.rng).copied()
    }
}
