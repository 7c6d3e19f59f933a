use abn::{resolve, Allocation, CardType, InstanceId, Outcome, ALL_CARD_TYPES};
use abn_client::{init_logging, Bot, PlayerArgs, RoundReport, TableView};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{seq::SliceRandom, SeedableRng};
use tracing::debug;

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

    GreedyBot { rng }.run(&args.player)
}

struct GreedyBot {
    rng: StdRng,
}

/// How good it is to play `card_type` against each card the opponent may still have.
///
/// A win counts for much more than the damage it deals. Without knowledge of
/// the opponent's cards, every type is assumed equally likely.
fn expected_gain(card_type: CardType, opponent: Option<&Allocation>) -> i64 {
    let weigh = |opponent_type: CardType, quantity: u32| {
        let clash = resolve(card_type, opponent_type);
        let points = match clash.outcome {
            Outcome::Win => 100 + i64::from(clash.opponent_damage),
            Outcome::Draw => 50,
            Outcome::Lose => -i64::from(clash.local_damage),
        };
        points * i64::from(quantity)
    };
    match opponent {
        Some(allocation) => allocation.known().map(|(t, q)| weigh(t, q)).sum(),
        None => ALL_CARD_TYPES.iter().map(|&t| weigh(t, 1)).sum(),
    }
}

impl GreedyBot {
    fn best_card(&mut self, view: &TableView<'_>) -> Option<InstanceId> {
        let mut top_choices: Vec<InstanceId> = Vec::new();
        let mut top_score = i64::MIN;
        for card in view.hand.iter() {
            let score = expected_gain(card.card_type, view.opponent_remaining);
            match score.cmp(&top_score) {
                std::cmp::Ordering::Less => {}
                std::cmp::Ordering::Equal => {
                    top_choices.push(card.id);
                }
                std::cmp::Ordering::Greater => {
                    top_choices = vec![card.id];
                    top_score = score;
                }
            }
        }
        top_choices.choose(&mut self.rng).copied()
    }
}

impl Bot for GreedyBot {
    fn choose_card(&mut self, view: &TableView<'_>) -> Option<InstanceId> {
        self.best_card(view)
    }

    fn round_finished(&mut self, report: &RoundReport) {
        debug!(
            played = %report.local_card,
            against = %report.opponent_card,
            outcome = %report.local_outcome,
        );
    }
}

#[cfg(test)]
mod tests {
    use abn::{build_hand, Side};
    use abn_client::{Health, Score};

    use super::*;

    #[test]
    fn plays_the_strongest_counter() {
        let hand = build_hand(
            &Allocation::new()
                .with(CardType::Neutral, 2)
                .with(CardType::StrongAcid, 1)
                .with(CardType::WeakAcid, 1),
        );
        let opponent = Allocation::new().with(CardType::WeakBase, 3);
        let view = TableView {
            side: Side::A,
            hand: &hand,
            opponent_remaining: Some(&opponent),
            score: Score::default(),
            health: Health::default(),
            rounds_played: 0,
        };
        let mut bot = GreedyBot {
            rng: StdRng::seed_from_u64(0),
        };
        let choice = bot.choose_card(&view).unwrap();
        assert_eq!(hand.get(choice).unwrap().card_type, CardType::StrongAcid);
    }

    #[test]
    fn nothing_to_choose_from() {
        let hand = build_hand(&Allocation::new());
        let view = TableView {
            side: Side::B,
            hand: &hand,
            opponent_remaining: None,
            score: Score::default(),
            health: Health::default(),
            rounds_played: 0,
        };
        let mut bot = GreedyBot {
            rng: StdRng::seed_from_u64(0),
        };
        assert_eq!(bot.choose_card(&view), None);
    }

    #[test]
    fn a_win_beats_any_amount_of_draws() {
        // Neutral draws against neutral, weak acid loses to it by one
        let neutral = Allocation::new().with(CardType::Neutral, 1);
        assert_eq!(expected_gain(CardType::Neutral, Some(&neutral)), 50);
        assert_eq!(expected_gain(CardType::WeakAcid, Some(&neutral)), -1);
        assert!(expected_gain(CardType::StrongAcid, Some(&neutral)) > 100);
    }
}
