use std::sync::{Arc, Mutex};

use abn::{Allocation, CardType, InstanceId, Outcome, Side, TeamId};
use abn_client::{
    drive, Bot, MemoryStore, Phase, PollConfig, RoundReport, Score, SessionContext,
    SessionController, TableView, INITIAL_HEALTH,
};
use referee::{LocalService, MatchConfig, MatchTable};

const SESSION: &str = "battle-1";

type Controller = SessionController<LocalService, MemoryStore>;

fn teams() -> [TeamId; 2] {
    [TeamId::Number(101), TeamId::from("team-202")]
}

fn open(hand_a: Allocation, hand_b: Allocation) -> Arc<Mutex<MatchTable>> {
    let mut table = MatchTable::new();
    table
        .open_session(SESSION, None, teams(), [&hand_a, &hand_b])
        .unwrap();
    Arc::new(Mutex::new(table))
}

fn controller(table: &Arc<Mutex<MatchTable>>, team: TeamId) -> Controller {
    let context = SessionContext::new(SESSION).with_team_id(team.clone());
    SessionController::new(
        LocalService::new(Arc::clone(table), team),
        MemoryStore::default(),
        context,
        PollConfig::default(),
    )
}

async fn play_first_card(mut session: Controller) -> (Controller, RoundReport) {
    if session.phase() == Phase::Loading {
        assert_eq!(session.load().await.unwrap(), Phase::Play);
    }
    let id = session.hand().iter().next().unwrap().id;
    session.select(id).unwrap();
    session.confirm().await.unwrap();
    let report = session.await_round().await.unwrap();
    (session, report)
}

#[tokio::test(start_paused = true)]
async fn strong_acid_beats_weak_base() {
    let table = open(
        Allocation::new().with(CardType::StrongAcid, 1),
        Allocation::new().with(CardType::WeakBase, 1),
    );
    let [a, b] = teams();
    let side_a = tokio::spawn(play_first_card(controller(&table, a)));
    let side_b = tokio::spawn(play_first_card(controller(&table, b)));
    let (mut session_a, report_a) = side_a.await.unwrap();
    let (mut session_b, report_b) = side_b.await.unwrap();

    assert_eq!(session_a.side(), Some(Side::A));
    assert_eq!(session_b.side(), Some(Side::B));
    assert_eq!(report_a.local_outcome, Outcome::Win);
    assert_eq!(report_a.opponent_card, CardType::WeakBase);
    assert_eq!(report_a.clash.opponent_damage, 5);
    assert_eq!(report_b.local_outcome, Outcome::Lose);
    assert_eq!(report_b.opponent_outcome, Outcome::Win);

    assert_eq!(session_a.score(), Score { local: 1, opponent: 0 });
    assert_eq!(session_b.score(), Score { local: 0, opponent: 1 });
    assert_eq!(session_a.health().opponent, INITIAL_HEALTH - 5);
    // Each side computes damage from its own point of view
    assert_eq!(session_b.health().local, INITIAL_HEALTH - 1);

    assert_eq!(session_a.continue_round().await.unwrap(), Phase::Ended);
    assert_eq!(session_b.continue_round().await.unwrap(), Phase::Ended);
    let standings = table.lock().unwrap().standings(SESSION).unwrap();
    assert_eq!(standings.scores, [1, 0]);
    assert_eq!(standings.rounds_resolved, 1);
}

#[tokio::test(start_paused = true)]
async fn neutral_mirror_is_a_draw() {
    let table = open(
        Allocation::new().with(CardType::Neutral, 1),
        Allocation::new().with(CardType::Neutral, 1),
    );
    let [a, b] = teams();
    let side_a = tokio::spawn(play_first_card(controller(&table, a)));
    let side_b = tokio::spawn(play_first_card(controller(&table, b)));
    let (session_a, report_a) = side_a.await.unwrap();
    let (session_b, report_b) = side_b.await.unwrap();

    for (session, report) in [(&session_a, &report_a), (&session_b, &report_b)] {
        assert_eq!(report.local_outcome, Outcome::Draw);
        assert_eq!(report.opponent_outcome, Outcome::Draw);
        assert_eq!(report.clash.local_damage, 0);
        assert_eq!(report.clash.opponent_damage, 0);
        assert_eq!(session.score(), Score::default());
        assert_eq!(session.health().local, INITIAL_HEALTH);
    }
    assert_eq!(table.lock().unwrap().standings(SESSION).unwrap().scores, [0, 0]);
}

#[tokio::test(start_paused = true)]
async fn match_ends_only_after_continue() {
    let table = open(
        Allocation::new()
            .with(CardType::StrongAcid, 1)
            .with(CardType::Neutral, 1),
        Allocation::new()
            .with(CardType::WeakBase, 1)
            .with(CardType::Neutral, 1),
    );
    let [a, b] = teams();

    let side_a = tokio::spawn(play_first_card(controller(&table, a)));
    let side_b = tokio::spawn(play_first_card(controller(&table, b)));
    let (mut session_a, _) = side_a.await.unwrap();
    let (mut session_b, _) = side_b.await.unwrap();
    assert_eq!(session_a.continue_round().await.unwrap(), Phase::Play);
    assert_eq!(session_b.continue_round().await.unwrap(), Phase::Play);
    assert_eq!(session_a.hand().len(), 1);

    let side_a = tokio::spawn(play_first_card(session_a));
    let side_b = tokio::spawn(play_first_card(session_b));
    let (mut session_a, _) = side_a.await.unwrap();
    let (mut session_b, _) = side_b.await.unwrap();

    // The hand is empty, but the match is not over until the service says so
    assert!(session_a.hand().is_empty());
    assert_eq!(session_a.phase(), Phase::Resolved);
    assert!(matches!(
        session_a.select(InstanceId(0)),
        Err(abn_client::PlayError::WrongPhase { .. })
    ));

    assert_eq!(session_a.continue_round().await.unwrap(), Phase::Ended);
    assert_eq!(session_b.continue_round().await.unwrap(), Phase::Ended);
    assert_eq!(session_a.rounds_played(), 2);
    assert!(!session_a.termination_unverified());
}

#[tokio::test(start_paused = true)]
async fn side_comes_from_the_payload_without_a_team_id() {
    let table = open(
        Allocation::new().with(CardType::WeakAcid, 1),
        Allocation::new().with(CardType::StrongBase, 1),
    );
    let [a, b] = teams();
    let payload = format!(r#"{{"game_session_id": "{}", "tim2": "team-202"}}"#, SESSION);
    let context = SessionContext::from_stored(Some(&payload), None, None).unwrap();
    let session_b = SessionController::new(
        LocalService::new(Arc::clone(&table), b),
        MemoryStore::default(),
        context,
        PollConfig::default(),
    );
    let side_a = tokio::spawn(play_first_card(controller(&table, a)));
    let side_b = tokio::spawn(play_first_card(session_b));
    let (_, report_a) = side_a.await.unwrap();
    let (session_b, report_b) = side_b.await.unwrap();

    assert_eq!(session_b.side(), Some(Side::B));
    assert_eq!(report_b.local_card, CardType::StrongBase);
    // 8 * 1.5 against 5
    assert_eq!(report_b.local_outcome, Outcome::Win);
    assert_eq!(report_a.local_outcome, Outcome::Lose);
}

/// Plays the strongest card it has left against an unknown opponent.
struct Strongest;

impl Bot for Strongest {
    fn choose_card(&mut self, view: &TableView<'_>) -> Option<InstanceId> {
        view.hand
            .iter()
            .max_by_key(|card| card.card_type.card().power)
            .map(|card| card.id)
    }
}

/// Plays whatever comes first, and remembers what happened.
#[derive(Default)]
struct InOrder {
    reports: Vec<RoundReport>,
}

impl Bot for InOrder {
    fn choose_card(&mut self, view: &TableView<'_>) -> Option<InstanceId> {
        view.hand.iter().next().map(|card| card.id)
    }

    fn round_finished(&mut self, report: &RoundReport) {
        self.reports.push(report.clone());
    }
}

#[tokio::test(start_paused = true)]
async fn bots_play_a_full_match() {
    let hand = MatchConfig::default().hand;
    let table = open(hand.clone(), hand);
    let [a, b] = teams();

    let mut session_a = controller(&table, a);
    let mut session_b = controller(&table, b);
    let side_a = tokio::spawn(async move {
        let summary = drive(&mut Strongest, &mut session_a).await.unwrap();
        (summary, session_a)
    });
    let side_b = tokio::spawn(async move {
        let mut bot = InOrder::default();
        let summary = drive(&mut bot, &mut session_b).await.unwrap();
        (summary, bot)
    });
    let (summary_a, session_a) = side_a.await.unwrap();
    let (summary_b, bot_b) = side_b.await.unwrap();

    assert_eq!(summary_a.rounds_played, 10);
    assert_eq!(summary_b.rounds_played, 10);
    assert_eq!(bot_b.reports.len(), 10);
    assert_eq!(session_a.phase(), Phase::Ended);
    assert_eq!(summary_a.score.local, summary_b.score.opponent);
    assert_eq!(summary_a.score.opponent, summary_b.score.local);

    let standings = table.lock().unwrap().standings(SESSION).unwrap();
    assert_eq!(standings.scores, [summary_a.score.local, summary_b.score.local]);
    assert_eq!(standings.rounds_resolved, 10);
    assert_eq!(standings.remaining, [0, 0]);
}
