use std::sync::{Arc, Mutex};

use abn::{
    CheckReady, CommitCard, DealHand, DealtCards, Okay, ReadyCheck, Rejection, ResolveRound,
    RoundResolution, TeamId,
};
use abn_client::{MatchService, ServiceError};

use crate::MatchTable;

/// Calls into a shared [`MatchTable`] directly, as one fixed team.
#[derive(Clone)]
pub struct LocalService {
    table: Arc<Mutex<MatchTable>>,
    caller: TeamId,
}

impl LocalService {
    pub fn new(table: Arc<Mutex<MatchTable>>, caller: TeamId) -> Self {
        Self { table, caller }
    }

    fn with_table<T>(
        &self,
        f: impl FnOnce(&mut MatchTable, &TeamId) -> Result<T, Rejection>,
    ) -> Result<T, ServiceError> {
        let mut table = self.table.lock().map_err(|_| ServiceError::Unsuccessful {
            message: Some(String::from("The match table lock is poisoned")),
        })?;
        Ok(f(&mut table, &self.caller)?)
    }
}

impl MatchService for LocalService {
    async fn deal_hand(&self, req: &DealHand) -> Result<DealtCards, ServiceError> {
        self.with_table(|table, caller| table.deal_hand(caller, req))
    }

    async fn commit_card(&self, req: &CommitCard) -> Result<Okay, ServiceError> {
        self.with_table(|table, caller| table.commit_card(caller, req))
    }

    async fn check_ready(&self, req: &CheckReady) -> Result<ReadyCheck, ServiceError> {
        self.with_table(|table, caller| table.check_ready(caller, req))
    }

    async fn resolve_round(&self, req: &ResolveRound) -> Result<RoundResolution, ServiceError> {
        self.with_table(|table, caller| table.resolve_round(caller, req))
    }
}
