//! A match service that replays scripted replies, for tests.
use std::collections::VecDeque;
use std::sync::Mutex;

use abn::{
    CardType, CheckReady, CommitCard, DealHand, DealtCards, Okay, ReadyCheck, Rejection,
    ResolveRound, RoundResolution,
};

use crate::{MatchService, ServiceError};

pub enum Scripted<T> {
    Reply(T),
    Reject(Rejection),
    Fail,
}

impl<T> Scripted<T> {
    fn into_result(self) -> Result<T, ServiceError> {
        match self {
            Scripted::Reply(data) => Ok(data),
            Scripted::Reject(rejection) => Err(ServiceError::Rejected(rejection)),
            Scripted::Fail => Err(ServiceError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "scripted failure",
            ))),
        }
    }
}

/// Replies are taken from per-operation queues.
///
/// When a queue runs dry, commits succeed, polls report nobody committed,
/// and deals and resolves fail.
#[derive(Default)]
pub struct ScriptedService {
    script: Mutex<Script>,
}

#[derive(Default)]
struct Script {
    deals: VecDeque<Scripted<DealtCards>>,
    commits: VecDeque<Scripted<Okay>>,
    checks: VecDeque<Scripted<ReadyCheck>>,
    resolves: VecDeque<Scripted<RoundResolution>>,
    deal_calls: u32,
    committed: Vec<CardType>,
    check_calls: u32,
    resolve_calls: u32,
}

impl ScriptedService {
    pub fn push_deal(&self, reply: Scripted<DealtCards>) {
        self.script.lock().unwrap().deals.push_back(reply);
    }

    pub fn push_commit(&self, reply: Scripted<Okay>) {
        self.script.lock().unwrap().commits.push_back(reply);
    }

    pub fn push_check(&self, reply: Scripted<ReadyCheck>) {
        self.script.lock().unwrap().checks.push_back(reply);
    }

    pub fn push_resolve(&self, reply: Scripted<RoundResolution>) {
        self.script.lock().unwrap().resolves.push_back(reply);
    }

    pub fn deal_calls(&self) -> u32 {
        self.script.lock().unwrap().deal_calls
    }

    /// Every card a commit was attempted with.
    pub fn commits(&self) -> Vec<CardType> {
        self.script.lock().unwrap().committed.clone()
    }

    pub fn check_calls(&self) -> u32 {
        self.script.lock().unwrap().check_calls
    }

    pub fn resolve_calls(&self) -> u32 {
        self.script.lock().unwrap().resolve_calls
    }
}

impl MatchService for ScriptedService {
    async fn deal_hand(&self, _req: &DealHand) -> Result<DealtCards, ServiceError> {
        let mut script = self.script.lock().unwrap();
        script.deal_calls += 1;
        script.deals.pop_front().unwrap_or(Scripted::Fail).into_result()
    }

    async fn commit_card(&self, req: &CommitCard) -> Result<Okay, ServiceError> {
        let mut script = self.script.lock().unwrap();
        script.committed.push(req.card);
        script
            .commits
            .pop_front()
            .unwrap_or(Scripted::Reply(Okay()))
            .into_result()
    }

    async fn check_ready(&self, _req: &CheckReady) -> Result<ReadyCheck, ServiceError> {
        let mut script = self.script.lock().unwrap();
        script.check_calls += 1;
        script
            .checks
            .pop_front()
            .unwrap_or(Scripted::Reply(ReadyCheck::default()))
            .into_result()
    }

    async fn resolve_round(&self, _req: &ResolveRound) -> Result<RoundResolution, ServiceError> {
        let mut script = self.script.lock().unwrap();
        script.resolve_calls += 1;
        script.resolves.pop_front().unwrap_or(Scripted::Fail).into_result()
    }
}
