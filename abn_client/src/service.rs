use std::future::Future;
use std::sync::Arc;

use abn::{
    CheckReady, CommitCard, DealHand, DealtCards, Okay, ReadyCheck, Reply, ResolveRound,
    RoundResolution,
};

use crate::ServiceError;

/// The four operations a player consumes from the match service.
///
/// The transport is up to the implementation: [`LineService`](crate::LineService)
/// talks JSON lines over stdin/stdout, the referee crate has an in-process one.
pub trait MatchService: Send + Sync {
    /// The remaining cards of both teams.
    fn deal_hand(
        &self,
        req: &DealHand,
    ) -> impl Future<Output = Result<DealtCards, ServiceError>> + Send;

    /// Commits one card of the caller for the current round.
    fn commit_card(
        &self,
        req: &CommitCard,
    ) -> impl Future<Output = Result<Okay, ServiceError>> + Send;

    /// Which commitments of the caller's current round are in.
    fn check_ready(
        &self,
        req: &CheckReady,
    ) -> impl Future<Output = Result<ReadyCheck, ServiceError>> + Send;

    /// Resolves the caller's current round. Safe to call more than once.
    fn resolve_round(
        &self,
        req: &ResolveRound,
    ) -> impl Future<Output = Result<RoundResolution, ServiceError>> + Send;
}

impl<S: MatchService> MatchService for Arc<S> {
    fn deal_hand(
        &self,
        req: &DealHand,
    ) -> impl Future<Output = Result<DealtCards, ServiceError>> + Send {
        (**self).deal_hand(req)
    }

    fn commit_card(
        &self,
        req: &CommitCard,
    ) -> impl Future<Output = Result<Okay, ServiceError>> + Send {
        (**self).commit_card(req)
    }

    fn check_ready(
        &self,
        req: &CheckReady,
    ) -> impl Future<Output = Result<ReadyCheck, ServiceError>> + Send {
        (**self).check_ready(req)
    }

    fn resolve_round(
        &self,
        req: &ResolveRound,
    ) -> impl Future<Output = Result<RoundResolution, ServiceError>> + Send {
        (**self).resolve_round(req)
    }
}

/// Unpacks a reply envelope.
///
/// A successful reply without data is only accepted when `T` has a
/// meaningful empty value, which the caller supplies as `on_empty`.
pub fn open_reply<T>(reply: Reply<T>, on_empty: Option<T>) -> Result<T, ServiceError> {
    match reply {
        Reply {
            success: true,
            data: Some(data),
            ..
        } => Ok(data),
        Reply {
            success: true,
            data: None,
            ..
        } => on_empty.ok_or_else(|| {
            ServiceError::Malformed(<serde_json::Error as serde::de::Error>::custom(
                "successful reply without data",
            ))
        }),
        Reply {
            rejection: Some(rejection),
            ..
        } => Err(ServiceError::Rejected(rejection)),
        Reply { message, .. } => Err(ServiceError::Unsuccessful { message }),
    }
}
