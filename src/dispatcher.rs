use crate::{
    contract::{
        Confirmation,
        RaffleBackend,
        RaffleError,
    },
    events::{
        AppEvent,
        WriteEvent,
    },
};
use alloy::primitives::{
    Address,
    U256,
};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
};

pub const REQUIRED_CONFIRMATIONS: u64 = 1;

/// Lifecycle of the entry transaction as seen by the user.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum WriteState {
    #[default]
    Idle,
    Submitting,
    Confirming,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum WriteOutcome {
    Succeeded(Confirmation),
    Failed(RaffleError),
}

/// Submit `enterRaffle` with `value` attached and wait for one confirmation.
/// Progress is reported on `events`; the returned value mirrors the final
/// event.
pub async fn enter<B: RaffleBackend>(
    backend: &B,
    raffle: Address,
    value: U256,
    events: &mpsc::UnboundedSender<AppEvent>,
) -> WriteOutcome {
    tracing::info!(%raffle, %value, "entering raffle");
    let outcome = match backend.enter_raffle(raffle, value).await {
        Ok(transaction_hash) => {
            tracing::info!(%transaction_hash, "entry submitted; awaiting confirmation");
            let _ = events.send(AppEvent::Write(WriteEvent::Submitted(transaction_hash)));
            match backend
                .wait_for_confirmation(transaction_hash, REQUIRED_CONFIRMATIONS)
                .await
            {
                Ok(confirmation) => WriteOutcome::Succeeded(confirmation),
                Err(err) => WriteOutcome::Failed(err),
            }
        }
        Err(err) => WriteOutcome::Failed(err),
    };
    let event = match &outcome {
        WriteOutcome::Succeeded(confirmation) => WriteEvent::Confirmed(*confirmation),
        WriteOutcome::Failed(err) => WriteEvent::Failed(err.clone()),
    };
    let _ = events.send(AppEvent::Write(event));
    outcome
}

pub fn spawn_enter<B: RaffleBackend>(
    backend: B,
    raffle: Address,
    value: U256,
    events: mpsc::UnboundedSender<AppEvent>,
) -> JoinHandle<WriteOutcome> {
    tokio::spawn(async move { enter(&backend, raffle, value, &events).await })
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::{
        contract::WriteStage,
        test_helpers::{
            FakeBackend,
            RAFFLE,
        },
    };

    #[tokio::test]
    async fn enter__reports_submission_then_confirmation() {
        // given
        let backend = FakeBackend::new();
        let fee = U256::from(10u64.pow(16));
        let (tx, mut rx) = mpsc::unbounded_channel();

        // when
        let outcome = enter(&backend, RAFFLE, fee, &tx).await;

        // then
        let Some(AppEvent::Write(WriteEvent::Submitted(hash))) = rx.recv().await else {
            panic!("expected submission event");
        };
        let Some(AppEvent::Write(WriteEvent::Confirmed(confirmation))) = rx.recv().await
        else {
            panic!("expected confirmation event");
        };
        assert_eq!(confirmation.transaction_hash, hash);
        assert_eq!(outcome, WriteOutcome::Succeeded(confirmation));
        assert_eq!(backend.entries(), vec![(RAFFLE, fee)]);
        assert_eq!(backend.confirmations_requested(), vec![REQUIRED_CONFIRMATIONS]);
    }

    #[tokio::test]
    async fn enter__submission_failure_skips_confirmation() {
        // given
        let backend = FakeBackend::new();
        backend.fail_submission(RaffleError::write(WriteStage::Submitting, "user rejected"));
        let (tx, mut rx) = mpsc::unbounded_channel();

        // when
        let outcome = enter(&backend, RAFFLE, U256::from(1u8), &tx).await;

        // then
        assert!(matches!(outcome, WriteOutcome::Failed(RaffleError::Write { .. })));
        assert!(matches!(
            rx.recv().await,
            Some(AppEvent::Write(WriteEvent::Failed(_)))
        ));
        assert!(rx.try_recv().is_err());
        assert!(backend.confirmations_requested().is_empty());
    }

    #[tokio::test]
    async fn enter__confirmation_failure_is_reported_after_submission() {
        let backend = FakeBackend::new();
        backend.fail_confirmation(RaffleError::write(WriteStage::Confirming, "reverted"));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let outcome = spawn_enter(backend, RAFFLE, U256::from(1u8), tx)
            .await
            .unwrap();

        assert!(matches!(
            rx.recv().await,
            Some(AppEvent::Write(WriteEvent::Submitted(_)))
        ));
        assert!(matches!(
            rx.recv().await,
            Some(AppEvent::Write(WriteEvent::Failed(_)))
        ));
        assert!(matches!(outcome, WriteOutcome::Failed(_)));
    }
}
