use crate::{
    contract::RaffleBackend,
    events::AppEvent,
};
use alloy::primitives::Address;
use futures::StreamExt;
use tokio::{
    sync::{
        mpsc,
        oneshot,
        watch,
    },
    task::JoinHandle,
};
use tracing::{
    info,
    warn,
};

/// What happens to the winner subscription after it delivers a batch.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum RearmPolicy {
    /// Cancel after the first delivered batch.
    OneShot,
    /// Keep listening so every later round's winner is shown.
    #[default]
    Rearm,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubscriptionState {
    Active,
    Cancelled,
}

/// Handle to a running `WinnerPicked` subscription for one raffle address.
/// Dropping the handle cancels the subscription.
pub struct WinnerSubscription {
    raffle: Address,
    policy: RearmPolicy,
    state: watch::Receiver<SubscriptionState>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl WinnerSubscription {
    pub fn subscribe<B: RaffleBackend>(
        backend: B,
        raffle: Address,
        policy: RearmPolicy,
        events: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(SubscriptionState::Active);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        info!(%raffle, ?policy, "subscribing to WinnerPicked");
        let handle = tokio::spawn(run_subscription(
            backend,
            raffle,
            policy,
            events,
            state_tx,
            shutdown_rx,
        ));
        Self {
            raffle,
            policy,
            state: state_rx,
            shutdown: Some(shutdown_tx),
            handle,
        }
    }

    pub fn raffle(&self) -> Address {
        self.raffle
    }

    pub fn policy(&self) -> RearmPolicy {
        self.policy
    }

    pub fn state(&self) -> SubscriptionState {
        *self.state.borrow()
    }

    pub fn cancel(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }

    /// Resolves once the subscription task has stopped listening.
    pub async fn cancelled(&mut self) {
        let _ = self
            .state
            .wait_for(|state| *state == SubscriptionState::Cancelled)
            .await;
    }
}

impl Drop for WinnerSubscription {
    fn drop(&mut self) {
        self.cancel();
        if *self.state.borrow() == SubscriptionState::Active {
            self.handle.abort();
        }
    }
}

async fn run_subscription<B: RaffleBackend>(
    backend: B,
    raffle: Address,
    policy: RearmPolicy,
    events: mpsc::UnboundedSender<AppEvent>,
    state: watch::Sender<SubscriptionState>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let opened = tokio::select! {
        _ = &mut shutdown => {
            state.send_replace(SubscriptionState::Cancelled);
            return;
        }
        opened = backend.watch_winners(raffle) => opened,
    };
    let mut logs = match opened {
        Ok(stream) => stream,
        Err(error) => {
            warn!(%raffle, %error, "WinnerPicked subscription failed");
            let _ = events.send(AppEvent::SubscriptionFailed { raffle, error });
            state.send_replace(SubscriptionState::Cancelled);
            return;
        }
    };

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            batch = logs.next() => {
                let Some(batch) = batch else {
                    warn!(%raffle, "WinnerPicked log stream ended");
                    let _ = events.send(AppEvent::SubscriptionEnded { raffle });
                    break;
                };
                if batch.is_empty() {
                    continue;
                }
                if events.send(AppEvent::Winners { raffle, logs: batch }).is_err() {
                    break;
                }
                if policy == RearmPolicy::OneShot {
                    info!(%raffle, "winner delivered; one-shot subscription cancelled");
                    break;
                }
            }
        }
    }
    state.send_replace(SubscriptionState::Cancelled);
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::{
        contract::RaffleError,
        test_helpers::{
            FakeBackend,
            OTHER_WINNER,
            RAFFLE,
            WINNER,
            winner_log,
        },
    };

    async fn next_winners(
        rx: &mut mpsc::UnboundedReceiver<AppEvent>,
    ) -> Vec<crate::contract::WinnerLog> {
        match rx.recv().await {
            Some(AppEvent::Winners { logs, .. }) => logs,
            other => panic!("expected winners event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn subscribe__one_shot_delivers_first_batch_then_cancels() {
        // given
        let backend = FakeBackend::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut subscription =
            WinnerSubscription::subscribe(backend.clone(), RAFFLE, RearmPolicy::OneShot, tx);
        backend.wait_for_watchers(1).await;

        // when
        backend.emit_winners(vec![winner_log(WINNER), winner_log(OTHER_WINNER)]);
        let delivered = next_winners(&mut rx).await;
        subscription.cancelled().await;
        backend.emit_winners(vec![winner_log(OTHER_WINNER)]);
        tokio::task::yield_now().await;

        // then
        assert_eq!(delivered[0].winner, WINNER);
        assert_eq!(subscription.state(), SubscriptionState::Cancelled);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn subscribe__rearm_keeps_delivering_batches() {
        // given
        let backend = FakeBackend::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let subscription =
            WinnerSubscription::subscribe(backend.clone(), RAFFLE, RearmPolicy::Rearm, tx);
        backend.wait_for_watchers(1).await;

        // when
        backend.emit_winners(vec![winner_log(WINNER)]);
        let first = next_winners(&mut rx).await;
        backend.emit_winners(vec![winner_log(OTHER_WINNER)]);
        let second = next_winners(&mut rx).await;

        // then
        assert_eq!(first[0].winner, WINNER);
        assert_eq!(second[0].winner, OTHER_WINNER);
        assert_eq!(subscription.state(), SubscriptionState::Active);
    }

    #[tokio::test]
    async fn subscribe__empty_batches_are_ignored() {
        let backend = FakeBackend::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _subscription =
            WinnerSubscription::subscribe(backend.clone(), RAFFLE, RearmPolicy::OneShot, tx);
        backend.wait_for_watchers(1).await;

        backend.emit_winners(Vec::new());
        backend.emit_winners(vec![winner_log(WINNER)]);

        assert_eq!(next_winners(&mut rx).await[0].winner, WINNER);
    }

    #[tokio::test]
    async fn cancel__stops_delivery() {
        // given
        let backend = FakeBackend::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut subscription =
            WinnerSubscription::subscribe(backend.clone(), RAFFLE, RearmPolicy::Rearm, tx);
        backend.wait_for_watchers(1).await;

        // when
        subscription.cancel();
        subscription.cancelled().await;
        backend.emit_winners(vec![winner_log(WINNER)]);
        tokio::task::yield_now().await;

        // then
        assert_eq!(subscription.state(), SubscriptionState::Cancelled);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn subscribe__closed_log_stream_is_reported() {
        // given
        let backend = FakeBackend::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut subscription =
            WinnerSubscription::subscribe(backend.clone(), RAFFLE, RearmPolicy::Rearm, tx);
        backend.wait_for_watchers(1).await;

        // when
        backend.close_watchers();
        subscription.cancelled().await;

        // then
        assert_eq!(subscription.state(), SubscriptionState::Cancelled);
        assert_eq!(
            rx.recv().await,
            Some(AppEvent::SubscriptionEnded { raffle: RAFFLE })
        );
    }

    #[tokio::test]
    async fn subscribe__open_failure_is_reported() {
        // given
        let backend = FakeBackend::new();
        backend.fail_watch(RaffleError::call("watchContractEvent(WinnerPicked)", "boom"));
        let (tx, mut rx) = mpsc::unbounded_channel();

        // when
        let mut subscription =
            WinnerSubscription::subscribe(backend, RAFFLE, RearmPolicy::Rearm, tx);
        subscription.cancelled().await;

        // then
        assert!(matches!(
            rx.recv().await,
            Some(AppEvent::SubscriptionFailed { raffle, .. }) if raffle == RAFFLE
        ));
    }
}
