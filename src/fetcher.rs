use crate::{
    contract::{
        RaffleBackend,
        RaffleError,
    },
    events::AppEvent,
    snapshot::SnapshotReading,
};
use alloy::primitives::Address;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
};

/// Read entrance fee, player count and recent winner concurrently. The
/// reading is only returned once all three calls succeed, so callers never
/// see a partial update.
pub async fn refresh_snapshot<B: RaffleBackend>(
    backend: &B,
    raffle: Address,
) -> Result<SnapshotReading, RaffleError> {
    let (entrance_fee, player_count, recent_winner) = tokio::try_join!(
        backend.entrance_fee(raffle),
        backend.number_of_players(raffle),
        backend.recent_winner(raffle),
    )?;
    tracing::debug!(
        %raffle,
        %entrance_fee,
        %player_count,
        %recent_winner,
        "raffle snapshot fetched"
    );
    Ok(SnapshotReading {
        entrance_fee,
        player_count,
        recent_winner,
    })
}

/// Run a refresh in the background and post the result, tagged with the
/// raffle it was read from.
pub fn spawn_refresh<B: RaffleBackend>(
    backend: B,
    raffle: Address,
    events: mpsc::UnboundedSender<AppEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let result = refresh_snapshot(&backend, raffle).await;
        let _ = events.send(AppEvent::Snapshot { raffle, result });
    })
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::test_helpers::{
        FakeBackend,
        RAFFLE,
        WINNER,
    };
    use alloy::primitives::U256;

    #[tokio::test]
    async fn refresh_snapshot__returns_all_three_reads() {
        // given
        let backend = FakeBackend::new();
        backend.set_state(U256::from(10u64.pow(16)), U256::from(2u8), WINNER);

        // when
        let reading = refresh_snapshot(&backend, RAFFLE).await.unwrap();

        // then
        assert_eq!(
            reading,
            SnapshotReading {
                entrance_fee: U256::from(10u64.pow(16)),
                player_count: U256::from(2u8),
                recent_winner: WINNER,
            }
        );
        assert_eq!(backend.read_calls(), 3);
    }

    #[tokio::test]
    async fn refresh_snapshot__any_failed_read_fails_the_refresh() {
        // given
        let backend = FakeBackend::new();
        backend.fail_reads("getNumberOfPlayers");

        // when
        let err = refresh_snapshot(&backend, RAFFLE).await.unwrap_err();

        // then
        assert!(matches!(
            err,
            RaffleError::Call {
                call: "getNumberOfPlayers",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn spawn_refresh__posts_tagged_snapshot_event() {
        let backend = FakeBackend::new();
        backend.set_state(U256::from(5u8), U256::from(1u8), WINNER);
        let (tx, mut rx) = mpsc::unbounded_channel();

        spawn_refresh(backend, RAFFLE, tx).await.unwrap();

        let Some(AppEvent::Snapshot { raffle, result }) = rx.recv().await else {
            panic!("expected snapshot event");
        };
        assert_eq!(raffle, RAFFLE);
        assert_eq!(result.unwrap().player_count, U256::from(1u8));
    }
}
