use crate::{
    contract::{
        Confirmation,
        RaffleError,
        WinnerLog,
    },
    snapshot::SnapshotReading,
};
use alloy::primitives::{
    Address,
    TxHash,
};

/// Results posted by background workers to the application loop.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AppEvent {
    NetworkDetected {
        network_id: u64,
    },
    ConnectivityLost(RaffleError),
    Snapshot {
        raffle: Address,
        result: Result<SnapshotReading, RaffleError>,
    },
    Winners {
        raffle: Address,
        logs: Vec<WinnerLog>,
    },
    SubscriptionFailed {
        raffle: Address,
        error: RaffleError,
    },
    /// The log stream closed on its own, for example after the node dropped
    /// the filter.
    SubscriptionEnded {
        raffle: Address,
    },
    Write(WriteEvent),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum WriteEvent {
    Submitted(TxHash),
    Confirmed(Confirmation),
    Failed(RaffleError),
}
