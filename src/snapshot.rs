use alloy::primitives::{
    Address,
    U256,
    utils,
};

/// One complete read of the raffle's public state. Produced by a single
/// refresh and applied as a unit.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SnapshotReading {
    pub entrance_fee: U256,
    pub player_count: U256,
    pub recent_winner: Address,
}

/// Last known raffle state as shown to the user. Consistent with some
/// on-chain state at the time it was read, not necessarily the current one.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ContractSnapshot {
    entrance_fee: U256,
    player_count: U256,
    recent_winner: Option<Address>,
    loaded: bool,
}

impl ContractSnapshot {
    pub fn entrance_fee(&self) -> U256 {
        self.entrance_fee
    }

    pub fn player_count(&self) -> U256 {
        self.player_count
    }

    pub fn recent_winner(&self) -> Option<Address> {
        self.recent_winner
    }

    /// True once a full reading has been applied since the last reset.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn apply_reading(&mut self, reading: SnapshotReading) {
        *self = Self {
            entrance_fee: reading.entrance_fee,
            player_count: reading.player_count,
            recent_winner: Some(reading.recent_winner),
            loaded: true,
        };
    }

    /// A picked winner closes the round, so the player list starts over.
    pub fn apply_winner(&mut self, winner: Address) {
        self.recent_winner = Some(winner);
        self.player_count = U256::ZERO;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn entrance_fee_display(&self) -> String {
        format_ether(self.entrance_fee)
    }

    pub fn player_count_display(&self) -> String {
        self.player_count.to_string()
    }

    pub fn recent_winner_display(&self) -> String {
        match self.recent_winner {
            Some(winner) => winner.to_string(),
            None => String::from("0"),
        }
    }
}

/// In-flight flags for the entry transaction.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PendingWrite {
    pub is_submitting: bool,
    pub is_fetching: bool,
}

impl PendingWrite {
    pub fn is_active(&self) -> bool {
        self.is_submitting || self.is_fetching
    }

    pub fn start(&mut self) {
        self.is_submitting = true;
        self.is_fetching = true;
    }

    pub fn submitted(&mut self) {
        self.is_submitting = false;
    }

    pub fn settle(&mut self) {
        *self = Self::default();
    }
}

/// Wei to ether, trimming trailing zeros but keeping one fractional digit.
pub fn format_ether(wei: U256) -> String {
    let full = utils::format_ether(wei);
    match full.split_once('.') {
        Some((whole, fraction)) => {
            let fraction = fraction.trim_end_matches('0');
            if fraction.is_empty() {
                format!("{whole}.0")
            } else {
                format!("{whole}.{fraction}")
            }
        }
        None => format!("{full}.0"),
    }
}
