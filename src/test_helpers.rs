use crate::{
    contract::{
        Confirmation,
        RaffleBackend,
        RaffleError,
        WinnerLog,
        WinnerLogStream,
    },
    network::HARDHAT_CHAIN_ID,
    notify::{
        Notification,
        NotificationSink,
    },
};
use alloy::primitives::{
    Address,
    TxHash,
    U256,
    address,
};
use futures::{
    StreamExt,
    channel::mpsc::{
        UnboundedSender,
        unbounded,
    },
};
use std::sync::{
    Arc,
    Mutex,
};
use tokio::sync::watch;

pub const RAFFLE: Address = address!("0x5FbDB2315678afecb367f032d93F642f64180aa3");
pub const OTHER_RAFFLE: Address = address!("0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512");
pub const WINNER: Address = address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8");
pub const OTHER_WINNER: Address = address!("0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC");

pub fn winner_log(winner: Address) -> WinnerLog {
    WinnerLog {
        winner,
        block_number: Some(1),
        transaction_hash: None,
    }
}

struct FakeState {
    chain_id: u64,
    unreachable: bool,
    entrance_fee: U256,
    player_count: U256,
    recent_winner: Address,
    failing_read: Option<&'static str>,
    read_calls: usize,
    refreshes: usize,
    can_sign: bool,
    entries: Vec<(Address, U256)>,
    confirmations_requested: Vec<u64>,
    submission_error: Option<RaffleError>,
    confirmation_error: Option<RaffleError>,
    watch_error: Option<RaffleError>,
    watchers: Vec<UnboundedSender<Vec<WinnerLog>>>,
    next_tx: u8,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            chain_id: HARDHAT_CHAIN_ID,
            unreachable: false,
            entrance_fee: U256::ZERO,
            player_count: U256::ZERO,
            recent_winner: Address::ZERO,
            failing_read: None,
            read_calls: 0,
            refreshes: 0,
            can_sign: true,
            entries: Vec::new(),
            confirmations_requested: Vec::new(),
            submission_error: None,
            confirmation_error: None,
            watch_error: None,
            watchers: Vec::new(),
            next_tx: 1,
        }
    }
}

/// In-memory chain for driving the client without a node. Clones share state.
#[derive(Clone)]
pub struct FakeBackend {
    state: Arc<Mutex<FakeState>>,
    opened_watchers: Arc<watch::Sender<usize>>,
    confirmation_gate: Arc<watch::Sender<bool>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        let (opened_watchers, _) = watch::channel(0);
        let (confirmation_gate, _) = watch::channel(true);
        Self {
            state: Arc::new(Mutex::new(FakeState::default())),
            opened_watchers: Arc::new(opened_watchers),
            confirmation_gate: Arc::new(confirmation_gate),
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut FakeState) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn set_state(&self, entrance_fee: U256, player_count: U256, recent_winner: Address) {
        self.with_state(|s| {
            s.entrance_fee = entrance_fee;
            s.player_count = player_count;
            s.recent_winner = recent_winner;
        });
    }

    pub fn set_chain_id(&self, chain_id: u64) {
        self.with_state(|s| s.chain_id = chain_id);
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.with_state(|s| s.unreachable = unreachable);
    }

    pub fn set_can_sign(&self, can_sign: bool) {
        self.with_state(|s| s.can_sign = can_sign);
    }

    /// Make the named contract read fail until cleared with `None`.
    pub fn fail_reads(&self, call: impl Into<Option<&'static str>>) {
        let call = call.into();
        self.with_state(|s| s.failing_read = call);
    }

    pub fn read_calls(&self) -> usize {
        self.with_state(|s| s.read_calls)
    }

    /// Number of refresh rounds, counted by entrance fee reads.
    pub fn refresh_count(&self) -> usize {
        self.with_state(|s| s.refreshes)
    }

    pub fn fail_submission(&self, err: RaffleError) {
        self.with_state(|s| s.submission_error = Some(err));
    }

    pub fn fail_confirmation(&self, err: RaffleError) {
        self.with_state(|s| s.confirmation_error = Some(err));
    }

    pub fn entries(&self) -> Vec<(Address, U256)> {
        self.with_state(|s| s.entries.clone())
    }

    pub fn confirmations_requested(&self) -> Vec<u64> {
        self.with_state(|s| s.confirmations_requested.clone())
    }

    /// Park confirmations until `release_confirmations` is called.
    pub fn hold_confirmations(&self) {
        self.confirmation_gate.send_replace(false);
    }

    pub fn release_confirmations(&self) {
        self.confirmation_gate.send_replace(true);
    }

    pub fn fail_watch(&self, err: RaffleError) {
        self.with_state(|s| s.watch_error = Some(err));
    }

    /// Wait until at least `count` log subscriptions have been opened.
    pub async fn wait_for_watchers(&self, count: usize) {
        let mut opened = self.opened_watchers.subscribe();
        let _ = opened.wait_for(|opened| *opened >= count).await;
    }

    /// Push one batch to every open log subscription.
    pub fn emit_winners(&self, batch: Vec<WinnerLog>) {
        self.with_state(|s| {
            s.watchers
                .retain(|watcher| watcher.unbounded_send(batch.clone()).is_ok());
        });
    }

    /// End every open log subscription, as a node does when it drops a filter.
    pub fn close_watchers(&self) {
        self.with_state(|s| s.watchers.clear());
    }

    fn read<T>(
        &self,
        call: &'static str,
        value: impl FnOnce(&FakeState) -> T,
    ) -> Result<T, RaffleError> {
        self.with_state(|s| {
            s.read_calls += 1;
            if call == "getEntranceFee" {
                s.refreshes += 1;
            }
            if s.failing_read == Some(call) {
                return Err(RaffleError::call(call, "execution reverted"));
            }
            Ok(value(s))
        })
    }
}

impl RaffleBackend for FakeBackend {
    async fn chain_id(&self) -> Result<u64, RaffleError> {
        self.with_state(|s| {
            if s.unreachable {
                Err(RaffleError::Transport(String::from("connection refused")))
            } else {
                Ok(s.chain_id)
            }
        })
    }

    async fn entrance_fee(&self, _raffle: Address) -> Result<U256, RaffleError> {
        self.read("getEntranceFee", |s| s.entrance_fee)
    }

    async fn number_of_players(&self, _raffle: Address) -> Result<U256, RaffleError> {
        self.read("getNumberOfPlayers", |s| s.player_count)
    }

    async fn recent_winner(&self, _raffle: Address) -> Result<Address, RaffleError> {
        self.read("getRecentWinner", |s| s.recent_winner)
    }

    fn can_sign(&self) -> bool {
        self.with_state(|s| s.can_sign)
    }

    async fn enter_raffle(&self, raffle: Address, value: U256) -> Result<TxHash, RaffleError> {
        self.with_state(|s| {
            if !s.can_sign {
                return Err(RaffleError::ReadOnly);
            }
            if let Some(err) = s.submission_error.clone() {
                return Err(err);
            }
            s.entries.push((raffle, value));
            s.player_count += U256::from(1u8);
            let hash = TxHash::repeat_byte(s.next_tx);
            s.next_tx = s.next_tx.wrapping_add(1);
            Ok(hash)
        })
    }

    async fn wait_for_confirmation(
        &self,
        transaction_hash: TxHash,
        confirmations: u64,
    ) -> Result<Confirmation, RaffleError> {
        self.with_state(|s| s.confirmations_requested.push(confirmations));
        let mut gate = self.confirmation_gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;
        self.with_state(|s| match s.confirmation_error.clone() {
            Some(err) => Err(err),
            None => Ok(Confirmation {
                transaction_hash,
                block_number: Some(1),
            }),
        })
    }

    async fn watch_winners(&self, _raffle: Address) -> Result<WinnerLogStream, RaffleError> {
        let (tx, rx) = unbounded();
        self.with_state(|s| match s.watch_error.clone() {
            Some(err) => Err(err),
            None => {
                s.watchers.push(tx);
                Ok(())
            }
        })?;
        self.opened_watchers.send_modify(|opened| *opened += 1);
        Ok(rx.boxed())
    }
}

/// Notification sink that remembers everything it was given.
#[derive(Clone, Default)]
pub struct RecordingSink {
    notifications: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingSink {
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn dispatch(&mut self, notification: Notification) {
        self.notifications.lock().unwrap().push(notification);
    }
}
