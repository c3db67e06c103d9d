use crate::{
    addresses::AddressTable,
    contract::{
        RaffleError,
        WinnerLog,
    },
    dispatcher::{
        WriteOutcome,
        WriteState,
    },
    events::{
        AppEvent,
        WriteEvent,
    },
    network::{
        self,
        NetworkContext,
    },
    notify::Notification,
    snapshot::{
        ContractSnapshot,
        PendingWrite,
        SnapshotReading,
    },
};
use alloy::primitives::{
    Address,
    U256,
};
use tracing::{
    debug,
    error,
    info,
    warn,
};

const MAX_ERRORS: usize = 50;

/// Work the controller asks its owner to carry out.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Effect {
    RefreshSnapshot { raffle: Address },
    Subscribe { raffle: Address },
    CancelSubscription,
    SubmitEntry { raffle: Address, value: U256 },
    Notify(Notification),
}

/// Owns the raffle view state. All mutation goes through the methods below;
/// each returns the effects the caller must run.
#[derive(Debug)]
pub struct AppController {
    table: AddressTable,
    network: NetworkContext,
    snapshot: ContractSnapshot,
    pending: PendingWrite,
    write_state: WriteState,
    last_write: Option<WriteOutcome>,
    can_sign: bool,
    connected: bool,
    status: String,
    errors: Vec<String>,
}

impl AppController {
    pub fn new(table: AddressTable, can_sign: bool) -> Self {
        Self {
            table,
            network: NetworkContext::unresolved(),
            snapshot: ContractSnapshot::default(),
            pending: PendingWrite::default(),
            write_state: WriteState::Idle,
            last_write: None,
            can_sign,
            connected: false,
            status: String::from("Connecting..."),
            errors: Vec::new(),
        }
    }

    pub fn network(&self) -> NetworkContext {
        self.network
    }

    pub fn snapshot(&self) -> ContractSnapshot {
        self.snapshot
    }

    pub fn pending(&self) -> PendingWrite {
        self.pending
    }

    pub fn write_state(&self) -> WriteState {
        self.write_state
    }

    pub fn last_write(&self) -> Option<&WriteOutcome> {
        self.last_write.as_ref()
    }

    pub fn can_sign(&self) -> bool {
        self.can_sign
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn can_enter(&self) -> bool {
        self.network.has_contract()
            && self.can_sign
            && self.snapshot.is_loaded()
            && !self.pending.is_active()
    }

    pub fn handle_event(&mut self, event: AppEvent) -> Vec<Effect> {
        match event {
            AppEvent::NetworkDetected { network_id } => self.on_network_detected(network_id),
            AppEvent::ConnectivityLost(err) => self.on_connectivity_lost(err),
            AppEvent::Snapshot { raffle, result } => self.on_snapshot(raffle, result),
            AppEvent::Winners { raffle, logs } => self.on_winners(raffle, &logs),
            AppEvent::SubscriptionFailed { raffle, error } => {
                self.on_subscription_failed(raffle, error)
            }
            AppEvent::SubscriptionEnded { raffle } => self.on_subscription_ended(raffle),
            AppEvent::Write(event) => self.on_write(event),
        }
    }

    /// The endpoint reported a chain id. A new id re-resolves the raffle,
    /// drops state read from the previous one and starts over.
    pub fn on_network_detected(&mut self, network_id: u64) -> Vec<Effect> {
        if self.connected && self.network.network_id == Some(network_id) {
            return Vec::new();
        }
        let previous = self.network;
        self.connected = true;
        self.network = network::resolve(Some(network_id), &self.table);
        self.snapshot.reset();
        info!(
            network_id,
            descriptor = %self.network.descriptor,
            raffle = ?self.network.contract_address,
            "network resolved"
        );

        let mut effects = Vec::new();
        if previous.has_contract() {
            effects.push(Effect::CancelSubscription);
        }
        match self.network.contract_address {
            Some(raffle) => {
                self.set_status(format!(
                    "Connected to {} ({network_id})",
                    self.network.descriptor
                ));
                effects.push(Effect::Subscribe { raffle });
                effects.push(Effect::RefreshSnapshot { raffle });
            }
            None => {
                self.set_status(format!("No raffle deployed on network {network_id}"));
            }
        }
        effects
    }

    pub fn on_connectivity_lost(&mut self, err: RaffleError) -> Vec<Effect> {
        warn!(%err, "RPC endpoint unreachable");
        self.connected = false;
        self.push_errors(vec![format!("RPC endpoint unreachable: {err}")]);
        self.set_status("Waiting for RPC endpoint...");
        Vec::new()
    }

    pub fn request_refresh(&mut self) -> Vec<Effect> {
        match self.network.contract_address {
            Some(raffle) => {
                self.set_status("Refreshing...");
                vec![Effect::RefreshSnapshot { raffle }]
            }
            None => Vec::new(),
        }
    }

    pub fn on_snapshot(
        &mut self,
        raffle: Address,
        result: Result<SnapshotReading, RaffleError>,
    ) -> Vec<Effect> {
        if self.network.contract_address != Some(raffle) {
            debug!(%raffle, "dropping snapshot for a raffle no longer shown");
            return Vec::new();
        }
        match result {
            Ok(reading) => {
                self.snapshot.apply_reading(reading);
                self.set_status("Ready");
            }
            Err(err) => {
                warn!(%raffle, %err, "snapshot refresh failed");
                self.push_errors(vec![format!("Refresh failed: {err}")]);
                self.set_status("Refresh failed; showing last known state");
            }
        }
        Vec::new()
    }

    pub fn on_winners(&mut self, raffle: Address, logs: &[WinnerLog]) -> Vec<Effect> {
        if self.network.contract_address != Some(raffle) {
            debug!(%raffle, "dropping winner logs for a raffle no longer shown");
            return Vec::new();
        }
        let Some(first) = logs.first() else {
            return Vec::new();
        };
        info!(winner = %first.winner, block = ?first.block_number, "winner picked");
        self.snapshot.apply_winner(first.winner);
        self.set_status(format!("Winner picked: {}", first.winner));
        vec![Effect::Notify(Notification::winner_picked(first.winner))]
    }

    pub fn on_subscription_failed(
        &mut self,
        raffle: Address,
        err: RaffleError,
    ) -> Vec<Effect> {
        if self.network.contract_address != Some(raffle) {
            return Vec::new();
        }
        self.push_errors(vec![format!("Winner subscription failed: {err}")]);
        Vec::new()
    }

    /// The winner log stream closed without being cancelled. Listen again so
    /// later rounds are still shown.
    pub fn on_subscription_ended(&mut self, raffle: Address) -> Vec<Effect> {
        if self.network.contract_address != Some(raffle) {
            return Vec::new();
        }
        warn!(%raffle, "winner subscription ended; resubscribing");
        self.push_errors(vec![String::from(
            "Winner subscription ended; resubscribing",
        )]);
        vec![Effect::Subscribe { raffle }]
    }

    pub fn request_enter(&mut self) -> Vec<Effect> {
        let raffle = match self.network.require_contract() {
            Ok(raffle) => raffle,
            Err(err) => {
                debug!(%err, "entry ignored");
                return Vec::new();
            }
        };
        if !self.can_sign {
            self.set_status("Read-only: load a wallet with --keystore or --private-key-env");
            return Vec::new();
        }
        if self.pending.is_active() {
            return Vec::new();
        }
        if !self.snapshot.is_loaded() {
            self.set_status("Waiting for raffle state; press r to refresh");
            return Vec::new();
        }
        let value = self.snapshot.entrance_fee();
        self.pending.start();
        self.write_state = WriteState::Submitting;
        self.set_status("Entering raffle...");
        vec![Effect::SubmitEntry { raffle, value }]
    }

    pub fn on_write(&mut self, event: WriteEvent) -> Vec<Effect> {
        match event {
            WriteEvent::Submitted(transaction_hash) => {
                self.pending.submitted();
                self.write_state = WriteState::Confirming;
                self.set_status(format!("Entry sent ({transaction_hash}); confirming..."));
                Vec::new()
            }
            WriteEvent::Confirmed(confirmation) => {
                self.pending.settle();
                self.write_state = WriteState::Idle;
                self.last_write = Some(WriteOutcome::Succeeded(confirmation));
                self.set_status("Ready");
                let mut effects = vec![Effect::Notify(Notification::transaction_complete())];
                if let Some(raffle) = self.network.contract_address {
                    effects.push(Effect::RefreshSnapshot { raffle });
                }
                effects
            }
            WriteEvent::Failed(err) => {
                error!(%err, "raffle entry failed");
                self.pending.settle();
                self.write_state = WriteState::Idle;
                self.last_write = Some(WriteOutcome::Failed(err));
                self.set_status("Ready");
                Vec::new()
            }
        }
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
    }

    fn push_errors(&mut self, mut items: Vec<String>) {
        if items.is_empty() {
            return;
        }
        self.errors.append(&mut items);
        if self.errors.len() > MAX_ERRORS {
            let drain = self.errors.len() - MAX_ERRORS;
            self.errors.drain(0..drain);
        }
    }
}
