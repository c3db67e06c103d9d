use crate::abi::Raffle;
use alloy::{
    network::{
        EthereumWallet,
        ReceiptResponse,
    },
    primitives::{
        Address,
        TxHash,
        U256,
    },
    providers::{
        DynProvider,
        PendingTransactionBuilder,
        Provider,
        ProviderBuilder,
    },
    rpc::types::{
        Filter,
        Log,
    },
    signers::local::PrivateKeySigner,
    sol_types::SolEvent,
};
use futures::{
    StreamExt,
    stream::BoxStream,
};
use std::{
    fmt,
    future::Future,
    time::Duration,
};
use url::Url;

pub type WinnerLogStream = BoxStream<'static, Vec<WinnerLog>>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WriteStage {
    Submitting,
    Confirming,
}

impl fmt::Display for WriteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            WriteStage::Submitting => "submitting",
            WriteStage::Confirming => "confirming",
        };
        write!(f, "{stage}")
    }
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum RaffleError {
    #[error("no raffle deployed for network {network_id:?}")]
    Unresolved { network_id: Option<u64> },
    #[error("contract call {call} failed: {reason}")]
    Call { call: &'static str, reason: String },
    #[error("raffle entry failed while {stage}: {reason}")]
    Write { stage: WriteStage, reason: String },
    #[error("no signing key loaded; the client is read-only")]
    ReadOnly,
    #[error("RPC transport error: {0}")]
    Transport(String),
}

impl RaffleError {
    pub fn call(call: &'static str, err: impl fmt::Display) -> Self {
        RaffleError::Call {
            call,
            reason: err.to_string(),
        }
    }

    pub fn write(stage: WriteStage, err: impl fmt::Display) -> Self {
        RaffleError::Write {
            stage,
            reason: err.to_string(),
        }
    }
}

/// Decoded `WinnerPicked` log.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WinnerLog {
    pub winner: Address,
    pub block_number: Option<u64>,
    pub transaction_hash: Option<TxHash>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Confirmation {
    pub transaction_hash: TxHash,
    pub block_number: Option<u64>,
}

/// Everything the client needs from the chain: reads, the entry write, the
/// winner log subscription and the reported chain id. Each contract call names
/// the raffle address it targets.
pub trait RaffleBackend: Clone + Send + Sync + 'static {
    fn chain_id(&self) -> impl Future<Output = Result<u64, RaffleError>> + Send;

    fn entrance_fee(
        &self,
        raffle: Address,
    ) -> impl Future<Output = Result<U256, RaffleError>> + Send;

    fn number_of_players(
        &self,
        raffle: Address,
    ) -> impl Future<Output = Result<U256, RaffleError>> + Send;

    fn recent_winner(
        &self,
        raffle: Address,
    ) -> impl Future<Output = Result<Address, RaffleError>> + Send;

    fn can_sign(&self) -> bool;

    fn enter_raffle(
        &self,
        raffle: Address,
        value: U256,
    ) -> impl Future<Output = Result<TxHash, RaffleError>> + Send;

    fn wait_for_confirmation(
        &self,
        transaction_hash: TxHash,
        confirmations: u64,
    ) -> impl Future<Output = Result<Confirmation, RaffleError>> + Send;

    fn watch_winners(
        &self,
        raffle: Address,
    ) -> impl Future<Output = Result<WinnerLogStream, RaffleError>> + Send;
}

#[derive(Clone)]
pub struct AlloyBackend {
    provider: DynProvider,
    signer: Option<Address>,
    poll_interval: Duration,
}

impl AlloyBackend {
    pub fn connect(
        rpc_url: Url,
        signer: Option<PrivateKeySigner>,
        poll_interval: Duration,
    ) -> Self {
        match signer {
            Some(signer) => {
                let from = signer.address();
                tracing::info!(%from, %rpc_url, "connecting with signing wallet");
                let provider = ProviderBuilder::new()
                    .wallet(EthereumWallet::from(signer))
                    .connect_http(rpc_url)
                    .erased();
                Self {
                    provider,
                    signer: Some(from),
                    poll_interval,
                }
            }
            None => {
                tracing::info!(%rpc_url, "connecting read-only");
                let provider = ProviderBuilder::new().connect_http(rpc_url).erased();
                Self {
                    provider,
                    signer: None,
                    poll_interval,
                }
            }
        }
    }

    pub fn signer_address(&self) -> Option<Address> {
        self.signer
    }

    fn raffle(&self, address: Address) -> Raffle::RaffleInstance<DynProvider> {
        Raffle::new(address, self.provider.clone())
    }
}

fn decode_winner(log: &Log) -> Option<WinnerLog> {
    match log.log_decode::<Raffle::WinnerPicked>() {
        Ok(decoded) => Some(WinnerLog {
            winner: decoded.inner.data.winner,
            block_number: log.block_number,
            transaction_hash: log.transaction_hash,
        }),
        Err(err) => {
            tracing::warn!(?err, "skipping undecodable WinnerPicked log");
            None
        }
    }
}

impl RaffleBackend for AlloyBackend {
    async fn chain_id(&self) -> Result<u64, RaffleError> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| RaffleError::Transport(e.to_string()))
    }

    async fn entrance_fee(&self, raffle: Address) -> Result<U256, RaffleError> {
        self.raffle(raffle)
            .getEntranceFee()
            .call()
            .await
            .map_err(|e| RaffleError::call("getEntranceFee", e))
    }

    async fn number_of_players(&self, raffle: Address) -> Result<U256, RaffleError> {
        self.raffle(raffle)
            .getNumberOfPlayers()
            .call()
            .await
            .map_err(|e| RaffleError::call("getNumberOfPlayers", e))
    }

    async fn recent_winner(&self, raffle: Address) -> Result<Address, RaffleError> {
        self.raffle(raffle)
            .getRecentWinner()
            .call()
            .await
            .map_err(|e| RaffleError::call("getRecentWinner", e))
    }

    fn can_sign(&self) -> bool {
        self.signer.is_some()
    }

    async fn enter_raffle(
        &self,
        raffle: Address,
        value: U256,
    ) -> Result<TxHash, RaffleError> {
        if self.signer.is_none() {
            return Err(RaffleError::ReadOnly);
        }
        let pending = self
            .raffle(raffle)
            .enterRaffle()
            .value(value)
            .send()
            .await
            .map_err(|e| RaffleError::write(WriteStage::Submitting, e))?;
        Ok(*pending.tx_hash())
    }

    async fn wait_for_confirmation(
        &self,
        transaction_hash: TxHash,
        confirmations: u64,
    ) -> Result<Confirmation, RaffleError> {
        let receipt =
            PendingTransactionBuilder::new(self.provider.root().clone(), transaction_hash)
                .with_required_confirmations(confirmations)
                .get_receipt()
                .await
                .map_err(|e| RaffleError::write(WriteStage::Confirming, e))?;
        if !receipt.status() {
            return Err(RaffleError::write(
                WriteStage::Confirming,
                format!("transaction {transaction_hash} reverted"),
            ));
        }
        Ok(Confirmation {
            transaction_hash,
            block_number: receipt.block_number(),
        })
    }

    async fn watch_winners(&self, raffle: Address) -> Result<WinnerLogStream, RaffleError> {
        let filter = Filter::new()
            .address(raffle)
            .event_signature(Raffle::WinnerPicked::SIGNATURE_HASH);
        let poller = self
            .provider
            .watch_logs(&filter)
            .await
            .map_err(|e| RaffleError::call("watchContractEvent(WinnerPicked)", e))?
            .with_poll_interval(self.poll_interval);
        let stream = poller
            .into_stream()
            .map(|logs| logs.iter().filter_map(decode_winner).collect::<Vec<_>>())
            .boxed();
        Ok(stream)
    }
}
