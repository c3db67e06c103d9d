use crate::{
    addresses::AddressTable,
    contract::{
        AlloyBackend,
        RaffleBackend,
    },
    events::AppEvent,
    notify::Toasts,
    session::Session,
    subscriber::RearmPolicy,
    ui,
};
use alloy::{
    primitives::Address,
    signers::local::PrivateKeySigner,
};
use chrono::Utc;
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use std::time::Duration;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time,
};
use tracing::{
    info,
    warn,
};
use url::Url;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(4);
const REDRAW_INTERVAL: Duration = Duration::from_millis(150);

pub struct AppConfig {
    pub rpc_url: Url,
    pub addresses: AddressTable,
    pub signer: Option<PrivateKeySigner>,
    pub policy: RearmPolicy,
    pub poll_interval: Duration,
}

pub async fn run_app(config: AppConfig) -> Result<()> {
    let AppConfig {
        rpc_url,
        addresses,
        signer,
        policy,
        poll_interval,
    } = config;
    let backend = AlloyBackend::connect(rpc_url, signer, poll_interval);
    let wallet = backend.signer_address();
    let (session, events) = Session::new(backend.clone(), addresses, Toasts::default(), policy);
    let monitor = spawn_network_monitor(backend, poll_interval, session.event_sender());

    let mut ui_state = ui::UiState::default();
    let mut input_events = ui::input_event_stream();
    info!("Starting UI");
    ui::terminal_enter(&mut ui_state)?;
    let res = run_loop(session, events, wallet, &mut ui_state, &mut input_events).await;
    monitor.abort();
    ui::terminal_exit()?;
    res
}

fn redraw<B: RaffleBackend>(
    ui_state: &mut ui::UiState,
    session: &Session<B, Toasts>,
    wallet: Option<Address>,
) -> Result<()> {
    let view = ui::View {
        controller: session.controller(),
        toasts: session.sink(),
        wallet,
    };
    ui::draw(ui_state, &view)
}

async fn run_loop<B: RaffleBackend>(
    mut session: Session<B, Toasts>,
    mut events: mpsc::UnboundedReceiver<AppEvent>,
    wallet: Option<Address>,
    ui_state: &mut ui::UiState,
    input_events: &mut ui::InputEventReceiver,
) -> Result<()> {
    info!("Running app loop");
    let mut ticker = time::interval(REDRAW_INTERVAL);
    redraw(ui_state, &session, wallet).wrap_err("initial draw failed")?;

    loop {
        tokio::select! {
            maybe_event = events.recv() => {
                let Some(event) = maybe_event else {
                    warn!("event channel closed");
                    break;
                };
                session.handle_event(event);
                redraw(ui_state, &session, wallet).wrap_err("draw after event failed")?;
            }
            _ = ticker.tick() => {
                let expired = session.sink_mut().prune(Utc::now());
                let pending = session.controller().pending().is_active();
                if pending {
                    ui_state.tick();
                }
                if expired || pending {
                    redraw(ui_state, &session, wallet).wrap_err("draw on tick failed")?;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
            raw_ev = ui::next_raw_event(input_events) => {
                let Some(ev) = ui::interpret_event(ui_state, raw_ev?) else {
                    continue;
                };
                match ev {
                    ui::UserEvent::Quit => break,
                    ui::UserEvent::EnterRaffle => session.request_enter(),
                    ui::UserEvent::Refresh => session.request_refresh(),
                    ui::UserEvent::Redraw => {}
                }
                redraw(ui_state, &session, wallet).wrap_err("draw after input failed")?;
            }
        }
    }
    session.shutdown();
    Ok(())
}

/// Poll the endpoint's chain id. A changed id is posted as `NetworkDetected`;
/// the first failure after a success is posted as `ConnectivityLost`, and the
/// id is reported again once the endpoint answers.
pub fn spawn_network_monitor<B: RaffleBackend>(
    backend: B,
    poll_interval: Duration,
    events: mpsc::UnboundedSender<AppEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(poll_interval);
        let mut last_seen: Option<u64> = None;
        let mut reachable = true;
        loop {
            ticker.tick().await;
            let event = match backend.chain_id().await {
                Ok(network_id) => {
                    reachable = true;
                    if last_seen == Some(network_id) {
                        continue;
                    }
                    last_seen = Some(network_id);
                    AppEvent::NetworkDetected { network_id }
                }
                Err(err) => {
                    if !reachable {
                        continue;
                    }
                    reachable = false;
                    last_seen = None;
                    AppEvent::ConnectivityLost(err)
                }
            };
            if events.send(event).is_err() {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::{
        network::HARDHAT_CHAIN_ID,
        test_helpers::FakeBackend,
    };

    const TICK: Duration = Duration::from_millis(5);

    async fn next(rx: &mut mpsc::UnboundedReceiver<AppEvent>) -> AppEvent {
        time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("monitor went quiet")
            .expect("monitor channel closed")
    }

    #[tokio::test]
    async fn spawn_network_monitor__reports_initial_and_changed_network() {
        // given
        let backend = FakeBackend::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let monitor = spawn_network_monitor(backend.clone(), TICK, tx);

        // when
        let first = next(&mut rx).await;
        backend.set_chain_id(11155111);
        let second = next(&mut rx).await;

        // then
        assert_eq!(
            first,
            AppEvent::NetworkDetected {
                network_id: HARDHAT_CHAIN_ID
            }
        );
        assert_eq!(
            second,
            AppEvent::NetworkDetected {
                network_id: 11155111
            }
        );
        monitor.abort();
    }

    #[tokio::test]
    async fn spawn_network_monitor__reports_outage_once_and_recovery() {
        // given
        let backend = FakeBackend::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let monitor = spawn_network_monitor(backend.clone(), TICK, tx);
        next(&mut rx).await;

        // when
        backend.set_unreachable(true);
        let lost = next(&mut rx).await;
        time::sleep(TICK * 5).await;
        let quiet = rx.try_recv();
        backend.set_unreachable(false);
        let recovered = next(&mut rx).await;

        // then
        assert!(matches!(lost, AppEvent::ConnectivityLost(_)));
        assert!(quiet.is_err());
        assert_eq!(
            recovered,
            AppEvent::NetworkDetected {
                network_id: HARDHAT_CHAIN_ID
            }
        );
        monitor.abort();
    }
}
