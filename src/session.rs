use crate::{
    addresses::AddressTable,
    contract::RaffleBackend,
    controller::{
        AppController,
        Effect,
    },
    dispatcher,
    events::AppEvent,
    fetcher,
    notify::NotificationSink,
    subscriber::{
        RearmPolicy,
        WinnerSubscription,
    },
};
use tokio::sync::mpsc;
use tracing::debug;

/// Binds the controller to a backend: events go in, effects get carried out.
/// Background work reports back through the channel returned by `new`.
pub struct Session<B: RaffleBackend, S: NotificationSink> {
    backend: B,
    controller: AppController,
    sink: S,
    policy: RearmPolicy,
    events: mpsc::UnboundedSender<AppEvent>,
    subscription: Option<WinnerSubscription>,
}

impl<B: RaffleBackend, S: NotificationSink> Session<B, S> {
    pub fn new(
        backend: B,
        table: AddressTable,
        sink: S,
        policy: RearmPolicy,
    ) -> (Self, mpsc::UnboundedReceiver<AppEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let controller = AppController::new(table, backend.can_sign());
        let session = Self {
            backend,
            controller,
            sink,
            policy,
            events,
            subscription: None,
        };
        (session, rx)
    }

    pub fn controller(&self) -> &AppController {
        &self.controller
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn subscription(&self) -> Option<&WinnerSubscription> {
        self.subscription.as_ref()
    }

    /// Sender for workers that live outside the session, such as the
    /// network monitor.
    pub fn event_sender(&self) -> mpsc::UnboundedSender<AppEvent> {
        self.events.clone()
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        let effects = self.controller.handle_event(event);
        self.execute(effects);
    }

    pub fn request_enter(&mut self) {
        let effects = self.controller.request_enter();
        self.execute(effects);
    }

    pub fn request_refresh(&mut self) {
        let effects = self.controller.request_refresh();
        self.execute(effects);
    }

    fn execute(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            debug!(?effect, "executing effect");
            match effect {
                Effect::RefreshSnapshot { raffle } => {
                    fetcher::spawn_refresh(self.backend.clone(), raffle, self.events.clone());
                }
                Effect::Subscribe { raffle } => {
                    self.subscription = Some(WinnerSubscription::subscribe(
                        self.backend.clone(),
                        raffle,
                        self.policy,
                        self.events.clone(),
                    ));
                }
                Effect::CancelSubscription => {
                    if let Some(mut subscription) = self.subscription.take() {
                        subscription.cancel();
                    }
                }
                Effect::SubmitEntry { raffle, value } => {
                    dispatcher::spawn_enter(
                        self.backend.clone(),
                        raffle,
                        value,
                        self.events.clone(),
                    );
                }
                Effect::Notify(notification) => self.sink.dispatch(notification),
            }
        }
    }

    pub fn shutdown(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
        }
    }
}
