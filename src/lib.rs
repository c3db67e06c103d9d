pub mod abi;
pub mod addresses;
pub mod cli;
pub mod client;
pub mod contract;
pub mod controller;
pub mod dispatcher;
pub mod events;
pub mod fetcher;
pub mod logging;
pub mod network;
pub mod notify;
pub mod session;
pub mod snapshot;
pub mod subscriber;
pub mod ui;
pub mod wallets;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
