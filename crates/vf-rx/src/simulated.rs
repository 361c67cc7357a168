//! Timer-driven receivers that cast synthetic votes.
//!
//! They exercise everything downstream of a receiver without any network:
//! every `interval` one of three fixed users votes a random digit `1..=4`.

use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};
use vf_core::bus::{VoteBus, VoteSubscription};
use vf_core::config::ReceiverConfig;
use vf_core::error::VoteError;
use vf_core::types::{ConnectionState, StateCell, VoteEvent};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

/// Which platform's users a [`SimulatedReceiver`] impersonates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    TikTok,
    YouTube,
}

impl Profile {
    fn name(self) -> &'static str {
        match self {
            Profile::TikTok => "tiktok_test",
            Profile::YouTube => "youtube_test",
        }
    }

    fn users(self) -> [&'static str; 3] {
        match self {
            Profile::TikTok => ["TikTokUser1", "TikTokUser2", "TikTokUser3"],
            Profile::YouTube => ["TestUser1", "TestUser2", "TestUser3"],
        }
    }

    fn client_id(self, user: &str) -> String {
        match self {
            Profile::TikTok => user.to_string(),
            Profile::YouTube => format!("test_channel_{}", user.to_lowercase()),
        }
    }
}

/// Synthetic voting receiver.
pub struct SimulatedReceiver {
    profile: Profile,
    interval: Duration,
    seed: Option<u64>,
    bus: VoteBus,
    state: StateCell,
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl SimulatedReceiver {
    pub fn new(profile: Profile, interval: Duration) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            profile,
            interval,
            seed: None,
            bus: VoteBus::new(),
            state: StateCell::new(),
            shutdown_tx,
            task: None,
        }
    }

    /// Build from config; `simulate_interval_ms` overrides the 2s default.
    pub fn from_receiver(profile: Profile, cfg: &ReceiverConfig) -> Self {
        let interval = cfg.simulate_interval_ms.map(Duration::from_millis).unwrap_or(DEFAULT_INTERVAL);
        Self::new(profile, interval)
    }

    /// Make the vote sequence reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

#[async_trait]
impl crate::VotingReceiver for SimulatedReceiver {
    fn name(&self) -> &str {
        self.profile.name()
    }

    fn state(&self) -> ConnectionState {
        self.state.get()
    }

    fn subscribe(&self) -> VoteSubscription {
        self.bus.subscribe()
    }

    async fn init(&mut self) -> bool {
        let name = self.profile.name();
        if self.state.get() == ConnectionState::Stopped {
            warn!("[{name}] init after stop ignored");
            return false;
        }
        if self.task.is_some() {
            return true;
        }

        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let task = simulate(self.profile, self.interval, rng, self.bus.clone(), self.shutdown_tx.subscribe());
        self.task = Some(tokio::spawn(task));
        self.state.set(ConnectionState::Connected);
        info!("[{name}] simulated receiver started, one vote every {:?}", self.interval);
        true
    }

    async fn send_message(&self, _message: &str) -> Result<(), VoteError> {
        Err(VoteError::NotSupported("sending messages"))
    }

    async fn stop(&mut self) {
        self.shutdown_tx.send_replace(true);
        if let Some(task) = self.task.take() {
            // the loop exits on the next poll of the shutdown branch
            let _ = task.await;
        }
        if self.state.get() != ConnectionState::Stopped {
            self.state.set(ConnectionState::Stopped);
            info!("[{}] stopped", self.profile.name());
        }
    }
}

async fn simulate(
    profile: Profile,
    period: Duration,
    mut rng: StdRng,
    bus: VoteBus,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let users = profile.users();

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown_rx.changed() => break,
        }
        let user = users[rng.gen_range(0..users.len())];
        let digit: u8 = rng.gen_range(1..=4);
        if let Some(vote) = VoteEvent::try_new(user, &profile.client_id(user), &digit.to_string()) {
            info!("[{}] simulated vote from {user}: {digit}", profile.name());
            bus.emit(vote);
        }
    }
}
