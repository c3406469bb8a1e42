//! # Test Fixtures
//!
//! A `Link` is two processes' worth of plumbing in one: each side owns a
//! router fed by its own channel thread, and sends to the other side.
//!
//! ```text
//!  left.sender ──► [pump thread] ──► right.router
//!  left.router ◄── [pump thread] ◄── right.sender
//! ```

use courier_telemetry::{init_logging, TelemetryConfig};
use parking_lot::Mutex;
use shared_bus::{ChannelError, ChannelSender, InMemoryChannel, MessageChannel, PumpHandle, TypedMessageRouter};
use shared_types::TypedMessage;
use std::sync::{Arc, Once};
use std::time::{Duration, Instant};

/// Default bound for anything a test waits on.
pub const WAIT: Duration = Duration::from_secs(5);

static LOGGING: Once = Once::new();

/// Install logging once per test binary. `CR_LOG_LEVEL=debug` shows the
/// full message flow.
pub fn init_test_logging() {
    LOGGING.call_once(|| {
        let mut config = TelemetryConfig::for_service("cr-tests");
        if std::env::var("CR_LOG_LEVEL").is_err() && std::env::var("RUST_LOG").is_err() {
            config.log_level = "warn".to_string();
        }
        let _ = init_logging(&config);
    });
}

/// Channel that forwards to a real sender and records what passed.
pub struct TapChannel {
    inner: ChannelSender,
    log: Mutex<Vec<TypedMessage>>,
}

impl TapChannel {
    pub fn new(inner: ChannelSender) -> Arc<Self> {
        Arc::new(Self {
            inner,
            log: Mutex::new(Vec::new()),
        })
    }

    /// Every message sent so far, in order.
    pub fn sent(&self) -> Vec<TypedMessage> {
        self.log.lock().clone()
    }
}

impl MessageChannel for TapChannel {
    fn send(&self, message: TypedMessage) -> Result<(), ChannelError> {
        self.log.lock().push(message.clone());
        self.inner.send(message)
    }
}

/// One side of a `Link`.
pub struct Side {
    pub router: Arc<TypedMessageRouter>,
    pub channel: Arc<TapChannel>,
    pump: Option<PumpHandle>,
}

impl Side {
    /// Stop this side's channel thread and return how many messages it
    /// delivered.
    pub fn stop(&mut self) -> u64 {
        match self.pump.take() {
            Some(pump) => pump.join().unwrap_or(0),
            None => 0,
        }
    }
}

impl Drop for Side {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Two sides connected by an in-memory channel pair.
pub struct Link {
    pub left: Side,
    pub right: Side,
}

impl Link {
    pub fn new() -> Self {
        init_test_logging();

        let (left, right) = InMemoryChannel::pair();
        let (left_sender, left_pump) = left.into_parts();
        let (right_sender, right_pump) = right.into_parts();

        let left_router = Arc::new(TypedMessageRouter::new());
        let right_router = Arc::new(TypedMessageRouter::new());

        Self {
            left: Side {
                pump: left_pump.spawn(left_router.clone()).ok(),
                router: left_router,
                channel: TapChannel::new(left_sender),
            },
            right: Side {
                pump: right_pump.spawn(right_router.clone()).ok(),
                router: right_router,
                channel: TapChannel::new(right_sender),
            },
        }
    }
}

impl Default for Link {
    fn default() -> Self {
        Self::new()
    }
}

/// Poll `condition` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}
