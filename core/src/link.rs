//! Connection manager and reading forwarder
//!
//! [`TelemetryLink`] owns the single [`Connection`] to the cloud endpoint. It
//! does no I/O of its own: the caller dials the endpoint, then reports what
//! happened (`on_open`, `on_message`, `on_closed`) and hands in a
//! [`TextSink`] whenever something has to be transmitted.
//!
//! ```text
//!   Idle ──Start──► Connecting ──Opened──► Open ──Registered──► Registered
//!                       │                   │                       │
//!                       └──────Closed───────┴────────Closed─────────┴──► Closed
//! ```
//!
//! The readiness flag is kept apart from the state. It is set by a
//! successful registration and only read by [`TelemetryLink::send_data`];
//! closing the socket does not clear it.

use relay_hal::{TextSink, WallClock};

use crate::config::{Endpoint, RelayConfig};
use crate::fmt::Dbg;
use crate::message::{self, CorrelationId};
use crate::reading::Reading;

/// Lifecycle of the cloud connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkState {
    /// Not started
    Idle,
    /// Socket open requested
    Connecting,
    /// Socket open, registration not yet sent
    Open,
    /// Registration sent
    Registered,
    /// Socket closed; terminal
    Closed,
}

/// Named transitions of [`LinkState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkEvent {
    Start,
    Opened,
    Registered,
    Closed,
}

impl LinkState {
    /// State after `event`, or `None` if the transition is not allowed
    pub const fn on(self, event: LinkEvent) -> Option<LinkState> {
        match (self, event) {
            (Self::Idle, LinkEvent::Start) => Some(Self::Connecting),
            (Self::Connecting, LinkEvent::Opened) => Some(Self::Open),
            (Self::Open, LinkEvent::Registered) => Some(Self::Registered),
            (Self::Connecting | Self::Open | Self::Registered, LinkEvent::Closed) => {
                Some(Self::Closed)
            }
            _ => None,
        }
    }
}

/// The one connection the relay keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Connection {
    /// Where the socket is dialed
    pub endpoint: Endpoint,
    state: LinkState,
    ready: bool,
}

impl Connection {
    /// Fresh, idle connection record
    pub const fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            state: LinkState::Idle,
            ready: false,
        }
    }

    /// Current lifecycle state
    pub const fn state(&self) -> LinkState {
        self.state
    }

    /// Whether readings may be sent
    pub const fn is_ready(&self) -> bool {
        self.ready
    }

    fn apply(&mut self, event: LinkEvent) -> bool {
        match self.state.on(event) {
            Some(next) => {
                debug!("Link {:?} -> {:?}", self.state, next);
                self.state = next;
                true
            }
            None => {
                warn!("Ignoring {:?} while {:?}", event, self.state);
                false
            }
        }
    }
}

/// Outcome of one [`TelemetryLink::send_data`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Delivery {
    /// Data message handed to the socket
    Sent,
    /// Not registered; nothing transmitted
    Skipped,
    /// Encoding or transmission failed; the reading is gone
    Dropped,
}

/// Connection manager plus reading forwarder
pub struct TelemetryLink<C> {
    config: RelayConfig,
    clock: C,
    connection: Connection,
}

impl<C: WallClock> TelemetryLink<C> {
    /// Create an idle link
    ///
    /// # Arguments
    ///
    /// * `config` - Endpoint, identity and sensor settings
    /// * `clock` - Wall clock used for timestamps and correlation ids
    pub fn new(config: RelayConfig, clock: C) -> Self {
        let connection = Connection::new(config.endpoint);
        Self {
            config,
            clock,
            connection,
        }
    }

    /// Request the socket to be opened
    ///
    /// Returns the endpoint the caller must dial, or `None` if the link was
    /// already started. A link is started at most once.
    pub fn start(&mut self) -> Option<Endpoint> {
        if !self.connection.apply(LinkEvent::Start) {
            warn!("Link already started; not opening another socket");
            return None;
        }
        info!(
            "Opening socket to {}:{}{}",
            self.connection.endpoint.host,
            self.connection.endpoint.port,
            self.connection.endpoint.path
        );
        Some(self.connection.endpoint)
    }

    /// Socket is open; registers the device over `sink`
    pub async fn on_open<S: TextSink>(&mut self, sink: &mut S) {
        if !self.connection.apply(LinkEvent::Opened) {
            return;
        }
        info!("Socket open");
        self.register(sink).await;
    }

    /// Send the registration message and mark the link ready
    ///
    /// Failures are logged and leave the link unready. There is no retry.
    pub async fn register<S: TextSink>(&mut self, sink: &mut S) {
        if self.connection.state != LinkState::Open {
            warn!("Cannot register while {:?}", self.connection.state);
            return;
        }

        let cid = CorrelationId::from_millis(self.clock.now_millis());
        let msg = match message::encode_register(&self.config.identity, cid) {
            Ok(msg) => msg,
            Err(e) => {
                error!("Failed to encode registration: {:?}", e);
                return;
            }
        };

        match sink.send_text(&msg).await {
            Ok(()) => {
                self.connection.ready = true;
                self.connection.apply(LinkEvent::Registered);
                info!("Registered device {} (cid {})", self.config.identity.sdid(), cid.as_millis());
            }
            Err(e) => error!("Failed to send registration: {:?}", Dbg(&e)),
        }
    }

    /// Inbound message; logged only
    pub fn on_message(&mut self, text: &str) {
        info!("Received message: {}", text);
    }

    /// Socket closed or failed to open
    ///
    /// Only the state changes. The readiness flag is left as it was, so a
    /// send after closure is attempted and fails at the socket.
    pub fn on_closed(&mut self) {
        if self.connection.apply(LinkEvent::Closed) {
            info!("Socket closed");
        }
    }

    /// Forward one temperature reading if registered
    ///
    /// # Arguments
    ///
    /// * `sink` - Open socket
    /// * `value` - Temperature in °C
    pub async fn send_data<S: TextSink>(&mut self, sink: &mut S, value: f32) -> Delivery {
        if !self.connection.ready {
            info!("Not registered; skipping reading {}", value);
            return Delivery::Skipped;
        }

        let reading = Reading::capture(value, &mut self.clock);
        let cid = CorrelationId::from_millis(self.clock.now_millis());
        let msg = match message::encode_data(&self.config.identity, &reading, cid) {
            Ok(msg) => msg,
            Err(e) => {
                error!("Failed to encode reading {}: {:?}", value, e);
                return Delivery::Dropped;
            }
        };

        match sink.send_text(&msg).await {
            Ok(()) => {
                info!("Sent reading {} (ts {})", value, reading.captured_at_ms);
                Delivery::Sent
            }
            Err(e) => {
                error!("Failed to send reading {}: {:?}", value, Dbg(&e));
                Delivery::Dropped
            }
        }
    }

    /// Connection record
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Current lifecycle state
    pub fn state(&self) -> LinkState {
        self.connection.state
    }

    /// Whether readings will be sent
    pub fn is_ready(&self) -> bool {
        self.connection.ready
    }

    /// Configuration this link was built with
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeviceIdentity;
    use embassy_futures::block_on;

    /// Records every message; optionally fails every send
    #[derive(Default)]
    struct RecordingSink {
        sent: Vec<String>,
        fail: bool,
    }

    impl TextSink for RecordingSink {
        type Error = &'static str;

        async fn send_text(&mut self, text: &str) -> Result<(), Self::Error> {
            if self.fail {
                return Err("socket gone");
            }
            self.sent.push(text.to_string());
            Ok(())
        }
    }

    /// Advances one millisecond per read
    struct SteppingClock(u64);

    impl WallClock for SteppingClock {
        fn now_millis(&mut self) -> u64 {
            self.0 += 1;
            self.0
        }
    }

    fn link() -> TelemetryLink<SteppingClock> {
        let _ = env_logger::builder().is_test(true).try_init();
        let identity = DeviceIdentity::new("X", "abc123").unwrap();
        TelemetryLink::new(RelayConfig::new(identity), SteppingClock(1_700_000_000_000))
    }

    fn registered(sink: &mut RecordingSink) -> TelemetryLink<SteppingClock> {
        let mut link = link();
        link.start().unwrap();
        block_on(link.on_open(sink));
        link
    }

    #[test]
    fn test_transition_table() {
        use LinkEvent as E;
        use LinkState as S;

        assert_eq!(S::Idle.on(E::Start), Some(S::Connecting));
        assert_eq!(S::Connecting.on(E::Opened), Some(S::Open));
        assert_eq!(S::Open.on(E::Registered), Some(S::Registered));
        for s in [S::Connecting, S::Open, S::Registered] {
            assert_eq!(s.on(E::Closed), Some(S::Closed));
        }

        assert_eq!(S::Idle.on(E::Opened), None);
        assert_eq!(S::Idle.on(E::Closed), None);
        assert_eq!(S::Connecting.on(E::Start), None);
        assert_eq!(S::Connecting.on(E::Registered), None);
        assert_eq!(S::Closed.on(E::Start), None);
        assert_eq!(S::Closed.on(E::Opened), None);
    }

    #[test]
    fn test_open_registers_once_and_sets_ready() {
        let mut sink = RecordingSink::default();
        let link = registered(&mut sink);

        assert_eq!(link.state(), LinkState::Registered);
        assert!(link.is_ready());
        assert_eq!(
            sink.sent,
            [r#"{"type":"register","sdid":"X","Authorization":"bearer abc123","cid":"1700000000001"}"#]
        );
    }

    #[test]
    fn test_send_before_open_is_skipped() {
        let mut sink = RecordingSink::default();
        let mut link = link();

        assert_eq!(block_on(link.send_data(&mut sink, 23.5)), Delivery::Skipped);
        link.start().unwrap();
        assert_eq!(block_on(link.send_data(&mut sink, 23.5)), Delivery::Skipped);
        assert!(sink.sent.is_empty());
    }

    #[test]
    fn test_send_when_ready_transmits_one_message() {
        let mut sink = RecordingSink::default();
        let mut link = registered(&mut sink);

        assert_eq!(block_on(link.send_data(&mut sink, 23.5)), Delivery::Sent);
        assert_eq!(sink.sent.len(), 2);
        assert_eq!(
            sink.sent[1],
            r#"{"sdid":"X","ts":1700000000002,"data":{"currentTemp":23.5},"cid":"1700000000003"}"#
        );
    }

    #[test]
    fn test_correlation_ids_are_fresh_per_message() {
        let mut sink = RecordingSink::default();
        let mut link = registered(&mut sink);
        block_on(link.send_data(&mut sink, 20.0));
        block_on(link.send_data(&mut sink, 21.0));

        let cids: Vec<&str> = sink
            .sent
            .iter()
            .map(|m| m.rsplit("\"cid\":\"").next().unwrap().trim_end_matches("\"}"))
            .collect();
        assert_eq!(cids, ["1700000000001", "1700000000003", "1700000000005"]);
    }

    #[test]
    fn test_failed_registration_leaves_unready() {
        let mut sink = RecordingSink {
            fail: true,
            ..Default::default()
        };
        let mut link = registered(&mut sink);

        assert_eq!(link.state(), LinkState::Open);
        assert!(!link.is_ready());

        sink.fail = false;
        assert_eq!(block_on(link.send_data(&mut sink, 23.5)), Delivery::Skipped);
        assert!(sink.sent.is_empty());
    }

    #[test]
    fn test_failed_send_is_dropped_without_retry() {
        let mut sink = RecordingSink::default();
        let mut link = registered(&mut sink);

        sink.fail = true;
        assert_eq!(block_on(link.send_data(&mut sink, 23.5)), Delivery::Dropped);
        assert_eq!(sink.sent.len(), 1);
    }

    #[test]
    fn test_non_finite_reading_dropped() {
        let mut sink = RecordingSink::default();
        let mut link = registered(&mut sink);
        assert_eq!(block_on(link.send_data(&mut sink, f32::NAN)), Delivery::Dropped);
        assert_eq!(sink.sent.len(), 1);
    }

    #[test]
    fn test_close_does_not_reset_ready() {
        let mut sink = RecordingSink::default();
        let mut link = registered(&mut sink);

        link.on_closed();
        assert_eq!(link.state(), LinkState::Closed);
        assert!(link.is_ready());

        // The guard still passes, so the send reaches the (dead) socket
        sink.fail = true;
        assert_eq!(block_on(link.send_data(&mut sink, 23.5)), Delivery::Dropped);
    }

    #[test]
    fn test_start_only_once() {
        let mut link = link();
        assert_eq!(link.start(), Some(Endpoint::DEFAULT));
        assert_eq!(link.start(), None);

        link.on_closed();
        assert_eq!(link.start(), None);
        assert_eq!(link.state(), LinkState::Closed);
    }

    #[test]
    fn test_open_failure_marks_closed() {
        let mut link = link();
        link.start().unwrap();
        link.on_closed();

        let mut sink = RecordingSink::default();
        block_on(link.on_open(&mut sink));
        assert_eq!(link.state(), LinkState::Closed);
        assert!(sink.sent.is_empty());
    }

    #[test]
    fn test_register_requires_open_socket() {
        let mut sink = RecordingSink::default();
        let mut link = registered(&mut sink);

        block_on(link.register(&mut sink));
        assert_eq!(sink.sent.len(), 1);
        assert_eq!(link.state(), LinkState::Registered);
    }

    #[test]
    fn test_inbound_messages_are_only_logged() {
        let mut sink = RecordingSink::default();
        let mut link = registered(&mut sink);
        link.on_message(r#"{"data":{"code":"200"}}"#);
        assert_eq!(link.state(), LinkState::Registered);
        assert_eq!(sink.sent.len(), 1);
    }
}
