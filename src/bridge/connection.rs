//! Connection handle with reconnect and backoff.
//!
//! Everything is driven from [`BridgeConnection::poll`]; nothing blocks and
//! no threads are spawned.

use std::collections::VecDeque;

use tracing::{info, warn};

use super::messages::{decode_update, BridgeCommand};
use super::RemoteScene;
use crate::error::BridgeError;

pub const DEFAULT_OUTBOX_CAPACITY: usize = 256;

/// Frame transport (typically a websocket) supplied by the host.
pub trait Transport {
    fn connect(&mut self) -> Result<(), BridgeError>;
    fn send(&mut self, frame: &str) -> Result<(), BridgeError>;
    /// Next inbound frame, or `None` if nothing is pending.
    fn try_recv(&mut self) -> Result<Option<String>, BridgeError>;
    fn close(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectPolicy {
    pub initial_delay_ms: f64,
    pub multiplier: f64,
    pub max_delay_ms: f64,
    /// Give up after this many consecutive failures; `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: 500.0,
            multiplier: 2.0,
            max_delay_ms: 30_000.0,
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before retry number `failures` (1-based).
    pub fn delay_ms(&self, failures: u32) -> f64 {
        let exp = failures.saturating_sub(1).min(64) as i32;
        (self.initial_delay_ms * self.multiplier.powi(exp)).min(self.max_delay_ms)
    }

    fn exhausted(&self, failures: u32) -> bool {
        self.max_attempts.is_some_and(|max| failures >= max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConnectionState {
    /// Not connected and not trying to be.
    Idle,
    Connected,
    Backoff { failures: u32, retry_at_ms: f64 },
    /// The reconnect policy gave up.
    Failed { failures: u32 },
}

pub struct BridgeConnection<T: Transport> {
    transport: T,
    policy: ReconnectPolicy,
    state: ConnectionState,
    outbox: VecDeque<String>,
    outbox_capacity: usize,
    scene: RemoteScene,
    now_ms: f64,
}

impl<T: Transport> BridgeConnection<T> {
    pub fn new(transport: T, policy: ReconnectPolicy) -> Self {
        Self {
            transport,
            policy,
            state: ConnectionState::Idle,
            outbox: VecDeque::new(),
            outbox_capacity: DEFAULT_OUTBOX_CAPACITY,
            scene: RemoteScene::new(),
            now_ms: 0.0,
        }
    }

    pub fn with_outbox_capacity(mut self, capacity: usize) -> Self {
        self.outbox_capacity = capacity.max(1);
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn scene(&self) -> &RemoteScene {
        &self.scene
    }

    pub fn pending(&self) -> usize {
        self.outbox.len()
    }

    /// Open the connection. On failure a retry is scheduled and the error
    /// is returned.
    pub fn connect(&mut self, now_ms: f64) -> Result<(), BridgeError> {
        self.now_ms = now_ms;
        match self.transport.connect() {
            Ok(()) => {
                self.on_connected();
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "bridge connect failed");
                self.schedule_retry(1);
                Err(e)
            }
        }
    }

    /// Close the connection without scheduling a reconnect. Queued frames
    /// are kept.
    pub fn disconnect(&mut self) {
        self.transport.close();
        self.state = ConnectionState::Idle;
        info!("bridge disconnected");
    }

    /// Send a command, or buffer it until the connection is back.
    pub fn send(&mut self, command: &BridgeCommand) -> Result<(), BridgeError> {
        if let ConnectionState::Failed { failures } = self.state {
            return Err(BridgeError::RetriesExhausted(failures));
        }
        let frame = command.encode()?;
        if self.is_connected() {
            if let Err(e) = self.transport.send(&frame) {
                warn!(error = %e, "bridge send failed");
                self.buffer(frame);
                self.on_lost();
            }
        } else {
            self.buffer(frame);
        }
        Ok(())
    }

    /// Drive reconnects and drain inbound frames into the mirror.
    /// Returns the number of updates applied.
    pub fn poll(&mut self, now_ms: f64) -> Result<usize, BridgeError> {
        self.now_ms = now_ms;
        match self.state {
            ConnectionState::Idle => Ok(0),
            ConnectionState::Failed { failures } => Err(BridgeError::RetriesExhausted(failures)),
            ConnectionState::Backoff {
                failures,
                retry_at_ms,
            } => {
                if now_ms < retry_at_ms {
                    return Ok(0);
                }
                match self.transport.connect() {
                    Ok(()) => {
                        self.on_connected();
                        Ok(self.receive())
                    }
                    Err(e) => {
                        let failures = failures + 1;
                        warn!(failures, error = %e, "bridge reconnect failed");
                        if self.policy.exhausted(failures) {
                            self.state = ConnectionState::Failed { failures };
                            return Err(BridgeError::RetriesExhausted(failures));
                        }
                        self.schedule_retry(failures);
                        Ok(0)
                    }
                }
            }
            ConnectionState::Connected => Ok(self.receive()),
        }
    }

    fn receive(&mut self) -> usize {
        let mut applied = 0;
        loop {
            match self.transport.try_recv() {
                Ok(Some(frame)) => match decode_update(&frame) {
                    Ok(update) => {
                        if self.scene.apply(update) {
                            applied += 1;
                        }
                    }
                    Err(e) => warn!(error = %e, "undecodable frame dropped"),
                },
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "bridge receive failed");
                    self.on_lost();
                    break;
                }
            }
        }
        applied
    }

    fn on_connected(&mut self) {
        self.state = ConnectionState::Connected;
        info!(pending = self.outbox.len(), "bridge connected");
        while let Some(frame) = self.outbox.pop_front() {
            if let Err(e) = self.transport.send(&frame) {
                warn!(error = %e, "flush failed");
                self.outbox.push_front(frame);
                self.on_lost();
                return;
            }
        }
    }

    fn on_lost(&mut self) {
        self.transport.close();
        info!("bridge connection lost");
        self.schedule_retry(1);
    }

    fn schedule_retry(&mut self, failures: u32) {
        let delay = self.policy.delay_ms(failures);
        self.state = ConnectionState::Backoff {
            failures,
            retry_at_ms: self.now_ms + delay,
        };
    }

    fn buffer(&mut self, frame: String) {
        if self.outbox.len() >= self.outbox_capacity {
            self.outbox.pop_front();
            warn!(capacity = self.outbox_capacity, "outbox full, oldest frame dropped");
        }
        self.outbox.push_back(frame);
    }
}
