//! Approval fan-out.
//!
//! One owner task holds the subscriber set and serialises every
//! mutation: subscribe requests arrive on a command channel, events
//! arrive from the store's approval stream, and a heartbeat tick keeps
//! intermediaries from closing idle connections. Each subscriber gets a
//! bounded channel; a subscriber that cannot keep up is dropped and may
//! reconnect. There is no replay; the durable rows are the record.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use hivemind_db::ApprovalStream;
use hivemind_types::{ApprovalEvent, CoreError, TenantId};

/// What a subscriber sees on its channel.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundEvent {
    /// Approval visible to every tenant.
    Public(ApprovalEvent),
    /// Approval in the subscriber's own tenant.
    Private(ApprovalEvent),
    /// Keepalive.
    Ping,
}

#[derive(Debug, Clone)]
pub struct NotifierConfig {
    pub buffer: usize,
    pub heartbeat: Duration,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            buffer: 128,
            heartbeat: Duration::from_secs(20),
        }
    }
}

enum Command {
    Subscribe {
        tenant: TenantId,
        reply: oneshot::Sender<Subscription>,
    },
}

/// A live event feed for one subscriber. Dropping it ends the
/// subscription; the owner task reaps the dead channel on next emit.
pub struct Subscription {
    rx: mpsc::Receiver<OutboundEvent>,
}

impl Subscription {
    pub async fn next(&mut self) -> Option<OutboundEvent> {
        self.rx.recv().await
    }

    pub fn into_inner(self) -> mpsc::Receiver<OutboundEvent> {
        self.rx
    }
}

struct Subscriber {
    tenant: TenantId,
    tx: mpsc::Sender<OutboundEvent>,
}

#[derive(Clone)]
pub struct Notifier {
    cmd_tx: mpsc::Sender<Command>,
}

impl Notifier {
    /// Spawn the owner task over the store's approval stream.
    pub fn spawn(stream: ApprovalStream, config: NotifierConfig) -> (Self, JoinHandle<()>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let handle = tokio::spawn(run(stream, cmd_rx, config));
        (Self { cmd_tx }, handle)
    }

    pub async fn subscribe(&self, tenant: TenantId) -> Result<Subscription, CoreError> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Subscribe { tenant, reply })
            .await
            .map_err(|_| CoreError::busy("event fan-out is shutting down"))?;
        rx.await
            .map_err(|_| CoreError::busy("event fan-out is shutting down"))
    }
}

async fn run(mut stream: ApprovalStream, mut cmd_rx: mpsc::Receiver<Command>, config: NotifierConfig) {
    let mut subscribers: Vec<Subscriber> = Vec::new();
    let mut heartbeat = tokio::time::interval(config.heartbeat);
    heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick fires immediately; skip it so heartbeats are evenly
    // spaced from startup.
    heartbeat.tick().await;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => match cmd {
                Some(Command::Subscribe { tenant, reply }) => {
                    let (tx, rx) = mpsc::channel(config.buffer);
                    subscribers.push(Subscriber { tenant, tx });
                    debug!(total = subscribers.len(), "subscriber added");
                    let _ = reply.send(Subscription { rx });
                }
                None => {
                    info!("notifier command channel closed; stopping fan-out");
                    break;
                }
            },
            event = stream.next() => match event {
                Some(event) => fan_out(&mut subscribers, &event),
                None => {
                    warn!("approval stream ended; stopping fan-out");
                    break;
                }
            },
            _ = heartbeat.tick() => {
                deliver_all(&mut subscribers, |_| vec![OutboundEvent::Ping]);
            }
        }
    }
}

fn fan_out(subscribers: &mut Vec<Subscriber>, event: &ApprovalEvent) {
    deliver_all(subscribers, |subscriber| {
        let mut out = Vec::new();
        if event.is_public {
            out.push(OutboundEvent::Public(event.clone()));
        }
        if subscriber.tenant == event.tenant_id {
            out.push(OutboundEvent::Private(event.clone()));
        }
        out
    });
}

/// Deliver per-subscriber events, reaping any subscriber whose channel
/// is gone or full. `try_send` keeps a slow consumer from stalling the
/// owner task.
fn deliver_all<F>(subscribers: &mut Vec<Subscriber>, events_for: F)
where
    F: Fn(&Subscriber) -> Vec<OutboundEvent>,
{
    subscribers.retain(|subscriber| {
        for event in events_for(subscriber) {
            match subscriber.tx.try_send(event) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(tenant = %subscriber.tenant, "subscriber too slow; dropping");
                    return false;
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!(tenant = %subscriber.tenant, "subscriber gone; reaping");
                    return false;
                }
            }
        }
        true
    });
}
