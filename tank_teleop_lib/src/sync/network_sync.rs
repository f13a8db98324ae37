use crate::{
    ArmCommand, BaseCommand, Diagnostics, JointTelemetry, ModeRouter, ModeStamp, RobotEndpoint,
    RobotState, StatusTelemetry,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};
use uuid::Uuid;

/// A telemetry result waiting to be merged at the start of the next tick,
/// tagged with the mode stamp that was current when the request was issued.
#[derive(Debug, Clone)]
pub enum SyncUpdate {
    Status {
        stamp: ModeStamp,
        telemetry: StatusTelemetry,
    },
    Joints {
        stamp: ModeStamp,
        telemetry: JointTelemetry,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Fields written into the state
    pub applied: usize,
    /// Responses dropped because the mode changed or merging is disabled
    pub discarded: usize,
}

#[derive(Debug, Clone, Copy)]
enum PollKind {
    Status,
    Joints,
}

#[derive(Debug)]
enum Outgoing {
    Base {
        request_id: Uuid,
        command: BaseCommand,
    },
    Arm {
        request_id: Uuid,
        command: ArmCommand,
    },
    Flush(oneshot::Sender<()>),
}

/// Best-effort exchange with the remote robot.
///
/// Pollers run as independent tasks and only enqueue results; nothing
/// touches [`RobotState`] until [`NetworkSync::drain`] is called from the
/// control tick. Pushes never block the tick, but they go through a single
/// dispatcher task so the robot sees them in issue order. Every failure is
/// logged and dropped.
pub struct NetworkSync {
    endpoint: Arc<dyn RobotEndpoint>,
    updates_tx: mpsc::UnboundedSender<SyncUpdate>,
    updates_rx: mpsc::UnboundedReceiver<SyncUpdate>,
    pushes_tx: mpsc::UnboundedSender<Outgoing>,
    // Taken when the dispatcher is started on the first push
    pushes_rx: Option<mpsc::UnboundedReceiver<Outgoing>>,
    pollers: Vec<JoinHandle<()>>,
    diagnostics: Option<Diagnostics>,
}

impl NetworkSync {
    pub fn new(endpoint: Arc<dyn RobotEndpoint>) -> Self {
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let (pushes_tx, pushes_rx) = mpsc::unbounded_channel();
        Self {
            endpoint,
            updates_tx,
            updates_rx,
            pushes_tx,
            pushes_rx: Some(pushes_rx),
            pollers: Vec::new(),
            diagnostics: None,
        }
    }

    /// Handle for feeding updates from outside the built-in pollers.
    pub fn sender(&self) -> mpsc::UnboundedSender<SyncUpdate> {
        self.updates_tx.clone()
    }

    /// Start the status and joint pollers on their own cadences.
    pub fn spawn_pollers(
        &mut self,
        mode: watch::Receiver<ModeStamp>,
        status_period: Duration,
        joint_period: Duration,
    ) {
        for (kind, period) in [
            (PollKind::Status, status_period),
            (PollKind::Joints, joint_period),
        ] {
            let endpoint = Arc::clone(&self.endpoint);
            let updates = self.updates_tx.clone();
            let mode = mode.clone();
            self.pollers
                .push(tokio::spawn(run_poller(endpoint, updates, mode, kind, period)));
        }
        debug!(
            "Telemetry pollers started: status every {:?}, joints every {:?}",
            status_period, joint_period
        );
    }

    /// Apply every queued update to `state`.
    ///
    /// Responses issued under a different mode epoch are discarded. Board
    /// diagnostics are kept regardless of mode since they never touch state.
    pub fn drain(&mut self, state: &mut RobotState, router: &ModeRouter) -> DrainReport {
        let mut report = DrainReport::default();

        while let Ok(update) = self.updates_rx.try_recv() {
            match update {
                SyncUpdate::Status { stamp, telemetry } => {
                    if let Some(diagnostics) = telemetry.diagnostics(Utc::now()) {
                        self.diagnostics = Some(diagnostics);
                    }
                    if router.accepts(stamp) {
                        report.applied += telemetry.merge_into(state);
                    } else {
                        report.discarded += 1;
                    }
                }
                SyncUpdate::Joints { stamp, telemetry } => {
                    if router.accepts(stamp) {
                        report.applied += telemetry.merge_into(state);
                    } else {
                        report.discarded += 1;
                    }
                }
            }
        }

        if report.applied > 0 || report.discarded > 0 {
            debug!(
                "Telemetry merged: {} fields applied, {} responses discarded",
                report.applied, report.discarded
            );
        }
        report
    }

    fn outbox(&mut self) -> &mpsc::UnboundedSender<Outgoing> {
        if let Some(pushes) = self.pushes_rx.take() {
            tokio::spawn(run_dispatcher(Arc::clone(&self.endpoint), pushes));
        }
        &self.pushes_tx
    }

    /// Queue a base command behind everything pushed before it.
    pub fn push_base(&mut self, command: BaseCommand) -> Uuid {
        let request_id = Uuid::new_v4();
        if self
            .outbox()
            .send(Outgoing::Base { request_id, command })
            .is_err()
        {
            warn!("Command dispatcher stopped, base command {} dropped", request_id);
        }
        request_id
    }

    /// Queue a manipulator command behind everything pushed before it.
    pub fn push_arm(&mut self, command: ArmCommand) -> Uuid {
        let request_id = Uuid::new_v4();
        if self
            .outbox()
            .send(Outgoing::Arm { request_id, command })
            .is_err()
        {
            warn!("Command dispatcher stopped, arm command {} dropped", request_id);
        }
        request_id
    }

    /// Wait until every command pushed so far has been attempted.
    pub async fn flush(&mut self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.outbox().send(Outgoing::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }

    /// Latest board readings, if any status poll has carried them.
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        self.diagnostics.as_ref()
    }
}

impl Drop for NetworkSync {
    fn drop(&mut self) {
        for poller in &self.pollers {
            poller.abort();
        }
    }
}

async fn run_dispatcher(
    endpoint: Arc<dyn RobotEndpoint>,
    mut pushes: mpsc::UnboundedReceiver<Outgoing>,
) {
    let mut batch = Vec::new();

    while let Some(first) = pushes.recv().await {
        batch.push(first);
        while let Ok(next) = pushes.try_recv() {
            batch.push(next);
        }
        supersede_before_emergency(&mut batch);

        for outgoing in batch.drain(..) {
            match outgoing {
                Outgoing::Base {
                    request_id,
                    command,
                } => match endpoint.push_base(&command).await {
                    Ok(()) => debug!("Base command {} delivered: {:?}", request_id, command),
                    Err(e) => warn!("Base command {} failed: {:#}", request_id, e),
                },
                Outgoing::Arm {
                    request_id,
                    command,
                } => match endpoint.push_arm(&command).await {
                    Ok(()) => debug!("Arm command {} delivered: {:?}", request_id, command),
                    Err(e) => warn!("Arm command {} failed: {:#}", request_id, e),
                },
                Outgoing::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
    }
}

/// Drop base commands still waiting ahead of the last queued emergency.
fn supersede_before_emergency(batch: &mut Vec<Outgoing>) {
    let Some(last_emergency) = batch.iter().rposition(|outgoing| {
        matches!(outgoing, Outgoing::Base { command, .. } if command.is_emergency())
    }) else {
        return;
    };

    let before = batch.len();
    let mut index = 0;
    batch.retain(|outgoing| {
        let keep = index >= last_emergency || !matches!(outgoing, Outgoing::Base { .. });
        index += 1;
        keep
    });

    if batch.len() < before {
        debug!(
            "Emergency supersedes {} queued base command(s)",
            before - batch.len()
        );
    }
}

async fn run_poller(
    endpoint: Arc<dyn RobotEndpoint>,
    updates: mpsc::UnboundedSender<SyncUpdate>,
    mode: watch::Receiver<ModeStamp>,
    kind: PollKind,
    period: Duration,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let stamp = *mode.borrow();

        let update = match kind {
            PollKind::Status => endpoint
                .fetch_status()
                .await
                .map(|telemetry| SyncUpdate::Status { stamp, telemetry }),
            PollKind::Joints => endpoint
                .fetch_joints()
                .await
                .map(|telemetry| SyncUpdate::Joints { stamp, telemetry }),
        };

        match update {
            Ok(update) => {
                if updates.send(update).is_err() {
                    break;
                }
            }
            Err(e) => warn!("{:?} poll failed: {:#}", kind, e),
        }
    }
}
