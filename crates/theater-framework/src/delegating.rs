//! # Delegating Musicians
//!
//! A [`DelegatingMusician`] hands its resume-phase work to one background
//! tokio task so the control loop keeps polling at full cadence while the work
//! runs. It also reports a custom status instead of the fixed `"Running"`.
//!
//! ## Status Lifecycle
//!
//! | Moment | Status | Detail |
//! |--------|--------|--------|
//! | Idle between runs | `Idle` | `Running since {start}` or the last failure |
//! | During one dispatch | `MessageHandling` | signal being handled |
//! | Delegated run outstanding | `Working` (or whatever the task sets) | task-defined |
//! | After `INTERRUPT` | `Interrupted` | |
//!
//! At most one delegated run is outstanding. A resume phase that finds the
//! previous run still going skips its turn. On `INTERRUPT` the outstanding run
//! is awaited for the grace period and then left to finish on its own.

use crate::component::{Pollable, ScoreEnd};
use crate::error::{Result, TheaterError};
use crate::message::{Message, Signal, Status, Timestamp};
use crate::musician::{RepliesToSupervisor, SupervisorLink, INTERRUPTED};
use async_trait::async_trait;
use chrono::Local;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const IDLE: &str = "Idle";
pub const MESSAGE_HANDLING: &str = "MessageHandling";
pub const WORKING: &str = "Working";

/// Default wait for an outstanding run once the component was interrupted.
pub const DEFAULT_GRACE: Duration = Duration::from_secs(5);

/// `{status, statusdetail, statustime}` as reported in heartbeats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomStatus {
    pub status: String,
    pub detail: Option<String>,
    pub time: Timestamp,
}

/// Shared status cell, readable by the control loop and writable by the worker.
#[derive(Debug, Clone)]
pub struct StatusCell {
    inner: Arc<Mutex<CustomStatus>>,
}

impl StatusCell {
    pub fn new(status: impl Into<String>, detail: Option<String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CustomStatus {
                status: status.into(),
                detail,
                time: Local::now(),
            })),
        }
    }

    pub fn snapshot(&self) -> CustomStatus {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn status(&self) -> String {
        self.snapshot().status
    }

    pub fn is(&self, status: &str) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .status
            == status
    }

    /// Replaces the whole triple; `statustime` becomes now.
    pub fn set(&self, status: impl Into<String>, detail: Option<String>) {
        self.restore(CustomStatus {
            status: status.into(),
            detail,
            time: Local::now(),
        });
    }

    fn restore(&self, value: CustomStatus) {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = value;
    }

    /// Like `restore`, but an `Interrupted` status is final.
    fn settle(&self, value: CustomStatus) {
        let mut current = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if current.status != INTERRUPTED {
            *current = value;
        }
    }
}

/// Work run on the background worker of a [`DelegatingMusician`].
///
/// `run` takes `&self` because the task is shared with the worker; keep
/// mutable state behind your own lock or in the [`StatusCell`].
#[async_trait]
pub trait DelegatedTask: Send + Sync + 'static {
    async fn run(&self, status: StatusCell) -> Result<()>;

    fn handle_trigger(&self, _msg: &Message, _link: &SupervisorLink) -> Option<Signal> {
        Some(Signal::Trigger)
    }

    fn handle_update(&self, _msg: &Message, _link: &SupervisorLink) -> Option<Signal> {
        Some(Signal::Update)
    }

    fn handle_create(&self, _msg: &Message, _link: &SupervisorLink) -> Option<Signal> {
        Some(Signal::Create)
    }

    fn handle_kill(&self, _msg: &Message, _link: &SupervisorLink) -> Option<Signal> {
        Some(Signal::Kill)
    }
}

/// A musician whose resume phase runs on a single background worker.
pub struct DelegatingMusician<T: DelegatedTask> {
    link: SupervisorLink,
    task: Arc<T>,
    status: StatusCell,
    before_dispatch: Option<CustomStatus>,
    worker: Option<JoinHandle<()>>,
    grace: Duration,
}

impl<T: DelegatedTask> DelegatingMusician<T> {
    pub fn new(link: SupervisorLink, task: T) -> Self {
        let status = StatusCell::new(IDLE, Some(format!("Running since {}", link.started())));
        Self {
            link,
            task: Arc::new(task),
            status,
            before_dispatch: None,
            worker: None,
            grace: DEFAULT_GRACE,
        }
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn status(&self) -> &StatusCell {
        &self.status
    }

    pub fn task(&self) -> &T {
        &self.task
    }

    /// True while a delegated run is outstanding.
    pub fn is_working(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    fn idle_detail(&self) -> String {
        format!("Running since {}", self.link.started())
    }
}

impl<T: DelegatedTask> RepliesToSupervisor for DelegatingMusician<T> {
    fn link(&self) -> &SupervisorLink {
        &self.link
    }

    /// Answers with the status held before the current dispatch began.
    fn status_answer(&self, request: &Status) -> Status {
        let current = self
            .before_dispatch
            .clone()
            .unwrap_or_else(|| self.status.snapshot());
        request
            .clone()
            .with_status(Some(current.status))
            .with_time(Some(Local::now()))
            .with_statustime(Some(current.time))
            .with_statusmessage(current.detail)
    }
}

#[async_trait]
impl<T: DelegatedTask> Pollable for DelegatingMusician<T> {
    fn name(&self) -> &str {
        self.link.name()
    }

    fn before_dispatch(&mut self, msg: &Message) {
        self.before_dispatch = Some(self.status.snapshot());
        self.status
            .set(MESSAGE_HANDLING, Some(format!("Handling {}", msg.signal())));
    }

    fn after_poll(&mut self) {
        let previous = self.before_dispatch.take();
        if !self.status.is(MESSAGE_HANDLING) {
            return;
        }
        match previous {
            Some(previous) if self.is_working() => self.status.restore(previous),
            _ => self.status.set(IDLE, Some(self.idle_detail())),
        }
    }

    fn handle_beat(&mut self, msg: &Message) -> Option<Signal> {
        self.reply_to_beat(msg)
    }

    fn handle_trigger(&mut self, msg: &Message) -> Option<Signal> {
        self.task.handle_trigger(msg, &self.link)
    }

    fn handle_update(&mut self, msg: &Message) -> Option<Signal> {
        self.task.handle_update(msg, &self.link)
    }

    fn handle_create(&mut self, msg: &Message) -> Option<Signal> {
        self.task.handle_create(msg, &self.link)
    }

    fn handle_kill(&mut self, msg: &Message) -> Option<Signal> {
        self.task.handle_kill(msg, &self.link)
    }

    fn on_interrupt(&mut self) {
        self.before_dispatch = None;
        self.status
            .set(INTERRUPTED, Some("End of actors execution".to_string()));
        self.report_interrupted();
    }

    async fn on_resume(&mut self) -> Result<()> {
        if self.is_working() {
            debug!(component = %self.link.name(), "Delegated run still outstanding, skipping");
            return Ok(());
        }
        if let Some(done) = self.worker.take() {
            if let Err(e) = done.await {
                warn!(component = %self.link.name(), error = %e, "Delegated run panicked");
                self.status.set(IDLE, Some(format!("Last run panicked: {e}")));
            }
        }

        self.status.set(WORKING, Some(format!("Run started at {}", Local::now())));
        let task = Arc::clone(&self.task);
        let status = self.status.clone();
        let name = self.link.name().to_string();
        let idle_detail = self.idle_detail();
        self.worker = Some(tokio::spawn(async move {
            match task.run(status.clone()).await {
                Ok(()) => status.settle(CustomStatus {
                    status: IDLE.to_string(),
                    detail: Some(idle_detail),
                    time: Local::now(),
                }),
                Err(e) => {
                    warn!(component = %name, error = %e, "Delegated run failed");
                    status.settle(e.into());
                }
            }
        }));
        Ok(())
    }

    async fn on_score_end(&mut self, _end: &ScoreEnd) {
        let Some(mut worker) = self.worker.take() else {
            return;
        };
        match tokio::time::timeout(self.grace, &mut worker).await {
            Ok(_) => debug!(component = %self.link.name(), "Delegated run finished before exit"),
            Err(_) => info!(
                component = %self.link.name(),
                grace = ?self.grace,
                "Abandoning outstanding delegated run"
            ),
        }
    }
}

impl From<TheaterError> for CustomStatus {
    fn from(error: TheaterError) -> Self {
        Self {
            status: IDLE.to_string(),
            detail: Some(format!("Last run failed: {error}")),
            time: Local::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::dispatch;
    use crate::message::Body;
    use crate::mock::MailboxProbe;
    use tokio::sync::Notify;

    /// Runs until released.
    struct Gate {
        release: Arc<Notify>,
        fail: bool,
    }

    #[async_trait]
    impl DelegatedTask for Gate {
        async fn run(&self, _status: StatusCell) -> Result<()> {
            self.release.notified().await;
            if self.fail {
                return Err(TheaterError::IllegalOperation("gate broke".into()));
            }
            Ok(())
        }
    }

    fn delegating(fail: bool) -> (DelegatingMusician<Gate>, MailboxProbe, Arc<Notify>) {
        let (supervisor, probe) = MailboxProbe::pair(8);
        let release = Arc::new(Notify::new());
        let task = Gate {
            release: Arc::clone(&release),
            fail,
        };
        let link = SupervisorLink::new("cello", supervisor).unwrap();
        (
            DelegatingMusician::new(link, task).with_grace(Duration::from_millis(50)),
            probe,
            release,
        )
    }

    fn msg(signal: Signal, body: Body) -> Message {
        let msg_type = body.shape();
        Message::build("conductor", signal, msg_type, body, None).unwrap()
    }

    #[test]
    fn status_is_message_handling_only_during_dispatch() {
        let (mut cello, _probe, _release) = delegating(false);
        assert!(cello.status().is(IDLE));

        let update = msg(Signal::Update, Body::None);
        cello.before_dispatch(&update);
        assert!(cello.status().is(MESSAGE_HANDLING));
        dispatch(&mut cello, &update);
        cello.after_poll();
        assert!(cello.status().is(IDLE));
    }

    #[test]
    fn status_answer_reports_the_pre_dispatch_status() {
        let (mut cello, mut probe, _release) = delegating(false);
        let request = msg(Signal::Beat, Status::request(Local::now()).into());
        cello.before_dispatch(&request);
        dispatch(&mut cello, &request);
        cello.after_poll();

        let (sender, status) = probe.expect_status();
        assert_eq!(sender, "cello");
        assert_eq!(status.status(), Some(IDLE));
        assert!(status.statusmessage().unwrap().starts_with("Running since"));
    }

    #[tokio::test]
    async fn resume_delegates_and_skips_overlapping_runs() {
        let (mut cello, _probe, release) = delegating(false);
        cello.on_resume().await.unwrap();
        assert!(cello.status().is(WORKING));
        assert!(cello.is_working());

        cello.on_resume().await.unwrap();
        assert!(cello.status().is(WORKING));

        release.notify_one();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!cello.is_working());
        assert!(cello.status().is(IDLE));
    }

    #[tokio::test]
    async fn dispatch_during_a_run_keeps_working_status() {
        let (mut cello, _probe, release) = delegating(false);
        cello.on_resume().await.unwrap();

        let update = msg(Signal::Update, Body::None);
        cello.before_dispatch(&update);
        dispatch(&mut cello, &update);
        cello.after_poll();
        assert!(cello.status().is(WORKING));
        release.notify_one();
    }

    #[tokio::test]
    async fn failed_run_is_recorded_in_the_detail() {
        let (mut cello, _probe, release) = delegating(true);
        cello.on_resume().await.unwrap();
        release.notify_one();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let status = cello.status().snapshot();
        assert_eq!(status.status, IDLE);
        assert!(status.detail.unwrap().contains("gate broke"));
    }

    #[tokio::test]
    async fn interrupt_reports_and_abandons_the_run_after_grace() {
        let (mut cello, mut probe, _release) = delegating(false);
        cello.on_resume().await.unwrap();
        cello.on_interrupt();
        cello.on_score_end(&ScoreEnd::new("test")).await;

        let (_, notice) = probe.expect_status();
        assert_eq!(notice.status(), Some(INTERRUPTED));
        assert!(cello.status().is(INTERRUPTED));
    }

    #[tokio::test]
    async fn run_finishing_within_grace_keeps_interrupted_status() {
        let (mut cello, _probe, release) = delegating(false);
        cello.on_resume().await.unwrap();
        cello.on_interrupt();
        release.notify_one();
        cello.on_score_end(&ScoreEnd::new("test")).await;

        assert!(!cello.is_working());
        assert!(cello.status().is(INTERRUPTED));
    }

    #[test]
    fn errors_become_idle_status_with_detail() {
        let status = CustomStatus::from(TheaterError::QueueFull);
        assert_eq!(status.status, IDLE);
        assert_eq!(status.detail.as_deref(), Some("Last run failed: Mailbox full"));
    }
}
