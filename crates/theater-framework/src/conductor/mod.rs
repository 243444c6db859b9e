//! # Conductor
//!
//! The supervisor role. A conductor owns a [`Registry`] of the components it
//! manages, a [`Repertoire`] to start new ones, and its own mailbox, whose
//! producer half is handed to every child as their supervisor channel.
//!
//! ## Heartbeat Fan-out
//!
//! The designated monitor drives liveness checks. For a `BEAT` from sender `S`:
//!
//! | Sender | Body | Action |
//! |--------|------|--------|
//! | unknown | any | ignored |
//! | monitor | `STATUS` request | touch monitor, then sweep every entry |
//! | monitor | `STATUS` report | touch and record |
//! | other child | `STATUS` | touch, record, relay to the monitor as `S` |
//! | any child | `NONE` | touch |
//!
//! A nested conductor also answers its supervisor. Beats signed with the
//! supervisor's name get the conductor's status, and so do `STATUS` requests
//! signed with the supervisor's monitor name, which is how the parent's sweep
//! arrives. When that name is also this conductor's own monitor the two cannot
//! be told apart, so the request is answered upstream and swept locally.
//!
//! During a sweep the monitor's own entry receives the conductor's status
//! (signed by the conductor); every other entry receives the monitor's request
//! re-signed as the monitor. One full mailbox only costs that recipient its beat.
//!
//! ## Lifecycle
//!
//! - [`Conductor::summon`] starts a role from the repertoire and registers it.
//! - A `KILL` whose `TEXT` body names a child interrupts and unregisters it.
//! - Every resume phase reaps children whose loop has ended.
//! - On `INTERRUPT` the conductor forwards it to all children, reports upstream,
//!   and waits up to the shutdown grace for them to stop.

mod registry;
mod repertoire;

pub use registry::{ManagedComponent, Registry};
pub use repertoire::{Casting, Repertoire};

use crate::channel::{self, Consumer, Mailbox, Producer};
use crate::component::{Pollable, ProcessHandle, ScoreEnd, Stage};
use crate::config::{ComponentConfig, ConductorConfig};
use crate::delegating::CustomStatus;
use crate::error::{Result, TheaterError};
use crate::message::{Body, Message, MsgType, Signal, Status, Timestamp};
use crate::musician::{SupervisorLink, INTERRUPTED, RUNNING};
use async_trait::async_trait;
use chrono::Local;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub struct Conductor {
    config: ConductorConfig,
    mailbox: Producer,
    upstream: Option<Upstream>,
    registry: Registry,
    repertoire: Repertoire,
    status: CustomStatus,
    started: Timestamp,
}

/// The conductor's own supervisor, for nested trees.
struct Upstream {
    name: String,
    monitor: String,
    link: SupervisorLink,
}

impl Conductor {
    /// Builds a conductor and its mailbox. The returned consumer feeds its [`Stage`].
    ///
    /// `upstream` is `(supervisor name, supervisor mailbox)` when this conductor
    /// is itself supervised. Sweep requests from the supervisor's monitor are
    /// recognised by [`ConductorConfig::upstream_monitor`].
    pub fn new(
        config: ConductorConfig,
        repertoire: Repertoire,
        upstream: Option<(String, Producer)>,
    ) -> Result<(Self, Consumer)> {
        config.validate()?;
        let (mailbox, inbox) = channel::pair(config.component.capacity)?;
        let upstream = upstream
            .map(|(name, producer)| -> Result<Upstream> {
                Ok(Upstream {
                    name,
                    monitor: config.upstream_monitor.clone(),
                    link: SupervisorLink::new(config.component.name.as_str(), producer)?,
                })
            })
            .transpose()?;
        let started = Local::now();
        let conductor = Self {
            config,
            mailbox,
            upstream,
            registry: Registry::new(),
            repertoire,
            status: CustomStatus {
                status: RUNNING.to_string(),
                detail: None,
                time: started,
            },
            started,
        };
        Ok((conductor, inbox))
    }

    /// Wraps the conductor in a [`Stage`] using its own pausetime and tick.
    pub fn into_stage(self, inbox: Consumer) -> Result<Stage<Self>> {
        let component = self.config.component.clone();
        Stage::from_config(self, inbox, &component)
    }

    pub fn name(&self) -> &str {
        &self.config.component.name
    }

    pub fn monitor_name(&self) -> &str {
        &self.config.monitor
    }

    /// Producer half of the conductor's own mailbox.
    pub fn mailbox(&self) -> &Producer {
        &self.mailbox
    }

    pub fn started(&self) -> Timestamp {
        self.started
    }

    pub fn custom_status(&self) -> &CustomStatus {
        &self.status
    }

    pub fn update_status(&mut self, status: impl Into<String>, detail: Option<String>) -> Result<()> {
        let status = status.into();
        if status.is_empty() {
            return Err(TheaterError::InvalidArgument(
                "a conductor status cannot be empty".into(),
            ));
        }
        self.status = CustomStatus {
            status,
            detail,
            time: Local::now(),
        };
        Ok(())
    }

    // --- registry access ---------------------------------------------------

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn touch(&mut self, name: &str) -> Result<Timestamp> {
        self.registry.touch(name)
    }

    pub fn register(
        &mut self,
        uuid: impl Into<String>,
        name: impl Into<String>,
        process: ProcessHandle,
        mailbox: Producer,
    ) -> Result<()> {
        let name = name.into();
        self.registry.register(uuid, name.as_str(), process, mailbox)?;
        info!(component = %self.name(), child = %name, "Registered component");
        Ok(())
    }

    pub fn unregister(&mut self, name: &str) -> Result<ManagedComponent> {
        let entry = self.registry.unregister(name)?;
        info!(component = %self.name(), child = %name, "Unregistered component");
        Ok(entry)
    }

    pub fn resolve_name_by_uuid(&self, uuid: &str) -> Option<&str> {
        self.registry.resolve_name_by_uuid(uuid)
    }

    pub fn resolve_uuid_by_name(&self, name: &str) -> Option<&str> {
        self.registry.resolve_uuid_by_name(name)
    }

    pub fn get(&self, name: &str) -> Option<&ManagedComponent> {
        self.registry.get(name)
    }

    pub fn list_components(&self) -> impl Iterator<Item = ManagedComponent> {
        self.registry.list_components()
    }

    pub fn clean_uuid(&mut self, uuid: &str) -> bool {
        let cleaned = self.registry.clean_uuid(uuid);
        if cleaned {
            warn!(component = %self.name(), uuid = %uuid, "Dropped rogue uuid");
        }
        cleaned
    }

    // --- lifecycle ---------------------------------------------------------

    /// Starts a `role` component from the repertoire and registers it. Returns its uuid.
    ///
    /// If registration fails the new component is interrupted again.
    pub fn summon(&mut self, role: &str, config: ComponentConfig) -> Result<String> {
        let Casting {
            uuid,
            name,
            process,
            mailbox,
        } = self.repertoire.spawn(role, &config, self.mailbox.clone())?;

        if let Err(e) = self.register(uuid.as_str(), name.as_str(), process, mailbox.clone()) {
            warn!(component = %self.name(), child = %name, error = %e, "Registration failed, stopping child");
            self.send_interrupt(&name, &mailbox);
            return Err(e);
        }
        info!(component = %self.name(), role = %role, child = %name, uuid = %uuid, "Summoned component");
        Ok(uuid)
    }

    fn send_interrupt(&self, name: &str, mailbox: &Producer) {
        let sent = Message::build(self.name(), Signal::Interrupt, MsgType::None, Body::None, None)
            .and_then(|msg| mailbox.try_send(msg));
        if let Err(e) = sent {
            self.on_send_failure(name, e);
        }
    }

    /// A message that could not be delivered to `recipient`.
    pub fn on_send_failure(&self, recipient: &str, error: TheaterError) {
        warn!(
            component = %self.name(),
            recipient = %recipient,
            error = %error,
            kind = error.as_label(),
            "Dropped message"
        );
    }

    fn status_answer(&self, request: &Status) -> Status {
        request
            .clone()
            .with_status(Some(self.status.status.clone()))
            .with_time(Some(Local::now()))
            .with_statustime(Some(self.status.time))
            .with_statusmessage(self.status.detail.clone())
    }

    // --- heartbeats --------------------------------------------------------

    /// Resolves and touches the sender of `msg`.
    fn touch_sender(&mut self, msg: &Message) -> Option<String> {
        let name = self.registry.resolve_sender(msg.sender())?;
        if let Err(e) = self.registry.touch(&name) {
            warn!(component = %self.name(), child = %name, error = %e, "Touch failed");
        }
        Some(name)
    }

    fn sweep(&self, request_msg: &Message, request: &Status) {
        let monitor = self.config.monitor.as_str();
        let mut delivered = 0usize;
        for entry in self.registry.list_components() {
            let outgoing = if entry.name() == monitor {
                Message::build(
                    self.name(),
                    Signal::Beat,
                    MsgType::Status,
                    self.status_answer(request).into(),
                    None,
                )
            } else {
                request_msg.relay_as(monitor)
            };
            match outgoing.and_then(|msg| entry.mailbox().try_send(msg)) {
                Ok(()) => delivered += 1,
                Err(e) => self.on_send_failure(entry.name(), e),
            }
        }
        debug!(component = %self.name(), delivered, total = self.registry.len(), "Heartbeat sweep");
    }

    fn relay_to_monitor(&self, child: &str, msg: &Message) {
        let monitor = self.config.monitor.as_str();
        let Some(entry) = self.registry.get(monitor) else {
            debug!(component = %self.name(), child = %child, "No monitor registered, answer dropped");
            return;
        };
        if let Err(e) = msg.relay_as(child).and_then(|m| entry.mailbox().try_send(m)) {
            self.on_send_failure(monitor, e);
        }
    }

    fn answer_upstream(&self, signal: Signal, msg_type: MsgType, body: Body) {
        let Some(upstream) = &self.upstream else {
            return;
        };
        if let Err(e) = upstream.link.answer(signal, msg_type, body) {
            self.on_send_failure(&upstream.name, e);
        }
    }

    fn is_upstream(&self, sender: &str) -> bool {
        self.upstream.as_ref().is_some_and(|u| u.name == sender)
    }

    fn is_upstream_monitor(&self, sender: &str) -> bool {
        self.upstream.as_ref().is_some_and(|u| u.monitor == sender)
    }

    fn is_own_monitor(&self, sender: &str) -> bool {
        self.registry
            .resolve_sender(sender)
            .is_some_and(|name| name == self.config.monitor)
    }
}

#[async_trait]
impl Pollable for Conductor {
    fn name(&self) -> &str {
        &self.config.component.name
    }

    fn handle_beat(&mut self, msg: &Message) -> Option<Signal> {
        if self.is_upstream(msg.sender()) {
            match msg.body() {
                Body::None => self.answer_upstream(Signal::Beat, MsgType::None, Body::None),
                Body::Status(request) => {
                    let answer = self.status_answer(request);
                    self.answer_upstream(Signal::Beat, MsgType::Status, answer.into());
                }
                _ => return None,
            }
            return Some(Signal::Beat);
        }

        if let Body::Status(request) = msg.body() {
            if request.is_request() && self.is_upstream_monitor(msg.sender()) {
                let answer = self.status_answer(request);
                self.answer_upstream(Signal::Beat, MsgType::Status, answer.into());
                if !self.is_own_monitor(msg.sender()) {
                    return Some(Signal::Beat);
                }
            }
        }

        let Some(sender) = self.touch_sender(msg) else {
            debug!(component = %self.name(), sender = %msg.sender(), "Beat from unknown sender ignored");
            return None;
        };

        match msg.body() {
            Body::Status(status) if sender == self.config.monitor => {
                if status.is_request() {
                    self.sweep(msg, status);
                } else if let Err(e) = self.registry.record_status(&sender, status.clone()) {
                    warn!(component = %self.name(), child = %sender, error = %e, "Status not recorded");
                }
                Some(Signal::Beat)
            }
            Body::Status(status) => {
                if let Err(e) = self.registry.record_status(&sender, status.clone()) {
                    warn!(component = %self.name(), child = %sender, error = %e, "Status not recorded");
                }
                self.relay_to_monitor(&sender, msg);
                Some(Signal::Beat)
            }
            _ => None,
        }
    }

    fn handle_update(&mut self, msg: &Message) -> Option<Signal> {
        self.touch_sender(msg);
        Some(Signal::Update)
    }

    fn handle_trigger(&mut self, msg: &Message) -> Option<Signal> {
        self.touch_sender(msg);
        Some(Signal::Trigger)
    }

    fn handle_create(&mut self, msg: &Message) -> Option<Signal> {
        self.touch_sender(msg);
        Some(Signal::Create)
    }

    fn handle_kill(&mut self, msg: &Message) -> Option<Signal> {
        self.touch_sender(msg);
        let Some(target) = msg.body().as_text() else {
            debug!(component = %self.name(), "KILL without a target name ignored");
            return Some(Signal::Kill);
        };
        match self.registry.unregister(target) {
            Ok(entry) => {
                info!(component = %self.name(), child = %target, "Killing component");
                self.send_interrupt(entry.name(), entry.mailbox());
            }
            Err(e) => warn!(component = %self.name(), error = %e, "KILL for unknown component"),
        }
        Some(Signal::Kill)
    }

    fn on_interrupt(&mut self) {
        info!(component = %self.name(), children = self.registry.len(), "Interrupting all components");
        for entry in self.registry.list_components() {
            self.send_interrupt(entry.name(), entry.mailbox());
        }
        if let Err(e) = self.update_status(INTERRUPTED, Some("End of actors execution".into())) {
            warn!(component = %self.name(), error = %e, "Status update failed");
        }
        let now = Local::now();
        let notice = Status::new(
            None,
            Some(INTERRUPTED.to_string()),
            Some(now),
            Some(now),
            Some("End of actors execution".to_string()),
        );
        self.answer_upstream(Signal::Beat, MsgType::Status, notice.into());
    }

    async fn on_resume(&mut self) -> Result<()> {
        for name in self.registry.finished() {
            warn!(component = %self.name(), child = %name, "Component stopped on its own, reaping");
            self.registry.unregister(&name)?;
        }
        Ok(())
    }

    async fn on_score_end(&mut self, _end: &ScoreEnd) {
        let deadline = Instant::now() + self.config.shutdown_grace();
        for entry in self.registry.list_components() {
            let left = deadline.saturating_duration_since(Instant::now());
            match entry.process().join_timeout(left.max(Duration::from_millis(1))).await {
                Some(end) => debug!(component = %self.name(), child = %entry.name(), reason = %end, "Child stopped"),
                None if entry.process().is_finished() => {}
                None => warn!(component = %self.name(), child = %entry.name(), "Child still running after grace, abandoning"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::dispatch;
    use crate::mock::MailboxProbe;
    use crate::monitor::Monitor;

    fn idle_process() -> ProcessHandle {
        ProcessHandle::from_join(tokio::spawn(std::future::pending::<ScoreEnd>()))
    }

    fn conductor() -> Conductor {
        let config = ConductorConfig::new(ComponentConfig::new("conductor"));
        Conductor::new(config, Repertoire::new(), None).unwrap().0
    }

    /// Registers `name` with a probe as its mailbox.
    fn enlist(conductor: &mut Conductor, name: &str, capacity: usize) -> MailboxProbe {
        let (mailbox, probe) = MailboxProbe::pair(capacity);
        conductor
            .register(format!("uuid-{name}"), name, idle_process(), mailbox)
            .unwrap();
        probe
    }

    fn beat(sender: &str, body: Body) -> Message {
        let msg_type = body.shape();
        Message::build(sender, Signal::Beat, msg_type, body, None).unwrap()
    }

    #[tokio::test]
    async fn update_status_rejects_empty() {
        let mut conductor = conductor();
        assert!(matches!(
            conductor.update_status("", None),
            Err(TheaterError::InvalidArgument(_))
        ));
        conductor.update_status("Tuning", Some("A440".into())).unwrap();
        assert_eq!(conductor.custom_status().status, "Tuning");
    }

    #[tokio::test]
    async fn beat_from_unknown_sender_is_ignored() {
        let mut conductor = conductor();
        let mut monitor = enlist(&mut conductor, "monitor", 4);
        assert_eq!(dispatch(&mut conductor, &beat("stranger", Body::None)), None);
        monitor.assert_silent();
    }

    #[tokio::test]
    async fn monitor_request_fans_out_to_everyone() {
        let mut conductor = conductor();
        let mut monitor = enlist(&mut conductor, "monitor", 4);
        let mut violin = enlist(&mut conductor, "violin", 4);
        let mut cello = enlist(&mut conductor, "cello", 4);
        let before = conductor.get("monitor").unwrap().beattime();

        let request = Status::request(Local::now());
        let reply = dispatch(&mut conductor, &beat("monitor", request.clone().into()));
        assert_eq!(reply, Some(Signal::Beat));
        assert!(conductor.get("monitor").unwrap().beattime() > before);

        for probe in [&mut violin, &mut cello] {
            let (sender, relayed) = probe.expect_status();
            assert_eq!(sender, "monitor");
            assert_eq!(relayed, request);
            probe.assert_silent();
        }

        let (sender, own) = monitor.expect_status();
        assert_eq!(sender, "conductor");
        assert_eq!(own.status(), Some(RUNNING));
        assert_eq!(own.reqtime(), request.reqtime());
        monitor.assert_silent();
    }

    #[tokio::test]
    async fn full_sibling_does_not_stop_the_sweep() {
        let mut conductor = conductor();
        let _monitor = enlist(&mut conductor, "monitor", 4);
        let mut violin = enlist(&mut conductor, "violin", 1);
        let mut cello = enlist(&mut conductor, "cello", 4);

        let stuffing = beat("someone", Body::None);
        conductor.get("violin").unwrap().mailbox().try_send(stuffing).unwrap();

        dispatch(&mut conductor, &beat("monitor", Status::request(Local::now()).into()));

        assert_eq!(violin.drain().len(), 1);
        cello.expect_status();
    }

    #[tokio::test]
    async fn child_answer_is_recorded_and_relayed_to_monitor() {
        let mut conductor = conductor();
        let mut monitor = enlist(&mut conductor, "monitor", 4);
        let _violin = enlist(&mut conductor, "violin", 4);
        let before = conductor.get("violin").unwrap().beattime();

        let answer = Status::request(Local::now()).with_status(Some(RUNNING.into()));
        assert_eq!(
            dispatch(&mut conductor, &beat("uuid-violin", answer.clone().into())),
            Some(Signal::Beat)
        );

        let entry = conductor.get("violin").unwrap();
        assert!(entry.beattime() > before);
        assert_eq!(entry.status(), Some(&answer));

        let (sender, relayed) = monitor.expect_status();
        assert_eq!(sender, "violin");
        assert_eq!(relayed, answer);
    }

    #[tokio::test]
    async fn monitor_report_is_recorded_without_sweep() {
        let mut conductor = conductor();
        let mut monitor = enlist(&mut conductor, "monitor", 4);
        let mut violin = enlist(&mut conductor, "violin", 4);

        let report = Status::default().with_status(Some(INTERRUPTED.into()));
        dispatch(&mut conductor, &beat("monitor", report.into()));

        assert_eq!(
            conductor.get("monitor").unwrap().status().unwrap().status(),
            Some(INTERRUPTED)
        );
        monitor.assert_silent();
        violin.assert_silent();
    }

    #[tokio::test]
    async fn every_attributable_message_touches_the_sender() {
        let mut conductor = conductor();
        let _violin = enlist(&mut conductor, "violin", 4);
        let signals = [Signal::Beat, Signal::Update, Signal::Trigger, Signal::Create];
        for signal in signals {
            let before = conductor.get("violin").unwrap().beattime();
            let msg = Message::build("violin", signal, MsgType::None, Body::None, None).unwrap();
            dispatch(&mut conductor, &msg);
            assert!(conductor.get("violin").unwrap().beattime() > before, "{signal}");
        }
    }

    #[tokio::test]
    async fn kill_interrupts_and_unregisters_the_target() {
        let mut conductor = conductor();
        let mut violin = enlist(&mut conductor, "violin", 4);
        let kill = Message::build("operator", Signal::Kill, MsgType::Text, "violin".into(), None)
            .unwrap();

        assert_eq!(dispatch(&mut conductor, &kill), Some(Signal::Kill));
        violin.expect(Signal::Interrupt, MsgType::None);
        assert!(conductor.get("violin").is_none());

        // Unknown targets change nothing.
        assert_eq!(dispatch(&mut conductor, &kill), Some(Signal::Kill));
    }

    #[tokio::test]
    async fn interrupt_is_forwarded_to_children_and_upstream() {
        let (upstream, mut parent) = MailboxProbe::pair(4);
        let config = ConductorConfig::new(ComponentConfig::new("section"));
        let (mut conductor, _inbox) =
            Conductor::new(config, Repertoire::new(), Some(("orchestra".into(), upstream)))
                .unwrap();
        let mut violin = enlist(&mut conductor, "violin", 4);

        conductor.on_interrupt();

        violin.expect(Signal::Interrupt, MsgType::None);
        let (sender, notice) = parent.expect_status();
        assert_eq!(sender, "section");
        assert_eq!(notice.status(), Some(INTERRUPTED));
    }

    #[tokio::test]
    async fn upstream_beats_are_answered_with_own_status() {
        let (upstream, mut parent) = MailboxProbe::pair(4);
        let config = ConductorConfig::new(ComponentConfig::new("section"));
        let (mut conductor, _inbox) =
            Conductor::new(config, Repertoire::new(), Some(("orchestra".into(), upstream)))
                .unwrap();
        conductor.update_status("Rehearsing", None).unwrap();

        dispatch(&mut conductor, &beat("orchestra", Body::None));
        parent.expect(Signal::Beat, MsgType::None);

        dispatch(&mut conductor, &beat("orchestra", Status::request(Local::now()).into()));
        let (_, answer) = parent.expect_status();
        assert_eq!(answer.status(), Some("Rehearsing"));
    }

    fn section(config: ConductorConfig) -> (Conductor, MailboxProbe) {
        let (upstream, parent) = MailboxProbe::pair(4);
        let (conductor, _inbox) =
            Conductor::new(config, Repertoire::new(), Some(("orchestra".into(), upstream)))
                .unwrap();
        (conductor, parent)
    }

    #[tokio::test]
    async fn parent_sweep_is_answered_without_own_monitor() {
        let (mut conductor, mut parent) =
            section(ConductorConfig::new(ComponentConfig::new("section")));
        let mut violin = enlist(&mut conductor, "violin", 4);
        conductor.update_status("Rehearsing", None).unwrap();

        let request = Status::request(Local::now());
        let reply = dispatch(&mut conductor, &beat("monitor", request.clone().into()));
        assert_eq!(reply, Some(Signal::Beat));

        let (sender, answer) = parent.expect_status();
        assert_eq!(sender, "section");
        assert_eq!(answer.status(), Some("Rehearsing"));
        assert_eq!(answer.reqtime(), request.reqtime());
        parent.assert_silent();
        violin.assert_silent();
    }

    #[tokio::test]
    async fn parent_sweep_reaches_upstream_when_monitor_names_collide() {
        let (mut conductor, mut parent) =
            section(ConductorConfig::new(ComponentConfig::new("section")));
        let mut monitor = enlist(&mut conductor, "monitor", 4);
        let mut violin = enlist(&mut conductor, "violin", 4);

        let request = Status::request(Local::now());
        dispatch(&mut conductor, &beat("monitor", request.clone().into()));

        let (sender, answer) = parent.expect_status();
        assert_eq!(sender, "section");
        assert_eq!(answer.status(), Some(RUNNING));
        parent.assert_silent();

        // The local tree is swept as well.
        let (sender, own) = monitor.expect_status();
        assert_eq!(sender, "section");
        assert_eq!(own.status(), Some(RUNNING));
        let (sender, relayed) = violin.expect_status();
        assert_eq!(sender, "monitor");
        assert_eq!(relayed, request);
    }

    #[tokio::test]
    async fn distinct_upstream_monitor_keeps_sweeps_apart() {
        let config = ConductorConfig::new(ComponentConfig::new("section"))
            .with_upstream_monitor("orchestra-monitor");
        let (mut conductor, mut parent) = section(config);
        let mut monitor = enlist(&mut conductor, "monitor", 4);
        let mut violin = enlist(&mut conductor, "violin", 4);

        dispatch(&mut conductor, &beat("orchestra-monitor", Status::request(Local::now()).into()));
        parent.expect_status();
        monitor.assert_silent();
        violin.assert_silent();

        dispatch(&mut conductor, &beat("monitor", Status::request(Local::now()).into()));
        parent.assert_silent();
        monitor.expect_status();
        violin.expect_status();
    }

    #[tokio::test]
    async fn child_ack_is_touched_but_not_answered() {
        let mut conductor = conductor();
        let mut monitor = enlist(&mut conductor, "monitor", 4);
        let _violin = enlist(&mut conductor, "violin", 4);
        let before = conductor.get("violin").unwrap().beattime();

        assert_eq!(dispatch(&mut conductor, &beat("violin", Body::None)), None);
        assert!(conductor.get("violin").unwrap().beattime() > before);
        monitor.assert_silent();
    }

    #[tokio::test(start_paused = true)]
    async fn summon_registers_and_duplicate_names_are_stopped() {
        let mut repertoire = Repertoire::new();
        repertoire.add("monitor", |_config, link| Ok(Monitor::new(link)));
        let config = ConductorConfig::new(ComponentConfig::new("conductor"));
        let (mut conductor, _inbox) = Conductor::new(config, repertoire, None).unwrap();

        let uuid = conductor
            .summon("monitor", ComponentConfig::new("monitor").with_pausetime(1))
            .unwrap();
        assert_eq!(conductor.resolve_name_by_uuid(&uuid), Some("monitor"));
        assert_eq!(conductor.resolve_uuid_by_name("monitor"), Some(uuid.as_str()));

        let dup = conductor.summon("monitor", ComponentConfig::new("monitor"));
        assert!(matches!(dup, Err(TheaterError::AlreadyRegistered(_))));
        assert_eq!(conductor.list_components().count(), 1);

        assert!(matches!(
            conductor.summon("oboe", ComponentConfig::new("oboe")),
            Err(TheaterError::SpawnFailure { .. })
        ));
    }

    #[tokio::test]
    async fn resume_reaps_finished_children() {
        let mut conductor = conductor();
        let done = ProcessHandle::from_join(tokio::spawn(async { ScoreEnd::new("done") }));
        done.join().await;
        let (mailbox, _probe) = MailboxProbe::pair(1);
        conductor.register("uuid-done", "done", done, mailbox).unwrap();
        let _alive = enlist(&mut conductor, "alive", 1);

        conductor.on_resume().await.unwrap();
        assert!(conductor.get("done").is_none());
        assert!(conductor.get("alive").is_some());
        assert!(!conductor.clean_uuid("uuid-alive"));
    }
}
