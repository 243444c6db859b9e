//! Book-keeping for the components a conductor manages.
//!
//! Entries are immutable: touching or recording a status builds a new
//! [`ManagedComponent`] and swaps it in, so a snapshot taken earlier is never
//! changed underneath its holder.

use crate::channel::Producer;
use crate::component::ProcessHandle;
use crate::error::{Result, TheaterError};
use crate::message::{Status, Timestamp};
use chrono::{Local, TimeDelta};
use std::collections::HashMap;

/// One registry record.
#[derive(Debug, Clone)]
pub struct ManagedComponent {
    uuid: String,
    name: String,
    process: ProcessHandle,
    mailbox: Producer,
    beattime: Timestamp,
    status: Option<Status>,
}

impl ManagedComponent {
    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn process(&self) -> &ProcessHandle {
        &self.process
    }

    pub fn mailbox(&self) -> &Producer {
        &self.mailbox
    }

    /// Last time anything was heard from the component.
    pub fn beattime(&self) -> Timestamp {
        self.beattime
    }

    /// Last status the component reported, if any.
    pub fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    /// A copy with a later `beattime`; strictly later even if the clock did not move.
    fn touched(&self) -> Self {
        let now = Local::now();
        let floor = self.beattime + TimeDelta::nanoseconds(1);
        Self {
            beattime: now.max(floor),
            ..self.clone()
        }
    }

    fn with_status(&self, status: Status) -> Self {
        Self {
            status: Some(status),
            ..self.touched()
        }
    }
}

/// `name -> ManagedComponent`, plus a `uuid -> name` reverse index.
///
/// Iteration follows registration order.
#[derive(Debug, Default)]
pub struct Registry {
    entries: HashMap<String, ManagedComponent>,
    order: Vec<String>,
    uuids: HashMap<String, String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn register(
        &mut self,
        uuid: impl Into<String>,
        name: impl Into<String>,
        process: ProcessHandle,
        mailbox: Producer,
    ) -> Result<()> {
        let (uuid, name) = (uuid.into(), name.into());
        if uuid.is_empty() || name.is_empty() {
            return Err(TheaterError::InvalidArgument(
                "a registered component needs a uuid and a name".into(),
            ));
        }
        if self.entries.contains_key(&name) {
            return Err(TheaterError::AlreadyRegistered(name));
        }
        if self.uuids.contains_key(&uuid) {
            return Err(TheaterError::AlreadyRegistered(uuid));
        }

        self.uuids.insert(uuid.clone(), name.clone());
        self.order.push(name.clone());
        self.entries.insert(
            name.clone(),
            ManagedComponent {
                uuid,
                name,
                process,
                mailbox,
                beattime: Local::now(),
                status: None,
            },
        );
        Ok(())
    }

    pub fn unregister(&mut self, name: &str) -> Result<ManagedComponent> {
        let entry = self
            .entries
            .remove(name)
            .ok_or_else(|| TheaterError::UnknownComponent(name.to_string()))?;
        self.order.retain(|n| n != name);
        self.uuids.remove(&entry.uuid);
        Ok(entry)
    }

    /// Replaces `name`'s entry with one whose `beattime` is now.
    pub fn touch(&mut self, name: &str) -> Result<Timestamp> {
        let entry = self.entry(name)?.touched();
        let beattime = entry.beattime;
        self.entries.insert(name.to_string(), entry);
        Ok(beattime)
    }

    /// Touches `name` and keeps `status` as its last report.
    pub fn record_status(&mut self, name: &str, status: Status) -> Result<()> {
        let entry = self.entry(name)?.with_status(status);
        self.entries.insert(name.to_string(), entry);
        Ok(())
    }

    fn entry(&self, name: &str) -> Result<&ManagedComponent> {
        self.entries
            .get(name)
            .ok_or_else(|| TheaterError::UnknownComponent(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&ManagedComponent> {
        self.entries.get(name)
    }

    pub fn resolve_name_by_uuid(&self, uuid: &str) -> Option<&str> {
        self.uuids.get(uuid).map(String::as_str)
    }

    pub fn resolve_uuid_by_name(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(ManagedComponent::uuid)
    }

    /// Maps a message sender (uuid or name) to a registered name.
    pub fn resolve_sender(&self, sender: &str) -> Option<String> {
        self.resolve_name_by_uuid(sender)
            .filter(|name| self.entries.contains_key(*name))
            .or_else(|| self.entries.get(sender).map(ManagedComponent::name))
            .map(str::to_string)
    }

    /// Snapshot of the current entries, in registration order.
    pub fn list_components(&self) -> std::vec::IntoIter<ManagedComponent> {
        self.order
            .iter()
            .filter_map(|name| self.entries.get(name).cloned())
            .collect::<Vec<_>>()
            .into_iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Drops a reverse-index entry that no longer points at a live registration.
    ///
    /// Returns `true` if something was removed.
    pub fn clean_uuid(&mut self, uuid: &str) -> bool {
        let stale = match self.uuids.get(uuid) {
            Some(name) => self
                .entries
                .get(name)
                .map_or(true, |entry| entry.uuid != uuid),
            None => false,
        };
        if stale {
            self.uuids.remove(uuid);
        }
        stale
    }

    /// Names of components whose control loop has ended.
    pub fn finished(&self) -> Vec<String> {
        self.order
            .iter()
            .filter(|name| {
                self.entries
                    .get(*name)
                    .is_some_and(|entry| entry.process.is_finished())
            })
            .cloned()
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn alias_uuid(&mut self, uuid: &str, name: &str) {
        self.uuids.insert(uuid.to_string(), name.to_string());
    }
}
