//! The table of roles a conductor knows how to bring up.
//!
//! A [`Repertoire`] maps a role name to a constructor. The conductor asks it
//! to [`spawn`](Repertoire::spawn) a role with a config and its own mailbox,
//! and gets back a [`Casting`]: everything needed to register the new
//! component.

use crate::channel::{self, Producer};
use crate::component::{Pollable, ProcessHandle, Stage};
use crate::config::ComponentConfig;
use crate::error::{Result, TheaterError};
use crate::musician::SupervisorLink;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// A freshly started component, ready to be registered.
#[derive(Debug, Clone)]
pub struct Casting {
    pub uuid: String,
    pub name: String,
    pub process: ProcessHandle,
    pub mailbox: Producer,
}

type Cast = Arc<dyn Fn(&ComponentConfig, Producer) -> Result<Casting> + Send + Sync>;

/// `role -> constructor`.
#[derive(Clone, Default)]
pub struct Repertoire {
    roles: HashMap<String, Cast>,
}

impl fmt::Debug for Repertoire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut roles: Vec<_> = self.roles.keys().collect();
        roles.sort();
        f.debug_struct("Repertoire").field("roles", &roles).finish()
    }
}

impl Repertoire {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a role. `make` builds the component from its config and its link
    /// to the supervisor; the repertoire takes care of its mailbox and task.
    pub fn add<C, F>(&mut self, role: impl Into<String>, make: F) -> &mut Self
    where
        C: Pollable + 'static,
        F: Fn(&ComponentConfig, SupervisorLink) -> Result<C> + Send + Sync + 'static,
    {
        let cast = move |config: &ComponentConfig, supervisor: Producer| -> Result<Casting> {
            config.validate()?;
            let (mailbox, inbox) = channel::pair(config.capacity)?;
            let link = SupervisorLink::new(config.name.as_str(), supervisor)?;
            let component = make(config, link)?;
            let process = Stage::from_config(component, inbox, config)?.spawn();
            Ok(Casting {
                uuid: Uuid::new_v4().to_string(),
                name: config.name.clone(),
                process,
                mailbox,
            })
        };
        self.roles.insert(role.into(), Arc::new(cast));
        self
    }

    pub fn knows(&self, role: &str) -> bool {
        self.roles.contains_key(role)
    }

    pub fn roles(&self) -> Vec<String> {
        let mut roles: Vec<_> = self.roles.keys().cloned().collect();
        roles.sort();
        roles
    }

    /// Starts one component of `role` on the current tokio runtime.
    ///
    /// Any failure is reported as [`TheaterError::SpawnFailure`].
    pub fn spawn(
        &self,
        role: &str,
        config: &ComponentConfig,
        supervisor: Producer,
    ) -> Result<Casting> {
        let cast = self.roles.get(role).ok_or_else(|| TheaterError::SpawnFailure {
            role: role.to_string(),
            reason: "role is not in the repertoire".into(),
        })?;
        cast(config, supervisor).map_err(|e| match e {
            e @ TheaterError::SpawnFailure { .. } => e,
            other => TheaterError::SpawnFailure {
                role: role.to_string(),
                reason: other.to_string(),
            },
        })
    }
}
