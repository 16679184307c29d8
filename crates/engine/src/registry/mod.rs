// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registration table (C4): the single-writer map of connected clients and
//! the actions they own, plus the parked-long-poll / FIFO-queue plumbing
//! that backs `RecvServerRequest`. Owned exclusively by the request-handler
//! worker (C6) — every method here takes `&mut self`.

mod error;

pub use error::RegistryError;

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use uuid::Uuid;

use crate::config::ConfigManager;
use crate::error::ErrorCode;
use crate::support::UuidGen;
use crate::transport::messages::{ActionRequestData, LomResponse, RespPayload, ServerRequestData};

/// One connected client: the actions it owns, its FIFO request queue, and
/// at most one parked long-poll reply slot. Invariant (i): `queue` and
/// `parked` never both hold work at the same time.
struct ActiveClient {
    session: Uuid,
    actions: HashSet<String>,
    queue: VecDeque<ServerRequestData>,
    parked: Option<oneshot::Sender<LomResponse>>,
}

impl ActiveClient {
    fn new(session: Uuid) -> Self {
        Self { session, actions: HashSet::new(), queue: VecDeque::new(), parked: None }
    }
}

struct ActionRecord {
    owner: String,
    last_heartbeat_secs: Option<u64>,
}

/// The registration table. Construct one per engine instance; it is not
/// `Clone` or `Send`-shared — callers are expected to hold it behind the
/// single request-handler worker.
pub struct Registry {
    config: Arc<ConfigManager>,
    clients: HashMap<String, ActiveClient>,
    actions: HashMap<String, ActionRecord>,
}

impl Registry {
    pub fn new(config: Arc<ConfigManager>) -> Self {
        Self { config, clients: HashMap::new(), actions: HashMap::new() }
    }

    pub fn register_client(&mut self, name: &str, session: Uuid) -> Result<(), RegistryError> {
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        match self.clients.get(name) {
            Some(existing) if existing.session == session => Ok(()),
            Some(_) => Err(RegistryError::ClientOwnedByOtherSession { name: name.to_owned() }),
            None => {
                self.clients.insert(name.to_owned(), ActiveClient::new(session));
                Ok(())
            }
        }
    }

    /// Removes the client, emptying its queue and replying to any parked
    /// long-poll with [`ErrorCode::Shutdown`] (invariant (ii)). Returns the
    /// names of the actions it owned so the caller can notify the
    /// orchestrator of any that were a sequence's pending step.
    pub fn deregister_client(&mut self, name: &str) -> Vec<String> {
        let Some(mut client) = self.clients.remove(name) else { return Vec::new() };

        if let Some(parked) = client.parked.take() {
            let _ = parked.send(LomResponse::err(ErrorCode::Shutdown, ""));
        }
        client.queue.clear();

        let owned: Vec<String> = client.actions.drain().collect();
        for action in &owned {
            self.actions.remove(action);
        }
        owned
    }

    /// Registers `action_name` to `client_name`. On first-time registration
    /// of an anchor action, enqueues an unsolicited detection request for
    /// that client.
    pub fn register_action(
        &mut self,
        client_name: &str,
        action_name: &str,
        uuid_gen: &dyn UuidGen,
    ) -> Result<(), RegistryError> {
        if action_name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if !self.clients.contains_key(client_name) {
            return Err(RegistryError::ClientNotRegistered { name: client_name.to_owned() });
        }
        let action_cfg = self
            .config
            .get_action_config(action_name)
            .map_err(|_| RegistryError::UnknownAction { name: action_name.to_owned() })?;
        if action_cfg.disabled {
            return Err(RegistryError::ActionDisabled { name: action_name.to_owned() });
        }

        if let Some(existing) = self.actions.get(action_name) {
            if existing.owner == client_name {
                return Ok(());
            }
            return Err(RegistryError::ActionOwnedByOtherClient {
                action: action_name.to_owned(),
                owner: existing.owner.clone(),
            });
        }

        self.actions.insert(
            action_name.to_owned(),
            ActionRecord { owner: client_name.to_owned(), last_heartbeat_secs: None },
        );
        if let Some(client) = self.clients.get_mut(client_name) {
            client.actions.insert(action_name.to_owned());
        }

        if self.config.is_start_sequence_action(action_name) {
            let timeout = action_cfg.timeout;
            let instance_id = uuid_gen.new_uuid();
            let bootstrap = ActionRequestData {
                action: action_name.to_owned(),
                instance_id: instance_id.clone(),
                anomaly_instance_id: instance_id,
                anomaly_key: String::new(),
                timeout,
                context: Vec::new(),
            };
            self.dispatch(client_name, ServerRequestData::Action(bootstrap));
        }

        Ok(())
    }

    /// Silently succeeds for an empty or unknown name. Returns `true` if a
    /// registered action was actually removed, so the caller can decide
    /// whether to notify the orchestrator.
    pub fn deregister_action(&mut self, action_name: &str) -> bool {
        if action_name.is_empty() {
            return false;
        }
        let Some(record) = self.actions.remove(action_name) else { return false };
        if let Some(client) = self.clients.get_mut(&record.owner) {
            client.actions.remove(action_name);
        }
        true
    }

    pub fn owner_of(&self, action_name: &str) -> Option<&str> {
        self.actions.get(action_name).map(|r| r.owner.as_str())
    }

    pub fn is_registered(&self, client_name: &str) -> bool {
        self.clients.contains_key(client_name)
    }

    /// Parks a long-poll reply slot for `client_name`. A second call while
    /// one is already parked bumps the previous slot with a transport
    /// error rather than leaving it to hang forever.
    pub fn pend_server_request(
        &mut self,
        client_name: &str,
        reply: oneshot::Sender<LomResponse>,
    ) -> Result<(), RegistryError> {
        let client = self
            .clients
            .get_mut(client_name)
            .ok_or_else(|| RegistryError::ClientNotRegistered { name: client_name.to_owned() })?;

        if let Some(queued) = client.queue.pop_front() {
            let _ = reply.send(LomResponse::ok(RespPayload::ServerRequest(queued)));
            return Ok(());
        }

        if let Some(stale) = client.parked.replace(reply) {
            let _ = stale.send(LomResponse::err(ErrorCode::ReqFailed, "superseded by a newer long poll"));
        }
        Ok(())
    }

    /// Delivers `payload` to `client_name`: fulfils a parked slot
    /// immediately if one exists, otherwise queues it FIFO.
    pub fn dispatch(&mut self, client_name: &str, payload: ServerRequestData) {
        let Some(client) = self.clients.get_mut(client_name) else { return };

        if let Some(parked) = client.parked.take() {
            let _ = parked.send(LomResponse::ok(RespPayload::ServerRequest(payload)));
            return;
        }
        client.queue.push_back(payload);
    }

    pub fn notify_heartbeat(&mut self, action_name: &str, timestamp_secs: u64) {
        if let Some(record) = self.actions.get_mut(action_name) {
            record.last_heartbeat_secs = Some(timestamp_secs);
        }
    }

    pub fn last_heartbeat(&self, action_name: &str) -> Option<u64> {
        self.actions.get(action_name).and_then(|r| r.last_heartbeat_secs)
    }

    pub fn action_timeout(&self, action_name: &str) -> Option<Duration> {
        self.config.get_action_config(action_name).ok().map(|c| c.timeout)
    }

    #[cfg(test)]
    fn has_parked(&self, client_name: &str) -> bool {
        self.clients.get(client_name).is_some_and(|c| c.parked.is_some())
    }

    #[cfg(test)]
    fn queue_len(&self, client_name: &str) -> usize {
        self.clients.get(client_name).map(|c| c.queue.len()).unwrap_or(0)
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
