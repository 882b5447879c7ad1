//! In-memory server registry.
//!
//! Holds each application's working copy of its servers (the source of
//! truth between reads and writes) and the consolidated view that groups
//! servers by name across applications. The consolidated view is derived and
//! never persisted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};
use crate::types::McpServer;

/// One server name and its definition in every application that has it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedServer {
    pub name: String,
    /// Per-application definition, ordered by application id.
    pub apps: BTreeMap<String, McpServer>,
}

impl ConsolidatedServer {
    pub fn enabled_in(&self, app: &str) -> Option<bool> {
        self.apps.get(app).map(|s| s.enabled)
    }

    pub fn enabled_anywhere(&self) -> bool {
        self.apps.values().any(|s| s.enabled)
    }
}

/// Flat `(server, application, enabled)` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerView {
    pub server: String,
    pub application: String,
    pub enabled: bool,
}

#[derive(Debug, Default, Clone)]
pub struct ServerRegistry {
    per_app: BTreeMap<String, Vec<McpServer>>,
    consolidated: BTreeMap<String, ConsolidatedServer>,
}

impl ServerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every application's servers and regroup.
    ///
    /// Grouping is by server name, then application id, so the result does
    /// not depend on the order applications were read in.
    pub fn rebuild(&mut self, per_app: BTreeMap<String, Vec<McpServer>>) {
        self.per_app = per_app;
        self.regroup();
    }

    /// Replace one application's servers and regroup.
    pub fn set_app_servers(&mut self, app: &str, servers: Vec<McpServer>) {
        self.per_app.insert(app.to_string(), servers);
        self.regroup();
    }

    /// Servers of one application in file order. Empty for unknown apps.
    pub fn app_servers(&self, app: &str) -> &[McpServer] {
        self.per_app.get(app).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn apps(&self) -> impl Iterator<Item = &str> {
        self.per_app.keys().map(String::as_str)
    }

    pub fn get(&self, server: &str, app: &str) -> Option<&McpServer> {
        self.app_servers(app).iter().find(|s| s.name == server)
    }

    /// Set one application's flag for a server. Returns whether anything
    /// changed; setting the current value is a no-op.
    pub fn toggle(&mut self, server: &str, app: &str, enabled: bool) -> SyncResult<bool> {
        let entry = self
            .per_app
            .get_mut(app)
            .and_then(|servers| servers.iter_mut().find(|s| s.name == server))
            .ok_or_else(|| SyncError::UnknownServer {
                server: server.to_string(),
                app: app.to_string(),
            })?;
        if entry.enabled == enabled {
            return Ok(false);
        }
        entry.enabled = enabled;
        let updated = entry.clone();
        if let Some(group) = self.consolidated.get_mut(server) {
            group.apps.insert(app.to_string(), updated);
        }
        Ok(true)
    }

    /// Set the flag for a server in every application that has it.
    ///
    /// Returns `(app, changed)` per application, ordered by application id.
    pub fn toggle_all(&mut self, server: &str, enabled: bool) -> SyncResult<Vec<(String, bool)>> {
        let apps: Vec<String> = self
            .consolidated
            .get(server)
            .map(|group| group.apps.keys().cloned().collect())
            .ok_or_else(|| SyncError::UnknownServer {
                server: server.to_string(),
                app: "any application".to_string(),
            })?;
        apps.into_iter()
            .map(|app| {
                let changed = self.toggle(server, &app, enabled)?;
                Ok((app, changed))
            })
            .collect()
    }

    /// Insert or replace a server by name. Returns `true` when it is new.
    pub fn upsert(&mut self, app: &str, server: McpServer) -> bool {
        let servers = self.per_app.entry(app.to_string()).or_default();
        let inserted = match servers.iter_mut().find(|s| s.name == server.name) {
            Some(existing) => {
                *existing = server;
                false
            }
            None => {
                servers.push(server);
                true
            }
        };
        self.regroup();
        inserted
    }

    pub fn remove(&mut self, server: &str, app: &str) -> SyncResult<McpServer> {
        let servers = self.per_app.get_mut(app);
        let idx = servers
            .as_ref()
            .and_then(|servers| servers.iter().position(|s| s.name == server));
        match (servers, idx) {
            (Some(servers), Some(idx)) => {
                let removed = servers.remove(idx);
                self.regroup();
                Ok(removed)
            }
            _ => Err(SyncError::UnknownServer {
                server: server.to_string(),
                app: app.to_string(),
            }),
        }
    }

    /// Consolidated view, ordered by server name.
    pub fn servers(&self) -> impl Iterator<Item = &ConsolidatedServer> {
        self.consolidated.values()
    }

    pub fn server(&self, name: &str) -> Option<&ConsolidatedServer> {
        self.consolidated.get(name)
    }

    /// Flat view ordered by server name, then application id.
    pub fn entries(&self) -> Vec<ServerView> {
        self.consolidated
            .values()
            .flat_map(|group| {
                group.apps.iter().map(|(app, server)| ServerView {
                    server: group.name.clone(),
                    application: app.clone(),
                    enabled: server.enabled,
                })
            })
            .collect()
    }

    fn regroup(&mut self) {
        let mut consolidated: BTreeMap<String, ConsolidatedServer> = BTreeMap::new();
        for (app, servers) in &self.per_app {
            for server in servers {
                consolidated
                    .entry(server.name.clone())
                    .or_insert_with(|| ConsolidatedServer {
                        name: server.name.clone(),
                        apps: BTreeMap::new(),
                    })
                    .apps
                    .insert(app.clone(), server.clone());
            }
        }
        self.consolidated = consolidated;
    }
}
