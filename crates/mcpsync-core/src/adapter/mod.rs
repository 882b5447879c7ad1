//! Application adapter layer.
//!
//! Each supported application keeps its MCP servers in its own file with its
//! own schema. An [`AppAdapter`] describes where that file lives and how its
//! server map is shaped; the provided methods turn that description into
//! detection, parsing, rendering and atomic writes. Adapters are looked up by
//! id through the static [`AdapterRegistry`].

mod amazon_q;
mod claude_code;
mod claude_desktop;
mod codex;
mod cursor;
mod gemini_cli;
pub mod registry;
mod vscode;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::config::client_config::{extract_map_at_path, set_map_at_path};
use crate::config::{ConfigFormat, serializer_for_format};
use crate::error::{SyncError, SyncResult, ValidationError};
use crate::fs::{atomic_write, hash_bytes, read_optional};
use crate::types::{Application, McpServer};

pub use amazon_q::AmazonQAdapter;
pub use claude_code::ClaudeCodeAdapter;
pub use claude_desktop::ClaudeDesktopAdapter;
pub use codex::CodexAdapter;
pub use cursor::CursorAdapter;
pub use gemini_cli::GeminiCliAdapter;
pub use registry::AdapterRegistry;
pub use vscode::VsCodeAdapter;

const COMMAND_KEY: &str = "command";
const ARGS_KEY: &str = "args";
const ENV_KEY: &str = "env";
const URL_KEY: &str = "url";

/// How an application marks a server as switched off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleField {
    /// `"disabled": true`; absent means enabled.
    Disabled,
    /// `enabled = false`; absent means enabled.
    Enabled,
}

impl ToggleField {
    pub fn key(&self) -> &'static str {
        match self {
            ToggleField::Disabled => "disabled",
            ToggleField::Enabled => "enabled",
        }
    }

    fn read(&self, value: Option<&Value>) -> Result<bool, String> {
        match (self, value) {
            (_, None) => Ok(true),
            (ToggleField::Disabled, Some(Value::Bool(disabled))) => Ok(!disabled),
            (ToggleField::Enabled, Some(Value::Bool(enabled))) => Ok(*enabled),
            (_, Some(_)) => Err(format!("'{}' must be a boolean", self.key())),
        }
    }

    fn write(&self, entry: &mut Map<String, Value>, enabled: bool) {
        let key = self.key();
        let marker = match self {
            ToggleField::Disabled => !enabled,
            ToggleField::Enabled => enabled,
        };
        // Only add the marker when it says something the default does not.
        if entry.contains_key(key) || !enabled {
            entry.insert(key.to_string(), Value::Bool(marker));
        }
    }
}

/// Native shape of an application's config file.
#[derive(Debug, Clone, Copy)]
pub struct AppSchema {
    pub format: ConfigFormat,
    /// Path of keys from the document root to the server map.
    pub servers_path: &'static [&'static str],
    pub toggle: ToggleField,
}

/// Directories adapters resolve their config paths against.
#[derive(Debug, Clone)]
pub struct AdapterContext {
    pub home_dir: PathBuf,
    pub config_dir: PathBuf,
    pub app_support_dir: PathBuf,
    overrides: BTreeMap<String, PathBuf>,
}

impl AdapterContext {
    pub fn new(home_dir: PathBuf, config_dir: PathBuf, app_support_dir: PathBuf) -> Self {
        Self {
            home_dir,
            config_dir,
            app_support_dir,
            overrides: BTreeMap::new(),
        }
    }

    /// Context for the current user's real directories.
    pub fn from_system() -> SyncResult<Self> {
        use crate::config::paths;
        Ok(Self::new(
            paths::home_dir()?,
            paths::config_dir()?,
            paths::app_support_dir()?,
        ))
    }

    /// Every directory below one root (`home/`, `config/`, `app-support/`).
    pub fn rooted_at(root: &Path) -> Self {
        Self::new(
            root.join("home"),
            root.join("config"),
            root.join("app-support"),
        )
    }

    pub fn with_overrides(mut self, overrides: BTreeMap<String, PathBuf>) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn override_for(&self, app: &str) -> Option<&Path> {
        self.overrides.get(app).map(PathBuf::as_path)
    }
}

/// Servers read from one application's file together with the file's hash.
#[derive(Debug, Clone, PartialEq)]
pub struct AppSnapshot {
    pub servers: Vec<McpServer>,
    /// `None` when the file does not exist.
    pub content_hash: Option<String>,
}

/// Reader/writer for one application's MCP configuration.
pub trait AppAdapter: Send + Sync + fmt::Debug {
    /// Stable application id.
    fn id(&self) -> &'static str;

    fn display_name(&self) -> &'static str;

    fn schema(&self) -> AppSchema;

    /// Location of the config file when no override is set.
    fn default_path(&self, ctx: &AdapterContext) -> PathBuf;

    fn config_path(&self, ctx: &AdapterContext) -> PathBuf {
        ctx.override_for(self.id())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.default_path(ctx))
    }

    /// Probe the config location. A missing file is "not detected", not an error.
    fn detect(&self, ctx: &AdapterContext) -> Application {
        let path = self.config_path(ctx);
        let mut app = Application::new(self.id(), self.display_name(), path.clone());
        app.detected = path.is_file();
        app
    }

    /// Read and parse the config file. A missing file yields no servers and
    /// no hash.
    fn read(&self, ctx: &AdapterContext) -> SyncResult<AppSnapshot> {
        let path = self.config_path(ctx);
        let Some(bytes) = read_optional(&path)? else {
            tracing::debug!(app = self.id(), path = %path.display(), "config file absent");
            return Ok(AppSnapshot {
                servers: Vec::new(),
                content_hash: None,
            });
        };
        let servers = self.parse(&path, &bytes)?;
        tracing::debug!(app = self.id(), servers = servers.len(), "read config");
        Ok(AppSnapshot {
            servers,
            content_hash: Some(hash_bytes(&bytes)),
        })
    }

    /// Parse file contents into servers, in file order.
    fn parse(&self, path: &Path, bytes: &[u8]) -> SyncResult<Vec<McpServer>> {
        let schema = self.schema();
        let root = serializer_for_format(schema.format)
            .parse(bytes)
            .map_err(|e| SyncError::parse(self.id(), path, e.to_string()))?;
        let map = extract_map_at_path(&root, schema.servers_path)
            .map_err(|e| SyncError::parse(self.id(), path, e.to_string()))?;
        map.iter()
            .map(|(name, entry)| server_from_entry(name, entry, schema.toggle))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|message| SyncError::parse(self.id(), path, message))
    }

    /// Render `servers` into the existing document (or a new one).
    ///
    /// Everything outside the server map is left as it was. Each server entry
    /// is rebuilt on top of its existing native entry so unknown keys and key
    /// order survive. Servers not in `servers` are dropped from the file.
    fn render(
        &self,
        path: &Path,
        existing: Option<&[u8]>,
        servers: &[McpServer],
    ) -> SyncResult<Vec<u8>> {
        let schema = self.schema();
        let serializer = serializer_for_format(schema.format);
        let mut root = match existing {
            Some(bytes) => serializer
                .parse(bytes)
                .map_err(|e| SyncError::parse(self.id(), path, e.to_string()))?,
            None => Map::new(),
        };
        let current = extract_map_at_path(&root, schema.servers_path)
            .map_err(|e| SyncError::parse(self.id(), path, e.to_string()))?;

        let mut rendered = Map::new();
        for (name, entry) in &current {
            if let Some(server) = servers.iter().find(|s| &s.name == name) {
                let native = entry_for_server(entry.as_object(), server, schema.toggle);
                rendered.insert(name.clone(), Value::Object(native));
            }
        }
        for server in servers {
            if !rendered.contains_key(&server.name) {
                let native = entry_for_server(None, server, schema.toggle);
                rendered.insert(server.name.clone(), Value::Object(native));
            }
        }

        set_map_at_path(&mut root, schema.servers_path, rendered)
            .map_err(|e| SyncError::parse(self.id(), path, e.to_string()))?;
        serializer
            .render(&root)
            .map_err(|e| SyncError::parse(self.id(), path, e.to_string()))
    }

    /// Atomically replace the config file with already rendered bytes.
    fn commit(&self, path: &Path, bytes: &[u8]) -> SyncResult<()> {
        atomic_write(path, bytes)?;
        tracing::info!(app = self.id(), path = %path.display(), "wrote config");
        Ok(())
    }

    /// Render `servers` over the current file and commit the result.
    ///
    /// No hash check and no backup happen here; the sync engine calls
    /// [`render`](Self::render) and [`commit`](Self::commit) itself so it can
    /// snapshot the file in between.
    fn write(&self, ctx: &AdapterContext, servers: &[McpServer]) -> SyncResult<()> {
        let path = self.config_path(ctx);
        let existing = read_optional(&path)?;
        let bytes = self.render(&path, existing.as_deref(), servers)?;
        self.commit(&path, &bytes)
    }

    /// Check a server definition before it is added next to `existing`.
    fn validate(&self, server: &McpServer, existing: &[McpServer]) -> Result<(), ValidationError> {
        validate_server(server)?;
        if existing.iter().any(|s| s.name == server.name) {
            return Err(ValidationError::DuplicateName {
                server: server.name.clone(),
                app: self.id().to_string(),
            });
        }
        Ok(())
    }
}

/// Name and launch target checks shared by every application.
///
/// A server without a command is accepted only when it points at a remote
/// endpoint (`url`).
pub fn validate_server(server: &McpServer) -> Result<(), ValidationError> {
    if server.name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if server.command.trim().is_empty() && !server.extra.contains_key(URL_KEY) {
        return Err(ValidationError::MissingCommand {
            server: server.name.clone(),
        });
    }
    Ok(())
}

fn is_managed_key(key: &str, toggle: ToggleField) -> bool {
    matches!(key, COMMAND_KEY | ARGS_KEY | ENV_KEY) || key == toggle.key()
}

fn server_from_entry(name: &str, entry: &Value, toggle: ToggleField) -> Result<McpServer, String> {
    let Some(obj) = entry.as_object() else {
        return Err(format!("server '{name}' is not an object"));
    };

    let command = match obj.get(COMMAND_KEY) {
        None => String::new(),
        Some(Value::String(command)) => command.clone(),
        Some(_) => return Err(format!("server '{name}': 'command' must be a string")),
    };

    let args = match obj.get(ARGS_KEY) {
        None => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| format!("server '{name}': 'args' must be an array of strings"))?,
        Some(_) => return Err(format!("server '{name}': 'args' must be an array of strings")),
    };

    let env = match obj.get(ENV_KEY) {
        None => BTreeMap::new(),
        Some(Value::Object(vars)) => vars
            .iter()
            .map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
            .collect::<Option<BTreeMap<_, _>>>()
            .ok_or_else(|| format!("server '{name}': 'env' must map names to strings"))?,
        Some(_) => return Err(format!("server '{name}': 'env' must map names to strings")),
    };

    let enabled = toggle
        .read(obj.get(toggle.key()))
        .map_err(|e| format!("server '{name}': {e}"))?;

    let extra = obj
        .iter()
        .filter(|(key, _)| !is_managed_key(key, toggle))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    Ok(McpServer {
        name: name.to_string(),
        command,
        args,
        env,
        enabled,
        extra,
    })
}

fn entry_for_server(
    existing: Option<&Map<String, Value>>,
    server: &McpServer,
    toggle: ToggleField,
) -> Map<String, Value> {
    let mut entry = existing.cloned().unwrap_or_default();
    entry.retain(|key, _| is_managed_key(key, toggle) || server.extra.contains_key(key));

    if !server.command.is_empty() || entry.contains_key(COMMAND_KEY) {
        entry.insert(
            COMMAND_KEY.to_string(),
            Value::String(server.command.clone()),
        );
    }
    if !server.args.is_empty() || entry.contains_key(ARGS_KEY) {
        let args = server.args.iter().cloned().map(Value::String).collect();
        entry.insert(ARGS_KEY.to_string(), Value::Array(args));
    }
    if !server.env.is_empty() || entry.contains_key(ENV_KEY) {
        let env = server
            .env
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        entry.insert(ENV_KEY.to_string(), Value::Object(env));
    }
    for (key, value) in &server.extra {
        entry.insert(key.clone(), value.clone());
    }
    toggle.write(&mut entry, server.enabled);
    entry
}
