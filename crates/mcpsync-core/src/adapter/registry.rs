//! Adapter registry keyed by application id.

use super::{
    AppAdapter, amazon_q::AmazonQAdapter, claude_code::ClaudeCodeAdapter,
    claude_desktop::ClaudeDesktopAdapter, codex::CodexAdapter, cursor::CursorAdapter,
    gemini_cli::GeminiCliAdapter, vscode::VsCodeAdapter,
};

/// Registry of available application adapters.
#[derive(Debug)]
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn AppAdapter>>,
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::with_default_adapters()
    }
}

impl AdapterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            adapters: Vec::new(),
        }
    }

    /// Create a registry with every supported application.
    pub fn with_default_adapters() -> Self {
        let adapters: Vec<Box<dyn AppAdapter>> = vec![
            Box::new(ClaudeDesktopAdapter::new()),
            Box::new(ClaudeCodeAdapter::new()),
            Box::new(CursorAdapter::new()),
            Box::new(VsCodeAdapter::new()),
            Box::new(GeminiCliAdapter::new()),
            Box::new(AmazonQAdapter::new()),
            Box::new(CodexAdapter::new()),
        ];
        Self { adapters }
    }

    /// Register an adapter. A later registration with the same id replaces
    /// the earlier one.
    pub fn register(&mut self, adapter: Box<dyn AppAdapter>) {
        self.adapters.retain(|a| a.id() != adapter.id());
        self.adapters.push(adapter);
    }

    pub fn all(&self) -> &[Box<dyn AppAdapter>] {
        &self.adapters
    }

    /// Get an adapter by application id.
    pub fn get(&self, id: &str) -> Option<&dyn AppAdapter> {
        self.adapters
            .iter()
            .find(|a| a.id() == id)
            .map(|a| a.as_ref())
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.adapters.iter().map(|a| a.id()).collect()
    }

    /// Adapters whose id is in `enabled`, in registry order.
    pub fn filter_enabled<'a>(&'a self, enabled: &[String]) -> Vec<&'a dyn AppAdapter> {
        self.adapters
            .iter()
            .filter(|a| enabled.iter().any(|id| id == a.id()))
            .map(|a| a.as_ref())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_all_apps() {
        let registry = AdapterRegistry::with_default_adapters();
        assert_eq!(
            registry.ids(),
            vec![
                "claude-desktop",
                "claude-code",
                "cursor",
                "vscode",
                "gemini-cli",
                "amazon-q",
                "codex"
            ]
        );
    }

    #[test]
    fn get_unknown_is_none() {
        let registry = AdapterRegistry::default();
        assert!(registry.get("notepad").is_none());
        assert_eq!(registry.get("codex").map(|a| a.display_name()), Some("Codex"));
    }

    #[test]
    fn register_replaces_same_id() {
        let mut registry = AdapterRegistry::new();
        registry.register(Box::new(CursorAdapter::new()));
        registry.register(Box::new(CursorAdapter::new()));
        assert_eq!(registry.all().len(), 1);
    }

    #[test]
    fn filter_enabled_keeps_registry_order() {
        let registry = AdapterRegistry::default();
        let enabled = vec!["codex".to_string(), "cursor".to_string()];
        let ids: Vec<_> = registry
            .filter_enabled(&enabled)
            .iter()
            .map(|a| a.id())
            .collect();
        assert_eq!(ids, vec!["cursor", "codex"]);
    }
}
