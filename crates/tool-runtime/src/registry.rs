//! Catalog of invocable tools.

use crate::tool::ToolDescriptor;
use std::collections::{HashMap, HashSet};

/// Registry of the tools the process exposes.
///
/// Stores descriptors rather than instances: runtime tools are
/// parameter-bound, while the catalog describes the invocable surface.
pub struct ToolRegistry {
    descriptors: HashMap<String, ToolDescriptor>,
    enabled: HashSet<String>,
}

impl ToolRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            descriptors: HashMap::new(),
            enabled: HashSet::new(),
        }
    }

    /// Register a tool descriptor (enabled by default).
    pub fn register(&mut self, descriptor: ToolDescriptor) {
        let name = descriptor.name.clone();
        self.descriptors.insert(name.clone(), descriptor);
        self.enabled.insert(name);
    }

    /// Enable a tool by name.
    pub fn enable(&mut self, name: &str) {
        if self.descriptors.contains_key(name) {
            self.enabled.insert(name.to_string());
        }
    }

    /// Disable a tool by name.
    pub fn disable(&mut self, name: &str) {
        self.enabled.remove(name);
    }

    /// Check if a tool is enabled.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled.contains(name)
    }

    /// Get a descriptor by name (only if enabled).
    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        if self.enabled.contains(name) {
            self.descriptors.get(name)
        } else {
            None
        }
    }

    /// Descriptors for all enabled tools.
    pub fn descriptors(&self) -> Vec<&ToolDescriptor> {
        self.descriptors
            .iter()
            .filter(|(name, _)| self.enabled.contains(*name))
            .map(|(_, descriptor)| descriptor)
            .collect()
    }

    /// List all registered tool names.
    pub fn list_tools(&self) -> Vec<&str> {
        self.descriptors.keys().map(|s| s.as_str()).collect()
    }

    /// List enabled tool names.
    pub fn list_enabled(&self) -> Vec<&str> {
        self.enabled.iter().map(|s| s.as_str()).collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
