//! Concrete tool adapters built on the execution runtime.

mod crm;
mod email;
mod messaging;

pub use crm::{SearchContacts, SearchContactsParams};
pub use email::{SendBulkEmail, SendBulkEmailParams};
pub use messaging::{PostMessage, PostMessageParams};

use tool_runtime::ToolRegistry;

/// Register every adapter in this crate with the catalog.
pub fn register_builtin(registry: &mut ToolRegistry) {
    registry.register(crm::descriptor());
    registry.register(messaging::descriptor());
    registry.register(email::descriptor());
}
