//! Flow rule programming.
//!
//! Every rule the application writes, whether it forwards along a route,
//! floods, or drops, is described by a [`FlowRuleDescriptor`] and written by
//! the [`FlowRuleInstaller`] as exactly one flow-modification message.

mod installer;
mod types;

pub use installer::{FlowRuleInstaller, InstallerStats};
pub use types::{AppCookie, FlowRuleDescriptor, DEFAULT_PRIORITY, FORWARDING_APP_ID};
