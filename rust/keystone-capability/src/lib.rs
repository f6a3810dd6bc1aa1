//! Namespaced capability declarations.
//!
//! Sign-in extensions contribute permissions to the session message they
//! are about to be signed into. Every contribution is scoped by a
//! [`Namespace`] so that two extensions can never collide:
//!
//! - **default actions**: abilities granted over the namespace as a whole;
//! - **targeted actions**: abilities granted over a specific target
//!   (a resource URI, contract address, ...);
//! - **extra fields**: opaque metadata that helps a verifier validate the
//!   capability.
//!
//! [`Capabilities`] accumulates contributions. Abilities are kept in ordered
//! sets, so contributing the same ability twice is a no-op and two
//! extensions sharing a namespace add up instead of overwriting each other.
//! Once collected, the declarations are replayed into any [`CapabilitySink`],
//! typically the session message builder.
//!
//! ```rust
//! use keystone_capability::{Capabilities, CapabilitySink, Namespace};
//!
//! let storage: Namespace = "storage".parse().unwrap();
//! let mut capabilities = Capabilities::default();
//! capabilities.add_default_actions(&storage, &["get".into(), "put".into()]);
//! capabilities.add_default_actions(&storage, &["get".into()]);
//!
//! assert_eq!(capabilities.default_actions(&storage).count(), 2);
//! ```

mod capabilities;
mod namespace;

pub use capabilities::*;
pub use namespace::*;
