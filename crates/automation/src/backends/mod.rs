//! Concrete [`InputBackend`](crate::injector::InputBackend)s.

mod dry_run;
pub use dry_run::DryRunBackend;

#[cfg(feature = "desktop")]
mod desktop;
#[cfg(feature = "desktop")]
pub use desktop::DesktopBackend;
