//! Keyboard automation for the prescription entry workflow.
//!
//! The [`workflow::WorkflowOrchestrator`] sequences provider calls with
//! input injection: connect, fetch drugs, type them into the focused
//! prescription software, submit, hand off to the e-signature browser and
//! close the provider session. Injection goes through
//! [`injector::InputInjector`], which enforces the pointer-corner
//! fail-safe; delays go through [`timer::StepTimer`], which honours the
//! same fail-safe while waiting.

pub mod backends;
pub mod events;
pub mod failsafe;
pub mod injector;
pub mod signature;
pub mod timer;
pub mod workflow;
