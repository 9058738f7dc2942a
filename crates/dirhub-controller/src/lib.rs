//! # dirhub-controller
//!
//! Keeps an application's projection of one DirHub subtree converged with
//! the directory store. A [`Controller`] combines the live event stream of
//! a [`dirhub_realtime::Watcher`] with periodic jittered sweeps, and hands
//! every meaningful change to the application's [`Reconciler`].

pub mod builder;
pub mod controller;
pub mod reconciler;
pub mod ticker;

pub use builder::ControllerBuilder;
pub use controller::Controller;
pub use reconciler::{LoggingReconciler, NoopReconciler, Reconciler};
pub use ticker::JitterTicker;
