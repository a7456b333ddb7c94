//! The library implementing chronotask's scheduling engine.

#![warn(clippy::pedantic)]
#![warn(clippy::dbg_macro)]
#![deny(clippy::deref_by_slicing)]
#![warn(clippy::get_unwrap)]
#![warn(clippy::todo)]
#![warn(clippy::unimplemented)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(missing_docs)]

pub mod calendar;
pub mod config;
pub mod controller;
pub mod error;
pub mod model;
pub mod notifier;
pub mod recovery;
pub mod repository;
pub mod smart_scheduler;
pub mod task_scheduler;
pub mod timer;
