//! Scripted discrete-event models for state-space exploration.
//!
//! A [`Model`] describes processes that run small statement programs:
//! notify events, wait for events or time, request updates, branch
//! nondeterministically and stop the simulation. [`ScriptScheduler`] and
//! [`ScriptProcess`] implement the collaborator contracts of
//! `statespace-core` for such models, with delta cycles, timed
//! notifications and an update phase.
//!
//! # Module Structure
//!
//! - [`model`]: JSON model format, loading and validation
//! - [`frame`]: interpreter call-stack frames
//! - [`info`]: what each transition did
//! - [`process`]: the statement interpreter
//! - [`scheduler`]: evaluation, update and advancement phases
//! - [`generate`]: seeded random models

pub mod error;
pub mod frame;
pub mod generate;
pub mod info;
pub mod model;
pub mod process;
pub mod scheduler;

mod semantics;

pub use error::ModelError;
pub use frame::{Routine, ScriptFrame};
pub use generate::{generate_model, GeneratorConfig};
pub use info::{Actor, StepInfo};
pub use model::{
    load_model, save_model, Delay, Model, NotifySpec, ProcessKind, ProcessSpec, Statement,
    StopMode, WaitSpec,
};
pub use process::{ScriptProcess, STATEMENT_BUDGET};
pub use scheduler::ScriptScheduler;
