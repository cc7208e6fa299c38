//! Configuration model and collaborator contracts for exhaustive
//! state-space exploration of discrete-event designs.
//!
//! A [`Configuration`] is one vertex of the explored graph: the
//! [`GlobalState`] (pending event notifications, requested updates, stop
//! flag) plus a [`ProcessState`] per process (its [`Blocker`] and call
//! stack). Collaborators build configurations mutably, then lock them;
//! a locked configuration is immutable, carries a cached hash and is shared
//! through [`Frozen`].
//!
//! # Module Structure
//!
//! - [`lockable`]: freeze discipline, memoized hashes, `Frozen<T>`
//! - [`ids`]: event, process and instance names
//! - [`time`]: femtosecond simulated time
//! - [`blocker`]: what a process waits for
//! - [`global`], [`process`], [`configuration`]: the state model
//! - [`info`], [`transition`]: edges and their payloads
//! - [`collaborator`]: `Scheduler`, `AnalyzedProcess`, `ExplorationRecord`
//! - [`handle`]: explicit abort/done context passed to collaborators

pub mod blocker;
pub mod collaborator;
pub mod configuration;
pub mod error;
pub mod global;
pub mod handle;
pub mod ids;
pub mod info;
pub mod lockable;
pub mod process;
pub mod time;
pub mod transition;

pub use blocker::{Blocker, EventBlocker, TimedBlocker, WaitMode};
pub use collaborator::{AnalyzedProcess, ExplorationRecord, Scheduler};
pub use configuration::Configuration;
pub use error::StepError;
pub use global::GlobalState;
pub use handle::ExplorationHandle;
pub use ids::{EventId, InstanceId, ProcessId};
pub use info::{Composable, InfoPair, NoInformation, TransitionInfo};
pub use lockable::{Frozen, Lockable, MemoHash};
pub use process::{Frame, ProcessState};
pub use time::{SimTime, TimeError, TimeUnit};
pub use transition::Transition;
