//! Contracts between the exploration engines and the analysis code.
//!
//! The engines learn about successor configurations only through a
//! [`Scheduler`] and the [`AnalyzedProcess`]es it hands out, and report
//! every discovered edge to an [`ExplorationRecord`]. What a step computes
//! and what is done with the edges is up to the implementations.

use std::sync::Arc;

use crate::configuration::Configuration;
use crate::error::StepError;
use crate::handle::ExplorationHandle;
use crate::ids::ProcessId;
use crate::info::TransitionInfo;
use crate::lockable::Frozen;
use crate::process::Frame;
use crate::transition::Transition;

/// A process whose steps can be computed on abstract configurations.
pub trait AnalyzedProcess {
    type Frame: Frame;
    type Info: TransitionInfo;

    fn id(&self) -> &ProcessId;

    /// All transitions this process can take from `state`.
    ///
    /// Only called while the process is among the scheduler's ready
    /// processes for `state`. Must return at least one transition.
    fn make_step(
        &self,
        state: &Configuration<Self::Frame>,
        handle: &ExplorationHandle,
    ) -> Result<Vec<Transition<Self::Frame, Self::Info>>, StepError>;
}

/// Decides which processes may run and advances simulated time.
pub trait Scheduler {
    type Frame: Frame;
    type Info: TransitionInfo;
    type Process: AnalyzedProcess<Frame = Self::Frame, Info = Self::Info>;

    /// Whether the current evaluation phase may end in `state`.
    fn can_end_evaluation(
        &self,
        state: &Configuration<Self::Frame>,
        handle: &ExplorationHandle,
    ) -> Result<bool, StepError>;

    /// Update phase plus delta or time advancement. Only valid after
    /// [`Scheduler::can_end_evaluation`] returned `true`. An empty result
    /// means the simulation ended along this path.
    fn end_evaluation(
        &self,
        state: &Configuration<Self::Frame>,
        handle: &ExplorationHandle,
    ) -> Result<Vec<Transition<Self::Frame, Self::Info>>, StepError>;

    /// Processes that may be ready. A superset of the definitely ready ones
    /// when the abstraction leaves readiness undetermined.
    fn ready_processes(
        &self,
        state: &Configuration<Self::Frame>,
        handle: &ExplorationHandle,
    ) -> Result<Vec<&Self::Process>, StepError>;
}

/// Sink for discovered edges.
///
/// Called once per edge, including edges into configurations that were
/// already explored. With the concurrent engine it is called from every
/// worker thread in no particular order.
pub trait ExplorationRecord<F, I> {
    fn exploration_made(
        &self,
        from: &Frozen<Configuration<F>>,
        to: &Frozen<Configuration<F>>,
        info: &I,
    );
}

impl<F, I, R> ExplorationRecord<F, I> for Arc<R>
where
    R: ExplorationRecord<F, I> + ?Sized,
{
    fn exploration_made(
        &self,
        from: &Frozen<Configuration<F>>,
        to: &Frozen<Configuration<F>>,
        info: &I,
    ) {
        (**self).exploration_made(from, to, info);
    }
}

impl<F, I, R> ExplorationRecord<F, I> for &R
where
    R: ExplorationRecord<F, I> + ?Sized,
{
    fn exploration_made(
        &self,
        from: &Frozen<Configuration<F>>,
        to: &Frozen<Configuration<F>>,
        info: &I,
    ) {
        (**self).exploration_made(from, to, info);
    }
}
