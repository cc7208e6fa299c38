//! Script interpreter implementing [`AnalyzedProcess`].

use std::sync::Arc;

use log::trace;
use statespace_core::{
    AnalyzedProcess, Blocker, Composable, EventBlocker, ExplorationHandle, Lockable, ProcessId,
    StepError, Transition,
};

use crate::frame::{Routine, ScriptFrame};
use crate::info::{Actor, StepInfo};
use crate::model::{Model, ProcessKind, Statement};
use crate::semantics::{
    is_maybe_ready, notify, sensitivity_blocker, stop_simulation, ScriptConfiguration,
};

/// Statements one step may execute, over all branches, before the process
/// is considered stuck in a non-blocking loop.
pub const STATEMENT_BUDGET: usize = 10_000;

/// One process of a scripted [`Model`].
#[derive(Debug, Clone)]
pub struct ScriptProcess {
    id: ProcessId,
    index: usize,
    model: Arc<Model>,
}

/// Where a branch left the process.
enum Outcome {
    Blocked(Blocker),
    Terminated,
    /// The stop terminated everything, this process included.
    Stopped,
}

struct Branch {
    config: ScriptConfiguration,
    stack: Vec<ScriptFrame>,
    info: StepInfo,
}

impl ScriptProcess {
    pub(crate) fn new(model: Arc<Model>, index: usize) -> Self {
        let id = ProcessId::new(model.processes[index].name.as_str());
        Self { id, index, model }
    }

    fn kind(&self) -> ProcessKind {
        self.model.processes[self.index].kind
    }

    fn model_error(&self, message: impl std::fmt::Display) -> StepError {
        StepError::Model(format!("process {}: {message}", self.id))
    }

    /// Runs `branch` until the process blocks, terminates or stops the
    /// simulation. Forks from `choose` are pushed onto `pending`.
    fn run_branch(
        &self,
        branch: &mut Branch,
        pending: &mut Vec<Branch>,
        executed: &mut usize,
    ) -> Result<Outcome, StepError> {
        loop {
            let Some(frame) = branch.stack.last().cloned() else {
                return Ok(Outcome::Terminated);
            };
            let statements = self
                .model
                .routine(self.index, &frame.routine)
                .ok_or_else(|| self.model_error(format!("unknown routine {}", frame.routine)))?;

            let Some(statement) = statements.get(frame.pc) else {
                match frame.routine {
                    Routine::Function(_) => {
                        branch.stack.pop();
                        continue;
                    }
                    Routine::Body => return Ok(self.finish_body(branch)),
                }
            };

            *executed += 1;
            if *executed > STATEMENT_BUDGET {
                return Err(self.model_error(format!(
                    "exceeded {STATEMENT_BUDGET} statements without blocking"
                )));
            }
            let next = frame.pc + 1;

            match statement {
                Statement::Notify(spec) => {
                    notify(&self.model, &mut branch.config, &spec.event, spec.delay, &mut branch.info);
                    self.jump(branch, next);
                }
                Statement::Wait(spec) => {
                    let timeout = spec.timeout.and_then(|delay| delay.timer());
                    let blocker = EventBlocker::new(spec.events.iter().cloned(), spec.mode, timeout);
                    self.jump(branch, next);
                    return Ok(Outcome::Blocked(Blocker::Event(blocker)));
                }
                Statement::WaitTime(delay) => {
                    let timer = delay
                        .timer()
                        .ok_or_else(|| self.model_error("wait_time cannot be immediate"))?;
                    self.jump(branch, next);
                    return Ok(Outcome::Blocked(Blocker::Timed(timer)));
                }
                Statement::RequestUpdate(instance) => {
                    branch.config.global_mut().request_update(instance.clone());
                    branch.info.updates.insert(instance.clone());
                    self.jump(branch, next);
                }
                Statement::Choose(targets) => {
                    let Some((&first, rest)) = targets.split_first() else {
                        return Err(self.model_error("choose without targets"));
                    };
                    for &target in rest {
                        let mut fork = Branch {
                            config: branch.config.clone(),
                            stack: branch.stack.clone(),
                            info: branch.info.clone(),
                        };
                        self.jump(&mut fork, target);
                        pending.push(fork);
                    }
                    self.jump(branch, first);
                }
                Statement::Goto(target) => self.jump(branch, *target),
                Statement::Call(name) => {
                    self.jump(branch, next);
                    branch.stack.push(ScriptFrame::function(name.as_str()));
                }
                Statement::Return => match frame.routine {
                    Routine::Function(_) => {
                        branch.stack.pop();
                    }
                    Routine::Body => return Ok(self.finish_body(branch)),
                },
                Statement::Stop => {
                    stop_simulation(&self.model, &mut branch.config);
                    if branch.config.process(&self.id).is_some_and(|s| s.is_terminated()) {
                        return Ok(Outcome::Stopped);
                    }
                    self.jump(branch, next);
                }
                Statement::End => return Ok(self.finish_body(branch)),
            }
        }
    }

    fn jump(&self, branch: &mut Branch, pc: usize) {
        if let Some(frame) = branch.stack.last_mut() {
            frame.pc = pc;
        }
    }

    /// Threads terminate at the end of their body. Methods restart and wait
    /// for their static sensitivity.
    fn finish_body(&self, branch: &mut Branch) -> Outcome {
        branch.stack.clear();
        let spec = &self.model.processes[self.index];
        if self.kind() == ProcessKind::Method {
            if let Some(blocker) = sensitivity_blocker(&spec.sensitivity) {
                branch.stack.push(ScriptFrame::body(0));
                return Outcome::Blocked(blocker);
            }
        }
        Outcome::Terminated
    }

    fn settle(&self, mut branch: Branch, outcome: Outcome) -> Branch {
        if let Outcome::Stopped = outcome {
            return branch;
        }
        let stack = std::mem::take(&mut branch.stack);
        if let Some(state) = branch.config.process_mut(&self.id) {
            match outcome {
                Outcome::Blocked(blocker) => {
                    state.set_blocker(Some(blocker));
                    *state.call_stack_mut() = stack;
                }
                Outcome::Terminated | Outcome::Stopped => {
                    state.terminate();
                    state.call_stack_mut().clear();
                }
            }
        }
        branch
    }
}

impl AnalyzedProcess for ScriptProcess {
    type Frame = ScriptFrame;
    type Info = StepInfo;

    fn id(&self) -> &ProcessId {
        &self.id
    }

    fn make_step(
        &self,
        state: &ScriptConfiguration,
        handle: &ExplorationHandle,
    ) -> Result<Vec<Transition<ScriptFrame, StepInfo>>, StepError> {
        handle.check_aborted()?;

        let current = state
            .process(&self.id)
            .ok_or_else(|| self.model_error("missing from configuration"))?;
        let mut info = StepInfo::new(Actor::Process(self.id.clone()));
        match current.blocker() {
            None => {}
            Some(blocker) if is_maybe_ready(&self.model, blocker) => {
                info.woken.insert(self.id.clone());
            }
            Some(blocker) => {
                return Err(self.model_error(format!("stepped while waiting for {blocker}")));
            }
        }
        let stack = current.call_stack().to_vec();

        let mut config = state.unlocked_clone();
        if let Some(process) = config.process_mut(&self.id) {
            process.set_blocker(None);
        }

        let mut pending = vec![Branch { config, stack, info }];
        let mut executed = 0;
        let mut results: Vec<(ScriptConfiguration, StepInfo)> = Vec::new();

        while let Some(mut branch) = pending.pop() {
            handle.check_aborted()?;
            let outcome = self.run_branch(&mut branch, &mut pending, &mut executed)?;
            let Branch { mut config, info, .. } = self.settle(branch, outcome);
            config.lock();

            match results.iter_mut().find(|(existing, _)| *existing == config) {
                Some((_, merged)) => *merged = merged.clone().compose(info),
                None => results.push((config, info)),
            }
        }

        trace!("{} produced {} transitions", self.id, results.len());
        Ok(results
            .into_iter()
            .map(|(config, info)| Transition::new(config, info))
            .collect())
    }
}
