//! Random model generation for stress testing the engines.
//!
//! Generated models always have a finite state space: thread bodies only
//! jump forward, method bodies never wait, and delays are bounded.

use std::collections::{BTreeMap, BTreeSet};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use statespace_core::{EventId, InstanceId, SimTime, TimeUnit, WaitMode};

use crate::model::{
    Delay, Model, NotifySpec, ProcessKind, ProcessSpec, Statement, StopMode, WaitSpec,
};

/// Shape of a generated model.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub processes: usize,
    pub events: usize,
    /// Statements per process body.
    pub statements: usize,
    /// Largest timed delay, in nanoseconds.
    pub max_delay_ns: u64,
    /// Probability that a process is a method instead of a thread.
    pub method_prob: f64,
    /// Probability of a `stop` statement.
    pub stop_prob: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            processes: 3,
            events: 3,
            statements: 6,
            max_delay_ns: 3,
            method_prob: 0.25,
            stop_prob: 0.02,
        }
    }
}

/// Generates a valid model. The same seed and config always produce the
/// same model.
pub fn generate_model(seed: u64, config: &GeneratorConfig) -> Model {
    let mut generator = Generator {
        config,
        rng: ChaCha8Rng::seed_from_u64(seed),
        events: (0..config.events.max(1))
            .map(|i| EventId::new(format!("e{i}")))
            .collect(),
        update_events: BTreeMap::new(),
    };

    let processes: Vec<ProcessSpec> = (0..config.processes)
        .map(|index| generator.process(index))
        .collect();

    let stop_mode = if generator.rng.gen_bool(0.5) {
        StopMode::FinishImmediate
    } else {
        StopMode::FinishDelta
    };

    Model {
        stop_mode,
        abstracted_events: BTreeSet::new(),
        update_events: generator.update_events,
        functions: BTreeMap::new(),
        processes,
    }
}

struct Generator<'a> {
    config: &'a GeneratorConfig,
    rng: ChaCha8Rng,
    events: Vec<EventId>,
    update_events: BTreeMap<InstanceId, EventId>,
}

impl Generator<'_> {
    fn process(&mut self, index: usize) -> ProcessSpec {
        let is_method = self.rng.gen_bool(self.config.method_prob.clamp(0.0, 1.0));
        let len = self.config.statements;

        if is_method {
            let body = (0..len).map(|pc| self.method_statement(pc, len)).collect();
            ProcessSpec {
                name: format!("m{index}"),
                kind: ProcessKind::Method,
                sensitivity: vec![self.event()],
                dont_initialize: self.rng.gen_bool(0.5),
                body,
            }
        } else {
            let mut body: Vec<Statement> =
                (0..len).map(|pc| self.thread_statement(pc, len)).collect();
            body.push(Statement::End);
            ProcessSpec {
                name: format!("t{index}"),
                kind: ProcessKind::Thread,
                sensitivity: Vec::new(),
                dont_initialize: false,
                body,
            }
        }
    }

    fn thread_statement(&mut self, pc: usize, len: usize) -> Statement {
        if self.rng.gen_bool(self.config.stop_prob.clamp(0.0, 1.0)) {
            return Statement::Stop;
        }
        match self.rng.gen_range(0..7) {
            0 | 1 => self.notify(),
            2 => {
                let count = self.rng.gen_range(1..=2);
                let events = (0..count).map(|_| self.event()).collect();
                let mode = if self.rng.gen_bool(0.5) {
                    WaitMode::AnyOf
                } else {
                    WaitMode::AllOf
                };
                let timeout = self.rng.gen_bool(0.3).then(|| self.timed_delay());
                Statement::Wait(WaitSpec {
                    events,
                    mode,
                    timeout,
                })
            }
            3 => Statement::WaitTime(self.timed_delay()),
            4 => self.request_update(),
            5 => Statement::Choose(vec![self.forward(pc, len), self.forward(pc, len)]),
            _ => Statement::Goto(self.forward(pc, len)),
        }
    }

    fn method_statement(&mut self, pc: usize, len: usize) -> Statement {
        match self.rng.gen_range(0..4) {
            0 | 1 => self.notify(),
            2 => self.request_update(),
            _ => Statement::Choose(vec![pc + 1, self.forward(pc, len)]),
        }
    }

    fn notify(&mut self) -> Statement {
        let event = self.event();
        let delay = match self.rng.gen_range(0..3) {
            0 => Delay::Immediate,
            1 => Delay::Delta,
            _ => self.timed_delay(),
        };
        Statement::Notify(NotifySpec { event, delay })
    }

    fn request_update(&mut self) -> Statement {
        let slot = self.rng.gen_range(0..self.events.len());
        let instance = InstanceId::new(format!("sig{slot}"));
        self.update_events
            .entry(instance.clone())
            .or_insert_with(|| EventId::new(format!("e{slot}")));
        Statement::RequestUpdate(instance)
    }

    fn event(&mut self) -> EventId {
        let index = self.rng.gen_range(0..self.events.len());
        self.events[index].clone()
    }

    /// A target strictly after `pc`, possibly the end of the body.
    fn forward(&mut self, pc: usize, len: usize) -> usize {
        self.rng.gen_range(pc + 1..=len)
    }

    fn timed_delay(&mut self) -> Delay {
        let ns = self.rng.gen_range(0..=self.config.max_delay_ns);
        match SimTime::new(ns, TimeUnit::Ns) {
            Ok(duration) => Delay::Time(duration),
            Err(_) => Delay::Delta,
        }
    }
}
