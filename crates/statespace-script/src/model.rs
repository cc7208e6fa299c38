//! Scripted model description.
//!
//! A model is a set of processes, each running a small statement program,
//! plus optional shared functions. Models are plain JSON:
//!
//! ```json
//! {
//!   "stop_mode": "finish_delta",
//!   "processes": [
//!     { "name": "producer", "body": [ { "notify": { "event": "e" } }, "end" ] },
//!     { "name": "consumer", "body": [ { "wait": { "events": ["e"] } }, "end" ] }
//!   ]
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use statespace_core::{EventId, InstanceId, SimTime, TimeError, TimedBlocker, WaitMode};

use crate::error::ModelError;
use crate::frame::Routine;

/// How the simulation winds down after a `stop` statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopMode {
    /// Every process terminates at once.
    #[default]
    FinishImmediate,
    /// Processes that are ready or waiting on events finish the current
    /// delta cycle.
    FinishDelta,
}

/// Delay of a notification or timed wait.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Delay {
    /// Takes effect in the current evaluation phase.
    #[default]
    Immediate,
    /// Next delta cycle.
    Delta,
    /// After an amount of simulated time. Zero is a delta delay.
    Time(SimTime),
}

impl Delay {
    /// `None` for an immediate delay.
    pub fn timer(self) -> Option<TimedBlocker> {
        match self {
            Delay::Immediate => None,
            Delay::Delta => Some(TimedBlocker::Delta),
            Delay::Time(duration) => Some(TimedBlocker::from_duration(duration)),
        }
    }
}

impl FromStr for Delay {
    type Err = TimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "immediate" => Ok(Delay::Immediate),
            "delta" => Ok(Delay::Delta),
            other => other.parse().map(Delay::Time),
        }
    }
}

impl TryFrom<String> for Delay {
    type Error = TimeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Delay> for String {
    fn from(value: Delay) -> Self {
        match value {
            Delay::Immediate => "immediate".to_string(),
            Delay::Delta => "delta".to_string(),
            Delay::Time(duration) => duration.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifySpec {
    pub event: EventId,
    #[serde(default)]
    pub delay: Delay,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitSpec {
    pub events: Vec<EventId>,
    #[serde(default)]
    pub mode: WaitMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Delay>,
}

/// One statement of a process or function body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statement {
    Notify(NotifySpec),
    Wait(WaitSpec),
    WaitTime(Delay),
    RequestUpdate(InstanceId),
    /// Continue at any one of the targets.
    Choose(Vec<usize>),
    Goto(usize),
    Call(String),
    Return,
    Stop,
    End,
}

impl Statement {
    fn is_wait(&self) -> bool {
        matches!(self, Statement::Wait(_) | Statement::WaitTime(_))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessKind {
    /// Runs once through its body, suspending at waits.
    #[default]
    Thread,
    /// Runs its body to completion on each trigger of its static
    /// sensitivity.
    Method,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSpec {
    pub name: String,
    #[serde(default)]
    pub kind: ProcessKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sensitivity: Vec<EventId>,
    /// Wait for the sensitivity instead of running at start-up.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub dont_initialize: bool,
    pub body: Vec<Statement>,
}

/// A complete scripted model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    #[serde(default)]
    pub stop_mode: StopMode,
    /// Events whose notifications the analysis cannot track. Waiting on
    /// them makes a process possibly ready at any time.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub abstracted_events: BTreeSet<EventId>,
    /// Event delta-notified when an instance's requested update runs.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub update_events: BTreeMap<InstanceId, EventId>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub functions: BTreeMap<String, Vec<Statement>>,
    pub processes: Vec<ProcessSpec>,
}

impl Model {
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let model: Model = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }

    pub fn to_json(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Statements of `routine` as run by process `process`.
    pub fn routine(&self, process: usize, routine: &Routine) -> Option<&[Statement]> {
        match routine {
            Routine::Body => self.processes.get(process).map(|p| p.body.as_slice()),
            Routine::Function(name) => self.functions.get(name.as_ref()).map(Vec::as_slice),
        }
    }

    pub fn is_abstracted(&self, event: &EventId) -> bool {
        self.abstracted_events.contains(event)
    }

    /// Checks names, call targets, jump targets and statement arguments.
    pub fn validate(&self) -> Result<(), ModelError> {
        let mut names = HashSet::new();
        for process in &self.processes {
            if !names.insert(process.name.as_str()) {
                return Err(ModelError::DuplicateProcess(process.name.clone()));
            }
            if process.kind == ProcessKind::Method {
                if let Some(pc) = process.body.iter().position(Statement::is_wait) {
                    return Err(ModelError::InvalidStatement {
                        location: Location::new(&process.name, pc).to_string(),
                        reason: "methods cannot wait".to_string(),
                    });
                }
            }
            self.validate_statements(&process.name, &process.body)?;
        }
        for (name, body) in &self.functions {
            self.validate_statements(name, body)?;
        }
        Ok(())
    }

    fn validate_statements(&self, routine: &str, body: &[Statement]) -> Result<(), ModelError> {
        let invalid = |pc: usize, reason: &str| ModelError::InvalidStatement {
            location: Location::new(routine, pc).to_string(),
            reason: reason.to_string(),
        };
        let check_target = |pc: usize, target: usize| {
            // Jumping to the end of the body is allowed.
            if target > body.len() {
                Err(ModelError::JumpOutOfRange {
                    target,
                    location: Location::new(routine, pc).to_string(),
                })
            } else {
                Ok(())
            }
        };

        for (pc, statement) in body.iter().enumerate() {
            match statement {
                Statement::Wait(spec) => {
                    if spec.events.is_empty() {
                        return Err(invalid(pc, "wait needs at least one event"));
                    }
                    if spec.timeout == Some(Delay::Immediate) {
                        return Err(invalid(pc, "a timeout cannot be immediate"));
                    }
                }
                Statement::WaitTime(Delay::Immediate) => {
                    return Err(invalid(pc, "wait_time cannot be immediate"));
                }
                Statement::Choose(targets) => {
                    if targets.is_empty() {
                        return Err(invalid(pc, "choose needs at least one target"));
                    }
                    for &target in targets {
                        check_target(pc, target)?;
                    }
                }
                Statement::Goto(target) => check_target(pc, *target)?,
                Statement::Call(name) => {
                    if !self.functions.contains_key(name) {
                        return Err(ModelError::UnknownFunction {
                            name: name.clone(),
                            location: Location::new(routine, pc).to_string(),
                        });
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

struct Location<'a> {
    routine: &'a str,
    pc: usize,
}

impl<'a> Location<'a> {
    fn new(routine: &'a str, pc: usize) -> Self {
        Self { routine, pc }
    }
}

impl fmt::Display for Location<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.routine, self.pc)
    }
}

/// Load and validate a model from a JSON file.
pub fn load_model(path: &Path) -> Result<Model, ModelError> {
    let json = fs::read_to_string(path)?;
    Model::from_json(&json)
}

/// Save a model as pretty JSON.
pub fn save_model(model: &Model, path: &Path) -> Result<(), ModelError> {
    fs::write(path, model.to_json()?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use statespace_core::TimeUnit;
    use tempfile::TempDir;

    const HANDSHAKE: &str = r#"{
        "processes": [
            { "name": "producer", "body": [ { "notify": { "event": "e" } }, "end" ] },
            { "name": "consumer", "body": [
                { "wait": { "events": ["e"], "mode": "all", "timeout": "5ns" } },
                { "wait_time": "delta" },
                { "request_update": "sig" },
                { "choose": [0, 5] },
                "end"
            ] }
        ]
    }"#;

    #[test]
    fn test_parse_model() {
        let model = Model::from_json(HANDSHAKE).unwrap();
        assert_eq!(model.stop_mode, StopMode::FinishImmediate);
        assert_eq!(model.processes.len(), 2);
        assert_eq!(
            model.processes[0].body[0],
            Statement::Notify(NotifySpec {
                event: EventId::from("e"),
                delay: Delay::Immediate,
            })
        );
        assert_eq!(
            model.processes[1].body[0],
            Statement::Wait(WaitSpec {
                events: vec![EventId::from("e")],
                mode: WaitMode::AllOf,
                timeout: Some(Delay::Time(SimTime::new(5, TimeUnit::Ns).unwrap())),
            })
        );
        assert_eq!(model.processes[1].body[1], Statement::WaitTime(Delay::Delta));
        assert_eq!(model.processes[1].body[3], Statement::Choose(vec![0, 5]));
    }

    #[test]
    fn test_delay_timer() {
        assert_eq!(Delay::Immediate.timer(), None);
        assert_eq!(Delay::Delta.timer(), Some(TimedBlocker::Delta));
        assert_eq!(Delay::Time(SimTime::ZERO).timer(), Some(TimedBlocker::Delta));
        assert_eq!("3ps".parse::<Delay>().unwrap(), Delay::Time(SimTime::from_femtos(3_000)));
        assert!("soon".parse::<Delay>().is_err());
    }

    #[test]
    fn test_rejects_duplicate_process() {
        let json = r#"{ "processes": [
            { "name": "p", "body": [] },
            { "name": "p", "body": [] }
        ] }"#;
        assert!(matches!(
            Model::from_json(json),
            Err(ModelError::DuplicateProcess(name)) if name == "p"
        ));
    }

    #[test]
    fn test_rejects_jump_out_of_range() {
        let json = r#"{ "processes": [ { "name": "p", "body": [ { "goto": 3 } ] } ] }"#;
        assert!(matches!(
            Model::from_json(json),
            Err(ModelError::JumpOutOfRange { target: 3, .. })
        ));
    }

    #[test]
    fn test_rejects_unknown_function() {
        let json = r#"{ "processes": [ { "name": "p", "body": [ { "call": "f" } ] } ] }"#;
        assert!(matches!(
            Model::from_json(json),
            Err(ModelError::UnknownFunction { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_waits() {
        let empty = r#"{ "processes": [ { "name": "p", "body": [ { "wait": { "events": [] } } ] } ] }"#;
        assert!(Model::from_json(empty).is_err());
        let immediate = r#"{ "processes": [ { "name": "p", "body": [ { "wait_time": "immediate" } ] } ] }"#;
        assert!(Model::from_json(immediate).is_err());
        let method = r#"{ "processes": [ { "name": "m", "kind": "method", "body": [ { "wait_time": "1ns" } ] } ] }"#;
        assert!(matches!(
            Model::from_json(method),
            Err(ModelError::InvalidStatement { .. })
        ));
    }

    #[test]
    fn test_save_and_load_model() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.json");
        let model = Model::from_json(HANDSHAKE).unwrap();

        save_model(&model, &path).unwrap();
        let loaded = load_model(&path).unwrap();

        assert_eq!(loaded, model);
    }

    #[test]
    fn test_load_missing_model() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            load_model(&dir.path().join("missing.json")),
            Err(ModelError::Io(_))
        ));
    }
}
