//! Opaque transition payloads.
//!
//! The engines forward a transition's info to the exploration record
//! without inspecting it. Collaborators decide what it carries, e.g. which
//! events a step notified.

use std::fmt;

/// Payload attached to every transition.
pub trait TransitionInfo: fmt::Debug + Send + 'static {}

impl<T> TransitionInfo for T where T: fmt::Debug + Send + 'static {}

/// Infos that can be merged when two branches reach the same configuration.
pub trait Composable {
    fn compose(self, other: Self) -> Self;
}

/// The empty info token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoInformation;

impl Composable for NoInformation {
    fn compose(self, _other: Self) -> Self {
        NoInformation
    }
}

impl fmt::Display for NoInformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("-")
    }
}

/// Two independent payloads, composed component-wise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct InfoPair<A, B> {
    pub first: A,
    pub second: B,
}

impl<A, B> InfoPair<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A: Composable, B: Composable> Composable for InfoPair<A, B> {
    fn compose(self, other: Self) -> Self {
        Self {
            first: self.first.compose(other.first),
            second: self.second.compose(other.second),
        }
    }
}

impl<A: fmt::Display, B: fmt::Display> fmt::Display for InfoPair<A, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.first, self.second)
    }
}
