//! Call-stack frames of the script interpreter.

use std::fmt;
use std::sync::Arc;

/// The statement list a frame executes.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Routine {
    /// The process's own body.
    Body,
    /// A shared function.
    Function(Arc<str>),
}

impl fmt::Display for Routine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Routine::Body => f.write_str("body"),
            Routine::Function(name) => f.write_str(name),
        }
    }
}

/// A return address: the routine and the index of the next statement.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ScriptFrame {
    pub routine: Routine,
    pub pc: usize,
}

impl ScriptFrame {
    pub fn body(pc: usize) -> Self {
        Self {
            routine: Routine::Body,
            pc,
        }
    }

    pub fn function(name: impl Into<Arc<str>>) -> Self {
        Self {
            routine: Routine::Function(name.into()),
            pc: 0,
        }
    }
}

// Compact form, since call stacks show up in every displayed configuration.
impl fmt::Debug for ScriptFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.routine, self.pc)
    }
}

impl fmt::Debug for Routine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_debug_is_compact() {
        assert_eq!(format!("{:?}", ScriptFrame::body(3)), "body@3");
        assert_eq!(
            format!("{:?}", vec![ScriptFrame::body(1), ScriptFrame::function("f")]),
            "[body@1, f@0]"
        );
    }
}
