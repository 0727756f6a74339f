//! Non-fatal diagnostics
//!
//! Warnings are stored as typed values and also rendered, in order, to an
//! optional text sink. The sink also receives action trace lines when tracing
//! is enabled.

use super::symbols::SymbolKind;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    UnusedSymbol {
        name: String,
        kind: SymbolKind,
        offset: usize,
    },
    UninitializedUse {
        name: String,
        offset: usize,
    },
    LoweringSuspended {
        reason: String,
        offset: usize,
    },
}

impl Warning {
    pub fn offset(&self) -> usize {
        match self {
            Warning::UnusedSymbol { offset, .. }
            | Warning::UninitializedUse { offset, .. }
            | Warning::LoweringSuspended { offset, .. } => *offset,
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::UnusedSymbol { name, kind, .. } => {
                write!(f, "{} '{}' declared but never used", kind, name)
            }
            Warning::UninitializedUse { name, .. } => {
                write!(f, "'{}' used before initialization", name)
            }
            Warning::LoweringSuspended { reason, .. } => {
                write!(f, "code generation suspended: {}", reason)
            }
        }
    }
}

pub type DiagnosticSink = Box<dyn FnMut(&str)>;

#[derive(Default)]
pub struct Diagnostics {
    sink: Option<DiagnosticSink>,
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn set_sink(&mut self, sink: DiagnosticSink) {
        self.sink = Some(sink);
    }

    pub fn warn(&mut self, warning: Warning) {
        let line = format!("warning at offset {}: {}", warning.offset(), warning);
        self.emit(&line);
        self.warnings.push(warning);
    }

    /// Forward a plain line to the sink without recording it
    pub fn emit(&mut self, line: &str) {
        if let Some(sink) = self.sink.as_mut() {
            sink(line);
        }
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("sink", &self.sink.is_some())
            .field("warnings", &self.warnings)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_sink_receives_warnings_in_order() {
        let lines = Rc::new(RefCell::new(Vec::new()));
        let captured = Rc::clone(&lines);
        let mut diagnostics = Diagnostics::default();
        diagnostics.set_sink(Box::new(move |line| captured.borrow_mut().push(line.to_string())));

        diagnostics.warn(Warning::UninitializedUse {
            name: "x".into(),
            offset: 3,
        });
        diagnostics.warn(Warning::UnusedSymbol {
            name: "y".into(),
            kind: SymbolKind::Variable,
            offset: 9,
        });

        assert_eq!(
            *lines.borrow(),
            vec![
                "warning at offset 3: 'x' used before initialization".to_string(),
                "warning at offset 9: variable 'y' declared but never used".to_string(),
            ]
        );
        assert_eq!(diagnostics.warnings().len(), 2);
    }
}
