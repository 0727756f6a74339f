//! Parser table artifact
//!
//! Raw layout: `states x symbol_count` cells of `[code, param]`, a
//! `productions` vector of `[lhs, rhs_len]` and one diagnostic per state.
//! [`ParseTable::new`] validates the raw data and decodes every cell into an
//! [`Entry`]; after that the driver never sees an unchecked number.

use crate::errors::TableError;
use crate::semantic::action::SemanticAction;
use std::fmt;

pub const SHIFT: i32 = 0;
pub const REDUCE: i32 = 1;
pub const ACTION: i32 = 2;
pub const ACCEPT: i32 = 3;
pub const GOTO: i32 = 4;
pub const ERROR: i32 = 5;

/// A decoded table cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    Shift(usize),
    Reduce(usize),
    Action(SemanticAction),
    Accept,
    Goto(usize),
    Error,
}

impl Entry {
    pub fn encode(self) -> [i32; 2] {
        match self {
            Entry::Shift(state) => [SHIFT, state as i32],
            Entry::Reduce(production) => [REDUCE, production as i32],
            Entry::Action(action) => [ACTION, action.id() as i32],
            Entry::Accept => [ACCEPT, 0],
            Entry::Goto(state) => [GOTO, state as i32],
            Entry::Error => [ERROR, 0],
        }
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Shift(state) => write!(f, "shift {}", state),
            Entry::Reduce(production) => write!(f, "reduce {}", production),
            Entry::Action(action) => write!(f, "action {}", action),
            Entry::Accept => write!(f, "accept"),
            Entry::Goto(state) => write!(f, "goto {}", state),
            Entry::Error => write!(f, "error"),
        }
    }
}

/// Layout constants shared by the raw table and the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableLayout {
    pub symbol_count: usize,
    pub first_non_terminal: usize,
    pub first_semantic_action: usize,
}

/// Validated parser table
#[derive(Debug, Clone)]
pub struct ParseTable {
    layout: TableLayout,
    entries: Vec<Entry>,
    productions: Vec<(usize, usize)>,
    messages: Vec<String>,
}

impl ParseTable {
    pub fn new(
        layout: TableLayout,
        cells: &[[i32; 2]],
        productions: &[[i32; 2]],
        messages: Vec<String>,
    ) -> Result<Self, TableError> {
        let TableLayout {
            symbol_count,
            first_non_terminal,
            first_semantic_action,
        } = layout;

        if !(2 <= first_non_terminal
            && first_non_terminal <= first_semantic_action
            && first_semantic_action <= symbol_count)
        {
            return Err(TableError::Malformed(format!(
                "inconsistent symbol layout {:?}",
                layout
            )));
        }
        if cells.is_empty() || cells.len() % symbol_count != 0 {
            return Err(TableError::Malformed(format!(
                "{} cells do not form rows of {} symbols",
                cells.len(),
                symbol_count
            )));
        }
        let states = cells.len() / symbol_count;
        if messages.len() != states {
            return Err(TableError::Malformed(format!(
                "{} messages for {} states",
                messages.len(),
                states
            )));
        }

        let productions = productions
            .iter()
            .map(|&[lhs, len]| {
                let in_range = lhs >= first_non_terminal as i32
                    && lhs < first_semantic_action as i32
                    && len >= 0;
                if in_range {
                    Ok((lhs as usize, len as usize))
                } else {
                    Err(TableError::Malformed(format!(
                        "production [{}, {}] is out of range",
                        lhs, len
                    )))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut entries = Vec::with_capacity(cells.len());
        for (index, &[code, param]) in cells.iter().enumerate() {
            let state = index / symbol_count;
            let column = index % symbol_count;
            let check = |limit: usize| {
                if param >= 0 && (param as usize) < limit {
                    Ok(param as usize)
                } else {
                    Err(TableError::OutOfRange {
                        state,
                        column,
                        target: param,
                        limit,
                    })
                }
            };
            let entry = match code {
                SHIFT => Entry::Shift(check(states)?),
                REDUCE => Entry::Reduce(check(productions.len())?),
                ACTION => Entry::Action(
                    SemanticAction::from_id(param)
                        .ok_or(TableError::UnknownAction { state, id: param })?,
                ),
                ACCEPT => Entry::Accept,
                GOTO => Entry::Goto(check(states)?),
                ERROR => Entry::Error,
                other => {
                    return Err(TableError::Malformed(format!(
                        "unknown cell code {} in state {}, column {}",
                        other, state, column
                    )))
                }
            };
            entries.push(entry);
        }

        Ok(ParseTable {
            layout,
            entries,
            productions,
            messages,
        })
    }

    pub fn layout(&self) -> TableLayout {
        self.layout
    }

    pub fn state_count(&self) -> usize {
        self.messages.len()
    }

    /// Cell for `(state, symbol)`; anything outside the table reads as an error
    pub fn entry(&self, state: usize, symbol: usize) -> Entry {
        if symbol >= self.layout.symbol_count {
            return Entry::Error;
        }
        self.entries
            .get(state * self.layout.symbol_count + symbol)
            .copied()
            .unwrap_or(Entry::Error)
    }

    /// `(lhs symbol, rhs length)` of a production
    pub fn production(&self, index: usize) -> Option<(usize, usize)> {
        self.productions.get(index).copied()
    }

    pub fn message(&self, state: usize) -> &str {
        self.messages
            .get(state)
            .map(String::as_str)
            .unwrap_or("unexpected token")
    }

    /// Column of an action symbol
    pub fn action_column(&self, action: SemanticAction) -> usize {
        self.layout.first_semantic_action + action.id()
    }
}
