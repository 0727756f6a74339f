//! LALR(1) table construction
//!
//! LR(1) item sets are built with lookaheads merged into states with an
//! identical core as soon as they are discovered. A state whose lookaheads
//! grow is re-queued so the growth propagates. Lookahead sets are bitmasks
//! over terminal ids, which all fit in a `u64`.
//!
//! Action markers are epsilon non-terminals. Reducing one becomes an ACTION
//! cell, and its GOTO column holds the state reached after the hook runs.

use super::grammar::{Grammar, GrammarSymbol};
use super::tables::{Entry, ParseTable, TableLayout};
use crate::errors::TableError;
use crate::lexer::token::{TokenKind, TERMINAL_COUNT};
use crate::semantic::action::SemanticAction;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

type Item = (usize, usize);
type Lookahead = u64;
type ItemSet = BTreeMap<Item, Lookahead>;

const _: () = assert!(TERMINAL_COUNT <= 64);

struct Numbered {
    /// `(lhs, rhs)`; production 0 is the augmented start
    productions: Vec<(usize, Vec<usize>)>,
    by_lhs: Vec<Vec<usize>>,
    nullable: Vec<bool>,
    first: Vec<Lookahead>,
    layout: TableLayout,
}

impl Numbered {
    fn new(grammar: &Grammar) -> Self {
        let layout = TableLayout {
            symbol_count: grammar.symbol_count(),
            first_non_terminal: grammar.first_non_terminal(),
            first_semantic_action: grammar.first_semantic_action(),
        };
        let augmented = layout.symbol_count;

        let mut productions = vec![(augmented, vec![grammar.first_non_terminal()])];
        for production in &grammar.productions {
            let lhs = grammar.number(GrammarSymbol::NonTerminal(production.lhs));
            let rhs = production.rhs.iter().map(|s| grammar.number(*s)).collect();
            productions.push((lhs, rhs));
        }
        for action in SemanticAction::ALL {
            productions.push((grammar.number(GrammarSymbol::Action(*action)), Vec::new()));
        }

        let mut by_lhs = vec![Vec::new(); augmented + 1];
        for (index, (lhs, _)) in productions.iter().enumerate() {
            by_lhs[*lhs].push(index);
        }

        let mut numbered = Numbered {
            productions,
            by_lhs,
            nullable: vec![false; augmented + 1],
            first: vec![0; augmented + 1],
            layout,
        };
        numbered.compute_first();
        numbered
    }

    fn is_terminal(&self, symbol: usize) -> bool {
        symbol > 0 && symbol < self.layout.first_non_terminal
    }

    fn compute_first(&mut self) {
        let mut changed = true;
        while changed {
            changed = false;
            for (lhs, rhs) in &self.productions {
                if !self.nullable[*lhs] && rhs.iter().all(|s| self.nullable[*s]) {
                    self.nullable[*lhs] = true;
                    changed = true;
                }
                let mut first = 0;
                for &symbol in rhs {
                    if self.is_terminal(symbol) {
                        first |= 1 << symbol;
                        break;
                    }
                    first |= self.first[symbol];
                    if !self.nullable[symbol] {
                        break;
                    }
                }
                if self.first[*lhs] | first != self.first[*lhs] {
                    self.first[*lhs] |= first;
                    changed = true;
                }
            }
        }
    }

    /// FIRST of `symbols` followed by `lookahead`
    fn first_of(&self, symbols: &[usize], lookahead: Lookahead) -> Lookahead {
        let mut first = 0;
        for &symbol in symbols {
            if self.is_terminal(symbol) {
                return first | 1 << symbol;
            }
            first |= self.first[symbol];
            if !self.nullable[symbol] {
                return first;
            }
        }
        first | lookahead
    }

    fn closure(&self, kernel: &ItemSet) -> ItemSet {
        let mut items = kernel.clone();
        let mut work: Vec<Item> = items.keys().copied().collect();
        while let Some(item @ (production, dot)) = work.pop() {
            let lookahead = items[&item];
            let rhs = &self.productions[production].1;
            let Some(&next) = rhs.get(dot) else {
                continue;
            };
            if self.is_terminal(next) {
                continue;
            }
            let follow = self.first_of(&rhs[dot + 1..], lookahead);
            for &candidate in &self.by_lhs[next] {
                let slot = items.entry((candidate, 0)).or_insert(0);
                if *slot | follow != *slot {
                    *slot |= follow;
                    work.push((candidate, 0));
                }
            }
        }
        items
    }

    /// Kernels reached from `closure`, keyed by the symbol crossed
    fn transitions(&self, closure: &ItemSet) -> BTreeMap<usize, ItemSet> {
        let mut gotos: BTreeMap<usize, ItemSet> = BTreeMap::new();
        for (&(production, dot), &lookahead) in closure {
            if let Some(&symbol) = self.productions[production].1.get(dot) {
                *gotos
                    .entry(symbol)
                    .or_default()
                    .entry((production, dot + 1))
                    .or_insert(0) |= lookahead;
            }
        }
        gotos
    }
}

fn core(kernel: &ItemSet) -> Vec<Item> {
    kernel.keys().copied().collect()
}

/// Build and validate the LALR(1) table for `grammar`
pub fn build(grammar: &Grammar) -> Result<ParseTable, TableError> {
    let numbered = Numbered::new(grammar);

    let mut start = ItemSet::new();
    start.insert((0, 0), 1 << TokenKind::Dollar.id());
    let mut states = vec![start];
    let mut index: FxHashMap<Vec<Item>, usize> = FxHashMap::default();
    index.insert(core(&states[0]), 0);
    let mut dirty = vec![0];
    let mut queued = vec![true];

    while let Some(state) = dirty.pop() {
        queued[state] = false;
        let closure = numbered.closure(&states[state]);
        for (_, kernel) in numbered.transitions(&closure) {
            let key = core(&kernel);
            match index.get(&key) {
                Some(&target) => {
                    let mut grew = false;
                    for (item, lookahead) in kernel {
                        let slot = states[target].entry(item).or_insert(0);
                        if *slot | lookahead != *slot {
                            *slot |= lookahead;
                            grew = true;
                        }
                    }
                    if grew && !queued[target] {
                        queued[target] = true;
                        dirty.push(target);
                    }
                }
                None => {
                    index.insert(key, states.len());
                    states.push(kernel);
                    queued.push(true);
                    dirty.push(states.len() - 1);
                }
            }
        }
    }

    let layout = numbered.layout;
    let width = layout.symbol_count;
    let mut entries = vec![Entry::Error; states.len() * width];

    for (state, kernel) in states.iter().enumerate() {
        let closure = numbered.closure(kernel);

        for (symbol, target_kernel) in numbered.transitions(&closure) {
            let target = *index.get(&core(&target_kernel)).ok_or_else(|| {
                TableError::Malformed(format!("state {} lost its transition target", state))
            })?;
            let entry = if numbered.is_terminal(symbol) {
                Entry::Shift(target)
            } else {
                Entry::Goto(target)
            };
            place(&mut entries, grammar, width, state, symbol, entry)?;
        }

        for (&(production, dot), &lookahead) in &closure {
            let (lhs, rhs) = &numbered.productions[production];
            if dot < rhs.len() {
                continue;
            }
            let entry = if production == 0 {
                Entry::Accept
            } else if *lhs >= layout.first_semantic_action {
                let id = (*lhs - layout.first_semantic_action) as i32;
                Entry::Action(
                    SemanticAction::from_id(id).ok_or(TableError::UnknownAction { state, id })?,
                )
            } else {
                Entry::Reduce(production - 1)
            };
            for terminal in 1..layout.first_non_terminal {
                if lookahead >> terminal & 1 == 1 {
                    place(&mut entries, grammar, width, state, terminal, entry)?;
                }
            }
        }
    }

    let messages = (0..states.len())
        .map(|state| expected_message(&entries[state * width..(state + 1) * width], layout))
        .collect();
    let cells: Vec<[i32; 2]> = entries.iter().map(|e| e.encode()).collect();
    let productions: Vec<[i32; 2]> = numbered.productions[1..=grammar.productions.len()]
        .iter()
        .map(|(lhs, rhs)| [*lhs as i32, rhs.len() as i32])
        .collect();

    ParseTable::new(layout, &cells, &productions, messages)
}

fn place(
    entries: &mut [Entry],
    grammar: &Grammar,
    width: usize,
    state: usize,
    symbol: usize,
    entry: Entry,
) -> Result<(), TableError> {
    let slot = &mut entries[state * width + symbol];
    match *slot {
        Entry::Error => {
            *slot = entry;
            Ok(())
        }
        existing if existing == entry => Ok(()),
        existing => Err(TableError::Conflict {
            state,
            symbol: grammar.symbol_name(symbol),
            existing: existing.to_string(),
            incoming: entry.to_string(),
        }),
    }
}

fn expected_message(row: &[Entry], layout: TableLayout) -> String {
    let expected: Vec<String> = (1..layout.first_non_terminal)
        .filter(|&terminal| row[terminal] != Entry::Error)
        .filter_map(|terminal| TokenKind::from_id(terminal as i32))
        .map(|kind| kind.to_string())
        .collect();
    match expected.as_slice() {
        [] => "no token can follow here".to_string(),
        [single] => format!("expected {}", single),
        many => format!("expected one of {}", many.join(", ")),
    }
}
