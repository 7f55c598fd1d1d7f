//! Parser actions and conflict resolution.
//!
//! Every pair of potentially conflicting items of a state is compared by
//! the tokens that may follow them at increasing distances, until their
//! token sets become disjoint. Shift/reduce conflicts are first settled by
//! the declared priorities.

use crate::{
    grammar::{AlternativeID, Grammar, ProductionID, TokenID, TokenSet},
    item::{Ahead, Item, ItemType},
    look::LookTable,
    lr0::{Config, LRAutomaton, LRState, StateID},
    types::{Map, Set},
    util::display_fn,
};
use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum ConflictError {
    #[error("conflict confirmed between items {left} and {right} in state {state:?}")]
    Confirmed {
        state: StateID,
        left: String,
        right: String,
    },

    #[error("conflict between items {left} and {right} in state {state:?} is not resolved within {distance} lookahead tokens")]
    Unresolved {
        state: StateID,
        left: String,
        right: String,
        distance: usize,
    },
}

/// The items that may follow an action, by distance.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookahead {
    distances: Vec<Set<Item>>,
}

impl Lookahead {
    /// The largest distance for which items are known.
    pub fn max_distance(&self) -> usize {
        self.distances.len()
    }

    /// The items sitting before the token seen at `distance` (starting at 1).
    pub fn items(&self, distance: usize) -> Option<&Set<Item>> {
        distance
            .checked_sub(1)
            .and_then(|index| self.distances.get(index))
    }

    pub fn tokens(&self, g: &Grammar, distance: usize) -> TokenSet {
        self.items(distance)
            .map(|items| tokens_of(g, items))
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Shift the next token. A lookahead is attached when the state also
    /// has reduce actions.
    Shift { lookahead: Option<Lookahead> },

    /// Reduce by `alternative`.
    Reduce {
        alternative: AlternativeID,
        lookahead: Option<Lookahead>,
    },
}

impl Action {
    pub fn lookahead(&self) -> Option<&Lookahead> {
        match self {
            Self::Shift { lookahead } | Self::Reduce { lookahead, .. } => lookahead.as_ref(),
        }
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            match self {
                Self::Shift { .. } => f.write_str("shift")?,
                Self::Reduce { alternative, .. } => {
                    write!(f, "reduce({})", g[*alternative].display(g))?
                }
            }
            if let Some(lookahead) = self.lookahead() {
                f.write_str(" [")?;
                for distance in 1..=lookahead.max_distance() {
                    if distance > 1 {
                        f.write_str(" |")?;
                    }
                    write!(f, "{}:", distance)?;
                    for token in lookahead.tokens(g, distance).iter() {
                        write!(f, " {}", g[token])?;
                    }
                }
                f.write_str("]")?;
            }
            Ok(())
        })
    }
}

fn tokens_of(g: &Grammar, items: &Set<Item>) -> TokenSet {
    items.iter().map(|item| item.token(g)).collect()
}

/// Memoized lookahead computations shared by all states of an automaton.
#[derive(Debug, Default)]
pub(crate) struct Looks {
    grammar: LookTable,
    context: ContextLookTable,
}

type ContextKey = (StateID, ProductionID, usize);

/// The items that may follow a production within the context of a state.
///
/// Context lookahead is mutually recursive through the state origins and
/// is solved by chaotic iteration, like the grammar level lookahead.
#[derive(Debug, Default)]
struct ContextLookTable {
    looks: Map<ContextKey, Set<Item>>,
    previous: Map<ContextKey, Set<Item>>,
    current: Map<ContextKey, Set<Item>>,
    changed: bool,
}

impl ContextLookTable {
    fn look(
        &mut self,
        g: &Grammar,
        automaton: &LRAutomaton,
        grammar_looks: &mut LookTable,
        state: StateID,
        production: ProductionID,
        distance: usize,
    ) -> Set<Item> {
        let key = (state, production, distance);
        if let Some(look) = self.looks.get(&key) {
            return look.clone();
        }

        let mut passes = 0;
        loop {
            self.previous = std::mem::take(&mut self.current);
            self.changed = false;
            self.try_look(g, automaton, grammar_looks, state, production, distance);
            passes += 1;
            if !self.changed {
                break;
            }
        }
        tracing::trace!(
            "context look of {} in {:?} at {} converged after {} passes",
            g[production].name(),
            state,
            distance,
            passes
        );

        for (key, look) in self.current.drain(..) {
            let old = self.looks.insert(key, look);
            assert!(old.is_none(), "look data is already set");
        }
        self.previous.clear();

        self.looks[&key].clone()
    }

    fn try_look(
        &mut self,
        g: &Grammar,
        automaton: &LRAutomaton,
        grammar_looks: &mut LookTable,
        state_id: StateID,
        production: ProductionID,
        distance: usize,
    ) -> Set<Item> {
        let key = (state_id, production, distance);
        if let Some(look) = self.looks.get(&key) {
            return look.clone();
        }
        if let Some(look) = self.current.get(&key) {
            return look.clone();
        }

        let seed = self.previous.get(&key).cloned().unwrap_or_default();
        self.set_current(key, seed);

        let state = automaton.state(state_id);
        let mut result = Set::default();
        for &item in state.items() {
            if item.item_type() != ItemType::BeforeProduction || item.production(g) != production {
                continue;
            }

            let mut farther = Set::<usize>::default();
            for ahead in grammar_looks.item_look(g, item.next(g), distance) {
                match ahead {
                    Ahead::Item(ahead) => {
                        result.insert(ahead);
                    }
                    Ahead::Farther(distance) => {
                        farther.insert(distance);
                    }
                }
            }

            let owner = item.owner(g);
            for &distance in &farther {
                for &origin in state.origins(item) {
                    result.extend(self.try_look(g, automaton, grammar_looks, origin, owner, distance));
                }
            }
        }

        self.set_current(key, result.clone());
        result
    }

    fn set_current(&mut self, key: ContextKey, look: Set<Item>) {
        let unchanged = match self.previous.get(&key) {
            Some(previous) => *previous == look,
            None => look.is_empty(),
        };
        if !unchanged {
            self.changed = true;
        }
        self.current.insert(key, look);
    }
}

/// The items that may follow the production of `item` once it is reduced
/// in `state`, `distance` tokens away.
fn look_beyond(
    g: &Grammar,
    automaton: &LRAutomaton,
    looks: &mut Looks,
    state: &LRState,
    item: Item,
    distance: usize,
) -> Set<Item> {
    let origins = state.origins(item);
    if origins.is_empty() {
        assert!(item.owner(g) == ProductionID::START, "invalid item");
        return Some(g.item(item.alternative(), 1)).into_iter().collect();
    }

    let owner = item.owner(g);
    let mut result = Set::default();
    for &origin in origins {
        result.extend(looks.context.look(
            g,
            automaton,
            &mut looks.grammar,
            origin,
            owner,
            distance,
        ));
    }
    result
}

/// The items sitting before the token seen `distance` tokens after `item`.
fn look_items(
    g: &Grammar,
    automaton: &LRAutomaton,
    looks: &mut Looks,
    state: &LRState,
    item: Item,
    distance: usize,
) -> Set<Item> {
    let mut result = Set::default();
    for ahead in looks.grammar.item_look(g, item, distance) {
        match ahead {
            Ahead::Item(ahead) => {
                result.insert(ahead);
            }
            Ahead::Farther(farther) => {
                result.extend(look_beyond(g, automaton, looks, state, item, farther));
            }
        }
    }
    result
}

/// The core items of the origin states whose closure introduced the
/// alternative of `shift_item`.
pub fn generating_core_items(
    g: &Grammar,
    automaton: &LRAutomaton,
    state: &LRState,
    shift_item: Item,
) -> Set<Item> {
    assert!(
        shift_item.item_type() == ItemType::BeforeToken,
        "invalid item"
    );
    let first = g.item(shift_item.alternative(), 0);
    let mut result = Set::default();
    for &origin in state.origins(shift_item) {
        result.extend(automaton.state(origin).originating_core_items(first));
    }
    result
}

/// Remove the lookahead entries overridden by priorities at distance 1,
/// recording each removal in `removals`.
fn apply_priorities(
    g: &Grammar,
    automaton: &LRAutomaton,
    state: &LRState,
    (shift, shift_look): (Item, &mut Set<Item>),
    (reduce, reduce_look): (Item, &mut Set<Item>),
    removals: &mut Map<Item, Set<Item>>,
) {
    if shift.has_priority_over(g, reduce) {
        if reduce_look.shift_remove(&shift) {
            tracing::trace!(
                "{} takes priority over {}",
                shift.display(g),
                reduce.display(g)
            );
            removals.entry(reduce).or_default().insert(shift);
        }
    } else if reduce.has_priority_over(g, shift) {
        let recursion = reduce
            .position()
            .checked_sub(1)
            .map(|position| g.item(reduce.alternative(), position));
        let generating = generating_core_items(g, automaton, state, shift);
        if generating.len() == 1 && recursion.map_or(false, |item| generating.contains(&item)) {
            tracing::trace!(
                "{} takes priority over {}",
                reduce.display(g),
                shift.display(g)
            );
            shift_look.shift_remove(&shift);
            removals.entry(shift).or_default().insert(shift);
        }
    }
}

/// Classify the items of the state `id` into actions, resolving every
/// conflict between them.
pub(crate) fn compute_actions(
    g: &Grammar,
    automaton: &LRAutomaton,
    looks: &mut Looks,
    id: StateID,
    config: &Config,
) -> Result<Vec<Action>, ConflictError> {
    let state = automaton.state(id);

    if state.reduce_items().is_empty() {
        return Ok(vec![Action::Shift { lookahead: None }]);
    }
    if state.shift_items().is_empty() && state.reduce_items().len() == 1 {
        return Ok(vec![Action::Reduce {
            alternative: state.reduce_items()[0].alternative(),
            lookahead: None,
        }]);
    }

    let conflict_items: Vec<Item> = state
        .shift_items()
        .iter()
        .chain(state.reduce_items())
        .copied()
        .collect();
    tracing::trace!(
        "{:?}: analyzing {} potential conflicts",
        id,
        conflict_items.len() * (conflict_items.len() - 1) / 2
    );

    let mut lookaheads: Map<Item, Vec<Set<Item>>> = conflict_items
        .iter()
        .map(|&item| (item, vec![]))
        .collect();
    let mut removals = Map::<Item, Set<Item>>::default();

    let mut lookahead_at = |looks: &mut Looks, item: Item, distance: usize| -> Set<Item> {
        let computed = &mut lookaheads[&item];
        while computed.len() < distance {
            let look = look_items(g, automaton, looks, state, item, computed.len() + 1);
            computed.push(look);
        }
        computed[distance - 1].clone()
    };

    for (i, &left) in conflict_items.iter().enumerate() {
        for &right in &conflict_items[i + 1..] {
            let left_shifts = left.item_type() == ItemType::BeforeToken;
            let right_shifts = right.item_type() == ItemType::BeforeToken;
            if left_shifts && right_shifts {
                lookahead_at(looks, left, 1);
                lookahead_at(looks, right, 1);
                continue;
            }

            tracing::trace!(
                "{} conflict between {} and {}",
                if left_shifts || right_shifts {
                    "shift/reduce"
                } else {
                    "reduce/reduce"
                },
                left.display(g),
                right.display(g)
            );

            let mut distance = 0;
            loop {
                distance += 1;
                if distance > config.lookahead_limit() {
                    return Err(ConflictError::Unresolved {
                        state: id,
                        left: left.display(g).to_string(),
                        right: right.display(g).to_string(),
                        distance: config.lookahead_limit(),
                    });
                }

                let mut left_look = lookahead_at(looks, left, distance);
                let mut right_look = lookahead_at(looks, right, distance);

                if distance == 1 && (left_shifts || right_shifts) && config.uses_priorities() {
                    let (shift, reduce) = if left_shifts {
                        ((left, &mut left_look), (right, &mut right_look))
                    } else {
                        ((right, &mut right_look), (left, &mut left_look))
                    };
                    apply_priorities(g, automaton, state, shift, reduce, &mut removals);
                }

                let mut common = tokens_of(g, &left_look);
                common.intersect_with(&tokens_of(g, &right_look));
                if common.is_empty() {
                    tracing::trace!("resolved at distance {}", distance);
                    break;
                }
                if common.contains(TokenID::END) {
                    return Err(ConflictError::Confirmed {
                        state: id,
                        left: left.display(g).to_string(),
                        right: right.display(g).to_string(),
                    });
                }
            }
        }
    }

    let actions = lookaheads
        .into_iter()
        .map(|(item, mut distances)| {
            if let (Some(first), Some(removed)) = (distances.first_mut(), removals.get(&item)) {
                first.retain(|ahead| !removed.contains(ahead));
            }
            let lookahead = Some(Lookahead { distances });
            match item.item_type() {
                ItemType::End => Action::Reduce {
                    alternative: item.alternative(),
                    lookahead,
                },
                _ => Action::Shift { lookahead },
            }
        })
        .collect();

    Ok(actions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lr0::AutomatonError, priority::PriorityType};

    struct Binary {
        g: Grammar,
        add: AlternativeID,
    }

    // E = E '+' E | 'n' ;
    fn binary(priority: Option<PriorityType>) -> Binary {
        let mut g = Grammar::new("E");
        let e = g.production("E");
        let plus = g.token("+");
        let n = g.token("n");
        let add = g.add_alternative(e, "add");
        g.add_production_element(add, "", e);
        g.add_token_element(add, "", plus);
        g.add_production_element(add, "", e);
        let num = g.add_alternative(e, "num");
        g.add_token_element(num, "", n);
        if let Some(priority) = priority {
            g.declare_priority(e, priority, [add]).unwrap();
        }
        g.stabilize();
        Binary { g, add }
    }

    /// The state reached after `E + E`.
    fn after_sum(g: &Grammar, automaton: &LRAutomaton) -> StateID {
        let e = g.first_production();
        let plus = g.find_token("+").unwrap();
        let start = automaton.state(StateID::START);
        start
            .target_production(e)
            .and_then(|s| automaton.state(s).target_token(plus))
            .and_then(|s| automaton.state(s).target_production(e))
            .unwrap()
    }

    fn shift_and_reduce(actions: &[Action]) -> (&Lookahead, &Lookahead) {
        let mut shift = None;
        let mut reduce = None;
        for action in actions {
            match action {
                Action::Shift { lookahead } => shift = lookahead.as_ref(),
                Action::Reduce { lookahead, .. } => reduce = lookahead.as_ref(),
            }
        }
        (shift.unwrap(), reduce.unwrap())
    }

    fn tokens(g: &Grammar, set: &TokenSet) -> Vec<String> {
        let mut names: Vec<_> = set.iter().map(|t| g[t].name().to_owned()).collect();
        names.sort();
        names
    }

    #[test]
    fn left_associative_reduces() {
        crate::init_tracing();
        let Binary { g, add } = binary(Some(PriorityType::Left));
        let automaton = LRAutomaton::generate(&g).unwrap();
        eprintln!("{}", automaton.display(&g));

        let state = automaton.state(after_sum(&g, &automaton));
        assert_eq!(state.actions().len(), 2);
        let (shift, reduce) = shift_and_reduce(state.actions());
        assert!(shift.tokens(&g, 1).is_empty());
        assert_eq!(tokens(&g, &reduce.tokens(&g, 1)), ["$end", "+"]);
        assert!(state.actions().iter().any(
            |a| matches!(a, Action::Reduce { alternative, .. } if *alternative == add)
        ));
    }

    #[test]
    fn right_associative_shifts() {
        crate::init_tracing();
        let Binary { g, .. } = binary(Some(PriorityType::Right));
        let automaton = LRAutomaton::generate(&g).unwrap();

        let state = automaton.state(after_sum(&g, &automaton));
        let (shift, reduce) = shift_and_reduce(state.actions());
        assert_eq!(tokens(&g, &shift.tokens(&g, 1)), ["+"]);
        assert_eq!(tokens(&g, &reduce.tokens(&g, 1)), ["$end"]);
    }

    #[test]
    fn generating_core_items_of_recursion() {
        let Binary { g, add } = binary(Some(PriorityType::Left));
        let automaton = LRAutomaton::generate(&g).unwrap();
        let state = automaton.state(after_sum(&g, &automaton));

        let generating = generating_core_items(&g, &automaton, state, g.item(add, 1));
        assert_eq!(generating.len(), 1);
        assert!(generating.contains(&g.item(add, 2)));
    }

    #[test]
    fn ambiguity_is_confirmed() {
        crate::init_tracing();
        let Binary { g, .. } = binary(None);
        let err = LRAutomaton::generate(&g).unwrap_err();
        assert!(
            matches!(
                err,
                AutomatonError::ConflictResolution(ConflictError::Confirmed { .. })
            ),
            "unexpected error: {}",
            err
        );

        let Binary { g, .. } = binary(Some(PriorityType::Left));
        let err = LRAutomaton::generate_with_config(&g, Config::new().ignore_priorities())
            .unwrap_err();
        assert!(matches!(
            err,
            AutomatonError::ConflictResolution(ConflictError::Confirmed { .. })
        ));
    }

    // S = A 'x' 'y' | B 'x' 'z' ;  A = 'a' ;  B = 'a' ;
    fn two_tokens_ahead() -> Grammar {
        let mut g = Grammar::new("S");
        let s = g.production("S");
        let a = g.production("A");
        let b = g.production("B");
        let [ta, x, y, z] = ["a", "x", "y", "z"].map(|name| g.token(name));

        let first = g.add_alternative(s, "first");
        g.add_production_element(first, "", a);
        g.add_token_element(first, "", x);
        g.add_token_element(first, "", y);
        let second = g.add_alternative(s, "second");
        g.add_production_element(second, "", b);
        g.add_token_element(second, "", x);
        g.add_token_element(second, "", z);
        let alt = g.add_alternative(a, "");
        g.add_token_element(alt, "", ta);
        let alt = g.add_alternative(b, "");
        g.add_token_element(alt, "", ta);

        g.stabilize();
        g
    }

    #[test]
    fn reduce_reduce_at_distance_two() {
        crate::init_tracing();
        let g = two_tokens_ahead();
        let automaton = LRAutomaton::generate(&g).unwrap();

        let a = g.find_token("a").unwrap();
        let state = automaton.state(automaton.state(StateID::START).target_token(a).unwrap());
        assert_eq!(state.reduce_items().len(), 2);
        assert_eq!(state.actions().len(), 2);

        for action in state.actions() {
            let Action::Reduce {
                alternative,
                lookahead: Some(lookahead),
            } = action
            else {
                panic!("unexpected action: {}", action.display(&g));
            };
            assert_eq!(lookahead.max_distance(), 2);
            assert_eq!(tokens(&g, &lookahead.tokens(&g, 1)), ["x"]);
            let expected = match g[g[*alternative].production()].name() {
                "A" => "y",
                "B" => "z",
                name => panic!("unexpected production {}", name),
            };
            assert_eq!(tokens(&g, &lookahead.tokens(&g, 2)), [expected]);
        }
    }

    #[test]
    fn lookahead_limit() {
        let g = two_tokens_ahead();
        let err = LRAutomaton::generate_with_config(&g, Config::new().max_lookahead(1))
            .unwrap_err();
        assert!(matches!(
            err,
            AutomatonError::ConflictResolution(ConflictError::Unresolved { distance: 1, .. })
        ));
    }

    #[test]
    fn conflict_free_states() {
        let g = two_tokens_ahead();
        let automaton = LRAutomaton::generate(&g).unwrap();
        let start = automaton.state(StateID::START);
        assert_eq!(start.actions(), [Action::Shift { lookahead: None }]);

        let a = g.find_production("A").unwrap();
        let x = g.find_token("x").unwrap();
        let y = g.find_token("y").unwrap();
        let end = start
            .target_production(a)
            .and_then(|s| automaton.state(s).target_token(x))
            .and_then(|s| automaton.state(s).target_token(y))
            .unwrap();
        assert!(matches!(
            automaton.state(end).actions(),
            [Action::Reduce {
                lookahead: None,
                ..
            }]
        ));
    }
}
