//! The LR(0) automaton.

use crate::{
    conflict::{self, Action, ConflictError, Looks},
    grammar::{ElementKind, Grammar, ProductionID, TokenID},
    item::{Item, ItemType},
    types::{Map, Set, WorkSet},
    util::display_fn,
};
use std::{collections::VecDeque, fmt};

#[derive(Debug, thiserror::Error)]
pub enum AutomatonError {
    #[error("error during resolving conflicts")]
    ConflictResolution(
        #[from]
        #[source]
        ConflictError,
    ),
}

#[derive(Debug)]
pub struct Config {
    max_lookahead: usize,
    use_priorities: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub const fn new() -> Self {
        Self {
            max_lookahead: 16,
            use_priorities: true,
        }
    }

    /// Set the largest lookahead distance tried before a conflict is
    /// reported as unresolved.
    pub fn max_lookahead(&mut self, distance: usize) -> &mut Self {
        assert!(distance > 0, "invalid distance");
        self.max_lookahead = distance;
        self
    }

    /// Resolve conflicts by lookahead only, ignoring the declared priorities.
    pub fn ignore_priorities(&mut self) -> &mut Self {
        self.use_priorities = false;
        self
    }

    pub(crate) fn lookahead_limit(&self) -> usize {
        self.max_lookahead
    }

    pub(crate) fn uses_priorities(&self) -> bool {
        self.use_priorities
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateID(u16);

impl fmt::Debug for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S#{:03}", self.0)
    }
}

impl StateID {
    /// The state containing the first item of `$Start`.
    pub const START: Self = Self(0);

    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn into_raw(self) -> u16 {
        self.0
    }
}

#[derive(Debug)]
pub struct LRState {
    id: StateID,
    core: Vec<Item>,
    items: Set<Item>,
    originating_core_items: Map<Item, Set<Item>>,
    token_transitions: Map<TokenID, StateID>,
    production_transitions: Map<ProductionID, StateID>,
    shift_items: Set<Item>,
    reduce_items: Set<Item>,
    origins: Map<Item, Set<StateID>>,
    actions: Vec<Action>,
}

impl LRState {
    /// Build the closure of `core`, remembering which core items led to each
    /// closure item.
    fn new(g: &Grammar, id: StateID, core: Vec<Item>) -> Self {
        let mut items = Set::default();
        let mut originating_core_items = Map::<Item, Set<Item>>::default();
        for &core_item in &core {
            items.insert(core_item);
            let mut work_set = WorkSet::default();
            work_set.push(core_item);
            while let Some(item) = work_set.pop() {
                if item.item_type() != ItemType::BeforeProduction {
                    continue;
                }
                for &alternative in g[item.production(g)].alternatives() {
                    let new_item = g.item(alternative, 0);
                    items.insert(new_item);
                    work_set.push(new_item);
                    originating_core_items
                        .entry(new_item)
                        .or_default()
                        .insert(core_item);
                }
            }
        }

        let mut shift_items = Set::default();
        let mut reduce_items = Set::default();
        for &item in &items {
            match item.item_type() {
                ItemType::BeforeToken => {
                    shift_items.insert(item);
                }
                ItemType::End => {
                    reduce_items.insert(item);
                }
                ItemType::BeforeProduction => (),
            }
        }

        let origins = items.iter().map(|&item| (item, Set::default())).collect();

        Self {
            id,
            core,
            items,
            originating_core_items,
            token_transitions: Map::default(),
            production_transitions: Map::default(),
            shift_items,
            reduce_items,
            origins,
            actions: vec![],
        }
    }

    pub fn id(&self) -> StateID {
        self.id
    }

    /// The sorted, duplicate free core items of this state.
    pub fn core(&self) -> &[Item] {
        &self.core[..]
    }

    pub fn items(&self) -> &Set<Item> {
        &self.items
    }

    pub fn shift_items(&self) -> &Set<Item> {
        &self.shift_items
    }

    pub fn reduce_items(&self) -> &Set<Item> {
        &self.reduce_items
    }

    pub fn token_transitions(&self) -> &Map<TokenID, StateID> {
        &self.token_transitions
    }

    pub fn production_transitions(&self) -> &Map<ProductionID, StateID> {
        &self.production_transitions
    }

    /// The state reached by shifting `token`, if any.
    pub fn target_token(&self, token: TokenID) -> Option<StateID> {
        self.token_transitions.get(&token).copied()
    }

    /// The state reached after reducing to `production`, if any.
    pub fn target_production(&self, production: ProductionID) -> Option<StateID> {
        self.production_transitions.get(&production).copied()
    }

    /// The states in which the alternative of `item` started its walk to
    /// this state.
    pub fn origins(&self, item: Item) -> &Set<StateID> {
        self.origins.get(&item).expect("invalid item")
    }

    /// The core items whose closure introduced `item` into this state.
    pub fn originating_core_items(&self, item: Item) -> &Set<Item> {
        self.originating_core_items
            .get(&item)
            .expect("invalid item")
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions[..]
    }

    /// Group the items by the symbol after their marker, each group moved
    /// past that symbol.
    fn next_cores(&self, g: &Grammar) -> (Map<TokenID, Vec<Item>>, Map<ProductionID, Vec<Item>>) {
        let mut tokens = Map::<TokenID, Vec<Item>>::default();
        let mut productions = Map::<ProductionID, Vec<Item>>::default();
        for &item in &self.items {
            match item.item_type() {
                ItemType::BeforeToken => {
                    tokens.entry(item.token(g)).or_default().push(item.next(g));
                }
                ItemType::BeforeProduction => {
                    productions
                        .entry(item.production(g))
                        .or_default()
                        .push(item.next(g));
                }
                ItemType::End => (),
            }
        }
        (tokens, productions)
    }

    fn add_origin(&mut self, item: Item, origin: StateID) {
        self.origins
            .get_mut(&item)
            .expect("invalid item")
            .insert(origin);
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            writeln!(f, "## core:")?;
            for item in &self.core {
                writeln!(f, "- {}", item.display(g))?;
            }
            writeln!(f, "## items:")?;
            for item in &self.items {
                if !self.core.contains(item) {
                    writeln!(f, "- {}", item.display(g))?;
                }
            }
            if !self.token_transitions.is_empty() {
                writeln!(f, "## shifts:")?;
                for (t, to) in &self.token_transitions {
                    writeln!(f, "- {} => {:?}", g[*t], to)?;
                }
            }
            if !self.production_transitions.is_empty() {
                writeln!(f, "## gotos:")?;
                for (p, to) in &self.production_transitions {
                    writeln!(f, "- {} => {:?}", g[*p].name(), to)?;
                }
            }
            if !self.actions.is_empty() {
                writeln!(f, "## actions:")?;
                for action in &self.actions {
                    writeln!(f, "- {}", action.display(g))?;
                }
            }
            Ok(())
        })
    }
}

/// The LR(0) automaton of a stable grammar, with the actions of every state.
#[derive(Debug, Default)]
pub struct LRAutomaton {
    states: Map<StateID, LRState>,
    isocores: Map<Vec<Item>, StateID>,
    pending: VecDeque<StateID>,
}

impl LRAutomaton {
    pub fn generate(g: &Grammar) -> Result<Self, AutomatonError> {
        Self::generate_with_config(g, &Config::new())
    }

    #[tracing::instrument(skip_all)]
    pub fn generate_with_config(g: &Grammar, config: &Config) -> Result<Self, AutomatonError> {
        assert!(g.is_stable(), "grammar is not stable");

        let mut automaton = Self::default();

        let start = automaton.get_state(g, Some(g.item(g.start_alternative(), 0)));
        debug_assert_eq!(start, StateID::START);
        while let Some(id) = automaton.pending.pop_front() {
            automaton.compute_transitions(g, id);
        }
        tracing::debug!("built {} states", automaton.states.len());

        automaton.compute_origins(g);

        let mut looks = Looks::default();
        let ids: Vec<StateID> = automaton.states.keys().copied().collect();
        for id in ids {
            let actions = conflict::compute_actions(g, &automaton, &mut looks, id, config)?;
            automaton.states[&id].actions = actions;
        }

        Ok(automaton)
    }

    /// Return the state whose core is `core`, creating it if needed.
    ///
    /// The core is canonicalized (sorted, without duplicates) so that any
    /// ordering of the same items yields the same state.
    pub fn get_state<I>(&mut self, g: &Grammar, core: I) -> StateID
    where
        I: IntoIterator<Item = Item>,
    {
        let mut core: Vec<Item> = core.into_iter().collect();
        core.sort_unstable();
        core.dedup();

        if let Some(&id) = self.isocores.get(&core) {
            return id;
        }

        let raw = u16::try_from(self.states.len()).expect("too many states");
        let id = StateID(raw);
        let state = LRState::new(g, id, core.clone());
        self.states.insert(id, state);
        self.isocores.insert(core, id);
        self.pending.push_back(id);
        id
    }

    fn compute_transitions(&mut self, g: &Grammar, id: StateID) {
        let (tokens, productions) = self.states[&id].next_cores(g);
        for (token, core) in tokens {
            let target = self.get_state(g, core);
            self.states[&id].token_transitions.insert(token, target);
        }
        for (production, core) in productions {
            let target = self.get_state(g, core);
            self.states[&id].production_transitions.insert(production, target);
        }
    }

    /// Walk every alternative from each state where it starts, and record
    /// that state as an origin of the item reached at each step.
    #[tracing::instrument(skip_all)]
    fn compute_origins(&mut self, g: &Grammar) {
        let mut marks = vec![];
        for (&id, state) in &self.states {
            for &item in &state.items {
                if item.position() != 0 {
                    continue;
                }
                let mut current = id;
                let mut current_item = item;
                marks.push((current, current_item, id));
                for element in g[item.alternative()].elements() {
                    let current_state = &self.states[&current];
                    current = match element.kind() {
                        ElementKind::Token(t) => current_state.token_transitions[&t],
                        ElementKind::Production(p) => current_state.production_transitions[&p],
                    };
                    current_item = current_item.next(g);
                    marks.push((current, current_item, id));
                }
            }
        }

        tracing::trace!("recording {} origins", marks.len());
        for (state, item, origin) in marks {
            self.states[&state].add_origin(item, origin);
        }
    }

    pub fn states(&self) -> impl Iterator<Item = (StateID, &LRState)> + '_ {
        self.states.iter().map(|(id, state)| (*id, state))
    }

    pub fn state(&self, id: StateID) -> &LRState {
        &self.states[&id]
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for (i, (id, state)) in self.states().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }
                writeln!(f, "#### State {:?}", id)?;
                write!(f, "{}", state.display(g))?;
            }
            Ok(())
        })
    }
}
