//! Bounded lookahead of productions and items.
//!
//! The lookahead of a production at distance `d` is the set of items that
//! can sit right before the `d`-th token derived from it, plus `Farther(e)`
//! markers when fewer than `d` tokens are derivable and `e` more tokens
//! must come from the context. Recursive productions are solved by chaotic
//! iteration: every pass starts from the previous pass results, and passes
//! are repeated until nothing changes.

use crate::{
    grammar::{Grammar, ProductionID},
    item::{Ahead, Item, ItemType},
    types::{Map, Set},
};

type LookKey = (ProductionID, usize);

#[derive(Debug, Default)]
pub struct LookTable {
    looks: Map<LookKey, Set<Ahead>>,
    previous: Map<LookKey, Set<Ahead>>,
    current: Map<LookKey, Set<Ahead>>,
    changed: bool,
}

impl LookTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the memoized lookahead of `production`, if already computed.
    pub fn cached(&self, production: ProductionID, distance: usize) -> Option<&Set<Ahead>> {
        self.looks.get(&(production, distance))
    }

    /// The lookahead of `production` at `distance`.
    pub fn look(&mut self, g: &Grammar, production: ProductionID, distance: usize) -> Set<Ahead> {
        assert!(distance > 0, "invalid distance");
        if let Some(look) = self.cached(production, distance) {
            return look.clone();
        }
        self.compute_look(g, production, distance);
        self.looks[&(production, distance)].clone()
    }

    /// The lookahead of `item` at `distance`.
    pub fn item_look(&mut self, g: &Grammar, item: Item, distance: usize) -> Set<Ahead> {
        self.item_look_with(g, item, distance, false)
    }

    fn item_look_with(
        &mut self,
        g: &Grammar,
        item: Item,
        distance: usize,
        tentative: bool,
    ) -> Set<Ahead> {
        assert!(distance > 0, "invalid distance");

        let mut result = Set::default();
        match item.item_type() {
            ItemType::BeforeToken => {
                if distance == 1 {
                    result.insert(Ahead::Item(item));
                } else {
                    result = self.item_look_with(g, item.next(g), distance - 1, tentative);
                }
            }

            ItemType::BeforeProduction => {
                let production = item.production(g);
                let look = if tentative {
                    self.try_look(g, production, distance)
                } else {
                    self.look(g, production, distance)
                };
                for ahead in look {
                    match ahead {
                        Ahead::Item(_) => {
                            result.insert(ahead);
                        }
                        Ahead::Farther(farther) => {
                            result.extend(self.item_look_with(g, item.next(g), farther, tentative));
                        }
                    }
                }
            }

            ItemType::End => {
                result.insert(Ahead::Farther(distance));
            }
        }
        result
    }

    #[tracing::instrument(level = "trace", skip(self, g))]
    fn compute_look(&mut self, g: &Grammar, production: ProductionID, distance: usize) {
        let mut passes = 0;
        loop {
            self.reset_look_computation_data();
            self.try_look(g, production, distance);
            passes += 1;
            if !self.changed {
                break;
            }
        }
        tracing::trace!("converged after {} passes", passes);
        self.store_look_computation_results();
    }

    fn try_look(&mut self, g: &Grammar, production: ProductionID, distance: usize) -> Set<Ahead> {
        let key = (production, distance);
        if let Some(look) = self.looks.get(&key) {
            return look.clone();
        }
        if let Some(look) = self.current.get(&key) {
            return look.clone();
        }

        let seed = self.previous.get(&key).cloned().unwrap_or_default();
        self.set_current(key, seed);

        let mut result = Set::default();
        for &alternative in g[production].alternatives() {
            result.extend(self.item_look_with(g, g.item(alternative, 0), distance, true));
        }

        self.set_current(key, result.clone());
        result
    }

    fn set_current(&mut self, key: LookKey, look: Set<Ahead>) {
        let unchanged = match self.previous.get(&key) {
            Some(previous) => *previous == look,
            None => look.is_empty(),
        };
        if !unchanged {
            self.changed = true;
        }
        self.current.insert(key, look);
    }

    fn reset_look_computation_data(&mut self) {
        self.previous = std::mem::take(&mut self.current);
        self.changed = false;
    }

    fn store_look_computation_results(&mut self) {
        for (key, look) in self.current.drain(..) {
            let old = self.looks.insert(key, look);
            assert!(old.is_none(), "look data is already set");
        }
        self.previous.clear();
    }
}
