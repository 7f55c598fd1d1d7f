//! Utility types.

use std::{collections::VecDeque, hash::Hash};

type BuildHasher = std::hash::BuildHasherDefault<rustc_hash::FxHasher>;

pub type Map<K, V> = indexmap::IndexMap<K, V, BuildHasher>;
pub type Set<T> = indexmap::IndexSet<T, BuildHasher>;

/// A FIFO work list that hands out each element at most once.
///
/// Elements pushed after they have been popped are silently dropped, so
/// traversals over cyclic relations terminate.
#[derive(Debug)]
pub struct WorkSet<T> {
    todo: VecDeque<T>,
    seen: Set<T>,
}

impl<T> Default for WorkSet<T> {
    fn default() -> Self {
        Self {
            todo: VecDeque::new(),
            seen: Set::default(),
        }
    }
}

impl<T> WorkSet<T>
where
    T: Clone + Eq + Hash,
{
    pub fn push(&mut self, value: T) {
        if self.seen.insert(value.clone()) {
            self.todo.push_back(value);
        }
    }

    pub fn pop(&mut self) -> Option<T> {
        self.todo.pop_front()
    }
}

impl<T> FromIterator<T> for WorkSet<T>
where
    T: Clone + Eq + Hash,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut work_set = Self::default();
        for value in iter {
            work_set.push(value);
        }
        work_set
    }
}
