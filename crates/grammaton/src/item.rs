//! LR(0) items.

use crate::{
    grammar::{AlternativeID, ElementKind, Grammar, ProductionID, TokenID},
    util::display_fn,
};
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemType {
    BeforeToken,
    BeforeProduction,
    End,
}

/// A position within an alternative.
///
/// Items are created once per alternative when the grammar is stabilized,
/// so two items are equal iff they denote the same position.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Item {
    alternative: AlternativeID,
    position: usize,
    kind: ItemType,
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:?}, {})", self.alternative, self.position)
    }
}

impl Item {
    pub(crate) const fn new(alternative: AlternativeID, position: usize, kind: ItemType) -> Self {
        Self {
            alternative,
            position,
            kind,
        }
    }

    pub fn alternative(self) -> AlternativeID {
        self.alternative
    }

    pub fn position(self) -> usize {
        self.position
    }

    pub fn item_type(self) -> ItemType {
        self.kind
    }

    /// The production that owns this item.
    pub fn owner(self, g: &Grammar) -> ProductionID {
        g[self.alternative].production()
    }

    /// The token right after the marker.
    pub fn token(self, g: &Grammar) -> TokenID {
        match (self.kind, g[self.alternative].element(self.position).kind()) {
            (ItemType::BeforeToken, ElementKind::Token(t)) => t,
            _ => panic!("invalid call"),
        }
    }

    /// The production right after the marker.
    pub fn production(self, g: &Grammar) -> ProductionID {
        match (self.kind, g[self.alternative].element(self.position).kind()) {
            (ItemType::BeforeProduction, ElementKind::Production(p)) => p,
            _ => panic!("invalid call"),
        }
    }

    /// The item with the marker moved past the next element.
    pub fn next(self, g: &Grammar) -> Item {
        assert!(self.kind != ItemType::End, "invalid call");
        g[self.alternative].item(self.position + 1)
    }

    /// Whether this item wins a shift/reduce conflict against `other`.
    ///
    /// Items whose alternatives are on distinct levels are ordered by the
    /// priority chain. On the same level, an end item wins when the level is
    /// left associative and any other item wins when it is right associative.
    pub fn has_priority_over(self, g: &Grammar, other: Item) -> bool {
        let level = g[self.alternative].priority_level();
        let other_level = g[other.alternative].priority_level();
        if level != other_level {
            return g.has_priority_over(self.alternative, other.alternative);
        }

        match self.kind {
            ItemType::End => g.is_left_associative(self.alternative),
            _ => g.is_right_associative(self.alternative),
        }
    }

    // `"E.add = E . '+' E"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            let alternative = &g[self.alternative];
            write!(f, "{} =", alternative.full_name(g))?;
            for element in &alternative.elements()[..self.position] {
                write!(f, " {}", element.display(g))?;
            }
            f.write_str(" .")?;
            for element in &alternative.elements()[self.position..] {
                write!(f, " {}", element.display(g))?;
            }
            Ok(())
        })
    }
}

/// An element of a lookahead set.
///
/// `Item` is a concrete item sitting right before the token seen at the
/// requested distance. `Farther(d)` means the lookahead leaves the
/// production and `d` more tokens must be taken from its context.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Ahead {
    Item(Item),
    Farther(usize),
}
