//! Priority levels used to settle shift/reduce conflicts.

use crate::{
    grammar::{AlternativeID, ElementKind, Grammar, GrammarError, ProductionID},
    types::Set,
};
use std::{fmt, ops::Index};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PriorityType {
    Left,
    Right,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct PriorityLevelID {
    raw: u16,
}

impl PriorityLevelID {
    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }
}

impl fmt::Debug for PriorityLevelID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L#{:03}", self.raw)
    }
}

/// A set of alternatives sharing one precedence and associativity.
///
/// Levels form a chain from the highest priority down to the lowest.
#[derive(Debug)]
pub struct PriorityLevel {
    id: PriorityLevelID,
    priority_type: PriorityType,
    alternatives: Set<AlternativeID>,
    higher: Option<PriorityLevelID>,
    lower: Option<PriorityLevelID>,
}

impl PriorityLevel {
    pub fn id(&self) -> PriorityLevelID {
        self.id
    }

    pub fn priority_type(&self) -> PriorityType {
        self.priority_type
    }

    pub fn alternatives(&self) -> &Set<AlternativeID> {
        &self.alternatives
    }

    pub fn next_higher(&self) -> Option<PriorityLevelID> {
        self.higher
    }

    pub fn next_lower(&self) -> Option<PriorityLevelID> {
        self.lower
    }
}

impl Index<PriorityLevelID> for Grammar {
    type Output = PriorityLevel;
    fn index(&self, id: PriorityLevelID) -> &Self::Output {
        &self.priority_levels[&id]
    }
}

impl Grammar {
    pub fn priority_levels(&self) -> impl Iterator<Item = &PriorityLevel> + '_ {
        self.priority_levels.values()
    }

    /// Create a priority level right below `higher`.
    pub fn priority_level(
        &mut self,
        priority_type: PriorityType,
        higher: Option<PriorityLevelID>,
    ) -> PriorityLevelID {
        let raw = u16::try_from(self.priority_levels.len()).expect("too many priority levels");
        let id = PriorityLevelID::new(raw);
        if let Some(higher) = higher {
            let higher = &mut self.priority_levels[&higher];
            assert!(
                higher.lower.is_none(),
                "lower priority level is already set"
            );
            higher.lower = Some(id);
        }
        self.priority_levels.insert(
            id,
            PriorityLevel {
                id,
                priority_type,
                alternatives: Set::default(),
                higher,
                lower: None,
            },
        );
        id
    }

    /// Put `alternative` on `level`.
    pub fn set_priority_level(
        &mut self,
        alternative: AlternativeID,
        level: PriorityLevelID,
    ) -> Result<(), GrammarError> {
        if self[alternative].priority_level.is_some() {
            return Err(GrammarError::SpuriousPriority {
                alternative: self[alternative].full_name(self),
            });
        }
        self.alternatives_mut()[&alternative].priority_level = Some(level);
        self.priority_levels[&level].alternatives.insert(alternative);
        Ok(())
    }

    /// Whether `left` sits on a strictly higher level than `right`.
    ///
    /// Returns `false` when either alternative has no priority.
    pub fn has_priority_over(&self, left: AlternativeID, right: AlternativeID) -> bool {
        let (Some(left), Some(right)) = (self[left].priority_level, self[right].priority_level)
        else {
            return false;
        };
        assert!(left != right, "cannot decide within a single priority level");

        let mut current = self.priority_levels[&left].lower;
        while let Some(level) = current {
            if level == right {
                return true;
            }
            current = self.priority_levels[&level].lower;
        }
        false
    }

    pub fn is_left_associative(&self, alternative: AlternativeID) -> bool {
        self.associativity(alternative) == Some(PriorityType::Left)
    }

    pub fn is_right_associative(&self, alternative: AlternativeID) -> bool {
        self.associativity(alternative) == Some(PriorityType::Right)
    }

    fn associativity(&self, alternative: AlternativeID) -> Option<PriorityType> {
        self[alternative]
            .priority_level
            .map(|level| self.priority_levels[&level].priority_type)
    }

    /// Declare a new level, below every level previously declared for
    /// `production`, holding the recursive `alternatives`.
    ///
    /// A left recursive alternative must have a token right after its
    /// recursion. Any other alternative must end with a recursion.
    pub fn declare_priority<I>(
        &mut self,
        production: ProductionID,
        priority_type: PriorityType,
        alternatives: I,
    ) -> Result<PriorityLevelID, GrammarError>
    where
        I: IntoIterator<Item = AlternativeID>,
    {
        let alternatives: Vec<AlternativeID> = alternatives.into_iter().collect();
        for (i, &alternative) in alternatives.iter().enumerate() {
            self.check_recursion(production, alternative)?;
            if self[alternative].priority_level.is_some()
                || alternatives[..i].contains(&alternative)
            {
                return Err(GrammarError::SpuriousPriority {
                    alternative: self[alternative].full_name(self),
                });
            }
        }

        let higher = self[production].last_priority_level;
        let level = self.priority_level(priority_type, higher);
        self.productions_mut()[&production].last_priority_level = Some(level);
        for alternative in alternatives {
            self.set_priority_level(alternative, level)?;
        }

        tracing::trace!(
            "declared {:?} {:?} for {}",
            level,
            priority_type,
            self[production].name()
        );

        Ok(level)
    }

    fn check_recursion(
        &self,
        production: ProductionID,
        alternative: AlternativeID,
    ) -> Result<(), GrammarError> {
        let alt = &self[alternative];
        if alt.production() != production {
            return Err(GrammarError::ForeignAlternative {
                production: self[production].name().to_owned(),
                alternative: alt.full_name(self),
            });
        }

        let is_recursion = |kind: ElementKind| kind == ElementKind::Production(production);
        let elements = alt.elements();
        match elements.first() {
            None => Err(GrammarError::AlternativeNotRecursive {
                alternative: alt.full_name(self),
            }),
            Some(first) if is_recursion(first.kind()) => {
                match elements.get(1).map(|e| e.kind()) {
                    Some(ElementKind::Token(_)) => Ok(()),
                    _ => Err(GrammarError::RecursionNotFollowedByToken {
                        alternative: alt.full_name(self),
                    }),
                }
            }
            Some(_) => match elements.last() {
                Some(last) if is_recursion(last.kind()) => Ok(()),
                _ => Err(GrammarError::AlternativeNotRecursive {
                    alternative: alt.full_name(self),
                }),
            },
        }
    }
}
