//! Grammar types.

use crate::{
    item::{Item, ItemType},
    priority::{PriorityLevel, PriorityLevelID},
    types::Map,
    util::{display_fn, resolve_names},
};
use std::{fmt, ops::Index};

pub(crate) const START_PRODUCTION_NAME: &str = "$Start";
pub(crate) const END_TOKEN_NAME: &str = "$end";

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TokenID {
    raw: u16,
}

impl TokenID {
    /// Reserved token that means the end of input.
    pub const END: Self = Self::new(0);

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.raw
    }
}

impl fmt::Debug for TokenID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::END => write!(f, "T#End"),
            _ => write!(f, "T#{:03}", self.raw),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct TokenSet {
    inner: bit_set::BitSet,
}

impl TokenSet {
    pub fn contains(&self, id: TokenID) -> bool {
        self.inner.contains(id.into_raw().into())
    }
    pub fn intersect_with(&mut self, other: &Self) {
        self.inner.intersect_with(&other.inner)
    }
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = TokenID> + '_ {
        self.inner
            .iter()
            .map(|raw| TokenID::new(raw.try_into().expect("invalid token id")))
    }
}

impl FromIterator<TokenID> for TokenSet {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = TokenID>,
    {
        Self {
            inner: iter.into_iter().map(|t| t.into_raw().into()).collect(),
        }
    }
}

#[derive(Debug)]
pub struct Token {
    id: TokenID,
    name: String,
}

impl Token {
    pub fn id(&self) -> TokenID {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ProductionID {
    raw: u16,
}

impl ProductionID {
    /// The implicit `$Start` production.
    pub const START: Self = Self::new(0);

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.raw
    }
}

impl fmt::Debug for ProductionID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::START => write!(f, "P#Start"),
            _ => write!(f, "P#{:03}", self.raw),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct AlternativeID {
    raw: u16,
}

impl AlternativeID {
    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.raw
    }
}

impl fmt::Debug for AlternativeID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "A#{:03}", self.raw)
    }
}

/// What an element of an alternative refers to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Token(TokenID),
    Production(ProductionID),
}

/// One position in the right-hand side of an alternative.
#[derive(Debug)]
pub struct Element {
    alternative: AlternativeID,
    position: usize,
    short_name: String,
    name: Option<String>,
    kind: ElementKind,
    is_stable: bool,
}

impl Element {
    pub fn alternative(&self) -> AlternativeID {
        self.alternative
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    /// The unique name of this element within its alternative.
    pub fn name(&self) -> &str {
        self.name.as_deref().expect("element is not stable")
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn token(&self) -> Option<TokenID> {
        match self.kind {
            ElementKind::Token(t) => Some(t),
            ElementKind::Production(_) => None,
        }
    }

    pub fn production(&self) -> Option<ProductionID> {
        match self.kind {
            ElementKind::Production(p) => Some(p),
            ElementKind::Token(_) => None,
        }
    }

    pub fn full_name(&self, g: &Grammar) -> String {
        format!("{}.{}", g[self.alternative].full_name(g), self.name())
    }

    fn set_name(&mut self, name: String) {
        assert!(!self.is_stable, "element is stable");
        self.name = Some(name);
    }

    pub(crate) fn stabilize(&mut self) {
        assert!(!self.is_stable, "element is already stable");
        self.is_stable = true;
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| match self.kind {
            ElementKind::Token(t) => write!(f, "{}", g[t]),
            ElementKind::Production(p) => f.write_str(g[p].name()),
        })
    }
}

/// One right-hand side of a production.
#[derive(Debug)]
pub struct Alternative {
    id: AlternativeID,
    production: ProductionID,
    short_name: String,
    name: Option<String>,
    elements: Vec<Element>,
    items: Vec<Item>,
    is_stable: bool,
    shortest_length: Option<usize>,
    pub(crate) priority_level: Option<PriorityLevelID>,
}

impl Alternative {
    pub fn id(&self) -> AlternativeID {
        self.id
    }

    pub fn production(&self) -> ProductionID {
        self.production
    }

    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    /// The unique name of this alternative within its production.
    pub fn name(&self) -> &str {
        self.name.as_deref().expect("alternative is not stable")
    }

    pub fn full_name(&self, g: &Grammar) -> String {
        let production = g[self.production].name();
        match self.name.as_deref().unwrap_or(self.short_name.as_str()) {
            "" => production.to_owned(),
            name => format!("{}.{}", production, name),
        }
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements[..]
    }

    pub fn element(&self, position: usize) -> &Element {
        &self.elements[position]
    }

    /// The items of this alternative, one per position including the end.
    pub fn items(&self) -> &[Item] {
        assert!(self.is_stable, "alternative is not stable");
        &self.items[..]
    }

    pub fn item(&self, position: usize) -> Item {
        self.items()[position]
    }

    pub fn is_stable(&self) -> bool {
        self.is_stable
    }

    /// The minimum number of tokens derivable from this alternative, if known.
    pub fn shortest_length(&self) -> Option<usize> {
        self.shortest_length
    }

    pub fn priority_level(&self) -> Option<PriorityLevelID> {
        self.priority_level
    }

    fn push_element(&mut self, short_name: &str, kind: ElementKind) -> usize {
        assert!(!self.is_stable, "alternative is stable");
        let position = self.elements.len();
        self.elements.push(Element {
            alternative: self.id,
            position,
            short_name: short_name.to_owned(),
            name: None,
            kind,
            is_stable: false,
        });
        position
    }

    fn set_name(&mut self, name: String) {
        assert!(!self.is_stable, "alternative is stable");
        self.name = Some(name);
    }

    pub(crate) fn stabilize(&mut self) {
        assert!(!self.is_stable, "alternative is already stable");

        let names = resolve_names(self.elements.iter().map(|e| e.short_name.as_str()), false);
        for (element, name) in self.elements.iter_mut().zip(names) {
            element.set_name(name);
            element.stabilize();
        }

        let mut items = Vec::with_capacity(self.elements.len() + 1);
        for element in &self.elements {
            let kind = match element.kind {
                ElementKind::Token(_) => ItemType::BeforeToken,
                ElementKind::Production(_) => ItemType::BeforeProduction,
            };
            items.push(Item::new(self.id, element.position, kind));
        }
        items.push(Item::new(self.id, self.elements.len(), ItemType::End));
        self.items = items;

        self.is_stable = true;
    }

    /// Returns `true` if the shortest length has decreased.
    fn compute_shortest_length(&mut self, productions: &Map<ProductionID, Production>) -> bool {
        let mut length = 0;
        for element in &self.elements {
            match element.kind {
                ElementKind::Token(_) => length += 1,
                ElementKind::Production(p) => match productions[&p].shortest_length {
                    Some(l) => length += l,
                    None => return false,
                },
            }
        }

        if self.shortest_length.map_or(true, |current| length < current) {
            self.shortest_length = Some(length);
            return true;
        }

        false
    }

    // `"P.alt = A b C"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            write!(f, "{} =", self.full_name(g))?;
            for element in &self.elements {
                write!(f, " {}", element.display(g))?;
            }
            Ok(())
        })
    }
}

/// A non-terminal of the grammar.
#[derive(Debug)]
pub struct Production {
    id: ProductionID,
    name: String,
    alternatives: Vec<AlternativeID>,
    is_stable: bool,
    shortest_length: Option<usize>,
    pub(crate) last_priority_level: Option<PriorityLevelID>,
}

impl Production {
    pub fn id(&self) -> ProductionID {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alternatives(&self) -> &[AlternativeID] {
        &self.alternatives[..]
    }

    pub fn is_stable(&self) -> bool {
        self.is_stable
    }

    /// The minimum number of tokens derivable from this production, if known.
    pub fn shortest_length(&self) -> Option<usize> {
        self.shortest_length
    }

    pub(crate) fn stabilize(&mut self, alternatives: &mut Map<AlternativeID, Alternative>) {
        assert!(!self.is_stable, "production is already stable");
        self.is_stable = true;

        let rename_unique_empty = self.alternatives.len() > 1;
        let names = resolve_names(
            self.alternatives
                .iter()
                .map(|id| alternatives[id].short_name.as_str()),
            rename_unique_empty,
        );
        for (id, name) in self.alternatives.iter().zip(names) {
            alternatives[id].set_name(name);
        }
        for id in &self.alternatives {
            alternatives[id].stabilize();
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum GrammarError {
    #[error("The {production} production is useless.")]
    UselessProduction { production: String },

    #[error("The {alternative} alternative has already been assigned a priority.")]
    SpuriousPriority { alternative: String },

    #[error("The {alternative} alternative is not recursive.")]
    AlternativeNotRecursive { alternative: String },

    #[error("The left recursion of the {alternative} alternative must be followed by a token.")]
    RecursionNotFollowedByToken { alternative: String },

    #[error("The {alternative} alternative does not belong to the {production} production.")]
    ForeignAlternative {
        production: String,
        alternative: String,
    },
}

/// The grammar used to derive the LR(0) automaton.
///
/// A grammar is populated through its mutation methods, then frozen by
/// [`Grammar::stabilize`]. Tokens and productions are created on first
/// reference until the grammar is stable.
#[derive(Debug)]
pub struct Grammar {
    tokens: Map<TokenID, Token>,
    productions: Map<ProductionID, Production>,
    alternatives: Map<AlternativeID, Alternative>,
    pub(crate) priority_levels: Map<PriorityLevelID, PriorityLevel>,
    token_names: Map<String, TokenID>,
    production_names: Map<String, ProductionID>,
    first_production: ProductionID,
    is_stable: bool,
}

impl Grammar {
    /// Create a grammar whose start production is `first_production`.
    ///
    /// The implicit `$Start = first_production $end` production is added.
    pub fn new(first_production: &str) -> Self {
        let mut g = Self {
            tokens: Map::default(),
            productions: Map::default(),
            alternatives: Map::default(),
            priority_levels: Map::default(),
            token_names: Map::default(),
            production_names: Map::default(),
            first_production: ProductionID::START,
            is_stable: false,
        };

        let start = g.production(START_PRODUCTION_NAME);
        let end = g.token(END_TOKEN_NAME);
        debug_assert_eq!(start, ProductionID::START);
        debug_assert_eq!(end, TokenID::END);

        g.first_production = g.production(first_production);

        let alternative = g.add_alternative(start, "");
        g.add_production_element(alternative, "", g.first_production);
        g.add_token_element(alternative, "", end);

        g
    }

    /// Build a stable grammar from a definition closure.
    pub fn define<F>(first_production: &str, f: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut g = Self::new(first_production);
        f(&mut g);
        g.stabilize();
        g
    }

    /// Append to `production` an alternative made of unnamed `elements`.
    pub fn rule<I>(&mut self, production: ProductionID, short_name: &str, elements: I) -> AlternativeID
    where
        I: IntoIterator<Item = ElementKind>,
    {
        let alternative = self.add_alternative(production, short_name);
        for element in elements {
            match element {
                ElementKind::Token(t) => self.add_token_element(alternative, "", t),
                ElementKind::Production(p) => self.add_production_element(alternative, "", p),
            };
        }
        alternative
    }

    /// Return the production named `name`, creating it if the grammar is not stable yet.
    pub fn production(&mut self, name: &str) -> ProductionID {
        if let Some(&id) = self.production_names.get(name) {
            return id;
        }
        assert!(!self.is_stable, "grammar is stable");

        let raw = u16::try_from(self.productions.len()).expect("too many productions");
        let id = ProductionID::new(raw);
        self.productions.insert(
            id,
            Production {
                id,
                name: name.to_owned(),
                alternatives: vec![],
                is_stable: false,
                shortest_length: None,
                last_priority_level: None,
            },
        );
        self.production_names.insert(name.to_owned(), id);
        id
    }

    /// Return the token named `name`, creating it if the grammar is not stable yet.
    pub fn token(&mut self, name: &str) -> TokenID {
        if let Some(&id) = self.token_names.get(name) {
            return id;
        }
        assert!(!self.is_stable, "grammar is stable");

        let raw = u16::try_from(self.tokens.len()).expect("too many tokens");
        let id = TokenID::new(raw);
        self.tokens.insert(
            id,
            Token {
                id,
                name: name.to_owned(),
            },
        );
        self.token_names.insert(name.to_owned(), id);
        id
    }

    pub fn find_production(&self, name: &str) -> Option<ProductionID> {
        self.production_names.get(name).copied()
    }

    pub fn find_token(&self, name: &str) -> Option<TokenID> {
        self.token_names.get(name).copied()
    }

    /// Append a new alternative to `production`.
    pub fn add_alternative(&mut self, production: ProductionID, short_name: &str) -> AlternativeID {
        let owner = self
            .productions
            .get_mut(&production)
            .expect("unknown production");
        assert!(!owner.is_stable, "production is stable");

        let raw = u16::try_from(self.alternatives.len()).expect("too many alternatives");
        let id = AlternativeID::new(raw);
        owner.alternatives.push(id);
        self.alternatives.insert(
            id,
            Alternative {
                id,
                production,
                short_name: short_name.to_owned(),
                name: None,
                elements: vec![],
                items: vec![],
                is_stable: false,
                shortest_length: None,
                priority_level: None,
            },
        );
        id
    }

    /// Append a token reference to `alternative` and return its position.
    pub fn add_token_element(
        &mut self,
        alternative: AlternativeID,
        short_name: &str,
        token: TokenID,
    ) -> usize {
        assert!(self.tokens.contains_key(&token), "unknown token");
        self.alternatives[&alternative].push_element(short_name, ElementKind::Token(token))
    }

    /// Append a production reference to `alternative` and return its position.
    pub fn add_production_element(
        &mut self,
        alternative: AlternativeID,
        short_name: &str,
        production: ProductionID,
    ) -> usize {
        assert!(
            self.productions.contains_key(&production),
            "unknown production"
        );
        self.alternatives[&alternative].push_element(short_name, ElementKind::Production(production))
    }

    /// Freeze the grammar, resolving element and alternative names and
    /// building the items of every alternative.
    #[tracing::instrument(skip_all)]
    pub fn stabilize(&mut self) {
        assert!(!self.is_stable, "grammar is already stable");
        self.is_stable = true;

        let Self {
            productions,
            alternatives,
            ..
        } = self;
        for production in productions.values_mut() {
            production.stabilize(alternatives);
        }

        tracing::debug!(
            "stabilized {} productions and {} alternatives",
            self.productions.len(),
            self.alternatives.len()
        );
    }

    pub fn is_stable(&self) -> bool {
        self.is_stable
    }

    /// Compute the shortest derivable length of every production and
    /// alternative, and reject the productions that derive no finite
    /// token sequence.
    #[tracing::instrument(skip_all)]
    pub fn compute_shortest_lengths(&mut self) -> Result<(), GrammarError> {
        assert!(self.is_stable, "grammar is not stable");

        let ids: Vec<ProductionID> = self.productions.keys().copied().collect();
        let mut passes = 0;
        let mut modified = true;
        while modified {
            modified = false;
            passes += 1;
            for &id in &ids {
                modified |= self.compute_production_shortest_length(id);
            }
        }
        tracing::trace!("shortest lengths converged after {} passes", passes);

        let mut useless = self
            .productions
            .values()
            .filter(|production| production.shortest_length.is_none());
        let Some(first) = useless.next() else {
            return Ok(());
        };
        // $Start is only useless through the productions it derives.
        let culprit = match first.id {
            ProductionID::START => useless.next().unwrap_or(first),
            _ => first,
        };
        Err(GrammarError::UselessProduction {
            production: culprit.name.clone(),
        })
    }

    fn compute_production_shortest_length(&mut self, id: ProductionID) -> bool {
        let Self {
            productions,
            alternatives,
            ..
        } = self;

        let mut modified = false;
        let mut min_length: Option<usize> = None;
        for alternative in &productions[&id].alternatives {
            let alternative = &mut alternatives[alternative];
            modified |= alternative.compute_shortest_length(productions);
            if let Some(length) = alternative.shortest_length {
                if min_length.map_or(true, |min| length < min) {
                    min_length = Some(length);
                }
            }
        }

        let production = &mut productions[&id];
        if let Some(min_length) = min_length {
            if production.shortest_length.map_or(true, |current| min_length < current) {
                production.shortest_length = Some(min_length);
                return true;
            }
        }

        modified
    }

    /// The implicit `$Start` production.
    pub fn start_production(&self) -> ProductionID {
        ProductionID::START
    }

    /// The only alternative of `$Start`.
    pub fn start_alternative(&self) -> AlternativeID {
        self.productions[&ProductionID::START].alternatives[0]
    }

    /// The user's start production, wrapped by `$Start`.
    pub fn first_production(&self) -> ProductionID {
        self.first_production
    }

    pub fn end_token(&self) -> TokenID {
        TokenID::END
    }

    pub fn tokens(&self) -> impl Iterator<Item = &Token> + '_ {
        self.tokens.values()
    }

    pub fn productions(&self) -> impl Iterator<Item = &Production> + '_ {
        self.productions.values()
    }

    pub fn alternatives(&self) -> impl Iterator<Item = &Alternative> + '_ {
        self.alternatives.values()
    }

    /// Return the item of `alternative` at `position`.
    pub fn item(&self, alternative: AlternativeID, position: usize) -> Item {
        self.alternatives[&alternative].item(position)
    }

    pub(crate) fn productions_mut(&mut self) -> &mut Map<ProductionID, Production> {
        &mut self.productions
    }

    pub(crate) fn alternatives_mut(&mut self) -> &mut Map<AlternativeID, Alternative> {
        &mut self.alternatives
    }
}

impl Index<TokenID> for Grammar {
    type Output = Token;
    fn index(&self, id: TokenID) -> &Self::Output {
        &self.tokens[&id]
    }
}

impl Index<ProductionID> for Grammar {
    type Output = Production;
    fn index(&self, id: ProductionID) -> &Self::Output {
        &self.productions[&id]
    }
}

impl Index<AlternativeID> for Grammar {
    type Output = Alternative;
    fn index(&self, id: AlternativeID) -> &Self::Output {
        &self.alternatives[&id]
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "## tokens: ")?;
        for (i, token) in self.tokens.values().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", token)?;
        }
        writeln!(f, "\n## productions:")?;
        for production in self.productions.values() {
            write!(f, "{}", production.name)?;
            if let Some(length) = production.shortest_length {
                write!(f, " (shortest={})", length)?;
            }
            writeln!(f)?;
            for id in &production.alternatives {
                writeln!(f, "- {}", self.alternatives[id].display(self))?;
            }
        }
        Ok(())
    }
}
