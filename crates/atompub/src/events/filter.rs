use std::fmt;
use std::str::FromStr;

use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};
use thiserror::Error;

/// A single descriptor of an exchange, or of the exchanges a callback wants to see.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Token {
    /// Before the request is issued.
    Pre,
    /// After the response arrives.
    Post,
    /// Matches every exchange. Only meaningful in a [`Filter`].
    Any,
    Get,
    Put,
    Delete,
    Create,
    /// Qualifies `GET`/`PUT` on the media resource of an entry.
    Media,
    /// Qualifies `GET` on the following page of a collection.
    Next,
    Service,
    Collection,
    Entry,
}

impl Token {
    const fn bit(self) -> u16 {
        1 << self as u16
    }
}

/// A set of [`Token`]s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TokenSet(u16);

impl TokenSet {
    pub const fn empty() -> Self {
        TokenSet(0)
    }

    pub const fn with(self, token: Token) -> Self {
        TokenSet(self.0 | token.bit())
    }

    pub fn insert(&mut self, token: Token) {
        self.0 |= token.bit();
    }

    pub const fn contains(&self, token: Token) -> bool {
        self.0 & token.bit() != 0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub const fn is_subset(&self, other: &TokenSet) -> bool {
        self.0 & !other.0 == 0
    }

    pub const fn union(self, other: TokenSet) -> Self {
        TokenSet(self.0 | other.0)
    }

    /// The tokens in this set, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = Token> + '_ {
        Token::iter().filter(|t| self.contains(*t))
    }
}

impl FromIterator<Token> for TokenSet {
    fn from_iter<I: IntoIterator<Item = Token>>(iter: I) -> Self {
        iter.into_iter().fold(TokenSet::empty(), TokenSet::with)
    }
}

impl fmt::Display for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&'static str> = self.iter().map(Into::into).collect();
        f.write_str(&names.join("_"))
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FilterError {
    #[error("An event filter cannot be empty")]
    Empty,
    #[error("Unknown event token in filter: '{0}'")]
    UnknownToken(String),
    #[error("An event filter cannot select both PRE and POST")]
    ConflictingPhases,
}

/// The set of tokens an exchange must carry for a callback to be notified of it.
///
/// Written as tokens joined by `_`, in any case and order, e.g. `POST_GET_ENTRY`. A
/// filter naming none of `PRE`, `POST` or `ANY` only matches the `PRE` phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Filter(TokenSet);

impl Filter {
    /// Every request.
    pub const fn pre() -> Self {
        Filter(TokenSet::empty().with(Token::Pre))
    }

    /// Both sides of every exchange.
    pub const fn any() -> Self {
        Filter(TokenSet::empty().with(Token::Any))
    }

    pub fn tokens(&self) -> TokenSet {
        self.0
    }

    /// Whether an exchange described by `tokens` is selected by this filter.
    pub fn matches(&self, tokens: TokenSet) -> bool {
        self.0.is_subset(&tokens.with(Token::Any))
    }
}

impl FromStr for Filter {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(FilterError::Empty);
        }

        let mut tokens = s
            .split('_')
            .map(|part| {
                Token::from_str(part.trim()).map_err(|_| FilterError::UnknownToken(part.into()))
            })
            .collect::<Result<TokenSet, _>>()?;

        if tokens.contains(Token::Pre) && tokens.contains(Token::Post) {
            return Err(FilterError::ConflictingPhases);
        }
        if ![Token::Pre, Token::Post, Token::Any]
            .iter()
            .any(|t| tokens.contains(*t))
        {
            tokens.insert(Token::Pre);
        }

        Ok(Filter(tokens))
    }
}

impl TryFrom<&str> for Filter {
    type Error = FilterError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
