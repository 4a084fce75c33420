use std::fmt;

use http::StatusCode;
use strum::Display;
use url::Url;

use super::filter::{Token, TokenSet};

/// Which side of an exchange an [`Event`] announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Phase {
    Pre,
    Post,
}

impl Phase {
    fn token(self) -> Token {
        match self {
            Phase::Pre => Token::Pre,
            Phase::Post => Token::Post,
        }
    }
}

/// The kinds of resource an exchange can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ResourceKind {
    Service,
    Collection,
    Entry,
}

impl ResourceKind {
    fn token(self) -> Token {
        match self {
            ResourceKind::Service => Token::Service,
            ResourceKind::Collection => Token::Collection,
            ResourceKind::Entry => Token::Entry,
        }
    }
}

/// The interceptable operations of the resource model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Operation {
    Get,
    GetNext,
    GetMedia,
    Put,
    PutMedia,
    Delete,
    Create,
}

impl Operation {
    /// The method tokens of this operation, e.g. `GET` and `MEDIA` for
    /// [`Operation::GetMedia`].
    pub fn tokens(self) -> TokenSet {
        let set = TokenSet::empty();
        match self {
            Operation::Get => set.with(Token::Get),
            Operation::GetNext => set.with(Token::Get).with(Token::Next),
            Operation::GetMedia => set.with(Token::Get).with(Token::Media),
            Operation::Put => set.with(Token::Put),
            Operation::PutMedia => set.with(Token::Put).with(Token::Media),
            Operation::Delete => set.with(Token::Delete),
            Operation::Create => set.with(Token::Create),
        }
    }
}

/// One side of an exchange, as seen by callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub phase: Phase,
    pub resource: ResourceKind,
    pub operation: Operation,
    /// The URI the request is sent to.
    pub uri: Url,
    /// The response status, present in the [`Phase::Post`] phase only.
    pub status: Option<StatusCode>,
}

impl Event {
    pub fn pre(resource: ResourceKind, operation: Operation, uri: Url) -> Self {
        Event {
            phase: Phase::Pre,
            resource,
            operation,
            uri,
            status: None,
        }
    }

    /// The same exchange, after a response with `status` arrived.
    pub fn post(self, status: StatusCode) -> Self {
        Event {
            phase: Phase::Post,
            status: Some(status),
            ..self
        }
    }

    /// The tokens describing this event: the operation's method tokens, the resource
    /// kind and the phase. Never contains `ANY`.
    pub fn tokens(&self) -> TokenSet {
        self.operation
            .tokens()
            .with(self.resource.token())
            .with(self.phase.token())
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.tokens(), self.uri)?;
        if let Some(status) = self.status {
            write!(f, " -> {}", status.as_u16())?;
        }
        Ok(())
    }
}
