//! Accumulating and fail-fast validation.
//!
//! Every stage of the pipeline reports expected failures as values instead of
//! panicking or bubbling an error out of a stream. A [`Validation<T>`] is either
//! the value or a non-empty list of [`Message`]s.
//!
//! Two composition rules matter:
//!
//! ```text
//! validate_all([a, b, c])        validate_sequence([a, b, c])
//! ───────────────────────        ────────────────────────────
//!  a ─┐                           a ──ok──▶ b ──ok──▶ c
//!  b ─┼─▶ every failure           │         │
//!  c ─┘   concatenated            └─fail────┴─fail──▶ first failure only
//! ```
//!
//! Independent properties of one value accumulate; dependent stages
//! short-circuit (a malformed path never reaches the existence checks).

use std::fmt;

// ============================================================================
// Messages
// ============================================================================

/// One human-readable failure, optionally tagged with the stage or document
/// that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub context: Option<String>,
    pub text: String,
}

impl Message {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            context: None,
            text: text.into(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.context {
            Some(context) => write!(f, "{context}: {}", self.text),
            None => f.write_str(&self.text),
        }
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

/// Non-empty list of failure messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failures(Vec<Message>);

impl Failures {
    pub fn new(message: impl Into<Message>) -> Self {
        Self(vec![message.into()])
    }

    /// Build from a list of messages, `None` when the list is empty.
    pub fn from_messages(messages: Vec<Message>) -> Option<Self> {
        (!messages.is_empty()).then_some(Self(messages))
    }

    /// Tag every message that has no context yet.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        let context = context.into();
        for message in &mut self.0 {
            if message.context.is_none() {
                message.context = Some(context.clone());
            }
        }
        self
    }

    /// Append all messages of `other`.
    pub fn extend(&mut self, other: Failures) {
        self.0.extend(other.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages().iter()
    }

    pub fn messages(&self) -> &[Message] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false: a `Failures` carries at least one message.
    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Failures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, message) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{message}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Failures {}

/// Tagged result: the value, or every reason it was rejected.
pub type Validation<T> = Result<T, Failures>;

// ============================================================================
// Constructors
// ============================================================================

#[inline]
pub const fn pass<T>(value: T) -> Validation<T> {
    Ok(value)
}

#[inline]
pub fn fail<T>(message: impl Into<Message>) -> Validation<T> {
    Err(Failures::new(message))
}

// ============================================================================
// Validators
// ============================================================================

/// A reusable check over borrowed values.
///
/// Validators never take ownership, so the same value can be handed to many
/// of them by [`validate_all`]. Use [`Validator::run`] to thread an owned
/// value through.
pub struct Validator<T: ?Sized> {
    check: Box<dyn Fn(&T) -> Validation<()> + Send + Sync>,
}

impl<T: ?Sized> Validator<T> {
    pub fn new(check: impl Fn(&T) -> Validation<()> + Send + Sync + 'static) -> Self {
        Self {
            check: Box::new(check),
        }
    }

    pub fn check(&self, value: &T) -> Validation<()> {
        (self.check)(value)
    }

    /// Pass `value` through if every check holds.
    pub fn run(&self, value: T) -> Validation<T>
    where
        T: Sized,
    {
        self.check(&value).map(|()| value)
    }
}

impl<T: ?Sized> fmt::Debug for Validator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Validator")
    }
}

/// Lift a predicate into a validator; `message` renders the failure from the
/// rejected value.
pub fn validate<T, P, M>(predicate: P, message: M) -> Validator<T>
where
    T: ?Sized + 'static,
    P: Fn(&T) -> bool + Send + Sync + 'static,
    M: Fn(&T) -> String + Send + Sync + 'static,
{
    Validator::new(move |value: &T| {
        if predicate(value) {
            pass(())
        } else {
            fail(message(value))
        }
    })
}

/// Run every validator and concatenate all failures.
pub fn validate_all<T: ?Sized + 'static>(
    validators: impl IntoIterator<Item = Validator<T>>,
) -> Validator<T> {
    let validators: Vec<_> = validators.into_iter().collect();
    Validator::new(move |value: &T| {
        let messages: Vec<Message> = validators
            .iter()
            .filter_map(|validator| validator.check(value).err())
            .flat_map(|failures| failures.0)
            .collect();
        Failures::from_messages(messages).map_or(Ok(()), Err)
    })
}

/// Run validators left to right, stopping at the first failure.
pub fn validate_sequence<T: ?Sized + 'static>(
    validators: impl IntoIterator<Item = Validator<T>>,
) -> Validator<T> {
    let validators: Vec<_> = validators.into_iter().collect();
    Validator::new(move |value: &T| {
        validators
            .iter()
            .try_for_each(|validator| validator.check(value))
    })
}

// ============================================================================
// Lifting
// ============================================================================

/// Lift a plain transform into the success branch.
pub fn map<T, U>(f: impl Fn(T) -> U) -> impl Fn(Validation<T>) -> Validation<U> {
    move |validation| validation.map(&f)
}

/// Lift a validating transform into the success branch.
pub fn flat_map<T, U>(f: impl Fn(T) -> Validation<U>) -> impl Fn(Validation<T>) -> Validation<U> {
    move |validation| validation.and_then(&f)
}

// ============================================================================
// Tests
// ============================================================================
