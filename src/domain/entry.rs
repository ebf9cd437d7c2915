use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::Cents;
use super::money::display_cents;

pub type EntryId = u64;

pub const DESCRIPTION_MIN_CHARS: usize = 3;
pub const DESCRIPTION_MAX_CHARS: usize = 255;

/// Largest amount a single entry may carry: 100 billion units.
/// Keeps owner totals far from `i64` overflow.
pub const MAX_AMOUNT_CENTS: Cents = 10_000_000_000_000;

/// Identifier of the user owning an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(pub u64);

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for OwnerId {
    fn from(id: u64) -> Self {
        OwnerId(id)
    }
}

impl FromStr for OwnerId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(OwnerId)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Money coming in; adds to the balance
    #[serde(alias = "entrada")]
    Income,
    /// Money going out; subtracts from the balance
    #[serde(alias = "saida")]
    Expense,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Income => "income",
            EntryKind::Expense => "expense",
        }
    }

    /// Signed contribution of an amount of this kind to a balance.
    pub fn signed(&self, amount_cents: Cents) -> Cents {
        match self {
            EntryKind::Income => amount_cents,
            EntryKind::Expense => amount_cents.saturating_neg(),
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown entry kind '{0}' (expected income or expense)")]
pub struct ParseKindError(pub String);

impl FromStr for EntryKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" | "entrada" => Ok(EntryKind::Income),
            "expense" | "saida" => Ok(EntryKind::Expense),
            _ => Err(ParseKindError(s.to_string())),
        }
    }
}

/// A structural violation of an entry's invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("amount must be positive (got {})", display_cents(.0))]
    NonPositiveAmount(Cents),
    #[error("amount must not exceed 100000000000.00 (got {})", display_cents(.0))]
    AmountTooLarge(Cents),
    #[error("description must be 3-255 characters after trimming (got {0})")]
    DescriptionLength(usize),
}

/// A single income or expense record owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub kind: EntryKind,
    /// Amount in cents (always positive)
    pub amount_cents: Cents,
    pub description: String,
    pub owner_id: OwnerId,
    pub created_at: DateTime<Utc>,
}

impl Entry {
    /// Signed contribution of this entry to its owner's balance.
    pub fn signed_amount(&self) -> Cents {
        self.kind.signed(self.amount_cents)
    }

    pub fn is_expense(&self) -> bool {
        self.kind == EntryKind::Expense
    }

    /// Apply a patch and validate the merged result without touching `self`.
    pub fn merged(&self, patch: &EntryPatch) -> Result<Entry, Vec<FieldError>> {
        let kind = patch.kind.unwrap_or(self.kind);
        let amount_cents = patch.amount_cents.unwrap_or(self.amount_cents);
        let description = patch.description.as_deref().unwrap_or(&self.description);
        let description = validate_fields(amount_cents, description)?;

        Ok(Entry {
            kind,
            amount_cents,
            description,
            ..self.clone()
        })
    }
}

/// Input for creating an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub kind: EntryKind,
    pub amount_cents: Cents,
    pub description: String,
}

impl NewEntry {
    pub fn new(kind: EntryKind, amount_cents: Cents, description: impl Into<String>) -> Self {
        Self {
            kind,
            amount_cents,
            description: description.into(),
        }
    }

    pub fn income(amount_cents: Cents, description: impl Into<String>) -> Self {
        Self::new(EntryKind::Income, amount_cents, description)
    }

    pub fn expense(amount_cents: Cents, description: impl Into<String>) -> Self {
        Self::new(EntryKind::Expense, amount_cents, description)
    }
}

/// Partial update of an entry. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryPatch {
    pub kind: Option<EntryKind>,
    pub amount_cents: Option<Cents>,
    pub description: Option<String>,
}

impl EntryPatch {
    pub fn with_kind(mut self, kind: EntryKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_amount(mut self, amount_cents: Cents) -> Self {
        self.amount_cents = Some(amount_cents);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.kind.is_none() && self.amount_cents.is_none() && self.description.is_none()
    }

    /// Whether applying this patch to `existing` has to pass a solvency check:
    /// it turns the entry into an expense, or it changes the amount of an
    /// entry that is currently an expense.
    pub fn needs_solvency_check(&self, existing: &Entry) -> bool {
        self.kind == Some(EntryKind::Expense)
            || (existing.is_expense() && self.amount_cents.is_some())
    }
}

/// Check amount and description, returning the trimmed description.
/// All violations are reported, not just the first one.
pub fn validate_fields(amount_cents: Cents, description: &str) -> Result<String, Vec<FieldError>> {
    let mut errors = Vec::new();

    if amount_cents <= 0 {
        errors.push(FieldError::NonPositiveAmount(amount_cents));
    } else if amount_cents > MAX_AMOUNT_CENTS {
        errors.push(FieldError::AmountTooLarge(amount_cents));
    }

    let trimmed = description.trim();
    let len = trimmed.chars().count();
    if !(DESCRIPTION_MIN_CHARS..=DESCRIPTION_MAX_CHARS).contains(&len) {
        errors.push(FieldError::DescriptionLength(len));
    }

    if errors.is_empty() {
        Ok(trimmed.to_string())
    } else {
        Err(errors)
    }
}
