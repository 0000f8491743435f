//! Expense categories.
//!
//! The set is closed. `Unknown` is a sentinel for unparsable input and never
//! validates.

use std::{collections::HashMap, fmt, sync::LazyLock};

use serde::{Deserialize, Serialize};

use crate::{LedgerError, ResultLedger};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Groceries,
    Alcohol,
    Drugs,
    HouseholdItems,
    Bills,
    Presents,
    Tickets,
    Misc,
    #[default]
    Unknown,
}

static BY_NAME: LazyLock<HashMap<String, Category>> = LazyLock::new(|| {
    Category::ALL
        .iter()
        .map(|c| (c.as_str().to_lowercase(), *c))
        .collect()
});

impl Category {
    /// Every valid category, `Unknown` excluded.
    pub const ALL: [Category; 8] = [
        Self::Groceries,
        Self::Alcohol,
        Self::Drugs,
        Self::HouseholdItems,
        Self::Bills,
        Self::Presents,
        Self::Tickets,
        Self::Misc,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Groceries => "Groceries",
            Self::Alcohol => "Alcohol",
            Self::Drugs => "Drugs",
            Self::HouseholdItems => "Household Items",
            Self::Bills => "Bills",
            Self::Presents => "Presents",
            Self::Tickets => "Tickets",
            Self::Misc => "Misc",
            Self::Unknown => "Unknown Category",
        }
    }

    /// Case-insensitive lookup that strips surrounding double quotes.
    /// Anything unrecognised maps to `Unknown`.
    pub fn parse(s: &str) -> Category {
        BY_NAME
            .get(&s.trim_matches('"').to_lowercase())
            .copied()
            .unwrap_or(Self::Unknown)
    }

    pub fn validate(self) -> ResultLedger<()> {
        if self == Self::Unknown {
            return Err(LedgerError::InvalidCategory(self.to_string()));
        }
        Ok(())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Category {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}
