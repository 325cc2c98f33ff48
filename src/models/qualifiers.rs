//! Find qualifiers: name-match mode and result ordering.
//!
//! Qualifiers are supplied as the UDDI v2 string tokens. The two members of a
//! sort axis are mutually exclusive; everything else is a validation error.
//! Absent qualifiers fall back to prefix name matching, sorted by name
//! ascending with last-update descending as tiebreaker.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const EXACT_NAME_MATCH: &str = "exactNameMatch";
pub const SORT_BY_NAME_ASC: &str = "sortByNameAsc";
pub const SORT_BY_NAME_DESC: &str = "sortByNameDesc";
pub const SORT_BY_DATE_ASC: &str = "sortByDateAsc";
pub const SORT_BY_DATE_DESC: &str = "sortByDateDesc";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortAxis {
    Name,
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// SQL keyword for this direction. Derived from the enum, never from
    /// caller-supplied text.
    pub fn sql(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindQualifiers {
    pub exact_name_match: bool,
    /// Axis the caller sorted on; the other axis is always the tiebreaker.
    pub primary_axis: SortAxis,
    pub name_direction: SortDirection,
    pub date_direction: SortDirection,
}

impl Default for FindQualifiers {
    fn default() -> Self {
        Self {
            exact_name_match: false,
            primary_axis: SortAxis::Name,
            name_direction: SortDirection::Ascending,
            date_direction: SortDirection::Descending,
        }
    }
}

impl FindQualifiers {
    /// Parse raw qualifier tokens. Unknown tokens and conflicting members of
    /// one axis are rejected; a date sort qualifier promotes the date axis to
    /// primary unless a name sort qualifier is also present.
    pub fn parse<S: AsRef<str>>(raw: &[S]) -> Result<Self> {
        let mut qualifiers = FindQualifiers::default();
        let mut name_sort = None;
        let mut date_sort = None;

        for token in raw {
            match token.as_ref() {
                EXACT_NAME_MATCH => qualifiers.exact_name_match = true,
                SORT_BY_NAME_ASC => {
                    Self::set_axis(&mut name_sort, SortDirection::Ascending, "name")?
                }
                SORT_BY_NAME_DESC => {
                    Self::set_axis(&mut name_sort, SortDirection::Descending, "name")?
                }
                SORT_BY_DATE_ASC => {
                    Self::set_axis(&mut date_sort, SortDirection::Ascending, "date")?
                }
                SORT_BY_DATE_DESC => {
                    Self::set_axis(&mut date_sort, SortDirection::Descending, "date")?
                }
                other => {
                    return Err(Error::UnsupportedQualifiers(format!(
                        "unknown qualifier '{other}'"
                    )))
                }
            }
        }

        if let Some(direction) = name_sort {
            qualifiers.name_direction = direction;
        }
        if let Some(direction) = date_sort {
            qualifiers.date_direction = direction;
        }
        if date_sort.is_some() && name_sort.is_none() {
            qualifiers.primary_axis = SortAxis::Date;
        }

        Ok(qualifiers)
    }

    fn set_axis(
        slot: &mut Option<SortDirection>,
        direction: SortDirection,
        axis: &str,
    ) -> Result<()> {
        if slot.replace(direction).is_some() {
            return Err(Error::UnsupportedQualifiers(format!(
                "conflicting sort qualifiers on the {axis} axis"
            )));
        }
        Ok(())
    }

    /// ORDER BY clause over the given name and date column expressions.
    /// The secondary axis is always applied as tiebreaker.
    pub fn order_by(&self, name_expr: &str, date_expr: &str) -> String {
        match self.primary_axis {
            SortAxis::Name => format!(
                "{name_expr} {}, {date_expr} {}",
                self.name_direction.sql(),
                self.date_direction.sql()
            ),
            SortAxis::Date => format!(
                "{date_expr} {}, {name_expr} {}",
                self.date_direction.sql(),
                self.name_direction.sql()
            ),
        }
    }
}
