use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

/// A single discussion thread fetched from the forum.
///
/// Read-only to this system; `id` is the forum's own identifier.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Thread {
    pub id: String,
    pub title: String,
    /// Body text of the post. May be empty for link posts.
    #[serde(default)]
    pub selftext: String,
}

/// Listing sort order supported by the forum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Top,
    New,
    Hot,
    Rising,
}

impl SortOrder {
    /// Parse a sort order string. Unrecognized values fall back to `Top`,
    /// matching the forum listing's default behavior.
    pub fn parse(s: &str) -> Self {
        match s {
            "new" => SortOrder::New,
            "hot" => SortOrder::Hot,
            "rising" => SortOrder::Rising,
            _ => SortOrder::Top,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Top => "top",
            SortOrder::New => "new",
            SortOrder::Hot => "hot",
            SortOrder::Rising => "rising",
        }
    }
}

impl Default for SortOrder {
    fn default() -> Self {
        SortOrder::Top
    }
}

// Lenient on the wire: unknown sort values map to Top instead of rejecting
// the request.
impl<'de> Deserialize<'de> for SortOrder {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(SortOrder::parse(&s))
    }
}

/// Time window for `top` listings. Ignored by every other sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TimeWindow {
    Day,
    Week,
    Month,
    Year,
    All,
}

impl TimeWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeWindow::Day => "day",
            TimeWindow::Week => "week",
            TimeWindow::Month => "month",
            TimeWindow::Year => "year",
            TimeWindow::All => "all",
        }
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        TimeWindow::All
    }
}
