//! Turning user-supplied list criteria into an [`AssessmentFilter`].
//!
//! Shared by the admin API query string and the `assessments list` command.

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use eqlens_core::{EqLevel, ProfessionTrack};
use eqlens_db::{AssessmentFilter, AssessmentStatus};

/// Raw list criteria, all optional strings as they arrive from a query
/// string or command line.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
    pub eq_level: Option<String>,
    pub track: Option<String>,
    pub search: Option<String>,
    /// YYYY-MM-DD, inclusive
    pub after: Option<String>,
    /// YYYY-MM-DD, inclusive
    pub before: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

fn parse_day(
    value: &str,
    which: &str,
    bound: fn(NaiveDate) -> Option<DateTime<Utc>>,
) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| anyhow!("Invalid {} date: {}", which, e))?;
    bound(date).ok_or_else(|| anyhow!("Invalid {} date: {}", which, value))
}

pub fn build_filter(params: ListParams) -> Result<AssessmentFilter> {
    let status = params
        .status
        .map(|s| s.parse::<AssessmentStatus>().map_err(|e| anyhow!(e)))
        .transpose()?;

    // Stored levels use the display form ("High EQ").
    let eq_level = params
        .eq_level
        .map(|s| {
            s.parse::<EqLevel>()
                .map(|level| level.as_str().to_string())
                .map_err(|e| anyhow!(e))
        })
        .transpose()?;

    let track = params
        .track
        .map(|s| {
            s.parse::<ProfessionTrack>()
                .map(|track| track.as_str().to_string())
                .map_err(|e| anyhow!(e))
        })
        .transpose()?;

    let after = params
        .after
        .map(|s| parse_day(&s, "after", AssessmentFilter::day_start))
        .transpose()?;
    let before = params
        .before
        .map(|s| parse_day(&s, "before", AssessmentFilter::day_end))
        .transpose()?;

    Ok(AssessmentFilter {
        status,
        eq_level,
        track,
        search: params.search.filter(|s| !s.trim().is_empty()),
        after,
        before,
        limit: params.limit,
        offset: params.offset,
    })
}
