use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// "This tracker was completed on this calendar day."
///
/// Stored as an ISO date (`YYYY-MM-DD`). Several records on the same day are
/// tolerated and each one is counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub date: NaiveDate,
}

impl CompletionRecord {
    pub fn new(date: NaiveDate) -> Self {
        CompletionRecord { date }
    }
}
