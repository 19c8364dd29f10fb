use serde::{Deserialize, Serialize};

pub(crate) const MAX_LIMIT: i64 = 1000;

pub(crate) const fn default_limit() -> i64 {
    100
}

#[derive(Debug, Deserialize)]
pub(crate) struct PageQuery {
    #[serde(default)]
    pub(crate) skip: i64,
    #[serde(default = "default_limit")]
    pub(crate) limit: i64,
}

impl PageQuery {
    /// `skip` floored at zero and `limit` clamped to `1..=MAX_LIMIT`.
    pub(crate) fn normalized(&self) -> (i64, i64) {
        (self.skip.max(0), self.limit.clamp(1, MAX_LIMIT))
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PaginatedResponse<T> {
    pub(crate) items: Vec<T>,
    pub(crate) total_count: i64,
    pub(crate) skip: i64,
    pub(crate) limit: i64,
}
