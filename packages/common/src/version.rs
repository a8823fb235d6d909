use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::CommonError;

/// Resource version: the published page, the editable draft, or an
/// archived revision.
///
/// The repository numbers them `0` (live), `1` (work) and `2..` for history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceVersion {
    Live,
    Work,
    Historic(u64),
}

impl ResourceVersion {
    pub const LIVE_INDEX: u64 = 0;
    pub const WORK_INDEX: u64 = 1;

    /// Numeric form used in repository query strings
    pub fn index(&self) -> u64 {
        match self {
            ResourceVersion::Live => Self::LIVE_INDEX,
            ResourceVersion::Work => Self::WORK_INDEX,
            ResourceVersion::Historic(n) => *n,
        }
    }

    pub fn from_index(index: u64) -> Self {
        match index {
            Self::LIVE_INDEX => ResourceVersion::Live,
            Self::WORK_INDEX => ResourceVersion::Work,
            n => ResourceVersion::Historic(n),
        }
    }

    pub fn is_work(&self) -> bool {
        matches!(self, ResourceVersion::Work)
    }
}

impl fmt::Display for ResourceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceVersion::Live => write!(f, "live"),
            ResourceVersion::Work => write!(f, "work"),
            ResourceVersion::Historic(n) => write!(f, "{n}"),
        }
    }
}

impl FromStr for ResourceVersion {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "live" => Ok(ResourceVersion::Live),
            "work" => Ok(ResourceVersion::Work),
            other => other
                .parse::<u64>()
                .map(ResourceVersion::from_index)
                .map_err(|_| CommonError::InvalidVersion(other.to_string())),
        }
    }
}
