//! Epoch timestamps with the unit carried in the type.
//!
//! The aggregation core works in milliseconds only. Chart consumers want
//! whole seconds, and [`UnixMillis::checked_to_seconds`] is the one place
//! that conversion happens.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnixMillis(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnixSeconds(pub u64);

impl UnixMillis {
    pub fn now() -> Self {
        // A clock set before 1970 reads as the epoch rather than failing the poll.
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or_default();
        UnixMillis(millis)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// `None` unless the value sits on a whole-second boundary.
    pub const fn checked_to_seconds(self) -> Option<UnixSeconds> {
        if self.0 % 1_000 == 0 {
            Some(UnixSeconds(self.0 / 1_000))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_conversion_rejects_fractional_seconds() {
        assert_eq!(UnixMillis(900_000).checked_to_seconds(), Some(UnixSeconds(900)));
        assert_eq!(UnixMillis(900_001).checked_to_seconds(), None);
    }

    #[test]
    fn now_is_after_2020() {
        assert!(UnixMillis::now().as_u64() > 1_577_836_800_000);
    }
}
