//! Order type and order status
//!
//! `OrderStatus` is a small state machine. Handlers request transitions
//! through their deltas; `can_transition_to` is the only authority on
//! which moves are legal.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dine-in or takeout selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    #[default]
    Unknown,
    ToGo,
    ForHere,
}

impl OrderType {
    pub fn is_known(self) -> bool {
        !matches!(self, OrderType::Unknown)
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OrderType::Unknown => "UNKNOWN",
            OrderType::ToGo => "TO_GO",
            OrderType::ForHere => "FOR_HERE",
        })
    }
}

/// Progress of the order through the workflow.
///
/// Serialized in lowercase; the uppercase names used by `Display` are
/// accepted when reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    #[serde(alias = "UNKNOWN")]
    Unknown,
    #[serde(alias = "IN_PROGRESS")]
    InProgress,
    #[serde(alias = "FINISHED")]
    Finished,
    #[serde(alias = "CONFIRMED")]
    Confirmed,
    #[serde(alias = "GETTING_USER_INFO")]
    GettingUserInfo,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Unknown,
        OrderStatus::InProgress,
        OrderStatus::Finished,
        OrderStatus::Confirmed,
        OrderStatus::GettingUserInfo,
    ];

    /// Whether a handler may move the order from `self` to `next`.
    ///
    /// Staying in the same status is always allowed. CONFIRMED is only
    /// reachable from FINISHED (the customer verified the cart) or from
    /// GETTING_USER_INFO (the name was captured), and GETTING_USER_INFO is
    /// only reachable from CONFIRMED.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::{Confirmed, Finished, GettingUserInfo, InProgress, Unknown};

        self == next
            || matches!(
                (self, next),
                (Unknown | InProgress, InProgress | Finished)
                    | (Finished, Confirmed | InProgress)
                    | (Confirmed, GettingUserInfo | InProgress)
                    | (GettingUserInfo, Confirmed | InProgress)
            )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OrderStatus::Unknown => "UNKNOWN",
            OrderStatus::InProgress => "IN_PROGRESS",
            OrderStatus::Finished => "FINISHED",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::GettingUserInfo => "GETTING_USER_INFO",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::{Confirmed, Finished, GettingUserInfo, InProgress, Unknown};

    #[test]
    fn test_happy_path_transitions() {
        let path = [Unknown, InProgress, Finished, Confirmed, GettingUserInfo, Confirmed];
        for pair in path.windows(2) {
            assert!(
                pair[0].can_transition_to(pair[1]),
                "{} -> {} should be legal",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_confirmed_requires_finished_first() {
        assert!(!Unknown.can_transition_to(Confirmed));
        assert!(!InProgress.can_transition_to(Confirmed));
        assert!(Finished.can_transition_to(Confirmed));
    }

    #[test]
    fn test_user_info_requires_confirmed_first() {
        for from in [Unknown, InProgress, Finished] {
            assert!(!from.can_transition_to(GettingUserInfo), "{from} -> GETTING_USER_INFO");
        }
        assert!(Confirmed.can_transition_to(GettingUserInfo));
    }

    #[test]
    fn test_changes_always_return_to_in_progress() {
        for from in OrderStatus::ALL {
            assert!(from.can_transition_to(InProgress), "{from} -> IN_PROGRESS");
        }
    }

    #[test]
    fn test_nothing_returns_to_unknown() {
        for from in OrderStatus::ALL {
            assert_eq!(from.can_transition_to(Unknown), from == Unknown);
        }
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&InProgress).unwrap(), "\"in_progress\"");
        assert_eq!(serde_json::to_string(&OrderType::ToGo).unwrap(), "\"TO_GO\"");
        let parsed: OrderStatus = serde_json::from_str("\"getting_user_info\"").unwrap();
        assert_eq!(parsed, GettingUserInfo);
    }

    #[test]
    fn test_display_names_deserialize() {
        for status in OrderStatus::ALL {
            let json = format!("\"{status}\"");
            let parsed: OrderStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, status);
        }
        assert!(serde_json::from_str::<OrderStatus>("\"In_Progress\"").is_err());
    }
}
