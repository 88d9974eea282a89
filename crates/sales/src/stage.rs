use serde::{Deserialize, Serialize};

/// Progress of a single `CreateOrder` call.
///
/// ```text
/// Validating -> Reserving -> Committing -> Committed
///      \            \            \
///       +------------+------------+----> Aborted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FulfillmentStage {
    Validating,
    Reserving,
    Committing,
    Committed,
    Aborted,
}

impl FulfillmentStage {
    pub fn as_str(self) -> &'static str {
        match self {
            FulfillmentStage::Validating => "validating",
            FulfillmentStage::Reserving => "reserving",
            FulfillmentStage::Committing => "committing",
            FulfillmentStage::Committed => "committed",
            FulfillmentStage::Aborted => "aborted",
        }
    }

    /// Whether `self -> next` is an allowed transition.
    pub fn can_advance_to(self, next: FulfillmentStage) -> bool {
        use FulfillmentStage::*;
        matches!(
            (self, next),
            (Validating, Reserving)
                | (Reserving, Committing)
                | (Committing, Committed)
                | (Validating | Reserving | Committing, Aborted)
        )
    }
}

impl core::fmt::Display for FulfillmentStage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
