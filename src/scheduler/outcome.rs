use std::fmt;
use std::sync::LazyLock;

/// Purchase results meaning the account cannot get the package right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IneligibleReason {
    AlreadyPurchased,
    RegionNotSupported,
    InvalidPackage,
    DoesNotOwnRequiredApp,
}

impl IneligibleReason {
    pub const ALL: [IneligibleReason; 4] = [
        IneligibleReason::AlreadyPurchased,
        IneligibleReason::RegionNotSupported,
        IneligibleReason::InvalidPackage,
        IneligibleReason::DoesNotOwnRequiredApp,
    ];

    pub fn code(self) -> &'static str {
        match self {
            IneligibleReason::AlreadyPurchased => "AlreadyPurchased",
            IneligibleReason::RegionNotSupported => "RegionNotSupported",
            IneligibleReason::InvalidPackage => "InvalidPackage",
            IneligibleReason::DoesNotOwnRequiredApp => "DoesNotOwnRequiredApp",
        }
    }
}

impl fmt::Display for IneligibleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RedeemResult {
    pub success: bool,
    pub rate_limited: bool,
    pub ineligible: Option<IneligibleReason>,
}

/// Classifies add-license replies. Built once per process.
#[derive(Debug)]
pub struct OutcomeClassifier {
    // (reason, lowercase code with no whitespace)
    ineligible: Vec<(IneligibleReason, String)>,
}

static CLASSIFIER: LazyLock<OutcomeClassifier> = LazyLock::new(OutcomeClassifier::new);

pub fn classifier() -> &'static OutcomeClassifier {
    &CLASSIFIER
}

/// Lowercases and drops whitespace, so `Already Purchased` and
/// `alreadypurchased` compare equal.
fn squash(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

impl OutcomeClassifier {
    fn new() -> Self {
        Self {
            ineligible: IneligibleReason::ALL
                .iter()
                .map(|reason| (*reason, squash(reason.code())))
                .collect(),
        }
    }

    pub fn is_success(&self, response: &str) -> bool {
        let lower = response.to_lowercase();
        lower.contains("collected game") || lower.contains("ok")
    }

    pub fn is_rate_limited(&self, response: &str) -> bool {
        response.to_lowercase().contains("ratelimited")
    }

    pub fn ineligible_reason(&self, response: &str) -> Option<IneligibleReason> {
        let squashed = squash(response);
        self.ineligible
            .iter()
            .find(|(_, code)| squashed.contains(code.as_str()))
            .map(|(reason, _)| *reason)
    }

    pub fn classify(&self, response: Option<&str>) -> RedeemResult {
        let Some(text) = response.filter(|text| !text.trim().is_empty()) else {
            return RedeemResult::default();
        };
        if self.is_success(text) {
            return RedeemResult {
                success: true,
                ..RedeemResult::default()
            };
        }
        RedeemResult {
            success: false,
            rate_limited: self.is_rate_limited(text),
            ineligible: self.ineligible_reason(text),
        }
    }
}
