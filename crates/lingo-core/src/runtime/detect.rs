// crates/lingo-core/src/runtime/detect.rs
// ============================================================================
// Module: Locale Detection
// Description: Ordered capability-probe chain for client locale detection.
// Purpose: Suggest an initial locale for users without a recorded choice.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Session clients expose their locale through transport capabilities that
//! differ between host versions. Detection is an ordered chain of probes: the
//! first probe returning a value wins, the result is normalized, and it must
//! name an available catalog locale or the default is used instead. Probes
//! are supplied by the host's session-join collaborator; the chain itself
//! never blocks.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::identifiers::LocaleCode;
use crate::core::identifiers::UserId;

// ============================================================================
// SECTION: Probe Contract
// ============================================================================

/// One capability probe for a client-reported locale.
pub trait ClientLocaleProbe: Send + Sync {
    /// Returns the raw locale string reported for `user`, if this capability
    /// is present and populated.
    fn probe(&self, user: UserId) -> Option<String>;
}

// ============================================================================
// SECTION: Detector
// ============================================================================

/// Ordered chain of [`ClientLocaleProbe`] values.
///
/// # Invariants
/// - Probes are consulted strictly in insertion order.
pub struct LocaleDetector {
    /// The ordered probes.
    probes: Vec<Box<dyn ClientLocaleProbe>>,
}

impl LocaleDetector {
    /// Creates a detector over the given probes.
    #[must_use]
    pub fn new(probes: Vec<Box<dyn ClientLocaleProbe>>) -> Self {
        Self {
            probes,
        }
    }

    /// Detects the locale for `user`, constrained to `available`.
    ///
    /// The chain stops at the first probe that reports anything; that single
    /// answer is normalized and must name an available locale, otherwise
    /// `default` is returned. Later probes are not consulted once a
    /// capability has answered.
    #[must_use]
    pub fn detect(
        &self,
        user: UserId,
        available: &[LocaleCode],
        default: &LocaleCode,
    ) -> LocaleCode {
        let Some(raw) = self.probes.iter().find_map(|probe| probe.probe(user)) else {
            return default.clone();
        };
        match LocaleCode::new(&raw) {
            Ok(code) if available.contains(&code) => code,
            _ => default.clone(),
        }
    }
}

impl std::fmt::Debug for LocaleDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocaleDetector").field("probes", &self.probes.len()).finish()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Panic-based assertions are permitted in tests.")]

    use super::ClientLocaleProbe;
    use super::LocaleDetector;
    use crate::core::identifiers::LocaleCode;
    use crate::core::identifiers::UserId;

    /// Probe returning a fixed answer.
    struct Fixed(Option<&'static str>);

    impl ClientLocaleProbe for Fixed {
        fn probe(&self, _user: UserId) -> Option<String> {
            self.0.map(str::to_owned)
        }
    }

    fn user() -> UserId {
        UserId::new(uuid::Uuid::new_v4())
    }

    fn available() -> Vec<LocaleCode> {
        vec![LocaleCode::new("en_us").unwrap(), LocaleCode::new("pt_br").unwrap()]
    }

    #[test]
    fn first_successful_probe_wins() {
        let detector = LocaleDetector::new(vec![
            Box::new(Fixed(None)),
            Box::new(Fixed(Some("pt_br"))),
            Box::new(Fixed(Some("en_us"))),
        ]);
        let default = LocaleCode::new("en_us").unwrap();
        assert_eq!(detector.detect(user(), &available(), &default).as_str(), "pt_br");
    }

    #[test]
    fn probe_results_are_normalized() {
        let detector = LocaleDetector::new(vec![Box::new(Fixed(Some("PT-BR")))]);
        let default = LocaleCode::new("en_us").unwrap();
        assert_eq!(detector.detect(user(), &available(), &default).as_str(), "pt_br");
    }

    #[test]
    fn unavailable_locale_falls_back_to_default() {
        let detector = LocaleDetector::new(vec![Box::new(Fixed(Some("th_th")))]);
        let default = LocaleCode::new("en_us").unwrap();
        assert_eq!(detector.detect(user(), &available(), &default).as_str(), "en_us");
    }

    #[test]
    fn chain_does_not_continue_past_the_first_answer() {
        let detector = LocaleDetector::new(vec![
            Box::new(Fixed(Some("th_th"))),
            Box::new(Fixed(Some("pt_br"))),
        ]);
        let default = LocaleCode::new("en_us").unwrap();
        assert_eq!(detector.detect(user(), &available(), &default).as_str(), "en_us");
    }

    #[test]
    fn empty_chain_returns_default() {
        let detector = LocaleDetector::new(Vec::new());
        let default = LocaleCode::new("en_us").unwrap();
        assert_eq!(detector.detect(user(), &available(), &default).as_str(), "en_us");
    }
}
