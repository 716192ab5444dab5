//! Navigation Decision Engine
//!
//! Every main-frame navigation runs through the same pipeline:
//!
//! 1. Loop guard: the first event after our own redirect is skipped.
//! 2. Global snooze (unless focus mode or a block schedule overrides it).
//! 3. Trigger match, first entry wins.
//! 4. Whitelist match cancels the trigger.
//! 5. Site snooze for the matched trigger.
//! 6. Destination selection, preferring the trigger's category.
//! 7. Stats patch, redirect, guard armed.
//!
//! Any failure along the way leaves the navigation alone.

use log::{debug, warn};
use rand::Rng;

use crate::clock::{Clock, Moment};
use crate::destination::select_destination;
use crate::guard::RedirectLoopGuard;
use crate::matcher::Matcher;
use crate::settings::{Settings, SettingsStore};
use crate::stats::record_redirect;
use crate::suppression::SuppressionEvaluator;
use crate::types::{AllowReason, NavigationEvent, Outcome, Redirect};
use crate::url::{format_destination_url, parse_url};

// =============================================================================
// Engine
// =============================================================================

/// The decision engine. Holds only the loop guard; settings are passed in
/// fresh for every decision.
#[derive(Debug, Default)]
pub struct Engine {
    guard: RedirectLoopGuard,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn guard(&self) -> &RedirectLoopGuard {
        &self.guard
    }

    /// Decide one navigation against a settings snapshot.
    pub fn decide<R: Rng + ?Sized>(
        &self,
        event: &NavigationEvent,
        settings: &Settings,
        now: &Moment,
        rng: &mut R,
    ) -> Outcome {
        if let Some(skipped) = self.screen(event) {
            return skipped;
        }
        self.evaluate(event, settings, now, rng)
    }

    /// Read settings from a store, decide, and persist the stats write.
    ///
    /// The guard is consulted before the store is read so a skipped event
    /// costs nothing.
    pub fn handle_navigation<S, C, R>(&self, event: &NavigationEvent, store: &S, clock: &C, rng: &mut R) -> Outcome
    where
        S: SettingsStore + ?Sized,
        C: Clock + ?Sized,
        R: Rng + ?Sized,
    {
        if let Some(skipped) = self.screen(event) {
            return skipped;
        }

        let settings = match store.load() {
            Ok(settings) => settings,
            Err(e) => {
                warn!("tab {}: {}; leaving navigation alone", event.tab_id, e);
                return Outcome::Allowed(AllowReason::SettingsUnavailable);
            }
        };

        let outcome = self.evaluate(event, &settings, &clock.now(), rng);
        if let Outcome::Redirect(redirect) = &outcome {
            // The redirect still happens if the counter can't be written
            if let Err(e) = store.persist(&redirect.patch) {
                warn!("tab {}: failed to record redirect stats: {}", event.tab_id, e);
            }
        }
        outcome
    }

    /// Handle everything that happens before settings are needed.
    ///
    /// Returns `Some` when the event is finished: sub-frame navigations are
    /// ignored without touching the guard, and an armed tab is disarmed and
    /// its event skipped.
    pub fn screen(&self, event: &NavigationEvent) -> Option<Outcome> {
        if !event.is_main_frame {
            return Some(Outcome::SkippedSubFrame);
        }
        if self.guard.consume(event.tab_id) {
            debug!("tab {}: skipping navigation caused by our redirect", event.tab_id);
            return Some(Outcome::SkippedByGuard);
        }
        None
    }

    /// Run the settings-dependent part of the pipeline. Arms the guard when
    /// the outcome is a redirect.
    pub fn evaluate<R: Rng + ?Sized>(
        &self,
        event: &NavigationEvent,
        settings: &Settings,
        now: &Moment,
        rng: &mut R,
    ) -> Outcome {
        let outcome = self.evaluate_inner(event, settings, now, rng);
        match &outcome {
            Outcome::Redirect(redirect) => {
                self.guard.arm(event.tab_id, &redirect.destination_url);
                debug!("tab {}: {}", event.tab_id, outcome);
            }
            _ => debug!("tab {}: {} ({})", event.tab_id, outcome, event.url),
        }
        outcome
    }

    fn evaluate_inner<R: Rng + ?Sized>(
        &self,
        event: &NavigationEvent,
        settings: &Settings,
        now: &Moment,
        rng: &mut R,
    ) -> Outcome {
        let suppression = SuppressionEvaluator::new(settings, *now);
        if let Some(snoozed) = suppression.global() {
            return Outcome::Suppressed(snoozed);
        }

        let url = match parse_url(&event.url) {
            Some(url) => url,
            None => return Outcome::Allowed(AllowReason::InvalidUrl),
        };

        let matcher = Matcher::new(settings);
        let trigger = match matcher.match_trigger(&url) {
            Some(trigger) => trigger,
            None => return Outcome::Allowed(AllowReason::NoTrigger),
        };

        if matcher.is_whitelisted(&url) {
            return Outcome::Allowed(AllowReason::Whitelisted);
        }

        if let Some(snoozed) = suppression.site(trigger) {
            return Outcome::Suppressed(snoozed);
        }

        let category = settings.trigger_category(trigger);
        let destination = match select_destination(settings, category, rng) {
            Some(destination) => destination,
            None => return Outcome::Allowed(AllowReason::NoDestination),
        };

        Outcome::Redirect(Redirect {
            tab_id: event.tab_id,
            destination_url: format_destination_url(destination).into_owned(),
            trigger: trigger.to_string(),
            delay_ms: settings.redirect_delay,
            patch: record_redirect(&settings.redirect_stats, trigger),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Suppression;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    const NOW: Moment = Moment {
        epoch_ms: 1_000_000,
        weekday: 3,
        minute_of_day: 600,
    };

    fn settings() -> Settings {
        Settings {
            trigger_sites: vec!["reddit.com".into()],
            destinations: vec!["wikipedia.org".into()],
            ..Default::default()
        }
    }

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(42)
    }

    #[test]
    fn test_redirects_trigger() {
        let engine = Engine::new();
        let outcome = engine.decide(
            &NavigationEvent::main_frame(1, "https://www.reddit.com/r/all"),
            &settings(),
            &NOW,
            &mut rng(),
        );
        let redirect = outcome.redirect().unwrap();
        assert_eq!(redirect.destination_url, "https://wikipedia.org");
        assert_eq!(redirect.trigger, "reddit.com");
        assert_eq!(redirect.delay_ms, 0);
        assert_eq!(redirect.patch.redirect_stats.as_ref().unwrap().get("reddit.com"), Some(&1));
    }

    #[test]
    fn test_non_trigger_allowed() {
        let engine = Engine::new();
        let outcome = engine.decide(
            &NavigationEvent::main_frame(1, "https://news.ycombinator.com/"),
            &settings(),
            &NOW,
            &mut rng(),
        );
        assert_eq!(outcome, Outcome::Allowed(AllowReason::NoTrigger));
        assert_eq!(engine.guard().armed_count(), 0);
    }

    #[test]
    fn test_invalid_url_allowed() {
        let engine = Engine::new();
        let outcome = engine.decide(&NavigationEvent::main_frame(1, "::::"), &settings(), &NOW, &mut rng());
        assert_eq!(outcome, Outcome::Allowed(AllowReason::InvalidUrl));
    }

    #[test]
    fn test_sub_frame_ignored() {
        let engine = Engine::new();
        engine.guard().arm(1, "https://wikipedia.org");
        let outcome = engine.decide(
            &NavigationEvent::sub_frame(1, "https://reddit.com/embed"),
            &settings(),
            &NOW,
            &mut rng(),
        );
        assert_eq!(outcome, Outcome::SkippedSubFrame);
        // Sub-frames never consume the guard
        assert_eq!(engine.guard().armed_count(), 1);
    }

    #[test]
    fn test_global_snooze_checked_before_url() {
        let engine = Engine::new();
        let snoozed = Settings {
            snooze_until: Some(NOW.epoch_ms + 1),
            ..settings()
        };
        let outcome = engine.decide(&NavigationEvent::main_frame(1, "not a url"), &snoozed, &NOW, &mut rng());
        assert_eq!(
            outcome,
            Outcome::Suppressed(Suppression::GlobalSnooze { until: NOW.epoch_ms + 1 })
        );
    }

    #[test]
    fn test_no_destination() {
        let engine = Engine::new();
        let empty = Settings {
            destinations: Vec::new(),
            ..settings()
        };
        let outcome = engine.decide(&NavigationEvent::main_frame(1, "https://reddit.com"), &empty, &NOW, &mut rng());
        assert_eq!(outcome, Outcome::Allowed(AllowReason::NoDestination));
        assert_eq!(engine.guard().armed_count(), 0);
    }

    #[test]
    fn test_redirect_delay_carried() {
        let engine = Engine::new();
        let delayed = Settings {
            redirect_delay: 1500,
            ..settings()
        };
        let outcome = engine.decide(&NavigationEvent::main_frame(1, "https://reddit.com"), &delayed, &NOW, &mut rng());
        assert_eq!(outcome.redirect().unwrap().delay_ms, 1500);
    }
}
