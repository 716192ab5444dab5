//! Suppression Evaluator
//!
//! Precedence, highest first:
//!
//! 1. Focus mode disables every snooze.
//! 2. An active block schedule disables the global snooze.
//! 3. An unexpired global snooze suppresses every trigger.
//! 4. An unexpired site snooze suppresses its trigger.
//!
//! The whitelist is not part of this chain; it always wins and is checked by
//! the engine on its own.

use crate::clock::Moment;
use crate::schedule::is_snooze_blocked;
use crate::settings::Settings;
use crate::types::Suppression;

pub struct SuppressionEvaluator<'a> {
    settings: &'a Settings,
    now: Moment,
}

impl<'a> SuppressionEvaluator<'a> {
    pub fn new(settings: &'a Settings, now: Moment) -> Self {
        Self { settings, now }
    }

    pub fn focus_active(&self) -> bool {
        self.settings.focus_mode
    }

    /// Whether a block schedule currently overrides the global snooze.
    pub fn snooze_blocked(&self) -> bool {
        is_snooze_blocked(&self.settings.schedules, &self.now)
    }

    /// Global snooze, if it applies right now.
    pub fn global(&self) -> Option<Suppression> {
        if self.focus_active() {
            return None;
        }
        let until = self.settings.snooze_until.filter(|&until| self.now.epoch_ms < until)?;
        if self.snooze_blocked() {
            return None;
        }
        Some(Suppression::GlobalSnooze { until })
    }

    /// Per-site snooze for a matched trigger. Schedules do not affect it.
    pub fn site(&self, trigger: &str) -> Option<Suppression> {
        if self.focus_active() {
            return None;
        }
        let until = self
            .settings
            .site_snooze_until(trigger)
            .filter(|&until| self.now.epoch_ms < until)?;
        Some(Suppression::SiteSnooze {
            trigger: trigger.to_string(),
            until,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::Schedule;

    const NOW: i64 = 1_000_000;

    fn now(weekday: u8, hour: u16) -> Moment {
        Moment {
            epoch_ms: NOW,
            weekday,
            minute_of_day: hour * 60,
        }
    }

    fn work_hours() -> Schedule {
        Schedule {
            id: "work".into(),
            days: vec![1, 2, 3, 4, 5],
            start_time: "09:00".into(),
            end_time: "17:00".into(),
        }
    }

    #[test]
    fn test_global_snooze() {
        let settings = Settings {
            snooze_until: Some(NOW + 1),
            ..Default::default()
        };
        let eval = SuppressionEvaluator::new(&settings, now(3, 10));
        assert_eq!(eval.global(), Some(Suppression::GlobalSnooze { until: NOW + 1 }));
        assert_eq!(eval.site("a.com"), None);
    }

    #[test]
    fn test_expired_snooze() {
        let settings = Settings {
            snooze_until: Some(NOW),
            ..Default::default()
        };
        let eval = SuppressionEvaluator::new(&settings, now(3, 10));
        assert_eq!(eval.global(), None);
        assert_eq!(eval.site("a.com"), None);
    }

    #[test]
    fn test_schedule_blocks_global_snooze() {
        let settings = Settings {
            snooze_until: Some(NOW + 13 * 3_600_000),
            schedules: vec![work_hours()],
            ..Default::default()
        };
        let eval = SuppressionEvaluator::new(&settings, now(3, 10));
        assert!(eval.snooze_blocked());
        assert_eq!(eval.global(), None);

        // Outside the window the snooze applies again
        let eval = SuppressionEvaluator::new(&settings, now(3, 18));
        assert!(eval.global().is_some());
    }

    #[test]
    fn test_schedule_does_not_block_site_snooze() {
        let mut settings = Settings {
            schedules: vec![work_hours()],
            ..Default::default()
        };
        settings.snoozed_sites.insert("a.com".into(), NOW + 1);
        let eval = SuppressionEvaluator::new(&settings, now(3, 10));
        assert_eq!(eval.global(), None);
        assert_eq!(
            eval.site("a.com"),
            Some(Suppression::SiteSnooze { trigger: "a.com".into(), until: NOW + 1 })
        );
        assert_eq!(eval.site("b.com"), None);
    }

    #[test]
    fn test_focus_mode_overrides_everything() {
        let mut settings = Settings {
            snooze_until: Some(NOW + 1),
            focus_mode: true,
            ..Default::default()
        };
        settings.snoozed_sites.insert("a.com".into(), NOW + 1);
        let eval = SuppressionEvaluator::new(&settings, now(6, 12));
        assert_eq!(eval.global(), None);
        assert_eq!(eval.site("a.com"), None);
    }

    #[test]
    fn test_nothing_set() {
        let settings = Settings::default();
        let eval = SuppressionEvaluator::new(&settings, now(0, 0));
        assert_eq!(eval.global(), None);
        assert_eq!(eval.site("a.com"), None);
        assert!(!eval.snooze_blocked());
    }
}
