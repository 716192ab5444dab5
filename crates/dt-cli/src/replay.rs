//! Replays recorded navigation traces through one engine.
//!
//! A trace is JSON lines, one `{"tabId":..,"url":..,"isMainFrame":..}` object
//! per line. Blank lines and lines starting with `#` are skipped.

use std::collections::BTreeMap;

use rand::Rng;

use dt_core::{Clock, Engine, NavigationEvent, Outcome, SettingsStore};

#[derive(Debug, Default)]
pub struct ReplayReport {
    pub decisions: Vec<(NavigationEvent, Outcome)>,
    /// Decisions per outcome label
    pub tally: BTreeMap<&'static str, usize>,
}

impl ReplayReport {
    pub fn redirects(&self) -> usize {
        self.tally.get("redirect").copied().unwrap_or(0)
    }
}

pub fn parse_events(text: &str) -> Result<Vec<NavigationEvent>, String> {
    let mut events = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let event: NavigationEvent =
            serde_json::from_str(line).map_err(|e| format!("Line {}: invalid event: {}", idx + 1, e))?;
        events.push(event);
    }
    Ok(events)
}

pub fn replay<S, C, R>(events: Vec<NavigationEvent>, store: &S, clock: &C, rng: &mut R) -> ReplayReport
where
    S: SettingsStore,
    C: Clock,
    R: Rng,
{
    let engine = Engine::new();
    let mut report = ReplayReport::default();

    for event in events {
        let outcome = engine.handle_navigation(&event, store, clock, rng);
        *report.tally.entry(outcome.label()).or_insert(0) += 1;
        report.decisions.push((event, outcome));
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use dt_core::{FixedClock, MemoryStore, Moment, Settings};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const NOW: Moment = Moment {
        epoch_ms: 1_791_979_200_000,
        weekday: 3,
        minute_of_day: 720,
    };

    #[test]
    fn test_parse_events() {
        let text = "# trace\n{\"tabId\":1,\"url\":\"https://a.com/\"}\n\n{\"tabId\":1,\"url\":\"https://x.com/ad\",\"isMainFrame\":false}\n";
        let events = parse_events(text).unwrap();
        assert_eq!(events.len(), 2);
        assert!(events[0].is_main_frame);
        assert!(!events[1].is_main_frame);
    }

    #[test]
    fn test_parse_events_reports_line() {
        let err = parse_events("{\"tabId\":1,\"url\":\"https://a.com/\"}\n{oops}\n").unwrap_err();
        assert!(err.starts_with("Line 2:"), "{}", err);
    }

    #[test]
    fn test_replay_trace() {
        let settings = Settings {
            trigger_sites: vec!["a.com".into()],
            destinations: vec!["wikipedia.org".into()],
            ..Default::default()
        };
        let store = MemoryStore::new(settings);
        let clock = FixedClock::new(NOW);
        let mut rng = StdRng::seed_from_u64(3);

        let events = vec![
            NavigationEvent::main_frame(1, "https://a.com/"),
            NavigationEvent::main_frame(1, "https://wikipedia.org/"),
            NavigationEvent::sub_frame(2, "https://a.com/embed"),
            NavigationEvent::main_frame(2, "https://a.com/"),
            NavigationEvent::main_frame(3, "https://b.com/"),
        ];
        let report = replay(events, &store, &clock, &mut rng);

        assert_eq!(report.decisions.len(), 5);
        assert_eq!(report.redirects(), 2);
        assert_eq!(report.tally.get("skipped-guard"), Some(&1));
        assert_eq!(report.tally.get("skipped-sub-frame"), Some(&1));
        assert_eq!(report.tally.get("allowed-no-trigger"), Some(&1));
        assert_eq!(store.snapshot().redirect_stats.get("a.com"), Some(&2));
    }
}
