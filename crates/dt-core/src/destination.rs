//! Destination selection
//!
//! A category on the matched trigger narrows the candidates to destinations
//! of the same category. If none qualify the whole list is used instead: the
//! category is a preference, never a reason not to redirect.

use rand::Rng;

use crate::settings::Settings;
use crate::types::Category;

/// Destinations eligible for the given category.
pub fn candidates<'a>(settings: &'a Settings, category: Option<Category>) -> Vec<&'a str> {
    let all = settings.destinations.iter().map(String::as_str);
    let Some(category) = category else {
        return all.collect();
    };

    let filtered: Vec<&str> = all
        .clone()
        .filter(|d| settings.destination_category(d) == Some(category))
        .collect();
    if filtered.is_empty() {
        all.collect()
    } else {
        filtered
    }
}

/// Pick a destination uniformly at random among the candidates.
///
/// Returns `None` only when there are no destinations at all.
pub fn select_destination<'a, R: Rng + ?Sized>(
    settings: &'a Settings,
    category: Option<Category>,
    rng: &mut R,
) -> Option<&'a str> {
    let pool = candidates(settings, category);
    if pool.is_empty() {
        return None;
    }
    Some(pool[rng.gen_range(0..pool.len())])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn settings(destinations: &[&str], categories: &[(&str, &str)]) -> Settings {
        let mut settings = Settings {
            destinations: destinations.iter().map(|d| d.to_string()).collect(),
            ..Default::default()
        };
        for (site, label) in categories {
            settings.destination_categories.insert(site.to_string(), label.to_string());
        }
        settings
    }

    #[test]
    fn test_empty_list() {
        let mut rng = SmallRng::seed_from_u64(1);
        let settings = settings(&[], &[]);
        assert_eq!(select_destination(&settings, None, &mut rng), None);
        assert_eq!(select_destination(&settings, Some(Category::News), &mut rng), None);
    }

    #[test]
    fn test_single_category_match_is_deterministic() {
        let mut rng = SmallRng::seed_from_u64(7);
        let settings = settings(&["d1", "d2"], &[("d1", "news")]);
        for _ in 0..50 {
            assert_eq!(select_destination(&settings, Some(Category::News), &mut rng), Some("d1"));
        }
    }

    #[test]
    fn test_category_fallback_to_full_list() {
        let settings = settings(&["d1", "d2"], &[]);
        assert_eq!(candidates(&settings, Some(Category::Shopping)), vec!["d1", "d2"]);

        let mut rng = SmallRng::seed_from_u64(3);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(select_destination(&settings, Some(Category::Shopping), &mut rng).unwrap());
        }
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_no_category_uses_everything() {
        let settings = settings(&["d1", "d2", "d3"], &[("d1", "news")]);
        assert_eq!(candidates(&settings, None), vec!["d1", "d2", "d3"]);
        assert_eq!(candidates(&settings, Some(Category::News)), vec!["d1"]);
    }
}
