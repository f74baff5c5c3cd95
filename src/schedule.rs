//! Decides whether an article is due for a refresh. Pure date arithmetic;
//! the orchestrator supplies "today" so passes are reproducible in tests.

use crate::catalog::{Article, Category};
use chrono::NaiveDate;

/// Returns whether enough time has elapsed since `article` was last
/// refreshed. Articles that have never been refreshed are always due.
/// `core` articles wait half again as long as their configured cadence;
/// `data` articles wait exactly the cadence.
pub fn is_due(article: &Article, today: NaiveDate) -> bool {
    let last = match article.last_updated {
        None => return true,
        Some(last) => last,
    };
    let elapsed = (today - last).num_days();
    let threshold = match article.category {
        Category::Data => article.update_frequency as f64,
        Category::Core => article.update_frequency as f64 * 1.5,
    };
    elapsed as f64 >= threshold
}
