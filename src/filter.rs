use chrono::{Duration, NaiveDate};

/// Length of the trailing "this week" window, counted back from today.
pub const WEEK_WINDOW_DAYS: i64 = 7;

/// Fields a record exposes to [`RecordFilter`].
pub trait Filterable {
    /// Free text fields searched by substring.
    fn search_text(&self) -> Vec<&str>;

    /// Categorical field compared by equality (category or status slug).
    fn category(&self) -> Option<&str> {
        None
    }

    fn tags(&self) -> &[String] {
        &[]
    }

    fn record_date(&self) -> Option<NaiveDate> {
        None
    }
}

/// Conjunction of optional predicates. Empty values are inactive and match
/// everything.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
    /// Restrict to the trailing week ending on this date.
    pub week_ending: Option<NaiveDate>,
}

impl RecordFilter {
    pub fn is_empty(&self) -> bool {
        active(&self.search).is_none()
            && active(&self.category).is_none()
            && active(&self.tag).is_none()
            && self.week_ending.is_none()
    }

    pub fn matches<T: Filterable>(&self, record: &T) -> bool {
        if let Some(needle) = active(&self.search) {
            let needle = needle.to_lowercase();
            if !record
                .search_text()
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
            {
                return false;
            }
        }
        if let Some(category) = active(&self.category) {
            if record.category() != Some(category) {
                return false;
            }
        }
        if let Some(tag) = active(&self.tag) {
            if !record.tags().iter().any(|t| t == tag) {
                return false;
            }
        }
        if let Some(today) = self.week_ending {
            match record.record_date() {
                Some(date) if within_week(date, today) => {}
                _ => return false,
            }
        }
        true
    }

    /// Stable filter: matching records in input order.
    pub fn apply<'a, T, I>(&self, records: I) -> Vec<&'a T>
    where
        T: Filterable + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        records.into_iter().filter(|r| self.matches(*r)).collect()
    }
}

/// Date-only comparison: `today - 7 days <= date <= today`.
pub fn within_week(date: NaiveDate, today: NaiveDate) -> bool {
    date <= today && date >= today - Duration::days(WEEK_WINDOW_DAYS)
}

fn active(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Item {
        text: &'static str,
        kind: &'static str,
        tags: Vec<String>,
        date: NaiveDate,
    }

    impl Filterable for Item {
        fn search_text(&self) -> Vec<&str> {
            vec![self.text]
        }
        fn category(&self) -> Option<&str> {
            Some(self.kind)
        }
        fn tags(&self) -> &[String] {
            &self.tags
        }
        fn record_date(&self) -> Option<NaiveDate> {
            Some(self.date)
        }
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn items() -> Vec<Item> {
        vec![
            Item {
                text: "Wrote API docs",
                kind: "documentation",
                tags: vec!["api".into()],
                date: day("2024-06-01"),
            },
            Item {
                text: "Sprint planning",
                kind: "meeting",
                tags: vec![],
                date: day("2024-06-10"),
            },
            Item {
                text: "Fixed API pagination",
                kind: "development",
                tags: vec!["api".into(), "bug".into()],
                date: day("2024-06-14"),
            },
        ]
    }

    #[test]
    fn empty_filter_returns_everything_in_order() {
        let items = items();
        let filter = RecordFilter {
            search: Some("   ".into()),
            category: Some(String::new()),
            ..RecordFilter::default()
        };
        assert!(filter.is_empty());
        let out = filter.apply(&items);
        assert_eq!(out.len(), items.len());
        assert!(out.iter().zip(items.iter()).all(|(a, b)| std::ptr::eq(*a, b)));
    }

    #[test]
    fn search_is_case_insensitive() {
        let items = items();
        let filter = RecordFilter {
            search: Some("api".into()),
            ..RecordFilter::default()
        };
        let texts: Vec<_> = filter.apply(&items).iter().map(|i| i.text).collect();
        assert_eq!(texts, vec!["Wrote API docs", "Fixed API pagination"]);
    }

    #[test]
    fn predicates_are_conjunctive() {
        let items = items();
        let filter = RecordFilter {
            search: Some("api".into()),
            category: Some("development".into()),
            tag: Some("bug".into()),
            week_ending: None,
        };
        let texts: Vec<_> = filter.apply(&items).iter().map(|i| i.text).collect();
        assert_eq!(texts, vec!["Fixed API pagination"]);

        let none = RecordFilter {
            category: Some("meeting".into()),
            tag: Some("api".into()),
            ..RecordFilter::default()
        };
        assert!(none.apply(&items).is_empty());
    }

    #[test]
    fn filtering_is_idempotent() {
        let items = items();
        let filter = RecordFilter {
            tag: Some("api".into()),
            ..RecordFilter::default()
        };
        let once = filter.apply(&items);
        let twice = filter.apply(once.iter().copied());
        assert_eq!(once, twice);
    }

    #[test]
    fn this_week_window() {
        let today = day("2024-06-15");
        assert!(!within_week(day("2024-06-01"), today));
        assert!(within_week(day("2024-06-10"), today));
        assert!(within_week(day("2024-06-08"), today));
        assert!(within_week(today, today));
        assert!(!within_week(day("2024-06-07"), today));
        assert!(!within_week(day("2024-06-16"), today));

        let items = items();
        let filter = RecordFilter {
            week_ending: Some(today),
            ..RecordFilter::default()
        };
        let texts: Vec<_> = filter.apply(&items).iter().map(|i| i.text).collect();
        assert_eq!(texts, vec!["Sprint planning", "Fixed API pagination"]);
    }
}
