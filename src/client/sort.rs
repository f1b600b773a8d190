//! Ordering is a presentation concern; the store returns records unordered.

use crate::models::video::VideoRecord;
use std::{cmp::Ordering, str::FromStr};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOption {
    #[default]
    TitleAsc,
    TitleDesc,
    /// Newest first.
    LastUpdated,
}

impl FromStr for SortOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a-z" | "title" | "title-asc" => Ok(SortOption::TitleAsc),
            "z-a" | "title-desc" => Ok(SortOption::TitleDesc),
            "last updated" | "last-updated" | "newest" => Ok(SortOption::LastUpdated),
            other => Err(format!(
                "unknown sort option `{}` (expected A-Z, Z-A or Last Updated)",
                other
            )),
        }
    }
}

pub fn sort_records(records: &mut [VideoRecord], option: SortOption) {
    match option {
        SortOption::TitleAsc => records.sort_by(compare_titles),
        SortOption::TitleDesc => records.sort_by(|a, b| compare_titles(b, a)),
        SortOption::LastUpdated => records.sort_by(|a, b| b.upload_date.cmp(&a.upload_date)),
    }
}

fn compare_titles(a: &VideoRecord, b: &VideoRecord) -> Ordering {
    a.title
        .to_lowercase()
        .cmp(&b.title.to_lowercase())
        .then_with(|| a.title.cmp(&b.title))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn record(title: &str, age_secs: i64) -> VideoRecord {
        VideoRecord {
            video_id: title.to_lowercase(),
            title: title.into(),
            description: String::new(),
            category: "category1".into(),
            video_url: String::new(),
            upload_date: Utc::now() - Duration::seconds(age_secs),
        }
    }

    fn titles(records: &[VideoRecord]) -> Vec<&str> {
        records.iter().map(|r| r.title.as_str()).collect()
    }

    #[test]
    fn titles_sort_case_insensitively() {
        let mut records = vec![record("banana", 1), record("Apple", 2), record("cherry", 3)];
        sort_records(&mut records, SortOption::TitleAsc);
        assert_eq!(titles(&records), ["Apple", "banana", "cherry"]);
        sort_records(&mut records, SortOption::TitleDesc);
        assert_eq!(titles(&records), ["cherry", "banana", "Apple"]);
    }

    #[test]
    fn last_updated_puts_newest_first() {
        let mut records = vec![record("old", 300), record("new", 1), record("mid", 60)];
        sort_records(&mut records, SortOption::LastUpdated);
        assert_eq!(titles(&records), ["new", "mid", "old"]);
    }

    #[test]
    fn parses_screen_labels() {
        assert_eq!("A-Z".parse(), Ok(SortOption::TitleAsc));
        assert_eq!("Z-A".parse(), Ok(SortOption::TitleDesc));
        assert_eq!("Last Updated".parse(), Ok(SortOption::LastUpdated));
        assert!("sideways".parse::<SortOption>().is_err());
    }
}
