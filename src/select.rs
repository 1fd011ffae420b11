use std::collections::BTreeMap;

use log::debug;

use crate::date::{parse_exif_date, MetaDateTime};
use crate::tags::TagFilter;

/// The earliest timestamp found for one file, with every tag that
/// produced that instant.
#[derive(Debug, Clone)]
pub struct SelectedTimestamp {
    pub datetime: MetaDateTime,
    pub tags: Vec<String>,
}

/// Scan a file's full metadata mapping for the oldest eligible
/// timestamp. Ineligible and unparseable tags are skipped; `None` means
/// no candidate survived.
pub fn oldest_timestamp(
    metadata: &BTreeMap<String, String>,
    filter: &TagFilter,
    day_begins: u32,
) -> Option<SelectedTimestamp> {
    let mut oldest: Option<SelectedTimestamp> = None;

    for (tag, raw) in metadata {
        if !filter.is_eligible(tag) {
            continue;
        }
        let Ok(parsed) = parse_exif_date(raw, day_begins) else {
            debug!("{tag}: skipping unparseable value {raw:?}");
            continue;
        };
        debug!("{tag}: {raw}");
        match &mut oldest {
            Some(best) if parsed == best.datetime => best.tags.push(tag.clone()),
            Some(best) if parsed < best.datetime => {
                *best = SelectedTimestamp {
                    datetime: parsed,
                    tags: vec![tag.clone()],
                };
            }
            None => {
                oldest = Some(SelectedTimestamp {
                    datetime: parsed,
                    tags: vec![tag.clone()],
                });
            }
            _ => {}
        }
    }

    oldest
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn default_filter() -> TagFilter {
        TagFilter::new(&[], &[], &[], &[])
    }

    #[test]
    fn test_picks_oldest_and_skips_unparseable() {
        let md = metadata(&[
            ("EXIF:CreateDate", "2020:05:01 10:00:00"),
            ("EXIF:DateTimeOriginal", "2019:01:01 00:00:00"),
            ("XMP:CreateDate", "not a date"),
        ]);
        let selected = oldest_timestamp(&md, &default_filter(), 0).unwrap();
        assert_eq!(
            selected.datetime.local.format("%Y:%m:%d %H:%M:%S").to_string(),
            "2019:01:01 00:00:00"
        );
        assert_eq!(selected.tags, vec!["EXIF:DateTimeOriginal"]);
    }

    #[test]
    fn test_no_candidates() {
        assert!(oldest_timestamp(&metadata(&[]), &default_filter(), 0).is_none());
        // parseable values on excluded tags still yield nothing
        let md = metadata(&[
            ("File:FileModifyDate", "2019:01:01 00:00:00"),
            ("XMP:HistoryWhen", "2018:01:01 00:00:00"),
        ]);
        assert!(oldest_timestamp(&md, &default_filter(), 0).is_none());
    }

    #[test]
    fn test_identical_instants_accumulate_tags() {
        let md = metadata(&[
            ("EXIF:CreateDate", "2019:01:01 00:00:00"),
            ("EXIF:DateTimeOriginal", "2019:01:01 00:00:00"),
        ]);
        let selected = oldest_timestamp(&md, &default_filter(), 0).unwrap();
        assert_eq!(selected.tags.len(), 2);
    }

    #[test]
    fn test_offset_aware_comparison() {
        // 09:00+01:00 is 08:00Z; 10:00+03:00 is 07:00Z, the older instant
        // despite the later wall-clock time
        let md = metadata(&[
            ("EXIF:CreateDate", "2020:05:01 09:00:00+01:00"),
            ("EXIF:DateTimeOriginal", "2020:05:01 10:00:00+03:00"),
        ]);
        let selected = oldest_timestamp(&md, &default_filter(), 0).unwrap();
        assert_eq!(selected.tags, vec!["EXIF:DateTimeOriginal"]);
    }

    #[test]
    fn test_day_begins_applied_per_tag() {
        let md = metadata(&[("EXIF:CreateDate", "2020:01:01 02:00:00")]);
        let selected = oldest_timestamp(&md, &default_filter(), 4).unwrap();
        assert_eq!(
            selected.datetime.local.format("%Y:%m:%d").to_string(),
            "2019:12:31"
        );
    }
}
