use std::collections::HashSet;

/// Groups that never contribute a timestamp: color-profile metadata
/// carries creation dates of the profile, not the media.
const HARD_EXCLUDED_GROUPS: &[&str] = &["ICC_Profile"];

/// Qualified tags that never contribute a timestamp.
const HARD_EXCLUDED_TAGS: &[&str] = &["SourceFile", "XMP:HistoryWhen"];

/// Filesystem timestamps, excluded by default.
const FS_TIMESTAMP_GROUP: &str = "File";

/// Decides which qualified tags (`Group:Tag`) may contribute to
/// timestamp selection. Exclusions always win: an excluded group or tag
/// stays ineligible even when an inclusion list names it.
#[derive(Debug, Clone)]
pub struct TagFilter {
    excluded_groups: HashSet<String>,
    excluded_tags: HashSet<String>,
    only_groups: HashSet<String>,
    only_tags: HashSet<String>,
}

impl TagFilter {
    pub fn new(
        ignore_groups: &[String],
        ignore_tags: &[String],
        use_only_groups: &[String],
        use_only_tags: &[String],
    ) -> Self {
        let mut excluded_groups: HashSet<String> = HARD_EXCLUDED_GROUPS
            .iter()
            .map(|s| s.to_string())
            .collect();
        excluded_groups.insert(FS_TIMESTAMP_GROUP.to_string());
        excluded_groups.extend(ignore_groups.iter().cloned());

        let mut excluded_tags: HashSet<String> = HARD_EXCLUDED_TAGS
            .iter()
            .map(|s| s.to_string())
            .collect();
        excluded_tags.extend(ignore_tags.iter().cloned());

        Self {
            excluded_groups,
            excluded_tags,
            only_groups: use_only_groups.iter().cloned().collect(),
            only_tags: use_only_tags.iter().cloned().collect(),
        }
    }

    /// Whether `qualified` (e.g. `EXIF:DateTimeOriginal`) is eligible.
    /// Group matching is exact and case-sensitive.
    pub fn is_eligible(&self, qualified: &str) -> bool {
        // GPS stamps record position fixes, not creation times
        if qualified.contains("GPS") {
            return false;
        }
        let group = qualified.split(':').next().unwrap_or(qualified);
        if self.excluded_tags.contains(qualified) || self.excluded_groups.contains(group) {
            return false;
        }
        if self.only_groups.is_empty() && self.only_tags.is_empty() {
            return true;
        }
        self.only_tags.contains(qualified) || self.only_groups.contains(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(ig: &[&str], it: &[&str], og: &[&str], ot: &[&str]) -> TagFilter {
        let v = |s: &[&str]| s.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        TagFilter::new(&v(ig), &v(it), &v(og), &v(ot))
    }

    #[test]
    fn test_defaults() {
        let f = filter(&[], &[], &[], &[]);
        assert!(f.is_eligible("EXIF:DateTimeOriginal"));
        assert!(f.is_eligible("QuickTime:CreateDate"));
        assert!(!f.is_eligible("File:FileModifyDate"));
        assert!(!f.is_eligible("ICC_Profile:ProfileDateTime"));
        assert!(!f.is_eligible("XMP:HistoryWhen"));
        assert!(!f.is_eligible("SourceFile"));
        assert!(!f.is_eligible("EXIF:GPSDateStamp"));
        assert!(!f.is_eligible("Composite:GPSDateTime"));
    }

    #[test]
    fn test_hard_exclusions_beat_inclusion_lists() {
        let f = filter(&[], &[], &["ICC_Profile", "File"], &["XMP:HistoryWhen"]);
        assert!(!f.is_eligible("ICC_Profile:ProfileDateTime"));
        assert!(!f.is_eligible("File:FileModifyDate"));
        assert!(!f.is_eligible("XMP:HistoryWhen"));
    }

    #[test]
    fn test_user_exclusions() {
        let f = filter(&["XMP"], &["EXIF:CreateDate"], &[], &[]);
        assert!(!f.is_eligible("XMP:CreateDate"));
        assert!(!f.is_eligible("EXIF:CreateDate"));
        assert!(f.is_eligible("EXIF:DateTimeOriginal"));
    }

    #[test]
    fn test_inclusion_restricts() {
        let f = filter(&[], &[], &["EXIF"], &[]);
        assert!(f.is_eligible("EXIF:DateTimeOriginal"));
        assert!(!f.is_eligible("QuickTime:CreateDate"));
    }

    #[test]
    fn test_inclusion_pair_is_a_union() {
        let f = filter(&[], &[], &["EXIF"], &["XMP:CreateDate"]);
        assert!(f.is_eligible("EXIF:CreateDate"));
        assert!(f.is_eligible("XMP:CreateDate"));
        assert!(!f.is_eligible("XMP:ModifyDate"));
    }

    #[test]
    fn test_excluded_tag_inside_included_group() {
        let f = filter(&[], &["EXIF:ModifyDate"], &["EXIF"], &[]);
        assert!(!f.is_eligible("EXIF:ModifyDate"));
        assert!(f.is_eligible("EXIF:DateTimeOriginal"));
    }

    #[test]
    fn test_group_match_is_exact() {
        let f = filter(&["EXIF"], &[], &[], &[]);
        assert!(!f.is_eligible("EXIF:CreateDate"));
        assert!(f.is_eligible("ExifIFD:CreateDate"));
    }
}
