use crate::domain::files::file::FileRecord;
use crate::domain::files::size::convert_file_size;
use crate::domain::files::space::SpaceSummary;

/// Single pass over an owner's files: sizes per type bucket, running total,
/// and the newest update time seen in each bucket.
pub fn aggregate<'a, I>(records: I, quota_bytes: u64) -> SpaceSummary
where
    I: IntoIterator<Item = &'a FileRecord>,
{
    let mut summary = SpaceSummary::empty(quota_bytes);
    for file in records {
        let bucket = summary.bucket_mut(file.file_type);
        bucket.size += file.size;
        if bucket
            .latest_date
            .is_none_or(|latest| file.updated_at > latest)
        {
            bucket.latest_date = Some(file.updated_at);
        }
        summary.used += file.size;
    }
    summary
}

#[derive(Debug, Clone, PartialEq)]
pub struct StorageUsage {
    pub used: u64,
    pub total: u64,
    pub percent: f64,
    pub used_label: String,
    pub total_label: String,
}

/// Share of `total` consumed, clamped to 0..=100.
pub fn usage(used: u64, total: u64) -> StorageUsage {
    let percent = if total == 0 {
        100.0
    } else {
        (used as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
    };
    StorageUsage {
        used,
        total,
        percent,
        used_label: convert_file_size(used),
        total_label: convert_file_size(total),
    }
}
