use chrono::{DateTime, Utc};

use super::file_type::FileType;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpaceBucket {
    pub size: u64,
    /// Newest `$updatedAt` among the bucket's files; `None` while empty.
    pub latest_date: Option<DateTime<Utc>>,
}

/// Per-type storage usage for one owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceSummary {
    pub document: SpaceBucket,
    pub image: SpaceBucket,
    pub video: SpaceBucket,
    pub audio: SpaceBucket,
    pub other: SpaceBucket,
    pub used: u64,
    pub all: u64,
}

impl SpaceSummary {
    pub fn empty(quota_bytes: u64) -> Self {
        Self {
            document: SpaceBucket::default(),
            image: SpaceBucket::default(),
            video: SpaceBucket::default(),
            audio: SpaceBucket::default(),
            other: SpaceBucket::default(),
            used: 0,
            all: quota_bytes,
        }
    }

    pub fn bucket(&self, file_type: FileType) -> &SpaceBucket {
        match file_type {
            FileType::Document => &self.document,
            FileType::Image => &self.image,
            FileType::Video => &self.video,
            FileType::Audio => &self.audio,
            FileType::Other => &self.other,
        }
    }

    pub fn bucket_mut(&mut self, file_type: FileType) -> &mut SpaceBucket {
        match file_type {
            FileType::Document => &mut self.document,
            FileType::Image => &mut self.image,
            FileType::Video => &mut self.video,
            FileType::Audio => &mut self.audio,
            FileType::Other => &mut self.other,
        }
    }
}
