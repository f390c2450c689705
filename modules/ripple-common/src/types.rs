use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RippleError};

pub type PostId = i64;
pub type ThreadId = i64;
pub type UserId = i64;
pub type Timestamp = DateTime<Utc>;

// ---------------------------------------------------------------------------
// Corpus records
// ---------------------------------------------------------------------------

/// A single forum post as returned by the post source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub post_id: PostId,
    pub thread_id: ThreadId,
    pub user_id: UserId,
    pub timestamp: Timestamp,
}

impl Post {
    pub fn new(post_id: PostId, thread_id: ThreadId, user_id: UserId, timestamp: Timestamp) -> Self {
        Self {
            post_id,
            thread_id,
            user_id,
            timestamp,
        }
    }
}

/// The two temporal windows that drive every influence query.
///
/// `t_fos` (forgettability) bounds how old an in-thread post may be and still
/// influence a later post. `t_sus` (susceptibility) bounds the cross-thread gap
/// that proves an influencer was active toward the follower.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InfluenceWindows {
    pub t_sus: Duration,
    pub t_fos: Duration,
}

impl InfluenceWindows {
    pub fn new(t_sus: Duration, t_fos: Duration) -> Self {
        Self { t_sus, t_fos }
    }

    /// Panics when a value is outside `Duration`'s range; configs go through
    /// [`InfluenceWindows::try_from_days`].
    pub fn from_days(t_sus_days: i64, t_fos_days: i64) -> Self {
        Self::new(Duration::days(t_sus_days), Duration::days(t_fos_days))
    }

    pub fn try_from_days(t_sus_days: i64, t_fos_days: i64) -> Result<Self> {
        Ok(Self::new(window_days(t_sus_days)?, window_days(t_fos_days)?))
    }
}

fn window_days(days: i64) -> Result<Duration> {
    Duration::try_days(days).ok_or_else(|| {
        RippleError::Config(format!("windows: {days} days is out of range"))
    })
}

// ---------------------------------------------------------------------------
// Samples
// ---------------------------------------------------------------------------

/// Class of a sampled record. Serialized as `1` (adopter) / `0` (control).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Label {
    Control,
    Adopter,
}

impl Label {
    pub fn value(self) -> u8 {
        match self {
            Label::Control => 0,
            Label::Adopter => 1,
        }
    }
}

impl From<Label> for u8 {
    fn from(label: Label) -> u8 {
        label.value()
    }
}

impl TryFrom<u8> for Label {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(Label::Control),
            1 => Ok(Label::Adopter),
            other => Err(format!("label must be 0 or 1, got {other}")),
        }
    }
}

/// One labeled record produced by the pair sampler.
///
/// Controls reuse the adopter's `post_id` and `timestamp`: they describe the
/// moment the control user *could* have joined the thread and didn't.
/// The `v1_*` columns identify the shared anchor influencer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub thread_id: ThreadId,
    pub post_id: PostId,
    pub user_id: UserId,
    pub timestamp: Timestamp,
    pub v1_post_id: PostId,
    pub v1_user_id: UserId,
    pub v1_timestamp: Timestamp,
    pub label: Label,
}

/// Diagnostic row: how many qualifying negatives one adopter had.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegativeCount {
    pub user_id: UserId,
    pub post_id: PostId,
    pub negatives_count: usize,
}
