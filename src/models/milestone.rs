use serde::{Deserialize, Serialize};

/// How close an event is to starting. As the clock approaches and passes
/// the start time an event walks forward through these milestones; it
/// never moves backward while its etag stays the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Milestone {
    /// Less than five minutes out.
    Upcoming,
    /// A minute or less out.
    Imminent,
    /// The start time has passed.
    Started,
}

impl Milestone {
    /// Classify a whole-minute countdown (the floor of the remaining time).
    /// Returns `None` while the event is still five or more minutes out.
    pub fn classify(minutes_to_start: i64) -> Option<Self> {
        if minutes_to_start <= 0 {
            Some(Self::Started)
        } else if minutes_to_start <= 1 {
            Some(Self::Imminent)
        } else if minutes_to_start < 5 {
            Some(Self::Upcoming)
        } else {
            None
        }
    }

    /// Human-readable headline for a notification at this milestone.
    pub fn label(self, minutes_to_start: i64) -> String {
        match self {
            Self::Started => "Event started".to_string(),
            Self::Imminent => "Event starting now".to_string(),
            Self::Upcoming => format!("Event starting in {} minutes", minutes_to_start),
        }
    }

    pub fn clip(self) -> SoundClip {
        match self {
            Self::Upcoming => SoundClip::Upcoming,
            Self::Imminent => SoundClip::Imminent,
            Self::Started => SoundClip::Started,
        }
    }
}

/// Named sound asset for an audio cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundClip {
    Upcoming,
    Imminent,
    Started,
}
