use regex::Regex;

pub mod logging;
pub mod retry;

/// A meeting-join URL found in event text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingLink {
    pub platform: String,
    pub url: String,
}

/// Scans the description and location of an event for a video-call URL.
/// Checked in priority order; Teams links are the common case in the
/// calendars this was built for. Links may arrive wrapped in angle
/// brackets, so those never count as part of the URL.
pub fn extract_meeting_link(
    description: Option<&str>,
    location: Option<&str>,
) -> Option<MeetingLink> {
    let combined_text = format!("{} {}", description.unwrap_or(""), location.unwrap_or(""));

    let patterns = [
        // Microsoft Teams
        (r"https://teams\.microsoft\.com/l/meetup-join/[^\s<>]+", "Teams"),
        (r"https://teams\.live\.com/meet/[^\s<>]+", "Teams"),
        // Google Meet
        (r"https://meet\.google\.com/[a-z][a-z-]+", "Google Meet"),
        // Zoom
        (r"https://[^\s<>]*zoom\.us/j/\d+[^\s<>]*", "Zoom"),
    ];

    for (pattern, platform) in patterns {
        if let Ok(regex) = Regex::new(pattern) {
            if let Some(found) = regex.find(&combined_text) {
                return Some(MeetingLink {
                    platform: platform.to_string(),
                    url: found.as_str().to_string(),
                });
            }
        }
    }

    None
}
