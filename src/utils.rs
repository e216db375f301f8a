use url::Url;

/// Format whole seconds as `HH:MM:SS`, or `MM:SS` when under an hour.
pub fn format_seconds(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// Parse `HH:MM:SS` or `MM:SS` back into seconds. Malformed input yields 0.
pub fn parse_time_to_seconds(time: &str) -> u64 {
    let parts: Vec<u64> = time
        .split(':')
        .map(|p| p.trim().parse().unwrap_or(0))
        .collect();

    match parts.as_slice() {
        [hours, minutes, seconds] => hours * 3600 + minutes * 60 + seconds,
        [minutes, seconds] => minutes * 60 + seconds,
        _ => 0,
    }
}

/// Extract the video id from the YouTube URL forms we accept:
/// `watch?v=`, `youtu.be/`, `embed/` and `v/`.
pub fn extract_youtube_id(input: &str) -> Option<String> {
    let parsed = Url::parse(input).ok()?;
    let host = parsed.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);

    let id = match host {
        "youtu.be" => parsed.path_segments()?.next().map(str::to_string),
        "youtube.com" | "m.youtube.com" => {
            let mut segments = parsed.path_segments()?;
            match segments.next() {
                Some("watch") => parsed
                    .query_pairs()
                    .find(|(key, _)| key == "v")
                    .map(|(_, value)| value.into_owned()),
                Some("embed") | Some("v") => segments.next().map(str::to_string),
                _ => None,
            }
        }
        _ => None,
    };

    id.filter(|id| !id.is_empty())
}
