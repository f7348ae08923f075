//! Small parsing/formatting helpers shared by the resolver: duration strings
//! and the short view-count form shown next to search results.

/// Parses a provider-formatted duration string into whole seconds.
///
/// Accepts `H:MM:SS`, `MM:SS`, and bare `SS`. Unparseable segments count as
/// zero, so garbage degrades to `0` rather than failing the whole track.
pub fn to_seconds(duration: &str) -> u64 {
    duration
        .split(':')
        .map(|part| part.trim().parse::<u64>().unwrap_or(0))
        .fold(0, |total, part| total * 60 + part)
}

/// Formats whole seconds back into the provider's display shape:
/// `H:MM:SS` above an hour, `M:SS` below.
pub fn duration_label(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Renders a count in the upstream's short display form: `987`, `1.2K`,
/// `4.5M`, `1.1B`. One decimal, with a trailing `.0` dropped.
pub fn short_count(count: u64) -> String {
    const STEPS: [(u64, &str); 3] = [
        (1_000_000_000, "B"),
        (1_000_000, "M"),
        (1_000, "K"),
    ];

    for (scale, suffix) in STEPS {
        if count >= scale {
            let scaled = count as f64 / scale as f64;
            let rendered = format!("{:.1}", scaled);
            let rendered = rendered.strip_suffix(".0").unwrap_or(&rendered);
            return format!("{}{}", rendered, suffix);
        }
    }
    count.to_string()
}

/// The full "short view count" string as the upstream renders it.
pub fn short_views(count: u64) -> String {
    format!("{} views", short_count(count))
}
