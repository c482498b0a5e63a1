use unicode_width::UnicodeWidthStr;

pub fn format_size(size: u64) -> String {
    if size < 1024 {
        format!("{} B", size)
    } else if size < 1024 * 1024 {
        format!("{:.1} KiB", size as f64 / 1024.0)
    } else if size < 1024 * 1024 * 1024 {
        format!("{:.1} MiB", size as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GiB", size as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

pub fn format_speed(bytes_per_sec: u64) -> String {
    format!("{}/s", format_size(bytes_per_sec))
}

/// Truncates a display name to `max` columns, appending an ellipsis
/// when something was cut.
pub fn truncate_name(name: &str, max: usize) -> String {
    if name.width() <= max {
        return name.to_owned();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in name.chars() {
        let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push('…');
    out
}

/// ASCII progress bar for transfer lines.
pub fn progress_bar(position: u64, size: u64, width: usize) -> String {
    let ratio = if size == 0 {
        1.0
    } else {
        (position as f64 / size as f64).min(1.0)
    };
    let filled = (ratio * width as f64).round() as usize;
    let mut bar = String::with_capacity(width + 2);
    bar.push('[');
    for i in 0..width {
        bar.push(if i < filled { '#' } else { '-' });
    }
    bar.push(']');
    format!("{} {:.1}%", bar, ratio * 100.0)
}
