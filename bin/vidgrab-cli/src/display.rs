//! Human-readable rendering of metadata and history.

use std::path::PathBuf;

use chrono::{DateTime, Local};
use vidgrab_core::{HistoryItem, MediaMetadata, MediaSelection};

/// Characters that are not allowed in file names on at least one platform.
const FORBIDDEN: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Make a media title usable as a file name.
pub fn sanitize_filename(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| if FORBIDDEN.contains(&c) || c.is_control() { '_' } else { c })
        .collect();
    let trimmed = cleaned.trim().trim_matches('.').trim();
    if trimmed.is_empty() {
        "download".to_owned()
    } else {
        trimmed.chars().take(180).collect()
    }
}

/// `<title>.<audio container>` for audio, `<title>.mp4` otherwise.
pub fn default_output(title: &str, selection: &MediaSelection) -> PathBuf {
    let ext = selection.audio_container().unwrap_or("mp4");
    PathBuf::from(format!("{}.{ext}", sanitize_filename(title)))
}

pub fn format_file_size(bytes: Option<u64>) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let Some(bytes) = bytes.filter(|b| *b > 0) else {
        return "Unknown size".to_owned();
    };
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded} {}", UNITS[unit])
}

pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let (hours, minutes, secs) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

pub fn format_view_count(count: u64) -> String {
    if count >= 1_000_000 {
        format!("{:.1}M", count as f64 / 1_000_000.0)
    } else if count >= 1_000 {
        format!("{:.1}K", count as f64 / 1_000.0)
    } else {
        count.to_string()
    }
}

pub fn render_metadata(meta: &MediaMetadata) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", meta.title));
    out.push_str(&format!("  platform:  {}\n", meta.platform));
    if let Some(uploader) = &meta.uploader {
        out.push_str(&format!("  uploader:  {uploader}\n"));
    }
    if let Some(duration) = meta.duration {
        out.push_str(&format!("  duration:  {}\n", format_duration(duration)));
    }
    if let Some(views) = meta.view_count {
        out.push_str(&format!("  views:     {}\n", format_view_count(views)));
    }
    if let Some(thumbnail) = &meta.thumbnail {
        out.push_str(&format!("  thumbnail: {thumbnail}\n"));
    }

    if meta.formats.is_empty() {
        out.push_str("\nNo downloadable formats reported.\n");
        return out;
    }

    out.push_str(&format!("\n  {:<12} {:<6} {:<8} {:<14} {}\n", "FORMAT", "EXT", "QUALITY", "SIZE", "NOTE"));
    for f in &meta.formats {
        out.push_str(&format!(
            "  {:<12} {:<6} {:<8} {:<14} {}\n",
            f.format_id,
            f.ext,
            f.quality.to_string(),
            format_file_size(f.filesize),
            f.format_note.as_deref().unwrap_or(""),
        ));
    }
    out
}

pub fn render_history(items: &[HistoryItem]) -> String {
    if items.is_empty() {
        return "No download history yet\n".to_owned();
    }
    let mut out = String::new();
    for item in items {
        let when = DateTime::from_timestamp_millis(item.timestamp)
            .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_owned());
        out.push_str(&format!(
            "{}  {}  [{}] {} ({})\n    {}\n",
            item.id, when, item.platform, item.title, item.format, item.url
        ));
    }
    out
}

#[cfg(test)]
mod test {
    use vidgrab_core::{FormatDescriptor, Platform, Quality};

    use super::*;

    #[test]
    fn sanitizes_path_separators() {
        assert_eq!(sanitize_filename("AC/DC: Live?"), "AC_DC_ Live_");
        assert_eq!(sanitize_filename("  ...  "), "download");
        assert_eq!(sanitize_filename("Rick Astley - Never Gonna"), "Rick Astley - Never Gonna");
    }

    #[test]
    fn output_extension_follows_mode() {
        assert_eq!(default_output("Song", &MediaSelection::AudioOnly), PathBuf::from("Song.mp3"));
        assert_eq!(
            default_output("Clip", &MediaSelection::Format("22".into())),
            PathBuf::from("Clip.mp4")
        );
    }

    #[test]
    fn file_sizes() {
        assert_eq!(format_file_size(None), "Unknown size");
        assert_eq!(format_file_size(Some(0)), "Unknown size");
        assert_eq!(format_file_size(Some(512)), "512 Bytes");
        assert_eq!(format_file_size(Some(1536)), "1.5 KB");
        assert_eq!(format_file_size(Some(5 * 1024 * 1024)), "5 MB");
    }

    #[test]
    fn durations_and_views() {
        assert_eq!(format_duration(212.0), "3:32");
        assert_eq!(format_duration(3725.4), "1:02:05");
        assert_eq!(format_view_count(999), "999");
        assert_eq!(format_view_count(1_500), "1.5K");
        assert_eq!(format_view_count(2_345_678), "2.3M");
    }

    #[test]
    fn metadata_table_lists_formats_in_order() {
        let meta = MediaMetadata {
            title: "Demo".into(),
            thumbnail: None,
            duration: Some(61.0),
            uploader: Some("someone".into()),
            platform: Platform::YouTube,
            description: None,
            view_count: None,
            upload_date: None,
            webpage_url: None,
            formats: vec![
                FormatDescriptor {
                    format_id: "22".into(),
                    ext: "mp4".into(),
                    quality: Quality::Numeric(720),
                    filesize: None,
                    acodec: "mp4a".into(),
                    vcodec: "avc1".into(),
                    format_note: None,
                },
                FormatDescriptor {
                    format_id: "140".into(),
                    ext: "m4a".into(),
                    quality: Quality::AudioOnly,
                    filesize: Some(2048),
                    acodec: "mp4a".into(),
                    vcodec: "none".into(),
                    format_note: Some("medium".into()),
                },
            ],
        };
        let text = render_metadata(&meta);
        assert!(text.contains("platform:  YouTube"));
        assert!(text.contains("duration:  1:01"));
        let hd = text.find("720p").unwrap();
        let audio = text.find("audio").unwrap();
        assert!(hd < audio);
    }

    #[test]
    fn empty_history_message() {
        assert_eq!(render_history(&[]), "No download history yet\n");
    }
}
