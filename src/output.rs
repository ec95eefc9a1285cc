//! CLI output formatting.
//!
//! # Entity Display Contract
//!
//! Every record follows the same two-level pattern:
//!
//! 1. **Header line**: short id, kind and title (or post URL), plus flags
//! 2. **Context lines**: indented `Image:`, `Crop:`, `Uploaded:` details
//!
//! ```text
//! 3f2a9c1e picture "Sunset" [cropped]
//!     Image: orig.jpg 2000x1000
//!     Crop: 0,0 1800x900 → crop.jpg
//!     Top crop: 333,0 1333x1000
//!     Uploaded: 2024-05-01 18:22 by anonymous
//! ```
//!
//! # Architecture
//!
//! Each entity has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::feed::{FeedItem, PostDto};
use crate::types::{PictureRecord, Rect, SocialPostRecord};
use chrono::{DateTime, Utc};
use uuid::Uuid;

// ============================================================================
// Shared display helpers
// ============================================================================

/// First block of the UUID, enough to tell records apart on screen.
fn short_id(id: Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn size(rect: Rect) -> String {
    format!("{}x{}", rect.width, rect.height)
}

fn placement(rect: Rect) -> String {
    format!("{},{} {}", rect.x, rect.y, size(rect))
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}

fn flags(disabled: bool, cropped: bool) -> String {
    let mut out = Vec::new();
    if cropped {
        out.push("cropped");
    }
    if disabled {
        out.push("disabled");
    }
    if out.is_empty() {
        String::new()
    } else {
        format!(" [{}]", out.join(", "))
    }
}

fn title_or_placeholder(title: &str) -> String {
    if title.is_empty() {
        "(untitled)".to_string()
    } else {
        format!("\"{title}\"")
    }
}

// ============================================================================
// Records
// ============================================================================

pub fn format_picture(record: &PictureRecord) -> Vec<String> {
    let mut lines = vec![format!(
        "{} picture {}{}",
        short_id(record.id),
        title_or_placeholder(&record.content.title),
        flags(record.disabled, record.use_cropped)
    )];
    let ctx = indent(1);
    lines.push(format!("{ctx}Id: {}", record.id));
    lines.push(format!(
        "{ctx}Image: {} {}",
        record.original_path,
        size(record.original_bounds)
    ));
    if !record.cropped_path.is_empty() {
        lines.push(format!(
            "{ctx}Crop: {} → {}",
            placement(record.cropped_bounds),
            record.cropped_path
        ));
    }
    if !record.top_crop.is_empty() {
        lines.push(format!("{ctx}Top crop: {}", placement(record.top_crop)));
    }
    if !record.content.text.is_empty() {
        lines.push(format!("{ctx}Text: {}", record.content.text));
    }
    lines.push(format!(
        "{ctx}Uploaded: {} by {}",
        timestamp(record.uploaded),
        record.uploader
    ));
    lines
}

pub fn print_picture(record: &PictureRecord) {
    for line in format_picture(record) {
        println!("{line}");
    }
}

pub fn format_post(record: &SocialPostRecord) -> Vec<String> {
    let mut lines = vec![format!(
        "{} social_post {}{}",
        short_id(record.id),
        record.post_url,
        flags(record.disabled, false)
    )];
    let ctx = indent(1);
    lines.push(format!("{ctx}Id: {}", record.id));
    lines.push(format!(
        "{ctx}Thumbnail: {} {}",
        record.thumbnail_path,
        size(record.thumbnail_bounds)
    ));
    if !record.data.author_name.is_empty() {
        lines.push(format!("{ctx}Author: {}", record.data.author_name));
    }
    lines.push(format!(
        "{ctx}Linked: {} by {}",
        timestamp(record.uploaded),
        record.uploader
    ));
    lines
}

pub fn print_post(record: &SocialPostRecord) {
    for line in format_post(record) {
        println!("{line}");
    }
}

// ============================================================================
// Views
// ============================================================================

/// One line per record, as shown by `list`.
pub fn format_post_list(posts: &[PostDto]) -> Vec<String> {
    let mut lines: Vec<String> = posts
        .iter()
        .map(|post| match post {
            PostDto::Picture(p) => format!(
                "{} picture {} {}x{}{}",
                short_id(p.id),
                title_or_placeholder(&p.title),
                p.width,
                p.height,
                flags(p.disabled, p.use_cropped)
            ),
            PostDto::SocialPost(p) => format!(
                "{} social_post {}{}",
                short_id(p.id),
                p.post_url,
                flags(p.disabled, false)
            ),
        })
        .collect();
    lines.push(summary(posts.len(), "record"));
    lines
}

/// One line per wall tile, as shown by `feed`.
pub fn format_feed(items: &[FeedItem]) -> Vec<String> {
    let mut lines: Vec<String> = items
        .iter()
        .map(|item| match item {
            FeedItem::Picture {
                url, width, height, ..
            }
            | FeedItem::SocialPost {
                url, width, height, ..
            } => format!("{url} ({width}x{height})"),
        })
        .collect();
    lines.push(summary(items.len(), "item"));
    lines
}

fn summary(count: usize, noun: &str) -> String {
    let plural = if count == 1 { "" } else { "s" };
    format!("{count} {noun}{plural}")
}

pub fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Content, EmbedData};

    fn picture() -> PictureRecord {
        let mut record = PictureRecord::new(
            Uuid::parse_str("3f2a9c1e-0000-4000-8000-000000000000").unwrap(),
            Content {
                title: "Sunset".into(),
                text: String::new(),
            },
            Rect::from_size(2000, 1000),
            "orig.jpg",
            "thumb.jpg",
        );
        record.top_crop = Rect::new(333, 0, 1333, 1000);
        record
    }

    #[test]
    fn picture_header_and_context() {
        let lines = format_picture(&picture());
        assert_eq!(lines[0], "3f2a9c1e picture \"Sunset\"");
        assert!(lines.contains(&"    Image: orig.jpg 2000x1000".to_string()));
        assert!(lines.contains(&"    Top crop: 333,0 1333x1000".to_string()));
        assert!(!lines.iter().any(|l| l.contains("Crop:") && !l.contains("Top")));
    }

    #[test]
    fn picture_flags_and_crop_line() {
        let mut record = picture();
        record.use_cropped = true;
        record.disabled = true;
        record.cropped_bounds = Rect::new(0, 0, 1800, 900);
        record.cropped_path = "crop.jpg".into();

        let lines = format_picture(&record);
        assert!(lines[0].ends_with("[cropped, disabled]"));
        assert!(lines.contains(&"    Crop: 0,0 1800x900 → crop.jpg".to_string()));
    }

    #[test]
    fn untitled_picture_has_placeholder() {
        let mut record = picture();
        record.content.title.clear();
        assert!(format_picture(&record)[0].contains("(untitled)"));
    }

    #[test]
    fn post_shows_url_and_author() {
        let now = Utc::now();
        let record = SocialPostRecord {
            id: Uuid::nil(),
            disabled: false,
            post_url: "https://www.instagram.com/someone/abc".into(),
            thumbnail_path: "thumb.jpg".into(),
            thumbnail_bounds: Rect::from_size(640, 640),
            uploaded: now,
            edited: now,
            uploader: "anonymous".into(),
            data: EmbedData {
                author_name: "someone".into(),
                ..EmbedData::default()
            },
        };
        let lines = format_post(&record);
        assert_eq!(
            lines[0],
            "00000000 social_post https://www.instagram.com/someone/abc"
        );
        assert!(lines.contains(&"    Author: someone".to_string()));
    }

    #[test]
    fn feed_lines_end_with_count() {
        let items = vec![FeedItem::Picture {
            id: Uuid::nil(),
            url: "/pictures/x/orig.png".into(),
            width: 10,
            height: 5,
            title: String::new(),
            text: String::new(),
        }];
        assert_eq!(
            format_feed(&items),
            vec!["/pictures/x/orig.png (10x5)".to_string(), "1 item".to_string()]
        );
        assert_eq!(format_feed(&[]), vec!["0 items".to_string()]);
    }
}
