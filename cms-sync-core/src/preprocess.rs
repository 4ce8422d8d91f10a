//! Tolerant parsers turning operator-authored text into content entities.
//!
//! Both parsers are pure: no I/O, no hidden state, and no input makes them fail.
//! Unknown lines are ignored and every missing field keeps its default.
//!
//! Post layout:
//!
//! ```text
//! Title: Ahri cosplay progress
//! Date: 2024-01-01
//! Tags: wig, armor
//! ---
//! Body line one
//! Body line two
//! ```
//!
//! No HTML escaping happens anywhere: document and description text is trusted.

use tracing::debug;

use crate::contract::{BlogPost, CosplayAlbum};

/// Line that ends the header block of a post.
pub const POST_SEPARATOR: &str = "---";

/// Size hint appended to every photo base URL.
pub const IMAGE_SIZE_SUFFIX: &str = "=w1920-h1080";

/// Delimiter between character and series in an album title.
pub const TITLE_DELIMITER: char = '|';

/// Parse a document into a [`BlogPost`].
///
/// Single forward pass. Header lines are trimmed and matched against the known
/// keys until a `---` line switches to body mode; body lines are kept verbatim.
/// Without a separator the whole text becomes the HTML content unchanged.
pub fn parse_blog_post(id: &str, raw: &str) -> BlogPost {
    let mut post = BlogPost::new(id);
    let mut body_lines: Vec<&str> = Vec::new();
    let mut in_body = false;

    for line in raw.split('\n') {
        if in_body {
            body_lines.push(line);
            continue;
        }

        let trimmed = line.trim();
        if trimmed == POST_SEPARATOR {
            in_body = true;
        } else if let Some(value) = header_value(trimmed, "Title:") {
            post.title = value;
        } else if let Some(value) = header_value(trimmed, "Date:") {
            post.date = value;
        } else if let Some(value) = header_value(trimmed, "Type:") {
            post.kind = value;
        } else if let Some(value) = header_value(trimmed, "Image:") {
            post.image_url = value;
        } else if let Some(value) = header_value(trimmed, "Summary:") {
            post.summary = value;
        } else if let Some(raw_tags) = trimmed.strip_prefix("Tags:") {
            // Empty segments are kept.
            post.tags
                .extend(raw_tags.split(',').map(|tag| tag.trim().to_string()));
        }
    }

    // Body lines only exist after a separator, so this is the "no separator" case.
    post.html_content = if !in_body && body_lines.is_empty() {
        raw.to_string()
    } else {
        paragraphs(&body_lines)
    };

    debug!(
        id = %post.id,
        title = %post.title,
        tags = post.tags.len(),
        body_lines = body_lines.len(),
        separator_found = in_body,
        "Parsed blog post"
    );
    post
}

/// Split `"Character | Series"` into its first two trimmed segments.
///
/// Without a delimiter the series is empty. Segments past the second are ignored.
pub fn split_album_title(container_title: &str) -> (String, String) {
    let mut parts = container_title.split(TITLE_DELIMITER);
    let title = parts.next().unwrap_or_default().trim().to_string();
    let series = parts
        .next()
        .map(|s| s.trim().to_string())
        .unwrap_or_default();
    (title, series)
}

/// Apply the recognized `Key: value` lines of a description to `album`.
pub fn parse_album_metadata(description: &str, album: &mut CosplayAlbum) {
    for line in description.split('\n') {
        let trimmed = line.trim();
        if let Some(value) = header_value(trimmed, "Photographer:") {
            album.photographer = value;
        } else if let Some(value) = header_value(trimmed, "Assistant:") {
            album.assistant = value;
        } else if let Some(value) = header_value(trimmed, "Location:") {
            album.location = value;
        } else if let Some(value) = header_value(trimmed, "Description:") {
            album.description = value;
        }
    }
}

/// Base URL with the size hint the photo store needs for a usable image.
pub fn sized_image_url(base_url: &str) -> String {
    format!("{base_url}{IMAGE_SIZE_SUFFIX}")
}

/// Assemble a [`CosplayAlbum`] from a container's title, the description of its
/// representative item and the base URLs of its media in source order.
///
/// An empty container yields no images, no cover and empty metadata.
pub fn build_album(
    container_id: &str,
    container_title: &str,
    representative_description: &str,
    media_urls: &[String],
) -> CosplayAlbum {
    let mut album = CosplayAlbum::new(container_id);

    let (title, series) = split_album_title(container_title);
    album.title = title;
    album.series = series;

    album.images = media_urls.iter().map(|url| sized_image_url(url)).collect();
    album.cover_image = album.images.first().cloned().unwrap_or_default();

    parse_album_metadata(representative_description, &mut album);

    debug!(
        id = %album.id,
        title = %album.title,
        series = %album.series,
        images = album.images.len(),
        "Built album"
    );
    album
}

fn header_value(line: &str, key: &str) -> Option<String> {
    line.strip_prefix(key).map(|rest| rest.trim().to_string())
}

fn paragraphs(lines: &[&str]) -> String {
    lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| format!("<p>{line}</p>"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_used_verbatim() {
        let raw = "Just some words\n\nwith <b>markup</b> and no header";
        let post = parse_blog_post("doc1", raw);
        assert_eq!(post.html_content, raw);
        assert_eq!(post.title, "Untitled");
        assert_eq!(post.date, "");
        assert!(post.tags.is_empty());
        assert_eq!(post.image_url, "");
        assert_eq!(post.kind, "");
        assert_eq!(post.summary, "");
        assert_eq!(post.id, "doc1");
    }

    #[test]
    fn test_front_matter_and_body() {
        let raw = "Title: A\nDate: 2024-01-01\nTags: x, y\n---\nHello\n\nWorld";
        let post = parse_blog_post("doc2", raw);
        assert_eq!(post.title, "A");
        assert_eq!(post.date, "2024-01-01");
        assert_eq!(post.tags, vec!["x".to_string(), "y".to_string()]);
        assert_eq!(post.html_content, "<p>Hello</p><p>World</p>");
    }

    #[test]
    fn test_separator_only_gives_empty_content() {
        let post = parse_blog_post("doc3", "---");
        assert_eq!(post.html_content, "");
        assert_eq!(post.title, "Untitled");
    }

    #[test]
    fn test_metadata_and_separator_without_body() {
        let post = parse_blog_post("doc4", "Title: Only header\nSummary: short\n---\n\n   \n");
        assert_eq!(post.title, "Only header");
        assert_eq!(post.summary, "short");
        assert_eq!(post.html_content, "");
    }

    #[test]
    fn test_header_without_separator_falls_back_to_raw_text() {
        let raw = "Title: Forgot the separator\nBody text";
        let post = parse_blog_post("doc5", raw);
        assert_eq!(post.title, "Forgot the separator");
        assert_eq!(post.html_content, raw);
    }

    #[test]
    fn test_all_header_keys_and_indentation() {
        let raw = "  Title:   Spaced  \n\tType: Tutorial\nImage: https://x/y.png\nSummary: S\nrandom line\n --- \nbody";
        let post = parse_blog_post("doc6", raw);
        assert_eq!(post.title, "Spaced");
        assert_eq!(post.kind, "Tutorial");
        assert_eq!(post.image_url, "https://x/y.png");
        assert_eq!(post.summary, "S");
        assert_eq!(post.html_content, "<p>body</p>");
    }

    #[test]
    fn test_body_lines_are_verbatim_and_not_interpreted() {
        let raw = "---\n  indented <em>line</em>\nTitle: not a header\n---";
        let post = parse_blog_post("doc7", raw);
        assert_eq!(post.title, "Untitled");
        assert_eq!(
            post.html_content,
            "<p>  indented <em>line</em></p><p>Title: not a header</p><p>---</p>"
        );
    }

    #[test]
    fn test_tags_keep_empty_segments() {
        let post = parse_blog_post("doc8", "Tags: a,, b ,\n---\n");
        assert_eq!(post.tags, vec!["a", "", "b", ""]);

        let post = parse_blog_post("doc9", "Tags:\n---\n");
        assert_eq!(post.tags, vec![""]);
    }

    #[test]
    fn test_empty_title_line_overrides_default() {
        let post = parse_blog_post("doc10", "Title:\n---\nx");
        assert_eq!(post.title, "");
    }

    #[test]
    fn test_parse_is_deterministic() {
        let raw = "Title: T\nTags: a, b\n---\nline one\n\nline two\n";
        assert_eq!(parse_blog_post("d", raw), parse_blog_post("d", raw));
    }

    #[test]
    fn test_split_album_title() {
        assert_eq!(
            split_album_title("Ahri | League of Legends"),
            ("Ahri".to_string(), "League of Legends".to_string())
        );
        assert_eq!(
            split_album_title("SoloTitle"),
            ("SoloTitle".to_string(), String::new())
        );
        assert_eq!(
            split_album_title(" A | B | C "),
            ("A".to_string(), "B".to_string())
        );
        assert_eq!(split_album_title(""), (String::new(), String::new()));
    }

    #[test]
    fn test_build_album_with_media() {
        let urls = vec![
            "https://lh3/one".to_string(),
            "https://lh3/two".to_string(),
        ];
        let description = "Photographer: Kai\nAssistant: Mo\n  Location: Tokyo  \nDescription: Night shoot\nSomething else";
        let album = build_album("alb1", "Ahri | League of Legends", description, &urls);

        assert_eq!(album.id, "alb1");
        assert_eq!(album.title, "Ahri");
        assert_eq!(album.series, "League of Legends");
        assert_eq!(album.cover_image, "https://lh3/one=w1920-h1080");
        assert_eq!(
            album.images,
            vec![
                "https://lh3/one=w1920-h1080".to_string(),
                "https://lh3/two=w1920-h1080".to_string()
            ]
        );
        assert_eq!(album.photographer, "Kai");
        assert_eq!(album.assistant, "Mo");
        assert_eq!(album.location, "Tokyo");
        assert_eq!(album.description, "Night shoot");
    }

    #[test]
    fn test_build_album_empty_container() {
        let album = build_album("alb2", "Empty | Nothing", "", &[]);
        assert!(album.images.is_empty());
        assert_eq!(album.cover_image, "");
        assert_eq!(album.photographer, "");
        assert_eq!(album.description, "");
        assert_eq!(album.title, "Empty");
    }

    #[test]
    fn test_unlabelled_description_is_not_composed() {
        let album = build_album("alb3", "X", "Just a caption\nwith two lines", &[]);
        assert_eq!(album.description, "");
    }
}
