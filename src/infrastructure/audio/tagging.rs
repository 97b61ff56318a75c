use crate::domain::pipeline::Chapter;
use id3::frame::{Chapter as ChapterFrame, Picture, PictureType, TableOfContents};
use id3::{Frame, Tag, TagLike, Version};

/// Unused byte offset marker for CHAP frames
const NO_OFFSET: u32 = u32::MAX;
const TOC_ELEMENT_ID: &str = "toc";

/// Metadata written in front of the assembled MP3 stream
#[derive(Debug, Clone, Default)]
pub struct AudiobookTags {
    pub title: String,
    pub author: String,
    pub year: Option<i32>,
    pub chapters: Vec<Chapter>,
    /// Cover image bytes and MIME type
    pub cover: Option<(Vec<u8>, String)>,
}

/// Prepend an ID3v2.4 tag with chapters, table of contents and cover art
pub fn tag_audiobook(audio: &[u8], tags: &AudiobookTags) -> Result<Vec<u8>, id3::Error> {
    let mut tag = Tag::new();
    tag.set_title(tags.title.as_str());
    tag.set_album(tags.title.as_str());
    tag.set_artist(tags.author.as_str());
    tag.set_genre("Audiobook");
    if let Some(year) = tags.year {
        tag.set_year(year);
    }

    let element_ids: Vec<String> = (0..tags.chapters.len())
        .map(|i| format!("chp{}", i))
        .collect();

    for (chapter, element_id) in tags.chapters.iter().zip(&element_ids) {
        tag.add_frame(ChapterFrame {
            element_id: element_id.clone(),
            start_time: millis_u32(chapter.start_ms),
            end_time: millis_u32(chapter.end_ms),
            start_offset: NO_OFFSET,
            end_offset: NO_OFFSET,
            frames: vec![Frame::text("TIT2", chapter.title.as_str())],
        });
    }

    if !element_ids.is_empty() {
        tag.add_frame(TableOfContents {
            element_id: TOC_ELEMENT_ID.to_string(),
            top_level: true,
            ordered: true,
            elements: element_ids,
            frames: vec![Frame::text("TIT2", tags.title.as_str())],
        });
    }

    if let Some((data, mime_type)) = &tags.cover {
        tag.add_frame(Picture {
            mime_type: mime_type.clone(),
            picture_type: PictureType::CoverFront,
            description: "Cover".to_string(),
            data: data.clone(),
        });
    }

    let mut output = Vec::with_capacity(audio.len() + 1024);
    tag.write_to(&mut output, Version::Id3v24)?;
    output.extend_from_slice(audio);
    Ok(output)
}

fn millis_u32(ms: u64) -> u32 {
    u32::try_from(ms).unwrap_or(u32::MAX)
}

/// MIME type for a cover image path, from its extension
pub fn cover_mime_type(path: &std::path::Path) -> String {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png".to_string(),
        Some("webp") => "image/webp".to_string(),
        _ => "image/jpeg".to_string(),
    }
}
