//! # Media Extraction
//!
//! Turns platform media descriptors into deliverable references.

use relay_types::{MediaAttachment, MediaItem, MediaKind};

/// The platform's standard video encoding; other variants (streaming
/// manifests, webm) are not deliverable.
const STANDARD_VIDEO_ENCODING: &str = "video/mp4";

/// Extract deliverable media from a post's attachments.
///
/// Photos pass through at original resolution. Videos select the qualifying
/// variant with the strictly highest declared bitrate; an element with no
/// qualifying variant is dropped rather than forwarded with an empty URL.
#[must_use]
pub fn extract_media(attachments: &[MediaAttachment]) -> Vec<MediaItem> {
    let mut media = Vec::new();
    for attachment in attachments {
        match attachment.kind {
            MediaKind::Photo => media.push(MediaItem::Photo {
                url: attachment.preview_url.clone(),
            }),
            MediaKind::Video => {
                let url = best_video_url(attachment);
                if !url.is_empty() {
                    media.push(MediaItem::Video {
                        url,
                        thumbnail_url: attachment.preview_url.clone(),
                    });
                }
            }
            MediaKind::Other => {}
        }
    }
    media
}

/// URL of the highest-bitrate standard-encoding variant, or empty when none
/// qualifies. A variant only replaces the selection when its bitrate exceeds
/// the best seen so far.
fn best_video_url(attachment: &MediaAttachment) -> String {
    let mut best_bitrate = 0u64;
    let mut url = String::new();
    for variant in &attachment.variants {
        if variant.content_type != STANDARD_VIDEO_ENCODING {
            continue;
        }
        let bitrate = variant.bitrate.unwrap_or(0);
        if bitrate > best_bitrate {
            best_bitrate = bitrate;
            url = variant.url.clone();
        }
    }
    url
}
