use serde::{Deserialize, Serialize};
use symphonia::core::meta::{MetadataRevision, StandardTagKey};
use symphonia::core::probe::ProbeResult;

/// Descriptive tags carried into the track's metadata file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    /// Seconds.
    pub duration: Option<f64>,
}

impl TrackTags {
    fn merge_revision(&mut self, revision: &MetadataRevision) {
        for tag in revision.tags() {
            let slot = match tag.std_key {
                Some(StandardTagKey::TrackTitle) => &mut self.title,
                Some(StandardTagKey::Artist) => &mut self.artist,
                Some(StandardTagKey::Album) => &mut self.album,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(tag.value.to_string());
            }
        }
    }
}

/// Reads tags from the container and from any metadata found while probing
/// (e.g. ID3v2 in front of an MP3 stream). Container tags win.
pub fn read_tags(probed: &mut ProbeResult) -> TrackTags {
    let mut tags = TrackTags::default();

    if let Some(revision) = probed.format.metadata().current() {
        tags.merge_revision(revision);
    }
    if let Some(metadata) = probed.metadata.get() {
        if let Some(revision) = metadata.current() {
            tags.merge_revision(revision);
        }
    }

    tags
}
