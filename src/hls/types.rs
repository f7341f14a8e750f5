/// Width/height in pixels, as declared by `RESOLUTION=WxH`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// One bitrate/resolution rendition of the content, from a master playlist.
#[derive(Clone, Debug)]
pub struct Variant {
    pub uri: String,
    pub bandwidth: u64,
    pub resolution: Option<Resolution>,
    pub codecs: Option<String>,
    /// `AUDIO="..."` from `#EXT-X-STREAM-INF`, if present: the group-id of
    /// the alternate-audio renditions this variant multiplexes against.
    /// Informational only; never consulted by variant selection.
    pub audio_group: Option<String>,
}

/// One alternate rendition declared by `#EXT-X-MEDIA:TYPE=AUDIO,...`.
/// Informational only: the core never auto-selects or fetches these: a
/// variant's `audio_group` is enough for a caller to cross-reference them
/// if it wants alternate-audio awareness.
#[derive(Clone, Debug)]
pub struct AudioRendition {
    pub group_id: String,
    pub name: Option<String>,
    pub uri: Option<String>,
    pub is_default: bool,
}

/// A parsed master playlist: multiple renditions, one per URI.
#[derive(Clone, Debug, Default)]
pub struct MasterPlaylist {
    pub variants: Vec<Variant>,
    /// Alternate-audio renditions declared via `#EXT-X-MEDIA:TYPE=AUDIO`.
    /// Never required for variant selection to succeed.
    pub audio_renditions: Vec<AudioRendition>,
}

/// `length[@offset]` from `#EXT-X-BYTERANGE`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ByteRange {
    pub length: u64,
    pub offset: u64,
}

/// The encryption context in force for a segment, carried as an explicit
/// field populated once during parsing: no mutable parser state survives
/// into the fetcher.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Encryption {
    None,
    Aes128 { key_uri: String, iv: Option<[u8; 16]> },
}

/// One entry of a media playlist's segment list.
#[derive(Clone, Debug)]
pub struct Segment {
    /// 0-based position within the playlist; the primary ordering key.
    pub index: usize,
    /// `media_sequence + index`; used to derive the IV when none is given.
    pub absolute_index: u64,
    pub uri: String,
    pub duration: f64,
    pub byte_range: Option<ByteRange>,
    pub encryption: Encryption,
}

/// A parsed `#EXTINF` playlist: the actual segments of one variant.
#[derive(Clone, Debug)]
pub struct MediaPlaylist {
    pub target_duration: u64,
    pub media_sequence: u64,
    pub version: Option<u32>,
    /// `true` once `#EXT-X-ENDLIST` is seen (VOD). `false` means the
    /// playlist is a live-edge snapshot; the core downloads what is present
    /// and does not poll for growth (see Non-goals).
    pub end_list: bool,
    pub segments: Vec<Segment>,
}

impl Default for MediaPlaylist {
    fn default() -> Self {
        Self {
            target_duration: 0,
            media_sequence: 0,
            version: None,
            end_list: false,
            segments: Vec::new(),
        }
    }
}

/// The result of parsing an M3U8 document: either a master or a media
/// playlist, decided by the presence of `#EXT-X-STREAM-INF`.
#[derive(Clone, Debug)]
pub enum Playlist {
    Master(MasterPlaylist),
    Media(MediaPlaylist),
}
