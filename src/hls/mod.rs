//! The HLS acquisition pipeline: parse playlists, pick a variant, fetch
//! segments under bounded concurrency, and decrypt them transparently.

pub mod crypto;
pub mod fetcher;
pub mod keycache;
pub mod parser;
pub mod scheduler;
pub mod selector;
pub mod types;
pub mod util;

pub use keycache::KeyCache;
pub use scheduler::{SchedulerOutcome, download_segments};
pub use selector::{Preference, select_variant};
pub use types::{
    AudioRendition, ByteRange, Encryption, MasterPlaylist, MediaPlaylist, Playlist, Resolution, Segment,
    Variant,
};
