use crate::error::{Error, Result};

use super::types::{
    AudioRendition, ByteRange, Encryption, MasterPlaylist, MediaPlaylist, Playlist, Segment, Variant,
};
use super::util::{extract_attr_str, extract_attr_u64, parse_byte_range, parse_resolution, resolve_url};

/// The encryption context currently in force while scanning a media
/// playlist. Lives only for the duration of `parse`; segments are stamped
/// with an owned [`Encryption`] and the fetcher never sees this type.
enum ActiveKey {
    None,
    Aes128 { key_uri: String, iv: Option<[u8; 16]> },
    Unsupported(String),
}

/// Parses an M3U8 document fetched from `base_url` into either a
/// [`MasterPlaylist`] or a [`MediaPlaylist`]. URIs in the result are
/// resolved against `base_url`.
pub fn parse_playlist(text: &str, base_url: &str) -> Result<Playlist> {
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

    if lines.first().copied() != Some("#EXTM3U") {
        return Err(Error::Parse("missing #EXTM3U header".into()));
    }

    let is_master = lines.iter().any(|l| l.starts_with("#EXT-X-STREAM-INF"));

    if is_master {
        parse_master(&lines, base_url).map(Playlist::Master)
    } else {
        parse_media(&lines, base_url).map(Playlist::Media)
    }
}

fn parse_master(lines: &[&str], base_url: &str) -> Result<MasterPlaylist> {
    let mut variants = Vec::new();
    let mut audio_renditions = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        if line.starts_with("#EXT-X-STREAM-INF") {
            let bandwidth = extract_attr_u64(line, "BANDWIDTH").unwrap_or(0);
            let resolution = extract_attr_str(line, "RESOLUTION")
                .and_then(|v| parse_resolution(&v))
                .map(|(width, height)| super::types::Resolution { width, height });
            let codecs = extract_attr_str(line, "CODECS");
            let audio_group = extract_attr_str(line, "AUDIO");

            let mut j = i + 1;
            while j < lines.len() && lines[j].starts_with('#') {
                j += 1;
            }
            if j >= lines.len() {
                return Err(Error::Parse("#EXT-X-STREAM-INF not followed by a URI".into()));
            }
            variants.push(Variant {
                uri: resolve_url(base_url, lines[j]),
                bandwidth,
                resolution,
                codecs,
                audio_group,
            });
            i = j + 1;
        } else {
            if line.starts_with("#EXT-X-MEDIA:") && extract_attr_str(line, "TYPE").as_deref() == Some("AUDIO") {
                if let Some(group_id) = extract_attr_str(line, "GROUP-ID") {
                    let uri = extract_attr_str(line, "URI").map(|u| resolve_url(base_url, &u));
                    let is_default =
                        extract_attr_str(line, "DEFAULT").map(|v| v.eq_ignore_ascii_case("YES")).unwrap_or(false);
                    audio_renditions.push(AudioRendition {
                        group_id,
                        name: extract_attr_str(line, "NAME"),
                        uri,
                        is_default,
                    });
                }
            }
            i += 1;
        }
    }

    Ok(MasterPlaylist { variants, audio_renditions })
}

fn parse_media(lines: &[&str], base_url: &str) -> Result<MediaPlaylist> {
    let mut playlist = MediaPlaylist::default();
    let mut active = ActiveKey::None;
    let mut pending_range: Option<ByteRange> = None;
    let mut next_offset: u64 = 0;

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];

        if let Some(rest) = line.strip_prefix("#EXT-X-VERSION:") {
            playlist.version = rest.trim().parse().ok();
        } else if let Some(rest) = line.strip_prefix("#EXT-X-TARGETDURATION:") {
            playlist.target_duration = rest.trim().parse().unwrap_or(0);
        } else if let Some(rest) = line.strip_prefix("#EXT-X-MEDIA-SEQUENCE:") {
            if playlist.segments.is_empty() {
                playlist.media_sequence = rest.trim().parse().unwrap_or(0);
            }
        } else if line.starts_with("#EXT-X-ENDLIST") {
            playlist.end_list = true;
        } else if line.starts_with("#EXT-X-KEY") {
            let method = extract_attr_str(line, "METHOD").unwrap_or_default();
            match method.as_str() {
                "NONE" => active = ActiveKey::None,
                "AES-128" => {
                    let key_uri = extract_attr_str(line, "URI")
                        .ok_or_else(|| Error::Parse("EXT-X-KEY AES-128 missing URI".into()))?;
                    let key_uri = resolve_url(base_url, &key_uri);
                    let iv = extract_attr_str(line, "IV").and_then(|v| parse_iv(&v));
                    active = ActiveKey::Aes128 { key_uri, iv };
                }
                other => active = ActiveKey::Unsupported(other.to_string()),
            }
        } else if line.starts_with("#EXT-X-BYTERANGE:") {
            let r = parse_byte_range(&line["#EXT-X-BYTERANGE:".len()..], next_offset);
            next_offset = r.offset + r.length;
            pending_range = Some(r);
        } else if let Some(rest) = line.strip_prefix("#EXTINF:") {
            let duration = rest
                .split(',')
                .next()
                .and_then(|d| d.trim().parse::<f64>().ok())
                .unwrap_or(0.0);

            let mut j = i + 1;
            while j < lines.len() && lines[j].starts_with('#') {
                if let Some(br) = lines[j].strip_prefix("#EXT-X-BYTERANGE:") {
                    let r = parse_byte_range(br, next_offset);
                    next_offset = r.offset + r.length;
                    pending_range = Some(r);
                }
                j += 1;
            }
            if j >= lines.len() {
                return Err(Error::Parse("#EXTINF not followed by a URI".into()));
            }

            let encryption = match &active {
                ActiveKey::None => Encryption::None,
                ActiveKey::Aes128 { key_uri, iv } => Encryption::Aes128 {
                    key_uri: key_uri.clone(),
                    iv: *iv,
                },
                ActiveKey::Unsupported(method) => {
                    return Err(Error::UnsupportedEncryption(method.clone()));
                }
            };

            let index = playlist.segments.len();
            playlist.segments.push(Segment {
                index,
                absolute_index: playlist.media_sequence + index as u64,
                uri: resolve_url(base_url, lines[j]),
                duration,
                byte_range: pending_range.take(),
                encryption,
            });
            i = j + 1;
            continue;
        }

        i += 1;
    }

    Ok(playlist)
}

/// Parses `IV=0x...` (or without the `0x` prefix) into 16 bytes.
fn parse_iv(value: &str) -> Option<[u8; 16]> {
    let hex_str = value.trim_start_matches("0x").trim_start_matches("0X");
    let bytes = hex::decode(hex_str).ok()?;
    if bytes.len() != 16 {
        return None;
    }
    let mut iv = [0u8; 16];
    iv.copy_from_slice(&bytes);
    Some(iv)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://cdn.example.com/video/index.m3u8";

    #[test]
    fn rejects_missing_header() {
        let err = parse_playlist("#EXTINF:1,\nseg.ts\n", BASE).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn parses_master_playlist_variants() {
        let text = "#EXTM3U\n\
            #EXT-X-STREAM-INF:BANDWIDTH=500000,RESOLUTION=426x240\n\
            low.m3u8\n\
            #EXT-X-STREAM-INF:BANDWIDTH=1500000,RESOLUTION=1280x720,CODECS=\"avc1.4d401f\"\n\
            mid.m3u8\n\
            #EXT-X-STREAM-INF:BANDWIDTH=3000000,RESOLUTION=1920x1080\n\
            high.m3u8\n";
        let playlist = parse_playlist(text, BASE).unwrap();
        let Playlist::Master(master) = playlist else { panic!("expected master") };
        assert_eq!(master.variants.len(), 3);
        assert_eq!(master.variants[1].bandwidth, 1_500_000);
        assert_eq!(
            master.variants[1].resolution,
            Some(super::super::types::Resolution { width: 1280, height: 720 })
        );
        assert_eq!(master.variants[1].uri, "https://cdn.example.com/video/mid.m3u8");
        assert_eq!(master.variants[1].codecs.as_deref(), Some("avc1.4d401f"));
    }

    #[test]
    fn parses_media_playlist_with_implicit_iv_key() {
        let text = "#EXTM3U\n\
            #EXT-X-VERSION:3\n\
            #EXT-X-TARGETDURATION:10\n\
            #EXT-X-MEDIA-SEQUENCE:5\n\
            #EXT-X-KEY:METHOD=AES-128,URI=\"k.key\"\n\
            #EXTINF:9.009,\n\
            seg0.ts\n\
            #EXTINF:9.009,\n\
            seg1.ts\n\
            #EXT-X-KEY:METHOD=NONE\n\
            #EXTINF:9.009,\n\
            seg2.ts\n\
            #EXT-X-ENDLIST\n";
        let playlist = parse_playlist(text, BASE).unwrap();
        let Playlist::Media(media) = playlist else { panic!("expected media") };
        assert_eq!(media.media_sequence, 5);
        assert!(media.end_list);
        assert_eq!(media.segments.len(), 3);
        assert_eq!(media.segments[0].absolute_index, 5);
        assert_eq!(media.segments[1].absolute_index, 6);
        match &media.segments[0].encryption {
            Encryption::Aes128 { key_uri, iv } => {
                assert_eq!(key_uri, "https://cdn.example.com/video/k.key");
                assert_eq!(*iv, None);
            }
            _ => panic!("expected Aes128"),
        }
        assert_eq!(media.segments[2].encryption, Encryption::None);
    }

    #[test]
    fn byte_range_offset_defaults_to_previous_end() {
        let text = "#EXTM3U\n\
            #EXT-X-BYTERANGE:1000@0\n\
            #EXTINF:2,\n\
            seg.ts\n\
            #EXT-X-BYTERANGE:500\n\
            #EXTINF:2,\n\
            seg.ts\n";
        let playlist = parse_playlist(text, BASE).unwrap();
        let Playlist::Media(media) = playlist else { panic!("expected media") };
        assert_eq!(media.segments[0].byte_range, Some(ByteRange { length: 1000, offset: 0 }));
        assert_eq!(media.segments[1].byte_range, Some(ByteRange { length: 500, offset: 1000 }));
    }

    #[test]
    fn records_alternate_audio_groups_without_requiring_them() {
        let text = "#EXTM3U\n\
            #EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID=\"aac\",NAME=\"English\",DEFAULT=YES,URI=\"audio/en.m3u8\"\n\
            #EXT-X-STREAM-INF:BANDWIDTH=1500000,RESOLUTION=1280x720,AUDIO=\"aac\"\n\
            mid.m3u8\n";
        let playlist = parse_playlist(text, BASE).unwrap();
        let Playlist::Master(master) = playlist else { panic!("expected master") };
        assert_eq!(master.variants[0].audio_group.as_deref(), Some("aac"));
        assert_eq!(master.audio_renditions.len(), 1);
        let rendition = &master.audio_renditions[0];
        assert_eq!(rendition.group_id, "aac");
        assert_eq!(rendition.name.as_deref(), Some("English"));
        assert!(rendition.is_default);
        assert_eq!(rendition.uri.as_deref(), Some("https://cdn.example.com/video/audio/en.m3u8"));
    }

    #[test]
    fn unsupported_method_errors_only_once_a_segment_follows() {
        let text_ok = "#EXTM3U\n#EXT-X-KEY:METHOD=SAMPLE-AES,URI=\"k.key\"\n#EXT-X-ENDLIST\n";
        assert!(parse_playlist(text_ok, BASE).is_ok());

        let text_fail = "#EXTM3U\n#EXT-X-KEY:METHOD=SAMPLE-AES,URI=\"k.key\"\n#EXTINF:1,\nseg.ts\n";
        let err = parse_playlist(text_fail, BASE).unwrap_err();
        assert!(matches!(err, Error::UnsupportedEncryption(m) if m == "SAMPLE-AES"));
    }
}
