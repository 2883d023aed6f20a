/// A parsed audio MIME type such as `audio/L16;codec=pcm;rate=24000`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioMime {
    /// Top-level type, lowercased ("audio")
    pub media_type: String,
    /// Subtype as written ("L16", "mpeg")
    pub subtype: String,
    /// Parameters in order, names lowercased
    pub params: Vec<(String, String)>,
}

impl AudioMime {
    pub fn parse(mime_type: &str) -> Self {
        let mut segments = mime_type.split(';');
        let essence = segments.next().unwrap_or_default().trim();
        let (media_type, subtype) = essence.split_once('/').unwrap_or(("audio", essence));

        let params = segments
            .filter_map(|segment| {
                let (name, value) = segment.split_once('=')?;
                let name = name.trim().to_lowercase();
                let value = value.trim().trim_matches('"').to_string();
                (!name.is_empty()).then_some((name, value))
            })
            .collect();

        Self {
            media_type: media_type.trim().to_lowercase(),
            subtype: subtype.trim().to_string(),
            params,
        }
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// File extension for recognized container subtypes.
    pub fn container_extension(&self) -> Option<&'static str> {
        match self.subtype.to_lowercase().as_str() {
            "wav" | "x-wav" => Some("wav"),
            "mpeg" => Some("mp3"),
            "ogg" => Some("ogg"),
            "webm" => Some("webm"),
            _ => None,
        }
    }

    /// Bits per sample from an `L<bits>` linear-PCM subtype.
    pub fn pcm_bits(&self) -> Option<u16> {
        let digits = self
            .subtype
            .strip_prefix('L')
            .or_else(|| self.subtype.strip_prefix('l'))?;
        digits.parse::<u16>().ok().filter(|bits| *bits > 0 && bits % 8 == 0)
    }
}

/// Extension for a MIME type when it names a recognized container.
pub fn extension_for_mime(mime_type: &str) -> Option<&'static str> {
    AudioMime::parse(mime_type).container_extension()
}
