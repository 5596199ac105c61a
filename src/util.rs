use std::io::Write;
use std::path::Path;

/// Write a file by writing a sibling temp file and renaming it into place.
pub fn atomic_write_str(path: &Path, content: &str) -> std::io::Result<()> {
    let tmp_path = path.with_extension("tmp");
    {
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp_path, path)
}

/// Escape text for inclusion in HTML element content or attribute values.
pub fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Cut `text` to at most `max_chars` characters, appending `marker` when cut.
pub fn truncate_chars(text: &str, max_chars: usize, marker: &str) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}{}", &text[..byte_idx], marker),
        None => text.to_string(),
    }
}

/// Number of UTF-16 code units, the unit Google Docs indexes by.
pub fn utf16_len(text: &str) -> i64 {
    text.encode_utf16().count() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
        assert_eq!(html_escape("plain"), "plain");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abcdef", 3, "..."), "abc...");
        assert_eq!(truncate_chars("abc", 3, "..."), "abc");
        assert_eq!(truncate_chars("", 3, "..."), "");
        // Multi-byte characters count once each
        assert_eq!(truncate_chars("ééééé", 2, "…"), "éé…");
    }

    #[test]
    fn test_utf16_len() {
        assert_eq!(utf16_len("abc"), 3);
        assert_eq!(utf16_len("é"), 1);
        assert_eq!(utf16_len("🍎"), 2);
    }

    #[test]
    fn test_atomic_write_str() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        atomic_write_str(&path, "first").unwrap();
        atomic_write_str(&path, "second").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        assert!(!path.with_extension("tmp").exists());
    }
}
