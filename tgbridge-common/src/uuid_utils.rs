//! UUID utilities

use uuid::{Uuid, Version};

/// Generate a new UUIDv4
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

/// Parse UUID from string
pub fn parse(s: &str) -> Result<Uuid, uuid::Error> {
    Uuid::parse_str(s)
}

/// Build a fresh `<uuid-v4>.<extension>` file name
pub fn unique_file_name(extension: &str) -> String {
    format!("{}.{}", generate(), extension)
}

/// Recover the UUIDv4 from a `<uuid-v4>.<extension>` file name
///
/// Returns `None` for anything else, including other UUID versions and
/// non-hyphenated spellings.
pub fn parse_file_name(file_name: &str, extension: &str) -> Option<Uuid> {
    let stem = file_name.strip_suffix(extension)?.strip_suffix('.')?;
    if stem.len() != 36 {
        return None;
    }
    let id = parse(stem).ok()?;
    (id.get_version() == Some(Version::Random)).then_some(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_file_name_round_trips() {
        let name = unique_file_name("png");
        assert!(name.ends_with(".png"));
        assert!(parse_file_name(&name, "png").is_some());
    }

    #[test]
    fn test_unique_file_names_differ() {
        assert_ne!(unique_file_name("png"), unique_file_name("png"));
    }

    #[test]
    fn test_parse_file_name_rejects_foreign_files() {
        assert!(parse_file_name("notes.txt", "png").is_none());
        assert!(parse_file_name("qr.png", "png").is_none());
        assert!(parse_file_name(".png", "png").is_none());
    }

    #[test]
    fn test_parse_file_name_rejects_wrong_extension() {
        let name = unique_file_name("jpg");
        assert!(parse_file_name(&name, "png").is_none());
    }

    #[test]
    fn test_parse_file_name_rejects_non_v4() {
        // Nil UUID parses but is not version 4
        assert!(parse_file_name("00000000-0000-0000-0000-000000000000.png", "png").is_none());
    }

    #[test]
    fn test_parse_file_name_rejects_simple_format() {
        let simple = generate().simple().to_string();
        assert!(parse_file_name(&format!("{simple}.png"), "png").is_none());
    }
}
