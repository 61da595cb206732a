use memchr::memmem;
use tracing::debug;

use crate::error::OrganizeError;
use crate::filesystem::FileSystem;
use crate::model::{FileEntry, OrganizeMode};

// Unreadable files in content mode count as no match.
pub fn classify(entry: &FileEntry, mode: &OrganizeMode, fs: &dyn FileSystem) -> Option<String> {
    match mode {
        OrganizeMode::Alphabetical => letter_bucket(&entry.file_name),
        OrganizeMode::Keyword { keyword } => keyword_bucket(&entry.file_name, keyword),
        OrganizeMode::Content { keywords } => match fs.read_all_bytes(&entry.path) {
            Ok(content) => content_bucket(&content, keywords),
            Err(err) => {
                debug!(
                    "content classification skipped {}: {}",
                    entry.path.display(),
                    err
                );
                None
            }
        },
    }
}

pub fn letter_bucket(file_name: &str) -> Option<String> {
    let first = file_name.chars().next()?;
    if first.is_ascii_alphabetic() {
        Some(first.to_ascii_uppercase().to_string())
    } else {
        None
    }
}

pub fn keyword_bucket(file_name: &str, keyword: &str) -> Option<String> {
    if !keyword.is_empty() && file_name.contains(keyword) {
        Some(keyword.to_string())
    } else {
        None
    }
}

pub fn content_bucket(content: &[u8], keywords: &[String]) -> Option<String> {
    keywords
        .iter()
        .filter(|keyword| !keyword.is_empty())
        .find(|keyword| memmem::find(content, keyword.as_bytes()).is_some())
        .cloned()
}

pub fn validate_mode(mode: &OrganizeMode) -> Result<(), OrganizeError> {
    match mode {
        OrganizeMode::Alphabetical => Ok(()),
        OrganizeMode::Keyword { keyword } => validate_keyword(keyword),
        OrganizeMode::Content { keywords } => {
            if keywords.is_empty() {
                return Err(OrganizeError::EmptyKeyword);
            }
            keywords
                .iter()
                .try_for_each(|keyword| validate_keyword(keyword))
        }
    }
}

fn validate_keyword(keyword: &str) -> Result<(), OrganizeError> {
    if keyword.is_empty() {
        return Err(OrganizeError::EmptyKeyword);
    }
    let reason = if keyword == "." || keyword == ".." {
        Some("keyword cannot be a relative directory name")
    } else if keyword.contains(['/', '\\']) {
        Some("keyword cannot contain a path separator")
    } else if keyword.contains('\0') {
        Some("keyword cannot contain NUL")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(OrganizeError::InvalidKeyword {
            keyword: keyword.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{classify, content_bucket, keyword_bucket, letter_bucket, validate_mode};
    use crate::error::OrganizeError;
    use crate::filesystem::LocalFileSystem;
    use crate::model::{FileEntry, OrganizeMode};

    fn keywords(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn letter_bucket_uppercases_ascii_letters_only() {
        assert_eq!(letter_bucket("apple.doc").as_deref(), Some("A"));
        assert_eq!(letter_bucket("Zebra.png").as_deref(), Some("Z"));
        assert_eq!(letter_bucket("1file.txt"), None);
        assert_eq!(letter_bucket(".hidden"), None);
        assert_eq!(letter_bucket("éclair.txt"), None);
        assert_eq!(letter_bucket(""), None);
    }

    #[test]
    fn keyword_bucket_is_case_sensitive_substring() {
        assert_eq!(
            keyword_bucket("2024-invoice-march.pdf", "invoice").as_deref(),
            Some("invoice")
        );
        assert_eq!(keyword_bucket("Invoice.pdf", "invoice"), None);
        assert_eq!(keyword_bucket("notes.txt", ""), None);
    }

    #[test]
    fn content_bucket_first_keyword_wins() {
        let set = keywords(&["a", "b"]);
        assert_eq!(content_bucket(b"b then a", &set).as_deref(), Some("a"));
        assert_eq!(content_bucket(b"only b", &set).as_deref(), Some("b"));
        assert_eq!(content_bucket(b"nothing", &keywords(&["x"])), None);
    }

    #[test]
    fn content_bucket_scans_beyond_any_prefix() {
        let mut content = vec![b' '; 1 << 20];
        content.extend_from_slice(b"needle");
        assert_eq!(
            content_bucket(&content, &keywords(&["needle"])).as_deref(),
            Some("needle")
        );
    }

    #[test]
    fn classify_is_deterministic_and_reads_content() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("avocado.md");
        fs::write(&path, "hello world").expect("write file");
        let entry = FileEntry::new(path, 11);
        let mode = OrganizeMode::Content {
            keywords: keywords(&["hello", "world"]),
        };

        let first = classify(&entry, &mode, &LocalFileSystem);
        let second = classify(&entry, &mode, &LocalFileSystem);
        assert_eq!(first.as_deref(), Some("hello"));
        assert_eq!(first, second);
    }

    #[test]
    fn unreadable_content_yields_no_destination() {
        let temp = tempfile::tempdir().expect("tempdir");
        let entry = FileEntry::new(temp.path().join("vanished.txt"), 0);
        let mode = OrganizeMode::Content {
            keywords: keywords(&["hello"]),
        };
        assert_eq!(classify(&entry, &mode, &LocalFileSystem), None);
    }

    #[test]
    fn validate_mode_rejects_unusable_keywords() {
        assert!(validate_mode(&OrganizeMode::Alphabetical).is_ok());
        assert!(matches!(
            validate_mode(&OrganizeMode::Keyword {
                keyword: String::new()
            }),
            Err(OrganizeError::EmptyKeyword)
        ));
        assert!(matches!(
            validate_mode(&OrganizeMode::Content { keywords: vec![] }),
            Err(OrganizeError::EmptyKeyword)
        ));
        assert!(matches!(
            validate_mode(&OrganizeMode::Keyword {
                keyword: "../escape".to_string()
            }),
            Err(OrganizeError::InvalidKeyword { .. })
        ));
        assert!(matches!(
            validate_mode(&OrganizeMode::Content {
                keywords: keywords(&["ok", ".."])
            }),
            Err(OrganizeError::InvalidKeyword { .. })
        ));
    }
}
