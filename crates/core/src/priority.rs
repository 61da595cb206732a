use crate::model::FileEntry;

pub const CHEAP_EXTENSIONS: &[&str] = &["txt", "md", "png", "jpg", "jpeg", "gif", "bmp"];

pub const CHEAP_EXTENSION_BONUS: i64 = 1000;

// Lower scores are submitted first.
pub fn priority_score(entry: &FileEntry) -> i64 {
    let size = i64::try_from(entry.size_bytes).unwrap_or(i64::MAX);
    let path_len = i64::try_from(entry.path.as_os_str().len()).unwrap_or(i64::MAX);
    let base = size.saturating_add(path_len);
    if is_cheap(entry) {
        base.saturating_sub(CHEAP_EXTENSION_BONUS)
    } else {
        base
    }
}

pub fn is_cheap(entry: &FileEntry) -> bool {
    entry
        .extension
        .as_deref()
        .is_some_and(|ext| CHEAP_EXTENSIONS.contains(&ext))
}

pub fn order_by_priority<T, F>(items: &mut [T], entry_of: F)
where
    F: Fn(&T) -> &FileEntry,
{
    items.sort_by_cached_key(|item| priority_score(entry_of(item)));
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{order_by_priority, priority_score, CHEAP_EXTENSION_BONUS};
    use crate::model::FileEntry;

    fn entry(path: &str, size: u64) -> FileEntry {
        FileEntry::new(PathBuf::from(path), size)
    }

    #[test]
    fn score_sums_size_and_path_length() {
        let archive = entry("/d/a.zip", 100);
        assert_eq!(priority_score(&archive), 100 + 8);
    }

    #[test]
    fn cheap_extensions_get_bonus_regardless_of_case() {
        let text = entry("/d/a.TXT", 100);
        assert_eq!(priority_score(&text), 100 + 8 - CHEAP_EXTENSION_BONUS);
    }

    #[test]
    fn cheap_files_sort_before_smaller_expensive_files() {
        let mut items = vec![entry("/d/tiny.bin", 10), entry("/d/big.png", 900)];
        order_by_priority(&mut items, |item| item);
        assert_eq!(items[0].file_name, "big.png");
    }

    #[test]
    fn ties_keep_scan_order() {
        let mut items = vec![
            (0, entry("/d/b.dat", 5)),
            (1, entry("/d/a.dat", 5)),
            (2, entry("/d/c.dat", 5)),
        ];
        order_by_priority(&mut items, |(_, item)| item);
        let order = items.iter().map(|(index, _)| *index).collect::<Vec<_>>();
        assert_eq!(order, vec![0, 1, 2]);
    }
}
