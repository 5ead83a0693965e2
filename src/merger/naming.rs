use serde::{Deserialize, Serialize};
use std::fmt;

/// How entries are renamed so inputs can't collide in the output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenameMode {
    /// `00_page.jpg`
    #[default]
    Prefix,
    /// `00/page.jpg`
    Namespace,
}

impl RenameMode {
    /// Separator placed between the padded index and the original path
    pub fn separator(self) -> char {
        match self {
            RenameMode::Prefix => '_',
            RenameMode::Namespace => '/',
        }
    }

    /// Output path for `entry` of the archive at `index`
    pub fn rename(self, index: usize, width: usize, entry: &str) -> String {
        format!("{index:0width$}{}{entry}", self.separator())
    }

    /// Word used in user-facing messages
    pub fn label(self) -> &'static str {
        match self {
            RenameMode::Prefix => "prefixes",
            RenameMode::Namespace => "folders",
        }
    }
}

impl fmt::Display for RenameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Decimal digits needed to print the highest index among `count` archives
pub fn padding_width(count: usize) -> usize {
    count.saturating_sub(1).to_string().len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_rename() {
        assert_eq!(RenameMode::Prefix.rename(0, 1, "page.jpg"), "0_page.jpg");
        assert_eq!(RenameMode::Prefix.rename(7, 3, "page.jpg"), "007_page.jpg");
    }

    #[test]
    fn test_namespace_rename() {
        assert_eq!(RenameMode::Namespace.rename(1, 1, "page.jpg"), "1/page.jpg");
        assert_eq!(
            RenameMode::Namespace.rename(10, 2, "chapter1/page.jpg"),
            "10/chapter1/page.jpg"
        );
    }

    #[test]
    fn test_prefix_applies_to_whole_nested_path() {
        assert_eq!(
            RenameMode::Prefix.rename(0, 1, "chapter1/page_001.jpg"),
            "0_chapter1/page_001.jpg"
        );
    }

    #[test]
    fn test_padding_width_table() {
        let cases = [
            (0, 1),
            (1, 1),
            (2, 1),
            (10, 1),
            (11, 2),
            (100, 2),
            (101, 3),
            (1000, 3),
            (10000, 4),
        ];
        for (count, expected) in cases {
            assert_eq!(padding_width(count), expected, "count {}", count);
        }
    }

    #[test]
    fn test_padded_indices_sort_lexically() {
        let width = padding_width(1000);
        let mut names: Vec<String> = (0..1000)
            .map(|i| RenameMode::Prefix.rename(i, width, "x"))
            .collect();
        let numeric = names.clone();
        names.sort();
        assert_eq!(names, numeric);
        assert_eq!(numeric[0], "000_x");
        assert_eq!(numeric[999], "999_x");
    }

    #[test]
    fn test_mode_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&RenameMode::Namespace).unwrap(),
            "\"namespace\""
        );
    }
}
