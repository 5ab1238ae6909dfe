//! Path category classification
//!
//! Each record is tagged with the file categories its path matches, plus a
//! wildcard and a file-type tag. The category set is fixed; the patterns
//! are compiled once into a [`RegexSet`] when the classifier is built so
//! that a single scan answers all of them per path.

use regex::RegexSet;

/// Category tags, index-aligned with the pattern table below.
const CATEGORY_TAGS: [&str; 7] = [
    "cram",
    "bam",
    "index",
    "compressed",
    "uncompressed",
    "checkpoint",
    "temporary",
];

/// Path patterns, one per category tag.
const CATEGORY_PATTERNS: [&str; 7] = [
    r".*\.cram$",
    r".*\.bam$",
    r".*\.(crai|bai|sai|fai|csi)$",
    r".*\.(bzip2|gz|tgz|zip|xz|bgz|bcf)$",
    r".*(\.sam|\.fasta|\.fastq|\.fa|\.fq|\.vcf|\.csv|\.tsv|\.txt|\.text|README|\.o|\.e|\.oe|\.dat)$",
    r".*jobstate\.context$",
    r".*(tmp|TMP|temp|TEMP).*",
];

/// Derives the category tag set for a path and file type.
#[derive(Debug)]
pub struct CategoryClassifier {
    patterns: RegexSet,
}

impl CategoryClassifier {
    /// Compile the fixed pattern table.
    pub fn new() -> Self {
        let patterns = RegexSet::new(CATEGORY_PATTERNS)
            .expect("category pattern table is a compile-time constant");
        Self { patterns }
    }

    /// Classify one record.
    ///
    /// Returns every category whose pattern matches the path (`other` when
    /// none do), then the `*` wildcard, then exactly one file-type tag:
    /// `directory`, `file`, `link`, or `type_<c>` for anything else.
    pub fn classify(&self, path: &str, file_type: char) -> Vec<String> {
        let mut tags: Vec<String> = self
            .patterns
            .matches(path)
            .into_iter()
            .map(|i| CATEGORY_TAGS[i].to_string())
            .collect();

        if tags.is_empty() {
            tags.push("other".to_string());
        }
        tags.push("*".to_string());

        tags.push(match file_type {
            'd' => "directory".to_string(),
            'f' => "file".to_string(),
            'l' => "link".to_string(),
            other => format!("type_{other}"),
        });

        tags
    }
}

impl Default for CategoryClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(path: &str, file_type: char) -> Vec<String> {
        CategoryClassifier::new().classify(path, file_type)
    }

    #[test]
    fn test_single_category() {
        assert_eq!(tags("/a/b/sample.cram", 'f'), ["cram", "*", "file"]);
        assert_eq!(tags("/a/b/sample.bam", 'f'), ["bam", "*", "file"]);
    }

    #[test]
    fn test_multiple_categories() {
        // A gzipped file under a tmp directory matches two patterns.
        let got = tags("/scratch/tmp/archive.gz", 'f');
        assert!(got.contains(&"compressed".to_string()));
        assert!(got.contains(&"temporary".to_string()));
        assert!(got.contains(&"*".to_string()));
        assert!(got.contains(&"file".to_string()));
    }

    #[test]
    fn test_no_match_is_other() {
        assert_eq!(tags("/a/b/photo.jpeg", 'f'), ["other", "*", "file"]);
    }

    #[test]
    fn test_file_type_tags() {
        assert_eq!(tags("/a/dir", 'd'), ["other", "*", "directory"]);
        assert_eq!(tags("/a/ln", 'l'), ["other", "*", "link"]);
        assert_eq!(tags("/a/sock", 's'), ["other", "*", "type_s"]);
    }

    #[test]
    fn test_index_and_checkpoint() {
        assert_eq!(tags("/a/b.bai", 'f'), ["index", "*", "file"]);
        assert_eq!(tags("/run/jobstate.context", 'f'), ["checkpoint", "*", "file"]);
    }

    #[test]
    fn test_case_sensitive() {
        // Patterns are matched exactly as written; the temporary pattern
        // spells out both cases itself.
        assert_eq!(tags("/a/b/SAMPLE.CRAM", 'f'), ["other", "*", "file"]);
        let got = tags("/a/TEMP/x", 'f');
        assert!(got.contains(&"temporary".to_string()));
    }

    #[test]
    fn test_uncompressed_readme() {
        assert_eq!(tags("/proj/README", 'f'), ["uncompressed", "*", "file"]);
    }
}
