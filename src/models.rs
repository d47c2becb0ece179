use serde::{Deserialize, Serialize};

/// A stored article row. `redirect` is the empty string when the page is
/// not a redirect; it is omitted from the JSON shape in that case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub namespace: i32,
    pub content: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub redirect: String,
}

/// One record of the multistream index: the byte offset of the bzip2 block
/// holding the article, and the article id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexEntry {
    pub seek: i64,
    pub article_id: i64,
}

/// A page decoded from the export XML. Only the first revision's text and
/// timestamp are retained.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub id: i64,
    pub title: String,
    pub ns: i32,
    pub redirect: Option<String>,
    pub text: Option<String>,
    pub timestamp: Option<String>,
}
