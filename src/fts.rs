use rusqlite::Connection;
use tracing::{debug, info, warn};

/// Which full-text facility backs `articles_fts`, if any.
///
/// Probed once at open; the query path may demote a process to `None` when
/// an FTS query fails at runtime, and the demotion is sticky for the
/// process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FtsMode {
    Fts5,
    Fts4,
    None,
}

impl FtsMode {
    pub fn is_enabled(self) -> bool {
        !matches!(self, FtsMode::None)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FtsMode::Fts5 => "fts5",
            FtsMode::Fts4 => "fts4",
            FtsMode::None => "none",
        }
    }
}

const FTS5_TABLE: &str = "CREATE VIRTUAL TABLE IF NOT EXISTS articles_fts USING fts5(
    title,
    content,
    content='articles',
    content_rowid='id'
)";

const FTS4_TABLE: &str = "CREATE VIRTUAL TABLE IF NOT EXISTS articles_fts USING fts4(
    title,
    content,
    content='articles'
)";

// FTS5 external-content tables key rows by rowid; deletions must go
// through the 'delete' command so the index can unmap the old values.
const FTS5_TRIGGERS: [&str; 3] = [
    "CREATE TRIGGER IF NOT EXISTS articles_ai AFTER INSERT ON articles BEGIN
        INSERT INTO articles_fts(rowid, title, content) VALUES (new.id, new.title, new.content);
    END",
    "CREATE TRIGGER IF NOT EXISTS articles_ad AFTER DELETE ON articles BEGIN
        INSERT INTO articles_fts(articles_fts, rowid, title, content)
            VALUES ('delete', old.id, old.title, old.content);
    END",
    "CREATE TRIGGER IF NOT EXISTS articles_au AFTER UPDATE ON articles BEGIN
        INSERT INTO articles_fts(articles_fts, rowid, title, content)
            VALUES ('delete', old.id, old.title, old.content);
        INSERT INTO articles_fts(rowid, title, content) VALUES (new.id, new.title, new.content);
    END",
];

// FTS4 uses docid instead of rowid.
const FTS4_TRIGGERS: [&str; 3] = [
    "CREATE TRIGGER IF NOT EXISTS articles_ai AFTER INSERT ON articles BEGIN
        INSERT INTO articles_fts(docid, title, content) VALUES (new.id, new.title, new.content);
    END",
    "CREATE TRIGGER IF NOT EXISTS articles_ad AFTER DELETE ON articles BEGIN
        DELETE FROM articles_fts WHERE docid = old.id;
    END",
    "CREATE TRIGGER IF NOT EXISTS articles_au AFTER UPDATE ON articles BEGIN
        DELETE FROM articles_fts WHERE docid = old.id;
        INSERT INTO articles_fts(docid, title, content) VALUES (new.id, new.title, new.content);
    END",
];

/// Run the capability probe: reuse an existing `articles_fts` table if one
/// is present (classifying its generation from the stored DDL), otherwise
/// try FTS5, then FTS4, then give up and leave searches to LIKE scans.
pub fn detect_or_create(conn: &Connection) -> FtsMode {
    if let Some(ddl) = existing_ddl(conn) {
        let mode = classify(&ddl);
        // Triggers were installed when the table was first created.
        info!(mode = mode.as_str(), "detected existing full-text table");
        return mode;
    }

    if try_create(conn, FTS5_TABLE, &FTS5_TRIGGERS, "fts5") {
        return FtsMode::Fts5;
    }
    if try_create(conn, FTS4_TABLE, &FTS4_TRIGGERS, "fts4") {
        return FtsMode::Fts4;
    }

    info!("full-text search unavailable, falling back to LIKE queries");
    FtsMode::None
}

fn existing_ddl(conn: &Connection) -> Option<String> {
    conn.query_row(
        "SELECT sql FROM sqlite_master WHERE name = 'articles_fts' AND type = 'table'",
        [],
        |row| row.get::<_, String>(0),
    )
    .ok()
}

/// Classify a stored `CREATE VIRTUAL TABLE` statement by its backing module.
pub(crate) fn classify(ddl: &str) -> FtsMode {
    let lowered = ddl.to_lowercase();
    if lowered.contains("fts5") {
        FtsMode::Fts5
    } else if lowered.contains("fts4") {
        FtsMode::Fts4
    } else {
        FtsMode::None
    }
}

fn try_create(conn: &Connection, table: &str, triggers: &[&str], name: &str) -> bool {
    if let Err(e) = conn.execute_batch(table) {
        debug!(module = name, error = %e, "full-text module unavailable");
        return false;
    }
    for trigger in triggers {
        if let Err(e) = conn.execute_batch(trigger) {
            warn!(module = name, error = %e, "failed to create full-text trigger");
        }
    }
    info!(module = name, "full-text table created");
    true
}

/// Build a match expression from user input: escape embedded quotes and
/// append `*` so the last term prefix-matches.
pub fn match_query(query: &str) -> String {
    let escaped = query.replace('"', "\"\"").replace('\'', "''");
    format!("{escaped}*")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_by_module_substring() {
        assert_eq!(
            classify("CREATE VIRTUAL TABLE articles_fts USING fts5(title, content)"),
            FtsMode::Fts5
        );
        assert_eq!(
            classify("CREATE VIRTUAL TABLE articles_fts USING FTS4(title, content)"),
            FtsMode::Fts4
        );
        assert_eq!(classify("CREATE TABLE articles_fts(title)"), FtsMode::None);
    }

    #[test]
    fn match_query_appends_prefix_wildcard() {
        assert_eq!(match_query("Anarch"), "Anarch*");
    }

    #[test]
    fn match_query_escapes_quotes() {
        assert_eq!(match_query(r#"say "hi""#), r#"say ""hi""*"#);
        assert_eq!(match_query("it's"), "it''s*");
    }

    #[test]
    fn probe_prefers_fts5() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE articles (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                namespace INTEGER NOT NULL,
                content TEXT,
                redirect TEXT
            )",
        )
        .unwrap();

        // Bundled SQLite ships FTS5.
        assert_eq!(detect_or_create(&conn), FtsMode::Fts5);
    }

    #[test]
    fn probe_reuses_existing_table() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE articles (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                namespace INTEGER NOT NULL,
                content TEXT,
                redirect TEXT
            )",
        )
        .unwrap();
        conn.execute_batch(
            "CREATE VIRTUAL TABLE articles_fts USING fts4(title, content, content='articles')",
        )
        .unwrap();

        assert_eq!(detect_or_create(&conn), FtsMode::Fts4);
    }

    #[test]
    fn disabled_mode_reports_itself() {
        assert!(!FtsMode::None.is_enabled());
        assert!(FtsMode::Fts5.is_enabled());
        assert_eq!(FtsMode::None.as_str(), "none");
    }
}
