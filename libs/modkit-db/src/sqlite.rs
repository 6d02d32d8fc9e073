//! SQLite DSN helpers: memory detection, parent directory creation and
//! whitelisted PRAGMA extraction from the query string.

use std::{path::PathBuf, str::FromStr, time::Duration};

use sqlx::sqlite::{SqliteJournalMode, SqliteSynchronous};

/// Query keys understood as PRAGMAs; they are stripped before sqlx sees the DSN.
const PRAGMA_KEYS: &[&str] = &["journal_mode", "synchronous", "busy_timeout"];

/// Typed PRAGMA settings taken from the DSN query.
#[derive(Clone, Debug, Default)]
pub(crate) struct Pragmas {
    pub journal_mode: Option<SqliteJournalMode>,
    pub synchronous: Option<SqliteSynchronous>,
    pub busy_timeout: Option<Duration>,
}

pub(crate) fn is_memory_dsn(dsn: &str) -> bool {
    let lower = dsn.to_ascii_lowercase();
    lower.contains(":memory:") || lower.contains("mode=memory")
}

/// Local file behind a `sqlite:` DSN, `None` for in-memory databases.
pub(crate) fn file_path(dsn: &str) -> Option<PathBuf> {
    if is_memory_dsn(dsn) {
        return None;
    }
    let rest = dsn
        .strip_prefix("sqlite://")
        .or_else(|| dsn.strip_prefix("sqlite:"))?;
    let path = rest.split_once('?').map_or(rest, |(p, _)| p);
    if path.is_empty() {
        None
    } else {
        Some(PathBuf::from(path))
    }
}

/// Ensure the parent directory of a file database exists.
pub(crate) fn prepare_sqlite_path(dsn: &str, create_dirs: bool) -> std::io::Result<()> {
    if !create_dirs {
        return Ok(());
    }
    if let Some(parent) = file_path(dsn).as_deref().and_then(|p| p.parent()) {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Split a DSN into the part sqlx understands and the PRAGMAs we apply ourselves.
/// Invalid PRAGMA values are logged and ignored.
pub(crate) fn split_pragmas(dsn: &str) -> (String, Pragmas) {
    let Some((base, query)) = dsn.split_once('?') else {
        return (dsn.to_string(), Pragmas::default());
    };

    let mut pragmas = Pragmas::default();
    let mut kept = url::form_urlencoded::Serializer::new(String::new());
    let mut kept_any = false;

    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        let key_lower = key.to_ascii_lowercase();
        if !PRAGMA_KEYS.contains(&key_lower.as_str()) {
            kept.append_pair(&key, &value);
            kept_any = true;
            continue;
        }
        match key_lower.as_str() {
            "journal_mode" => match SqliteJournalMode::from_str(&value) {
                Ok(mode) => pragmas.journal_mode = Some(mode),
                Err(_) => tracing::warn!("Invalid 'journal_mode' PRAGMA value '{}', ignoring", value),
            },
            "synchronous" => match SqliteSynchronous::from_str(&value) {
                Ok(mode) => pragmas.synchronous = Some(mode),
                Err(_) => tracing::warn!("Invalid 'synchronous' PRAGMA value '{}', ignoring", value),
            },
            _ => match value.parse::<u64>() {
                Ok(ms) => pragmas.busy_timeout = Some(Duration::from_millis(ms)),
                Err(_) => tracing::warn!("Invalid 'busy_timeout' PRAGMA value '{}', ignoring", value),
            },
        }
    }

    let clean = if kept_any {
        format!("{}?{}", base, kept.finish())
    } else {
        base.to_string()
    };
    (clean, pragmas)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_dsns_are_detected() {
        assert!(is_memory_dsn("sqlite::memory:"));
        assert!(is_memory_dsn("sqlite://:memory:"));
        assert!(is_memory_dsn("sqlite:file:users?mode=memory&cache=shared"));
        assert!(!is_memory_dsn("sqlite://database/users.db"));
    }

    #[test]
    fn file_path_strips_scheme_and_query() {
        assert_eq!(
            file_path("sqlite:///var/lib/users.db?journal_mode=wal"),
            Some(PathBuf::from("/var/lib/users.db"))
        );
        assert_eq!(
            file_path("sqlite://database/users.db"),
            Some(PathBuf::from("database/users.db"))
        );
        assert_eq!(file_path("sqlite::memory:"), None);
        assert_eq!(file_path("postgres://localhost/db"), None);
    }

    #[test]
    fn pragmas_are_extracted_and_removed() {
        let (clean, pragmas) =
            split_pragmas("sqlite:///tmp/u.db?journal_mode=WAL&busy_timeout=250&mode=rwc");
        assert_eq!(clean, "sqlite:///tmp/u.db?mode=rwc");
        assert!(matches!(pragmas.journal_mode, Some(SqliteJournalMode::Wal)));
        assert_eq!(pragmas.busy_timeout, Some(Duration::from_millis(250)));
        assert!(pragmas.synchronous.is_none());
    }

    #[test]
    fn invalid_pragmas_are_ignored() {
        let (clean, pragmas) = split_pragmas("sqlite:///tmp/u.db?synchronous=sometimes&busy_timeout=-1");
        assert_eq!(clean, "sqlite:///tmp/u.db");
        assert!(pragmas.synchronous.is_none());
        assert!(pragmas.busy_timeout.is_none());
    }

    #[test]
    fn dsn_without_query_is_untouched() {
        let (clean, pragmas) = split_pragmas("sqlite:///tmp/u.db");
        assert_eq!(clean, "sqlite:///tmp/u.db");
        assert!(pragmas.journal_mode.is_none());
    }
}
