//! SQL fragments for the dynamic video queries.
//!
//! Fragments carry `?` placeholders and the values bound to them. Caller text
//! never becomes part of the statement; [`SqlFragment::into_statement`] numbers
//! the placeholders for Postgres.

use crate::constants::EXISTING_VIDEO_ALBUM;
use crate::orm::videos;
use sea_orm::{DbBackend, IdenStatic, Statement, Value};
use std::fmt;

/// Parse a comma or whitespace separated id list.
/// Non-numeric and non-positive entries are dropped, duplicates keep their first position.
pub fn parse_id_list(list: &str) -> Vec<i32> {
    let mut ids = Vec::new();
    for part in list.split(|c: char| c == ',' || c.is_whitespace()) {
        if let Ok(id) = part.trim().parse::<i32>() {
            if id > 0 && !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    ids
}

/// Comma-joined ids for an `IN (...)` list.
pub fn join_ids(ids: &[i32]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Comma-joined `?` placeholders.
pub fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// SQL text with `?` placeholders and the values bound to them, in order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SqlFragment {
    pub sql: String,
    pub values: Vec<Value>,
}

impl SqlFragment {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            values: Vec::new(),
        }
    }

    pub fn bound(sql: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            values,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sql.trim().is_empty()
    }

    /// Join fragments with `separator`, keeping the order of their values.
    pub fn join(parts: impl IntoIterator<Item = SqlFragment>, separator: &str) -> Self {
        let mut sql = Vec::new();
        let mut values = Vec::new();
        for part in parts {
            sql.push(part.sql);
            values.extend(part.values);
        }
        Self {
            sql: sql.join(separator),
            values,
        }
    }

    /// Wrap the text, keeping the values.
    pub fn map_sql(self, f: impl FnOnce(String) -> String) -> Self {
        Self {
            sql: f(self.sql),
            values: self.values,
        }
    }

    /// Key identifying the statement and its values in the query cache.
    pub fn cache_key(&self) -> String {
        format!("{}\n{:?}", self.sql, self.values)
    }

    pub fn into_statement(self, backend: DbBackend) -> Statement {
        let sql = match backend {
            DbBackend::Postgres => number_placeholders(&self.sql),
            _ => self.sql,
        };
        Statement::from_sql_and_values(backend, &sql, self.values)
    }
}

impl From<String> for SqlFragment {
    fn from(sql: String) -> Self {
        Self::new(sql)
    }
}

impl From<&str> for SqlFragment {
    fn from(sql: &str) -> Self {
        Self::new(sql)
    }
}

/// Rewrite `?` placeholders outside string literals to `$1`, `$2`, ...
fn number_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut in_literal = false;
    let mut n = 0;
    for c in sql.chars() {
        match c {
            '\'' => {
                in_literal = !in_literal;
                out.push(c);
            }
            '?' if !in_literal => {
                n += 1;
                out.push('$');
                out.push_str(&n.to_string());
            }
            _ => out.push(c),
        }
    }
    out
}

/// Escape LIKE metacharacters. Pair the pattern with `ESCAPE '!'`.
pub fn esc_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '!' | '%' | '_') {
            escaped.push('!');
        }
        escaped.push(c);
    }
    escaped
}

/// `field IN ( ... )` with numeric items bound as integers and everything
/// else bound as text. Returns `None` when there are no items.
pub fn in_operator_sql<S: AsRef<str>>(field: &str, items: &[S]) -> Option<SqlFragment> {
    if items.is_empty() {
        return None;
    }

    let values: Vec<Value> = items
        .iter()
        .map(|item| item.as_ref().trim())
        .map(|item| match item.parse::<i64>() {
            Ok(n) => Value::from(n),
            Err(_) => Value::from(item.to_string()),
        })
        .collect();

    Some(SqlFragment::bound(
        format!("{} IN ( {} )", field.trim(), placeholders(values.len())),
        values,
    ))
}

/// WHERE conditions keyed by name.
///
/// Keys keep their insertion order and setting an existing key replaces its
/// fragment in place, so extension points can override a condition by name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WhereClause {
    conditions: Vec<(String, SqlFragment)>,
}

impl WhereClause {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, fragment: impl Into<SqlFragment>) {
        let fragment = fragment.into();
        match self.conditions.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = fragment,
            None => self.conditions.push((key.to_string(), fragment)),
        }
    }

    /// SQL text of a condition.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fragment(key).map(|f| f.sql.as_str())
    }

    pub fn fragment(&self, key: &str) -> Option<&SqlFragment> {
        self.conditions
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, fragment)| fragment)
    }

    pub fn remove(&mut self, key: &str) -> Option<SqlFragment> {
        let pos = self.conditions.iter().position(|(k, _)| k == key)?;
        Some(self.conditions.remove(pos).1)
    }

    /// Extend an existing fragment, or set it when absent.
    pub fn append(&mut self, key: &str, fragment: impl Into<SqlFragment>) {
        let fragment = fragment.into();
        match self.conditions.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => {
                entry.1.sql.push_str(&fragment.sql);
                entry.1.values.extend(fragment.values);
            }
            None => self.conditions.push((key.to_string(), fragment)),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.conditions.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Fragments joined with `AND`.
    pub fn join(&self) -> SqlFragment {
        SqlFragment::join(
            self.conditions.iter().map(|(_, fragment)| fragment.clone()),
            " AND ",
        )
    }
}

/// Columns the video list may be ordered by.
pub const ORDERABLE_COLUMNS: [videos::Column; 10] = [
    videos::Column::Id,
    videos::Column::UserId,
    videos::Column::BlogId,
    videos::Column::AttachmentId,
    videos::Column::Title,
    videos::Column::AlbumId,
    videos::Column::ActivityId,
    videos::Column::GroupId,
    videos::Column::MenuOrder,
    videos::Column::DateCreated,
];

/// Resolve an `order_by` argument. Unknown names order by `date_created`.
pub fn order_column(order_by: &str) -> videos::Column {
    let order_by = order_by.trim();
    ORDERABLE_COLUMNS
        .iter()
        .copied()
        .find(|column| column.as_str() == order_by)
        .unwrap_or(videos::Column::DateCreated)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sort {
    Asc,
    Desc,
}

impl Sort {
    /// Only exact `ASC` sorts ascending; anything else is `DESC`.
    pub fn parse(sort: &str) -> Self {
        match sort {
            "ASC" => Self::Asc,
            _ => Self::Desc,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `album_id` query argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlbumFilter {
    Album(i32),
    /// Videos not assigned to any album.
    Unassigned,
}

impl AlbumFilter {
    /// Accepts an album id or the `existing-video` sentinel.
    /// Empty and zero values mean no album filter.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value == EXISTING_VIDEO_ALBUM {
            return Some(Self::Unassigned);
        }
        match value.parse::<i32>() {
            Ok(id) if id != 0 => Some(Self::Album(id)),
            _ => None,
        }
    }

    pub fn sql(&self) -> String {
        match self {
            Self::Album(id) => format!("m.album_id = {}", id),
            Self::Unassigned => "m.album_id = 0".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_list() {
        assert_eq!(parse_id_list("4, 9,,12 4"), vec![4, 9, 12]);
        assert_eq!(parse_id_list("x,-3,0,7"), vec![7]);
        assert!(parse_id_list("").is_empty());
    }

    #[test]
    fn test_postgres_placeholders_are_numbered() {
        assert_eq!(
            number_placeholders("m.title LIKE ? ESCAPE '!' AND m.note = 'why?' AND m.privacy IN (?, ?)"),
            "m.title LIKE $1 ESCAPE '!' AND m.note = 'why?' AND m.privacy IN ($2, $3)"
        );

        let statement = SqlFragment::bound("m.id = ?", vec![Value::from(4i64)])
            .into_statement(DbBackend::Postgres);
        assert_eq!(statement.sql, "m.id = $1");
        assert_eq!(statement.values.map(|v| v.0.len()), Some(1));

        let statement = SqlFragment::bound("m.id = ?", vec![Value::from(4i64)])
            .into_statement(DbBackend::Sqlite);
        assert_eq!(statement.sql, "m.id = ?");
    }

    #[test]
    fn test_esc_like() {
        assert_eq!(esc_like("100%_done!"), "100!%!_done!!");
        assert_eq!(esc_like("plain"), "plain");
    }

    #[test]
    fn test_in_operator_sql_binds_items() {
        let fragment = in_operator_sql(" m.id ", &["3", " 5", "x'y"]).unwrap();
        assert_eq!(fragment.sql, "m.id IN ( ?, ?, ? )");
        assert_eq!(
            fragment.values,
            vec![
                Value::from(3i64),
                Value::from(5i64),
                Value::from("x'y".to_string())
            ]
        );
        let empty: [&str; 0] = [];
        assert_eq!(in_operator_sql("m.id", &empty), None);
    }

    #[test]
    fn test_where_clause_replaces_by_key() {
        let mut clause = WhereClause::new();
        clause.set("user", "m.user_id = 1");
        clause.set(
            "privacy",
            SqlFragment::bound("m.privacy = ?", vec![Value::from("public".to_string())]),
        );
        clause.set("album", "m.album_id = 2");
        clause.set("user", "m.user_id = 3");

        assert_eq!(clause.len(), 3);
        let joined = clause.join();
        assert_eq!(
            joined.sql,
            "m.user_id = 3 AND m.privacy = ? AND m.album_id = 2"
        );
        assert_eq!(joined.values, vec![Value::from("public".to_string())]);

        clause.append("user", " OR m.user_id = 4");
        assert_eq!(clause.get("user"), Some("m.user_id = 3 OR m.user_id = 4"));

        assert_eq!(
            clause.remove("album").map(|f| f.sql),
            Some("m.album_id = 2".to_string())
        );
        assert_eq!(clause.keys().collect::<Vec<_>>(), vec!["user", "privacy"]);
    }

    #[test]
    fn test_order_column_falls_back_to_date_created() {
        assert_eq!(order_column("menu_order").as_str(), "menu_order");
        assert_eq!(order_column("title").as_str(), "title");
        assert_eq!(order_column("privacy").as_str(), "date_created");
        assert_eq!(
            order_column("id; DROP TABLE bp_media").as_str(),
            "date_created"
        );
    }

    #[test]
    fn test_sort_parse() {
        assert_eq!(Sort::parse("ASC"), Sort::Asc);
        assert_eq!(Sort::parse("asc"), Sort::Desc);
        assert_eq!(Sort::parse("sideways"), Sort::Desc);
    }

    #[test]
    fn test_album_filter_parse() {
        assert_eq!(AlbumFilter::parse("existing-video"), Some(AlbumFilter::Unassigned));
        assert_eq!(AlbumFilter::parse("5"), Some(AlbumFilter::Album(5)));
        assert_eq!(AlbumFilter::parse("0"), None);
        assert_eq!(AlbumFilter::Unassigned.sql(), "m.album_id = 0");
    }
}
