//! Named scopes for video queries.
//!
//! A scope is a predefined set of video arguments contributed by other
//! components, e.g. `groups` or `friends`. Every handler registered for a
//! scope name returns a compound condition plus argument overrides; the
//! conditions of all requested scopes are compiled into one SQL predicate.

use super::hooks::Hooks;
use super::query::{Fields, VideoQueryArgs};
use super::sql::{placeholders, AlbumFilter, SqlFragment};
use crate::orm::videos::{self, Privacy};
use sea_orm::{IdenStatic, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compare {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
}

impl Compare {
    fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum QueryValue {
    Int(i64),
    Text(String),
    Ints(Vec<i64>),
    Texts(Vec<String>),
}

impl QueryValue {
    fn values(&self) -> Vec<Value> {
        match self {
            Self::Int(n) => vec![Value::from(*n)],
            Self::Text(s) => vec![Value::from(s.clone())],
            Self::Ints(list) => list.iter().map(|n| Value::from(*n)).collect(),
            Self::Texts(list) => list.iter().map(|s| Value::from(s.clone())).collect(),
        }
    }
}

impl From<i32> for QueryValue {
    fn from(n: i32) -> Self {
        Self::Int(n.into())
    }
}

impl From<&str> for QueryValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<Vec<i32>> for QueryValue {
    fn from(list: Vec<i32>) -> Self {
        Self::Ints(list.into_iter().map(i64::from).collect())
    }
}

impl From<&[Privacy]> for QueryValue {
    fn from(list: &[Privacy]) -> Self {
        Self::Texts(list.iter().map(|p| p.as_str().to_string()).collect())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryRelation {
    And,
    Or,
}

impl QueryRelation {
    fn as_sql(&self) -> &'static str {
        match self {
            Self::And => " AND ",
            Self::Or => " OR ",
        }
    }
}

/// Condition tree over video columns.
#[derive(Clone, Debug)]
pub enum VideoQuery {
    Clause {
        column: videos::Column,
        compare: Compare,
        value: QueryValue,
    },
    Group {
        relation: QueryRelation,
        queries: Vec<VideoQuery>,
    },
}

impl VideoQuery {
    pub fn clause(column: videos::Column, compare: Compare, value: impl Into<QueryValue>) -> Self {
        Self::Clause {
            column,
            compare,
            value: value.into(),
        }
    }

    pub fn eq(column: videos::Column, value: impl Into<QueryValue>) -> Self {
        Self::clause(column, Compare::Eq, value)
    }

    pub fn all(queries: Vec<VideoQuery>) -> Self {
        Self::Group {
            relation: QueryRelation::And,
            queries,
        }
    }

    pub fn any(queries: Vec<VideoQuery>) -> Self {
        Self::Group {
            relation: QueryRelation::Or,
            queries,
        }
    }

    /// Compile to a predicate over the `m` table alias with bound values.
    /// `None` when the tree holds no conditions.
    pub fn to_sql(&self) -> Option<SqlFragment> {
        match self {
            Self::Clause {
                column,
                compare,
                value,
            } => {
                let field = format!("m.{}", column.as_str());
                let mut values = value.values();
                match compare {
                    Compare::In | Compare::NotIn => {
                        if values.is_empty() {
                            // Nothing can be in an empty set; anything is outside it.
                            return match compare {
                                Compare::In => Some(SqlFragment::new("1 = 0")),
                                _ => None,
                            };
                        }
                        Some(SqlFragment::bound(
                            format!(
                                "{} {} ({})",
                                field,
                                compare.as_sql(),
                                placeholders(values.len())
                            ),
                            values,
                        ))
                    }
                    _ => {
                        values.truncate(1);
                        if values.is_empty() {
                            return None;
                        }
                        Some(SqlFragment::bound(
                            format!("{} {} ?", field, compare.as_sql()),
                            values,
                        ))
                    }
                }
            }
            Self::Group { relation, queries } => {
                let parts: Vec<SqlFragment> = queries.iter().filter_map(|q| q.to_sql()).collect();
                match parts.len() {
                    0 => None,
                    1 => parts.into_iter().next(),
                    _ => Some(
                        SqlFragment::join(parts, relation.as_sql())
                            .map_sql(|sql| format!("( {} )", sql)),
                    ),
                }
            }
        }
    }
}

/// Arguments a scope overrides on the query it is applied to.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryOverrides {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub max: Option<i64>,
    pub fields: Option<Fields>,
    pub sort: Option<String>,
    pub order_by: Option<String>,
    pub exclude: Option<Vec<i32>>,
    pub include: Option<Vec<i32>>,
    pub search_terms: Option<String>,
    pub album_id: Option<AlbumFilter>,
    pub user_id: Option<i32>,
    pub group_id: Option<i32>,
    pub privacy: Option<Vec<Privacy>>,
    pub activity_id: Option<i32>,
    pub count_total: Option<bool>,
}

fn replace<T>(target: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *target = value;
    }
}

impl QueryOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge `other` into `self`; values set in `other` win.
    pub fn merge(&mut self, other: QueryOverrides) {
        replace(&mut self.page, other.page);
        replace(&mut self.per_page, other.per_page);
        replace(&mut self.max, other.max);
        replace(&mut self.fields, other.fields);
        replace(&mut self.sort, other.sort);
        replace(&mut self.order_by, other.order_by);
        replace(&mut self.exclude, other.exclude);
        replace(&mut self.include, other.include);
        replace(&mut self.search_terms, other.search_terms);
        replace(&mut self.album_id, other.album_id);
        replace(&mut self.user_id, other.user_id);
        replace(&mut self.group_id, other.group_id);
        replace(&mut self.privacy, other.privacy);
        replace(&mut self.activity_id, other.activity_id);
        replace(&mut self.count_total, other.count_total);
    }

    /// Replace the same-named arguments of `args`.
    pub fn apply(&self, args: &mut VideoQueryArgs) {
        let o = self.clone();
        replace(&mut args.page, o.page);
        replace(&mut args.per_page, o.per_page);
        replace(&mut args.max, o.max);
        replace(&mut args.search_terms, o.search_terms);
        replace(&mut args.album_id, o.album_id);
        replace(&mut args.user_id, o.user_id);
        replace(&mut args.group_id, o.group_id);
        replace(&mut args.activity_id, o.activity_id);
        if let Some(fields) = o.fields {
            args.fields = fields;
        }
        if let Some(sort) = o.sort {
            args.sort = sort;
        }
        if let Some(order_by) = o.order_by {
            args.order_by = order_by;
        }
        if let Some(exclude) = o.exclude {
            args.exclude = exclude;
        }
        if let Some(include) = o.include {
            args.include = include;
        }
        if let Some(privacy) = o.privacy {
            args.privacy = privacy;
        }
        if let Some(count_total) = o.count_total {
            args.count_total = count_total;
        }
    }
}

/// What a scope handler contributes to a query.
#[derive(Clone, Debug, Default)]
pub struct ScopeArgs {
    pub conditions: Option<VideoQuery>,
    pub overrides: QueryOverrides,
}

impl ScopeArgs {
    pub fn new(conditions: VideoQuery) -> Self {
        Self {
            conditions: Some(conditions),
            overrides: QueryOverrides::default(),
        }
    }

    pub fn with_overrides(mut self, overrides: QueryOverrides) -> Self {
        self.overrides.merge(overrides);
        self
    }
}

/// Compiled scope predicate plus the merged overrides of every scope.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScopeQuery {
    pub sql: Option<SqlFragment>,
    pub overrides: QueryOverrides,
}

/// Split scope names given as comma separated strings.
pub fn parse_scopes<S: AsRef<str>>(scopes: &[S]) -> Vec<String> {
    scopes
        .iter()
        .flat_map(|s| s.as_ref().split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Build the scope predicate for `scopes`.
///
/// Scope conditions are OR-ed together when more than one scope is requested.
/// Overrides of later scopes replace those of earlier ones. Returns `None`
/// when no scope name was given.
pub fn scope_query_sql(
    hooks: &Hooks,
    scopes: &[String],
    args: &VideoQueryArgs,
) -> Option<ScopeQuery> {
    let scopes = parse_scopes(scopes);
    if scopes.is_empty() {
        return None;
    }

    let mut overrides = QueryOverrides::default();
    let mut queries = Vec::new();

    for scope in &scopes {
        let scope_args = match hooks.scope_args(scope, args) {
            Some(scope_args) => scope_args,
            None => {
                log::debug!("No handler registered for video scope {}", scope);
                continue;
            }
        };

        overrides.merge(scope_args.overrides);
        if let Some(conditions) = scope_args.conditions {
            queries.push(conditions);
        }
    }

    let relation = if scopes.len() > 1 {
        QueryRelation::Or
    } else {
        QueryRelation::And
    };
    let sql = VideoQuery::Group { relation, queries }.to_sql();

    Some(ScopeQuery { sql, overrides })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hooks() -> Hooks {
        let mut hooks = Hooks::default();
        hooks.add_scope("groups", |_, _| {
            ScopeArgs::new(VideoQuery::all(vec![
                VideoQuery::eq(videos::Column::GroupId, 3),
                VideoQuery::eq(videos::Column::Privacy, "grouponly"),
            ]))
            .with_overrides(QueryOverrides {
                order_by: Some("menu_order".to_string()),
                ..Default::default()
            })
        });
        hooks.add_scope("personal", |_, args| {
            ScopeArgs::new(VideoQuery::eq(
                videos::Column::UserId,
                args.user_id.unwrap_or(0),
            ))
            .with_overrides(QueryOverrides {
                order_by: Some("id".to_string()),
                ..Default::default()
            })
        });
        hooks
    }

    #[test]
    fn test_parse_scopes() {
        assert_eq!(
            parse_scopes(&["groups, friends", "", "personal"]),
            vec!["groups", "friends", "personal"]
        );
    }

    #[test]
    fn test_single_scope_uses_and() {
        let query = scope_query_sql(
            &hooks(),
            &["groups".to_string()],
            &VideoQueryArgs::default(),
        )
        .unwrap();

        let sql = query.sql.unwrap();
        assert_eq!(sql.sql, "( m.group_id = ? AND m.privacy = ? )");
        assert_eq!(
            sql.values,
            vec![Value::from(3i64), Value::from("grouponly".to_string())]
        );
        assert_eq!(query.overrides.order_by.as_deref(), Some("menu_order"));
    }

    #[test]
    fn test_multiple_scopes_use_or_and_later_overrides_win() {
        let args = VideoQueryArgs {
            user_id: Some(7),
            ..Default::default()
        };
        let query = scope_query_sql(
            &hooks(),
            &["groups,personal".to_string()],
            &args,
        )
        .unwrap();

        let sql = query.sql.unwrap();
        assert_eq!(
            sql.sql,
            "( ( m.group_id = ? AND m.privacy = ? ) OR m.user_id = ? )"
        );
        assert_eq!(
            sql.values,
            vec![
                Value::from(3i64),
                Value::from("grouponly".to_string()),
                Value::from(7i64)
            ]
        );
        assert_eq!(query.overrides.order_by.as_deref(), Some("id"));
    }

    #[test]
    fn test_unregistered_scope_has_no_sql() {
        let query = scope_query_sql(
            &hooks(),
            &["mentions".to_string()],
            &VideoQueryArgs::default(),
        )
        .unwrap();
        assert_eq!(query.sql, None);
        assert!(query.overrides.is_empty());

        assert!(scope_query_sql(&hooks(), &[], &VideoQueryArgs::default()).is_none());
    }

    #[test]
    fn test_handlers_of_one_scope_are_folded() {
        let mut hooks = Hooks::default();
        hooks.add_scope("public", |_, _| {
            ScopeArgs::new(VideoQuery::eq(videos::Column::Privacy, "public"))
        });
        hooks.add_scope("public", |scope, _| {
            let previous = scope.conditions.into_iter().collect::<Vec<_>>();
            let mut queries = previous;
            queries.push(VideoQuery::clause(
                videos::Column::AlbumId,
                Compare::NotIn,
                vec![4, 5],
            ));
            ScopeArgs::new(VideoQuery::all(queries))
        });

        let query = scope_query_sql(
            &hooks,
            &["public".to_string()],
            &VideoQueryArgs::default(),
        )
        .unwrap();
        let sql = query.sql.unwrap();
        assert_eq!(sql.sql, "( m.privacy = ? AND m.album_id NOT IN (?, ?) )");
        assert_eq!(
            sql.values,
            vec![
                Value::from("public".to_string()),
                Value::from(4i64),
                Value::from(5i64)
            ]
        );
    }

    #[test]
    fn test_empty_in_list_matches_nothing() {
        let empty: Vec<i32> = Vec::new();
        let q = VideoQuery::clause(videos::Column::Id, Compare::In, empty.clone());
        assert_eq!(q.to_sql().map(|f| f.sql).as_deref(), Some("1 = 0"));

        let q = VideoQuery::clause(videos::Column::Id, Compare::NotIn, empty);
        assert_eq!(q.to_sql(), None);
    }

    #[test]
    fn test_overrides_apply_to_args() {
        let mut args = VideoQueryArgs::default();
        QueryOverrides {
            user_id: Some(9),
            privacy: Some(vec![Privacy::Public, Privacy::LoggedIn]),
            count_total: Some(true),
            ..Default::default()
        }
        .apply(&mut args);

        assert_eq!(args.user_id, Some(9));
        assert_eq!(args.privacy, vec![Privacy::Public, Privacy::LoggedIn]);
        assert!(args.count_total);
        assert_eq!(args.order_by, "date_created");
    }
}
