//! Extension points of the video repository.
//!
//! Hooks are plain closures stored in registration order. They are registered
//! while the repository is being set up and only read afterwards.

use super::delete::DeleteFilter;
use super::error::SaveErrors;
use super::query::{Video, VideoQueryArgs};
use super::scope::ScopeArgs;
use super::sql::{Sort, WhereClause};
use super::VideoDraft;
use crate::activities::Activity;
use crate::orm::videos;
use std::collections::HashMap;

pub type BeforeSaveHook = Box<dyn Fn(&mut VideoDraft, &mut SaveErrors) + Send + Sync>;
pub type AfterSaveHook = Box<dyn Fn(&videos::Model) + Send + Sync>;
pub type DeleteHook = Box<dyn Fn(&[videos::Model], &DeleteFilter) + Send + Sync>;
pub type WhereHook = Box<dyn Fn(&mut WhereClause, &VideoQueryArgs) + Send + Sync>;
/// Receives the JOIN clause, the query args and the WHERE clause.
/// The JOIN text is placed before the WHERE clause, so it must not add `?` placeholders.
pub type JoinSqlHook = Box<dyn Fn(String, &VideoQueryArgs, &str) -> String + Send + Sync>;
pub type PagedSqlHook = Box<dyn Fn(String, &VideoQueryArgs) -> String + Send + Sync>;
/// Receives the count statement, the WHERE clause and the sort direction.
pub type TotalSqlHook = Box<dyn Fn(String, &str, Sort) -> String + Send + Sync>;
pub type PrefetchHook = Box<dyn Fn(&mut Vec<Video>) + Send + Sync>;
pub type UserSearchHook = Box<dyn Fn(bool, &VideoQueryArgs) -> bool + Send + Sync>;
pub type ScopeHandler = Box<dyn Fn(ScopeArgs, &VideoQueryArgs) -> ScopeArgs + Send + Sync>;
pub type BeforeActivityDeleteHook = Box<dyn Fn(&Activity) + Send + Sync>;
/// Receives the deleted activity id and its author.
pub type AfterActivityDeleteHook = Box<dyn Fn(i32, i32) + Send + Sync>;

/// Registry of every video extension point.
#[derive(Default)]
pub struct Hooks {
    include_user_search: bool,
    before_save: Vec<BeforeSaveHook>,
    after_save: Vec<AfterSaveHook>,
    before_delete: Vec<DeleteHook>,
    after_delete: Vec<DeleteHook>,
    where_conditions: Vec<WhereHook>,
    join_sql: Vec<JoinSqlHook>,
    paged_sql: Vec<PagedSqlHook>,
    total_sql: Vec<TotalSqlHook>,
    prefetch: Vec<PrefetchHook>,
    user_search: Vec<UserSearchHook>,
    scopes: HashMap<String, Vec<ScopeHandler>>,
    before_activity_delete: Vec<BeforeActivityDeleteHook>,
    after_activity_delete: Vec<AfterActivityDeleteHook>,
}

impl Hooks {
    /// Empty registry. `include_user_search` seeds the user search extension point.
    pub fn new(include_user_search: bool) -> Self {
        Self {
            include_user_search,
            ..Default::default()
        }
    }

    /// Mutate a draft before it is persisted. Errors added here fail a
    /// structured-mode save.
    pub fn on_before_save<F>(&mut self, hook: F)
    where
        F: Fn(&mut VideoDraft, &mut SaveErrors) + Send + Sync + 'static,
    {
        self.before_save.push(Box::new(hook));
    }

    pub fn on_after_save<F>(&mut self, hook: F)
    where
        F: Fn(&videos::Model) + Send + Sync + 'static,
    {
        self.after_save.push(Box::new(hook));
    }

    pub fn on_before_delete<F>(&mut self, hook: F)
    where
        F: Fn(&[videos::Model], &DeleteFilter) + Send + Sync + 'static,
    {
        self.before_delete.push(Box::new(hook));
    }

    pub fn on_after_delete<F>(&mut self, hook: F)
    where
        F: Fn(&[videos::Model], &DeleteFilter) + Send + Sync + 'static,
    {
        self.after_delete.push(Box::new(hook));
    }

    pub fn filter_where_conditions<F>(&mut self, hook: F)
    where
        F: Fn(&mut WhereClause, &VideoQueryArgs) + Send + Sync + 'static,
    {
        self.where_conditions.push(Box::new(hook));
    }

    pub fn filter_join_sql<F>(&mut self, hook: F)
    where
        F: Fn(String, &VideoQueryArgs, &str) -> String + Send + Sync + 'static,
    {
        self.join_sql.push(Box::new(hook));
    }

    pub fn filter_paged_sql<F>(&mut self, hook: F)
    where
        F: Fn(String, &VideoQueryArgs) -> String + Send + Sync + 'static,
    {
        self.paged_sql.push(Box::new(hook));
    }

    pub fn filter_total_sql<F>(&mut self, hook: F)
    where
        F: Fn(String, &str, Sort) -> String + Send + Sync + 'static,
    {
        self.total_sql.push(Box::new(hook));
    }

    pub fn on_prefetch<F>(&mut self, hook: F)
    where
        F: Fn(&mut Vec<Video>) + Send + Sync + 'static,
    {
        self.prefetch.push(Box::new(hook));
    }

    pub fn filter_include_user_search<F>(&mut self, hook: F)
    where
        F: Fn(bool, &VideoQueryArgs) -> bool + Send + Sync + 'static,
    {
        self.user_search.push(Box::new(hook));
    }

    /// Register a handler for the scope `name`. Handlers of one scope run in
    /// registration order, each receiving the previous handler's result.
    pub fn add_scope<F>(&mut self, name: &str, handler: F)
    where
        F: Fn(ScopeArgs, &VideoQueryArgs) -> ScopeArgs + Send + Sync + 'static,
    {
        self.scopes
            .entry(name.to_string())
            .or_default()
            .push(Box::new(handler));
    }

    pub fn has_scope(&self, name: &str) -> bool {
        self.scopes.contains_key(name)
    }

    pub fn on_before_activity_delete<F>(&mut self, hook: F)
    where
        F: Fn(&Activity) + Send + Sync + 'static,
    {
        self.before_activity_delete.push(Box::new(hook));
    }

    pub fn on_after_activity_delete<F>(&mut self, hook: F)
    where
        F: Fn(i32, i32) + Send + Sync + 'static,
    {
        self.after_activity_delete.push(Box::new(hook));
    }

    pub(crate) fn before_save(&self, draft: &mut VideoDraft, errors: &mut SaveErrors) {
        for hook in &self.before_save {
            hook(draft, errors);
        }
    }

    pub(crate) fn after_save(&self, video: &videos::Model) {
        for hook in &self.after_save {
            hook(video);
        }
    }

    pub(crate) fn before_delete(&self, videos: &[videos::Model], filter: &DeleteFilter) {
        for hook in &self.before_delete {
            hook(videos, filter);
        }
    }

    pub(crate) fn after_delete(&self, videos: &[videos::Model], filter: &DeleteFilter) {
        for hook in &self.after_delete {
            hook(videos, filter);
        }
    }

    pub(crate) fn where_conditions(&self, clause: &mut WhereClause, args: &VideoQueryArgs) {
        for hook in &self.where_conditions {
            hook(clause, args);
        }
    }

    pub(crate) fn join_sql(&self, join: String, args: &VideoQueryArgs, where_sql: &str) -> String {
        self.join_sql
            .iter()
            .fold(join, |sql, hook| hook(sql, args, where_sql))
    }

    pub(crate) fn paged_sql(&self, sql: String, args: &VideoQueryArgs) -> String {
        self.paged_sql.iter().fold(sql, |sql, hook| hook(sql, args))
    }

    pub(crate) fn total_sql(&self, sql: String, where_sql: &str, sort: Sort) -> String {
        self.total_sql
            .iter()
            .fold(sql, |sql, hook| hook(sql, where_sql, sort))
    }

    pub(crate) fn prefetch(&self, videos: &mut Vec<Video>) {
        for hook in &self.prefetch {
            hook(videos);
        }
    }

    pub(crate) fn include_user_search(&self, args: &VideoQueryArgs) -> bool {
        self.user_search
            .iter()
            .fold(self.include_user_search, |include, hook| hook(include, args))
    }

    /// Fold every handler of `name` over an empty [`ScopeArgs`].
    /// `None` when nothing is registered for the scope.
    pub(crate) fn scope_args(&self, name: &str, args: &VideoQueryArgs) -> Option<ScopeArgs> {
        let handlers = self.scopes.get(name)?;
        Some(
            handlers
                .iter()
                .fold(ScopeArgs::default(), |scope, handler| handler(scope, args)),
        )
    }

    pub(crate) fn before_activity_delete(&self, activity: &Activity) {
        for hook in &self.before_activity_delete {
            hook(activity);
        }
    }

    pub(crate) fn after_activity_delete(&self, activity_id: i32, user_id: i32) {
        for hook in &self.after_activity_delete {
            hook(activity_id, user_id);
        }
    }
}
