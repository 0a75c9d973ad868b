use sqlx::{Postgres, QueryBuilder};

use crate::config::ApiConfig;
use crate::database::models::User;

pub const LOGIN_SUBSTRING_PARAM: &str = "loginSubstring";
pub const LIMIT_PARAM: &str = "limit";

/// Selection over the users table. Soft-deleted users never match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserFilter {
    /// OR-combined substrings of `login`; empty means "no login predicate".
    pub login_substrings: Vec<String>,
    pub limit: u32,
}

impl UserFilter {
    pub fn all(limit: u32) -> Self {
        Self {
            login_substrings: Vec::new(),
            limit,
        }
    }

    pub fn suggest(login_substrings: Vec<String>, limit: u32) -> Self {
        Self {
            login_substrings,
            limit,
        }
    }

    pub fn is_suggest(&self) -> bool {
        !self.login_substrings.is_empty()
    }

    pub fn matches(&self, user: &User) -> bool {
        if user.is_deleted {
            return false;
        }
        !self.is_suggest()
            || self
                .login_substrings
                .iter()
                .any(|fragment| user.login.contains(fragment.as_str()))
    }

    /// Append the WHERE and LIMIT clauses to a `SELECT ... FROM users` query.
    pub fn push_sql(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE NOT is_deleted");

        if self.is_suggest() {
            qb.push(" AND EXISTS (SELECT 1 FROM unnest(")
                .push_bind(self.login_substrings.clone())
                .push("::text[]) AS s(fragment) WHERE strpos(login, s.fragment) > 0)");
        }

        qb.push(" LIMIT ").push_bind(i64::from(self.limit));
    }
}

/// Raw `GET /users` query parameters, as repeated key/value pairs.
#[derive(Debug, Default)]
pub struct ListQuery {
    login_substrings: Vec<String>,
    limits: Vec<String>,
}

impl ListQuery {
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let mut query = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                k if k == LOGIN_SUBSTRING_PARAM || k == "loginSubstring[]" => {
                    query.login_substrings.push(value.clone())
                }
                LIMIT_PARAM => query.limits.push(value.clone()),
                _ => {}
            }
        }
        query
    }

    /// A single numeric `limit` is honoured (clamped); anything else falls back to the default.
    pub fn requested_limit(&self) -> Option<u64> {
        match self.limits.as_slice() {
            [single] => parse_limit(single),
            _ => None,
        }
    }

    pub fn into_filter(self, api: &ApiConfig) -> UserFilter {
        let limit = api.clamp_limit(self.requested_limit());
        UserFilter::suggest(self.login_substrings, limit)
    }
}

fn parse_limit(raw: &str) -> Option<u64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(n) = trimmed.parse::<u64>() {
        return Some(n);
    }
    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() && n >= 0.0 => Some(n.trunc() as u64),
        _ => None,
    }
}
