//! Casting API models.
//!
//! Database rows double as the short JSON forms; long forms flatten the row
//! and add the related records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// Pagination
// ============================================================================

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PER_PAGE: i64 = 20;
pub const MAX_PER_PAGE: i64 = 50;

/// Query string accepted by list endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// Case-insensitive `ILIKE` pattern, used verbatim (`%` and `_` are wildcards).
    pub search_term: Option<String>,
}

/// Validated page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
}

impl Pagination {
    /// Apply defaults and the per-page cap.
    ///
    /// # Errors
    ///
    /// Returns an error message if `page` or `per_page` is below 1.
    pub fn from_query(query: &ListQuery) -> Result<Self, &'static str> {
        let page = query.page.unwrap_or(DEFAULT_PAGE);
        if page < 1 {
            return Err("page must be at least 1");
        }

        let per_page = query.per_page.unwrap_or(DEFAULT_PER_PAGE);
        if per_page < 1 {
            return Err("per_page must be at least 1");
        }

        Ok(Self {
            page,
            per_page: per_page.min(MAX_PER_PAGE),
        })
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    /// Number of pages needed for `total_items`.
    pub fn pages(&self, total_items: i64) -> i64 {
        (total_items + self.per_page - 1) / self.per_page
    }
}

/// A page of results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_items: i64,
    pub page: i64,
    pub pages: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_items: i64, pagination: Pagination) -> Self {
        Self {
            items,
            total_items,
            page: pagination.page,
            pages: pagination.pages(total_items),
        }
    }
}

// ============================================================================
// Actors
// ============================================================================

/// Actor gender. Stored lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }

    /// Case-insensitive parse.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            "other" => Some(Gender::Other),
            _ => None,
        }
    }
}

/// Actor row and short JSON form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorRow {
    pub id: i32,
    pub name: String,
    pub age: i32,
    pub gender: String,
}

/// Actor with the movies it appears in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorDetail {
    #[serde(flatten)]
    pub actor: ActorRow,
    pub movies: Vec<MovieRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateActorRequest {
    pub name: String,
    pub age: i32,
    pub gender: String,
    /// Movie ids to link. Unknown ids are ignored.
    #[serde(default)]
    pub movies: Option<Vec<i32>>,
}

impl CreateActorRequest {
    /// Validate the request and return the parsed gender.
    ///
    /// # Errors
    ///
    /// Returns an error message if validation fails.
    pub fn validate(&self) -> Result<Gender, &'static str> {
        validate_name(&self.name)?;
        validate_age(self.age)?;
        Gender::parse(&self.gender).ok_or("gender must be one of: male, female, other")
    }
}

/// Partial actor update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateActorRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub age: Option<i32>,
    /// An unrecognized value is ignored.
    #[serde(default)]
    pub gender: Option<String>,
    /// Replaces the actor's movie links when present.
    #[serde(default)]
    pub movies: Option<Vec<i32>>,
}

impl UpdateActorRequest {
    /// # Errors
    ///
    /// Returns an error message if validation fails.
    pub fn validate(&self) -> Result<(), &'static str> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(age) = self.age {
            validate_age(age)?;
        }
        Ok(())
    }

    pub fn gender(&self) -> Option<Gender> {
        self.gender.as_deref().and_then(Gender::parse)
    }
}

// ============================================================================
// Movies
// ============================================================================

/// Movie row and short JSON form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieRow {
    pub id: i32,
    pub title: String,
    /// Serialized as `YYYY-MM-DD`.
    pub release_date: NaiveDate,
}

/// Movie with its cast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieDetail {
    #[serde(flatten)]
    pub movie: MovieRow,
    pub actors: Vec<ActorRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMovieRequest {
    pub title: String,
    pub release_date: NaiveDate,
    /// Actor ids to link. Unknown ids are ignored.
    #[serde(default)]
    pub actors: Option<Vec<i32>>,
}

impl CreateMovieRequest {
    /// # Errors
    ///
    /// Returns an error message if validation fails.
    pub fn validate(&self) -> Result<(), &'static str> {
        validate_title(&self.title)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMovieRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub release_date: Option<NaiveDate>,
    /// Replaces the movie's cast when present.
    #[serde(default)]
    pub actors: Option<Vec<i32>>,
}

impl UpdateMovieRequest {
    /// # Errors
    ///
    /// Returns an error message if validation fails.
    pub fn validate(&self) -> Result<(), &'static str> {
        match &self.title {
            Some(title) => validate_title(title),
            None => Ok(()),
        }
    }
}

// ============================================================================
// Users
// ============================================================================

/// User row and short JSON form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRow {
    pub id: i32,
    pub name: String,
}

/// User with linked identity provider accounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: UserRow,
    /// Subject identifiers (`oauth_id`) linked to this user.
    pub accounts: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub name: Option<String>,
}

impl UpdateUserRequest {
    /// # Errors
    ///
    /// Returns an error message if validation fails.
    pub fn validate(&self) -> Result<(), &'static str> {
        match &self.name {
            Some(name) => validate_name(name),
            None => Ok(()),
        }
    }
}

/// Response for `GET /api/v1/me`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: UserDetail,
    pub permissions: Vec<String>,
}

// ============================================================================
// Health
// ============================================================================

/// Readiness check response returned by `/ready`.
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    /// "ready" or "not_ready".
    pub status: &'static str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<&'static str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwks: Option<&'static str>,

    /// Generic error message, no infrastructure details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Field validation
// ============================================================================

pub const MAX_NAME_LENGTH: usize = 255;

fn validate_name(name: &str) -> Result<(), &'static str> {
    let name = name.trim();
    if name.is_empty() {
        return Err("name is required");
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err("name must be at most 255 characters");
    }
    Ok(())
}

fn validate_age(age: i32) -> Result<(), &'static str> {
    if age < 0 {
        return Err("age must not be negative");
    }
    Ok(())
}

fn validate_title(title: &str) -> Result<(), &'static str> {
    let title = title.trim();
    if title.is_empty() {
        return Err("title is required");
    }
    if title.chars().count() > MAX_NAME_LENGTH {
        return Err("title must be at most 255 characters");
    }
    Ok(())
}
