//! Book search: filters, deterministic ordering and page slicing.

use std::str::FromStr;

use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use uuid::Uuid;

use super::models::{Book, BookRow};
use super::repository::BOOK_COLUMNS;
use crate::error::CatalogResult;
use crate::utils::validation::Validator;
use crate::utils::{contains_pattern, dedupe, normalize_key};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Search filters; all present filters must hold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookFilters {
    /// Case-insensitive substring of title or description.
    pub q: Option<String>,
    pub genre_id: Option<Uuid>,
    /// Book must carry every listed genre.
    pub genre_ids: Vec<Uuid>,
    pub contributor_id: Option<Uuid>,
    pub published_year: Option<i32>,
    pub published_year_min: Option<i32>,
    pub published_year_max: Option<i32>,
    pub rating_min: Option<f64>,
    pub rating_max: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    Title,
    Rating,
    PublishedYear,
    CreatedAt,
}

impl SortField {
    fn column(self) -> &'static str {
        match self {
            SortField::Title => "b.title_key",
            SortField::Rating => "b.rating",
            SortField::PublishedYear => "b.published_year",
            SortField::CreatedAt => "b.created_at",
        }
    }

    fn nullable(self) -> bool {
        matches!(self, SortField::Rating | SortField::PublishedYear)
    }
}

impl FromStr for SortField {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "title" => Ok(SortField::Title),
            "rating" => Ok(SortField::Rating),
            "published_year" => Ok(SortField::PublishedYear),
            "created_at" => Ok(SortField::CreatedAt),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    fn keyword(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl FromStr for SortOrder {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BookSort {
    pub field: SortField,
    pub order: SortOrder,
}

/// 1-indexed page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: u32,
    page_size: u32,
}

impl Pagination {
    /// `None` when `page` is 0 or `page_size` is outside `1..=MAX_PAGE_SIZE`.
    pub fn new(page: u32, page_size: u32) -> Option<Self> {
        (page >= 1 && (1..=MAX_PAGE_SIZE).contains(&page_size)).then_some(Self { page, page_size })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }

    /// Number of pages needed for `total` items.
    pub fn pages(&self, total: u64) -> u64 {
        total.div_ceil(u64::from(self.page_size))
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookSearch {
    pub filters: BookFilters,
    pub sort: BookSort,
    pub page: Pagination,
}

impl BookSearch {
    /// Build a search from raw query-string pairs.
    ///
    /// Empty values are ignored, as are unknown keys. Every malformed value is
    /// reported in one validation error.
    pub fn from_pairs(pairs: &[(String, String)]) -> CatalogResult<Self> {
        let mut v = Validator::new();
        let mut search = BookSearch::default();
        let mut page = 1_i64;
        let mut page_size = i64::from(DEFAULT_PAGE_SIZE);

        for (key, raw) in pairs {
            let value = raw.trim();
            if value.is_empty() {
                continue;
            }

            let filters = &mut search.filters;
            match key.as_str() {
                "q" => filters.q = Some(value.to_string()),
                "genre_id" => filters.genre_id = parse_value(&mut v, key, value),
                "genre_ids" | "genre_ids[]" => {
                    if let Some(id) = parse_value(&mut v, "genre_ids", value) {
                        filters.genre_ids.push(id);
                    }
                }
                "contributor_id" => filters.contributor_id = parse_value(&mut v, key, value),
                "published_year" => filters.published_year = parse_value(&mut v, key, value),
                "published_year_min" => filters.published_year_min = parse_value(&mut v, key, value),
                "published_year_max" => filters.published_year_max = parse_value(&mut v, key, value),
                "rating_min" => filters.rating_min = parse_rating(&mut v, key, value),
                "rating_max" => filters.rating_max = parse_rating(&mut v, key, value),
                "sort" => match value.parse() {
                    Ok(field) => search.sort.field = field,
                    Err(()) => v.issue(key, "must be one of title, rating, published_year, created_at"),
                },
                "order" => match value.parse() {
                    Ok(order) => search.sort.order = order,
                    Err(()) => v.issue(key, "must be asc or desc"),
                },
                "page" => page = parse_value(&mut v, key, value).unwrap_or(page),
                "page_size" => page_size = parse_value(&mut v, key, value).unwrap_or(page_size),
                _ => {}
            }
        }

        if page < 1 || page > i64::from(u32::MAX) {
            v.issue("page", "must be at least 1");
        }
        if !(1..=i64::from(MAX_PAGE_SIZE)).contains(&page_size) {
            v.issue("page_size", format!("must be between 1 and {}", MAX_PAGE_SIZE));
        }
        v.finish()?;

        if let Some(window) = u32::try_from(page)
            .ok()
            .zip(u32::try_from(page_size).ok())
            .and_then(|(page, page_size)| Pagination::new(page, page_size))
        {
            search.page = window;
        }
        search.filters.genre_ids = dedupe(&search.filters.genre_ids);
        Ok(search)
    }
}

fn parse_value<T: FromStr>(v: &mut Validator, key: &str, value: &str) -> Option<T> {
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            v.issue(key, format!("'{}' is not a valid value", value));
            None
        }
    }
}

fn parse_rating(v: &mut Validator, key: &str, value: &str) -> Option<f64> {
    parse_value::<f64>(v, key, value).filter(|rating| {
        let finite = rating.is_finite();
        if !finite {
            v.issue(key, "must be a finite number");
        }
        finite
    })
}

/// Fetch one page of matching books plus the total match count.
pub(crate) async fn search_rows(
    conn: &mut SqliteConnection,
    search: &BookSearch,
) -> CatalogResult<(Vec<Book>, u64)> {
    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM book b WHERE 1 = 1");
    push_filters(&mut count, &search.filters);
    let total: i64 = count.build_query_scalar().fetch_one(&mut *conn).await?;

    let mut select =
        QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM book b WHERE 1 = 1", BOOK_COLUMNS));
    push_filters(&mut select, &search.filters);
    push_order(&mut select, search.sort);
    select
        .push(" LIMIT ")
        .push_bind(i64::from(search.page.page_size()))
        .push(" OFFSET ")
        .push_bind(i64::try_from(search.page.offset()).unwrap_or(i64::MAX));

    let rows: Vec<BookRow> = select.build_query_as().fetch_all(&mut *conn).await?;
    let books = rows
        .into_iter()
        .map(Book::try_from)
        .collect::<CatalogResult<Vec<_>>>()?;

    Ok((books, u64::try_from(total).unwrap_or_default()))
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filters: &BookFilters) {
    if let Some(q) = filters.q.as_deref() {
        // Both key columns hold Unicode-lowercased text.
        let pattern = contains_pattern(&normalize_key(q));
        qb.push(" AND (b.title_key LIKE ")
            .push_bind(pattern.clone())
            .push(r" ESCAPE '\' OR b.description_key LIKE ")
            .push_bind(pattern)
            .push(r" ESCAPE '\')");
    }

    if let Some(genre_id) = filters.genre_id {
        qb.push(" AND EXISTS (SELECT 1 FROM book_genre bg WHERE bg.book_id = b.id AND bg.genre_id = ")
            .push_bind(genre_id.to_string())
            .push(")");
    }

    if !filters.genre_ids.is_empty() {
        let wanted = dedupe(&filters.genre_ids);
        qb.push(" AND b.id IN (SELECT bg.book_id FROM book_genre bg WHERE bg.genre_id IN (");
        let mut list = qb.separated(", ");
        for id in &wanted {
            list.push_bind(id.to_string());
        }
        list.push_unseparated(") GROUP BY bg.book_id HAVING COUNT(DISTINCT bg.genre_id) = ");
        qb.push_bind(i64::try_from(wanted.len()).unwrap_or(i64::MAX)).push(")");
    }

    if let Some(contributor_id) = filters.contributor_id {
        qb.push(
            " AND EXISTS (SELECT 1 FROM book_contributor bc WHERE bc.book_id = b.id AND bc.contributor_id = ",
        )
        .push_bind(contributor_id.to_string())
        .push(")");
    }

    if let Some(year) = filters.published_year {
        qb.push(" AND b.published_year = ").push_bind(year);
    }
    if let Some(year) = filters.published_year_min {
        qb.push(" AND b.published_year >= ").push_bind(year);
    }
    if let Some(year) = filters.published_year_max {
        qb.push(" AND b.published_year <= ").push_bind(year);
    }
    if let Some(rating) = filters.rating_min {
        qb.push(" AND b.rating >= ").push_bind(rating);
    }
    if let Some(rating) = filters.rating_max {
        qb.push(" AND b.rating <= ").push_bind(rating);
    }
}

/// Nulls sort last in either direction; id breaks ties.
fn push_order(qb: &mut QueryBuilder<'_, Sqlite>, sort: BookSort) {
    let column = sort.field.column();
    let direction = sort.order.keyword();

    if sort.field.nullable() {
        qb.push(format!(" ORDER BY {column} IS NULL, {column} {direction}, b.id ASC"));
    } else {
        qb.push(format!(" ORDER BY {column} {direction}, b.id ASC"));
    }
}
