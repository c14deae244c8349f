use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult, FieldErrors};
use crate::listing::SortKey;

const MAX_TITLE_LEN: usize = 255;
const PRICE_DECIMAL_PLACES: u32 = 2;
// max_digits = 6
const MAX_PRICE: i64 = 10_000;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Category {
    pub id: u64,
    pub slug: String,
    pub title: String,
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub slug: String,
    pub title: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CategoryInput {
    pub slug: Option<String>,
    pub title: Option<String>,
}

impl CategoryInput {
    pub fn validate(self) -> AppResult<NewCategory> {
        let mut errors = FieldErrors::new();
        let slug = errors
            .require("slug", self.slug)
            .map(|slug| slug.trim().to_string());
        if let Some(slug) = &slug {
            let valid = !slug.is_empty()
                && slug
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
            if !valid {
                errors.add(
                    "slug",
                    "Enter a valid slug of letters, numbers, underscores or hyphens.",
                );
            }
        }
        let title = errors.require("title", self.title).map(|t| check_title(&mut errors, t));

        let (Some(slug), Some(title)) = (slug, title) else {
            return Err(AppError::Validation(errors));
        };
        errors.into_result()?;
        Ok(NewCategory { slug, title })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MenuItem {
    pub id: u64,
    pub title: String,
    pub price: Decimal,
    pub featured: bool,
    pub category: u64,
}

#[derive(Debug, Clone)]
pub struct NewMenuItem {
    pub title: String,
    pub price: Decimal,
    pub featured: bool,
    pub category: u64,
}

/// Request body for creating, replacing or patching a menu item.
#[derive(Debug, Default, Deserialize)]
pub struct MenuItemInput {
    pub title: Option<String>,
    pub price: Option<Decimal>,
    pub featured: Option<bool>,
    pub category: Option<u64>,
}

impl MenuItemInput {
    /// Validates a full representation. `featured` defaults to false.
    pub fn into_new(self) -> AppResult<NewMenuItem> {
        let mut errors = FieldErrors::new();
        let title = errors
            .require("title", self.title)
            .map(|t| check_title(&mut errors, t));
        let price = errors
            .require("price", self.price)
            .map(|p| check_price(&mut errors, p));
        let category = errors.require("category", self.category);

        let (Some(title), Some(price), Some(category)) = (title, price, category) else {
            return Err(AppError::Validation(errors));
        };
        errors.into_result()?;
        Ok(NewMenuItem {
            title,
            price,
            featured: self.featured.unwrap_or(false),
            category,
        })
    }

    /// Applies only the fields present in the request.
    pub fn apply_to(self, item: &MenuItem) -> AppResult<MenuItem> {
        let mut errors = FieldErrors::new();
        let mut updated = item.clone();
        if let Some(title) = self.title {
            updated.title = check_title(&mut errors, title);
        }
        if let Some(price) = self.price {
            updated.price = check_price(&mut errors, price);
        }
        if let Some(featured) = self.featured {
            updated.featured = featured;
        }
        if let Some(category) = self.category {
            updated.category = category;
        }
        errors.into_result().map(|()| updated)
    }
}

impl NewMenuItem {
    pub fn with_id(self, id: u64) -> MenuItem {
        MenuItem {
            id,
            title: self.title,
            price: self.price,
            featured: self.featured,
            category: self.category,
        }
    }
}

fn check_title(errors: &mut FieldErrors, title: String) -> String {
    let title = title.trim().to_string();
    if title.is_empty() {
        errors.add("title", "This field may not be blank.");
    } else if title.chars().count() > MAX_TITLE_LEN {
        errors.add(
            "title",
            format!("Ensure this field has no more than {MAX_TITLE_LEN} characters."),
        );
    }
    title
}

fn check_price(errors: &mut FieldErrors, price: Decimal) -> Decimal {
    if price <= Decimal::ZERO {
        errors.add("price", "Ensure this value is greater than 0.");
    }
    if price.normalize().scale() > PRICE_DECIMAL_PLACES {
        errors.add(
            "price",
            format!("Ensure that there are no more than {PRICE_DECIMAL_PLACES} decimal places."),
        );
    }
    if price >= Decimal::from(MAX_PRICE) {
        errors.add("price", "Ensure that there are no more than 6 digits in total.");
    }
    price
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuSortField {
    Title,
    Price,
}

impl FromStr for MenuSortField {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "title" => Ok(MenuSortField::Title),
            "price" => Ok(MenuSortField::Price),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MenuQuery {
    pub category: Option<u64>,
    pub ordering: Option<String>,
}

impl MenuQuery {
    /// Filters by category and sorts by the requested key. Without a key the
    /// items keep id order.
    pub fn apply(&self, mut items: Vec<MenuItem>) -> AppResult<Vec<MenuItem>> {
        let sort = SortKey::<MenuSortField>::parse(self.ordering.as_deref())?;
        if let Some(category) = self.category {
            items.retain(|item| item.category == category);
        }
        items.sort_by_key(|item| item.id);
        if let Some(sort) = sort {
            items.sort_by(|a, b| {
                let ordering = match sort.field {
                    MenuSortField::Title => a.title.cmp(&b.title),
                    MenuSortField::Price => a.price.cmp(&b.price),
                };
                sort.direct(ordering)
            });
        }
        Ok(items)
    }
}
