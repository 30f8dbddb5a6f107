//! Categories for grouping income and expenses.

mod core;
mod create;
mod delete;
mod list;

pub use core::{
    Category, CategoryName, create_category_table, default_category_id, get_categories,
    normalize_color, resolve_category,
};
pub use create::{create_category_endpoint, get_new_category_page};
pub use delete::delete_category_endpoint;
pub use list::get_categories_page;

#[cfg(test)]
pub use core::create_category;
