//! Savings goals that income can be put towards.

mod core;
mod create;
mod delete;
mod list;

pub use core::{
    Goal, NewGoal, adjust_goal_amount, create_goal, create_goal_table, get_goal, get_goals,
};
pub use create::{create_goal_endpoint, get_new_goal_page};
pub use delete::delete_goal_endpoint;
pub use list::{get_goals_page, goal_card};
