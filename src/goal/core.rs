//! Savings goals and the running total credited to them.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error, auth::UserID, category::normalize_color, database_id::GoalId,
    transaction::validate_amount,
};

/// An amount of money a user is saving towards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: GoalId,
    pub user_id: UserID,
    pub name: String,
    pub target_amount: f64,
    /// The sum of the income transactions linked to this goal.
    pub current_amount: f64,
    pub start_date: Date,
    pub deadline: Option<Date>,
    pub color: String,
}

impl Goal {
    /// How far along the goal is as a whole percentage, capped at 100.
    pub fn progress_percent(&self) -> u8 {
        if self.target_amount <= 0.0 {
            return 0;
        }

        (self.current_amount / self.target_amount * 100.0)
            .round()
            .clamp(0.0, 100.0) as u8
    }

    /// How much is left to save, never negative.
    pub fn remaining_amount(&self) -> f64 {
        (self.target_amount - self.current_amount).max(0.0)
    }
}

/// The colour of a progress bar, from red for little progress to green.
pub fn progress_color(percent: u8) -> &'static str {
    match percent {
        0..25 => "#EF4444",
        25..50 => "#F59E0B",
        50..75 => "#3B82F6",
        _ => "#10B981",
    }
}

/// A validated goal that has not been saved yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewGoal {
    name: String,
    target_amount: f64,
    start_date: Date,
    deadline: Option<Date>,
    color: String,
}

impl NewGoal {
    /// # Errors
    /// Returns an [Error::EmptyGoalName] for a blank name, [Error::InvalidAmount]
    /// for a target that is not greater than zero and [Error::InvalidDateRange]
    /// if the deadline is before the start date.
    pub fn new(
        name: &str,
        target_amount: f64,
        start_date: Date,
        deadline: Option<Date>,
        color: &str,
    ) -> Result<Self, Error> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::EmptyGoalName);
        }

        let target_amount = validate_amount(target_amount)?;

        if deadline.is_some_and(|deadline| deadline < start_date) {
            return Err(Error::InvalidDateRange);
        }

        Ok(Self {
            name: name.to_owned(),
            target_amount,
            start_date,
            deadline,
            color: normalize_color(color),
        })
    }
}

const GOAL_COLUMNS: &str =
    "id, user_id, name, target_amount, current_amount, start_date, deadline, color";

pub fn create_goal(user_id: UserID, goal: NewGoal, connection: &Connection) -> Result<Goal, Error> {
    connection
        .prepare(&format!(
            "INSERT INTO goal (user_id, name, target_amount, current_amount, start_date, deadline, color)
             VALUES (?1, ?2, ?3, 0, ?4, ?5, ?6)
             RETURNING {GOAL_COLUMNS}"
        ))?
        .query_row(
            (
                user_id,
                goal.name,
                goal.target_amount,
                goal.start_date,
                goal.deadline,
                goal.color,
            ),
            map_row,
        )
        .map_err(|error| error.into())
}

/// Retrieve one of the user's goals.
///
/// # Errors
/// Returns [Error::NotFound] if the goal does not exist or belongs to someone else.
pub fn get_goal(goal_id: GoalId, user_id: UserID, connection: &Connection) -> Result<Goal, Error> {
    connection
        .prepare(&format!(
            "SELECT {GOAL_COLUMNS} FROM goal WHERE id = ?1 AND user_id = ?2"
        ))?
        .query_row((goal_id, user_id), map_row)
        .map_err(|error| error.into())
}

/// Retrieve the user's goals, those with the nearest deadline first.
pub fn get_goals(user_id: UserID, connection: &Connection) -> Result<Vec<Goal>, Error> {
    connection
        .prepare(&format!(
            "SELECT {GOAL_COLUMNS} FROM goal WHERE user_id = ?1
             ORDER BY deadline IS NULL, deadline ASC, name ASC"
        ))?
        .query_map([user_id], map_row)?
        .map(|maybe_goal| maybe_goal.map_err(|error| error.into()))
        .collect()
}

/// Add `delta` to the current amount of a goal in a single statement.
///
/// A negative `delta` takes a contribution back.
///
/// # Errors
/// Returns [Error::InvalidGoal] if the goal does not exist.
pub fn adjust_goal_amount(
    goal_id: GoalId,
    delta: f64,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE goal SET current_amount = current_amount + ?1 WHERE id = ?2",
        (delta, goal_id),
    )?;

    if rows_affected == 0 {
        return Err(Error::InvalidGoal(Some(goal_id)));
    }

    Ok(())
}

/// Delete one of the user's goals.
///
/// Transactions and scheduled transactions linked to the goal are kept and
/// lose the link.
pub fn delete_goal(goal_id: GoalId, user_id: UserID, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM goal WHERE id = ?1 AND user_id = ?2",
        (goal_id, user_id),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingGoal);
    }

    Ok(())
}

pub fn create_goal_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS goal (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            target_amount REAL NOT NULL,
            current_amount REAL NOT NULL DEFAULT 0,
            start_date TEXT NOT NULL,
            deadline TEXT,
            color TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_goal_user ON goal(user_id);",
    )
}

fn map_row(row: &Row) -> Result<Goal, rusqlite::Error> {
    Ok(Goal {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        name: row.get(2)?,
        target_amount: row.get(3)?,
        current_amount: row.get(4)?,
        start_date: row.get(5)?,
        deadline: row.get(6)?,
        color: row.get(7)?,
    })
}


#[cfg(test)]
mod goal_progress_tests {
    use time::macros::date;

    use crate::auth::UserID;

    use super::{Goal, progress_color};

    fn goal(current_amount: f64, target_amount: f64) -> Goal {
        Goal {
            id: 1,
            user_id: UserID::new(1),
            name: "Car".to_owned(),
            target_amount,
            current_amount,
            start_date: date!(2025 - 01 - 01),
            deadline: None,
            color: "#000000".to_owned(),
        }
    }

    #[test]
    fn progress_is_rounded_and_capped() {
        assert_eq!(goal(0.0, 300.0).progress_percent(), 0);
        assert_eq!(goal(100.0, 300.0).progress_percent(), 33);
        assert_eq!(goal(200.0, 300.0).progress_percent(), 67);
        assert_eq!(goal(450.0, 300.0).progress_percent(), 100);
    }

    #[test]
    fn remaining_amount_is_never_negative() {
        assert_eq!(goal(100.0, 300.0).remaining_amount(), 200.0);
        assert_eq!(goal(450.0, 300.0).remaining_amount(), 0.0);
    }

    #[test]
    fn color_follows_progress_quarters() {
        assert_eq!(progress_color(24), "#EF4444");
        assert_eq!(progress_color(25), "#F59E0B");
        assert_eq!(progress_color(74), "#3B82F6");
        assert_eq!(progress_color(100), "#10B981");
    }
}
