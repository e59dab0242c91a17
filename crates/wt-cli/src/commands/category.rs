//! Category commands.

use std::io::Write;

use anyhow::{Context, Result};

use wt_core::{CategoryId, TrackerError};

use crate::App;
use crate::cli::CategoryAction;

pub fn run<W: Write>(writer: &mut W, app: &App, action: &CategoryAction) -> Result<()> {
    match action {
        CategoryAction::Add { name, color } => {
            let category = app.categories.create(&app.user, name, color.as_deref())?;
            writeln!(
                writer,
                "Created category {} ({}) with id {}",
                category.name, category.color, category.id
            )?;
        }
        CategoryAction::List { json } => {
            let categories = app.categories.list(&app.user)?;
            if *json {
                serde_json::to_writer_pretty(&mut *writer, &categories)?;
                writeln!(writer)?;
            } else if categories.is_empty() {
                writeln!(writer, "No categories.")?;
            } else {
                for category in &categories {
                    writeln!(
                        writer,
                        "{}  {}  {}",
                        category.id, category.color, category.name
                    )?;
                }
            }
        }
        CategoryAction::Update { id, name, color } => {
            let id = parse_id(id)?;
            let category = app
                .categories
                .update(&id, &app.user, name, color.as_deref())?;
            writeln!(
                writer,
                "Updated category {}: {} ({})",
                category.id, category.name, category.color
            )?;
        }
        CategoryAction::Delete { id } => {
            let id = parse_id(id)?;
            app.categories.delete(&id, &app.user)?;
            writeln!(writer, "Deleted category {id}")?;
        }
    }
    Ok(())
}

fn parse_id(id: &str) -> Result<CategoryId> {
    CategoryId::new(id)
        .map_err(TrackerError::from)
        .context("invalid category ID")
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use insta::assert_snapshot;
    use wt_core::{ErrorKind, ManualClock, UserId};
    use wt_db::Database;

    fn app_for(user: &str, db: Database) -> App {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 2, 1, 8, 0, 0).unwrap(),
        ));
        App::new(db, clock, UserId::new(user).unwrap())
    }

    fn app() -> App {
        app_for("alice", Database::open_in_memory().unwrap())
    }

    #[test]
    fn add_list_update_delete() {
        let app = app();
        let mut output = Vec::new();

        run(
            &mut output,
            &app,
            &CategoryAction::Add {
                name: "  Writing ".to_string(),
                color: None,
            },
        )
        .unwrap();
        let created = app.categories.list(&app.user).unwrap().remove(0);
        assert_eq!(created.name, "Writing");

        run(
            &mut output,
            &app,
            &CategoryAction::Update {
                id: created.id.to_string(),
                name: "Docs".to_string(),
                color: Some("#00aa00".to_string()),
            },
        )
        .unwrap();
        run(&mut output, &app, &CategoryAction::List { json: false }).unwrap();
        run(
            &mut output,
            &app,
            &CategoryAction::Delete {
                id: created.id.to_string(),
            },
        )
        .unwrap();
        run(&mut output, &app, &CategoryAction::List { json: false }).unwrap();

        let output = String::from_utf8(output)
            .unwrap()
            .replace(created.id.as_str(), "[ID]");
        assert_snapshot!(output, @r"
        Created category Writing (#4a6bff) with id [ID]
        Updated category [ID]: Docs (#00aa00)
        [ID]  #00aa00  Docs
        Deleted category [ID]
        No categories.
        ");
    }

    #[test]
    fn blank_name_is_rejected() {
        let app = app();
        let err = run(
            &mut Vec::new(),
            &app,
            &CategoryAction::Add {
                name: "   ".to_string(),
                color: None,
            },
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TrackerError>(),
            Some(TrackerError::InvalidCategoryName)
        ));
    }

    #[test]
    fn other_users_cannot_modify() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("wt.db");
        let alice = app_for("alice", Database::open(&path).unwrap());
        let mallory = app_for("mallory", Database::open(&path).unwrap());
        let category = alice.categories.create(&alice.user, "Work", None).unwrap();

        let err = run(
            &mut Vec::new(),
            &mallory,
            &CategoryAction::Delete {
                id: category.id.to_string(),
            },
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TrackerError>(),
            Some(TrackerError::NotAuthorized)
        ));
        assert_eq!(alice.categories.list(&alice.user).unwrap(), vec![category]);
    }

    #[test]
    fn blank_id_is_an_invalid_argument() {
        let app = app();
        let err = run(
            &mut Vec::new(),
            &app,
            &CategoryAction::Delete { id: String::new() },
        )
        .unwrap_err();
        assert_eq!(
            err.downcast_ref::<TrackerError>().map(TrackerError::kind),
            Some(ErrorKind::Invalid)
        );
        assert_eq!(crate::exit_code(&err), 2);
    }

    #[test]
    fn list_json() {
        let app = app();
        app.categories.create(&app.user, "Work", Some("#123456")).unwrap();

        let mut output = Vec::new();
        run(&mut output, &app, &CategoryAction::List { json: true }).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(value[0]["name"], "Work");
        assert_eq!(value[0]["color"], "#123456");
    }
}
