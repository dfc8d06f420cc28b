//! Command execution against a `TaskStore`.
//!
//! # Responsibility
//! - Translate one parsed command into store calls.
//! - Render results and the delete confirmation prompt.
//!
//! # Invariants
//! - Output is produced only after the store call returned.
//! - Store errors are passed up unchanged for the caller to report.

use crate::config::Command;
use anyhow::Result;
use std::io::{BufRead, Write};
use todolist_core::{ItemRecord, ItemRepository, StoreError, TaskStore};

/// Runs `command`, reading confirmations from `input` and writing to `out`.
pub fn execute<R: ItemRepository>(
    store: &TaskStore<R>,
    command: Command,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        Command::Add { name } => {
            let item = store.create(name)?;
            writeln!(out, "added {}", item.id())?;
        }
        Command::Rename { id, name } => {
            store.update(id, &name)?;
            writeln!(out, "renamed {id}")?;
        }
        Command::Delete { id, yes } => {
            let item = store.get(id).ok_or(StoreError::NotFound(id))?;
            if !yes && !confirm_delete(&item, input, out)? {
                writeln!(out, "kept {id}")?;
                return Ok(());
            }
            store.delete(id)?;
            writeln!(out, "deleted {id}")?;
        }
        Command::List { json } => {
            let items = store.list();
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(items.as_slice())?)?;
            } else {
                for item in items.iter() {
                    write_row(out, item)?;
                }
            }
        }
        Command::Show { id, json } => {
            let item = store.get(id).ok_or(StoreError::NotFound(id))?;
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&item)?)?;
            } else {
                write_row(out, &item)?;
            }
        }
    }

    Ok(())
}

fn write_row(out: &mut impl Write, item: &ItemRecord) -> std::io::Result<()> {
    writeln!(out, "{}  {}", item.id(), item.name())
}

fn confirm_delete(
    item: &ItemRecord,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> std::io::Result<bool> {
    write!(
        out,
        "Delete \"{}\"? Do you really want to delete this item? [y/N] ",
        item.name()
    )?;
    out.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

#[cfg(test)]
mod tests {
    use super::execute;
    use crate::config::Command;
    use std::io::Cursor;
    use todolist_core::db::open_db_in_memory;
    use todolist_core::{SqliteItemRepository, StoreError, TaskStore};

    fn store() -> TaskStore<SqliteItemRepository> {
        let conn = open_db_in_memory().unwrap();
        TaskStore::open(SqliteItemRepository::try_new(conn).unwrap()).unwrap()
    }

    fn run(store: &TaskStore<SqliteItemRepository>, command: Command, input: &str) -> String {
        let mut out = Vec::new();
        execute(store, command, &mut Cursor::new(input.as_bytes()), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn add_then_list_prints_rows_in_creation_order() {
        let store = store();
        run(
            &store,
            Command::Add {
                name: "Buy milk".to_string(),
            },
            "",
        );
        run(
            &store,
            Command::Add {
                name: "Pay rent".to_string(),
            },
            "",
        );

        let output = run(&store, Command::List { json: false }, "");
        let names: Vec<_> = output
            .lines()
            .map(|line| line.split_once("  ").unwrap().1)
            .collect();
        assert_eq!(names, ["Buy milk", "Pay rent"]);
    }

    #[test]
    fn list_json_serializes_records() {
        let store = store();
        let item = store.create("Buy milk").unwrap();

        let output = run(&store, Command::List { json: true }, "");
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value[0]["id"], item.id().to_string());
        assert_eq!(value[0]["name"], "Buy milk");
        assert_eq!(value[0]["created_at"], item.created_at());
    }

    #[test]
    fn delete_declined_keeps_item() {
        let store = store();
        let item = store.create("Buy milk").unwrap();

        let output = run(
            &store,
            Command::Delete {
                id: item.id(),
                yes: false,
            },
            "n\n",
        );
        assert!(output.contains("Do you really want to delete this item?"));
        assert!(output.ends_with(&format!("kept {}\n", item.id())));
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn delete_confirmed_removes_item() {
        let store = store();
        let item = store.create("Buy milk").unwrap();

        run(
            &store,
            Command::Delete {
                id: item.id(),
                yes: false,
            },
            "yes\n",
        );
        assert!(store.list().is_empty());
    }

    #[test]
    fn show_unknown_id_reports_not_found() {
        let store = store();
        let id = uuid::Uuid::new_v4();
        let mut out = Vec::new();
        let err = execute(
            &store,
            Command::Show { id, json: false },
            &mut Cursor::new(Vec::new()),
            &mut out,
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::NotFound(missing)) if *missing == id
        ));
    }

    #[test]
    fn rename_with_empty_name_fails_without_output() {
        let store = store();
        let item = store.create("Buy milk").unwrap();
        let mut out = Vec::new();
        let err = execute(
            &store,
            Command::Rename {
                id: item.id(),
                name: String::new(),
            },
            &mut Cursor::new(Vec::new()),
            &mut out,
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::InvalidInput(_))
        ));
        assert!(out.is_empty());
        assert_eq!(store.list()[0].name(), "Buy milk");
    }

    #[test]
    fn rename_to_spaces_keeps_name_verbatim() {
        let store = store();
        let item = store.create("Buy milk").unwrap();

        run(
            &store,
            Command::Rename {
                id: item.id(),
                name: "  ".to_string(),
            },
            "",
        );
        assert_eq!(store.get(item.id()).unwrap().name(), "  ");
    }
}
