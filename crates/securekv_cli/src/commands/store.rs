//! Store CRUD commands.

use super::Format;
use securekv_core::{Outcome, SecureStore, RESET_MESSAGE};

type CmdResult = Result<(), Box<dyn std::error::Error>>;

fn report<T>(outcome: Outcome<T>, show: impl FnOnce(T)) {
    match outcome {
        Outcome::Value(v) => show(v),
        Outcome::Reset => eprintln!("{RESET_MESSAGE}"),
    }
}

/// Runs the write command.
pub fn write(store: &SecureStore, key: &str, value: &str) -> CmdResult {
    report(store.write(key, value)?, |()| {});
    Ok(())
}

/// Runs the read command. Absent keys print nothing and exit successfully.
pub fn read(store: &SecureStore, key: &str) -> CmdResult {
    report(store.read(key)?, |value| {
        if let Some(value) = value {
            println!("{value}");
        }
    });
    Ok(())
}

/// Runs the read-all command.
pub fn read_all(store: &SecureStore, format: Format) -> CmdResult {
    match store.read_all()? {
        Outcome::Value(values) => match format {
            Format::Json => println!("{}", serde_json::to_string_pretty(&values)?),
            Format::Text => {
                for (key, value) in &values {
                    println!("{key}={value}");
                }
            }
        },
        Outcome::Reset => eprintln!("{RESET_MESSAGE}"),
    }
    Ok(())
}

/// Runs the contains command.
pub fn contains(store: &SecureStore, key: &str) -> CmdResult {
    report(store.contains_key(key)?, |found| println!("{found}"));
    Ok(())
}

/// Runs the delete command.
pub fn delete(store: &SecureStore, key: &str) -> CmdResult {
    report(store.delete(key)?, |()| {});
    Ok(())
}

/// Runs the delete-all command.
pub fn delete_all(store: &SecureStore) -> CmdResult {
    report(store.delete_all()?, |()| {});
    Ok(())
}
