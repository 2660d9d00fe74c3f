//! Database initialization command.

use anyhow::Result;
use console::style;

use gatehouse_server::seed::{self, SeedOutcome};
use gatehouse_server::SqliteStorage;

/// Creates the schema at `db_path`, optionally seeding development data.
///
/// # Errors
/// Returns an error if the database cannot be opened or seeded.
pub fn run(db_path: &str, demo: bool) -> Result<()> {
    let storage = SqliteStorage::open(db_path)?;
    println!("{} {db_path}", style("Initialized database").bold().green());

    if !demo {
        return Ok(());
    }

    match seed::seed_demo(&storage)? {
        SeedOutcome::Seeded { user_id } => {
            println!();
            println!("{}", style("Seeded development data:").bold().green());
            println!("  user:          {} (id {user_id})", seed::DEMO_USERNAME);
            println!("  client_id:     {}", seed::DEMO_CLIENT_ID);
            println!("  client_secret: {}", seed::DEMO_CLIENT_SECRET);
            println!("  redirect_uri:  {}", seed::DEMO_REDIRECT_URI);
            println!();
            println!(
                "{}",
                style(format!(
                    "Mint a session with: gatehouse secret session {user_id}"
                ))
                .dim()
            );
        }
        SeedOutcome::AlreadySeeded => {
            println!("{}", style("Development data already present.").dim());
        }
    }

    Ok(())
}
