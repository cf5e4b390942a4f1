use anyhow::Result;
use ingresso::cli::{actions, start};

// Main function
#[tokio::main]
async fn main() -> Result<()> {
    // Start the program
    let (action, globals) = start()?;

    // Handle the action
    actions::console::handle(action, &globals).await?;

    Ok(())
}
