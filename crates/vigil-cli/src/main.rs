//! vigil - interview integrity monitor CLI

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    vigil_cli::run().await
}
