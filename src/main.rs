use anyhow::Result;
use clap::Parser;
use vidfit::{cli::Cli, run};

#[tokio::main]
async fn main() -> Result<()> {
    // Usage errors exit with 1 like every other failure; help and version exit 0.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            e.print()?;
            std::process::exit(code);
        }
    };

    run(cli).await
}
