use anyhow::Result;
use chaindb_core::pow;
use chaindb_storage::Blockchain;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "chaindb")]
#[command(about = "Append-only proof-of-work ledger")]
struct Cli {
    /// Path of the chain store
    #[arg(long, default_value = "blockchain.db")]
    db: PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add a block to the chain
    Addblock {
        /// Block payload text
        #[arg(long)]
        data: String,
    },
    /// Print all blocks, tip to genesis
    Printchain,
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Addblock { data } => {
            let mut chain = Blockchain::open(&cli.db)?;
            let block = chain.append(data.into_bytes())?;
            println!("Success");
            println!("Hash: {}", hex::encode(block.hash));
        }
        Command::Printchain => {
            let chain = Blockchain::open(&cli.db)?;
            for block in chain.iter() {
                let block = block?;
                println!("Prev hash: {}", hex::encode(block.prev_hash));
                println!("Data: {}", String::from_utf8_lossy(&block.payload));
                println!("Hash: {}", hex::encode(block.hash));
                println!("PoW: {}", pow::validate(&block, chain.difficulty_bits()));
                println!();
            }
        }
    }
    Ok(())
}
