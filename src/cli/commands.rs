use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "compute-chain")]
pub struct Opt {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(
        name = "startnode",
        about = "Accept jobs, mine a block and listen for competing blocks"
    )]
    StartNode {
        #[arg(long, help = "Path to a TOML configuration file")]
        config: Option<PathBuf>,
        #[arg(long, help = "Keep mining new blocks until a competing block arrives")]
        continuous: bool,
    },
    #[command(
        name = "broadcast",
        about = "Periodically publish a random script and dataset to every peer"
    )]
    Broadcast {
        #[arg(long, help = "Path to a TOML configuration file")]
        config: Option<PathBuf>,
        #[arg(long, help = "Run a single round and exit")]
        once: bool,
    },
    #[command(name = "submit", about = "Send one job descriptor to an intake port")]
    Submit {
        #[arg(help = "Intake address, e.g. 127.0.0.1:8080")]
        addr: String,
        #[arg(help = "Content reference of the script")]
        script_ref: String,
        #[arg(help = "Content reference of the dataset")]
        data_ref: String,
    },
    #[command(name = "announce", about = "Announce a block to an announcement port")]
    Announce {
        #[arg(help = "Announcement address, e.g. 127.0.0.1:8081")]
        addr: String,
        #[arg(help = "Announcement payload (any single line)")]
        payload: String,
    },
    #[command(name = "mine", about = "Mine a block offline from three transaction payloads")]
    Mine {
        #[arg(long = "prev-hash", default_value = "genesis", help = "Previous block hash")]
        prev_hash: String,
        #[arg(long, default_value_t = 11, help = "Difficulty; the target is 2^(256 - difficulty)")]
        difficulty: u32,
        #[arg(num_args = 3, required = true, help = "Transaction data, exactly three values")]
        data: Vec<String>,
    },
}
