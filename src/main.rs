// This is my main entry point for the compute-chain node binary
// I pull in the mining pieces directly because the offline `mine` command needs them
use clap::Parser;
use compute_chain::core::{Batch, CancellationSignal, MiningMode, MiningTarget, ProofOfWork, Transaction};
use compute_chain::node::{build_discovery, build_store, Node};
use compute_chain::{send_line, Broadcaster, Command, Config, Opt};
use log::{error, LevelFilter};
use std::process;

fn main() {
    // I initialize logging at Info so I can follow jobs and mining attempts
    // RUST_LOG still overrides it when I need more detail
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    // I parse the command line arguments using clap
    let opt = Opt::parse();

    // If a command fails I log the error and exit with code 1
    if let Err(e) = run_command(opt.command) {
        error!("Error: {e}");
        process::exit(1);
    }
}

// This is where I dispatch every CLI command
fn run_command(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        // Starting a node runs intake, mining and the block listener until they stop
        Command::StartNode { config, continuous } => {
            let config = Config::load(config.as_deref())?;
            // The flag only ever upgrades to continuous, since the file may already ask for it
            let mode = if continuous {
                MiningMode::Continuous
            } else {
                config.mining.mode
            };
            Node::new(config)?.run(mode)?;
        }
        // Broadcasting publishes jobs to peers, either once or on the configured interval
        Command::Broadcast { config, once } => {
            let config = Config::load(config.as_deref())?;
            let broadcaster = Broadcaster::new(
                build_store(&config)?,
                build_discovery(&config)?,
                config.broadcast.algorithms_dir.clone(),
                config.broadcast.datasets_dir.clone(),
                config.peers.intake_port,
                config.broadcast_interval(),
            );
            if once {
                let report = broadcaster.broadcast_once()?;
                println!(
                    "Sent {} {} to {} peer(s), {} failed",
                    report.script_ref, report.data_ref, report.delivered, report.failed
                );
            } else {
                broadcaster.run();
            }
        }
        Command::Submit {
            addr,
            script_ref,
            data_ref,
        } => {
            // I send the two references as one job line, the same format the broadcaster uses
            send_line(&addr, &format!("{script_ref} {data_ref}"))?;
            println!("Success!");
        }
        Command::Announce { addr, payload } => {
            // Any line works here; the node never inspects announcement contents
            send_line(&addr, &payload)?;
            println!("Success!");
        }
        Command::Mine {
            prev_hash,
            difficulty,
            data,
        } => {
            // I mine offline with a fresh signal, so nothing can cancel this search
            let target = MiningTarget::from_difficulty(difficulty)?;
            let batch: Batch = data
                .into_iter()
                .map(Transaction::new)
                .collect::<Vec<_>>()
                .try_into()
                .map_err(|txs: Vec<Transaction>| format!("Expected 3 payloads, got {}", txs.len()))?;

            match ProofOfWork::mine(&prev_hash, batch, &target, &CancellationSignal::new())? {
                Some(block) => println!("{}", block.to_json()?),
                None => return Err("Mining was cancelled".into()),
            }
        }
    }
    Ok(())
}
