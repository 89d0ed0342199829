use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "transbox")]
#[command(about = "Machine translation worker for the host task queue", long_about = None)]
pub struct Cli {
    /// Config file (defaults to $TRANSBOX_CONFIG or config/transbox.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load the model and serve the host endpoints
    Serve(ServeArgs),
    /// Load and validate the configuration, then exit
    CheckConfig,
}

#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// Address to bind the HTTP server to (overrides server.bind_addr)
    #[arg(long)]
    pub address: Option<SocketAddr>,
}
