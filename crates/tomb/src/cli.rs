use clap::Parser;
use std::path::PathBuf;

/// User-specified command line parameters
#[derive(Parser)]
#[clap(name = "tomb", about)]
pub struct Args {
    #[clap(help = "Path to a level file (.PHD, .TUB, .TR2, .TR4, .TRC)")]
    pub level: PathBuf,

    #[clap(
        long,
        short = 'w',
        help = "Print every warning the load accumulated instead of just the count"
    )]
    pub warnings: bool,

    #[clap(long, help = "Dump per-room sector and collision statistics")]
    pub rooms: bool,
}
