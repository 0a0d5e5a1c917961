use clap::Parser;

#[derive(Debug, Parser)]
#[command(about = "Checks today's forecast and mails suitable groundhandling hours.")]
pub struct Cli {
    /// Print mails for the admin instead of sending them
    #[arg(short, long)]
    pub debug: bool,

    /// Archive raw forecast responses in the database
    #[arg(long)]
    pub persist: bool,

    /// Configuration file name, without extension
    #[arg(short, long, env = "GROUNDHANDLING_CONFIG", default_value = "config")]
    pub config: String,
}
