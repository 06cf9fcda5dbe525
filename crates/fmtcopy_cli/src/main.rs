mod cli;
mod logging;
mod run;

use clap::Parser;
use eyre::Result;

use crate::cli::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let progress_bar = run::new_progress_bar(cli.show_progress());
    logging::init_logging(cli.log_level(), progress_bar.clone())?;

    let spec_run_request = cli.to_request()?;
    let n_exit = run::run_and_report(spec_run_request, &progress_bar)?;
    if n_exit != 0 {
        std::process::exit(n_exit);
    }
    Ok(())
}
