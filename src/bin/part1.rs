use anyhow::{Context, Result};
use clap::Parser;
use patrol::CLIArgs;

fn main() -> Result<()> {
    let args = CLIArgs::parse();
    patrol::init_logging(args.common.verbose);
    let lab = patrol::read_lab(&args.common.input_path).with_context(|| {
        format!(
            "Failed to read laboratory from given file({}).",
            args.common.input_path.display()
        )
    })?;

    let patrol_n = patrol::sim::run_to_exit(&lab)
        .context("Failed to simulate the guard's patrol.")?;
    println!(
        "The guard will visit {} position(s) before leaving given laboratory.",
        patrol_n
    );

    Ok(())
}
