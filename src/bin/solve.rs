use anyhow::{Context, Result};
use clap::Parser;
use patrol::{
    sim::{self, LogProgress},
    SweepCLIArgs,
};

// Prints both answers, one per line, the patrol length first.
fn main() -> Result<()> {
    let args = SweepCLIArgs::parse();
    patrol::init_logging(args.common.verbose);
    let mut lab = patrol::read_lab(&args.common.input_path).with_context(|| {
        format!(
            "Failed to read laboratory from given file({}).",
            args.common.input_path.display()
        )
    })?;

    let patrol_n = sim::run_to_exit(&lab).context("Failed to simulate the guard's patrol.")?;
    let loop_n = if args.parallel {
        sim::count_loop_obstacles_parallel(&lab)
    } else {
        sim::count_loop_obstacles(&mut lab, &mut LogProgress::new(args.progress_every))
    }
    .context("Failed to test obstacle positions.")?;

    println!("{}", patrol_n);
    println!("{}", loop_n);

    Ok(())
}
