use std::process::ExitCode;
use clap::Parser as ClapParser;
use langxa::Config;

fn main() -> ExitCode {
    let config: Config = Config::parse();

    if let Err(err) = langxa::init_logging(&config) {
        eprintln!("Could not open log file: {}", err);
        return ExitCode::from(2);
    }

    match langxa::run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err);
            err.exit_code()
        },
    }
}
