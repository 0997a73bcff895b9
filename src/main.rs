use log::{error, LevelFilter};

use pkgbench::cli::CONFIGURATION;
use pkgbench::driver::Driver;

fn main() {
    let level = if CONFIGURATION.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    simple_logger::SimpleLogger::new()
        .with_level(level)
        .env()
        .init()
        .unwrap();

    if let Err(e) = Driver::new().run() {
        error!("{e}");
        std::process::exit(1);
    }
}
