use ::clap::Parser;
use lazy_static::lazy_static;

use crate::energy::DEFAULT_TDP_WATTS;

lazy_static! {
  /*
    Global configuration variable.

    Lazy-static creates singleton (one-off) types that wraps a value
    providing single initialization and thread-safety.

    For a given: static ref NAME: TYPE = EXPR;
    The lazy_static macro creates a unique type that implements
    Deref<TYPE> and stores it in a static with name NAME.

    It is the wrapped value that implements any traits (eg Debug, Clone),
    NOT the wrapper. Because of this, must deref (*NAME) when debug/trace
    printing.
  */

  pub static ref CONFIGURATION: Configuration = Configuration::new();
}

#[derive(Debug)]
pub struct Configuration {
    pub packages: Vec<String>,
    pub repetitions: u32,
    pub output: String,
    pub managers: Option<Vec<String>>,
    pub tdp_watts: f64,
    pub verbose: bool,
}

impl Configuration {
    fn new() -> Self {
        let args = CLI::parse();
        Configuration {
            packages: args.packages,
            repetitions: args.repetitions,
            output: args.output,
            managers: args.managers,
            tdp_watts: args.tdp_watts,
            verbose: args.verbose,
        }
    }
}

/*
  >>> ATTENTION <<<

    When updating this structure, you probably want to update
    the Configuration structure (and its implementation) too.
*/

#[derive(Parser)]
#[command(author, version, about, long_about=None)]
struct CLI {
    #[arg(
        long,
        short,
        num_args = 1..,
        default_values_t = ["requests".to_owned(), "numpy".to_owned(), "flask".to_owned()],
        help = "Packages to install in each trial"
    )]
    packages: Vec<String>,
    #[arg(
        long,
        short,
        default_value_t = 3,
        help = "Number of repeated trials per manager"
    )]
    repetitions: u32,
    #[arg(
        long,
        short,
        default_value = "results/results.csv",
        help = "CSV file to append results to"
    )]
    output: String,
    #[arg(
        long,
        short,
        num_args = 1..,
        help = "Limit benchmark to specific managers (pip, uv, poetry); default: all available"
    )]
    managers: Option<Vec<String>>,
    #[arg(
        long,
        short,
        default_value_t = DEFAULT_TDP_WATTS,
        help = "Assumed CPU TDP in watts for energy estimation fallback"
    )]
    tdp_watts: f64,
    #[arg(long, short, help = "Enable verbose logging")]
    verbose: bool,
}
