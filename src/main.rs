//! wordstats - concurrent word statistics for directories of text files
//!
//! Main entry point for the command-line application.

use clap::Parser;
use std::process;

use word_stats::cli::Args;
use word_stats::discovery::ExtensionLister;
use word_stats::progress::{print_banner, print_error, print_header, print_info, ConsoleSink};
use word_stats::session::{ProcessingSession, SessionConfig, SessionOutcome};

fn main() {
    // Parse command-line arguments
    let args = Args::parse();

    // Set up logging
    if args.verbose {
        std::env::set_var("RUST_LOG", "debug");
    } else if !args.quiet {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    // Run the application
    match run(args) {
        Ok(SessionOutcome::Completed) => {}
        Ok(_) => process::exit(1),
        Err(e) => {
            print_error(&format!("{}", e));

            // Print chain of errors
            let mut source = e.source();
            while let Some(err) = source {
                print_error(&format!("  Caused by: {}", err));
                source = err.source();
            }

            process::exit(1);
        }
    }
}

fn run(args: Args) -> anyhow::Result<SessionOutcome> {
    // Print banner unless quiet mode
    if !args.quiet {
        print_banner();
    }

    args.validate()?;

    let config = SessionConfig::from_args(&args);
    let lister = ExtensionLister::new(args.get_extensions());

    if !args.quiet && args.verbose {
        print_config(&args, &config, &lister);
    }

    if !args.quiet {
        print_header("Scanning input...");
    }

    let session = ProcessingSession::new(lister, config);
    let events = session.start(&args.input, args.recursive)?;

    // Events are rendered here, on the main thread
    let mut sink = ConsoleSink::new(args.quiet, args.verbose, args.files);
    let outcome = events.drain_into(&mut sink);
    session.join();

    Ok(outcome)
}

/// Print configuration summary
fn print_config(args: &Args, config: &SessionConfig, lister: &ExtensionLister) {
    print_header("Configuration");

    print_info(&format!("Input:        {:?}", args.input));
    print_info(&format!("Recursive:    {}", args.recursive));
    print_info(&format!("Extensions:   {:?}", lister.extensions()));
    print_info(&format!("Encoding:     {}", if config.read.detect_encoding { "detect" } else { "UTF-8" }));
    print_info(&format!("Threads:      {}", args.threads.unwrap_or_else(num_cpus::get)));
}
