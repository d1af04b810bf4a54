use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use harrow_cli::args::Args;
use harrow_cli::{CountSink, JsonSink, Orchestrator, OutputSink, SearchStatus, TextSink};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();
    match run(&args) {
        Ok(status) => {
            if status.warned {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("harrow: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn run(args: &Args) -> anyhow::Result<SearchStatus> {
    let options = args.pattern_options();
    let program = harrow_compiler::compile(&args.pattern, &options).map_err(|e| {
        anyhow::anyhow!("{}", e.render())
    })?;

    let stdout = std::io::stdout().lock();
    let mut count_sink = CountSink::default();
    let mut text_sink = TextSink::new(std::io::BufWriter::new(stdout))
        .show_offsets(args.byte_offset);
    let mut json_sink;
    let sink: &mut dyn OutputSink = if args.count {
        &mut count_sink
    } else if args.json {
        json_sink = JsonSink::new(std::io::BufWriter::new(std::io::stdout()));
        &mut json_sink
    } else {
        &mut text_sink
    };

    let mut orchestrator = Orchestrator::new(&program);
    orchestrator.report_redo = args.redo;

    let mut status = SearchStatus::default();
    if args.files.is_empty() {
        let mut data = Vec::new();
        std::io::Read::read_to_end(&mut std::io::stdin().lock(), &mut data)
            .context("reading stdin")?;
        let s = orchestrator.search_input("(stdin)", harrow_vm::Input::from_bytes(data), sink);
        status.matches += s.matches;
        status.warned |= s.warned;
    } else {
        for file in &args.files {
            let s = orchestrator.search_path(file, args.effective_zmax(), sink);
            status.matches += s.matches;
            status.warned |= s.warned;
        }
    }
    if args.count {
        println!("{}", count_sink.matches);
    }
    Ok(status)
}
