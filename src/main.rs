use clap::Parser;
use dirs::home_dir;
use esharp::{
    cli::{Args, Commands},
    error::Result,
    extensions::ResultExtensions,
    parser::parse,
    repl::{REPLPrompt, REPLValidator, SyntaxHighlighter},
    runtime::{interpret, Interpreter},
    tokenizer::tokenize,
};
use log::{debug, info};
use nu_ansi_term::{Color, Style};
use reedline::{DefaultHinter, FileBackedHistory, Reedline, Signal};
use std::{fs, io, path::PathBuf};

const DEFAULT_SOURCE: &str = include_str!("../demos/default.esh");

fn run_file(file: Option<PathBuf>) -> Result<()> {
    let source = match file {
        Some(file) => fs::read(file)?,
        None => {
            info!("no source file given, running the built-in demo");
            DEFAULT_SOURCE.as_bytes().to_vec()
        }
    };

    let mut interpreter = Interpreter::new(io::stdout().lock());
    interpret(&source, &mut interpreter)
}

fn check_file(file: PathBuf) -> Result<()> {
    let source = fs::read(file)?;

    let tokens = tokenize(&source)?;
    println!("{:#?}", tokens);

    let program = parse(&tokens)?;
    println!("{:#?}", program);

    Ok(())
}

fn run_repl() -> Result<()> {
    let mut line_editor = Reedline::create()
        .with_hinter(Box::new(
            DefaultHinter::default().with_style(Style::new().italic().fg(Color::LightGray)),
        ))
        .with_highlighter(Box::new(SyntaxHighlighter))
        .with_validator(Box::new(REPLValidator));

    // Add file-backed history if possible
    if let Some(history) = home_dir()
        .map(|home| home.join(".esharp_history"))
        .and_then(|path| FileBackedHistory::with_file(100, path).ok())
        .map(Box::new)
    {
        line_editor = line_editor.with_history(history);
    } else {
        eprintln!("NOTE: Failed to load history. Persistence is now disabled.")
    }

    let prompt = REPLPrompt;
    // State carries over between entries; a failed entry does not reset it.
    let mut interpreter = Interpreter::new(io::stdout());

    loop {
        match line_editor.read_line(&prompt)? {
            Signal::Success(buffer) => {
                let source = buffer.as_bytes();
                Result::pure(())
                    .and_then(|_| tokenize(source))
                    .and_then(|tokens| parse(&tokens))
                    .and_then(|program| interpreter.run(&program))
                    .or_fatal();
            }
            Signal::CtrlD | Signal::CtrlC => {
                break Ok(());
            }
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        None => {
            info!("DEMO MODE");

            run_file(None).or_fatal();
        }
        Some(Commands::Run { file }) => {
            info!("FILE MODE");
            debug!("file: {:?}", file);

            run_file(file).or_fatal();
        }
        Some(Commands::Check { file }) => {
            info!("CHECK MODE");
            debug!("file: {:?}", file);

            check_file(file).or_fatal();
        }
        Some(Commands::Repl) => {
            info!("REPL MODE");

            run_repl().or_fatal();
        }
    }
    Ok(())
}
