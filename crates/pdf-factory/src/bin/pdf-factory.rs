//! pdf-factory – render a text document into a templated PDF report.
//!
//! Usage:
//!   pdf-factory <document.md> [output.pdf] [--config file.json]
//!
//! The report has a cover page, the document on `NormalPage` pages (one
//! paragraph per input line) and a two-column catalogue of the paragraph
//! styles. Output defaults to `pdf/a.pdf`.

use std::{env, fs, path::PathBuf, process};

use anyhow::{Context as _, Result};
use pdf_factory::{Context, PdfGenerator, Settings};

const DEFAULT_OUTPUT: &str = "pdf/a.pdf";

fn print_usage(program: &str) {
    eprintln!("Usage: {program} <document.md> [output.pdf] [--config file.json]");
}

struct Args {
    input: PathBuf,
    output: PathBuf,
    config: Option<PathBuf>,
}

fn parse_args() -> Args {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("pdf-factory");

    let mut positional: Vec<PathBuf> = Vec::new();
    let mut config = None;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" | "-c" => match iter.next() {
                Some(path) => config = Some(PathBuf::from(path)),
                None => {
                    eprintln!("Error: --config needs a file");
                    process::exit(1);
                }
            },
            "--help" | "-h" => {
                print_usage(program);
                process::exit(0);
            }
            other if other.starts_with('-') => {
                eprintln!("Unknown flag: {other}");
                print_usage(program);
                process::exit(1);
            }
            path if positional.len() < 2 => positional.push(PathBuf::from(path)),
            path => {
                eprintln!("Unexpected argument: {path}");
                print_usage(program);
                process::exit(1);
            }
        }
    }

    let mut positional = positional.into_iter();
    let Some(input) = positional.next() else {
        eprintln!("Error: no input file specified.");
        print_usage(program);
        process::exit(1);
    };
    let output = positional
        .next()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));

    Args {
        input,
        output,
        config,
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = parse_args();

    let settings = match &args.config {
        Some(path) => Settings::from_json_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => Settings::from_env(),
    };
    let context = Context::new(settings).context("preparing fonts, drawings and templates")?;
    let mut generator = PdfGenerator::new(&context);

    // The cover page needs no content

    generator.switch_page_template("NormalPage");
    let document = fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    for line in document.lines() {
        generator.insert_paragraph(line, None);
    }

    generator.switch_page_template("TwoColumnsPage");
    generator.insert_paragraph("Styles (样式集)", Some("cSubTitle"));
    for style in context.styles().iter() {
        generator.insert_paragraph(&style.name, Some("cCenteredText"));
        generator.insert_paragraph(&style.describe(), Some("code"));
        generator.insert_frame_break();
    }

    generator.build().context("building the report")?;
    let path = generator
        .save(&args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;
    println!("{}", path.display());

    for warning in generator.warnings() {
        eprintln!("warning: {warning}");
    }
    Ok(())
}
