//! picocore CLI: inspect an FST image, trace a symbol sequence through it,
//! and run a literal item script through the SA/SPHO pipeline for manual
//! smoke-testing.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use memmap2::Mmap;

use picocore::error::VecSink;
use picocore::fst::FstImage;
use picocore::item::{Item, ItemKind};
use picocore::phone::tests_support::StaticPhoneTable;
use picocore::sa::{Classifier, DecomposedClass, Lexicon, SaStage};
use picocore::spho::SphoStage;
use picocore::symbol::{Position, PosSym};
use picocore::{CoreConfig, Status};

#[derive(Debug, Parser)]
#[command(name = "picocore")]
#[command(about = "Phonetic FST core toolkit", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// FST image inspection
    Fst(FstCommand),
    /// Run a literal item script through the SA/SPHO pipeline
    Run {
        /// Path to a script file (one item per line, `kind:info1:info2:b,b,...`)
        script: PathBuf,
    },
}

#[derive(Debug, Parser)]
struct FstCommand {
    #[command(subcommand)]
    command: FstSubcommand,
}

#[derive(Debug, Subcommand)]
enum FstSubcommand {
    /// Print header fields of an FST image
    Info {
        /// Path to a binary FST image
        path: PathBuf,
    },
    /// Transduce a literal symbol sequence and print the outcome
    Trace {
        /// Path to a binary FST image
        path: PathBuf,
        /// Input symbols, as raw i16 wire values
        symbols: Vec<i16>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Fst(cmd) => run_fst(cmd),
        Command::Run { script } => run_script(&script),
    }
}

/// Memory-maps an FST image file rather than copying it into a `Vec`, so
/// `fst info`/`fst trace`/`run` can inspect multi-megabyte images without
/// paying for a full read.
fn map_fst_file(path: &Path) -> Result<Mmap> {
    let file = fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    // SAFETY: the file is treated as read-only for the mapping's lifetime;
    // external mutation while mapped is the usual mmap caveat, accepted here
    // for a CLI tool reading files the invoking user controls.
    unsafe { Mmap::map(&file) }.with_context(|| format!("mapping {}", path.display()))
}

fn run_fst(cmd: FstCommand) -> Result<()> {
    match cmd.command {
        FstSubcommand::Info { path } => {
            let mmap = map_fst_file(&path)?;
            let fst = FstImage::load(&mmap).with_context(|| format!("parsing {}", path.display()))?;
            let (states, classes) = fst.sizes();
            println!("states: {states}");
            println!("classes: {classes}");
            println!("mode: {:#04x}", fst.mode());
            Ok(())
        }
        FstSubcommand::Trace { path, symbols } => {
            let mmap = map_fst_file(&path)?;
            let fst = FstImage::load(&mmap).with_context(|| format!("parsing {}", path.display()))?;
            let input: Vec<PosSym> =
                symbols.iter().enumerate().map(|(i, &s)| PosSym::new(Position::Real(i as u32), s)).collect();
            let mut out = Vec::new();
            let mut sink = VecSink::default();
            let outcome = picocore::engine::transduce(&fst, true, &input, &mut out, 4096, 512, None, &mut sink);
            println!("solution_found: {}", outcome.solution_found);
            println!("steps: {}", outcome.steps);
            let syms: Vec<i16> = out.iter().map(|p| p.sym).collect();
            println!("output: {syms:?}");
            for warning in &sink.0 {
                println!("warning: {warning}");
            }
            Ok(())
        }
    }
}

struct PassthroughClassifier;

impl Classifier for PassthroughClassifier {
    fn construct_in_vec(&mut self, _features: &[i32]) -> bool {
        false
    }
    fn classify(&mut self) -> i32 {
        0
    }
    fn decompose_out_class(&self, class: i32) -> DecomposedClass {
        DecomposedClass::Scalar(class)
    }
    fn reverse_map_out_fixed(&self, class: i32, _prev: i32, _fallback: i32) -> i32 {
        class
    }
}

struct EmptyLexicon;

impl Lexicon for EmptyLexicon {
    fn lookup(&self, _key: &[u8]) -> Option<(i16, Vec<i16>)> {
        None
    }
}

fn parse_item_line(line: &str) -> Result<Item> {
    let fields: Vec<&str> = line.splitn(4, ':').collect();
    let [kind_s, info1_s, info2_s, content_s] = fields[..] else {
        bail!("malformed item line: {line:?}");
    };
    let kind = match kind_s {
        "WordGraph" => ItemKind::WordGraph,
        "WordIndex" => ItemKind::WordIndex,
        "WordPhon" => ItemKind::WordPhon,
        "SyllPhon" => ItemKind::SyllPhon,
        "Bound" => ItemKind::Bound,
        "Punc" => ItemKind::Punc,
        "Cmd" => ItemKind::Cmd,
        other => bail!("unknown item kind {other:?}"),
    };
    let info1: u8 = info1_s.parse().with_context(|| format!("info1 in {line:?}"))?;
    let info2: u8 = info2_s.parse().with_context(|| format!("info2 in {line:?}"))?;
    let content: Vec<u8> = if content_s.trim().is_empty() {
        Vec::new()
    } else {
        content_s
            .split(',')
            .map(|b| b.trim().parse::<u8>().with_context(|| format!("content byte in {line:?}")))
            .collect::<Result<_>>()?
    };
    Ok(Item::new(kind, info1, info2, content)?)
}

fn run_script(path: &PathBuf) -> Result<()> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;

    let mut sa = SaStage::new(CoreConfig::default(), PassthroughClassifier, EmptyLexicon, StaticPhoneTable, Vec::new(), VecSink::default());
    let mut spho = SphoStage::new(CoreConfig::default(), StaticPhoneTable, Vec::new(), VecSink::default());

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        sa.push_input(parse_item_line(line)?);
    }

    for _ in 0..10_000 {
        match sa.step() {
            Status::Error => bail!("SA stage entered error state"),
            Status::Idle => break,
            _ => {}
        }
        while let Some(item) = sa.pop_output() {
            spho.push_input(item);
        }
    }

    for _ in 0..10_000 {
        match spho.step() {
            Status::Error => bail!("SPHO stage entered error state"),
            Status::Idle => break,
            _ => {}
        }
    }

    while let Some(item) = spho.pop_output() {
        println!("{:?} info1={} info2={} content={:?}", item.kind, item.info1, item.info2, item.content);
    }
    Ok(())
}
