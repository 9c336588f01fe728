mod collect;
mod encode;
mod error;
mod mcro;
mod msg;
mod output;
mod parser;
mod symtab;

use clap::Parser;
use color_print::{ceprintln, cprintln};
use error::Error;
use itertools::Itertools;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};

#[derive(Debug, clap::Parser)]
#[clap(author, version, about = "Two-pass assembler for the Q10 machine")]
struct Args {
    /// Input base names; each unit is read from <NAME>.as
    #[clap(required = true)]
    input: Vec<String>,

    /// Dump the symbol table after assembly
    #[clap(short, long)]
    dump: bool,
}

fn main() {
    let args = Args::parse();
    // Per-unit failures are reported and the next unit still runs.
    for base in &args.input {
        if let Err(e) = assemble(base, args.dump) {
            ceprintln!("<red,bold>error</>: {}", e);
        }
    }
}

fn assemble(base: &str, dump: bool) -> Result<(), Error> {
    let as_path = format!("{base}.as");
    println!("--- {} ---", as_path);
    let source = read_lines(&as_path)?;

    // 1. Expand macros, keep the expanded stream as <base>.am
    let mut msgs = msg::Msgs::new(&as_path);
    let mcros = mcro::Mcros::collect(&source, &mut msgs);
    if msgs.has_error() {
        msgs.flush();
        ceprintln!(
            "<red,bold>error</>: bad macro definitions, assembly of {} halted",
            as_path
        );
        return Ok(());
    }
    let expanded = mcros.expand(&source);
    let am_path = format!("{base}.am");
    write_file(
        &am_path,
        &expanded.iter().map(|l| format!("{l}\n")).collect::<String>(),
    )?;

    // 2. First pass: symbols, lengths, data image
    let mut msgs = msg::Msgs::new(&am_path);
    let mut prog = collect::collect(&expanded, &mut msgs);

    // 3. Second pass: encode
    if !msgs.has_error() {
        encode::encode(&mut prog, &mut msgs);
    }
    if dump {
        dump_symtab(&prog);
    }
    msgs.flush();
    if msgs.has_error() {
        ceprintln!(
            "<red,bold>error</>: assembly of {} failed, no output generated",
            as_path
        );
        return Ok(());
    }

    // 4. Output listings
    write_file(&format!("{base}.ob"), &output::object(&prog))?;
    println!("  > {base}.ob");
    if let Some(text) = output::entries(&prog) {
        write_file(&format!("{base}.ent"), &text)?;
        println!("  > {base}.ent");
    }
    if let Some(text) = output::externals(&prog) {
        write_file(&format!("{base}.ext"), &text)?;
        println!("  > {base}.ext");
    }
    Ok(())
}

fn read_lines(path: &str) -> Result<Vec<String>, Error> {
    let file = File::open(path).map_err(|e| Error::FileOpen(path.to_string(), e))?;
    BufReader::new(file)
        .lines()
        .map(|l| l.map(|l| l.trim_end_matches('\r').to_string()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| Error::FileRead(path.to_string(), e))
}

fn write_file(path: &str, text: &str) -> Result<(), Error> {
    let mut file = File::create(path).map_err(|e| Error::FileCreate(path.to_string(), e))?;
    file.write_all(text.as_bytes())
        .map_err(|e| Error::FileWrite(path.to_string(), e))
}

fn dump_symtab(prog: &collect::Program) {
    cprintln!("<bold>====== Symbol Table ======</>");
    for (name, sym) in prog.symtab.iter() {
        cprintln!(
            "  <green>{:<30}</> {} <blue>{:?}</>",
            name,
            q10::word::encode(sym.addr as i32),
            sym.kind
        );
        if !sym.uses.is_empty() {
            cprintln!(
                "    used at: {}",
                sym.uses.iter().map(|u| u.to_string()).join(" ")
            );
        }
    }
}
