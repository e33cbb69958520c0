//! dumpxref - Inspect PDF cross-reference structure
//!
//! A command line tool for dumping a PDF's cross-reference table,
//! trailer, and objects as JSON.

use anyhow::Context;
use clap::{ArgAction, Parser};
use memmap2::Mmap;
use orinoco_core::{Document, ObjectKind, PdfObject};
use serde_json::{json, Value};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

/// Convert a parsed object to a JSON value.
fn to_json(obj: &PdfObject) -> Value {
    match obj {
        PdfObject::Null => Value::Null,
        PdfObject::Bool(b) => json!(b),
        PdfObject::Int(n) => json!(n),
        PdfObject::Real(n) => json!(n),
        PdfObject::Name(name) => json!(format!("/{name}")),
        PdfObject::String(s) => json!(String::from_utf8_lossy(s)),
        PdfObject::Array(arr) => Value::Array(arr.iter().map(to_json).collect()),
        PdfObject::Dict(dict) => {
            let mut map = serde_json::Map::new();
            for (k, v) in dict {
                map.insert(k.clone(), to_json(v));
            }
            Value::Object(map)
        }
        PdfObject::Stream(stream) => {
            let mut attrs = serde_json::Map::new();
            for (k, v) in &stream.attrs {
                attrs.insert(k.clone(), to_json(v));
            }
            json!({
                "stream": attrs,
                "rawdata_length": stream.rawdata().len(),
            })
        }
        PdfObject::Ref(r) => json!({ "ref": r.objnum, "gen": r.gennum }),
    }
}

fn kind_name(kind: ObjectKind) -> &'static str {
    match kind {
        ObjectKind::Free => "free",
        ObjectKind::Normal => "normal",
        ObjectKind::ObjStream => "objstream",
        ObjectKind::Compressed => "compressed",
    }
}

/// Summary of the document's cross-reference structure.
fn summary(doc: &Document) -> Value {
    let parser = doc.parser();
    let mut counts = [0u32; 4];
    for (_, info) in parser.cross_ref().iter() {
        counts[match info.kind() {
            ObjectKind::Free => 0,
            ObjectKind::Normal => 1,
            ObjectKind::ObjStream => 2,
            ObjectKind::Compressed => 3,
        }] += 1;
    }
    json!({
        "version": format!("{}.{}", parser.file_version() / 10, parser.file_version() % 10),
        "size": parser.document_size(),
        "last_objnum": parser.last_objnum(),
        "last_xref_offset": parser.last_xref_offset(),
        "rebuilt": parser.was_rebuilt(),
        "xref_streams": parser.uses_xref_streams(),
        "encrypted": doc.is_encrypted(),
        "permissions": parser.permissions(),
        "objects": {
            "free": counts[0],
            "normal": counts[1],
            "objstream": counts[2],
            "compressed": counts[3],
        },
    })
}

/// One entry per object number, with position data where it applies.
fn xref_entries(doc: &Document) -> Value {
    let parser = doc.parser();
    let entries: Vec<Value> = parser
        .cross_ref()
        .iter()
        .map(|(objnum, info)| {
            let mut entry = serde_json::Map::new();
            entry.insert("objnum".into(), json!(objnum));
            entry.insert("kind".into(), json!(kind_name(info.kind())));
            let pos = parser.get_object_position_or_zero(objnum);
            if pos > 0 {
                entry.insert("pos".into(), json!(pos));
            }
            Value::Object(entry)
        })
        .collect();
    Value::Array(entries)
}

fn dump_objects<W: Write>(out: &mut W, doc: &Document, objnums: &[u32]) -> anyhow::Result<()> {
    for &objnum in objnums {
        match doc.get_object(objnum) {
            Some(obj) => {
                let value = json!({ "objnum": objnum, "object": to_json(&obj) });
                writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
            }
            None => eprintln!("not found: object {objnum}"),
        }
    }
    Ok(())
}

fn dump_all<W: Write>(out: &mut W, doc: &Document) -> anyhow::Result<()> {
    let objnums: Vec<u32> = doc
        .parser()
        .cross_ref()
        .iter()
        .filter(|(_, info)| {
            matches!(info.kind(), ObjectKind::Normal | ObjectKind::Compressed)
        })
        .map(|(objnum, _)| objnum)
        .collect();
    dump_objects(out, doc, &objnums)
}

/// A command line tool for inspecting PDF cross-reference structure.
#[derive(Parser, Debug)]
#[command(name = "dumpxref")]
#[command(author, version, about = "Inspect PDF cross-reference structure", long_about = None)]
struct Args {
    /// One or more paths to PDF files
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Comma-separated list of object numbers to dump
    #[arg(short = 'i', long = "objects")]
    objects: Option<String>,

    /// Dump every resolvable object
    #[arg(short = 'a', long = "all", action = ArgAction::SetTrue)]
    all: bool,

    /// Dump the trailer dictionary
    #[arg(short = 'T', long = "trailer", action = ArgAction::SetTrue)]
    trailer: bool,

    /// Dump every cross-reference entry
    #[arg(short = 'x', long = "entries", action = ArgAction::SetTrue)]
    entries: bool,

    /// The password to use for decrypting PDF file
    #[arg(short = 'P', long, default_value = "")]
    password: String,

    /// Path to file where output is written, or "-" for stdout
    #[arg(short = 'o', long, default_value = "-")]
    outfile: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let objnums: Vec<u32> = if let Some(ref objs) = args.objects {
        objs.split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect()
    } else {
        Vec::new()
    };

    let mut output: Box<dyn Write> = if args.outfile == "-" {
        Box::new(BufWriter::new(io::stdout()))
    } else {
        let file = File::create(&args.outfile)
            .with_context(|| format!("cannot create {}", args.outfile))?;
        Box::new(BufWriter::new(file))
    };

    for path in &args.files {
        let file =
            File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
        let mmap = unsafe { Mmap::map(&file) }?;
        let doc = Document::new_from_mmap(mmap, args.password.as_bytes())
            .with_context(|| format!("cannot parse {}", path.display()))?;

        if args.trailer {
            let trailer = to_json(&PdfObject::Dict(doc.trailer().clone()));
            writeln!(output, "{}", serde_json::to_string_pretty(&trailer)?)?;
        } else if args.entries {
            writeln!(
                output,
                "{}",
                serde_json::to_string_pretty(&xref_entries(&doc))?
            )?;
        } else if args.all {
            dump_all(&mut output, &doc)?;
        } else if !objnums.is_empty() {
            dump_objects(&mut output, &doc, &objnums)?;
        } else {
            writeln!(output, "{}", serde_json::to_string_pretty(&summary(&doc))?)?;
        }
    }

    output.flush()?;
    Ok(())
}
