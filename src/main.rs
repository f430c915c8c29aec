use clap::{Parser, Subcommand};
use std::fs::File;
use std::path::PathBuf;

use memmap2::Mmap;

use dwmat::format::{format_decl, format_definition};
use dwmat::{Dwarf, FindObjectFlags, ObjectValue, TypeCache, TypeKind};

#[derive(Parser)]
struct CmdArgs {
    #[clap(subcommand)]
    commands: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find and display a single type
    Type {
        /// Path to the DWARF file
        #[clap(help = "The path to the file containing DWARF info.")]
        dwarf_file: PathBuf,

        /// The kind of type to look up
        #[clap(help = "One of: struct, union, class, enum, typedef, int, \
                       bool, float.")]
        kind: String,

        /// The name of the type to lookup
        #[clap(help = "The name of the type to lookup.")]
        name: String,

        /// Restrict the lookup to one translation unit
        #[clap(long, help = "Only match definitions from this source file.")]
        filename: Option<String>,

        /// Add comments containing '/* size | offset */' for struct members
        #[clap(long, action, help = "Prints sizes and offsets of struct \
                                     fields.")]
        verbose: bool,
    },
    /// Find and display a single object (constant, function, or variable)
    Object {
        /// Path to the DWARF file
        #[clap(help = "The path to the file containing DWARF info.")]
        dwarf_file: PathBuf,

        /// The name of the object to lookup
        #[clap(help = "The name of the object to lookup.")]
        name: String,

        /// Restrict the lookup to one translation unit
        #[clap(long, help = "Only match definitions from this source file.")]
        filename: Option<String>,
    },
    /// Find and display all named structs
    Dump {
        /// Path to the DWARF file
        #[clap(help = "The path to the file containing DWARF info.")]
        dwarf_file: PathBuf,

        /// Add comments containing '/* size | offset */' for struct members
        #[clap(long, action, help = "Prints sizes and offsets of struct \
                                     fields.")]
        verbose: bool,
    },
}

fn parse_kind(kind: &str) -> Option<TypeKind> {
    match kind {
        "struct" => Some(TypeKind::Struct),
        "union" => Some(TypeKind::Union),
        "class" => Some(TypeKind::Class),
        "enum" => Some(TypeKind::Enum),
        "typedef" => Some(TypeKind::Typedef),
        "int" => Some(TypeKind::Int),
        "bool" => Some(TypeKind::Bool),
        "float" => Some(TypeKind::Float),
        _ => None,
    }
}

fn main() -> anyhow::Result<()> {
    let args = CmdArgs::parse();

    match args.commands {
        Commands::Type {
            dwarf_file,
            kind,
            name,
            filename,
            verbose,
        } => {
            let file = File::open(dwarf_file)?;
            let mmap = unsafe { Mmap::map(&file) }?;
            let dwarf = Dwarf::load(&*mmap)?;
            let cache = TypeCache::new(&dwarf)?;

            let Some(kind) = parse_kind(&kind) else {
                anyhow::bail!("unknown type kind: {kind}");
            };
            let verbosity: u8 = verbose.into();

            match cache.find_type(kind, &name, filename.as_deref())? {
                Some(qualified) => {
                    println!("{}", format_definition(&cache, &qualified.typ, verbosity)?);
                }
                None => {
                    println!("Could not find type: {name}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Object {
            dwarf_file,
            name,
            filename,
        } => {
            let file = File::open(dwarf_file)?;
            let mmap = unsafe { Mmap::map(&file) }?;
            let dwarf = Dwarf::load(&*mmap)?;
            let cache = TypeCache::new(&dwarf)?;

            match cache.find_object(&name, filename.as_deref(), FindObjectFlags::all())? {
                Some(object) => {
                    println!("{}", format_decl(&cache, &object.typ, &name)?);
                    match &object.value {
                        ObjectValue::Reference { address, .. } => {
                            println!("address: {address:#x}");
                        }
                        ObjectValue::Signed(value) => println!("value: {value}"),
                        ObjectValue::Unsigned(value) => println!("value: {value}"),
                        ObjectValue::Buffer { .. } => match object.to_u64() {
                            Some(value) => println!("value: {value:#x}"),
                            None => println!("value: {:x?}", object.value),
                        },
                    }
                }
                None => {
                    println!("Could not find object: {name}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Dump {
            dwarf_file,
            verbose,
        } => {
            let file = File::open(dwarf_file)?;
            let mmap = unsafe { Mmap::map(&file) }?;
            let dwarf = Dwarf::load(&*mmap)?;
            let cache = TypeCache::new(&dwarf)?;

            let verbosity: u8 = verbose.into();

            for (_, qualified) in cache.named_types(TypeKind::Struct)? {
                println!("{}", format_definition(&cache, &qualified.typ, verbosity)?);
            }
        }
    };
    Ok(())
}
