use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use quillpad_core::{Document, Encoding};
use quillpad_project::{FileTree, TreeNode};
use quillpad_shell::json::format_json;

#[derive(Parser)]
#[command(
    name = "quillpad-cli",
    about = "Utility commands for the QuillPad editor",
    author,
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 在候選編碼間轉換文字檔。 / Convert text files between the candidate encodings.
    Convert(ConvertArgs),
    /// 以四空格縮排重新排版 JSON 檔。 / Reformat a JSON file with four-space indentation.
    FormatJson(FormatJsonArgs),
    /// 列出目錄樹快照。 / Print a directory-tree snapshot.
    Tree(TreeArgs),
}

#[derive(Args)]
struct ConvertArgs {
    /// 需要轉換的輸入檔案。 / Input files to convert.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// 預期的輸入編碼；若略過則採自動偵測。 / Expected encoding of the input files;
    /// detection is used when omitted.
    #[arg(long)]
    from: Option<EncodingChoice>,

    /// 輸出的目標編碼。 / Target encoding for the output.
    #[arg(long, value_name = "ENCODING")]
    to: EncodingChoice,

    /// 是否就地覆寫原始檔案。 / Write results in place, overwriting the source files.
    #[arg(long)]
    in_place: bool,

    /// 單一檔案轉換時指定輸出路徑。 / Output file path when converting a single file.
    #[arg(long, conflicts_with = "in_place")]
    output: Option<PathBuf>,

    /// 批次轉換時的輸出資料夾。 / Output directory for batch conversions.
    #[arg(long, conflicts_with = "in_place")]
    output_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EncodingChoice {
    #[value(alias = "utf-8")]
    Utf8,
    Gbk,
    Gb2312,
    #[value(name = "iso-8859-1", aliases = ["latin1", "iso8859-1"])]
    Latin1,
}

impl From<EncodingChoice> for Encoding {
    fn from(choice: EncodingChoice) -> Self {
        match choice {
            EncodingChoice::Utf8 => Encoding::Utf8,
            EncodingChoice::Gbk => Encoding::Gbk,
            EncodingChoice::Gb2312 => Encoding::Gb2312,
            EncodingChoice::Latin1 => Encoding::Latin1,
        }
    }
}

#[derive(Args)]
struct FormatJsonArgs {
    /// 要重新排版的 JSON 檔。 / JSON file to reformat.
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// 輸出路徑；預設就地覆寫。 / Destination path; defaults to rewriting in place.
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct TreeArgs {
    /// 樹的根目錄；預設為目前目錄。 / Root of the tree; defaults to the current directory.
    #[arg(value_name = "DIR")]
    root: Option<PathBuf>,

    /// 最多顯示的深度。 / Maximum depth to print.
    #[arg(long, value_name = "N")]
    max_depth: Option<usize>,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let Cli { command } = Cli::parse();
    match command {
        Commands::Convert(args) => execute_convert(args),
        Commands::FormatJson(args) => execute_format_json(args),
        Commands::Tree(args) => execute_tree(args),
    }
}

fn execute_convert(args: ConvertArgs) -> Result<()> {
    if args.inputs.len() > 1 {
        if args.output.is_some() {
            bail!("--output can only be used when converting a single file");
        }
        if !args.in_place && args.output_dir.is_none() {
            bail!("batch conversions require --output-dir or --in-place");
        }
    }

    for input in &args.inputs {
        convert_single(
            input,
            args.from,
            args.to,
            args.in_place,
            args.output.as_ref(),
            args.output_dir.as_ref(),
        )?;
    }

    Ok(())
}

fn convert_single(
    input: &Path,
    from: Option<EncodingChoice>,
    to: EncodingChoice,
    in_place: bool,
    single_output: Option<&PathBuf>,
    output_dir: Option<&PathBuf>,
) -> Result<()> {
    let mut document =
        Document::open(input).with_context(|| format!("failed to open {}", input.display()))?;

    if let Some(expected) = from {
        let expected: Encoding = expected.into();
        if document.encoding() != expected {
            bail!(
                "input {} is detected as {} but --from {} was supplied",
                input.display(),
                document.encoding().name(),
                expected.name()
            );
        }
    }

    document.set_encoding(to.into());

    if in_place {
        document
            .save()
            .with_context(|| format!("failed to overwrite {}", input.display()))?;
        return Ok(());
    }

    let output_path = resolve_output_path(input, single_output, output_dir)?;
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    document
        .save_as(&output_path)
        .with_context(|| format!("failed to write {}", output_path.display()))?;

    Ok(())
}

fn resolve_output_path(
    input: &Path,
    single_output: Option<&PathBuf>,
    output_dir: Option<&PathBuf>,
) -> Result<PathBuf> {
    if let Some(path) = single_output {
        if output_dir.is_some() {
            bail!("--output and --output-dir cannot be combined");
        }
        return Ok(path.clone());
    }

    if let Some(dir) = output_dir {
        let file_name = input
            .file_name()
            .ok_or_else(|| anyhow!("input {} has no file name", input.display()))?;
        return Ok(dir.join(file_name));
    }

    bail!("missing --output, --output-dir, or --in-place for conversion");
}

fn execute_format_json(args: FormatJsonArgs) -> Result<()> {
    let mut document = Document::open(&args.input)
        .with_context(|| format!("failed to open {}", args.input.display()))?;
    let formatted = format_json(document.contents())
        .with_context(|| format!("{} is not valid JSON", args.input.display()))?;
    document.set_contents(formatted);

    let destination = match &args.output {
        Some(path) => {
            document
                .save_as(path)
                .with_context(|| format!("failed to write {}", path.display()))?;
            path.clone()
        }
        None => {
            document
                .save()
                .with_context(|| format!("failed to overwrite {}", args.input.display()))?;
            args.input.clone()
        }
    };
    println!("Formatted JSON written to {}", destination.display());
    Ok(())
}

fn execute_tree(args: TreeArgs) -> Result<()> {
    let root = match args.root {
        Some(path) => path,
        None => std::env::current_dir().context("determine current directory")?,
    };
    let tree = FileTree::build(&root)
        .with_context(|| format!("failed to read directory {}", root.display()))?;

    println!("{}", tree.root_path().display());
    print_children(tree.root(), 1, args.max_depth.unwrap_or(usize::MAX));
    Ok(())
}

fn print_children(node: &TreeNode, depth: usize, max_depth: usize) {
    if depth > max_depth {
        return;
    }
    for child in node.children() {
        let indent = "    ".repeat(depth);
        if child.is_dir() {
            println!("{indent}{}/", child.name());
            print_children(child, depth + 1, max_depth);
        } else {
            println!("{indent}{}", child.name());
        }
    }
}
