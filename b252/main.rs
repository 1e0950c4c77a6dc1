use std::fs::{self, File};
use std::io::{self, stdout, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use filetime::{set_file_times, FileTime};
use log::{info, LevelFilter};

const ABOUT: &'static str = "
b252 compresses data and escapes it into text that can be pasted between the
quotes of a string literal, and reverses that transform.

The text never contains a NUL byte, a double quote or a backslash. It does
contain bytes above 127, so it is not valid UTF-8 in general.

b252 works similarly to gzip. It takes files as parameters, encodes them to
a new file with a .b252 extension, and removes the original. File access and
modification times are preserved.

Alternatively, data can be sent on stdin and its encoded form will be sent
to stdout.

The -d (short for --decode) flag changes the mode from encoding to decoding.

Both directions read the entire input into memory.
";

/// The default limit on the size of decoded output, in bytes.
const DEFAULT_MAX_SIZE: usize = 10 * (1 << 20);

const EXTENSION: &'static str = "b252";

fn app() -> clap::App<'static, 'static> {
    use clap::{crate_version, App, Arg};

    App::new("b252")
        .about(ABOUT)
        .version(crate_version!())
        .max_term_width(100)
        .arg(
            Arg::with_name("paths")
                .multiple(true)
                .help("A list of file paths to encode (or decode)."),
        )
        .arg(
            Arg::with_name("decode")
                .long("decode")
                .short("d")
                .help("Decode text (default is encoding)."),
        )
        .arg(Arg::with_name("force").long("force").short("f").help(
            "Force encoding (or decoding) even if the corresponding \
             output file already exists.",
        ))
        .arg(
            Arg::with_name("keep").long("keep").short("k").help(
                "Keep (don't delete) input files during encoding or decoding.",
            ),
        )
        .arg(
            Arg::with_name("stdout").long("stdout").short("s").help(
                "Write output to stdout without modifying existing files.",
            ),
        )
        .arg(
            Arg::with_name("level")
                .long("level")
                .short("l")
                .takes_value(true)
                .value_name("LEVEL")
                .help("The zlib compression level, 0 to 9 (default 9)."),
        )
        .arg(
            Arg::with_name("max-size")
                .long("max-size")
                .short("m")
                .takes_value(true)
                .value_name("BYTES")
                .help("The largest decoded output accepted (default 10 MiB)."),
        )
        .arg(Arg::with_name("quote").long("quote").short("q").help(
            "Wrap encoded text in double quotes. When decoding, a \
             surrounding pair of double quotes is always stripped.",
        ))
        .arg(
            Arg::with_name("verbose")
                .long("verbose")
                .short("v")
                .multiple(true)
                .help("Log more detail to stderr. May be repeated."),
        )
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse()?;
    init_logger(args.verbose);
    if args.paths.is_empty() {
        let stdin = io::stdin();
        let mut stdin = stdin.lock();
        let stdout = io::stdout();
        let mut stdout = stdout.lock();
        if args.decode {
            args.decode(&mut stdin, &mut stdout)?;
        } else {
            args.encode(&mut stdin, &mut stdout)?;
        }
    } else {
        for p in &args.paths {
            if let Err(err) = args.do_file(p, args.stdout) {
                writeln!(
                    &mut std::io::stderr(),
                    "{}: {:?}",
                    p.display(),
                    err
                )?;
            }
        }
    }
    Ok(())
}

fn init_logger(verbose: u64) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    builder.parse_default_env();
    builder.format(|buf, record| {
        writeln!(buf, "[{}] {}", record.level(), record.args())
    });
    builder.init();
}

#[derive(Debug)]
struct Args {
    paths: Vec<PathBuf>,
    decode: bool,
    force: bool,
    keep: bool,
    stdout: bool,
    level: u32,
    max_size: usize,
    quote: bool,
    verbose: u64,
}

impl Args {
    fn parse() -> anyhow::Result<Args> {
        let parsed = app().get_matches();
        let paths = parsed
            .values_of_os("paths")
            .map(|paths| paths.into_iter().map(PathBuf::from).collect())
            .unwrap_or(vec![]);
        let level = match parsed.value_of("level") {
            None => base252::BEST_LEVEL,
            Some(v) => v.parse().context("invalid --level")?,
        };
        let max_size = match parsed.value_of("max-size") {
            None => DEFAULT_MAX_SIZE,
            Some(v) => v.parse().context("invalid --max-size")?,
        };
        Ok(Args {
            paths,
            decode: parsed.is_present("decode"),
            force: parsed.is_present("force"),
            keep: parsed.is_present("keep"),
            stdout: parsed.is_present("stdout"),
            level,
            max_size,
            quote: parsed.is_present("quote"),
            verbose: parsed.occurrences_of("verbose"),
        })
    }

    fn do_file(&self, old_path: &Path, to_stdout: bool) -> anyhow::Result<()> {
        let old_md = old_path.metadata()?;
        if old_md.is_dir() {
            bail!("is a directory");
        }
        let new_path = self.new_path(old_path)?;

        let dst = io::BufWriter::new(if to_stdout {
            Box::new(stdout()) as Box<dyn Write>
        } else {
            if !self.force && new_path.exists() {
                bail!("skipping, file already exists: {}", new_path.display());
            }

            Box::new(File::create(&new_path)?) as Box<dyn Write>
        });

        let old_file = io::BufReader::new(File::open(old_path)?);
        if self.decode {
            self.decode(old_file, dst)?;
        } else {
            self.encode(old_file, dst)?;
        }

        if !to_stdout {
            let last_access = FileTime::from_last_access_time(&old_md);
            let last_mod = FileTime::from_last_modification_time(&old_md);
            set_file_times(&new_path, last_access, last_mod)?;
            if !self.keep {
                fs::remove_file(old_path)?;
            }
            info!("{} -> {}", old_path.display(), new_path.display());
        }
        Ok(())
    }

    fn new_path(&self, old_path: &Path) -> anyhow::Result<PathBuf> {
        let name = match old_path.file_name() {
            None => bail!("missing file name"),
            Some(name) => name.to_string_lossy(),
        };
        let suffix = format!(".{}", EXTENSION);
        if self.decode {
            if name.len() <= suffix.len() || !name.ends_with(&suffix) {
                bail!("skipping file without .{} extension", EXTENSION);
            }
            Ok(old_path.with_file_name(&name[0..name.len() - suffix.len()]))
        } else {
            if name.ends_with(&suffix) {
                bail!("skipping encoded file");
            }
            Ok(old_path.with_file_name(format!("{}{}", name, suffix)))
        }
    }

    fn encode<R: Read, W: Write>(
        &self,
        mut src: R,
        mut dst: W,
    ) -> anyhow::Result<()> {
        let mut buf = Vec::with_capacity(1 << 16);
        src.read_to_end(&mut buf)?;
        let text = base252::Encoder::with_level(self.level).encode_vec(&buf)?;
        info!("encoded {} bytes into {} bytes of text", buf.len(), text.len());
        if self.quote {
            dst.write_all(b"\"")?;
            dst.write_all(&text)?;
            dst.write_all(b"\"")?;
        } else {
            dst.write_all(&text)?;
        }
        dst.flush()?;
        Ok(())
    }

    fn decode<R: Read, W: Write>(
        &self,
        mut src: R,
        mut dst: W,
    ) -> anyhow::Result<()> {
        let mut buf = Vec::with_capacity(1 << 16);
        src.read_to_end(&mut buf)?;
        let text = strip_quotes(&buf);
        let raw = base252::Decoder::new().decode_vec(text, self.max_size)?;
        info!("decoded {} bytes of text into {} bytes", text.len(), raw.len());
        dst.write_all(&raw)?;
        dst.flush()?;
        Ok(())
    }
}

/// Removes one pair of surrounding double quotes, if present.
///
/// Safe text never contains a standalone quote, so a leading and trailing
/// quote can only be delimiters.
fn strip_quotes(text: &[u8]) -> &[u8] {
    if text.len() >= 2 && text[0] == b'"' && text[text.len() - 1] == b'"' {
        &text[1..text.len() - 1]
    } else {
        text
    }
}
