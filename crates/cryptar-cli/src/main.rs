//! cryptar: authenticated encrypted archives
//!
//! Usage:
//!   cryptar -c --password -f backup.arc notes/ todo.txt
//!   cryptar -t --password -f backup.arc
//!   cryptar -x --key private.key -f backup.arc 'notes/.*'
//!   cryptar -c --shard a.arc --shard b.arc --shard c.arc --threshold 2 src/
//!   cryptar --keygen --public public.key --private private.key
//!
//! The password is read from the terminal with echo disabled, or from the
//! CRYPTAR_PASSWORD environment variable for non-interactive use.

mod bytesize;
mod create;
mod extract;
mod filter;
mod keygen;
mod list;
mod scan;

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, ArgGroup, Parser};
use secrecy::SecretString;
use tracing_subscriber::EnvFilter;

use cryptar_archive::{Archive, Curve448Archive, KeyContainer, PasswordArchive, ShardArchive};
use cryptar_crypto::{PrivateKey, PublicKey};

use filter::RegexFilter;

#[derive(Parser, Debug)]
#[command(
    name = "cryptar",
    version,
    about = "authenticated encrypted archives",
    group(ArgGroup::new("operation").required(true)),
    group(ArgGroup::new("security"))
)]
struct Args {
    /// Create a new archive
    #[arg(short = 'c', long, group = "operation")]
    create: bool,

    /// List archive contents
    #[arg(short = 't', long, group = "operation")]
    list: bool,

    /// Extract from an archive
    #[arg(short = 'x', long, group = "operation")]
    extract: bool,

    /// Generate an X448 key pair
    #[arg(long, group = "operation")]
    keygen: bool,

    /// Archive file
    #[arg(short = 'f', long, value_name = "PATH")]
    file: Option<PathBuf>,

    /// Archive shard (repeat once per shard file)
    #[arg(long, value_name = "PATH")]
    shard: Vec<PathBuf>,

    /// Derive the archive key from a password
    #[arg(long, group = "security")]
    password: bool,

    /// Derive the archive key from an X448 exchange with this key container
    #[arg(long, group = "security", value_name = "PATH")]
    key: Option<PathBuf>,

    /// Number of shards required to recover the key (create only)
    #[arg(long, value_name = "K")]
    threshold: Option<u8>,

    /// Public key container path (keygen)
    #[arg(long, value_name = "PATH")]
    public: Option<PathBuf>,

    /// Private key container path (keygen)
    #[arg(long, value_name = "PATH")]
    private: Option<PathBuf>,

    /// Argon2 iterations
    #[arg(long, default_value_t = 3, value_name = "N")]
    iterations: u32,

    /// Argon2 memory cost in KiB
    #[arg(long, default_value_t = 16, value_name = "KIB")]
    memory: u32,

    /// Verbose output (repeat for more detail)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,

    /// Files and directories to add, or regex patterns selecting entries
    #[arg(value_name = "NAMES")]
    names: Vec<String>,
}

impl Args {
    /// The rules clap groups cannot express.
    fn validate(&self) -> Result<()> {
        let has_security = self.password || self.key.is_some() || !self.shard.is_empty();

        if (self.create || self.list || self.extract) && !has_security {
            bail!("operation requires --password, --key, or --shard");
        }
        if self.shard.len() > 255 {
            bail!("can't use more than 255 shards");
        }
        if self.file.is_some() && !self.shard.is_empty() {
            bail!("can't combine -f, --file and --shard");
        }
        if (self.password || self.key.is_some()) && !self.keygen && self.file.is_none() {
            bail!("must provide -f, --file");
        }
        if self.create && !self.shard.is_empty() {
            if self.shard.len() < 2 {
                bail!("can't use fewer than 2 shards");
            }
            match self.threshold {
                None => bail!("--threshold is required with --shard"),
                Some(k) if k < 2 => bail!("--threshold must be > 1"),
                Some(k) if (k as usize) > self.shard.len() => {
                    bail!("--threshold must be <= {}", self.shard.len())
                }
                Some(_) => {}
            }
        }
        if self.keygen && (self.public.is_none() || self.private.is_none()) {
            bail!("keygen requires --public and --private");
        }
        if self.create && self.names.is_empty() {
            bail!("no files or directories specified");
        }
        Ok(())
    }
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(err) = run(args) {
        eprintln!("cryptar: {err:#}");
        process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("CRYPTAR_LOG").unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(args: Args) -> Result<()> {
    args.validate()?;

    if args.keygen {
        return keygen::run(&args);
    }

    if args.create {
        let writer = open_for_write(&args)?.writer()?;
        return create::run(writer, &args.names, args.verbose);
    }

    let reader = open_for_read(&args)?
        .reader()
        .context("opening archive")?;
    let filter = RegexFilter::new(reader, &args.names)?;

    if args.list {
        list::run(filter, args.verbose)
    } else {
        extract::run(filter, args.verbose)
    }
}

// ── Archive construction ─────────────────────────────────────────────────────

fn open_for_write(args: &Args) -> Result<Archive<File>> {
    if args.password {
        let file = create_file(args.file.as_ref().context("missing archive file")?)?;
        let password = read_password()?;
        Ok(Archive::Password(PasswordArchive::new(
            password,
            args.iterations,
            args.memory,
            file,
        )))
    } else if let Some(key_path) = &args.key {
        let public = load_public_key(key_path)?;
        let file = create_file(args.file.as_ref().context("missing archive file")?)?;
        Ok(Archive::Curve448(Curve448Archive::to_public(public, file)))
    } else {
        let files = args
            .shard
            .iter()
            .map(|path| create_file(path))
            .collect::<Result<Vec<_>>>()?;
        // Validation guarantees the threshold is present for shard creation.
        let threshold = args.threshold.unwrap_or(0);
        Ok(Archive::Shard(ShardArchive::new(threshold, files)))
    }
}

fn open_for_read(args: &Args) -> Result<Archive<File>> {
    if args.password {
        let file = open_file(args.file.as_ref().context("missing archive file")?)?;
        let password = read_password()?;
        Ok(Archive::Password(PasswordArchive::new(
            password,
            args.iterations,
            args.memory,
            file,
        )))
    } else if let Some(key_path) = &args.key {
        let private = load_private_key(key_path, args)?;
        let file = open_file(args.file.as_ref().context("missing archive file")?)?;
        Ok(Archive::Curve448(Curve448Archive::with_private(
            private, file,
        )))
    } else {
        let files = args
            .shard
            .iter()
            .map(|path| open_file(path))
            .collect::<Result<Vec<_>>>()?;
        Ok(Archive::Shard(ShardArchive::new(0, files)))
    }
}

fn create_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create_new(true)
        .open(path)
        .with_context(|| format!("creating {}", path.display()))
}

fn open_file(path: &Path) -> Result<File> {
    File::open(path).with_context(|| format!("opening {}", path.display()))
}

// ── Keys and passwords ───────────────────────────────────────────────────────

fn read_password() -> Result<SecretString> {
    if let Ok(password) = std::env::var("CRYPTAR_PASSWORD") {
        return Ok(SecretString::from(password));
    }
    let password =
        rpassword::prompt_password("password: ").context("reading password from terminal")?;
    Ok(SecretString::from(password))
}

fn load_public_key(path: &Path) -> Result<PublicKey> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    KeyContainer::new(file, SecretString::from(String::new()), 1, 8)
        .read_public()
        .with_context(|| format!("reading public key from {}", path.display()))
}

fn load_private_key(path: &Path, args: &Args) -> Result<PrivateKey> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let password = read_password()?;
    KeyContainer::new(file, password, args.iterations, args.memory)
        .read_private()
        .with_context(|| format!("reading private key from {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Result<Args> {
        let args = Args::try_parse_from(std::iter::once("cryptar").chain(argv.iter().copied()))?;
        args.validate()?;
        Ok(args)
    }

    #[test]
    fn operation_is_required() {
        assert!(parse(&["-f", "a.arc"]).is_err());
    }

    #[test]
    fn operations_are_exclusive() {
        assert!(parse(&["-c", "-t", "--password", "-f", "a.arc", "x"]).is_err());
    }

    #[test]
    fn security_modes_are_exclusive() {
        assert!(parse(&["-t", "--password", "--key", "k", "-f", "a.arc"]).is_err());
    }

    #[test]
    fn create_requires_security() {
        assert!(parse(&["-c", "-f", "a.arc", "x"]).is_err());
        assert!(parse(&["-c", "--password", "-f", "a.arc", "x"]).is_ok());
    }

    #[test]
    fn password_requires_file() {
        assert!(parse(&["-t", "--password"]).is_err());
    }

    #[test]
    fn file_and_shard_conflict() {
        assert!(parse(&["-t", "-f", "a.arc", "--shard", "b.arc"]).is_err());
    }

    #[test]
    fn shard_create_requires_threshold() {
        assert!(parse(&["-c", "--shard", "a", "--shard", "b", "x"]).is_err());
        assert!(parse(&["-c", "--shard", "a", "--shard", "b", "--threshold", "2", "x"]).is_ok());
        assert!(parse(&["-c", "--shard", "a", "--shard", "b", "--threshold", "3", "x"]).is_err());
        assert!(parse(&["-c", "--shard", "a", "--shard", "b", "--threshold", "1", "x"]).is_err());
    }

    #[test]
    fn shard_list_needs_no_threshold() {
        assert!(parse(&["-t", "--shard", "a", "--shard", "b"]).is_ok());
    }

    #[test]
    fn keygen_requires_both_paths() {
        assert!(parse(&["--keygen", "--public", "p"]).is_err());
        assert!(parse(&["--keygen", "--public", "p", "--private", "q"]).is_ok());
    }

    #[test]
    fn create_requires_names() {
        assert!(parse(&["-c", "--password", "-f", "a.arc"]).is_err());
    }

    #[test]
    fn kdf_defaults() {
        let args = parse(&["-t", "--password", "-f", "a.arc"]).unwrap();
        assert_eq!(args.iterations, 3);
        assert_eq!(args.memory, 16);
    }
}
