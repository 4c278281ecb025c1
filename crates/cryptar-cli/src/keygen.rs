//! X448 key pair generation into password-protected containers
//!
//! The public container is sealed under the empty password so it can be
//! opened without interaction; the private container is sealed under a
//! password read from the terminal.

use anyhow::{Context, Result};
use secrecy::SecretString;
use tracing::info;

use cryptar_archive::KeyContainer;
use cryptar_crypto::generate_keypair;

use crate::{create_file, read_password, Args};

pub fn run(args: &Args) -> Result<()> {
    let public_path = args.public.as_ref().context("missing --public")?;
    let private_path = args.private.as_ref().context("missing --private")?;

    let (public, private) = generate_keypair();

    let public_file = create_file(public_path)?;
    KeyContainer::new(public_file, SecretString::from(String::new()), 1, 8)
        .write_public(&public)
        .with_context(|| format!("writing {}", public_path.display()))?;

    let password = read_password()?;
    let private_file = create_file(private_path)?;
    KeyContainer::new(private_file, password, args.iterations, args.memory)
        .write_private(&private)
        .with_context(|| format!("writing {}", private_path.display()))?;

    info!(
        public = %public_path.display(),
        private = %private_path.display(),
        "key pair generated"
    );
    Ok(())
}
