use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Subcommand)]
enum Command {
    /// List identities held by the agent
    List,

    /// Sign the contents of a file with one of the agent's identities
    Sign {
        /// Position of the identity in the `list` output
        #[arg(short, long, default_value_t = 0)]
        index: usize,

        /// Ask for `rsa-sha2-512` signatures from RSA keys
        #[arg(long)]
        sha512: bool,

        file: PathBuf,
    },

    /// Show the extensions the agent advertises
    Extensions,

    /// Ask the agent to issue a certificate for the request in a file
    Certificate {
        file: PathBuf,

        /// Where to write the certificate, instead of reporting its size
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Parser)]
struct Args {
    /// Path to the agent socket, overriding `SSH_AUTH_SOCK`
    #[arg(short = 'H', long)]
    host: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[cfg(unix)]
fn main() -> testresult::TestResult {
    use std::os::unix::net::UnixStream;

    use ssh_agent_x509::{
        blocking::Client,
        config::ClientConfig,
        proto::{extension::CreateCertificate, SignRequest, SSH_AGENT_RSA_SHA2_512},
        ssh_key::HashAlg,
    };

    env_logger::init();
    let args = Args::parse();

    let config = match args.host {
        Some(path) => ClientConfig::new(path),
        None => ClientConfig::from_env()?,
    };
    let mut client = Client::<UnixStream>::from_config(&config);

    match args.command {
        Command::List => {
            for identity in client.request_identities()? {
                match identity.fingerprint(HashAlg::Sha256) {
                    Ok(fingerprint) => println!("{fingerprint} {}", identity.comment),
                    Err(_) => println!("(opaque key) {}", identity.comment),
                }
            }
        }
        Command::Sign {
            index,
            sha512,
            file,
        } => {
            let identities = client.request_identities()?;
            let identity = identities.get(index).ok_or_else(|| {
                std::io::Error::other(format!("agent holds {} identities", identities.len()))
            })?;
            let flags = if sha512 { SSH_AGENT_RSA_SHA2_512 } else { 0 };
            let request = SignRequest::new(identity, std::fs::read(file)?, flags);
            let signature = client.sign(request)?.to_signature()?;
            println!("{:?}", signature.algorithm());
        }
        Command::Extensions => {
            for extension in client.advertised_extensions()? {
                let marker = if extension.callable { "*" } else { " " };
                println!("{marker} {}", extension.name);
            }
        }
        Command::Certificate { file, output } => {
            let request = CreateCertificate::new(std::fs::read(file)?);
            let certificate = client.create_certificate(request)?;
            match output {
                Some(path) => std::fs::write(path, certificate.as_bytes())?,
                None => println!("certificate of {} bytes", certificate.as_bytes().len()),
            }
        }
    }

    Ok(())
}

#[cfg(windows)]
fn main() {
    eprintln!("Sadly, there are no high-quality sync named pipe crates as of 2024");
}
