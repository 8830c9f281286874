use clap::{Parser, Subcommand};
use gpwebpay_digest::cli::{self as prog_cli, Command, OutputMode};
use gpwebpay_digest::config::{KeyFileConfig, WebpayConfig};
use gpwebpay_digest::{DigestService, LogSink};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use zeroize::Zeroizing;

#[derive(Parser, Debug)]
#[command(name = "gpwebpay-digest", version, about = "Sign and verify GP webpay DIGEST values", long_about = None)]
struct Cli {
    #[arg(long, help = "Path to a config file (TOML). If omitted, the usual locations are searched.")]
    config: Option<PathBuf>,
    #[arg(long, default_value = "human", help = "Output format: human|plain|json")]
    format: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Sign a message and print the Base64 digest")]
    Sign {
        #[arg(required_unless_present = "stdin", help = "Message to sign (pipe-joined fields)")]
        message: Option<String>,
        #[arg(long, conflicts_with = "message", help = "Read the message from stdin")]
        stdin: bool,
        #[arg(long, help = "PEM bundle or key file with the private key; defaults to [private_key] in config")]
        key: Option<PathBuf>,
        #[arg(long, help = "Environment variable holding the key password")]
        password_env: Option<String>,
        #[arg(long, help = "Message encoding label or code page; defaults to config (windows-1250)")]
        encoding: Option<String>,
    },
    #[command(about = "Verify a Base64 digest; exits with 1 when it does not match")]
    Verify {
        #[arg(help = "Base64 signature")]
        signature: String,
        #[arg(required_unless_present = "stdin", help = "Signed message")]
        message: Option<String>,
        #[arg(long, conflicts_with = "message", help = "Read the message from stdin")]
        stdin: bool,
        #[arg(long, help = "Certificate (PEM or DER); defaults to [public_certificate] in config")]
        cert: Option<PathBuf>,
        #[arg(long, help = "Message encoding label or code page; defaults to config (windows-1250)")]
        encoding: Option<String>,
    },
    #[command(about = "Show thumbprint, subject and key presence of a certificate file")]
    Inspect {
        #[arg(long, help = "Certificate or PEM bundle")]
        cert: PathBuf,
        #[arg(long, help = "Environment variable holding the key password")]
        password_env: Option<String>,
    },
    #[command(about = "List registered code pages")]
    Encodings,
    #[command(name = "digest-input", about = "Join fields into a digest input message")]
    DigestInput {
        #[arg(help = "Field values in protocol order")]
        fields: Vec<String>,
    },
}

fn message_arg(message: Option<String>, stdin: bool) -> Result<String, Box<dyn std::error::Error>> {
    if stdin {
        return Ok(prog_cli::read_message(std::io::stdin().lock())?);
    }
    message.ok_or_else(|| "a message or --stdin is required".into())
}

fn key_path(
    cli_path: Option<PathBuf>,
    cfg: Option<&KeyFileConfig>,
    what: &str,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    cli_path
        .or_else(|| cfg.map(|k| k.path.clone()))
        .ok_or_else(|| format!("no {what} given and none configured").into())
}

fn password(
    cli_var: Option<&str>,
    cfg: Option<&KeyFileConfig>,
) -> Result<Zeroizing<String>, Box<dyn std::error::Error>> {
    let config_var = cfg.and_then(|k| k.password_env.as_deref());
    let pw = prog_cli::resolve_password(
        cli_var,
        config_var,
        |k| std::env::var(k).ok(),
        std::io::stdin().is_terminal(),
        || rpassword::prompt_password("Key password: "),
    )
    .map_err(|e| format!("reading key password: {e}"))?;
    Ok(pw)
}

fn build_command(cmd: Commands, cfg: &WebpayConfig) -> Result<Command, Box<dyn std::error::Error>> {
    let flags = cfg.key_storage_flags;
    Ok(match cmd {
        Commands::Sign { message, stdin, key, password_env, encoding } => {
            let key_cfg = cfg.private_key.as_ref();
            Command::Sign {
                message: message_arg(message, stdin)?,
                key: key_path(key, key_cfg, "--key")?,
                password: password(password_env.as_deref(), key_cfg)?,
                encoding: encoding.unwrap_or_else(|| cfg.encoding.clone()),
                flags,
            }
        }
        Commands::Verify { signature, message, stdin, cert, encoding } => Command::Verify {
            signature,
            message: message_arg(message, stdin)?,
            cert: key_path(cert, cfg.public_certificate.as_ref(), "--cert")?,
            // Public certificates are not encrypted.
            password: Zeroizing::new(String::new()),
            encoding: encoding.unwrap_or_else(|| cfg.encoding.clone()),
            flags,
        },
        Commands::Inspect { cert, password_env } => Command::Inspect {
            password: password(password_env.as_deref(), None)?,
            cert,
            flags,
        },
        Commands::Encodings => Command::Encodings,
        Commands::DigestInput { fields } => Command::DigestInput { fields },
    })
}

fn main() {
    let cli = Cli::parse();
    let cfg = match WebpayConfig::discover(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(2);
        }
    };
    if let Err(e) = gpwebpay_digest::logger::configure(&cfg.logging) {
        eprintln!("warning: logging disabled: {e}");
    }
    let mode: OutputMode = prog_cli::parse_output_mode(&cli.format);
    let svc = DigestService::new(Arc::new(LogSink::new()));

    let result = build_command(cli.command, &cfg)
        .and_then(|cmd| prog_cli::run_with_format(&svc, cmd, mode));
    match result {
        Ok(out) => {
            for line in &out.lines {
                println!("{line}");
            }
            if !out.success {
                std::process::exit(1);
            }
        }
        Err(e) => {
            log::error!("{e}");
            eprintln!("error: {e}");
            std::process::exit(2);
        }
    }
}
