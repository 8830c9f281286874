use crate::certificate::{Certificate, KeySource};
use crate::charset::{self, Charset};
use crate::digest::DigestService;
use crate::message::DigestInput;

use super::command::Command;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OutputMode {
    Human,
    Plain,
    Json,
}

/// Rendered command output. `success` is false when a verification did not match.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RunOutput {
    pub lines: Vec<String>,
    pub success: bool,
}

impl RunOutput {
    fn ok(lines: Vec<String>) -> Self {
        RunOutput { lines, success: true }
    }
}

pub fn run(svc: &DigestService, cmd: Command) -> Result<RunOutput, Box<dyn std::error::Error>> {
    let out = run_with_format(svc, cmd, OutputMode::Human)?;
    for line in &out.lines {
        println!("{line}");
    }
    Ok(out)
}

pub fn run_with_format(
    svc: &DigestService,
    cmd: Command,
    mode: OutputMode,
) -> Result<RunOutput, Box<dyn std::error::Error>> {
    match cmd {
        Command::Sign { message, key, password, encoding, flags } => {
            let charset = Charset::for_label(&encoding)?;
            let signature =
                svc.sign_with(&message, KeySource::file(&key, &password, flags), charset)?;
            log::info!("signed {} chars with {} ({})", message.chars().count(), key.display(), charset);
            let line = match mode {
                OutputMode::Json => serde_json::json!({
                    "action": "sign",
                    "signature": signature,
                    "encoding": charset.name(),
                    "key": key.display().to_string(),
                })
                .to_string(),
                OutputMode::Plain => signature,
                OutputMode::Human => format!("signature={signature} encoding={charset}"),
            };
            Ok(RunOutput::ok(vec![line]))
        }
        Command::Verify { signature, message, cert, password, encoding, flags } => {
            let charset = Charset::for_label(&encoding)?;
            let valid = svc.verify_with(
                &signature,
                &message,
                KeySource::file(&cert, &password, flags),
                charset,
            )?;
            log::info!("verification against {} returned {valid}", cert.display());
            let line = match mode {
                OutputMode::Json => serde_json::json!({
                    "action": "verify",
                    "valid": valid,
                    "encoding": charset.name(),
                    "certificate": cert.display().to_string(),
                })
                .to_string(),
                OutputMode::Plain => (if valid { "valid" } else { "invalid" }).to_string(),
                OutputMode::Human => format!("valid={valid} encoding={charset}"),
            };
            Ok(RunOutput { lines: vec![line], success: valid })
        }
        Command::Inspect { cert, password, flags } => {
            let c = Certificate::from_file(&cert, &password, flags)?;
            let subject = c.subject().unwrap_or("-");
            let has_public = c.rsa_public_key().is_some();
            let lines = match mode {
                OutputMode::Json => vec![
                    serde_json::json!({
                        "thumbprint": c.thumbprint(),
                        "subject": c.subject(),
                        "rsa_public_key": has_public,
                        "private_key": c.has_private_key(),
                        "flags": c.flags(),
                    })
                    .to_string(),
                ],
                OutputMode::Plain => vec![c.thumbprint().to_string()],
                OutputMode::Human => vec![
                    format!("thumbprint={}", c.thumbprint()),
                    format!("subject={subject}"),
                    format!("rsa_public_key={has_public}"),
                    format!("private_key={}", c.has_private_key()),
                ],
            };
            Ok(RunOutput::ok(lines))
        }
        Command::Encodings => {
            charset::init();
            let pages = charset::registered()?;
            let lines = match mode {
                OutputMode::Json => {
                    let list: Vec<_> = pages
                        .iter()
                        .map(|(cp, name)| serde_json::json!({"code_page": cp, "name": name}))
                        .collect();
                    vec![serde_json::Value::Array(list).to_string()]
                }
                OutputMode::Plain => pages.iter().map(|(cp, name)| format!("{cp} {name}")).collect(),
                OutputMode::Human => {
                    pages.iter().map(|(cp, name)| format!("cp{cp} name={name}")).collect()
                }
            };
            Ok(RunOutput::ok(lines))
        }
        Command::DigestInput { fields } => {
            let input: DigestInput = fields.into_iter().collect();
            let line = match mode {
                OutputMode::Json => serde_json::json!({
                    "message": input.to_message(),
                    "fields": input.fields(),
                })
                .to_string(),
                OutputMode::Plain | OutputMode::Human => input.to_message(),
            };
            Ok(RunOutput::ok(vec![line]))
        }
    }
}
