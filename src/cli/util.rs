use super::runner::OutputMode;
use std::io::Read;
use zeroize::Zeroizing;

pub fn parse_output_mode(s: &str) -> OutputMode {
    match s.to_ascii_lowercase().as_str() {
        "json" => OutputMode::Json,
        "plain" => OutputMode::Plain,
        _ => OutputMode::Human,
    }
}

/// Reads a message, dropping one trailing line ending.
pub fn read_message(mut reader: impl Read) -> std::io::Result<String> {
    let mut s = String::new();
    reader.read_to_string(&mut s)?;
    if s.ends_with('\n') {
        s.pop();
        if s.ends_with('\r') {
            s.pop();
        }
    }
    Ok(s)
}

/// Key password from, in order: the variable named on the command line, the variable
/// named in the config file, `GPWEBPAY_KEY_PASSWORD`.
pub fn password_from_env(
    cli_var: Option<&str>,
    config_var: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Option<Zeroizing<String>> {
    cli_var
        .into_iter()
        .chain(config_var)
        .chain(std::iter::once(crate::config::PASSWORD_ENV))
        .find_map(&env)
        .map(Zeroizing::new)
}

/// Like [`password_from_env`], then `prompt` when `interactive`; otherwise empty.
/// Prompt failures are returned, not treated as an empty password.
pub fn resolve_password(
    cli_var: Option<&str>,
    config_var: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
    interactive: bool,
    prompt: impl FnOnce() -> std::io::Result<String>,
) -> std::io::Result<Zeroizing<String>> {
    if let Some(pw) = password_from_env(cli_var, config_var, env) {
        return Ok(pw);
    }
    if interactive {
        return prompt().map(Zeroizing::new);
    }
    Ok(Zeroizing::new(String::new()))
}
