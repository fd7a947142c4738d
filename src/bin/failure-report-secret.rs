//! Manage the credentials sent with failure reports: the backend secret key,
//! or with `--github`, the token used to file issues through the GitHub API.

use failure_report::secret_store::{SecretKeyStore, SecretKind, SecretSource};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Set(String),
    Clear,
    Status,
}

#[derive(Debug, PartialEq, Eq)]
struct Options {
    kind: SecretKind,
    command: Command,
}

fn run() -> Result<(), String> {
    let Some(options) = parse_args(std::env::args().skip(1).collect())? else {
        return Ok(());
    };
    let store = SecretKeyStore::new(options.kind).map_err(|err| err.to_string())?;
    let label = options.kind.label();
    match options.command {
        Command::Set(key) => {
            let source = store.set(&key).map_err(|err| err.to_string())?;
            println!("{label} saved to {}.", describe(source));
        }
        Command::Clear => {
            store
                .delete()
                .map_err(|err| format!("Failed to remove {label}: {err}"))?;
            println!("Stored {label} removed.");
        }
        Command::Status => match store.get_with_source().map_err(|err| err.to_string())? {
            Some((_, source)) => println!("{label} configured ({}).", describe(source)),
            None => println!("No {label} configured."),
        },
    }
    Ok(())
}

fn describe(source: SecretSource) -> &'static str {
    match source {
        SecretSource::Environment => "environment variable",
        SecretSource::Keyring => "OS keyring",
        SecretSource::EncryptedFile => "encrypted file",
    }
}

fn parse_args(args: Vec<String>) -> Result<Option<Options>, String> {
    let mut args = args.into_iter().peekable();
    let kind = if args.next_if(|arg| arg == "--github").is_some() {
        SecretKind::GithubToken
    } else {
        SecretKind::BackendKey
    };
    let command = match args.next().as_deref() {
        None | Some("-h") | Some("--help") => {
            println!("{}", help_text());
            return Ok(None);
        }
        Some("set") => {
            let key = args
                .next()
                .ok_or_else(|| "set requires a value".to_string())?;
            Command::Set(key)
        }
        Some("clear") => Command::Clear,
        Some("status") => Command::Status,
        Some(unknown) => return Err(format!("Unknown command: {unknown}\n\n{}", help_text())),
    };
    if let Some(extra) = args.next() {
        return Err(format!("Unexpected argument: {extra}\n\n{}", help_text()));
    }
    Ok(Some(Options { kind, command }))
}

fn help_text() -> String {
    [
        "failure-report-secret",
        "",
        "Usage:",
        "  failure-report-secret [--github] set <value>",
        "  failure-report-secret [--github] clear",
        "  failure-report-secret [--github] status",
        "",
        "Options:",
        "  --github   Manage the GitHub token instead of the backend secret key",
    ]
    .join("\n")
}
