use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Arg, ArgMatches, Command, ValueHint};

use schooldigest_lib::error::DigestError;
use schooldigest_lib::google::GoogleWorkspace;
use schooldigest_lib::google_api::auth::run_consent_flow;
use schooldigest_lib::platform::Platform;
use schooldigest_lib::state::load_config;
use schooldigest_lib::workflow::{run_manual, run_on_mail, RunOutcome};

fn cli() -> Command {
    Command::new("schooldigest")
        .version(clap::crate_version!())
        .about("Daily school report: classroom log, lesson plan and menu in one document and email")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .help("Path to config.json (default: ~/.schooldigest/config.json)")
                .value_parser(clap::value_parser!(PathBuf))
                .value_hint(ValueHint::FilePath),
        )
        .subcommand(Command::new("auth").about("Authorize the Google account used for reports"))
        .subcommand(
            Command::new("run")
                .about("Build today's report now, into the current document")
                .arg(
                    Arg::new("document")
                        .long("document")
                        .short('d')
                        .help("Document ID to rewrite instead of the configured current document")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new()),
                ),
        )
        .subcommand(
            Command::new("check-mail")
                .about("Build the report into the target document if an unread classroom report arrived"),
        )
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::default()
        .parse_env(env_logger::Env::default().filter_or("SCHOOLDIGEST_LOG", "info"))
        .init();

    let matches = cli().get_matches();
    match matches.subcommand() {
        Some(("auth", _)) => match run_consent_flow().await {
            Ok(email) => {
                println!("Authorized as {}", email);
                ExitCode::SUCCESS
            }
            Err(e) => report_setup_error(DigestError::from(e)),
        },
        Some(("run", sub)) => {
            let document = sub.get_one::<String>("document").map(String::as_str);
            run_report(sub, document, false).await
        }
        Some(("check-mail", sub)) => run_report(sub, None, true).await,
        _ => unreachable!("subcommand_required is set"),
    }
}

async fn run_report(matches: &ArgMatches, document: Option<&str>, on_mail: bool) -> ExitCode {
    let config_path = matches.get_one::<PathBuf>("config");
    let config = match load_config(config_path.map(PathBuf::as_path)) {
        Ok(config) => config,
        Err(e) => return report_setup_error(e),
    };
    let workspace = match GoogleWorkspace::connect().await {
        Ok(workspace) => workspace,
        Err(e) => return report_setup_error(DigestError::from(e)),
    };
    let platform = Platform {
        mailbox: &workspace,
        storage: &workspace,
        documents: &workspace,
        mailer: &workspace,
    };

    let now = chrono::Utc::now();
    let outcome = if on_mail {
        run_on_mail(&config, platform, now).await
    } else {
        run_manual(&config, platform, document, now).await
    };

    match outcome {
        RunOutcome::Delivered {
            document_id,
            recipient,
        } => {
            println!("Report written to {} and sent to {}", document_id, recipient);
            ExitCode::SUCCESS
        }
        RunOutcome::NoNewReport => ExitCode::SUCCESS,
        // reported by email
        RunOutcome::Failed { notified: true, .. } => ExitCode::SUCCESS,
        RunOutcome::Failed {
            error,
            notified: false,
        } => report_setup_error(error),
    }
}

/// Errors no email could report.
fn report_setup_error(error: DigestError) -> ExitCode {
    eprintln!("Error: {}", error);
    eprintln!("{}", error.recovery_suggestion());
    ExitCode::FAILURE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        cli().debug_assert();
    }

    #[test]
    fn test_run_with_document_and_config() {
        let matches = cli()
            .try_get_matches_from(["schooldigest", "run", "--document", "doc-1", "--config", "/tmp/c.json"])
            .unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "run");
        assert_eq!(sub.get_one::<String>("document").map(String::as_str), Some("doc-1"));
        assert_eq!(
            sub.get_one::<PathBuf>("config"),
            Some(&PathBuf::from("/tmp/c.json"))
        );
    }

    #[test]
    fn test_subcommand_required() {
        assert!(cli().try_get_matches_from(["schooldigest"]).is_err());
        assert!(cli().try_get_matches_from(["schooldigest", "check-mail"]).is_ok());
    }
}
