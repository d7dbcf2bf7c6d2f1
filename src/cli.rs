use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use studyplan::config::{
    DEFAULT_BIND, DEFAULT_DB_PATH, DEFAULT_MAX_BODY_BYTES, DEFAULT_RATE_LIMIT_MAX,
    DEFAULT_RATE_LIMIT_WINDOW_SECS,
};

pub const DEFAULT_SERVER: &str = "http://127.0.0.1:5000";

#[derive(Parser, Debug)]
#[command(
    name = "studyplan",
    version,
    about = "Study planner API server and command-line client"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = "STUDYPLAN_SERVER",
        default_value = DEFAULT_SERVER,
        help = "Base URL of the API server"
    )]
    pub server: String,
    #[arg(
        long,
        global = true,
        env = "STUDYPLAN_TOKEN",
        hide_env_values = true,
        help = "Bearer token sent with client requests"
    )]
    pub token: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP API server.
    Serve(ServeArgs),
    #[command(subcommand)]
    Token(TokenCommand),
    #[command(subcommand)]
    Daily(DailyCommand),
    #[command(subcommand)]
    Monthly(MonthlyCommand),
    #[command(subcommand)]
    Session(SessionCommand),
    #[command(subcommand)]
    Syllabus(SyllabusCommand),
    #[command(subcommand)]
    Resource(ResourceCommand),
    #[command(subcommand)]
    Group(GroupCommand),
}

impl Command {
    pub fn is_client(&self) -> bool {
        !matches!(self, Command::Serve(_) | Command::Token(_))
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[arg(long, env = "STUDYPLAN_BIND", default_value = DEFAULT_BIND)]
    pub bind: SocketAddr,
    #[arg(long, env = "STUDYPLAN_DB", default_value = DEFAULT_DB_PATH)]
    pub db: PathBuf,
    #[command(flatten)]
    pub secret: SecretArg,
    #[arg(
        long,
        env = "STUDYPLAN_CORS_ORIGINS",
        default_value = "",
        help = "Comma separated list of allowed browser origins"
    )]
    pub cors_origins: String,
    #[arg(long, env = "STUDYPLAN_MAX_BODY_BYTES", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,
    #[arg(long, env = "STUDYPLAN_RATE_LIMIT_MAX", default_value_t = DEFAULT_RATE_LIMIT_MAX)]
    pub rate_limit_max: u32,
    #[arg(
        long,
        env = "STUDYPLAN_RATE_LIMIT_WINDOW_SECS",
        default_value_t = DEFAULT_RATE_LIMIT_WINDOW_SECS
    )]
    pub rate_limit_window_secs: u64,
    #[arg(
        long,
        env = "STUDYPLAN_TRUST_FORWARDED_FOR",
        help = "Key rate limits on the first X-Forwarded-For address"
    )]
    pub trust_forwarded_for: bool,
}

#[derive(Args, Debug)]
pub struct SecretArg {
    #[arg(
        long = "token-secret",
        env = "STUDYPLAN_TOKEN_SECRET",
        hide_env_values = true,
        help = "Shared secret used to sign and verify bearer tokens"
    )]
    pub value: String,
}

#[derive(Subcommand, Debug)]
pub enum TokenCommand {
    /// Sign a bearer token for a user id.
    Issue(TokenIssue),
}

#[derive(Args, Debug)]
pub struct TokenIssue {
    pub user: String,
    #[arg(long, default_value_t = 24 * 30)]
    pub ttl_hours: i64,
    #[command(flatten)]
    pub secret: SecretArg,
}

#[derive(Subcommand, Debug)]
pub enum DailyCommand {
    List(DailyList),
    Add(DailyAdd),
    Update(DailyUpdate),
    Toggle(IdArg),
    Remove(IdArg),
}

#[derive(Args, Debug)]
pub struct DailyList {
    #[arg(long)]
    pub date: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub struct DailyAdd {
    pub task: String,
    #[arg(long, help = "Day the goal belongs to (defaults to today)")]
    pub date: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub struct DailyUpdate {
    pub id: i64,
    #[arg(long)]
    pub task: Option<String>,
    #[arg(long)]
    pub date: Option<NaiveDate>,
    #[arg(long)]
    pub completed: Option<bool>,
}

#[derive(Subcommand, Debug)]
pub enum MonthlyCommand {
    List,
    Add(MonthlyForm),
    Edit(MonthlyEdit),
    Complete(MonthlyComplete),
    Toggle(IdArg),
    Remove(IdArg),
}

#[derive(Args, Debug)]
pub struct MonthlyForm {
    pub subject: String,
    pub target: String,
    pub deadline: NaiveDate,
}

#[derive(Args, Debug)]
pub struct MonthlyEdit {
    pub id: i64,
    #[command(flatten)]
    pub form: MonthlyForm,
}

#[derive(Args, Debug)]
pub struct MonthlyComplete {
    pub id: i64,
    #[arg(long, help = "Mark the plan as open again")]
    pub undo: bool,
}

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    List(SessionList),
    Add(SessionAdd),
    Remove(IdArg),
}

#[derive(Args, Debug)]
pub struct SessionList {
    #[arg(long)]
    pub date: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub struct SessionAdd {
    pub subject: String,
    #[arg(value_name = "MINUTES")]
    pub duration_minutes: i32,
    #[arg(long)]
    pub date: Option<NaiveDate>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum SyllabusCommand {
    List(SyllabusList),
    Add(SyllabusAdd),
    Toggle(IdArg),
    Remove(IdArg),
}

#[derive(Args, Debug)]
pub struct SyllabusList {
    #[arg(long)]
    pub subject: Option<String>,
}

#[derive(Args, Debug)]
pub struct SyllabusAdd {
    pub subject: String,
    pub topic: String,
}

#[derive(Subcommand, Debug)]
pub enum ResourceCommand {
    List,
    Add(ResourceAdd),
    Remove(IdArg),
}

#[derive(Args, Debug)]
pub struct ResourceAdd {
    pub title: String,
    pub url: String,
    #[arg(long)]
    pub subject: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum GroupCommand {
    List,
    Add(GroupAdd),
    Remove(IdArg),
}

#[derive(Args, Debug)]
pub struct GroupAdd {
    pub name: String,
    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Args, Debug)]
pub struct IdArg {
    pub id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn daily_add_parses_optional_date() {
        let cli = Cli::try_parse_from([
            "studyplan",
            "daily",
            "add",
            "Read chapter 1",
            "--date",
            "2024-01-15",
        ])
        .expect("parse");
        match cli.command {
            Command::Daily(DailyCommand::Add(args)) => {
                assert_eq!(args.task, "Read chapter 1");
                assert_eq!(args.date, NaiveDate::from_ymd_opt(2024, 1, 15));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn monthly_add_rejects_malformed_deadline() {
        let result = Cli::try_parse_from([
            "studyplan",
            "monthly",
            "add",
            "Math",
            "5 chapters",
            "31/01/2024",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn serve_and_token_are_not_client_commands() {
        let cli = Cli::try_parse_from([
            "studyplan",
            "token",
            "issue",
            "alice",
            "--token-secret",
            "s3cret",
        ])
        .expect("parse");
        assert!(!cli.command.is_client());
        let cli = Cli::try_parse_from(["studyplan", "group", "list"]).expect("parse");
        assert!(cli.command.is_client());
    }
}
