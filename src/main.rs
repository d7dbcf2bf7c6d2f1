mod cli;

use std::process::ExitCode;
use std::time::Duration;

use chrono::{Local, NaiveDate, TimeDelta, Utc};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use studyplan::auth::TokenSigner;
use studyplan::client::{ClientError, HttpTransport, StudyStore};
use studyplan::config::{parse_origins, RateLimitConfig, ServerConfig};
use studyplan::db;
use studyplan::error::AppError;
use studyplan::http::{self, AppState};
use studyplan::model::{
    DailyGoalChanges, MonthlyPlanInput, StudyGroupInput, StudyResourceInput, StudySessionInput,
    SyllabusTopicInput,
};
use studyplan::views::{
    format_daily_goals, format_groups, format_monthly_plans, format_resources, format_sessions,
    format_syllabus, Notice,
};

use crate::cli::{
    Cli, Command, DailyCommand, GroupCommand, MonthlyCommand, ResourceCommand, ServeArgs,
    SessionCommand, SyllabusCommand, TokenCommand, TokenIssue,
};

type Store = StudyStore<HttpTransport>;

/// What a client command prints once its action has resolved.
struct Report {
    notice: Option<String>,
    view: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(if cli.command.is_client() { "warn" } else { "info" });
    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

async fn run(cli: Cli) -> Result<ExitCode, AppError> {
    let Cli {
        server,
        token,
        command,
    } = cli;
    let store = || StudyStore::new(HttpTransport::new(&server, token.clone()));
    let today = Local::now().date_naive();

    let code = match command {
        Command::Serve(args) => {
            serve(args).await?;
            ExitCode::SUCCESS
        }
        Command::Token(TokenCommand::Issue(args)) => {
            issue_token(args)?;
            ExitCode::SUCCESS
        }
        Command::Daily(command) => finish(handle_daily(&store(), command, today).await),
        Command::Monthly(command) => finish(handle_monthly(&store(), command, today).await),
        Command::Session(command) => finish(handle_session(&store(), command, today).await),
        Command::Syllabus(command) => finish(handle_syllabus(&store(), command).await),
        Command::Resource(command) => finish(handle_resource(&store(), command).await),
        Command::Group(command) => finish(handle_group(&store(), command).await),
    };
    Ok(code)
}

async fn serve(args: ServeArgs) -> Result<(), AppError> {
    if args.max_body_bytes == 0 {
        return Err(AppError::InvalidInput(
            "max-body-bytes must be greater than zero".to_string(),
        ));
    }
    if args.rate_limit_max == 0 || args.rate_limit_window_secs == 0 {
        return Err(AppError::InvalidInput(
            "rate limit max and window must be greater than zero".to_string(),
        ));
    }
    let config = ServerConfig {
        bind: args.bind,
        database_path: args.db,
        token_secret: args.secret.value,
        cors_allowed_origins: parse_origins(&args.cors_origins),
        max_body_bytes: args.max_body_bytes,
        rate_limit: RateLimitConfig {
            max_requests: args.rate_limit_max,
            window: Duration::from_secs(args.rate_limit_window_secs),
        },
        trust_forwarded_for: args.trust_forwarded_for,
    };

    db::ensure_parent_dir(&config.database_path)?;
    let mut lock = db::open_lock(&config.database_path)?;
    let _guard = lock.try_write().map_err(|_| {
        AppError::InvalidInput(format!(
            "database {} is already served by another process",
            config.database_path.display()
        ))
    })?;
    let db = db::connect(&config.database_path).await?;
    db::ensure_schema(&db).await?;

    let listener = TcpListener::bind(config.bind).await?;
    info!(
        addr = %listener.local_addr()?,
        config = %serde_json::to_string(&config)?,
        "studyplan server listening"
    );
    let state = AppState::new(db, config)?;
    http::serve(listener, state).await?;
    Ok(())
}

fn issue_token(args: TokenIssue) -> Result<(), AppError> {
    let signer = TokenSigner::new(&args.secret.value)?;
    let expires_at = TimeDelta::try_hours(args.ttl_hours)
        .filter(|ttl| *ttl > TimeDelta::zero())
        .and_then(|ttl| Utc::now().checked_add_signed(ttl))
        .ok_or_else(|| {
            AppError::InvalidInput(format!("ttl-hours out of range: {}", args.ttl_hours))
        })?;
    println!("{}", signer.issue(&args.user, expires_at)?);
    Ok(())
}

fn finish(result: Result<Report, ClientError>) -> ExitCode {
    let report = match result {
        Ok(report) => report,
        Err(err) => return emit(Notice::failure(err.to_string())),
    };
    if let Some(message) = report.notice {
        emit(Notice::success(message));
    }
    println!("{}", report.view);
    ExitCode::SUCCESS
}

/// Prints a notice. Failures go to stderr and fail the process.
fn emit(notice: Notice) -> ExitCode {
    if notice.is_failure() {
        eprintln!("{notice}");
        ExitCode::FAILURE
    } else {
        println!("{notice}");
        ExitCode::SUCCESS
    }
}

async fn handle_daily(
    store: &Store,
    command: DailyCommand,
    today: NaiveDate,
) -> Result<Report, ClientError> {
    let notice = match command {
        DailyCommand::List(args) => {
            store.fetch_daily_goals(args.date).await?;
            None
        }
        DailyCommand::Add(args) => {
            store.fetch_daily_goals(None).await?;
            let goal = store
                .add_daily_goal(&args.task, args.date.unwrap_or(today))
                .await?;
            Some(format!("Added daily goal {}: {}", goal.id, goal.task))
        }
        DailyCommand::Update(args) => {
            store.fetch_daily_goals(None).await?;
            let changes = DailyGoalChanges {
                task: args.task,
                date: args.date,
                completed: args.completed,
            };
            let goal = store.update_daily_goal(args.id, &changes).await?;
            Some(format!("Updated daily goal {}.", goal.id))
        }
        DailyCommand::Toggle(args) => {
            store.fetch_daily_goals(None).await?;
            let goal = store.toggle_daily_goal(args.id).await?;
            let state = if goal.completed { "done" } else { "open" };
            Some(format!("Daily goal {} marked {state}.", goal.id))
        }
        DailyCommand::Remove(args) => {
            store.fetch_daily_goals(None).await?;
            store.delete_daily_goal(args.id).await?;
            Some(format!("Daily goal {} removed.", args.id))
        }
    };
    let snapshot = store.daily_goals.snapshot().await;
    Ok(Report {
        notice,
        view: format_daily_goals(&snapshot.items),
    })
}

async fn handle_monthly(
    store: &Store,
    command: MonthlyCommand,
    today: NaiveDate,
) -> Result<Report, ClientError> {
    store.fetch_monthly_plans().await?;
    let notice = match command {
        MonthlyCommand::List => None,
        MonthlyCommand::Add(form) => {
            let input = MonthlyPlanInput {
                subject: form.subject,
                target: form.target,
                deadline: form.deadline,
            };
            let plan = store.add_monthly_plan(&input).await?;
            Some(format!("Added monthly plan {}: {}", plan.id, plan.subject))
        }
        MonthlyCommand::Edit(args) => {
            let input = MonthlyPlanInput {
                subject: args.form.subject,
                target: args.form.target,
                deadline: args.form.deadline,
            };
            let plan = store.edit_monthly_plan(args.id, &input).await?;
            Some(format!("Updated monthly plan {}.", plan.id))
        }
        MonthlyCommand::Complete(args) => {
            let plan = store.set_monthly_plan_completed(args.id, !args.undo).await?;
            let state = if plan.completed { "done" } else { "open" };
            Some(format!("Monthly plan {} marked {state}.", plan.id))
        }
        MonthlyCommand::Toggle(args) => {
            let plan = store.toggle_monthly_plan(args.id).await?;
            let state = if plan.completed { "done" } else { "open" };
            Some(format!("Monthly plan {} marked {state}.", plan.id))
        }
        MonthlyCommand::Remove(args) => {
            store.delete_monthly_plan(args.id).await?;
            Some(format!("Monthly plan {} removed.", args.id))
        }
    };
    let snapshot = store.monthly_plans.snapshot().await;
    Ok(Report {
        notice,
        view: format_monthly_plans(&snapshot.items, today),
    })
}

async fn handle_session(
    store: &Store,
    command: SessionCommand,
    today: NaiveDate,
) -> Result<Report, ClientError> {
    let notice = match command {
        SessionCommand::List(args) => {
            store.fetch_sessions(args.date).await?;
            None
        }
        SessionCommand::Add(args) => {
            store.fetch_sessions(None).await?;
            let input = StudySessionInput {
                subject: args.subject,
                duration_minutes: args.duration_minutes,
                date: args.date.unwrap_or(today),
                notes: args.notes,
            };
            let session = store.add_session(&input).await?;
            Some(format!(
                "Logged {} minutes of {} (session {}).",
                session.duration_minutes, session.subject, session.id
            ))
        }
        SessionCommand::Remove(args) => {
            store.fetch_sessions(None).await?;
            store.delete_session(args.id).await?;
            Some(format!("Study session {} removed.", args.id))
        }
    };
    let snapshot = store.sessions.snapshot().await;
    Ok(Report {
        notice,
        view: format_sessions(&snapshot.items),
    })
}

async fn handle_syllabus(store: &Store, command: SyllabusCommand) -> Result<Report, ClientError> {
    let notice = match command {
        SyllabusCommand::List(args) => {
            store.fetch_syllabus(args.subject.as_deref()).await?;
            None
        }
        SyllabusCommand::Add(args) => {
            store.fetch_syllabus(None).await?;
            let input = SyllabusTopicInput {
                subject: args.subject,
                topic: args.topic,
            };
            let topic = store.add_syllabus_topic(&input).await?;
            Some(format!("Added topic {}: {}", topic.id, topic.topic))
        }
        SyllabusCommand::Toggle(args) => {
            store.fetch_syllabus(None).await?;
            let topic = store.toggle_syllabus_topic(args.id).await?;
            let state = if topic.completed { "covered" } else { "open" };
            Some(format!("Topic {} marked {state}.", topic.id))
        }
        SyllabusCommand::Remove(args) => {
            store.fetch_syllabus(None).await?;
            store.delete_syllabus_topic(args.id).await?;
            Some(format!("Topic {} removed.", args.id))
        }
    };
    let snapshot = store.syllabus.snapshot().await;
    Ok(Report {
        notice,
        view: format_syllabus(&snapshot.items),
    })
}

async fn handle_resource(store: &Store, command: ResourceCommand) -> Result<Report, ClientError> {
    store.fetch_resources().await?;
    let notice = match command {
        ResourceCommand::List => None,
        ResourceCommand::Add(args) => {
            let input = StudyResourceInput {
                title: args.title,
                url: args.url,
                subject: args.subject,
            };
            let resource = store.add_resource(&input).await?;
            Some(format!("Added resource {}: {}", resource.id, resource.title))
        }
        ResourceCommand::Remove(args) => {
            store.delete_resource(args.id).await?;
            Some(format!("Resource {} removed.", args.id))
        }
    };
    let snapshot = store.resources.snapshot().await;
    Ok(Report {
        notice,
        view: format_resources(&snapshot.items),
    })
}

async fn handle_group(store: &Store, command: GroupCommand) -> Result<Report, ClientError> {
    store.fetch_groups().await?;
    let notice = match command {
        GroupCommand::List => None,
        GroupCommand::Add(args) => {
            let input = StudyGroupInput {
                name: args.name,
                description: args.description,
            };
            let group = store.add_group(&input).await?;
            Some(format!("Added study group {}: {}", group.id, group.name))
        }
        GroupCommand::Remove(args) => {
            store.delete_group(args.id).await?;
            Some(format!("Study group {} removed.", args.id))
        }
    };
    let snapshot = store.groups.snapshot().await;
    Ok(Report {
        notice,
        view: format_groups(&snapshot.items),
    })
}
