//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use purelearn_content::ContentRepository;
use purelearn_core::{
    Navigator, ProgressChange, ProgressState, ProgressStore, course_progress, score_quiz,
};
use purelearn_shared::{
    AppConfig, Position, QuizQuestion, SectionId, TopicNavigation, expand_home, init_config,
    load_config, load_config_from,
};
use purelearn_storage::Storage;
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// PureLearn — read markdown courses and track your progress.
#[derive(Parser)]
#[command(
    name = "purelearn",
    version,
    about = "Browse markdown courses, navigate their outline, and track progress locally.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.purelearn/purelearn.toml).
    #[arg(long, global = true, env = "PURELEARN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Content root, overriding the config file.
    #[arg(long, global = true, env = "PURELEARN_CONTENT")]
    pub content: Option<PathBuf>,

    /// Progress database, overriding the config file.
    #[arg(long, global = true, env = "PURELEARN_DB")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// List available courses.
    Courses,

    /// Show a course outline with completion status.
    Outline {
        /// Course slug.
        course: String,

        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show one subtopic page.
    Show {
        course: String,
        topic: String,
        subtopic: String,
    },

    /// Print the previous and next pages around a subtopic.
    Nav {
        course: String,
        topic: String,
        subtopic: String,

        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Mark a section completed (`course/topic[/subtopic]` or a page path).
    Complete {
        section: String,
    },

    /// Take page quizzes and manage quiz results.
    Quiz {
        #[command(subcommand)]
        action: QuizAction,
    },

    /// Toggle a bookmark (e.g. `course/topic/subtopic#heading`).
    Bookmark { key: String },

    /// List bookmarks.
    Bookmarks,

    /// Clear completion flags of a course, or of every course with --all.
    Reset {
        /// Course slug.
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        course: Option<String>,

        /// Clear completion flags of every course.
        #[arg(long)]
        all: bool,
    },

    /// Dump stored progress.
    Progress {
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Quiz subcommands.
#[derive(Subcommand)]
pub(crate) enum QuizAction {
    /// Print the questions of a page's quiz.
    Show {
        course: String,
        topic: String,
        subtopic: String,
    },
    /// Answer a page's quiz, score it, and record the result.
    Take {
        course: String,
        topic: String,
        subtopic: String,

        /// Zero-based option index per question, comma separated (e.g. 1,0,2).
        #[arg(long, value_delimiter = ',', required = true)]
        answers: Vec<usize>,

        /// Print the outcome as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Record the result of a finished quiz, replacing any earlier result.
    Record {
        section: String,
        score: u32,
        total: u32,
    },
    /// Forget the result of one quiz.
    Reset { section: String },
    /// Forget every quiz result.
    ResetAll,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "purelearn=warn",
        1 => "purelearn=info",
        2 => "purelearn=debug",
        _ => "purelearn=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Resolved settings
// ---------------------------------------------------------------------------

/// Config file merged with CLI overrides.
struct Settings {
    config: AppConfig,
    content_root: PathBuf,
    database: PathBuf,
}

impl Settings {
    fn resolve(cli: &Cli) -> Result<Self> {
        let config = match &cli.config {
            Some(path) => load_config_from(path)?,
            None => load_config()?,
        };
        let content_root = cli
            .content
            .clone()
            .unwrap_or_else(|| expand_home(&config.content.root));
        let database = cli
            .db
            .clone()
            .unwrap_or_else(|| expand_home(&config.storage.database));
        debug!(
            content = %content_root.display(),
            database = %database.display(),
            "settings resolved"
        );
        Ok(Self {
            config,
            content_root,
            database,
        })
    }

    fn content(&self) -> ContentRepository {
        ContentRepository::new(&self.content_root)
    }

    async fn progress(&self) -> Result<ProgressStore<Storage>> {
        let storage = Storage::open(&self.database).await?;
        let mut store = ProgressStore::open(storage).await;
        store.subscribe(|change: &ProgressChange, state: &ProgressState| {
            info!(
                action = ?change.action,
                sections = state.sections().len(),
                quizzes = state.quizzes().len(),
                bookmarks = state.bookmarks().len(),
                "progress updated"
            );
        });
        Ok(store)
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    if let Command::Config {
        action: ConfigAction::Init,
    } = &cli.command
    {
        return cmd_config_init().await;
    }

    let settings = Settings::resolve(&cli)?;
    match cli.command {
        Command::Courses => cmd_courses(&settings).await,
        Command::Outline { course, json } => cmd_outline(&settings, &course, json).await,
        Command::Show {
            course,
            topic,
            subtopic,
        } => cmd_show(&settings, &Position::new(course, topic, subtopic)).await,
        Command::Nav {
            course,
            topic,
            subtopic,
            json,
        } => cmd_nav(&settings, &Position::new(course, topic, subtopic), json).await,
        Command::Complete { section } => cmd_complete(&settings, &section).await,
        Command::Quiz { action } => cmd_quiz(&settings, action).await,
        Command::Bookmark { key } => cmd_bookmark(&settings, &key).await,
        Command::Bookmarks => cmd_bookmarks(&settings).await,
        Command::Reset { course, all } => cmd_reset(&settings, course.as_deref(), all).await,
        Command::Progress { json } => cmd_progress(&settings, json).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(&settings).await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_courses(settings: &Settings) -> Result<()> {
    let courses = settings.content().list_courses()?;
    if courses.is_empty() {
        println!("No courses found under {}", settings.content_root.display());
        return Ok(());
    }

    for course in &courses {
        println!("{:<24} {}", course.slug, course.title);
        if !course.description.is_empty() {
            println!("{:<24} {}", "", course.description);
        }
        let mut facts = vec![format!(
            "{} topics, {} pages",
            course.topics.len(),
            course.subtopic_count()
        )];
        if let Some(time) = &course.estimated_time {
            facts.push(time.clone());
        }
        if let Some(updated) = &course.updated_at {
            facts.push(format!("updated {updated}"));
        }
        println!("{:<24} {}", "", facts.join(" · "));
    }
    Ok(())
}

async fn cmd_outline(settings: &Settings, course_slug: &str, json: bool) -> Result<()> {
    let course = settings.content().require_course(course_slug)?;
    let store = settings.progress().await?;
    let overview = course_progress(&course, store.state());

    if json {
        println!("{}", serde_json::to_string_pretty(&overview)?);
        return Ok(());
    }

    println!("{}", course.title);
    println!(
        "Progress: {}/{} pages ({}%)",
        overview.completed_subtopics,
        overview.total_subtopics,
        overview.percent()
    );
    if let Some(start) = Navigator::new(&course).start() {
        println!("Start:    {} ({})", start.title, start.href);
    }
    println!();

    for topic in &overview.topics {
        let badge = if topic.completed { "●" } else { "○" };
        let quiz = if topic.has_quiz { "  [quiz]" } else { "" };
        println!("{badge} {}{quiz}", topic.title);
        for sub in &topic.subtopics {
            let badge = if sub.completed { "✓" } else { "·" };
            let quiz = sub
                .quiz
                .map(|q| format!("  [quiz {}/{}]", q.score, q.total))
                .unwrap_or_default();
            println!("    {badge} {}{quiz}", sub.title);
        }
    }
    Ok(())
}

async fn cmd_show(settings: &Settings, position: &Position) -> Result<()> {
    let content = settings.content();
    let course = content.require_course(&position.course_slug)?;
    let subtopic = course
        .topic(&position.topic_slug)
        .and_then(|t| t.subtopic(&position.subtopic_slug))
        .ok_or_else(|| eyre!("not found: {}", position.href()))?;
    let page = content
        .page(
            &position.course_slug,
            &position.topic_slug,
            &position.subtopic_slug,
        )?
        .ok_or_else(|| eyre!("not found: {}", position.href()))?;

    let title = page
        .front_matter
        .title
        .as_deref()
        .unwrap_or(&subtopic.title);
    println!("# {title}");
    if let Some(description) = &page.front_matter.description {
        println!("> {description}");
    }
    println!();

    if !page.highlights.is_empty() {
        println!("Key Points");
        for (i, point) in page.highlights.iter().enumerate() {
            println!("  {}. {point}", i + 1);
        }
        println!();
    }

    println!("{}", page.body);

    if !subtopic.references.is_empty() {
        println!();
        println!("References");
        for reference in &subtopic.references {
            match &reference.description {
                Some(d) => println!("  - {} <{}>: {d}", reference.title, reference.url),
                None => println!("  - {} <{}>", reference.title, reference.url),
            }
        }
    }

    let store = settings.progress().await?;
    let completed = store.state().is_section_marked(&position.section_id());
    println!();
    println!(
        "{}",
        if completed {
            "✓ Section completed".to_string()
        } else {
            format!("Mark as completed: purelearn complete {}", position.section_id())
        }
    );

    let nav = Navigator::new(&course).resolve(&position.topic_slug, &position.subtopic_slug);
    print_navigation(&nav);
    Ok(())
}

async fn cmd_nav(settings: &Settings, position: &Position, json: bool) -> Result<()> {
    let course = settings.content().require_course(&position.course_slug)?;
    let nav = Navigator::new(&course).resolve(&position.topic_slug, &position.subtopic_slug);

    if json {
        println!("{}", serde_json::to_string_pretty(&nav)?);
    } else {
        print_navigation(&nav);
    }
    Ok(())
}

fn print_navigation(nav: &TopicNavigation) {
    match &nav.prev_link {
        Some(link) => println!("← {} ({})", link.title, link.href),
        None => println!("← (start of course)"),
    }
    match &nav.next_link {
        Some(link) => println!("→ {} ({})", link.title, link.href),
        None => println!("→ (end of course)"),
    }
}

async fn cmd_complete(settings: &Settings, section: &str) -> Result<()> {
    let id: SectionId = section.parse()?;
    let mut store = settings.progress().await?;
    store.mark_section_completed(&id).await;
    println!("Completed: {id}");
    Ok(())
}

/// Questions of the page at `position`, failing if it declares none.
fn page_quiz(settings: &Settings, position: &Position) -> Result<Vec<QuizQuestion>> {
    let page = settings
        .content()
        .page(&position.course_slug, &position.topic_slug, &position.subtopic_slug)?
        .ok_or_else(|| eyre!("not found: {}", position.href()))?;
    if page.front_matter.quiz.is_empty() {
        return Err(eyre!("{} has no quiz", position.href()));
    }
    Ok(page.front_matter.quiz)
}

async fn cmd_quiz(settings: &Settings, action: QuizAction) -> Result<()> {
    if let QuizAction::Show {
        course,
        topic,
        subtopic,
    } = &action
    {
        let questions = page_quiz(settings, &Position::new(course, topic, subtopic))?;
        for (number, question) in questions.iter().enumerate() {
            println!("{}. {}", number + 1, question.question);
            for (index, option) in question.options.iter().enumerate() {
                println!("   [{index}] {option}");
            }
        }
        return Ok(());
    }

    let mut store = settings.progress().await?;
    match action {
        QuizAction::Show { .. } => {} // printed above without opening the store
        QuizAction::Take {
            course,
            topic,
            subtopic,
            answers,
            json,
        } => {
            let position = Position::new(course, topic, subtopic);
            let questions = page_quiz(settings, &position)?;
            let outcome = score_quiz(&questions, &answers)?;
            let id = position.section_id();
            store.update_quiz_progress(&id, outcome.score, outcome.total).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
                return Ok(());
            }
            for (number, (question, answer)) in questions.iter().zip(&outcome.answers).enumerate() {
                let mark = if answer.correct { "✓" } else { "✗" };
                println!("{mark} {}. {}", number + 1, question.question);
                if !answer.correct {
                    println!("    answer: {}", question.options[answer.correct_answer]);
                }
                if let Some(explanation) = &answer.explanation {
                    println!("    {explanation}");
                }
            }
            println!();
            println!("Score: {}/{}", outcome.score, outcome.total);
            println!("{}", outcome.verdict.message());
        }
        QuizAction::Record {
            section,
            score,
            total,
        } => {
            let id: SectionId = section.parse()?;
            store.update_quiz_progress(&id, score, total).await?;
            println!("Quiz {id}: {score}/{total}");
        }
        QuizAction::Reset { section } => {
            let id: SectionId = section.parse()?;
            store.reset_quiz_progress(&id).await;
            println!("Quiz {id} reset");
        }
        QuizAction::ResetAll => {
            store.reset_all_quiz_progress().await;
            println!("All quiz results cleared");
        }
    }
    Ok(())
}

async fn cmd_bookmark(settings: &Settings, key: &str) -> Result<()> {
    let mut store = settings.progress().await?;
    if store.toggle_bookmark(key).await? {
        println!("Bookmarked: {}", key.trim());
    } else {
        println!("Bookmark removed: {}", key.trim());
    }
    Ok(())
}

async fn cmd_bookmarks(settings: &Settings) -> Result<()> {
    let store = settings.progress().await?;
    let bookmarks = store.state().bookmarks();
    if bookmarks.is_empty() {
        println!("No bookmarks");
    }
    for key in bookmarks.keys() {
        println!("{key}");
    }
    Ok(())
}

async fn cmd_reset(settings: &Settings, course: Option<&str>, all: bool) -> Result<()> {
    let mut store = settings.progress().await?;
    match (course, all) {
        (_, true) => {
            store.reset_all_section_progress().await;
            println!("Completion cleared for every course");
        }
        (Some(course), false) => {
            store.reset_section_progress(course).await;
            println!("Completion cleared for {course}");
        }
        (None, false) => return Err(eyre!("pass a course slug or --all")),
    }
    Ok(())
}

async fn cmd_progress(settings: &Settings, json: bool) -> Result<()> {
    let store = settings.progress().await?;
    let state = store.state();

    if json {
        let dump = serde_json::json!({
            "sections": state.sections(),
            "quizzes": state.quizzes(),
            "bookmarks": state.bookmarks(),
        });
        println!("{}", serde_json::to_string_pretty(&dump)?);
        return Ok(());
    }

    println!("Completed sections ({})", state.sections().len());
    for key in state.sections().keys() {
        println!("  {key}");
    }
    println!("Quiz results ({})", state.quizzes().len());
    for (key, record) in state.quizzes() {
        println!("  {key}: {}/{} ({}%)", record.score, record.total, record.percent());
    }
    println!("Bookmarks ({})", state.bookmarks().len());
    for key in state.bookmarks().keys() {
        println!("  {key}");
    }
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(settings: &Settings) -> Result<()> {
    let toml_str = toml::to_string_pretty(&settings.config)?;
    println!("{toml_str}");
    println!("# effective content root: {}", settings.content_root.display());
    println!("# effective database:     {}", settings.database.display());
    Ok(())
}
