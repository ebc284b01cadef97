use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use campus_feed::config::{Config, ConfigArgs};
use campus_feed::error::ClientResult;
use campus_feed::feed::PageLoad;
use campus_feed::model::{CategoryId, CommentId, PostId, ReactionKind, ReactionTarget, UserId};
use campus_feed::posts::PostDraft;
use campus_feed::state::AppState;
use campus_feed::view::{
    render, FeedTemplate, NotificationsTemplate, ProfileTemplate, SurveysTemplate,
};

#[derive(Parser, Debug)]
#[command(name = "campus-feed", about = "Campus social network from the terminal")]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum TargetArg {
    Post,
    Comment,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and remember the session
    Login {
        username: String,
        #[arg(long, env = "CAMPUS_FEED_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show who is signed in
    Whoami,
    /// Show the newest posts
    Feed {
        /// Number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: usize,
        /// Expand every comment thread
        #[arg(long)]
        comments: bool,
    },
    /// Press a reaction button; pressing the same one again removes it
    React {
        target: TargetArg,
        id: i64,
        kind: ReactionKind,
    },
    /// Comment on a post
    Comment { post: i64, text: String },
    /// Publish a post
    Post {
        #[arg(long)]
        category: i64,
        content: String,
        /// Image file to attach
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Delete one of your posts
    DeletePost { id: i64 },
    /// Delete one of your comments
    DeleteComment { id: i64 },
    /// List surveys
    Surveys,
    /// List notifications with their events
    Notifications,
    /// Show your profile, or another user's
    Profile { user: Option<i64> },
    /// Change your password
    ChangePassword {
        #[arg(long)]
        old: String,
        #[arg(long)]
        new: String,
        #[arg(long)]
        confirm: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli.config);
    std::fs::create_dir_all(&data_dir)?;
    tracing::debug!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli.config)?;
    let state = AppState::open(config)?;

    if let Err(e) = run(&state, cli.command).await {
        eprintln!("{}", e.notice());
        std::process::exit(1);
    }
    Ok(())
}

async fn run(state: &AppState, command: Command) -> ClientResult<()> {
    // A fresh login replaces whatever session was stored.
    if !matches!(command, Command::Login { .. }) {
        state.auth.restore().await?;
    }

    match command {
        Command::Login { username, password } => {
            let user = state.auth.login(&username, &password).await?;
            println!("Signed in as {}", user.username);
        }
        Command::Logout => {
            state.auth.logout().await?;
            println!("Signed out");
        }
        Command::Whoami => match state.user.current() {
            Some(user) => println!(
                "{} (#{}, {})",
                user.username,
                user.id,
                user.role.as_deref().unwrap_or("no role")
            ),
            None => println!("Not signed in"),
        },
        Command::Feed { pages, comments } => {
            state.feed.load().await?;
            for _ in 1..pages {
                if let PageLoad::Exhausted = state.feed.load_more().await? {
                    break;
                }
            }
            let viewer = state.user.current().map(|u| u.id);
            let text = state.store.read(|s| {
                render(&FeedTemplate::from_state(s, viewer, state.feed.has_more(), comments))
            })?;
            print!("{text}");
        }
        Command::React { target, id, kind } => {
            let me = state.user.require()?;
            let target = match target {
                TargetArg::Post => ReactionTarget::Post(PostId(id)),
                TargetArg::Comment => ReactionTarget::Comment(CommentId(id)),
            };
            state.feed.load().await?;
            let change = state.reactions.toggle(me.id, target, kind).await?;
            tracing::debug!(?change, "reaction applied");

            let summary = state.store.read(|s| match target {
                ReactionTarget::Post(id) => s.post(id).map(|p| p.reaction_summary),
                ReactionTarget::Comment(id) => s.comment(id).map(|c| c.reaction_summary),
            });
            if let Some(summary) = summary {
                let counts: Vec<String> = ReactionKind::ALL
                    .iter()
                    .map(|k| format!("{k} {}", summary.count(*k)))
                    .collect();
                println!("{target}: {}", counts.join(" · "));
            }
        }
        Command::Comment { post, text } => {
            let comment = state.posts.add_comment(PostId(post), &text).await?;
            println!("Comment #{} added", comment.id);
        }
        Command::Post {
            category,
            content,
            image,
        } => {
            let mut draft = PostDraft::new(content, CategoryId(category));
            if let Some(path) = image {
                draft.image = Some(state.uploader.upload(&path).await?);
            }
            let post = state.posts.publish(draft).await?;
            println!("Post #{} published", post.id);
        }
        Command::DeletePost { id } => {
            state.posts.delete(PostId(id)).await?;
            println!("Post #{id} deleted");
        }
        Command::DeleteComment { id } => {
            state.posts.delete_comment(CommentId(id)).await?;
            println!("Comment #{id} deleted");
        }
        Command::Surveys => {
            let surveys = state.surveys.list().await?;
            print!("{}", render(&SurveysTemplate::new(&surveys))?);
        }
        Command::Notifications => {
            let entries = state.notifications.load().await?;
            print!("{}", render(&NotificationsTemplate::new(&entries))?);
        }
        Command::Profile { user } => {
            let profile = match user {
                Some(id) => state.profiles.of(UserId(id)).await?.profile,
                None => {
                    state.user.require()?;
                    state.profiles.own().await?
                }
            };
            print!("{}", render(&ProfileTemplate::from_profile(&profile))?);
        }
        Command::ChangePassword { old, new, confirm } => {
            state.auth.change_password(&old, &new, &confirm).await?;
            println!("Password changed");
        }
    }
    Ok(())
}
