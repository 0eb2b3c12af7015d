use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use chatstat::api::models::MessageFilters;
use chatstat::cli::database::{self, MessageArgs};
use chatstat::cli::stats::{self, TableOptions, WatchOptions, WatchView};
use chatstat::cli::{self, Context, OutputFormat};
use chatstat::stats::{SortConfig, SortDirection, SortKey, timeline::DEFAULT_BUCKET_MINUTES};
use chatstat::{config, logging};

#[derive(Debug, Parser)]
#[command(name = "chatstat")]
#[command(about = "Statistics dashboard for an archived chat server")]
struct App {
    /// Backend base URL (overrides config and CHATSTAT_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Sorting and filtering shared by the user and channel tables.
#[derive(Debug, Args)]
struct TableArgs {
    /// Sort key, e.g. message_count, total_words, percent_characters, name
    #[arg(long, default_value = "message_count", value_parser = parse_sort_key)]
    sort: SortKey,
    /// Sort ascending instead of descending
    #[arg(long)]
    asc: bool,
    /// Ignore the configured exclusions (bots, users, channels)
    #[arg(long)]
    include_bots: bool,
    /// Only show the first N rows
    #[arg(long)]
    limit: Option<usize>,
}

impl TableArgs {
    fn options(&self) -> TableOptions {
        let direction = if self.asc {
            SortDirection::Ascending
        } else {
            SortDirection::Descending
        };
        TableOptions {
            sort: SortConfig::new(self.sort, direction),
            include_bots: self.include_bots,
            limit: self.limit,
        }
    }
}

fn parse_sort_key(s: &str) -> Result<SortKey, String> {
    s.parse()
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Log in and store the access token
    Login {
        username: String,
        /// Password (falls back to CHATSTAT_PASSWORD, then stdin)
        #[arg(long)]
        password: Option<String>,
    },
    /// Create a dashboard account (requires an existing login)
    Register {
        username: String,
        #[arg(long, default_value = "")]
        first_name: String,
        #[arg(long, default_value = "")]
        last_name: String,
        /// Password (falls back to CHATSTAT_PASSWORD, then stdin)
        #[arg(long)]
        password: Option<String>,
    },
    /// Forget the stored access token
    Logout,
    /// Show the logged-in account
    Whoami,
    /// Archive-wide message statistics
    Summary {
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Last 24 hours of activity in fixed windows
    Timeline {
        /// Window width in minutes
        #[arg(long, default_value_t = DEFAULT_BUCKET_MINUTES)]
        bucket: u32,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Most recent messages
    Recent {
        #[arg(long)]
        limit: Option<usize>,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Per-user statistics table
    Users {
        #[command(flatten)]
        table: TableArgs,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Per-channel statistics table
    Channels {
        #[command(flatten)]
        table: TableArgs,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// One user's profile
    User {
        name: String,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// One channel's profile
    Channel {
        name: String,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Browse the message database (filters are remembered between runs)
    Messages {
        #[arg(long)]
        server: Option<String>,
        #[arg(long)]
        channel: Option<String>,
        #[arg(long)]
        user: Option<String>,
        /// Calendar day, YYYY-MM-DD, in --timezone
        #[arg(long)]
        date: Option<String>,
        /// Only messages with attachments
        #[arg(long)]
        attachments: bool,
        /// Only messages with mentions
        #[arg(long)]
        mentions: bool,
        /// Only messages with emojis
        #[arg(long)]
        emojis: bool,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        page_size: Option<u32>,
        /// IANA timezone for --date, e.g. America/Chicago
        #[arg(long)]
        timezone: Option<String>,
        /// Forget remembered filters, page size and timezone
        #[arg(long)]
        reset: bool,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Full record of one message
    Message {
        id: String,
        /// Output format: table (default) or json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Delete messages from the archive
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
    /// Values available to the `messages` filters
    FilterOptions {
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// The "average message"
    Random {
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Re-render a view on an interval
    Watch {
        #[arg(value_enum)]
        view: WatchView,
        /// Refresh interval in milliseconds (default 1000)
        #[arg(long)]
        interval: Option<u64>,
        /// Render once and exit
        #[arg(long)]
        once: bool,
        /// Stop after N refreshes
        #[arg(long)]
        count: Option<u64>,
        /// Timeline window width in minutes
        #[arg(long, default_value_t = DEFAULT_BUCKET_MINUTES)]
        bucket: u32,
        #[command(flatten)]
        table: TableArgs,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Show or edit configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Write the default config to ~/.chatstat/config.toml
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Set a dotted key, e.g. `api.base_url https://stats.example.com`
    Set { key: String, value: String },
    /// Overwrite the global config with defaults
    Reset,
}

fn fmt(format: &str) -> OutputFormat {
    OutputFormat::from_str_opt(Some(format))
}

fn main() -> Result<()> {
    let app = App::parse();

    let mut cfg = config::load();
    if let Some(url) = app.api_url {
        cfg.api.base_url = url;
    }
    logging::init(&cfg.logging);

    if let Commands::Config { action } = &app.command {
        return match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(*force),
            ConfigAction::Set { key, value } => cli::run_config_set(key, value),
            ConfigAction::Reset => cli::run_config_reset(),
        };
    }

    let ctx = Context::new(cfg);

    match app.command {
        Commands::Login { username, password } => cli::run_login(&ctx, &username, password),
        Commands::Register {
            username,
            first_name,
            last_name,
            password,
        } => cli::run_register(&ctx, &username, &first_name, &last_name, password),
        Commands::Logout => cli::run_logout(&ctx),
        Commands::Whoami => cli::run_whoami(&ctx),
        Commands::Summary { format } => stats::run_summary(&ctx, fmt(&format)),
        Commands::Timeline { bucket, format } => stats::run_timeline(&ctx, bucket, fmt(&format)),
        Commands::Recent { limit, format } => stats::run_recent(&ctx, limit, fmt(&format)),
        Commands::Users { table, format } => {
            stats::run_users(&ctx, &table.options(), fmt(&format))
        }
        Commands::Channels { table, format } => {
            stats::run_channels(&ctx, &table.options(), fmt(&format))
        }
        Commands::User { name, format } => stats::run_user(&ctx, &name, fmt(&format)),
        Commands::Channel { name, format } => stats::run_channel(&ctx, &name, fmt(&format)),
        Commands::Messages {
            server,
            channel,
            user,
            date,
            attachments,
            mentions,
            emojis,
            page,
            page_size,
            timezone,
            reset,
            format,
        } => {
            let args = MessageArgs {
                filters: MessageFilters {
                    server,
                    channel,
                    user,
                    date,
                    has_attachment: attachments,
                    has_mention: mentions,
                    has_emoji: emojis,
                },
                page,
                page_size,
                timezone,
                reset,
            };
            database::run_messages(&ctx, &args, fmt(&format))
        }
        Commands::Message { id, format } => database::run_message(&ctx, &id, fmt(&format)),
        Commands::Delete { ids, yes } => database::run_delete(&ctx, &ids, yes),
        Commands::FilterOptions { format } => database::run_filter_options(&ctx, fmt(&format)),
        Commands::Random { format } => stats::run_random(&ctx, fmt(&format)),
        Commands::Watch {
            view,
            interval,
            once,
            count,
            bucket,
            table,
            format,
        } => {
            let options = WatchOptions {
                interval_ms: interval,
                once,
                count,
                bucket_minutes: bucket,
                table: table.options(),
            };
            stats::run_watch(&ctx, view, &options, fmt(&format))
        }
        Commands::Config { .. } => Ok(()),
    }
}
