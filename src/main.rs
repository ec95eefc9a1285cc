use clap::{Parser, Subcommand};
use postwall::feed;
use postwall::imaging::PictureFormat;
use postwall::ingest::PictureUpload;
use postwall::social::OEmbedClient;
use postwall::types::{Content, CropRequest};
use postwall::{Library, config, output};
use std::path::PathBuf;
use uuid::Uuid;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup; called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "postwall")]
#[command(about = "Ingest pictures and linked posts for a public wall")]
#[command(long_about = "\
Ingest pictures and linked posts for a public wall

Uploaded pictures are stored with a thumbnail and an automatic top crop;
a manual crop can be applied later. Linked Instagram posts are stored with
their embed data and a local thumbnail.

Storage layout:

  <data_dir>/
  ├── data.db                      # Metadata (one table per record kind)
  ├── pictures/<id>/               # orig, thumb, crop, thumb_crop
  └── instagram/<id>/              # thumb

Environment: DATA, DB and INSTA_TOKEN override the config file.
Logging: RUST_LOG (default \"info\"), written to stderr.

Run 'postwall gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (defaults only when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a PNG or JPEG picture
    Upload {
        file: PathBuf,
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long, default_value = "")]
        text: String,
        #[arg(long)]
        uploader: Option<String>,
    },
    /// Crop a picture; a negative origin shifts the rectangle back inside
    Crop {
        id: Uuid,
        #[arg(allow_hyphen_values = true)]
        x: i64,
        #[arg(allow_hyphen_values = true)]
        y: i64,
        width: i64,
        height: i64,
    },
    /// Replace a picture's title and text
    Edit {
        id: Uuid,
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long, default_value = "")]
        text: String,
    },
    /// Hide a picture or post from the wall
    Disable { id: Uuid },
    /// Show a hidden picture or post again
    Enable { id: Uuid },
    /// Delete a picture and its files
    Delete { id: Uuid },
    /// Show one picture or post
    Show { id: Uuid },
    /// List every record, newest first
    List {
        /// Print JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// List what the wall shows
    Feed {
        /// Print JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Link an Instagram post
    Link {
        url: String,
        #[arg(long)]
        uploader: Option<String>,
    },
    /// Delete a linked post and its thumbnail
    Unlink { id: Uuid },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if matches!(cli.command, Command::GenConfig) {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let config = config::load_config(cli.config.as_deref())?;
    let library = Library::open(&config)?;

    match cli.command {
        Command::Upload {
            file,
            title,
            text,
            uploader,
        } => {
            let size = std::fs::metadata(&file)?.len();
            if size > library.max_upload_bytes() {
                return Err(format!(
                    "{} is {size} bytes, the limit is {}",
                    file.display(),
                    library.max_upload_bytes()
                )
                .into());
            }
            let upload = PictureUpload {
                bytes: std::fs::read(&file)?,
                filename: file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                content_type: file
                    .extension()
                    .and_then(|ext| PictureFormat::from_tag(&ext.to_string_lossy()))
                    .map(|format| format!("image/{format}")),
                content: Content { title, text },
                uploader,
            };
            output::print_picture(&library.ingest_picture(upload)?);
        }
        Command::Crop {
            id,
            x,
            y,
            width,
            height,
        } => {
            let record = library.recrop_picture(id, CropRequest::new(x, y, width, height))?;
            output::print_picture(&record);
        }
        Command::Edit { id, title, text } => {
            let record = library.edit_picture_content(id, Content { title, text })?;
            output::print_picture(&record);
        }
        Command::Disable { id } => set_disabled(&library, id, true)?,
        Command::Enable { id } => set_disabled(&library, id, false)?,
        Command::Delete { id } => {
            library.delete_picture(id)?;
            println!("Deleted picture {id}");
        }
        Command::Show { id } => match library.get_picture(id) {
            Ok(record) => output::print_picture(&record),
            Err(e) if e.kind() == postwall::ErrorKind::NotFound => {
                output::print_post(&library.get_post(id)?)
            }
            Err(e) => return Err(e.into()),
        },
        Command::List { json } => {
            let posts = feed::all_posts(&library)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&posts)?);
            } else {
                output::print_lines(&output::format_post_list(&posts));
            }
        }
        Command::Feed { json } => {
            let items = feed::feed_items(&library)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                output::print_lines(&output::format_feed(&items));
            }
        }
        Command::Link { url, uploader } => {
            let client = OEmbedClient::new(&config.embed, library.max_upload_bytes())?;
            let record = library.ingest_social_post(&client, &url, uploader.as_deref())?;
            output::print_post(&record);
        }
        Command::Unlink { id } => {
            library.delete_post(id)?;
            println!("Deleted post {id}");
        }
        // Printed above, before any config is loaded
        Command::GenConfig => {}
    }

    Ok(())
}

/// Toggle visibility of whichever record kind owns `id`.
fn set_disabled(
    library: &Library,
    id: Uuid,
    disabled: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    match library.set_picture_disabled(id, disabled) {
        Ok(record) => output::print_picture(&record),
        Err(e) if e.kind() == postwall::ErrorKind::NotFound => {
            output::print_post(&library.set_post_disabled(id, disabled)?)
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
