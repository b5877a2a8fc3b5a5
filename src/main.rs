use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use fullshot::annotate::{EditOp, Editor};
use fullshot::download::Downloads;
use fullshot::i18n::Catalog;
use fullshot::library::{describe_age, ScreenshotLibrary, Settings};
use fullshot::store::JsonFileStore;
use fullshot::synthetic::SyntheticPage;
use fullshot::{now_millis, CaptureConfig, CaptureOutcome, CaptureService, ImageFormat, Viewport};
use log::{error, info};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "fullshot", version, about = "Full-page screenshots: capture, stitch, annotate")]
struct Cli {
    /// JSON file holding screenshots and settings
    #[arg(long, global = true, default_value = "fullshot-store.json")]
    store: PathBuf,

    /// Locale for messages (en, zh_CN); defaults to LANG
    #[arg(long, global = true)]
    locale: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Capture a web page with headless Chrome
    Capture {
        url: String,
        #[command(flatten)]
        capture: CaptureArgs,
    },
    /// Tile a local image through a simulated viewport and stitch it back
    Stitch {
        image: PathBuf,
        #[command(flatten)]
        capture: CaptureArgs,
    },
    /// Browse stored screenshots
    #[command(subcommand)]
    History(HistoryCommand),
    /// Apply annotations from a JSON list of edit operations
    Edit {
        id: String,
        /// File with `[{"op": "rect", "from": {"x": 1, "y": 2}, "to": {...}}, ...]`
        #[arg(long)]
        ops: PathBuf,
    },
    /// Write a stored screenshot to disk
    Download {
        id: String,
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        /// Output format; defaults to the configured one
        #[arg(long)]
        format: Option<ImageFormat>,
        #[arg(long)]
        name: Option<String>,
    },
    #[command(subcommand)]
    Settings(SettingsCommand),
}

#[derive(Args)]
struct CaptureArgs {
    #[arg(long, default_value_t = 1280)]
    width: u32,
    #[arg(long, default_value_t = 720)]
    height: u32,
    /// Delay between scrolling and capturing each segment
    #[arg(long, default_value_t = fullshot::DEFAULT_SETTLE_DELAY_MS)]
    settle_ms: u64,
    #[arg(long, default_value_t = fullshot::DEFAULT_CAPTURE_TIMEOUT_MS)]
    timeout_ms: u64,
    /// Where auto-downloads go
    #[arg(long, default_value = ".")]
    download_dir: PathBuf,
}

impl CaptureArgs {
    fn config(&self) -> CaptureConfig {
        CaptureConfig {
            viewport: Viewport {
                width: self.width,
                height: self.height,
            },
            settle_delay_ms: self.settle_ms,
            timeout_ms: self.timeout_ms,
            ..Default::default()
        }
    }
}

#[derive(Subcommand)]
enum HistoryCommand {
    List,
    Show { id: String },
    Delete { id: String },
    Clear,
}

#[derive(Subcommand)]
enum SettingsCommand {
    Show,
    Set {
        #[arg(long)]
        format: Option<ImageFormat>,
        #[arg(long)]
        quality: Option<f32>,
        #[arg(long)]
        auto_download: Option<bool>,
    },
    Reset,
}

struct App {
    library: ScreenshotLibrary<JsonFileStore>,
    catalog: Catalog,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let catalog = match &cli.locale {
        Some(locale) => Catalog::builtin(locale),
        None => Catalog::from_env(),
    };

    let result = match JsonFileStore::open(&cli.store) {
        Ok(store) => {
            let mut app = App {
                library: ScreenshotLibrary::new(store),
                catalog: catalog.clone(),
            };
            app.run(cli.command).await
        }
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        let message = match e.downcast_ref::<fullshot::Error>() {
            Some(err) => catalog.error_message(err),
            None => e.to_string(),
        };
        error!("{:#}", e);
        eprintln!("{}", message);
        std::process::exit(1);
    }
}

impl App {
    async fn run(&mut self, command: Command) -> anyhow::Result<()> {
        match command {
            Command::Capture { url, capture } => self.capture(&url, &capture).await,
            Command::Stitch { image, capture } => self.stitch(&image, &capture).await,
            Command::History(cmd) => self.history(cmd),
            Command::Edit { id, ops } => self.edit(&id, &ops),
            Command::Download { id, dir, format, name } => {
                let settings = self.library.settings()?;
                let image = self.library.get(&id)?.image()?;
                let path = Downloads::new(dir).save_as(
                    &image,
                    format.unwrap_or(settings.format),
                    settings.quality,
                    name.as_deref(),
                )?;
                println!("{}", self.catalog.get_with("downloadSaved", &[path.display().to_string().as_str()]));
                Ok(())
            }
            Command::Settings(cmd) => self.settings(cmd),
        }
    }

    #[cfg(feature = "cdp")]
    async fn capture(&mut self, url: &str, args: &CaptureArgs) -> anyhow::Result<()> {
        let parsed = url::Url::parse(url).with_context(|| format!("invalid URL {}", url))?;
        fullshot::restricted::ensure_capturable(parsed.as_str())?;

        let service = CaptureService::start(args.config(), fullshot::cdp::CdpSurface::launch).await?;
        service.goto(parsed.as_str()).await?;
        let outcome = service.capture().await;
        service.close().await?;
        self.finish_capture(outcome?, args)
    }

    #[cfg(not(feature = "cdp"))]
    async fn capture(&mut self, url: &str, _args: &CaptureArgs) -> anyhow::Result<()> {
        anyhow::bail!("cannot capture {}: fullshot was built without the `cdp` feature", url)
    }

    async fn stitch(&mut self, path: &Path, args: &CaptureArgs) -> anyhow::Result<()> {
        let raster = image::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?
            .to_rgba8();
        let absolute = std::fs::canonicalize(path)?;
        let url = url::Url::from_file_path(&absolute)
            .map(String::from)
            .unwrap_or_else(|_| absolute.display().to_string());

        let service = CaptureService::start(args.config(), move |config: &CaptureConfig| {
            Ok(SyntheticPage::from_image(&url, raster, config.viewport))
        })
        .await?;
        let outcome = service.capture().await;
        service.close().await?;
        self.finish_capture(outcome?, args)
    }

    fn finish_capture(&mut self, outcome: CaptureOutcome, args: &CaptureArgs) -> anyhow::Result<()> {
        let record = self.library.save_capture(&outcome)?;
        println!(
            "{}",
            self.catalog.get_with(
                "captureSaved",
                &[outcome.id.as_str(), record.width.to_string().as_str(), record.height.to_string().as_str()]
            )
        );

        let settings = self.library.settings()?;
        if settings.auto_download {
            let path = Downloads::new(&args.download_dir).save_as(
                &outcome.image,
                settings.format,
                settings.quality,
                None,
            )?;
            info!("auto-downloaded {} to {}", outcome.id, path.display());
            println!("{}", self.catalog.get_with("downloadSaved", &[path.display().to_string().as_str()]));
        }
        Ok(())
    }

    fn history(&mut self, cmd: HistoryCommand) -> anyhow::Result<()> {
        match cmd {
            HistoryCommand::List => {
                let entries = self.library.list()?;
                if entries.is_empty() {
                    println!("{}", self.catalog.get("noScreenshots"));
                }
                let now = now_millis();
                for entry in entries {
                    let url = entry.record.url.clone().unwrap_or_else(|| self.catalog.get("unknownUrl"));
                    println!(
                        "{}\t{}x{}\t{}\t{}",
                        entry.id,
                        entry.record.width,
                        entry.record.height,
                        describe_age(&self.catalog, entry.record.timestamp, now),
                        url
                    );
                }
            }
            HistoryCommand::Show { id } => {
                let record = self.library.get(&id)?;
                let image = record.image()?;
                println!("id:        {}", id);
                println!("url:       {}", record.url.as_deref().unwrap_or("-"));
                println!("size:      {}x{}", record.width, record.height);
                println!("format:    {}", image.format);
                println!("bytes:     {}", image.data.len());
                println!("sha256:    {}", image.digest());
                println!("captured:  {}", describe_age(&self.catalog, record.timestamp, now_millis()));
            }
            HistoryCommand::Delete { id } => {
                self.library.delete(&id)?;
                println!("{}", self.catalog.get_with("deletedScreenshot", &[id.as_str()]));
            }
            HistoryCommand::Clear => {
                let removed = self.library.clear_all()?;
                println!("{}", self.catalog.get_with("clearedScreenshots", &[removed.to_string().as_str()]));
            }
        }
        Ok(())
    }

    fn edit(&mut self, id: &str, ops_path: &Path) -> anyhow::Result<()> {
        let ops: Vec<EditOp> = serde_json::from_slice(
            &std::fs::read(ops_path).with_context(|| format!("failed to read {}", ops_path.display()))?,
        )
        .with_context(|| format!("{} is not a list of edit operations", ops_path.display()))?;

        let record = self.library.get(id)?;
        let mut editor = Editor::from_image(&record.image()?)?;
        for op in &ops {
            editor.apply(op)?;
        }
        let edited = editor.export(ImageFormat::Png, 1.0)?;
        self.library.update_image(id, &edited)?;
        info!("applied {} edit operations to {}", ops.len(), id);
        Ok(())
    }

    fn settings(&mut self, cmd: SettingsCommand) -> anyhow::Result<()> {
        let settings = match cmd {
            SettingsCommand::Show => self.library.settings()?,
            SettingsCommand::Set {
                format,
                quality,
                auto_download,
            } => {
                let current = self.library.settings()?;
                let updated = Settings {
                    format: format.unwrap_or(current.format),
                    quality: quality.unwrap_or(current.quality),
                    auto_download: auto_download.unwrap_or(current.auto_download),
                };
                self.library.save_settings(&updated)?;
                println!("{}", self.catalog.get("settingsSaved"));
                updated
            }
            SettingsCommand::Reset => {
                let settings = self.library.reset_settings()?;
                println!("{}", self.catalog.get("settingsReset"));
                settings
            }
        };
        println!("{}", serde_json::to_string_pretty(&settings)?);
        Ok(())
    }
}
